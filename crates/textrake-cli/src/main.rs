use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};

use textrake_core::{
    classify, filter_lines, load_lines, read_fields, schema_from_json, CodePage, FieldDef,
    LineFilter, Verdict,
};

#[derive(Parser)]
#[command(name = "textrake", version, about = "Recover typed records from legacy text exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the character encoding of a file
    Detect {
        /// File to inspect
        file: PathBuf,
        /// Code page to check the content against (e.g. 1252, 65001)
        #[arg(long)]
        assume: Option<u16>,
    },
    /// Decode a file into text lines with per-line code pages
    Lines {
        /// File to decode
        file: PathBuf,
        /// Starting default code page (e.g. 28591)
        #[arg(long)]
        encoding: Option<u16>,
        /// Keep the first decoding pass even when encodings conflict
        #[arg(long)]
        no_retry: bool,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Parse a file into typed records using a JSON schema
    Parse {
        /// File to parse
        file: PathBuf,
        /// JSON schema file: an ordered array of field definitions
        #[arg(long)]
        schema: PathBuf,
        /// Field separators, tried in the given order
        #[arg(long = "sep")]
        separators: Vec<String>,
        /// Quote characters that may open a quoted field
        #[arg(long = "quote")]
        quotes: Vec<char>,
        /// Starting default code page (e.g. 28591)
        #[arg(long)]
        encoding: Option<u16>,
        /// Exact line that opens the data window
        #[arg(long)]
        start_sentinel: Option<String>,
        /// Exact line that closes the data window
        #[arg(long)]
        end_sentinel: Option<String>,
        /// Required line prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Required substring
        #[arg(long)]
        substring: Option<String>,
        /// Required line suffix
        #[arg(long)]
        suffix: Option<String>,
        /// Required exact line length in characters
        #[arg(long)]
        length: Option<usize>,
        /// First line index (0-based, inclusive)
        #[arg(long)]
        first: Option<usize>,
        /// Last line index (0-based, inclusive)
        #[arg(long)]
        last: Option<usize>,
        /// Keep empty and whitespace-only lines
        #[arg(long)]
        keep_empty: bool,
        /// Stop filtering and parsing at the first failing line
        #[arg(long)]
        stop_at_error: bool,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> textrake_core::Result<()> {
    match cli.command {
        Commands::Detect { file, assume } => cmd_detect(&file, assume),
        Commands::Lines {
            file,
            encoding,
            no_retry,
            json,
        } => cmd_lines(&file, encoding, no_retry, json),
        Commands::Parse {
            file,
            schema,
            separators,
            quotes,
            encoding,
            start_sentinel,
            end_sentinel,
            prefix,
            substring,
            suffix,
            length,
            first,
            last,
            keep_empty,
            stop_at_error,
            json,
        } => {
            let filter = LineFilter {
                start_sentinel,
                end_sentinel,
                skip_empty: !keep_empty,
                required_prefix: prefix,
                required_substring: substring,
                required_suffix: suffix,
                required_length: length,
                first_index: first,
                last_index: last,
                stop_at_error,
            };
            cmd_parse(
                &file,
                &schema,
                &separators,
                &quotes,
                encoding,
                &filter,
                stop_at_error,
                json,
            )
        }
    }
}

fn cmd_detect(file: &Path, assume: Option<u16>) -> textrake_core::Result<()> {
    let bytes = fs::read(file)?;
    let detection = classify(&bytes, assume.map(CodePage));

    let verdict = match detection.verdict {
        Verdict::Confirmed => "confirmed",
        Verdict::Rejected => "rejected",
        Verdict::Inconclusive => "inconclusive",
    };
    println!("Verdict:  {}", verdict);
    match detection.detected {
        Some(cp) => println!("Detected: {}", cp),
        None => println!("Detected: (none)"),
    }
    Ok(())
}

fn cmd_lines(
    file: &Path,
    encoding: Option<u16>,
    no_retry: bool,
    json: bool,
) -> textrake_core::Result<()> {
    let bytes = fs::read(file)?;
    let decoded = load_lines(&bytes, encoding.map(CodePage), !no_retry);

    if json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Code page", "Text"]);
    for (i, line) in decoded.lines.iter().enumerate() {
        table.add_row(vec![
            i.to_string(),
            line.code_page.to_string(),
            line.text.clone(),
        ]);
    }
    println!("{table}");
    println!("Dominant encoding: {}", decoded.encoding);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_parse(
    file: &Path,
    schema_path: &Path,
    separators: &[String],
    quotes: &[char],
    encoding: Option<u16>,
    filter: &LineFilter,
    stop_at_error: bool,
    json: bool,
) -> textrake_core::Result<()> {
    let bytes = fs::read(file)?;
    let schema_json = fs::read_to_string(schema_path)?;
    let defs = schema_from_json(&schema_json)?;

    let decoded = load_lines(&bytes, encoding.map(CodePage), true);
    let text: Vec<&str> = decoded.lines.iter().map(|l| l.text.as_str()).collect();

    let filtered = filter_lines(&text, filter);
    if !filtered.success {
        log::warn!(
            "line filter reported failure ({} line(s) skipped)",
            filtered.skipped
        );
    }

    let seps: Vec<&str> = separators.iter().map(String::as_str).collect();
    let outcome = read_fields(&filtered.lines, &defs, &seps, quotes, stop_at_error)?;

    if json {
        let records: Vec<serde_json::Value> = outcome
            .records
            .iter()
            .map(|r| record_to_json(r, &defs))
            .collect();
        let report = serde_json::json!({
            "encoding": decoded.encoding,
            "records": records,
            "success": filtered.success && outcome.success,
            "skipped_lines": filtered.skipped,
            "error_lines": outcome.error_lines,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(defs.iter().map(|d| d.name.clone()).collect::<Vec<_>>());
    for record in &outcome.records {
        let row: Vec<String> = (0..defs.len())
            .map(|i| {
                record
                    .get(i)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        table.add_row(row);
    }
    println!("{table}");

    println!("Encoding:      {}", decoded.encoding);
    println!("Records:       {}", outcome.records.len());
    println!("Skipped lines: {}", filtered.skipped);
    if !outcome.error_lines.is_empty() {
        println!("Error lines:   {:?}", outcome.error_lines);
    }
    Ok(())
}

fn record_to_json(record: &textrake_core::Record, defs: &[FieldDef]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (i, value) in record.iter() {
        map.insert(
            defs[i].name.clone(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
    }
    serde_json::Value::Object(map)
}
