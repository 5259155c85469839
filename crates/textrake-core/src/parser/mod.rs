//! Parse record lines into typed fields against a caller-supplied schema.
//!
//! Each line is walked with a character cursor. A field is captured from a
//! quoted span when one opens at the cursor, otherwise up to the next
//! separator, otherwise as a fixed-width slice bounded by the definition's
//! maximum length. Captured text is truncated, validated against the
//! definition's constraints, and coerced to its declared type.

pub mod schema;
pub mod value;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::error::{Result, TextrakeError};
use schema::{FieldDef, FieldFormat, FieldType};
use value::{FieldValue, Record};

/// Result of parsing a batch of record lines.
///
/// `error_lines` holds the 0-based indices of lines with at least one
/// rejected field. Those lines still contribute a record carrying their
/// parseable fields unless `stop_at_first_error` halted the run.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub records: Vec<Record>,
    pub success: bool,
    pub error_lines: Vec<usize>,
}

/// Parse `lines` against `defs`.
///
/// `separators` are tried in declaration order; `quotes` are the characters
/// that may open a quoted span. With no separators and no quoted span a
/// definition consumes exactly its `max_length` characters, which is what
/// fixed-width schemas rely on.
///
/// Only a malformed field pattern is an `Err`; all data-level failures are
/// reported through the outcome.
pub fn read_fields<S: AsRef<str>>(
    lines: &[S],
    defs: &[FieldDef],
    separators: &[&str],
    quotes: &[char],
    stop_at_first_error: bool,
) -> Result<ParseOutcome> {
    let compiled: Vec<Option<Regex>> = defs
        .iter()
        .map(|def| match def.pattern.as_deref() {
            Some(p) if !p.is_empty() => {
                Regex::new(p)
                    .map(Some)
                    .map_err(|e| TextrakeError::Pattern {
                        field: def.name.clone(),
                        source: e,
                    })
            }
            _ => Ok(None),
        })
        .collect::<Result<Vec<_>>>()?;

    // A definition without a format hint resolves to the invariant one;
    // the definition itself stays untouched.
    let formats: Vec<FieldFormat> = defs
        .iter()
        .map(|d| d.format.clone().unwrap_or_else(FieldFormat::invariant))
        .collect();

    let sep_chars: Vec<Vec<char>> = separators
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.chars().collect())
        .collect();

    let mut records = Vec::new();
    let mut error_lines = Vec::new();
    let mut success = true;

    for (line_idx, line) in lines.iter().enumerate() {
        let chars: Vec<char> = line.as_ref().chars().collect();
        let mut record = Record::with_width(defs.len());
        let mut i = 0usize;
        let mut line_errored = false;

        for (def_idx, def) in defs.iter().enumerate() {
            let cap = chars
                .len()
                .saturating_sub(i)
                .min(def.max_length.unwrap_or(usize::MAX));

            // Quoted span: an odd run of quote characters opens one.
            let mut field: Option<String> = None;
            let mut close_idx: Option<usize> = None;
            if i < chars.len() && quotes.contains(&chars[i]) {
                let q = chars[i];
                let mut run = 0;
                while i + run < chars.len() && chars[i + run] == q {
                    run += 1;
                }
                if run % 2 == 1 {
                    if let Some(close) = find_closing_quote(&chars, i + run, q) {
                        let inner: String = chars[i + run..close].iter().collect();
                        field = Some(unescape_quotes(&inner, q));
                        close_idx = Some(close);
                    }
                }
            }

            // Separator: first one found wins, in declaration order. A
            // quoted span keeps the field, but the separator past it still
            // drives the cursor.
            let search_from = close_idx.map(|c| c + 1).unwrap_or(i);
            let mut sep_hit: Option<(usize, usize)> = None;
            for sep in &sep_chars {
                if let Some(pos) = find_subslice(&chars, sep, search_from) {
                    sep_hit = Some((pos, sep.len()));
                    break;
                }
            }
            if field.is_none() {
                if let Some((pos, _)) = sep_hit {
                    field = Some(chars[i..pos].iter().collect());
                }
            }

            // Fixed-width fallback.
            let mut field =
                field.unwrap_or_else(|| chars[i..i + cap].iter().collect());

            // Cursor advance: past the separator, else past the closing
            // quote, else by the field's own width.
            if let Some((pos, len)) = sep_hit {
                i = pos + len;
            } else if let Some(close) = close_idx {
                i = close + 1;
            } else {
                i += field.chars().count();
            }

            if let Some(max) = def.max_length {
                if field.chars().count() > max {
                    field = field.chars().take(max).collect();
                }
            }

            let min_ok = def
                .min_length
                .map_or(true, |min| field.chars().count() >= min);
            let pattern_ok = compiled[def_idx]
                .as_ref()
                .map_or(true, |re| re.is_match(&field));
            if !min_ok || !pattern_ok {
                line_errored = true;
                if stop_at_first_error {
                    error_lines.push(line_idx);
                    return Ok(ParseOutcome {
                        records,
                        success: false,
                        error_lines,
                    });
                }
                continue;
            }

            match coerce(&field, def.field_type, &formats[def_idx]) {
                Some(v) => record.insert(def_idx, v),
                None => {
                    line_errored = true;
                    if stop_at_first_error {
                        error_lines.push(line_idx);
                        return Ok(ParseOutcome {
                            records,
                            success: false,
                            error_lines,
                        });
                    }
                }
            }
        }

        if line_errored {
            success = false;
            error_lines.push(line_idx);
        }
        records.push(record);
    }

    Ok(ParseOutcome {
        records,
        success,
        error_lines,
    })
}

/// Find the quote that closes a span opened before `from`. A candidate is
/// skipped when a backslash precedes it or another quote of the same kind
/// follows it (the two conventional escape forms).
fn find_closing_quote(chars: &[char], from: usize, q: char) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        if chars[j] == q {
            if chars[j - 1] == '\\' {
                j += 1;
                continue;
            }
            if j + 1 < chars.len() && chars[j + 1] == q {
                j += 2;
                continue;
            }
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Collapse `\q` and `qq` into a literal `q`.
fn unescape_quotes(s: &str, q: char) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == q {
            out.push(q);
            i += 2;
        } else if chars[i] == q && i + 1 < chars.len() && chars[i + 1] == q {
            out.push(q);
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn find_subslice(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() || from > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn coerce(raw: &str, field_type: FieldType, fmt: &FieldFormat) -> Option<FieldValue> {
    match field_type {
        FieldType::Text => Some(FieldValue::Text(raw.to_string())),
        FieldType::Boolean => {
            let t = raw.trim();
            if t.eq_ignore_ascii_case("true") {
                Some(FieldValue::Boolean(true))
            } else if t.eq_ignore_ascii_case("false") {
                Some(FieldValue::Boolean(false))
            } else {
                // An integer-valued field: zero is false, anything else true.
                parse_integer(t, fmt).map(|n| FieldValue::Boolean(n != 0))
            }
        }
        FieldType::Integer => parse_integer(raw.trim(), fmt).map(FieldValue::Integer),
        FieldType::Decimal => parse_decimal(raw.trim(), fmt).map(FieldValue::Decimal),
        FieldType::DateTime => parse_datetime(raw.trim(), fmt).map(FieldValue::DateTime),
    }
}

fn parse_integer(s: &str, fmt: &FieldFormat) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    let cleaned: String = match fmt.group_separator {
        Some(g) => s.chars().filter(|&c| c != g).collect(),
        None => s.to_string(),
    };
    cleaned.parse::<i64>().ok()
}

fn parse_decimal(s: &str, fmt: &FieldFormat) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let mut cleaned = String::with_capacity(s.len());
    for c in s.chars() {
        if Some(c) == fmt.group_separator {
            continue;
        }
        if c == fmt.decimal_separator {
            cleaned.push('.');
        } else if c.is_ascii_digit() || matches!(c, '-' | '+' | 'e' | 'E') {
            cleaned.push(c);
        } else {
            // "inf"/"NaN" and other f64 spellings are not decimal data.
            return None;
        }
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_datetime(s: &str, fmt: &FieldFormat) -> Option<NaiveDateTime> {
    for pattern in &fmt.datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(dt);
        }
        // Date-only formats resolve to midnight; a missing date is never
        // borrowed from the current day.
        if let Ok(d) = NaiveDate::parse_from_str(s, pattern) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
