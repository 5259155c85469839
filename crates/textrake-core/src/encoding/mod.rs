//! Decode a byte buffer into text lines with a stable dominant encoding.
//!
//! Decoding is per line: each byte-line is decoded with the current default
//! encoding, re-classified when the result shows replacement characters, and
//! the default is promoted whenever a newly detected page pulls even with
//! the most-used one. Because a promotion changes every subsequent decision,
//! a single pass can oscillate; the loop therefore retries once per code
//! page observed and keeps the pass that stayed most internally consistent.

pub mod classifier;
pub mod codepage;

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::lines::split_lines;
use classifier::classify;
use codepage::CodePage;

/// A decoded line together with the code page that actually produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub text: String,
    pub code_page: CodePage,
}

/// All decoded lines plus the dominant encoding of the winning pass.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedText {
    pub lines: Vec<TextLine>,
    pub encoding: CodePage,
}

struct Pass {
    lines: Vec<TextLine>,
    histogram: BTreeMap<CodePage, usize>,
    fallback: CodePage,
}

impl Pass {
    fn dominant(&self) -> (CodePage, usize) {
        let mut best = (self.fallback, 0);
        for (&cp, &count) in &self.histogram {
            if count > best.1 {
                best = (cp, count);
            }
        }
        best
    }
}

/// Decode `bytes` into text lines, optionally starting from a caller-given
/// default encoding. With `retry_on_conflict`, every code page observed in
/// a mixed pass is tried as the starting default in turn.
pub fn load_lines(
    bytes: &[u8],
    default: Option<CodePage>,
    retry_on_conflict: bool,
) -> DecodedText {
    // A leading BOM is consumed here, once, before line-splitting; the page
    // it names survives as the fallback default for passes without one.
    // Past this point BOM byte sequences are ordinary data.
    let (bom, body) = match CodePage::from_bom(bytes) {
        Some((cp, len)) => (Some(cp), &bytes[len..]),
        None => (None, bytes),
    };
    let byte_lines = split_lines(body);

    let mut queue: VecDeque<Option<CodePage>> = VecDeque::new();
    queue.push_back(default);
    let mut attempted: Vec<Option<CodePage>> = Vec::new();
    let mut passes: Vec<Pass> = Vec::new();

    while let Some(start) = queue.pop_front() {
        if attempted.contains(&start) {
            continue;
        }
        attempted.push(start);

        // A missing default may still be pinned down by a byte-order mark.
        let effective = start.or(bom);
        let pass = decode_pass(&byte_lines, effective);
        let (dominant, count) = pass.dominant();
        log::debug!(
            "pass starting from {:?}: {} line(s), {} page(s), dominant {} x{}",
            effective,
            pass.lines.len(),
            pass.histogram.len(),
            dominant,
            count,
        );

        if retry_on_conflict && pass.histogram.len() > 1 {
            for &cp in pass.histogram.keys() {
                if !attempted.contains(&Some(cp)) && !queue.contains(&Some(cp)) {
                    queue.push_back(Some(cp));
                }
            }
        }
        passes.push(pass);
    }

    // Keep the pass with the highest single-code-page line count; earlier
    // passes win ties, so a caller-given default is never displaced by an
    // equally good retry.
    let mut best = 0;
    for (i, pass) in passes.iter().enumerate() {
        if pass.dominant().1 > passes[best].dominant().1 {
            best = i;
        }
    }
    let winner = passes.swap_remove(best);
    if winner.histogram.len() > 1 {
        log::warn!(
            "mixed encodings remain after {} pass(es): {:?}",
            attempted.len(),
            winner.histogram,
        );
    }

    let encoding = winner.dominant().0;
    DecodedText {
        lines: winner.lines,
        encoding,
    }
}

fn decode_pass(byte_lines: &[&[u8]], start_default: Option<CodePage>) -> Pass {
    let fallback = start_default.unwrap_or(CodePage::UTF8);
    let mut default = start_default;
    let mut histogram: BTreeMap<CodePage, usize> = BTreeMap::new();
    let mut lines = Vec::with_capacity(byte_lines.len());

    for &raw in byte_lines {
        let mut cp = default.unwrap_or(CodePage::UTF8);
        let mut text = cp.decode(raw);

        if default.is_none() || text.contains(char::REPLACEMENT_CHARACTER) {
            let detection = classify(raw, Some(cp));
            if detection.is_usable() {
                if let Some(found) = detection.detected {
                    if found != cp {
                        cp = found;
                        text = cp.decode(raw);
                        // Promote the page once it pulls even with the
                        // most-used one so the rest of the pass follows it.
                        let seen = histogram.get(&cp).copied().unwrap_or(0) + 1;
                        let top = histogram.values().copied().max().unwrap_or(0);
                        if default.is_none() || seen >= top {
                            default = Some(cp);
                        }
                    }
                }
            }
        }

        *histogram.entry(cp).or_insert(0) += 1;
        lines.push(TextLine { text, code_page: cp });
    }

    Pass {
        lines,
        histogram,
        fallback,
    }
}
