//! Staged, rule-based encoding classifier.
//!
//! Given raw bytes and an optional assumed encoding, the classifier first
//! looks for the Western-Latin byte patterns of UTF-32 and UTF-16, then
//! walks the buffer once collecting byte-class evidence, and finally applies
//! an ordered rule list. The outcome is deliberately three-valued: a tied
//! detection must keep preferring the caller's hint, which the decoder's
//! stabilization loop depends on.

use serde::Serialize;

use super::codepage::{ia5_char, CodePage};

/// Outcome of comparing detected evidence against the caller's assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Detection matches the assumption, or no assumption was given and the
    /// evidence suffices.
    Confirmed,
    /// Detection is incompatible with the assumption, or nothing fits.
    Rejected,
    /// Something was found but neither it nor the assumption can be ruled
    /// out.
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub verdict: Verdict,
    pub detected: Option<CodePage>,
}

impl Detection {
    fn confirmed(cp: CodePage) -> Self {
        Detection {
            verdict: Verdict::Confirmed,
            detected: Some(cp),
        }
    }

    fn inconclusive(cp: CodePage) -> Self {
        Detection {
            verdict: Verdict::Inconclusive,
            detected: Some(cp),
        }
    }

    fn graded(ascii_ok: bool, cp: CodePage) -> Self {
        if ascii_ok {
            Self::confirmed(cp)
        } else {
            Self::inconclusive(cp)
        }
    }

    /// A detection the decoder may act on (confirmed or inconclusive, with
    /// a concrete code page).
    pub fn is_usable(&self) -> bool {
        self.detected.is_some() && !matches!(self.verdict, Verdict::Rejected)
    }
}

/// Classify a byte buffer against an optional assumed encoding.
pub fn classify(bytes: &[u8], assumed: Option<CodePage>) -> Detection {
    let mut multi: Option<CodePage> = None;

    // Stage A: UTF-32 quad patterns (nz,0,0,0) / (0,0,0,nz).
    if !bytes.is_empty() && bytes.len() % 4 == 0 {
        let (le, be, neither) = count_endian_patterns(bytes, 4);
        if le > neither && be == 0 {
            multi = Some(CodePage::UTF32_LE);
        } else if be > neither && le == 0 {
            multi = Some(CodePage::UTF32_BE);
        }
    }

    // Stage B: UTF-16 pair patterns. Runs when stage A stayed silent, or
    // when the caller explicitly assumed UTF-16.
    let utf16_assumed = matches!(
        assumed,
        Some(CodePage::UTF16_LE) | Some(CodePage::UTF16_BE)
    );
    if !bytes.is_empty() && bytes.len() % 2 == 0 && (multi.is_none() || utf16_assumed) {
        let (le, be, neither) = count_endian_patterns(bytes, 2);
        if le > neither && be == 0 {
            multi = Some(CodePage::UTF16_LE);
        } else if be > neither && le == 0 {
            multi = Some(CodePage::UTF16_BE);
        }
    }

    if let Some(found) = multi {
        match assumed {
            None => return Detection::confirmed(found),
            Some(a) if a == found => return Detection::confirmed(found),
            // Recoding between multi-byte Unicode families is unsupported.
            Some(a) if a.is_unicode_multibyte() => {
                return Detection {
                    verdict: Verdict::Rejected,
                    detected: Some(found),
                }
            }
            // A single-byte or UTF-8 assumption: let the byte scan arbitrate.
            Some(_) => {}
        }
    }

    // Stage C: single-pass byte scan.
    let scan = ByteScan::run(bytes);
    log::trace!(
        "byte scan: 7bit={} utf8={:?} ctrl={} ascii={} ia5(de/se/no)={}/{}/{} \
         bal([]/{{}})={}/{} cp437={} asmo708={} latin1={} latin9={} w1252={}",
        scan.seven_bit,
        scan.utf8,
        scan.ascii_control,
        scan.ascii_other,
        scan.ia5_german,
        scan.ia5_swedish,
        scan.ia5_norwegian,
        scan.bracket_balance,
        scan.brace_balance,
        scan.cp437_letters,
        scan.asmo708_letters,
        scan.latin1_high,
        scan.latin9_marks,
        scan.win1252_high,
    );

    if let Some(decision) = decide_byte_scan(&scan, assumed) {
        return decision;
    }

    // The byte scan could not overturn a multi-byte finding (or found
    // nothing at all).
    Detection {
        verdict: Verdict::Rejected,
        detected: multi,
    }
}

/// Count chunks matching the little-endian pattern (leading byte non-zero,
/// rest zero), the big-endian mirror, and everything else.
fn count_endian_patterns(bytes: &[u8], width: usize) -> (usize, usize, usize) {
    let mut le = 0;
    let mut be = 0;
    let mut neither = 0;
    for chunk in bytes.chunks_exact(width) {
        let mid_zero = chunk[1..width - 1].iter().all(|&b| b == 0);
        if chunk[0] != 0 && mid_zero && chunk[width - 1] == 0 {
            le += 1;
        } else if chunk[0] == 0 && mid_zero && chunk[width - 1] != 0 {
            be += 1;
        } else {
            neither += 1;
        }
    }
    (le, be, neither)
}

/// Evidence collected in one walk over the buffer.
#[derive(Debug, Default)]
struct ByteScan {
    seven_bit: bool,
    /// Tri-state UTF-8 validity: `None` until evidence either way, `Some(false)`
    /// permanently on any malformed sequence, `Some(true)` once a multi-byte
    /// sequence has been consumed cleanly.
    utf8: Option<bool>,
    pending_continuations: u8,
    ascii_control: usize,
    ascii_other: usize,
    ia5_german: usize,
    ia5_swedish: usize,
    ia5_norwegian: usize,
    bracket_balance: i32,
    brace_balance: i32,
    cp437_letters: usize,
    asmo708_letters: usize,
    latin1_high: usize,
    latin9_marks: usize,
    win1252_high: usize,
}

impl ByteScan {
    fn run(bytes: &[u8]) -> Self {
        let mut scan = ByteScan {
            seven_bit: true,
            ..ByteScan::default()
        };
        for &b in bytes {
            if b < 0x80 {
                scan.take_ascii(b);
            } else {
                scan.take_high(b);
            }
        }
        if scan.pending_continuations > 0 {
            // Truncated trailing sequence.
            scan.utf8 = Some(false);
        }
        scan
    }

    fn take_ascii(&mut self, b: u8) {
        if self.pending_continuations > 0 {
            self.utf8 = Some(false);
            self.pending_continuations = 0;
        }
        match b {
            // TAB/CR/LF are ordinary in line-delimited text.
            b'\t' | b'\r' | b'\n' => self.ascii_other += 1,
            0x00..=0x1F | 0x7F => self.ascii_control += 1,
            _ => self.ascii_other += 1,
        }
        match b {
            b'[' => self.bracket_balance += 1,
            b']' => self.bracket_balance -= 1,
            b'{' => self.brace_balance += 1,
            b'}' => self.brace_balance -= 1,
            _ => {}
        }
        if ia5_char(CodePage::IA5_GERMAN, b).is_some() {
            self.ia5_german += 1;
        }
        if ia5_char(CodePage::IA5_SWEDISH, b).is_some() {
            self.ia5_swedish += 1;
        }
        if ia5_char(CodePage::IA5_NORWEGIAN, b).is_some() {
            self.ia5_norwegian += 1;
        }
    }

    fn take_high(&mut self, b: u8) {
        self.seven_bit = false;

        if self.pending_continuations > 0 {
            if (0x80..=0xBF).contains(&b) {
                self.pending_continuations -= 1;
                if self.pending_continuations == 0 && self.utf8 != Some(false) {
                    self.utf8 = Some(true);
                }
            } else {
                self.utf8 = Some(false);
                self.pending_continuations = expected_continuations(b);
            }
        } else {
            match b {
                // A continuation byte with nothing pending.
                0x80..=0xBF => self.utf8 = Some(false),
                0xC0..=0xF7 => self.pending_continuations = expected_continuations(b),
                _ => self.utf8 = Some(false),
            }
        }

        if matches!(b, 0x80..=0xA5 | 0xE0..=0xEB) {
            self.cp437_letters += 1;
        }
        if matches!(b, 0xC1..=0xDA | 0xE0..=0xF2) {
            self.asmo708_letters += 1;
        }
        if b >= 0xA0 {
            self.latin1_high += 1;
        }
        // The eight positions ISO-8859-15 reassigned (€, Š, š, Ž, ž, Œ, œ, Ÿ).
        if matches!(b, 0xA4 | 0xA6 | 0xA8 | 0xB4 | 0xB8 | 0xBC | 0xBD | 0xBE) {
            self.latin9_marks += 1;
        }
        // Defined in windows-1252, undefined in ISO-8859-1/-15.
        if (0x80..=0x9F).contains(&b) && !matches!(b, 0x81 | 0x8D | 0x8F | 0x90 | 0x9D) {
            self.win1252_high += 1;
        }
    }

    /// Control characters are near-absent from real text and ASCII content
    /// dominates whatever control characters do appear.
    fn ascii_rule_holds(&self) -> bool {
        self.ascii_control < 2 && self.ascii_other >= 4 * self.ascii_control
    }
}

fn expected_continuations(lead: u8) -> u8 {
    match lead {
        0xC0..=0xDF => 1,
        0xE0..=0xEF => 2,
        _ => 3,
    }
}

fn decide_byte_scan(scan: &ByteScan, assumed: Option<CodePage>) -> Option<Detection> {
    // Rule 1: a multi-byte UTF-8 sequence was consumed cleanly.
    if scan.utf8 == Some(true) {
        let verdict = match assumed {
            None | Some(CodePage::UTF8) => Verdict::Confirmed,
            Some(_) => Verdict::Inconclusive,
        };
        return Some(Detection {
            verdict,
            detected: Some(CodePage::UTF8),
        });
    }

    // Rule 2: pure 7-bit content.
    if scan.seven_bit {
        let ascii_ok = scan.ascii_rule_holds();

        // 2a: an IA5 assumption backed by potential national letters.
        if let Some(a) = assumed {
            let letters = match a {
                CodePage::IA5_GERMAN => scan.ia5_german,
                CodePage::IA5_SWEDISH => scan.ia5_swedish,
                CodePage::IA5_NORWEGIAN => scan.ia5_norwegian,
                _ => 0,
            };
            if letters > 0 {
                return Some(Detection::graded(ascii_ok, a));
            }
        }

        // 2b: without an assumption, a lopsided bracket or brace balance
        // hints that those bytes are national letters, not punctuation.
        if assumed.is_none()
            && (scan.bracket_balance.abs() > 2 || scan.brace_balance.abs() > 2)
        {
            let (no, de, se) = (scan.ia5_norwegian, scan.ia5_german, scan.ia5_swedish);
            let inferred = if no > 0 && no >= de && no >= se {
                Some(CodePage::IA5_NORWEGIAN)
            } else if de > no && de > se {
                Some(CodePage::IA5_GERMAN)
            } else if se > 0 {
                Some(CodePage::IA5_SWEDISH)
            } else {
                None
            };
            if let Some(cp) = inferred {
                return Some(Detection::graded(ascii_ok, cp));
            }
        }

        // 2c: keep any ASCII-compatible assumption alive.
        if let Some(a) = assumed {
            if a.is_ascii_compatible() {
                return Some(Detection::graded(ascii_ok, a));
            }
        }

        // 2d: plain ASCII.
        let verdict = if ascii_ok && assumed.is_none() {
            Verdict::Confirmed
        } else {
            Verdict::Inconclusive
        };
        return Some(Detection {
            verdict,
            detected: Some(CodePage::US_ASCII),
        });
    }

    // Rule 3: Latin high bytes over mostly-ASCII text.
    if scan.latin1_high > 0 && scan.ascii_rule_holds() {
        return Some(latin_family(scan, assumed));
    }

    // Rule 4: nothing fits.
    None
}

/// Pick between windows-1252, ISO-8859-1 and ISO-8859-15, preferring a
/// still-plausible assumption over the default member of the family.
fn latin_family(scan: &ByteScan, assumed: Option<CodePage>) -> Detection {
    if scan.win1252_high == 0 && scan.latin9_marks == 0 {
        match assumed {
            Some(a)
                if a == CodePage::WINDOWS_1252
                    || a == CodePage::LATIN_1
                    || a == CodePage::LATIN_9 =>
            {
                Detection::confirmed(a)
            }
            None => Detection::confirmed(CodePage::LATIN_1),
            Some(_) => Detection::inconclusive(CodePage::LATIN_1),
        }
    } else if scan.latin9_marks > 0 && scan.win1252_high == 0 {
        match assumed {
            Some(a) if a == CodePage::WINDOWS_1252 || a == CodePage::LATIN_9 => {
                Detection::confirmed(a)
            }
            None => Detection::confirmed(CodePage::LATIN_9),
            Some(_) => Detection::inconclusive(CodePage::LATIN_9),
        }
    } else {
        match assumed {
            Some(a) if a == CodePage::WINDOWS_1252 => Detection::confirmed(a),
            None => Detection::confirmed(CodePage::WINDOWS_1252),
            Some(_) => Detection::inconclusive(CodePage::WINDOWS_1252),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_ascii() {
        let det = classify(b"", None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::US_ASCII));
    }

    #[test]
    fn test_plain_ascii_confirmed() {
        let det = classify(b"Hello, world\n", None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::US_ASCII));
    }

    #[test]
    fn test_utf32_le_quad() {
        let det = classify(&[0x41, 0x00, 0x00, 0x00], None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::UTF32_LE));
    }

    #[test]
    fn test_utf16_be_pair() {
        let det = classify(&[0x00, 0x41], None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::UTF16_BE));
    }

    #[test]
    fn test_utf16_le_text() {
        // "Hi!?" in UTF-16 LE; six bytes, so stage A never runs.
        let det = classify(&[0x48, 0x00, 0x69, 0x00, 0x21, 0x00], None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::UTF16_LE));
    }

    #[test]
    fn test_multibyte_family_mismatch_rejected() {
        let det = classify(
            &[0x48, 0x00, 0x69, 0x00, 0x21, 0x00],
            Some(CodePage::UTF32_LE),
        );
        assert_eq!(det.verdict, Verdict::Rejected);
        assert_eq!(det.detected, Some(CodePage::UTF16_LE));
    }

    #[test]
    fn test_valid_utf8_confirmed() {
        let det = classify("naïve".as_bytes(), None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::UTF8));
    }

    #[test]
    fn test_valid_utf8_against_other_assumption() {
        let det = classify("naïve".as_bytes(), Some(CodePage::WINDOWS_1252));
        assert_eq!(det.verdict, Verdict::Inconclusive);
        assert_eq!(det.detected, Some(CodePage::UTF8));
    }

    #[test]
    fn test_latin1_fallback() {
        // "Café" with é as a bare 0xE9: invalid UTF-8, defined in 8859-1.
        let det = classify(&[0x43, 0x61, 0x66, 0xE9, 0x0A], None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::LATIN_1));
    }

    #[test]
    fn test_latin_family_prefers_assumption() {
        let det = classify(&[0x43, 0x61, 0x66, 0xE9], Some(CodePage::WINDOWS_1252));
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::WINDOWS_1252));
    }

    #[test]
    fn test_windows_1252_exclusive_byte() {
        // 0x93 (curly quote) exists only in windows-1252; 0xE9 keeps the
        // latin gate open.
        let det = classify(&[b'q', b'u', b'o', b't', b'e', 0x93, 0xE9], None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::WINDOWS_1252));
    }

    #[test]
    fn test_latin9_marker_without_1252() {
        // 0xA4 is € in ISO-8859-15; no windows-1252-exclusive bytes present.
        let det = classify(&[b'p', b'r', b'i', b'c', b'e', b' ', 0xA4], None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::LATIN_9));
    }

    #[test]
    fn test_high_control_bytes_rejected() {
        // 0x81 is undefined in 1252 and below the 8859-1 printable range.
        let det = classify(&[b'x', 0x81], None);
        assert_eq!(det.verdict, Verdict::Rejected);
        assert_eq!(det.detected, None);
    }

    #[test]
    fn test_seven_bit_keeps_ascii_compatible_assumption() {
        let det = classify(b"just text", Some(CodePage(850)));
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage(850)));
    }

    #[test]
    fn test_seven_bit_with_utf16_assumption_inconclusive() {
        let det = classify(b"abc", Some(CodePage::UTF16_LE));
        assert_eq!(det.verdict, Verdict::Inconclusive);
        assert_eq!(det.detected, Some(CodePage::US_ASCII));
    }

    #[test]
    fn test_ia5_assumption_with_letters() {
        let det = classify(b"Stra~e {ber alles", Some(CodePage::IA5_GERMAN));
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::IA5_GERMAN));
    }

    #[test]
    fn test_ia5_inferred_from_imbalance() {
        // Four unmatched closing braces read as national letters, and only
        // brace/bracket positions occur, which ties toward Norwegian.
        let det = classify(b"bl}b{r p} }ya }}", None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::IA5_NORWEGIAN));
    }

    #[test]
    fn test_ia5_tilde_breaks_norwegian_tie() {
        // '~' and '@' participate in the German and Swedish sets but not the
        // Norwegian one; with no '^'/'`' German ties Swedish, and the
        // cascade settles on Swedish.
        let det = classify(b"Gru~ Stra~e {{{{ @", None);
        assert_eq!(det.verdict, Verdict::Confirmed);
        assert_eq!(det.detected, Some(CodePage::IA5_SWEDISH));
    }

    #[test]
    fn test_truncated_utf8_not_confirmed_as_utf8() {
        // A dangling lead byte can't certify UTF-8; 0xC3 is Ã in 8859-1.
        let det = classify(&[b'o', b'k', b' ', b'o', b'k', 0xC3], None);
        assert_ne!(det.detected, Some(CodePage::UTF8));
    }

    #[test]
    fn test_control_heavy_buffer_fails_ascii_rule() {
        let det = classify(&[0x01, 0x02, b'a'], None);
        assert_eq!(det.verdict, Verdict::Inconclusive);
        assert_eq!(det.detected, Some(CodePage::US_ASCII));
    }
}
