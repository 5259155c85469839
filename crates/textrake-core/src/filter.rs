//! Structural filtering of decoded lines.

use serde::Serialize;

/// Predicates and window bounds applied to a sequence of text lines.
///
/// Sentinels are exact-match lines bracketing the data window inside an
/// export (header/trailer records). Structural predicates reject lines that
/// do not look like data records at all.
#[derive(Debug, Clone)]
pub struct LineFilter {
    pub start_sentinel: Option<String>,
    pub end_sentinel: Option<String>,
    /// Drop empty and whitespace-only lines. On by default.
    pub skip_empty: bool,
    pub required_prefix: Option<String>,
    pub required_substring: Option<String>,
    pub required_suffix: Option<String>,
    /// Exact line length, in characters.
    pub required_length: Option<usize>,
    /// First line index considered, 0-based inclusive.
    pub first_index: Option<usize>,
    /// Last line index considered, 0-based inclusive.
    pub last_index: Option<usize>,
    /// Stop at the first structurally failing line instead of skipping it.
    pub stop_at_error: bool,
}

impl Default for LineFilter {
    fn default() -> Self {
        LineFilter {
            start_sentinel: None,
            end_sentinel: None,
            skip_empty: true,
            required_prefix: None,
            required_substring: None,
            required_suffix: None,
            required_length: None,
            first_index: None,
            last_index: None,
            stop_at_error: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOutcome {
    pub lines: Vec<String>,
    pub success: bool,
    pub skipped: usize,
}

impl FilterOutcome {
    fn failed() -> Self {
        FilterOutcome {
            lines: Vec::new(),
            success: false,
            skipped: 0,
        }
    }
}

/// Apply `filter` to `lines`, returning the surviving window in order.
///
/// The output is always a subsequence of the input window. A missing start
/// sentinel or an empty resolved window fails the whole call.
pub fn filter_lines<S: AsRef<str>>(lines: &[S], filter: &LineFilter) -> FilterOutcome {
    let n = lines.len() as i64;

    let mut start = filter.first_index.unwrap_or(0) as i64;
    if let Some(sentinel) = filter.start_sentinel.as_deref() {
        // The sentinel is allowed to sit immediately before the window.
        let from = (start - 1).max(0);
        let found = (from..n).find(|&i| lines[i as usize].as_ref() == sentinel);
        match found {
            Some(idx) if idx >= start => start = idx + 1,
            Some(_) => {}
            None => return FilterOutcome::failed(),
        }
    }

    let last = n - 1;
    let mut end = match filter.last_index {
        Some(idx) => (idx as i64).min(last),
        None => last,
    };
    if let Some(sentinel) = filter.end_sentinel.as_deref() {
        if let Some(idx) = (start..n).find(|&i| lines[i as usize].as_ref() == sentinel) {
            if idx <= end {
                end = idx - 1;
            }
        }
    }

    if end < start {
        return FilterOutcome::failed();
    }

    let mut out = Vec::new();
    let mut skipped = 0usize;
    let mut success = true;

    for i in start..=end {
        let line = lines[i as usize].as_ref();

        let structural_failure = filter
            .required_length
            .map_or(false, |len| line.chars().count() != len)
            || filter
                .required_prefix
                .as_deref()
                .map_or(false, |p| !line.starts_with(p))
            || filter
                .required_substring
                .as_deref()
                .map_or(false, |s| !line.contains(s))
            || filter
                .required_suffix
                .as_deref()
                .map_or(false, |s| !line.ends_with(s));

        if structural_failure {
            success = false;
            if filter.stop_at_error {
                skipped = (end - i + 1) as usize;
                break;
            }
            skipped += 1;
            continue;
        }

        if filter.skip_empty && line.trim().is_empty() {
            skipped += 1;
            continue;
        }

        out.push(line.to_string());
    }

    FilterOutcome {
        lines: out,
        success,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_predicates_passes_everything() {
        let input = lines(&["a", "b", "c"]);
        let out = filter_lines(&input, &LineFilter::default());
        assert!(out.success);
        assert_eq!(out.lines, vec!["a", "b", "c"]);
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_sentinel_window() {
        let input = lines(&["HDR", "a", "b", "TRL", "c"]);
        let filter = LineFilter {
            start_sentinel: Some("HDR".into()),
            end_sentinel: Some("TRL".into()),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(out.success);
        assert_eq!(out.lines, vec!["a", "b"]);
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_missing_start_sentinel_fails() {
        let input = lines(&["a", "b"]);
        let filter = LineFilter {
            start_sentinel: Some("HDR".into()),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(!out.success);
        assert!(out.lines.is_empty());
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_start_sentinel_just_before_window() {
        // first_index = 1, sentinel at 0: the window keeps its start.
        let input = lines(&["HDR", "a", "b"]);
        let filter = LineFilter {
            start_sentinel: Some("HDR".into()),
            first_index: Some(1),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(out.success);
        assert_eq!(out.lines, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_end_sentinel_keeps_tail() {
        let input = lines(&["HDR", "a", "b"]);
        let filter = LineFilter {
            start_sentinel: Some("HDR".into()),
            end_sentinel: Some("TRL".into()),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(out.success);
        assert_eq!(out.lines, vec!["a", "b"]);
    }

    #[test]
    fn test_index_window_clamped() {
        let input = lines(&["a", "b", "c", "d"]);
        let filter = LineFilter {
            first_index: Some(1),
            last_index: Some(99),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert_eq!(out.lines, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_empty_window_fails() {
        let input = lines(&["a", "b"]);
        let filter = LineFilter {
            first_index: Some(5),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(!out.success);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn test_empty_input_fails() {
        let input: Vec<String> = Vec::new();
        let out = filter_lines(&input, &LineFilter::default());
        assert!(!out.success);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn test_skip_empty_lines() {
        let input = lines(&["a", "", "   ", "b"]);
        let out = filter_lines(&input, &LineFilter::default());
        assert!(out.success);
        assert_eq!(out.lines, vec!["a", "b"]);
        assert_eq!(out.skipped, 2);
    }

    #[test]
    fn test_keep_empty_lines_when_disabled() {
        let input = lines(&["a", "", "b"]);
        let filter = LineFilter {
            skip_empty: false,
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert_eq!(out.lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_structural_predicates() {
        let input = lines(&["REC|one", "REC|two", "junk", "REC|three"]);
        let filter = LineFilter {
            required_prefix: Some("REC".into()),
            required_substring: Some("|".into()),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(!out.success);
        assert_eq!(out.lines, vec!["REC|one", "REC|two", "REC|three"]);
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn test_required_length_counts_chars() {
        let input = lines(&["abc", "åäö", "abcd"]);
        let filter = LineFilter {
            required_length: Some(3),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(!out.success);
        assert_eq!(out.lines, vec!["abc", "åäö"]);
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn test_required_suffix() {
        let input = lines(&["a;", "b", "c;"]);
        let filter = LineFilter {
            required_suffix: Some(";".into()),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(!out.success);
        assert_eq!(out.lines, vec!["a;", "c;"]);
    }

    #[test]
    fn test_stop_at_error_counts_remainder() {
        let input = lines(&["REC|a", "junk", "REC|b", "REC|c"]);
        let filter = LineFilter {
            required_prefix: Some("REC".into()),
            stop_at_error: true,
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert!(!out.success);
        assert_eq!(out.lines, vec!["REC|a"]);
        // The failing line plus everything after it.
        assert_eq!(out.skipped, 3);
    }

    #[test]
    fn test_output_is_ordered_subsequence() {
        let input = lines(&["x", "REC|a", "", "REC|b", "y"]);
        let filter = LineFilter {
            first_index: Some(1),
            last_index: Some(3),
            required_prefix: Some("REC".into()),
            ..LineFilter::default()
        };
        let out = filter_lines(&input, &filter);
        assert_eq!(out.lines, vec!["REC|a", "REC|b"]);
    }
}
