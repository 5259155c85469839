/// Split a byte buffer into byte-lines at LF or CR+LF boundaries.
///
/// A lone CR is data, not a terminator. The final line is emitted even
/// without a trailing terminator; a trailing terminator does not produce an
/// empty extra line.
pub fn split_lines(bytes: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&bytes[start..i]);
                i += 1;
                start = i;
            }
            b'\r' if i + 1 < bytes.len() && bytes[i + 1] == b'\n' => {
                lines.push(&bytes[start..i]);
                i += 2;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&bytes[start..]);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lf_only() {
        let lines = split_lines(b"one\ntwo\nthree\n");
        assert_eq!(lines, vec![&b"one"[..], b"two", b"three"]);
    }

    #[test]
    fn test_crlf() {
        let lines = split_lines(b"one\r\ntwo\r\n");
        assert_eq!(lines, vec![&b"one"[..], b"two"]);
    }

    #[test]
    fn test_mixed_terminators() {
        let lines = split_lines(b"a\r\nb\nc");
        assert_eq!(lines, vec![&b"a"[..], b"b", b"c"]);
    }

    #[test]
    fn test_lone_cr_is_data() {
        let lines = split_lines(b"a\rb\nc");
        assert_eq!(lines, vec![&b"a\rb"[..], b"c"]);
    }

    #[test]
    fn test_trailing_cr_is_data() {
        let lines = split_lines(b"a\nb\r");
        assert_eq!(lines, vec![&b"a"[..], b"b\r"]);
    }

    #[test]
    fn test_no_trailing_terminator() {
        let lines = split_lines(b"only");
        assert_eq!(lines, vec![&b"only"[..]]);
    }

    #[test]
    fn test_empty_buffer() {
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn test_empty_interior_lines_kept() {
        let lines = split_lines(b"a\n\n\nb\n");
        assert_eq!(lines, vec![&b"a"[..], b"", b"", b"b"]);
    }

    #[test]
    fn test_lossless_reassembly() {
        let buf = b"alpha\nbeta\ngamma";
        let lines = split_lines(buf);
        let rebuilt: Vec<u8> = lines.join(&b'\n');
        assert_eq!(rebuilt, buf);
    }
}
