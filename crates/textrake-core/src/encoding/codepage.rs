//! Character encodings named by their Windows/IANA code-page numbers.
//!
//! The classifier names many more code pages than it can decode. Pages with
//! a real decoder go through `encoding_rs` or one of the hand tables below
//! (UTF-32, true ISO-8859-1, US-ASCII and the IA5 national variants are
//! outside `encoding_rs`); every other page on the ASCII-compatible list is
//! a label only and decodes through the UTF-8 fallback.

use std::collections::HashMap;
use std::fmt;

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A character encoding identified by its numeric code page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodePage(pub u16);

impl CodePage {
    pub const UTF16_LE: CodePage = CodePage(1200);
    pub const UTF16_BE: CodePage = CodePage(1201);
    pub const WINDOWS_1252: CodePage = CodePage(1252);
    pub const IA5_GERMAN: CodePage = CodePage(20106);
    pub const IA5_SWEDISH: CodePage = CodePage(20107);
    pub const IA5_NORWEGIAN: CodePage = CodePage(20108);
    pub const US_ASCII: CodePage = CodePage(20127);
    pub const LATIN_1: CodePage = CodePage(28591);
    pub const LATIN_9: CodePage = CodePage(28605);
    pub const UTF32_LE: CodePage = CodePage(12000);
    pub const UTF32_BE: CodePage = CodePage(12001);
    pub const UTF8: CodePage = CodePage(65001);

    /// Sniff a leading byte-order mark. Returns the encoding it names and
    /// the BOM length in bytes. UTF-32 must be checked before UTF-16: the
    /// UTF-32 LE mark starts with the UTF-16 LE one.
    pub fn from_bom(bytes: &[u8]) -> Option<(CodePage, usize)> {
        if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
            Some((CodePage::UTF32_LE, 4))
        } else if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
            Some((CodePage::UTF32_BE, 4))
        } else if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            Some((CodePage::UTF8, 3))
        } else if bytes.starts_with(&[0xFF, 0xFE]) {
            Some((CodePage::UTF16_LE, 2))
        } else if bytes.starts_with(&[0xFE, 0xFF]) {
            Some((CodePage::UTF16_BE, 2))
        } else {
            None
        }
    }

    /// True for the fixed list of legacy single-byte (or ASCII-transparent)
    /// code pages the classifier may hand back for 7-bit content.
    pub fn is_ascii_compatible(self) -> bool {
        ASCII_COMPATIBLE.binary_search(&self.0).is_ok()
    }

    pub fn is_unicode_multibyte(self) -> bool {
        matches!(
            self,
            CodePage::UTF16_LE | CodePage::UTF16_BE | CodePage::UTF32_LE | CodePage::UTF32_BE
        )
    }

    /// The `encoding_rs` decoder registered for this page, if any.
    pub fn encoding(self) -> Option<&'static Encoding> {
        DECODERS.get(&self.0).copied()
    }

    /// Decode bytes to text, strictly under this encoding. Undecodable
    /// input yields U+FFFD, the marker the stabilizer watches for. Byte-order
    /// marks are not sniffed here: a BOM is buffer-head metadata, and this
    /// method is called on interior slices where those bytes are data. Pages
    /// without any real decoder fall back to lossy UTF-8, which is also
    /// transparent for plain ASCII.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            CodePage::UTF8 => encoding_rs::UTF_8
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            CodePage::UTF16_LE => encoding_rs::UTF_16LE
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            CodePage::UTF16_BE => encoding_rs::UTF_16BE
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            CodePage::UTF32_LE => decode_utf32(bytes, true),
            CodePage::UTF32_BE => decode_utf32(bytes, false),
            CodePage::US_ASCII => bytes
                .iter()
                .map(|&b| {
                    if b < 0x80 {
                        b as char
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
            // encoding_rs follows the WHATWG mapping of latin1 onto
            // windows-1252; true ISO-8859-1 is the identity over all 256
            // byte values.
            CodePage::LATIN_1 => bytes.iter().map(|&b| b as char).collect(),
            CodePage::IA5_GERMAN | CodePage::IA5_SWEDISH | CodePage::IA5_NORWEGIAN => {
                decode_ia5(self, bytes)
            }
            _ => match self.encoding() {
                Some(enc) => enc.decode_without_bom_handling(bytes).0.into_owned(),
                None => encoding_rs::UTF_8
                    .decode_without_bom_handling(bytes)
                    .0
                    .into_owned(),
            },
        }
    }

    /// Human-readable label for the well-known pages.
    pub fn label(self) -> Option<&'static str> {
        Some(match self {
            CodePage::UTF16_LE => "utf-16le",
            CodePage::UTF16_BE => "utf-16be",
            CodePage::UTF32_LE => "utf-32le",
            CodePage::UTF32_BE => "utf-32be",
            CodePage::UTF8 => "utf-8",
            CodePage::US_ASCII => "us-ascii",
            CodePage::WINDOWS_1252 => "windows-1252",
            CodePage::LATIN_1 => "iso-8859-1",
            CodePage::LATIN_9 => "iso-8859-15",
            CodePage::IA5_GERMAN => "ia5-german",
            CodePage::IA5_SWEDISH => "ia5-swedish",
            CodePage::IA5_NORWEGIAN => "ia5-norwegian",
            _ => return None,
        })
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "cp{}", self.0),
        }
    }
}

/// Sorted list of code pages treated as ASCII-compatible: DOS OEM pages,
/// Arabic ASMO, Windows ANSI pages, Mac script pages, the IA5 family,
/// US-ASCII, KOI8, the ISO-8859 family and UTF-8.
const ASCII_COMPATIBLE: &[u16] = &[
    437, 708, 720, 737, 775, 850, 852, 855, 857, 858, 860, 861, 862, 863, 864, 865, 866, 869, 874,
    1250, 1251, 1252, 1253, 1254, 1255, 1256, 1257, 1258, 10000, 10004, 10005, 10006, 10007,
    10010, 10017, 10021, 10029, 10079, 10081, 10082, 20105, 20106, 20107, 20108, 20127, 20866,
    21866, 28591, 28592, 28593, 28594, 28595, 28596, 28597, 28598, 28599, 28603, 28605, 65001,
];

/// One-time registry of the legacy pages `encoding_rs` can materialize.
/// Initialization is lazy and idempotent; pages absent here are names only.
static DECODERS: Lazy<HashMap<u16, &'static Encoding>> = Lazy::new(|| {
    let mut map: HashMap<u16, &'static Encoding> = HashMap::new();
    map.insert(708, encoding_rs::ISO_8859_6);
    map.insert(866, encoding_rs::IBM866);
    map.insert(874, encoding_rs::WINDOWS_874);
    map.insert(1250, encoding_rs::WINDOWS_1250);
    map.insert(1251, encoding_rs::WINDOWS_1251);
    map.insert(1252, encoding_rs::WINDOWS_1252);
    map.insert(1253, encoding_rs::WINDOWS_1253);
    map.insert(1254, encoding_rs::WINDOWS_1254);
    map.insert(1255, encoding_rs::WINDOWS_1255);
    map.insert(1256, encoding_rs::WINDOWS_1256);
    map.insert(1257, encoding_rs::WINDOWS_1257);
    map.insert(1258, encoding_rs::WINDOWS_1258);
    map.insert(10000, encoding_rs::MACINTOSH);
    map.insert(10007, encoding_rs::X_MAC_CYRILLIC);
    map.insert(10017, encoding_rs::X_MAC_CYRILLIC);
    map.insert(20866, encoding_rs::KOI8_R);
    map.insert(21866, encoding_rs::KOI8_U);
    map.insert(28592, encoding_rs::ISO_8859_2);
    map.insert(28593, encoding_rs::ISO_8859_3);
    map.insert(28594, encoding_rs::ISO_8859_4);
    map.insert(28595, encoding_rs::ISO_8859_5);
    map.insert(28596, encoding_rs::ISO_8859_6);
    map.insert(28597, encoding_rs::ISO_8859_7);
    map.insert(28598, encoding_rs::ISO_8859_8);
    // encoding_rs resolves iso-8859-9 to its windows superset.
    map.insert(28599, encoding_rs::WINDOWS_1254);
    map.insert(28603, encoding_rs::ISO_8859_13);
    map.insert(28605, encoding_rs::ISO_8859_15);
    map
});

fn decode_utf32(bytes: &[u8], little: bool) -> String {
    let mut out = String::with_capacity(bytes.len() / 4);
    let mut chunks = bytes.chunks_exact(4);
    for quad in &mut chunks {
        let value = if little {
            u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]])
        } else {
            u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])
        };
        out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    if !chunks.remainder().is_empty() {
        out.push(char::REPLACEMENT_CHARACTER);
    }
    out
}

/// National replacement letter for an IA5 variant, keyed off the ASCII
/// punctuation positions ISO/IEC 646 reassigns.
pub(crate) fn ia5_char(page: CodePage, b: u8) -> Option<char> {
    match page {
        CodePage::IA5_GERMAN => Some(match b {
            b'@' => '\u{00A7}',
            b'[' => 'Ä',
            b'\\' => 'Ö',
            b']' => 'Ü',
            b'{' => 'ä',
            b'|' => 'ö',
            b'}' => 'ü',
            b'~' => 'ß',
            _ => return None,
        }),
        CodePage::IA5_SWEDISH => Some(match b {
            b'@' => 'É',
            b'[' => 'Ä',
            b'\\' => 'Ö',
            b']' => 'Å',
            b'^' => 'Ü',
            b'`' => 'é',
            b'{' => 'ä',
            b'|' => 'ö',
            b'}' => 'å',
            b'~' => 'ü',
            _ => return None,
        }),
        CodePage::IA5_NORWEGIAN => Some(match b {
            b'[' => 'Æ',
            b'\\' => 'Ø',
            b']' => 'Å',
            b'{' => 'æ',
            b'|' => 'ø',
            b'}' => 'å',
            _ => return None,
        }),
        _ => None,
    }
}

fn decode_ia5(page: CodePage, bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b >= 0x80 {
                char::REPLACEMENT_CHARACTER
            } else {
                ia5_char(page, b).unwrap_or(b as char)
            }
        })
        .collect()
}
