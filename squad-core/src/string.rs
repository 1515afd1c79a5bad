//! String field encodings for squad files
//!
//! Squad files store text in two ways:
//! - UTF-8 with a Latin-1 fallback on read (teams, players, leagues, ...)
//! - Latin-1 only (countries)
//!
//! Length-prefixed strings carry a single length byte, so at most 255 bytes
//! of text survive. Fixed-width fields are NUL-padded on write and have
//! trailing NULs trimmed on read.

/// Maximum payload of a `u8`-length-prefixed string
pub const MAX_PREFIXED_LEN: usize = u8::MAX as usize;

/// Substitute written for characters Latin-1 cannot carry
pub const LATIN1_REPLACEMENT: u8 = b'?';

/// Byte encoding used by a table's string fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8 on write; UTF-8 with Latin-1 fallback on read
    Utf8,
    /// One byte per character, U+0000..=U+00FF
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => decode_utf8_or_latin1(bytes),
            TextEncoding::Latin1 => decode_latin1(bytes),
        }
    }
}

/// Decode Latin-1 bytes; every byte maps to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode UTF-8, falling back to Latin-1 when the bytes are not valid UTF-8
pub fn decode_utf8_or_latin1(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => decode_latin1(bytes),
    }
}

/// Encode as Latin-1.
///
/// Returns the bytes plus the first character that had to be replaced with
/// [`LATIN1_REPLACEMENT`], if any.
pub fn encode_latin1(s: &str) -> (Vec<u8>, Option<char>) {
    let mut rejected = None;
    let bytes = s
        .chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) => b,
            Err(_) => {
                rejected.get_or_insert(c);
                LATIN1_REPLACEMENT
            }
        })
        .collect();
    (bytes, rejected)
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Strip the NUL padding of a fixed-width field
pub fn trim_trailing_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_decode_high_bytes() {
        assert_eq!(decode_latin1(b"Espa\xf1a"), "España");
    }

    #[test]
    fn test_utf8_preferred() {
        assert_eq!(decode_utf8_or_latin1("Mbappé".as_bytes()), "Mbappé");
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_latin1() {
        // 0xE9 alone is not valid UTF-8
        assert_eq!(decode_utf8_or_latin1(b"Mbapp\xe9"), "Mbappé");
    }

    #[test]
    fn test_encode_latin1_replaces_wide_chars() {
        let (bytes, rejected) = encode_latin1("Łódź");
        assert_eq!(bytes, b"?\xf3d?");
        assert_eq!(rejected, Some('Ł'));

        let (bytes, rejected) = encode_latin1("Curaçao");
        assert_eq!(bytes, b"Cura\xe7ao");
        assert_eq!(rejected, None);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_utf8("abcdef", 4), "abcd");
        assert_eq!(truncate_utf8("abc", 10), "abc");
        // 'é' is two bytes; cutting at 5 would split it
        assert_eq!(truncate_utf8("abcdé", 5), "abcd");
    }

    #[test]
    fn test_trim_trailing_nul() {
        assert_eq!(trim_trailing_nul(b"UEFA\0\0\0\0"), b"UEFA");
        assert_eq!(trim_trailing_nul(b"\0\0\0"), b"");
        assert_eq!(trim_trailing_nul(b"A\0B\0"), b"A\0B");
    }
}
