//! Primitive reader/writer for squad file records
//!
//! Every multi-byte integer in a squad file is little-endian. There is exactly
//! one decode path per width; a short read is a [`Error::TruncatedInput`] that
//! names the absolute file offset where it happened.

use crate::error::{Error, Result};
use crate::string::{self, TextEncoding, MAX_PREFIXED_LEN};

/// Cursor over a byte slice that reports absolute file offsets in errors
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` within the file
    base: u64,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Reader over a section body that starts at `base` in the file
    pub fn with_base(data: &'a [u8], base: u64) -> Self {
        Self { data, pos: 0, base }
    }

    /// Position relative to the start of the slice
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position as an absolute file offset
    pub fn absolute_position(&self) -> u64 {
        self.base + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read exactly `n` bytes or fail without consuming anything
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.absolute_position(),
                expected: n as u64,
                available: self.remaining() as u64,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// `u8` length followed by that many bytes of text
    pub fn read_str8(&mut self, encoding: TextEncoding) -> Result<String> {
        let start = self.pos;
        let len = self.read_u8()? as usize;
        match self.read_exact(len) {
            Ok(bytes) => Ok(encoding.decode(bytes)),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    /// Fixed-width NUL-padded Latin-1 field
    pub fn read_fixed_str(&mut self, width: usize) -> Result<String> {
        let bytes = self.read_exact(width)?;
        Ok(string::decode_latin1(string::trim_trailing_nul(bytes)))
    }
}

/// Growable little-endian record buffer.
///
/// Fields that do not fit are truncated by a fixed rule and the truncation is
/// recorded as an issue instead of failing the write; the encoder forwards
/// issues to the observer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
    issues: Vec<Error>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn issues(&self) -> &[Error] {
        &self.issues
    }

    /// Record a non-fatal problem found while encoding
    pub fn push_issue(&mut self, issue: Error) {
        self.issues.push(issue);
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<Error>) {
        (self.buf, self.issues)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Overwrite a previously written `u32` (length placeholders)
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// `u8` length followed by the encoded text, truncated to 255 bytes
    pub fn put_str8(&mut self, field: &'static str, s: &str, encoding: TextEncoding) {
        let bytes = match encoding {
            TextEncoding::Utf8 => {
                let kept = string::truncate_utf8(s, MAX_PREFIXED_LEN);
                if kept.len() < s.len() {
                    self.overflow(field, MAX_PREFIXED_LEN, s.len());
                }
                kept.as_bytes().to_vec()
            }
            TextEncoding::Latin1 => {
                let mut bytes = self.latin1(field, s);
                if bytes.len() > MAX_PREFIXED_LEN {
                    self.overflow(field, MAX_PREFIXED_LEN, bytes.len());
                    bytes.truncate(MAX_PREFIXED_LEN);
                }
                bytes
            }
        };
        self.put_u8(bytes.len() as u8);
        self.put_bytes(&bytes);
    }

    /// Latin-1 text in exactly `width` bytes: NUL-padded, or cut to `width`
    pub fn put_fixed_str(&mut self, field: &'static str, s: &str, width: usize) {
        let mut bytes = self.latin1(field, s);
        if bytes.len() > width {
            self.overflow(field, width, bytes.len());
        }
        bytes.resize(width, 0);
        self.put_bytes(&bytes);
    }

    fn latin1(&mut self, field: &'static str, s: &str) -> Vec<u8> {
        let (bytes, rejected) = string::encode_latin1(s);
        if let Some(character) = rejected {
            self.issues.push(Error::Unrepresentable { field, character });
        }
        bytes
    }

    fn overflow(&mut self, field: &'static str, max: usize, actual: usize) {
        self.issues.push(Error::EncodeOverflow { field, max, actual });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_little_endian() {
        let mut r = ByteReader::new(&[0x78, 0x56, 0x34, 0x12, 0xFF]);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn test_read_exact_truncated_reports_absolute_offset() {
        let mut r = ByteReader::with_base(&[1, 2, 3], 100);
        r.read_u8().unwrap();
        match r.read_u32() {
            Err(Error::TruncatedInput { offset, expected, available }) => {
                assert_eq!(offset, 101);
                assert_eq!(expected, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
        // Failed read consumes nothing
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn test_read_str8_overrun_rewinds() {
        // Length byte says 10 but only 3 bytes follow
        let mut r = ByteReader::new(&[10, b'a', b'b', b'c']);
        assert!(r.read_str8(TextEncoding::Utf8).is_err());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_read_fixed_str_trims_padding() {
        let mut r = ByteReader::new(b"UEFA\0\0\0\0ENG\0\0\0");
        assert_eq!(r.read_fixed_str(8).unwrap(), "UEFA");
        assert_eq!(r.read_fixed_str(6).unwrap(), "ENG");
        assert!(r.is_empty());
    }

    #[test]
    fn test_put_u32_matches_read_u32() {
        let mut w = ByteWriter::new();
        w.put_u32(0xDEAD_BEEF);
        assert_eq!(w.as_bytes(), &[0xEF, 0xBE, 0xAD, 0xDE]);
        w.patch_u32(0, 7);
        assert_eq!(ByteReader::new(w.as_bytes()).read_u32().unwrap(), 7);
    }

    #[test]
    fn test_put_fixed_str_truncates_and_reports() {
        let mut w = ByteWriter::new();
        w.put_fixed_str("confederation", "CONMEBOL-SA", 8);
        assert_eq!(w.as_bytes(), b"CONMEBOL");
        assert!(matches!(
            w.issues(),
            [Error::EncodeOverflow { field: "confederation", max: 8, actual: 11 }]
        ));
    }

    #[test]
    fn test_put_fixed_str_pads_with_nul() {
        let mut w = ByteWriter::new();
        w.put_fixed_str("iso_code", "EN", 6);
        assert_eq!(w.as_bytes(), b"EN\0\0\0\0");
        assert!(w.issues().is_empty());
    }

    #[test]
    fn test_put_str8_truncates_long_text() {
        let long = "x".repeat(300);
        let mut w = ByteWriter::new();
        w.put_str8("name", &long, TextEncoding::Utf8);
        assert_eq!(w.as_bytes()[0], 255);
        assert_eq!(w.len(), 256);
        assert_eq!(w.issues().len(), 1);
    }
}
