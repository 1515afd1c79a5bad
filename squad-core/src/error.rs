//! Error types for squad-core

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Binary format error: {0}")]
    BinRw(String),

    #[error("Squad file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Truncated input at offset {offset}: needed {expected} bytes, {available} available")]
    TruncatedInput {
        offset: u64,
        expected: u64,
        available: u64,
    },

    #[error("Corrupt header at offset {offset}: {reason}")]
    CorruptHeader { offset: u64, reason: String },

    #[error(
        "Corrupt section table entry {index} (type 0x{type_code:02x}): \
         offset {offset} + size {size} exceeds file size {file_size}"
    )]
    CorruptSectionTable {
        index: usize,
        type_code: u32,
        offset: u32,
        size: u32,
        file_size: u64,
    },

    #[error("Unsupported format: magic {}", escape_magic(magic))]
    UnsupportedFormat { magic: [u8; 4] },

    #[error("Record decode error in section {section} at offset {offset}: {reason}")]
    RecordDecode {
        section: usize,
        offset: u64,
        reason: String,
    },

    #[error("Field '{field}' truncated: {actual} bytes exceeds {max}")]
    EncodeOverflow {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' cannot encode {character:?} as Latin-1")]
    Unrepresentable { field: &'static str, character: char },

    #[error("Field '{field}' is not stored in squad files and was not written")]
    Unstored { field: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::Io(io) => Error::Io(io),
            other => Error::BinRw(other.to_string()),
        }
    }
}

/// Render magic bytes for messages, escaping anything non-printable.
pub(crate) fn escape_magic(magic: &[u8; 4]) -> String {
    magic.escape_ascii().to_string()
}
