//! Squad file container layout
//!
//! All squad files are little-endian:
//!
//! ```text
//! 0x00  magic[4]         FBCH | SQDF | SQDB | SQD2 | SQIL
//! 0x04  version: u32
//! 0x08  section_count: u32
//!       FBCH only: file_size: u32, padding: u32
//!       section_table[section_count] (16 bytes each):
//!           type: u32, offset: u32, size: u32, reserved: u32
//!       section bodies at their declared offset/size
//! ```
//!
//! The magic decides which section numbering the type codes use. FBCH files
//! use FC-style codes, every other magic uses the legacy codes.

use std::fmt;

use binrw::binrw;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Size of the fixed header: magic + version + section_count
pub const HEADER_SIZE: u64 = 12;

/// Size of the FBCH header extension: file_size + padding
pub const FBCH_EXTENSION_SIZE: u64 = 8;

/// Size of one section table entry
pub const DESCRIPTOR_SIZE: u64 = 16;

/// Known file format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Magic {
    Fbch,
    Sqdf,
    Sqdb,
    Sqd2,
    Sqil,
}

impl Magic {
    pub const ALL: [Magic; 5] = [Magic::Fbch, Magic::Sqdf, Magic::Sqdb, Magic::Sqd2, Magic::Sqil];

    /// Written when a Database has no magic of its own
    pub const DEFAULT_LEGACY: Magic = Magic::Sqdf;

    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        match &bytes {
            b"FBCH" => Ok(Magic::Fbch),
            b"SQDF" => Ok(Magic::Sqdf),
            b"SQDB" => Ok(Magic::Sqdb),
            b"SQD2" => Ok(Magic::Sqd2),
            b"SQIL" => Ok(Magic::Sqil),
            _ => Err(Error::UnsupportedFormat { magic: bytes }),
        }
    }

    pub fn as_bytes(self) -> [u8; 4] {
        *match self {
            Magic::Fbch => b"FBCH",
            Magic::Sqdf => b"SQDF",
            Magic::Sqdb => b"SQDB",
            Magic::Sqd2 => b"SQD2",
            Magic::Sqil => b"SQIL",
        }
    }

    pub fn numbering(self) -> Numbering {
        match self {
            Magic::Fbch => Numbering::Fc,
            Magic::Sqdf | Magic::Sqdb | Magic::Sqd2 | Magic::Sqil => Numbering::Legacy,
        }
    }

    /// FBCH files record their total size after the section count
    pub fn has_size_field(self) -> bool {
        self == Magic::Fbch
    }

    /// Bytes from the start of the file to the first section table entry
    pub fn table_start(self) -> u64 {
        if self.has_size_field() {
            HEADER_SIZE + FBCH_EXTENSION_SIZE
        } else {
            HEADER_SIZE
        }
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        // Every known magic is ASCII
        f.write_str(std::str::from_utf8(&bytes).unwrap_or("????"))
    }
}

impl std::str::FromStr for Magic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.to_ascii_uppercase();
        let bytes: [u8; 4] = upper
            .as_bytes()
            .try_into()
            .map_err(|_| Error::UnsupportedFormat {
                magic: pad_magic(upper.as_bytes()),
            })?;
        Magic::from_bytes(bytes)
    }
}

fn pad_magic(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    let n = bytes.len().min(4);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Entity tables stored in a squad file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Countries,
    Leagues,
    Teams,
    Players,
    Stadiums,
    Tournaments,
    Kits,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Countries,
        SectionKind::Leagues,
        SectionKind::Teams,
        SectionKind::Players,
        SectionKind::Stadiums,
        SectionKind::Tournaments,
        SectionKind::Kits,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Countries => "countries",
            SectionKind::Leagues => "leagues",
            SectionKind::Teams => "teams",
            SectionKind::Players => "players",
            SectionKind::Stadiums => "stadiums",
            SectionKind::Tournaments => "tournaments",
            SectionKind::Kits => "kits",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Section type code schemes.
///
/// The two schemes overlap in small integers but mean different tables, so
/// the scheme is always taken from the magic, never guessed from the codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    /// 0x01 teams, 0x02 players, 0x03 leagues, 0x04 countries,
    /// 0x05 stadiums, 0x06 tournaments, 0x07 kits
    Fc,
    /// 1 countries, 2 leagues, 3 teams, 4 players, 5 stadiums,
    /// 6 tournaments, 7 kits
    Legacy,
}

impl Numbering {
    /// Section order used when writing; ascending type code
    pub fn write_order(self) -> [SectionKind; 7] {
        use SectionKind::*;
        match self {
            Numbering::Fc => [Teams, Players, Leagues, Countries, Stadiums, Tournaments, Kits],
            Numbering::Legacy => SectionKind::ALL,
        }
    }

    pub fn kind(self, type_code: u32) -> Option<SectionKind> {
        let index = usize::try_from(type_code).ok()?.checked_sub(1)?;
        self.write_order().get(index).copied()
    }

    pub fn code(self, kind: SectionKind) -> u32 {
        use SectionKind::*;
        match self {
            Numbering::Fc => match kind {
                Teams => 0x01,
                Players => 0x02,
                Leagues => 0x03,
                Countries => 0x04,
                Stadiums => 0x05,
                Tournaments => 0x06,
                Kits => 0x07,
            },
            Numbering::Legacy => match kind {
                Countries => 0x01,
                Leagues => 0x02,
                Teams => 0x03,
                Players => 0x04,
                Stadiums => 0x05,
                Tournaments => 0x06,
                Kits => 0x07,
            },
        }
    }
}

/// Fixed file header
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub section_count: u32,
}

/// FBCH-only header extension between the section count and the table
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeField {
    pub file_size: u32,
    pub padding: u32,
}

/// One section table entry
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub type_code: u32,
    pub offset: u32,
    pub size: u32,
    pub reserved: u32,
}

impl SectionDescriptor {
    pub fn new(type_code: u32, offset: u32, size: u32) -> Self {
        Self {
            type_code,
            offset,
            size,
            reserved: 0,
        }
    }

    /// One past the last byte of the body, computed without overflow
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::{BinRead, BinWrite};
    use std::io::Cursor;

    #[test]
    fn test_magic_roundtrip_bytes() {
        for magic in Magic::ALL {
            assert_eq!(Magic::from_bytes(magic.as_bytes()).unwrap(), magic);
        }
        assert!(matches!(
            Magic::from_bytes(*b"ZZZZ"),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_magic_parse_and_display() {
        assert_eq!("fbch".parse::<Magic>().unwrap(), Magic::Fbch);
        assert_eq!(Magic::Sqd2.to_string(), "SQD2");
        assert!("SQ".parse::<Magic>().is_err());
    }

    #[test]
    fn test_numbering_from_magic() {
        assert_eq!(Magic::Fbch.numbering(), Numbering::Fc);
        assert_eq!(Magic::Sqil.numbering(), Numbering::Legacy);
    }

    #[test]
    fn test_fc_codes() {
        let n = Numbering::Fc;
        assert_eq!(n.kind(0x01), Some(SectionKind::Teams));
        assert_eq!(n.kind(0x02), Some(SectionKind::Players));
        assert_eq!(n.kind(0x03), Some(SectionKind::Leagues));
        assert_eq!(n.kind(0x04), Some(SectionKind::Countries));
        assert_eq!(n.code(SectionKind::Countries), 0x04);
        assert_eq!(n.kind(0), None);
        assert_eq!(n.kind(8), None);
    }

    #[test]
    fn test_legacy_codes() {
        let n = Numbering::Legacy;
        for (i, kind) in SectionKind::ALL.into_iter().enumerate() {
            assert_eq!(n.code(kind), i as u32 + 1);
            assert_eq!(n.kind(i as u32 + 1), Some(kind));
        }
    }

    #[test]
    fn test_code_agrees_with_write_order() {
        for n in [Numbering::Fc, Numbering::Legacy] {
            for (i, kind) in n.write_order().into_iter().enumerate() {
                assert_eq!(n.code(kind), i as u32 + 1);
                assert_eq!(n.kind(n.code(kind)), Some(kind));
            }
        }
        assert_eq!(Numbering::Fc.code(SectionKind::Kits), 0x07);
        assert_eq!(Numbering::Legacy.code(SectionKind::Teams), 0x03);
    }

    #[test]
    fn test_same_code_means_different_tables() {
        assert_eq!(Numbering::Fc.kind(1), Some(SectionKind::Teams));
        assert_eq!(Numbering::Legacy.kind(1), Some(SectionKind::Countries));
    }

    #[test]
    fn test_descriptor_layout() {
        let desc = SectionDescriptor::new(3, 0x40, 0x100);
        let mut cursor = Cursor::new(Vec::new());
        desc.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(bytes.len() as u64, DESCRIPTOR_SIZE);
        assert_eq!(&bytes[0..4], &3u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x40u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &0x100u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);

        let parsed = SectionDescriptor::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, desc);
    }

    #[test]
    fn test_descriptor_end_does_not_overflow() {
        let desc = SectionDescriptor::new(1, u32::MAX, u32::MAX);
        assert_eq!(desc.end(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_table_start() {
        assert_eq!(Magic::Fbch.table_start(), 20);
        assert_eq!(Magic::Sqdf.table_start(), 12);
    }
}
