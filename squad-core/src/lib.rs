//! squad-core: sectioned squad database files with read and write support
//!
//! This crate provides binary serialization for football squad files:
//! - FBCH (FC-style section numbering, with a file size field)
//! - SQDF, SQDB, SQD2, SQIL (legacy section numbering)
//!
//! Files are loaded into a [`Database`] of typed records and saved back
//! atomically. Diagnostics go to an injectable [`Observer`].

pub mod bytes;
pub mod database;
pub mod decode;
pub mod encode;
pub mod error;
pub mod file;
pub mod format;
pub mod observer;
pub mod records;
pub mod string;
pub mod validate;

pub use database::{Database, Table};
pub use encode::{encode_to_vec, write_database};
pub use error::{Error, Result};
pub use file::{decode_bytes, load, load_with, save, save_with, CodecConfig, SquadFile};
pub use format::{Magic, SectionKind};
pub use observer::{CollectingObserver, Event, NullObserver, Observer, Severity, TracingObserver};
pub use records::{
    Country, EntityId, FieldValue, Foot, Kit, KitKind, League, Player, Record, Rgb, Stadium,
    StatCategory, StatGroup, Team, Tournament, TournamentKind,
};
pub use validate::{hex_dump, read_layout, validate_bytes, validate_file, ValidationReport};
