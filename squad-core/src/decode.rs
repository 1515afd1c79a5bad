//! Section decoders
//!
//! Each decoder sees only its section's bytes and parses records one after
//! another until the section is exhausted. A malformed record (a length that
//! overruns the section, an unknown enum code) ends decoding of that section
//! only: records decoded before it are kept and later sections are decoded
//! as usual.

use std::collections::btree_map::Entry;
use std::ops::{Deref, DerefMut};

use crate::bytes::ByteReader;
use crate::database::{Database, Tabled};
use crate::error::{Error, Result};
use crate::format::{Numbering, SectionDescriptor, SectionKind};
use crate::observer::{Event, Observer};
use crate::records::{
    Country, EntityId, Foot, Kit, KitKind, League, Player, Rgb, Stadium, StatGroup, Team,
    Tournament, TournamentKind,
};
use crate::string::TextEncoding::{Latin1, Utf8};

/// Record bytes of one section, plus what is needed to report problems
pub struct RecordInput<'a, 'o> {
    reader: ByteReader<'a>,
    section: usize,
    observer: &'o dyn Observer,
}

impl<'a, 'o> RecordInput<'a, 'o> {
    pub fn new(reader: ByteReader<'a>, section: usize, observer: &'o dyn Observer) -> Self {
        Self {
            reader,
            section,
            observer,
        }
    }

    /// Read `len` bytes and continue with a nested input scoped to them
    fn nested(&mut self, len: usize) -> Result<RecordInput<'a, 'o>> {
        let base = self.reader.absolute_position();
        let bytes = self.reader.read_exact(len)?;
        Ok(RecordInput::new(
            ByteReader::with_base(bytes, base),
            self.section,
            self.observer,
        ))
    }

    /// One-byte enum code, rejected when `parse` does not know it
    fn read_code<T>(&mut self, field: &str, parse: fn(u8) -> Option<T>) -> Result<T> {
        let offset = self.reader.absolute_position();
        let code = self.reader.read_u8()?;
        parse(code).ok_or_else(|| Error::RecordDecode {
            section: self.section,
            offset,
            reason: format!("unknown {} code {}", field, code),
        })
    }
}

impl<'a> Deref for RecordInput<'a, '_> {
    type Target = ByteReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl DerefMut for RecordInput<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.reader
    }
}

/// Parses one record, including its leading ID
pub trait DecodeRecord: Tabled {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)>;
}

impl DecodeRecord for Country {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let country = Country {
            name: input.read_str8(Latin1)?,
            short_name: input.read_str8(Latin1)?,
            abbreviation: input.read_fixed_str(Country::ABBREVIATION_LEN)?,
            confederation: input.read_fixed_str(Country::CONFEDERATION_LEN)?,
            iso_code: input.read_fixed_str(Country::ISO_CODE_LEN)?,
            level: input.read_u8()?,
            rating: input.read_u8()?,
            flag_code: input.read_fixed_str(Country::FLAG_CODE_LEN)?,
        };
        Ok((id, country))
    }
}

impl DecodeRecord for League {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let body_len = input.read_u32()? as usize;
        let mut body = input.nested(body_len)?;
        let league = League {
            name: body.read_str8(Utf8)?,
            country: body.read_str8(Utf8)?,
            division: body.read_u8()?,
            team_count: body.read_u8()?,
            extra: {
                let rest = body.remaining();
                body.read_exact(rest)?.to_vec()
            },
        };
        Ok((id, league))
    }
}

impl DecodeRecord for Team {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let team = Team::named(input.read_str8(Utf8)?);
        Ok((id, team))
    }
}

fn read_stat_group(input: &mut RecordInput<'_, '_>) -> Result<StatGroup> {
    let count = input.read_u8()?;
    let mut group = StatGroup::new();
    for _ in 0..count {
        let name = input.read_str8(Utf8)?;
        let value = input.read_u8()?;
        group.set(&name, value);
    }
    Ok(group)
}

impl DecodeRecord for Player {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let data_size = input.read_u32()? as usize;
        let mut blob = input.nested(data_size)?;
        let player = Player {
            name: blob.read_str8(Utf8)?,
            overall: blob.read_u8()?,
            position: blob.read_str8(Utf8)?,
            age: blob.read_u8()?,
            team: blob.read_str8(Utf8)?,
            nationality: blob.read_str8(Utf8)?,
            height: blob.read_u16()?,
            weight: blob.read_u16()?,
            foot: blob.read_code("foot", Foot::from_code)?,
            league: blob.read_str8(Utf8)?,
            attack: read_stat_group(&mut blob)?,
            midfield: read_stat_group(&mut blob)?,
            defense: read_stat_group(&mut blob)?,
            goalkeeping: read_stat_group(&mut blob)?,
        };
        if !blob.is_empty() {
            blob.observer.on_event(
                &Event::debug(format!(
                    "player {}: ignoring {} trailing blob bytes",
                    id,
                    blob.remaining()
                ))
                .in_section(blob.section)
                .at(blob.absolute_position()),
            );
        }
        Ok((id, player))
    }
}

impl DecodeRecord for Stadium {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let stadium = Stadium {
            name: input.read_str8(Utf8)?,
            city: input.read_str8(Utf8)?,
            country: input.read_str8(Utf8)?,
            capacity: input.read_u32()?,
            team: input.read_str8(Utf8)?,
            built: input.read_u16()?,
        };
        Ok((id, stadium))
    }
}

impl DecodeRecord for Tournament {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let tournament = Tournament {
            name: input.read_str8(Utf8)?,
            kind: input.read_code("tournament type", TournamentKind::from_code)?,
            region: input.read_str8(Utf8)?,
            team_count: input.read_u16()?,
            prize: input.read_str8(Utf8)?,
            champion: input.read_str8(Utf8)?,
        };
        Ok((id, tournament))
    }
}

impl DecodeRecord for Kit {
    fn decode_record(input: &mut RecordInput<'_, '_>) -> Result<(EntityId, Self)> {
        let id = input.read_u32()?;
        let kit = Kit {
            team: input.read_str8(Utf8)?,
            season: input.read_str8(Utf8)?,
            kind: input.read_code("kit type", KitKind::from_code)?,
            color1: Rgb::from_bytes(input.read_array()?),
            color2: Rgb::from_bytes(input.read_array()?),
            brand: input.read_str8(Utf8)?,
            sponsor: input.read_str8(Utf8)?,
        };
        Ok((id, kit))
    }
}

/// Decode every record of a section body.
///
/// Stops at the first malformed record and reports it; whatever was decoded
/// before that point is returned.
pub fn decode_records<T: DecodeRecord>(
    body: &[u8],
    desc: &SectionDescriptor,
    index: usize,
    observer: &dyn Observer,
) -> Vec<(EntityId, T)> {
    let base = u64::from(desc.offset);
    let mut input = RecordInput::new(ByteReader::with_base(body, base), index, observer);
    let mut records = Vec::new();

    while !input.is_empty() {
        let start = input.absolute_position();
        match T::decode_record(&mut input) {
            Ok(record) => records.push(record),
            Err(e) => {
                let undecoded = body.len() as u64 - (start - base);
                observer.on_event(
                    &Event::error(format!(
                        "{} record #{} is malformed, skipping last {} bytes of section: {}",
                        T::KIND,
                        records.len() + 1,
                        undecoded,
                        e
                    ))
                    .in_section(index)
                    .at(start),
                );
                break;
            }
        }
    }

    records
}

fn decode_into<T: DecodeRecord>(
    db: &mut Database,
    body: &[u8],
    desc: &SectionDescriptor,
    index: usize,
    observer: &dyn Observer,
) -> usize {
    let records = decode_records::<T>(body, desc, index, observer);
    let count = records.len();
    let table = db.table_mut::<T>();
    for (id, record) in records {
        match table.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                observer.on_event(
                    &Event::warning(format!("duplicate {} id {}, keeping the later record", T::KIND, id))
                        .in_section(index),
                );
                slot.insert(record);
            }
        }
    }
    count
}

/// Decode one section body into the matching table of `db`.
///
/// Returns the table the section was decoded into, or `None` when the type
/// code is unknown under `numbering` or the body is empty.
pub fn decode_section(
    db: &mut Database,
    numbering: Numbering,
    index: usize,
    desc: &SectionDescriptor,
    body: &[u8],
    observer: &dyn Observer,
) -> Option<SectionKind> {
    let Some(kind) = numbering.kind(desc.type_code) else {
        observer.on_event(
            &Event::warning(format!("Unknown section type: 0x{:02x}", desc.type_code))
                .in_section(index)
                .at(u64::from(desc.offset)),
        );
        return None;
    };

    if body.is_empty() {
        observer.on_event(
            &Event::warning(format!("Empty {} section (type 0x{:02x})", kind, desc.type_code))
                .in_section(index),
        );
        return None;
    }

    observer.on_event(
        &Event::debug(format!(
            "Parsing {} section (type 0x{:02x}) with {} bytes",
            kind,
            desc.type_code,
            body.len()
        ))
        .in_section(index)
        .at(u64::from(desc.offset)),
    );

    let count = match kind {
        SectionKind::Countries => decode_into::<Country>(db, body, desc, index, observer),
        SectionKind::Leagues => decode_into::<League>(db, body, desc, index, observer),
        SectionKind::Teams => decode_into::<Team>(db, body, desc, index, observer),
        SectionKind::Players => decode_into::<Player>(db, body, desc, index, observer),
        SectionKind::Stadiums => decode_into::<Stadium>(db, body, desc, index, observer),
        SectionKind::Tournaments => decode_into::<Tournament>(db, body, desc, index, observer),
        SectionKind::Kits => decode_into::<Kit>(db, body, desc, index, observer),
    };

    observer.on_event(&Event::info(format!("Decoded {} {}", count, kind)).in_section(index));
    Some(kind)
}
