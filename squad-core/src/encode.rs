//! Section encoders and the two-pass file writer
//!
//! Bodies are written after a placeholder header and section table; once
//! every body's offset and size is known the writer seeks back and patches
//! the table (and, for FBCH, the file size).

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::BinWrite;

use crate::bytes::ByteWriter;
use crate::database::{Database, Tabled};
use crate::error::{Error, Result};
use crate::file::CodecConfig;
use crate::format::{FileHeader, SectionDescriptor, SectionKind, SizeField, HEADER_SIZE};
use crate::observer::{Event, Observer};
use crate::records::{
    Country, EntityId, Kit, League, Player, Stadium, StatGroup, Team, Tournament,
};
use crate::string::{
    TextEncoding::{Latin1, Utf8},
    MAX_PREFIXED_LEN,
};

/// Serializes one record, including its leading ID
pub trait EncodeRecord: Tabled {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter);
}

/// Reserve a `u32` length and return where it lives
fn length_placeholder(out: &mut ByteWriter) -> usize {
    let at = out.len();
    out.put_u32(0);
    at
}

/// Fill a placeholder with the number of bytes written since it
fn patch_length(out: &mut ByteWriter, at: usize) {
    let len = out.len() - at - 4;
    out.patch_u32(at, len as u32);
}

impl EncodeRecord for Country {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        out.put_str8("name", &self.name, Latin1);
        out.put_str8("short_name", &self.short_name, Latin1);
        out.put_fixed_str("abbreviation", &self.abbreviation, Country::ABBREVIATION_LEN);
        out.put_fixed_str("confederation", &self.confederation, Country::CONFEDERATION_LEN);
        out.put_fixed_str("iso_code", &self.iso_code, Country::ISO_CODE_LEN);
        out.put_u8(self.level);
        out.put_u8(self.rating);
        out.put_fixed_str("flag_code", &self.flag_code, Country::FLAG_CODE_LEN);
    }
}

impl EncodeRecord for League {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        let len_at = length_placeholder(out);
        out.put_str8("name", &self.name, Utf8);
        out.put_str8("country", &self.country, Utf8);
        out.put_u8(self.division);
        out.put_u8(self.team_count);
        out.put_bytes(&self.extra);
        patch_length(out, len_at);
    }
}

impl EncodeRecord for Team {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        out.put_str8("name", &self.name, Utf8);
        for field in self.unstored_columns() {
            out.push_issue(Error::Unstored { field });
        }
    }
}

fn put_stat_group(out: &mut ByteWriter, field: &'static str, group: &StatGroup) {
    if group.len() > MAX_PREFIXED_LEN {
        out.push_issue(Error::EncodeOverflow {
            field,
            max: MAX_PREFIXED_LEN,
            actual: group.len(),
        });
    }
    let kept = group.len().min(MAX_PREFIXED_LEN);
    out.put_u8(kept as u8);
    for stat in group.iter().take(kept) {
        out.put_str8(field, &stat.name, Utf8);
        out.put_u8(stat.value);
    }
}

impl EncodeRecord for Player {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        let size_at = length_placeholder(out);
        out.put_str8("name", &self.name, Utf8);
        out.put_u8(self.overall);
        out.put_str8("position", &self.position, Utf8);
        out.put_u8(self.age);
        out.put_str8("team", &self.team, Utf8);
        out.put_str8("nationality", &self.nationality, Utf8);
        out.put_u16(self.height);
        out.put_u16(self.weight);
        out.put_u8(self.foot.code());
        out.put_str8("league", &self.league, Utf8);
        put_stat_group(out, "attack_stats", &self.attack);
        put_stat_group(out, "midfield_stats", &self.midfield);
        put_stat_group(out, "defense_stats", &self.defense);
        put_stat_group(out, "gk_stats", &self.goalkeeping);
        patch_length(out, size_at);
    }
}

impl EncodeRecord for Stadium {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        out.put_str8("name", &self.name, Utf8);
        out.put_str8("city", &self.city, Utf8);
        out.put_str8("country", &self.country, Utf8);
        out.put_u32(self.capacity);
        out.put_str8("team", &self.team, Utf8);
        out.put_u16(self.built);
    }
}

impl EncodeRecord for Tournament {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        out.put_str8("name", &self.name, Utf8);
        out.put_u8(self.kind.code());
        out.put_str8("region", &self.region, Utf8);
        out.put_u16(self.team_count);
        out.put_str8("prize", &self.prize, Utf8);
        out.put_str8("champion", &self.champion, Utf8);
    }
}

impl EncodeRecord for Kit {
    fn encode_record(&self, id: EntityId, out: &mut ByteWriter) {
        out.put_u32(id);
        out.put_str8("team", &self.team, Utf8);
        out.put_str8("season", &self.season, Utf8);
        out.put_u8(self.kind.code());
        out.put_bytes(&self.color1.to_bytes());
        out.put_bytes(&self.color2.to_bytes());
        out.put_str8("brand", &self.brand, Utf8);
        out.put_str8("sponsor", &self.sponsor, Utf8);
    }
}

/// Encode a whole table in ascending ID order.
///
/// Truncations are reported per record as warnings on `observer`.
pub fn encode_records<T: EncodeRecord>(
    db: &Database,
    index: usize,
    observer: &dyn Observer,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (&id, record) in db.table::<T>() {
        let mut out = ByteWriter::new();
        record.encode_record(id, &mut out);
        let (bytes, issues) = out.into_parts();
        for issue in issues {
            observer.on_event(
                &Event::warning(format!("{} {}: {}", T::KIND, id, issue)).in_section(index),
            );
        }
        body.extend_from_slice(&bytes);
    }
    body
}

/// Encode the body of one section
pub fn encode_section(
    db: &Database,
    kind: SectionKind,
    index: usize,
    observer: &dyn Observer,
) -> Vec<u8> {
    match kind {
        SectionKind::Countries => encode_records::<Country>(db, index, observer),
        SectionKind::Leagues => encode_records::<League>(db, index, observer),
        SectionKind::Teams => encode_records::<Team>(db, index, observer),
        SectionKind::Players => encode_records::<Player>(db, index, observer),
        SectionKind::Stadiums => encode_records::<Stadium>(db, index, observer),
        SectionKind::Tournaments => encode_records::<Tournament>(db, index, observer),
        SectionKind::Kits => encode_records::<Kit>(db, index, observer),
    }
}

fn to_u32(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::EncodeOverflow {
        field,
        max: u32::MAX as usize,
        actual: value as usize,
    })
}

/// Write `db` as a complete squad file.
///
/// The magic is `db.magic`, or `config.default_magic` when the database has
/// none. Empty tables get no section. Offsets are relative to the position
/// of `writer` on entry. Returns the number of bytes written.
pub fn write_database<W: Write + Seek>(
    db: &Database,
    writer: &mut W,
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<u64> {
    let magic = db.magic.unwrap_or(config.default_magic);
    let numbering = magic.numbering();
    let kinds: Vec<SectionKind> = numbering
        .write_order()
        .into_iter()
        .filter(|&kind| db.len_of(kind) > 0)
        .collect();

    observer.on_event(&Event::info(format!(
        "Writing {} version {} with {} sections",
        magic,
        db.version,
        kinds.len()
    )));

    let start = writer.stream_position()?;
    FileHeader {
        magic: magic.as_bytes(),
        version: db.version,
        section_count: kinds.len() as u32,
    }
    .write(writer)?;
    if magic.has_size_field() {
        SizeField::default().write(writer)?;
    }

    let table_pos = writer.stream_position()?;
    for &kind in &kinds {
        SectionDescriptor::new(numbering.code(kind), 0, 0).write(writer)?;
    }

    let mut descriptors = Vec::with_capacity(kinds.len());
    for (index, &kind) in kinds.iter().enumerate() {
        let offset = writer.stream_position()? - start;
        let body = encode_section(db, kind, index, observer);
        writer.write_all(&body)?;

        let desc = SectionDescriptor::new(
            numbering.code(kind),
            to_u32("section offset", offset)?,
            to_u32("section size", body.len() as u64)?,
        );
        observer.on_event(
            &Event::debug(format!(
                "Wrote {} {} records ({} bytes)",
                db.len_of(kind),
                kind,
                desc.size
            ))
            .in_section(index)
            .at(offset),
        );
        descriptors.push(desc);
    }

    let end = writer.stream_position()?;
    let total = end - start;

    writer.seek(SeekFrom::Start(table_pos))?;
    for desc in &descriptors {
        desc.write(writer)?;
    }
    if magic.has_size_field() {
        writer.seek(SeekFrom::Start(start + HEADER_SIZE))?;
        SizeField {
            file_size: to_u32("file size", total)?,
            padding: 0,
        }
        .write(writer)?;
    }
    writer.seek(SeekFrom::Start(end))?;

    Ok(total)
}

/// Encode `db` into a fresh buffer
pub fn encode_to_vec(db: &Database, config: &CodecConfig, observer: &dyn Observer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_database(db, &mut cursor, config, observer)?;
    Ok(cursor.into_inner())
}
