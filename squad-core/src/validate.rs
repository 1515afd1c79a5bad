//! Header and section table validation
//!
//! Reads the container layout without touching any record:
//!
//! 1. file is at least [`HEADER_SIZE`] bytes
//! 2. magic is one of the known variants
//! 3. version is within the configured range (warning only)
//! 4. section count is within the configured limit
//! 5. every descriptor lies inside the file
//!
//! Steps 1, 2, 4 and 5 are fatal. [`read_layout`] is what a full load runs
//! first; [`validate_bytes`] and [`validate_file`] wrap it in a dry-run report.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use binrw::BinRead;

use crate::error::{Error, Result};
use crate::file::CodecConfig;
use crate::format::{
    FileHeader, Magic, Numbering, SectionDescriptor, SectionKind, SizeField, DESCRIPTOR_SIZE,
    HEADER_SIZE,
};
use crate::observer::{CollectingObserver, Event, Observer, Severity};

/// Validated container layout of a squad file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub magic: Magic,
    pub version: u32,
    /// Size recorded in the FBCH header extension
    pub declared_size: Option<u32>,
    pub sections: Vec<SectionDescriptor>,
}

impl Layout {
    pub fn numbering(&self) -> Numbering {
        self.magic.numbering()
    }

    /// Bytes taken by the header and section table
    pub fn table_end(&self) -> u64 {
        self.magic.table_start() + DESCRIPTOR_SIZE * self.sections.len() as u64
    }
}

/// Read and check the header and section table of a squad file.
///
/// `file_size` is the total length of the stream. The stream is rewound to
/// the start first; on success it is left just past the section table.
pub fn read_layout<R: Read + Seek>(
    reader: &mut R,
    file_size: u64,
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<Layout> {
    if file_size < HEADER_SIZE {
        return Err(Error::CorruptHeader {
            offset: 0,
            reason: format!(
                "file is {} bytes, smaller than the {} byte header",
                file_size, HEADER_SIZE
            ),
        });
    }

    reader.seek(SeekFrom::Start(0))?;
    let header = FileHeader::read(reader)?;
    let magic = Magic::from_bytes(header.magic)?;

    observer.on_event(&Event::info(format!(
        "Detected file format: {} (version {}, {} sections)",
        magic, header.version, header.section_count
    )));

    if header.version > config.max_version {
        observer.on_event(
            &Event::warning(format!(
                "Unusual version {} (expected at most {})",
                header.version, config.max_version
            ))
            .at(4),
        );
    }

    if header.section_count > config.max_sections {
        return Err(Error::CorruptHeader {
            offset: 8,
            reason: format!(
                "section count {} exceeds limit {}",
                header.section_count, config.max_sections
            ),
        });
    }

    let table_start = magic.table_start();
    let required = table_start + DESCRIPTOR_SIZE * u64::from(header.section_count);
    if file_size < required {
        return Err(Error::TruncatedInput {
            offset: HEADER_SIZE,
            expected: required - HEADER_SIZE,
            available: file_size - HEADER_SIZE,
        });
    }

    let declared_size = if magic.has_size_field() {
        let size = SizeField::read(reader)?;
        if u64::from(size.file_size) != file_size {
            observer.on_event(
                &Event::warning(format!(
                    "Declared file size {} does not match actual size {}",
                    size.file_size, file_size
                ))
                .at(HEADER_SIZE),
            );
        }
        Some(size.file_size)
    } else {
        None
    };

    let numbering = magic.numbering();
    let mut sections = Vec::with_capacity(header.section_count as usize);
    for index in 0..header.section_count as usize {
        let desc = SectionDescriptor::read(reader)?;
        if desc.end() > file_size {
            return Err(Error::CorruptSectionTable {
                index,
                type_code: desc.type_code,
                offset: desc.offset,
                size: desc.size,
                file_size,
            });
        }

        let name = numbering
            .kind(desc.type_code)
            .map(SectionKind::name)
            .unwrap_or("unknown");
        observer.on_event(
            &Event::info(format!(
                "Section {}: type 0x{:02x} ({}), offset {}, size {}",
                index, desc.type_code, name, desc.offset, desc.size
            ))
            .in_section(index)
            .at(table_start + DESCRIPTOR_SIZE * index as u64),
        );
        sections.push(desc);
    }

    Ok(Layout {
        magic,
        version: header.version,
        declared_size,
        sections,
    })
}

/// Per-kind totals from the section table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SectionStats {
    pub sections: u32,
    pub bytes: u64,
}

/// Layout statistics gathered during a dry run
#[derive(Debug, Default, Clone)]
pub struct LayoutStats {
    pub file_size: u64,
    pub magic: Option<Magic>,
    pub version: u32,
    pub section_count: u32,
    pub by_kind: BTreeMap<SectionKind, SectionStats>,
    pub unknown_sections: u32,
}

/// Result of a dry-run validation
#[derive(Debug)]
pub struct ValidationReport {
    pub valid: bool,
    pub stats: LayoutStats,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn new(file_size: u64) -> Self {
        Self {
            valid: true,
            stats: LayoutStats {
                file_size,
                ..LayoutStats::default()
            },
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn add_error(&mut self, msg: impl Into<String>) {
        self.valid = false;
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Validate an in-memory squad file without decoding records
pub fn validate_bytes(data: &[u8], config: &CodecConfig) -> ValidationReport {
    let mut cursor = Cursor::new(data);
    validate_stream(&mut cursor, data.len() as u64, config)
}

/// Validate a squad file on disk without decoding records.
///
/// Only the header and section table are read.
pub fn validate_file(path: impl AsRef<Path>, config: &CodecConfig) -> Result<ValidationReport> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    Ok(validate_stream(&mut reader, file_size, config))
}

fn validate_stream<R: Read + Seek>(
    reader: &mut R,
    file_size: u64,
    config: &CodecConfig,
) -> ValidationReport {
    let mut report = ValidationReport::new(file_size);
    let observer = CollectingObserver::new();

    let result = read_layout(reader, file_size, config, &observer);
    for event in observer.at_least(Severity::Warning) {
        report.add_warning(event.to_string());
    }

    let layout = match result {
        Ok(layout) => layout,
        Err(e) => {
            report.add_error(e.to_string());
            return report;
        }
    };

    report.stats.magic = Some(layout.magic);
    report.stats.version = layout.version;
    report.stats.section_count = layout.sections.len() as u32;

    let numbering = layout.numbering();
    let table_end = layout.table_end();
    for (index, desc) in layout.sections.iter().enumerate() {
        match numbering.kind(desc.type_code) {
            Some(kind) => {
                let entry = report.stats.by_kind.entry(kind).or_default();
                entry.sections += 1;
                entry.bytes += u64::from(desc.size);
                if desc.size == 0 {
                    report.add_warning(format!("Section {}: empty {} section", index, kind));
                }
            }
            None => {
                report.stats.unknown_sections += 1;
                report.add_warning(format!(
                    "Section {}: unknown type 0x{:02x} will be skipped",
                    index, desc.type_code
                ));
            }
        }

        if desc.size > 0 && u64::from(desc.offset) < table_end {
            report.add_warning(format!(
                "Section {}: body at offset {} overlaps the section table (ends at {})",
                index, desc.offset, table_end
            ));
        }
    }

    let mut spans: Vec<(usize, &SectionDescriptor)> = layout
        .sections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.size > 0)
        .collect();
    spans.sort_by_key(|(_, d)| d.offset);
    for pair in spans.windows(2) {
        let (a, first) = pair[0];
        let (b, second) = pair[1];
        if first.end() > u64::from(second.offset) {
            report.add_warning(format!("Sections {} and {} overlap", a, b));
        }
    }

    report
}

/// Render the first `limit` bytes as `offset: hex | ascii` lines
pub fn hex_dump(bytes: &[u8], limit: usize) -> String {
    let mut out = String::new();
    let shown = &bytes[..bytes.len().min(limit)];
    for (row, chunk) in shown.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}: ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{:02x} ", b);
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("| ");
        for &b in chunk {
            out.push(if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}
