//! Loading and saving squad files
//!
//! A load validates the header and section table first, then reads each
//! section body in bounded chunks and hands it to its decoder. A save encodes
//! into a temporary sibling file and renames it over the target, so a failed
//! save never leaves a half-written file in place.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::database::{Database, Tabled};
use crate::decode::decode_section;
use crate::encode::write_database;
use crate::error::{Error, Result};
use crate::format::{Magic, SectionDescriptor};
use crate::observer::{Event, Observer, TracingObserver};
use crate::records::{Country, EntityId, Kit, League, Player, Stadium, Team, Tournament};
use crate::validate::read_layout;

/// Limits and defaults for load/save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Largest read issued while pulling in a section body
    pub chunk_size: usize,
    /// Section counts above this are a corrupt header
    pub max_sections: u32,
    /// Versions above this load with a warning
    pub max_version: u32,
    /// Magic written for a Database that has none
    pub default_magic: Magic,
    /// Version given to databases created from scratch
    pub default_version: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            max_sections: 100,
            max_version: 1000,
            default_magic: Magic::DEFAULT_LEGACY,
            default_version: 1,
        }
    }
}

impl CodecConfig {
    /// Empty database in the default format
    pub fn empty_database(&self) -> Database {
        Database::with_format(self.default_magic, self.default_version)
    }
}

/// Load a squad file with the default config, reporting through `tracing`
pub fn load(path: impl AsRef<Path>) -> Result<Database> {
    load_with(path, &CodecConfig::default(), &TracingObserver)
}

pub fn load_with(
    path: impl AsRef<Path>,
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<Database> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })?;
    let file_size = file.metadata()?.len();

    observer.on_event(&Event::debug(format!(
        "Loading {} ({} bytes)",
        path.display(),
        file_size
    )));

    let mut reader = BufReader::new(file);
    read_database(&mut reader, file_size, config, observer)
}

/// Decode a squad file that is already in memory
pub fn decode_bytes(data: &[u8], config: &CodecConfig, observer: &dyn Observer) -> Result<Database> {
    read_database(&mut Cursor::new(data), data.len() as u64, config, observer)
}

/// Decode a whole squad file from a stream of `file_size` bytes
pub fn read_database<R: Read + Seek>(
    reader: &mut R,
    file_size: u64,
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<Database> {
    let layout = read_layout(reader, file_size, config, observer)?;
    let numbering = layout.numbering();
    let mut db = Database::with_format(layout.magic, layout.version);

    for (index, desc) in layout.sections.iter().enumerate() {
        let body = read_section(reader, desc, config.chunk_size)?;
        decode_section(&mut db, numbering, index, desc, &body, observer);
    }

    observer.on_event(&Event::info(format!(
        "Loaded {} records from {} sections",
        db.record_count(),
        layout.sections.len()
    )));
    Ok(db)
}

fn read_section<R: Read + Seek>(
    reader: &mut R,
    desc: &SectionDescriptor,
    chunk_size: usize,
) -> Result<Vec<u8>> {
    let size = desc.size as usize;
    let mut body = Vec::with_capacity(size.min(chunk_size));
    let mut chunk = vec![0u8; size.min(chunk_size.max(1))];

    reader.seek(SeekFrom::Start(u64::from(desc.offset)))?;
    while body.len() < size {
        let n = (size - body.len()).min(chunk.len());
        reader.read_exact(&mut chunk[..n]).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::TruncatedInput {
                offset: u64::from(desc.offset) + body.len() as u64,
                expected: n as u64,
                available: 0,
            },
            _ => Error::Io(e),
        })?;
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(body)
}

/// Save with the default config, reporting through `tracing`
pub fn save(db: &Database, path: impl AsRef<Path>) -> Result<()> {
    save_with(db, path, &CodecConfig::default(), &TracingObserver)
}

/// Write `db` to `path` atomically.
///
/// The file is built next to `path` under a `.tmp` suffix, synced, and
/// renamed into place. On any failure the temporary file is removed and the
/// previous contents of `path` are untouched.
pub fn save_with(
    db: &Database,
    path: impl AsRef<Path>,
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = tmp_path_for(path);

    let result = write_atomic(db, path, &tmp_path, config, observer);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_atomic(
    db: &Database,
    path: &Path,
    tmp_path: &Path,
    config: &CodecConfig,
    observer: &dyn Observer,
) -> Result<()> {
    let written = {
        let file = File::create(tmp_path)?;
        let mut writer = BufWriter::new(file);
        let written = write_database(db, &mut writer, config, observer)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        file.sync_all()?;
        written
    };
    fs::rename(tmp_path, path)?;

    observer.on_event(&Event::info(format!(
        "Saved {} records ({} bytes) to {}",
        db.record_count(),
        written,
        path.display()
    )));
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("squad"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// A Database bound to the file it is persisted in.
///
/// Every `update_*`/`remove_*` call rewrites the whole file before
/// returning. When the save fails the in-memory change is rolled back.
pub struct SquadFile<O: Observer = TracingObserver> {
    path: PathBuf,
    db: Database,
    config: CodecConfig,
    observer: O,
}

impl SquadFile<TracingObserver> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, CodecConfig::default(), TracingObserver)
    }

    /// Write `db` to `path` and keep it bound there
    pub fn create(path: impl AsRef<Path>, db: Database) -> Result<Self> {
        Self::create_with(path, db, CodecConfig::default(), TracingObserver)
    }
}

impl<O: Observer> SquadFile<O> {
    pub fn open_with(path: impl AsRef<Path>, config: CodecConfig, observer: O) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = load_with(&path, &config, &observer)?;
        Ok(Self {
            path,
            db,
            config,
            observer,
        })
    }

    pub fn create_with(
        path: impl AsRef<Path>,
        db: Database,
        config: CodecConfig,
        observer: O,
    ) -> Result<Self> {
        let file = Self {
            path: path.as_ref().to_path_buf(),
            db,
            config,
            observer,
        };
        file.save()?;
        Ok(file)
    }

    /// Open `path`, or start from an empty database in the default format
    /// when it does not exist yet. Nothing is written until the first change.
    pub fn open_or_default(path: impl AsRef<Path>, config: CodecConfig, observer: O) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = match load_with(&path, &config, &observer) {
            Ok(db) => db,
            Err(Error::FileNotFound { .. }) => config.empty_database(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            db,
            config,
            observer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn save(&self) -> Result<()> {
        save_with(&self.db, &self.path, &self.config, &self.observer)
    }

    /// Save to `path` and keep using it; the old path is left as it was
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        save_with(&self.db, &path, &self.config, &self.observer)?;
        self.path = path;
        Ok(())
    }

    pub fn into_database(self) -> Database {
        self.db
    }

    fn commit<T: Tabled>(&mut self, id: EntityId, record: Option<T>) -> Result<Option<T>> {
        let table = self.db.table_mut::<T>();
        let previous = match record {
            Some(record) => table.insert(id, record),
            None => match table.remove(&id) {
                Some(removed) => Some(removed),
                None => return Ok(None),
            },
        };

        match self.save() {
            Ok(()) => Ok(previous),
            Err(e) => {
                let table = self.db.table_mut::<T>();
                match previous {
                    Some(previous) => {
                        table.insert(id, previous);
                    }
                    None => {
                        table.remove(&id);
                    }
                }
                Err(e)
            }
        }
    }
}

macro_rules! persisted_edits {
    ($($ty:ty => $update:ident, $remove:ident;)*) => {
        impl<O: Observer> SquadFile<O> {
            $(
                /// Insert or replace one record and rewrite the file
                pub fn $update(&mut self, id: EntityId, record: $ty) -> Result<Option<$ty>> {
                    self.commit(id, Some(record))
                }

                /// Remove one record and rewrite the file
                pub fn $remove(&mut self, id: EntityId) -> Result<Option<$ty>> {
                    self.commit::<$ty>(id, None)
                }
            )*
        }
    };
}

persisted_edits! {
    Country => update_country, remove_country;
    League => update_league, remove_league;
    Team => update_team, remove_team;
    Player => update_player, remove_player;
    Stadium => update_stadium, remove_stadium;
    Tournament => update_tournament, remove_tournament;
    Kit => update_kit, remove_kit;
}
