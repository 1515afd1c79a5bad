//! Command line tool for inspecting and converting squad files

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use squad_core::{
    hex_dump, load_with, save_with, validate_file, CodecConfig, Database, Magic, SectionKind,
    TracingObserver, ValidationReport,
};

/// Bytes shown by `sqd header`
const HEADER_DUMP_LEN: usize = 64;

#[derive(Parser)]
#[command(name = "sqd")]
#[command(about = "Squad file inspector and converter")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the header and section table without decoding records
    Check { file: PathBuf },

    /// Print the database (or one table) as JSON
    Dump {
        file: PathBuf,

        /// countries, leagues, teams, players, stadiums, tournaments or kits
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Load a squad file and save it in another format
    Convert {
        input: PathBuf,
        output: PathBuf,

        #[arg(short, long)]
        magic: Option<Magic>,

        #[arg(long)]
        version: Option<u32>,
    },

    /// Build a squad file from a JSON database
    Import {
        json: PathBuf,
        output: PathBuf,

        #[arg(short, long)]
        magic: Option<Magic>,
    },

    /// Hex dump of the first bytes of a file
    Header { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install logger: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = CodecConfig::default();

    match cli.command {
        Commands::Check { file } => {
            let report = validate_file(&file, &config)
                .with_context(|| format!("Cannot validate {}", file.display()))?;
            print_report(&report);
            if !report.valid {
                bail!("{} is not a valid squad file", file.display());
            }
        }
        Commands::Dump { file, table } => {
            let db = load(&file, &config)?;
            println!("{}", dump_json(&db, table.as_deref())?);
        }
        Commands::Convert {
            input,
            output,
            magic,
            version,
        } => {
            let mut db = load(&input, &config)?;
            if let Some(magic) = magic {
                db.magic = Some(magic);
            }
            if let Some(version) = version {
                db.version = version;
            }
            save(&db, &output, &config)?;
        }
        Commands::Import {
            json,
            output,
            magic,
        } => {
            let text = std::fs::read_to_string(&json)
                .with_context(|| format!("Cannot read {}", json.display()))?;
            let mut db: Database = serde_json::from_str(&text)
                .with_context(|| format!("Invalid database JSON in {}", json.display()))?;
            if let Some(magic) = magic {
                db.magic = Some(magic);
            }
            save(&db, &output, &config)?;
        }
        Commands::Header { file } => {
            let bytes = read_prefix(&file, HEADER_DUMP_LEN)?;
            print!("{}", hex_dump(&bytes, HEADER_DUMP_LEN));
        }
    }

    Ok(())
}

fn load(path: &Path, config: &CodecConfig) -> Result<Database> {
    let db = load_with(path, config, &TracingObserver)
        .with_context(|| format!("Cannot load {}", path.display()))?;
    info!(
        "Loaded {} records from {}",
        db.record_count(),
        path.display()
    );
    Ok(db)
}

fn save(db: &Database, path: &Path, config: &CodecConfig) -> Result<()> {
    save_with(db, path, config, &TracingObserver)
        .with_context(|| format!("Cannot save {}", path.display()))?;
    let magic = db.magic.unwrap_or(config.default_magic);
    info!("Wrote {} ({} v{})", path.display(), magic, db.version);
    Ok(())
}

fn dump_json(db: &Database, table: Option<&str>) -> Result<String> {
    let Some(name) = table else {
        return Ok(serde_json::to_string_pretty(db)?);
    };
    let Some(kind) = SectionKind::from_name(name) else {
        bail!("Unknown table '{}'", name);
    };
    let json = match kind {
        SectionKind::Countries => serde_json::to_string_pretty(db.countries()),
        SectionKind::Leagues => serde_json::to_string_pretty(db.leagues()),
        SectionKind::Teams => serde_json::to_string_pretty(db.teams()),
        SectionKind::Players => serde_json::to_string_pretty(db.players()),
        SectionKind::Stadiums => serde_json::to_string_pretty(db.stadiums()),
        SectionKind::Tournaments => serde_json::to_string_pretty(db.tournaments()),
        SectionKind::Kits => serde_json::to_string_pretty(db.kits()),
    }?;
    Ok(json)
}

fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut bytes = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn print_report(report: &ValidationReport) {
    println!("Squad File Validation Results");
    println!("=============================");
    println!();

    println!("Status: {}", if report.valid { "VALID" } else { "INVALID" });
    println!();

    let stats = &report.stats;
    println!("Layout:");
    println!("  File size: {} bytes", stats.file_size);
    if let Some(magic) = stats.magic {
        println!("  Format: {} (version {})", magic, stats.version);
        println!("  Sections: {}", stats.section_count);
    }
    for (kind, totals) in &stats.by_kind {
        println!(
            "  {}: {} section(s), {} bytes",
            kind, totals.sections, totals.bytes
        );
    }
    if stats.unknown_sections > 0 {
        println!("  Unknown: {} section(s)", stats.unknown_sections);
    }
    println!();

    if !report.errors.is_empty() {
        println!("Errors:");
        for err in &report.errors {
            println!("  - {}", err);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warn in &report.warnings {
            println!("  - {}", warn);
        }
        println!();
    }
}
