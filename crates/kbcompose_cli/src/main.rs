//! `kbcompose` command line.
//!
//! Works on buffer files: plain text holding documents separated by
//! `--------` lines.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use kbcompose_core::analysis::coordinator::{apply_chunk_all, AnalysisCoordinator};
use kbcompose_core::analysis::fallback::LocalChunker;
use kbcompose_core::analysis::service::LogNotifier;
use kbcompose_core::buffer::mutation::append_imported;
use kbcompose_core::db::open_db;
use kbcompose_core::import::bundle::GroupBundle;
use kbcompose_core::import::text::import_file;
use kbcompose_core::repo::document_repo::SqliteDocumentRepository;
use kbcompose_core::{
    default_log_level, init_logging, ComposerConfig, ComposerSession, LibraryService,
};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "kbcompose", version, about = "Compose many documents in one buffer")]
struct Cli {
    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the logical documents of a buffer file.
    Parse { file: PathBuf },
    /// Print the document under a byte offset.
    Locate { file: PathBuf, position: i64 },
    /// Split every document with the local chunker.
    Chunk {
        file: PathBuf,
        /// Target chunk size in characters.
        #[arg(long)]
        max: Option<usize>,
        /// Rewrite the file instead of printing the result.
        #[arg(long)]
        in_place: bool,
    },
    /// Append a .txt/.md file to a buffer file as a new document.
    Append { file: PathBuf, source: PathBuf },
    /// Write a buffer file as a group bundle (JSON) to stdout.
    Export {
        file: PathBuf,
        #[arg(long)]
        group: String,
    },
    /// Import a group bundle into a library database.
    Import {
        bundle: PathBuf,
        #[arg(long)]
        db: PathBuf,
        /// Keep embeddings found in the bundle.
        #[arg(long)]
        use_vectors: bool,
    },
    /// Store every document of a buffer file in a library group.
    Add {
        file: PathBuf,
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        group: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ComposerConfig::load(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => ComposerConfig::default(),
    };

    if let Some(log_dir) = &cli.log_dir {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or(config.log_level.as_str());
        let log_dir = log_dir.to_str().context("log dir must be valid UTF-8")?;
        init_logging(level, log_dir)?;
    } else if cli.log_level.is_some() {
        bail!("--log-level needs --log-dir (default level: {})", default_log_level());
    }

    run(cli.command, &config).await
}

async fn run(command: Command, config: &ComposerConfig) -> Result<()> {
    match command {
        Command::Parse { file } => {
            let session = load_session(&file, config)?;
            for doc in session.documents() {
                println!(
                    "#{} bytes={}..{} chars={} key={} | {}",
                    doc.index,
                    doc.start_pos,
                    doc.end_pos,
                    doc.char_count,
                    doc.key.short(),
                    doc.preview.replace('\n', " ")
                );
            }
            println!("{} document(s)", session.documents().len());
        }
        Command::Locate { file, position } => {
            let mut session = load_session(&file, config)?;
            let cursor = session.set_cursor(position);
            match session.active_document() {
                Some(doc) => println!(
                    "cursor={} document={} ({})",
                    cursor,
                    doc.index,
                    doc.key.short()
                ),
                None => println!("cursor={} document=none", cursor),
            }
        }
        Command::Chunk {
            file,
            max,
            in_place,
        } => {
            let mut session = load_session(&file, config)?;
            let chunker = LocalChunker::new(max.unwrap_or(config.fallback_chunk_size));
            let coordinator =
                AnalysisCoordinator::from_config(Arc::new(chunker), Arc::new(LogNotifier), config);

            let outcome = coordinator.chunk_all(session.documents()).await;
            let split = apply_chunk_all(&mut session, &outcome.splits);
            info!(
                "event=cli_chunk module=cli status=ok split={} failed={}",
                split, outcome.summary.failed
            );
            eprintln!(
                "split {split} document(s); {} document(s) now",
                session.documents().len()
            );
            write_or_print(&file, session.buffer(), in_place)?;
        }
        Command::Append { file, source } => {
            let buffer = read_buffer(&file)?;
            let name = source
                .file_name()
                .and_then(|name| name.to_str())
                .context("source file name must be valid UTF-8")?;
            let bytes = std::fs::read(&source)
                .with_context(|| format!("failed to read `{}`", source.display()))?;
            let text = import_file(name, &bytes)?;
            write_or_print(&file, &append_imported(&buffer, &text), true)?;
        }
        Command::Export { file, group } => {
            let buffer = read_buffer(&file)?;
            let bundle = GroupBundle::from_buffer(group, &buffer, Utc::now());
            println!("{}", bundle.to_json_pretty()?);
        }
        Command::Import {
            bundle,
            db,
            use_vectors,
        } => {
            let raw = std::fs::read_to_string(&bundle)
                .with_context(|| format!("failed to read `{}`", bundle.display()))?;
            let bundle = GroupBundle::from_json(&raw)?;
            let conn = open_db(&db)?;
            let service = LibraryService::new(SqliteDocumentRepository::new(&conn));
            let summary = service.import_bundle(&bundle, use_vectors)?;
            println!(
                "imported {} of {} document(s) into `{}` (id {}), {} failed",
                summary.imported, summary.total, summary.group.name, summary.group.id, summary.failed
            );
        }
        Command::Add { file, db, group } => {
            let buffer = read_buffer(&file)?;
            let conn = open_db(&db)?;
            let service = LibraryService::new(SqliteDocumentRepository::new(&conn));
            let group = service.ensure_group(&group)?;
            let ids = service.bulk_add(&buffer, Some(group.id))?;
            println!("added {} document(s) to `{}`", ids.len(), group.name);
        }
    }
    Ok(())
}

fn read_buffer(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))
}

fn load_session(path: &Path, config: &ComposerConfig) -> Result<ComposerSession> {
    Ok(ComposerSession::with_buffer(
        config.parse_options(),
        read_buffer(path)?,
    ))
}

fn write_or_print(path: &Path, buffer: &str, in_place: bool) -> Result<()> {
    if in_place {
        std::fs::write(path, buffer)
            .with_context(|| format!("failed to write `{}`", path.display()))?;
    } else {
        println!("{buffer}");
    }
    Ok(())
}
