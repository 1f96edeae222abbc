//! Command definitions and dispatch for the `delib` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use delib_core::{JsonlExporter, Pipeline, PipelineConfig};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "delib",
    about = "Normalize LLM-Deliberation negotiation transcripts for analysis ingestion"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export every session in a data directory to a JSON Lines file
    Export {
        /// Directory holding config.txt and the history*.json trajectory files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Output JSONL file, one canonical record per line
        #[arg(short, long)]
        out: PathBuf,

        /// Agent configuration file (defaults to <data-dir>/config.txt)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Deal shape file (defaults to <data-dir>/shape.yaml)
        #[arg(long)]
        shape: Option<PathBuf>,
    },

    /// Parse and validate sessions without writing any output
    Check {
        /// Directory holding config.txt and the history*.json trajectory files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Check a single trajectory file instead of the whole directory
        #[arg(long)]
        file: Option<PathBuf>,

        /// Agent configuration file (defaults to <data-dir>/config.txt)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Deal shape file (defaults to <data-dir>/shape.yaml)
        #[arg(long)]
        shape: Option<PathBuf>,
    },
}

impl Cli {
    /// Log directory for commands that keep a file log, `None` otherwise.
    pub fn log_dir(&self) -> Option<PathBuf> {
        match &self.command {
            Commands::Export { data_dir, .. } => {
                Some(data_dir.join(".delib").join("logs"))
            }
            Commands::Check { .. } => None,
        }
    }

    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Export {
                data_dir,
                out,
                config,
                shape,
            } => run_export(data_dir, out, config, shape).await,
            Commands::Check {
                data_dir,
                file,
                config,
                shape,
            } => run_check(data_dir, file, config, shape),
        }
    }
}

fn build_pipeline(
    data_dir: PathBuf,
    config: Option<PathBuf>,
    shape: Option<PathBuf>,
) -> Result<Pipeline> {
    let pipeline_config = PipelineConfig::builder()
        .data_dir(data_dir)
        .config_path(config)
        .shape_path(shape)
        .build();
    Ok(Pipeline::new(pipeline_config)?)
}

async fn run_export(
    data_dir: PathBuf,
    out: PathBuf,
    config: Option<PathBuf>,
    shape: Option<PathBuf>,
) -> Result<()> {
    let pipeline = build_pipeline(data_dir, config, shape)?;
    info!(out = %out.display(), "exporting sessions");

    let mut sink = JsonlExporter::create(&out).await?;
    let summary = pipeline.export(&mut sink).await?;

    println!(
        "exported {} session(s), {} record(s) -> {}",
        summary.sessions_ok,
        summary.records_written,
        out.display()
    );
    for failure in &summary.sessions_failed {
        eprintln!("failed: {}: {}", failure.file, failure.error);
    }

    if !summary.is_clean() {
        anyhow::bail!("{} session(s) failed to export", summary.sessions_failed.len());
    }
    Ok(())
}

fn run_check(
    data_dir: PathBuf,
    file: Option<PathBuf>,
    config: Option<PathBuf>,
    shape: Option<PathBuf>,
) -> Result<()> {
    let pipeline = build_pipeline(data_dir, config, shape)?;

    let files = match file {
        Some(f) => vec![f],
        None => pipeline.trajectory_files()?,
    };
    if files.is_empty() {
        println!("no trajectory files found");
        return Ok(());
    }

    let mut failed = 0usize;
    for path in &files {
        match pipeline.process_file(path) {
            Ok(records) => {
                let unparsed = records.iter().filter(|r| r.deal.is_unparsed()).count();
                println!(
                    "ok: {} ({} record(s), {} unparsed deal(s))",
                    path.display(),
                    records.len(),
                    unparsed
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("failed: {}: {e}", path.display());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} session(s) failed validation", files.len());
    }
    Ok(())
}
