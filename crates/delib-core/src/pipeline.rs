//! Pipeline: the main entry point for delib-core.
//!
//! A [`Pipeline`] binds one experiment directory: it loads the agent roster
//! from `config.txt` and the optional deal shape from `shape.yaml` at
//! construction, then exposes single-file processing (for `delib check`) and
//! batch export (for `delib export`).

use std::path::{Path, PathBuf};

use tracing::{info, instrument};
use typed_builder::TypedBuilder;

use crate::batch::{self, BatchSummary};
use crate::config::{AgentRoster, DealShape, load_agent_config, load_deal_shape};
use crate::error::CoreError;
use crate::record::CanonicalRecord;
use crate::sink::IngestSink;

// ── Pipeline configuration ───────────────────────────────────

/// Pipeline configuration provided by the CLI layer.
///
/// Only the experiment data directory is required; the config and shape file
/// locations default to `config.txt` and `shape.yaml` inside it.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use delib_core::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .data_dir(PathBuf::from("/data/base_test_small"))
///     .build();
/// assert_eq!(config.config_path(), PathBuf::from("/data/base_test_small/config.txt"));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct PipelineConfig {
    /// Directory holding `config.txt` and the `history*.json` files.
    data_dir: PathBuf,

    /// Override for the agent configuration file location.
    #[builder(default)]
    config_path: Option<PathBuf>,

    /// Override for the deal shape file location.
    #[builder(default)]
    shape_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Returns the experiment data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the agent configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("config.txt"))
    }

    /// Returns the deal shape file path.
    pub fn shape_path(&self) -> PathBuf {
        self.shape_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("shape.yaml"))
    }
}

// ── Pipeline ─────────────────────────────────────────────────

/// Loaded pipeline for one experiment directory.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    roster: AgentRoster,
    shape: Option<DealShape>,
}

impl Pipeline {
    /// Load the experiment configuration and build a pipeline.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if `config.txt` cannot be read.
    /// Returns `CoreError::ConfigParse` if it yields no valid agents.
    /// Returns `CoreError::Shape` if `shape.yaml` exists but is invalid.
    #[instrument(skip_all, fields(data_dir = %config.data_dir().display()))]
    pub fn new(config: PipelineConfig) -> Result<Self, CoreError> {
        let roster = load_agent_config(&config.config_path())?;
        let shape = load_deal_shape(&config.shape_path())?;
        info!(
            agents = roster.len(),
            shaped = shape.is_some(),
            "pipeline loaded"
        );
        Ok(Self {
            config,
            roster,
            shape,
        })
    }

    /// Parse and normalize one trajectory file into canonical records.
    ///
    /// # Errors
    ///
    /// Returns the session's parse or normalization error; other sessions in
    /// the directory are unaffected.
    pub fn process_file(&self, path: &Path) -> Result<Vec<CanonicalRecord>, CoreError> {
        batch::process_file(path, &self.roster, self.shape.as_ref())
    }

    /// List the trajectory files in the data directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the directory cannot be read.
    pub fn trajectory_files(&self) -> Result<Vec<PathBuf>, CoreError> {
        batch::discover_trajectories(&self.config.data_dir)
    }

    /// Export every session in the data directory to `sink`.
    ///
    /// Sessions are processed in parallel; per-session failures are collected
    /// into the summary instead of aborting the batch.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the data directory cannot be read, or an
    /// error from the sink.
    pub async fn export<S: IngestSink>(&self, sink: &mut S) -> Result<BatchSummary, CoreError> {
        batch::run_batch(
            &self.config.data_dir,
            &self.roster,
            self.shape.as_ref(),
            sink,
        )
        .await
    }

    /// Returns the loaded agent roster.
    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// Returns the declared deal shape, if any.
    pub fn shape(&self) -> Option<&DealShape> {
        self.shape.as_ref()
    }

    /// Returns the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
