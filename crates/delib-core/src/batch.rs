//! Batch processing of trajectory files.
//!
//! Sessions are independent, so each trajectory file is parsed and
//! normalized in its own tokio task with no coordination between them. A
//! failed session is reported with its file label and skipped; it never
//! aborts its siblings. Results are submitted to the sink in sorted file
//! order, so a re-run over the same inputs produces identical output.

use std::path::{Path, PathBuf};

use futures::stream::{FuturesUnordered, StreamExt as _};
use tracing::{info, instrument, warn};

use crate::config::{AgentRoster, DealShape};
use crate::error::CoreError;
use crate::normalize::normalize;
use crate::record::CanonicalRecord;
use crate::session::{Session, session_id_from_path};
use crate::sink::IngestSink;
use crate::trajectory::parse_trajectory;

// ── Summary types ────────────────────────────────────────────

/// One session that failed during a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    /// Trajectory file name the session came from.
    pub file: String,

    /// Rendered error, carrying round index / agent context where relevant.
    pub error: String,
}

/// Outcome of one batch export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Sessions parsed, normalized, and submitted.
    pub sessions_ok: usize,

    /// Sessions that failed, with context to locate the bad record.
    pub sessions_failed: Vec<SessionFailure>,

    /// Total records handed to the sink.
    pub records_written: usize,
}

impl BatchSummary {
    /// Whether every discovered session was exported.
    pub fn is_clean(&self) -> bool {
        self.sessions_failed.is_empty()
    }
}

// ── Discovery ────────────────────────────────────────────────

/// Find trajectory files (`history*.json`) in a data directory, sorted.
///
/// # Errors
///
/// Returns `CoreError::Io` if the directory cannot be read.
pub(crate) fn discover_trajectories(data_dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.starts_with("history") && name.ends_with(".json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ── Processing ───────────────────────────────────────────────

/// Parse and normalize one trajectory file.
///
/// # Errors
///
/// Propagates parse and normalization errors for this session only.
pub(crate) fn process_file(
    path: &Path,
    roster: &AgentRoster,
    shape: Option<&DealShape>,
) -> Result<Vec<CanonicalRecord>, CoreError> {
    let session_id = session_id_from_path(path);
    let text = std::fs::read_to_string(path)?;
    let rounds = parse_trajectory(&text, &session_id, shape)?;

    let session = Session::builder()
        .session_id(session_id)
        .roster(roster.clone())
        .rounds(rounds)
        .build();

    normalize(&session)
}

/// Run a batch export over every trajectory file in `data_dir`.
///
/// Spawns one task per session, waits for all of them, then submits each
/// successful session's records to `sink` in sorted file order and calls
/// `finish` on the sink.
///
/// # Errors
///
/// Returns `CoreError::Io` if the data directory cannot be read, or an error
/// from the sink. Per-session failures do not surface here; they are
/// collected into the returned [`BatchSummary`].
#[instrument(skip(roster, shape, sink), fields(data_dir = %data_dir.display()))]
pub(crate) async fn run_batch<S: IngestSink>(
    data_dir: &Path,
    roster: &AgentRoster,
    shape: Option<&DealShape>,
    sink: &mut S,
) -> Result<BatchSummary, CoreError> {
    let files = discover_trajectories(data_dir)?;
    info!(sessions = files.len(), "starting batch export");

    let mut tasks = FuturesUnordered::new();
    for path in files {
        let roster = roster.clone();
        let shape = shape.cloned();
        tasks.push(tokio::task::spawn_blocking(move || {
            let result = process_file(&path, &roster, shape.as_ref());
            (path, result)
        }));
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.next().await {
        let (path, result) =
            joined.map_err(|e| anyhow::anyhow!("session task panicked: {e}"))?;
        outcomes.push((path, result));
    }
    // Completion order is nondeterministic; submit in file order instead.
    outcomes.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut summary = BatchSummary::default();
    for (path, result) in outcomes {
        let session_id = session_id_from_path(&path);
        match result {
            Ok(records) => {
                sink.submit(&session_id, &records).await?;
                summary.sessions_ok += 1;
                summary.records_written += records.len();
                info!(session = %session_id, records = records.len(), "session exported");
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "session failed, skipping");
                summary.sessions_failed.push(SessionFailure {
                    file: session_id,
                    error: e.to_string(),
                });
            }
        }
    }

    sink.finish().await?;
    info!(
        ok = summary.sessions_ok,
        failed = summary.sessions_failed.len(),
        records = summary.records_written,
        "batch export finished"
    );
    Ok(summary)
}
