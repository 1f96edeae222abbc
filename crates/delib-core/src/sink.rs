//! Ingestion sink boundary.
//!
//! The analysis platform that eventually consumes canonical records is an
//! opaque external collaborator; this crate makes no assumption about its
//! transport, batching, or authentication. [`IngestSink`] is the seam: a
//! sink is an explicit handle passed into the export workflow, never ambient
//! process-wide state. [`JsonlExporter`] is the bundled implementation,
//! writing JSON Lines for a later upload step.

use std::future::Future;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::CoreError;
use crate::record::CanonicalRecord;

/// Destination for normalized session records.
pub trait IngestSink {
    /// Submit one session's records.
    ///
    /// Called once per successfully normalized session, with records already
    /// in canonical order.
    fn submit(
        &mut self,
        session_id: &str,
        records: &[CanonicalRecord],
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Flush any buffered output. Called once after the last session.
    fn finish(&mut self) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Sink that appends records to a JSON Lines file, one object per line.
#[derive(Debug)]
pub struct JsonlExporter {
    writer: BufWriter<File>,
}

impl JsonlExporter {
    /// Create (or truncate) the target file.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the file cannot be created.
    pub async fn create(path: &Path) -> Result<Self, CoreError> {
        let file = File::create(path).await?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl IngestSink for JsonlExporter {
    async fn submit(
        &mut self,
        session_id: &str,
        records: &[CanonicalRecord],
    ) -> Result<(), CoreError> {
        for record in records {
            let mut line = serde_json::to_vec(record)?;
            line.push(b'\n');
            self.writer.write_all(&line).await?;
        }
        debug!(session = session_id, records = records.len(), "wrote session records");
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), CoreError> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentProfile, Strategy};
    use crate::deal::DealOutcome;
    use crate::trajectory::Round;

    fn sample_records() -> Vec<CanonicalRecord> {
        let profile = AgentProfile {
            name: "SportCo".to_owned(),
            short_name: "sportco".to_owned(),
            player_type: "p1".to_owned(),
            strategy: Strategy::Cooperative,
            model_id: "gpt-4".to_owned(),
        };
        let round = Round {
            round_number: 1,
            agent_name: "SportCo".to_owned(),
            prompt: None,
            scratchpad: None,
            public_answer: Some("hello".to_owned()),
            plan: None,
            deal: DealOutcome::Absent,
        };
        vec![
            CanonicalRecord::from_round("history_1", &round, &profile),
            CanonicalRecord::from_round("history_1", &round, &profile),
        ]
    }

    #[tokio::test]
    async fn test_should_write_one_json_object_per_line() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let path = dir.path().join("out.jsonl");

        let mut sink = JsonlExporter::create(&path).await.expect("should create");
        sink.submit("history_1", &sample_records())
            .await
            .expect("should submit");
        sink.finish().await.expect("should flush");

        let content = std::fs::read_to_string(&path).expect("should read output");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: CanonicalRecord =
            serde_json::from_str(lines[0]).expect("each line should be a record");
        assert_eq!(parsed.session_id, "history_1");
        assert_eq!(parsed.public_answer.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_should_write_nothing_for_empty_session() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let path = dir.path().join("out.jsonl");

        let mut sink = JsonlExporter::create(&path).await.expect("should create");
        sink.submit("history_1", &[]).await.expect("should submit");
        sink.finish().await.expect("should flush");

        let content = std::fs::read_to_string(&path).expect("should read output");
        assert!(content.is_empty());
    }
}
