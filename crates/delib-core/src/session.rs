//! Session type: one complete negotiation experiment.

use std::path::Path;

use typed_builder::TypedBuilder;

use crate::config::AgentRoster;
use crate::trajectory::Round;

/// One complete multi-agent negotiation experiment.
///
/// Owns its agent roster and its rounds. Rounds stay in trajectory source
/// order here; the normalizer imposes the canonical ordering.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Session {
    /// Identifier derived from the source trajectory filename.
    pub session_id: String,

    /// Agents declared for this experiment, in declaration order.
    pub roster: AgentRoster,

    /// Rounds in source file order.
    pub rounds: Vec<Round>,
}

/// Derive a session id from a trajectory file path.
///
/// Uses the file stem (upstream files are named `history_<run>.json`), falling
/// back to the full lossy path when there is no stem.
pub fn session_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::parse_agent_config;

    #[test]
    fn test_should_derive_session_id_from_filename() {
        let path = PathBuf::from("/data/base_test/history_cooperative_run3.json");
        assert_eq!(session_id_from_path(&path), "history_cooperative_run3");
    }

    #[test]
    fn test_should_build_session() {
        let roster = parse_agent_config("SportCo,sportco,p1,cooperative,gpt-4\n")
            .expect("should parse config");

        let session = Session::builder()
            .session_id("history_1".to_owned())
            .roster(roster)
            .rounds(Vec::new())
            .build();

        assert_eq!(session.session_id, "history_1");
        assert_eq!(session.roster.len(), 1);
        assert!(session.rounds.is_empty());
    }
}
