//! Session normalization.
//!
//! The normalizer joins a session's raw rounds with its agent roster,
//! validates referential integrity, imposes the canonical ordering, and
//! flattens each round into a [`CanonicalRecord`]. It is a pure, single-pass
//! transformation: identical input produces identical output, independent of
//! the order the trajectory file happened to be written in.

use tracing::{debug, instrument};

use crate::error::CoreError;
use crate::record::CanonicalRecord;
use crate::session::Session;

/// Normalize a session into its ordered canonical records.
///
/// Records are sorted by `(round_number, roster declaration index)`, so two
/// rounds in the same negotiation round come out in the order their agents
/// were declared in `config.txt`. Rounds flagged with an unparsed deal are
/// still emitted, carrying the explicit unparsed marker.
///
/// # Errors
///
/// Returns `CoreError::UnknownAgent` naming the offending round index and
/// agent when a round references an agent outside the roster. Fatal for this
/// session; sibling sessions in a batch are unaffected.
#[instrument(skip(session), fields(session = %session.session_id, rounds = session.rounds.len()))]
pub fn normalize(session: &Session) -> Result<Vec<CanonicalRecord>, CoreError> {
    // Resolve every round before sorting so the error names the source index.
    let mut resolved = Vec::with_capacity(session.rounds.len());
    for (round_index, round) in session.rounds.iter().enumerate() {
        let (declaration_index, profile) = session.roster.get(&round.agent_name).ok_or_else(|| {
            CoreError::UnknownAgent {
                round_index,
                agent: round.agent_name.clone(),
            }
        })?;
        resolved.push((round, declaration_index, profile));
    }

    resolved.sort_by_key(|(round, declaration_index, _)| (round.round_number, *declaration_index));

    let records = resolved
        .iter()
        .map(|(round, _, profile)| CanonicalRecord::from_round(&session.session_id, round, profile))
        .collect::<Vec<_>>();

    debug!(records = records.len(), "normalized session");
    Ok(records)
}
