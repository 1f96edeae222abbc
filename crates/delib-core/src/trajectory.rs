//! Trajectory file parsing.
//!
//! One trajectory file holds the per-round output of a whole negotiation
//! session. The upstream LLM-Deliberation runner writes a top-level object
//! with a `rounds` array (plus bookkeeping fields such as `slot_assignment`
//! and `finished_rounds` that we ignore); a bare array of rounds is accepted
//! too. The upstream schema drifts, so unrecognized fields are ignored, but
//! a round missing its agent or round number fails the whole parse: partial,
//! mis-attributed data is worse than a loud failure in an analysis pipeline.
//!
//! Round content may appear as direct JSON fields or embedded in the agent's
//! `full_answer` as `<SCRATCHPAD>`, `<ANSWER>`, `<PLAN>` and `<DEAL>` blocks;
//! direct fields win when both are present.

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::DealShape;
use crate::deal::{DealOutcome, parse_deal};
use crate::error::CoreError;

// ── Round ────────────────────────────────────────────────────

/// One agent's turn within a negotiation session.
///
/// Created by parsing one trajectory file; read-only afterward. At least one
/// of the four content fields (`scratchpad`, `public_answer`, `deal`, `plan`)
/// is guaranteed present on a parsed round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Negotiation round number as recorded upstream.
    pub round_number: u32,

    /// Name of the agent that took this turn; resolved against the roster
    /// during normalization.
    pub agent_name: String,

    /// Prompt the agent received for this turn, when recorded.
    pub prompt: Option<String>,

    /// The agent's private reasoning text.
    pub scratchpad: Option<String>,

    /// The agent's externally visible statement.
    pub public_answer: Option<String>,

    /// The agent's forward-looking plan text.
    pub plan: Option<String>,

    /// Deal extraction outcome for this turn.
    pub deal: DealOutcome,
}

impl Round {
    /// Whether any of the four content fields is present.
    fn has_content(&self) -> bool {
        self.scratchpad.is_some()
            || self.public_answer.is_some()
            || self.plan.is_some()
            || self.deal != DealOutcome::Absent
    }
}

// ── Parsing ──────────────────────────────────────────────────

/// Parse one trajectory document into rounds, in source order.
///
/// `file_label` is used only for error context. `shape` is the experiment's
/// declared deal shape, if any; malformed deal text never fails the parse and
/// instead flags the round with [`DealOutcome::Unparsed`].
///
/// # Errors
///
/// Returns `CoreError::Json` if the document is not valid JSON.
/// Returns `CoreError::MalformedRound` if the document has no rounds array,
/// or if any round is missing its agent name, its round number, or all four
/// content fields.
#[instrument(skip(text, shape), fields(file = %file_label))]
pub fn parse_trajectory(
    text: &str,
    file_label: &str,
    shape: Option<&DealShape>,
) -> Result<Vec<Round>, CoreError> {
    let doc: Value = serde_json::from_str(text)?;

    let raw_rounds = match &doc {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("rounds") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(malformed(file_label, 0, "\"rounds\" is not an array"));
            }
            None => {
                return Err(malformed(file_label, 0, "missing \"rounds\" array"));
            }
        },
        _ => {
            return Err(malformed(
                file_label,
                0,
                "document is neither an object nor an array",
            ));
        }
    };

    let mut rounds = Vec::with_capacity(raw_rounds.len());
    for (index, raw) in raw_rounds.iter().enumerate() {
        rounds.push(parse_round(raw, file_label, index, shape)?);
    }

    debug!(rounds = rounds.len(), "parsed trajectory");
    Ok(rounds)
}

/// Parse one element of the rounds array.
fn parse_round(
    raw: &Value,
    file: &str,
    index: usize,
    shape: Option<&DealShape>,
) -> Result<Round, CoreError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| malformed(file, index, "round is not an object"))?;

    let agent_name = obj
        .get("agent")
        .or_else(|| obj.get("agent_name"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| malformed(file, index, "missing agent name"))?
        .to_owned();

    let round_number = obj
        .get("round")
        .or_else(|| obj.get("round_number"))
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed(file, index, "missing round number"))?;
    let round_number = u32::try_from(round_number)
        .map_err(|_| malformed(file, index, "round number out of range"))?;

    let full_answer = obj.get("full_answer").and_then(Value::as_str);

    let scratchpad = direct_or_tagged(obj, "scratchpad", full_answer, "SCRATCHPAD");
    let public_answer = direct_or_tagged(obj, "public_answer", full_answer, "ANSWER");
    let plan = direct_or_tagged(obj, "plan", full_answer, "PLAN");
    let deal_text = obj
        .get("deal")
        .or_else(|| obj.get("deal_proposal"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| full_answer.and_then(|t| extract_tag(t, "DEAL")));

    let deal = match deal_text {
        None => DealOutcome::Absent,
        Some(raw_deal) => match parse_deal(&raw_deal, shape) {
            Ok(proposal) => DealOutcome::Parsed { proposal },
            Err(e) => {
                warn!(file, index, agent = %agent_name, error = %e, "unparseable deal proposal");
                DealOutcome::Unparsed {
                    raw: raw_deal,
                    reason: e.to_string(),
                }
            }
        },
    };

    let round = Round {
        round_number,
        agent_name,
        prompt: obj.get("prompt").and_then(Value::as_str).map(str::to_owned),
        scratchpad,
        public_answer,
        plan,
        deal,
    };

    if !round.has_content() {
        return Err(malformed(
            file,
            index,
            "round has no scratchpad, public answer, deal, or plan",
        ));
    }

    Ok(round)
}

/// Fetch a content field directly, falling back to a tagged block in
/// `full_answer`. Empty strings count as absent.
fn direct_or_tagged(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    full_answer: Option<&str>,
    tag: &str,
) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .or_else(|| full_answer.and_then(|t| extract_tag(t, tag)))
}

/// Extract the first `<TAG>…</TAG>` block from `text`, trimmed.
fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let start = text.find(&open)? + open.len();
    let end = start + text[start..].find(&close)?;
    let content = text[start..end].trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_owned())
    }
}

fn malformed(file: &str, index: usize, reason: &str) -> CoreError {
    CoreError::MalformedRound {
        file: file.to_owned(),
        index,
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(doc: &Value) -> Result<Vec<Round>, CoreError> {
        parse_trajectory(&doc.to_string(), "history_test.json", None)
    }

    #[test]
    fn test_should_parse_rounds_in_source_order() {
        let doc = json!({
            "slot_assignment": ["SportCo", "Environmentalists"],
            "finished_rounds": 2,
            "rounds": [
                { "agent": "Environmentalists", "round": 2, "public_answer": "We refuse." },
                { "agent": "SportCo", "round": 1, "public_answer": "We propose." },
            ]
        });

        let rounds = parse(&doc).expect("should parse");
        assert_eq!(rounds.len(), 2);
        // Source order is preserved; the normalizer imposes canonical order.
        assert_eq!(rounds[0].agent_name, "Environmentalists");
        assert_eq!(rounds[0].round_number, 2);
        assert_eq!(rounds[1].agent_name, "SportCo");
    }

    #[test]
    fn test_should_accept_bare_round_array() {
        let doc = json!([
            { "agent_name": "SportCo", "round_number": 1, "plan": "Open strong." }
        ]);
        let rounds = parse(&doc).expect("should parse");
        assert_eq!(rounds[0].plan.as_deref(), Some("Open strong."));
    }

    #[test]
    fn test_should_extract_tagged_blocks_from_full_answer() {
        let doc = json!({
            "rounds": [{
                "agent": "SportCo",
                "round": 3,
                "full_answer": "<SCRATCHPAD>\nThey will fold.\n</SCRATCHPAD>\n\
                    <PLAN>Hold position.</PLAN>\n\
                    <DEAL> A1,B1,C4,D1,E5 </DEAL>\n\
                    <ANSWER>We offer A1 B1 C4 D1 E5.</ANSWER>"
            }]
        });

        let rounds = parse(&doc).expect("should parse");
        let round = &rounds[0];
        assert_eq!(round.scratchpad.as_deref(), Some("They will fold."));
        assert_eq!(round.public_answer.as_deref(), Some("We offer A1 B1 C4 D1 E5."));
        assert_eq!(round.plan.as_deref(), Some("Hold position."));
        assert!(matches!(&round.deal, DealOutcome::Parsed { proposal } if proposal.items.len() == 5));
    }

    #[test]
    fn test_should_prefer_direct_fields_over_tags() {
        let doc = json!({
            "rounds": [{
                "agent": "SportCo",
                "round": 1,
                "public_answer": "direct",
                "full_answer": "<ANSWER>tagged</ANSWER>"
            }]
        });
        let rounds = parse(&doc).expect("should parse");
        assert_eq!(rounds[0].public_answer.as_deref(), Some("direct"));
    }

    #[test]
    fn test_should_flag_unparseable_deal_without_failing() {
        let doc = json!({
            "rounds": [{
                "agent": "SportCo",
                "round": 1,
                "deal": "A1,,X"
            }]
        });

        let rounds = parse(&doc).expect("one bad deal should not fail the session");
        match &rounds[0].deal {
            DealOutcome::Unparsed { raw, reason } => {
                assert_eq!(raw, "A1,,X");
                assert!(reason.contains("unparseable token"));
            }
            other => panic!("expected Unparsed, got: {other:?}"),
        }
    }

    #[test]
    fn test_should_fail_round_missing_agent_name() {
        let doc = json!({ "rounds": [{ "round": 1, "plan": "x" }] });
        let err = parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRound { index: 0, ref reason, .. } if reason.contains("agent")
        ));
    }

    #[test]
    fn test_should_fail_round_missing_round_number() {
        let doc = json!({ "rounds": [{ "agent": "SportCo", "plan": "x" }] });
        let err = parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRound { ref reason, .. } if reason.contains("round number")
        ));
    }

    #[test]
    fn test_should_fail_round_with_only_unrecognized_fields() {
        let doc = json!({
            "rounds": [{
                "agent": "SportCo",
                "round": 1,
                "novel_field": "ignored",
                "another": 42
            }]
        });
        let err = parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRound { ref reason, .. } if reason.contains("no scratchpad")
        ));
    }

    #[test]
    fn test_should_ignore_unrecognized_fields() {
        let doc = json!({
            "rounds": [{
                "agent": "SportCo",
                "round": 1,
                "public_answer": "hello",
                "future_schema_field": { "nested": true }
            }]
        });
        let rounds = parse(&doc).expect("drifted schema should still parse");
        assert_eq!(rounds[0].public_answer.as_deref(), Some("hello"));
    }

    #[test]
    fn test_should_fail_document_without_rounds() {
        let doc = json!({ "slot_assignment": [] });
        let err = parse(&doc).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRound { ref reason, .. } if reason.contains("rounds")
        ));
    }

    #[test]
    fn test_should_fail_invalid_json() {
        let err = parse_trajectory("{ not json", "bad.json", None).unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn test_should_enforce_declared_shape_as_flag() {
        let shape = crate::config::DealShape {
            categories: vec![crate::config::CategoryShape {
                name: "A".to_owned(),
                max_level: 5,
            }],
        };
        let doc = json!({
            "rounds": [{ "agent": "SportCo", "round": 1, "deal": "A1,B2" }]
        });

        let rounds = parse_trajectory(&doc.to_string(), "history_test.json", Some(&shape))
            .expect("shape violation should flag, not fail");
        assert!(rounds[0].deal.is_unparsed());
    }

    #[test]
    fn test_should_extract_tag_with_missing_close_as_absent() {
        assert_eq!(extract_tag("<PLAN>dangling", "PLAN"), None);
        assert_eq!(extract_tag("no tags at all", "PLAN"), None);
        assert_eq!(extract_tag("<PLAN>  </PLAN>", "PLAN"), None);
    }

    #[test]
    fn test_should_keep_prompt_when_recorded() {
        let doc = json!({
            "rounds": [{
                "agent": "SportCo",
                "round": 1,
                "prompt": "You are negotiating...",
                "public_answer": "ok"
            }]
        });
        let rounds = parse(&doc).expect("should parse");
        assert_eq!(rounds[0].prompt.as_deref(), Some("You are negotiating..."));
    }
}
