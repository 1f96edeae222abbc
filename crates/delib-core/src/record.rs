//! Canonical output records.
//!
//! A [`CanonicalRecord`] is the flattened, validated unit handed to the
//! external analysis platform: one per round, carrying the resolved agent
//! attributes, the owning session id, and free-form tags for downstream
//! filtering. Everything past this shape belongs to the external platform.

use serde::{Deserialize, Serialize};

use crate::config::{AgentProfile, Strategy};
use crate::deal::DealOutcome;
use crate::trajectory::Round;

/// One flattened round, ready for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Owning session identifier.
    pub session_id: String,

    /// Negotiation round number.
    pub round_number: u32,

    /// Agent role name.
    pub agent_name: String,

    /// Strategy resolved from the agent roster.
    pub strategy: Strategy,

    /// Reasoning model resolved from the agent roster.
    pub model_id: String,

    /// Private reasoning text, when the round recorded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratchpad: Option<String>,

    /// Externally visible statement, when the round recorded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_answer: Option<String>,

    /// Forward-looking plan text, when the round recorded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    /// Deal outcome; `unparsed` is an explicit state, never a guess.
    pub deal: DealOutcome,

    /// Free-form filter tags (strategy, model, round).
    pub tags: Vec<String>,
}

impl CanonicalRecord {
    /// Flatten one round with its resolved profile and session id.
    pub(crate) fn from_round(session_id: &str, round: &Round, profile: &AgentProfile) -> Self {
        let tags = vec![
            format!("strategy:{}", profile.strategy.as_str()),
            format!("model:{}", profile.model_id),
            format!("round:{}", round.round_number),
        ];

        Self {
            session_id: session_id.to_owned(),
            round_number: round.round_number,
            agent_name: round.agent_name.clone(),
            strategy: profile.strategy,
            model_id: profile.model_id.clone(),
            scratchpad: round.scratchpad.clone(),
            public_answer: round.public_answer.clone(),
            plan: round.plan.clone(),
            deal: round.deal.clone(),
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentProfile;

    fn profile() -> AgentProfile {
        AgentProfile {
            name: "SportCo".to_owned(),
            short_name: "sportco".to_owned(),
            player_type: "p1".to_owned(),
            strategy: Strategy::Greedy,
            model_id: "gpt-4".to_owned(),
        }
    }

    fn round() -> Round {
        Round {
            round_number: 4,
            agent_name: "SportCo".to_owned(),
            prompt: None,
            scratchpad: Some("thinking".to_owned()),
            public_answer: None,
            plan: None,
            deal: DealOutcome::Absent,
        }
    }

    #[test]
    fn test_should_flatten_round_with_profile() {
        let record = CanonicalRecord::from_round("history_1", &round(), &profile());

        assert_eq!(record.session_id, "history_1");
        assert_eq!(record.strategy, Strategy::Greedy);
        assert_eq!(record.model_id, "gpt-4");
        assert_eq!(record.scratchpad.as_deref(), Some("thinking"));
        assert_eq!(
            record.tags,
            ["strategy:greedy", "model:gpt-4", "round:4"]
        );
    }

    #[test]
    fn test_should_serialize_record_as_camel_case_json() {
        let record = CanonicalRecord::from_round("history_1", &round(), &profile());
        let value = serde_json::to_value(&record).expect("should serialize");

        assert_eq!(value["sessionId"], "history_1");
        assert_eq!(value["roundNumber"], 4);
        assert_eq!(value["agentName"], "SportCo");
        assert_eq!(value["strategy"], "greedy");
        assert_eq!(value["deal"]["state"], "absent");
        // Absent optional text fields are omitted entirely.
        assert!(value.get("publicAnswer").is_none());
    }

    #[test]
    fn test_should_serialize_unparsed_deal_sentinel() {
        let mut r = round();
        r.deal = DealOutcome::Unparsed {
            raw: "A1,,X".to_owned(),
            reason: "unparseable token \"\"".to_owned(),
        };
        let record = CanonicalRecord::from_round("history_1", &r, &profile());
        let value = serde_json::to_value(&record).expect("should serialize");

        assert_eq!(value["deal"]["state"], "unparsed");
        assert_eq!(value["deal"]["raw"], "A1,,X");
    }

    #[test]
    fn test_should_roundtrip_record_json() {
        let record = CanonicalRecord::from_round("history_1", &round(), &profile());
        let json = serde_json::to_string(&record).expect("should serialize");
        let parsed: CanonicalRecord = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, record);
    }
}
