//! Experiment configuration types for delib-core.
//!
//! This module reads the two per-experiment inputs that sit next to the
//! trajectory files: `config.txt` (one comma-separated line per negotiating
//! agent, produced by the upstream LLM-Deliberation runner) and the optional
//! `shape.yaml` describing the expected deal proposal shape. Agents become an
//! ordered [`AgentRoster`]; the roster's declaration order later drives the
//! canonical record ordering.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

// ── Agent profiles ───────────────────────────────────────────

/// Negotiation strategy assigned to an agent.
///
/// Closed set: an unrecognized label in `config.txt` is a parse error rather
/// than a silent default, so an agent is never mis-tagged for analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Works toward an agreement acceptable to all parties.
    Cooperative,
    /// Maximizes its own score at the expense of agreement.
    Greedy,
}

impl Strategy {
    /// Parse a strategy label from `config.txt`.
    fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "cooperative" => Some(Self::Cooperative),
            "greedy" => Some(Self::Greedy),
            _ => None,
        }
    }

    /// Lowercase label used in record tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cooperative => "cooperative",
            Self::Greedy => "greedy",
        }
    }
}

/// Identity and static attributes of one negotiating party.
///
/// Constructed once from `config.txt` at load time; immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentProfile {
    /// Unique role name within the experiment (e.g. "SportCo").
    pub name: String,

    /// Short display name from the upstream config.
    pub short_name: String,

    /// Upstream player type label (e.g. "p1", "target").
    pub player_type: String,

    /// Assigned negotiation strategy.
    pub strategy: Strategy,

    /// Identifier of the reasoning model backing this agent.
    pub model_id: String,
}

/// Ordered set of agent profiles for one experiment.
///
/// Preserves `config.txt` declaration order; the declaration index is the
/// tie-breaker when canonical records are sorted within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRoster {
    profiles: Vec<AgentProfile>,
}

impl AgentRoster {
    /// Build a roster from profiles, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConfigParse` if the list is empty or a name
    /// appears twice.
    pub fn new(profiles: Vec<AgentProfile>) -> Result<Self, CoreError> {
        if profiles.is_empty() {
            return Err(CoreError::ConfigParse(
                "no agents declared in configuration".to_owned(),
            ));
        }
        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(CoreError::ConfigParse(format!(
                    "duplicate agent name \"{}\"",
                    profile.name
                )));
            }
        }
        Ok(Self { profiles })
    }

    /// Look up a profile by name, returning its declaration index as well.
    pub fn get(&self, name: &str) -> Option<(usize, &AgentProfile)> {
        self.profiles
            .iter()
            .enumerate()
            .find(|(_, p)| p.name == name)
    }

    /// Iterate profiles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentProfile> {
        self.profiles.iter()
    }

    /// Number of declared agents.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the roster is empty (never true for a constructed roster).
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Parse the upstream `config.txt` into an [`AgentRoster`].
///
/// Each agent is one line of at least five comma-separated fields:
/// `name,short_name,player_type,strategy,model`. Lines that do not match the
/// shape (blank lines, comments, truncated lines) are skipped. Extra trailing
/// fields are ignored for forward compatibility.
///
/// # Errors
///
/// Returns `CoreError::ConfigParse` if no agent line is recovered, if a
/// strategy label is present but outside the closed set, or if an agent name
/// is declared twice.
pub fn parse_agent_config(text: &str) -> Result<AgentRoster, CoreError> {
    let mut profiles = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 5 {
            debug!(line, "skipping config line with unexpected shape");
            continue;
        }

        let strategy = Strategy::parse(parts[3]).ok_or_else(|| {
            CoreError::ConfigParse(format!(
                "unknown strategy \"{}\" for agent \"{}\"",
                parts[3], parts[0]
            ))
        })?;

        profiles.push(AgentProfile {
            name: parts[0].to_owned(),
            short_name: parts[1].to_owned(),
            player_type: parts[2].to_owned(),
            strategy,
            model_id: parts[4].to_owned(),
        });
    }

    AgentRoster::new(profiles)
}

/// Load `config.txt` from disk and parse it.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file cannot be read, plus everything
/// [`parse_agent_config`] can return.
pub fn load_agent_config(path: &Path) -> Result<AgentRoster, CoreError> {
    let text = std::fs::read_to_string(path)?;
    parse_agent_config(&text)
}

// ── Deal shape (shape.yaml) ──────────────────────────────────

/// Expected shape of a deal proposal for one experiment.
///
/// The upstream deal grammar has no formal specification, so category count
/// and value domains are per-experiment configuration rather than constants.
/// When no shape is declared, proposals of any length are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DealShape {
    /// Issue categories in proposal order.
    pub categories: Vec<CategoryShape>,
}

/// One issue category within a deal shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShape {
    /// Category label as it appears in proposal tokens (e.g. "A").
    pub name: String,

    /// Highest accepted option level for this category.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
}

fn default_max_level() -> u32 {
    5
}

impl DealShape {
    /// Validate internal consistency after deserialization.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Shape` for an empty category list, a duplicate
    /// category name, or a zero max level.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.categories.is_empty() {
            return Err(CoreError::Shape("no categories declared".to_owned()));
        }
        for (i, cat) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|c| c.name == cat.name) {
                return Err(CoreError::Shape(format!(
                    "duplicate category \"{}\"",
                    cat.name
                )));
            }
            if cat.max_level == 0 {
                return Err(CoreError::Shape(format!(
                    "category \"{}\" has zero max level",
                    cat.name
                )));
            }
        }
        Ok(())
    }
}

/// Load the optional deal shape from `shape.yaml`.
///
/// Returns `Ok(None)` when the file does not exist: the experiment then
/// declares no expected proposal shape and any proposal length is accepted.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file exists but cannot be read.
/// Returns `CoreError::Shape` if it contains invalid or inconsistent YAML.
pub fn load_deal_shape(path: &Path) -> Result<Option<DealShape>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let shape: DealShape = serde_yaml::from_str(&content)
        .map_err(|e| CoreError::Shape(format!("{}: {e}", path.display())))?;
    shape.validate()?;
    Ok(Some(shape))
}
