//! Deal proposal grammar.
//!
//! A proposal is a comma-separated list of tokens such as `"A1,B1,C4,D1,E5"`,
//! each token being a category label followed by a discrete option level.
//! When the experiment declares a [`DealShape`], the token count and levels
//! are checked against it; otherwise any length is accepted and the observed
//! shape is just recorded. Malformed proposals are downgraded to a flag on
//! the owning round rather than failing the session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DealShape;

// ── Types ────────────────────────────────────────────────────

/// One `(category, level)` assignment within a proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DealItem {
    /// Category label (e.g. "A").
    pub category: String,

    /// Chosen option level for the category.
    pub level: u32,
}

/// A structured deal proposal: an ordered sequence of category assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DealProposal {
    /// Assignments in proposal order.
    pub items: Vec<DealItem>,
}

/// Outcome of deal extraction for one round.
///
/// `Unparsed` is deliberately distinct from `Absent`: a round that proposed
/// something unreadable still reaches the output, marked as such, instead of
/// being guessed at or dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum DealOutcome {
    /// The round proposed no deal.
    Absent,
    /// The round proposed a deal that parsed cleanly.
    Parsed {
        /// The parsed proposal.
        proposal: DealProposal,
    },
    /// The round proposed a deal that could not be parsed.
    Unparsed {
        /// Raw proposal text as found in the trajectory.
        raw: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl DealOutcome {
    /// Whether this outcome carries the unparsed flag.
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Self::Unparsed { .. })
    }
}

/// Why a proposal string failed to parse.
///
/// Never escapes the trajectory parser as a session failure; it is converted
/// to [`DealOutcome::Unparsed`] on the round.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DealParseError {
    #[error("empty proposal")]
    Empty,

    #[error("unparseable token \"{0}\"")]
    BadToken(String),

    #[error("expected {expected} categories, found {found}")]
    WrongLength {
        /// Category count declared by the experiment shape.
        expected: usize,
        /// Token count observed in the proposal.
        found: usize,
    },

    #[error("category \"{found}\" does not match declared category \"{expected}\"")]
    WrongCategory {
        /// Category declared at this position.
        expected: String,
        /// Category observed at this position.
        found: String,
    },

    #[error("level {level} out of range for category \"{category}\" (max {max})")]
    LevelOutOfRange {
        /// Category the level was assigned to.
        category: String,
        /// Observed level.
        level: u32,
        /// Highest accepted level.
        max: u32,
    },
}

// ── Parsing ──────────────────────────────────────────────────

/// Parse a proposal string into a [`DealProposal`].
///
/// Each comma-separated token must be one or more ASCII letters followed by
/// one or more digits. With a declared `shape`, the token count must match
/// the category count, positions must carry the declared category labels,
/// and each level must be in `1..=max_level`.
///
/// # Errors
///
/// Returns a [`DealParseError`] describing the first violation encountered.
pub fn parse_deal(raw: &str, shape: Option<&DealShape>) -> Result<DealProposal, DealParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DealParseError::Empty);
    }

    let mut items = Vec::new();
    for token in raw.split(',') {
        items.push(parse_token(token.trim())?);
    }

    if let Some(shape) = shape {
        check_shape(&items, shape)?;
    }

    Ok(DealProposal { items })
}

/// Parse one `<letters><digits>` token.
fn parse_token(token: &str) -> Result<DealItem, DealParseError> {
    let split = token.find(|c: char| c.is_ascii_digit());
    let Some(split) = split else {
        return Err(DealParseError::BadToken(token.to_owned()));
    };

    let (category, digits) = token.split_at(split);
    if category.is_empty() || !category.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DealParseError::BadToken(token.to_owned()));
    }
    let level: u32 = digits
        .parse()
        .map_err(|_| DealParseError::BadToken(token.to_owned()))?;

    Ok(DealItem {
        category: category.to_owned(),
        level,
    })
}

/// Check a parsed proposal against the declared experiment shape.
fn check_shape(items: &[DealItem], shape: &DealShape) -> Result<(), DealParseError> {
    if items.len() != shape.categories.len() {
        return Err(DealParseError::WrongLength {
            expected: shape.categories.len(),
            found: items.len(),
        });
    }
    for (item, cat) in items.iter().zip(&shape.categories) {
        if item.category != cat.name {
            return Err(DealParseError::WrongCategory {
                expected: cat.name.clone(),
                found: item.category.clone(),
            });
        }
        if item.level == 0 || item.level > cat.max_level {
            return Err(DealParseError::LevelOutOfRange {
                category: item.category.clone(),
                level: item.level,
                max: cat.max_level,
            });
        }
    }
    Ok(())
}
