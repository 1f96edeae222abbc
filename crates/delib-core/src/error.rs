use thiserror::Error;

/// Errors produced while turning raw experiment output into canonical records.
///
/// All variants stem from malformed static input; none are transient, so
/// there is no retry path. Per-session errors carry enough context (file
/// label, element index) to locate the offending record.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The agent configuration yielded no usable agents or an invalid entry.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// A round is structurally unusable; fatal for that session's parse.
    #[error("malformed round {index} in {file}: {reason}")]
    MalformedRound {
        /// Source file label the round came from.
        file: String,
        /// Zero-based element index within the trajectory.
        index: usize,
        /// What was missing or wrong.
        reason: String,
    },

    /// A round references an agent absent from the session's roster.
    #[error("round {round_index} references unknown agent \"{agent}\"")]
    UnknownAgent {
        /// Zero-based index of the offending round in source order.
        round_index: usize,
        /// The unresolved agent name.
        agent: String,
    },

    /// The deal shape configuration file exists but is invalid.
    #[error("invalid deal shape config: {0}")]
    Shape(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
