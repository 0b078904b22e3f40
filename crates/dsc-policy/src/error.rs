use thiserror::Error;

/// Rule or target input that cannot be turned into a formula.
///
/// Fatal to the single verification it belongs to, never to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedPolicyError {
    #[error("target identifier is empty")]
    EmptyTarget,

    #[error("rule has no {0} constraint")]
    MissingConstraint(String),

    #[error("invalid access count '{value}': {reason}")]
    InvalidCount { value: String, reason: String },

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid time interval: {0}")]
    InvalidInterval(String),
}

pub type PolicyResult<T> = Result<T, MalformedPolicyError>;
