use dsc_petrinet::NetError;
use dsc_policy::MalformedPolicyError;
use dsc_verifier::VerifyError;
use thiserror::Error;

/// Errors from the access gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Every governing agreement was violated; carries the last one tried.
    #[error("policy restriction by agreement {agreement}: {description}")]
    PolicyRestriction {
        agreement: String,
        description: String,
    },

    /// Download, fetch or route dispatch failed (timeouts included).
    #[error("i/o error: {0}")]
    Io(String),

    /// The artifact's data representation cannot be handled.
    #[error("unsupported data representation: {0}")]
    UnreachableLine(String),

    #[error("malformed policy: {0}")]
    Malformed(#[from] MalformedPolicyError),

    #[error("verification failed: {0}")]
    Verification(String),

    #[error("lifecycle net could not be built: {0}")]
    Net(#[from] NetError),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("repository error: {0}")]
    Repository(String),
}

impl From<VerifyError> for GateError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Malformed(e) => GateError::Malformed(e),
            other => GateError::Verification(other.to_string()),
        }
    }
}

impl GateError {
    /// Denials are access decisions, not failures of the data path.
    pub fn is_policy_restriction(&self) -> bool {
        matches!(self, GateError::PolicyRestriction { .. })
    }
}

pub type GateResult<T> = Result<T, GateError>;
