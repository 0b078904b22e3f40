use dsc_policy::MalformedPolicyError;
use thiserror::Error;

/// Errors that stop a verification before a verdict is reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("malformed policy: {0}")]
    Malformed(#[from] MalformedPolicyError),

    #[error("negation nested inside a negated path formula is not supported")]
    NestedNegation,

    #[error("state space exceeded {limit} product states")]
    StateSpaceExceeded { limit: usize },
}

pub type VerifyResult<T> = Result<T, VerifyError>;
