use thiserror::Error;

/// Errors raised while assembling a Petri net.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("duplicate place id: {0}")]
    DuplicatePlace(String),

    #[error("duplicate transition id: {0}")]
    DuplicateTransition(String),

    #[error("place and transition share id: {0}")]
    AmbiguousNode(String),

    #[error("unknown node in arc: {0}")]
    UnknownNode(String),

    #[error("arc must connect a place and a transition: {from} -> {to}")]
    InvalidArc { from: String, to: String },

    #[error("transition {0} must fire at least once")]
    ZeroMultiplicity(String),

    #[error("duplicate arc: {from} -> {to}")]
    DuplicateArc { from: String, to: String },
}

pub type NetResult<T> = Result<T, NetError>;
