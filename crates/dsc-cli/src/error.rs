//! Error types for dscctl

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Malformed(#[from] dsc_policy::MalformedPolicyError),

    #[error(transparent)]
    Net(#[from] dsc_petrinet::NetError),

    #[error(transparent)]
    Verify(#[from] dsc_verifier::VerifyError),

    #[error(transparent)]
    Gate(#[from] dsc_gate::GateError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type CliResult<T> = Result<T, CliError>;
