use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time inputs for time-dependent predicates.
///
/// Kept outside the formula so compilation stays pure: the same formula
/// can be evaluated at different instants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalEnv {
    /// The policy evaluation instant.
    pub now: DateTime<Utc>,
    /// When usage of the artifact began, if it has.
    #[serde(default)]
    pub usage_start: Option<DateTime<Utc>>,
}

impl EvalEnv {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            usage_start: None,
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn with_usage_start(mut self, start: DateTime<Utc>) -> Self {
        self.usage_start = Some(start);
        self
    }
}

impl Default for EvalEnv {
    fn default() -> Self {
        Self::now()
    }
}

/// Search limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOptions {
    /// Upper bound on explored (marking, obligation) pairs.
    #[serde(default = "default_max_states")]
    pub max_states: usize,
}

fn default_max_states() -> usize {
    100_000
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_states: default_max_states(),
        }
    }
}
