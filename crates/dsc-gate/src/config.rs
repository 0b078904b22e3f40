//! Gate configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ledger::DEFAULT_LEDGER_CAPACITY;

/// What this connector does when it handles data.
///
/// Feeds the lifecycle net: reads carry the connector id and the
/// `logging` / `notification` labels when enabled here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorProfile {
    #[serde(default = "default_connector_id")]
    pub connector_id: String,

    #[serde(default)]
    pub logging: bool,

    #[serde(default)]
    pub notification: bool,

    /// Served data is erased after use.
    #[serde(default)]
    pub deletion_enforced: bool,
}

fn default_connector_id() -> String {
    "connector://self".to_string()
}

impl Default for ConnectorProfile {
    fn default() -> Self {
        Self {
            connector_id: default_connector_id(),
            logging: false,
            notification: false,
            deletion_enforced: false,
        }
    }
}

/// Configuration for the [`AccessGate`](crate::AccessGate).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Timeout for downloads and remote fetches (default: 30s)
    #[serde(default = "default_retrieve_timeout_secs")]
    pub retrieve_timeout_secs: u64,

    /// Timeout for each route dispatch (default: 10s)
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Rules whose pattern has no formula impose no constraint (default: true).
    /// When false, such a rule denies its agreement.
    #[serde(default = "default_allow_unsupported")]
    pub allow_unsupported_patterns: bool,

    /// Bound on the verifier's product state space (default: 100000)
    #[serde(default = "default_max_states")]
    pub max_states: usize,

    /// Ledger entries kept in memory; the oldest are dropped first (default: 10000)
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,

    #[serde(default)]
    pub profile: ConnectorProfile,
}

fn default_retrieve_timeout_secs() -> u64 {
    30
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

fn default_allow_unsupported() -> bool {
    true
}

fn default_max_states() -> usize {
    100_000
}

fn default_ledger_capacity() -> usize {
    DEFAULT_LEDGER_CAPACITY
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            retrieve_timeout_secs: default_retrieve_timeout_secs(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            allow_unsupported_patterns: default_allow_unsupported(),
            max_states: default_max_states(),
            ledger_capacity: default_ledger_capacity(),
            profile: ConnectorProfile::default(),
        }
    }
}

impl GateConfig {
    pub fn retrieve_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieve_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}
