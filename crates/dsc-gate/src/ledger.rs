use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an access attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    /// The agreement's rules were all satisfied.
    Authorized,
    /// The agreement was violated.
    Denied,
    /// No agreement governs the artifact.
    Unrestricted,
    /// Locally stored data was erased.
    Deleted,
    /// Access was allowed but fetching, dispatching or counting failed.
    Failed,
}

/// One decision in the access ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub id: Uuid,
    pub artifact_id: String,
    pub agreement_id: Option<String>,
    pub outcome: AccessOutcome,
    /// Witness description for denials, error text for failures.
    pub witness: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AccessEntry {
    pub fn new(
        artifact_id: impl Into<String>,
        agreement_id: Option<String>,
        outcome: AccessOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact_id: artifact_id.into(),
            agreement_id,
            outcome,
            witness: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_witness(mut self, description: impl Into<String>) -> Self {
        self.witness = Some(description.into());
        self
    }
}

/// Filter for querying the ledger.
#[derive(Clone, Debug, Default)]
pub struct LedgerFilter {
    pub artifact_id: Option<String>,
    pub agreement_id: Option<String>,
    pub outcome: Option<AccessOutcome>,
}

impl LedgerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, artifact_id: impl Into<String>) -> Self {
        self.artifact_id = Some(artifact_id.into());
        self
    }

    pub fn with_agreement(mut self, agreement_id: impl Into<String>) -> Self {
        self.agreement_id = Some(agreement_id.into());
        self
    }

    pub fn with_outcome(mut self, outcome: AccessOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn matches(&self, entry: &AccessEntry) -> bool {
        if let Some(ref id) = self.artifact_id {
            if entry.artifact_id != *id {
                return false;
            }
        }
        if let Some(ref id) = self.agreement_id {
            if entry.agreement_id.as_ref() != Some(id) {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if entry.outcome != outcome {
                return false;
            }
        }
        true
    }
}

/// Append-only record of access decisions.
///
/// Entries are never modified. Once `capacity` entries are held, each new
/// entry evicts the oldest one.
#[derive(Debug)]
pub struct AccessLedger {
    entries: VecDeque<AccessEntry>,
    capacity: usize,
}

impl Default for AccessLedger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }
}

/// Entries kept when no capacity is configured.
pub const DEFAULT_LEDGER_CAPACITY: usize = 10_000;

impl AccessLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&mut self, entry: AccessEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn query(&self, filter: &LedgerFilter) -> Vec<&AccessEntry> {
        self.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    /// All entries for an artifact, oldest first.
    pub fn history(&self, artifact_id: &str) -> Vec<&AccessEntry> {
        self.entries
            .iter()
            .filter(|e| e.artifact_id == artifact_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
