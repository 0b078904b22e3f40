use std::fmt;

use dsc_petrinet::TransitionId;
use serde::{Deserialize, Serialize};

/// The firing sequence that shows a rule is broken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub transitions: Vec<TransitionId>,
    /// Transition ids as named in the net, same order as `transitions`.
    pub transition_names: Vec<String>,
    /// Description of the predicate that completed the violation.
    pub description: String,
}

impl Witness {
    /// The transition that completed the violation.
    pub fn trigger(&self) -> Option<&str> {
        self.transition_names.last().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transition_names.is_empty() {
            write!(f, "{}", self.description)
        } else {
            write!(
                f,
                "{} (path: {})",
                self.description,
                self.transition_names.join(" -> ")
            )
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VerificationResult {
    Satisfied,
    Violated(Witness),
}

impl VerificationResult {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, VerificationResult::Satisfied)
    }

    pub fn witness(&self) -> Option<&Witness> {
        match self {
            VerificationResult::Satisfied => None,
            VerificationResult::Violated(w) => Some(w),
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Satisfied => write!(f, "satisfied"),
            VerificationResult::Violated(w) => write!(f, "violated: {}", w),
        }
    }
}
