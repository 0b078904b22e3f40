//! Usage-control policy model and formula compiler.
//!
//! A negotiated contract carries rules (permissions, prohibitions, duties)
//! whose constraints have already been classified into one of the known
//! [`PolicyPattern`]s. This crate turns such a `(pattern, rule, target)`
//! triple into a temporal [`StateFormula`] that the verifier evaluates
//! against a Petri-net model of the connector.
//!
//! ## Patterns
//!
//! | Pattern | Enforced property |
//! |---|---|
//! | `ProvideAccess` | always allowed |
//! | `ProhibitAccess` | no reachable read of the target |
//! | `NTimesUsage` | at most `n` reads of the target on any path |
//! | `UsageUntilDeletion` | every read is followed by an erase |
//! | `UsageLogging` / `UsageNotification` | every read carries the flag |
//! | `ConnectorRestrictedUsage` | reads only happen inside one connector |
//! | `DurationUsage` | no read after the usage duration has elapsed |
//! | `UsageDuringInterval` | no read outside the allowed interval |
//!
//! Compilation is pure: compiling the same triple twice yields structurally
//! equal trees, and time-dependent patterns keep their bounds as data so the
//! evaluation instant is supplied by the caller.

#![deny(unsafe_code)]

pub mod compiler;
pub mod duration;
pub mod error;
pub mod formula;
pub mod pattern;
pub mod rule;

pub use compiler::compile;
pub use duration::UsageDuration;
pub use error::{MalformedPolicyError, PolicyResult};
pub use formula::{ArcPredicate, PredicateKind, StateFormula, TransitionFormula};
pub use pattern::PolicyPattern;
pub use rule::{
    ClassifiedRule, Constraint, LeftOperand, Operator, Rule, RuleKind, Target, TimeInterval,
    MAX_ACCESS_COUNT,
};

/// Context label carried by transitions that log the access.
pub const LOGGING_LABEL: &str = "logging";

/// Context label carried by transitions that notify the provider.
pub const NOTIFICATION_LABEL: &str = "notification";
