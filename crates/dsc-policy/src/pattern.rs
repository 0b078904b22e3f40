use std::fmt;

use serde::{Deserialize, Serialize};

/// Recognized usage-control pattern, as assigned by the policy classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyPattern {
    ProvideAccess,
    ProhibitAccess,
    NTimesUsage,
    DurationUsage,
    UsageDuringInterval,
    UsageUntilDeletion,
    UsageLogging,
    UsageNotification,
    ConnectorRestrictedUsage,
    /// Anything the classifier could not map to a known pattern.
    #[serde(other)]
    Unsupported,
}

impl PolicyPattern {
    /// Every pattern the compiler emits a formula for.
    pub const SUPPORTED: [PolicyPattern; 9] = [
        PolicyPattern::ProvideAccess,
        PolicyPattern::ProhibitAccess,
        PolicyPattern::NTimesUsage,
        PolicyPattern::DurationUsage,
        PolicyPattern::UsageDuringInterval,
        PolicyPattern::UsageUntilDeletion,
        PolicyPattern::UsageLogging,
        PolicyPattern::UsageNotification,
        PolicyPattern::ConnectorRestrictedUsage,
    ];

    pub fn is_supported(&self) -> bool {
        !matches!(self, PolicyPattern::Unsupported)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyPattern::ProvideAccess => "PROVIDE_ACCESS",
            PolicyPattern::ProhibitAccess => "PROHIBIT_ACCESS",
            PolicyPattern::NTimesUsage => "N_TIMES_USAGE",
            PolicyPattern::DurationUsage => "DURATION_USAGE",
            PolicyPattern::UsageDuringInterval => "USAGE_DURING_INTERVAL",
            PolicyPattern::UsageUntilDeletion => "USAGE_UNTIL_DELETION",
            PolicyPattern::UsageLogging => "USAGE_LOGGING",
            PolicyPattern::UsageNotification => "USAGE_NOTIFICATION",
            PolicyPattern::ConnectorRestrictedUsage => "CONNECTOR_RESTRICTED_USAGE",
            PolicyPattern::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for PolicyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
