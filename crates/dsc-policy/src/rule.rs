use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::UsageDuration;
use crate::error::{MalformedPolicyError, PolicyResult};
use crate::pattern::PolicyPattern;

/// Largest COUNT an N-times rule may carry. The compiled chain holds one
/// read predicate per allowed use.
pub const MAX_ACCESS_COUNT: u64 = 10_000;

/// Opaque identifier (URI) of the artifact or resource a rule applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject identifiers that cannot name anything.
    pub fn validate(&self) -> PolicyResult<()> {
        if self.0.trim().is_empty() {
            return Err(MalformedPolicyError::EmptyTarget);
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Permission,
    Prohibition,
    Duty,
}

/// Left operand of a constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeftOperand {
    Count,
    Endpoint,
    PolicyEvaluationTime,
    ElapsedTime,
    SecurityLevel,
    #[serde(untagged)]
    Other(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Eq,
    Lt,
    Lteq,
    Gt,
    Gteq,
    After,
    Before,
    DefinesAs,
    SameAs,
    In,
}

/// A single `(left operand, operator, right operand)` constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub left_operand: LeftOperand,
    pub operator: Operator,
    pub right_operand: String,
    /// Policy information point consulted for the left operand, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_endpoint: Option<String>,
}

impl Constraint {
    pub fn new(left: LeftOperand, operator: Operator, right: impl Into<String>) -> Self {
        Self {
            left_operand: left,
            operator,
            right_operand: right.into(),
            pip_endpoint: None,
        }
    }

    pub fn with_pip(mut self, endpoint: impl Into<String>) -> Self {
        self.pip_endpoint = Some(endpoint.into());
        self
    }
}

/// Allowed usage window. Access is valid strictly between `start` and `end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant > self.start && instant < self.end
    }
}

/// A permission, prohibition or duty as handed over by the policy parser.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: RuleKind,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            id: None,
            kind,
            constraints: Vec::new(),
        }
    }

    pub fn permission() -> Self {
        Self::new(RuleKind::Permission)
    }

    pub fn prohibition() -> Self {
        Self::new(RuleKind::Prohibition)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn first(&self, operand: &LeftOperand) -> Option<&Constraint> {
        self.constraints.iter().find(|c| &c.left_operand == operand)
    }

    /// Inclusive upper bound on the number of reads, from the COUNT constraint.
    ///
    /// `EQ` and `LTEQ` yield the literal, `LT` one less, any other operator
    /// allows no access at all.
    pub fn max_access_count(&self) -> PolicyResult<u64> {
        let constraint = self
            .first(&LeftOperand::Count)
            .ok_or_else(|| MalformedPolicyError::MissingConstraint("COUNT".into()))?;

        let raw = constraint.right_operand.trim();
        let value: i64 = raw.parse().map_err(|_| MalformedPolicyError::InvalidCount {
            value: raw.to_string(),
            reason: "not an integer".into(),
        })?;
        if value < 0 {
            return Err(MalformedPolicyError::InvalidCount {
                value: raw.to_string(),
                reason: "negative".into(),
            });
        }
        let value = value as u64;
        if value > MAX_ACCESS_COUNT {
            return Err(MalformedPolicyError::InvalidCount {
                value: raw.to_string(),
                reason: format!("exceeds the maximum of {}", MAX_ACCESS_COUNT),
            });
        }

        Ok(match constraint.operator {
            Operator::Eq | Operator::Lteq => value,
            Operator::Lt => value.saturating_sub(1),
            _ => 0,
        })
    }

    /// The single connector the data may be used in, from the ENDPOINT constraint.
    pub fn restricted_endpoint(&self) -> PolicyResult<String> {
        let constraint = self
            .first(&LeftOperand::Endpoint)
            .ok_or_else(|| MalformedPolicyError::MissingConstraint("ENDPOINT".into()))?;
        let endpoint = constraint.right_operand.trim();
        if endpoint.is_empty() || endpoint.chars().any(char::is_whitespace) {
            return Err(MalformedPolicyError::InvalidEndpoint(
                constraint.right_operand.clone(),
            ));
        }
        Ok(endpoint.to_string())
    }

    /// Usage window from POLICY_EVALUATION_TIME constraints.
    pub fn time_interval(&self) -> PolicyResult<TimeInterval> {
        let mut start = None;
        let mut end = None;
        for c in self
            .constraints
            .iter()
            .filter(|c| c.left_operand == LeftOperand::PolicyEvaluationTime)
        {
            let instant = parse_instant(&c.right_operand)?;
            match c.operator {
                Operator::After => start = Some(instant),
                Operator::Before => end = Some(instant),
                other => {
                    return Err(MalformedPolicyError::InvalidInterval(format!(
                        "unexpected operator {:?}",
                        other
                    )))
                }
            }
        }

        let start = start
            .ok_or_else(|| MalformedPolicyError::InvalidInterval("missing start".into()))?;
        let end =
            end.ok_or_else(|| MalformedPolicyError::InvalidInterval("missing end".into()))?;
        if start >= end {
            return Err(MalformedPolicyError::InvalidInterval(format!(
                "start {} is not before end {}",
                start, end
            )));
        }
        Ok(TimeInterval { start, end })
    }

    /// Allowed usage period from the ELAPSED_TIME constraint.
    pub fn usage_duration(&self) -> PolicyResult<UsageDuration> {
        let constraint = self
            .first(&LeftOperand::ElapsedTime)
            .ok_or_else(|| MalformedPolicyError::MissingConstraint("ELAPSED_TIME".into()))?;
        UsageDuration::parse(&constraint.right_operand)
    }
}

fn parse_instant(raw: &str) -> PolicyResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MalformedPolicyError::InvalidInterval(format!("'{}': {}", raw, e)))
}

/// A rule the classifier has already assigned a pattern and target to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifiedRule {
    pub pattern: PolicyPattern,
    pub rule: Rule,
    pub target: Target,
}

impl ClassifiedRule {
    pub fn new(pattern: PolicyPattern, rule: Rule, target: impl Into<Target>) -> Self {
        Self {
            pattern,
            rule,
            target: target.into(),
        }
    }
}
