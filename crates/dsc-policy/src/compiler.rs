//! Compiler: turns a classified rule into a temporal formula.
//!
//! Every supported pattern has a fixed formula shape; all of them except
//! `ProvideAccess` are safety checks of the form "no reachable path
//! violates the rule", i.e. `NOT(MODAL(...))`.

use tracing::debug;

use crate::error::PolicyResult;
use crate::formula::{ArcPredicate, StateFormula, TransitionFormula};
use crate::pattern::PolicyPattern;
use crate::rule::{Rule, Target};
use crate::{LOGGING_LABEL, NOTIFICATION_LABEL};

/// Compile a `(pattern, rule, target)` triple into a state formula.
///
/// Returns `Ok(None)` for patterns without a formula; callers treat that as
/// "no constraint enforced". Rule values that cannot be interpreted (negative
/// or oversized counts, unparseable dates, empty targets) are rejected here,
/// before any evaluation happens.
pub fn compile(
    pattern: PolicyPattern,
    rule: &Rule,
    target: &Target,
) -> PolicyResult<Option<StateFormula>> {
    if !pattern.is_supported() {
        debug!(target = %target, "No formula for unsupported pattern");
        return Ok(None);
    }
    target.validate()?;

    let formula = match pattern {
        PolicyPattern::ProvideAccess => StateFormula::True,
        PolicyPattern::ProhibitAccess => reachable_violation(ArcPredicate::reads(target)),
        PolicyPattern::NTimesUsage => n_times_usage(rule.max_access_count()?, target),
        PolicyPattern::UsageUntilDeletion => usage_until_deletion(target),
        PolicyPattern::UsageLogging => {
            reachable_violation(ArcPredicate::reads_without_flag(target, LOGGING_LABEL))
        }
        PolicyPattern::UsageNotification => {
            reachable_violation(ArcPredicate::reads_without_flag(target, NOTIFICATION_LABEL))
        }
        PolicyPattern::ConnectorRestrictedUsage => {
            let connector = rule.restricted_endpoint()?;
            reachable_violation(ArcPredicate::reads_outside_connector(target, &connector))
        }
        PolicyPattern::DurationUsage => {
            reachable_violation(ArcPredicate::reads_after_elapsed(target, rule.usage_duration()?))
        }
        PolicyPattern::UsageDuringInterval => {
            reachable_violation(ArcPredicate::reads_outside_interval(target, rule.time_interval()?))
        }
        PolicyPattern::Unsupported => return Ok(None),
    };

    debug!(pattern = %pattern, target = %target, formula = %formula, "Compiled rule");
    Ok(Some(formula))
}

/// `NOT(MODAL(POS(AF(p))))`: no path reaches a transition satisfying `p`.
fn reachable_violation(predicate: ArcPredicate) -> StateFormula {
    StateFormula::not(StateFormula::modal(TransitionFormula::pos(
        TransitionFormula::af(predicate),
    )))
}

/// No path reads `target` more than `max` times.
///
/// The innermost layer matches one read; each of the `max` outer layers
/// demands one more read before it, so the chain matches `max + 1` reads.
fn n_times_usage(max: u64, target: &Target) -> StateFormula {
    let read = || TransitionFormula::af(ArcPredicate::reads(target));

    let mut chain = TransitionFormula::pos(read());
    for _ in 0..max {
        chain = TransitionFormula::pos(TransitionFormula::and(read(), chain));
    }
    StateFormula::not(StateFormula::modal(chain))
}

/// No path reads `target` without erasing it afterwards.
fn usage_until_deletion(target: &Target) -> StateFormula {
    StateFormula::not(StateFormula::modal(TransitionFormula::pos(
        TransitionFormula::and(
            TransitionFormula::af(ArcPredicate::reads(target)),
            TransitionFormula::not(TransitionFormula::ev(TransitionFormula::af(
                ArcPredicate::erases(target),
            ))),
        ),
    )))
}
