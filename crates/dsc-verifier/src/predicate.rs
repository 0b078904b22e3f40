//! Evaluation of arc predicates against transition contexts.

use dsc_petrinet::TransitionContext;
use dsc_policy::{ArcPredicate, PredicateKind};

use crate::env::EvalEnv;

/// Whether firing a transition with `ctx` satisfies `predicate` under `env`.
pub fn holds(predicate: &ArcPredicate, ctx: &TransitionContext, env: &EvalEnv) -> bool {
    match &predicate.kind {
        PredicateKind::Reads { target } => ctx.reads(target),
        PredicateKind::Erases { target } => ctx.erases(target),
        PredicateKind::ReadsWithoutLabel { target, label } => {
            ctx.reads(target) && !ctx.has_label(label)
        }
        PredicateKind::ReadsOutsideInterval { target, interval } => {
            ctx.reads(target) && !interval.contains(env.now)
        }
        PredicateKind::ReadsAfterElapsed { target, duration } => {
            // Usage that never started cannot have expired.
            let expired = env
                .usage_start
                .and_then(|start| start.checked_add_signed(duration.to_chrono()))
                .map(|deadline| env.now > deadline)
                .unwrap_or(false);
            ctx.reads(target) && expired
        }
    }
}
