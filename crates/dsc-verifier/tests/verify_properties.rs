//! Property tests for rule verification over generated nets.

use chrono::{TimeZone, Utc};
use dsc_petrinet::{LifecycleNet, LifecycleSpec, PetriNet, PetriNetBuilder, TransitionContext};
use dsc_policy::{compile, Constraint, LeftOperand, Operator, PolicyPattern, Rule, Target};
use dsc_verifier::{verify, verify_rule, EvalEnv, VerificationResult};
use proptest::prelude::*;

const TARGET: &str = "artifact://42";

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn target() -> Target {
    Target::new(TARGET)
}

fn env() -> EvalEnv {
    EvalEnv::at(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

fn count_rule(n: u64) -> Rule {
    Rule::permission().with_constraint(Constraint::new(
        LeftOperand::Count,
        Operator::Lteq,
        n.to_string(),
    ))
}

/// `reads` reads of the target, interleaved with `noise` unrelated steps,
/// all on one path.
fn linear_net(reads: usize, noise: usize) -> PetriNet {
    let mut b = PetriNetBuilder::new("net://linear");
    let mut current = b.place("p0", 1).unwrap();
    let mut kinds = Vec::new();
    for i in 0..reads.max(noise) {
        if i < noise {
            kinds.push(false);
        }
        if i < reads {
            kinds.push(true);
        }
    }
    for (i, is_read) in kinds.into_iter().enumerate() {
        let ctx = if is_read {
            TransitionContext::new().reading(TARGET)
        } else {
            TransitionContext::new().reading("artifact://other")
        };
        let t = b.transition(format!("t{}", i), ctx).unwrap();
        let next = b.place(format!("p{}", i + 1), 0).unwrap();
        b.input(current, t).unwrap();
        b.output(t, next).unwrap();
        current = next;
    }
    b.build()
}

fn reads_in(net: &PetriNet) -> usize {
    net.transitions_reading(&target()).len()
}

// ----------------------------------------------------------------------------
// Strategies
// ----------------------------------------------------------------------------

fn arb_net() -> impl Strategy<Value = PetriNet> {
    (0usize..6, 0usize..4).prop_map(|(reads, noise)| linear_net(reads, noise))
}

fn arb_lifecycle() -> impl Strategy<Value = LifecycleSpec> {
    (0u64..50_000, any::<bool>(), any::<bool>()).prop_map(|(prior, logging, erase)| {
        LifecycleSpec::new(TARGET, "connector://self")
            .with_prior_reads(prior)
            .with_logging(logging)
            .with_erase(erase)
    })
}

// ----------------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn provide_access_always_holds(net in arb_net()) {
        let provide = PolicyPattern::ProvideAccess;
        let r = verify_rule(provide, &Rule::permission(), &target(), &net, &env()).unwrap();
        prop_assert!(r.is_satisfied());
    }

    #[test]
    fn n_times_is_inclusive_bound(net in arb_net(), k in 0u64..6) {
        let r = verify_rule(PolicyPattern::NTimesUsage, &count_rule(k), &target(), &net, &env())
            .unwrap();
        let reads = reads_in(&net) as u64;
        prop_assert_eq!(r.is_satisfied(), reads <= k);

        if let VerificationResult::Violated(w) = r {
            let t = *w.transitions.last().unwrap();
            prop_assert!(net.transition(t).unwrap().context.reads(&target()));
            let witnessed = w
                .transitions
                .iter()
                .filter(|&&t| net.transition(t).unwrap().context.reads(&target()))
                .count() as u64;
            prop_assert_eq!(witnessed, k + 1);
        }
    }

    #[test]
    fn prohibit_holds_iff_no_read(net in arb_net()) {
        let prohibit = PolicyPattern::ProhibitAccess;
        let r = verify_rule(prohibit, &Rule::prohibition(), &target(), &net, &env()).unwrap();
        prop_assert_eq!(r.is_satisfied(), reads_in(&net) == 0);
    }

    #[test]
    fn until_deletion_follows_erase(spec in arb_lifecycle()) {
        let net = LifecycleNet::build(&spec).unwrap();
        let until_deletion = PolicyPattern::UsageUntilDeletion;
        let r = verify_rule(until_deletion, &Rule::permission(), &target(), &net, &env()).unwrap();
        prop_assert_eq!(r.is_satisfied(), spec.erase_after_use);
    }

    #[test]
    fn logging_follows_profile(spec in arb_lifecycle()) {
        let net = LifecycleNet::build(&spec).unwrap();
        let logging = PolicyPattern::UsageLogging;
        let r = verify_rule(logging, &Rule::permission(), &target(), &net, &env()).unwrap();
        prop_assert_eq!(r.is_satisfied(), spec.logging);
    }

    #[test]
    fn verification_is_repeatable(net in arb_net(), k in 0u64..4) {
        let formula = compile(PolicyPattern::NTimesUsage, &count_rule(k), &target())
            .unwrap()
            .unwrap();
        let first = verify(&formula, &net, &env()).unwrap();
        let second = verify(&formula, &net, &env()).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ----------------------------------------------------------------------------
// Scenario
// ----------------------------------------------------------------------------

#[test]
fn third_read_of_artifact_42_breaks_two_use_limit() {
    let rule = count_rule(2);

    // One read served: the pending one is the second.
    let net = LifecycleNet::build(
        &LifecycleSpec::new(TARGET, "connector://self").with_prior_reads(1),
    )
    .unwrap();
    let ok = verify_rule(PolicyPattern::NTimesUsage, &rule, &target(), &net, &env()).unwrap();
    assert_eq!(ok, VerificationResult::Satisfied);

    // Two reads served: the pending one would be the third.
    let net = LifecycleNet::build(
        &LifecycleSpec::new(TARGET, "connector://self").with_prior_reads(2),
    )
    .unwrap();
    let bad = verify_rule(PolicyPattern::NTimesUsage, &rule, &target(), &net, &env()).unwrap();
    let witness = bad.witness().unwrap();
    assert_eq!(
        witness.transition_names,
        vec!["transition://read/history", "transition://read/pending"]
    );
    assert_eq!(witness.trigger(), Some("transition://read/pending"));
}
