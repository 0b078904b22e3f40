//! Property tests for net construction and firing.

use dsc_petrinet::{
    AppRoute, LifecycleNet, LifecycleSpec, NetDefinition, PetriNet, RouteEndpoint,
    RouteNetBuilder, RouteStep, TransitionContext, SINK_PLACE, SOURCE_PLACE,
};
use dsc_policy::Target;
use proptest::prelude::*;

// ----------------------------------------------------------------------------
// Strategies
// ----------------------------------------------------------------------------

fn arb_endpoint() -> impl Strategy<Value = RouteEndpoint> {
    ("[a-e]", any::<bool>()).prop_map(|(name, reads)| {
        let ctx = if reads {
            TransitionContext::new().reading("artifact://1")
        } else {
            TransitionContext::new()
        };
        RouteEndpoint::new(format!("endpoint://{}", name), ctx)
    })
}

fn arb_step(index: usize) -> impl Strategy<Value = RouteStep> {
    (
        prop::collection::vec(arb_endpoint(), 0..3),
        prop::collection::vec(arb_endpoint(), 0..3),
    )
        .prop_map(move |(starts, ends)| RouteStep {
            id: format!("route://sub/{}", index),
            starts,
            ends,
            sub_routes: vec![],
        })
}

fn arb_route() -> impl Strategy<Value = AppRoute> {
    (0usize..5)
        .prop_flat_map(|n| (0..n).map(arb_step).collect::<Vec<_>>())
        .prop_map(|sub_routes| AppRoute {
            id: "route://app".into(),
            starts: vec![],
            ends: vec![],
            sub_routes,
        })
}

fn arb_lifecycle() -> impl Strategy<Value = LifecycleSpec> {
    (0u64..100_000, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(prior, logging, notification, erase)| {
            LifecycleSpec::new("artifact://42", "connector://self")
                .with_prior_reads(prior)
                .with_logging(logging)
                .with_notification(notification)
                .with_erase(erase)
        },
    )
}

/// Fire the first enabled transition until the net is dead or `limit` steps.
fn run(net: &PetriNet, limit: usize) -> Vec<String> {
    let mut m = net.initial_marking();
    let mut fired = Vec::new();
    for _ in 0..limit {
        let Some(&t) = net.enabled(&m).first() else {
            break;
        };
        fired.push(net.transition(t).unwrap().id.clone());
        m = net.fire(&m, t).unwrap();
    }
    fired
}

// ----------------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------------

proptest! {
    #[test]
    fn route_nets_have_closed_ends(route in arb_route()) {
        let net = RouteNetBuilder::new()
            .include_app_route(false)
            .build(&route)
            .unwrap();

        let source = net.place_by_name(SOURCE_PLACE).unwrap();
        prop_assert!(net.place_by_name(SINK_PLACE).is_some());
        prop_assert_eq!(net.initial_marking().total(), 1);
        prop_assert_eq!(net.initial_marking().tokens(source), 1);

        for t in net.transition_ids() {
            prop_assert!(!net.inputs_of(t).is_empty());
            prop_assert!(!net.outputs_of(t).is_empty());
        }
    }

    #[test]
    fn definition_rebuild_is_identity(route in arb_route()) {
        let net = RouteNetBuilder::new().include_app_route(false).build(&route).unwrap();
        let rebuilt = NetDefinition::from_net(&net).build().unwrap();
        prop_assert_eq!(rebuilt, net);
    }

    #[test]
    fn firing_only_enabled_transitions(route in arb_route()) {
        let net = RouteNetBuilder::new().include_app_route(false).build(&route).unwrap();
        let m = net.initial_marking();
        for t in net.transition_ids() {
            prop_assert_eq!(net.fire(&m, t).is_some(), net.is_enabled(&m, t));
        }
    }

    #[test]
    fn lifecycle_runs_every_read_once(spec in arb_lifecycle()) {
        let net = LifecycleNet::build(&spec).unwrap();
        let target = Target::new("artifact://42");

        let reads: u64 = net
            .transitions_reading(&target)
            .into_iter()
            .map(|t| net.transition(t).unwrap().multiplicity)
            .sum();
        prop_assert_eq!(reads, spec.prior_reads + 1);

        let fired = run(&net, 32);
        let expected = usize::from(spec.prior_reads > 0) + 1 + usize::from(spec.erase_after_use);
        prop_assert_eq!(fired.len(), expected);
        prop_assert_eq!(fired.last().map(String::as_str) == Some("transition://erase"),
            spec.erase_after_use);
    }
}
