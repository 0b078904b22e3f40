//! Petri nets derived from application routes.
//!
//! A route (and each of its sub-routes) becomes a place; every endpoint
//! becomes a transition. Route starts are modelled as `endpoint -> route`
//! arcs, route ends as `route -> endpoint` arcs. A marked source place feeds
//! every transition without inputs and a sink place collects every
//! transition without outputs, so the net has a single entry and exit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::PetriNetBuilder;
use crate::error::NetResult;
use crate::model::{ArcDirection, PetriNet, TransitionContext};

pub const SOURCE_PLACE: &str = "place://source";
pub const SINK_PLACE: &str = "place://sink";

/// An endpoint a route starts or ends at, with what it does to data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEndpoint {
    pub id: String,
    #[serde(default)]
    pub context: TransitionContext,
}

impl RouteEndpoint {
    pub fn new(id: impl Into<String>, context: TransitionContext) -> Self {
        Self {
            id: id.into(),
            context,
        }
    }
}

/// A sub-route: one processing step between endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub id: String,
    #[serde(default)]
    pub starts: Vec<RouteEndpoint>,
    #[serde(default)]
    pub ends: Vec<RouteEndpoint>,
    #[serde(default)]
    pub sub_routes: Vec<RouteStep>,
}

/// Top-level application route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRoute {
    pub id: String,
    #[serde(default)]
    pub starts: Vec<RouteEndpoint>,
    #[serde(default)]
    pub ends: Vec<RouteEndpoint>,
    #[serde(default)]
    pub sub_routes: Vec<RouteStep>,
}

/// Builds a [`PetriNet`] from an [`AppRoute`].
pub struct RouteNetBuilder {
    include_app_route: bool,
}

impl Default for RouteNetBuilder {
    fn default() -> Self {
        Self {
            include_app_route: true,
        }
    }
}

impl RouteNetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the top-level route itself becomes a place (default: true).
    pub fn include_app_route(mut self, include: bool) -> Self {
        self.include_app_route = include;
        self
    }

    pub fn build(&self, route: &AppRoute) -> NetResult<PetriNet> {
        let mut b = PetriNetBuilder::new(route.id.clone());

        if self.include_app_route {
            add_step(&mut b, &route.id, &route.starts, &route.ends)?;
        }
        for sub in &route.sub_routes {
            add_sub_route(&mut b, sub)?;
        }

        let entry = b.transitions_without_inputs();
        let exit = b.transitions_without_outputs();

        let source = b.place(SOURCE_PLACE, 1)?;
        let sink = b.place(SINK_PLACE, 0)?;
        for t in entry {
            b.input(source, t)?;
        }
        for t in exit {
            b.output(t, sink)?;
        }

        let net = b.build();
        debug!(
            route = %route.id,
            places = net.places().len(),
            transitions = net.transitions().len(),
            "Built route net"
        );
        Ok(net)
    }
}

fn add_sub_route(b: &mut PetriNetBuilder, step: &RouteStep) -> NetResult<()> {
    // A step reachable along several paths is added once.
    if b.find_place(&step.id).is_some() {
        return Ok(());
    }
    add_step(b, &step.id, &step.starts, &step.ends)?;
    for sub in &step.sub_routes {
        add_sub_route(b, sub)?;
    }
    Ok(())
}

fn add_step(
    b: &mut PetriNetBuilder,
    id: &str,
    starts: &[RouteEndpoint],
    ends: &[RouteEndpoint],
) -> NetResult<()> {
    let place = b.place(id, 0)?;
    for endpoint in starts {
        let t = b.transition_or_existing(&endpoint.id, &endpoint.context)?;
        if !b.has_arc(place, t, ArcDirection::TransitionToPlace) {
            b.output(t, place)?;
        }
    }
    for endpoint in ends {
        let t = b.transition_or_existing(&endpoint.id, &endpoint.context)?;
        if !b.has_arc(place, t, ArcDirection::PlaceToTransition) {
            b.input(place, t)?;
        }
    }
    Ok(())
}
