//! Petri-net model of the connector's possible data-handling executions.
//!
//! Places and transitions live in an index arena; arcs refer to them by
//! [`PlaceId`] / [`TransitionId`], so cyclic nets need no shared ownership.
//! Each transition carries a [`TransitionContext`] describing what firing it
//! does to artifacts: which targets it reads or erases and which free-form
//! labels (connector identity, `"logging"`, `"notification"`) apply.
//!
//! The model is inert: it answers structural questions (which transitions
//! are enabled at a marking, what firing one produces) and leaves the
//! reachability search to the verifier.

#![deny(unsafe_code)]

pub mod builder;
pub mod definition;
pub mod dot;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod route;

pub use builder::PetriNetBuilder;
pub use definition::{ArcDefinition, NetDefinition, PlaceDefinition, TransitionDefinition};
pub use dot::to_dot;
pub use error::{NetError, NetResult};
pub use lifecycle::{LifecycleNet, LifecycleSpec};
pub use model::{
    Arc, ArcDirection, Marking, PetriNet, Place, PlaceId, Transition, TransitionContext,
    TransitionId,
};
pub use route::{AppRoute, RouteEndpoint, RouteNetBuilder, RouteStep, SINK_PLACE, SOURCE_PLACE};
