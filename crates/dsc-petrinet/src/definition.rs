//! Serializable, name-based description of a net.
//!
//! Arcs refer to nodes by id; direction follows from which end is a place.

use serde::{Deserialize, Serialize};

use crate::builder::PetriNetBuilder;
use crate::error::NetResult;
use crate::model::{default_multiplicity, is_single, ArcDirection, PetriNet, TransitionContext};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDefinition {
    #[serde(default = "default_net_id")]
    pub id: String,
    #[serde(default)]
    pub places: Vec<PlaceDefinition>,
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
    #[serde(default)]
    pub arcs: Vec<ArcDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDefinition {
    pub id: String,
    #[serde(default)]
    pub tokens: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub id: String,
    #[serde(flatten)]
    pub context: TransitionContext,
    #[serde(default = "default_multiplicity", skip_serializing_if = "is_single")]
    pub multiplicity: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDefinition {
    pub from: String,
    pub to: String,
}

fn default_net_id() -> String {
    "net://anonymous".to_string()
}

impl NetDefinition {
    pub fn build(&self) -> NetResult<PetriNet> {
        let mut builder = PetriNetBuilder::new(self.id.clone());
        for p in &self.places {
            builder.place(p.id.clone(), p.tokens)?;
        }
        for t in &self.transitions {
            builder.repeated_transition(t.id.clone(), t.context.clone(), t.multiplicity)?;
        }
        for a in &self.arcs {
            builder.connect(&a.from, &a.to)?;
        }
        Ok(builder.build())
    }

    pub fn from_net(net: &PetriNet) -> Self {
        let places = net
            .places()
            .iter()
            .map(|p| PlaceDefinition {
                id: p.id.clone(),
                tokens: p.initial_tokens,
            })
            .collect();
        let transitions = net
            .transitions()
            .iter()
            .map(|t| TransitionDefinition {
                id: t.id.clone(),
                context: t.context.clone(),
                multiplicity: t.multiplicity,
            })
            .collect();
        let arcs = net
            .arcs()
            .iter()
            .filter_map(|a| {
                let place = net.place(a.place)?.id.clone();
                let transition = net.transition(a.transition)?.id.clone();
                Some(match a.direction {
                    ArcDirection::PlaceToTransition => ArcDefinition {
                        from: place,
                        to: transition,
                    },
                    ArcDirection::TransitionToPlace => ArcDefinition {
                        from: transition,
                        to: place,
                    },
                })
            })
            .collect();

        Self {
            id: net.id().to_string(),
            places,
            transitions,
            arcs,
        }
    }
}
