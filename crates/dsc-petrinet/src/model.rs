use std::collections::BTreeSet;
use std::fmt;

use dsc_policy::Target;
use serde::{Deserialize, Serialize};

/// Index of a place in its net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceId(pub usize);

/// Index of a transition in its net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub usize);

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// What firing a transition does to artifacts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionContext {
    #[serde(default)]
    pub read: BTreeSet<Target>,
    #[serde(default)]
    pub erase: BTreeSet<Target>,
    /// Connector identities and flags such as `"logging"`.
    #[serde(default)]
    pub context_labels: BTreeSet<String>,
}

impl TransitionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(mut self, target: impl Into<Target>) -> Self {
        self.read.insert(target.into());
        self
    }

    pub fn erasing(mut self, target: impl Into<Target>) -> Self {
        self.erase.insert(target.into());
        self
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.context_labels.insert(label.into());
        self
    }

    pub fn reads(&self, target: &Target) -> bool {
        self.read.contains(target)
    }

    pub fn erases(&self, target: &Target) -> bool {
        self.erase.contains(target)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.context_labels.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.erase.is_empty() && self.context_labels.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub initial_tokens: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub context: TransitionContext,
    /// Consecutive firings this transition stands for on a path. The marking
    /// changes as for a single firing.
    #[serde(default = "default_multiplicity", skip_serializing_if = "is_single")]
    pub multiplicity: u64,
}

pub(crate) fn default_multiplicity() -> u64 {
    1
}

pub(crate) fn is_single(multiplicity: &u64) -> bool {
    *multiplicity == 1
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arc {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub direction: ArcDirection,
}

/// Token count per place, indexed like the net's places.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Marking(Vec<u32>);

impl Marking {
    pub fn new(tokens: Vec<u32>) -> Self {
        Self(tokens)
    }

    pub fn tokens(&self, place: PlaceId) -> u32 {
        self.0.get(place.0).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&t| u64::from(t)).sum()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, t) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "]")
    }
}

/// A place/transition net with unit-weight arcs.
///
/// Built through [`crate::PetriNetBuilder`], which guarantees that every arc
/// refers to existing nodes and that node ids are unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PetriNet {
    pub(crate) id: String,
    pub(crate) places: Vec<Place>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) arcs: Vec<Arc>,
    pub(crate) inputs: Vec<Vec<PlaceId>>,
    pub(crate) outputs: Vec<Vec<PlaceId>>,
}

impl PetriNet {
    pub fn builder(id: impl Into<String>) -> crate::builder::PetriNetBuilder {
        crate::builder::PetriNetBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn place(&self, id: PlaceId) -> Option<&Place> {
        self.places.get(id.0)
    }

    pub fn transition(&self, id: TransitionId) -> Option<&Transition> {
        self.transitions.get(id.0)
    }

    pub fn place_by_name(&self, name: &str) -> Option<PlaceId> {
        self.places.iter().position(|p| p.id == name).map(PlaceId)
    }

    pub fn transition_by_name(&self, name: &str) -> Option<TransitionId> {
        self.transitions
            .iter()
            .position(|t| t.id == name)
            .map(TransitionId)
    }

    pub fn transition_ids(&self) -> impl Iterator<Item = TransitionId> {
        (0..self.transitions.len()).map(TransitionId)
    }

    pub fn inputs_of(&self, t: TransitionId) -> &[PlaceId] {
        self.inputs.get(t.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn outputs_of(&self, t: TransitionId) -> &[PlaceId] {
        self.outputs.get(t.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn initial_marking(&self) -> Marking {
        Marking(self.places.iter().map(|p| p.initial_tokens).collect())
    }

    /// A transition is enabled when each input place holds a token.
    pub fn is_enabled(&self, marking: &Marking, t: TransitionId) -> bool {
        t.0 < self.transitions.len() && self.inputs_of(t).iter().all(|&p| marking.tokens(p) > 0)
    }

    pub fn enabled(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transition_ids()
            .filter(|&t| self.is_enabled(marking, t))
            .collect()
    }

    /// No transition can fire.
    pub fn is_dead(&self, marking: &Marking) -> bool {
        !self.transition_ids().any(|t| self.is_enabled(marking, t))
    }

    /// Marking after firing `t`, or `None` if `t` is not enabled.
    pub fn fire(&self, marking: &Marking, t: TransitionId) -> Option<Marking> {
        if !self.is_enabled(marking, t) {
            return None;
        }
        let mut next = marking.0.clone();
        for p in self.inputs_of(t) {
            next[p.0] -= 1;
        }
        for p in self.outputs_of(t) {
            next[p.0] = next[p.0].saturating_add(1);
        }
        Some(Marking(next))
    }

    /// Transitions whose context reads `target`.
    pub fn transitions_reading(&self, target: &Target) -> Vec<TransitionId> {
        self.transition_ids()
            .filter(|&t| self.transitions[t.0].context.reads(target))
            .collect()
    }

    /// Transitions whose context erases `target`.
    pub fn transitions_erasing(&self, target: &Target) -> Vec<TransitionId> {
        self.transition_ids()
            .filter(|&t| self.transitions[t.0].context.erases(target))
            .collect()
    }

    /// Names of the given transitions, for reporting.
    pub fn transition_names(&self, path: &[TransitionId]) -> Vec<String> {
        path.iter()
            .filter_map(|&t| self.transition(t).map(|tr| tr.id.clone()))
            .collect()
    }
}
