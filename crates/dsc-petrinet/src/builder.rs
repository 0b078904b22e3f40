use std::collections::{HashMap, HashSet};

use crate::error::{NetError, NetResult};
use crate::model::{
    Arc, ArcDirection, PetriNet, Place, PlaceId, Transition, TransitionContext, TransitionId,
};

/// Incremental, validating construction of a [`PetriNet`].
pub struct PetriNetBuilder {
    id: String,
    places: Vec<Place>,
    transitions: Vec<Transition>,
    arcs: Vec<Arc>,
    seen_arcs: HashSet<Arc>,
    place_names: HashMap<String, PlaceId>,
    transition_names: HashMap<String, TransitionId>,
}

impl PetriNetBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            places: Vec::new(),
            transitions: Vec::new(),
            arcs: Vec::new(),
            seen_arcs: HashSet::new(),
            place_names: HashMap::new(),
            transition_names: HashMap::new(),
        }
    }

    pub fn place(&mut self, id: impl Into<String>, tokens: u32) -> NetResult<PlaceId> {
        let id = id.into();
        if self.place_names.contains_key(&id) {
            return Err(NetError::DuplicatePlace(id));
        }
        if self.transition_names.contains_key(&id) {
            return Err(NetError::AmbiguousNode(id));
        }
        let pid = PlaceId(self.places.len());
        self.places.push(Place {
            id: id.clone(),
            initial_tokens: tokens,
        });
        self.place_names.insert(id, pid);
        Ok(pid)
    }

    pub fn transition(
        &mut self,
        id: impl Into<String>,
        context: TransitionContext,
    ) -> NetResult<TransitionId> {
        self.repeated_transition(id, context, 1)
    }

    /// A transition standing for `multiplicity` identical firings in a row.
    pub fn repeated_transition(
        &mut self,
        id: impl Into<String>,
        context: TransitionContext,
        multiplicity: u64,
    ) -> NetResult<TransitionId> {
        let id = id.into();
        if multiplicity == 0 {
            return Err(NetError::ZeroMultiplicity(id));
        }
        if self.transition_names.contains_key(&id) {
            return Err(NetError::DuplicateTransition(id));
        }
        if self.place_names.contains_key(&id) {
            return Err(NetError::AmbiguousNode(id));
        }
        let tid = TransitionId(self.transitions.len());
        self.transitions.push(Transition {
            id: id.clone(),
            context,
            multiplicity,
        });
        self.transition_names.insert(id, tid);
        Ok(tid)
    }

    /// Look up a transition by id, creating it with `context` if absent.
    pub fn transition_or_existing(
        &mut self,
        id: &str,
        context: &TransitionContext,
    ) -> NetResult<TransitionId> {
        match self.transition_names.get(id) {
            Some(&tid) => Ok(tid),
            None => self.transition(id, context.clone()),
        }
    }

    pub fn find_place(&self, id: &str) -> Option<PlaceId> {
        self.place_names.get(id).copied()
    }

    pub fn find_transition(&self, id: &str) -> Option<TransitionId> {
        self.transition_names.get(id).copied()
    }

    pub fn set_tokens(&mut self, place: PlaceId, tokens: u32) -> NetResult<()> {
        let p = self
            .places
            .get_mut(place.0)
            .ok_or_else(|| NetError::UnknownNode(place.to_string()))?;
        p.initial_tokens = tokens;
        Ok(())
    }

    /// Arc `place -> transition`: firing consumes a token from `place`.
    pub fn input(&mut self, place: PlaceId, transition: TransitionId) -> NetResult<()> {
        self.arc(place, transition, ArcDirection::PlaceToTransition)
    }

    /// Arc `transition -> place`: firing produces a token in `place`.
    pub fn output(&mut self, transition: TransitionId, place: PlaceId) -> NetResult<()> {
        self.arc(place, transition, ArcDirection::TransitionToPlace)
    }

    /// Connect two nodes by id; one must be a place and the other a transition.
    pub fn connect(&mut self, from: &str, to: &str) -> NetResult<()> {
        let invalid = || NetError::InvalidArc {
            from: from.to_string(),
            to: to.to_string(),
        };
        match (self.find_place(from), self.find_transition(to)) {
            (Some(p), Some(t)) => return self.input(p, t),
            (Some(_), None) if self.find_place(to).is_some() => return Err(invalid()),
            _ => {}
        }
        match (self.find_transition(from), self.find_place(to)) {
            (Some(t), Some(p)) => self.output(t, p),
            (Some(_), None) if self.find_transition(to).is_some() => Err(invalid()),
            (None, _) if self.find_place(from).is_none() => {
                Err(NetError::UnknownNode(from.to_string()))
            }
            _ => Err(NetError::UnknownNode(to.to_string())),
        }
    }

    fn arc(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
    ) -> NetResult<()> {
        let place_name = self
            .places
            .get(place.0)
            .map(|p| p.id.clone())
            .ok_or_else(|| NetError::UnknownNode(place.to_string()))?;
        let transition_name = self
            .transitions
            .get(transition.0)
            .map(|t| t.id.clone())
            .ok_or_else(|| NetError::UnknownNode(transition.to_string()))?;

        let arc = Arc {
            place,
            transition,
            direction,
        };
        if !self.seen_arcs.insert(arc) {
            let (from, to) = match direction {
                ArcDirection::PlaceToTransition => (place_name, transition_name),
                ArcDirection::TransitionToPlace => (transition_name, place_name),
            };
            return Err(NetError::DuplicateArc { from, to });
        }
        self.arcs.push(arc);
        Ok(())
    }

    pub fn has_arc(
        &self,
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
    ) -> bool {
        self.seen_arcs.contains(&Arc {
            place,
            transition,
            direction,
        })
    }

    /// Transitions with no input arc so far.
    pub fn transitions_without_inputs(&self) -> Vec<TransitionId> {
        (0..self.transitions.len())
            .map(TransitionId)
            .filter(|&t| {
                !self
                    .arcs
                    .iter()
                    .any(|a| a.transition == t && a.direction == ArcDirection::PlaceToTransition)
            })
            .collect()
    }

    /// Transitions with no output arc so far.
    pub fn transitions_without_outputs(&self) -> Vec<TransitionId> {
        (0..self.transitions.len())
            .map(TransitionId)
            .filter(|&t| {
                !self
                    .arcs
                    .iter()
                    .any(|a| a.transition == t && a.direction == ArcDirection::TransitionToPlace)
            })
            .collect()
    }

    pub fn build(self) -> PetriNet {
        let mut inputs = vec![Vec::new(); self.transitions.len()];
        let mut outputs = vec![Vec::new(); self.transitions.len()];
        for arc in &self.arcs {
            match arc.direction {
                ArcDirection::PlaceToTransition => inputs[arc.transition.0].push(arc.place),
                ArcDirection::TransitionToPlace => outputs[arc.transition.0].push(arc.place),
            }
        }

        PetriNet {
            id: self.id,
            places: self.places,
            transitions: self.transitions,
            arcs: self.arcs,
            inputs,
            outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_rejected() {
        let mut b = PetriNetBuilder::new("n");
        b.place("p", 0).unwrap();
        assert_eq!(b.place("p", 1), Err(NetError::DuplicatePlace("p".into())));
        assert_eq!(
            b.transition("p", TransitionContext::new()),
            Err(NetError::AmbiguousNode("p".into()))
        );
        b.transition("t", TransitionContext::new()).unwrap();
        assert_eq!(
            b.transition("t", TransitionContext::new()),
            Err(NetError::DuplicateTransition("t".into()))
        );
    }

    #[test]
    fn connect_by_name_resolves_direction() {
        let mut b = PetriNetBuilder::new("n");
        b.place("p", 1).unwrap();
        b.place("q", 0).unwrap();
        b.transition("t", TransitionContext::new()).unwrap();
        b.connect("p", "t").unwrap();
        b.connect("t", "q").unwrap();

        let net = b.build();
        let t = net.transition_by_name("t").unwrap();
        assert_eq!(net.inputs_of(t), &[net.place_by_name("p").unwrap()]);
        assert_eq!(net.outputs_of(t), &[net.place_by_name("q").unwrap()]);
    }

    #[test]
    fn connect_rejects_bad_arcs() {
        let mut b = PetriNetBuilder::new("n");
        b.place("p", 1).unwrap();
        b.place("q", 0).unwrap();
        b.transition("t", TransitionContext::new()).unwrap();
        b.transition("u", TransitionContext::new()).unwrap();

        assert!(matches!(b.connect("p", "q"), Err(NetError::InvalidArc { .. })));
        assert!(matches!(b.connect("t", "u"), Err(NetError::InvalidArc { .. })));
        assert_eq!(b.connect("x", "t"), Err(NetError::UnknownNode("x".into())));
        assert_eq!(b.connect("t", "x"), Err(NetError::UnknownNode("x".into())));

        b.connect("p", "t").unwrap();
        assert!(matches!(b.connect("p", "t"), Err(NetError::DuplicateArc { .. })));
    }

    #[test]
    fn open_ends_reported() {
        let mut b = PetriNetBuilder::new("n");
        let p = b.place("p", 0).unwrap();
        let t = b.transition("t", TransitionContext::new()).unwrap();
        let u = b.transition("u", TransitionContext::new()).unwrap();
        b.output(t, p).unwrap();
        b.input(p, u).unwrap();

        assert_eq!(b.transitions_without_inputs(), vec![t]);
        assert_eq!(b.transitions_without_outputs(), vec![u]);
    }
}
