//! The per-request artifact lifecycle net.
//!
//! ```text
//! (start) -> read/history [x n] -> (served) -> read/pending -> (released)
//!         [-> erase -> (erased)]
//! ```
//!
//! The reads already served sit in front of the pending read as one
//! transition of multiplicity `n`, so counting patterns see the full access
//! history on a single path while the net keeps a fixed size.

use dsc_policy::{Target, LOGGING_LABEL, NOTIFICATION_LABEL};
use serde::{Deserialize, Serialize};

use crate::builder::PetriNetBuilder;
use crate::error::NetResult;
use crate::model::{PetriNet, TransitionContext};

/// Inputs for [`LifecycleNet::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSpec {
    pub target: Target,
    /// Reads already served for this artifact.
    pub prior_reads: u64,
    pub connector_id: String,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub notification: bool,
    /// Append an erase of the artifact after the pending read.
    #[serde(default)]
    pub erase_after_use: bool,
}

impl LifecycleSpec {
    pub fn new(target: impl Into<Target>, connector_id: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            prior_reads: 0,
            connector_id: connector_id.into(),
            logging: false,
            notification: false,
            erase_after_use: false,
        }
    }

    pub fn with_prior_reads(mut self, n: u64) -> Self {
        self.prior_reads = n;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    pub fn with_notification(mut self, enabled: bool) -> Self {
        self.notification = enabled;
        self
    }

    pub fn with_erase(mut self, enabled: bool) -> Self {
        self.erase_after_use = enabled;
        self
    }

    fn read_context(&self) -> TransitionContext {
        let mut ctx = TransitionContext::new()
            .reading(self.target.clone())
            .labeled(self.connector_id.clone());
        if self.logging {
            ctx = ctx.labeled(LOGGING_LABEL);
        }
        if self.notification {
            ctx = ctx.labeled(NOTIFICATION_LABEL);
        }
        ctx
    }
}

pub struct LifecycleNet;

impl LifecycleNet {
    pub fn build(spec: &LifecycleSpec) -> NetResult<PetriNet> {
        let mut b = PetriNetBuilder::new(format!("net://lifecycle/{}", spec.target));
        let read_ctx = spec.read_context();

        let mut current = b.place("place://start", 1)?;
        if spec.prior_reads > 0 {
            let history = b.repeated_transition(
                "transition://read/history",
                read_ctx.clone(),
                spec.prior_reads,
            )?;
            let served = b.place("place://served", 0)?;
            b.input(current, history)?;
            b.output(history, served)?;
            current = served;
        }

        let pending = b.transition("transition://read/pending", read_ctx)?;
        let released = b.place("place://released", 0)?;
        b.input(current, pending)?;
        b.output(pending, released)?;

        if spec.erase_after_use {
            let erase = b.transition(
                "transition://erase",
                TransitionContext::new()
                    .erasing(spec.target.clone())
                    .labeled(spec.connector_id.clone()),
            )?;
            let erased = b.place("place://erased", 0)?;
            b.input(released, erase)?;
            b.output(erase, erased)?;
        }

        Ok(b.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> LifecycleSpec {
        LifecycleSpec::new("artifact://42", "connector://self")
    }

    #[test]
    fn fresh_artifact_has_single_read() {
        let net = LifecycleNet::build(&spec()).unwrap();
        let target = Target::new("artifact://42");
        assert_eq!(net.transitions_reading(&target).len(), 1);
        assert!(net.transitions_erasing(&target).is_empty());
        assert_eq!(net.places().len(), 2);
    }

    #[test]
    fn prior_reads_are_folded_before_pending() {
        let net = LifecycleNet::build(&spec().with_prior_reads(2)).unwrap();
        let mut m = net.initial_marking();
        let mut fired = Vec::new();
        while let Some(&t) = net.enabled(&m).first() {
            let transition = net.transition(t).unwrap();
            fired.push((transition.id.clone(), transition.multiplicity));
            m = net.fire(&m, t).unwrap();
        }
        assert_eq!(
            fired,
            vec![
                ("transition://read/history".to_string(), 2),
                ("transition://read/pending".to_string(), 1),
            ]
        );
    }

    #[test]
    fn long_history_keeps_net_size() {
        let net = LifecycleNet::build(&spec().with_prior_reads(250_000).with_erase(true)).unwrap();
        assert_eq!(net.places().len(), 4);
        assert_eq!(net.transitions().len(), 3);

        let history = net.transition_by_name("transition://read/history").unwrap();
        assert_eq!(net.transition(history).unwrap().multiplicity, 250_000);
    }

    #[test]
    fn labels_follow_profile() {
        let net = LifecycleNet::build(&spec().with_logging(true)).unwrap();
        let pending = net.transition_by_name("transition://read/pending").unwrap();
        let ctx = &net.transition(pending).unwrap().context;
        assert!(ctx.has_label("connector://self"));
        assert!(ctx.has_label(LOGGING_LABEL));
        assert!(!ctx.has_label(NOTIFICATION_LABEL));
    }

    #[test]
    fn erase_follows_release() {
        let net = LifecycleNet::build(&spec().with_erase(true)).unwrap();
        let erase = net.transition_by_name("transition://erase").unwrap();
        let released = net.place_by_name("place://released").unwrap();
        assert_eq!(net.inputs_of(erase), &[released]);
        assert!(net.transition(erase).unwrap().context.erases(&Target::new("artifact://42")));
    }
}
