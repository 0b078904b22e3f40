use dsc_petrinet::{LifecycleNet, LifecycleSpec, PetriNet};

use crate::artifact::ArtifactRecord;
use crate::config::ConnectorProfile;
use crate::error::GateResult;
use crate::traits::NetProvider;

/// Default [`NetProvider`]: the artifact's lifecycle so far plus the
/// pending read, shaped by the connector profile.
#[derive(Clone, Debug, Default)]
pub struct LifecycleNetProvider {
    profile: ConnectorProfile,
}

impl LifecycleNetProvider {
    pub fn new(profile: ConnectorProfile) -> Self {
        Self { profile }
    }

    pub fn spec_for(&self, artifact: &ArtifactRecord) -> LifecycleSpec {
        LifecycleSpec::new(artifact.target(), self.profile.connector_id.clone())
            .with_prior_reads(artifact.access_counter)
            .with_logging(self.profile.logging)
            .with_notification(self.profile.notification)
            .with_erase(self.profile.deletion_enforced)
    }
}

impl NetProvider for LifecycleNetProvider {
    fn net_for(&self, artifact: &ArtifactRecord) -> GateResult<PetriNet> {
        Ok(LifecycleNet::build(&self.spec_for(artifact))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsc_policy::Target;

    #[test]
    fn counter_becomes_prior_reads() {
        let provider = LifecycleNetProvider::new(ConnectorProfile {
            logging: true,
            ..Default::default()
        });
        let artifact = ArtifactRecord::consumed("a1", "artifact://42", "https://provider")
            .with_access_counter(3);

        let spec = provider.spec_for(&artifact);
        assert_eq!(spec.prior_reads, 3);
        assert!(spec.logging);

        let net = provider.net_for(&artifact).unwrap();
        let reads = net.transitions_reading(&Target::new("artifact://42"));
        let multiplicities: Vec<u64> = reads
            .iter()
            .map(|&t| net.transition(t).unwrap().multiplicity)
            .collect();
        assert_eq!(multiplicities, vec![3, 1]);
    }

    #[test]
    fn large_counter_keeps_net_small() {
        let provider = LifecycleNetProvider::default();
        let artifact = ArtifactRecord::consumed("a1", "artifact://42", "https://provider")
            .with_access_counter(1_000_000);

        let net = provider.net_for(&artifact).unwrap();
        assert_eq!(net.places().len(), 3);
        assert_eq!(net.transitions().len(), 2);
    }
}
