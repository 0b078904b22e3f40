use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use dsc_petrinet::PetriNet;
use dsc_policy::ClassifiedRule;
use dsc_verifier::{EvalEnv, VerificationResult, Verifier, VerifyOptions};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::artifact::{AccessRequest, AgreementRef, ArtifactData, ArtifactRecord};
use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::ledger::{AccessEntry, AccessLedger, AccessOutcome, LedgerFilter};
use crate::net::LifecycleNetProvider;
use crate::traits::{
    AgreementRepository, ArtifactStore, DataRetriever, NetProvider, RouteDispatcher,
};

/// Why an agreement did not authorize access.
struct Violation {
    agreement: String,
    description: String,
}

/// The checkpoint every data release passes through.
///
/// For an artifact governed by agreements, [`get_data`](Self::get_data)
/// verifies the agreements' rules against the artifact's lifecycle net and
/// releases data only once one agreement is fully satisfied. Artifacts
/// without agreements are this connector's own offers and are served as is.
///
/// Requests for the same artifact are handled one at a time, from loading
/// the access counter to incrementing it. Different artifacts proceed in
/// parallel.
pub struct AccessGate {
    agreements: Arc<dyn AgreementRepository>,
    artifacts: Arc<dyn ArtifactStore>,
    retriever: Arc<dyn DataRetriever>,
    dispatcher: Arc<dyn RouteDispatcher>,
    nets: Arc<dyn NetProvider>,
    verifier: Verifier,
    ledger: RwLock<AccessLedger>,
    /// Per-artifact locks serializing verification and counting.
    locks: DashMap<String, Arc<Mutex<()>>>,
    config: GateConfig,
}

impl AccessGate {
    pub fn new(
        agreements: Arc<dyn AgreementRepository>,
        artifacts: Arc<dyn ArtifactStore>,
        retriever: Arc<dyn DataRetriever>,
        dispatcher: Arc<dyn RouteDispatcher>,
        config: GateConfig,
    ) -> Self {
        Self {
            agreements,
            artifacts,
            retriever,
            dispatcher,
            nets: Arc::new(LifecycleNetProvider::new(config.profile.clone())),
            verifier: Verifier::new(VerifyOptions {
                max_states: config.max_states,
            }),
            ledger: RwLock::new(AccessLedger::with_capacity(config.ledger_capacity)),
            locks: DashMap::new(),
            config,
        }
    }

    /// Replace the default lifecycle net provider.
    pub fn with_net_provider(mut self, nets: Arc<dyn NetProvider>) -> Self {
        self.nets = nets;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Verify, fetch and release the data of one artifact.
    ///
    /// The access counter grows by exactly one per successful call, however
    /// many agreements were tried. Route dispatch happens before counting,
    /// so a failed dispatch leaves the counter untouched. The ledger gets
    /// `Authorized` or `Unrestricted` only once the data is released, and
    /// `Failed` when fetching, dispatching or counting goes wrong afterwards.
    pub async fn get_data(&self, request: &AccessRequest) -> GateResult<Bytes> {
        let artifact_id = request.artifact_id.as_str();
        let lock = self.lock_for(artifact_id);
        let _guard = lock.lock().await;

        let artifact = self.load(artifact_id).await?;
        let agreements = self
            .agreements
            .find_remote_origin_agreements(artifact_id)
            .await?;

        let (granted, outcome) = if agreements.is_empty() {
            debug!(artifact_id = %artifact_id, "No governing agreement, serving offered artifact");
            (None, AccessOutcome::Unrestricted)
        } else {
            let candidates =
                restrict_to_contract(agreements, request.transfer_contract.as_deref())?;
            let agreement = self.authorize(&artifact, &candidates).await?;
            info!(
                artifact_id = %artifact_id,
                agreement = %agreement.id,
                "Access authorized"
            );
            (Some(agreement), AccessOutcome::Authorized)
        };
        let agreement_id = granted.as_ref().map(|a| a.id.clone());

        match self.release(&artifact, granted.as_ref(), request).await {
            Ok(data) => {
                self.record(AccessEntry::new(artifact_id, agreement_id, outcome))
                    .await;
                Ok(data)
            }
            Err(e) => {
                self.record(
                    AccessEntry::new(artifact_id, agreement_id, AccessOutcome::Failed)
                        .with_witness(e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Erase locally stored data, e.g. to fulfil a deletion duty.
    pub async fn delete_data(&self, artifact_id: &str) -> GateResult<()> {
        let lock = self.lock_for(artifact_id);
        let _guard = lock.lock().await;

        self.artifacts.delete_data(artifact_id).await?;
        self.record(AccessEntry::new(artifact_id, None, AccessOutcome::Deleted))
            .await;
        info!(artifact_id = %artifact_id, "Artifact data deleted");
        Ok(())
    }

    pub async fn is_data_deleted(&self, artifact_id: &str) -> GateResult<bool> {
        self.artifacts.is_data_deleted(artifact_id).await
    }

    /// Ledger entries matching `filter`, oldest first.
    pub async fn ledger_entries(&self, filter: &LedgerFilter) -> Vec<AccessEntry> {
        self.ledger
            .read()
            .await
            .query(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    fn lock_for(&self, artifact_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(artifact_id.to_string()).or_default())
    }

    async fn load(&self, artifact_id: &str) -> GateResult<ArtifactRecord> {
        self.artifacts
            .get(artifact_id)
            .await?
            .ok_or_else(|| GateError::NotFound(artifact_id.to_string()))
    }

    async fn record(&self, entry: AccessEntry) {
        self.ledger.write().await.append(entry);
    }

    /// Fetch the data, fan it out and count the access.
    async fn release(
        &self,
        artifact: &ArtifactRecord,
        agreement: Option<&AgreementRef>,
        request: &AccessRequest,
    ) -> GateResult<Bytes> {
        let data = match agreement {
            Some(agreement) if request.requires_download(artifact) => {
                self.download(artifact, agreement, request).await?
            }
            _ => self.serve_stored(artifact, request).await?,
        };

        for route_id in &request.route_ids {
            let send = self.dispatcher.send(route_id, data.clone());
            with_timeout(self.config.dispatch_timeout(), "route dispatch", send)
                .await
                .map_err(|e| {
                    warn!(
                        artifact_id = %artifact.id,
                        route = %route_id,
                        error = %e,
                        "Route dispatch failed"
                    );
                    e
                })?;
        }

        let count = self.artifacts.increment_access_counter(&artifact.id).await?;
        debug!(artifact_id = %artifact.id, access_counter = count, "Access counted");
        Ok(data)
    }

    /// Try agreements in order; the first fully satisfied one wins, otherwise
    /// the last violation is returned.
    async fn authorize(
        &self,
        artifact: &ArtifactRecord,
        candidates: &[AgreementRef],
    ) -> GateResult<AgreementRef> {
        let net = self.nets.net_for(artifact)?;
        let env = EvalEnv {
            now: chrono::Utc::now(),
            usage_start: artifact.usage_start,
        };

        let mut last: Option<Violation> = None;
        for agreement in candidates {
            let rules = self.agreements.rules_of(agreement).await?;
            match self.check_rules(&rules, &net, &env)? {
                None => return Ok(agreement.clone()),
                Some(description) => {
                    debug!(
                        artifact_id = %artifact.id,
                        agreement = %agreement.id,
                        witness = %description,
                        "Agreement violated"
                    );
                    self.record(
                        AccessEntry::new(
                            &artifact.id,
                            Some(agreement.id.clone()),
                            AccessOutcome::Denied,
                        )
                        .with_witness(description.clone()),
                    )
                    .await;
                    last = Some(Violation {
                        agreement: agreement.id.clone(),
                        description,
                    });
                }
            }
        }

        let violation = last.unwrap_or_else(|| Violation {
            agreement: String::new(),
            description: "no agreement to verify".to_string(),
        });
        info!(
            artifact_id = %artifact.id,
            agreement = %violation.agreement,
            witness = %violation.description,
            "Access denied"
        );
        Err(GateError::PolicyRestriction {
            agreement: violation.agreement,
            description: violation.description,
        })
    }

    /// `None` when every rule is satisfied, else the first violation found.
    fn check_rules(
        &self,
        rules: &[ClassifiedRule],
        net: &PetriNet,
        env: &EvalEnv,
    ) -> GateResult<Option<String>> {
        for classified in rules {
            if !classified.pattern.is_supported() {
                if self.config.allow_unsupported_patterns {
                    continue;
                }
                return Ok(Some(format!(
                    "rule pattern {} is not supported",
                    classified.pattern
                )));
            }
            let result = self.verifier.verify_rule(
                classified.pattern,
                &classified.rule,
                &classified.target,
                net,
                env,
            )?;
            if let VerificationResult::Violated(witness) = result {
                return Ok(Some(witness.description));
            }
        }
        Ok(None)
    }

    async fn download(
        &self,
        artifact: &ArtifactRecord,
        agreement: &AgreementRef,
        request: &AccessRequest,
    ) -> GateResult<Bytes> {
        let remote_address = artifact
            .remote_address
            .as_deref()
            .or(agreement.remote_address.as_deref())
            .ok_or_else(|| {
                GateError::Io(format!("artifact {} has no remote address", artifact.id))
            })?;

        debug!(artifact_id = %artifact.id, remote = %remote_address, "Downloading artifact data");
        let fetch = self.retriever.retrieve(
            &artifact.id,
            remote_address,
            request.transfer_contract.as_deref(),
            request.query.as_ref(),
        );
        let bytes = with_timeout(self.config.retrieve_timeout(), "download", fetch)
            .await
            .map_err(|e| {
                warn!(artifact_id = %artifact.id, error = %e, "Download failed");
                e
            })?;

        let stored = self.artifacts.set_data(&artifact.id, bytes.clone()).await?;
        debug!(
            artifact_id = %artifact.id,
            byte_size = stored.byte_size,
            checksum = stored.checksum.as_deref().unwrap_or(""),
            "Artifact data persisted"
        );
        Ok(bytes)
    }

    async fn serve_stored(
        &self,
        artifact: &ArtifactRecord,
        request: &AccessRequest,
    ) -> GateResult<Bytes> {
        match &artifact.data {
            ArtifactData::Local { bytes } => Ok(bytes.clone()),
            ArtifactData::Remote { access_url } => {
                let fetch = self.retriever.fetch_remote(access_url, request.query.as_ref());
                with_timeout(self.config.retrieve_timeout(), "remote fetch", fetch).await
            }
            ArtifactData::Unknown { kind } => Err(GateError::UnreachableLine(format!(
                "artifact {} has {} data",
                artifact.id, kind
            ))),
        }
    }
}

/// Narrow the candidates to the named transfer contract, if any.
fn restrict_to_contract(
    agreements: Vec<AgreementRef>,
    contract: Option<&str>,
) -> GateResult<Vec<AgreementRef>> {
    let Some(contract) = contract else {
        return Ok(agreements);
    };
    let selected: Vec<AgreementRef> = agreements
        .into_iter()
        .filter(|a| a.id == contract)
        .collect();
    if selected.is_empty() {
        return Err(GateError::PolicyRestriction {
            agreement: contract.to_string(),
            description: "transfer contract does not govern this artifact".to_string(),
        });
    }
    Ok(selected)
}

async fn with_timeout<T>(
    limit: Duration,
    operation: &str,
    fut: impl Future<Output = GateResult<T>>,
) -> GateResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GateError::Io(format!(
            "{} timed out after {:?}",
            operation, limit
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorProfile;
    use crate::mocks::{
        InMemoryAgreementRepository, InMemoryArtifactStore, MockDispatcher, MockRetriever,
    };
    use dsc_policy::{Constraint, LeftOperand, Operator, PolicyPattern, Rule};

    const PROVIDER: &str = "https://provider.example/api/ids/data";

    struct Fixture {
        repo: Arc<InMemoryAgreementRepository>,
        store: Arc<InMemoryArtifactStore>,
        retriever: Arc<MockRetriever>,
        dispatcher: Arc<MockDispatcher>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with(
                MockRetriever::new().with_payload("a1", "downloaded"),
                MockDispatcher::accept_all(),
            )
        }

        fn with(retriever: MockRetriever, dispatcher: MockDispatcher) -> Self {
            Self {
                repo: Arc::new(InMemoryAgreementRepository::new()),
                store: Arc::new(InMemoryArtifactStore::new()),
                retriever: Arc::new(retriever),
                dispatcher: Arc::new(dispatcher),
            }
        }

        fn gate(&self, config: GateConfig) -> AccessGate {
            AccessGate::new(
                self.repo.clone(),
                self.store.clone(),
                self.retriever.clone(),
                self.dispatcher.clone(),
                config,
            )
        }

        /// Govern `a1` by one more agreement.
        fn agree(&self, agreement_id: &str, rules: Vec<ClassifiedRule>) {
            self.repo.add_agreement("a1", AgreementRef::new(agreement_id), rules);
        }

        async fn counter(&self, id: &str) -> u64 {
            self.store.get(id).await.unwrap().unwrap().access_counter
        }
    }

    fn consumed_artifact() -> ArtifactRecord {
        ArtifactRecord::consumed("a1", "artifact://42", PROVIDER)
    }

    fn rule(pattern: PolicyPattern) -> ClassifiedRule {
        ClassifiedRule::new(pattern, Rule::permission(), "artifact://42")
    }

    fn n_times(n: u64) -> ClassifiedRule {
        ClassifiedRule::new(
            PolicyPattern::NTimesUsage,
            Rule::permission().with_constraint(Constraint::new(
                LeftOperand::Count,
                Operator::Lteq,
                n.to_string(),
            )),
            "artifact://42",
        )
    }

    #[tokio::test]
    async fn offered_artifact_served_and_counted() {
        let fx = Fixture::new();
        fx.store.insert(ArtifactRecord::local("a1", "local bytes"));
        let gate = fx.gate(GateConfig::default());

        let data = gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"local bytes"));
        assert_eq!(fx.counter("a1").await, 1);
        assert_eq!(fx.retriever.calls(), 0);

        let entries = gate
            .ledger_entries(&LedgerFilter::new().with_outcome(AccessOutcome::Unrestricted))
            .await;
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_later_agreement() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        fx.agree("ag-A", vec![rule(PolicyPattern::ProhibitAccess)]);
        fx.agree("ag-B", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig::default());

        let data = gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"downloaded"));
        assert_eq!(fx.counter("a1").await, 1);

        let history = gate.ledger_entries(&LedgerFilter::new().with_artifact("a1")).await;
        let outcomes: Vec<_> = history
            .iter()
            .map(|e| (e.agreement_id.clone(), e.outcome))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (Some("ag-A".to_string()), AccessOutcome::Denied),
                (Some("ag-B".to_string()), AccessOutcome::Authorized),
            ]
        );
    }

    #[tokio::test]
    async fn last_violation_surfaces() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        fx.agree("ag-A", vec![rule(PolicyPattern::ProhibitAccess)]);
        fx.agree("ag-B", vec![rule(PolicyPattern::UsageLogging)]);
        let gate = fx.gate(GateConfig::default());

        let err = gate.get_data(&AccessRequest::new("a1")).await.unwrap_err();
        assert_eq!(
            err,
            GateError::PolicyRestriction {
                agreement: "ag-B".into(),
                description: "check if transition reads artifact://42 without logging flag set"
                    .into(),
            }
        );
        assert_eq!(fx.counter("a1").await, 0);
        assert_eq!(fx.retriever.calls(), 0);
    }

    #[tokio::test]
    async fn n_times_limit_enforced_across_calls() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        fx.agree("ag-1", vec![n_times(2)]);
        let gate = fx.gate(GateConfig::default());

        gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        let err = gate.get_data(&AccessRequest::new("a1")).await.unwrap_err();
        assert!(err.is_policy_restriction());
        assert_eq!(fx.counter("a1").await, 2);
    }

    #[tokio::test]
    async fn cached_data_served_without_download() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact().with_provider_byte_size(10));
        fx.agree("ag-1", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig::default());

        gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        let stored = fx.store.get("a1").await.unwrap().unwrap();
        assert_eq!(stored.byte_size, 10);
        assert!(stored.checksum.is_some());

        gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        assert_eq!(fx.retriever.calls(), 1);

        gate.get_data(&AccessRequest::new("a1").force_download()).await.unwrap();
        assert_eq!(fx.retriever.calls(), 2);
        assert_eq!(fx.counter("a1").await, 3);
    }

    #[tokio::test]
    async fn routes_receive_data_in_order() {
        let fx = Fixture::new();
        fx.store.insert(ArtifactRecord::local("a1", "payload"));
        let gate = fx.gate(GateConfig::default());

        let request = AccessRequest::new("a1")
            .with_route("route://one")
            .with_route("route://two");
        gate.get_data(&request).await.unwrap();

        let sent: Vec<String> =
            fx.dispatcher.sent().await.into_iter().map(|(r, _)| r).collect();
        assert_eq!(sent, vec!["route://one", "route://two"]);
    }

    #[tokio::test]
    async fn dispatch_failure_aborts_without_counting() {
        let fx = Fixture::with(MockRetriever::new(), MockDispatcher::failing_on("route://down"));
        fx.store.insert(ArtifactRecord::local("a1", "payload"));
        let gate = fx.gate(GateConfig::default());

        let request = AccessRequest::new("a1").with_route("route://down");
        let err = gate.get_data(&request).await.unwrap_err();
        assert!(matches!(err, GateError::Io(_)));
        assert_eq!(fx.counter("a1").await, 0);

        let history = gate.ledger_entries(&LedgerFilter::new().with_artifact("a1")).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, AccessOutcome::Failed);
        assert_eq!(history[0].witness.as_deref(), Some(err.to_string().as_str()));
    }

    #[tokio::test]
    async fn failed_download_is_not_recorded_as_authorized() {
        let fx = Fixture::with(MockRetriever::new(), MockDispatcher::accept_all());
        fx.store.insert(consumed_artifact());
        fx.agree("ag-1", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig::default());

        assert!(gate.get_data(&AccessRequest::new("a1")).await.is_err());
        assert_eq!(fx.counter("a1").await, 0);

        let history = gate.ledger_entries(&LedgerFilter::new().with_artifact("a1")).await;
        let outcomes: Vec<_> = history
            .iter()
            .map(|e| (e.agreement_id.as_deref(), e.outcome))
            .collect();
        assert_eq!(outcomes, vec![(Some("ag-1"), AccessOutcome::Failed)]);
    }

    #[tokio::test]
    async fn ledger_keeps_configured_number_of_entries() {
        let fx = Fixture::new();
        fx.store.insert(ArtifactRecord::local("a1", "payload"));
        let gate = fx.gate(GateConfig {
            ledger_capacity: 4,
            ..Default::default()
        });

        for _ in 0..10 {
            gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        }
        assert_eq!(fx.counter("a1").await, 10);
        assert_eq!(gate.ledger_entries(&LedgerFilter::new()).await.len(), 4);
    }

    #[tokio::test]
    async fn busy_artifact_is_verified_against_its_whole_history() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact().with_access_counter(150_000));
        fx.agree("ag-capped", vec![n_times(10_000)]);
        fx.agree("ag-open", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig::default());

        gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        assert_eq!(fx.counter("a1").await, 150_001);

        let denied = gate
            .ledger_entries(&LedgerFilter::new().with_outcome(AccessOutcome::Denied))
            .await;
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].agreement_id.as_deref(), Some("ag-capped"));
    }

    #[tokio::test]
    async fn unsupported_patterns_follow_config() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        fx.agree("ag-1", vec![rule(PolicyPattern::Unsupported)]);

        let lenient = fx.gate(GateConfig::default());
        assert!(lenient.get_data(&AccessRequest::new("a1")).await.is_ok());

        let strict = GateConfig {
            allow_unsupported_patterns: false,
            ..Default::default()
        };
        let err = fx.gate(strict).get_data(&AccessRequest::new("a1")).await.unwrap_err();
        assert!(err.is_policy_restriction());
    }

    #[tokio::test]
    async fn profile_shapes_the_lifecycle() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        fx.agree("ag-1", vec![rule(PolicyPattern::UsageLogging)]);

        let logging = GateConfig {
            profile: ConnectorProfile {
                logging: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(fx.gate(logging).get_data(&AccessRequest::new("a1")).await.is_ok());
    }

    #[tokio::test]
    async fn transfer_contract_restricts_candidates() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        fx.agree("ag-A", vec![rule(PolicyPattern::ProhibitAccess)]);
        fx.agree("ag-B", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig::default());

        let err = gate
            .get_data(&AccessRequest::new("a1").with_transfer_contract("ag-A"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::PolicyRestriction { ref agreement, .. } if agreement == "ag-A"
        ));

        let unknown = gate
            .get_data(&AccessRequest::new("a1").with_transfer_contract("ag-X"))
            .await
            .unwrap_err();
        assert!(unknown.is_policy_restriction());

        assert!(gate
            .get_data(&AccessRequest::new("a1").with_transfer_contract("ag-B"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn remote_and_unknown_representations() {
        let fx = Fixture::with(
            MockRetriever::new().with_payload("https://backend/a1", "from backend"),
            MockDispatcher::accept_all(),
        );
        fx.store.insert(ArtifactRecord::remote("a1", "https://backend/a1"));
        fx.store.insert(
            ArtifactRecord::local("a2", "").with_data_kind(ArtifactData::Unknown {
                kind: "stream".into(),
            }),
        );
        let gate = fx.gate(GateConfig::default());

        let data = gate.get_data(&AccessRequest::new("a1")).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"from backend"));

        let err = gate.get_data(&AccessRequest::new("a2")).await.unwrap_err();
        assert!(matches!(err, GateError::UnreachableLine(_)));
    }

    #[tokio::test]
    async fn download_onto_remote_representation_fails() {
        let fx = Fixture::new();
        fx.store.insert(
            consumed_artifact().with_data_kind(ArtifactData::Remote {
                access_url: "https://backend/a1".into(),
            }),
        );
        fx.agree("ag-1", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig::default());

        let err = gate.get_data(&AccessRequest::new("a1")).await.unwrap_err();
        assert!(matches!(err, GateError::UnreachableLine(_)));
        assert_eq!(fx.counter("a1").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_download_times_out() {
        let fx = Fixture::with(
            MockRetriever::new()
                .with_payload("a1", "late")
                .with_delay(Duration::from_secs(60)),
            MockDispatcher::accept_all(),
        );
        fx.store.insert(consumed_artifact());
        fx.agree("ag-1", vec![rule(PolicyPattern::ProvideAccess)]);
        let gate = fx.gate(GateConfig {
            retrieve_timeout_secs: 5,
            ..Default::default()
        });

        let err = gate.get_data(&AccessRequest::new("a1")).await.unwrap_err();
        assert!(matches!(err, GateError::Io(ref msg) if msg.contains("timed out")));
        assert_eq!(fx.store.get("a1").await.unwrap().unwrap().byte_size, 0);
    }

    #[tokio::test]
    async fn malformed_rule_is_reported() {
        let fx = Fixture::new();
        fx.store.insert(consumed_artifact());
        let bad = ClassifiedRule::new(
            PolicyPattern::NTimesUsage,
            Rule::permission().with_constraint(Constraint::new(
                LeftOperand::Count,
                Operator::Lteq,
                "-2",
            )),
            "artifact://42",
        );
        fx.agree("ag-1", vec![bad]);
        let gate = fx.gate(GateConfig::default());

        let err = gate.get_data(&AccessRequest::new("a1")).await.unwrap_err();
        assert!(matches!(err, GateError::Malformed(_)));
    }

    #[tokio::test]
    async fn delete_data_is_recorded() {
        let fx = Fixture::new();
        fx.store.insert(ArtifactRecord::local("a1", "secret"));
        let gate = fx.gate(GateConfig::default());

        gate.delete_data("a1").await.unwrap();
        assert!(gate.is_data_deleted("a1").await.unwrap());
        let deleted = gate
            .ledger_entries(&LedgerFilter::new().with_outcome(AccessOutcome::Deleted))
            .await;
        assert_eq!(deleted.len(), 1);
    }

    #[tokio::test]
    async fn missing_artifact_not_found() {
        let fx = Fixture::new();
        let gate = fx.gate(GateConfig::default());
        assert_eq!(
            gate.get_data(&AccessRequest::new("nope")).await,
            Err(GateError::NotFound("nope".into()))
        );
    }
}
