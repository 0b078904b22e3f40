//! Collaborators the gate depends on.
//!
//! Persistence, contract storage, transport and routing live outside this
//! crate; in-memory versions for tests and simulation are in [`crate::mocks`].

use async_trait::async_trait;
use bytes::Bytes;
use dsc_petrinet::PetriNet;
use dsc_policy::ClassifiedRule;

use crate::artifact::{AgreementRef, ArtifactRecord, QueryInput};
use crate::error::GateResult;

/// Source of the agreements that govern an artifact.
#[async_trait]
pub trait AgreementRepository: Send + Sync {
    /// Agreements whose remote origin references `artifact_id`, in the order
    /// they should be tried.
    async fn find_remote_origin_agreements(&self, artifact_id: &str)
        -> GateResult<Vec<AgreementRef>>;

    /// The classified rules of an agreement.
    async fn rules_of(&self, agreement: &AgreementRef) -> GateResult<Vec<ClassifiedRule>>;
}

/// Artifact persistence.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn get(&self, artifact_id: &str) -> GateResult<Option<ArtifactRecord>>;

    /// Replace the stored bytes, size and checksum in one step.
    ///
    /// Fails with `UnreachableLine` for representations that are not local.
    async fn set_data(&self, artifact_id: &str, bytes: Bytes) -> GateResult<ArtifactRecord>;

    /// Atomically add one access; returns the new count.
    async fn increment_access_counter(&self, artifact_id: &str) -> GateResult<u64>;

    /// Erase locally stored bytes.
    async fn delete_data(&self, artifact_id: &str) -> GateResult<()>;

    async fn is_data_deleted(&self, artifact_id: &str) -> GateResult<bool>;
}

/// Fetches data from providers and backends.
#[async_trait]
pub trait DataRetriever: Send + Sync {
    /// Download an artifact from the connector at `remote_address`.
    async fn retrieve(
        &self,
        artifact_id: &str,
        remote_address: &str,
        transfer_contract: Option<&str>,
        query: Option<&QueryInput>,
    ) -> GateResult<Bytes>;

    /// Fetch a remote representation from its backend.
    async fn fetch_remote(&self, access_url: &str, query: Option<&QueryInput>)
        -> GateResult<Bytes>;
}

/// Delivers data to application routes.
#[async_trait]
pub trait RouteDispatcher: Send + Sync {
    async fn send(&self, route_id: &str, data: Bytes) -> GateResult<()>;
}

/// Builds the Petri net an access request is verified against.
pub trait NetProvider: Send + Sync {
    fn net_for(&self, artifact: &ArtifactRecord) -> GateResult<PetriNet>;
}
