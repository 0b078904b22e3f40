//! In-memory collaborators for tests and offline simulation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use dsc_policy::ClassifiedRule;
use tokio::sync::Mutex;

use crate::artifact::{AgreementRef, ArtifactData, ArtifactRecord, QueryInput};
use crate::error::{GateError, GateResult};
use crate::traits::{AgreementRepository, ArtifactStore, DataRetriever, RouteDispatcher};

/// Agreements keyed by artifact, tried in insertion order.
#[derive(Default)]
pub struct InMemoryAgreementRepository {
    by_artifact: DashMap<String, Vec<AgreementRef>>,
    rules: DashMap<String, Vec<ClassifiedRule>>,
}

impl InMemoryAgreementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_agreement(
        &self,
        artifact_id: impl Into<String>,
        agreement: AgreementRef,
        rules: Vec<ClassifiedRule>,
    ) {
        self.rules.insert(agreement.id.clone(), rules);
        self.by_artifact
            .entry(artifact_id.into())
            .or_default()
            .push(agreement);
    }
}

#[async_trait]
impl AgreementRepository for InMemoryAgreementRepository {
    async fn find_remote_origin_agreements(
        &self,
        artifact_id: &str,
    ) -> GateResult<Vec<AgreementRef>> {
        Ok(self
            .by_artifact
            .get(artifact_id)
            .map(|agreements| agreements.iter().filter(|a| a.confirmed).cloned().collect())
            .unwrap_or_default())
    }

    async fn rules_of(&self, agreement: &AgreementRef) -> GateResult<Vec<ClassifiedRule>> {
        self.rules
            .get(&agreement.id)
            .map(|r| r.clone())
            .ok_or_else(|| GateError::Repository(format!("unknown agreement {}", agreement.id)))
    }
}

/// Artifact store backed by a sharded map; per-entry locks make updates
/// atomic per artifact.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: DashMap<String, ArtifactRecord>,
    deleted: DashMap<String, bool>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ArtifactRecord) {
        self.artifacts.insert(record.id.clone(), record);
    }

    fn not_found(artifact_id: &str) -> GateError {
        GateError::NotFound(artifact_id.to_string())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn get(&self, artifact_id: &str) -> GateResult<Option<ArtifactRecord>> {
        Ok(self.artifacts.get(artifact_id).map(|r| r.clone()))
    }

    async fn set_data(&self, artifact_id: &str, bytes: Bytes) -> GateResult<ArtifactRecord> {
        let mut record = self
            .artifacts
            .get_mut(artifact_id)
            .ok_or_else(|| Self::not_found(artifact_id))?;
        if !record.store(bytes) {
            return Err(GateError::UnreachableLine(format!(
                "cannot store bytes on {:?} data of artifact {}",
                record.data, artifact_id
            )));
        }
        self.deleted.remove(artifact_id);
        Ok(record.clone())
    }

    async fn increment_access_counter(&self, artifact_id: &str) -> GateResult<u64> {
        let mut record = self
            .artifacts
            .get_mut(artifact_id)
            .ok_or_else(|| Self::not_found(artifact_id))?;
        record.access_counter += 1;
        if record.usage_start.is_none() {
            record.usage_start = Some(Utc::now());
        }
        Ok(record.access_counter)
    }

    async fn delete_data(&self, artifact_id: &str) -> GateResult<()> {
        let mut record = self
            .artifacts
            .get_mut(artifact_id)
            .ok_or_else(|| Self::not_found(artifact_id))?;
        if let ArtifactData::Local { .. } = record.data {
            record.data = ArtifactData::Local { bytes: Bytes::new() };
            record.byte_size = 0;
            record.checksum = None;
        }
        self.deleted.insert(artifact_id.to_string(), true);
        Ok(())
    }

    async fn is_data_deleted(&self, artifact_id: &str) -> GateResult<bool> {
        Ok(self.deleted.get(artifact_id).map(|d| *d).unwrap_or(false))
    }
}

/// Retriever serving fixed payloads per artifact or access URL.
#[derive(Default)]
pub struct MockRetriever {
    payloads: DashMap<String, Bytes>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for downloads of `key` (artifact id or access URL).
    pub fn with_payload(self, key: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.payloads.insert(key.into(), bytes.into());
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve(&self, key: &str) -> GateResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.payloads
            .get(key)
            .map(|b| b.clone())
            .ok_or_else(|| GateError::Io(format!("no data available for {}", key)))
    }
}

#[async_trait]
impl DataRetriever for MockRetriever {
    async fn retrieve(
        &self,
        artifact_id: &str,
        _remote_address: &str,
        _transfer_contract: Option<&str>,
        _query: Option<&QueryInput>,
    ) -> GateResult<Bytes> {
        self.serve(artifact_id).await
    }

    async fn fetch_remote(
        &self,
        access_url: &str,
        _query: Option<&QueryInput>,
    ) -> GateResult<Bytes> {
        self.serve(access_url).await
    }
}

/// Dispatcher that records what it sends and can fail on chosen routes.
#[derive(Default)]
pub struct MockDispatcher {
    failing: HashSet<String>,
    sent: Mutex<Vec<(String, Bytes)>>,
}

impl MockDispatcher {
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn failing_on(route_id: impl Into<String>) -> Self {
        let mut dispatcher = Self::default();
        dispatcher.failing.insert(route_id.into());
        dispatcher
    }

    pub async fn sent(&self) -> Vec<(String, Bytes)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl RouteDispatcher for MockDispatcher {
    async fn send(&self, route_id: &str, data: Bytes) -> GateResult<()> {
        if self.failing.contains(route_id) {
            return Err(GateError::Io(format!("route {} unavailable", route_id)));
        }
        self.sent.lock().await.push((route_id.to_string(), data));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_counts_and_deletes() {
        let store = InMemoryArtifactStore::new();
        store.insert(ArtifactRecord::local("a1", "hello"));

        assert_eq!(store.increment_access_counter("a1").await.unwrap(), 1);
        assert_eq!(store.increment_access_counter("a1").await.unwrap(), 2);
        assert!(store.get("a1").await.unwrap().unwrap().usage_start.is_some());

        store.delete_data("a1").await.unwrap();
        assert!(store.is_data_deleted("a1").await.unwrap());
        assert_eq!(store.get("a1").await.unwrap().unwrap().byte_size, 0);

        assert!(matches!(
            store.increment_access_counter("missing").await,
            Err(GateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn store_rejects_bytes_on_remote_data() {
        let store = InMemoryArtifactStore::new();
        store.insert(ArtifactRecord::remote("a1", "https://backend/a1"));
        let err = store
            .set_data("a1", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::UnreachableLine(_)));
    }

    #[tokio::test]
    async fn unconfirmed_agreements_are_skipped() {
        let repo = InMemoryAgreementRepository::new();
        let mut pending = AgreementRef::new("ag-pending");
        pending.confirmed = false;
        repo.add_agreement("a1", pending, vec![]);
        repo.add_agreement("a1", AgreementRef::new("ag-1"), vec![]);

        let found = repo.find_remote_origin_agreements("a1").await.unwrap();
        assert_eq!(found, vec![AgreementRef::new("ag-1")]);
    }
}
