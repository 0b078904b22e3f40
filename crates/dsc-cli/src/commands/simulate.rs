//! `dscctl simulate`
//!
//! Replays a scenario of artifacts, agreements and access requests through an
//! [`AccessGate`] backed by the in-memory collaborators.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Args;
use dsc_gate::mocks::{
    InMemoryAgreementRepository, InMemoryArtifactStore, MockDispatcher, MockRetriever,
};
use dsc_gate::{
    AccessGate, AccessOutcome, AccessRequest, AgreementRef, ArtifactRecord, ArtifactStore,
    GateConfig, GateError, LedgerFilter,
};
use dsc_policy::{ClassifiedRule, Target};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CliResult;
use crate::files;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct SimulateArgs {
    /// Scenario file (YAML or JSON)
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// A scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Overrides the configured gate settings.
    #[serde(default)]
    pub gate: Option<GateConfig>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
    #[serde(default)]
    pub agreements: Vec<AgreementSpec>,
    #[serde(default)]
    pub requests: Vec<AccessRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSpec {
    pub id: String,
    /// Bytes stored in this connector.
    #[serde(default)]
    pub local: Option<String>,
    /// Backend URL for remote data.
    #[serde(default)]
    pub access_url: Option<String>,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default)]
    pub provider_byte_size: Option<u64>,
    #[serde(default)]
    pub automated_download: bool,
    #[serde(default)]
    pub access_counter: u64,
    /// What the provider or backend serves for this artifact.
    #[serde(default)]
    pub payload: Option<String>,
}

impl ArtifactSpec {
    fn record(&self) -> ArtifactRecord {
        let mut record = match (&self.local, &self.access_url) {
            (Some(bytes), _) => ArtifactRecord::local(&self.id, bytes.clone()),
            (None, Some(url)) => ArtifactRecord::remote(&self.id, url),
            (None, None) => ArtifactRecord::local(&self.id, Bytes::new()),
        };
        record.remote_id = self.remote_id.clone().map(Target::from);
        record.remote_address = self.remote_address.clone();
        record.provider_byte_size = self.provider_byte_size;
        record.automated_download = self.automated_download;
        record.access_counter = self.access_counter;
        record
    }

    /// Downloads are keyed by artifact id, remote fetches by access URL.
    fn payload_key(&self) -> String {
        self.access_url.clone().unwrap_or_else(|| self.id.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgreementSpec {
    pub id: String,
    pub artifact: String,
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default)]
    pub rules: Vec<ClassifiedRule>,
}

/// What happened to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestOutcome {
    Released { bytes: usize },
    Denied { agreement: String, reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestReport {
    pub index: usize,
    pub artifact_id: String,
    #[serde(flatten)]
    pub outcome: RequestOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub requests: Vec<RequestReport>,
    /// Final access counter per artifact.
    pub counters: BTreeMap<String, u64>,
    pub denials: usize,
}

impl SimulationReport {
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = self
            .requests
            .iter()
            .map(|r| match &r.outcome {
                RequestOutcome::Released { bytes } => {
                    format!("#{} {}: released {} bytes", r.index, r.artifact_id, bytes)
                }
                RequestOutcome::Denied { agreement, reason } => {
                    format!("#{} {}: denied by {}: {}", r.index, r.artifact_id, agreement, reason)
                }
                RequestOutcome::Failed { error } => {
                    format!("#{} {}: failed: {}", r.index, r.artifact_id, error)
                }
            })
            .collect();
        for (id, count) in &self.counters {
            lines.push(format!("{} accessed {} time(s)", id, count));
        }
        lines.join("\n")
    }
}

pub async fn run(args: &SimulateArgs, config: &GateConfig) -> CliResult<SimulationReport> {
    let scenario: Scenario = files::load(&args.scenario)?;
    simulate(scenario, config).await
}

pub async fn simulate(scenario: Scenario, config: &GateConfig) -> CliResult<SimulationReport> {
    let repo = Arc::new(InMemoryAgreementRepository::new());
    let store = Arc::new(InMemoryArtifactStore::new());

    let mut retriever = MockRetriever::new();
    for artifact in &scenario.artifacts {
        store.insert(artifact.record());
        if let Some(payload) = &artifact.payload {
            retriever = retriever.with_payload(artifact.payload_key(), payload.clone());
        }
    }
    for agreement in &scenario.agreements {
        let mut reference = AgreementRef::new(&agreement.id);
        reference.remote_address = agreement.remote_address.clone();
        repo.add_agreement(&agreement.artifact, reference, agreement.rules.clone());
    }

    let gate = AccessGate::new(
        repo,
        store.clone(),
        Arc::new(retriever),
        Arc::new(MockDispatcher::accept_all()),
        scenario.gate.clone().unwrap_or_else(|| config.clone()),
    );

    let mut requests = Vec::with_capacity(scenario.requests.len());
    for (index, request) in scenario.requests.iter().enumerate() {
        let outcome = match gate.get_data(request).await {
            Ok(data) => RequestOutcome::Released { bytes: data.len() },
            Err(GateError::PolicyRestriction {
                agreement,
                description,
            }) => RequestOutcome::Denied {
                agreement,
                reason: description,
            },
            Err(e) => RequestOutcome::Failed {
                error: e.to_string(),
            },
        };
        requests.push(RequestReport {
            index: index + 1,
            artifact_id: request.artifact_id.clone(),
            outcome,
        });
    }

    let mut counters = BTreeMap::new();
    for artifact in &scenario.artifacts {
        if let Some(record) = store.get(&artifact.id).await? {
            counters.insert(record.id, record.access_counter);
        }
    }
    let denials = gate
        .ledger_entries(&LedgerFilter::new().with_outcome(AccessOutcome::Denied))
        .await
        .len();

    info!(
        requests = requests.len(),
        denials = denials,
        "Scenario finished"
    );
    Ok(SimulationReport {
        requests,
        counters,
        denials,
    })
}
