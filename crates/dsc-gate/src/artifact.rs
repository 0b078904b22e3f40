//! Artifacts, agreements and access requests as the gate sees them.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dsc_policy::Target;
use serde::{Deserialize, Serialize};

/// Where an artifact's bytes live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactData {
    /// Stored in this connector.
    Local { bytes: Bytes },
    /// Served by a backend, fetched on each access.
    Remote { access_url: String },
    /// A representation this connector cannot serve.
    Unknown { kind: String },
}

/// Hex BLAKE3 digest of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub id: String,
    /// Artifact URI at the providing connector; rules target it.
    pub remote_id: Option<Target>,
    /// Provider connector to download from.
    pub remote_address: Option<String>,
    /// Size the provider advertised, if known.
    pub provider_byte_size: Option<u64>,
    pub byte_size: u64,
    pub checksum: Option<String>,
    pub automated_download: bool,
    pub access_counter: u64,
    pub data: ArtifactData,
    pub created_at: DateTime<Utc>,
    /// Time of the first access.
    pub usage_start: Option<DateTime<Utc>>,
}

impl ArtifactRecord {
    fn with_data(id: impl Into<String>, data: ArtifactData) -> Self {
        Self {
            id: id.into(),
            remote_id: None,
            remote_address: None,
            provider_byte_size: None,
            byte_size: 0,
            checksum: None,
            automated_download: false,
            access_counter: 0,
            data,
            created_at: Utc::now(),
            usage_start: None,
        }
    }

    /// An artifact offered by this connector, with its bytes stored locally.
    pub fn local(id: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let mut record = Self::with_data(id, ArtifactData::Local { bytes: Bytes::new() });
        record.store(bytes.into());
        record
    }

    /// An artifact backed by a remote access URL.
    pub fn remote(id: impl Into<String>, access_url: impl Into<String>) -> Self {
        Self::with_data(
            id,
            ArtifactData::Remote {
                access_url: access_url.into(),
            },
        )
    }

    /// An artifact obtained from another connector; no data yet.
    pub fn consumed(
        id: impl Into<String>,
        remote_id: impl Into<Target>,
        remote_address: impl Into<String>,
    ) -> Self {
        let mut record = Self::with_data(id, ArtifactData::Local { bytes: Bytes::new() });
        record.remote_id = Some(remote_id.into());
        record.remote_address = Some(remote_address.into());
        record
    }

    pub fn with_provider_byte_size(mut self, size: u64) -> Self {
        self.provider_byte_size = Some(size);
        self
    }

    pub fn with_automated_download(mut self, enabled: bool) -> Self {
        self.automated_download = enabled;
        self
    }

    pub fn with_access_counter(mut self, count: u64) -> Self {
        self.access_counter = count;
        self
    }

    pub fn with_data_kind(mut self, data: ArtifactData) -> Self {
        self.data = data;
        self
    }

    /// The identifier rules refer to this artifact by.
    pub fn target(&self) -> Target {
        self.remote_id
            .clone()
            .unwrap_or_else(|| Target::new(self.id.clone()))
    }

    /// Local data is present once at least the advertised size is stored.
    pub fn has_local_data(&self) -> bool {
        matches!(self.provider_byte_size, Some(size) if self.byte_size >= size)
    }

    /// Replace local bytes, updating size and checksum together.
    ///
    /// Returns false for non-local representations, which are left as is.
    pub fn store(&mut self, bytes: Bytes) -> bool {
        match self.data {
            ArtifactData::Local { .. } => {
                self.byte_size = bytes.len() as u64;
                self.checksum = Some(checksum(&bytes));
                self.data = ArtifactData::Local { bytes };
                true
            }
            ArtifactData::Remote { .. } | ArtifactData::Unknown { .. } => false,
        }
    }
}

/// Parameters forwarded to the provider or backend with a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInput {
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Extra path segment appended to the access URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<String>,
}

/// A confirmed agreement that governs an artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementRef {
    pub id: String,
    /// The providing connector.
    #[serde(default)]
    pub remote_address: Option<String>,
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

impl AgreementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_address: None,
            confirmed: true,
        }
    }
}

/// One call to [`AccessGate::get_data`](crate::AccessGate::get_data).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub artifact_id: String,
    /// Restricts the governing agreements to this one.
    #[serde(default)]
    pub transfer_contract: Option<String>,
    #[serde(default)]
    pub query: Option<QueryInput>,
    #[serde(default)]
    pub force_download: bool,
    /// Routes the data is sent to before it is returned.
    #[serde(default)]
    pub route_ids: Vec<String>,
}

impl AccessRequest {
    pub fn new(artifact_id: impl Into<String>) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            ..Default::default()
        }
    }

    pub fn with_transfer_contract(mut self, contract: impl Into<String>) -> Self {
        self.transfer_contract = Some(contract.into());
        self
    }

    pub fn with_query(mut self, query: QueryInput) -> Self {
        self.query = Some(query);
        self
    }

    pub fn force_download(mut self) -> Self {
        self.force_download = true;
        self
    }

    pub fn with_route(mut self, route_id: impl Into<String>) -> Self {
        self.route_ids.push(route_id.into());
        self
    }

    /// Whether authorized data must be fetched from the provider first.
    pub fn requires_download(&self, artifact: &ArtifactRecord) -> bool {
        self.force_download
            || self.query.is_some()
            || !artifact.has_local_data()
            || artifact.automated_download
    }
}
