//! Access gate for artifact data.
//!
//! Every data release goes through [`AccessGate::get_data`]:
//!
//! 1. the artifact's governing agreements are looked up;
//! 2. each agreement's rules are verified against the artifact's lifecycle
//!    net, in order, until one agreement is fully satisfied;
//! 3. data is downloaded from the provider when needed, otherwise served
//!    from the stored representation;
//! 4. the data is sent to the requested routes;
//! 5. the access counter is incremented once.
//!
//! Artifacts without agreements are this connector's own offers and skip
//! step 2. Every decision is written to an append-only [`AccessLedger`].

#![deny(unsafe_code)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod mocks;
pub mod net;
pub mod traits;

pub use artifact::{checksum, AccessRequest, AgreementRef, ArtifactData, ArtifactRecord, QueryInput};
pub use config::{ConnectorProfile, GateConfig};
pub use error::{GateError, GateResult};
pub use gate::AccessGate;
pub use ledger::{AccessEntry, AccessLedger, AccessOutcome, LedgerFilter};
pub use net::LifecycleNetProvider;
pub use traits::{AgreementRepository, ArtifactStore, DataRetriever, NetProvider, RouteDispatcher};
