//! Sealed Secret Rotator Library
//!
//! Re-encrypts every SealedSecret in a cluster under the currently active
//! sealing certificate: fetch the active public certificate once, snapshot
//! the SealedSecret catalog, then fan each secret out through a bounded pool
//! of fetch / stage / re-encrypt / publish workers. One secret's failure
//! never stops its siblings; the run ends with a per-outcome summary.
//!
//! Tests are included in the module files and under `tests/`.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod kubeseal;
pub mod rotation;

pub use cluster::kube::KubeClusterStore;
pub use cluster::{ClusterStore, SecretRef};
pub use config::RotationConfig;
pub use error::RotationError;
pub use kubeseal::{Kubeseal, SealTool};
pub use rotation::{
    CatalogSnapshot, Certificate, Orchestrator, ResealOutcome, ResealWorker, RunSummary,
};
