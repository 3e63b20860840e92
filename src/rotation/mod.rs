//! # Rotation Pipeline
//!
//! Key discovery, catalog snapshot, and the bounded-concurrency
//! reseal-and-publish fan-out.

pub mod catalog;
pub mod keysource;
pub mod orchestrator;
pub mod worker;
pub mod workspace;

pub use catalog::{take_snapshot, CatalogSnapshot};
pub use keysource::{fetch_active_certificate, Certificate};
pub use orchestrator::{Orchestrator, RunSummary};
pub use worker::{ResealOutcome, ResealWorker};
pub use workspace::RunWorkspace;
