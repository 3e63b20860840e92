//! # Error Types
//!
//! Fatal error taxonomy for a rotation run.
//!
//! Only run-aborting failures live here. Per-secret failures never abort the
//! run; workers report them as [`ResealOutcome`](crate::rotation::ResealOutcome)
//! values and sibling secrets keep processing.

use thiserror::Error;

/// Errors that abort a rotation run.
///
/// Both variants are raised before any secret has been published, so an
/// aborted run never leaves the cluster partially rotated by this process.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The active sealing certificate could not be fetched or persisted.
    /// Without it no secret can be re-encrypted, so nothing is processed.
    #[error("failed to obtain the active sealing certificate: {0:#}")]
    KeyFetch(anyhow::Error),

    /// The SealedSecret catalog could not be enumerated. Without a complete
    /// catalog a partial rotation would silently skip secrets.
    #[error("failed to list SealedSecrets in the cluster: {0:#}")]
    List(anyhow::Error),
}
