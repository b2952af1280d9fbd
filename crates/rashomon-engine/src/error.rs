//! Engine error types

use rashomon_domain::{ClaimId, EdgeId, PovId};
use rashomon_registry::RegistryError;
use thiserror::Error;

/// Errors that can occur during engine operations
///
/// Rejected mutations change no state; there is no automatic retry. An
/// `InvariantViolation` aborts one POV's revision pass and leaves that POV's
/// last-known-good labels authoritative — it never cascades to other POVs.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input, rejected synchronously
    #[error("Validation error: {0}")]
    Validation(String),

    /// Edge references a claim that does not exist
    #[error("Dangling reference to unknown claim: {0}")]
    DanglingReference(ClaimId),

    /// Edge strength outside [0.0, 1.0]
    #[error("Invalid strength: {0} (must be in [0, 1])")]
    InvalidStrength(f64),

    /// Query against a POV that does not exist
    #[error("Unknown POV: {0}")]
    UnknownPov(PovId),

    /// Query against a claim that does not exist
    #[error("Unknown claim: {0}")]
    UnknownClaim(ClaimId),

    /// Operation against an edge that does not exist
    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),

    /// Internal numeric or graph inconsistency; fatal for the affected
    /// POV's current revision pass only
    #[error("Invariant violation in POV {pov}: {detail}")]
    InvariantViolation {
        /// The POV whose pass was aborted
        pov: PovId,
        /// What went wrong
        detail: String,
    },

    /// Trust registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Store error during persistence
    #[error("Store error: {0}")]
    Store(String),
}
