//! Registry error types

use rashomon_domain::PovId;
use thiserror::Error;

/// Errors that can occur during trust registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Operation against a POV that does not exist
    #[error("Unknown POV: {0}")]
    UnknownPov(PovId),

    /// Trust weight outside [0.0, 1.0]
    #[error("Invalid trust weight: {0} (must be in [0, 1])")]
    InvalidWeight(f64),

    /// Store error during persistence
    #[error("Store error: {0}")]
    Store(String),
}
