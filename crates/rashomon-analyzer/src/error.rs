//! Analyzer error types

use rashomon_domain::PovId;
use thiserror::Error;

/// Errors that can occur during overlap/dispute analysis
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Analysis over a POV that does not exist
    #[error("Unknown POV: {0}")]
    UnknownPov(PovId),

    /// Analysis requires at least two POVs
    #[error("Analysis requires at least two POVs, got {0}")]
    NotEnoughPovs(usize),

    /// Engine error while reading label snapshots
    #[error("Engine error: {0}")]
    Engine(String),
}
