//! Trait definitions for external interactions
//!
//! These traits define the boundary between domain logic and infrastructure.
//! Infrastructure implementations live in other crates (rashomon-store).

use crate::claim::{Claim, ClaimId, Supersession};
use crate::edge::{EdgeId, JustificationEdge};
use crate::pov::{Pov, PovId};
use crate::revision::RevisionLogEntry;
use crate::source::{Source, SourceId};

/// The subject of one trust map entry
#[derive(Debug, Clone, PartialEq)]
pub enum TrustSubject {
    /// A single source
    Source(SourceId),

    /// A source class
    Class(String),

    /// The default weight for unlisted sources
    Default,
}

impl TrustSubject {
    /// Compact string form for storage
    pub fn as_storage_string(&self) -> String {
        match self {
            TrustSubject::Source(id) => format!("source:{}", id),
            TrustSubject::Class(class) => format!("class:{}", class),
            TrustSubject::Default => "default".to_string(),
        }
    }
}

/// Durable storage for the engine's four append-structured tables
/// (claims, justification edges, trust entries, revision log) plus the
/// sources and supersession links they reference
///
/// Belief labels are derived state and are deliberately absent: they are
/// rebuilt from this store on restart.
pub trait OracleStore {
    /// Error type for store operations
    type Error;

    /// Register a source; returns false if it already existed (no mutation)
    fn put_source(&mut self, source: &Source) -> Result<bool, Self::Error>;

    /// Get a source by id
    fn get_source(&self, id: &SourceId) -> Result<Option<Source>, Self::Error>;

    /// List all sources
    fn list_sources(&self) -> Result<Vec<Source>, Self::Error>;

    /// Persist a claim; returns false if it already existed (idempotent)
    fn put_claim(&mut self, claim: &Claim) -> Result<bool, Self::Error>;

    /// Get a claim by id
    fn get_claim(&self, id: ClaimId) -> Result<Option<Claim>, Self::Error>;

    /// List all claims
    fn list_claims(&self) -> Result<Vec<Claim>, Self::Error>;

    /// Record a supersession link
    fn put_supersession(&mut self, link: &Supersession) -> Result<(), Self::Error>;

    /// List all supersession links
    fn list_supersessions(&self) -> Result<Vec<Supersession>, Self::Error>;

    /// Persist a justification edge
    fn put_edge(&mut self, edge: &JustificationEdge) -> Result<(), Self::Error>;

    /// Flag an edge inactive; returns false if the edge is unknown
    fn deactivate_edge(&mut self, id: EdgeId) -> Result<bool, Self::Error>;

    /// Get an edge by id
    fn get_edge(&self, id: EdgeId) -> Result<Option<JustificationEdge>, Self::Error>;

    /// List all edges, active and inactive
    fn list_edges(&self) -> Result<Vec<JustificationEdge>, Self::Error>;

    /// Persist a POV and its full trust map
    fn put_pov(&mut self, pov: &Pov) -> Result<(), Self::Error>;

    /// Upsert a single trust entry for a POV
    fn put_trust_entry(
        &mut self,
        pov: PovId,
        subject: &TrustSubject,
        weight: f64,
        updated_at: u64,
    ) -> Result<(), Self::Error>;

    /// List all POVs with their trust maps loaded
    fn list_povs(&self) -> Result<Vec<Pov>, Self::Error>;

    /// Append a revision log entry (the only write to the log)
    fn append_log(&mut self, entry: &RevisionLogEntry) -> Result<(), Self::Error>;

    /// Read a claim's history, time-ascending, optionally filtered by POV
    fn history(
        &self,
        claim: ClaimId,
        pov: Option<PovId>,
    ) -> Result<Vec<RevisionLogEntry>, Self::Error>;

    /// Highest sequence number in the log, 0 if empty
    fn last_seq(&self) -> Result<u64, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_subject_storage_strings() {
        assert_eq!(
            TrustSubject::Source(SourceId::new("outlet:a")).as_storage_string(),
            "source:outlet:a"
        );
        assert_eq!(
            TrustSubject::Class("newswire".into()).as_storage_string(),
            "class:newswire"
        );
        assert_eq!(TrustSubject::Default.as_storage_string(), "default");
    }
}
