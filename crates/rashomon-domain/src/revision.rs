//! Revision log - the append-only audit trail of label transitions

use crate::claim::ClaimId;
use crate::edge::EdgeId;
use crate::label::BeliefLabel;
use crate::pov::PovId;
use crate::source::SourceId;

/// What caused a revision pass
#[derive(Debug, Clone, PartialEq)]
pub enum RevisionTrigger {
    /// A new claim was submitted
    ClaimSubmitted(ClaimId),

    /// A justification edge was added
    EdgeAdded(EdgeId),

    /// A justification edge was deactivated
    EdgeRemoved(EdgeId),

    /// A trust weight changed for the named subject
    TrustChanged(SourceId),

    /// A class-level trust weight changed
    ClassTrustChanged(String),

    /// The default trust weight changed
    DefaultTrustChanged,

    /// A POV was created and its initial labels derived
    PovCreated(PovId),

    /// The claim was superseded by another claim
    Superseded(ClaimId),
}

impl RevisionTrigger {
    /// Compact string form for storage
    pub fn as_storage_string(&self) -> String {
        match self {
            RevisionTrigger::ClaimSubmitted(id) => format!("claim:{}", id),
            RevisionTrigger::EdgeAdded(id) => format!("edge-added:{}", id),
            RevisionTrigger::EdgeRemoved(id) => format!("edge-removed:{}", id),
            RevisionTrigger::TrustChanged(id) => format!("trust:{}", id),
            RevisionTrigger::ClassTrustChanged(class) => format!("trust-class:{}", class),
            RevisionTrigger::DefaultTrustChanged => "trust-default".to_string(),
            RevisionTrigger::PovCreated(id) => format!("pov:{}", id),
            RevisionTrigger::Superseded(id) => format!("superseded-by:{}", id),
        }
    }

    /// Parse the storage string form back into a trigger
    pub fn from_storage_string(s: &str) -> Result<Self, String> {
        if s == "trust-default" {
            return Ok(RevisionTrigger::DefaultTrustChanged);
        }
        let (tag, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("Malformed trigger: {}", s))?;
        match tag {
            "claim" => Ok(RevisionTrigger::ClaimSubmitted(ClaimId::from_hex(rest)?)),
            "edge-added" => Ok(RevisionTrigger::EdgeAdded(EdgeId::from_string(rest)?)),
            "edge-removed" => Ok(RevisionTrigger::EdgeRemoved(EdgeId::from_string(rest)?)),
            "trust" => Ok(RevisionTrigger::TrustChanged(SourceId::new(rest))),
            "trust-class" => Ok(RevisionTrigger::ClassTrustChanged(rest.to_string())),
            "pov" => Ok(RevisionTrigger::PovCreated(PovId::from_string(rest)?)),
            "superseded-by" => Ok(RevisionTrigger::Superseded(ClaimId::from_hex(rest)?)),
            _ => Err(format!("Unknown trigger tag: {}", tag)),
        }
    }
}

/// One immutable record of a label transition
///
/// Entries are never deleted or reordered. `history(claim, pov)` walks these
/// records, together with the justification witnesses captured at each
/// transition, to answer "why does this POV believe X".
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionLogEntry {
    /// Monotonic sequence number, assigned at append time
    pub seq: u64,

    /// When the transition happened (seconds since Unix epoch)
    pub timestamp: u64,

    /// The POV whose label changed
    pub pov: PovId,

    /// The claim whose label changed
    pub claim: ClaimId,

    /// Label before the transition
    pub old_label: BeliefLabel,

    /// Label after the transition
    pub new_label: BeliefLabel,

    /// The mutation that caused the revision pass
    pub trigger: RevisionTrigger,

    /// Human-readable causal justification
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ProvenanceKind;

    #[test]
    fn test_trigger_storage_strings() {
        let claim = ClaimId::derive("x", ProvenanceKind::Testimony, &SourceId::new("s"));
        assert!(RevisionTrigger::ClaimSubmitted(claim)
            .as_storage_string()
            .starts_with("claim:"));
        assert_eq!(
            RevisionTrigger::DefaultTrustChanged.as_storage_string(),
            "trust-default"
        );
        assert_eq!(
            RevisionTrigger::ClassTrustChanged("newswire".into()).as_storage_string(),
            "trust-class:newswire"
        );
    }

    #[test]
    fn test_trigger_storage_roundtrip() {
        let claim = ClaimId::derive("x", ProvenanceKind::Testimony, &SourceId::new("s"));
        let triggers = [
            RevisionTrigger::ClaimSubmitted(claim),
            RevisionTrigger::EdgeAdded(EdgeId::new()),
            RevisionTrigger::EdgeRemoved(EdgeId::new()),
            RevisionTrigger::TrustChanged(SourceId::new("outlet:a")),
            RevisionTrigger::ClassTrustChanged("newswire".into()),
            RevisionTrigger::DefaultTrustChanged,
            RevisionTrigger::PovCreated(PovId::new()),
            RevisionTrigger::Superseded(claim),
        ];
        for trigger in triggers {
            let parsed =
                RevisionTrigger::from_storage_string(&trigger.as_storage_string()).unwrap();
            assert_eq!(parsed, trigger);
        }
        assert!(RevisionTrigger::from_storage_string("bogus").is_err());
    }
}
