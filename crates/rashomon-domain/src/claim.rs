//! Claim module - the fundamental unit of Rashomon's knowledge graph

use crate::source::SourceId;
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-addressed identifier for a claim
///
/// A ClaimId is the SHA-256 digest of the claim's canonical encoding
/// (content, provenance kind, asserting source). Identical content always
/// yields the same id, which makes ingestion idempotent: resubmitting a
/// claim is a no-op by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId([u8; 32]);

impl ClaimId {
    /// Derive the id for the given claim content
    ///
    /// # Examples
    ///
    /// ```
    /// use rashomon_domain::{ClaimId, ProvenanceKind, SourceId};
    ///
    /// let source = SourceId::new("outlet:reuters");
    /// let a = ClaimId::derive("event X occurred", ProvenanceKind::Testimony, &source);
    /// let b = ClaimId::derive("event X occurred", ProvenanceKind::Testimony, &source);
    /// assert_eq!(a, b);
    /// ```
    pub fn derive(content: &str, kind: ProvenanceKind, source: &SourceId) -> Self {
        let mut hasher = Sha256::new();
        // Length-prefixed fields so that (a, bc) and (ab, c) cannot collide
        hasher.update((content.len() as u64).to_be_bytes());
        hasher.update(content.as_bytes());
        hasher.update([kind.tag()]);
        hasher.update((source.as_str().len() as u64).to_be_bytes());
        hasher.update(source.as_str().as_bytes());
        Self(hasher.finalize().into())
    }

    /// Create a ClaimId from raw digest bytes
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a ClaimId from its 64-character hex form
    pub fn from_hex(s: &str) -> Result<Self, String> {
        if s.len() != 64 {
            return Err(format!("Expected 64 hex chars for ClaimId, got {}", s.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("Invalid hex in ClaimId: {}", e))?;
        }
        Ok(Self(bytes))
    }

    /// Get the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Provenance kind of a claim
///
/// Contributes a fixed evidential prior (perception > testimony > inference)
/// independent of source trust; the priors themselves are engine
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvenanceKind {
    /// Direct observation by the source
    Perception,

    /// Reported by the source without direct observation
    Testimony,

    /// Derived from other claims
    Inference,
}

impl ProvenanceKind {
    /// Stable single-byte tag used in the content-addressing encoding
    pub fn tag(&self) -> u8 {
        match self {
            ProvenanceKind::Perception => 0,
            ProvenanceKind::Testimony => 1,
            ProvenanceKind::Inference => 2,
        }
    }

    /// String form for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceKind::Perception => "perception",
            ProvenanceKind::Testimony => "testimony",
            ProvenanceKind::Inference => "inference",
        }
    }

    /// Parse from the storage string form
    pub fn from_str_tag(s: &str) -> Result<Self, String> {
        match s {
            "perception" => Ok(ProvenanceKind::Perception),
            "testimony" => Ok(ProvenanceKind::Testimony),
            "inference" => Ok(ProvenanceKind::Inference),
            _ => Err(format!("Unknown provenance kind: {}", s)),
        }
    }
}

/// A claim - an immutable, content-addressed proposition
///
/// Claims are never mutated in place. A "retraction" or "revision" creates a
/// new claim plus a [`Supersession`] link, which preserves auditability.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Content-addressed identifier
    pub id: ClaimId,

    /// Normalized proposition content (normalization is the ingestion
    /// collaborator's job; the engine only content-addresses it)
    pub content: String,

    /// Provenance kind
    pub kind: ProvenanceKind,

    /// The source asserting this claim
    pub source: SourceId,

    /// When this claim was created (seconds since Unix epoch)
    pub created_at: u64,
}

impl Claim {
    /// Create a new claim, deriving its content-addressed id
    pub fn new(
        content: impl Into<String>,
        kind: ProvenanceKind,
        source: SourceId,
        created_at: u64,
    ) -> Self {
        let content = content.into();
        let id = ClaimId::derive(&content, kind, &source);
        Self {
            id,
            content,
            kind,
            source,
            created_at,
        }
    }
}

/// An append-only link recording that one claim supersedes another
///
/// The superseded claim's label freezes at its last value; the new claim
/// starts ungrounded and is evaluated on its own evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Supersession {
    /// The claim being superseded
    pub old: ClaimId,

    /// The claim that replaces it
    pub new: ClaimId,

    /// When the supersession was recorded
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceId {
        SourceId::new("outlet:test")
    }

    #[test]
    fn test_claim_id_deterministic() {
        let a = ClaimId::derive("water boils at 100C", ProvenanceKind::Testimony, &source());
        let b = ClaimId::derive("water boils at 100C", ProvenanceKind::Testimony, &source());
        assert_eq!(a, b);
    }

    #[test]
    fn test_claim_id_content_sensitive() {
        let a = ClaimId::derive("water boils at 100C", ProvenanceKind::Testimony, &source());
        let b = ClaimId::derive("water boils at 99C", ProvenanceKind::Testimony, &source());
        assert_ne!(a, b);
    }

    #[test]
    fn test_claim_id_kind_sensitive() {
        let a = ClaimId::derive("it rained", ProvenanceKind::Perception, &source());
        let b = ClaimId::derive("it rained", ProvenanceKind::Testimony, &source());
        assert_ne!(a, b);
    }

    #[test]
    fn test_claim_id_hex_roundtrip() {
        let id = ClaimId::derive("x", ProvenanceKind::Inference, &source());
        let hex = id.to_string();
        assert_eq!(hex.len(), 64);
        assert_eq!(ClaimId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn test_claim_id_invalid_hex() {
        assert!(ClaimId::from_hex("zz").is_err());
        assert!(ClaimId::from_hex("").is_err());
    }

    #[test]
    fn test_provenance_kind_roundtrip() {
        for kind in [
            ProvenanceKind::Perception,
            ProvenanceKind::Testimony,
            ProvenanceKind::Inference,
        ] {
            assert_eq!(ProvenanceKind::from_str_tag(kind.as_str()).unwrap(), kind);
        }
        assert!(ProvenanceKind::from_str_tag("rumor").is_err());
    }

    #[test]
    fn test_claim_new_derives_id() {
        let claim = Claim::new("event X occurred", ProvenanceKind::Testimony, source(), 0);
        assert_eq!(
            claim.id,
            ClaimId::derive("event X occurred", ProvenanceKind::Testimony, &source())
        );
    }
}
