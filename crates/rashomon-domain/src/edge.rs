//! Justification edges - the evidential relations between claims

use crate::claim::ClaimId;
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a justification edge, based on UUIDv7
///
/// UUIDv7 provides chronological sortability, 128-bit uniqueness and
/// coordination-free generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(u128);

impl EdgeId {
    /// Generate a new UUIDv7-based EdgeId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an EdgeId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an EdgeId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid UUID string: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Polarity of a justification edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// The supporters argue for the target
    Support,

    /// The supporters argue against the target
    Contradict,
}

impl Polarity {
    /// Sign applied to this edge's contribution
    pub fn sign(&self) -> f64 {
        match self {
            Polarity::Support => 1.0,
            Polarity::Contradict => -1.0,
        }
    }

    /// String form for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Support => "support",
            Polarity::Contradict => "contradict",
        }
    }

    /// Parse from the storage string form
    pub fn from_str_tag(s: &str) -> Result<Self, String> {
        match s {
            "support" => Ok(Polarity::Support),
            "contradict" => Ok(Polarity::Contradict),
            _ => Err(format!("Unknown polarity: {}", s)),
        }
    }
}

/// A directed, weighted, polarity-tagged justification
///
/// "These claims, taken together, support/contradict the target at this
/// strength." The supporter set is conjunctive: every supporter must be
/// believed for the edge to fire. Disjunctive alternatives are modeled as
/// multiple incoming edges on the same target.
///
/// Edges are append-only: removal flags the edge inactive rather than
/// deleting the row, so the audit trail stays intact.
#[derive(Debug, Clone, PartialEq)]
pub struct JustificationEdge {
    /// Unique identifier
    pub id: EdgeId,

    /// Conjunctive set of supporting claims
    pub supporters: BTreeSet<ClaimId>,

    /// The claim being supported or contradicted
    pub target: ClaimId,

    /// Edge polarity
    pub polarity: Polarity,

    /// Strength in [0.0, 1.0]
    pub strength: f64,

    /// Whether the edge is live; inactive edges never fire
    pub active: bool,

    /// When this edge was established
    pub created_at: u64,
}

impl JustificationEdge {
    /// Create a new active edge
    ///
    /// Strength bounds and claim existence are validated by the engine at
    /// `add_edge` time, before any state change.
    pub fn new(
        supporters: BTreeSet<ClaimId>,
        target: ClaimId,
        polarity: Polarity,
        strength: f64,
        created_at: u64,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            supporters,
            target,
            polarity,
            strength,
            active: true,
            created_at,
        }
    }
}
