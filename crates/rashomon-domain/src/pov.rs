//! Points of view and their trust maps

use crate::source::{Source, SourceId};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a point of view, based on UUIDv7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PovId(u128);

impl PovId {
    /// Generate a new UUIDv7-based PovId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a PovId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a PovId from a UUID string
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

impl Default for PovId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PovId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Per-POV weighted trust assignment over sources and source classes
///
/// Resolution order for a source's weight: explicit source entry, then the
/// source's class entry, then the default weight. Trust maps are
/// independently owned by their POV; there is no cross-POV aliasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustMap {
    /// Explicit per-source weights in [0.0, 1.0]
    pub weights: BTreeMap<SourceId, f64>,

    /// Per-class weights in [0.0, 1.0]
    pub class_weights: BTreeMap<String, f64>,

    /// Weight for sources with neither a source nor a class entry
    pub default_weight: f64,
}

impl TrustMap {
    /// Create an empty trust map with the given default weight
    pub fn new(default_weight: f64) -> Self {
        Self {
            weights: BTreeMap::new(),
            class_weights: BTreeMap::new(),
            default_weight,
        }
    }

    /// Set the weight for one source
    pub fn with_source(mut self, source: SourceId, weight: f64) -> Self {
        self.weights.insert(source, weight);
        self
    }

    /// Set the weight for one source class
    pub fn with_class(mut self, class: impl Into<String>, weight: f64) -> Self {
        self.class_weights.insert(class.into(), weight);
        self
    }

    /// Resolve the trust weight for a source
    pub fn weight_for(&self, source: &Source) -> f64 {
        if let Some(w) = self.weights.get(&source.id) {
            return *w;
        }
        if let Some(class) = &source.class {
            if let Some(w) = self.class_weights.get(class) {
                return *w;
            }
        }
        self.default_weight
    }
}

impl Default for TrustMap {
    /// Empty map with default weight 0.0: unlisted sources carry no trust
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// A point of view: an independent trust profile over sources
#[derive(Debug, Clone, PartialEq)]
pub struct Pov {
    /// Unique identifier
    pub id: PovId,

    /// Human-readable name
    pub name: String,

    /// This POV's trust assignments
    pub trust: TrustMap,

    /// Optional override of the engine-wide edge/base blend ratio
    pub edge_blend: Option<f64>,

    /// When this POV was created (seconds since Unix epoch)
    pub created_at: u64,

    /// When this POV's trust map last changed
    pub updated_at: u64,
}

impl Pov {
    /// Create a new POV with the given trust map
    pub fn new(name: impl Into<String>, trust: TrustMap, created_at: u64) -> Self {
        Self {
            id: PovId::new(),
            name: name.into(),
            trust,
            edge_blend: None,
            created_at,
            updated_at: created_at,
        }
    }
}
