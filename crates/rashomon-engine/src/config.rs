//! Configuration for belief revision
//!
//! All numeric thresholds of the labeling rule live here as tunables; the
//! propagation code never hard-codes a constant.

use rashomon_domain::ProvenanceKind;
use serde::{Deserialize, Serialize};

/// Configuration for the belief revision engine
///
/// # Examples
///
/// ```
/// use rashomon_engine::EngineConfig;
///
/// // Default configuration (balanced)
/// let config = EngineConfig::default();
/// assert_eq!(config.tau_in, 0.15);
///
/// // Strict labeling (more UNDECIDED, less IN/OUT)
/// let config = EngineConfig::strict();
/// assert_eq!(config.tau_in, 0.3);
///
/// // Lenient labeling
/// let config = EngineConfig::lenient();
/// assert_eq!(config.tau_in, 0.1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Labeling threshold: score >= tau_in is IN, score <= -tau_in is OUT
    /// Default: 0.15
    pub tau_in: f64,

    /// Conflict window: positive and negative evidence within epsilon of
    /// each other (and both above tau_in) is CONFLICTED
    /// Default: 0.1
    pub epsilon: f64,

    /// Weight of edge evidence vs base assertability in the support score
    /// (1.0 = edges only, 0.0 = source trust only); POVs may override
    /// Default: 0.5
    pub edge_blend: f64,

    /// Evidential prior for claims observed directly by their source
    /// Default: 1.0
    pub prior_perception: f64,

    /// Evidential prior for claims reported without direct observation
    /// Default: 0.9
    pub prior_testimony: f64,

    /// Evidential prior for claims derived from other claims
    /// Default: 0.75
    pub prior_inference: f64,

    /// Re-evaluation bound per claim per pass; a claim revisited more often
    /// is oscillating and gets pinned CONFLICTED for the pass
    /// Default: 64
    #[serde(default = "default_max_visits")]
    pub max_visits: u32,
}

fn default_max_visits() -> u32 {
    64
}

impl Default for EngineConfig {
    /// Balanced defaults
    ///
    /// - tau_in 0.15: a single well-trusted source is enough for IN
    /// - epsilon 0.1: contradictions must be closely matched to conflict
    /// - edge_blend 0.5: edges and source trust count equally
    /// - priors 1.0 / 0.9 / 0.75: perception > testimony > inference
    fn default() -> Self {
        Self {
            tau_in: 0.15,
            epsilon: 0.1,
            edge_blend: 0.5,
            prior_perception: 1.0,
            prior_testimony: 0.9,
            prior_inference: 0.75,
            max_visits: 64,
        }
    }
}

impl EngineConfig {
    /// Strict labeling: higher bar for IN/OUT, narrower conflict window
    ///
    /// Suitable when downstream consumers treat IN as near-certain.
    pub fn strict() -> Self {
        Self {
            tau_in: 0.3,
            epsilon: 0.05,
            edge_blend: 0.5,
            prior_perception: 1.0,
            prior_testimony: 0.8,
            prior_inference: 0.6,
            max_visits: 64,
        }
    }

    /// Lenient labeling: lower bar for IN/OUT, wider conflict window
    ///
    /// Suitable for exploratory use where UNDECIDED is unhelpful.
    pub fn lenient() -> Self {
        Self {
            tau_in: 0.1,
            epsilon: 0.2,
            edge_blend: 0.5,
            prior_perception: 1.0,
            prior_testimony: 0.95,
            prior_inference: 0.85,
            max_visits: 64,
        }
    }

    /// The evidential prior for a provenance kind
    pub fn prior_for(&self, kind: ProvenanceKind) -> f64 {
        match kind {
            ProvenanceKind::Perception => self.prior_perception,
            ProvenanceKind::Testimony => self.prior_testimony,
            ProvenanceKind::Inference => self.prior_inference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tau_in, 0.15);
        assert_eq!(config.epsilon, 0.1);
        assert_eq!(config.edge_blend, 0.5);
        assert_eq!(config.max_visits, 64);
    }

    #[test]
    fn test_priors_are_ordered() {
        for config in [
            EngineConfig::default(),
            EngineConfig::strict(),
            EngineConfig::lenient(),
        ] {
            assert!(config.prior_perception > config.prior_testimony);
            assert!(config.prior_testimony > config.prior_inference);
        }
    }

    #[test]
    fn test_prior_for() {
        let config = EngineConfig::default();
        assert_eq!(config.prior_for(ProvenanceKind::Perception), 1.0);
        assert_eq!(config.prior_for(ProvenanceKind::Testimony), 0.9);
        assert_eq!(config.prior_for(ProvenanceKind::Inference), 0.75);
    }

    #[test]
    fn test_strict_is_stricter() {
        assert!(EngineConfig::strict().tau_in > EngineConfig::default().tau_in);
        assert!(EngineConfig::strict().epsilon < EngineConfig::default().epsilon);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = EngineConfig::default();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config.tau_in, deserialized.tau_in);
        assert_eq!(config.epsilon, deserialized.epsilon);
        assert_eq!(config.max_visits, deserialized.max_visits);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::lenient();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(config.tau_in, deserialized.tau_in);
        assert_eq!(config.prior_inference, deserialized.prior_inference);
    }
}
