//! POV lifecycle and trust map management

use crate::RegistryError;
use rashomon_domain::traits::{OracleStore, TrustSubject};
use rashomon_domain::{Pov, PovId, SourceId, TrustMap};
use std::collections::HashMap;

/// One applied trust change, for dependency-directed invalidation
///
/// The belief revision engine maps the subject to the claims transitively
/// dependent on it and re-evaluates only those.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustDelta {
    /// The POV whose trust map changed
    pub pov: PovId,

    /// What the change applies to
    pub subject: TrustSubject,

    /// Weight before the change (None if no explicit entry existed)
    pub old_weight: Option<f64>,

    /// Weight after the change
    pub new_weight: f64,
}

/// Registry of POVs and their independently owned trust maps
///
/// The registry is the governance collaborator's contract: POV creation and
/// trust updates go through here, are validated synchronously and persisted
/// through the store passed to each operation. Label recomputation is the
/// engine's job; the registry only reports what changed.
#[derive(Debug, Default)]
pub struct TrustRegistry {
    povs: HashMap<PovId, Pov>,
}

impl TrustRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            povs: HashMap::new(),
        }
    }

    /// Rebuild a registry from persisted POVs
    pub fn from_povs(povs: Vec<Pov>) -> Self {
        Self {
            povs: povs.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Create a new POV with an initial trust map
    pub fn create_pov<S>(
        &mut self,
        store: &mut S,
        name: &str,
        trust: TrustMap,
        now: u64,
    ) -> Result<PovId, RegistryError>
    where
        S: OracleStore,
        S::Error: std::fmt::Display,
    {
        Self::validate_weight(trust.default_weight)?;
        for weight in trust.weights.values().chain(trust.class_weights.values()) {
            Self::validate_weight(*weight)?;
        }

        let pov = Pov::new(name, trust, now);
        let id = pov.id;
        store
            .put_pov(&pov)
            .map_err(|e| RegistryError::Store(e.to_string()))?;
        tracing::info!("Created POV {} ({})", name, id);
        self.povs.insert(id, pov);
        Ok(id)
    }

    /// Update the trust weight for one source
    pub fn set_source_trust<S>(
        &mut self,
        store: &mut S,
        pov: PovId,
        source: SourceId,
        weight: f64,
        now: u64,
    ) -> Result<TrustDelta, RegistryError>
    where
        S: OracleStore,
        S::Error: std::fmt::Display,
    {
        self.set_trust(store, pov, TrustSubject::Source(source), weight, now)
    }

    /// Update the trust weight for one source class
    pub fn set_class_trust<S>(
        &mut self,
        store: &mut S,
        pov: PovId,
        class: &str,
        weight: f64,
        now: u64,
    ) -> Result<TrustDelta, RegistryError>
    where
        S: OracleStore,
        S::Error: std::fmt::Display,
    {
        self.set_trust(store, pov, TrustSubject::Class(class.to_string()), weight, now)
    }

    /// Update the default weight for unlisted sources
    pub fn set_default_trust<S>(
        &mut self,
        store: &mut S,
        pov: PovId,
        weight: f64,
        now: u64,
    ) -> Result<TrustDelta, RegistryError>
    where
        S: OracleStore,
        S::Error: std::fmt::Display,
    {
        self.set_trust(store, pov, TrustSubject::Default, weight, now)
    }

    fn set_trust<S>(
        &mut self,
        store: &mut S,
        pov_id: PovId,
        subject: TrustSubject,
        weight: f64,
        now: u64,
    ) -> Result<TrustDelta, RegistryError>
    where
        S: OracleStore,
        S::Error: std::fmt::Display,
    {
        Self::validate_weight(weight)?;
        let pov = self
            .povs
            .get_mut(&pov_id)
            .ok_or(RegistryError::UnknownPov(pov_id))?;

        let old_weight = match &subject {
            TrustSubject::Source(source) => pov.trust.weights.insert(source.clone(), weight),
            TrustSubject::Class(class) => pov.trust.class_weights.insert(class.clone(), weight),
            TrustSubject::Default => {
                let old = pov.trust.default_weight;
                pov.trust.default_weight = weight;
                Some(old)
            }
        };
        pov.updated_at = now;

        store
            .put_trust_entry(pov_id, &subject, weight, now)
            .map_err(|e| RegistryError::Store(e.to_string()))?;
        tracing::debug!(
            "Trust update for POV {}: {} -> {}",
            pov_id,
            subject.as_storage_string(),
            weight
        );

        Ok(TrustDelta {
            pov: pov_id,
            subject,
            old_weight,
            new_weight: weight,
        })
    }

    /// Read-only snapshot of a POV's trust map
    pub fn trust_map(&self, pov: PovId) -> Result<TrustMap, RegistryError> {
        self.povs
            .get(&pov)
            .map(|p| p.trust.clone())
            .ok_or(RegistryError::UnknownPov(pov))
    }

    /// Get a POV by id
    pub fn pov(&self, id: PovId) -> Result<&Pov, RegistryError> {
        self.povs.get(&id).ok_or(RegistryError::UnknownPov(id))
    }

    /// Whether a POV exists
    pub fn contains(&self, id: PovId) -> bool {
        self.povs.contains_key(&id)
    }

    /// Iterate over all POV ids
    pub fn pov_ids(&self) -> impl Iterator<Item = PovId> + '_ {
        self.povs.keys().copied()
    }

    /// Number of registered POVs
    pub fn len(&self) -> usize {
        self.povs.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.povs.is_empty()
    }

    fn validate_weight(weight: f64) -> Result<(), RegistryError> {
        if !(0.0..=1.0).contains(&weight) || weight.is_nan() {
            return Err(RegistryError::InvalidWeight(weight));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rashomon_store::SqliteStore;

    fn setup() -> (TrustRegistry, SqliteStore) {
        (TrustRegistry::new(), SqliteStore::new(":memory:").unwrap())
    }

    #[test]
    fn test_create_pov_and_snapshot() {
        let (mut registry, mut store) = setup();
        let trust = TrustMap::new(0.2).with_source(SourceId::new("outlet:a"), 0.9);
        let id = registry.create_pov(&mut store, "pov-a", trust, 100).unwrap();

        let snapshot = registry.trust_map(id).unwrap();
        assert_eq!(snapshot.weights[&SourceId::new("outlet:a")], 0.9);
        assert_eq!(snapshot.default_weight, 0.2);
    }

    #[test]
    fn test_set_trust_returns_delta() {
        let (mut registry, mut store) = setup();
        let id = registry
            .create_pov(&mut store, "pov-a", TrustMap::default(), 100)
            .unwrap();

        let delta = registry
            .set_source_trust(&mut store, id, SourceId::new("outlet:a"), 0.7, 200)
            .unwrap();
        assert_eq!(delta.old_weight, None);
        assert_eq!(delta.new_weight, 0.7);

        let delta = registry
            .set_source_trust(&mut store, id, SourceId::new("outlet:a"), 0.3, 300)
            .unwrap();
        assert_eq!(delta.old_weight, Some(0.7));

        let delta = registry
            .set_default_trust(&mut store, id, 0.5, 400)
            .unwrap();
        assert_eq!(delta.old_weight, Some(0.0));
        assert_eq!(registry.trust_map(id).unwrap().default_weight, 0.5);
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let (mut registry, mut store) = setup();
        let id = registry
            .create_pov(&mut store, "pov-a", TrustMap::default(), 100)
            .unwrap();

        assert!(matches!(
            registry.set_source_trust(&mut store, id, SourceId::new("s"), 1.5, 200),
            Err(RegistryError::InvalidWeight(_))
        ));
        assert!(matches!(
            registry.set_default_trust(&mut store, id, -0.1, 200),
            Err(RegistryError::InvalidWeight(_))
        ));
        // Rejected mutation changed nothing
        assert!(registry.trust_map(id).unwrap().weights.is_empty());
    }

    #[test]
    fn test_unknown_pov() {
        let (mut registry, mut store) = setup();
        let missing = PovId::new();
        assert!(matches!(
            registry.set_default_trust(&mut store, missing, 0.5, 100),
            Err(RegistryError::UnknownPov(_))
        ));
        assert!(matches!(
            registry.trust_map(missing),
            Err(RegistryError::UnknownPov(_))
        ));
    }

    #[test]
    fn test_rebuild_from_persisted_povs() {
        let (mut registry, mut store) = setup();
        let trust = TrustMap::new(0.1).with_class("newswire", 0.8);
        let id = registry.create_pov(&mut store, "pov-a", trust, 100).unwrap();
        registry
            .set_source_trust(&mut store, id, SourceId::new("outlet:a"), 0.9, 200)
            .unwrap();

        let rebuilt = TrustRegistry::from_povs(store.list_povs().unwrap());
        assert_eq!(rebuilt.len(), 1);
        let snapshot = rebuilt.trust_map(id).unwrap();
        assert_eq!(snapshot.class_weights["newswire"], 0.8);
        assert_eq!(snapshot.weights[&SourceId::new("outlet:a")], 0.9);
    }
}
