//! The belief revision engine
//!
//! Owns the shared claim/justification graph, the trust registry and one
//! independently owned label state per POV. Every mutation validates
//! synchronously, persists through the store, then runs an incremental
//! revision pass per affected POV; queries read the committed label
//! snapshots and never trigger propagation.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::revision::{run_pass, GraphView, PovState};
use rashomon_domain::traits::OracleStore;
use rashomon_domain::{
    BeliefLabel, Claim, ClaimId, EdgeId, JustificationEdge, LabelRecord, Polarity, PovId,
    ProvenanceKind, RevisionLogEntry, RevisionTrigger, Source, SourceId, Supersession, TrustMap,
};
use rashomon_registry::TrustRegistry;
use std::collections::{BTreeSet, HashMap};

/// Current time in seconds since the Unix epoch
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The plural truth maintenance engine
///
/// Generic over the storage backend; all durable state lives in the store's
/// four append-structured tables, while the engine keeps in-memory indexes
/// (including the reverse-dependency index) for incremental propagation.
///
/// # Examples
///
/// ```no_run
/// use rashomon_engine::{Engine, EngineConfig};
/// use rashomon_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteStore::new("rashomon.db")?;
/// let mut engine = Engine::load(store, EngineConfig::default())?;
/// # Ok(())
/// # }
/// ```
pub struct Engine<S: OracleStore> {
    store: S,
    config: EngineConfig,
    registry: TrustRegistry,

    claims: HashMap<ClaimId, Claim>,
    sources: HashMap<SourceId, Source>,
    edges: HashMap<EdgeId, JustificationEdge>,
    edges_into: HashMap<ClaimId, Vec<EdgeId>>,
    edges_from: HashMap<ClaimId, Vec<EdgeId>>,
    source_claims: HashMap<SourceId, Vec<ClaimId>>,
    superseded: HashMap<ClaimId, ClaimId>,

    states: HashMap<PovId, PovState>,
    log_seq: u64,
}

impl<S> Engine<S>
where
    S: OracleStore,
    S::Error: std::fmt::Display,
{
    /// Create an engine over an empty (or fresh) store
    pub fn new(store: S, config: EngineConfig) -> Result<Self, EngineError> {
        let log_seq = store.last_seq().map_err(Self::store_err)?;
        Ok(Self {
            store,
            config,
            registry: TrustRegistry::new(),
            claims: HashMap::new(),
            sources: HashMap::new(),
            edges: HashMap::new(),
            edges_into: HashMap::new(),
            edges_from: HashMap::new(),
            source_claims: HashMap::new(),
            superseded: HashMap::new(),
            states: HashMap::new(),
            log_seq,
        })
    }

    /// Rebuild an engine from durable state
    ///
    /// Claims, edges, trust maps and the revision log are replayed from the
    /// store; labels are derived state and are recomputed silently (no log
    /// entries), so replay after a shutdown is idempotent. Frozen labels of
    /// superseded claims are restored from their last log entry.
    pub fn load(store: S, config: EngineConfig) -> Result<Self, EngineError> {
        let mut engine = Self::new(store, config)?;

        for source in engine.store.list_sources().map_err(Self::store_err)? {
            engine.sources.insert(source.id.clone(), source);
        }
        for claim in engine.store.list_claims().map_err(Self::store_err)? {
            engine.index_claim(claim);
        }
        for edge in engine.store.list_edges().map_err(Self::store_err)? {
            engine.index_edge(edge);
        }
        for link in engine.store.list_supersessions().map_err(Self::store_err)? {
            engine.superseded.insert(link.old, link.new);
        }
        engine.registry =
            TrustRegistry::from_povs(engine.store.list_povs().map_err(Self::store_err)?);

        let pov_ids: Vec<PovId> = engine.registry.pov_ids().collect();
        let frozen: Vec<ClaimId> = engine.superseded.keys().copied().collect();
        for pov_id in &pov_ids {
            let mut state = PovState::default();
            // Restore frozen labels first so audit reads survive restarts
            for claim in &frozen {
                let history = engine
                    .store
                    .history(*claim, Some(*pov_id))
                    .map_err(Self::store_err)?;
                if let Some(last) = history.last() {
                    state.labels.insert(
                        *claim,
                        LabelRecord {
                            label: last.new_label,
                            score: 0.0,
                            witness: Vec::new(),
                            evaluated_at: last.timestamp,
                        },
                    );
                }
            }
            engine.states.insert(*pov_id, state);
        }

        let seeds: Vec<ClaimId> = engine.claims.keys().copied().collect();
        for pov_id in pov_ids {
            engine.revise_pov(pov_id, &seeds, &RevisionTrigger::PovCreated(pov_id), false)?;
        }
        tracing::info!(
            "Engine loaded: {} claims, {} edges, {} POVs",
            engine.claims.len(),
            engine.edges.len(),
            engine.states.len()
        );
        Ok(engine)
    }

    fn store_err(e: S::Error) -> EngineError {
        EngineError::Store(e.to_string())
    }

    fn index_claim(&mut self, claim: Claim) {
        self.source_claims
            .entry(claim.source.clone())
            .or_default()
            .push(claim.id);
        self.claims.insert(claim.id, claim);
    }

    fn index_edge(&mut self, edge: JustificationEdge) {
        self.edges_into.entry(edge.target).or_default().push(edge.id);
        for supporter in &edge.supporters {
            self.edges_from.entry(*supporter).or_default().push(edge.id);
        }
        self.edges.insert(edge.id, edge);
    }

    // --- ingestion contract ---

    /// Register a source of testimony; returns false if already known
    pub fn register_source(
        &mut self,
        id: SourceId,
        name: &str,
        class: Option<String>,
    ) -> Result<bool, EngineError> {
        if self.sources.contains_key(&id) {
            return Ok(false);
        }
        let mut source = Source::new(id, name, now_secs());
        if let Some(class) = class {
            source = source.with_class(class);
        }
        self.store.put_source(&source).map_err(Self::store_err)?;
        self.sources.insert(source.id.clone(), source);
        Ok(true)
    }

    /// Submit a claim; idempotent on identical content
    ///
    /// Resubmitting identical content returns the existing id, performs no
    /// mutation and writes no log entries. A new claim invalidates every POV
    /// and is labeled within the same call.
    pub fn submit_claim(
        &mut self,
        content: &str,
        kind: ProvenanceKind,
        source: &SourceId,
    ) -> Result<ClaimId, EngineError> {
        if content.is_empty() {
            return Err(EngineError::Validation("claim content is empty".into()));
        }
        if !self.sources.contains_key(source) {
            return Err(EngineError::Validation(format!(
                "unknown source: {}",
                source
            )));
        }
        let claim = Claim::new(content, kind, source.clone(), now_secs());
        let id = claim.id;
        if self.claims.contains_key(&id) {
            return Ok(id);
        }
        self.store.put_claim(&claim).map_err(Self::store_err)?;
        self.index_claim(claim);
        tracing::debug!("Submitted claim {}", id);
        self.revise_all(&[id], &RevisionTrigger::ClaimSubmitted(id));
        Ok(id)
    }

    /// Supersede a claim with revised content
    ///
    /// The old claim's label freezes (one final log entry per POV) and it
    /// stops justifying other claims; the new claim starts UNDECIDED and is
    /// evaluated on its own evidence.
    pub fn supersede(
        &mut self,
        old: ClaimId,
        content: &str,
        kind: ProvenanceKind,
        source: &SourceId,
    ) -> Result<Supersession, EngineError> {
        if !self.claims.contains_key(&old) {
            return Err(EngineError::UnknownClaim(old));
        }
        if self.superseded.contains_key(&old) {
            return Err(EngineError::Validation(format!(
                "claim {} is already superseded",
                old
            )));
        }
        if !self.sources.contains_key(source) {
            return Err(EngineError::Validation(format!(
                "unknown source: {}",
                source
            )));
        }
        let now = now_secs();
        let new_claim = Claim::new(content, kind, source.clone(), now);
        let new_id = new_claim.id;
        if new_id == old {
            return Err(EngineError::Validation(
                "supersession must change claim content".into(),
            ));
        }
        if !self.claims.contains_key(&new_id) {
            self.store.put_claim(&new_claim).map_err(Self::store_err)?;
            self.index_claim(new_claim);
        }
        let link = Supersession {
            old,
            new: new_id,
            created_at: now,
        };
        self.store
            .put_supersession(&link)
            .map_err(Self::store_err)?;

        // Freeze the old label in the log for every POV, then retract it
        // from active justification
        let pov_ids: Vec<PovId> = self.registry.pov_ids().collect();
        for pov_id in &pov_ids {
            let frozen = self
                .states
                .get(pov_id)
                .map(|s| s.current(old))
                .unwrap_or_else(|| LabelRecord::undecided(now));
            self.log_seq += 1;
            let entry = RevisionLogEntry {
                seq: self.log_seq,
                timestamp: now,
                pov: *pov_id,
                claim: old,
                old_label: frozen.label,
                new_label: frozen.label,
                trigger: RevisionTrigger::Superseded(new_id),
                reason: format!("superseded by {}; label frozen", new_id),
            };
            self.store.append_log(&entry).map_err(Self::store_err)?;
        }
        let mut seeds = self.dependent_claims(old);
        seeds.push(new_id);
        self.superseded.insert(old, new_id);
        tracing::debug!("Superseded claim {} with {}", old, new_id);
        self.revise_all(&seeds, &RevisionTrigger::Superseded(new_id));
        Ok(link)
    }

    /// Add a justification edge
    ///
    /// Malformed edges are rejected synchronously, before any state change;
    /// propagation never sees them.
    pub fn add_edge(
        &mut self,
        supporters: BTreeSet<ClaimId>,
        target: ClaimId,
        polarity: Polarity,
        strength: f64,
    ) -> Result<EdgeId, EngineError> {
        if supporters.is_empty() {
            return Err(EngineError::Validation(
                "edge requires at least one supporter".into(),
            ));
        }
        if !(0.0..=1.0).contains(&strength) {
            return Err(EngineError::InvalidStrength(strength));
        }
        for claim in supporters.iter().chain(std::iter::once(&target)) {
            if !self.claims.contains_key(claim) {
                return Err(EngineError::DanglingReference(*claim));
            }
        }
        let edge = JustificationEdge::new(supporters, target, polarity, strength, now_secs());
        let id = edge.id;
        self.store.put_edge(&edge).map_err(Self::store_err)?;
        self.index_edge(edge);
        tracing::debug!("Added edge {} -> {}", id, target);
        self.revise_all(&[target], &RevisionTrigger::EdgeAdded(id));
        Ok(id)
    }

    /// Deactivate a justification edge (soft delete)
    ///
    /// Idempotent: removing an already-inactive edge is a no-op.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<(), EngineError> {
        let edge = self.edges.get(&id).ok_or(EngineError::UnknownEdge(id))?;
        if !edge.active {
            return Ok(());
        }
        let target = edge.target;
        self.store.deactivate_edge(id).map_err(Self::store_err)?;
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.active = false;
        }
        tracing::debug!("Removed edge {}", id);
        self.revise_all(&[target], &RevisionTrigger::EdgeRemoved(id));
        Ok(())
    }

    // --- governance contract ---

    /// Create a POV and derive its initial labels over all known claims
    pub fn create_pov(&mut self, name: &str, trust: TrustMap) -> Result<PovId, EngineError> {
        let id = self
            .registry
            .create_pov(&mut self.store, name, trust, now_secs())?;
        self.states.insert(id, PovState::default());
        let seeds: Vec<ClaimId> = self.claims.keys().copied().collect();
        self.revise_pov(id, &seeds, &RevisionTrigger::PovCreated(id), true)?;
        Ok(id)
    }

    /// Update one source's trust weight under one POV
    ///
    /// Only the claims transitively dependent on the source are re-evaluated.
    pub fn set_source_trust(
        &mut self,
        pov: PovId,
        source: SourceId,
        weight: f64,
    ) -> Result<(), EngineError> {
        self.registry
            .set_source_trust(&mut self.store, pov, source.clone(), weight, now_secs())?;
        let seeds = self
            .source_claims
            .get(&source)
            .cloned()
            .unwrap_or_default();
        self.revise_pov(pov, &seeds, &RevisionTrigger::TrustChanged(source), true)
    }

    /// Update one source class's trust weight under one POV
    pub fn set_class_trust(
        &mut self,
        pov: PovId,
        class: &str,
        weight: f64,
    ) -> Result<(), EngineError> {
        self.registry
            .set_class_trust(&mut self.store, pov, class, weight, now_secs())?;
        let seeds: Vec<ClaimId> = self
            .claims
            .values()
            .filter(|c| {
                self.sources
                    .get(&c.source)
                    .and_then(|s| s.class.as_deref())
                    == Some(class)
            })
            .map(|c| c.id)
            .collect();
        self.revise_pov(
            pov,
            &seeds,
            &RevisionTrigger::ClassTrustChanged(class.to_string()),
            true,
        )
    }

    /// Update the default trust weight for unlisted sources under one POV
    pub fn set_default_trust(&mut self, pov: PovId, weight: f64) -> Result<(), EngineError> {
        self.registry
            .set_default_trust(&mut self.store, pov, weight, now_secs())?;
        let trust = self.registry.trust_map(pov)?;
        // Only claims whose source actually resolves to the default
        let seeds: Vec<ClaimId> = self
            .claims
            .values()
            .filter(|c| match self.sources.get(&c.source) {
                Some(source) => {
                    !trust.weights.contains_key(&source.id)
                        && source
                            .class
                            .as_ref()
                            .map_or(true, |class| !trust.class_weights.contains_key(class))
                }
                None => false,
            })
            .map(|c| c.id)
            .collect();
        self.revise_pov(pov, &seeds, &RevisionTrigger::DefaultTrustChanged, true)
    }

    // --- presentation contract ---

    /// Current label of a claim under a POV
    pub fn label(&self, pov: PovId, claim: ClaimId) -> Result<LabelRecord, EngineError> {
        let state = self.states.get(&pov).ok_or(EngineError::UnknownPov(pov))?;
        if !self.claims.contains_key(&claim) {
            return Err(EngineError::UnknownClaim(claim));
        }
        Ok(state.current(claim))
    }

    /// Get a claim by id
    pub fn claim(&self, id: ClaimId) -> Result<&Claim, EngineError> {
        self.claims.get(&id).ok_or(EngineError::UnknownClaim(id))
    }

    /// Get an edge by id
    pub fn edge(&self, id: EdgeId) -> Result<&JustificationEdge, EngineError> {
        self.edges.get(&id).ok_or(EngineError::UnknownEdge(id))
    }

    /// A claim's history, time-ascending, optionally filtered by POV
    pub fn history(
        &self,
        claim: ClaimId,
        pov: Option<PovId>,
    ) -> Result<Vec<RevisionLogEntry>, EngineError> {
        if !self.claims.contains_key(&claim) {
            return Err(EngineError::UnknownClaim(claim));
        }
        if let Some(pov) = pov {
            if !self.registry.contains(pov) {
                return Err(EngineError::UnknownPov(pov));
            }
        }
        self.store.history(claim, pov).map_err(Self::store_err)
    }

    /// Active edges targeting a claim
    pub fn incoming_edges(&self, claim: ClaimId) -> Result<Vec<&JustificationEdge>, EngineError> {
        if !self.claims.contains_key(&claim) {
            return Err(EngineError::UnknownClaim(claim));
        }
        Ok(self
            .edges_into
            .get(&claim)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(|e| e.active)
            .collect())
    }

    /// Claims whose labels depend directly on the given claim
    pub fn dependents(&self, claim: ClaimId) -> Result<Vec<ClaimId>, EngineError> {
        if !self.claims.contains_key(&claim) {
            return Err(EngineError::UnknownClaim(claim));
        }
        Ok(self.dependent_claims(claim))
    }

    /// Claims asserted by a source (the source side of the dependency index)
    pub fn claims_for_source(&self, source: &SourceId) -> Vec<ClaimId> {
        self.source_claims.get(source).cloned().unwrap_or_default()
    }

    /// Read-only snapshot of a POV's trust map
    pub fn trust_map(&self, pov: PovId) -> Result<TrustMap, EngineError> {
        Ok(self.registry.trust_map(pov)?)
    }

    /// All registered POV ids
    pub fn pov_ids(&self) -> Vec<PovId> {
        self.registry.pov_ids().collect()
    }

    /// All claim ids, including superseded ones
    pub fn claim_ids(&self) -> Vec<ClaimId> {
        self.claims.keys().copied().collect()
    }

    /// Whether a claim has been superseded
    pub fn is_superseded(&self, claim: ClaimId) -> bool {
        self.superseded.contains_key(&claim)
    }

    /// Whether a POV exists
    pub fn contains_pov(&self, pov: PovId) -> bool {
        self.registry.contains(pov)
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- revision plumbing ---

    fn dependent_claims(&self, claim: ClaimId) -> Vec<ClaimId> {
        self.edges_from
            .get(&claim)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .filter(|e| e.active)
            .map(|e| e.target)
            .collect()
    }

    /// Run a revision pass for every POV
    ///
    /// An `InvariantViolation` aborts only the affected POV's pass: its
    /// last-known-good labels stay authoritative, the violation is logged
    /// and the remaining POVs are still revised.
    fn revise_all(&mut self, seeds: &[ClaimId], trigger: &RevisionTrigger) {
        let pov_ids: Vec<PovId> = self.registry.pov_ids().collect();
        for pov_id in pov_ids {
            if let Err(e) = self.revise_pov(pov_id, seeds, trigger, true) {
                tracing::error!("Revision pass failed for POV {}: {}", pov_id, e);
            }
        }
    }

    /// Run one revision pass for one POV and commit it atomically
    fn revise_pov(
        &mut self,
        pov_id: PovId,
        seeds: &[ClaimId],
        trigger: &RevisionTrigger,
        append: bool,
    ) -> Result<(), EngineError> {
        let pov = self.registry.pov(pov_id)?.clone();
        let state = self
            .states
            .get(&pov_id)
            .ok_or(EngineError::UnknownPov(pov_id))?;
        let graph = GraphView {
            claims: &self.claims,
            sources: &self.sources,
            edges: &self.edges,
            edges_into: &self.edges_into,
            edges_from: &self.edges_from,
            superseded: &self.superseded,
        };
        let now = now_secs();
        let mut working = state.clone();
        let outcome = run_pass(
            &self.config,
            &graph,
            &pov,
            &mut working,
            seeds.iter().copied(),
            now,
        )
        .map_err(|detail| EngineError::InvariantViolation { pov: pov_id, detail })?;

        // Only committed label transitions are logged; worklist-internal
        // steps are not externally visible
        let mut entries = Vec::new();
        if append {
            for claim in &outcome.touched {
                let old_label = state
                    .labels
                    .get(claim)
                    .map_or(BeliefLabel::Undecided, |r| r.label);
                let new = working.current(*claim);
                if old_label != new.label {
                    self.log_seq += 1;
                    entries.push(RevisionLogEntry {
                        seq: self.log_seq,
                        timestamp: now,
                        pov: pov_id,
                        claim: *claim,
                        old_label,
                        new_label: new.label,
                        trigger: trigger.clone(),
                        reason: format!(
                            "score {:+.3}; {} firing edge(s)",
                            new.score,
                            new.witness.len()
                        ),
                    });
                }
            }
        }
        for entry in &entries {
            self.store.append_log(entry).map_err(Self::store_err)?;
        }
        self.states.insert(pov_id, working);
        Ok(())
    }
}
