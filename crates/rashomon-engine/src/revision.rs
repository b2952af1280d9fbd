//! Worklist fixed-point propagation of belief labels
//!
//! One revision pass re-evaluates the claims affected by a single mutation
//! under a single POV. The engine clones the POV's state, runs the pass on
//! the clone and commits it only on success, so a failed pass leaves the
//! last-known-good labels untouched and pass-internal steps are never
//! externally visible.

use crate::config::EngineConfig;
use rashomon_domain::{
    BeliefLabel, Claim, ClaimId, EdgeId, JustificationEdge, LabelRecord, Polarity, Pov, Source,
    SourceId,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Read-only view of the shared claim/justification graph for one pass
pub(crate) struct GraphView<'a> {
    /// All claims by id
    pub claims: &'a HashMap<ClaimId, Claim>,
    /// All sources by id
    pub sources: &'a HashMap<SourceId, Source>,
    /// All edges by id, active and inactive
    pub edges: &'a HashMap<EdgeId, JustificationEdge>,
    /// Incoming edge ids per target claim
    pub edges_into: &'a HashMap<ClaimId, Vec<EdgeId>>,
    /// Edge ids per supporter claim (the reverse-dependency index)
    pub edges_from: &'a HashMap<ClaimId, Vec<EdgeId>>,
    /// Superseded claims (label frozen, skipped by evaluation)
    pub superseded: &'a HashMap<ClaimId, ClaimId>,
}

impl GraphView<'_> {
    /// Claims whose evaluation reads the given claim's label
    fn dependents(&self, claim: ClaimId) -> Vec<ClaimId> {
        let Some(edge_ids) = self.edges_from.get(&claim) else {
            return Vec::new();
        };
        edge_ids
            .iter()
            .filter_map(|id| self.edges.get(id))
            .filter(|e| e.active)
            .map(|e| e.target)
            .collect()
    }
}

/// Per-POV mutable label state
///
/// Owned by exactly one POV; cross-POV sharing would defeat the isolation
/// guarantees of §per-POV passes.
#[derive(Debug, Clone, Default)]
pub(crate) struct PovState {
    /// Current label per claim; absent means UNDECIDED with score 0
    pub labels: HashMap<ClaimId, LabelRecord>,

    /// Supporter claim -> contradict edges whose firing currently induces a
    /// conflict at their target (the supporter is held CONFLICTED while any
    /// mark remains)
    pub conflict_marks: HashMap<ClaimId, BTreeSet<EdgeId>>,

    /// Target claim -> contradict edges that induced its current conflict
    pub conflict_edges: HashMap<ClaimId, BTreeSet<EdgeId>>,
}

impl PovState {
    /// Current record for a claim, defaulting to UNDECIDED
    pub fn current(&self, claim: ClaimId) -> LabelRecord {
        self.labels
            .get(&claim)
            .cloned()
            .unwrap_or_else(|| LabelRecord::undecided(0))
    }
}

/// What a pass touched, in first-evaluation order
pub(crate) struct PassOutcome {
    /// Claims evaluated at least once
    pub touched: Vec<ClaimId>,
}

fn enqueue(
    worklist: &mut VecDeque<ClaimId>,
    queued: &mut HashSet<ClaimId>,
    claim: ClaimId,
) {
    if queued.insert(claim) {
        worklist.push_back(claim);
    }
}

/// Run one revision pass over the given POV state
///
/// Seeds are the claims directly affected by the triggering mutation; the
/// worklist grows through the reverse-dependency index as labels change and
/// drains to a fixed point. Errors are invariant violations (non-finite
/// scores); the caller wraps them and drops the working state.
pub(crate) fn run_pass(
    config: &EngineConfig,
    graph: &GraphView<'_>,
    pov: &Pov,
    state: &mut PovState,
    seeds: impl IntoIterator<Item = ClaimId>,
    now: u64,
) -> Result<PassOutcome, String> {
    let mut worklist: VecDeque<ClaimId> = VecDeque::new();
    let mut queued: HashSet<ClaimId> = HashSet::new();
    let mut visits: HashMap<ClaimId, u32> = HashMap::new();
    let mut pinned: HashSet<ClaimId> = HashSet::new();
    let mut touched: Vec<ClaimId> = Vec::new();
    let mut touched_set: HashSet<ClaimId> = HashSet::new();

    for seed in seeds {
        enqueue(&mut worklist, &mut queued, seed);
    }

    while let Some(claim_id) = worklist.pop_front() {
        queued.remove(&claim_id);

        // Superseded claims are frozen; unknown ids (stale seeds) are skipped
        if graph.superseded.contains_key(&claim_id) {
            continue;
        }
        let Some(claim) = graph.claims.get(&claim_id) else {
            continue;
        };

        // A pinned claim that has settled on CONFLICTED stays there; cutting
        // here is what bounds oscillating cycles
        if pinned.contains(&claim_id)
            && state
                .labels
                .get(&claim_id)
                .is_some_and(|r| r.label == BeliefLabel::Conflicted)
        {
            continue;
        }

        let visit = visits.entry(claim_id).or_insert(0);
        *visit += 1;
        if *visit > config.max_visits {
            tracing::warn!(
                "Claim {} oscillating under POV {}; pinning CONFLICTED",
                claim_id,
                pov.id
            );
            pinned.insert(claim_id);
        }

        if touched_set.insert(claim_id) {
            touched.push(claim_id);
        }

        // Base assertability: source trust scaled by the provenance prior
        let source = graph.sources.get(&claim.source).ok_or_else(|| {
            format!(
                "claim {} references unknown source {}",
                claim_id, claim.source
            )
        })?;
        let base = pov.trust.weight_for(source) * config.prior_for(claim.kind);

        // Edge evaluation
        let mut pos = 0.0_f64;
        let mut neg = 0.0_f64;
        let mut witness: Vec<EdgeId> = Vec::new();
        let mut firing_contradict: BTreeSet<EdgeId> = BTreeSet::new();

        if let Some(edge_ids) = graph.edges_into.get(&claim_id) {
            for edge_id in edge_ids {
                let Some(edge) = graph.edges.get(edge_id) else {
                    continue;
                };
                if !edge.active {
                    continue;
                }
                let mut min_score = f64::INFINITY;
                let mut fires = !edge.supporters.is_empty();
                for supporter in &edge.supporters {
                    // A retracted (superseded) claim no longer justifies
                    // anything; its frozen label is audit-only
                    if graph.superseded.contains_key(supporter) {
                        fires = false;
                        break;
                    }
                    let record = state.current(*supporter);
                    let eligible = match edge.polarity {
                        Polarity::Support => record.label == BeliefLabel::In,
                        // A claim in conflict still casts doubt on what it
                        // contradicts; without this, mutual-conflict marking
                        // would not be a fixed point
                        Polarity::Contradict => matches!(
                            record.label,
                            BeliefLabel::In | BeliefLabel::Conflicted
                        ),
                    };
                    if !eligible || record.score <= 0.0 {
                        fires = false;
                        break;
                    }
                    min_score = min_score.min(record.score);
                }
                if !fires {
                    continue;
                }
                let contribution = edge.strength * min_score;
                match edge.polarity {
                    Polarity::Support => pos += contribution,
                    Polarity::Contradict => {
                        neg += contribution;
                        firing_contradict.insert(edge.id);
                    }
                }
                witness.push(edge.id);
            }
        }
        // clamp (unlike min) propagates NaN into the invariant check below
        pos = pos.clamp(0.0, 1.0);
        neg = neg.clamp(0.0, 1.0);

        // Aggregation: base assertability is intrinsically positive evidence
        // and blends with support edges; contradictions land at full weight
        let blend = pov.edge_blend.unwrap_or(config.edge_blend);
        let positive = blend * pos + (1.0 - blend) * base;
        let negative = neg;
        let score = (positive - negative).clamp(-1.0, 1.0);
        if !score.is_finite() {
            return Err(format!("non-finite support score for claim {}", claim_id));
        }

        let evenly_matched = positive >= config.tau_in
            && negative >= config.tau_in
            && (positive - negative).abs() <= config.epsilon;

        // Mutual-conflict bookkeeping: when an evenly matched contradiction
        // is detected at this target, the supporters of the firing
        // contradict edges are held CONFLICTED until the conflict dissolves
        let induced = if evenly_matched {
            firing_contradict
        } else {
            BTreeSet::new()
        };
        let previous = state
            .conflict_edges
            .get(&claim_id)
            .cloned()
            .unwrap_or_default();
        if induced != previous {
            for edge_id in previous.difference(&induced) {
                if let Some(edge) = graph.edges.get(edge_id) {
                    for supporter in &edge.supporters {
                        if let Some(marks) = state.conflict_marks.get_mut(supporter) {
                            marks.remove(edge_id);
                            if marks.is_empty() {
                                state.conflict_marks.remove(supporter);
                            }
                        }
                        enqueue(&mut worklist, &mut queued, *supporter);
                    }
                }
            }
            for edge_id in induced.difference(&previous) {
                if let Some(edge) = graph.edges.get(edge_id) {
                    for supporter in &edge.supporters {
                        state
                            .conflict_marks
                            .entry(*supporter)
                            .or_default()
                            .insert(*edge_id);
                        enqueue(&mut worklist, &mut queued, *supporter);
                    }
                }
            }
            if induced.is_empty() {
                state.conflict_edges.remove(&claim_id);
            } else {
                state.conflict_edges.insert(claim_id, induced);
            }
        }

        // Labeling
        let marked = state
            .conflict_marks
            .get(&claim_id)
            .is_some_and(|m| !m.is_empty());
        let label = if pinned.contains(&claim_id) || evenly_matched || marked {
            BeliefLabel::Conflicted
        } else if score >= config.tau_in {
            BeliefLabel::In
        } else if score <= -config.tau_in {
            BeliefLabel::Out
        } else {
            BeliefLabel::Undecided
        };

        // Memoized short-circuit: an unchanged result enqueues nothing
        let old = state.current(claim_id);
        let changed = old.label != label
            || (old.score - score).abs() > f64::EPSILON
            || old.witness != witness;
        if changed {
            state.labels.insert(
                claim_id,
                LabelRecord {
                    label,
                    score,
                    witness,
                    evaluated_at: now,
                },
            );
            for dependent in graph.dependents(claim_id) {
                enqueue(&mut worklist, &mut queued, dependent);
            }
        }
    }

    Ok(PassOutcome { touched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rashomon_domain::{ProvenanceKind, TrustMap};

    struct Fixture {
        claims: HashMap<ClaimId, Claim>,
        sources: HashMap<SourceId, Source>,
        edges: HashMap<EdgeId, JustificationEdge>,
        edges_into: HashMap<ClaimId, Vec<EdgeId>>,
        edges_from: HashMap<ClaimId, Vec<EdgeId>>,
        superseded: HashMap<ClaimId, ClaimId>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                claims: HashMap::new(),
                sources: HashMap::new(),
                edges: HashMap::new(),
                edges_into: HashMap::new(),
                edges_from: HashMap::new(),
                superseded: HashMap::new(),
            }
        }

        fn source(&mut self, id: &str) -> SourceId {
            let source = Source::new(SourceId::new(id), id, 0);
            let id = source.id.clone();
            self.sources.insert(id.clone(), source);
            id
        }

        fn claim(&mut self, content: &str, source: &SourceId) -> ClaimId {
            let claim = Claim::new(content, ProvenanceKind::Testimony, source.clone(), 0);
            let id = claim.id;
            self.claims.insert(id, claim);
            id
        }

        fn edge(
            &mut self,
            supporters: &[ClaimId],
            target: ClaimId,
            polarity: Polarity,
            strength: f64,
        ) -> EdgeId {
            let edge = JustificationEdge::new(
                supporters.iter().copied().collect(),
                target,
                polarity,
                strength,
                0,
            );
            let id = edge.id;
            self.edges_into.entry(target).or_default().push(id);
            for supporter in supporters {
                self.edges_from.entry(*supporter).or_default().push(id);
            }
            self.edges.insert(id, edge);
            id
        }

        fn view(&self) -> GraphView<'_> {
            GraphView {
                claims: &self.claims,
                sources: &self.sources,
                edges: &self.edges,
                edges_into: &self.edges_into,
                edges_from: &self.edges_from,
                superseded: &self.superseded,
            }
        }
    }

    fn pov_trusting(entries: &[(&SourceId, f64)]) -> Pov {
        let mut trust = TrustMap::default();
        for (source, weight) in entries {
            trust.weights.insert((*source).clone(), *weight);
        }
        Pov::new("test", trust, 0)
    }

    #[test]
    fn test_base_only_labeling() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let c = fx.claim("event X occurred", &s);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s, 0.9)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [c], 1).unwrap();

        let record = state.current(c);
        assert_eq!(record.label, BeliefLabel::In);
        // 0.5 * (0.9 trust * 0.9 testimony prior)
        assert!((record.score - 0.405).abs() < 1e-9);
        assert!(record.witness.is_empty());
    }

    #[test]
    fn test_untrusted_source_stays_undecided() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let c = fx.claim("event X occurred", &s);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s, 0.1)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [c], 1).unwrap();

        assert_eq!(state.current(c).label, BeliefLabel::Undecided);
    }

    #[test]
    fn test_ungrounded_cycle_converges_undecided() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let a = fx.claim("a", &s);
        let b = fx.claim("b", &s);
        fx.edge(&[a], b, Polarity::Support, 0.9);
        fx.edge(&[b], a, Polarity::Support, 0.9);

        let config = EngineConfig::default();
        // No trust anywhere: neither claim has unconditional grounding
        let pov = pov_trusting(&[]);
        let mut state = PovState::default();
        let outcome = run_pass(&config, &fx.view(), &pov, &mut state, [a, b], 1).unwrap();

        assert_eq!(state.current(a).label, BeliefLabel::Undecided);
        assert_eq!(state.current(b).label, BeliefLabel::Undecided);
        // Terminated after evaluating each claim, not by the visit bound
        assert_eq!(outcome.touched.len(), 2);
    }

    #[test]
    fn test_support_chain_propagates() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let ungrounded = fx.source("outlet:unknown");
        let a = fx.claim("a", &s);
        let b = fx.claim("b", &ungrounded);
        let e = fx.edge(&[a], b, Polarity::Support, 0.9);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s, 0.9)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [a, b], 1).unwrap();

        let record = state.current(b);
        assert_eq!(record.label, BeliefLabel::In);
        assert_eq!(record.witness, vec![e]);
        // 0.5 * (0.9 strength * 0.405 supporter score)
        assert!((record.score - 0.182_25).abs() < 1e-9);
    }

    #[test]
    fn test_strong_contradiction_flips_out() {
        let mut fx = Fixture::new();
        let trusted = fx.source("outlet:strong");
        let weak = fx.source("outlet:weak");
        let attacker = fx.claim("counter-evidence", &trusted);
        let target = fx.claim("claim under attack", &weak);
        fx.edge(&[attacker], target, Polarity::Contradict, 1.0);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&trusted, 1.0), (&weak, 0.4)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [attacker, target], 1).unwrap();

        // attacker: 0.5 * 1.0 * 0.9 = 0.45 IN; target: positive 0.18,
        // negative 0.45 -> score -0.27 OUT
        assert_eq!(state.current(attacker).label, BeliefLabel::In);
        assert_eq!(state.current(target).label, BeliefLabel::Out);
    }

    #[test]
    fn test_evenly_matched_contradiction_conflicts_both_sides() {
        let mut fx = Fixture::new();
        let s2 = fx.source("outlet:s2");
        let s3 = fx.source("outlet:s3");
        let c2 = fx.claim("event happened", &s2);
        let c3 = fx.claim("event did not happen", &s3);
        fx.edge(&[c3], c2, Polarity::Contradict, 0.8);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s2, 0.7), (&s3, 0.7)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [c2, c3], 1).unwrap();

        // c3: 0.315 IN initially; c2: positive 0.315, negative 0.252 ->
        // evenly matched -> CONFLICTED, and c3 is pulled into the conflict
        assert_eq!(state.current(c2).label, BeliefLabel::Conflicted);
        assert_eq!(state.current(c3).label, BeliefLabel::Conflicted);
    }

    #[test]
    fn test_conflict_dissolves_when_trust_diverges() {
        let mut fx = Fixture::new();
        let s2 = fx.source("outlet:s2");
        let s3 = fx.source("outlet:s3");
        let c2 = fx.claim("event happened", &s2);
        let c3 = fx.claim("event did not happen", &s3);
        fx.edge(&[c3], c2, Polarity::Contradict, 0.8);

        let config = EngineConfig::default();
        let mut pov = pov_trusting(&[(&s2, 0.7), (&s3, 0.7)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [c2, c3], 1).unwrap();
        assert_eq!(state.current(c2).label, BeliefLabel::Conflicted);

        // Losing trust in s3 dissolves the conflict: c2 recovers, c3 drops
        pov.trust.weights.insert(s3.clone(), 0.1);
        run_pass(&config, &fx.view(), &pov, &mut state, [c3], 2).unwrap();
        assert_eq!(state.current(c2).label, BeliefLabel::In);
        assert_eq!(state.current(c3).label, BeliefLabel::Undecided);
        assert!(state.conflict_marks.is_empty());
        assert!(state.conflict_edges.is_empty());
    }

    #[test]
    fn test_oscillating_loop_terminates_pinned() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let unknown = fx.source("outlet:unknown");
        let a = fx.claim("a", &s);
        let b = fx.claim("b", &unknown);
        // a supports b, b contradicts a: a's belief undermines itself
        fx.edge(&[a], b, Polarity::Support, 0.9);
        fx.edge(&[b], a, Polarity::Contradict, 1.0);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s, 0.9)]);
        let mut state = PovState::default();
        // Must terminate; the unstable claim is pinned CONFLICTED
        run_pass(&config, &fx.view(), &pov, &mut state, [a, b], 1).unwrap();
        assert_eq!(state.current(a).label, BeliefLabel::Conflicted);
    }

    #[test]
    fn test_conjunctive_supporters_require_all_in() {
        let mut fx = Fixture::new();
        let trusted = fx.source("outlet:a");
        let unknown = fx.source("outlet:unknown");
        let a = fx.claim("a", &trusted);
        let b = fx.claim("b", &unknown);
        let t = fx.claim("t", &unknown);
        fx.edge(&[a, b], t, Polarity::Support, 1.0);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&trusted, 0.9)]);
        let mut state = PovState::default();
        run_pass(&config, &fx.view(), &pov, &mut state, [a, b, t], 1).unwrap();

        // b is UNDECIDED, so the conjunctive edge never fires
        assert_eq!(state.current(t).label, BeliefLabel::Undecided);
    }

    #[test]
    fn test_non_finite_strength_aborts_pass() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let a = fx.claim("a", &s);
        let t = fx.claim("t", &s);
        // Bypasses engine validation deliberately
        fx.edge(&[a], t, Polarity::Support, f64::NAN);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s, 0.9)]);
        let mut working = PovState::default();
        let result = run_pass(&config, &fx.view(), &pov, &mut working, [a, t], 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_superseded_claims_are_frozen() {
        let mut fx = Fixture::new();
        let s = fx.source("outlet:a");
        let old = fx.claim("v1", &s);
        let new = fx.claim("v2", &s);
        fx.superseded.insert(old, new);

        let config = EngineConfig::default();
        let pov = pov_trusting(&[(&s, 0.9)]);
        let mut state = PovState::default();
        state.labels.insert(
            old,
            LabelRecord {
                label: BeliefLabel::In,
                score: 0.405,
                witness: Vec::new(),
                evaluated_at: 0,
            },
        );
        let outcome = run_pass(&config, &fx.view(), &pov, &mut state, [old, new], 1).unwrap();

        // The frozen claim is skipped entirely; the new claim is evaluated
        assert!(!outcome.touched.contains(&old));
        assert_eq!(state.current(old).label, BeliefLabel::In);
        assert_eq!(state.current(new).label, BeliefLabel::In);
    }
}
