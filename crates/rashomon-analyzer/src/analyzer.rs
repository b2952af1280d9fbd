//! Overlap and dispute analysis over per-POV label snapshots

use crate::AnalyzerError;
use rashomon_domain::traits::OracleStore;
use rashomon_domain::{BeliefLabel, ClaimId, LabelRecord, PovId};
use rashomon_engine::Engine;
use std::collections::{BTreeMap, BTreeSet};

/// One disputed claim with the per-POV labels explaining the disagreement
///
/// Each record carries its justification witness, so the disagreement is
/// explainable, not just flagged.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeEntry {
    /// The disputed claim
    pub claim: ClaimId,

    /// Label record per POV in the analyzed set
    pub labels: BTreeMap<PovId, LabelRecord>,
}

fn check_povs<S>(engine: &Engine<S>, povs: &[PovId]) -> Result<(), AnalyzerError>
where
    S: OracleStore,
    S::Error: std::fmt::Display,
{
    if povs.len() < 2 {
        return Err(AnalyzerError::NotEnoughPovs(povs.len()));
    }
    for pov in povs {
        if !engine.contains_pov(*pov) {
            return Err(AnalyzerError::UnknownPov(*pov));
        }
    }
    Ok(())
}

fn labels_for<S>(
    engine: &Engine<S>,
    claim: ClaimId,
    povs: &[PovId],
) -> Result<BTreeMap<PovId, LabelRecord>, AnalyzerError>
where
    S: OracleStore,
    S::Error: std::fmt::Display,
{
    let mut labels = BTreeMap::new();
    for pov in povs {
        let record = engine
            .label(*pov, claim)
            .map_err(|e| AnalyzerError::Engine(e.to_string()))?;
        labels.insert(*pov, record);
    }
    Ok(labels)
}

/// Claims believed (or disbelieved) identically under every given POV
///
/// "What holds across many points of view": a claim qualifies when every POV
/// labels it IN, or every POV labels it OUT. A pure read over the committed
/// label snapshots; never triggers propagation. Superseded claims are
/// historical and excluded.
pub fn robust_overlap<S>(
    engine: &Engine<S>,
    povs: &[PovId],
) -> Result<BTreeSet<ClaimId>, AnalyzerError>
where
    S: OracleStore,
    S::Error: std::fmt::Display,
{
    check_povs(engine, povs)?;
    let mut overlap = BTreeSet::new();
    for claim in engine.claim_ids() {
        if engine.is_superseded(claim) {
            continue;
        }
        let labels = labels_for(engine, claim, povs)?;
        let all_in = labels.values().all(|r| r.label == BeliefLabel::In);
        let all_out = labels.values().all(|r| r.label == BeliefLabel::Out);
        if all_in || all_out {
            overlap.insert(claim);
        }
    }
    Ok(overlap)
}

/// Claims whose labels disagree across the given POVs
///
/// A claim is disputed when the POVs assign it differing labels and at least
/// one POV has taken a position (a mutual UNDECIDED is not a dispute). Each
/// entry carries every POV's label record (label, score, justification
/// witness). A pure read; never triggers propagation.
pub fn live_disputes<S>(
    engine: &Engine<S>,
    povs: &[PovId],
) -> Result<Vec<DisputeEntry>, AnalyzerError>
where
    S: OracleStore,
    S::Error: std::fmt::Display,
{
    check_povs(engine, povs)?;
    let mut disputes = Vec::new();
    let claims: BTreeSet<ClaimId> = engine
        .claim_ids()
        .into_iter()
        .filter(|c| !engine.is_superseded(*c))
        .collect();
    for claim in claims {
        let labels = labels_for(engine, claim, povs)?;
        let first = labels.values().next().map(|r| r.label);
        let differing = labels.values().any(|r| Some(r.label) != first);
        let any_decided = labels.values().any(|r| r.label != BeliefLabel::Undecided);
        if differing && any_decided {
            disputes.push(DisputeEntry { claim, labels });
        }
    }
    Ok(disputes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rashomon_domain::{Polarity, ProvenanceKind, SourceId, TrustMap};
    use rashomon_engine::EngineConfig;
    use rashomon_store::SqliteStore;

    fn engine() -> Engine<SqliteStore> {
        Engine::new(
            SqliteStore::new(":memory:").unwrap(),
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_trust_split_shows_up_as_dispute() {
        let mut engine = engine();
        let s1 = SourceId::new("outlet:s1");
        engine.register_source(s1.clone(), "S1", None).unwrap();
        let pov_a = engine
            .create_pov("pov-a", TrustMap::default().with_source(s1.clone(), 0.9))
            .unwrap();
        let pov_b = engine
            .create_pov("pov-b", TrustMap::default().with_source(s1.clone(), 0.1))
            .unwrap();
        let c1 = engine
            .submit_claim("event X occurred", ProvenanceKind::Testimony, &s1)
            .unwrap();

        let disputes = live_disputes(&engine, &[pov_a, pov_b]).unwrap();
        assert_eq!(disputes.len(), 1);
        assert_eq!(disputes[0].claim, c1);
        assert_eq!(disputes[0].labels[&pov_a].label, BeliefLabel::In);
        assert_eq!(disputes[0].labels[&pov_b].label, BeliefLabel::Undecided);

        // Disputed claims never qualify as robust overlap
        assert!(robust_overlap(&engine, &[pov_a, pov_b]).unwrap().is_empty());
    }

    #[test]
    fn test_shared_trust_shows_up_as_overlap() {
        let mut engine = engine();
        let s1 = SourceId::new("outlet:s1");
        engine.register_source(s1.clone(), "S1", None).unwrap();
        let pov_a = engine
            .create_pov("pov-a", TrustMap::default().with_source(s1.clone(), 0.9))
            .unwrap();
        let pov_b = engine
            .create_pov("pov-b", TrustMap::default().with_source(s1.clone(), 0.8))
            .unwrap();
        let c1 = engine
            .submit_claim("event X occurred", ProvenanceKind::Testimony, &s1)
            .unwrap();

        let overlap = robust_overlap(&engine, &[pov_a, pov_b]).unwrap();
        assert!(overlap.contains(&c1));
        assert!(live_disputes(&engine, &[pov_a, pov_b]).unwrap().is_empty());
    }

    #[test]
    fn test_symmetric_out_counts_as_overlap() {
        let mut engine = engine();
        let strong = SourceId::new("outlet:strong");
        let weak = SourceId::new("outlet:weak");
        engine.register_source(strong.clone(), "Strong", None).unwrap();
        engine.register_source(weak.clone(), "Weak", None).unwrap();
        let trust = TrustMap::default()
            .with_source(strong.clone(), 1.0)
            .with_source(weak.clone(), 0.4);
        let pov_a = engine.create_pov("pov-a", trust.clone()).unwrap();
        let pov_b = engine.create_pov("pov-b", trust).unwrap();

        let attacker = engine
            .submit_claim("counter-evidence", ProvenanceKind::Perception, &strong)
            .unwrap();
        let target = engine
            .submit_claim("refuted claim", ProvenanceKind::Testimony, &weak)
            .unwrap();
        engine
            .add_edge(
                [attacker].into_iter().collect(),
                target,
                Polarity::Contradict,
                1.0,
            )
            .unwrap();

        // Both POVs label the target OUT: symmetric disbelief is agreement
        let overlap = robust_overlap(&engine, &[pov_a, pov_b]).unwrap();
        assert!(overlap.contains(&target));
        assert!(overlap.contains(&attacker));
    }

    #[test]
    fn test_conflicted_against_in_is_disputed() {
        let mut engine = engine();
        let s2 = SourceId::new("outlet:s2");
        let s3 = SourceId::new("outlet:s3");
        engine.register_source(s2.clone(), "S2", None).unwrap();
        engine.register_source(s3.clone(), "S3", None).unwrap();
        // pov_c trusts both sides equally; pov_d does not trust the attacker
        let pov_c = engine
            .create_pov(
                "pov-c",
                TrustMap::default()
                    .with_source(s2.clone(), 0.7)
                    .with_source(s3.clone(), 0.7),
            )
            .unwrap();
        let pov_d = engine
            .create_pov("pov-d", TrustMap::default().with_source(s2.clone(), 0.7))
            .unwrap();

        let c2 = engine
            .submit_claim("the dam failed", ProvenanceKind::Testimony, &s2)
            .unwrap();
        let c3 = engine
            .submit_claim("the dam held", ProvenanceKind::Testimony, &s3)
            .unwrap();
        engine
            .add_edge([c3].into_iter().collect(), c2, Polarity::Contradict, 0.8)
            .unwrap();

        let disputes = live_disputes(&engine, &[pov_c, pov_d]).unwrap();
        let entry = disputes.iter().find(|d| d.claim == c2).unwrap();
        assert_eq!(entry.labels[&pov_c].label, BeliefLabel::Conflicted);
        assert_eq!(entry.labels[&pov_d].label, BeliefLabel::In);
        // The conflicted side carries its witness for explainability
        assert!(!entry.labels[&pov_c].witness.is_empty());
    }

    #[test]
    fn test_analysis_requires_known_povs() {
        let mut engine = engine();
        let s = SourceId::new("outlet:s");
        engine.register_source(s.clone(), "S", None).unwrap();
        let pov = engine.create_pov("pov", TrustMap::default()).unwrap();

        assert!(matches!(
            robust_overlap(&engine, &[pov]),
            Err(AnalyzerError::NotEnoughPovs(1))
        ));
        assert!(matches!(
            live_disputes(&engine, &[pov, rashomon_domain::PovId::new()]),
            Err(AnalyzerError::UnknownPov(_))
        ));
    }

    #[test]
    fn test_analysis_is_a_pure_read() {
        let mut engine = engine();
        let s1 = SourceId::new("outlet:s1");
        engine.register_source(s1.clone(), "S1", None).unwrap();
        let pov_a = engine
            .create_pov("pov-a", TrustMap::default().with_source(s1.clone(), 0.9))
            .unwrap();
        let pov_b = engine
            .create_pov("pov-b", TrustMap::default().with_source(s1.clone(), 0.1))
            .unwrap();
        let c1 = engine
            .submit_claim("event X occurred", ProvenanceKind::Testimony, &s1)
            .unwrap();
        let history_len = engine.history(c1, None).unwrap().len();

        live_disputes(&engine, &[pov_a, pov_b]).unwrap();
        robust_overlap(&engine, &[pov_a, pov_b]).unwrap();

        // No new history, no label changes
        assert_eq!(engine.history(c1, None).unwrap().len(), history_len);
        assert_eq!(engine.label(pov_a, c1).unwrap().label, BeliefLabel::In);
    }
}
