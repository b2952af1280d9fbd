//! Background worker serializing engine mutations
//!
//! All mutations targeting the engine flow through one queue and are applied
//! in arrival order: label transitions are history-dependent, so reordering
//! would corrupt the revision log's causality. Queries against the engine
//! between mutations observe a consistent committed snapshot.

use crate::engine::Engine;
use crate::error::EngineError;
use rashomon_domain::traits::OracleStore;
use rashomon_domain::{ClaimId, EdgeId, Polarity, PovId, ProvenanceKind, SourceId, TrustMap};
use std::collections::BTreeSet;
use tokio::sync::mpsc;

/// A queued engine mutation
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Register a source of testimony
    RegisterSource {
        /// Source identity
        id: SourceId,
        /// Human-readable name
        name: String,
        /// Optional source class
        class: Option<String>,
    },

    /// Submit a claim
    SubmitClaim {
        /// Normalized proposition content
        content: String,
        /// Provenance kind
        kind: ProvenanceKind,
        /// Asserting source
        source: SourceId,
    },

    /// Supersede a claim with revised content
    Supersede {
        /// The claim being superseded
        old: ClaimId,
        /// Revised content
        content: String,
        /// Provenance kind of the revision
        kind: ProvenanceKind,
        /// Asserting source of the revision
        source: SourceId,
    },

    /// Add a justification edge
    AddEdge {
        /// Conjunctive supporter set
        supporters: BTreeSet<ClaimId>,
        /// Target claim
        target: ClaimId,
        /// Edge polarity
        polarity: Polarity,
        /// Strength in [0.0, 1.0]
        strength: f64,
    },

    /// Deactivate a justification edge
    RemoveEdge(EdgeId),

    /// Create a POV with an initial trust map
    CreatePov {
        /// Human-readable name
        name: String,
        /// Initial trust assignments
        trust: TrustMap,
    },

    /// Update one source's trust weight under one POV
    SetSourceTrust {
        /// The POV to update
        pov: PovId,
        /// The source whose weight changes
        source: SourceId,
        /// New weight in [0.0, 1.0]
        weight: f64,
    },

    /// Update one class's trust weight under one POV
    SetClassTrust {
        /// The POV to update
        pov: PovId,
        /// The class whose weight changes
        class: String,
        /// New weight in [0.0, 1.0]
        weight: f64,
    },

    /// Update the default trust weight under one POV
    SetDefaultTrust {
        /// The POV to update
        pov: PovId,
        /// New weight in [0.0, 1.0]
        weight: f64,
    },
}

/// Background worker that owns the engine and drains the mutation queue
///
/// # Examples
///
/// ```no_run
/// use rashomon_engine::{Engine, EngineConfig, RevisionWorker};
/// use rashomon_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::new("rashomon.db")?;
///     let engine = Engine::load(store, EngineConfig::default())?;
///     let (worker, _handle) = RevisionWorker::new(engine, 256);
///
///     // Run until the queue closes or Ctrl+C
///     let _engine = worker.run().await;
///     Ok(())
/// }
/// ```
pub struct RevisionWorker<S: OracleStore> {
    engine: Engine<S>,
    rx: mpsc::Receiver<Mutation>,
}

impl<S> RevisionWorker<S>
where
    S: OracleStore,
    S::Error: std::fmt::Display,
{
    /// Create a worker and the sender half of its mutation queue
    pub fn new(engine: Engine<S>, buffer: usize) -> (Self, mpsc::Sender<Mutation>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { engine, rx }, tx)
    }

    /// Apply one mutation to the engine
    ///
    /// Rejected mutations and per-POV invariant violations are logged and do
    /// not stop the worker; the caller must resubmit corrected input.
    fn apply(&mut self, mutation: Mutation) -> Result<(), EngineError> {
        match mutation {
            Mutation::RegisterSource { id, name, class } => {
                self.engine.register_source(id, &name, class).map(|_| ())
            }
            Mutation::SubmitClaim {
                content,
                kind,
                source,
            } => self.engine.submit_claim(&content, kind, &source).map(|_| ()),
            Mutation::Supersede {
                old,
                content,
                kind,
                source,
            } => self
                .engine
                .supersede(old, &content, kind, &source)
                .map(|_| ()),
            Mutation::AddEdge {
                supporters,
                target,
                polarity,
                strength,
            } => self
                .engine
                .add_edge(supporters, target, polarity, strength)
                .map(|_| ()),
            Mutation::RemoveEdge(id) => self.engine.remove_edge(id),
            Mutation::CreatePov { name, trust } => {
                self.engine.create_pov(&name, trust).map(|_| ())
            }
            Mutation::SetSourceTrust {
                pov,
                source,
                weight,
            } => self.engine.set_source_trust(pov, source, weight),
            Mutation::SetClassTrust { pov, class, weight } => {
                self.engine.set_class_trust(pov, &class, weight)
            }
            Mutation::SetDefaultTrust { pov, weight } => {
                self.engine.set_default_trust(pov, weight)
            }
        }
    }

    /// Run until the queue closes or a shutdown signal arrives
    ///
    /// Returns the engine so callers can keep querying after shutdown.
    pub async fn run(mut self) -> Engine<S> {
        tracing::info!("Revision worker started");
        loop {
            tokio::select! {
                mutation = self.rx.recv() => {
                    match mutation {
                        Some(mutation) => {
                            if let Err(e) = self.apply(mutation) {
                                tracing::error!("Mutation rejected: {}", e);
                            }
                        }
                        None => {
                            tracing::info!("Mutation queue closed, stopping worker");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping worker");
                    break;
                }
            }
        }
        self.engine
    }

    /// Drain every mutation currently queued, in arrival order
    ///
    /// Returns the number of mutations applied (useful for testing).
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(mutation) = self.rx.try_recv() {
            if let Err(e) = self.apply(mutation) {
                tracing::error!("Mutation rejected: {}", e);
            }
            applied += 1;
        }
        applied
    }

    /// Get a reference to the engine
    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    /// Consume the worker, returning the engine
    pub fn into_engine(self) -> Engine<S> {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use rashomon_domain::BeliefLabel;
    use rashomon_store::SqliteStore;

    fn worker() -> (RevisionWorker<SqliteStore>, mpsc::Sender<Mutation>) {
        let store = SqliteStore::new(":memory:").unwrap();
        let engine = Engine::new(store, EngineConfig::default()).unwrap();
        RevisionWorker::new(engine, 64)
    }

    #[tokio::test]
    async fn test_mutations_applied_in_arrival_order() {
        let (mut worker, tx) = worker();
        let source = SourceId::new("outlet:a");

        tx.send(Mutation::RegisterSource {
            id: source.clone(),
            name: "Outlet A".into(),
            class: None,
        })
        .await
        .unwrap();
        tx.send(Mutation::CreatePov {
            name: "pov-a".into(),
            trust: TrustMap::default().with_source(source.clone(), 0.9),
        })
        .await
        .unwrap();
        tx.send(Mutation::SubmitClaim {
            content: "event X occurred".into(),
            kind: ProvenanceKind::Testimony,
            source: source.clone(),
        })
        .await
        .unwrap();

        assert_eq!(worker.drain(), 3);

        let engine = worker.engine();
        let pov = engine.pov_ids()[0];
        let claim = engine.claim_ids()[0];
        assert_eq!(engine.label(pov, claim).unwrap().label, BeliefLabel::In);
    }

    #[tokio::test]
    async fn test_rejected_mutation_does_not_stop_worker() {
        let (mut worker, tx) = worker();
        let source = SourceId::new("outlet:a");

        // Claim against an unregistered source is rejected...
        tx.send(Mutation::SubmitClaim {
            content: "early".into(),
            kind: ProvenanceKind::Testimony,
            source: source.clone(),
        })
        .await
        .unwrap();
        // ...but later mutations still apply
        tx.send(Mutation::RegisterSource {
            id: source.clone(),
            name: "Outlet A".into(),
            class: None,
        })
        .await
        .unwrap();
        tx.send(Mutation::SubmitClaim {
            content: "late".into(),
            kind: ProvenanceKind::Testimony,
            source,
        })
        .await
        .unwrap();

        assert_eq!(worker.drain(), 3);
        assert_eq!(worker.engine().claim_ids().len(), 1);
    }

    #[tokio::test]
    async fn test_run_returns_engine_when_queue_closes() {
        let (worker, tx) = worker();
        let source = SourceId::new("outlet:a");
        tx.send(Mutation::RegisterSource {
            id: source,
            name: "Outlet A".into(),
            class: None,
        })
        .await
        .unwrap();
        drop(tx);

        let engine = worker.run().await;
        assert!(engine.claims_for_source(&SourceId::new("outlet:a")).is_empty());
    }
}
