//! Rashomon Belief Revision Engine
//!
//! Per-POV incremental propagation of belief labels through the
//! claim/justification graph: contradiction detection, dependency-directed
//! retraction and an append-only revision log for contestability.
//!
//! # Overview
//!
//! The engine is responsible for:
//! - **Claim ingestion**: content-addressed, idempotent submission and
//!   append-only supersession
//! - **Justification graph**: weighted support/contradict edges with
//!   conjunctive supporter sets, validated synchronously and soft-deleted
//! - **Belief revision**: per-POV worklist fixed-point propagation with
//!   memoized short-circuiting; cycles and oscillations always terminate
//! - **Auditability**: every committed label transition is appended to the
//!   revision log with its causal trigger and justification witness
//!
//! Each POV's label state is independently owned; a failed pass (invariant
//! violation) leaves that POV's last-known-good labels authoritative and
//! never affects other POVs.
//!
//! # Usage
//!
//! ## Direct engine calls
//!
//! ```no_run
//! use rashomon_domain::{Polarity, ProvenanceKind, SourceId, TrustMap};
//! use rashomon_engine::{Engine, EngineConfig};
//! use rashomon_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new("rashomon.db")?;
//! let mut engine = Engine::load(store, EngineConfig::default())?;
//!
//! let s1 = SourceId::new("outlet:reuters");
//! engine.register_source(s1.clone(), "Reuters", Some("newswire".into()))?;
//! let pov = engine.create_pov("skeptic", TrustMap::new(0.1))?;
//! let claim = engine.submit_claim("event X occurred", ProvenanceKind::Testimony, &s1)?;
//!
//! let record = engine.label(pov, claim)?;
//! println!("{:?} (score {:+.3})", record.label, record.score);
//! # Ok(())
//! # }
//! ```
//!
//! ## Background worker
//!
//! ```no_run
//! use rashomon_engine::{Engine, EngineConfig, RevisionWorker};
//! use rashomon_store::SqliteStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::new("rashomon.db")?;
//!     let engine = Engine::load(store, EngineConfig::default())?;
//!     let (worker, handle) = RevisionWorker::new(engine, 256);
//!     // hand `handle` to the ingestion/governance collaborators
//!     let _engine = worker.run().await;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration Presets
//!
//! ```
//! use rashomon_engine::EngineConfig;
//!
//! // Default: balanced thresholds
//! let config = EngineConfig::default();
//!
//! // Strict: higher bar for IN/OUT labels
//! let config = EngineConfig::strict();
//!
//! // Lenient: lower bar, wider conflict window
//! let config = EngineConfig::lenient();
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
mod revision;
pub mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use worker::{Mutation, RevisionWorker};
