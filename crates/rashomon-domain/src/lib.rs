//! Rashomon Domain Layer
//!
//! This crate contains the core domain model for Rashomon, a plural truth
//! maintenance engine. It keeps external dependencies to fundamental
//! primitives only (`sha2` for content addressing, `uuid` for time-ordered
//! identifiers) and defines the value objects and trait interfaces that all
//! other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **Claim**: an immutable, content-addressed proposition with provenance
//! - **Source**: an identified origin of testimony, referenced by claims
//! - **Justification edge**: a weighted, polarity-tagged relation from a
//!   conjunctive set of supporting claims to a target claim
//! - **Trust map**: a per-POV weight assignment over sources and classes
//! - **Belief label**: the per-POV derived status of a claim
//!   (IN/OUT/CONFLICTED/UNDECIDED), never set directly
//! - **Revision log**: the append-only audit trail of label transitions
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture:
//! - Pure domain logic only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod claim;
pub mod edge;
pub mod label;
pub mod pov;
pub mod revision;
pub mod source;
pub mod traits;

// Re-exports for convenience
pub use claim::{Claim, ClaimId, ProvenanceKind, Supersession};
pub use edge::{EdgeId, JustificationEdge, Polarity};
pub use label::{BeliefLabel, LabelRecord};
pub use pov::{Pov, PovId, TrustMap};
pub use revision::{RevisionLogEntry, RevisionTrigger};
pub use source::{Source, SourceId};
