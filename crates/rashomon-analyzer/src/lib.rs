//! Rashomon Overlap & Dispute Analyzer
//!
//! Derives cross-POV agreement and disagreement from the per-POV belief
//! labels the engine maintains:
//!
//! - [`robust_overlap`]: claims labeled identically IN (or identically OUT)
//!   under every POV in a set — what holds across many points of view
//! - [`live_disputes`]: claims whose labels differ across the set, each with
//!   the per-POV label records and justification witnesses that explain the
//!   disagreement
//!
//! Both operations are pure reads over the current label snapshot: they
//! never mutate engine state and never trigger propagation.

#![warn(missing_docs)]

pub mod analyzer;
pub mod error;

pub use analyzer::{live_disputes, robust_overlap, DisputeEntry};
pub use error::AnalyzerError;
