//! Rashomon Trust Map Registry
//!
//! Governance-facing contract for POV lifecycle and trust maps: create POVs,
//! update individual trust entries, read snapshots. Each POV's trust map is
//! independently owned; updates are validated synchronously and persisted
//! through the storage layer, and every applied change is reported as a
//! [`TrustDelta`] so the belief revision engine can invalidate exactly the
//! claims that transitively depend on the changed subject.

#![warn(missing_docs)]

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::{TrustDelta, TrustRegistry};
