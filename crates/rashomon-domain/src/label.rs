//! Belief labels - per-POV derived claim status

use crate::edge::EdgeId;

/// Per-POV belief status of a claim
///
/// Derived data: recomputed by the belief revision engine, never set
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeliefLabel {
    /// Believed under the POV
    In,

    /// Disbelieved under the POV
    Out,

    /// Supporting and contradicting evidence of comparable magnitude
    Conflicted,

    /// No grounding either way
    Undecided,
}

impl BeliefLabel {
    /// String form for storage and log entries
    pub fn as_str(&self) -> &'static str {
        match self {
            BeliefLabel::In => "in",
            BeliefLabel::Out => "out",
            BeliefLabel::Conflicted => "conflicted",
            BeliefLabel::Undecided => "undecided",
        }
    }

    /// Parse from the storage string form
    pub fn from_str_tag(s: &str) -> Result<Self, String> {
        match s {
            "in" => Ok(BeliefLabel::In),
            "out" => Ok(BeliefLabel::Out),
            "conflicted" => Ok(BeliefLabel::Conflicted),
            "undecided" => Ok(BeliefLabel::Undecided),
            _ => Err(format!("Unknown belief label: {}", s)),
        }
    }
}

/// A claim's current label under one POV, with its justification witness
///
/// The witness is the set of edges that fired in the evaluation producing
/// this label, so a disagreement is explainable, not just flagged.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    /// Current label
    pub label: BeliefLabel,

    /// Support score in [-1.0, 1.0]
    pub score: f64,

    /// Edges that fired in the producing evaluation
    pub witness: Vec<EdgeId>,

    /// When this label was last evaluated (seconds since Unix epoch)
    pub evaluated_at: u64,
}

impl LabelRecord {
    /// The initial state of every claim under every POV
    pub fn undecided(evaluated_at: u64) -> Self {
        Self {
            label: BeliefLabel::Undecided,
            score: 0.0,
            witness: Vec::new(),
            evaluated_at,
        }
    }
}
