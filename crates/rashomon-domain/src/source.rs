//! Sources - identified origins of testimony

use std::fmt;

/// Identifier for a source of testimony
///
/// Source identities are supplied by the ingestion collaborator and are
/// opaque to the engine. By convention they carry a scheme prefix, e.g.
/// `"outlet:reuters"`, `"author:jdoe"`, `"dataset:census-2020"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Create a source id from its string form
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An identified origin of testimony (author, outlet, dataset)
///
/// Sources are immutable once created. Claims reference sources by id and
/// never own them; trust maps assign weights to sources and source classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// Unique identifier
    pub id: SourceId,

    /// Human-readable name
    pub name: String,

    /// Optional class for class-level trust (e.g. "newswire", "blog")
    pub class: Option<String>,

    /// When this source was registered (seconds since Unix epoch)
    pub created_at: u64,
}

impl Source {
    /// Create a new source
    pub fn new(id: SourceId, name: impl Into<String>, created_at: u64) -> Self {
        Self {
            id,
            name: name.into(),
            class: None,
            created_at,
        }
    }

    /// Set the source class
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_display() {
        let id = SourceId::new("outlet:reuters");
        assert_eq!(id.to_string(), "outlet:reuters");
        assert_eq!(id.as_str(), "outlet:reuters");
    }

    #[test]
    fn test_source_with_class() {
        let source = Source::new(SourceId::new("outlet:reuters"), "Reuters", 1_700_000_000)
            .with_class("newswire");
        assert_eq!(source.class.as_deref(), Some("newswire"));
    }
}
