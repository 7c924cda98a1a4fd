//! Identifier types for tick sources
//!
//! A tick source is the raw vendor/feed id carried by the `tickSource` tag of
//! a log record (e.g. `bloomberg_fx`). Downstream consumers key chart legends
//! and series off the derived display name, so the transform is part of the
//! output contract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw tick source identifier
///
/// Ordered lexicographically by the raw string so per-source maps iterate
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new SourceId from a raw source string
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Create a SourceId, returning None for an empty or blank id
    pub fn try_new(source: impl Into<String>) -> Option<Self> {
        let s = source.into();
        if s.trim().is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Get the raw source string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing name: underscores become spaces and only the first
    /// character is upper-cased. The rest of the string is left untouched.
    ///
    /// `tick_source_a` → `Tick source a`
    pub fn display_name(&self) -> String {
        display_name(&self.0)
    }
}

/// Display-name transform over a raw source string.
pub fn display_name(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_name_transform() {
        assert_eq!(SourceId::new("tick_source_a").display_name(), "Tick source a");
        assert_eq!(SourceId::new("bloomberg_fx").display_name(), "Bloomberg fx");
    }

    #[test]
    fn test_display_name_keeps_rest_unchanged() {
        // Only the first character changes case
        assert_eq!(display_name("reuters_FX_eu"), "Reuters FX eu");
        assert_eq!(display_name("ICE"), "ICE");
        assert_eq!(display_name("_leading"), " leading");
    }

    #[test]
    fn test_display_name_empty() {
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_source_id_try_new() {
        assert!(SourceId::try_new("bloomberg_fx").is_some());
        assert!(SourceId::try_new("").is_none());
        assert!(SourceId::try_new("   ").is_none());
    }

    #[test]
    fn test_source_id_ordering() {
        let mut ids = vec![SourceId::new("reuters"), SourceId::new("bloomberg")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "bloomberg");
    }

    #[test]
    fn test_source_id_serialization() {
        let id = SourceId::new("bloomberg_fx");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bloomberg_fx\"");

        let deserialized: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    proptest! {
        #[test]
        fn prop_display_name_has_no_underscores(raw in "[a-z_]{0,24}") {
            let name = display_name(&raw);
            prop_assert!(!name.contains('_'));
            prop_assert_eq!(name.chars().count(), raw.chars().count());
        }
    }
}
