//! Structural node identifiers.
//!
//! A [`NodeId`] is derived purely from content: a kind tag followed by the
//! names of every containing entity. Identical text therefore always yields
//! identical ids. Inside a segment `%` and `:` are percent-escaped, so a
//! name can never forge a [`SEGMENT_SEPARATOR`]. Names that differ only in
//! whitespace, or in whitespace against `_`, still share a segment; the
//! interchange validator rejects such siblings.
//!
//! ```text
//! port::dt::Plant::Controller::speed
//! ^tag  ^owner kind  ^path segments
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between the tag and every path segment.
pub const SEGMENT_SEPARATOR: &str = "::";

/// Replacement for whitespace runs inside a single segment.
const WHITESPACE_REPLACEMENT: char = '_';

/// A globally unique, deterministic node identifier.
///
/// # Examples
///
/// ```
/// use dartwin_core::identifier::NodeId;
///
/// let system = NodeId::from_path("system", ["Plant"]);
/// let twin = system.create_nested_with_tag("dt", "Controller");
/// assert_eq!(twin, "dt::Plant::Controller");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Builds an id from a tag and the path of containing names.
    pub fn from_path<I, S>(tag: &str, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut id = String::from(tag);
        for segment in segments {
            id.push_str(SEGMENT_SEPARATOR);
            id.push_str(&normalize_segment(segment.as_ref()));
        }
        Self(id)
    }

    /// Wraps an id string received from outside (e.g. interchange JSON)
    /// without re-deriving it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derives a child id: the path of `self` with `child` appended, under a
    /// new tag.
    pub fn create_nested_with_tag(&self, tag: &str, child: &str) -> Self {
        let path = self.path();
        let mut id = String::from(tag);
        if !path.is_empty() {
            id.push_str(SEGMENT_SEPARATOR);
            id.push_str(path);
        }
        id.push_str(SEGMENT_SEPARATOR);
        id.push_str(&normalize_segment(child));
        Self(id)
    }

    /// Returns the tag part of the id.
    pub fn tag(&self) -> &str {
        self.0
            .split_once(SEGMENT_SEPARATOR)
            .map_or(self.0.as_str(), |(tag, _)| tag)
    }

    /// Returns everything after the tag.
    pub fn path(&self) -> &str {
        self.0
            .split_once(SEGMENT_SEPARATOR)
            .map_or("", |(_, path)| path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Collapses every run of whitespace in `segment` to a single `_`, trims
/// the ends and escapes `%` and `:`.
pub fn normalize_segment(segment: &str) -> String {
    let mut normalized = String::with_capacity(segment.len());
    let mut pending_gap = false;
    for ch in segment.trim().chars() {
        if ch.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if pending_gap {
            normalized.push(WHITESPACE_REPLACEMENT);
            pending_gap = false;
        }
        match ch {
            '%' => normalized.push_str("%25"),
            ':' => normalized.push_str("%3A"),
            _ => normalized.push(ch),
        }
    }
    normalized
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_joins_segments() {
        let id = NodeId::from_path("port", ["dt", "Plant", "Controller", "speed"]);
        assert_eq!(id, "port::dt::Plant::Controller::speed");
        assert_eq!(id.tag(), "port");
        assert_eq!(id.path(), "dt::Plant::Controller::speed");
    }

    #[test]
    fn test_from_path_without_segments() {
        let id = NodeId::from_path::<_, &str>("root", []);
        assert_eq!(id, "root");
        assert_eq!(id.tag(), "root");
        assert_eq!(id.path(), "");
    }

    #[test]
    fn test_segments_are_whitespace_normalized() {
        let id = NodeId::from_path("goal", ["  keep   temperature\tstable "]);
        assert_eq!(id, "goal::keep_temperature_stable");
    }

    #[test]
    fn test_create_nested_with_tag() {
        let system = NodeId::from_path("system", ["Plant"]);
        let twin = system.create_nested_with_tag("dt", "Controller");
        assert_eq!(twin, "dt::Plant::Controller");

        let root = NodeId::from_path::<_, &str>("root", []);
        let goal = root.create_nested_with_tag("goal", "Safety");
        assert_eq!(goal, "goal::Safety");
    }

    #[test]
    fn test_distinct_paths_do_not_collide() {
        let a = NodeId::from_path("dt", ["A", "BC"]);
        let b = NodeId::from_path("dt", ["AB", "C"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_inside_names_does_not_collide() {
        let nested = NodeId::from_path("system", ["A"]).create_nested_with_tag("dt", "B::X");
        let flat = NodeId::from_path("system", ["A::B"]).create_nested_with_tag("dt", "X");
        assert_ne!(nested, flat);
        assert_eq!(nested, "dt::A::B%3A%3AX");
        assert_eq!(flat, "dt::A%3A%3AB::X");
        assert_eq!(nested.tag(), "dt");
    }

    #[test]
    fn test_escape_character_is_escaped() {
        assert_ne!(normalize_segment("a%3Ab"), normalize_segment("a:b"));
        assert_eq!(normalize_segment("50%"), "50%25");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = NodeId::from_path("system", ["Plant"]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"system::Plant\"");
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn segment_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_ ]{0,16}"
    }

    /// The same path always derives the same id.
    fn check_derivation_is_deterministic(segments: &[String]) -> Result<(), TestCaseError> {
        let first = NodeId::from_path("dt", segments);
        let second = NodeId::from_path("dt", segments);
        prop_assert_eq!(first, second);
        Ok(())
    }

    /// Normalized segments never contain whitespace.
    fn check_normalized_has_no_whitespace(segment: &str) -> Result<(), TestCaseError> {
        let normalized = normalize_segment(segment);
        prop_assert!(!normalized.chars().any(char::is_whitespace));
        Ok(())
    }

    /// A segment never contains the separator, whatever the name holds.
    fn check_normalized_has_no_separator(segment: &str) -> Result<(), TestCaseError> {
        let normalized = normalize_segment(segment);
        prop_assert!(!normalized.contains(':'));
        Ok(())
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(segments in prop::collection::vec(segment_strategy(), 0..5)) {
            check_derivation_is_deterministic(&segments)?;
        }

        #[test]
        fn normalized_has_no_whitespace(segment in segment_strategy()) {
            check_normalized_has_no_whitespace(&segment)?;
        }

        #[test]
        fn normalized_has_no_separator(segment in "[A-Za-z:% ]{0,16}") {
            check_normalized_has_no_separator(&segment)?;
        }
    }
}
