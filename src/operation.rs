//! Operation types: the atomic, position-addressed unit of change.
//!
//! Operations are immutable once created. Transforms never mutate an
//! operation in place; they produce a new value with adjusted position and
//! length, carrying the same identity (id, author, timestamp).

use crate::error::{Error, Result};
use crate::{AuthorId, OperationId, Position, Span, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The kind of edit an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Insert `content` at `position`
    Insert,
    /// Remove `length` units starting at `position`
    Delete,
    /// Remove `length` units at `position` and insert `content` in their place
    Replace,
    /// Relocate `length` units starting at `position`
    Move,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Insert => "insert",
            OperationKind::Delete => "delete",
            OperationKind::Replace => "replace",
            OperationKind::Move => "move",
        };
        f.write_str(name)
    }
}

/// A primitive metadata value.
///
/// The engine never interprets metadata; it is carried through transforms
/// untouched for the surrounding application's benefit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// An atomic, position-addressed edit against the shared linear space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique identifier, stable across transforms
    pub id: OperationId,
    /// Identity of the submitting party
    pub author: AuthorId,
    /// Submission time in milliseconds since epoch
    pub timestamp: Timestamp,
    /// What the operation does
    pub kind: OperationKind,
    /// Offset into the shared linear space, always `>= 0`
    pub position: Position,
    /// Payload for insert/replace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Affected span for delete/replace/move
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<Span>,
    /// Opaque key-value bag, not interpreted by the engine
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Operation {
    fn new(
        kind: OperationKind,
        position: Position,
        content: Option<String>,
        length: Option<Span>,
        author: impl Into<AuthorId>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            timestamp: now_ms(),
            kind,
            position,
            content,
            length,
            metadata: BTreeMap::new(),
        }
    }

    /// Create an insert operation with a generated id and current timestamp.
    pub fn insert(
        position: Position,
        content: impl Into<String>,
        author: impl Into<AuthorId>,
    ) -> Self {
        Self::new(
            OperationKind::Insert,
            position,
            Some(content.into()),
            None,
            author,
        )
    }

    /// Create a delete operation with a generated id and current timestamp.
    pub fn delete(position: Position, length: Span, author: impl Into<AuthorId>) -> Self {
        Self::new(OperationKind::Delete, position, None, Some(length), author)
    }

    /// Create a replace operation with a generated id and current timestamp.
    pub fn replace(
        position: Position,
        length: Span,
        content: impl Into<String>,
        author: impl Into<AuthorId>,
    ) -> Self {
        Self::new(
            OperationKind::Replace,
            position,
            Some(content.into()),
            Some(length),
            author,
        )
    }

    /// Create a move operation with a generated id and current timestamp.
    pub fn move_span(position: Position, length: Span, author: impl Into<AuthorId>) -> Self {
        Self::new(OperationKind::Move, position, None, Some(length), author)
    }

    /// Replace the generated id (for callers that own id allocation).
    pub fn with_id(mut self, id: impl Into<OperationId>) -> Self {
        self.id = id.into();
        self
    }

    /// Replace the generated timestamp (for callers that own their clocks).
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Character count of the content payload, zero when absent.
    pub fn content_len(&self) -> Span {
        self.content
            .as_ref()
            .map(|c| c.chars().count() as Span)
            .unwrap_or(0)
    }

    /// The footprint of this operation in the linear space.
    ///
    /// Deletes, replaces, and moves span their `length`. An insert occupies
    /// no existing span, but its footprint for overlap and transform-window
    /// purposes is the inserted text, so concurrent inserts at the same
    /// position register as overlapping.
    pub fn span(&self) -> Span {
        match self.kind {
            OperationKind::Insert => self.content_len(),
            _ => self.length.unwrap_or(0),
        }
    }

    /// Exclusive end of the affected range.
    pub fn end(&self) -> Position {
        self.position + self.span()
    }

    /// Whether two operations' ranges spatially overlap.
    pub fn overlaps(&self, other: &Operation) -> bool {
        !(self.end() <= other.position || other.end() <= self.position)
    }

    /// Check the structural invariants for this operation's kind.
    pub fn validate(&self) -> Result<()> {
        if self.position < 0 {
            return Err(Error::NegativePosition(self.position));
        }
        if let Some(length) = self.length {
            if length < 0 {
                return Err(Error::NegativeLength(length));
            }
        }
        match self.kind {
            OperationKind::Insert => {
                if self.content.is_none() {
                    return Err(Error::MissingContent { kind: self.kind });
                }
            }
            OperationKind::Delete | OperationKind::Move => {
                if self.length.is_none() {
                    return Err(Error::MissingLength { kind: self.kind });
                }
            }
            OperationKind::Replace => {
                if self.content.is_none() {
                    return Err(Error::MissingContent { kind: self.kind });
                }
                if self.length.is_none() {
                    return Err(Error::MissingLength { kind: self.kind });
                }
            }
        }
        Ok(())
    }

    /// Whether the operation satisfies the structural invariants.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Current wall-clock time in milliseconds since epoch.
pub(crate) fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_constructor() {
        let op = Operation::insert(5, "hello", "alice");
        assert_eq!(op.kind, OperationKind::Insert);
        assert_eq!(op.position, 5);
        assert_eq!(op.content.as_deref(), Some("hello"));
        assert_eq!(op.length, None);
        assert_eq!(op.author, "alice");
        assert!(!op.id.is_empty());
    }

    #[test]
    fn delete_constructor() {
        let op = Operation::delete(3, 4, "bob");
        assert_eq!(op.kind, OperationKind::Delete);
        assert_eq!(op.length, Some(4));
        assert_eq!(op.content, None);
    }

    #[test]
    fn replace_constructor() {
        let op = Operation::replace(0, 2, "xy", "carol");
        assert_eq!(op.kind, OperationKind::Replace);
        assert_eq!(op.content.as_deref(), Some("xy"));
        assert_eq!(op.length, Some(2));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = Operation::insert(0, "a", "u1");
        let b = Operation::insert(0, "a", "u1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn insert_span_is_content_length() {
        let op = Operation::insert(5, "abc", "alice");
        assert_eq!(op.span(), 3);
        assert_eq!(op.end(), 8);
    }

    #[test]
    fn delete_span_is_length() {
        let op = Operation::delete(5, 10, "alice");
        assert_eq!(op.span(), 10);
        assert_eq!(op.end(), 15);
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = Operation::delete(0, 10, "u1");
        let b = Operation::delete(5, 10, "u2");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = Operation::delete(0, 5, "u1");
        let b = Operation::delete(5, 5, "u2");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn same_position_inserts_overlap() {
        let a = Operation::insert(5, "XY", "u1");
        let b = Operation::insert(5, "Z", "u2");
        assert!(a.overlaps(&b));
    }

    #[test]
    fn validate_rejects_negative_position() {
        let mut op = Operation::insert(0, "x", "u1");
        op.position = -1;
        assert!(matches!(op.validate(), Err(Error::NegativePosition(-1))));
    }

    #[test]
    fn validate_rejects_negative_length() {
        let mut op = Operation::delete(0, 1, "u1");
        op.length = Some(-3);
        assert!(matches!(op.validate(), Err(Error::NegativeLength(-3))));
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut insert = Operation::insert(0, "x", "u1");
        insert.content = None;
        assert!(matches!(
            insert.validate(),
            Err(Error::MissingContent { .. })
        ));

        let mut delete = Operation::delete(0, 1, "u1");
        delete.length = None;
        assert!(matches!(delete.validate(), Err(Error::MissingLength { .. })));

        let mut replace = Operation::replace(0, 1, "x", "u1");
        replace.length = None;
        assert!(matches!(
            replace.validate(),
            Err(Error::MissingLength { .. })
        ));
    }

    #[test]
    fn validate_accepts_well_formed_operations() {
        assert!(Operation::insert(0, "x", "u1").is_valid());
        assert!(Operation::delete(0, 1, "u1").is_valid());
        assert!(Operation::replace(0, 1, "x", "u1").is_valid());
        assert!(Operation::move_span(0, 1, "u1").is_valid());
    }

    #[test]
    fn metadata_is_carried() {
        let op = Operation::insert(0, "x", "u1")
            .with_metadata("source", "grid")
            .with_metadata("cell", 12.0)
            .with_metadata("speculative", true);
        assert_eq!(op.metadata.len(), 3);
        assert_eq!(op.metadata.get("source"), Some(&"grid".into()));
    }

    #[test]
    fn serialization_roundtrip() {
        let op = Operation::replace(3, 2, "ab", "alice")
            .with_timestamp(1000)
            .with_metadata("source", "grid");

        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"kind\":\"replace\""));

        let parsed: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, parsed);
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let op = Operation::delete(0, 1, "u1").with_timestamp(1000);
        let json = serde_json::to_string(&op).unwrap();
        assert!(!json.contains("content"));
        assert!(!json.contains("metadata"));
    }
}
