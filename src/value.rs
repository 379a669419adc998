//! Typed raw change values handed over by the persistence layer
//!
//! The change-tracking engine reports property diffs as pairs of
//! `FieldValue`s. Keeping the raw values typed (instead of pre-flattened
//! JSON) lets the formatter apply the right rule per kind: date/time values
//! get the fixed audit format, related-object references get expression
//! projection or identifier fallback, and scalars pass through unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Reference to a related entity inside a change value
#[derive(Debug, Clone)]
pub struct EntityRef {
    /// Declared class name of the referenced entity
    pub class: String,
    /// String form of the identifier, if the entity exposes one
    pub id: Option<String>,
    /// Display string, if the entity exposes a string-conversion capability
    pub display: Option<String>,
    /// JSON view of the referenced entity, used as the expression root
    pub snapshot: Value,
}

impl EntityRef {
    /// Create a reference with class, identifier, and snapshot
    pub fn new(class: impl Into<String>, id: Option<String>, snapshot: Value) -> Self {
        Self {
            class: class.into(),
            id,
            display: None,
            snapshot,
        }
    }

    /// Attach a display string
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

// Two refs to the same stored entity compare equal even when their snapshots
// drifted within the unit of work; identity falls back to the snapshot only
// for entities without an identifier.
impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        if self.class != other.class {
            return false;
        }
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.snapshot == other.snapshot,
        }
    }
}

/// A raw property value as reported in a diff
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<FixedOffset>),
    Entity(EntityRef),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// True for values with no nested structure
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Entity(_) | Self::List(_) | Self::Map(_))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(v: EntityRef) -> Self {
        Self::Entity(v)
    }
}

/// Property diff for one entity: name to (old, new)
pub type PropertyDiff = BTreeMap<String, (FieldValue, FieldValue)>;
