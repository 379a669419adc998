//! Metadata records and the in-memory registry
//!
//! One `ClassMetadata` per audited class, with per-property records hanging
//! off it. Registering a class at all is what marks it loggable; the
//! strategy decides whether properties opt in or opt out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AuditResult;
use crate::metadata::resolver::MetadataSource;

/// Class-level default for property capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Properties are captured unless they carry an exclude marker
    #[default]
    IncludeAll,
    /// Properties are captured only when they carry a log marker
    ExcludeAll,
}

/// Per-property capture metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyMetadata {
    /// Opt-in marker, consulted under the exclude-all strategy
    #[serde(default)]
    pub logged: bool,

    /// Opt-out marker, consulted under the include-all strategy
    #[serde(default)]
    pub excluded: bool,

    /// Hard exclusion, wins under either strategy
    #[serde(default)]
    pub ignored: bool,

    /// Projection expression for related-object values (e.g. "obj.name")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Display label used instead of the raw property name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PropertyMetadata {
    /// Property carrying the opt-in log marker
    pub fn logged() -> Self {
        Self {
            logged: true,
            ..Self::default()
        }
    }

    /// Property carrying the opt-out exclude marker
    pub fn excluded() -> Self {
        Self {
            excluded: true,
            ..Self::default()
        }
    }

    /// Property carrying the hard ignore flag
    pub fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }

    /// Attach a projection expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Attach a display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Resolved capture metadata for one audited class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Property capture strategy
    #[serde(default)]
    pub strategy: Strategy,

    /// Human-readable class label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Expression evaluated against the entity snapshot on delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete_expression: Option<String>,

    /// Per-property metadata, keyed by property name
    #[serde(default)]
    properties: HashMap<String, PropertyMetadata>,
}

impl ClassMetadata {
    /// Metadata with the given strategy and no properties configured
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            label: None,
            on_delete_expression: None,
            properties: HashMap::new(),
        }
    }

    /// Attach a class label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach an on-delete expression
    pub fn with_on_delete_expression(mut self, expression: impl Into<String>) -> Self {
        self.on_delete_expression = Some(expression.into());
        self
    }

    /// Attach metadata for one property
    pub fn property(mut self, name: impl Into<String>, meta: PropertyMetadata) -> Self {
        self.properties.insert(name.into(), meta);
        self
    }

    /// Metadata for one property, if any was configured
    pub fn property_meta(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.get(name)
    }
}

impl Default for ClassMetadata {
    fn default() -> Self {
        Self::new(Strategy::default())
    }
}

/// In-memory metadata source keyed by declared class name
///
/// Hosts register every auditable class once at wiring time; registration
/// itself is what marks a class loggable.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    classes: HashMap<String, ClassMetadata>,
}

impl MetadataRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class as loggable with the given metadata
    pub fn register(&mut self, class: impl Into<String>, meta: ClassMetadata) {
        self.classes.insert(class.into(), meta);
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no classes are registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl MetadataSource for MetadataRegistry {
    fn class_metadata(&self, class: &str) -> AuditResult<Option<ClassMetadata>> {
        Ok(self.classes.get(class).cloned())
    }
}
