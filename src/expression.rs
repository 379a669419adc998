//! Projection expressions for related-object values
//!
//! Integrators attach a small expression like `obj.name` to a property so
//! the audit record carries a stable display value instead of an internal
//! object graph. Expressions are dotted paths rooted at `obj`, evaluated
//! against the JSON snapshot of the related entity.

use serde_json::Value;

use crate::error::{AuditError, AuditResult};

/// Root variable name every expression must start with
const ROOT: &str = "obj";

/// A parsed projection expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    segments: Vec<String>,
}

impl Expression {
    /// Parse an expression of the form `obj`, `obj.name`, `obj.owner.email`
    pub fn parse(text: &str) -> AuditResult<Self> {
        let mut parts = text.split('.');

        let root = parts.next().unwrap_or_default().trim();
        if root != ROOT {
            return Err(AuditError::Expression(format!(
                "Expression must start with '{}': {}",
                ROOT, text
            )));
        }

        let mut segments = Vec::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() || !is_identifier(part) {
                return Err(AuditError::Expression(format!(
                    "Invalid path segment '{}' in expression: {}",
                    part, text
                )));
            }
            segments.push(part.to_string());
        }

        Ok(Self { segments })
    }

    /// Evaluate against a snapshot, walking each segment into nested objects
    ///
    /// A bare `obj` expression returns the snapshot itself. Missing keys and
    /// attempts to descend into non-objects are evaluation errors; callers
    /// degrade to generic formatting.
    pub fn evaluate(&self, snapshot: &Value) -> AuditResult<Value> {
        let mut current = snapshot;

        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment).ok_or_else(|| {
                    AuditError::Expression(format!("Unknown field '{}' in expression", segment))
                })?,
                other => {
                    return Err(AuditError::Expression(format!(
                        "Cannot project '{}' out of non-object value {}",
                        segment, other
                    )));
                }
            };
        }

        Ok(current.clone())
    }

    /// Parse and evaluate in one step
    pub fn evaluate_str(text: &str, snapshot: &Value) -> AuditResult<Value> {
        Self::parse(text)?.evaluate(snapshot)
    }
}

/// Check that a segment is a plain identifier
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
