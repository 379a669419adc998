//! Value formatting for change payloads
//!
//! Converts raw `FieldValue`s into the serializable representation stored in
//! a log record. Related-object values with a property expression are
//! projected through it; everything else falls back to generic rules:
//! date/time values get a fixed textual format, entity references collapse
//! to their display string or identifier, scalars pass through unchanged.

use serde_json::{Map, Value};

use crate::diagnostics::DiagnosticSink;
use crate::expression::Expression;
use crate::metadata::ResolvedMetadata;
use crate::value::{FieldValue, PropertyDiff};

/// Fixed textual format for date/time values in audit payloads
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Formats raw change values for one notification
///
/// Expression failures degrade to the generic fallback and are reported to
/// the diagnostic sink, so a single malformed expression never drops the
/// surrounding change set.
pub struct ValueFormatter<'a> {
    diagnostics: &'a dyn DiagnosticSink,
}

impl<'a> ValueFormatter<'a> {
    /// Create a formatter reporting degradations to the given sink
    pub fn new(diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self { diagnostics }
    }

    /// Format one raw value, applying the property expression when present
    pub fn format_value(&self, value: &FieldValue, expression: Option<&str>) -> Value {
        if let (Some(expr), FieldValue::Entity(entity)) = (expression, value) {
            match Expression::evaluate_str(expr, &entity.snapshot) {
                Ok(projected) => return projected,
                Err(err) => self.diagnostics.report_error(&err.to_string()),
            }
        }

        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::from(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Text(s) => Value::from(s.as_str()),
            FieldValue::DateTime(dt) => Value::from(dt.format(DATE_FORMAT).to_string()),
            FieldValue::Entity(entity) => {
                if let Some(display) = &entity.display {
                    Value::from(display.as_str())
                } else if let Some(id) = &entity.id {
                    Value::from(id.as_str())
                } else {
                    entity.snapshot.clone()
                }
            }
            FieldValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.format_value(item, expression))
                    .collect(),
            ),
            FieldValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.format_value(item, None)))
                    .collect(),
            ),
        }
    }

    /// Format an already-filtered diff into a labeled change mapping
    ///
    /// Keys are resolved through the property label, falling back to the raw
    /// property name; values become `[old, new]` pairs.
    pub fn format_change_set(
        &self,
        diff: &PropertyDiff,
        meta: &ResolvedMetadata,
    ) -> Map<String, Value> {
        let mut changes = Map::new();

        for (name, (old, new)) in diff {
            let expression = meta.property_expression(name);
            let key = meta.property_label(name).unwrap_or(name).to_string();
            changes.insert(
                key,
                Value::Array(vec![
                    self.format_value(old, expression),
                    self.format_value(new, expression),
                ]),
            );
        }

        changes
    }
}
