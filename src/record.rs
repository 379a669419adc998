//! Log record data structures
//!
//! Defines the immutable record persisted for each audited event: what
//! changed, on which entity, by whom, and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel key the delete payload is stored under
pub const REMOVE_KEY: &str = "_remove";

/// Kinds of audited lifecycle actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Entity was created
    Create,
    /// Entity was updated
    Update,
    /// Entity was removed
    Remove,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Create => write!(f, "CREATE"),
            Action::Update => write!(f, "UPDATE"),
            Action::Remove => write!(f, "REMOVE"),
        }
    }
}

/// A single audited event
///
/// Immutable once built: `created_at` is stamped at construction and never
/// touched again. The aggregator may still fold additional changes captured
/// within the same unit of work into `changes` before the record is flushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Declared (proxy-stripped) class name of the audited entity
    pub object_class: String,

    /// Identifier component values joined with ", "
    pub instance_id: String,

    /// Action performed
    pub action: Action,

    /// Nested change mapping; `[old, new]` pairs for updates, the
    /// `"_remove"` payload for deletions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Value>,

    /// Human-readable class label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Who performed the action, when an authenticated principal exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,

    /// Logical owner of the entity, when it reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_owner: Option<String>,

    /// When the record was built (UTC)
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    /// Format the record for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.action,
            self.object_class,
            self.instance_id
        );

        if let Some(label) = &self.label {
            output.push_str(&format!(" ({})", label));
        }

        if let Some(actor) = &self.changed_by {
            output.push_str(&format!(" by {}", actor));
        }

        if let Some(owner) = &self.instance_owner {
            output.push_str(&format!(" owned by {}", owner));
        }

        if let Some(changes) = &self.changes {
            output.push_str(&format!("\n  Changes: {}", changes));
        }

        output
    }
}
