//! Log record construction
//!
//! Turns an entity plus a captured change set into a `LogRecord`: declared
//! class name, joined identifier, current actor, owner identifier, and the
//! creation timestamp.

use chrono::Utc;
use serde_json::Value;

use crate::entity::AuditableEntity;
use crate::metadata::declared_class_name;
use crate::record::{Action, LogRecord};

/// Resolves the identity of the acting principal
pub trait ActorResolver {
    /// Identifier of the current actor, `None` when unauthenticated
    fn current_actor(&self) -> Option<String>;
}

/// Resolver for hosts without principal tracking
#[derive(Debug, Default)]
pub struct NoActor;

impl ActorResolver for NoActor {
    fn current_actor(&self) -> Option<String> {
        None
    }
}

/// Resolver returning a fixed actor identifier
#[derive(Debug)]
pub struct FixedActor(pub String);

impl ActorResolver for FixedActor {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Builds log records for audited entities
pub struct RecordBuilder {
    actor: Box<dyn ActorResolver>,
}

impl RecordBuilder {
    /// Create a builder resolving actors through the given collaborator
    pub fn new(actor: Box<dyn ActorResolver>) -> Self {
        Self { actor }
    }

    /// Build a record for one audited event
    pub fn build(
        &self,
        entity: &dyn AuditableEntity,
        action: Action,
        changes: Option<Value>,
        label: Option<String>,
    ) -> LogRecord {
        LogRecord {
            object_class: declared_class_name(entity.runtime_class()).to_string(),
            instance_id: entity.identifier().join(", "),
            action,
            changes,
            label,
            changed_by: self.actor.current_actor(),
            instance_owner: entity.owner_identifier(),
            created_at: Utc::now(),
        }
    }
}
