//! Entity-side capabilities the audit pipeline depends on
//!
//! The persistence layer's change-tracking engine hands entities to the
//! aggregator as `&dyn AuditableEntity`. The trait exposes exactly what the
//! pipeline needs: a stable per-instance handle, the runtime type name, the
//! natural identifier, and the optional owner-reporting and delete-snapshot
//! capabilities.

use serde_json::{Map, Value};

/// Stable per-instance identity handle
///
/// Two in-flight entity instances may share a class and identifier while
/// being distinct objects, so pending change sets are keyed by this handle
/// (an arena index or pointer-derived id supplied by the engine), never by
/// value equality. Handles are only meaningful within one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// Capabilities an audited entity exposes to the pipeline
pub trait AuditableEntity {
    /// Per-instance identity handle, stable for the duration of a unit of work
    fn handle(&self) -> EntityHandle;

    /// Runtime type name; may carry a dynamic-proxy prefix that the metadata
    /// resolver strips before lookup
    fn runtime_class(&self) -> &str;

    /// Natural/primary key component values, in declaration order
    fn identifier(&self) -> Vec<String>;

    /// Logical owner of the entity (e.g. tenant or account identifier)
    fn owner_identifier(&self) -> Option<String> {
        None
    }

    /// Delete-time snapshot of the fields worth keeping
    ///
    /// When present, this wins over the class-level on-delete expression.
    fn dump_on_delete(&self) -> Option<Map<String, Value>> {
        None
    }

    /// JSON view of the entity state, used as the root for projection
    /// expressions evaluated against this entity
    fn snapshot(&self) -> Value;
}
