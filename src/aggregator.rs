//! Per-unit-of-work change aggregation and dispatch
//!
//! The change-tracking engine feeds lifecycle notifications into a
//! `ChangeAggregator`, which filters them through class/property metadata,
//! formats the surviving values, and accumulates one pending record per
//! entity instance. Records reach storage only when the engine reports the
//! unit of work complete; persisting earlier would re-enter the engine's
//! flush cycle.
//!
//! One aggregator serves exactly one persistence session. Everything runs
//! synchronously on the calling thread; there is no interior locking, and
//! the pending set must never be shared across sessions.

use serde_json::{Map, Value};

use crate::builder::RecordBuilder;
use crate::config::AuditConfig;
use crate::diagnostics::DiagnosticSink;
use crate::entity::{AuditableEntity, EntityHandle};
use crate::error::{AuditError, AuditResult};
use crate::expression::Expression;
use crate::format::ValueFormatter;
use crate::metadata::{MetadataResolver, ResolvedMetadata};
use crate::record::{Action, LogRecord, REMOVE_KEY};
use crate::store::RecordStore;
use crate::value::{FieldValue, PropertyDiff};

/// Lifecycle events the aggregator can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created,
    Updated,
    Removed,
    CollectionChanged,
    UnitOfWorkComplete,
}

/// Collects change sets per entity and dispatches records after the unit of
/// work completes
///
/// The per-unit-of-work lifecycle is Idle, then Collecting while
/// notifications arrive, then Flushing inside `unit_of_work_complete`.
/// Exclusive ownership enforces the ordering: every method takes `&mut
/// self`, so no notification can interleave with a flush.
///
/// Every notification body is contained: a failure while processing one
/// entity is reported to the diagnostic sink and never prevents capture for
/// sibling entities or corrupts the host flush.
pub struct ChangeAggregator {
    config: AuditConfig,
    resolver: MetadataResolver,
    builder: RecordBuilder,
    store: Box<dyn RecordStore>,
    diagnostics: Box<dyn DiagnosticSink>,
    pending: Vec<(EntityHandle, LogRecord)>,
}

impl ChangeAggregator {
    /// Wire an aggregator from its collaborators
    pub fn new(
        config: AuditConfig,
        resolver: MetadataResolver,
        builder: RecordBuilder,
        store: Box<dyn RecordStore>,
        diagnostics: Box<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            config,
            resolver,
            builder,
            store,
            diagnostics,
            pending: Vec::new(),
        }
    }

    /// Lifecycle events the host engine should register this aggregator for
    ///
    /// Empty when capture is disabled, so a disabled pipeline costs nothing
    /// per entity operation.
    pub fn subscribed_events(&self) -> Vec<LifecycleEvent> {
        if !self.config.enabled {
            return Vec::new();
        }

        vec![
            LifecycleEvent::Created,
            LifecycleEvent::Updated,
            LifecycleEvent::Removed,
            LifecycleEvent::CollectionChanged,
            LifecycleEvent::UnitOfWorkComplete,
        ]
    }

    /// Number of records captured but not yet flushed
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Entity was created in this unit of work
    pub fn entity_created(&mut self, entity: &dyn AuditableEntity) {
        if !self.config.enabled {
            return;
        }
        let outcome = self.capture_action(entity, Action::Create);
        self.contain(outcome);
    }

    /// Entity was updated; `diff` is the engine's raw property diff
    pub fn entity_updated(&mut self, entity: &dyn AuditableEntity, diff: &PropertyDiff) {
        if !self.config.enabled {
            return;
        }
        let outcome = self.capture_update(entity, diff);
        self.contain(outcome);
    }

    /// Entity is being removed
    pub fn entity_removed(&mut self, entity: &dyn AuditableEntity) {
        if !self.config.enabled {
            return;
        }
        let outcome = self.capture_action(entity, Action::Remove);
        self.contain(outcome);
    }

    /// A relationship collection on `owner` changed membership
    pub fn collection_changed(
        &mut self,
        owner: &dyn AuditableEntity,
        field: &str,
        old_elements: &[FieldValue],
        new_elements: &[FieldValue],
    ) {
        if !self.config.enabled {
            return;
        }
        let outcome = self.capture_collection(owner, field, old_elements, new_elements);
        self.contain(outcome);
    }

    /// The unit of work finished; flush every pending record to storage
    ///
    /// Records are appended in capture order. A failed append is reported
    /// and does not stop the remaining records; the pending set is cleared
    /// either way, and the number of records written is returned. When any
    /// append failed the call returns a storage error after the batch.
    pub fn unit_of_work_complete(&mut self) -> AuditResult<usize> {
        let pending = std::mem::take(&mut self.pending);

        let total = pending.len();
        let mut written = 0;

        for (_, record) in &pending {
            match self.store.append(record) {
                Ok(()) => written += 1,
                Err(err) => self
                    .diagnostics
                    .report_error(&format!("Failed to append audit record: {}", err)),
            }
        }

        if written < total {
            return Err(AuditError::Storage(format!(
                "{} of {} audit records failed to append",
                total - written,
                total
            )));
        }

        Ok(written)
    }

    /// Report a contained failure; sibling entities are unaffected
    fn contain(&self, outcome: AuditResult<()>) {
        if let Err(err) = outcome {
            self.diagnostics.report_error(&err.to_string());
        }
    }

    /// Capture a create or remove notification
    fn capture_action(&mut self, entity: &dyn AuditableEntity, action: Action) -> AuditResult<()> {
        let meta = self.resolver.resolve(entity)?;
        if !meta.is_class_loggable() {
            return Ok(());
        }

        let changes = match action {
            Action::Remove => self.remove_payload(entity, &meta),
            _ => Map::new(),
        };

        let label = meta.class_label().map(str::to_string);
        self.merge_pending(entity, action, changes, label);
        Ok(())
    }

    /// Capture an update notification from the engine's property diff
    fn capture_update(&mut self, entity: &dyn AuditableEntity, diff: &PropertyDiff) -> AuditResult<()> {
        let meta = self.resolver.resolve(entity)?;
        if !meta.is_class_loggable() {
            return Ok(());
        }

        // Drop globally ignored, non-loggable, and ignore-flagged properties
        let surviving: PropertyDiff = diff
            .iter()
            .filter(|(name, _)| {
                !self.config.is_ignored(name) && meta.is_property_loggable(name)
            })
            .map(|(name, pair)| (name.clone(), pair.clone()))
            .collect();

        // An empty filtered diff warrants no record
        if surviving.is_empty() {
            return Ok(());
        }

        let changes = ValueFormatter::new(&*self.diagnostics).format_change_set(&surviving, &meta);
        let label = meta.class_label().map(str::to_string);
        self.merge_pending(entity, Action::Update, changes, label);
        Ok(())
    }

    /// Capture a collection membership change on the owning entity
    fn capture_collection(
        &mut self,
        owner: &dyn AuditableEntity,
        field: &str,
        old_elements: &[FieldValue],
        new_elements: &[FieldValue],
    ) -> AuditResult<()> {
        let meta = self.resolver.resolve(owner)?;
        // A non-loggable field short-circuits the whole event
        if !meta.is_class_loggable() || !meta.is_property_loggable(field) {
            return Ok(());
        }

        let expression = meta.property_expression(field);
        let formatter = ValueFormatter::new(&*self.diagnostics);

        let insertions: Vec<Value> = new_elements
            .iter()
            .filter(|element| !old_elements.contains(element))
            .map(|element| formatter.format_value(element, expression))
            .collect();

        let deletions: Vec<Value> = old_elements
            .iter()
            .filter(|element| !new_elements.contains(element))
            .map(|element| formatter.format_value(element, expression))
            .collect();

        if insertions.is_empty() && deletions.is_empty() {
            return Ok(());
        }

        let mut membership = Map::new();
        if !insertions.is_empty() {
            membership.insert("insertions".into(), Value::Array(insertions));
        }
        if !deletions.is_empty() {
            membership.insert("deletions".into(), Value::Array(deletions));
        }
        membership.insert(
            "newSet".into(),
            Value::Array(
                new_elements
                    .iter()
                    .map(|element| formatter.format_value(element, expression))
                    .collect(),
            ),
        );

        let mut changes = Map::new();
        changes.insert(field.to_string(), Value::Object(membership));

        let label = meta.class_label().map(str::to_string);
        self.merge_pending(owner, Action::Update, changes, label);
        Ok(())
    }

    /// Build the delete payload under the `"_remove"` sentinel key
    ///
    /// The entity's own delete snapshot wins; the class on-delete expression
    /// is the fallback, degrading to no payload when it fails.
    fn remove_payload(
        &self,
        entity: &dyn AuditableEntity,
        meta: &ResolvedMetadata,
    ) -> Map<String, Value> {
        let mut changes = Map::new();

        if let Some(dump) = entity.dump_on_delete() {
            changes.insert(REMOVE_KEY.to_string(), Value::Object(dump));
        } else if let Some(expr) = meta.on_delete_expression() {
            match Expression::evaluate_str(expr, &entity.snapshot()) {
                Ok(value) => {
                    changes.insert(REMOVE_KEY.to_string(), value);
                }
                Err(err) => self.diagnostics.report_error(&err.to_string()),
            }
        }

        changes
    }

    /// Merge a captured change set into the pending record for this entity
    ///
    /// New changes form the base and the previously captured mapping is
    /// overlaid on top, so earlier-captured keys win on collision. The first
    /// capture also fixes the record's action, label, and timestamp.
    fn merge_pending(
        &mut self,
        entity: &dyn AuditableEntity,
        action: Action,
        new_changes: Map<String, Value>,
        label: Option<String>,
    ) {
        let handle = entity.handle();

        if let Some((_, existing)) = self.pending.iter_mut().find(|(h, _)| *h == handle) {
            let mut merged = new_changes;
            if let Some(Value::Object(previous)) = existing.changes.take() {
                for (key, value) in previous {
                    merged.insert(key, value);
                }
            }
            existing.changes = Some(Value::Object(merged));
            return;
        }

        let record = self
            .builder
            .build(entity, action, Some(Value::Object(new_changes)), label);
        self.pending.push((handle, record));
    }
}
