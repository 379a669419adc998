//! entity-audit - Change-capture audit logging for ORM-style persistence layers
//!
//! This library observes entity lifecycle events (create, update, delete)
//! coming out of a persistence layer's unit of work and persists one
//! structured record per audited event. It decides which classes and
//! properties are loggable, computes a diff-friendly representation of each
//! change, resolves labels and projection expressions, merges multiple
//! contributions for the same entity within one unit of work, and flushes
//! the accumulated records only after the unit of work completes.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: enable flag and globally ignored properties
//! - `error`: custom error types
//! - `entity`: capabilities audited entities expose
//! - `value`: typed raw change values reported by the engine
//! - `expression`: projection expressions for related-object values
//! - `metadata`: loggability metadata registry and resolver
//! - `format`: value normalization and change-set labeling
//! - `record`: the immutable log record
//! - `builder`: record construction (identity, actor, owner, timestamp)
//! - `store`: record storage trait and provided backends
//! - `aggregator`: per-unit-of-work accumulation and dispatch
//! - `diagnostics`: best-effort sink for contained failures
//!
//! # Example
//!
//! ```rust,ignore
//! use entity_audit::{
//!     AuditConfig, ChangeAggregator, ClassMetadata, JsonlStore, MetadataRegistry,
//!     MetadataResolver, NoActor, NullSink, RecordBuilder, Strategy,
//! };
//!
//! let mut registry = MetadataRegistry::new();
//! registry.register("app::Invoice", ClassMetadata::new(Strategy::IncludeAll));
//!
//! let mut aggregator = ChangeAggregator::new(
//!     AuditConfig::default(),
//!     MetadataResolver::new(Box::new(registry)),
//!     RecordBuilder::new(Box::new(NoActor)),
//!     Box::new(JsonlStore::new(log_path)),
//!     Box::new(NullSink),
//! );
//!
//! // The change-tracking engine drives these:
//! aggregator.entity_updated(&invoice, &diff);
//! aggregator.unit_of_work_complete()?;
//! ```

pub mod aggregator;
pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod expression;
pub mod format;
pub mod metadata;
pub mod record;
pub mod store;
pub mod value;

pub use aggregator::{ChangeAggregator, LifecycleEvent};
pub use builder::{ActorResolver, FixedActor, NoActor, RecordBuilder};
pub use config::AuditConfig;
pub use diagnostics::{DiagnosticSink, MemorySink, NullSink, StderrSink};
pub use entity::{AuditableEntity, EntityHandle};
pub use error::{AuditError, AuditResult};
pub use expression::Expression;
pub use format::ValueFormatter;
pub use metadata::{
    declared_class_name, ClassMetadata, MetadataRegistry, MetadataResolver, MetadataSource,
    PropertyMetadata, ResolvedMetadata, Strategy,
};
pub use record::{Action, LogRecord, REMOVE_KEY};
pub use store::{JsonlStore, MemoryStore, RecordStore};
pub use value::{EntityRef, FieldValue, PropertyDiff};
