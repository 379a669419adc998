//! Per-entity metadata resolution
//!
//! Resolves class metadata once per lifecycle notification and answers the
//! loggability questions the aggregator asks. Runtime class names may carry
//! the persistence layer's dynamic-proxy prefix; resolution always strips it
//! first so proxies land on the declared class's metadata.

use crate::entity::AuditableEntity;
use crate::error::AuditResult;
use crate::metadata::registry::{ClassMetadata, Strategy};

/// Naming prefix dynamic proxies carry on their runtime class name
pub const PROXY_PREFIX: &str = "proxies::__cg__::";

/// Strip the dynamic-proxy prefix from a runtime class name
///
/// Pure string normalization; names without the prefix pass through.
pub fn declared_class_name(runtime: &str) -> &str {
    runtime.strip_prefix(PROXY_PREFIX).unwrap_or(runtime)
}

/// Source of class metadata, queried by declared class name
///
/// The in-memory registry is infallible, but dynamic sources (schema
/// catalogs, remote registries) may fail; lookup errors degrade to "not
/// loggable" at the aggregator after being reported.
pub trait MetadataSource {
    /// Metadata for a declared class name, `None` when the class carries no
    /// loggable declaration
    fn class_metadata(&self, class: &str) -> AuditResult<Option<ClassMetadata>>;
}

/// Resolves metadata for entities against a source
pub struct MetadataResolver {
    source: Box<dyn MetadataSource>,
}

impl MetadataResolver {
    /// Create a resolver over the given source
    pub fn new(source: Box<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Resolve metadata for one entity instance
    ///
    /// Called once per lifecycle notification; the returned view caches the
    /// class metadata for all property queries within that notification.
    pub fn resolve(&self, entity: &dyn AuditableEntity) -> AuditResult<ResolvedMetadata> {
        let class = declared_class_name(entity.runtime_class()).to_string();
        let meta = self.source.class_metadata(&class)?;
        Ok(ResolvedMetadata { class, meta })
    }
}

/// Metadata view for one entity instance
#[derive(Debug, Clone)]
pub struct ResolvedMetadata {
    class: String,
    meta: Option<ClassMetadata>,
}

impl ResolvedMetadata {
    /// Declared (proxy-stripped) class name
    pub fn class(&self) -> &str {
        &self.class
    }

    /// True iff the class carries loggable metadata
    pub fn is_class_loggable(&self) -> bool {
        self.meta.is_some()
    }

    /// Check whether a property should be captured
    ///
    /// Exclude-all: the property must carry the log marker. Include-all: the
    /// property must not carry the exclude marker. The hard ignore flag
    /// forces exclusion regardless of strategy.
    pub fn is_property_loggable(&self, name: &str) -> bool {
        let Some(meta) = &self.meta else {
            return false;
        };

        let property = meta.property_meta(name);
        if property.is_some_and(|p| p.ignored) {
            return false;
        }

        match meta.strategy {
            Strategy::ExcludeAll => property.is_some_and(|p| p.logged),
            Strategy::IncludeAll => !property.is_some_and(|p| p.excluded),
        }
    }

    /// Projection expression for a property, if declared
    pub fn property_expression(&self, name: &str) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.property_meta(name))
            .and_then(|p| p.expression.as_deref())
    }

    /// Display label for a property, if declared
    ///
    /// Callers fall back to the raw property name.
    pub fn property_label(&self, name: &str) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.property_meta(name))
            .and_then(|p| p.label.as_deref())
    }

    /// Class label, if declared
    pub fn class_label(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.label.as_deref())
    }

    /// On-delete expression, if declared
    pub fn on_delete_expression(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.on_delete_expression.as_deref())
    }
}
