//! Loggability metadata: what gets captured, and how it is presented
//!
//! Per-class and per-property capture declarations are represented as a
//! registry queried by declared class name.
//! `registry` holds the metadata records and the in-memory source;
//! `resolver` answers per-entity questions and strips dynamic-proxy naming
//! before lookup.

mod registry;
mod resolver;

pub use registry::{ClassMetadata, MetadataRegistry, PropertyMetadata, Strategy};
pub use resolver::{
    declared_class_name, MetadataResolver, MetadataSource, ResolvedMetadata, PROXY_PREFIX,
};
