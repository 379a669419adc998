//! Host-level configuration for the audit pipeline
//!
//! Two knobs, both resolved at wiring time: a global enable flag gating
//! whether the aggregator subscribes to lifecycle events at all, and a list
//! of property names ignored for every class regardless of per-property
//! metadata.

use serde::{Deserialize, Serialize};

/// Audit pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether change capture is active; a disabled pipeline registers no
    /// lifecycle subscriptions and produces no records
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Property names always ignored, before per-property metadata is
    /// consulted (e.g. bookkeeping columns like "updated_at")
    #[serde(default)]
    pub ignored_properties: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ignored_properties: Vec::new(),
        }
    }
}

impl AuditConfig {
    /// Configuration with capture switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check whether a property is globally ignored
    pub fn is_ignored(&self, property: &str) -> bool {
        self.ignored_properties.iter().any(|p| p == property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuditConfig::default();
        assert!(config.enabled);
        assert!(config.ignored_properties.is_empty());
    }

    #[test]
    fn test_global_ignore_list() {
        let config = AuditConfig {
            ignored_properties: vec!["updated_at".into()],
            ..AuditConfig::default()
        };
        assert!(config.is_ignored("updated_at"));
        assert!(!config.is_ignored("status"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AuditConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);

        let config: AuditConfig =
            serde_json::from_str(r#"{"enabled": false, "ignored_properties": ["id"]}"#).unwrap();
        assert!(!config.enabled);
        assert!(config.is_ignored("id"));
    }
}
