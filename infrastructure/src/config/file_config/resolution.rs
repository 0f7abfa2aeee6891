//! Conflict resolution configuration from TOML (`[resolution]` section)
//!
//! Example:
//!
//! ```toml
//! [resolution]
//! critical_keys = ["deploy.status"]
//!
//! [resolution.source_priority]
//! deploy = "foundation"
//! ticket = "ticket-miner"
//!
//! [resolution.weights]
//! implementation = 3
//! pattern = 2
//! documentation = 1
//! deployment = 1
//! ```

use inquest_domain::{EvidenceWeights, ResolutionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conflict resolution configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResolutionConfig {
    /// Authoritative source task per key namespace
    pub source_priority: BTreeMap<String, String>,
    /// Keys whose escalation halts the session
    pub critical_keys: Vec<String>,
    pub weights: EvidenceWeights,
}

impl FileResolutionConfig {
    /// Convert into the domain resolution policy.
    pub fn to_policy(&self) -> ResolutionPolicy {
        let mut policy = ResolutionPolicy::new().with_weights(self.weights);
        for (namespace, source) in &self.source_priority {
            policy = policy.with_priority(namespace, source);
        }
        for key in &self.critical_keys {
            policy = policy.with_critical(key);
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_priorities_or_criticals() {
        let policy = FileResolutionConfig::default().to_policy();
        assert_eq!(policy.authoritative_source("deploy"), None);
        assert!(!policy.is_critical(&"deploy.status".parse().unwrap()));
        assert_eq!(policy.weights, EvidenceWeights::default());
    }

    #[test]
    fn test_deserialize_partial_weights() {
        let toml_str = r#"
[weights]
implementation = 10
"#;
        let config: FileResolutionConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.weights.implementation, 10);
        assert_eq!(config.weights.deployment, 1);
    }
}
