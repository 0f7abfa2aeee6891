//! Minimum-evidence policy configuration (`[policy]` section)

use inquest_domain::MinimumEvidencePolicy;
use serde::{Deserialize, Serialize};

/// Minimum-evidence halt policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePolicyConfig {
    pub enabled: bool,
    /// Phase whose outcome is checked; empty means the first phase
    pub subject_phase: String,
}

impl Default for FilePolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subject_phase: String::new(),
        }
    }
}

impl FilePolicyConfig {
    pub fn to_policy(&self) -> MinimumEvidencePolicy {
        MinimumEvidencePolicy {
            enabled: self.enabled,
            subject_phase: self.subject_phase.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_enabled_for_first_phase() {
        let policy = FilePolicyConfig::default().to_policy();
        assert!(policy.enabled);
        assert!(policy.subject_phase.is_empty());
    }
}
