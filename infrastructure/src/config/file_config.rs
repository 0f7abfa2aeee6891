//! Configuration file structure (`inquest.toml`)
//!
//! Every section has serde defaults so a partial file works. Sections
//! convert into the domain types the pipeline consumes; `validate()`
//! reports structural problems as issues rather than panicking, so the
//! CLI can print all of them at once.

mod observability;
mod pipeline;
mod policy;
mod resolution;
mod session;

pub use observability::FileObservabilityConfig;
pub use pipeline::{FilePhase, FilePipelineConfig, FileTask};
pub use policy::FilePolicyConfig;
pub use resolution::FileResolutionConfig;
pub use session::FileSessionConfig;

use serde::{Deserialize, Serialize};

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub pipeline: FilePipelineConfig,
    pub resolution: FileResolutionConfig,
    pub policy: FilePolicyConfig,
    pub session: FileSessionConfig,
    pub observability: FileObservabilityConfig,
}

impl FileConfig {
    /// Validate the whole configuration, collecting every issue.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.pipeline.validate();
        if self.session.lease_timeout_secs <= self.session.heartbeat_secs {
            issues.push(ConfigIssue::warning(format!(
                "lease timeout ({}s) should exceed the heartbeat interval ({}s)",
                self.session.lease_timeout_secs, self.session.heartbeat_secs
            )));
        }
        if !self.policy.subject_phase.is_empty()
            && !self
                .pipeline
                .phases
                .iter()
                .any(|p| p.name == self.policy.subject_phase)
        {
            issues.push(ConfigIssue::warning(format!(
                "policy subject phase `{}` is not a declared phase; the evidence check will never run",
                self.policy.subject_phase
            )));
        }
        issues
    }

    pub fn has_errors(&self) -> bool {
        self.validate()
            .iter()
            .any(|i| i.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_round_trip() {
        let toml_str = r#"
[pipeline]
workers = 2

[[pipeline.phases]]
name = "discovery"

[[pipeline.phases.tasks]]
agent = "ticket-miner"
timeout_secs = 45

[[pipeline.phases]]
name = "analysis"
depends_on = ["discovery"]

[[pipeline.phases.tasks]]
agent = "diff-analyzer"
timeout_secs = 90
max_retries = 2

[resolution]
critical_keys = ["deploy.status"]

[resolution.source_priority]
deploy = "foundation"

[resolution.weights]
implementation = 5

[policy]
enabled = true
subject_phase = "discovery"

[session]
lease_timeout_secs = 300
heartbeat_secs = 10

[observability]
events_path = ".inquest/events.jsonl"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.pipeline.phases.len(), 2);
        assert_eq!(config.pipeline.phases[1].depends_on, vec!["discovery"]);
        assert_eq!(config.pipeline.phases[1].tasks[0].max_retries, 2);
        assert_eq!(config.session.lease_timeout_secs, 300);
        assert_eq!(config.observability.events_path, ".inquest/events.jsonl");

        let policy = config.resolution.to_policy();
        assert_eq!(policy.authoritative_source("deploy"), Some("foundation"));
        assert!(policy.is_critical(&"deploy.status".parse().unwrap()));
        assert_eq!(policy.weights.implementation, 5);
        // Unspecified weights keep their defaults
        assert_eq!(policy.weights.pattern, 2);

        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_unknown_subject_phase_warns() {
        let toml_str = r#"
[[pipeline.phases]]
name = "discovery"

[[pipeline.phases.tasks]]
agent = "ticket-miner"

[policy]
subject_phase = "ghost"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.message.contains("ghost")));
    }

    #[test]
    fn test_lease_shorter_than_heartbeat_warns() {
        let mut config = FileConfig::default();
        config.session.lease_timeout_secs = 3;
        config.session.heartbeat_secs = 5;

        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.message.contains("lease timeout")));
        assert!(!config.has_errors());
    }
}
