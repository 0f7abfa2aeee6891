//! Pipeline configuration from TOML (`[pipeline]` section)
//!
//! Declares the phase DAG and the tasks of each phase. Example:
//!
//! ```toml
//! [pipeline]
//! workers = 4
//!
//! [[pipeline.phases]]
//! name = "discovery"
//!
//! [[pipeline.phases.tasks]]
//! agent = "ticket-miner"
//! timeout_secs = 60
//!
//! [[pipeline.phases]]
//! name = "analysis"
//! depends_on = ["discovery"]
//!
//! [[pipeline.phases.tasks]]
//! agent = "diff-analyzer"
//! timeout_secs = 120
//! max_retries = 1
//! ```

use super::{ConfigIssue, Severity};
use inquest_domain::{DomainError, PhasePlan, PhaseSpec, TaskSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One task declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTask {
    /// Agent kind to dispatch to
    pub agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for FileTask {
    fn default() -> Self {
        Self {
            agent: String::new(),
            timeout_secs: 60,
            max_retries: 1,
        }
    }
}

/// One phase declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePhase {
    pub name: String,
    pub depends_on: Vec<String>,
    pub tasks: Vec<FileTask>,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Bounded worker pool size for tasks within a phase
    pub workers: usize,
    pub phases: Vec<FilePhase>,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            phases: Vec::new(),
        }
    }
}

impl FilePipelineConfig {
    /// Convert into a validated domain plan.
    pub fn to_plan(&self) -> Result<PhasePlan, DomainError> {
        let phases = self
            .phases
            .iter()
            .map(|p| PhaseSpec {
                name: p.name.clone(),
                depends_on: p.depends_on.clone(),
                tasks: p
                    .tasks
                    .iter()
                    .map(|t| TaskSpec::new(&t.agent, t.timeout_secs).with_retries(t.max_retries))
                    .collect(),
            })
            .collect();
        PhasePlan::new(phases)
    }

    /// Structural checks with friendlier reporting than plan validation.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.phases.is_empty() {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                message: "pipeline declares no phases".to_string(),
            });
            return issues;
        }

        let names: BTreeSet<&str> = self.phases.iter().map(|p| p.name.as_str()).collect();
        for phase in &self.phases {
            if phase.tasks.is_empty() {
                issues.push(ConfigIssue::warning(format!(
                    "phase `{}` declares no tasks",
                    phase.name
                )));
            }
            for dep in &phase.depends_on {
                if !names.contains(dep.as_str()) {
                    issues.push(ConfigIssue::error(format!(
                        "phase `{}` depends on unknown phase `{}`",
                        phase.name, dep
                    )));
                }
            }
            for task in &phase.tasks {
                if task.agent.is_empty() {
                    issues.push(ConfigIssue::error(format!(
                        "phase `{}` has a task without an agent kind",
                        phase.name
                    )));
                }
                if task.timeout_secs == 0 {
                    issues.push(ConfigIssue::warning(format!(
                        "task `{}` in phase `{}` has a zero timeout and will always degrade",
                        task.agent, phase.name
                    )));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(phases: Vec<FilePhase>) -> FilePipelineConfig {
        FilePipelineConfig { workers: 4, phases }
    }

    #[test]
    fn test_empty_pipeline_is_an_error() {
        let issues = config_with(vec![]).validate();
        assert!(issues.iter().any(|i| i.severity == Severity::Error));
    }

    #[test]
    fn test_unknown_dependency_is_an_error() {
        let config = config_with(vec![FilePhase {
            name: "analysis".to_string(),
            depends_on: vec!["ghost".to_string()],
            tasks: vec![FileTask {
                agent: "diff-analyzer".to_string(),
                ..Default::default()
            }],
        }]);
        assert!(config
            .validate()
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.contains("ghost")));
    }

    #[test]
    fn test_zero_timeout_is_a_warning() {
        let config = config_with(vec![FilePhase {
            name: "discovery".to_string(),
            depends_on: vec![],
            tasks: vec![FileTask {
                agent: "ticket-miner".to_string(),
                timeout_secs: 0,
                max_retries: 1,
            }],
        }]);
        let issues = config.validate();
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_to_plan_preserves_structure() {
        let config = config_with(vec![
            FilePhase {
                name: "discovery".to_string(),
                depends_on: vec![],
                tasks: vec![FileTask {
                    agent: "ticket-miner".to_string(),
                    timeout_secs: 45,
                    max_retries: 2,
                }],
            },
            FilePhase {
                name: "analysis".to_string(),
                depends_on: vec!["discovery".to_string()],
                tasks: vec![FileTask {
                    agent: "diff-analyzer".to_string(),
                    ..Default::default()
                }],
            },
        ]);

        let plan = config.to_plan().unwrap();
        assert_eq!(plan.phases().len(), 2);
        let task = &plan.get("discovery").unwrap().tasks[0];
        assert_eq!(task.agent_kind, "ticket-miner");
        assert_eq!(task.timeout_secs, 45);
        assert_eq!(task.retry.max_retries, 2);
    }

    #[test]
    fn test_to_plan_rejects_cycles() {
        let config = config_with(vec![
            FilePhase {
                name: "a".to_string(),
                depends_on: vec!["b".to_string()],
                tasks: vec![],
            },
            FilePhase {
                name: "b".to_string(),
                depends_on: vec!["a".to_string()],
                tasks: vec![],
            },
        ]);
        assert!(config.to_plan().is_err());
    }
}
