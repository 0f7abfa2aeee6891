//! Scripted (fixture-replay) investigator
//!
//! Replays findings and evidence from a JSON fixture, keyed by agent
//! kind. This is what lets a full pipeline (CLI included) run end to end
//! without a ticket tracker, documentation index or live cluster behind
//! it. Real investigators implement the same port against real sources.
//!
//! Fixture format:
//!
//! ```json
//! {
//!   "agents": {
//!     "ticket-miner": {
//!       "confidence": 0.9,
//!       "findings": [
//!         { "key": "ticket.targetVersion", "value": { "type": "text", "value": "2.15" } }
//!       ],
//!       "evidence": [
//!         {
//!           "claim": "target version pinned to 2.15",
//!           "key": "ticket.targetVersion",
//!           "kind": "documentation",
//!           "artifact_ref": "OPS-1431"
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```

use async_trait::async_trait;
use inquest_application::ports::investigator::{
    InvestigationInput, InvestigationReport, Investigator, InvestigatorError,
};
use inquest_domain::{ContextEntry, ContextValue, EvidenceDraft, EvidenceKind, SemanticKey};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors loading a fixture file.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("could not read fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureFinding {
    key: SemanticKey,
    value: ContextValue,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureEvidence {
    claim: String,
    key: SemanticKey,
    kind: EvidenceKind,
    #[serde(default)]
    artifact_ref: String,
}

/// Scripted behavior of one agent kind.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentScript {
    #[serde(default)]
    findings: Vec<FixtureFinding>,
    #[serde(default)]
    evidence: Vec<FixtureEvidence>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct FixtureFile {
    agents: BTreeMap<String, AgentScript>,
}

/// Investigator that replays a fixture script.
pub struct ScriptedInvestigator {
    kind: String,
    script: AgentScript,
}

impl ScriptedInvestigator {
    pub fn new(kind: impl Into<String>, script: AgentScript) -> Self {
        Self {
            kind: kind.into(),
            script,
        }
    }
}

#[async_trait]
impl Investigator for ScriptedInvestigator {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn investigate(
        &self,
        _input: InvestigationInput,
    ) -> Result<InvestigationReport, InvestigatorError> {
        let findings = self
            .script
            .findings
            .iter()
            .map(|f| {
                ContextEntry::new(f.key.clone(), f.value.clone(), &self.kind)
                    .with_confidence(f.confidence)
            })
            .collect();
        let evidence = self
            .script
            .evidence
            .iter()
            .map(|e| EvidenceDraft::new(&e.claim, e.key.clone(), &e.artifact_ref, e.kind))
            .collect();
        Ok(InvestigationReport::done(findings, evidence).with_confidence(self.script.confidence))
    }
}

/// Load every agent script from a fixture file.
pub fn load_fixture(path: impl AsRef<Path>) -> Result<Vec<ScriptedInvestigator>, FixtureError> {
    let content = std::fs::read_to_string(path)?;
    let fixture: FixtureFile = serde_json::from_str(&content)?;
    Ok(fixture
        .agents
        .into_iter()
        .map(|(kind, script)| ScriptedInvestigator::new(kind, script))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inquest_application::context_store::InterimBoard;
    use inquest_domain::ContextSnapshot;
    use std::io::Write;

    fn input() -> InvestigationInput {
        InvestigationInput {
            job_key: "OPS-1431".to_string(),
            params: BTreeMap::new(),
            snapshot: ContextSnapshot::empty(),
            interim: InterimBoard::new(),
        }
    }

    const FIXTURE: &str = r#"
{
  "agents": {
    "ticket-miner": {
      "confidence": 0.9,
      "findings": [
        { "key": "ticket.targetVersion", "value": { "type": "text", "value": "2.15" } },
        { "key": "ticket.owner", "value": { "type": "text", "value": "infra" }, "confidence": 0.7 }
      ],
      "evidence": [
        {
          "claim": "target version pinned to 2.15",
          "key": "ticket.targetVersion",
          "kind": "documentation",
          "artifact_ref": "OPS-1431"
        }
      ]
    },
    "cluster-probe": {
      "findings": [
        { "key": "env.status", "value": { "type": "flag", "value": true } }
      ]
    }
  }
}
"#;

    #[tokio::test]
    async fn test_load_fixture_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let investigators = load_fixture(&path).unwrap();
        assert_eq!(investigators.len(), 2);

        let miner = investigators
            .iter()
            .find(|i| i.kind() == "ticket-miner")
            .unwrap();
        let report = miner.investigate(input()).await.unwrap();
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.evidence.len(), 1);
        assert_eq!(report.confidence, 0.9);

        let owner = report
            .findings
            .iter()
            .find(|f| f.key.name() == "owner")
            .unwrap();
        assert_eq!(owner.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_defaults_for_sparse_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let investigators = load_fixture(&path).unwrap();
        let probe = investigators
            .iter()
            .find(|i| i.kind() == "cluster-probe")
            .unwrap();
        let report = probe.investigate(input()).await.unwrap();
        assert_eq!(report.confidence, 1.0);
        assert!(report.evidence.is_empty());
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = load_fixture("/nonexistent/agents.json");
        assert!(matches!(result, Err(FixtureError::Io(_))));
    }

    #[test]
    fn test_malformed_fixture_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_fixture(&path), Err(FixtureError::Parse(_))));
    }
}
