//! Observability configuration (`[observability]` section)

use serde::{Deserialize, Serialize};

/// Observability sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileObservabilityConfig {
    /// JSONL event log path; empty disables the sink
    pub events_path: String,
}

impl Default for FileObservabilityConfig {
    fn default() -> Self {
        Self {
            events_path: ".inquest/events.jsonl".to_string(),
        }
    }
}

impl FileObservabilityConfig {
    pub fn is_enabled(&self) -> bool {
        !self.events_path.is_empty()
    }
}
