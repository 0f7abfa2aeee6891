//! Artifact sink port
//!
//! The core emits the final structured artifact through this callback.
//! Rendering it into a human-readable report is out of scope here.

use inquest_domain::{Artifact, SessionId};
use std::sync::Mutex;

/// Receives the final artifact of a session.
pub trait ArtifactSink: Send + Sync {
    fn on_artifact(&self, session: &SessionId, artifact: &Artifact);
}

/// No-op sink for callers that read the artifact from the use case
/// return value instead.
pub struct NoSink;

impl ArtifactSink for NoSink {
    fn on_artifact(&self, _session: &SessionId, _artifact: &Artifact) {}
}

/// Sink that collects artifacts in memory, for tests and embedding.
#[derive(Default)]
pub struct CollectingSink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Artifact> {
        std::mem::take(&mut self.artifacts.lock().expect("sink lock poisoned"))
    }
}

impl ArtifactSink for CollectingSink {
    fn on_artifact(&self, _session: &SessionId, artifact: &Artifact) {
        if let Ok(mut artifacts) = self.artifacts.lock() {
            artifacts.push(artifact.clone());
        }
    }
}
