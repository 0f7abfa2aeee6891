//! Session lease configuration (`[session]` section)

use serde::{Deserialize, Serialize};

/// Session lease configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Lease duration; an expired lease lets a new session reclaim the job
    pub lease_timeout_secs: u64,
    /// Renewal interval used by the running scheduler
    pub heartbeat_secs: u64,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        Self {
            lease_timeout_secs: 120,
            heartbeat_secs: 5,
        }
    }
}
