//! JSONL file writer for pipeline events.
//!
//! Each [`PipelineEvent`] is serialized as a single JSON line with an
//! `event` field and `timestamp`, appended to the file via a buffered
//! writer. The sink is strictly read-only with respect to execution:
//! write failures are swallowed so a full disk can never stall the
//! scheduler.

use inquest_application::ports::observer::{PipelineEvent, PipelineObserver};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL event sink that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlEventSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventSink {
    /// Create a new sink writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PipelineObserver for JsonlEventSink {
    fn record(&self, event: PipelineEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // The event enum serializes to an object tagged with `event`;
        // add the timestamp alongside it
        let record = match serde_json::to_value(&event) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.insert(
                    "timestamp".to_string(),
                    serde_json::Value::String(timestamp),
                );
                serde_json::Value::Object(map)
            }
            Ok(other) => serde_json::json!({
                "event": "unknown",
                "timestamp": timestamp,
                "data": other,
            }),
            Err(_) => return,
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            // Flushed per line; a crash loses at most the in-flight event
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
