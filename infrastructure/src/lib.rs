//! Infrastructure layer for inquest
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer, plus configuration file loading.

pub mod assessor;
pub mod config;
pub mod investigators;
pub mod logging;
pub mod registry;

// Re-export commonly used types
pub use assessor::RuleBasedAssessor;
pub use config::{
    ConfigIssue, ConfigLoader, FileConfig, FilePipelineConfig, FileResolutionConfig, Severity,
};
pub use investigators::{FixtureError, ScriptedInvestigator};
pub use logging::JsonlEventSink;
pub use registry::InMemoryRegistry;
