//! Configuration loading and file format

pub mod file_config;
pub mod loader;

pub use file_config::{
    ConfigIssue, FileConfig, FileObservabilityConfig, FilePipelineConfig, FilePolicyConfig,
    FileResolutionConfig, FileSessionConfig, Severity,
};
pub use loader::ConfigLoader;
