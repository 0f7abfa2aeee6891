//! Application layer for inquest
//!
//! This crate contains the pipeline use cases, port definitions, and the
//! serialized-writer context store. It depends only on the domain layer.

pub mod context_store;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use context_store::{ContextFlowEntry, ContextStore, InterimBoard};
pub use ports::{
    artifact_sink::{ArtifactSink, CollectingSink, NoSink},
    assessor::{Assessor, NeutralAssessor},
    investigator::{
        InvestigationInput, InvestigationReport, Investigator, InvestigatorError, ReportStatus,
    },
    observer::{NoObserver, PipelineEvent, PipelineObserver},
    registry::{ExecutionRegistry, RegistryError},
};
pub use use_cases::run_pipeline::{
    PipelineOutcome, RunPipelineError, RunPipelineInput, RunPipelineUseCase,
};
pub use use_cases::status::{SessionTracker, SessionView};
