//! Context types: namespaced facts and versioned snapshots

pub mod entities;
pub mod merge;
pub mod value_objects;

pub use entities::{ContextEntry, ContextSnapshot, Provenance};
pub use merge::{merge, MergeOutcome};
pub use value_objects::{ContextValue, SemanticKey};
