//! Final artifact construction, gated on the evidence ledger

pub mod builder;
pub mod entities;

pub use builder::ArtifactBuilder;
pub use entities::{Artifact, ArtifactClaim, Assessment, Caveat, CaveatKind};
