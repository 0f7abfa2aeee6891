//! Investigator adapters

pub mod scripted;

pub use scripted::{load_fixture, FixtureError, ScriptedInvestigator};
