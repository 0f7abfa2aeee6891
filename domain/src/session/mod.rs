//! Execution session types

pub mod entities;

pub use entities::{ExecutionSession, HaltReason, SessionId, SessionStatus};
