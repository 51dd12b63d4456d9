//! Service layer for deployment orchestration
//!
//! This module contains the orchestrator that sequences builds and
//! deployment tool calls, separating that logic from the CLI layer in main.rs.

pub mod orchestrator;


pub use orchestrator::{locate_tool, next_run_suffix, Orchestrator, OrchestratorError};
