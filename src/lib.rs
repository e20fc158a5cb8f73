//! ScrapeFlow - workflow configuration model for visual scraping workflows
//!
//! This library provides the core of the ScrapeFlow editor:
//! - A typed model of scopes, repeaters, steps and before actions
//! - Functional tree operations and node factories
//! - Structural validation of complete workflows
//! - Compilation into flat (legacy) and nested worker contracts

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod utils;
pub mod workflow;

// Re-export main types for convenience
pub use crate::config::AppConfig;
pub use crate::error::{WorkflowError, WorkflowResult};
pub use crate::export::{compile, CompiledContract, ContractCompiler, ContractVersion};
pub use crate::workflow::{ScrapingWorkflow, ValidationReport};
