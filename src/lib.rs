//! Remex - remote execution connector
//!
//! Executes named, pre-configured shell commands and scripts on remote hosts
//! over SSH. Callers never supply raw commands: a request carries an alias
//! plus named parameters that are substituted into a validated template, and
//! gets back the captured output, error stream and exit status.

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod publish;
pub mod report;
pub mod result;
pub mod service;
pub mod ssh;
pub mod template;

pub use catalog::ExecutionCatalog;
pub use config::{load_config, ConnectorConfig};
pub use error::{ConfigError, ExecuteError};
pub use result::{CommandOutput, ExecutionOutcome};
pub use service::{ExecutionRequest, ExecutionResponse, ExecutionService};
