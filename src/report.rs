//! Structured audit events and the sink boundary.
//!
//! One event per request: an execution report on completion (pass or fail),
//! or a failure report when the call itself could not be carried out. Sink
//! failures are logged by the caller, never re-thrown, so reporting can
//! never mask the real result.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::publish::MessageId;

#[derive(Debug, Clone, Serialize)]
pub struct ParameterRow {
    pub name: String,
    pub value: String,
}

/// Outcome of a remote command that ran to a result.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub name: String,
    /// `command` or `script`.
    pub kind: &'static str,
    pub success: bool,
    pub command: String,
    pub parameters: Vec<ParameterRow>,
    pub output: Option<String>,
    pub error_output: String,
    pub exit_status: Option<i32>,
    pub interrupted: bool,
    /// Present only for script executions with source attachment enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A request that could not be completed.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub name: String,
    pub execution_alias: String,
    pub parameters: Vec<ParameterRow>,
    pub error: String,
    /// Source-error chain, outermost first; empty when the reporting
    /// configuration disables it.
    pub causes: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Execution(ExecutionReport),
    Failure(FailureReport),
}

/// Boundary to the external reporting collaborator.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> anyhow::Result<()>;
}

/// Default sink: emits events through `tracing` as structured JSON.
pub struct LogAuditSink {
    root_name: String,
}

impl LogAuditSink {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
        }
    }
}

impl AuditSink for LogAuditSink {
    fn record(&self, event: AuditEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&event)?;
        match &event {
            AuditEvent::Execution(report) if report.success => {
                info!(root = %self.root_name, %payload, "execution report");
            }
            AuditEvent::Execution(_) | AuditEvent::Failure(_) => {
                error!(root = %self.root_name, %payload, "execution failure report");
            }
        }
        Ok(())
    }
}

/// Flattens an error into its chain of causes, outermost first.
pub fn error_chain(error: &dyn std::error::Error) -> Vec<String> {
    let mut causes = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn error_chain_walks_sources() {
        let inner = io::Error::new(io::ErrorKind::TimedOut, "socket timed out");
        let outer = crate::error::ExecuteError::Read { source: inner };
        let chain = error_chain(&outer);
        assert_eq!(chain.len(), 2);
        assert!(chain[0].contains("stream read failed"));
        assert_eq!(chain[1], "socket timed out");
    }
}
