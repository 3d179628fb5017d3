//! Request boundary: resolves aliases, renders the command, runs it,
//! optionally publishes the output, and reports to the audit sink.
//!
//! Every per-request error is caught here, reported as a failure event, and
//! returned to the caller; a failing audit write is logged and swallowed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::catalog::ExecutionCatalog;
use crate::config::ConnectorConfig;
use crate::credentials::CredentialSelector;
use crate::error::{ConfigError, ExecuteError};
use crate::publish::{MessageId, MessagePublisher, MessageStream};
use crate::report::{
    error_chain, AuditEvent, AuditSink, ExecutionReport, FailureReport, ParameterRow,
};
use crate::result::ExecutionOutcome;
use crate::ssh::SshConnector;
use crate::template;

/// One inbound execution request from the transport collaborator.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub execution_alias: String,
    /// Optional; with more than one endpoint configured it must be given.
    pub endpoint_alias: Option<String>,
    pub parameters: HashMap<String, String>,
}

/// Caller-visible result of a completed execution.
#[derive(Debug, Clone)]
pub struct ExecutionResponse {
    pub output: Option<String>,
    pub error_output: String,
    pub exit_status: Option<i32>,
    pub interrupted: bool,
    pub success: bool,
}

pub struct ExecutionService {
    catalog: ExecutionCatalog,
    connector: SshConnector,
    publisher: MessagePublisher,
    sink: Arc<dyn AuditSink>,
    add_error_chain: bool,
}

impl ExecutionService {
    pub fn new(
        config: &ConnectorConfig,
        stream: Arc<dyn MessageStream>,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        let catalog = ExecutionCatalog::from_config(config)?;
        let credentials = CredentialSelector::from_endpoints(config.endpoints.iter());
        Ok(Self {
            catalog,
            connector: SshConnector::new(credentials),
            publisher: MessagePublisher::new(stream, config.publication.clone()),
            sink,
            add_error_chain: config.reporting.add_error_chain,
        })
    }

    /// Handles one request end to end. The error is also reported to the
    /// audit sink before it is returned.
    pub async fn handle(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResponse, ExecuteError> {
        let started_at = Utc::now();
        debug!(alias = %request.execution_alias, "processing execution request");
        match self.execute(&request).await {
            Ok((outcome, message_id)) => {
                let response = response_from(&outcome);
                self.report_execution(&request, &outcome, message_id, started_at);
                Ok(response)
            }
            Err(err) => {
                error!(alias = %request.execution_alias, error = %err, "cannot process request");
                self.report_failure(&request, &err, started_at);
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<(ExecutionOutcome, Option<MessageId>), ExecuteError> {
        let execution = self.catalog.resolve_execution(&request.execution_alias)?;
        let endpoint_alias = request
            .endpoint_alias
            .as_deref()
            .filter(|alias| !alias.trim().is_empty());
        let endpoint = self.catalog.resolve_endpoint(endpoint_alias)?;
        let command = template::render(
            &execution.command_template(),
            execution.default_parameters(),
            &request.parameters,
        )?;
        let outcome = self.connector.execute(execution, endpoint, command).await?;
        let message_id = outcome.output().output.as_deref().and_then(|output| {
            self.publisher
                .publish(output, execution, &request.parameters, &endpoint.alias)
        });
        Ok((outcome, message_id))
    }

    fn report_execution(
        &self,
        request: &ExecutionRequest,
        outcome: &ExecutionOutcome,
        message_id: Option<MessageId>,
        started_at: DateTime<Utc>,
    ) {
        let output = outcome.output();
        let script_content = match outcome {
            ExecutionOutcome::Command(_) => None,
            ExecutionOutcome::Script { script, .. } => script.clone(),
        };
        let report = ExecutionReport {
            name: format!("Execution result for {}", output.command),
            kind: outcome.kind(),
            success: output.is_success(),
            command: output.command.clone(),
            parameters: parameter_rows(&request.parameters),
            output: output.output.clone(),
            error_output: output.error_output.clone(),
            exit_status: output.exit_status,
            interrupted: output.is_interrupted(),
            script_content,
            message_id,
            started_at,
            finished_at: Utc::now(),
        };
        if let Err(err) = self.sink.record(AuditEvent::Execution(report)) {
            error!(
                command = %output.command,
                error = %err,
                "cannot report execution result"
            );
        }
    }

    fn report_failure(
        &self,
        request: &ExecutionRequest,
        failure: &ExecuteError,
        started_at: DateTime<Utc>,
    ) {
        let causes = if self.add_error_chain {
            error_chain(failure)
        } else {
            Vec::new()
        };
        let report = FailureReport {
            name: format!("{} call failed", request.execution_alias),
            execution_alias: request.execution_alias.clone(),
            parameters: parameter_rows(&request.parameters),
            error: failure.to_string(),
            causes,
            started_at,
            finished_at: Utc::now(),
        };
        if let Err(err) = self.sink.record(AuditEvent::Failure(report)) {
            error!(
                alias = %request.execution_alias,
                error = %err,
                "cannot report request failure"
            );
        }
    }
}

fn response_from(outcome: &ExecutionOutcome) -> ExecutionResponse {
    let output = outcome.output();
    ExecutionResponse {
        output: output.output.clone(),
        error_output: output.error_output.clone(),
        exit_status: output.exit_status,
        interrupted: output.is_interrupted(),
        success: output.is_success(),
    }
}

fn parameter_rows(parameters: &HashMap<String, String>) -> Vec<ParameterRow> {
    let mut rows: Vec<ParameterRow> = parameters
        .iter()
        .map(|(name, value)| ParameterRow {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}
