//! Session orchestration: one SSH session per execution request.
//!
//! The `ssh2` calls are blocking, so each request runs on its own blocking
//! worker. Connection, authentication and command-wait all carry explicit
//! timeouts; the session and channel are released on every exit path.

mod exec;
mod scp;
mod session;

pub use exec::ExecPolicy;
pub use scp::fetch_script;
pub use session::SessionHandle;

use std::sync::Arc;

use tracing::debug;

use crate::config::{EndpointConfig, ExecutionConfig};
use crate::credentials::CredentialSelector;
use crate::error::ExecuteError;
use crate::result::ExecutionOutcome;

pub struct SshConnector {
    credentials: Arc<CredentialSelector>,
}

impl SshConnector {
    pub fn new(credentials: CredentialSelector) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }

    /// Runs one rendered command (or script invocation) against `endpoint`.
    pub async fn execute(
        &self,
        execution: &ExecutionConfig,
        endpoint: &EndpointConfig,
        command: String,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let execution = execution.clone();
        let endpoint = endpoint.clone();
        let credentials = Arc::clone(&self.credentials);
        tokio::task::spawn_blocking(move || {
            execute_blocking(&execution, &endpoint, &credentials, command)
        })
        .await
        .map_err(|source| ExecuteError::Task { source })?
    }
}

fn execute_blocking(
    execution: &ExecutionConfig,
    endpoint: &EndpointConfig,
    credentials: &CredentialSelector,
    command: String,
) -> Result<ExecutionOutcome, ExecuteError> {
    let handle = SessionHandle::open(endpoint, credentials)?;

    // For scripts the source is fetched before execution so the audit record
    // matches what actually ran.
    let script = match execution {
        ExecutionConfig::Script(script) if script.add_script_to_report => {
            Some(fetch_script(handle.session(), &script.script_path)?)
        }
        _ => None,
    };

    debug!(command = %command, host = %endpoint.host, "executing command");
    let policy = ExecPolicy {
        capture_output: execution.add_output_to_response(),
        timeout_ms: execution.timeout_ms(),
        interrupt_on_timeout: execution.interrupt_on_timeout(),
    };
    let output = exec::run_command(handle.session(), &command, &policy)?;
    debug!(exit_status = ?output.exit_status, "command finished");

    handle.close();

    Ok(match execution {
        ExecutionConfig::Command(_) => ExecutionOutcome::Command(output),
        ExecutionConfig::Script(_) => ExecutionOutcome::Script { script, output },
    })
}
