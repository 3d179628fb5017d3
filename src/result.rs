//! Execution results: the shared command payload plus the command/script
//! variants. Variant dispatch happens only at the reporting boundary.

/// Outcome of one remote command run.
///
/// Exit status and the interrupted state are mutually exclusive: a result
/// with no exit status is one whose timeout was tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The concrete command line that was executed, after substitution.
    pub command: String,
    /// Captured stdout; `None` when capture was disabled for the execution.
    pub output: Option<String>,
    /// Captured stderr; always captured.
    pub error_output: String,
    /// Exit status for normal completion; `None` when the run was
    /// interrupted by a tolerated timeout.
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    pub fn is_interrupted(&self) -> bool {
        self.exit_status.is_none()
    }

    pub fn is_success(&self) -> bool {
        (self.exit_status == Some(0) || self.is_interrupted()) && self.error_output.is_empty()
    }
}

/// Command or script execution result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Command(CommandOutput),
    Script {
        /// Fetched script source; `None` when attachment was disabled.
        script: Option<String>,
        output: CommandOutput,
    },
}

impl ExecutionOutcome {
    pub fn output(&self) -> &CommandOutput {
        match self {
            ExecutionOutcome::Command(output) => output,
            ExecutionOutcome::Script { output, .. } => output,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionOutcome::Command(_) => "command",
            ExecutionOutcome::Script { .. } => "script",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_status: Option<i32>, error_output: &str) -> CommandOutput {
        CommandOutput {
            command: "uptime".to_string(),
            output: Some("up 3 days".to_string()),
            error_output: error_output.to_string(),
            exit_status,
        }
    }

    #[test]
    fn zero_exit_with_empty_stderr_is_success() {
        assert!(output(Some(0), "").is_success());
        assert!(!output(Some(0), "").is_interrupted());
    }

    #[test]
    fn nonzero_exit_is_failure() {
        assert!(!output(Some(2), "").is_success());
    }

    #[test]
    fn zero_exit_with_stderr_is_failure() {
        assert!(!output(Some(0), "warning: disk full").is_success());
    }

    #[test]
    fn interrupted_run_is_success_iff_stderr_empty() {
        assert!(output(None, "").is_interrupted());
        assert!(output(None, "").is_success());
        assert!(!output(None, "boom").is_success());
    }
}
