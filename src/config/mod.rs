//! Connector configuration: endpoints, executions, publication and
//! reporting defaults. Built once at startup; validated fail-fast.

pub mod loader;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use loader::{load_config, parse_config, ConfigFormat};

/// Placeholder destination shipped as the publication default. Enabling
/// publication without overriding it is a startup error.
pub const DESTINATION_PLACEHOLDER: &str = "<unset>";

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    22
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_destination() -> String {
    DESTINATION_PLACEHOLDER.to_string()
}

fn default_root_name() -> String {
    "remex".to_string()
}

/// A remote host plus credentials and connection timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub alias: String,
    pub host: String,
    pub username: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    #[serde(default = "default_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub auth_timeout_ms: u64,
}

impl EndpointConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.alias.trim().is_empty() {
            return Err(ConfigError::BlankAlias { kind: "endpoint" });
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                alias: self.alias.clone(),
                reason: "host must not be blank".to_string(),
            });
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                alias: self.alias.clone(),
                reason: "username must not be blank".to_string(),
            });
        }
        if self.password.is_some() == self.private_key_path.is_some() {
            return Err(ConfigError::InvalidCredentials {
                alias: self.alias.clone(),
            });
        }
        Ok(())
    }
}

/// A configured command or script template plus its execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionConfig {
    Command(CommandExecution),
    Script(ScriptExecution),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandExecution {
    pub alias: String,
    pub command: String,
    #[serde(default)]
    pub default_parameters: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub add_output_to_response: bool,
    pub timeout_ms: u64,
    #[serde(default)]
    pub interrupt_on_timeout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<PublicationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptExecution {
    pub alias: String,
    pub script_path: String,
    #[serde(default)]
    pub options: String,
    #[serde(default = "default_true")]
    pub add_script_to_report: bool,
    #[serde(default)]
    pub default_parameters: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub add_output_to_response: bool,
    pub timeout_ms: u64,
    #[serde(default)]
    pub interrupt_on_timeout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<PublicationConfig>,
}

impl ExecutionConfig {
    pub fn alias(&self) -> &str {
        match self {
            ExecutionConfig::Command(c) => &c.alias,
            ExecutionConfig::Script(s) => &s.alias,
        }
    }

    /// The command-line template; for scripts, the script path plus options.
    pub fn command_template(&self) -> String {
        match self {
            ExecutionConfig::Command(c) => c.command.clone(),
            ExecutionConfig::Script(s) => {
                if s.options.trim().is_empty() {
                    s.script_path.clone()
                } else {
                    format!("{} {}", s.script_path, s.options)
                }
            }
        }
    }

    pub fn default_parameters(&self) -> &HashMap<String, String> {
        match self {
            ExecutionConfig::Command(c) => &c.default_parameters,
            ExecutionConfig::Script(s) => &s.default_parameters,
        }
    }

    pub fn add_output_to_response(&self) -> bool {
        match self {
            ExecutionConfig::Command(c) => c.add_output_to_response,
            ExecutionConfig::Script(s) => s.add_output_to_response,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        match self {
            ExecutionConfig::Command(c) => c.timeout_ms,
            ExecutionConfig::Script(s) => s.timeout_ms,
        }
    }

    pub fn interrupt_on_timeout(&self) -> bool {
        match self {
            ExecutionConfig::Command(c) => c.interrupt_on_timeout,
            ExecutionConfig::Script(s) => s.interrupt_on_timeout,
        }
    }

    pub fn publication(&self) -> Option<&PublicationConfig> {
        match self {
            ExecutionConfig::Command(c) => c.publication.as_ref(),
            ExecutionConfig::Script(s) => s.publication.as_ref(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.alias().trim().is_empty() {
            return Err(ConfigError::BlankAlias { kind: "execution" });
        }
        Ok(())
    }
}

/// Whether captured output is re-emitted to the outbound message stream,
/// and under which destination alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_destination")]
    pub destination: String,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: default_destination(),
        }
    }
}

impl PublicationConfig {
    pub fn has_destination(&self) -> bool {
        self.destination != DESTINATION_PLACEHOLDER && !self.destination.trim().is_empty()
    }
}

/// Controls the shape of audit events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingConfig {
    #[serde(default = "default_root_name")]
    pub root_name: String,
    #[serde(default = "default_true")]
    pub add_error_chain: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            root_name: default_root_name(),
            add_error_chain: true,
        }
    }
}

/// Top-level configuration surface consumed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorConfig {
    pub endpoints: Vec<EndpointConfig>,
    pub executions: Vec<ExecutionConfig>,
    #[serde(default)]
    pub publication: PublicationConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

impl ConnectorConfig {
    /// Fail-fast validation. A configuration that passes here is immutable
    /// for the life of the process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executions.is_empty() {
            return Err(ConfigError::NoExecutions);
        }
        for execution in &self.executions {
            execution.validate()?;
        }
        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }
        check_collisions(
            "execution",
            self.executions.iter().map(|e| e.alias().to_string()),
        )?;
        check_collisions("endpoint", self.endpoints.iter().map(|e| e.alias.clone()))?;
        if self.publication.enabled && !self.publication.has_destination() {
            return Err(ConfigError::PublicationDestinationUnset);
        }
        for execution in &self.executions {
            if let Some(publication) = execution.publication() {
                if publication.enabled
                    && publication.destination != DESTINATION_PLACEHOLDER
                    && publication.destination.trim().is_empty()
                {
                    return Err(ConfigError::PublicationDestinationUnset);
                }
            }
        }
        Ok(())
    }
}

fn check_collisions(
    kind: &'static str,
    aliases: impl Iterator<Item = String>,
) -> Result<(), ConfigError> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut collisions = Vec::new();
    for alias in aliases {
        let key = alias.to_lowercase();
        if let Some(previous) = seen.insert(key, alias.clone()) {
            collisions.push(previous);
            collisions.push(alias);
        }
    }
    if collisions.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::AliasCollision {
            kind,
            aliases: collisions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(alias: &str) -> EndpointConfig {
        EndpointConfig {
            alias: alias.to_string(),
            host: "host.example".to_string(),
            username: "user".to_string(),
            port: 22,
            password: Some("secret".to_string()),
            private_key_path: None,
            connection_timeout_ms: 1000,
            auth_timeout_ms: 1000,
        }
    }

    fn command(alias: &str) -> ExecutionConfig {
        ExecutionConfig::Command(CommandExecution {
            alias: alias.to_string(),
            command: "uptime".to_string(),
            default_parameters: HashMap::new(),
            add_output_to_response: true,
            timeout_ms: 100,
            interrupt_on_timeout: false,
            publication: None,
        })
    }

    fn config(endpoints: Vec<EndpointConfig>, executions: Vec<ExecutionConfig>) -> ConnectorConfig {
        ConnectorConfig {
            endpoints,
            executions,
            publication: PublicationConfig::default(),
            reporting: ReportingConfig::default(),
        }
    }

    #[test]
    fn accepts_minimal_valid_config() {
        let cfg = config(vec![endpoint("main")], vec![command("uptime")]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_execution_list() {
        let cfg = config(vec![endpoint("main")], vec![]);
        assert!(matches!(cfg.validate(), Err(ConfigError::NoExecutions)));
    }

    #[test]
    fn rejects_case_insensitive_execution_collisions() {
        let cfg = config(
            vec![endpoint("main")],
            vec![command("Uptime"), command("UPTIME")],
        );
        match cfg.validate() {
            Err(ConfigError::AliasCollision { kind, aliases }) => {
                assert_eq!(kind, "execution");
                assert!(aliases.contains(&"Uptime".to_string()));
                assert!(aliases.contains(&"UPTIME".to_string()));
            }
            other => panic!("expected collision error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_case_insensitive_endpoint_collisions() {
        let cfg = config(
            vec![endpoint("Main"), endpoint("MAIN")],
            vec![command("uptime")],
        );
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::AliasCollision {
                kind: "endpoint",
                ..
            })
        ));
    }

    #[test]
    fn rejects_blank_execution_alias() {
        let cfg = config(vec![endpoint("main")], vec![command("  ")]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BlankAlias { kind: "execution" })
        ));
    }

    #[test]
    fn rejects_endpoint_with_both_credentials() {
        let mut ep = endpoint("main");
        ep.private_key_path = Some(PathBuf::from("/keys/id_ed25519"));
        let cfg = config(vec![ep], vec![command("uptime")]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn rejects_endpoint_with_no_credentials() {
        let mut ep = endpoint("main");
        ep.password = None;
        let cfg = config(vec![ep], vec![command("uptime")]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn rejects_enabled_publication_with_placeholder_destination() {
        let mut cfg = config(vec![endpoint("main")], vec![command("uptime")]);
        cfg.publication.enabled = true;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PublicationDestinationUnset)
        ));
        cfg.publication.destination = "output-stream".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn script_template_includes_options_when_present() {
        let script = ExecutionConfig::Script(ScriptExecution {
            alias: "health".to_string(),
            script_path: "/opt/scripts/health.sh".to_string(),
            options: "--fast ${level}".to_string(),
            add_script_to_report: true,
            default_parameters: HashMap::new(),
            add_output_to_response: true,
            timeout_ms: 100,
            interrupt_on_timeout: false,
            publication: None,
        });
        assert_eq!(
            script.command_template(),
            "/opt/scripts/health.sh --fast ${level}"
        );
    }

    #[test]
    fn script_template_omits_blank_options() {
        let script = ExecutionConfig::Script(ScriptExecution {
            alias: "health".to_string(),
            script_path: "/opt/scripts/health.sh".to_string(),
            options: "  ".to_string(),
            add_script_to_report: true,
            default_parameters: HashMap::new(),
            add_output_to_response: true,
            timeout_ms: 100,
            interrupt_on_timeout: false,
            publication: None,
        });
        assert_eq!(script.command_template(), "/opt/scripts/health.sh");
    }
}
