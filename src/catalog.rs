//! Immutable alias catalog built once from configuration.
//!
//! All lookups are case-insensitive; collision checking happens during
//! configuration validation, so construction here cannot fail beyond what
//! `ConnectorConfig::validate` already rejects.

use std::collections::HashMap;

use crate::config::{ConnectorConfig, EndpointConfig, ExecutionConfig};
use crate::error::{ConfigError, ExecuteError};

#[derive(Debug)]
pub struct ExecutionCatalog {
    executions: HashMap<String, ExecutionConfig>,
    endpoints: HashMap<String, EndpointConfig>,
    endpoint_order: Vec<String>,
}

impl ExecutionCatalog {
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let executions = config
            .executions
            .iter()
            .map(|e| (e.alias().to_lowercase(), e.clone()))
            .collect();
        let endpoints = config
            .endpoints
            .iter()
            .map(|e| (e.alias.to_lowercase(), e.clone()))
            .collect();
        let endpoint_order = config.endpoints.iter().map(|e| e.alias.clone()).collect();
        Ok(Self {
            executions,
            endpoints,
            endpoint_order,
        })
    }

    pub fn resolve_execution(&self, alias: &str) -> Result<&ExecutionConfig, ExecuteError> {
        if alias.trim().is_empty() {
            return Err(ExecuteError::BlankAlias);
        }
        self.executions
            .get(&alias.to_lowercase())
            .ok_or_else(|| ExecuteError::UnknownExecution {
                alias: alias.to_string(),
            })
    }

    /// Resolves an endpoint by alias. When no alias is given, exactly one
    /// endpoint must be configured.
    pub fn resolve_endpoint(&self, alias: Option<&str>) -> Result<&EndpointConfig, ExecuteError> {
        match alias {
            Some(alias) => {
                self.endpoints
                    .get(&alias.to_lowercase())
                    .ok_or_else(|| ExecuteError::UnknownEndpoint {
                        alias: alias.to_string(),
                    })
            }
            None => {
                if self.endpoint_order.len() == 1 {
                    Ok(&self.endpoints[&self.endpoint_order[0].to_lowercase()])
                } else {
                    Err(ExecuteError::AmbiguousEndpoint {
                        aliases: self.endpoint_order.clone(),
                    })
                }
            }
        }
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointConfig> {
        self.endpoints.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandExecution, PublicationConfig, ReportingConfig};

    fn endpoint(alias: &str) -> EndpointConfig {
        EndpointConfig {
            alias: alias.to_string(),
            host: "host.example".to_string(),
            username: "deploy".to_string(),
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

    fn catalog(endpoints: Vec<EndpointConfig>, executions: Vec<ExecutionConfig>) -> ExecutionCatalog {
        ExecutionCatalog::from_config(&ConnectorConfig {
            endpoints,
            executions,
            publication: PublicationConfig::default(),
            reporting: ReportingConfig::default(),
        })
        .unwrap()
    }

    #[test]
    fn resolves_execution_case_insensitively() {
        let catalog = catalog(vec![endpoint("main")], vec![command("Uptime-Check")]);
        assert_eq!(
            catalog.resolve_execution("UPTIME-check").unwrap().alias(),
            "Uptime-Check"
        );
    }

    #[test]
    fn unknown_execution_alias_is_an_error() {
        let catalog = catalog(vec![endpoint("main")], vec![command("uptime")]);
        assert!(matches!(
            catalog.resolve_execution("reboot"),
            Err(ExecuteError::UnknownExecution { .. })
        ));
    }

    #[test]
    fn blank_execution_alias_is_an_error() {
        let catalog = catalog(vec![endpoint("main")], vec![command("uptime")]);
        assert!(matches!(
            catalog.resolve_execution("   "),
            Err(ExecuteError::BlankAlias)
        ));
    }

    #[test]
    fn absent_endpoint_alias_resolves_the_single_endpoint() {
        let catalog = catalog(vec![endpoint("main")], vec![command("uptime")]);
        assert_eq!(catalog.resolve_endpoint(None).unwrap().alias, "main");
    }

    #[test]
    fn absent_endpoint_alias_is_ambiguous_with_multiple_endpoints() {
        let catalog = catalog(
            vec![endpoint("primary"), endpoint("backup")],
            vec![command("uptime")],
        );
        match catalog.resolve_endpoint(None) {
            Err(ExecuteError::AmbiguousEndpoint { aliases }) => {
                assert_eq!(aliases, vec!["primary", "backup"]);
            }
            other => panic!("expected ambiguous endpoint, got {other:?}"),
        }
    }

    #[test]
    fn resolves_endpoint_case_insensitively() {
        let catalog = catalog(
            vec![endpoint("Primary"), endpoint("backup")],
            vec![command("uptime")],
        );
        assert_eq!(
            catalog.resolve_endpoint(Some("PRIMARY")).unwrap().alias,
            "Primary"
        );
        assert!(matches!(
            catalog.resolve_endpoint(Some("missing")),
            Err(ExecuteError::UnknownEndpoint { .. })
        ));
    }
}
