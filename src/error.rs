//! Error taxonomy: startup-fatal configuration errors and per-request
//! execution errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that reject a configuration at startup. None of these are
/// recoverable at runtime; the process refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON configuration: {reason}")]
    InvalidJson { reason: String },

    #[error("invalid YAML configuration: {reason}")]
    InvalidYaml { reason: String },

    #[error("configuration is neither valid JSON nor valid YAML")]
    UnknownFormat,

    #[error("at least one execution must be configured")]
    NoExecutions,

    #[error("{kind} alias must not be blank")]
    BlankAlias { kind: &'static str },

    #[error("{kind} aliases are case-insensitive; collisions found: {aliases:?}")]
    AliasCollision {
        kind: &'static str,
        aliases: Vec<String>,
    },

    #[error("endpoint {alias}: exactly one of password or private_key_path must be set")]
    InvalidCredentials { alias: String },

    #[error("endpoint {alias}: {reason}")]
    InvalidEndpoint { alias: String, reason: String },

    #[error("publication is enabled but destination is still the placeholder; set publication.destination")]
    PublicationDestinationUnset,
}

/// Errors surfaced to the caller for a single execution request.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("unknown execution alias: {alias}")]
    UnknownExecution { alias: String },

    #[error("execution alias must not be blank")]
    BlankAlias,

    #[error("unknown endpoint alias: {alias}")]
    UnknownEndpoint { alias: String },

    #[error("explicitly define the endpoint alias; more than one endpoint is configured: {aliases:?}")]
    AmbiguousEndpoint { aliases: Vec<String> },

    #[error("undefined parameter ${{{name}}} in template: {template}")]
    UndefinedParameter { name: String, template: String },

    #[error("connection to {host}:{port} timed out after {timeout_ms} ms")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout_ms: u64,
    },

    #[error("connection to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH handshake with {host}:{port} failed: {source}")]
    Handshake {
        host: String,
        port: u16,
        #[source]
        source: ssh2::Error,
    },

    #[error("authentication for {username}@{host} timed out after {timeout_ms} ms")]
    AuthTimeout {
        username: String,
        host: String,
        timeout_ms: u64,
    },

    #[error("authentication for {username}@{host} failed: {source}")]
    Auth {
        username: String,
        host: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("command did not complete within {timeout_ms} ms: {command}")]
    ExecutionTimeout { command: String, timeout_ms: u64 },

    #[error("no exit status returned for command: {command}")]
    MissingExitStatus {
        command: String,
        #[source]
        source: ssh2::Error,
    },

    #[error("script transfer failed for {path}: {source}")]
    ScriptTransfer {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("channel operation failed: {source}")]
    Channel {
        #[source]
        source: ssh2::Error,
    },

    #[error("stream read failed: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    #[error("execution worker task failed: {source}")]
    Task {
        #[source]
        source: tokio::task::JoinError,
    },
}
