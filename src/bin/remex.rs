use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use remex::config::load_config;
use remex::publish::{MessageStream, OutboundMessage};
use remex::report::LogAuditSink;
use remex::service::{ExecutionRequest, ExecutionService};

#[derive(Parser)]
#[command(name = "remex")]
#[command(about = "Remote execution connector for pre-configured SSH commands")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct RemexCli {
    /// Connector configuration file (JSON or YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and exit
    Validate,
    /// Run a configured execution once and print the result
    Run {
        /// Execution alias
        alias: String,

        /// Endpoint alias (required when more than one endpoint is configured)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Caller parameters as name=value pairs
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
    },
}

/// Logs published messages instead of forwarding them; the real outbound
/// stream lives in the embedding service.
struct LogMessageStream;

impl MessageStream for LogMessageStream {
    fn send(&self, message: &OutboundMessage) -> Result<()> {
        info!(
            destination = %message.id.destination,
            sequence = message.id.sequence,
            bytes = message.body.len(),
            "outbound message"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RemexCli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(&cli.config)
        .with_context(|| format!("invalid configuration: {}", cli.config.display()))?;

    match cli.command {
        Command::Validate => {
            println!(
                "configuration OK: {} endpoint(s), {} execution(s)",
                config.endpoints.len(),
                config.executions.len()
            );
            Ok(())
        }
        Command::Run {
            alias,
            endpoint,
            params,
        } => {
            let parameters = parse_params(&params)?;
            let service = ExecutionService::new(
                &config,
                Arc::new(LogMessageStream),
                Arc::new(LogAuditSink::new(config.reporting.root_name.clone())),
            )?;
            let response = service
                .handle(ExecutionRequest {
                    execution_alias: alias,
                    endpoint_alias: endpoint,
                    parameters,
                })
                .await?;

            if let Some(output) = &response.output {
                print!("{output}");
            }
            if !response.error_output.is_empty() {
                eprint!("{}", response.error_output);
            }
            match response.exit_status {
                Some(status) => info!(status, success = response.success, "completed"),
                None => info!(success = response.success, "interrupted on timeout"),
            }
            if !response.success {
                std::process::exit(response.exit_status.unwrap_or(1));
            }
            Ok(())
        }
    }
}

fn parse_params(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut parameters = HashMap::new();
    for pair in raw {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("parameter '{pair}' is not in name=value form");
        };
        parameters.insert(name.to_string(), value.to_string());
    }
    Ok(parameters)
}
