//! Optional re-emission of captured output to an outbound message stream.
//!
//! Messages for the same destination carry strictly increasing, never-reused
//! sequence numbers: each destination owns a counter seeded from wall-clock
//! nanoseconds at first use and incremented under a per-destination lock.
//! Publication is best-effort and never fails the primary execution result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{ExecutionConfig, PublicationConfig};

/// Property key carrying the execution alias in message metadata.
pub const EXECUTION_ALIAS_PROPERTY: &str = "remex.execution-alias";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageId {
    pub destination: String,
    pub direction: Direction,
    pub sequence: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub id: MessageId,
    /// Execution alias plus all caller parameters as key/value tags.
    pub properties: HashMap<String, String>,
    /// Raw output bytes.
    pub body: Vec<u8>,
}

/// Boundary to the external message transport.
pub trait MessageStream: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> anyhow::Result<()>;
}

pub struct MessagePublisher {
    stream: Arc<dyn MessageStream>,
    default_config: PublicationConfig,
    sequences: DashMap<String, Arc<Mutex<i64>>>,
}

impl MessagePublisher {
    pub fn new(stream: Arc<dyn MessageStream>, default_config: PublicationConfig) -> Self {
        Self {
            stream,
            default_config,
            sequences: DashMap::new(),
        }
    }

    /// Publishes `output` if publication is enabled for `execution` (its own
    /// override wins over the service-wide default). Returns the message id,
    /// or `None` when publication is disabled or the send failed.
    pub fn publish(
        &self,
        output: &str,
        execution: &ExecutionConfig,
        parameters: &HashMap<String, String>,
        endpoint_alias: &str,
    ) -> Option<MessageId> {
        let config = execution.publication().unwrap_or(&self.default_config);
        if !config.enabled {
            debug!(alias = %execution.alias(), "skipping output publication");
            return None;
        }
        let destination = if config.has_destination() {
            config.destination.as_str()
        } else {
            endpoint_alias
        };

        let counter = self.counter_for(destination);
        let result = {
            // Lock scope covers sequence allocation and message construction
            // so numbers are issued in send order per destination.
            let mut sequence = match counter.lock() {
                Ok(sequence) => sequence,
                Err(poisoned) => poisoned.into_inner(),
            };
            let id = MessageId {
                destination: destination.to_string(),
                direction: Direction::Outbound,
                sequence: *sequence,
                timestamp: Utc::now(),
            };
            *sequence += 1;
            let mut properties = parameters.clone();
            properties.insert(
                EXECUTION_ALIAS_PROPERTY.to_string(),
                execution.alias().to_string(),
            );
            let message = OutboundMessage {
                id: id.clone(),
                properties,
                body: output.as_bytes().to_vec(),
            };
            self.stream.send(&message).map(|_| id)
        };

        match result {
            Ok(id) => {
                info!(
                    alias = %execution.alias(),
                    destination = %destination,
                    sequence = id.sequence,
                    "output published"
                );
                Some(id)
            }
            Err(err) => {
                error!(
                    alias = %execution.alias(),
                    destination = %destination,
                    error = %err,
                    "cannot publish output"
                );
                None
            }
        }
    }

    fn counter_for(&self, destination: &str) -> Arc<Mutex<i64>> {
        self.sequences
            .entry(destination.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(initial_sequence())))
            .clone()
    }
}

fn initial_sequence() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_sequence_is_positive_and_nanosecond_scaled() {
        let sequence = initial_sequence();
        // 2020-01-01 in nanoseconds; anything earlier means the seed is not
        // wall-clock based.
        assert!(sequence > 1_577_836_800_000_000_000);
    }
}
