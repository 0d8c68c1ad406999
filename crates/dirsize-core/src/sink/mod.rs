//! Metric sinks.
//!
//! A sink receives one [`Batch`] per cycle. The cycle never retries a failed
//! write; the next tick is an independent attempt.

mod influx;
mod memory;

pub use influx::{InfluxSink, to_line_protocol};
pub use memory::MemorySink;

use crate::model::Batch;

/// Error writing a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Sink address cannot be used. Fatal at startup.
    InvalidAddress(String),
    /// Request could not be sent or the response could not be read.
    Transport(String),
    /// Sink answered with a non-success status.
    Status { code: u16, body: String },
    /// Sink refused the batch for another reason.
    Rejected(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::InvalidAddress(msg) => write!(f, "invalid sink address: {}", msg),
            SinkError::Transport(msg) => write!(f, "transport error: {}", msg),
            SinkError::Status { code, body } => {
                write!(f, "sink returned status {}: {}", code, body.trim())
            }
            SinkError::Rejected(msg) => write!(f, "batch rejected: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {}

/// Destination for metric batches.
pub trait MetricSink: Send {
    /// Writes all points of `batch` in one request.
    fn write_batch(&mut self, batch: &Batch) -> Result<(), SinkError>;
}
