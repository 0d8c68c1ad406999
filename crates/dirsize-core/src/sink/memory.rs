//! In-memory sink that records every batch it receives.

use std::sync::{Arc, Mutex};

use crate::model::Batch;
use crate::sink::{MetricSink, SinkError};

/// Records batches in a shared buffer; clones observe the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Batch>>>,
    calls: Arc<Mutex<usize>>,
    fail_with: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write with `reason`, still counting calls.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Successfully written batches, oldest first.
    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    /// Number of `write_batch` calls, failed ones included.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl MetricSink for MemorySink {
    fn write_batch(&mut self, batch: &Batch) -> Result<(), SinkError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(reason) = &self.fail_with {
            return Err(SinkError::Rejected(reason.clone()));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_through_clone() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_batch(&Batch::new("db", None)).unwrap();
        assert_eq!(sink.calls(), 1);
        assert_eq!(sink.batches().len(), 1);
    }

    #[test]
    fn test_failing_sink_counts_calls() {
        let sink = MemorySink::failing("down");
        let mut writer = sink.clone();
        let err = writer.write_batch(&Batch::new("db", None)).unwrap_err();
        assert_eq!(err, SinkError::Rejected("down".into()));
        assert_eq!(sink.calls(), 1);
        assert!(sink.batches().is_empty());
    }
}
