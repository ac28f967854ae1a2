// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Mutex;

use crate::event::EventRecord;

/// Receives completed event records.
///
/// The real implementation wraps a native Datadog SDK which owns
/// batching, persistence, upload and retry. From this layer's point of
/// view `emit` must not block for long and must not fail: whatever the
/// sink does with a record is its own concern.
pub trait Sink: Send + Sync {
    fn emit(&self, record: EventRecord);
}

/// In-memory sink used in tests and demos.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Drains and returns everything emitted so far.
    pub fn take(&self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for MemorySink {
    fn emit(&self, record: EventRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ActionType, RumActionEvent};

    #[test]
    fn test_memory_sink_collects_records() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(EventRecord::RumAction(RumActionEvent {
            action_type: ActionType::Tap,
            name: "checkout".to_string(),
            attributes: Default::default(),
            session_id: None,
            timestamp_ns: 1,
        }));

        assert_eq!(sink.len(), 1);
        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert!(sink.is_empty());
    }
}
