use super::pii::scrub;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteringEvent {
    pub tenant_id: Uuid,
    pub event: String,
    pub fields: BTreeMap<String, Value>,
}

/// Scrubs every string-valued field through the PII scrubber before the
/// event is buffered (spec.md §4.8: "PII scrubbing is applied before any
/// payload is written or emitted").
fn scrub_event(mut event: MeteringEvent) -> MeteringEvent {
    for value in event.fields.values_mut() {
        if let Value::String(s) = value {
            *s = scrub(s);
        }
    }
    event
}

pub trait MetricSink: Send + Sync {
    fn write_batch(&self, events: &[MeteringEvent]);
}

/// A sink that discards events; used in tests and whenever metering is
/// deliberately disabled.
pub struct NullSink;

impl MetricSink for NullSink {
    fn write_batch(&self, _events: &[MeteringEvent]) {}
}

/// An in-memory sink used by tests to assert on what would have been
/// emitted.
#[derive(Default)]
pub struct RecordingSink {
    pub received: Mutex<Vec<MeteringEvent>>,
}

impl MetricSink for RecordingSink {
    fn write_batch(&self, events: &[MeteringEvent]) {
        self.received.lock().extend(events.iter().cloned());
    }
}

/// Buffers events under a single mutex and flushes on a size threshold or
/// an explicit `flush()` call driven by a timer in the embedding service
/// (spec.md §4.8, §5: "flush swaps the buffer out under lock to keep hold
/// time minimal").
pub struct MeteringCollector {
    flush_threshold: usize,
    buffer: Mutex<Vec<MeteringEvent>>,
    sink: Box<dyn MetricSink>,
}

impl MeteringCollector {
    pub fn new(flush_threshold: usize, sink: Box<dyn MetricSink>) -> Self {
        Self {
            flush_threshold,
            buffer: Mutex::new(Vec::new()),
            sink,
        }
    }

    pub fn record(&self, event: MeteringEvent) {
        let scrubbed = scrub_event(event);
        let mut buffer = self.buffer.lock();
        buffer.push(scrubbed);
        if buffer.len() >= self.flush_threshold {
            let drained = std::mem::take(&mut *buffer);
            drop(buffer);
            self.sink.write_batch(&drained);
        }
    }

    pub fn flush(&self) {
        let mut buffer = self.buffer.lock();
        if buffer.is_empty() {
            return;
        }
        let drained = std::mem::take(&mut *buffer);
        drop(buffer);
        self.sink.write_batch(&drained);
    }

    pub fn pending_count(&self) -> usize {
        self.buffer.lock().len()
    }
}
