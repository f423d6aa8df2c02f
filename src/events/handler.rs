use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub correlation_id: String,
    pub payload: Value,
}

/// A typed handler registered against one or more event types. Handlers
/// never propagate failure to the publisher; `handle` returning `Err` is
/// logged and otherwise swallowed (spec.md §4.9: "dispatch is
/// fire-and-forget: failures log but never propagate").
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event) -> Result<(), String>;
}

/// Maps event type to the handlers registered for it. Registration order
/// is preserved per type so invocation order is deterministic.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Vec<Box<dyn EventHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event_type: impl Into<String>, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type.into()).or_default().push(handler);
    }

    /// Invokes every handler registered for `event.event_type`. Returns the
    /// messages of any handlers that errored, purely for logging by the
    /// caller — the publish operation itself always succeeds.
    pub fn dispatch(&self, event: &Event) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(handlers) = self.handlers.get(&event.event_type) {
            for handler in handlers {
                if let Err(e) = handler.handle(event) {
                    errors.push(e);
                }
            }
        }
        errors
    }
}
