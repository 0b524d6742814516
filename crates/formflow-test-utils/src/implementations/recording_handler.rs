use async_trait::async_trait;
use formflow_core::{FormError, FormEvent, FormEventHandler};
use parking_lot::Mutex;

/// Collects every event it receives
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<FormEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FormEvent> {
        self.events.lock().clone()
    }

    /// Event type names in arrival order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(FormEvent::event_type).collect()
    }

    /// How many events of a type were seen
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl FormEventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: FormEvent) -> Result<(), FormError> {
        self.events.lock().push(event);
        Ok(())
    }
}
