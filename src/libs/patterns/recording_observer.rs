use std::cell::RefCell;

use crate::libs::patterns::observer::{SyncEvent, SyncObserver};

// Keeps every event it is told about.
pub struct RecordingObserver {
    events: RefCell<Vec<SyncEvent>>,
}

impl RecordingObserver {
    pub fn new() -> RecordingObserver {
        RecordingObserver { events: RefCell::new(Vec::new()) }
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.borrow().clone()
    }

    pub fn updated_keys(&self) -> Vec<String> {
        self.events.borrow().iter().filter_map(|e| match e {
            SyncEvent::ParameterUpdated { key, .. } => Some(key.clone()),
            _ => None,
        }).collect()
    }

    pub fn failures(&self) -> usize {
        self.events.borrow().iter().filter(|e| matches!(e, SyncEvent::SyncFailed(_))).count()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_sync_event(&self, event: &SyncEvent) {
        // RefCell for interior mutability since on_sync_event does not have &mut self
        self.events.borrow_mut().push(event.clone());
    }
}
