use std::sync::Arc;

use log::debug;

use crate::libs::parameters::parameters::ParameterValue;
use crate::libs::sync_error::sync_error::SyncFailure;
use crate::libs::wire::wire::SignalSet;

// What the sync core tells the UI layer. The UI owns presentation; the core only reports.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    // A device-confirmed value differs from what was confirmed before.
    ParameterUpdated { key: String, value: ParameterValue },
    SignalsReceived(SignalSet),
    SyncFailed(SyncFailure),
}

pub trait SyncObserver {
    fn on_sync_event(&self, event: &SyncEvent);
}

pub type ObserverId = usize;

// Unregistered observers keep their slot, so ids handed out stay valid.
#[derive(Default)]
pub struct SyncObserverList {
    observers: Vec<(bool, Arc<dyn SyncObserver>)>,
}

impl SyncObserverList {
    pub fn new() -> SyncObserverList {
        SyncObserverList { observers: Vec::new() }
    }

    pub fn notify_observers(&self, event: &SyncEvent) {
        for (active, observer) in self.observers.iter() {
            if *active {
                observer.on_sync_event(event);
            }
        }
    }

    pub fn register_observer(&mut self, observer: Arc<dyn SyncObserver>) -> ObserverId {
        self.observers.push((true, observer));
        let id = self.observers.len() - 1;
        debug!("Registered sync observer {}", id);
        id
    }

    pub fn unregister_observer(&mut self, observer_id: ObserverId) {
        if let Some(slot) = self.observers.get_mut(observer_id) {
            slot.0 = false;
            debug!("Unregistered sync observer {}", observer_id);
        }
    }

    pub fn active_count(&self) -> usize {
        self.observers.iter().filter(|(active, _)| *active).count()
    }
}

#[cfg(test)]
#[path = "./observer_spec.rs"]
mod observer_spec;
