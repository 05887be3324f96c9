use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::libs::parameter_sync::parameter_sync::{ParameterSync, SendOutcome, SyncConfig};
use crate::libs::parameters::parameters::ParameterValue;
use crate::libs::patterns::observer::{ObserverId, SyncObserver};
use crate::libs::sync_error::sync_error::{SyncError, SyncFailure};
use crate::libs::transport::transport::Transport;
use crate::libs::wire::wire::decode_status;

const RUN_FLAG: &str = "rb_run";

// The lifetime of the RadioBox app on the device, from the bazaar start request to the stop
// request, with the parameter sync running in between.
pub struct RadioBoxSession {
    sync: ParameterSync,
    started: bool,
}

impl RadioBoxSession {
    pub fn new(config: SyncConfig, transport: Box<dyn Transport>) -> RadioBoxSession {
        RadioBoxSession { sync: ParameterSync::new(config, transport), started: false }
    }

    pub fn sync(&self) -> &ParameterSync {
        &self.sync
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn register_observer(&mut self, observer: Arc<dyn SyncObserver>) -> ObserverId {
        self.sync.register_observer(observer)
    }

    /// Asks the device to load the app, then handshakes. Failures here can only be recovered by
    /// a restart.
    pub fn start(&mut self) -> Result<SendOutcome, SyncError> {
        info!("Starting the RadioBox app");
        let status = self.sync.transport_mut().start_app().and_then(|body| decode_status(&body));
        if let Err(error) = status {
            warn!("Could not start the app: {}", error);
            self.sync.report_failure(SyncFailure::during_handshake(error.clone()));
            return Err(error);
        }
        self.started = true;
        self.sync.handshake()
    }

    /// Best effort: a failed stop request is logged and not retried.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        info!("Stopping the RadioBox app");
        if let Err(error) = self.sync.transport_mut().stop_app() {
            warn!("Could not stop the app: {}", error);
        }
    }

    // Ends the session without unloading the app, so the radio keeps going after we exit.
    pub fn leave_running(mut self) {
        if self.started {
            info!("Leaving the RadioBox app running");
            self.started = false;
        }
    }

    pub fn set<V: Into<ParameterValue>>(&mut self, key: &str, value: V) -> Result<(), SyncError> {
        self.sync.set_local(key, value)
    }

    pub fn send(&mut self) -> Result<SendOutcome, SyncError> {
        self.sync.send_pending()
    }

    pub fn poll(&mut self, now: Instant) -> Option<Result<SendOutcome, SyncError>> {
        self.sync.poll(now)
    }

    pub fn value(&self, key: &str) -> Option<ParameterValue> {
        self.sync.current_display_value(key).cloned()
    }

    // The RUN/STOP buttons.
    pub fn run_flag(&mut self, running: bool) -> Result<SendOutcome, SyncError> {
        info!("{} the radio", if running { "Running" } else { "Stopping" });
        self.sync.set_local(RUN_FLAG, running)?;
        self.sync.send_pending()
    }
}

impl Drop for RadioBoxSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "./session_spec.rs"]
mod session_spec;
