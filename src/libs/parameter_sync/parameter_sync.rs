use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::libs::double_triple::double_triple::encode;
use crate::libs::parameters::parameters::{default_init_parameters, descriptor_for, kind_of, ParameterKind, ParameterSet, ParameterValue};
use crate::libs::patterns::observer::{ObserverId, SyncEvent, SyncObserver, SyncObserverList};
use crate::libs::sync_error::sync_error::{SyncError, SyncFailure};
use crate::libs::transport::transport::Transport;
use crate::libs::wire::wire::{decode_inbound, encode_outbound, InboundMessage, WireFormat};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub wire_format: WireFormat,
    pub retry_delay: Duration,
    pub init: ParameterSet,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            wire_format: WireFormat::Datasets,
            retry_delay: DEFAULT_RETRY_DELAY,
            init: default_init_parameters(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncState {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SendOutcome {
    NothingToSend,
    // Another send is in flight; the edits go out once it resolves.
    Deferred,
    Applied,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    Applied,
    // Arrived while a previous message was still being applied.
    Dropped,
    // The server had nothing and neither do we: asked it for its full state.
    RequestedFullState,
    // The server asked for everything and was sent our full view.
    Resynced,
    // A resync was needed while a send was in flight; it goes out once that send resolves.
    ResyncDeferred,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SendKind {
    Edits,
    Retry,
    Handshake,
    FullView,
}

impl SendKind {
    // Higher ranks carry everything a lower one would, so a deferred send keeps the highest.
    fn rank(self) -> u8 {
        match self {
            SendKind::Edits => 0,
            SendKind::Retry => 1,
            SendKind::FullView => 2,
            SendKind::Handshake => 3,
        }
    }

    fn is_resync(self) -> bool {
        matches!(self, SendKind::FullView | SendKind::Handshake)
    }
}

struct InFlight {
    batch: ParameterSet,
    // The user edits taken from local; only these go back to local if the send fails.
    edits: ParameterSet,
    kind: SendKind,
}

// Owns the confirmed (orig), pending (local) and bootstrap (init) parameter caches, and the
// one-request-at-a-time round trip to the device that reconciles them.
pub struct ParameterSync {
    config: SyncConfig,
    transport: Box<dyn Transport>,
    orig: ParameterSet,
    local: ParameterSet,
    in_flight: Option<InFlight>,
    state: SyncState,
    connected: bool,
    send_queued: Option<SendKind>,
    processing: bool,
    answering_resync: bool,
    scheduled: Option<(Instant, SendKind)>,
    observers: SyncObserverList,
}

impl ParameterSync {
    pub fn new(config: SyncConfig, transport: Box<dyn Transport>) -> ParameterSync {
        debug!("New parameter sync using {} messages, {} init parameters", config.wire_format, config.init.len());
        ParameterSync {
            config,
            transport,
            orig: ParameterSet::new(),
            local: ParameterSet::new(),
            in_flight: None,
            state: SyncState::Idle,
            connected: false,
            send_queued: None,
            processing: false,
            answering_resync: false,
            scheduled: None,
            observers: SyncObserverList::new(),
        }
    }

    pub fn orig(&self) -> &ParameterSet {
        &self.orig
    }

    pub fn local(&self) -> &ParameterSet {
        &self.local
    }

    pub fn init(&self) -> &ParameterSet {
        &self.config.init
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_send_queued(&self) -> bool {
        self.send_queued.is_some()
    }

    pub fn has_scheduled_send(&self) -> bool {
        self.scheduled.is_some()
    }

    pub fn register_observer(&mut self, observer: Arc<dyn SyncObserver>) -> ObserverId {
        self.observers.register_observer(observer)
    }

    pub fn unregister_observer(&mut self, observer_id: ObserverId) {
        self.observers.unregister_observer(observer_id)
    }

    // The session drives app start/stop over the same connection.
    pub(crate) fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    pub(crate) fn report_failure(&self, failure: SyncFailure) {
        self.observers.notify_observers(&SyncEvent::SyncFailed(failure));
    }

    /// Stages an edit. An edit back to the confirmed value cancels any pending edit for the key.
    pub fn set_local<V: Into<ParameterValue>>(&mut self, key: &str, value: V) -> Result<(), SyncError> {
        let mut value = value.into();
        if let ParameterValue::Number(n) = value {
            if !n.is_finite() {
                return Err(SyncError::UnsupportedValue(n));
            }
        }
        if let Some(descriptor) = descriptor_for(key) {
            if descriptor.read_only {
                return Err(SyncError::ReadOnly(key.to_string()));
            }
            value = descriptor.constrain(value);
        }
        if let ParameterValue::Number(n) = value {
            if kind_of(key) == ParameterKind::Float {
                encode(n)?;
            }
            if let Some(ParameterValue::Flag(_)) = self.orig.get(key) {
                value = ParameterValue::Flag(n != 0.0);
            }
        }

        match self.orig.get(key) {
            Some(confirmed) if confirmed.same_as(&value) => {
                if self.local.remove(key).is_some() {
                    debug!("{} is back at its confirmed value {}, edit dropped", key, confirmed);
                }
            }
            confirmed => {
                match confirmed {
                    Some(old) => info!("{} changed from {} to {}", key, old, value),
                    None => info!("{} set to {}", key, value),
                }
                self.local.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn on_parameter_changed<V: Into<ParameterValue>>(&mut self, key: &str, value: V) -> Result<(), SyncError> {
        self.set_local(key, value)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.local.is_empty()
    }

    /// What a renderer should show: the pending edit, else the confirmed value, else the default.
    pub fn current_display_value(&self, key: &str) -> Option<&ParameterValue> {
        self.local.get(key)
            .or_else(|| self.orig.get(key))
            .or_else(|| self.config.init.get(key))
    }

    // init, overlaid by what the device confirmed, overlaid by what is pending.
    pub fn full_view(&self) -> ParameterSet {
        let mut view = self.config.init.clone();
        view.merge(&self.orig);
        view.merge(&self.local);
        view
    }

    pub fn send_pending(&mut self) -> Result<SendOutcome, SyncError> {
        self.send(SendKind::Edits)
    }

    /// First contact: the bootstrap values plus a request for the device's full state.
    pub fn handshake(&mut self) -> Result<SendOutcome, SyncError> {
        info!("Handshaking with {} init parameters", self.config.init.len());
        self.send(SendKind::Handshake)
    }

    fn send(&mut self, kind: SendKind) -> Result<SendOutcome, SyncError> {
        if self.state == SyncState::Sending {
            debug!("{:?} send requested while another is in flight, queueing", kind);
            self.queue(kind);
            return Ok(SendOutcome::Deferred);
        }
        match self.prepare(kind)? {
            None => Ok(SendOutcome::NothingToSend),
            Some(body) => {
                let reply = self.transport.post(&body);
                self.complete_send(reply)
            }
        }
    }

    /// Moves the pending edits into the in-flight batch and returns the body to transmit, or
    /// None when there is nothing to send. Edits staged from now on wait for the next send.
    pub fn prepare_send(&mut self) -> Result<Option<String>, SyncError> {
        if self.state == SyncState::Sending {
            self.queue(SendKind::Edits);
            return Ok(None);
        }
        self.prepare(SendKind::Edits)
    }

    fn queue(&mut self, kind: SendKind) {
        self.send_queued = match self.send_queued {
            Some(queued) if queued.rank() >= kind.rank() => Some(queued),
            _ => Some(kind),
        };
    }

    fn prepare(&mut self, kind: SendKind) -> Result<Option<String>, SyncError> {
        if !kind.is_resync() && self.local.is_empty() {
            return Ok(None);
        }
        let batch = match kind {
            SendKind::Edits | SendKind::Retry => self.local.clone(),
            SendKind::Handshake => {
                let mut batch = self.config.init.clone();
                batch.merge(&self.local);
                batch
            }
            SendKind::FullView => self.full_view(),
        };
        let edits = mem::take(&mut self.local);
        let request_full_state = kind == SendKind::Handshake;
        match encode_outbound(&batch, request_full_state, self.config.wire_format) {
            Ok(body) => {
                debug!("Sending {} parameters ({:?})", batch.len(), kind);
                self.in_flight = Some(InFlight { batch, edits, kind });
                self.state = SyncState::Sending;
                Ok(Some(body))
            }
            Err(error) => {
                self.restore_pending(edits);
                Err(error)
            }
        }
    }

    /// Resolves the in-flight send with the transport's reply.
    pub fn complete_send(&mut self, reply: Result<String, SyncError>) -> Result<SendOutcome, SyncError> {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) => in_flight,
            None => {
                warn!("Reply arrived with no send in flight, ignoring it");
                return Ok(SendOutcome::NothingToSend);
            }
        };
        self.state = SyncState::Idle;

        let decoded = reply.and_then(|body| decode_inbound(&body, self.config.wire_format));
        let outcome = match decoded {
            Ok(message) => {
                self.connected = true;
                // The server is authoritative: the batch is superseded by what it echoed.
                debug!("Send of {} parameters applied", in_flight.batch.len());
                if let Err(error) = self.on_server_update(message) {
                    debug!("Follow-up to the reply failed: {}", error);
                }
                Ok(SendOutcome::Applied)
            }
            Err(error) => {
                warn!("Send of {} parameters failed: {}", in_flight.batch.len(), error);
                self.connected = false;
                if error.preserves_pending() {
                    self.restore_pending(in_flight.edits);
                }
                let retry_allowed = matches!(in_flight.kind, SendKind::Edits | SendKind::FullView);
                if matches!(error, SyncError::ApplicationError(_)) && retry_allowed && self.has_pending_changes() {
                    self.schedule(SendKind::Retry);
                }
                let failure = if in_flight.kind == SendKind::Handshake {
                    SyncFailure::during_handshake(error.clone())
                } else {
                    SyncFailure::new(error.clone())
                };
                self.observers.notify_observers(&SyncEvent::SyncFailed(failure));
                Err(error)
            }
        };

        if let Some(kind) = self.send_queued.take() {
            self.schedule(kind);
        }
        outcome
    }

    // Pending edits made meanwhile are newer than the batch and win over it.
    fn restore_pending(&mut self, batch: ParameterSet) {
        let newer = mem::replace(&mut self.local, ParameterSet::new());
        for (key, value) in &batch {
            let confirmed = self.orig.get(key).map_or(false, |c| c.same_as(value));
            if !confirmed {
                self.local.insert(key, value.clone());
            }
        }
        self.local.merge(&newer);
    }

    // At most one deferred send exists; the higher-ranked kind wins.
    fn schedule(&mut self, kind: SendKind) {
        let due = Instant::now() + self.config.retry_delay;
        self.scheduled = match self.scheduled.take() {
            Some((at, scheduled)) if scheduled.rank() >= kind.rank() => Some((at, scheduled)),
            _ => Some((due, kind)),
        };
        debug!("Scheduled a {:?} send in {}ms", kind, self.config.retry_delay.as_millis());
    }

    /// Fires the deferred send once it is due.
    pub fn poll(&mut self, now: Instant) -> Option<Result<SendOutcome, SyncError>> {
        match self.scheduled {
            Some((due, kind)) if due <= now && self.state == SyncState::Idle => {
                self.scheduled = None;
                if kind.is_resync() {
                    Some(self.follow_up(kind))
                } else {
                    Some(self.send(kind))
                }
            }
            _ => None,
        }
    }

    /// Decodes and applies a message pushed by the server.
    pub fn on_server_message(&mut self, body: &str) -> Result<UpdateOutcome, SyncError> {
        let message = decode_inbound(body, self.config.wire_format)?;
        self.on_server_update(message)
    }

    pub fn receive_update(&mut self, params: ParameterSet) -> Result<UpdateOutcome, SyncError> {
        self.on_server_update(InboundMessage::with_params(params))
    }

    pub fn on_server_update(&mut self, message: InboundMessage) -> Result<UpdateOutcome, SyncError> {
        // Pushed messages may be delivered from a transport callback while one is being applied.
        if self.processing {
            debug!("Still applying the previous message, dropping this one");
            return Ok(UpdateOutcome::Dropped);
        }
        self.processing = true;
        let mut ask_for_full_state = false;

        if let Some(params) = &message.params {
            if self.orig.is_empty() && params.is_empty() && !message.send_all_params {
                ask_for_full_state = true;
            }
            for (key, value) in params {
                let changed = self.orig.get(key).map_or(true, |old| !old.same_as(value));
                self.orig.insert(key, value.clone());
                if changed {
                    self.observers.notify_observers(&SyncEvent::ParameterUpdated { key: key.clone(), value: value.clone() });
                }
            }
        }
        if let Some(signals) = message.signals {
            if self.orig.is_empty() {
                debug!("No parameters received yet, ignoring signals");
            } else {
                self.observers.notify_observers(&SyncEvent::SignalsReceived(signals));
            }
        }
        self.processing = false;

        // A reply to one of our own follow-ups never triggers another.
        if self.answering_resync {
            return Ok(UpdateOutcome::Applied);
        }
        if ask_for_full_state {
            info!("Neither side has parameters, requesting the full set");
            return match self.follow_up(SendKind::Handshake)? {
                SendOutcome::Deferred => Ok(UpdateOutcome::ResyncDeferred),
                _ => Ok(UpdateOutcome::RequestedFullState),
            };
        }
        if message.send_all_params {
            info!("Server asked for all parameters, sending the full view");
            return match self.follow_up(SendKind::FullView)? {
                SendOutcome::Deferred => Ok(UpdateOutcome::ResyncDeferred),
                _ => Ok(UpdateOutcome::Resynced),
            };
        }
        Ok(UpdateOutcome::Applied)
    }

    fn follow_up(&mut self, kind: SendKind) -> Result<SendOutcome, SyncError> {
        self.answering_resync = true;
        let result = self.send(kind);
        self.answering_resync = false;
        result
    }
}

#[cfg(test)]
#[path = "./parameter_sync_spec.rs"]
mod parameter_sync_spec;
