use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use log::debug;

use crate::libs::sync_error::sync_error::SyncError;
use crate::libs::transport::transport::Transport;

// Replays canned replies in order and records every body it was asked to post. Clones share
// the same script, so a test can keep one clone while the code under test owns another.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Rc<RefCell<VecDeque<Result<String, SyncError>>>>,
    sent: Rc<RefCell<Vec<String>>>,
    stops: Rc<RefCell<usize>>,
}

impl ScriptedTransport {
    pub fn new() -> ScriptedTransport {
        ScriptedTransport::default()
    }

    pub fn reply(&self, body: &str) -> &ScriptedTransport {
        self.replies.borrow_mut().push_back(Ok(body.to_string()));
        self
    }

    pub fn fail(&self, error: SyncError) -> &ScriptedTransport {
        self.replies.borrow_mut().push_back(Err(error));
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent.borrow().iter().map(|s| serde_json::from_str(s).unwrap()).collect()
    }

    pub fn stop_count(&self) -> usize {
        *self.stops.borrow()
    }

    fn next_reply(&self) -> Result<String, SyncError> {
        self.replies.borrow_mut().pop_front()
            .unwrap_or_else(|| Err(SyncError::TransportUnreachable("script exhausted".to_string())))
    }
}

impl Transport for ScriptedTransport {
    fn start_app(&mut self) -> Result<String, SyncError> {
        self.next_reply()
    }

    fn post(&mut self, body: &str) -> Result<String, SyncError> {
        debug!("Scripted post of {}", body);
        self.sent.borrow_mut().push(body.to_string());
        self.next_reply()
    }

    fn stop_app(&mut self) -> Result<(), SyncError> {
        *self.stops.borrow_mut() += 1;
        Ok(())
    }
}
