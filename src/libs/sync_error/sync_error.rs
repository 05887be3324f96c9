use thiserror::Error;

// Every failure the sync core can surface to a UI collaborator. The core classifies, the UI
// decides how to present it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Can not connect the web-server: {0}")]
    TransportUnreachable(String),

    #[error("Failure returned by the web-server: {}", .0.as_deref().unwrap_or("no reason given"))]
    ApplicationError(Option<String>),

    #[error("Unknown connection state: {0}")]
    MalformedResponse(String),

    #[error("Value {0} cannot be transported (NaN, infinite and subnormal values are unsupported)")]
    UnsupportedValue(f64),

    #[error("Parameter '{0}' is read-only")]
    ReadOnly(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SyncError {
    /// Should the diff that provoked this error stay pending for a later send?
    pub fn preserves_pending(&self) -> bool {
        matches!(self, SyncError::ApplicationError(_) | SyncError::TransportUnreachable(_))
    }

    /// The recovery choices to offer after a failed send.
    pub fn recovery(&self) -> Recovery {
        match self {
            SyncError::TransportUnreachable(_)
            | SyncError::ApplicationError(_)
            | SyncError::MalformedResponse(_) => Recovery { retry: false, restart: true, ignore: true },
            SyncError::UnsupportedValue(_)
            | SyncError::ReadOnly(_)
            | SyncError::Configuration(_) => Recovery { retry: false, restart: false, ignore: true },
        }
    }
}

// Which buttons the error notification should carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recovery {
    pub retry: bool,
    pub restart: bool,
    pub ignore: bool,
}

impl Recovery {
    // Bootstrap failures can only be recovered by restarting the application.
    pub fn restart_only() -> Recovery {
        Recovery { retry: false, restart: true, ignore: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub error: SyncError,
    pub recovery: Recovery,
}

impl SyncFailure {
    pub fn new(error: SyncError) -> SyncFailure {
        let recovery = error.recovery();
        SyncFailure { error, recovery }
    }

    pub fn during_handshake(error: SyncError) -> SyncFailure {
        SyncFailure { error, recovery: Recovery::restart_only() }
    }
}

#[cfg(test)]
#[path = "./sync_error_spec.rs"]
mod sync_error_spec;
