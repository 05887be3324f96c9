use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::{Client, Response};

#[cfg(test)]
use mockall::automock;

use crate::libs::sync_error::sync_error::SyncError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);

// This trait is an abstraction over the web-server connection, so that it can be mocked. All
// calls block until the server replies or the request times out; a timeout is reported the
// same way as a refused connection.
#[cfg_attr(test, automock)]
pub trait Transport {
    fn start_app(&mut self) -> Result<String, SyncError>;
    fn post(&mut self, body: &str) -> Result<String, SyncError>;
    fn stop_app(&mut self) -> Result<(), SyncError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub base_url: String,
    pub app_id: String,
    pub request_timeout: Duration,
}

impl TransportConfig {
    pub fn start_app_url(&self) -> String {
        format!("{}/bazaar?start={}", self.root(), self.app_id)
    }

    pub fn stop_app_url(&self) -> String {
        format!("{}/bazaar?stop={}", self.root(), self.app_id)
    }

    pub fn post_url(&self) -> String {
        format!("{}/data", self.root())
    }

    fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

// A Transport that talks HTTP to the Red Pitaya web-server.
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<HttpTransport, SyncError> {
        info!("Using web-server at {} with a {}ms timeout", config.base_url, config.request_timeout.as_millis());
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::Configuration(format!("Could not build HTTP client: {}", e)))?;
        Ok(HttpTransport { client, config })
    }

    fn body_of(url: &str, result: reqwest::Result<Response>) -> Result<String, SyncError> {
        let response = result.map_err(|e| {
            warn!("Request to {} failed: {}", url, e);
            SyncError::TransportUnreachable(e.to_string())
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!("Request to {} returned HTTP {}", url, status);
            return Err(SyncError::TransportUnreachable(format!("HTTP {}", status)));
        }
        response.text().map_err(|e| SyncError::TransportUnreachable(e.to_string()))
    }
}

impl Transport for HttpTransport {
    fn start_app(&mut self) -> Result<String, SyncError> {
        let url = self.config.start_app_url();
        debug!("GET {}", url);
        HttpTransport::body_of(&url, self.client.get(&url).send())
    }

    fn post(&mut self, body: &str) -> Result<String, SyncError> {
        let url = self.config.post_url();
        debug!("POST {} {}", url, body);
        let request = self.client.post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .body(body.to_string());
        HttpTransport::body_of(&url, request.send())
    }

    fn stop_app(&mut self) -> Result<(), SyncError> {
        let url = self.config.stop_app_url();
        debug!("GET {}", url);
        HttpTransport::body_of(&url, self.client.get(&url).send()).map(|_| ())
    }
}

#[cfg(test)]
#[path = "./transport_spec.rs"]
mod transport_spec;
