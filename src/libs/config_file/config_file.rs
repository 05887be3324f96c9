use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::libs::parameter_sync::parameter_sync::{SyncConfig, DEFAULT_RETRY_DELAY};
use crate::libs::transport::transport::{TransportConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::libs::wire::wire::WireFormat;

pub const DEFAULT_BASE_URL: &str = "http://rp-f0xxxx.local";
pub const DEFAULT_APP_ID: &str = "radiobox";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Config {
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    sync: SyncSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
struct ServerSettings {
    base_url: String,
    app_id: String,
    request_timeout_ms: u64,
    wire_format: WireFormat,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: DEFAULT_APP_ID.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            wire_format: WireFormat::Datasets,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
struct SyncSettings {
    retry_delay_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings { retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64 }
    }
}

const CONFIG_FILE_NAME: &str = "radiobox.toml";

// The client's settings, persisted on every change.
pub struct ConfigurationStore {
    config_file_path: Box<Path>,
    config: Config,
}

impl ConfigurationStore {
    pub fn new(config_path: Box<Path>) -> Result<ConfigurationStore, String> {
        let config_file_path = config_path.join(CONFIG_FILE_NAME);
        debug!("Config file is {:?}", config_file_path);
        let config = if config_file_path.exists() {
            read_configuration(&config_file_path)?
        } else {
            debug!("Creating config file {:?}", config_file_path);
            let config = Config { server: ServerSettings::default(), sync: SyncSettings::default() };
            save_configuration(&config_file_path, &config)?;
            config
        };
        Ok(ConfigurationStore { config_file_path: config_file_path.into_boxed_path(), config })
    }

    pub fn get_config_file_path(&self) -> &Path {
        &self.config_file_path
    }

    pub fn get_base_url(&self) -> String {
        self.config.server.base_url.clone()
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), String> {
        if base_url.trim().is_empty() {
            return Err("The server URL cannot be empty".to_string());
        }
        info!("Setting server URL to {}", base_url);
        self.config.server.base_url = base_url;
        self.save()
    }

    pub fn get_app_id(&self) -> String {
        self.config.server.app_id.clone()
    }

    pub fn set_app_id(&mut self, app_id: String) -> Result<(), String> {
        info!("Setting app id to {}", app_id);
        self.config.server.app_id = app_id;
        self.save()
    }

    pub fn get_request_timeout_ms(&self) -> u64 {
        self.config.server.request_timeout_ms
    }

    pub fn set_request_timeout_ms(&mut self, timeout_ms: u64) -> Result<(), String> {
        if timeout_ms == 0 {
            return Err("The request timeout must be at least 1ms".to_string());
        }
        info!("Setting request timeout to {}ms", timeout_ms);
        self.config.server.request_timeout_ms = timeout_ms;
        self.save()
    }

    pub fn get_wire_format(&self) -> WireFormat {
        self.config.server.wire_format
    }

    pub fn set_wire_format(&mut self, wire_format: WireFormat) -> Result<(), String> {
        info!("Setting wire format to {}", wire_format);
        self.config.server.wire_format = wire_format;
        self.save()
    }

    pub fn get_retry_delay_ms(&self) -> u64 {
        self.config.sync.retry_delay_ms
    }

    pub fn set_retry_delay_ms(&mut self, retry_delay_ms: u64) -> Result<(), String> {
        info!("Setting retry delay to {}ms", retry_delay_ms);
        self.config.sync.retry_delay_ms = retry_delay_ms;
        self.save()
    }

    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.get_base_url(),
            app_id: self.get_app_id(),
            request_timeout: Duration::from_millis(self.get_request_timeout_ms()),
        }
    }

    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            wire_format: self.get_wire_format(),
            retry_delay: Duration::from_millis(self.get_retry_delay_ms()),
            ..SyncConfig::default()
        }
    }

    fn save(&self) -> Result<(), String> {
        save_configuration(&self.config_file_path.to_path_buf(), &self.config)
    }
}

fn save_configuration(config_file_path: &PathBuf, config: &Config) -> Result<(), String> {
    let toml = toml::to_string(config)
        .map_err(|err| format!("Could not serialise configuration: {}", err))?;
    std::fs::write(config_file_path, toml)
        .map_err(|err| format!("Could not write config file {:?}: {}", config_file_path, err))
}

fn read_configuration(config_file_path: &PathBuf) -> Result<Config, String> {
    let file_contents = std::fs::read_to_string(config_file_path);
    match file_contents {
        Ok(toml) => {
            let x: Result<Config, toml::de::Error> = toml::from_str(&*toml);
            match x {
                Ok(config) => {
                    Ok(config)
                }
                Err(err) => {
                    Err(format!("Could not parse config file {:?}: {}", config_file_path, err))
                }
            }
        }
        Err(e) => { Err(format!("Could not read config file {:?}: {}", config_file_path, e))}
    }
}

#[cfg(test)]
#[path = "./config_file_spec.rs"]
mod config_file_spec;
