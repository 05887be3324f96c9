use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
const CONFIG_SUB_PATH: &str = ".radiobox";
#[cfg(target_os = "macos")]
const CONFIG_SUB_PATH: &str = "Library/ApplicationData/radiobox";
#[cfg(windows)]
const CONFIG_SUB_PATH: &str = "AppData\\Roaming\\radiobox";

/// Where the RadioBox client keeps its settings, created on first use under the given home
/// directory. Pass `dirs::home_dir()` in normal use.
pub fn configuration_directory(home_dir: Option<PathBuf>) -> Result<Box<Path>, String> {
    debug!("Home dir is {:?}", home_dir);
    let home = home_dir.ok_or_else(|| "No home directory found, cannot keep the server settings.".to_string())?;
    if !home.is_dir() {
        return Err(format!("Home directory {:?} is missing, cannot keep the server settings.", home));
    }

    let config_path = home.join(CONFIG_SUB_PATH);
    if config_path.exists() && !config_path.is_dir() {
        return Err(format!("Configuration directory {:?} is not a directory", config_path));
    }
    if !config_path.exists() {
        debug!("Creating config dir {:?}", config_path);
        fs::create_dir_all(&config_path)
            .map_err(|err| format!("Configuration directory {:?} could not be created: {}", config_path, err))?;
    }
    Ok(config_path.into_boxed_path())
}

#[cfg(test)]
#[path = "./config_dir_spec.rs"]
mod config_dir_spec;
