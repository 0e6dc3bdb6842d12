pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{
    BackoffOverrides, ResourceDefaults, ResourceOverrides, Settings, TimeoutOverrides,
};

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a configuration file
pub const CONFIG_PATH_ENV: &str = "STATEFLOW_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "stateflow.local.yaml",
    ".stateflow.local.yaml",
    "stateflow.yaml",
    ".stateflow.yaml",
];

/// stateflow's global configuration directory (`~/.config/stateflow`)
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("stateflow"))
        .ok_or(ConfigError::ConfigDirNotFound)
}

/// Locate the configuration file
///
/// Search order:
/// 1. `STATEFLOW_CONFIG_PATH` (direct path)
/// 2. current directory: stateflow.local.yaml, .stateflow.local.yaml, stateflow.yaml, .stateflow.yaml
/// 3. `./.stateflow/` with the same names
/// 4. `~/.config/stateflow/stateflow.yaml` (global settings)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at {}, which does not exist",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    if let Some(path) = find_in(&current_dir) {
        return Ok(path);
    }

    let local_dir = current_dir.join(".stateflow");
    if local_dir.is_dir()
        && let Some(path) = find_in(&local_dir)
    {
        return Ok(path);
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("stateflow.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
}

/// Read, parse and validate the file at `path`
pub fn load(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    let settings = Settings::from_yaml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    settings.validate()?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Discovered settings, or the built-in defaults when no file exists
pub fn load_or_default() -> Result<Settings> {
    match find_config_file() {
        Ok(path) => load(&path),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No configuration file found, using built-in defaults");
            Ok(Settings::default())
        }
        Err(e) => Err(e),
    }
}
