use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "Configuration file not found. Looked in:\n\
        - current directory: stateflow.local.yaml, .stateflow.local.yaml, stateflow.yaml, .stateflow.yaml\n\
        - ./.stateflow/ directory\n\
        - ~/.config/stateflow/stateflow.yaml\n\
        Set STATEFLOW_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid settings for '{scope}': {reason}")]
    Invalid { scope: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
