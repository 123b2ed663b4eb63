//! Compiler configuration files.
//!
//! A config file is TOML, RON, or JSON (detected from the extension) with
//! two optional sections:
//!
//! ```toml
//! [compile]
//! max_nodes = 512
//! max_sensor_address = 255
//! require_distances = true
//!
//! [output]
//! format = "bitcode"
//! ```

use crate::emit::Format;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trackgraph_core::CompileOptions;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported config format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Config
// ===========================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compile: CompileOptions,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Format used when neither the command line nor the output file
    /// extension picks one.
    pub format: Option<Format>,
}

/// Text formats a config file may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Ron,
    Toml,
    Json,
}

/// Detect the config format of a file based on its extension.
pub fn detect_config_format(path: &Path) -> Result<ConfigFormat, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(ConfigFormat::Ron),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some("json") => Ok(ConfigFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Deserialize `content` as the given format. `path` is only used in errors.
pub fn parse_config_str<T: DeserializeOwned>(
    content: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<T, ConfigError> {
    let parse_err = |detail: String| ConfigError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        ConfigFormat::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read and parse a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let format = detect_config_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let config: Config = parse_config_str(&content, format, path)?;
    tracing::debug!(
        file = %path.display(),
        max_nodes = ?config.compile.max_nodes,
        max_sensor_address = ?config.compile.max_sensor_address,
        "loaded config"
    );
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
