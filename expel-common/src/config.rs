//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from an optional TOML file. Values given on the
//! command line or in the environment take precedence; the binary resolves
//! those with clap and falls back to this file, then to built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "EXPEL_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "expel.db";

/// Upload directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Root folder holding the database and uploaded images
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address (e.g. "127.0.0.1")
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Browser origins allowed by CORS
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub uploads: UploadConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// External model settings
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct InferenceConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Override of the Gemini REST base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Upper bound on a single inference call
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Upload handling settings
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UploadConfig {
    /// Maximum multipart request body size
    #[serde(default)]
    pub max_bytes: Option<usize>,

    /// Delete the stored image when its detection fails
    #[serde(default)]
    pub cleanup_failed: Option<bool>,
}

/// Load a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load the configuration at `explicit`, or the default location if it exists
///
/// An explicit path that cannot be read is an error; a missing default file
/// yields an empty configuration.
pub fn load_optional_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        _ => Ok(TomlConfig::default()),
    }
}

/// Platform config file location (`~/.config/expel/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("expel").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("expel"))
        .unwrap_or_else(|| PathBuf::from("./expel_data"))
}

/// Create the root folder and its uploads directory if missing
pub fn ensure_root_layout(root_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(root_folder)?;
    std::fs::create_dir_all(uploads_path(root_folder))?;
    Ok(())
}

pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

pub fn uploads_path(root_folder: &Path) -> PathBuf {
    root_folder.join(UPLOADS_DIR)
}
