//! Service configuration
//!
//! Each setting resolves in priority order: command line, environment (via
//! clap `env` fallbacks), TOML config file, built-in default. The root
//! folder follows the shared four-tier resolution in `expel_common::config`.

use clap::Parser;
use expel_common::config::{self as common_config, TomlConfig, ROOT_FOLDER_ENV};
use expel_common::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::inference_gateway::DEFAULT_MODEL;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for expel-api
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "expel-api")]
#[command(about = "ExpelAI pest detection and sensor monitoring API")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "EXPEL_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "EXPEL_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Root folder holding the database and uploaded images
    /// (falls back to EXPEL_ROOT_FOLDER, then the config file)
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "EXPEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "EXPEL_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub root_folder: PathBuf,
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub inference_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub cleanup_failed_uploads: bool,
    pub log_level: String,
}

impl ServiceConfig {
    /// Load the TOML file named by `args` (or the default one) and resolve
    pub fn load(args: Args) -> Result<Self> {
        let toml_config = common_config::load_optional_config(args.config.as_deref())?;
        Self::resolve(args, toml_config)
    }

    /// Merge arguments over a parsed TOML config
    pub fn resolve(args: Args, toml_config: TomlConfig) -> Result<Self> {
        let root_folder = common_config::resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);

        let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
        let bind_address = args
            .bind_address
            .or(toml_config.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_addr: SocketAddr = format!("{}:{}", bind_address, port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}:{}': {}", bind_address, port, e)))?;

        let inference = toml_config.inference;
        let api_key = args
            .api_key
            .or(inference.api_key)
            .filter(|key| !key.trim().is_empty());

        let timeout_secs = inference.timeout_seconds.unwrap_or(DEFAULT_INFERENCE_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("inference.timeout_seconds must be greater than 0".to_string()));
        }

        let allowed_origins = toml_config
            .allowed_origins
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);
        if allowed_origins.iter().any(|origin| origin.trim() == "*") {
            return Err(Error::Config(
                "allowed_origins cannot contain \"*\" because credentials are allowed; list origins explicitly"
                    .to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            db_path: common_config::database_path(&root_folder),
            uploads_dir: common_config::uploads_path(&root_folder),
            root_folder,
            api_key,
            model: args.model.or(inference.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: inference.base_url,
            inference_timeout: Duration::from_secs(timeout_secs),
            allowed_origins,
            max_upload_bytes: toml_config.uploads.max_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            cleanup_failed_uploads: toml_config.uploads.cleanup_failed.unwrap_or(false),
            log_level: args
                .log_level
                .or(toml_config.logging.level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}
