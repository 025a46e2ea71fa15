//! # ExpelAI Common Library
//!
//! Shared code for the ExpelAI monitoring service:
//! - Record data model and field validation
//! - Error taxonomy
//! - Configuration loading and root folder resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{RecordKind, RiskLevel};
