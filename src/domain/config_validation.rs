//! Configuration validation and resolved settings.
//!
//! Every key is optional; defaults apply when a key is absent. A present but
//! malformed value is an error.

use std::net::SocketAddr;

use crate::domain::einvoice::Provider;
use crate::domain::error::AnalystError;
use crate::domain::sales_sync::{DEFAULT_SYNC_LIMIT, DEFAULT_WINDOW_DAYS, SalesSourceConfig};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const DEFAULT_UPLOAD_DATASET: &str = "uploaded";
pub const DEFAULT_PREVIEW_ROWS: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub frontend_url: String,
    pub upload_dataset: String,
    pub preview_rows: usize,
    pub einvoice_provider: Provider,
    pub nit_emisor: Option<String>,
    pub sales: SalesSourceConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8000)),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            upload_dataset: DEFAULT_UPLOAD_DATASET.to_string(),
            preview_rows: DEFAULT_PREVIEW_ROWS as usize,
            einvoice_provider: Provider::Stub,
            nit_emisor: None,
            sales: SalesSourceConfig::default(),
        }
    }
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<Settings, AnalystError> {
    Ok(Settings {
        listen: validate_listen(config)?,
        frontend_url: config
            .get_string("server", "frontend_url")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
        upload_dataset: validate_upload_dataset(config)?,
        preview_rows: validate_preview_rows(config)?,
        einvoice_provider: validate_provider(config)?,
        nit_emisor: config
            .get_string("einvoice", "nit_emisor")
            .filter(|s| !s.trim().is_empty()),
        sales: validate_sales(config)?,
    })
}

fn validate_listen(config: &dyn ConfigPort) -> Result<SocketAddr, AnalystError> {
    let value = config
        .get_string("server", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    value.trim().parse().map_err(|_| AnalystError::ConfigInvalid {
        section: "server".to_string(),
        key: "listen".to_string(),
        reason: format!("'{value}' is not a socket address (expected host:port)"),
    })
}

fn validate_upload_dataset(config: &dyn ConfigPort) -> Result<String, AnalystError> {
    match config.get_string("analysis", "upload_dataset") {
        None => Ok(DEFAULT_UPLOAD_DATASET.to_string()),
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(AnalystError::ConfigInvalid {
            section: "analysis".to_string(),
            key: "upload_dataset".to_string(),
            reason: "upload_dataset must not be empty".to_string(),
        }),
    }
}

/// A present integer key must parse and be at least 1.
fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, AnalystError> {
    let value = config.get_int(section, key)?.unwrap_or(default);
    if value < 1 {
        return Err(AnalystError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be at least 1, got {value}"),
        });
    }
    Ok(value)
}

fn validate_preview_rows(config: &dyn ConfigPort) -> Result<usize, AnalystError> {
    positive_int(config, "analysis", "preview_rows", DEFAULT_PREVIEW_ROWS).map(|v| v as usize)
}

fn validate_sales(config: &dyn ConfigPort) -> Result<SalesSourceConfig, AnalystError> {
    let defaults = SalesSourceConfig::default();
    let text = |key: &str, default: String| {
        config
            .get_string("techaura", key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
    };
    Ok(SalesSourceConfig {
        api_key: text("api_key", defaults.api_key),
        api_url: text("api_url", defaults.api_url),
        company_id: text("company_id", defaults.company_id),
        sync_limit: positive_int(config, "techaura", "sync_limit", DEFAULT_SYNC_LIMIT as i64)?
            as usize,
        window_days: positive_int(config, "techaura", "window_days", DEFAULT_WINDOW_DAYS)?,
    })
}

fn validate_provider(config: &dyn ConfigPort) -> Result<Provider, AnalystError> {
    match config.get_string("einvoice", "provider") {
        None => Ok(Provider::Stub),
        Some(s) => s.parse(),
    }
}
