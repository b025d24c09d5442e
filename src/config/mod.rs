//! Configuration module for the LinkVault backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default upload limit in MiB when `LINKVAULT_MAX_FILE_BUFFER` is unset.
pub const DEFAULT_MAX_FILE_BUFFER_MIB: u64 = 10;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Root directory for preserved artifacts
    pub storage_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Public base URL of this instance, without a trailing slash.
    /// Empty means preserved links are emitted as relative URLs.
    pub instance_url: String,
    /// Whether outbound email delivery is configured.
    pub email_enabled: bool,
    /// Upload limit in MiB
    pub max_file_buffer_mib: u64,
    pub stripe_enabled: bool,
    pub google_sso_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("LINKVAULT_API_PSK").ok();

        let db_path = env::var("LINKVAULT_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let index_path = env::var("LINKVAULT_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let storage_path = env::var("LINKVAULT_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/storage".to_string())
            .into();

        let bind_addr = env::var("LINKVAULT_BIND_ADDR")
            .ok()
            .and_then(|addr| match addr.parse() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    eprintln!("Invalid LINKVAULT_BIND_ADDR {addr:?}, using 127.0.0.1:8080");
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let log_level = env::var("LINKVAULT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("LINKVAULT_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let instance_url = env::var("LINKVAULT_INSTANCE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();

        // Email delivery needs both a sender and a transport.
        let email_enabled = env_non_empty("LINKVAULT_EMAIL_FROM")
            && env_non_empty("LINKVAULT_EMAIL_SERVER");

        let max_file_buffer_mib = env::var("LINKVAULT_MAX_FILE_BUFFER")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|mib| *mib > 0)
            .unwrap_or(DEFAULT_MAX_FILE_BUFFER_MIB);

        let stripe_enabled = env_flag("LINKVAULT_STRIPE_ENABLED");
        let google_sso_enabled = env_flag("LINKVAULT_GOOGLE_SSO_ENABLED");

        Self {
            api_psk,
            db_path,
            index_path,
            storage_path,
            bind_addr,
            log_level,
            log_format,
            instance_url,
            email_enabled,
            max_file_buffer_mib,
            stripe_enabled,
            google_sso_enabled,
        }
    }

    /// Maximum accepted upload size in bytes.
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_buffer_mib * 1024 * 1024
    }
}

fn env_non_empty(key: &str) -> bool {
    env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| v == "true").unwrap_or(false)
}
