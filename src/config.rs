use crate::error::{Result, ScanError};
use std::time::Duration;

pub const DEFAULT_SCAN_PATH: &str = "/api/documents/scan";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Backend settings for the scan pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub scan_path: String,
    pub timeout: Duration,
}

/// Load `.env` from the working directory, then from the user config dir (`<config>/klipp/.env`)
/// so installed binaries can keep credentials there. Variables already set are never replaced.
fn load_env() {
    let _ = dotenvy::dotenv();
    if let Some(dir) = dirs::config_dir() {
        let env_path = dir.join("klipp").join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
    }
}

impl ScanConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            scan_path: DEFAULT_SCAN_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        load_env();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, test fixtures).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = non_empty("KLIPP_API_URL")
            .ok_or_else(|| ScanError::Config("KLIPP_API_URL not set in .env".to_string()))?;
        let mut config = Self::new(api_url);
        config.api_token = non_empty("KLIPP_API_TOKEN");
        if let Some(path) = non_empty("KLIPP_SCAN_PATH") {
            config.scan_path = if path.starts_with('/') { path } else { format!("/{}", path) };
        }
        if let Some(raw) = non_empty("KLIPP_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ScanError::Config(format!("KLIPP_HTTP_TIMEOUT_SECS must be a whole number, got '{}'", raw))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Whether the environment (after loading `.env`) names a backend URL.
    pub fn is_configured() -> bool {
        load_env();
        Self::is_configured_in(|key| std::env::var(key).ok())
    }

    /// Same check as [`ScanConfig::is_configured`] against any key lookup.
    pub fn is_configured_in<F>(lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("KLIPP_API_URL").map_or(false, |url| !url.trim().is_empty())
    }

    /// "configured" / "not_configured", for status output.
    pub fn status_label(configured: bool) -> &'static str {
        if configured {
            "configured"
        } else {
            "not_configured"
        }
    }

    pub fn status() -> &'static str {
        Self::status_label(Self::is_configured())
    }

    pub fn scan_url(&self) -> String {
        format!("{}{}", self.api_url, self.scan_path)
    }
}
