use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GatewayError;

/// Origin that is always allowed by CORS, whatever `ALLOWED_ORIGINS` says.
pub const DEFAULT_ORIGIN: &str = "https://receiptbooth-photomate.netlify.app";

/// Application configuration.
///
/// Built from defaults, then an optional YAML file named by `CONFIG_FILE`,
/// then environment variables.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub payment: PaymentConfig,
    pub printer: PrinterConfig,

    /// Timeout for calls to object storage and the payment gateway
    pub upstream_timeout_secs: u64,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Key required on uploads. `None` leaves uploads open.
    pub api_key: Option<String>,

    /// Extra CORS origins. Empty or containing `*` allows any origin.
    pub allowed_origins: Vec<String>,

    /// Length of a rate limit window in seconds
    pub rate_limit_window_secs: u64,

    /// Uploads per client per window
    pub upload_rate_limit: u32,

    /// Media listings per client per window
    pub view_rate_limit: u32,

    /// Key rate limits on `X-Forwarded-For`. Only safe behind a reverse proxy
    /// that overwrites the header.
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            api_key: None,
            allowed_origins: Vec::new(),
            rate_limit_window_secs: 15 * 60,
            upload_rate_limit: 100,
            view_rate_limit: 200,
            trust_proxy: false,
        }
    }
}

impl ServerConfig {
    /// Whether CORS should accept any origin.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Explicitly allowed origins, default origin first.
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins = vec![DEFAULT_ORIGIN.to_string()];
        for origin in &self.allowed_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }
}

/// Cloud object storage (Firebase Storage / GCS JSON API)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: Option<String>,

    /// OAuth bearer token for the storage API
    pub access_token: Option<String>,

    pub api_base: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            access_token: None,
            api_base: "https://storage.googleapis.com".to_string(),
        }
    }
}

/// Duitku QRIS gateway credentials
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PaymentConfig {
    pub merchant_code: Option<String>,
    pub api_key: Option<String>,

    /// Gateway base URL, e.g. `https://sandbox.duitku.com`
    pub base_url: Option<String>,

    /// Public URL of this server, used to build callback and return URLs
    pub public_base_url: Option<String>,
}

/// Gateway settings with every required value present.
#[derive(Debug, Clone)]
pub struct GatewayCredentials {
    pub merchant_code: String,
    pub api_key: String,
    pub base_url: String,
    pub public_base_url: String,
}

impl PaymentConfig {
    /// Check that all gateway settings are present.
    ///
    /// Every missing variable is reported, not just the first.
    pub fn validate(&self) -> Result<GatewayCredentials, GatewayError> {
        let fields = [
            ("DUITKU_MERCHANT_CODE", &self.merchant_code),
            ("DUITKU_API_KEY", &self.api_key),
            ("DUITKU_BASE_URL", &self.base_url),
            ("BASE_URL", &self.public_base_url),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(GatewayError::NotConfigured(missing));
        }

        let get = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok(GatewayCredentials {
            merchant_code: get(&self.merchant_code),
            api_key: get(&self.api_key),
            base_url: get(&self.base_url).trim_end_matches('/').to_string(),
            public_base_url: get(&self.public_base_url)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Receipt printer settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PrinterConfig {
    /// Printer device file, e.g. `/dev/usb/lp0`. `None` disables printing.
    pub device: Option<PathBuf>,

    /// Raster width in dots that images are scaled to
    pub width: u32,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: 680,
        }
    }
}

impl AppConfig {
    /// Load configuration from `CONFIG_FILE` (if set) and the environment.
    pub fn load() -> Self {
        let mut config = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::load_file(Path::new(&path)),
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Parse a YAML config file, falling back to defaults on any error.
    pub fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_yaml(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    tracing::warn!(%e, path = %path.display(), "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(%e, path = %path.display(), "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Override settings from environment variables.
    ///
    /// `lookup` returns the value of a variable; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = var("TRUST_PROXY") {
            self.server.trust_proxy = matches!(v.trim(), "1" | "true" | "yes");
        }
        if let Some(v) = var("FIREBASE_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = var("STORAGE_ACCESS_TOKEN") {
            self.storage.access_token = Some(v);
        }
        if let Some(v) = var("STORAGE_API_BASE") {
            self.storage.api_base = v;
        }
        if let Some(v) = var("DUITKU_MERCHANT_CODE") {
            self.payment.merchant_code = Some(v);
        }
        if let Some(v) = var("DUITKU_API_KEY") {
            self.payment.api_key = Some(v);
        }
        if let Some(v) = var("DUITKU_BASE_URL") {
            self.payment.base_url = Some(v);
        }
        if let Some(v) = var("BASE_URL") {
            self.payment.public_base_url = Some(v);
        }
        if let Some(v) = var("PRINTER_DEVICE") {
            self.printer.device = Some(PathBuf::from(v));
        }
        if let Some(width) = var("PRINTER_WIDTH").and_then(|v| v.parse().ok()) {
            self.printer.width = width;
        }
        if let Some(secs) = var("UPSTREAM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.upstream_timeout_secs = secs;
        }
    }

    /// Upstream call timeout; zero means the default.
    pub fn upstream_timeout(&self) -> Duration {
        match self.upstream_timeout_secs {
            0 => Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
