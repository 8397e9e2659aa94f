use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Connection settings for the remote drive API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL all provider paths are appended to, e.g. `https://api.dooray.com/drive/v1`.
    pub base_url: String,
    /// Scheme placed in front of the credential token in the `Authorization` header.
    pub auth_scheme: String,
    /// Value of the `type` filter used when listing drives.
    pub drive_type: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Largest accepted response body. Bigger bodies fail the call as a decode error.
    pub max_response_bytes: usize,
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeConfig {
    /// Upper bound of provider calls in flight for one credential.
    pub max_inflight_calls: usize,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    pub credential_concurrency: usize,
    pub credential_timeout_ms: u64,
}

impl AggregatorConfig {
    pub fn credential_timeout(&self) -> Duration {
        Duration::from_millis(self.credential_timeout_ms)
    }
}

/// Sliding-window request limits per client IP.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub global_max_requests: usize,
    pub global_window_seconds: u64,
    /// `POST /api/drives/load` per minute.
    pub drive_load_per_minute: usize,
    /// `GET /api/drives/connect` per minute.
    pub drive_connect_per_minute: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub tree: TreeConfig,
    pub aggregator: AggregatorConfig,
    pub rate_limit: RateLimitConfig,
    pub security: Option<SecurityConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
        {
            Ok(app_cfg) => app_cfg,
            Err(e) => {
                eprintln!("FATAL: Failed to load embedded default config: {}", e);
                panic!("Failed to load embedded default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: drivehub.toml (in CWD)
        .add_source(::config::File::with_name("drivehub").required(false));

    if let Ok(custom_path) = std::env::var("DRIVEHUB_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("DRIVEHUB").separator("__"));

    let app_cfg: AppConfig = builder.build()?.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Layers a TOML snippet over the embedded defaults and validates the result.
pub fn from_toml_str(overlay: &str) -> anyhow::Result<AppConfig> {
    let app_cfg: AppConfig = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::from_str(overlay, ::config::FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Provider
    let base = reqwest::Url::parse(&cfg.provider.base_url)
        .map_err(|e| anyhow::anyhow!("invalid provider.base_url {}: {}", cfg.provider.base_url, e))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(anyhow::anyhow!("provider.base_url must use http or https"));
    }
    if base.cannot_be_a_base() {
        return Err(anyhow::anyhow!("provider.base_url cannot carry path segments"));
    }
    if cfg.provider.auth_scheme.trim().is_empty() {
        return Err(anyhow::anyhow!("provider.auth_scheme must not be empty"));
    }
    if cfg.provider.request_timeout_ms == 0 {
        return Err(anyhow::anyhow!("provider.request_timeout_ms must be > 0"));
    }
    if cfg.provider.connect_timeout_ms == 0 {
        return Err(anyhow::anyhow!("provider.connect_timeout_ms must be > 0"));
    }
    if cfg.provider.max_response_bytes == 0 {
        return Err(anyhow::anyhow!("provider.max_response_bytes must be > 0"));
    }

    // Tree
    if cfg.tree.max_inflight_calls == 0 || cfg.tree.max_inflight_calls > 256 {
        return Err(anyhow::anyhow!("tree.max_inflight_calls must be in 1..=256"));
    }

    // Aggregator
    if cfg.aggregator.credential_concurrency == 0 || cfg.aggregator.credential_concurrency > 64 {
        return Err(anyhow::anyhow!("aggregator.credential_concurrency must be in 1..=64"));
    }
    if cfg.provider.request_timeout_ms >= cfg.aggregator.credential_timeout_ms {
        return Err(anyhow::anyhow!(
            "provider.request_timeout_ms ({}) must be shorter than aggregator.credential_timeout_ms ({})",
            cfg.provider.request_timeout_ms,
            cfg.aggregator.credential_timeout_ms
        ));
    }

    // Rate limits
    let rl = &cfg.rate_limit;
    if rl.global_max_requests == 0 || rl.global_window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.global_* must be > 0"));
    }
    if rl.drive_load_per_minute == 0 || rl.drive_connect_per_minute == 0 {
        return Err(anyhow::anyhow!("rate_limit.drive_*_per_minute must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        // sqlite:///C:/... -> C:/...
        #[cfg(windows)]
        let path = {
            let bytes = path.as_bytes();
            if bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &path[1..]
            } else {
                path
            }
        };
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
