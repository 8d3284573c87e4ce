//! # Configuration Management
//!
//! This module handles loading application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix, `__` between nested keys)
//! - Platform variables (HOST, PORT, MAX_FILE_SIZE, FRONTEND_URL)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Converts between the config crate's values and our structs
//! - **derive macros**: Generate Debug, Clone, Serialize, Deserialize
//! - **Layered sources**: Each source overrides the ones added before it
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Platform variables (PORT=3003, MAX_FILE_SIZE=5242880, ...)
//! 2. Prefixed environment variables (APP_SERVER__PORT, APP_PROCESSING__MIN_DELAY_MS, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Configuration is read once at startup; there is no hot reload.

use crate::rate_limit::RateLimitPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each section maps to one component (server, upload validation, CORS,
/// rate limiting, simulated processing, catalog), so a component only ever
/// receives the slice of configuration it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub processing: ProcessingConfig,
    pub catalog: CatalogConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16, // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// Limits applied while reading submissions.
///
/// ## Fields:
/// - `max_file_size_bytes`: Largest accepted audio payload after decoding (default 10 MiB)
/// - `json_body_limit_bytes`: Largest accepted JSON body; base64 inflates audio by a
///   third, so this sits well above the file limit (default 50 MiB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    pub json_body_limit_bytes: usize,
}

/// Cross-origin policy.
///
/// ## Fields:
/// - `frontend_url`: Deployed frontend origin (from FRONTEND_URL)
/// - `allowed_origins`: Exact origins always allowed (local development servers)
/// - `allowed_origin_suffixes`: Host suffixes allowed for preview deployments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub frontend_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub allowed_origin_suffixes: Vec<String>,
}

/// Window length and cap for one rate limit policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicyConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

/// Defaults come from the named policies, so the numbers live in one place.
impl From<RateLimitPolicy> for RateLimitPolicyConfig {
    fn from(policy: RateLimitPolicy) -> Self {
        Self {
            window_ms: policy.window.as_millis() as u64,
            max_requests: policy.max_requests,
        }
    }
}

/// Rate limiting configuration.
///
/// ## Fields:
/// - `general`: Lenient policy wrapped around every `/api` route
/// - `translation`: Stricter policy guarding the translation pipeline
/// - `trust_forwarded_for`: Key callers by `X-Forwarded-For` instead of the socket
///   address; only enable behind a proxy that sets the header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub general: RateLimitPolicyConfig,
    pub translation: RateLimitPolicyConfig,
    pub trust_forwarded_for: bool,
}

/// Simulated inference latency, drawn uniformly from `[min_delay_ms, max_delay_ms]`.
/// Set both to 0 to disable the delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Response catalog source. `path = None` uses the catalog built into the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub path: Option<String>,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(), // Localhost only (safe for development)
                port: 3003,
            },
            upload: UploadConfig {
                max_file_size_bytes: 10 * 1024 * 1024,
                json_body_limit_bytes: 50 * 1024 * 1024,
            },
            cors: CorsConfig {
                frontend_url: None,
                allowed_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:3001".to_string(),
                ],
                allowed_origin_suffixes: vec![".vercel.app".to_string(), ".netlify.app".to_string()],
            },
            rate_limit: RateLimitConfig {
                general: RateLimitPolicy::general().into(),
                translation: RateLimitPolicy::translation().into(),
                trust_forwarded_for: false,
            },
            processing: ProcessingConfig {
                min_delay_ms: 1200,
                max_delay_ms: 3000,
            },
            catalog: CatalogConfig::default(),
        }
    }
}

/// Implementation block for AppConfig - adds methods to the struct.
impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the platform variables HOST, PORT, MAX_FILE_SIZE and FRONTEND_URL
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP_RATE_LIMIT__TRANSLATION__MAX_REQUESTS=50`: Loosen the translation limit
    /// - `APP_PROCESSING__MAX_DELAY_MS=0`: Disable the simulated delay
    /// - `PORT=3000`: Special case for deployment platforms
    /// - `MAX_FILE_SIZE=5242880`: Upload limit in bytes
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists)
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            // Example: APP_SERVER__PORT becomes server.port in the config
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Plain variables used by deployment platforms and existing .env files
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(max_size) = env::var("MAX_FILE_SIZE") {
            settings = settings.set_override("upload.max_file_size_bytes", max_size)?;
        }

        if let Ok(frontend_url) = env::var("FRONTEND_URL") {
            if !frontend_url.trim().is_empty() {
                settings = settings.set_override("cors.frontend_url", frontend_url)?;
            }
        }

        // Build the final configuration and convert it back to our AppConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Upload and body limits are non-zero, and the body limit can hold a max-size file
    /// - Each rate limit policy has a non-zero window and cap
    /// - The delay range is not inverted
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("Max file size must be greater than 0"));
        }

        if self.upload.json_body_limit_bytes < self.upload.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "JSON body limit ({} bytes) must be at least the max file size ({} bytes)",
                self.upload.json_body_limit_bytes,
                self.upload.max_file_size_bytes
            ));
        }

        for (name, policy) in [
            ("general", &self.rate_limit.general),
            ("translation", &self.rate_limit.translation),
        ] {
            if policy.window_ms == 0 {
                return Err(anyhow::anyhow!("Rate limit window for '{}' must be greater than 0", name));
            }
            if policy.max_requests == 0 {
                return Err(anyhow::anyhow!("Rate limit cap for '{}' must be greater than 0", name));
            }
        }

        if self.processing.min_delay_ms > self.processing.max_delay_ms {
            return Err(anyhow::anyhow!(
                "Processing delay range is inverted: {}ms > {}ms",
                self.processing.min_delay_ms,
                self.processing.max_delay_ms
            ));
        }

        Ok(()) // All validation passed
    }

    /// Every origin allowed to call the API, frontend URL first.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors
            .frontend_url
            .iter()
            .chain(self.cors.allowed_origins.iter())
            .map(|origin| origin.trim_end_matches('/').to_string())
            .collect()
    }
}

impl CorsConfig {
    /// Whether `origin` is an `https` origin whose host ends in an allowed suffix.
    pub fn matches_suffix(&self, origin: &str) -> bool {
        let host = match origin.strip_prefix("https://") {
            Some(rest) => rest.split([':', '/']).next().unwrap_or(rest),
            None => return false,
        };
        self.allowed_origin_suffixes
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()) && host.len() > suffix.len())
    }
}
