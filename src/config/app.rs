//! Application configuration.
//!
//! Values come from an optional TOML file (`treasurer.toml`, or the path in
//! `TREASURER_CONFIG`) and are then overridden field by field from environment
//! variables, which `main` loads from `.env` through `dotenvy` beforehand.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::core::settings::BalancePolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "treasurer.toml";

/// Longest accepted bearer token lifetime (one year)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Runtime configuration shared by every request handler.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `sqlite://...` or `postgres://...`
    pub database_url: String,
    /// Socket address the HTTP server listens on
    pub bind_addr: String,
    /// HS256 secret for bearer tokens; authentication is disabled without it
    pub jwt_secret: Option<String>,
    /// Bootstrap admin login that needs no member row
    pub admin_email: Option<String>,
    /// Password for [`AppConfig::admin_email`]
    pub admin_password: Option<String>,
    /// How payment mutations move the scalar balance
    pub balance_policy: BalancePolicy,
    /// Bearer token lifetime
    pub token_ttl_hours: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: "0.0.0.0:4000".to_string(),
            jwt_secret: None,
            admin_email: None,
            admin_password: None,
            balance_policy: BalancePolicy::default(),
            token_ttl_hours: 12,
        }
    }
}

impl AppConfig {
    /// Both bootstrap admin credentials are present.
    #[must_use]
    pub const fn admin_configured(&self) -> bool {
        self.admin_email.is_some() && self.admin_password.is_some()
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = get("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }
        if let Some(email) = get("ADMIN_EMAIL") {
            self.admin_email = Some(email);
        }
        if let Some(password) = get("ADMIN_PASSWORD") {
            self.admin_password = Some(password);
        }
        if let Some(policy) = get("BALANCE_POLICY") {
            self.balance_policy = policy.parse()?;
        }
        if let Some(ttl) = get("TOKEN_TTL_HOURS") {
            self.token_ttl_hours = ttl.trim().parse().map_err(|e| Error::Config {
                message: format!("TOKEN_TTL_HOURS must be an integer: {e}"),
            })?;
        }
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.token_ttl_hours) {
            return Err(Error::Config {
                message: format!(
                    "token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS}, got {}",
                    self.token_ttl_hours
                ),
            });
        }
        Ok(self)
    }
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse TOML from {}: {e}", path_ref.display()),
    })
}

/// Loads the file (if present) and applies process environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var("TREASURER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let base = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        tracing::info!("No configuration file at {path}, using defaults");
        AppConfig::default()
    };
    base.with_overrides(|key| std::env::var(key).ok())
}
