//! Configuration types.
//!
//! Everything is injected from the environment. The backend endpoint and its
//! public API key are never compiled in.

use std::net::IpAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default port for the local UI server.
pub const DEFAULT_PORT: u16 = 8080;

/// Which backend the hub talks to.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// A Supabase project (GoTrue auth + PostgREST rows).
    Supabase(SupabaseConfig),
    /// Process-local in-memory backend. Data is lost on exit.
    Memory,
}

/// Connection details for a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public (anon) API key.
    pub anon_key: SecretString,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: SecretString::from(anon_key.into()),
        }
    }
}

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub backend: BackendConfig,
    /// Address the UI server binds to.
    pub bind: IpAddr,
    /// Port the UI server listens on.
    pub port: u16,
    /// Directory for daily-rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl HubConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match non_empty("HUB_BACKEND").as_deref().unwrap_or("supabase") {
            "supabase" => {
                let url = non_empty("HUB_SUPABASE_URL")
                    .ok_or_else(|| ConfigError::MissingEnvVar("HUB_SUPABASE_URL".into()))?;
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        key: "HUB_SUPABASE_URL".into(),
                        message: format!("expected an http(s) URL, got {url:?}"),
                    });
                }
                let anon_key = non_empty("HUB_SUPABASE_ANON_KEY")
                    .ok_or_else(|| ConfigError::MissingEnvVar("HUB_SUPABASE_ANON_KEY".into()))?;
                BackendConfig::Supabase(SupabaseConfig::new(url, anon_key))
            }
            "memory" => BackendConfig::Memory,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "HUB_BACKEND".into(),
                    message: format!("unknown backend {other:?} (expected supabase or memory)"),
                });
            }
        };

        let bind = match non_empty("HUB_BIND") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "HUB_BIND".into(),
                message: format!("{e}"),
            })?,
            None => IpAddr::from([127, 0, 0, 1]),
        };

        let port = match non_empty("HUB_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "HUB_PORT".into(),
                message: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            backend,
            bind,
            port,
            log_dir: non_empty("HUB_LOG_DIR").map(PathBuf::from),
        })
    }
}
