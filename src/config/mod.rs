//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Default lifetime of a login token (one day)
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Supabase backend; `None` keeps accounts in memory
    pub supabase: Option<SupabaseConfig>,

    /// HMAC secret for login tokens
    pub session_secret: String,
    /// Login token lifetime in seconds
    pub session_ttl_secs: u64,

    /// Key guarding the player listing
    pub admin_key: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
}

/// Supabase connection settings
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    /// Supabase project URL
    pub url: String,
    /// Service role key (bypasses RLS - server only!)
    pub service_role_key: String,
    /// Table holding player accounts
    pub accounts_table: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let supabase = match (lookup("SUPABASE_URL"), lookup("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                service_role_key,
                accounts_table: lookup("SUPABASE_ACCOUNTS_TABLE")
                    .unwrap_or_else(|| "accounts".to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
        };

        let session_ttl_secs = match lookup("SESSION_TTL_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("SESSION_TTL_SECS"))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            supabase,

            session_secret: lookup("SESSION_SECRET")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("SESSION_SECRET"))?,
            session_ttl_secs,

            admin_key: lookup("ADMIN_KEY")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("ADMIN_KEY"))?,
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().expect("valid address"),
        log_level: "debug".to_string(),
        supabase: None,
        session_secret: "test-secret".to_string(),
        session_ttl_secs: 3_600,
        admin_key: "admin".to_string(),
        client_origin: "*".to_string(),
    }
}
