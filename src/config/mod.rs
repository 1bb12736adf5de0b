//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Secret for verifying login JWTs
    pub jwt_secret: String,

    /// Allowed client origins for CORS (comma separated); any origin
    /// is accepted when unset
    pub client_origin: Option<String>,

    /// Arena width in tiles
    pub arena_width: i32,
    /// Arena height in tiles
    pub arena_height: i32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,

            client_origin: env::var("CLIENT_ORIGIN").ok(),

            arena_width: dimension("ARENA_WIDTH", 32)?,
            arena_height: dimension("ARENA_HEIGHT", 32)?,
        })
    }
}

fn dimension(name: &'static str, default: i32) -> Result<i32, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process wide, so everything lives in
    // one test to keep the mutations serialized.
    #[test]
    fn from_env_reads_overrides_and_defaults() {
        env::set_var("JWT_SECRET", "test-secret");
        env::set_var("PORT", "9001");
        env::set_var("ARENA_WIDTH", "48");
        env::remove_var("ARENA_HEIGHT");
        env::remove_var("CLIENT_ORIGIN");
        env::remove_var("LOG_LEVEL");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server_addr.port(), 9001);
        assert_eq!(config.jwt_secret, "test-secret");
        assert_eq!(config.arena_width, 48);
        assert_eq!(config.arena_height, 32);
        assert_eq!(config.log_level, "info");
        assert!(config.client_origin.is_none());

        env::set_var("ARENA_WIDTH", "not-a-number");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidNumber("ARENA_WIDTH"))
        ));
        env::remove_var("ARENA_WIDTH");

        env::remove_var("JWT_SECRET");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }
}
