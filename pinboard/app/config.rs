use std::env;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub session_ttl_secs: i64,
}

impl Config {
    /// Reads the configuration from the environment (and `.env`, if any).
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            info!("No .env file loaded: {e}");
        }
        Ok(Self {
            port: try_load("PORT", "3000")?,
            database_url: try_load("DATABASE_URL", "pinboard.sqlite3")?,
            secret_key: var("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            media_url: try_load("MEDIA_URL", "/media/")?,
            // Two weeks, the usual lifetime of a login cookie.
            session_ttl_secs: try_load("SESSION_TTL_SECS", "1209600")?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid(key, e.to_string())
        })
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "environment variable {} must be set", key),
            ConfigError::Invalid(key, e) => write!(f, "invalid value for {}: {}", key, e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load() {
        env::set_var("PINBOARD_TEST_PORT_OK", "8080");
        env::set_var("PINBOARD_TEST_PORT_BAD", "eighty");
        assert_eq!(try_load::<u16>("PINBOARD_TEST_PORT_OK", "1").unwrap(), 8080);
        assert_eq!(try_load::<u16>("PINBOARD_TEST_PORT_UNSET", "3000").unwrap(), 3000);
        match try_load::<u16>("PINBOARD_TEST_PORT_BAD", "1") {
            Err(ConfigError::Invalid(key, _)) => assert_eq!(key, "PINBOARD_TEST_PORT_BAD"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
