//! Process settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: Option<String>,
    pub config_path: PathBuf,
    pub bind_addr: String,
    /// Overrides the config file's `requestTimeoutSecs` when set.
    pub request_timeout: Option<Duration>,
    pub max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            config_path: PathBuf::from("crudgate.json"),
            bind_addr: "0.0.0.0:3000".to_string(),
            request_timeout: None,
            max_connections: 5,
        }
    }
}

impl Settings {
    /// `DATABASE_URL`, `CONFIG_PATH`, `BIND_ADDR`, `REQUEST_TIMEOUT_SECS`,
    /// `DB_MAX_CONNECTIONS`. Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();
        Settings {
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            config_path: lookup("CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            request_timeout: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
        }
    }
}
