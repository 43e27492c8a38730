// Runtime configuration, read from the environment

use std::path::PathBuf;

pub const ENV_DATABASE: &str = "BANCO_DATABASE";
pub const ENV_BIND_ADDR: &str = "BANCO_BIND_ADDR";
pub const ENV_LOG: &str = "BANCO_LOG";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite file; ":memory:" keeps everything in memory
    pub database_path: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Default `EnvFilter` directive when RUST_LOG is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("banco_alimentos.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DATABASE) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(addr) = get(ENV_BIND_ADDR) {
            config.bind_addr = addr;
        }
        if let Some(level) = get(ENV_LOG) {
            config.log_level = level;
        }

        config
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}
