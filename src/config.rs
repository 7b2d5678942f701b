use log::LevelFilter;
use serde::Deserialize;
use std::{env, fs::read_to_string, path::Path};

/// The server version extracted from the Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable key to load the config from
const CONFIG_ENV_KEY: &str = "SR_CONFIG_JSON";

pub fn load_config() -> Option<Config> {
    // Attempt to load the config from the env
    if let Ok(env) = env::var(CONFIG_ENV_KEY) {
        let config: Config = match serde_json::from_str(&env) {
            Ok(value) => value,
            Err(err) => {
                eprintln!("Failed to load env config (Using default): {:?}", err);
                return None;
            }
        };
        return Some(config);
    }

    // Attempt to load the config from disk
    let file = Path::new("config.json");
    if !file.exists() {
        return None;
    }

    let data = match read_to_string(file) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Failed to load config file (Using defaults): {:?}", err);
            return None;
        }
    };

    let config: Config = match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Failed to load config file (Using default): {:?}", err);
            return None;
        }
    };

    Some(config)
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the local terminal client connects to
    pub listen_host: String,
    pub listen_port: u16,
    /// Remote game server to proxy
    pub server: ServerConfig,
    /// Path of the sqlite database file
    pub database_file: String,
    /// Directory scripts are loaded from
    pub script_dir: String,
    pub logging: LevelFilter,
    pub logging_dir: String,
    /// Milliseconds UI notifications are coalesced over
    pub event_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: "127.0.0.1".to_string(),
            listen_port: 2002,
            server: Default::default(),
            database_file: "data/universe.db".to_string(),
            script_dir: "scripts".to_string(),
            logging: LevelFilter::Info,
            logging_dir: "data/logs".to_string(),
            event_debounce_ms: 150,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Name shown in database state notifications
    pub game_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 23,
            game_name: "Trade Wars 2002".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    #[test]
    fn test_defaults_applied_to_partial_config() {
        let config: Config = serde_json::from_str(r#"{"listen_port": 4000}"#).unwrap();
        assert_eq!(config.listen_port, 4000);
        assert_eq!(config.server.port, 23);
        assert_eq!(config.event_debounce_ms, 150);
    }
}
