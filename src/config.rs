use std::time::Duration;

use crate::music::PlayerSettings;

pub struct Config {
    pub discord_token: String,
    pub db_path: String,
    pub download_dir: String,
    pub progress_interval_secs: u64,
    pub idle_timeout_secs: u64,
}

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            discord_token: std::env::var("DISCORD_TOKEN")
                .expect("DISCORD_TOKEN environment variable is required"),
            db_path: std::env::var("PEBBLE_DB_PATH")
                .unwrap_or_else(|_| "data/databases/pebble.db".to_string()),
            download_dir: std::env::var("PEBBLE_DOWNLOAD_DIR")
                .unwrap_or_else(|_| "data/downloads/music".to_string()),
            progress_interval_secs: env_secs("PEBBLE_PROGRESS_INTERVAL_SECS", 10),
            idle_timeout_secs: env_secs("PEBBLE_IDLE_TIMEOUT_SECS", 120),
        }
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            progress_interval: Duration::from_secs(self.progress_interval_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}
