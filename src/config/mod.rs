pub mod settings;

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::FeederResult;
use crate::http::{HttpClient, RetryPolicy, DEFAULT_USER_AGENT};

pub use settings::{DispatcherSettings, Settings, SourceSettings};

/// Process environment: where the config and dump live, and secrets.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path or http(s) URL of the YAML config
    pub config_file: String,
    pub dump_dir: PathBuf,
    pub bot_token: Option<String>,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Load `.env` from the executable's directory, then the current one.
    /// Variables already set win.
    pub fn load_dotenv() {
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        dotenvy::dotenv().ok();
    }

    pub fn from_env() -> Self {
        let config_file = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string());

        let dump_dir = std::env::var("NOTICE_DUMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("dump"));

        let bot_token = std::env::var("TG_BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        Self {
            config_file,
            dump_dir,
            bot_token,
        }
    }

    pub fn with_config_file(mut self, config_file: Option<String>) -> Self {
        if let Some(config_file) = config_file {
            self.config_file = config_file;
        }
        self
    }

    pub fn with_dump_dir(mut self, dump_dir: Option<PathBuf>) -> Self {
        if let Some(dump_dir) = dump_dir {
            self.dump_dir = dump_dir;
        }
        self
    }

    pub fn is_remote_config(&self) -> bool {
        self.config_file.starts_with("http://") || self.config_file.starts_with("https://")
    }

    /// Read and validate the YAML settings, downloading them first when the
    /// config location is a URL.
    pub fn load_settings(&self) -> FeederResult<Settings> {
        if self.is_remote_config() {
            tracing::info!(url = %self.config_file, "downloading config file");
            let http = HttpClient::new(DEFAULT_USER_AGENT, Duration::from_secs(30), RetryPolicy::default())?;
            let document = http.get(&self.config_file)?;
            Settings::from_yaml(&document.text())
        } else {
            tracing::info!(path = %self.config_file, "reading config file");
            Settings::load(std::path::Path::new(&self.config_file))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(config_file: &str) -> Config {
        Config {
            config_file: config_file.to_string(),
            dump_dir: PathBuf::from("dump"),
            bot_token: None,
        }
    }

    #[test]
    fn test_cli_overrides() {
        let config = config("config.yml")
            .with_config_file(Some("other.yml".to_string()))
            .with_dump_dir(None);

        assert_eq!(config.config_file, "other.yml");
        assert_eq!(config.dump_dir, PathBuf::from("dump"));
    }

    #[test]
    fn test_remote_detection() {
        assert!(config("https://example.com/config.yml").is_remote_config());
        assert!(!config("./config.yml").is_remote_config());
    }

    #[test]
    fn test_load_settings_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        std::fs::write(
            &path,
            "dispatchers: [{kind: telegram, chat_id: '@c'}]\nnotice_sources: [{name: A, url: 'http://x/', dispatchers: [telegram]}]",
        )
        .unwrap();

        let settings = config(path.to_str().unwrap()).load_settings().unwrap();
        assert_eq!(settings.notice_sources[0].name, "A");
    }

    #[test]
    fn test_missing_config_file() {
        let err = config("/nonexistent/config.yml").load_settings().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.yml"));
    }
}
