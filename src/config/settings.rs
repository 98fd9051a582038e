use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::dispatch::DispatcherKind;
use crate::errors::{FeederError, FeederResult};
use crate::http::{RetryPolicy, DEFAULT_USER_AGENT};
use crate::sources::ReaderKind;

pub const DEFAULT_MAX_DUMP: usize = 50;
pub const DEFAULT_UPLOAD_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "csv", "zip", "rar",
];

/// Contents of the YAML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_max_dump")]
    pub max_dump: usize,
    #[serde(default = "default_user_agent", alias = "ua_agent")]
    pub user_agent: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_upload_extensions")]
    pub upload_extensions: Vec<String>,
    #[serde(default)]
    pub dispatchers: Vec<DispatcherSettings>,
    #[serde(default)]
    pub notice_sources: Vec<SourceSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherSettings {
    /// Defaults to the kind, e.g. `telegram`
    #[serde(default)]
    pub name: Option<String>,
    pub kind: DispatcherKind,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub upload_extensions: Option<Vec<String>>,
}

impl DispatcherSettings {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub reader: ReaderKind,
    pub dispatchers: Vec<String>,
    #[serde(default)]
    pub max_dump: Option<usize>,
}

fn default_max_dump() -> usize {
    DEFAULT_MAX_DUMP
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_retries() -> u32 {
    crate::http::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_upload_extensions() -> Vec<String> {
    DEFAULT_UPLOAD_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> FeederResult<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> FeederResult<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| FeederError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> FeederResult<()> {
        if self.notice_sources.is_empty() {
            return Err(FeederError::Config(
                "`notice_sources` are required in the config file".to_string(),
            ));
        }
        if self.max_dump == 0 {
            return Err(FeederError::Config("`max_dump` must be positive".to_string()));
        }

        let mut dispatcher_names = HashSet::new();
        for dispatcher in &self.dispatchers {
            if !dispatcher_names.insert(dispatcher.name()) {
                return Err(FeederError::Config(format!(
                    "duplicate dispatcher name '{}'",
                    dispatcher.name()
                )));
            }
        }

        let mut source_names = HashSet::new();
        for source in &self.notice_sources {
            if !is_valid_source_name(&source.name) {
                return Err(FeederError::Config(format!(
                    "source name '{}' may only contain letters, digits, '_', '-' and '.'",
                    source.name
                )));
            }
            if !source_names.insert(source.name.as_str()) {
                return Err(FeederError::Config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            Url::parse(&source.url)
                .map_err(|e| FeederError::InvalidUrl(format!("{}: {}", source.url, e)))?;
            if source.max_dump == Some(0) {
                return Err(FeederError::Config(format!(
                    "source '{}': `max_dump` must be positive",
                    source.name
                )));
            }
            if source.dispatchers.is_empty() {
                return Err(FeederError::Config(format!(
                    "source '{}' has no dispatchers",
                    source.name
                )));
            }
            if let Some(unknown) = source
                .dispatchers
                .iter()
                .find(|name| !dispatcher_names.contains(name.as_str()))
            {
                return Err(FeederError::Config(format!(
                    "source '{}' references unknown dispatcher '{}'",
                    source.name, unknown
                )));
            }
        }

        Ok(())
    }

    /// Per-source cap, falling back to the global one
    pub fn max_dump_for(&self, source: &SourceSettings) -> usize {
        source.max_dump.unwrap_or(self.max_dump)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Source names double as history file names
fn is_valid_source_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("static regex"))
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
max_dump: 30
dispatchers:
  - kind: telegram
    chat_id: "@ggsipu_notices"
  - name: archive
    kind: telegram
    chat_id: "-1001234"
    upload_extensions: [pdf]
notice_sources:
  - name: OfficialNotice
    url: http://www.ipu.ac.in/notices.php
    dispatchers: [telegram]
  - name: Examination
    url: http://www.ipu.ac.in/exam_notices.php
    dispatchers: [telegram, archive]
    max_dump: 10
  - name: Blog
    url: https://example.com/feed.xml
    reader: rss
    dispatchers: [archive]
"#;

    #[test]
    fn test_parse_full_config() {
        let settings = Settings::from_yaml(CONFIG).unwrap();

        assert_eq!(settings.max_dump, 30);
        assert_eq!(settings.retries, 10);
        assert_eq!(settings.dispatchers[0].name(), "telegram");
        assert_eq!(settings.dispatchers[1].name(), "archive");
        assert_eq!(settings.notice_sources.len(), 3);
        assert_eq!(settings.notice_sources[0].reader, ReaderKind::HtmlTable);
        assert_eq!(settings.notice_sources[2].reader, ReaderKind::Rss);
        assert!(settings.upload_extensions.contains(&"pdf".to_string()));
    }

    #[test]
    fn test_max_dump_fallback() {
        let settings = Settings::from_yaml(CONFIG).unwrap();

        assert_eq!(settings.max_dump_for(&settings.notice_sources[0]), 30);
        assert_eq!(settings.max_dump_for(&settings.notice_sources[1]), 10);
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_yaml(
            "dispatchers: [{kind: telegram, chat_id: '@c'}]\nnotice_sources: [{name: A, url: 'http://x/', dispatchers: [telegram]}]",
        )
        .unwrap();

        assert_eq!(settings.max_dump, DEFAULT_MAX_DUMP);
        assert_eq!(settings.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.upload_extensions.len(), DEFAULT_UPLOAD_EXTENSIONS.len());
    }

    #[test]
    fn test_sources_required() {
        let err = Settings::from_yaml("max_dump: 5").unwrap_err();
        assert!(err.to_string().contains("notice_sources"));
    }

    #[test]
    fn test_unknown_dispatcher_reference() {
        let yaml = "dispatchers: [{kind: telegram, chat_id: '@c'}]\nnotice_sources: [{name: A, url: 'http://x/', dispatchers: [slack]}]";
        let err = Settings::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown dispatcher 'slack'"));
    }

    #[test]
    fn test_unknown_dispatcher_kind_is_parse_error() {
        let yaml = "dispatchers: [{kind: pigeon}]\nnotice_sources: [{name: A, url: 'http://x/', dispatchers: [pigeon]}]";
        assert!(matches!(Settings::from_yaml(yaml), Err(FeederError::Yaml(_))));
    }

    #[test]
    fn test_duplicate_source_names() {
        let yaml = "dispatchers: [{kind: telegram, chat_id: '@c'}]\nnotice_sources:\n  - {name: A, url: 'http://x/', dispatchers: [telegram]}\n  - {name: A, url: 'http://y/', dispatchers: [telegram]}";
        let err = Settings::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate source name"));
    }

    #[test]
    fn test_source_name_must_be_file_safe() {
        assert!(is_valid_source_name("Exam_Notices-2024.v2"));
        assert!(!is_valid_source_name("../etc"));
        assert!(!is_valid_source_name("with space"));
        assert!(!is_valid_source_name(""));
    }

    #[test]
    fn test_zero_max_dump_rejected() {
        let yaml = "dispatchers: [{kind: telegram, chat_id: '@c'}]\nnotice_sources: [{name: A, url: 'http://x/', dispatchers: [telegram], max_dump: 0}]";
        assert!(Settings::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let yaml = "dispatchers: [{kind: telegram, chat_id: '@c'}]\nnotice_sources: [{name: A, url: 'notices.php', dispatchers: [telegram]}]";
        assert!(matches!(Settings::from_yaml(yaml), Err(FeederError::InvalidUrl(_))));
    }
}
