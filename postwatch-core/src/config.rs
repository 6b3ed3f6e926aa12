use crate::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HANDLE_ENV_VAR: &str = "POSTWATCH_USER";

/// Upper bound for the poll interval and for the jitter window: one day.
pub const MAX_POLL_SECS: u64 = 24 * 60 * 60;
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub handle: Option<String>,
    pub store_path: PathBuf,
    pub poll_interval_secs: u64,
    pub poll_jitter_secs: u64,
    pub latest_count: u32,
    pub failure_threshold: u32,
    pub request_timeout_secs: u64,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            handle: None,
            store_path: PathBuf::from("tweets.bin"),
            poll_interval_secs: 10,
            poll_jitter_secs: 5,
            latest_count: 5,
            failure_threshold: 20,
            request_timeout_secs: 30,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Loads `path` when given, otherwise starts from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn with_handle(mut self, handle: Option<String>) -> Self {
        if handle.is_some() {
            self.handle = handle;
        }
        self
    }

    pub fn with_store_path(mut self, store_path: Option<PathBuf>) -> Self {
        if let Some(path) = store_path {
            self.store_path = path;
        }
        self
    }

    /// The target handle without a leading `@`.
    pub fn handle(&self) -> Result<&str, ConfigError> {
        let handle = self
            .handle
            .as_deref()
            .map(|h| h.trim().trim_start_matches('@'))
            .unwrap_or_default();
        if handle.is_empty() {
            return Err(ConfigError::MissingField {
                field: format!(
                    "handle (set the {} environment variable or pass --user, e.g. --user thegrugq)",
                    HANDLE_ENV_VAR
                ),
            });
        }
        Ok(handle)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.handle()?;
        check_range("poll_interval_secs", self.poll_interval_secs, 1..=MAX_POLL_SECS)?;
        check_range("poll_jitter_secs", self.poll_jitter_secs, 0..=MAX_POLL_SECS)?;
        check_range(
            "request_timeout_secs",
            self.request_timeout_secs,
            1..=MAX_REQUEST_TIMEOUT_SECS,
        )?;
        check_range("latest_count", u64::from(self.latest_count), 1..=u64::MAX)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_jitter(&self) -> Duration {
        Duration::from_secs(self.poll_jitter_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn check_range(
    field: &str,
    value: u64,
    range: std::ops::RangeInclusive<u64>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        value: format!(
            "{} (expected {}..={})",
            value,
            range.start(),
            range.end()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.poll_jitter(), Duration::from_secs(5));
        assert_eq!(config.latest_count, 5);
        assert_eq!(config.failure_threshold, 20);
        assert!(config.handle.is_none());
    }

    #[test]
    fn test_missing_handle_is_rejected() {
        let err = AppConfig::default().validate().unwrap_err();
        match err {
            ConfigError::MissingField { field } => {
                assert!(field.contains(HANDLE_ENV_VAR));
                assert!(field.contains("--user"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_handle_is_rejected() {
        let config = AppConfig::default().with_handle(Some("  @ ".to_string()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_handle_strips_at_sign() {
        let config = AppConfig::default().with_handle(Some("@thegrugq".to_string()));
        assert_eq!(config.handle().unwrap(), "thegrugq");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            handle = "thegrugq"
            poll_interval_secs = 60
            store_path = "/var/lib/postwatch/tweets.bin"
            "#,
        )
        .unwrap();
        assert_eq!(config.handle().unwrap(), "thegrugq");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.poll_jitter_secs, 5);
        assert_eq!(
            config.store_path,
            PathBuf::from("/var/lib/postwatch/tweets.bin")
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = AppConfig::from_toml_str(r#"handle = "from_file""#)
            .unwrap()
            .with_handle(Some("from_cli".to_string()))
            .with_store_path(None);
        assert_eq!(config.handle().unwrap(), "from_cli");
        assert_eq!(config.store_path, PathBuf::from("tweets.bin"));
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let mut config = AppConfig::default().with_handle(Some("thegrugq".to_string()));
        config.poll_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_huge_poll_values_are_invalid() {
        let mut config = AppConfig::default().with_handle(Some("thegrugq".to_string()));
        config.poll_interval_secs = u64::MAX;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "poll_interval_secs"),
            other => panic!("unexpected result: {other:?}"),
        }

        config.poll_interval_secs = MAX_POLL_SECS;
        config.poll_jitter_secs = MAX_POLL_SECS + 1;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "poll_jitter_secs"),
            other => panic!("unexpected result: {other:?}"),
        }

        config.poll_jitter_secs = MAX_POLL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_request_timeout_is_invalid() {
        let mut config = AppConfig::default().with_handle(Some("thegrugq".to_string()));
        config.request_timeout_secs = 0;
        match config.validate() {
            Err(ConfigError::InvalidValue { field, value }) => {
                assert_eq!(field, "request_timeout_secs");
                assert!(value.starts_with("0 "));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(
            AppConfig::from_toml_str("poll_interval_secs = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("postwatch_{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::FileNotFound { .. })
        ));
    }
}
