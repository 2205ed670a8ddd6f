//! Run configuration.
//!
//! [`Config`] is resolved once at start-up from the CLI and an optional YAML
//! settings file, validated, and then passed by reference to every component.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::cli::Cli;
use crate::error::ConfigError;

/// Optional tuning knobs read from `settings.yaml`.
///
/// Every key may be omitted; missing keys take the defaults below.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub listing_url: String,
    pub ledger_path: PathBuf,
    pub digest_path: PathBuf,
    pub failed_path: PathBuf,
    pub api_base: String,
    pub post_delay_secs: u64,
    pub retry_delay_secs: u64,
    pub max_attempts: usize,
    pub max_content_chars: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listing_url: "https://www.ada.lk/latest-news/11".to_string(),
            ledger_path: PathBuf::from("news_log.json"),
            digest_path: PathBuf::from("README.md"),
            failed_path: PathBuf::from("failed_posts.json"),
            api_base: "https://www.googleapis.com/blogger/v3".to_string(),
            post_delay_secs: 10,
            retry_delay_secs: 60,
            max_attempts: 3,
            max_content_chars: 100_000,
            request_timeout_secs: 30,
            user_agent: concat!("news_poster/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Fully resolved configuration for one process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Destination blog identifier.
    pub blog_id: String,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub listing_url: String,
    pub ledger_path: PathBuf,
    pub digest_path: PathBuf,
    pub failed_path: PathBuf,
    pub api_base: String,
    /// Minimum spacing between two publish attempts.
    pub post_delay: Duration,
    /// Pause between two retry rounds.
    pub retry_delay: Duration,
    pub max_attempts: usize,
    pub max_content_chars: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Config {
    /// Resolve and validate configuration from parsed CLI arguments.
    ///
    /// Fails before any network activity when the blog id is missing or the
    /// credentials file does not exist.
    #[instrument(level = "debug", skip_all)]
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let settings = match &cli.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        debug!(?settings, "Resolved settings");
        Self::from_parts(cli.blog_id.as_deref(), &cli.credentials, &cli.token, settings)
    }

    pub fn from_parts(
        blog_id: Option<&str>,
        credentials_path: &Path,
        token_path: &Path,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        let blog_id = blog_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingBlogId)?;

        if !credentials_path.is_file() {
            return Err(ConfigError::MissingCredentials(
                credentials_path.to_path_buf(),
            ));
        }

        url::Url::parse(&settings.listing_url).map_err(|e| ConfigError::Invalid {
            key: "listing_url",
            message: e.to_string(),
        })?;
        url::Url::parse(&settings.api_base).map_err(|e| ConfigError::Invalid {
            key: "api_base",
            message: e.to_string(),
        })?;
        if settings.max_content_chars == 0 {
            return Err(ConfigError::Invalid {
                key: "max_content_chars",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            blog_id: blog_id.to_string(),
            credentials_path: credentials_path.to_path_buf(),
            token_path: token_path.to_path_buf(),
            listing_url: settings.listing_url,
            ledger_path: settings.ledger_path,
            digest_path: settings.digest_path,
            failed_path: settings.failed_path,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            post_delay: Duration::from_secs(settings.post_delay_secs),
            retry_delay: Duration::from_secs(settings.retry_delay_secs),
            max_attempts: settings.max_attempts,
            max_content_chars: settings.max_content_chars,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            user_agent: settings.user_agent,
        })
    }

    /// Build the HTTP client shared by the scraper and the publisher.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.request_timeout)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn credentials_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        file
    }

    #[test]
    fn test_missing_blog_id_is_rejected() {
        let creds = credentials_file();
        let err = Config::from_parts(None, creds.path(), Path::new("token.json"), Settings::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingBlogId));

        let err = Config::from_parts(Some("  "), creds.path(), Path::new("token.json"), Settings::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingBlogId));
    }

    #[test]
    fn test_missing_credentials_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("credentials.json");
        let err = Config::from_parts(Some("123"), &missing, Path::new("token.json"), Settings::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials(p) if p == missing));
    }

    #[test]
    fn test_settings_yaml_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "post_delay_secs: 2\nmax_attempts: 5\napi_base: http://localhost:9000/v3/").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.post_delay_secs, 2);
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.ledger_path, PathBuf::from("news_log.json"));

        let creds = credentials_file();
        let config = Config::from_parts(Some("123"), creds.path(), Path::new("token.json"), settings).unwrap();
        assert_eq!(config.post_delay, Duration::from_secs(2));
        assert_eq!(config.api_base, "http://localhost:9000/v3");
        assert_eq!(config.blog_id, "123");
    }

    #[test]
    fn test_settings_unknown_key_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "post_dleay_secs: 2").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(ConfigError::Settings { .. })
        ));
    }
}
