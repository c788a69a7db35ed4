use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::js::runtime::DEFAULT_MAX_JOBS;
use crate::profile::BrowserProfile;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "HOSTBRIDGE_CONFIG";
/// Environment variable overriding the configured browser key.
pub const BROWSER_ENV: &str = "HOSTBRIDGE_BROWSER";

pub const DEFAULT_MAX_DEFERRED: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read host config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse document URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown browser '{0}' (expected chrome, edge, firefox, firefox-esr or ie)")]
    UnknownBrowser(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub browser: String,
    pub url: String,
    pub max_pending_jobs: usize,
    pub max_deferred_actions: usize,
    pub log_filter: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            browser: "chrome".to_string(),
            url: "about:blank".to_string(),
            max_pending_jobs: DEFAULT_MAX_JOBS,
            max_deferred_actions: DEFAULT_MAX_DEFERRED,
            log_filter: None,
        }
    }
}

impl HostConfig {
    /// Read `config_path` if it exists, falling back to defaults. The result
    /// is validated before it is returned.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                serde_yaml::from_str(&contents)?
            }
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// [`HostConfig::load`] driven by `HOSTBRIDGE_CONFIG` and `HOSTBRIDGE_BROWSER`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let mut config = Self::load(path)?;
        if let Ok(browser) = std::env::var(BROWSER_ENV) {
            config.browser = browser;
            config.validate()?;
        }
        Ok(config)
    }

    pub fn profile(&self) -> Result<BrowserProfile, ConfigError> {
        match self.browser.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(BrowserProfile::chrome()),
            "edge" => Ok(BrowserProfile::edge()),
            "firefox" | "ff" => Ok(BrowserProfile::firefox()),
            "firefox-esr" | "ff-esr" => Ok(BrowserProfile::firefox_esr()),
            "ie" | "internet-explorer" => Ok(BrowserProfile::internet_explorer()),
            other => Err(ConfigError::UnknownBrowser(other.to_string())),
        }
    }

    pub fn document_url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&self.url)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.profile()?;
        self.document_url()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = HostConfig::load(None).unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.profile().unwrap(), BrowserProfile::chrome());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = HostConfig::load(Some(PathBuf::from("/nonexistent/hostbridge.yaml"))).unwrap();
        assert_eq!(config.browser, "chrome");
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "browser: ie\nurl: http://example.test/page.html#top\nmax_deferred_actions: 5"
        )
        .unwrap();
        let config = HostConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert!(config.profile().unwrap().is_ie());
        assert_eq!(config.max_deferred_actions, 5);
        assert_eq!(config.max_pending_jobs, DEFAULT_MAX_JOBS);
        assert_eq!(config.document_url().unwrap().fragment(), Some("top"));
    }

    #[test]
    fn rejects_unknown_browser_and_bad_url() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "browser: netscape").unwrap();
        assert!(matches!(
            HostConfig::load(Some(file.path().to_path_buf())),
            Err(ConfigError::UnknownBrowser(name)) if name == "netscape"
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "url: not a url").unwrap();
        assert!(matches!(
            HostConfig::load(Some(file.path().to_path_buf())),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}
