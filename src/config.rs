use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EpcError, Result};

/// Global epc-scrape configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where certificate PDFs are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where result reports go. Defaults to the parent of `output_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    /// Where log files go. Defaults to `{report_dir}/logs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Pause between properties, in seconds
    #[serde(default = "default_delay")]
    pub delay_secs: u64,

    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub pdf: PdfConfig,
}

/// How to reach the certificate register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures (0 = no retries)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// First retry delay in milliseconds; doubles each attempt
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// What the runner does with a weak match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Download the first listed address when nothing scores above the
    /// best-effort threshold. This can fetch the wrong certificate.
    #[serde(default = "default_true")]
    pub accept_fallback: bool,
}

/// PDF rendering backends, tried in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    #[serde(default = "default_strategies")]
    pub strategies: Vec<PdfStrategy>,

    /// Chrome/Chromium executable. Searched on PATH when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_binary: Option<PathBuf>,

    /// Render timeout in seconds
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdfStrategy {
    /// Node.js + Playwright `page.pdf()`
    Playwright,
    /// `chrome --headless --print-to-pdf`
    Chrome,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Processed")
}

fn default_delay() -> u64 {
    2
}

fn default_base_url() -> String {
    "https://find-energy-certificate.service.gov.uk".to_string()
}

fn default_timeout() -> u64 {
    20
}

fn default_retries() -> u32 {
    2
}

fn default_retry_base_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("Mozilla/5.0 (compatible; epc-scrape/{})", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_strategies() -> Vec<PdfStrategy> {
    vec![PdfStrategy::Playwright, PdfStrategy::Chrome]
}

fn default_render_timeout() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report_dir: None,
            log_dir: None,
            delay_secs: default_delay(),
            portal: PortalConfig::default(),
            matching: MatchingConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
            retry_base_ms: default_retry_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accept_fallback: default_true(),
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            chrome_binary: None,
            timeout_secs: default_render_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EpcError::ConfigError(e.to_string()))
    }

    /// Get the config file path
    ///
    /// Supports EPC_SCRAPE_CONFIG environment variable for test isolation
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("EPC_SCRAPE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "epc-scrape")
            .ok_or_else(|| EpcError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path (Playwright install, render script)
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "epc-scrape")
            .ok_or_else(|| EpcError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Directory for result reports
    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(|| {
            self.output_dir
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Directory for log files
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.report_dir().join("logs"))
    }
}
