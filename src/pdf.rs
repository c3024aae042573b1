//! Certificate page to PDF. Each configured backend is tried in order until
//! one produces a non-empty file.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::{Config, PdfConfig, PdfStrategy};
use crate::error::{EpcError, Result};

/// Executable names looked up on PATH when no Chrome binary is configured
const CHROME_NAMES: [&str; 5] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

const PRINT_SCRIPT: &str = include_str!("../assets/print_pdf.mjs");

impl PdfStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            PdfStrategy::Playwright => "playwright",
            PdfStrategy::Chrome => "chrome",
        }
    }
}

/// Renders pages to PDF with the configured backends
pub struct PdfRenderer {
    strategies: Vec<PdfStrategy>,
    chrome_binary: Option<PathBuf>,
    timeout_secs: u64,
}

impl PdfRenderer {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            strategies: config.strategies.clone(),
            chrome_binary: config.chrome_binary.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Render `url` into `output`, replacing any existing file.
    /// Returns the backend that succeeded.
    ///
    /// Backends write to a `.part` file beside `output`, which is renamed
    /// over `output` only once it holds a non-empty PDF. An existing file
    /// survives a failed render.
    pub fn render(&self, url: &str, output: &Path) -> Result<PdfStrategy> {
        if self.strategies.is_empty() {
            return Err(EpcError::PdfRender("no PDF strategies configured".into()));
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let partial = partial_path(output);

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            remove_partial(&partial)?;

            let attempt = match strategy {
                PdfStrategy::Playwright => self.render_playwright(url, &partial),
                PdfStrategy::Chrome => self.render_chrome(url, &partial),
            }
            .and_then(|_| verify_output(&partial));

            match attempt {
                Ok(()) => {
                    std::fs::rename(&partial, output)?;
                    info!(strategy = strategy.name(), path = %output.display(), "saved PDF");
                    return Ok(*strategy);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "PDF strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        remove_partial(&partial)?;
        Err(EpcError::PdfRender(failures.join("; ")))
    }

    fn render_playwright(&self, url: &str, output: &Path) -> Result<()> {
        let data_dir = Config::data_dir()?;
        let script_path = ensure_print_script()?;

        // Run from data directory so Node.js can find the local node_modules
        let result = Command::new("node")
            .arg(&script_path)
            .arg(url)
            .arg(output)
            .arg((self.timeout_secs * 1000).to_string())
            .current_dir(&data_dir)
            .output()?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            // The script reports failures as {"error": "..."}
            if let Ok(err) = serde_json::from_str::<serde_json::Value>(stderr.trim()) {
                let msg = err["error"].as_str().unwrap_or("unknown error");
                return Err(EpcError::PdfRender(msg.to_string()));
            }
            return Err(EpcError::PdfRender(stderr.trim().to_string()));
        }
        Ok(())
    }

    fn render_chrome(&self, url: &str, output: &Path) -> Result<()> {
        let binary = self
            .chrome_binary
            .clone()
            .or_else(find_chrome)
            .ok_or_else(|| EpcError::PdfRender("Chrome/Chromium not found on PATH".into()))?;

        let result = Command::new(&binary)
            .args(["--headless", "--disable-gpu", "--no-sandbox", "--no-pdf-header-footer"])
            .arg(format!("--timeout={}", self.timeout_secs * 1000))
            .arg(format!("--print-to-pdf={}", output.display()))
            .arg(url)
            .output()?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(EpcError::PdfRender(format!(
                "{} exited with {}: {}",
                binary.display(),
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// `EPC - ... .pdf` -> `EPC - ... .pdf.part`
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}

fn remove_partial(partial: &Path) -> Result<()> {
    if partial.exists() {
        std::fs::remove_file(partial)?;
        debug!(path = %partial.display(), "removed leftover partial file");
    }
    Ok(())
}

fn verify_output(output: &Path) -> Result<()> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(EpcError::PdfRender("renderer produced an empty file".into())),
        Err(_) => Err(EpcError::PdfRender("renderer produced no file".into())),
    }
}

/// Write the Playwright print script into the data directory
pub fn ensure_print_script() -> Result<PathBuf> {
    let script_path = Config::data_dir()?.join("print_pdf.mjs");
    if let Some(parent) = script_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&script_path, PRINT_SCRIPT)?;
    Ok(script_path)
}

/// First Chrome/Chromium executable on PATH
pub fn find_chrome() -> Option<PathBuf> {
    CHROME_NAMES.iter().find_map(|name| find_on_path(name))
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Status of Playwright installation
#[derive(Debug, Clone, PartialEq)]
pub enum PlaywrightStatus {
    Ready,
    NodeMissing,
    PlaywrightMissing,
    BrowserMissing,
}

impl PlaywrightStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, PlaywrightStatus::Ready)
    }

    pub fn install_instructions(&self) -> &'static str {
        match self {
            PlaywrightStatus::Ready => "Playwright is ready",
            PlaywrightStatus::NodeMissing => "Install Node.js: https://nodejs.org/",
            PlaywrightStatus::PlaywrightMissing => "Run: epc-scrape enable-pdf",
            PlaywrightStatus::BrowserMissing => "Run: npx playwright install chromium",
        }
    }
}

/// Check if Playwright is available
pub fn check_playwright() -> PlaywrightStatus {
    let node_available = Command::new("node")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if !node_available {
        return PlaywrightStatus::NodeMissing;
    }

    let installed = Config::data_dir()
        .map(|dir| dir.join("node_modules").join("playwright").exists())
        .unwrap_or(false);

    if !installed {
        return PlaywrightStatus::PlaywrightMissing;
    }

    let home = std::env::var("HOME").unwrap_or_default();
    let browser_paths = [
        // Linux
        format!("{}/.cache/ms-playwright", home),
        // macOS
        format!("{}/Library/Caches/ms-playwright", home),
    ];
    if browser_paths.iter().any(|p| Path::new(p).exists()) {
        return PlaywrightStatus::Ready;
    }

    PlaywrightStatus::BrowserMissing
}
