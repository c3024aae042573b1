//! Miscellaneous commands: config, doctor, enable-pdf, completions

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;

use epc_scrape::cli::{Cli, CompletionShell};
use epc_scrape::config::{Config, PdfStrategy};
use epc_scrape::error::{EpcError, Result};
use epc_scrape::pdf::{self, check_playwright, PlaywrightStatus};

/// Show the effective configuration as TOML
pub fn cmd_config_show() -> Result<()> {
    let config = Config::load()?;
    println!("# {}\n", Config::config_path()?.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Print the config file path
pub fn cmd_config_path() -> Result<()> {
    println!("{}", Config::config_path()?.display());
    Ok(())
}

/// Write a default config file
pub fn cmd_config_init(force: bool) -> Result<()> {
    let path = Config::config_path()?;
    if path.exists() && !force {
        return Err(EpcError::ConfigError(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Config::default().save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Check all dependencies and suggest fixes
pub fn cmd_doctor() -> Result<()> {
    println!("\nepc-scrape doctor\n");

    println!("  epc-scrape binary: v{}", env!("CARGO_PKG_VERSION"));

    // Check config
    let config = match Config::load() {
        Ok(c) => {
            println!("  Config: OK ({})", Config::config_path()?.display());
            c
        }
        Err(e) => {
            println!("  Config: {} - {}", "ERROR".red(), e);
            Config::default()
        }
    };

    // Check Node.js
    let node = std::process::Command::new("node")
        .arg("--version")
        .output();
    match node {
        Ok(o) if o.status.success() => {
            let v = String::from_utf8_lossy(&o.stdout);
            println!("  Node.js: {}", v.trim());
        }
        _ => println!("  Node.js: NOT INSTALLED"),
    }

    // Check Playwright
    let playwright = check_playwright();
    match playwright {
        PlaywrightStatus::Ready => println!("  Playwright: ready"),
        PlaywrightStatus::NodeMissing => println!("  Playwright: Node.js required"),
        PlaywrightStatus::PlaywrightMissing => println!("  Playwright: not installed"),
        PlaywrightStatus::BrowserMissing => println!("  Playwright: browser not installed"),
    }

    // Check Chrome
    let chrome = config.pdf.chrome_binary.clone().or_else(pdf::find_chrome);
    match chrome {
        Some(ref path) if path.exists() => println!("  Chrome: {}", path.display()),
        Some(ref path) => println!("  Chrome: {} (configured, missing)", path.display()),
        None => println!("  Chrome: NOT FOUND"),
    }

    let usable = config.pdf.strategies.iter().any(|s| match s {
        PdfStrategy::Playwright => playwright.is_ready(),
        PdfStrategy::Chrome => chrome.as_ref().is_some_and(|p| p.exists()),
    });
    if usable {
        println!("  PDF rendering: {}", "OK".green());
    } else {
        println!("  PDF rendering: {}", "UNAVAILABLE".red());
        println!("    {}", playwright.install_instructions());
    }

    println!("  Output dir: {}", config.output_dir.display());
    println!("  Report dir: {}", config.report_dir().display());
    println!("  Log dir:    {}", config.log_dir().display());

    println!();
    Ok(())
}

/// Set up Playwright/Chromium for PDF rendering
pub fn cmd_enable_pdf() -> Result<()> {
    println!("\nSetting up PDF rendering...\n");

    // Check if Node.js is available
    let node_available = std::process::Command::new("node")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if !node_available {
        println!("  Node.js is required for Playwright rendering.");
        println!("  Install from: https://nodejs.org/");
        println!("  Or install Chrome/Chromium and set pdf.strategies = [\"chrome\"].");
        return Ok(());
    }

    let data_dir = Config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    // Check if playwright is already installed locally
    let node_modules = data_dir.join("node_modules").join("playwright");
    if !node_modules.exists() {
        // Create package.json if it doesn't exist
        let package_json = data_dir.join("package.json");
        if !package_json.exists() {
            println!("  Initializing epc-scrape JavaScript environment...");
            let output = std::process::Command::new("npm")
                .args(["init", "-y"])
                .current_dir(&data_dir)
                .output()?;

            if !output.status.success() {
                return Err(EpcError::PdfRender("Failed to initialize npm".into()));
            }
        }

        println!("  Installing Playwright...");
        let status = std::process::Command::new("npm")
            .args(["install", "playwright"])
            .current_dir(&data_dir)
            .status()?;

        if !status.success() {
            return Err(EpcError::PdfRender("Failed to install Playwright".into()));
        }
    } else {
        println!("  Playwright package is installed.");
    }

    if !check_playwright().is_ready() {
        println!("  Installing Chromium browser (~280MB)...");
        let status = std::process::Command::new("npx")
            .args(["playwright", "install", "chromium"])
            .current_dir(&data_dir)
            .status()?;

        if !status.success() {
            return Err(EpcError::PdfRender("Failed to install Chromium".into()));
        }
    } else {
        println!("  Chromium browser is installed.");
    }

    // System libraries need sudo, so only offer it on a terminal
    if atty::is(atty::Stream::Stdin) {
        println!("  Installing system dependencies for Chromium...");
        println!("  (This requires sudo - you may be prompted for your password)\n");

        let deps = std::process::Command::new("sudo")
            .args(["npx", "playwright", "install-deps", "chromium"])
            .current_dir(&data_dir)
            .stdin(std::process::Stdio::inherit())
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .status();

        match deps {
            Ok(status) if status.success() => println!("\n  System dependencies installed."),
            Ok(_) => {
                return Err(EpcError::PdfRender(
                    "Failed to install system dependencies".into(),
                ))
            }
            Err(e) => return Err(EpcError::PdfRender(format!("Failed to run sudo: {}", e))),
        }
    } else {
        println!("  Skipping system dependencies (not a terminal).");
        println!("  If rendering fails, run: sudo npx playwright install-deps chromium");
    }

    pdf::ensure_print_script()?;

    println!("\n  PDF rendering is now enabled.");
    println!("  Process a sheet with: epc-scrape run sheet.xlsx");
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "epc-scrape", &mut io::stdout());
    Ok(())
}
