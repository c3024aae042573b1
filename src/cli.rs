use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "epc-scrape")]
#[command(author, version, about = "Fetch Energy Performance Certificates for a property spreadsheet", long_about = None)]
#[command(after_help = r#"Examples:
  epc-scrape run "Spring Acres.xlsx"                     Download a PDF per property
  epc-scrape run sheet.csv --dry-run                     Match addresses only
  epc-scrape search "CT1 1AA"                            List addresses for a postcode
  epc-scrape match "9 Mallard House" "9 Mallard House, CT1 1AA"   Score addresses offline

Quick Start:
  1. epc-scrape enable-pdf
  2. epc-scrape doctor
  3. epc-scrape run sheet.xlsx --output ./Processed
"#)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process every property in a spreadsheet
    #[command(after_help = r#"Examples:
  epc-scrape run sheet.xlsx
  epc-scrape run sheet.csv --output ./Processed --delay 5s
  epc-scrape run sheet.csv --limit 3 --dry-run
  epc-scrape run sheet.csv --no-fallback      # fail instead of guessing
"#)]
    Run {
        /// Property workbook (.xlsx, .xls, .ods) or CSV export
        #[arg(value_name = "SHEET")]
        sheet: PathBuf,

        /// Directory for the PDFs (overrides config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Only process the first N properties
        #[arg(long)]
        limit: Option<usize>,

        /// Pause between properties (e.g., 2s, 1m)
        #[arg(long)]
        delay: Option<String>,

        /// Match addresses but don't save PDFs
        #[arg(long)]
        dry_run: bool,

        /// Treat "first listed address" fallbacks as failures
        #[arg(long)]
        no_fallback: bool,
    },

    /// List the register's addresses for a postcode
    #[command(after_help = r#"Examples:
  epc-scrape search "CT1 1AA"
  epc-scrape search ct11aa --address "9 Mallard House, Iris Avenue, Canterbury"
  epc-scrape search "CT1 1AA" --json
"#)]
    Search {
        postcode: String,

        /// Score every listed address against this one
        #[arg(long, short = 'a')]
        address: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score candidate addresses against a target, offline
    Match {
        /// Target address
        target: String,

        /// Candidate addresses, in listing order
        #[arg(required = true)]
        candidates: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the PDF file name for a property
    Filename {
        #[arg(long)]
        scheme: Option<String>,
        #[arg(long)]
        plot: Option<String>,
        #[arg(long)]
        tenure: Option<String>,
        #[arg(long)]
        uprn: Option<String>,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Check PDF backends, config and directories
    Doctor,

    /// Install Playwright + Chromium for PDF rendering
    EnablePdf,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
