//! Sheet processing: run

use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::info;

use epc_scrape::config::Config;
use epc_scrape::error::Result;
use epc_scrape::logging;
use epc_scrape::pdf::PdfRenderer;
use epc_scrape::portal::Portal;
use epc_scrape::report::{self, Summary};
use epc_scrape::runner::{planned_count, RunOptions, Runner};
use epc_scrape::sheet;

use crate::utils::{parse_delay_str, truncate_str};

/// Process every property in a sheet and write the results report
pub fn cmd_run(
    sheet_path: &Path,
    output: Option<PathBuf>,
    limit: Option<usize>,
    delay: Option<String>,
    dry_run: bool,
    no_fallback: bool,
    verbose: bool,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = output {
        config.output_dir = dir;
    }
    if no_fallback {
        config.matching.accept_fallback = false;
    }
    let delay_secs = match delay {
        Some(d) => parse_delay_str(&d)?,
        None => config.delay_secs,
    };

    let log_path = logging::init(Some(&config.log_dir()), verbose)?;
    if let Some(ref path) = log_path {
        info!("Starting EPC certificate run - Log file: {}", path.display());
    }

    let records = sheet::load_records(sheet_path)?;
    info!("Loaded {} properties from {}", records.len(), sheet_path.display());

    if records.is_empty() {
        println!("No properties found in {}.", sheet_path.display());
        return Ok(());
    }

    if !dry_run {
        std::fs::create_dir_all(&config.output_dir)?;
    }

    let portal = Portal::new(&config.portal)?.with_snapshot_dir(config.log_dir());
    let renderer = PdfRenderer::new(&config.pdf);
    let runner = Runner::new(
        portal,
        renderer,
        RunOptions {
            output_dir: config.output_dir.clone(),
            delay: Duration::from_secs(delay_secs),
            accept_fallback: config.matching.accept_fallback,
            dry_run,
        },
    );

    // Set up Ctrl+C handler - finish the current property, then stop
    let running = runner.stop_flag();
    let interrupted = runner.stop_flag();
    ctrlc::set_handler(move || {
        println!("\n\nStopping after the current property...");
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|e| epc_scrape::EpcError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let outcomes = runner.process_all(&records, limit);
    let summary = Summary::from_outcomes(&outcomes).with_interruption(
        planned_count(records.len(), limit),
        !interrupted.load(Ordering::SeqCst),
    );
    report::log_summary(&summary, &outcomes);
    let report_path = report::write_report(&config.report_dir(), &outcomes)?;

    println!();
    println!("{}", "Summary".bold());
    println!("  Processed: {}", summary.processed);
    println!("  Succeeded: {}", summary.succeeded.to_string().green());
    if summary.failed > 0 {
        println!("  Failed:    {}", summary.failed.to_string().red());
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            println!(
                "    {} {} - {}",
                "✗".red(),
                truncate_str(&outcome.address, 50),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    if summary.skipped > 0 {
        println!(
            "  Skipped:   {} (interrupted)",
            summary.skipped.to_string().yellow()
        );
    }
    if dry_run {
        println!("\n  Dry run: no PDFs were saved.");
    } else {
        println!("\n  PDFs:    {}", config.output_dir.display());
    }
    println!("  Report:  {}", report_path.display());
    if let Some(path) = log_path {
        println!("  Log:     {}", path.display());
    }
    println!();

    Ok(())
}
