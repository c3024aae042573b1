//! epc-scrape - fetch Energy Performance Certificates for a property sheet

use clap::Parser;
use colored::Colorize;

use epc_scrape::cli::{Cli, Commands, ConfigCommands};
use epc_scrape::error::Result;
use epc_scrape::logging;

mod commands;
mod utils;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint.yellow());
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // `run` sets up its own file log once the config is known
    if !matches!(cli.command, Commands::Run { .. }) {
        logging::init(None, cli.verbose)?;
    }

    match cli.command {
        Commands::Run {
            sheet,
            output,
            limit,
            delay,
            dry_run,
            no_fallback,
        } => commands::cmd_run(&sheet, output, limit, delay, dry_run, no_fallback, cli.verbose),

        Commands::Search { postcode, address, json } => {
            commands::cmd_search(&postcode, address.as_deref(), json)
        }
        Commands::Match { target, candidates, json } => {
            commands::cmd_match(&target, &candidates, json)
        }
        Commands::Filename { scheme, plot, tenure, uprn } => {
            commands::cmd_filename(scheme, plot, tenure, uprn)
        }

        Commands::Config(ConfigCommands::Show) => commands::cmd_config_show(),
        Commands::Config(ConfigCommands::Path) => commands::cmd_config_path(),
        Commands::Config(ConfigCommands::Init { force }) => commands::cmd_config_init(force),

        Commands::Doctor => commands::cmd_doctor(),
        Commands::EnablePdf => commands::cmd_enable_pdf(),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
