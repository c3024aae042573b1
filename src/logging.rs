//! Console + file logging setup

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::{EpcError, Result};

/// Log file name for a run starting now
pub fn log_file_name() -> String {
    format!("epc_scrape_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber.
///
/// Writes to stderr and, when `log_dir` is given, to a timestamped file in it.
/// `RUST_LOG` overrides the default level. Returns the log file path.
pub fn init(log_dir: Option<&Path>, verbose: bool) -> Result<Option<PathBuf>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, log_path) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(log_file_name());
            let file = File::create(&path)?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| EpcError::ConfigError(format!("Failed to initialize logging: {}", e)))?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("epc_scrape_"));
        assert!(name.ends_with(".log"));
        // epc_scrape_YYYYmmdd_HHMMSS.log
        assert_eq!(name.len(), "epc_scrape_".len() + 15 + ".log".len());
    }
}
