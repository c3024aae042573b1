pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod pdf;
pub mod portal;
pub mod record;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod sheet;

pub use error::{EpcError, Result};
