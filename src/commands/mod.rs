//! Command implementations for epc-scrape CLI

mod lookup;
mod misc;
mod run;

pub use lookup::*;
pub use misc::*;
pub use run::*;
