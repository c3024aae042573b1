//! Per-record outcomes, run summary and the results CSV

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::matcher::MatchBasis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Success,
    Failed,
}

/// What happened to one spreadsheet row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Postcode")]
    pub postcode: String,
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "Matched Address")]
    pub matched: Option<String>,
    #[serde(rename = "Score", serialize_with = "serialize_score")]
    pub score: Option<f64>,
    #[serde(rename = "Basis")]
    pub basis: Option<MatchBasis>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

fn serialize_score<S: serde::Serializer>(
    score: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match score {
        Some(s) => serializer.serialize_str(&format!("{:.2}", s)),
        None => serializer.serialize_none(),
    }
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Totals for a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records a stopped run never reached
    pub skipped: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[RecordOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            processed: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            skipped: 0,
        }
    }

    /// Count the records left out of `planned` when the run was stopped early.
    /// Records excluded by a limit are not part of `planned`.
    pub fn with_interruption(mut self, planned: usize, interrupted: bool) -> Self {
        self.skipped = if interrupted {
            planned.saturating_sub(self.processed)
        } else {
            0
        };
        self
    }
}

/// Log the run summary, listing every failed property
pub fn log_summary(summary: &Summary, outcomes: &[RecordOutcome]) {
    info!("{}", "=".repeat(50));
    info!("PROCESSING SUMMARY");
    info!("{}", "=".repeat(50));
    info!("Total properties processed: {}", summary.processed);
    info!("Successful downloads: {}", summary.succeeded);
    info!("Failed downloads: {}", summary.failed);
    if summary.skipped > 0 {
        info!("Not reached (interrupted): {}", summary.skipped);
    }

    if summary.failed > 0 {
        info!("Failed properties:");
        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            info!(
                "  - {}: {}",
                outcome.address,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

/// Report file name for a run finishing now
pub fn report_file_name() -> String {
    format!("processing_results_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write outcomes as CSV into `dir`, returning the file path
pub fn write_report(dir: &Path, outcomes: &[RecordOutcome]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name());
    write_report_to(std::fs::File::create(&path)?, outcomes)?;
    info!(path = %path.display(), "detailed results saved");
    Ok(path)
}

/// Write outcomes as CSV with a header row
pub fn write_report_to<W: std::io::Write>(writer: W, outcomes: &[RecordOutcome]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    if outcomes.is_empty() {
        writer.write_record([
            "Address", "Postcode", "Filename", "Status", "Matched Address", "Score", "Basis", "Error",
        ])?;
    }
    for outcome in outcomes {
        writer.serialize(outcome)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success() -> RecordOutcome {
        RecordOutcome {
            address: "9 Mallard House, Iris Avenue, Canterbury".into(),
            postcode: "CT1 1AA".into(),
            filename: "EPC - SPA - 12 - Shared Ownership - 100012345678.pdf".into(),
            status: Status::Success,
            matched: Some("9 Mallard House, Iris Avenue, Canterbury, CT1 1AA".into()),
            score: Some(1.0),
            basis: Some(MatchBasis::HighConfidence),
            error: None,
        }
    }

    fn failure() -> RecordOutcome {
        RecordOutcome {
            address: "1 Nonexistent Close".into(),
            postcode: "CT2 2BB".into(),
            filename: "EPC - UNK - Unknown - Unknown - Unknown.pdf".into(),
            status: Status::Failed,
            matched: None,
            score: None,
            basis: Some(MatchBasis::NoCandidates),
            error: Some("No matching address: no addresses listed".into()),
        }
    }

    #[test]
    fn test_summary() {
        let summary = Summary::from_outcomes(&[success(), failure(), success()]);
        assert_eq!(summary, Summary { processed: 3, succeeded: 2, failed: 1, skipped: 0 });
        log_summary(&summary, &[success(), failure(), success()]);
        assert_eq!(Summary::from_outcomes(&[]), Summary::default());
    }

    #[test]
    fn test_skipped_only_counted_when_interrupted() {
        let outcomes = [success(), failure()];

        // A limit of 2 out of 5 rows: nothing was skipped
        let limited = Summary::from_outcomes(&outcomes).with_interruption(2, false);
        assert_eq!(limited.skipped, 0);

        // Stopped after 2 of 5 planned rows
        let stopped = Summary::from_outcomes(&outcomes).with_interruption(5, true);
        assert_eq!(stopped.skipped, 3);

        // Stopped during the last row
        let last = Summary::from_outcomes(&outcomes).with_interruption(2, true);
        assert_eq!(last.skipped, 0);
    }

    #[test]
    fn test_write_report() {
        let mut buf = Vec::new();
        write_report_to(&mut buf, &[success(), failure()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Address,Postcode,Filename,Status,Matched Address,Score,Basis,Error");
        assert_eq!(
            lines[1],
            "\"9 Mallard House, Iris Avenue, Canterbury\",CT1 1AA,EPC - SPA - 12 - Shared Ownership - 100012345678.pdf,Success,\"9 Mallard House, Iris Avenue, Canterbury, CT1 1AA\",1.00,high_confidence,"
        );
        assert!(lines[2].starts_with("1 Nonexistent Close,CT2 2BB,"));
        assert!(lines[2].ends_with(",Failed,,,no_candidates,No matching address: no addresses listed"));
    }

    #[test]
    fn test_write_empty_report_has_header() {
        let mut buf = Vec::new();
        write_report_to(&mut buf, &[]).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("Address,Postcode"));
    }

    #[test]
    fn test_report_file_name() {
        let name = report_file_name();
        assert!(name.starts_with("processing_results_"));
        assert!(name.ends_with(".csv"));
    }
}
