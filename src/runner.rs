//! Per-property pipeline: search the register, pick an address, save the PDF.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::error::{EpcError, Result};
use crate::matcher::{self, MatchBasis, MatchCandidate, MatchDecision, BEST_EFFORT_THRESHOLD};
use crate::pdf::PdfRenderer;
use crate::portal::{Portal, SearchResults};
use crate::record::PropertyRecord;
use crate::report::{RecordOutcome, Status};

/// Number of listed addresses echoed to the log per search
const LOGGED_CANDIDATES: usize = 10;

/// Granularity of the inter-record pause, so Ctrl+C is noticed quickly
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Something that lists candidate addresses for a postcode
pub trait AddressSearch {
    fn search(&self, postcode: &str) -> Result<SearchResults>;
}

/// Something that saves a certificate page as a PDF
pub trait CertificatePrinter {
    fn print(&self, url: &str, output: &std::path::Path) -> Result<()>;
}

impl AddressSearch for Portal {
    fn search(&self, postcode: &str) -> Result<SearchResults> {
        Portal::search(self, postcode)
    }
}

impl CertificatePrinter for PdfRenderer {
    fn print(&self, url: &str, output: &std::path::Path) -> Result<()> {
        self.render(url, output).map(|_| ())
    }
}

/// Number of records a run sets out to process
pub fn planned_count(total: usize, limit: Option<usize>) -> usize {
    limit.map_or(total, |n| n.min(total))
}

/// Options for a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub delay: Duration,
    pub accept_fallback: bool,
    /// Match only; don't write PDFs
    pub dry_run: bool,
}

/// Drives one search session over a list of properties
pub struct Runner<S, P> {
    search: S,
    printer: P,
    options: RunOptions,
    running: Arc<AtomicBool>,
}

impl<S: AddressSearch, P: CertificatePrinter> Runner<S, P> {
    pub fn new(search: S, printer: P, options: RunOptions) -> Self {
        Self {
            search,
            printer,
            options,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that stops the run between records once cleared
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Process records in order, pausing between them. Stops early when the
    /// stop flag is cleared; records not reached get no outcome.
    pub fn process_all(&self, records: &[PropertyRecord], limit: Option<usize>) -> Vec<RecordOutcome> {
        let total = planned_count(records.len(), limit);
        let mut outcomes = Vec::with_capacity(total);

        for (i, record) in records.iter().take(total).enumerate() {
            if !self.is_running() {
                warn!(remaining = total - i, "stopped before finishing");
                break;
            }

            info!("Processing property {} of {}", i + 1, total);
            outcomes.push(self.process_record(record));

            if i + 1 < total {
                self.pause();
            }
        }

        outcomes
    }

    fn pause(&self) {
        let deadline = Instant::now() + self.options.delay;
        while self.is_running() && Instant::now() < deadline {
            thread::sleep(SLEEP_SLICE.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    /// Run the whole pipeline for one property. Never fails: errors become
    /// a `Failed` outcome carrying the error text.
    pub fn process_record(&self, record: &PropertyRecord) -> RecordOutcome {
        let address = record.full_address();
        let postcode = record.postcode();
        let filename = record.filename();
        info!("Processing property: {}, {}", address, postcode);

        let mut outcome = RecordOutcome {
            address: address.clone(),
            postcode: postcode.clone(),
            filename: filename.clone(),
            status: Status::Failed,
            matched: None,
            score: None,
            basis: None,
            error: None,
        };

        let result = self.locate(&address, &postcode).and_then(|decision| {
            outcome.basis = Some(decision.basis);
            outcome.score = Some(decision.score);
            outcome.matched = decision.selected.as_ref().map(|c| c.text.clone());
            let candidate = self.accept(&decision)?;
            self.save(&candidate.handle, &filename)
        });

        match result {
            Ok(()) => {
                outcome.status = Status::Success;
                info!("Successfully processed: {}", address);
            }
            Err(e) => {
                error!("Failed to process {}: {}", address, e);
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }

    fn locate(&self, address: &str, postcode: &str) -> Result<MatchDecision> {
        if address.is_empty() {
            return Err(EpcError::NoMatch("record has no address".into()));
        }

        let results = self.search.search(postcode)?;
        info!("Found {} address links", results.candidates.len());
        for (i, candidate) in results.candidates.iter().take(LOGGED_CANDIDATES).enumerate() {
            info!("  {}. {}", i + 1, candidate.text);
        }

        Ok(matcher::select(address, &results.candidates))
    }

    /// Decide whether a match decision is good enough to download
    fn accept<'d>(&self, decision: &'d MatchDecision) -> Result<&'d MatchCandidate> {
        let candidate = decision
            .selected
            .as_ref()
            .ok_or_else(|| EpcError::NoMatch("no addresses listed for postcode".into()))?;

        match decision.basis {
            MatchBasis::HighConfidence => {
                info!("Found matching address: {} (score: {:.2})", candidate.text, decision.score);
            }
            MatchBasis::BestEffort => {
                warn!(
                    "No exact match found. Using best match: {} (score: {:.2})",
                    candidate.text, decision.score
                );
            }
            MatchBasis::Fallback if self.options.accept_fallback => {
                warn!("No good matches found. Using first address: {}", candidate.text);
            }
            MatchBasis::Fallback => {
                return Err(EpcError::NoMatch(format!(
                    "no address scored above {:.2} and fallback is disabled",
                    BEST_EFFORT_THRESHOLD
                )));
            }
            MatchBasis::NoCandidates => {
                return Err(EpcError::NoMatch("no addresses listed for postcode".into()));
            }
        }

        Ok(candidate)
    }

    fn save(&self, url: &str, filename: &str) -> Result<()> {
        let output = self.options.output_dir.join(filename);
        if self.options.dry_run {
            info!("Dry run: would save {} to {}", url, output.display());
            return Ok(());
        }
        self.printer.print(url, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;

    struct FakeSearch {
        results: Vec<&'static str>,
    }

    impl AddressSearch for FakeSearch {
        fn search(&self, postcode: &str) -> Result<SearchResults> {
            if postcode.is_empty() {
                return Err(EpcError::Navigation("record has no postcode".into()));
            }
            Ok(SearchResults {
                page_url: "https://example.test/search".into(),
                strategy: None,
                candidates: self
                    .results
                    .iter()
                    .enumerate()
                    .map(|(i, t)| MatchCandidate::new(*t, format!("https://example.test/cert/{}", i)))
                    .collect(),
            })
        }
    }

    #[derive(Default)]
    struct FakePrinter {
        printed: RefCell<Vec<(String, PathBuf)>>,
    }

    impl CertificatePrinter for &FakePrinter {
        fn print(&self, url: &str, output: &Path) -> Result<()> {
            self.printed.borrow_mut().push((url.to_string(), output.to_path_buf()));
            Ok(())
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            output_dir: PathBuf::from("/tmp/epc"),
            delay: Duration::ZERO,
            accept_fallback: true,
            dry_run: false,
        }
    }

    fn record(line1: &str, postcode: &str) -> PropertyRecord {
        PropertyRecord {
            address_line_1: Some(line1.into()),
            address_line_2: Some("Iris Avenue".into()),
            town: Some("Canterbury".into()),
            postcode: Some(postcode.into()),
            scheme: Some("SPA".into()),
            plot: Some("12".into()),
            tenure: Some("Shared Ownership".into()),
            uprn: Some("100012345678".into()),
            ..Default::default()
        }
    }

    fn listing() -> FakeSearch {
        FakeSearch {
            results: vec![
                "9 Mallard House, Iris Avenue, Canterbury, CT1 1AA",
                "10 Mallard House, Iris Avenue, Canterbury, CT1 1AA",
                "Get a new energy certificate",
            ],
        }
    }

    #[test]
    fn test_process_record_success() {
        let printer = FakePrinter::default();
        let runner = Runner::new(listing(), &printer, options());
        let outcome = runner.process_record(&record("9 Mallard House", "CT1 1AA"));

        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.basis, Some(MatchBasis::HighConfidence));
        assert_eq!(
            outcome.matched.as_deref(),
            Some("9 Mallard House, Iris Avenue, Canterbury, CT1 1AA")
        );

        let printed = printer.printed.borrow();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].0, "https://example.test/cert/0");
        assert_eq!(
            printed[0].1,
            PathBuf::from("/tmp/epc/EPC - SPA - 12 - Shared Ownership - 100012345678.pdf")
        );
    }

    #[test]
    fn test_process_record_no_postcode() {
        let printer = FakePrinter::default();
        let runner = Runner::new(listing(), &printer, options());
        let outcome = runner.process_record(&record("9 Mallard House", ""));

        assert_eq!(outcome.status, Status::Failed);
        assert!(outcome.error.unwrap().contains("no postcode"));
        assert!(printer.printed.borrow().is_empty());
    }

    #[test]
    fn test_process_record_only_decoys() {
        let printer = FakePrinter::default();
        let search = FakeSearch { results: vec!["Get a new energy certificate"] };
        let runner = Runner::new(search, &printer, options());
        let outcome = runner.process_record(&record("9 Mallard House", "CT1 1AA"));

        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.basis, Some(MatchBasis::NoCandidates));
        assert!(printer.printed.borrow().is_empty());
    }

    #[test]
    fn test_fallback_rejected_when_disabled() {
        let printer = FakePrinter::default();
        let search = FakeSearch { results: vec!["Totally Different Road, Town"] };
        let runner = Runner::new(
            search,
            &printer,
            RunOptions { accept_fallback: false, ..options() },
        );
        let mut rec = record("1 Nonexistent Close", "CT2 2BB");
        rec.address_line_2 = None;
        rec.town = None;
        let outcome = runner.process_record(&rec);

        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.basis, Some(MatchBasis::Fallback));
        assert_eq!(outcome.matched.as_deref(), Some("Totally Different Road, Town"));
        assert!(printer.printed.borrow().is_empty());
    }

    #[test]
    fn test_fallback_accepted_by_default() {
        let printer = FakePrinter::default();
        let search = FakeSearch { results: vec!["Totally Different Road, Town"] };
        let runner = Runner::new(search, &printer, options());
        let mut rec = record("1 Nonexistent Close", "CT2 2BB");
        rec.address_line_2 = None;
        rec.town = None;
        let outcome = runner.process_record(&rec);

        assert_eq!(outcome.status, Status::Success);
        assert_eq!(outcome.basis, Some(MatchBasis::Fallback));
        assert_eq!(outcome.score, Some(0.0));
        assert_eq!(printer.printed.borrow().len(), 1);
    }

    #[test]
    fn test_dry_run_does_not_print() {
        let printer = FakePrinter::default();
        let runner = Runner::new(listing(), &printer, RunOptions { dry_run: true, ..options() });
        let outcome = runner.process_record(&record("9 Mallard House", "CT1 1AA"));

        assert_eq!(outcome.status, Status::Success);
        assert!(printer.printed.borrow().is_empty());
    }

    #[test]
    fn test_process_all_with_limit_and_stop() {
        let printer = FakePrinter::default();
        let runner = Runner::new(listing(), &printer, options());
        let records = vec![
            record("9 Mallard House", "CT1 1AA"),
            record("10 Mallard House", "CT1 1AA"),
            record("9 Mallard House", "CT1 1AA"),
        ];

        let outcomes = runner.process_all(&records, Some(2));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].matched.as_deref(), Some("10 Mallard House, Iris Avenue, Canterbury, CT1 1AA"));

        runner.stop_flag().store(false, Ordering::SeqCst);
        assert!(runner.process_all(&records, None).is_empty());
    }

    #[test]
    fn test_planned_count() {
        assert_eq!(planned_count(5, None), 5);
        assert_eq!(planned_count(5, Some(2)), 2);
        assert_eq!(planned_count(2, Some(10)), 2);
    }
}
