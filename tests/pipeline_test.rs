//! Sheet in, PDFs and results report out, with the register served from
//! canned HTML instead of the network.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use epc_scrape::error::{EpcError, Result};
use epc_scrape::matcher::MatchBasis;
use epc_scrape::portal::{extract_candidates, normalize_postcode, SearchResults};
use epc_scrape::report::{self, Status, Summary};
use epc_scrape::runner::{AddressSearch, CertificatePrinter, RunOptions, Runner};
use epc_scrape::sheet;

// ============================================================================
// Canned register pages
// ============================================================================

const BASE: &str = "https://find-energy-certificate.service.gov.uk";

const CT1_PAGE: &str = r#"
<html><body>
  <a href="/">Find an energy certificate</a>
  <table class="govuk-table">
    <tr><td><a class="govuk-link" href="/energy-certificate/0001-0001-0001-0001-0001">9 Mallard House, Iris Avenue, Canterbury, CT1 1AA</a></td></tr>
    <tr><td><a class="govuk-link" href="/energy-certificate/0002-0002-0002-0002-0002">10 Mallard House, Iris Avenue, Canterbury, CT1 1AA</a></td></tr>
  </table>
  <a href="https://www.gov.uk/get-new-energy-certificate">Get a new energy certificate</a>
</body></html>
"#;

const CT2_PAGE: &str = r#"
<html><body>
  <a class="govuk-link" href="/energy-certificate/0003-0003-0003-0003-0003">Totally Different Road, Town, CT2 2BB</a>
</body></html>
"#;

const EMPTY_PAGE: &str = r#"<html><body><p>No certificates found.</p></body></html>"#;

const SHEET_CSV: &str = "\
Address Line 1,Address Line 2,Town,Post Code,Scheme Abbreviation,Development Plot Number,Tenure,UPRN
9 Mallard House,Iris Avenue,Canterbury,CT1 1AA,SPA,12,Shared Ownership,100012345678
1 Nonexistent Close,,Canterbury,ct22bb,,7,Rent,nan
5 Nowhere Lane,,Canterbury,CT3 3CC,SPA,8,Sale,100000000003
";

/// Serves results pages by postcode
struct CannedRegister {
    pages: HashMap<String, &'static str>,
}

impl CannedRegister {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert("CT1 1AA".to_string(), CT1_PAGE);
        pages.insert("CT2 2BB".to_string(), CT2_PAGE);
        pages.insert("CT3 3CC".to_string(), EMPTY_PAGE);
        Self { pages }
    }
}

impl AddressSearch for CannedRegister {
    fn search(&self, postcode: &str) -> Result<SearchResults> {
        let postcode = normalize_postcode(postcode);
        let html = self
            .pages
            .get(&postcode)
            .ok_or_else(|| EpcError::Navigation(format!("no page for {}", postcode)))?;
        let page_url = format!("{}/find-a-certificate/search-by-postcode", BASE);
        let (strategy, candidates) = extract_candidates(html, &page_url, &postcode)?;
        Ok(SearchResults {
            page_url,
            strategy,
            candidates,
        })
    }
}

/// Writes a stub PDF and remembers which URLs it printed
#[derive(Default)]
struct StubPrinter {
    printed: RefCell<Vec<String>>,
}

impl CertificatePrinter for &StubPrinter {
    fn print(&self, url: &str, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, b"%PDF-1.4\n")?;
        self.printed.borrow_mut().push(url.to_string());
        Ok(())
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("epc-scrape-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn options(output_dir: PathBuf, accept_fallback: bool) -> RunOptions {
    RunOptions {
        output_dir,
        delay: Duration::ZERO,
        accept_fallback,
        dry_run: false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_sheet_to_report() {
    let dir = scratch_dir("pipeline");
    let sheet_path = dir.join("properties.csv");
    std::fs::write(&sheet_path, SHEET_CSV).unwrap();

    let records = sheet::load_records(&sheet_path).unwrap();
    assert_eq!(records.len(), 3);

    let printer = StubPrinter::default();
    let output_dir = dir.join("Processed");
    let runner = Runner::new(CannedRegister::new(), &printer, options(output_dir.clone(), true));
    let outcomes = runner.process_all(&records, None);

    assert_eq!(outcomes.len(), 3);

    // Exact listing downloaded under the sheet's file name
    assert_eq!(outcomes[0].status, Status::Success);
    assert_eq!(outcomes[0].basis, Some(MatchBasis::HighConfidence));
    assert_eq!(
        outcomes[0].matched.as_deref(),
        Some("9 Mallard House, Iris Avenue, Canterbury, CT1 1AA")
    );
    assert!(output_dir
        .join("EPC - SPA - 12 - Shared Ownership - 100012345678.pdf")
        .exists());

    // Nothing resembles the target; first listing is taken
    assert_eq!(outcomes[1].status, Status::Success);
    assert_eq!(outcomes[1].basis, Some(MatchBasis::Fallback));
    assert_eq!(outcomes[1].filename, "EPC - UNK - 7 - Rent - Unknown.pdf");

    // No listings at all
    assert_eq!(outcomes[2].status, Status::Failed);
    assert_eq!(outcomes[2].basis, Some(MatchBasis::NoCandidates));
    assert!(outcomes[2].error.is_some());

    assert_eq!(
        printer.printed.borrow().as_slice(),
        [
            format!("{}/energy-certificate/0001-0001-0001-0001-0001", BASE),
            format!("{}/energy-certificate/0003-0003-0003-0003-0003", BASE),
        ]
    );

    let summary = Summary::from_outcomes(&outcomes);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let report_path = report::write_report(&dir, &outcomes).unwrap();
    let written = std::fs::read_to_string(&report_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("Address,Postcode,Filename,Status,Matched Address,Score,Basis,Error")
    );
    assert_eq!(lines.count(), 3);
    assert!(written.contains("high_confidence"));
    assert!(written.contains("1.00"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_fallback_disabled_fails_record() {
    let dir = scratch_dir("no-fallback");
    let records = sheet::read_records(SHEET_CSV.as_bytes()).unwrap();

    let printer = StubPrinter::default();
    let runner = Runner::new(CannedRegister::new(), &printer, options(dir.clone(), false));
    let outcome = runner.process_record(&records[1]);

    assert_eq!(outcome.status, Status::Failed);
    assert_eq!(outcome.basis, Some(MatchBasis::Fallback));
    assert!(outcome.error.unwrap().contains("fallback is disabled"));
    assert!(printer.printed.borrow().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_limit_and_stop_flag() {
    let records = sheet::read_records(SHEET_CSV.as_bytes()).unwrap();
    let dir = scratch_dir("limit");
    let printer = StubPrinter::default();

    let runner = Runner::new(CannedRegister::new(), &printer, options(dir.clone(), true));
    assert_eq!(runner.process_all(&records, Some(1)).len(), 1);

    runner.stop_flag().store(false, std::sync::atomic::Ordering::SeqCst);
    assert!(runner.process_all(&records, None).is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
