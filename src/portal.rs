//! HTTP session against the EPC register: postcode search and result-page
//! parsing. Owns the agent, timeouts and retry policy so the matching
//! modules never see any of it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use ureq::ResponseExt;
use url::Url;

use crate::config::PortalConfig;
use crate::error::{EpcError, Result};
use crate::matcher::MatchCandidate;

/// Paths of the search pages themselves ("search again", property type)
const SEARCH_FLOW_PREFIX: &str = "/find-a-certificate";

/// Longest single back-off between retries
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex")
});

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a[href]").expect("Invalid anchor selector")
});

/// A fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: String,
    pub html: String,
}

/// Candidates found for a postcode search
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub page_url: String,
    pub strategy: Option<CandidateStrategy>,
    pub candidates: Vec<MatchCandidate>,
}

/// Ways of locating address links on a results page, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStrategy {
    /// Links into `/energy-certificate/{rrn}`
    CertificateLinks,
    /// Portal links whose path mentions a certificate, outside the search pages
    CertificateHref,
    /// Links whose text contains the searched postcode
    PostcodeText,
}

impl CandidateStrategy {
    pub const ORDER: [CandidateStrategy; 3] = [
        CandidateStrategy::CertificateLinks,
        CandidateStrategy::CertificateHref,
        CandidateStrategy::PostcodeText,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CandidateStrategy::CertificateLinks => "certificate links",
            CandidateStrategy::CertificateHref => "certificate hrefs",
            CandidateStrategy::PostcodeText => "postcode text",
        }
    }

    /// Whether `anchor` on a results page at `base` is an address candidate.
    /// Links off the portal never are.
    fn accepts(&self, anchor: &Anchor, base: &Url, postcode: &str) -> bool {
        if anchor.url.host_str() != base.host_str() {
            return false;
        }
        let target = anchor.path_and_query().to_lowercase();
        match self {
            CandidateStrategy::CertificateLinks => target.contains("/energy-certificate/"),
            CandidateStrategy::CertificateHref => {
                target.contains("certificate") && !target.starts_with(SEARCH_FLOW_PREFIX)
            }
            CandidateStrategy::PostcodeText => {
                !postcode.is_empty() && anchor.text.to_uppercase().contains(postcode)
            }
        }
    }
}

/// A link on a results page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Anchor {
    /// href resolved against the page URL
    url: Url,
    /// Whitespace-collapsed link text
    text: String,
}

impl Anchor {
    fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }
}

/// Retry policy for transient HTTP failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry `attempt` (0-indexed): base * 2^attempt, capped
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }
}

/// Whether a failed request is worth repeating
pub fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::StatusCode(code) => *code == 429 || *code >= 500,
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed => true,
        _ => false,
    }
}

/// Stateful client for the certificate register
pub struct Portal {
    agent: ureq::Agent,
    base_url: Url,
    user_agent: String,
    retry: RetryPolicy,
    /// Where results pages with no address links are saved
    snapshot_dir: Option<PathBuf>,
}

impl Portal {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url: Url::parse(&config.base_url)?,
            user_agent: config.user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.retries,
                base_delay: Duration::from_millis(config.retry_base_ms),
                max_delay: MAX_RETRY_DELAY,
            },
            snapshot_dir: None,
        })
    }

    /// Save results pages that yield no candidates into `dir`
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// URL of the domestic search-by-postcode results page
    pub fn search_url(&self, postcode: &str) -> Result<Url> {
        let mut url = self.base_url.join("/find-a-certificate/search-by-postcode")?;
        url.query_pairs_mut()
            .append_pair("postcode", postcode)
            .append_pair("property_type", "domestic");
        Ok(url)
    }

    /// GET a page, retrying transient failures
    pub fn get(&self, url: &str) -> Result<Page> {
        let mut attempt = 0;
        loop {
            match self.get_once(url) {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.retry.max_retries && is_retryable(&e) => {
                    let delay = self.retry.delay(attempt);
                    warn!(%url, error = %e, retry_in_ms = delay.as_millis() as u64, "request failed, retrying");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn get_once(&self, url: &str) -> std::result::Result<Page, ureq::Error> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()?;
        let final_url = response.get_uri().to_string();
        let html = response.into_body().read_to_string()?;
        Ok(Page { url: final_url, html })
    }

    /// Search the register for a postcode and collect the listed addresses
    pub fn search(&self, postcode: &str) -> Result<SearchResults> {
        let postcode = normalize_postcode(postcode);
        if postcode.is_empty() {
            return Err(EpcError::Navigation("record has no postcode".into()));
        }

        let url = self.search_url(&postcode)?;
        info!(%postcode, "searching register");
        let page = self.get(url.as_str())?;

        let (strategy, candidates) = extract_candidates(&page.html, &page.url, &postcode)?;
        match strategy {
            Some(s) => debug!(strategy = s.name(), count = candidates.len(), "found address links"),
            None => {
                warn!(%postcode, url = %page.url, "no address links on results page");
                if let Some(ref dir) = self.snapshot_dir {
                    match save_page_snapshot(dir, &postcode, &page.html) {
                        Ok(path) => info!(path = %path.display(), "saved results page"),
                        Err(e) => warn!(error = %e, "could not save results page"),
                    }
                }
            }
        }

        Ok(SearchResults {
            page_url: page.url,
            strategy,
            candidates,
        })
    }
}

/// Write a results page to `{dir}/no_results_{POSTCODE}_{timestamp}.html`
pub fn save_page_snapshot(dir: &Path, postcode: &str, html: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = format!(
        "no_results_{}_{}.html",
        postcode.replace(' ', "_"),
        Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(crate::record::sanitize_filename(&name));
    std::fs::write(&path, html)?;
    Ok(path)
}

/// Uppercase, single-spaced postcode. Inserts the space before the inward
/// code when it was typed without one ("CT11AA" -> "CT1 1AA").
pub fn normalize_postcode(raw: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(raw.trim(), " ").to_uppercase();
    if !collapsed.contains(' ') && (5..=7).contains(&collapsed.len()) && collapsed.is_ascii() {
        let (outward, inward) = collapsed.split_at(collapsed.len() - 3);
        return format!("{} {}", outward, inward);
    }
    collapsed
}

/// Pull candidate address links from a results page.
///
/// Strategies are tried in [`CandidateStrategy::ORDER`]; the first that finds
/// anything wins. Handles are absolute URLs resolved against `page_url`.
pub fn extract_candidates(
    html: &str,
    page_url: &str,
    postcode: &str,
) -> Result<(Option<CandidateStrategy>, Vec<MatchCandidate>)> {
    let base = Url::parse(page_url)?;
    let document = Html::parse_document(html);
    let postcode = normalize_postcode(postcode);

    let anchors: Vec<Anchor> = document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|el| anchor_parts(el, &base))
        .collect();

    for strategy in CandidateStrategy::ORDER {
        let mut seen = HashSet::new();
        let candidates: Vec<MatchCandidate> = anchors
            .iter()
            .filter(|anchor| strategy.accepts(anchor, &base, &postcode))
            .filter(|anchor| seen.insert(*anchor))
            .map(|anchor| MatchCandidate::new(anchor.text.clone(), anchor.url.to_string()))
            .collect();

        if !candidates.is_empty() {
            return Ok((Some(strategy), candidates));
        }
    }

    Ok((None, Vec::new()))
}

fn anchor_parts(el: ElementRef<'_>, base: &Url) -> Option<Anchor> {
    let href = el.value().attr("href")?;
    let url = base.join(href).ok()?;
    let text: String = el.text().collect::<Vec<_>>().join(" ");
    let text = WHITESPACE_RE.replace_all(&text, " ").trim().to_string();
    Some(Anchor { url, text })
}
