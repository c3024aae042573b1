//! Matching inspection commands: search, match, filename

use colored::Colorize;
use serde::Serialize;

use epc_scrape::config::Config;
use epc_scrape::error::Result;
use epc_scrape::matcher::{self, MatchBasis, MatchCandidate, MatchDecision};
use epc_scrape::portal::Portal;
use epc_scrape::record::certificate_filename;
use epc_scrape::scoring::{score_breakdown, ScoreBreakdown};

use crate::utils::truncate_str;

/// One listed address with its score against the target
#[derive(Serialize)]
struct ScoredCandidate<'a, H: Serialize> {
    text: &'a str,
    handle: &'a H,
    decoy: bool,
    score: Option<f64>,
    breakdown: Option<ScoreBreakdown>,
}

#[derive(Serialize)]
struct MatchReport<'a, H: Serialize> {
    target: Option<&'a str>,
    candidates: Vec<ScoredCandidate<'a, H>>,
    decision: Option<MatchDecision<H>>,
}

fn build_report<'a, H: Clone + Serialize>(
    target: Option<&'a str>,
    candidates: &'a [MatchCandidate<H>],
) -> MatchReport<'a, H> {
    let scored = candidates
        .iter()
        .map(|c| {
            let decoy = c.is_decoy();
            let breakdown = target.filter(|_| !decoy).map(|t| score_breakdown(t, &c.text));
            ScoredCandidate {
                text: &c.text,
                handle: &c.handle,
                decoy,
                score: breakdown.map(|b| b.total()),
                breakdown,
            }
        })
        .collect();

    MatchReport {
        target,
        candidates: scored,
        decision: target.map(|t| matcher::select(t, candidates)),
    }
}

fn print_report<H: Serialize>(report: &MatchReport<'_, H>, show_handle: impl Fn(&H) -> Option<String>) {
    for (i, c) in report.candidates.iter().enumerate() {
        let label = format!("{:>3}. {}", i + 1, truncate_str(c.text, 70));
        match (c.decoy, c.score) {
            (true, _) => println!("{}  {}", label.dimmed(), "(skipped)".dimmed()),
            (false, Some(s)) => println!("{}  {}", label, format!("{:.2}", s).cyan()),
            (false, None) => println!("{}", label),
        }
        if let Some(handle) = show_handle(c.handle) {
            println!("       {}", handle.dimmed());
        }
    }

    if let Some(ref decision) = report.decision {
        println!();
        let basis = match decision.basis {
            MatchBasis::HighConfidence => decision.basis.to_string().green(),
            MatchBasis::BestEffort => decision.basis.to_string().yellow(),
            MatchBasis::Fallback | MatchBasis::NoCandidates => decision.basis.to_string().red(),
        };
        match decision.selected {
            Some(ref c) => println!(
                "  Selected: {} ({}, score {:.2})",
                c.text.bold(),
                basis,
                decision.score
            ),
            None => println!("  Selected: none ({})", basis),
        }
        if decision.basis == MatchBasis::Fallback {
            println!(
                "  {}",
                "Nothing resembles the target; this is just the first listed address.".yellow()
            );
        }
    }
}

/// List the register's addresses for a postcode, optionally scored
pub fn cmd_search(postcode: &str, address: Option<&str>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let portal = Portal::new(&config.portal)?;
    let results = portal.search(postcode)?;
    let report = build_report(address, &results.candidates);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", results.page_url.dimmed());
    if results.candidates.is_empty() {
        println!("\n  No addresses listed.\n");
        return Ok(());
    }
    if let Some(strategy) = results.strategy {
        println!("Found {} address links ({})\n", results.candidates.len(), strategy.name());
    }
    print_report(&report, |h: &String| Some(h.clone()));
    println!();
    Ok(())
}

/// Score candidate addresses against a target without touching the network
pub fn cmd_match(target: &str, candidates: &[String], json: bool) -> Result<()> {
    let candidates: Vec<MatchCandidate<usize>> = candidates
        .iter()
        .enumerate()
        .map(|(i, text)| MatchCandidate::new(text.as_str(), i + 1))
        .collect();
    let report = build_report(Some(target), &candidates);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\nTarget: {}\n", target.bold());
    print_report(&report, |_| None);
    println!();
    Ok(())
}

/// Print the PDF file name for the given fields
pub fn cmd_filename(
    scheme: Option<String>,
    plot: Option<String>,
    tenure: Option<String>,
    uprn: Option<String>,
) -> Result<()> {
    println!(
        "{}",
        certificate_filename(
            scheme.as_deref(),
            plot.as_deref(),
            tenure.as_deref(),
            uprn.as_deref()
        )
    );
    Ok(())
}
