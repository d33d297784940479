//! Search command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use photomatch_core::{
    HashAlgorithm, HttpFetcherConfig, HttpImageFetcher, MatcherConfig, SearchParams,
    SearchReport, SimilarityMatcher, StaticCatalog,
};
use tracing::{info, warn};

use crate::exit_codes::UsageError;

/// Arguments of the search command.
pub struct SearchArgs {
    pub image: PathBuf,
    pub catalog: PathBuf,
    pub threshold: u32,
    pub max_results: usize,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub algorithm: HashAlgorithm,
    pub json: bool,
    pub quiet: bool,
}

/// Execute the search command.
pub async fn execute(args: SearchArgs) -> Result<()> {
    if args.max_results == 0 {
        return Err(UsageError("--max-results must be at least 1".into()).into());
    }
    if args.concurrency == 0 {
        return Err(UsageError("--concurrency must be at least 1".into()).into());
    }

    let query = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read file: {}", args.image.display()))?;

    let catalog = StaticCatalog::from_json_file(&args.catalog)
        .with_context(|| format!("Failed to load catalog: {}", args.catalog.display()))?;

    info!(
        catalog = %args.catalog.display(),
        entries = catalog.len(),
        "Loaded catalog"
    );

    let timeout = Duration::from_secs(args.timeout_secs);
    let fetcher = HttpImageFetcher::with_config(HttpFetcherConfig {
        timeout,
        ..Default::default()
    })
    .context("Failed to create HTTP client")?;

    let matcher = SimilarityMatcher::new(
        Arc::new(catalog),
        Arc::new(fetcher),
        MatcherConfig {
            algorithm: args.algorithm,
            concurrency: args.concurrency,
            fetch_timeout: timeout,
            ..Default::default()
        },
    );

    let params = SearchParams {
        threshold: args.threshold,
        max_results: args.max_results,
    };

    let start = Instant::now();
    let report = matcher.search_with_report(&query, params).await?;
    let elapsed = start.elapsed();

    if !report.query_decoded {
        warn!(path = %args.image.display(), "Query image could not be decoded");
    }

    if args.json {
        print_json(&args, &report)?;
    } else if args.quiet {
        for m in &report.matches {
            println!("{}\t{}", m.candidate.id, m.distance);
        }
    } else {
        print_table(&args, &report, elapsed);
    }

    Ok(())
}

fn print_json(args: &SearchArgs, report: &SearchReport) -> Result<()> {
    let output = serde_json::json!({
        "query": args.image.display().to_string(),
        "algorithm": args.algorithm,
        "threshold": args.threshold,
        "query_decoded": report.query_decoded,
        "candidates": report.candidates,
        "scored": report.scored,
        "skipped": report.skipped,
        "count": report.matches.len(),
        "matches": report.matches,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_table(args: &SearchArgs, report: &SearchReport, elapsed: Duration) {
    if !report.query_decoded {
        println!(
            "{} {} is not a decodable image, no matches",
            "Warning:".yellow().bold(),
            args.image.display()
        );
        return;
    }

    println!(
        "   {} {} candidates, {} compared, {} skipped ({:.2}s)",
        "Scanned:".dimmed(),
        report.candidates,
        report.scored,
        report.skipped,
        elapsed.as_secs_f64()
    );

    if report.matches.is_empty() {
        println!(
            "   {} within distance {}",
            "No matches".yellow(),
            args.threshold
        );
        return;
    }

    println!();
    for (rank, m) in report.matches.iter().enumerate() {
        let distance = if m.distance == 0 {
            m.distance.to_string().green().bold()
        } else {
            m.distance.to_string().normal()
        };
        println!(
            "{:>3}. {:<4} {}  {}",
            rank + 1,
            distance,
            m.candidate.id.bold(),
            m.candidate.name.as_deref().unwrap_or("")
        );
        println!("          {}", m.candidate.image_url.dimmed());
    }
}
