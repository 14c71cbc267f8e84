//! Break down a results file by match stage and look for patterns among the
//! requests that did not match.
//!
//! Usage: analyze-unmatched <results.json> [--sample N]

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use track_matcher::models::{MatchStage, ResolveStats, ResolvedTrack};
use track_matcher::normalize::{has_featured_artists, split_artists, trim_track_title};

#[derive(Parser)]
#[command(name = "analyze-unmatched")]
#[command(about = "Summarize a track-matcher results file")]
struct Args {
    /// Results JSON written by track-matcher
    results: PathBuf,

    /// Number of unmatched requests to print
    #[arg(long, default_value = "20")]
    sample: usize,
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();

    println!("Loading results: {:?}", args.results);
    let json = std::fs::read_to_string(&args.results)
        .with_context(|| format!("Failed to read {}", args.results.display()))?;
    let results: Vec<ResolvedTrack> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", args.results.display()))?;
    println!("  Loaded {} results", results.len());

    let stats = ResolveStats::from_results(&results);
    let total = stats.total_requests;

    println!("\n=== MATCH STAGES ({} requests) ===", total);
    println!();
    println!("Stage                        Count       %");
    println!("───────────────────────────────────────────");
    for stage in MatchStage::ALL {
        let count = results.iter().filter(|r| r.stage == stage).count();
        println!("{:<26} {:>8}  {:>5.1}%", stage.label(), count, pct(count, total));
    }
    println!("───────────────────────────────────────────");
    println!(
        "{:<26} {:>8}  {:>5.1}%",
        "TOTAL MATCHED",
        stats.total_matches,
        stats.match_rate()
    );
    println!("  Largest candidate set: {}", stats.max_candidates);

    let unmatched: Vec<&ResolvedTrack> = results.iter().filter(|r| !r.is_matched()).collect();
    if unmatched.is_empty() {
        println!("\nEverything matched.");
        return Ok(());
    }

    let no_candidates = AtomicUsize::new(0);
    let featured = AtomicUsize::new(0);
    let version_suffix = AtomicUsize::new(0);
    let multi_artist = AtomicUsize::new(0);

    unmatched.par_iter().for_each(|result| {
        if result.candidate_count == 0 {
            no_candidates.fetch_add(1, Ordering::Relaxed);
        }
        if has_featured_artists(&result.source_title) {
            featured.fetch_add(1, Ordering::Relaxed);
        }
        if trim_track_title(&result.source_title) != result.source_title {
            version_suffix.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(artist) = &result.source_artist {
            if split_artists(std::slice::from_ref(artist)).len() > 1 {
                multi_artist.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let missed = unmatched.len();
    let rows = [
        ("No candidates", no_candidates.load(Ordering::Relaxed)),
        ("Featured artist in title", featured.load(Ordering::Relaxed)),
        ("Version suffix in title", version_suffix.load(Ordering::Relaxed)),
        ("Multi-artist credit", multi_artist.load(Ordering::Relaxed)),
    ];

    println!("\n=== UNMATCHED PATTERNS ({} requests) ===", missed);
    println!();
    println!("Pattern                      Count       %");
    println!("───────────────────────────────────────────");
    for (label, count) in rows {
        println!("{:<26} {:>8}  {:>5.1}%", label, count, pct(count, missed));
    }

    println!("\n=== SAMPLE ===");
    for result in unmatched.iter().take(args.sample) {
        println!(
            "  [{}] {} - {} ({} candidates)",
            result.stage.label(),
            result.source_artist.as_deref().unwrap_or("<no artist>"),
            result.source_title,
            result.candidate_count
        );
    }

    println!();
    println!("Elapsed: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
