use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use track_matcher::library::{load_requests, load_tracks, LibraryIndex};
use track_matcher::matcher::resolve;
use track_matcher::models::{LookupRequest, MatchStage, ResolveStats, ResolvedTrack};
use track_matcher::progress::{
    create_progress_bar, create_spinner, format_duration, log_phase, log_progress, set_log_only,
};
use track_matcher::safety::validate_output_path;
use track_matcher::settings::LookupSettings;

#[derive(Parser)]
#[command(name = "track-matcher")]
#[command(about = "Resolve tracks from one service against a music library")]
struct Args {
    /// Library to search: JSON array of tracks, or SQLite database with a `tracks` table
    library: PathBuf,

    /// JSON array of tracks to resolve (each may carry external `isrcs`)
    requests: PathBuf,

    /// Output JSON file for resolved tracks
    output: PathBuf,

    /// JSON settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Prefer matches from personal media services (overrides settings file)
    #[arg(long)]
    prefer_personal_media: bool,

    /// Prefer matches from this service id (overrides settings file)
    #[arg(long)]
    preferred_service: Option<String>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars and log `[PHASE]` lines to stderr
    #[arg(long)]
    log_only: bool,

    /// Compare every request against the whole library, skipping the prefilter
    #[arg(long)]
    full_scan: bool,
}

const LOG_INTERVAL: u64 = 10_000;

fn load_settings(args: &Args) -> Result<LookupSettings> {
    let mut settings = match &args.settings {
        Some(path) => LookupSettings::load(path)?,
        None => LookupSettings::default(),
    };
    if args.prefer_personal_media {
        settings.prefer_personal_media = true;
    }
    if let Some(service) = &args.preferred_service {
        settings.preferred_service_id = Some(service.clone());
    }
    Ok(settings)
}

fn resolve_all(
    index: &LibraryIndex,
    requests: &[LookupRequest],
    settings: &LookupSettings,
    full_scan: bool,
) -> Vec<ResolvedTrack> {
    let total = requests.len() as u64;
    log_phase("RESOLVE", &format!("Resolving {} requests...", total));
    let pb = create_progress_bar(total, "Resolving");
    let done = AtomicU64::new(0);

    let results: Vec<ResolvedTrack> = requests
        .par_iter()
        .map(|request| {
            let source = &request.track;
            let (outcome, candidate_count) = if full_scan {
                let outcome = resolve(index.tracks(), source, &request.isrcs, None, settings);
                (outcome, index.len())
            } else {
                let candidates = index.candidates(source, &request.isrcs);
                let count = candidates.len();
                (resolve(candidates, source, &request.isrcs, None, settings), count)
            };

            pb.inc(1);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("RESOLVE", current, total, LOG_INTERVAL);

            ResolvedTrack::new(source, &outcome, candidate_count)
        })
        .collect();

    pb.finish_with_message("Resolved");
    results
}

fn write_results(path: &Path, results: &[ResolvedTrack]) -> Result<()> {
    let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let mut inputs: Vec<&Path> = vec![args.library.as_path(), args.requests.as_path()];
    if let Some(settings) = &args.settings {
        inputs.push(settings);
    }
    validate_output_path(&args.output, &inputs)?;

    let start = Instant::now();
    let settings = load_settings(&args)?;

    println!("Loading library: {:?}", args.library);
    let tracks = load_tracks(&args.library)?;
    println!("  Loaded {} library tracks", tracks.len());

    println!("Loading requests: {:?}", args.requests);
    let requests = load_requests(&args.requests)?;
    println!("  Loaded {} requests", requests.len());

    let spinner = create_spinner("Building library index");
    let index_start = Instant::now();
    let index = LibraryIndex::new(tracks);
    spinner.finish_with_message(format!(
        "Built library index in {}",
        format_duration(index_start.elapsed())
    ));
    log_phase("INDEX", &format!("Indexed {} tracks", index.len()));

    let resolve_start = Instant::now();
    let results = resolve_all(&index, &requests, &settings, args.full_scan);
    let resolve_elapsed = resolve_start.elapsed();

    println!("Writing results: {:?}", args.output);
    write_results(&args.output, &results)?;

    let mut stats = ResolveStats::from_results(&results);
    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    if args.log_only {
        stats.log_phase("RESOLVE");
    }
    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }

    println!("\n{:=<60}", "");
    println!("Resolution complete!");
    println!("  Requests: {}", stats.total_requests);
    println!(
        "  Matched: {} ({:.1}%)",
        stats.total_matches,
        stats.match_rate()
    );
    for stage in MatchStage::ALL {
        let count = results.iter().filter(|r| r.stage == stage).count();
        if count > 0 {
            println!("    {:<26} {:>8}", stage.label(), count);
        }
    }
    println!("  Resolve time: {}", format_duration(resolve_elapsed));
    println!("  Elapsed: {:.2}s", stats.elapsed_seconds);
    println!("{:=<60}", "");

    Ok(())
}
