//! Core data models for track matching.
//!
//! This module contains the track descriptor shared by every comparator,
//! the lookup request/result records used by the batch CLI, and the
//! per-run statistics.

use serde::{Deserialize, Serialize};

// ============================================================================
// Track Descriptor
// ============================================================================

/// A playable item as seen by one service.
///
/// `src` is service-qualified (`"jellyfin:audio:1234"`). Optional string
/// fields that are present but empty are treated as absent by every
/// comparator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub src: String,
    pub title: String,
    pub artists: Vec<String>, // Credited order, primary artist first
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<u32>,
    pub track: Option<u32>,    // Position within the album
    pub duration: Option<f64>, // Seconds
    pub isrc: Option<String>,
    pub recording_mbid: Option<String>,
    pub track_mbid: Option<String>,
    pub release_mbid: Option<String>,
}

impl Track {
    pub fn new(src: &str, title: &str, artists: &[&str]) -> Self {
        Self {
            src: src.to_string(),
            title: title.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_album(mut self, album: &str, track: u32) -> Self {
        self.album = Some(album.to_string());
        self.track = Some(track);
        self
    }

    pub fn with_album_artist(mut self, album_artist: &str) -> Self {
        self.album_artist = Some(album_artist.to_string());
        self
    }

    pub fn with_isrc(mut self, isrc: &str) -> Self {
        self.isrc = Some(isrc.to_string());
        self
    }

    pub fn with_recording_mbid(mut self, mbid: &str) -> Self {
        self.recording_mbid = Some(mbid.to_string());
        self
    }

    pub fn with_track_mbid(mut self, mbid: &str) -> Self {
        self.track_mbid = Some(mbid.to_string());
        self
    }

    pub fn with_release_mbid(mut self, mbid: &str) -> Self {
        self.release_mbid = Some(mbid.to_string());
        self
    }

    /// First credited artist, if it is non-empty.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str).filter(|a| !a.is_empty())
    }

    pub fn isrc(&self) -> Option<&str> {
        present(&self.isrc)
    }

    pub fn recording_mbid(&self) -> Option<&str> {
        present(&self.recording_mbid)
    }

    pub fn track_mbid(&self) -> Option<&str> {
        present(&self.track_mbid)
    }

    pub fn release_mbid(&self) -> Option<&str> {
        present(&self.release_mbid)
    }

    pub fn album(&self) -> Option<&str> {
        present(&self.album)
    }

    pub fn album_artist(&self) -> Option<&str> {
        present(&self.album_artist)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Match Stages
// ============================================================================

/// The cascade stage that produced the final candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    /// Candidates sharing an externally supplied ISRC
    ExternalIsrc,
    /// Same src, ISRC, recording MBID or track MBID as the source
    Identity,
    /// Strict title + strict artist
    Strict,
    /// Strict title + loose artist
    StrictTitleLooseArtist,
    /// Loose title + loose artist, including the fuzzy fallback
    Loose,
    /// Nothing matched
    NoMatch,
    /// Source had no primary artist or no title
    MissingFields,
}

impl MatchStage {
    pub const ALL: [MatchStage; 7] = [
        MatchStage::ExternalIsrc,
        MatchStage::Identity,
        MatchStage::Strict,
        MatchStage::StrictTitleLooseArtist,
        MatchStage::Loose,
        MatchStage::NoMatch,
        MatchStage::MissingFields,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MatchStage::ExternalIsrc => "external isrc",
            MatchStage::Identity => "identity",
            MatchStage::Strict => "strict",
            MatchStage::StrictTitleLooseArtist => "strict title/loose artist",
            MatchStage::Loose => "loose",
            MatchStage::NoMatch => "no match",
            MatchStage::MissingFields => "missing fields",
        }
    }

    pub fn is_match(self) -> bool {
        !matches!(self, MatchStage::NoMatch | MatchStage::MissingFields)
    }
}

/// Best candidate plus the stage it came from.
#[derive(Debug, Clone, Copy)]
pub struct MatchOutcome<'a> {
    pub track: Option<&'a Track>,
    pub stage: MatchStage,
}

// ============================================================================
// Batch Lookup Models
// ============================================================================

/// One track to resolve against the library, with optional ISRCs from an
/// external lookup (distinct from the track's own ISRC).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LookupRequest {
    #[serde(flatten)]
    pub track: Track,
    #[serde(default)]
    pub isrcs: Vec<String>,
}

/// Output record for one request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub source_src: String,
    pub source_title: String,
    pub source_artist: Option<String>,
    pub matched_src: Option<String>,
    pub matched_title: Option<String>,
    pub matched_artist: Option<String>,
    pub stage: MatchStage,
    pub candidate_count: usize,
}

impl ResolvedTrack {
    pub fn new(source: &Track, outcome: &MatchOutcome<'_>, candidate_count: usize) -> Self {
        Self {
            source_src: source.src.clone(),
            source_title: source.title.clone(),
            source_artist: source.primary_artist().map(str::to_string),
            matched_src: outcome.track.map(|t| t.src.clone()),
            matched_title: outcome.track.map(|t| t.title.clone()),
            matched_artist: outcome
                .track
                .and_then(|t| t.primary_artist())
                .map(str::to_string),
            stage: outcome.stage,
            candidate_count,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_src.is_some()
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-stage resolution statistics for one batch run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ResolveStats {
    pub total_requests: usize,
    pub total_matches: usize,
    pub total_failures: usize,

    pub external_isrc_matches: usize,
    pub identity_matches: usize,
    pub strict_matches: usize,
    pub strict_title_loose_artist_matches: usize,
    pub loose_matches: usize,
    pub no_match: usize,
    pub missing_fields: usize,

    // Candidate prefilter sizes
    pub max_candidates: usize,
    pub empty_candidate_sets: usize,

    pub elapsed_seconds: f64,
}

impl ResolveStats {
    pub fn from_results(results: &[ResolvedTrack]) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(result);
        }
        stats
    }

    pub fn record(&mut self, result: &ResolvedTrack) {
        self.total_requests += 1;
        if result.is_matched() {
            self.total_matches += 1;
        } else {
            self.total_failures += 1;
        }
        self.max_candidates = self.max_candidates.max(result.candidate_count);
        if result.candidate_count == 0 {
            self.empty_candidate_sets += 1;
        }
        match result.stage {
            MatchStage::ExternalIsrc => self.external_isrc_matches += 1,
            MatchStage::Identity => self.identity_matches += 1,
            MatchStage::Strict => self.strict_matches += 1,
            MatchStage::StrictTitleLooseArtist => self.strict_title_loose_artist_matches += 1,
            MatchStage::Loose => self.loose_matches += 1,
            MatchStage::NoMatch => self.no_match += 1,
            MatchStage::MissingFields => self.missing_fields += 1,
        }
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            100.0 * self.total_matches as f64 / self.total_requests as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
