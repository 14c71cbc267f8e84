//! Fuzzy similarity scoring.
//!
//! All fuzzy comparisons share one score: normalized Levenshtein similarity
//! in [0.0, 1.0], compared against a per-comparator threshold.

use strsim::normalized_levenshtein;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Default threshold for fuzzy title and artist+title comparison
pub const FUZZY_THRESHOLD: f64 = 0.9;

/// Looser threshold used when album and track position already agree
pub const ALBUM_TRACK_FUZZY_THRESHOLD: f64 = 0.75;

// ============================================================================
// Similarity
// ============================================================================

/// Similarity ratio (0.0 to 1.0). Identical strings score 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    normalized_levenshtein(a, b)
}

/// True if `a` and `b` score at least `threshold`.
/// Empty strings never match anything: two blank fields are not evidence.
pub fn fuzzy_compare(a: &str, b: &str, threshold: f64) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    similarity(a, b) >= threshold
}
