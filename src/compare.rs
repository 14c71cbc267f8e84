//! Field comparators for track matching.
//!
//! Every comparator takes `(candidate, source)` and answers one question about
//! the pair. Missing fields make the specific check fail; they are never
//! errors. The cascade in `matcher` decides which comparators run and in which
//! order.

use crate::models::Track;
use crate::normalize::{
    compare_string, has_featured_artists, normalize, remove_featured_artists, split_artists,
    string_includes, title_with_featured_artists, trim_track_title,
};
use crate::scoring::{fuzzy_compare, ALBUM_TRACK_FUZZY_THRESHOLD, FUZZY_THRESHOLD};

// ============================================================================
// Identity
// ============================================================================

/// Exact match on a unique identifier: src, ISRC, recording MBID or track MBID.
pub fn same_identity(candidate: &Track, source: &Track) -> bool {
    if !source.src.is_empty() && source.src == candidate.src {
        return true;
    }
    same_id(source.isrc(), candidate.isrc())
        || same_id(source.recording_mbid(), candidate.recording_mbid())
        || same_id(source.track_mbid(), candidate.track_mbid())
}

fn same_id(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

// ============================================================================
// Combined
// ============================================================================

/// Title and artist comparison at the given strictness.
/// When both are loose, the fuzzy artist+title fallback also applies.
pub fn same_track(candidate: &Track, source: &Track, strict_title: bool, strict_artist: bool) -> bool {
    if same_title(candidate, source, strict_title) && same_artist(candidate, source, strict_artist) {
        return true;
    }
    !strict_title && !strict_artist && fuzzy_same_artist_and_title(candidate, source)
}

// ============================================================================
// Title
// ============================================================================

pub fn same_title(candidate: &Track, source: &Track, strict: bool) -> bool {
    let title = source.title.as_str();
    if title.is_empty() {
        return false;
    }
    if compare_string(title, &candidate.title) {
        return true;
    }
    if strict {
        return same_album_track(candidate, source, true);
    }
    if same_title_strings(candidate, &candidate.title, title) {
        return true;
    }
    if same_title_strings(
        candidate,
        &trim_track_title(&candidate.title),
        &trim_track_title(title),
    ) {
        return true;
    }
    same_album_track(candidate, source, false)
}

/// Loose title equality: normalized, with the candidate's featured artists
/// appended, or with a featured-artist suffix removed from either side.
fn same_title_strings(candidate: &Track, candidate_title: &str, title: &str) -> bool {
    let candidate_title = normalize(candidate_title, false);
    let title = normalize(title, false);
    if compare_string(&title, &candidate_title) {
        return true;
    }
    let featured = candidate.artists.get(1..).unwrap_or_default();
    if let Some(with_featured) = title_with_featured_artists(&candidate_title, featured) {
        if compare_string(&title, &with_featured) {
            return true;
        }
    }
    if has_featured_artists(&title) && compare_string(&remove_featured_artists(&title), &candidate_title) {
        return true;
    }
    has_featured_artists(&candidate_title)
        && compare_string(&title, &remove_featured_artists(&candidate_title))
}

// ============================================================================
// Artist
// ============================================================================

pub fn same_artist(candidate: &Track, source: &Track, strict: bool) -> bool {
    let (Some(artist), Some(candidate_artist)) = (source.primary_artist(), candidate.primary_artist()) else {
        return false;
    };
    if compare_string(artist, candidate_artist) {
        return true;
    }
    if strict {
        return false;
    }
    if compare_string(&normalize(artist, false), &normalize(candidate_artist, false)) {
        return true;
    }
    let artist_without_featured = remove_featured_artists(artist);
    if compare_string(&artist_without_featured, &remove_featured_artists(candidate_artist)) {
        return true;
    }
    if let Some(album_artist) = source.album_artist() {
        if compare_string(&normalize(album_artist, false), &normalize(candidate_artist, false)) {
            return true;
        }
    }
    if let Some(candidate_album_artist) = candidate.album_artist() {
        if compare_string(&artist_without_featured, candidate_album_artist) {
            return true;
        }
    }
    same_multi_artist(candidate, source) || same_bracketed_artist(candidate, source)
}

/// Any shared name once credits are split on separators, provided at least one
/// side actually credits more than one artist.
pub fn same_multi_artist(candidate: &Track, source: &Track) -> bool {
    let artists = split_artists(&source.artists);
    let candidate_artists = split_artists(&candidate.artists);
    if artists.len() <= 1 && candidate_artists.len() <= 1 {
        return false;
    }
    let candidate_names: Vec<String> = candidate_artists.iter().map(|a| normalize(a, false)).collect();
    artists.iter().any(|artist| {
        let name = normalize(artist, false);
        candidate_names.iter().any(|candidate_name| compare_string(&name, candidate_name))
    })
}

/// One primary artist appears bracketed inside the other:
/// "Artist (Alias)" vs "Alias", "Band [Member]" vs "Member".
pub fn same_bracketed_artist(candidate: &Track, source: &Track) -> bool {
    let artist = normalize(source.primary_artist().unwrap_or_default(), false);
    let candidate_artist = normalize(candidate.primary_artist().unwrap_or_default(), false);
    let (longer, shorter) = if artist.len() > candidate_artist.len() {
        (artist, candidate_artist)
    } else {
        (candidate_artist, artist)
    };
    if shorter.is_empty() {
        return false;
    }
    [("(", ")"), ("[", "]"), ("{", "}")]
        .iter()
        .any(|(open, close)| string_includes(&longer, &format!("{}{}{}", open, shorter, close)))
}

// ============================================================================
// Album
// ============================================================================

pub fn same_album(candidate: &Track, source: &Track) -> bool {
    let (Some(album), Some(candidate_album)) = (source.album(), candidate.album()) else {
        return false;
    };
    if same_id(source.release_mbid(), candidate.release_mbid()) {
        return true;
    }
    compare_string(&normalize(album, false), &normalize(candidate_album, false))
}

/// Same album and both track positions present and equal.
pub fn same_album_position(candidate: &Track, source: &Track) -> bool {
    matches!((source.track, candidate.track), (Some(a), Some(b)) if a == b) && same_album(candidate, source)
}

/// Same album position, plus a title check: exact (normalized) when strict,
/// prefix or fuzzy otherwise.
pub fn same_album_track(candidate: &Track, source: &Track, strict: bool) -> bool {
    if !same_album_position(candidate, source) {
        return false;
    }
    let a = normalize(&candidate.title, false);
    let b = normalize(&source.title, false);
    if strict {
        return compare_string(&a, &b);
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (a_key, b_key) = (a.to_lowercase(), b.to_lowercase());
    if a_key.starts_with(&b_key) || b_key.starts_with(&a_key) {
        return true;
    }
    fuzzy_compare(&a, &b, ALBUM_TRACK_FUZZY_THRESHOLD)
}

// ============================================================================
// Fuzzy Fallback
// ============================================================================

pub fn fuzzy_same_artist_and_title(candidate: &Track, source: &Track) -> bool {
    if fuzzy_same_title(candidate, source)
        && (same_artist(candidate, source, true) || same_artist(candidate, source, false))
    {
        return true;
    }
    fuzzy_compare(
        &artist_and_title_key(candidate),
        &artist_and_title_key(source),
        FUZZY_THRESHOLD,
    )
}

pub fn fuzzy_same_title(candidate: &Track, source: &Track) -> bool {
    let title = normalize(&source.title, true).to_lowercase();
    let candidate_title = normalize(&candidate.title, true).to_lowercase();
    fuzzy_compare(&title, &candidate_title, FUZZY_THRESHOLD)
}

/// "artist-title", symbol-stripped and lower-cased.
fn artist_and_title_key(track: &Track) -> String {
    let artist = normalize(track.primary_artist().unwrap_or_default(), true);
    let title = normalize(&track.title, true);
    format!("{}-{}", artist, title).to_lowercase()
}
