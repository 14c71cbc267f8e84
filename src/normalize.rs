//! Shared normalization functions for cross-service track matching.
//! Every comparator in `compare` goes through these helpers, so a change here
//! shifts match results everywhere. Run tests after changes.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Featured artist suffix: " (feat. X)", " [with X]", " ft. X", " featuring X".
/// Everything from the marker to the end of the string is removed.
pub static FEATURED_ARTISTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\s\[({](?:with\s|featuring\s|feat[\s.]+|ft[\s.]+).+$").unwrap()
});

/// Suffixes that differ between releases of the same recording.
pub static TRACK_TITLE_SUFFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Remaster tags: "Disorder (2007 Remaster)", "(2011 Digital Remaster)"
        Regex::new(r"(?i)\s*\((?:19|20)\d\d(?:\sDigital)?\sRemaster\)$").unwrap(),
        // Album/single version: "Disorder (Single Version)", "(Album)"
        Regex::new(r"(?i)\s*\((?:Album|Single)(?:\s+Version)?\)$").unwrap(),
        // Dash form: "Disorder - Single Version"
        Regex::new(r"(?i)\s*-\s*(?:Album|Single)(?:\s+Version)?$").unwrap(),
    ]
});

/// Multi-artist separators: , ; & | / × and a standalone "x" ("DJ Snake x Lil Jon").
pub static ARTIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[xX]\s+|\s*[,;&|/×]\s*").unwrap());

/// Bracketed aside in a name: "Prince (Symbol)", "Band [Member]", "X {Y}"
pub static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]+)\)|\[([^\[\]]+)\]|\{([^{}]+)\}").unwrap());

/// Anything that is not an ASCII letter, digit or whitespace
pub static SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s]").unwrap());

/// Runs of whitespace (collapsed to a single space)
pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// Strip diacritics via NFKD decomposition, keeping the base letters.
/// e.g., "Beyoncé" → "Beyonce", "Motörhead" → "Motorhead"
pub fn strip_accents(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Fold Unicode text to ASCII, preserving case.
/// Diacritics are stripped first, then any remaining non-ASCII
/// (Cyrillic, Hebrew, CJK, etc.) is transliterated.
pub fn fold_to_ascii(s: &str) -> String {
    any_ascii(&strip_accents(s))
}

/// Comparison key for case/accent-insensitive equality.
fn comparison_key(s: &str) -> String {
    strip_accents(s).to_lowercase()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize text for comparison.
///
/// Transliterates to ASCII, optionally strips symbols, then collapses
/// whitespace and trims. Idempotent for both values of `remove_symbols`.
pub fn normalize(text: &str, remove_symbols: bool) -> String {
    let mut result = fold_to_ascii(text);
    if remove_symbols {
        // Before collapsing, so "a - b" ends up as "a b"
        result = SYMBOLS.replace_all(&result, "").into_owned();
    }
    WHITESPACE.replace_all(&result, " ").trim().to_string()
}

/// Case and accent insensitive string equality.
pub fn compare_string(a: &str, b: &str) -> bool {
    a == b || comparison_key(a) == comparison_key(b)
}

/// Case and accent insensitive substring test.
pub fn string_includes(haystack: &str, needle: &str) -> bool {
    comparison_key(haystack).contains(&comparison_key(needle))
}

pub fn has_featured_artists(title: &str) -> bool {
    FEATURED_ARTISTS.is_match(title)
}

/// Remove a featured-artist suffix.
/// e.g., "Song (feat. X)" → "Song", "Song ft. X & Y" → "Song"
pub fn remove_featured_artists(title: &str) -> String {
    FEATURED_ARTISTS.replace(title, "").into_owned()
}

/// Remove remaster and album/single version suffixes.
/// e.g., "Disorder (2007 Remaster)" → "Disorder", "Disorder - Single Version" → "Disorder"
pub fn trim_track_title(title: &str) -> String {
    let mut result = title.to_string();
    for pattern in TRACK_TITLE_SUFFIXES.iter() {
        result = pattern.replace_all(&result, "").into_owned();
    }
    result
}

/// Rebuild a title with its featured artists appended, the way streaming
/// services tend to write it: "Title (feat. A, B & C)".
/// Returns None when there is nobody to feature.
pub fn title_with_featured_artists(title: &str, featured: &[String]) -> Option<String> {
    match featured {
        [] => None,
        [only] => Some(format!("{} (feat. {})", title, only)),
        [rest @ .., last] => Some(format!("{} (feat. {} & {})", title, rest.join(", "), last)),
    }
}

/// Split a list of artist credits into individual names.
/// e.g., ["Artist1 & Artist2", "Artist3"] → ["Artist1", "Artist2", "Artist3"]
pub fn split_artists(artists: &[String]) -> Vec<String> {
    artists
        .iter()
        .flat_map(|credit| ARTIST_SEPARATOR.split(credit))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text inside each bracket pair, trimmed.
/// e.g., "Prince (Symbol) [Live]" → ["Symbol", "Live"]
pub fn bracketed_names(text: &str) -> Vec<String> {
    BRACKETED
        .captures_iter(text)
        .filter_map(|caps| caps.iter().skip(1).flatten().next())
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
