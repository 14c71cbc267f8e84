//! Candidate libraries: loading tracks from JSON or SQLite exports, and a
//! prefilter index so a batch run does not compare every request against
//! every library track.

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, Row};
use rustc_hash::FxHashMap;
use std::path::Path;

use crate::models::{LookupRequest, Track};
use crate::normalize::{
    bracketed_names, normalize, remove_featured_artists, split_artists, trim_track_title,
};
use crate::progress::{create_progress_bar, log_progress};

// ============================================================================
// Loading
// ============================================================================

fn is_sqlite_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("sqlite" | "sqlite3" | "db")
    )
}

/// Load a candidate library. `.sqlite`, `.sqlite3` and `.db` files are read
/// from their `tracks` table; anything else is parsed as a JSON array of tracks.
pub fn load_tracks(path: &Path) -> Result<Vec<Track>> {
    if is_sqlite_path(path) {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open library database {}", path.display()))?;
        read_tracks(&conn)
    } else {
        load_json(path)
    }
}

/// Load lookup requests: a JSON array of tracks, each with optional `isrcs`.
pub fn load_requests(path: &Path) -> Result<Vec<LookupRequest>> {
    load_json(path)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

const SELECT_TRACKS: &str = "SELECT src, title, artists, album, album_artist, year, track, duration,
        isrc, recording_mbid, track_mbid, release_mbid
 FROM tracks
 ORDER BY rowid";

/// Read every row of the `tracks` table, in rowid order (the library's ranking).
pub fn read_tracks(conn: &Connection) -> Result<Vec<Track>> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))
        .context("Library database has no readable tracks table")?;

    let pb = create_progress_bar(count as u64, "Reading library");

    let mut stmt = conn.prepare(SELECT_TRACKS)?;
    let mut rows = stmt.query([])?;
    let mut tracks = Vec::with_capacity(count as usize);

    while let Some(row) = rows.next()? {
        tracks.push(track_from_row(row)?);
        pb.inc(1);
        log_progress("READ", tracks.len() as u64, count as u64, 100_000);
    }

    pb.finish_with_message(format!("Read {} library tracks", tracks.len()));
    Ok(tracks)
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    let artists: Option<String> = row.get(2)?;
    let year: Option<i64> = row.get(5)?;
    let track: Option<i64> = row.get(6)?;
    Ok(Track {
        src: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        artists: artists.as_deref().map(parse_artists).unwrap_or_default(),
        album: row.get(3)?,
        album_artist: row.get(4)?,
        year: year.and_then(|y| u32::try_from(y).ok()),
        track: track.and_then(|t| u32::try_from(t).ok()),
        duration: row.get(7)?,
        isrc: row.get(8)?,
        recording_mbid: row.get(9)?,
        track_mbid: row.get(10)?,
        release_mbid: row.get(11)?,
    })
}

/// Artists column: a JSON array (`["A", "B"]`) or a single plain name.
pub fn parse_artists(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(artists) = serde_json::from_str::<Vec<String>>(raw) {
            return artists;
        }
    }
    if raw.is_empty() {
        Vec::new()
    } else {
        vec![raw.to_string()]
    }
}

// ============================================================================
// Index
// ============================================================================

/// Title key: featured artists and version suffixes removed, symbols
/// stripped, lower-cased.
pub fn title_key(title: &str) -> String {
    normalize(&remove_featured_artists(&trim_track_title(title)), true).to_lowercase()
}

/// Artist key: featured artists removed, symbols stripped, lower-cased.
pub fn artist_key(artist: &str) -> String {
    normalize(&remove_featured_artists(artist), true).to_lowercase()
}

/// Album key: symbols kept, lower-cased. Equal keys mean equal albums.
pub fn album_key(album: &str) -> String {
    normalize(album, false).to_lowercase()
}

/// Every artist key a track can be found under: each split credit, the
/// primary artist and the names bracketed inside it, and the album artist.
fn artist_keys(track: &Track) -> Vec<String> {
    let mut keys: Vec<String> = split_artists(&track.artists).iter().map(|a| artist_key(a)).collect();
    if let Some(primary) = track.primary_artist() {
        keys.push(artist_key(primary));
        keys.extend(bracketed_names(primary).iter().map(|name| artist_key(name)));
    }
    if let Some(album_artist) = track.album_artist() {
        keys.push(artist_key(album_artist));
    }
    keys.retain(|k| !k.is_empty());
    keys.sort_unstable();
    keys.dedup();
    keys
}

fn id_keys(track: &Track) -> Vec<String> {
    let mut keys = Vec::with_capacity(4);
    if !track.src.is_empty() {
        keys.push(format!("src:{}", track.src));
    }
    if let Some(isrc) = track.isrc() {
        keys.push(format!("isrc:{}", isrc));
    }
    if let Some(mbid) = track.recording_mbid() {
        keys.push(format!("recording:{}", mbid));
    }
    if let Some(mbid) = track.track_mbid() {
        keys.push(format!("track:{}", mbid));
    }
    keys
}

/// Album position keys: album name or release MBID, each with the track
/// position. Tracks without a position have none.
fn album_position_keys(track: &Track) -> Vec<String> {
    let (Some(album), Some(position)) = (track.album(), track.track) else {
        return Vec::new();
    };
    let mut keys = vec![format!("album:{}#{}", album_key(album), position)];
    if let Some(mbid) = track.release_mbid() {
        keys.push(format!("release:{}#{}", mbid, position));
    }
    keys
}

/// Prefilter over a library.
///
/// Returns every track sharing an identifier, a title key, an artist key or
/// an album position with the request, in library order. Every comparator
/// except the combined "artist-title" fuzzy key leaves one of these in
/// common, so that fuzzy key is the only path the prefilter can miss.
pub struct LibraryIndex {
    tracks: Vec<Track>,
    by_id: FxHashMap<String, Vec<usize>>,
    by_title: FxHashMap<String, Vec<usize>>,
    by_artist: FxHashMap<String, Vec<usize>>,
    by_album_position: FxHashMap<String, Vec<usize>>,
}

impl LibraryIndex {
    pub fn new(tracks: Vec<Track>) -> Self {
        let mut by_id: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut by_title: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut by_artist: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut by_album_position: FxHashMap<String, Vec<usize>> = FxHashMap::default();

        for (idx, track) in tracks.iter().enumerate() {
            for key in id_keys(track) {
                by_id.entry(key).or_default().push(idx);
            }
            let title = title_key(&track.title);
            if !title.is_empty() {
                by_title.entry(title).or_default().push(idx);
            }
            for key in artist_keys(track) {
                by_artist.entry(key).or_default().push(idx);
            }
            for key in album_position_keys(track) {
                by_album_position.entry(key).or_default().push(idx);
            }
        }

        Self {
            tracks,
            by_id,
            by_title,
            by_artist,
            by_album_position,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Candidates worth running the matcher on for `source`.
    pub fn candidates(&self, source: &Track, isrcs: &[String]) -> Vec<&Track> {
        let mut positions: Vec<usize> = Vec::new();
        let mut collect = |map: &FxHashMap<String, Vec<usize>>, key: &str| {
            if let Some(found) = map.get(key) {
                positions.extend_from_slice(found);
            }
        };

        for key in id_keys(source) {
            collect(&self.by_id, &key);
        }
        for isrc in isrcs.iter().filter(|i| !i.is_empty()) {
            collect(&self.by_id, &format!("isrc:{}", isrc));
        }
        collect(&self.by_title, &title_key(&source.title));
        for key in artist_keys(source) {
            collect(&self.by_artist, &key);
        }
        for key in album_position_keys(source) {
            collect(&self.by_album_position, &key);
        }

        positions.sort_unstable();
        positions.dedup();
        positions.into_iter().map(|idx| &self.tracks[idx]).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
