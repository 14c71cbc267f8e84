//! Match cascade and best-match selection.
//!
//! Given a source track and candidates from another service, the cascade:
//! 1. Externally supplied ISRCs
//! 2. Unique identifiers (src, ISRC, recording/track MBID)
//! 3. Strict title + strict artist
//! 4. Strict title + loose artist, then loose title + loose artist (non-strict only)
//! 5. Album, then album + track position narrowing
//!
//! Narrowing stages never throw away a non-empty set: if a predicate matches
//! nothing, the stage keeps its input. Candidate order is preserved throughout,
//! so the caller's ranking is the final tie-break.

use rustc_hash::FxHashSet;

use crate::compare::{same_album, same_album_position, same_identity, same_track};
use crate::models::{MatchOutcome, MatchStage, Track};
use crate::services::is_from_service;
use crate::settings::LookupSettings;

/// Keep the elements matching `predicate`, unless that would leave nothing.
pub fn narrow_if_non_empty<'a, F>(tracks: Vec<&'a Track>, predicate: F) -> Vec<&'a Track>
where
    F: Fn(&Track) -> bool,
{
    let narrowed: Vec<&'a Track> = tracks.iter().copied().filter(|t| predicate(t)).collect();
    if narrowed.is_empty() {
        tracks
    } else {
        narrowed
    }
}

fn filter<'a, F>(candidates: &[&'a Track], predicate: F) -> Vec<&'a Track>
where
    F: Fn(&Track) -> bool,
{
    candidates.iter().copied().filter(|t| predicate(t)).collect()
}

/// All plausible matches for `source`, in candidate order.
pub fn find_matches<'a, I>(candidates: I, source: &Track, isrcs: &[String], strict: bool) -> Vec<&'a Track>
where
    I: IntoIterator<Item = &'a Track>,
{
    find_matches_with_stage(candidates, source, isrcs, strict).0
}

/// `find_matches`, also reporting which cascade stage produced the set.
pub fn find_matches_with_stage<'a, I>(
    candidates: I,
    source: &Track,
    isrcs: &[String],
    strict: bool,
) -> (Vec<&'a Track>, MatchStage)
where
    I: IntoIterator<Item = &'a Track>,
{
    let candidates: Vec<&'a Track> = candidates.into_iter().collect();
    let candidates = candidates.as_slice();
    let mut stage = MatchStage::ExternalIsrc;
    let mut matches: Vec<&'a Track> = Vec::new();

    if !isrcs.is_empty() {
        let isrcs: FxHashSet<&str> = isrcs.iter().map(String::as_str).collect();
        matches = filter(candidates, |t| t.isrc().is_some_and(|isrc| isrcs.contains(isrc)));
    }

    if matches.is_empty() {
        stage = MatchStage::Identity;
        matches = filter(candidates, |t| same_identity(t, source));
    } else {
        matches = narrow_if_non_empty(matches, |t| same_identity(t, source));
    }

    let mut fallbacks = vec![(MatchStage::Strict, true, true)];
    if !strict {
        fallbacks.push((MatchStage::StrictTitleLooseArtist, true, false));
        fallbacks.push((MatchStage::Loose, false, false));
    }
    for (fallback_stage, strict_title, strict_artist) in fallbacks {
        if !matches.is_empty() {
            break;
        }
        stage = fallback_stage;
        matches = filter(candidates, |t| same_track(t, source, strict_title, strict_artist));
    }

    if matches.is_empty() {
        return (matches, MatchStage::NoMatch);
    }

    matches = narrow_if_non_empty(matches, |t| same_album(t, source));
    matches = narrow_if_non_empty(matches, |t| same_album_position(t, source));

    (matches, stage)
}

/// The single most probable match for `source`, or None.
///
/// `candidates` is any ordered sequence of tracks (a slice, or a prefiltered
/// `Vec<&Track>`); the result borrows from it.
/// `isrcs` are ISRCs from an external lookup; `preferred_service_id`, when
/// set, favours candidates whose src is prefixed by `"{id}:"`. When it is
/// None, the preferred service from `settings` applies.
pub fn find_best_match<'a, I>(
    candidates: I,
    source: &Track,
    isrcs: &[String],
    preferred_service_id: Option<&str>,
    settings: &LookupSettings,
) -> Option<&'a Track>
where
    I: IntoIterator<Item = &'a Track>,
{
    resolve(candidates, source, isrcs, preferred_service_id, settings).track
}

/// `find_best_match`, also reporting the cascade stage.
pub fn resolve<'a, I>(
    candidates: I,
    source: &Track,
    isrcs: &[String],
    preferred_service_id: Option<&str>,
    settings: &LookupSettings,
) -> MatchOutcome<'a>
where
    I: IntoIterator<Item = &'a Track>,
{
    if source.primary_artist().is_none() || source.title.is_empty() {
        return MatchOutcome {
            track: None,
            stage: MatchStage::MissingFields,
        };
    }

    let (mut matches, stage) = find_matches_with_stage(candidates, source, isrcs, false);

    if settings.prefer_personal_media {
        matches = narrow_if_non_empty(matches, |t| settings.services.is_personal_media(&t.src));
    }
    let preferred_service_id = preferred_service_id
        .filter(|id| !id.is_empty())
        .or_else(|| settings.preferred_service_id());
    if let Some(service) = preferred_service_id {
        matches = narrow_if_non_empty(matches, |t| is_from_service(&t.src, service));
    }

    MatchOutcome {
        track: matches.first().copied(),
        stage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(src: &str, title: &str, artists: &[&str]) -> Track {
        Track::new(src, title, artists)
    }

    fn best<'a>(candidates: &'a [Track], source: &Track) -> Option<&'a Track> {
        find_best_match(candidates, source, &[], None, &LookupSettings::default())
    }

    fn srcs(tracks: &[&Track]) -> Vec<String> {
        tracks.iter().map(|t| t.src.clone()).collect()
    }

    #[test]
    fn test_narrow_if_non_empty() {
        let tracks = [track("a:1", "A", &["X"]), track("a:2", "B", &["X"])];
        let all: Vec<&Track> = tracks.iter().collect();
        let narrowed = narrow_if_non_empty(all.clone(), |t| t.title == "B");
        assert_eq!(srcs(&narrowed), vec!["a:2"]);
        let kept = narrow_if_non_empty(all.clone(), |t| t.title == "C");
        assert_eq!(srcs(&kept), vec!["a:1", "a:2"]);
        assert!(narrow_if_non_empty(Vec::new(), |_| true).is_empty());
    }

    #[test]
    fn test_adele_scenario() {
        let source = track("listenbrainz:listen:1", "Hello", &["Adele"]).with_album("25", 1);
        let candidates = vec![
            track("b:1", "Hello", &["Adele"]).with_album("25", 1),
            track("b:2", "Hello (Live)", &["Adele"]).with_album("Live25", 3),
        ];
        assert_eq!(best(&candidates, &source).map(|t| t.src.as_str()), Some("b:1"));
    }

    #[test]
    fn test_isrc_overrides_title_mismatch() {
        let source = track("a:1", "Hello", &["Adele"]).with_isrc("GBABC1234567");
        let candidates = vec![
            track("b:1", "Hello", &["Someone Else"]),
            track("b:2", "Completely Different", &["Nobody"]).with_isrc("GBABC1234567"),
            track("b:3", "Hello", &["Adele"]).with_isrc("USXYZ7654321"),
        ];
        assert_eq!(best(&candidates, &source).map(|t| t.src.as_str()), Some("b:2"));
        let (_, stage) = find_matches_with_stage(&candidates, &source, &[], false);
        assert_eq!(stage, MatchStage::Identity);
    }

    #[test]
    fn test_identity_short_circuit_on_src() {
        let source = track("jellyfin:audio:7", "Old Title", &["Old Artist"]);
        let candidates = vec![
            track("jellyfin:audio:6", "Old Title", &["Old Artist"]),
            track("jellyfin:audio:7", "New Title", &["New Artist"]),
        ];
        assert_eq!(
            best(&candidates, &source).map(|t| t.src.as_str()),
            Some("jellyfin:audio:7")
        );
    }

    #[test]
    fn test_external_isrcs() {
        let source = track("a:1", "Hello", &["Adele"]);
        let candidates = vec![
            track("b:1", "Hello", &["Adele"]),
            track("b:2", "Hello", &["Adele"]).with_isrc("GBBKS1500214"),
            track("b:3", "Hola", &["Adele"]).with_isrc("GBBKS1500215"),
        ];
        let isrcs = vec!["GBBKS1500214".to_string(), "GBBKS1500215".to_string()];
        let (matches, stage) = find_matches_with_stage(&candidates, &source, &isrcs, false);
        assert_eq!(stage, MatchStage::ExternalIsrc);
        // Identity matches none of them, so both ISRC hits survive
        assert_eq!(srcs(&matches), vec!["b:2", "b:3"]);
    }

    #[test]
    fn test_external_isrcs_narrowed_by_identity() {
        let source = track("a:1", "Hello", &["Adele"]).with_recording_mbid("rec-1");
        let candidates = vec![
            track("b:1", "Hello", &["Adele"]).with_isrc("I1"),
            track("b:2", "Hello", &["Adele"]).with_isrc("I1").with_recording_mbid("rec-1"),
        ];
        let matches = find_matches(&candidates, &source, &["I1".to_string()], false);
        assert_eq!(srcs(&matches), vec!["b:2"]);
    }

    #[test]
    fn test_unmatched_external_isrcs_fall_through() {
        let source = track("a:1", "Hello", &["Adele"]);
        let candidates = vec![track("b:1", "Hello", &["Adele"])];
        let (matches, stage) =
            find_matches_with_stage(&candidates, &source, &["NOPE".to_string()], false);
        assert_eq!(stage, MatchStage::Strict);
        assert_eq!(srcs(&matches), vec!["b:1"]);
    }

    #[test]
    fn test_missing_required_fields() {
        let candidates = vec![track("b:1", "", &[]), track("b:2", "Hello", &["Adele"])];
        let empty = track("a:1", "", &[]);
        assert!(best(&candidates, &empty).is_none());
        let no_artist = track("a:1", "Hello", &[]);
        assert!(best(&candidates, &no_artist).is_none());
        let no_title = track("a:1", "", &["Adele"]);
        assert!(best(&candidates, &no_title).is_none());
        let outcome = resolve(&candidates, &empty, &[], None, &LookupSettings::default());
        assert_eq!(outcome.stage, MatchStage::MissingFields);
    }

    #[test]
    fn test_empty_candidates() {
        let source = track("a:1", "Hello", &["Adele"]);
        let none: Vec<Track> = Vec::new();
        assert!(best(&none, &source).is_none());
        let (matches, stage) = find_matches_with_stage(&none, &source, &[], false);
        assert!(matches.is_empty());
        assert_eq!(stage, MatchStage::NoMatch);
    }

    #[test]
    fn test_nothing_matches_returns_none() {
        let source = track("a:1", "Hello", &["Adele"]);
        let candidates = vec![
            track("b:1", "Under Pressure", &["Queen"]),
            track("b:2", "Heroes", &["David Bowie"]),
        ];
        assert!(best(&candidates, &source).is_none());
    }

    #[test]
    fn test_featured_artist_title() {
        let source = track("a:1", "Song (feat. X)", &["Artist"]);
        let candidates = vec![
            track("b:1", "Other Song", &["Artist"]),
            track("b:2", "Song", &["Artist"]),
        ];
        assert_eq!(best(&candidates, &source).map(|t| t.src.as_str()), Some("b:2"));
        let (_, stage) = find_matches_with_stage(&candidates, &source, &[], false);
        assert_eq!(stage, MatchStage::Loose);
    }

    #[test]
    fn test_strict_mode_skips_loose_stages() {
        let source = track("a:1", "Song (feat. X)", &["Artist"]);
        let candidates = vec![track("b:1", "Song", &["Artist"])];
        assert!(find_matches(&candidates, &source, &[], true).is_empty());
        assert_eq!(find_matches(&candidates, &source, &[], false).len(), 1);
    }

    #[test]
    fn test_strict_title_loose_artist_stage() {
        let source = track("a:1", "Song", &["Drake feat. Rihanna"]);
        let candidates = vec![track("b:1", "Song", &["Drake"])];
        let (matches, stage) = find_matches_with_stage(&candidates, &source, &[], false);
        assert_eq!(stage, MatchStage::StrictTitleLooseArtist);
        assert_eq!(srcs(&matches), vec!["b:1"]);
    }

    #[test]
    fn test_exact_match_not_missed() {
        let source = track("a:1", "Wonderwall", &["Oasis"]).with_album("(What's the Story) Morning Glory?", 3);
        let candidates = vec![
            track("b:1", "Wonderwall", &["Oasis"]).with_album("Stop the Clocks", 5),
            track("b:2", "Wonderwall (Live)", &["Oasis"]).with_album("Familiar to Millions", 4),
            track("b:3", "Wonderwall", &["Oasis"]).with_album("(What's the Story) Morning Glory?", 3),
            track("b:4", "Wonderwall", &["Oasis"]).with_album("(What's the Story) Morning Glory?", 3),
        ];
        let found = best(&candidates, &source).unwrap();
        assert_eq!(found.title, source.title);
        assert_eq!(found.artists[0], source.artists[0]);
        assert_eq!(found.album, source.album);
        assert_eq!(found.track, source.track);
        assert_eq!(found.src, "b:3");
    }

    #[test]
    fn test_album_narrowing_keeps_order() {
        let source = track("a:1", "Song", &["Artist"]).with_album("Album", 2);
        let candidates = vec![
            track("b:1", "Song", &["Artist"]).with_album("Other", 2),
            track("b:2", "Song", &["Artist"]).with_album("Album", 7),
            track("b:3", "Song", &["Artist"]).with_album("album", 9),
        ];
        // Album matches, no position match: album narrowing survives alone
        let matches = find_matches(&candidates, &source, &[], false);
        assert_eq!(srcs(&matches), vec!["b:2", "b:3"]);
    }

    #[test]
    fn test_album_narrowing_never_empties() {
        let source = track("a:1", "Song", &["Artist"]).with_album("Album", 2);
        let candidates = vec![
            track("b:1", "Song", &["Artist"]).with_album("Other", 2),
            track("b:2", "Song", &["Artist"]),
        ];
        let matches = find_matches(&candidates, &source, &[], false);
        assert_eq!(srcs(&matches), vec!["b:1", "b:2"]);
    }

    #[test]
    fn test_preferred_service() {
        let source = track("lastfm:track:1", "Song", &["Artist"]);
        let candidates = vec![
            track("navidrome:song:1", "Song", &["Artist"]),
            track("jellyfin:audio:1", "Song", &["Artist"]),
        ];
        let settings = LookupSettings::default();
        let found = find_best_match(&candidates, &source, &[], Some("jellyfin"), &settings);
        assert_eq!(found.map(|t| t.src.as_str()), Some("jellyfin:audio:1"));

        // Unknown preferred service: order decides
        let found = find_best_match(&candidates, &source, &[], Some("plex"), &settings);
        assert_eq!(found.map(|t| t.src.as_str()), Some("navidrome:song:1"));
    }

    #[test]
    fn test_preferred_service_from_settings() {
        let source = track("lastfm:track:1", "Song", &["Artist"]);
        let candidates = vec![
            track("navidrome:song:1", "Song", &["Artist"]),
            track("jellyfin:audio:1", "Song", &["Artist"]),
        ];
        let settings = LookupSettings {
            preferred_service_id: Some("jellyfin".to_string()),
            ..LookupSettings::default()
        };
        let found = find_best_match(&candidates, &source, &[], None, &settings);
        assert_eq!(found.map(|t| t.src.as_str()), Some("jellyfin:audio:1"));

        // An explicit argument wins over settings
        let found = find_best_match(&candidates, &source, &[], Some("navidrome"), &settings);
        assert_eq!(found.map(|t| t.src.as_str()), Some("navidrome:song:1"));
    }

    #[test]
    fn test_prefer_personal_media() {
        let source = track("lastfm:track:1", "Song", &["Artist"]);
        let candidates = vec![
            track("spotify:track:1", "Song", &["Artist"]),
            track("navidrome:song:1", "Song", &["Artist"]),
        ];
        let mut settings = LookupSettings::default();
        assert_eq!(
            find_best_match(&candidates, &source, &[], None, &settings).map(|t| t.src.as_str()),
            Some("spotify:track:1")
        );
        settings.prefer_personal_media = true;
        assert_eq!(
            find_best_match(&candidates, &source, &[], None, &settings).map(|t| t.src.as_str()),
            Some("navidrome:song:1")
        );
    }

    #[test]
    fn test_preferences_never_empty() {
        let source = track("lastfm:track:1", "Song", &["Artist"]);
        let candidates = vec![track("spotify:track:1", "Song", &["Artist"])];
        let settings = LookupSettings {
            prefer_personal_media: true,
            ..LookupSettings::default()
        };
        let found = find_best_match(&candidates, &source, &[], Some("jellyfin"), &settings);
        assert_eq!(found.map(|t| t.src.as_str()), Some("spotify:track:1"));
    }

    #[test]
    fn test_does_not_mutate_inputs() {
        let source = track("a:1", "Hello", &["Adele"]).with_album("25", 1);
        let candidates = vec![track("b:1", "Hello", &["Adele"]).with_album("25", 1)];
        let (source_before, candidates_before) = (source.clone(), candidates.clone());
        let found = best(&candidates, &source).unwrap();
        assert!(std::ptr::eq(found, &candidates[0]));
        assert_eq!(source, source_before);
        assert_eq!(candidates, candidates_before);
    }
}
