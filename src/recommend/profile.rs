//! Taste profile gathering: an 8-way concurrent fan-out over the streaming
//! catalog and the local library, followed by a pure merge step.

use super::models::{ArtistEntry, RecentEntry, TasteProfile, TrackEntry};
use super::RecommendError;
use crate::library_store::{HourEntry, LibraryStore, RatedEntry, ShelfEntry};
use crate::streaming::{ArtistRef, PlayEvent, StreamingApi, StreamingError, TimeRange, TopArtist, TopTrack};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::warn;

const SHORT_WINDOW_ARTIST_LIMIT: usize = 20;
const MEDIUM_WINDOW_ARTIST_LIMIT: usize = 30;
const TOP_TRACK_LIMIT: usize = 20;
const HIGH_RATING_MIN_SCORE: u8 = 8;
const HIGHLY_RATED_LIMIT: usize = 30;
const ON_ROTATION_LIMIT: usize = 20;
const LISTENING_HOUR_LIMIT: usize = 3;
const RECENT_PLAY_LIMIT: usize = 20;
const TOP_GENRE_LIMIT: usize = 10;

/// Collects a listener's taste profile from the streaming catalog and the
/// local library.
///
/// All eight fetches run concurrently and the gather waits for every one of
/// them; a failing fetch never cancels its siblings. Losing some streaming
/// signals or any library query degrades the profile, losing all four
/// streaming signals fails the gather.
pub struct ProfileGatherer {
    streaming: Arc<dyn StreamingApi>,
    library: Arc<dyn LibraryStore>,
}

impl ProfileGatherer {
    pub fn new(streaming: Arc<dyn StreamingApi>, library: Arc<dyn LibraryStore>) -> Self {
        Self { streaming, library }
    }

    pub async fn gather(
        &self,
        user_id: i64,
        access_token: &str,
    ) -> Result<TasteProfile, RecommendError> {
        // Library reads are blocking rusqlite calls; hand them to the
        // blocking pool so they overlap the network fetches.
        let highly_rated_task = {
            let library = Arc::clone(&self.library);
            tokio::task::spawn_blocking(move || {
                library.highly_rated(user_id, HIGH_RATING_MIN_SCORE, HIGHLY_RATED_LIMIT)
            })
        };
        let on_rotation_task = {
            let library = Arc::clone(&self.library);
            tokio::task::spawn_blocking(move || library.on_rotation(user_id, ON_ROTATION_LIMIT))
        };
        let tags_task = {
            let library = Arc::clone(&self.library);
            tokio::task::spawn_blocking(move || library.tag_names(user_id))
        };
        let hours_task = {
            let library = Arc::clone(&self.library);
            tokio::task::spawn_blocking(move || {
                library.listening_hours(user_id, LISTENING_HOUR_LIMIT)
            })
        };

        let (
            short_artists,
            medium_artists,
            top_tracks,
            recent_plays,
            highly_rated,
            on_rotation,
            user_tags,
            listening_hours,
        ) = tokio::join!(
            self.streaming
                .top_artists(access_token, TimeRange::Short, SHORT_WINDOW_ARTIST_LIMIT),
            self.streaming
                .top_artists(access_token, TimeRange::Medium, MEDIUM_WINDOW_ARTIST_LIMIT),
            self.streaming
                .top_tracks(access_token, TimeRange::Medium, TOP_TRACK_LIMIT),
            self.streaming.recently_played(access_token),
            highly_rated_task,
            on_rotation_task,
            tags_task,
            hours_task,
        );

        let mut streaming_failures = 0;
        let short_artists =
            streaming_or_none("short-window top artists", short_artists, &mut streaming_failures);
        let medium_artists = streaming_or_none(
            "medium-window top artists",
            medium_artists,
            &mut streaming_failures,
        );
        let top_tracks = streaming_or_none("top tracks", top_tracks, &mut streaming_failures);
        let recent_plays =
            streaming_or_none("recently played", recent_plays, &mut streaming_failures);

        if streaming_failures == 4 {
            return Err(RecommendError::NoListeningSignal);
        }

        let highly_rated = library_or_default("highly rated", highly_rated);
        let on_rotation = library_or_default("on rotation", on_rotation);
        let user_tags = library_or_default("tags", user_tags);
        let listening_hours = library_or_default("listening hours", listening_hours);

        Ok(merge_profile(
            short_artists,
            medium_artists,
            top_tracks,
            recent_plays,
            highly_rated,
            on_rotation,
            user_tags,
            listening_hours,
        ))
    }
}

fn streaming_or_none<T>(
    source: &str,
    result: Result<T, StreamingError>,
    failures: &mut u32,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(source, error = %err, "gather: streaming fetch failed");
            *failures += 1;
            None
        }
    }
}

fn library_or_default<T: Default>(
    source: &str,
    joined: Result<anyhow::Result<T>, JoinError>,
) -> T {
    match joined {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            warn!(source, error = %err, "gather: library query failed, leaving field empty");
            T::default()
        }
        Err(err) => {
            warn!(source, error = %err, "gather: library task panicked, leaving field empty");
            T::default()
        }
    }
}

/// Merges the raw fetch results into a taste profile.
///
/// Pure and order-preserving: identical inputs always produce an identical
/// profile.
#[allow(clippy::too_many_arguments)]
fn merge_profile(
    short_artists: Option<Vec<TopArtist>>,
    medium_artists: Option<Vec<TopArtist>>,
    top_tracks: Option<Vec<TopTrack>>,
    recent_plays: Option<Vec<PlayEvent>>,
    highly_rated: Vec<RatedEntry>,
    on_rotation: Vec<ShelfEntry>,
    user_tags: Vec<String>,
    listening_hours: Vec<HourEntry>,
) -> TasteProfile {
    // Short-window artists first in service order, then medium-window
    // artists not already present.
    let mut seen_artists = HashSet::new();
    let mut top_artists = Vec::new();
    for artist in short_artists
        .into_iter()
        .flatten()
        .chain(medium_artists.into_iter().flatten())
    {
        if seen_artists.insert(artist.name.clone()) {
            top_artists.push(ArtistEntry {
                name: artist.name,
                genres: artist.genres,
                play_count: 0,
            });
        }
    }

    // Genre frequency across the merged artist list; the stable sort keeps
    // first-seen order among equal counts.
    let mut genre_order = Vec::new();
    let mut genre_counts: HashMap<&str, u32> = HashMap::new();
    for artist in &top_artists {
        for genre in &artist.genres {
            let count = genre_counts.entry(genre.as_str()).or_insert(0);
            if *count == 0 {
                genre_order.push(genre.clone());
            }
            *count += 1;
        }
    }
    let mut ranked: Vec<(String, u32)> = genre_order
        .into_iter()
        .map(|genre| {
            let count = genre_counts[genre.as_str()];
            (genre, count)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_genres = ranked
        .into_iter()
        .take(TOP_GENRE_LIMIT)
        .map(|(genre, _)| genre)
        .collect();

    let top_tracks = top_tracks
        .unwrap_or_default()
        .into_iter()
        .map(|track| TrackEntry {
            name: track.name,
            artist: join_artist_credits(&track.artists),
        })
        .collect();

    let mut seen_tracks = HashSet::new();
    let mut recent = Vec::new();
    for event in recent_plays.unwrap_or_default() {
        if !seen_tracks.insert(event.track.id.clone()) {
            continue;
        }
        recent.push(RecentEntry {
            name: event.track.name,
            artist: join_artist_credits(&event.track.artists),
        });
        if recent.len() >= RECENT_PLAY_LIMIT {
            break;
        }
    }

    TasteProfile {
        top_artists,
        top_tracks,
        recent_plays: recent,
        highly_rated,
        on_rotation,
        user_tags,
        top_genres,
        listening_hours,
    }
}

fn join_artist_credits(artists: &[ArtistRef]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library_store::{EntityKind, ShelfStatus};
    use crate::streaming::{SearchHit, SearchKind};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    fn artist(name: &str, genres: &[&str]) -> TopArtist {
        TopArtist {
            id: name.to_lowercase(),
            name: name.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn play(track_id: &str, name: &str, artist_name: &str) -> PlayEvent {
        PlayEvent {
            track: TopTrack {
                id: track_id.to_string(),
                name: name.to_string(),
                artists: vec![ArtistRef {
                    name: artist_name.to_string(),
                }],
            },
            played_at: "2026-03-01T22:00:00Z".to_string(),
        }
    }

    #[test]
    fn artists_merge_short_window_first_with_dedup() {
        let profile = merge_profile(
            Some(vec![artist("A", &[]), artist("B", &[])]),
            Some(vec![artist("B", &[]), artist("C", &[])]),
            None,
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let names: Vec<&str> = profile.top_artists.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn genre_ranking_counts_and_breaks_ties_by_first_seen() {
        let profile = merge_profile(
            Some(vec![
                artist("A", &["jazz", "blues"]),
                artist("B", &["jazz"]),
                artist("C", &["rock"]),
            ]),
            None,
            None,
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(profile.top_genres, vec!["jazz", "blues", "rock"]);
    }

    #[test]
    fn genre_ranking_caps_at_ten() {
        let genres: Vec<String> = (0..15).map(|i| format!("genre-{:02}", i)).collect();
        let genre_refs: Vec<&str> = genres.iter().map(|g| g.as_str()).collect();
        let profile = merge_profile(
            Some(vec![artist("A", &genre_refs)]),
            None,
            None,
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(profile.top_genres.len(), 10);
        assert_eq!(profile.top_genres[0], "genre-00");
    }

    #[test]
    fn recent_plays_dedup_by_track_id_first_seen() {
        let profile = merge_profile(
            None,
            None,
            None,
            Some(vec![
                play("t1", "T1", "X"),
                play("t1", "T1", "X"),
                play("t2", "T2", "Y"),
                play("t1", "T1", "X"),
            ]),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let names: Vec<&str> = profile.recent_plays.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["T1", "T2"]);
    }

    #[test]
    fn recent_plays_cap_at_twenty() {
        let events: Vec<PlayEvent> = (0..30)
            .map(|i| play(&format!("t{}", i), &format!("T{}", i), "X"))
            .collect();
        let profile = merge_profile(
            None,
            None,
            None,
            Some(events),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(profile.recent_plays.len(), 20);
    }

    #[test]
    fn track_artist_credits_are_comma_joined() {
        let track = TopTrack {
            id: "t1".to_string(),
            name: "Duet".to_string(),
            artists: vec![
                ArtistRef {
                    name: "First".to_string(),
                },
                ArtistRef {
                    name: "Second".to_string(),
                },
            ],
        };
        let profile = merge_profile(
            None,
            None,
            Some(vec![track]),
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(profile.top_tracks[0].artist, "First, Second");
    }

    #[test]
    fn merge_is_idempotent() {
        let short = Some(vec![artist("A", &["jazz", "blues"]), artist("B", &["jazz"])]);
        let medium = Some(vec![artist("C", &["rock"]), artist("A", &["jazz"])]);
        let recent = Some(vec![play("t1", "T1", "X"), play("t2", "T2", "Y")]);

        let first = merge_profile(
            short.clone(),
            medium.clone(),
            None,
            recent.clone(),
            Vec::new(),
            Vec::new(),
            vec!["tag".to_string()],
            Vec::new(),
        );
        let second = merge_profile(
            short,
            medium,
            None,
            recent,
            Vec::new(),
            Vec::new(),
            vec!["tag".to_string()],
            Vec::new(),
        );
        assert_eq!(first, second);
    }

    // =========================================================================
    // Gather-level tests
    // =========================================================================

    /// Streaming stub where each of the four feeds can be told to fail.
    struct StubStreaming {
        fail_short: bool,
        fail_medium: bool,
        fail_tracks: bool,
        fail_recent: bool,
    }

    impl StubStreaming {
        fn failing(fail_short: bool, fail_medium: bool, fail_tracks: bool, fail_recent: bool) -> Self {
            Self {
                fail_short,
                fail_medium,
                fail_tracks,
                fail_recent,
            }
        }

        fn unavailable() -> StreamingError {
            StreamingError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }
        }
    }

    #[async_trait]
    impl StreamingApi for StubStreaming {
        async fn top_artists(
            &self,
            _access_token: &str,
            range: TimeRange,
            _limit: usize,
        ) -> Result<Vec<TopArtist>, StreamingError> {
            let fail = match range {
                TimeRange::Short => self.fail_short,
                _ => self.fail_medium,
            };
            if fail {
                return Err(Self::unavailable());
            }
            Ok(vec![artist("A", &["jazz"])])
        }

        async fn top_tracks(
            &self,
            _access_token: &str,
            _range: TimeRange,
            _limit: usize,
        ) -> Result<Vec<TopTrack>, StreamingError> {
            if self.fail_tracks {
                return Err(Self::unavailable());
            }
            Ok(vec![TopTrack {
                id: "t1".to_string(),
                name: "T1".to_string(),
                artists: vec![],
            }])
        }

        async fn recently_played(
            &self,
            _access_token: &str,
        ) -> Result<Vec<PlayEvent>, StreamingError> {
            if self.fail_recent {
                return Err(Self::unavailable());
            }
            Ok(vec![play("t1", "T1", "A")])
        }

        async fn search(
            &self,
            _access_token: &str,
            _query: &str,
            _kind: SearchKind,
            _limit: usize,
        ) -> Result<Vec<SearchHit>, StreamingError> {
            Ok(vec![])
        }
    }

    /// Library stub that can fail every read.
    struct StubLibrary {
        fail_reads: bool,
    }

    impl LibraryStore for StubLibrary {
        fn highly_rated(
            &self,
            _user_id: i64,
            _min_score: u8,
            _limit: usize,
        ) -> anyhow::Result<Vec<RatedEntry>> {
            if self.fail_reads {
                anyhow::bail!("library down");
            }
            Ok(vec![RatedEntry {
                kind: EntityKind::Track,
                name: "Rated".to_string(),
                artist: String::new(),
                score: 9,
            }])
        }

        fn on_rotation(&self, _user_id: i64, _limit: usize) -> anyhow::Result<Vec<ShelfEntry>> {
            if self.fail_reads {
                anyhow::bail!("library down");
            }
            Ok(Vec::new())
        }

        fn tag_names(&self, _user_id: i64) -> anyhow::Result<Vec<String>> {
            if self.fail_reads {
                anyhow::bail!("library down");
            }
            Ok(vec!["tag".to_string()])
        }

        fn listening_hours(&self, _user_id: i64, _limit: usize) -> anyhow::Result<Vec<HourEntry>> {
            if self.fail_reads {
                anyhow::bail!("library down");
            }
            Ok(Vec::new())
        }

        fn upsert_rating(
            &self,
            _user_id: i64,
            _kind: EntityKind,
            _entity_id: &str,
            _score: u8,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        fn set_shelf_status(
            &self,
            _user_id: i64,
            _kind: EntityKind,
            _entity_id: &str,
            _status: ShelfStatus,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        fn add_tag(&self, _user_id: i64, _name: &str) -> anyhow::Result<()> {
            Ok(())
        }

        fn record_play(
            &self,
            _user_id: i64,
            _track_id: &str,
            _played_at: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        fn upsert_entity_metadata(
            &self,
            _kind: EntityKind,
            _entity_id: &str,
            _name: Option<&str>,
            _extra_json: Option<&str>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn gather_tolerates_partial_streaming_failure() {
        let gatherer = ProfileGatherer::new(
            Arc::new(StubStreaming::failing(true, true, true, false)),
            Arc::new(StubLibrary { fail_reads: false }),
        );
        let profile = gatherer.gather(1, "token").await.unwrap();
        assert!(profile.top_artists.is_empty());
        assert_eq!(profile.recent_plays.len(), 1);
        assert_eq!(profile.highly_rated.len(), 1);
    }

    #[tokio::test]
    async fn gather_fails_when_all_streaming_sources_fail() {
        let gatherer = ProfileGatherer::new(
            Arc::new(StubStreaming::failing(true, true, true, true)),
            Arc::new(StubLibrary { fail_reads: false }),
        );
        let result = gatherer.gather(1, "token").await;
        assert!(matches!(result, Err(RecommendError::NoListeningSignal)));
    }

    #[tokio::test]
    async fn library_failures_leave_fields_empty() {
        let gatherer = ProfileGatherer::new(
            Arc::new(StubStreaming::failing(false, false, false, false)),
            Arc::new(StubLibrary { fail_reads: true }),
        );
        let profile = gatherer.gather(1, "token").await.unwrap();
        assert!(!profile.top_artists.is_empty());
        assert!(profile.highly_rated.is_empty());
        assert!(profile.user_tags.is_empty());
    }
}
