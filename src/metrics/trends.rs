use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::db::models::{ArtistSnapshot, TimeRange, TrackSnapshot};

use super::{
    Era, duration_minutes, group_songs, mean, ols_slope, percent, release_year, song_age,
    unique_artists,
};

/// Slope below which an artist's rank is improving (rank number falling).
pub const IMPROVING_SLOPE: f64 = -1.0;
/// Slope above which an artist's rank is declining.
pub const DECLINING_SLOPE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct TopArtist {
    pub artist: String,
    pub total_tracks: i64,
    pub windows: usize,
    pub avg_rank: f64,
}

#[derive(Debug, Clone)]
pub struct Overview {
    pub total_entries: usize,
    /// Distinct track names.
    pub unique_songs: usize,
    pub unique_artists: usize,
    /// Top ten artists across windows by summed track count.
    pub top_artists: Vec<TopArtist>,
    /// Top five artists of each window by track count.
    pub per_window: Vec<(TimeRange, Vec<ArtistSnapshot>)>,
}

pub fn overview(tracks: &[TrackSnapshot], artists: &[ArtistSnapshot]) -> Overview {
    let mut by_artist: HashMap<&str, Vec<&ArtistSnapshot>> = HashMap::new();
    for a in artists {
        by_artist.entry(a.artist_name.as_str()).or_default().push(a);
    }
    let mut top_artists: Vec<TopArtist> = by_artist
        .into_iter()
        .map(|(artist, rows)| TopArtist {
            artist: artist.to_string(),
            total_tracks: rows.iter().map(|a| a.track_count).sum(),
            windows: rows.iter().map(|a| a.time_range).collect::<HashSet<_>>().len(),
            avg_rank: mean(&rows.iter().map(|a| a.avg_rank).collect::<Vec<_>>()).unwrap_or(0.0),
        })
        .collect();
    top_artists.sort_by(|a, b| b.total_tracks.cmp(&a.total_tracks).then_with(|| a.artist.cmp(&b.artist)));
    top_artists.truncate(10);

    let per_window = TimeRange::ALL
        .into_iter()
        .map(|range| {
            let mut rows: Vec<ArtistSnapshot> =
                artists.iter().filter(|a| a.time_range == range).cloned().collect();
            rows.sort_by(|a, b| {
                b.track_count
                    .cmp(&a.track_count)
                    .then_with(|| a.avg_rank.total_cmp(&b.avg_rank))
            });
            rows.truncate(5);
            (range, rows)
        })
        .collect();

    Overview {
        total_entries: tracks.len(),
        unique_songs: tracks.iter().map(|t| t.track_name.as_str()).collect::<HashSet<_>>().len(),
        unique_artists: unique_artists(tracks),
        top_artists,
        per_window,
    }
}

#[derive(Debug, Clone)]
pub struct SongSurvival {
    pub track_name: String,
    pub artist_name: String,
    /// Windows present, oldest first.
    pub windows: Vec<TimeRange>,
    pub avg_rank: f64,
    pub best_rank: i64,
    pub worst_rank: i64,
    /// `worst_rank - best_rank`
    pub consistency: i64,
    pub avg_popularity: f64,
}

/// Songs present in more than one window, longest-lived first then by mean rank.
pub fn song_survivors(tracks: &[TrackSnapshot]) -> Vec<SongSurvival> {
    let mut out: Vec<SongSurvival> = group_songs(tracks)
        .into_iter()
        .filter_map(|g| {
            let windows = g.windows();
            if windows.len() < 2 {
                return None;
            }
            let ranks: Vec<i64> = g.rows.iter().map(|t| t.rank_position).collect();
            let best_rank = *ranks.iter().min()?;
            let worst_rank = *ranks.iter().max()?;
            let pops: Vec<f64> = g.rows.iter().map(|t| t.popularity as f64).collect();
            Some(SongSurvival {
                track_name: g.track_name.to_string(),
                artist_name: g.artist_name.to_string(),
                windows,
                avg_rank: mean(&g.ranks())?,
                best_rank,
                worst_rank,
                consistency: worst_rank - best_rank,
                avg_popularity: mean(&pops)?,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.windows
            .len()
            .cmp(&a.windows.len())
            .then_with(|| a.avg_rank.total_cmp(&b.avg_rank))
    });
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope < IMPROVING_SLOPE {
            Self::Improving
        } else if slope > DECLINING_SLOPE {
            Self::Declining
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArtistTrend {
    pub artist: String,
    /// Regression slope of rank against window order (long=1, medium=2, short=3).
    pub slope: f64,
    pub windows: usize,
    pub avg_rank: f64,
    pub track_count: usize,
    pub direction: TrendDirection,
}

/// Rank trend of every artist present in at least two windows, steepest
/// improvement first. Every row of the artist is one regression point.
pub fn artist_trends(tracks: &[TrackSnapshot]) -> Vec<ArtistTrend> {
    let mut by_artist: HashMap<&str, Vec<&TrackSnapshot>> = HashMap::new();
    for t in tracks {
        by_artist.entry(t.artist_name.as_str()).or_default().push(t);
    }

    let mut out: Vec<ArtistTrend> = by_artist
        .into_iter()
        .filter_map(|(artist, rows)| {
            let windows = rows.iter().map(|t| t.time_range).collect::<HashSet<_>>().len();
            if windows < 2 {
                return None;
            }
            let x: Vec<f64> = rows.iter().map(|t| t.time_range.order() as f64).collect();
            let y: Vec<f64> = rows.iter().map(|t| t.rank_position as f64).collect();
            let slope = ols_slope(&x, &y)?;
            Some(ArtistTrend {
                artist: artist.to_string(),
                slope,
                windows,
                avg_rank: mean(&y)?,
                track_count: rows.len(),
                direction: TrendDirection::from_slope(slope),
            })
        })
        .collect();

    out.sort_by(|a, b| a.slope.total_cmp(&b.slope).then_with(|| a.artist.cmp(&b.artist)));
    out
}

/// Mean characteristics of a set of songs (each song averaged over its rows first).
#[derive(Debug, Clone)]
pub struct SongProfile {
    pub songs: usize,
    pub avg_popularity: f64,
    pub avg_duration_minutes: f64,
    pub avg_song_age: Option<f64>,
    pub avg_rank: f64,
}

#[derive(Debug, Clone)]
pub struct PersistenceAnalysis {
    pub unique_songs: usize,
    pub persistent_songs: usize,
    pub persistence_rate: f64,
    pub persistent: Option<SongProfile>,
    pub non_persistent: Option<SongProfile>,
}

pub fn persistence_analysis(tracks: &[TrackSnapshot], reference_year: i32) -> Option<PersistenceAnalysis> {
    struct SongMeans {
        persistent: bool,
        popularity: f64,
        duration: f64,
        age: Option<f64>,
        rank: f64,
    }

    let songs: Vec<SongMeans> = group_songs(tracks)
        .into_iter()
        .filter_map(|g| {
            let pops: Vec<f64> = g.rows.iter().map(|t| t.popularity as f64).collect();
            let durs: Vec<f64> = g.rows.iter().map(|t| duration_minutes(t)).collect();
            let ages: Vec<f64> = g.rows.iter().filter_map(|t| song_age(t, reference_year)).collect();
            Some(SongMeans {
                persistent: g.windows().len() > 1,
                popularity: mean(&pops)?,
                duration: mean(&durs)?,
                age: mean(&ages),
                rank: mean(&g.ranks())?,
            })
        })
        .collect();

    let profile = |persistent: bool| -> Option<SongProfile> {
        let side: Vec<&SongMeans> = songs.iter().filter(|s| s.persistent == persistent).collect();
        if side.is_empty() {
            return None;
        }
        let col = |f: fn(&SongMeans) -> f64| mean(&side.iter().map(|s| f(*s)).collect::<Vec<_>>());
        Some(SongProfile {
            songs: side.len(),
            avg_popularity: col(|s| s.popularity)?,
            avg_duration_minutes: col(|s| s.duration)?,
            avg_song_age: mean(&side.iter().filter_map(|s| s.age).collect::<Vec<_>>()),
            avg_rank: col(|s| s.rank)?,
        })
    };

    let persistent_songs = songs.iter().filter(|s| s.persistent).count();
    Some(PersistenceAnalysis {
        unique_songs: songs.len(),
        persistent_songs,
        persistence_rate: percent(persistent_songs, songs.len())?,
        persistent: profile(true),
        non_persistent: profile(false),
    })
}

#[derive(Debug, Clone)]
pub struct EraStats {
    pub era: Era,
    pub track_count: usize,
    pub avg_popularity: f64,
    pub avg_rank: f64,
    pub avg_duration_minutes: f64,
}

/// Per-era aggregates over rows with a known release year, most tracks first.
pub fn era_analysis(tracks: &[TrackSnapshot]) -> Vec<EraStats> {
    let mut by_era: HashMap<Era, Vec<&TrackSnapshot>> = HashMap::new();
    for t in tracks {
        if let Some(year) = release_year(t) {
            by_era.entry(Era::from_year(year)).or_default().push(t);
        }
    }

    let mut out: Vec<EraStats> = by_era
        .into_iter()
        .filter_map(|(era, rows)| {
            let col = |f: fn(&TrackSnapshot) -> f64| mean(&rows.iter().map(|t| f(*t)).collect::<Vec<_>>());
            Some(EraStats {
                era,
                track_count: rows.len(),
                avg_popularity: col(|t| t.popularity as f64)?,
                avg_rank: col(|t| t.rank_position as f64)?,
                avg_duration_minutes: col(duration_minutes)?,
            })
        })
        .collect();
    out.sort_by(|a, b| b.track_count.cmp(&a.track_count).then_with(|| a.era.cmp(&b.era)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::{artist, track};
    use crate::metrics::tests::song;

    #[test]
    fn test_trend_slope_improving() {
        let tracks = vec![
            track("a", "Old", "Rising", TimeRange::Long, 40, 50),
            track("b", "New", "Rising", TimeRange::Short, 10, 50),
        ];
        let trends = artist_trends(&tracks);
        assert_eq!(trends.len(), 1);
        assert!(trends[0].slope < 0.0);
        assert!((trends[0].slope + 15.0).abs() < 1e-9);
        assert_eq!(trends[0].direction, TrendDirection::Improving);
    }

    #[test]
    fn test_trend_needs_two_windows() {
        let tracks = vec![
            track("a", "A", "Solo", TimeRange::Short, 4, 50),
            track("b", "B", "Solo", TimeRange::Short, 30, 50),
        ];
        assert!(artist_trends(&tracks).is_empty());
    }

    #[test]
    fn test_trend_declining_and_stable() {
        let tracks = vec![
            track("a", "A", "Fading", TimeRange::Long, 2, 50),
            track("b", "B", "Fading", TimeRange::Medium, 20, 50),
            track("c", "C", "Steady", TimeRange::Long, 5, 50),
            track("d", "D", "Steady", TimeRange::Short, 5, 50),
        ];
        let trends = artist_trends(&tracks);
        let fading = trends.iter().find(|t| t.artist == "Fading").unwrap();
        assert_eq!(fading.direction, TrendDirection::Declining);
        let steady = trends.iter().find(|t| t.artist == "Steady").unwrap();
        assert_eq!(steady.direction, TrendDirection::Stable);
        // Sorted by slope ascending
        assert_eq!(trends[0].artist, "Steady");
    }

    #[test]
    fn test_song_survivors() {
        let tracks = vec![
            track("a1", "A", "X", TimeRange::Short, 3, 60),
            track("a2", "A", "X", TimeRange::Medium, 9, 70),
            track("a3", "A", "X", TimeRange::Long, 6, 80),
            track("b1", "B", "Y", TimeRange::Short, 1, 50),
            track("b2", "B", "Y", TimeRange::Long, 2, 50),
            track("c1", "C", "Z", TimeRange::Short, 4, 50),
        ];
        let s = song_survivors(&tracks);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].track_name, "A");
        assert_eq!(s[0].windows, vec![TimeRange::Long, TimeRange::Medium, TimeRange::Short]);
        assert_eq!((s[0].best_rank, s[0].worst_rank, s[0].consistency), (3, 9, 6));
        assert!((s[0].avg_popularity - 70.0).abs() < 1e-9);
        assert_eq!(s[1].track_name, "B");
    }

    #[test]
    fn test_persistence_analysis_sides() {
        let tracks = vec![
            song("A", "X", TimeRange::Short, 2, 40, "2015", false),
            song("A", "X", TimeRange::Long, 4, 40, "2015", false),
            song("B", "Y", TimeRange::Short, 10, 80, "2023", false),
        ];
        let p = persistence_analysis(&tracks, 2025).unwrap();
        assert_eq!(p.unique_songs, 2);
        assert_eq!(p.persistent_songs, 1);
        assert!((p.persistence_rate - 50.0).abs() < 1e-9);
        let pers = p.persistent.unwrap();
        assert!((pers.avg_rank - 3.0).abs() < 1e-9);
        assert_eq!(pers.avg_song_age, Some(10.0));
        assert_eq!(p.non_persistent.unwrap().avg_popularity, 80.0);

        let only_one = persistence_analysis(&tracks[2..], 2025).unwrap();
        assert!(only_one.persistent.is_none());
    }

    #[test]
    fn test_era_analysis() {
        let tracks = vec![
            song("A", "X", TimeRange::Short, 1, 40, "1975", false),
            song("B", "X", TimeRange::Short, 2, 60, "2012-03", false),
            song("C", "X", TimeRange::Short, 3, 80, "2018-01-01", false),
            song("D", "X", TimeRange::Short, 4, 80, "sometime", false),
        ];
        let eras = era_analysis(&tracks);
        assert_eq!(eras.len(), 2);
        assert_eq!(eras[0].era, Era::TwentyTens);
        assert_eq!(eras[0].track_count, 2);
        assert!((eras[0].avg_popularity - 70.0).abs() < 1e-9);
        assert_eq!(eras[1].era, Era::Classic);
    }

    #[test]
    fn test_overview() {
        let tracks = vec![
            track("a", "A", "X", TimeRange::Short, 1, 50),
            track("a", "A", "X", TimeRange::Long, 2, 50),
            track("b", "B", "Y", TimeRange::Short, 3, 50),
        ];
        let artists = vec![
            artist("X", TimeRange::Short, 1, 50, 1.0),
            artist("X", TimeRange::Long, 1, 50, 2.0),
            artist("Y", TimeRange::Short, 1, 50, 3.0),
        ];
        let o = overview(&tracks, &artists);
        assert_eq!(o.total_entries, 3);
        assert_eq!(o.unique_songs, 2);
        assert_eq!(o.unique_artists, 2);
        assert_eq!(o.top_artists[0].artist, "X");
        assert_eq!(o.top_artists[0].total_tracks, 2);
        assert_eq!(o.top_artists[0].windows, 2);
        assert!((o.top_artists[0].avg_rank - 1.5).abs() < 1e-9);
        assert_eq!(o.per_window[0].0, TimeRange::Short);
        assert_eq!(o.per_window[0].1.len(), 2);
        assert!(o.per_window[1].1.is_empty());
    }
}
