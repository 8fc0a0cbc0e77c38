//! Identity- vs mood-driven listening signals and their composite scores.
//!
//! The composite weights are fixed heuristics. They are reproduced exactly
//! and are not claimed to be statistically meaningful.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::db::models::TrackSnapshot;

use super::{
    artist_counts, explicit_percent, group_songs, mean, mean_popularity, mean_song_age, percent,
    ranking_volatility, release_year, sample_std,
};

/// Popularity below this counts as niche.
pub const NICHE_THRESHOLD: i64 = 50;

/// Share of distinct (track, artist) pairs present in at least two windows.
pub fn persistence_score(tracks: &[TrackSnapshot]) -> Option<f64> {
    let groups = group_songs(tracks);
    let persistent = groups.iter().filter(|g| g.windows().len() >= 2).count();
    percent(persistent, groups.len())
}

/// Share of track rows with popularity below [`NICHE_THRESHOLD`].
pub fn niche_percentage(tracks: &[TrackSnapshot]) -> Option<f64> {
    let niche = tracks.iter().filter(|t| t.popularity < NICHE_THRESHOLD).count();
    percent(niche, tracks.len())
}

/// Row count of the most frequent artist over all rows.
pub fn artist_dominance(tracks: &[TrackSnapshot]) -> Option<f64> {
    let top = artist_counts(tracks).first().map(|(_, n)| *n)?;
    percent(top, tracks.len())
}

/// Unique artists per row (0..1).
pub fn artist_diversity(tracks: &[TrackSnapshot]) -> Option<f64> {
    if tracks.is_empty() {
        return None;
    }
    Some(artist_counts(tracks).len() as f64 / tracks.len() as f64)
}

#[derive(Debug, Clone)]
pub struct ArtistDevotion {
    pub artist: String,
    pub tracks: usize,
    pub avg_popularity: f64,
    /// `tracks / (avg_popularity / 10 + 1)`
    pub devotion_score: f64,
}

#[derive(Debug, Clone)]
pub struct IdentitySignals {
    pub persistence_score: f64,
    pub persistent_songs: usize,
    pub unique_songs: usize,
    pub niche_percentage: f64,
    pub niche_tracks: usize,
    pub avg_popularity: f64,
    pub artist_dominance: f64,
    pub artists_with_multiple_tracks: usize,
    pub unique_artists: usize,
    pub artist_diversity: f64,
    /// Top five artists by row count.
    pub devotion: Vec<ArtistDevotion>,
}

impl IdentitySignals {
    pub fn compute(tracks: &[TrackSnapshot]) -> Option<Self> {
        if tracks.is_empty() {
            return None;
        }
        let groups = group_songs(tracks);
        let counts = artist_counts(tracks);

        let devotion = counts
            .iter()
            .take(5)
            .map(|&(artist, n)| {
                let pops: Vec<f64> = tracks
                    .iter()
                    .filter(|t| t.artist_name == artist)
                    .map(|t| t.popularity as f64)
                    .collect();
                let avg_popularity = mean(&pops).unwrap_or(0.0);
                ArtistDevotion {
                    artist: artist.to_string(),
                    tracks: n,
                    avg_popularity,
                    devotion_score: n as f64 / (avg_popularity / 10.0 + 1.0),
                }
            })
            .collect();

        Some(Self {
            persistence_score: persistence_score(tracks)?,
            persistent_songs: groups.iter().filter(|g| g.windows().len() >= 2).count(),
            unique_songs: groups.len(),
            niche_percentage: niche_percentage(tracks)?,
            niche_tracks: tracks.iter().filter(|t| t.popularity < NICHE_THRESHOLD).count(),
            avg_popularity: mean_popularity(tracks)?,
            artist_dominance: artist_dominance(tracks)?,
            artists_with_multiple_tracks: counts.iter().filter(|(_, n)| *n > 1).count(),
            unique_artists: counts.len(),
            artist_diversity: artist_diversity(tracks)?,
            devotion,
        })
    }

    /// `0.3·persistence + 0.3·niche + 0.2·(100 − dominance) + 0.2·(diversity·100)`
    pub fn score(&self) -> f64 {
        self.persistence_score * 0.3
            + self.niche_percentage * 0.3
            + (100.0 - self.artist_dominance) * 0.2
            + (self.artist_diversity * 100.0) * 0.2
    }
}

#[derive(Debug, Clone)]
pub struct MoodSignals {
    pub ranking_volatility: Option<f64>,
    /// Distinct release years.
    pub era_diversity: usize,
    pub year_span: Option<i32>,
    pub avg_song_age: Option<f64>,
    pub popularity_std: Option<f64>,
    pub popularity_range: i64,
    pub explicit_percentage: f64,
}

impl MoodSignals {
    pub fn compute(tracks: &[TrackSnapshot], reference_year: i32) -> Option<Self> {
        if tracks.is_empty() {
            return None;
        }
        let years: HashSet<i32> = tracks.iter().filter_map(release_year).collect();
        let year_span = match (years.iter().min(), years.iter().max()) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        };
        let pops: Vec<f64> = tracks.iter().map(|t| t.popularity as f64).collect();
        let pop_max = tracks.iter().map(|t| t.popularity).max().unwrap_or(0);
        let pop_min = tracks.iter().map(|t| t.popularity).min().unwrap_or(0);

        Some(Self {
            ranking_volatility: ranking_volatility(tracks),
            era_diversity: years.len(),
            year_span,
            avg_song_age: mean_song_age(tracks, reference_year),
            popularity_std: sample_std(&pops),
            popularity_range: pop_max - pop_min,
            explicit_percentage: explicit_percent(tracks)?,
        })
    }

    /// `min(vol·10, 100)·0.4 + min(pop_std·2, 100)·0.3 + min(era_div·3, 100)·0.3`.
    /// Omitted when no song repeats or popularity spread is undefined.
    pub fn score(&self) -> Option<f64> {
        let volatility = self.ranking_volatility?;
        let pop_std = self.popularity_std?;
        Some(
            (volatility * 10.0).min(100.0) * 0.4
                + (pop_std * 2.0).min(100.0) * 0.3
                + (self.era_diversity as f64 * 3.0).min(100.0) * 0.3,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Identity,
    Mood,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identity => "IDENTITY-DRIVEN",
            Self::Mood => "MOOD-DRIVEN",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub identity_score: f64,
    pub mood_score: f64,
    pub driver: Driver,
    /// Absolute score gap.
    pub confidence: f64,
}

pub fn classify(identity: &IdentitySignals, mood: &MoodSignals) -> Option<Classification> {
    let identity_score = identity.score();
    let mood_score = mood.score()?;
    let driver = if identity_score > mood_score {
        Driver::Identity
    } else {
        Driver::Mood
    };
    Some(Classification {
        identity_score,
        mood_score,
        driver,
        confidence: (identity_score - mood_score).abs(),
    })
}

#[derive(Debug, Clone)]
pub struct DeepIdentity {
    /// Rows below the mainstream threshold (popularity < 70).
    pub mainstream_rejection: f64,
    /// Rows with popularity < 30.
    pub underground_affinity: f64,
    pub core_artists: usize,
    /// Share of rows held by the top ten artists.
    pub core_cluster_share: f64,
    pub counter_cultural_score: f64,
    pub level: &'static str,
}

pub fn deep_identity(tracks: &[TrackSnapshot]) -> Option<DeepIdentity> {
    let n = tracks.len();
    let mainstream = tracks.iter().filter(|t| t.popularity >= 70).count();
    let underground = tracks.iter().filter(|t| t.popularity < 30).count();
    let counts = artist_counts(tracks);
    let core: Vec<_> = counts.iter().take(10).collect();
    let core_rows: usize = core.iter().map(|(_, c)| c).sum();

    let avg_pop = mean_popularity(tracks)?;
    let explicit_ratio = explicit_percent(tracks)? / 100.0;
    let underground_share = underground as f64 / n as f64;
    let score = (1.0 - avg_pop / 100.0) * 50.0 + explicit_ratio * 30.0 + underground_share * 20.0;

    let level = if score > 50.0 {
        "High"
    } else if score > 25.0 {
        "Medium"
    } else {
        "Low"
    };

    Some(DeepIdentity {
        mainstream_rejection: (1.0 - mainstream as f64 / n as f64) * 100.0,
        underground_affinity: underground_share * 100.0,
        core_artists: core.len(),
        core_cluster_share: percent(core_rows, n)?,
        counter_cultural_score: score,
        level,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SongCategory {
    StrongIdentity,
    PopularFavorite,
    NicheDiscovery,
    MoodDriven,
}

impl SongCategory {
    pub const ALL: [SongCategory; 4] = [
        Self::StrongIdentity,
        Self::PopularFavorite,
        Self::NicheDiscovery,
        Self::MoodDriven,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongIdentity => "Strong Identity",
            Self::PopularFavorite => "Popular Favorite",
            Self::NicheDiscovery => "Niche Discovery",
            Self::MoodDriven => "Mood-Driven",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategorizedSong {
    pub track_name: String,
    pub artist_name: String,
    pub windows: usize,
    /// Popularity of the song's first row.
    pub popularity: i64,
    pub avg_rank: f64,
    pub category: SongCategory,
}

pub fn song_categories(tracks: &[TrackSnapshot]) -> Vec<CategorizedSong> {
    group_songs(tracks)
        .into_iter()
        .map(|g| {
            let windows = g.windows().len();
            let popularity = g.rows[0].popularity;
            let category = match (windows, popularity) {
                (w, p) if w >= 2 && p < 60 => SongCategory::StrongIdentity,
                (w, _) if w >= 2 => SongCategory::PopularFavorite,
                (1, p) if p < 40 => SongCategory::NicheDiscovery,
                _ => SongCategory::MoodDriven,
            };
            CategorizedSong {
                track_name: g.track_name.to_string(),
                artist_name: g.artist_name.to_string(),
                windows,
                popularity,
                avg_rank: mean(&g.ranks()).unwrap_or(0.0),
                category,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loyalty {
    DeepConnection,
    ConsistentFavorite,
    BingePhase,
    CasualListen,
}

impl Loyalty {
    pub const ALL: [Loyalty; 4] = [
        Self::DeepConnection,
        Self::ConsistentFavorite,
        Self::BingePhase,
        Self::CasualListen,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeepConnection => "Deep Connection",
            Self::ConsistentFavorite => "Consistent Favorite",
            Self::BingePhase => "Binge Phase",
            Self::CasualListen => "Casual Listen",
        }
    }

    /// Rules applied as successive overrides; a later match wins, so five
    /// tracks over two windows ends up as Consistent Favorite.
    pub fn classify(track_count: usize, window_span: usize) -> Self {
        let mut loyalty = Self::CasualListen;
        if track_count >= 5 && window_span >= 2 {
            loyalty = Self::DeepConnection;
        }
        if track_count >= 3 && window_span >= 2 {
            loyalty = Self::ConsistentFavorite;
        }
        if track_count >= 5 && window_span == 1 {
            loyalty = Self::BingePhase;
        }
        loyalty
    }
}

#[derive(Debug, Clone)]
pub struct ArtistLoyalty {
    pub artist: String,
    pub track_count: usize,
    pub window_span: usize,
    pub avg_rank: f64,
    pub avg_popularity: f64,
    pub loyalty: Loyalty,
}

/// Per-artist loyalty, sorted by track count descending then name.
pub fn artist_loyalty(tracks: &[TrackSnapshot]) -> Vec<ArtistLoyalty> {
    let mut by_artist: HashMap<&str, Vec<&TrackSnapshot>> = HashMap::new();
    for t in tracks {
        by_artist.entry(t.artist_name.as_str()).or_default().push(t);
    }

    let mut out: Vec<ArtistLoyalty> = by_artist
        .into_iter()
        .map(|(artist, rows)| {
            let window_span = rows.iter().map(|t| t.time_range).collect::<HashSet<_>>().len();
            let ranks: Vec<f64> = rows.iter().map(|t| t.rank_position as f64).collect();
            let pops: Vec<f64> = rows.iter().map(|t| t.popularity as f64).collect();
            ArtistLoyalty {
                artist: artist.to_string(),
                track_count: rows.len(),
                window_span,
                avg_rank: mean(&ranks).unwrap_or(0.0),
                avg_popularity: mean(&pops).unwrap_or(0.0),
                loyalty: Loyalty::classify(rows.len(), window_span),
            }
        })
        .collect();
    out.sort_by(|a, b| b.track_count.cmp(&a.track_count).then_with(|| a.artist.cmp(&b.artist)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::track;
    use crate::db::models::TimeRange;
    use crate::metrics::tests::song;

    fn in_all_windows(names: &[(&str, &str)]) -> Vec<TrackSnapshot> {
        let mut out = Vec::new();
        for range in TimeRange::ALL {
            for (i, (name, artist)) in names.iter().enumerate() {
                out.push(track(&format!("{name}{i}"), name, artist, range, i as i64 + 1, 50));
            }
        }
        out
    }

    #[test]
    fn test_persistence_all_windows_is_100() {
        let tracks = in_all_windows(&[("A", "X"), ("B", "Y"), ("C", "Z")]);
        assert!((persistence_score(&tracks).unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_persistence_single_window_is_0() {
        let tracks = vec![
            track("a", "A", "X", TimeRange::Short, 1, 50),
            track("b", "B", "X", TimeRange::Medium, 1, 50),
            track("c", "C", "Y", TimeRange::Long, 1, 50),
        ];
        assert_eq!(persistence_score(&tracks), Some(0.0));
        assert!(persistence_score(&[]).is_none());
    }

    #[test]
    fn test_niche_percentage() {
        let tracks: Vec<_> = [10, 40, 60, 90]
            .iter()
            .enumerate()
            .map(|(i, &p)| track(&i.to_string(), &format!("S{i}"), "X", TimeRange::Short, i as i64 + 1, p))
            .collect();
        assert_eq!(niche_percentage(&tracks), Some(50.0));
    }

    #[test]
    fn test_dominance_and_diversity() {
        let tracks = vec![
            track("a", "A", "X", TimeRange::Short, 1, 50),
            track("b", "B", "X", TimeRange::Short, 2, 50),
            track("c", "C", "X", TimeRange::Short, 3, 50),
            track("d", "D", "Y", TimeRange::Short, 4, 50),
        ];
        assert_eq!(artist_dominance(&tracks), Some(75.0));
        assert_eq!(artist_diversity(&tracks), Some(0.5));
    }

    #[test]
    fn test_identity_score_weights() {
        let signals = IdentitySignals {
            persistence_score: 40.0,
            persistent_songs: 0,
            unique_songs: 0,
            niche_percentage: 20.0,
            niche_tracks: 0,
            avg_popularity: 0.0,
            artist_dominance: 10.0,
            artists_with_multiple_tracks: 0,
            unique_artists: 0,
            artist_diversity: 0.5,
            devotion: vec![],
        };
        // 12 + 6 + 18 + 10
        assert!((signals.score() - 46.0).abs() < 1e-9);
    }

    #[test]
    fn test_mood_score_clamps() {
        let mut mood = MoodSignals {
            ranking_volatility: Some(20.0),
            era_diversity: 50,
            year_span: None,
            avg_song_age: None,
            popularity_std: Some(10.0),
            popularity_range: 0,
            explicit_percentage: 0.0,
        };
        // min(200,100)*0.4 + min(20,100)*0.3 + min(150,100)*0.3
        assert!((mood.score().unwrap() - 76.0).abs() < 1e-9);

        mood.ranking_volatility = None;
        assert!(mood.score().is_none());
    }

    #[test]
    fn test_classify_picks_larger_score() {
        let tracks = vec![
            song("A", "X", TimeRange::Long, 40, 20, "1975", false),
            song("A", "X", TimeRange::Short, 2, 20, "1975", false),
            song("B", "Y", TimeRange::Short, 5, 90, "2023-01-01", true),
        ];
        let identity = IdentitySignals::compute(&tracks).unwrap();
        let mood = MoodSignals::compute(&tracks, 2025).unwrap();
        assert_eq!(mood.era_diversity, 2);
        assert_eq!(mood.year_span, Some(48));
        let c = classify(&identity, &mood).unwrap();
        assert!((c.confidence - (c.identity_score - c.mood_score).abs()).abs() < 1e-9);
        let expected = if c.identity_score > c.mood_score { Driver::Identity } else { Driver::Mood };
        assert_eq!(c.driver, expected);
    }

    #[test]
    fn test_deep_identity_levels() {
        let tracks = vec![
            song("A", "X", TimeRange::Short, 1, 10, "2000", true),
            song("B", "Y", TimeRange::Short, 2, 20, "2000", true),
        ];
        let d = deep_identity(&tracks).unwrap();
        // (1 - 0.15)*50 + 1*30 + 1*20
        assert!((d.counter_cultural_score - 92.5).abs() < 1e-9);
        assert_eq!(d.level, "High");
        assert_eq!(d.mainstream_rejection, 100.0);
        assert_eq!(d.core_cluster_share, 100.0);
    }

    #[test]
    fn test_song_categories() {
        let tracks = vec![
            song("A", "X", TimeRange::Long, 1, 30, "2000", false),
            song("A", "X", TimeRange::Short, 1, 30, "2000", false),
            song("B", "X", TimeRange::Long, 2, 80, "2000", false),
            song("B", "X", TimeRange::Medium, 2, 80, "2000", false),
            song("C", "Y", TimeRange::Short, 3, 20, "2000", false),
            song("D", "Z", TimeRange::Short, 4, 55, "2000", false),
        ];
        let cats: HashMap<String, SongCategory> = song_categories(&tracks)
            .into_iter()
            .map(|s| (s.track_name, s.category))
            .collect();
        assert_eq!(cats["A"], SongCategory::StrongIdentity);
        assert_eq!(cats["B"], SongCategory::PopularFavorite);
        assert_eq!(cats["C"], SongCategory::NicheDiscovery);
        assert_eq!(cats["D"], SongCategory::MoodDriven);
    }

    #[test]
    fn test_loyalty_override_order() {
        assert_eq!(Loyalty::classify(5, 2), Loyalty::ConsistentFavorite);
        assert_eq!(Loyalty::classify(3, 3), Loyalty::ConsistentFavorite);
        assert_eq!(Loyalty::classify(6, 1), Loyalty::BingePhase);
        assert_eq!(Loyalty::classify(2, 3), Loyalty::CasualListen);
        assert_eq!(Loyalty::classify(4, 1), Loyalty::CasualListen);
    }

    #[test]
    fn test_artist_loyalty_rows() {
        let mut tracks = Vec::new();
        for i in 0..5 {
            tracks.push(track(&format!("b{i}"), &format!("B{i}"), "Binge", TimeRange::Short, i + 1, 50));
        }
        tracks.push(track("c", "C", "Once", TimeRange::Long, 9, 70));
        let rows = artist_loyalty(&tracks);
        assert_eq!(rows[0].artist, "Binge");
        assert_eq!(rows[0].loyalty, Loyalty::BingePhase);
        assert!((rows[0].avg_rank - 3.0).abs() < 1e-9);
        assert_eq!(rows[1].loyalty, Loyalty::CasualListen);
    }
}
