//! Heuristic personality-style readings of listening data.
//!
//! Thresholds and blends are fixed rules of thumb, kept stable so reports
//! stay comparable between runs.

use std::collections::{HashMap, HashSet};

use crate::db::models::{ArtistSnapshot, TimeRange, TrackSnapshot};

use super::{
    artist_counts, explicit_percent, group_songs, mean, mean_duration_minutes, mean_popularity,
    mean_song_age, percent, ranking_volatility, release_year, sample_std, sample_variance,
    duration_minutes, unique_artists,
};

/// Qualitative level of a 0–6 dimension score.
pub fn level(score: u8) -> &'static str {
    match score {
        4.. => "High",
        2..=3 => "Medium",
        _ => "Low",
    }
}

#[derive(Debug, Clone)]
pub struct Dimension {
    pub name: &'static str,
    pub description: &'static str,
    /// 0–6
    pub score: u8,
}

#[derive(Debug, Clone)]
pub struct PersonalityProfile {
    pub dimensions: Vec<Dimension>,
}

impl PersonalityProfile {
    /// Highest-scoring dimension; the first listed wins a tie.
    pub fn dominant(&self) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .fold(None, |best: Option<&Dimension>, d| match best {
                Some(b) if b.score >= d.score => Some(b),
                _ => Some(d),
            })
    }
}

/// Score one value against two descending thresholds: 2 above `high`, 1 above `mid`.
fn above(value: Option<f64>, high: f64, mid: f64) -> u8 {
    match value {
        Some(v) if v > high => 2,
        Some(v) if v > mid => 1,
        _ => 0,
    }
}

/// Mirror of [`above`] for "lower is more".
fn below(value: Option<f64>, low: f64, mid: f64) -> u8 {
    match value {
        Some(v) if v < low => 2,
        Some(v) if v < mid => 1,
        _ => 0,
    }
}

/// Four music-preference dimensions scored 0–6 from age, duration,
/// popularity, explicitness and rank behaviour.
pub fn personality_profile(tracks: &[TrackSnapshot], reference_year: i32) -> Option<PersonalityProfile> {
    if tracks.is_empty() {
        return None;
    }
    let age = mean_song_age(tracks, reference_year);
    let duration = mean_duration_minutes(tracks);
    let popularity = mean_popularity(tracks);
    let explicit = explicit_percent(tracks);

    let groups = group_songs(tracks);
    let repeated_rows: usize = groups.iter().filter(|g| g.rows.len() > 1).map(|g| g.rows.len()).sum();
    let consistency = percent(repeated_rows, tracks.len());
    let variances: Vec<f64> = groups.iter().filter_map(|g| sample_variance(&g.ranks())).collect();
    let rank_variance = mean(&variances);

    let reflective = above(age, 15.0, 8.0) + above(duration, 4.5, 3.5) + below(popularity, 70.0, 80.0);
    let intense = above(explicit, 30.0, 15.0) + above(consistency, 25.0, 15.0);
    let upbeat = above(popularity, 80.0, 70.0) + below(age, 5.0, 10.0) + below(duration, 3.5, 4.0);
    let energetic = u8::from(age.is_some_and(|a| a < 8.0)) + above(rank_variance, 100.0, 50.0);

    Some(PersonalityProfile {
        dimensions: vec![
            Dimension {
                name: "Reflective & Complex",
                description: "Sophisticated, introspective, enjoys complex music",
                score: reflective,
            },
            Dimension {
                name: "Intense & Rebellious",
                description: "Independent, risk-taking, prefers edgy content",
                score: intense,
            },
            Dimension {
                name: "Upbeat & Conventional",
                description: "Social, cheerful, prefers mainstream music",
                score: upbeat,
            },
            Dimension {
                name: "Energetic & Rhythmic",
                description: "Active, outgoing, enjoys rhythmic music",
                score: energetic,
            },
        ],
    })
}

/// Jaccard overlap (percent) of artists between consecutive windows,
/// long→medium then medium→short. Pairs with an empty side are skipped.
pub fn window_overlaps(tracks: &[TrackSnapshot]) -> Vec<(TimeRange, TimeRange, f64)> {
    let artists_in = |range: TimeRange| -> HashSet<&str> {
        tracks
            .iter()
            .filter(|t| t.time_range == range)
            .map(|t| t.artist_name.as_str())
            .collect()
    };

    TimeRange::CHRONOLOGICAL
        .windows(2)
        .filter_map(|pair| {
            let a = artists_in(pair[0]);
            let b = artists_in(pair[1]);
            if a.is_empty() || b.is_empty() {
                return None;
            }
            let inter = a.intersection(&b).count();
            let union = a.union(&b).count();
            Some((pair[0], pair[1], inter as f64 / union as f64 * 100.0))
        })
        .collect()
}

/// Mean of [`window_overlaps`]; `None` when no pair is comparable.
pub fn taste_stability(tracks: &[TrackSnapshot]) -> Option<f64> {
    mean(&window_overlaps(tracks).iter().map(|(_, _, o)| *o).collect::<Vec<_>>())
}

/// Coarse era labels used for the listening-pattern view.
pub fn listening_era(year: i32) -> &'static str {
    match year {
        2020.. => "Current (2020+)",
        2010..2020 => "Recent (2010s)",
        2000..2010 => "Millennial (2000s)",
        1990..2000 => "90s",
        1980..1990 => "80s",
        _ => "Classic (Pre-1980)",
    }
}

#[derive(Debug, Clone)]
pub struct ListeningPatterns {
    /// Songs with more than one row, as a share of distinct songs.
    pub repeat_rate: f64,
    pub familiarity: &'static str,
    pub novelty_seeking: f64,
    /// Unique artists per row, percent.
    pub artist_diversity: f64,
    pub overlaps: Vec<(TimeRange, TimeRange, f64)>,
    pub taste_stability: Option<f64>,
    pub stability: &'static str,
    pub avg_song_age: Option<f64>,
    pub era_distribution: Vec<(&'static str, usize)>,
    pub dominant_era: Option<&'static str>,
    pub temporal_type: Option<&'static str>,
}

pub fn listening_patterns(tracks: &[TrackSnapshot], reference_year: i32) -> Option<ListeningPatterns> {
    let groups = group_songs(tracks);
    let repeat_rate = percent(groups.iter().filter(|g| g.rows.len() > 1).count(), groups.len())?;
    let familiarity = if repeat_rate > 30.0 {
        "High"
    } else if repeat_rate > 15.0 {
        "Medium"
    } else {
        "Low"
    };

    let overlaps = window_overlaps(tracks);
    let taste_stability = taste_stability(tracks);
    let stability = match taste_stability {
        Some(s) if s > 60.0 => "High",
        Some(s) if s > 40.0 => "Medium",
        _ => "Low",
    };

    let mut eras: HashMap<&'static str, usize> = HashMap::new();
    for year in tracks.iter().filter_map(release_year) {
        *eras.entry(listening_era(year)).or_default() += 1;
    }
    let mut era_distribution: Vec<_> = eras.into_iter().collect();
    era_distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let avg_song_age = mean_song_age(tracks, reference_year);
    let temporal_type = avg_song_age.map(|age| {
        if age < 5.0 {
            "Contemporary Focused"
        } else if age < 15.0 {
            "Balanced"
        } else {
            "Nostalgic"
        }
    });

    Some(ListeningPatterns {
        repeat_rate,
        familiarity,
        novelty_seeking: 100.0 - repeat_rate,
        artist_diversity: percent(unique_artists(tracks), tracks.len())?,
        overlaps,
        taste_stability,
        stability,
        avg_song_age,
        dominant_era: era_distribution.first().map(|(e, _)| *e),
        era_distribution,
        temporal_type,
    })
}

#[derive(Debug, Clone)]
pub struct SocialBehaviour {
    pub avg_popularity: f64,
    pub popularity_std: Option<f64>,
    /// Std / mean of per-artist row counts.
    pub concentration: Option<f64>,
    pub mainstream_level: &'static str,
    /// Share of the artists table's summed track count held by the top artist.
    pub top_artist_dominance: Option<f64>,
    pub loyalty_type: Option<&'static str>,
    pub catalog_artists: usize,
    /// Rows with popularity above 80, percent.
    pub high_popularity: f64,
    pub explicit_rate: f64,
    /// 0–4
    pub conformity_score: u8,
    pub conformity_level: &'static str,
}

pub fn social_behaviour(tracks: &[TrackSnapshot], artists: &[ArtistSnapshot]) -> Option<SocialBehaviour> {
    let avg_popularity = mean_popularity(tracks)?;
    let pops: Vec<f64> = tracks.iter().map(|t| t.popularity as f64).collect();

    let counts: Vec<f64> = artist_counts(tracks).iter().map(|(_, n)| *n as f64).collect();
    let concentration = match (sample_std(&counts), mean(&counts)) {
        (Some(s), Some(m)) if m > 0.0 => Some(s / m),
        _ => None,
    };

    let mainstream_level = if avg_popularity > 75.0 {
        "High Mainstream"
    } else if avg_popularity > 60.0 {
        "Moderate Mainstream"
    } else {
        "Independent"
    };

    let mut totals: HashMap<&str, i64> = HashMap::new();
    for a in artists {
        *totals.entry(a.artist_name.as_str()).or_default() += a.track_count;
    }
    let sum: i64 = totals.values().sum();
    let top_artist_dominance = totals
        .values()
        .max()
        .filter(|_| sum > 0)
        .map(|top| *top as f64 / sum as f64 * 100.0);
    let loyalty_type = top_artist_dominance.map(|d| {
        if d > 20.0 {
            "High Loyalty"
        } else if d > 10.0 {
            "Moderate Loyalty"
        } else {
            "High Exploration"
        }
    });

    let high_popularity = percent(tracks.iter().filter(|t| t.popularity > 80).count(), tracks.len())?;
    let explicit_rate = explicit_percent(tracks)?;
    let diversity = unique_artists(tracks) as f64 / tracks.len() as f64;

    let mut conformity_score = 0;
    if high_popularity > 60.0 {
        conformity_score += 2;
    } else if high_popularity > 40.0 {
        conformity_score += 1;
    }
    if explicit_rate < 10.0 {
        conformity_score += 1;
    }
    if diversity < 0.3 {
        conformity_score += 1;
    }
    let conformity_level = match conformity_score {
        3.. => "High Conformity",
        2 => "Moderate Conformity",
        _ => "High Individuality",
    };

    Some(SocialBehaviour {
        avg_popularity,
        popularity_std: sample_std(&pops),
        concentration,
        mainstream_level,
        top_artist_dominance,
        loyalty_type,
        catalog_artists: totals.len(),
        high_popularity,
        explicit_rate,
        conformity_score,
        conformity_level,
    })
}

#[derive(Debug, Clone)]
pub struct EmotionalPatterns {
    pub avg_duration_minutes: f64,
    pub duration_variance: Option<f64>,
    pub mood_type: &'static str,
    /// Ranking volatility, 0 when no song repeats.
    pub rank_volatility: f64,
    pub stability: &'static str,
    /// 0–3
    pub complexity_score: u8,
    pub processing_type: &'static str,
}

pub fn emotional_patterns(tracks: &[TrackSnapshot], reference_year: i32) -> Option<EmotionalPatterns> {
    let avg_duration = mean_duration_minutes(tracks)?;
    let durations: Vec<f64> = tracks.iter().map(duration_minutes).collect();

    let mood_type = if avg_duration > 4.5 {
        "Contemplative"
    } else if avg_duration < 3.5 {
        "Energizing"
    } else {
        "Balanced"
    };

    let rank_volatility = ranking_volatility(tracks).unwrap_or(0.0);
    let stability = if rank_volatility > 10.0 {
        "Dynamic"
    } else if rank_volatility > 5.0 {
        "Moderate"
    } else {
        "Stable"
    };

    let complexity_score = u8::from(mean_song_age(tracks, reference_year).is_some_and(|a| a > 10.0))
        + u8::from(avg_duration > 4.0)
        + u8::from(mean_popularity(tracks).is_some_and(|p| p < 75.0));
    let processing_type = if complexity_score >= 2 { "Cognitive" } else { "Emotional" };

    Some(EmotionalPatterns {
        avg_duration_minutes: avg_duration,
        duration_variance: sample_variance(&durations),
        mood_type,
        rank_volatility,
        stability,
        complexity_score,
        processing_type,
    })
}

/// Big Five personality proxies, each on 0–100.
#[derive(Debug, Clone)]
pub struct BigFive {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub emotional_stability: f64,
}

impl BigFive {
    pub fn traits(&self) -> [(&'static str, f64); 5] {
        [
            ("Openness", self.openness),
            ("Conscientiousness", self.conscientiousness),
            ("Extraversion", self.extraversion),
            ("Agreeableness", self.agreeableness),
            ("Emotional Stability", self.emotional_stability),
        ]
    }
}

pub fn big_five(tracks: &[TrackSnapshot]) -> Option<BigFive> {
    let avg_pop = mean_popularity(tracks)?;
    let diversity = percent(unique_artists(tracks), tracks.len())?;
    let explicit = explicit_percent(tracks)?;
    let volatility = ranking_volatility(tracks).unwrap_or(10.0);

    Some(BigFive {
        openness: (diversity + (100.0 - avg_pop)) / 2.0,
        conscientiousness: taste_stability(tracks).unwrap_or(50.0),
        extraversion: avg_pop,
        agreeableness: (100.0 - explicit + (avg_pop - 50.0)).clamp(0.0, 100.0),
        emotional_stability: 100.0 - (volatility * 5.0).min(100.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::{artist, track};
    use crate::metrics::tests::song;

    fn long_old_niche() -> Vec<TrackSnapshot> {
        let mut tracks = Vec::new();
        for (i, range) in TimeRange::ALL.into_iter().enumerate() {
            let mut t = song("Old", "Folk", range, (i as i64) * 20 + 1, 30, "1970", false);
            t.duration_ms = 330_000;
            tracks.push(t);
        }
        tracks
    }

    #[test]
    fn test_reflective_dimension_maxes_out() {
        let profile = personality_profile(&long_old_niche(), 2025).unwrap();
        let reflective = &profile.dimensions[0];
        assert_eq!(reflective.name, "Reflective & Complex");
        assert_eq!(reflective.score, 6);
        assert_eq!(level(reflective.score), "High");
        assert_eq!(profile.dominant().unwrap().name, "Reflective & Complex");
        // Rank variance of [1, 21, 41] is 400
        assert_eq!(profile.dimensions[3].score, 2);
    }

    #[test]
    fn test_dominant_tie_keeps_first() {
        let p = PersonalityProfile {
            dimensions: vec![
                Dimension { name: "a", description: "", score: 3 },
                Dimension { name: "b", description: "", score: 3 },
            ],
        };
        assert_eq!(p.dominant().unwrap().name, "a");
    }

    #[test]
    fn test_taste_stability_jaccard() {
        let tracks = vec![
            track("1", "A", "X", TimeRange::Long, 1, 50),
            track("2", "B", "Y", TimeRange::Long, 2, 50),
            track("3", "C", "X", TimeRange::Medium, 1, 50),
            track("4", "D", "X", TimeRange::Short, 1, 50),
        ];
        let overlaps = window_overlaps(&tracks);
        assert_eq!(overlaps.len(), 2);
        assert!((overlaps[0].2 - 50.0).abs() < 1e-9);
        assert!((overlaps[1].2 - 100.0).abs() < 1e-9);
        assert!((taste_stability(&tracks).unwrap() - 75.0).abs() < 1e-9);

        assert!(taste_stability(&tracks[..2]).is_none());
    }

    #[test]
    fn test_listening_patterns() {
        let tracks = long_old_niche();
        let p = listening_patterns(&tracks, 2025).unwrap();
        assert_eq!(p.repeat_rate, 100.0);
        assert_eq!(p.familiarity, "High");
        assert_eq!(p.novelty_seeking, 0.0);
        assert_eq!(p.dominant_era, Some("Classic (Pre-1980)"));
        assert_eq!(p.temporal_type, Some("Nostalgic"));
        assert_eq!(p.stability, "High");
    }

    #[test]
    fn test_social_behaviour() {
        let tracks = vec![
            track("1", "A", "X", TimeRange::Short, 1, 90),
            track("2", "B", "X", TimeRange::Short, 2, 85),
            track("3", "C", "Y", TimeRange::Short, 3, 95),
        ];
        let artists = vec![
            artist("X", TimeRange::Short, 2, 175, 1.5),
            artist("Y", TimeRange::Short, 1, 95, 3.0),
        ];
        let s = social_behaviour(&tracks, &artists).unwrap();
        assert_eq!(s.mainstream_level, "High Mainstream");
        assert_eq!(s.high_popularity, 100.0);
        assert_eq!(s.explicit_rate, 0.0);
        // 2 (high popularity) + 1 (clean)
        assert_eq!(s.conformity_score, 3);
        assert_eq!(s.conformity_level, "High Conformity");
        assert!((s.top_artist_dominance.unwrap() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.loyalty_type, Some("High Loyalty"));
    }

    #[test]
    fn test_emotional_patterns() {
        let e = emotional_patterns(&long_old_niche(), 2025).unwrap();
        assert_eq!(e.mood_type, "Contemplative");
        assert!((e.rank_volatility - 20.0).abs() < 1e-9);
        assert_eq!(e.stability, "Dynamic");
        assert_eq!(e.complexity_score, 3);
        assert_eq!(e.processing_type, "Cognitive");
    }

    #[test]
    fn test_big_five_defaults() {
        // No repeats and a single window: stability and volatility fall back
        let tracks = vec![
            track("1", "A", "X", TimeRange::Short, 1, 60),
            track("2", "B", "Y", TimeRange::Short, 2, 40),
        ];
        let b = big_five(&tracks).unwrap();
        assert_eq!(b.conscientiousness, 50.0);
        assert_eq!(b.emotional_stability, 50.0);
        assert_eq!(b.extraversion, 50.0);
        assert_eq!(b.openness, 75.0);
        assert_eq!(b.agreeableness, 100.0);
    }

    #[test]
    fn test_big_five_agreeableness_clamped() {
        let mut t = track("1", "A", "X", TimeRange::Short, 1, 0);
        t.explicit = true;
        let b = big_five(&[t]).unwrap();
        assert_eq!(b.agreeableness, 0.0);
    }
}
