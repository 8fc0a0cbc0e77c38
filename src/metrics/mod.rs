//! Derived listening metrics.
//!
//! Every function here is a pure computation over loaded track/artist rows
//! (the live tables or one archived day). Nothing is written back. Metrics
//! whose denominator would be zero, or that need more points than exist,
//! return `None` and are left out of reports.

pub mod identity;
pub mod psychology;
pub mod stats;
pub mod timeline;
pub mod trends;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::db::models::{TimeRange, TrackSnapshot};

static RELEASE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?$").expect("valid regex")
});

const KNOWN_YEARS: std::ops::RangeInclusive<i32> = 1677..=2262;

/// Release year from an upstream release date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
/// Anything else, including impossible months or days and years outside
/// 1677..=2262 (the upstream's `0000` placeholder), is unknown.
pub fn parse_release_year(date: &str) -> Option<i32> {
    let caps = RELEASE_DATE_RE.captures(date.trim())?;
    let year: i32 = caps[1].parse().ok()?;
    if !KNOWN_YEARS.contains(&year) {
        return None;
    }
    let month: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 1,
    };
    let day: u32 = match caps.get(3) {
        Some(d) => d.as_str().parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day).map(|_| year)
}

/// Release year of a track row, if its release date parses.
pub fn release_year(track: &TrackSnapshot) -> Option<i32> {
    track.release_date.as_deref().and_then(parse_release_year)
}

/// Age in years relative to `reference_year`.
pub fn song_age(track: &TrackSnapshot, reference_year: i32) -> Option<f64> {
    release_year(track).map(|y| (reference_year - y) as f64)
}

pub fn duration_minutes(track: &TrackSnapshot) -> f64 {
    track.duration_ms as f64 / 60_000.0
}

/// Release-era bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Era {
    Classic,
    Eighties,
    Nineties,
    TwoThousands,
    TwentyTens,
    TwentyTwenties,
}

impl Era {
    pub fn from_year(year: i32) -> Self {
        match year {
            ..1980 => Self::Classic,
            1980..1990 => Self::Eighties,
            1990..2000 => Self::Nineties,
            2000..2010 => Self::TwoThousands,
            2010..2020 => Self::TwentyTens,
            _ => Self::TwentyTwenties,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Classic => "Classic (Pre-1980)",
            Self::Eighties => "80s",
            Self::Nineties => "90s",
            Self::TwoThousands => "2000s",
            Self::TwentyTens => "2010s",
            Self::TwentyTwenties => "2020s+",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// --- Numeric helpers ---

pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        None
    } else {
        Some(v.iter().sum::<f64>() / v.len() as f64)
    }
}

/// Sample variance (n − 1 denominator). Needs at least two values.
pub fn sample_variance(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let m = mean(v)?;
    let ss: f64 = v.iter().map(|x| (x - m).powi(2)).sum();
    Some(ss / (v.len() - 1) as f64)
}

pub fn sample_std(v: &[f64]) -> Option<f64> {
    sample_variance(v).map(f64::sqrt)
}

/// Least-squares slope of `y` on `x`. `None` for fewer than two points or a
/// degenerate (constant) `x`.
pub fn ols_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for i in 0..x.len() {
        let dx = x[i] - x_mean;
        cov += dx * (y[i] - y_mean);
        var += dx * dx;
    }

    if var < 1e-12 { None } else { Some(cov / var) }
}

/// `part / whole × 100`, `None` when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

// --- Grouping ---

/// All rows of one song, keyed by (track name, artist name).
#[derive(Debug)]
pub struct SongGroup<'a> {
    pub track_name: &'a str,
    pub artist_name: &'a str,
    pub rows: Vec<&'a TrackSnapshot>,
}

impl SongGroup<'_> {
    /// Distinct windows the song appears in, oldest window first.
    pub fn windows(&self) -> Vec<TimeRange> {
        let present: HashSet<TimeRange> = self.rows.iter().map(|t| t.time_range).collect();
        TimeRange::CHRONOLOGICAL
            .into_iter()
            .filter(|r| present.contains(r))
            .collect()
    }

    pub fn ranks(&self) -> Vec<f64> {
        self.rows.iter().map(|t| t.rank_position as f64).collect()
    }
}

/// Group tracks by (track name, artist name), in first-seen order.
pub fn group_songs(tracks: &[TrackSnapshot]) -> Vec<SongGroup<'_>> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<SongGroup<'_>> = Vec::new();

    for t in tracks {
        let key = (t.track_name.as_str(), t.artist_name.as_str());
        match index.get(&key) {
            Some(&i) => groups[i].rows.push(t),
            None => {
                index.insert(key, groups.len());
                groups.push(SongGroup {
                    track_name: key.0,
                    artist_name: key.1,
                    rows: vec![t],
                });
            }
        }
    }
    groups
}

/// Row count per artist, sorted by count descending then name.
pub fn artist_counts(tracks: &[TrackSnapshot]) -> Vec<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in tracks {
        *counts.entry(t.artist_name.as_str()).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
}

pub fn unique_artists(tracks: &[TrackSnapshot]) -> usize {
    tracks.iter().map(|t| t.artist_name.as_str()).collect::<HashSet<_>>().len()
}

pub fn mean_popularity(tracks: &[TrackSnapshot]) -> Option<f64> {
    mean(&tracks.iter().map(|t| t.popularity as f64).collect::<Vec<_>>())
}

/// Share of explicit rows, as a percentage.
pub fn explicit_percent(tracks: &[TrackSnapshot]) -> Option<f64> {
    percent(tracks.iter().filter(|t| t.explicit).count(), tracks.len())
}

/// Mean song age over rows with a parseable release date.
pub fn mean_song_age(tracks: &[TrackSnapshot], reference_year: i32) -> Option<f64> {
    let ages: Vec<f64> = tracks.iter().filter_map(|t| song_age(t, reference_year)).collect();
    mean(&ages)
}

pub fn mean_duration_minutes(tracks: &[TrackSnapshot]) -> Option<f64> {
    mean(&tracks.iter().map(duration_minutes).collect::<Vec<_>>())
}

/// Mean sample standard deviation of rank over songs with more than one row.
/// `None` when no song repeats.
pub fn ranking_volatility(tracks: &[TrackSnapshot]) -> Option<f64> {
    let stds: Vec<f64> = group_songs(tracks)
        .iter()
        .filter_map(|g| sample_std(&g.ranks()))
        .collect();
    mean(&stds)
}
