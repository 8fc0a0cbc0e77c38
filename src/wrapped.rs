//! Yearly "wrapped" export analysis.
//!
//! The export is a CSV with at least `artist_name, year, rank, dimension`,
//! one row per song in a year's top list. Rows whose year or rank fail
//! numeric coercion, or that have no artist, are dropped and counted.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One song of one year's list.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedEntry {
    pub artist_name: String,
    pub year: i32,
    pub rank: f64,
    pub dimension: Option<String>,
}

#[derive(Debug, Default)]
pub struct WrappedData {
    pub entries: Vec<WrappedEntry>,
    pub dropped: usize,
}

/// Raw row before coercion. Everything is text so bad values can be
/// counted instead of failing the whole file.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    rank: Option<String>,
    #[serde(default)]
    dimension: Option<String>,
}

fn coerce_number(s: Option<&str>) -> Option<f64> {
    s.and_then(|v| v.trim().parse::<f64>().ok()).filter(|v| v.is_finite())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl WrappedData {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut data = WrappedData::default();
        for (line, record) in rdr.deserialize::<RawRow>().enumerate() {
            let raw = match record {
                Ok(raw) => raw,
                Err(e) => {
                    log::debug!("Row {}: {e}", line + 2);
                    data.dropped += 1;
                    continue;
                }
            };
            // Fractional years are dropped rather than truncated
            let year = coerce_number(raw.year.as_deref())
                .filter(|y| y.fract() == 0.0 && y.abs() <= f64::from(i32::MAX));
            let rank = coerce_number(raw.rank.as_deref());
            match (non_empty(raw.artist_name), year, rank) {
                (Some(artist_name), Some(year), Some(rank)) => data.entries.push(WrappedEntry {
                    artist_name,
                    year: year as i32,
                    rank,
                    dimension: non_empty(raw.dimension),
                }),
                _ => data.dropped += 1,
            }
        }

        if data.dropped > 0 {
            log::warn!("Dropped {} wrapped rows with missing or non-numeric values", data.dropped);
        }
        Ok(data)
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries
            .iter()
            .map(|e| e.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn unique_artists(&self) -> usize {
        self.entries.iter().map(|e| e.artist_name.as_str()).collect::<HashSet<_>>().len()
    }

    fn by_year(&self) -> BTreeMap<i32, Vec<&WrappedEntry>> {
        let mut map: BTreeMap<i32, Vec<&WrappedEntry>> = BTreeMap::new();
        for e in &self.entries {
            map.entry(e.year).or_default().push(e);
        }
        map
    }
}

/// Count per name, sorted by count descending then name.
fn ranked_counts<'a>(names: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for n in names {
        *counts.entry(n).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Unique artists per year, oldest year first.
pub fn diversity_by_year(data: &WrappedData) -> Vec<(i32, usize)> {
    data.by_year()
        .into_iter()
        .map(|(year, rows)| {
            let unique = rows.iter().map(|e| e.artist_name.as_str()).collect::<HashSet<_>>().len();
            (year, unique)
        })
        .collect()
}

/// (most diverse, least diverse) year; the earlier year wins ties.
pub fn diversity_extremes(diversity: &[(i32, usize)]) -> Option<((i32, usize), (i32, usize))> {
    let first = *diversity.first()?;
    let (most, least) = diversity.iter().skip(1).fold((first, first), |(hi, lo), &d| {
        (if d.1 > hi.1 { d } else { hi }, if d.1 < lo.1 { d } else { lo })
    });
    Some((most, least))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionShare {
    pub year: i32,
    pub dimension: String,
    pub count: usize,
    /// Share of all rows of that year.
    pub percentage: f64,
}

/// Dimension breakdown per year, largest share first within a year.
pub fn dimension_share(data: &WrappedData) -> Vec<DimensionShare> {
    let mut out = Vec::new();
    for (year, rows) in data.by_year() {
        let total = rows.len();
        for (dimension, count) in ranked_counts(rows.iter().filter_map(|e| e.dimension.as_deref())) {
            out.push(DimensionShare {
                year,
                dimension,
                count,
                percentage: count as f64 / total as f64 * 100.0,
            });
        }
    }
    out
}

/// Top `n` artists by song count for each year.
pub fn leaderboard(data: &WrappedData, n: usize) -> Vec<(i32, Vec<(String, usize)>)> {
    data.by_year()
        .into_iter()
        .map(|(year, rows)| {
            let mut top = ranked_counts(rows.iter().map(|e| e.artist_name.as_str()));
            top.truncate(n);
            (year, top)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistYears {
    pub artist: String,
    pub years_present: usize,
    pub total_songs: usize,
}

/// Artists by number of years present, then total songs.
pub fn artist_persistence(data: &WrappedData) -> Vec<ArtistYears> {
    let mut years: HashMap<&str, HashSet<i32>> = HashMap::new();
    let mut songs: HashMap<&str, usize> = HashMap::new();
    for e in &data.entries {
        years.entry(e.artist_name.as_str()).or_default().insert(e.year);
        *songs.entry(e.artist_name.as_str()).or_default() += 1;
    }

    let mut out: Vec<ArtistYears> = years
        .into_iter()
        .map(|(artist, ys)| ArtistYears {
            artist: artist.to_string(),
            years_present: ys.len(),
            total_songs: songs.get(artist).copied().unwrap_or(0),
        })
        .collect();
    out.sort_by(|a, b| {
        b.years_present
            .cmp(&a.years_present)
            .then_with(|| b.total_songs.cmp(&a.total_songs))
            .then_with(|| a.artist.cmp(&b.artist))
    });
    out
}

/// Configured focus artists, or the `n` most persistent when none are set.
pub fn focus_artists(data: &WrappedData, configured: &[String], n: usize) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    artist_persistence(data).into_iter().take(n).map(|a| a.artist).collect()
}

#[derive(Debug, Clone)]
pub struct FocusSeries {
    pub artist: String,
    /// (year, score) for every year in the data.
    pub points: Vec<(i32, f64)>,
}

impl FocusSeries {
    pub fn peak(&self) -> Option<(i32, f64)> {
        self.points
            .iter()
            .copied()
            .fold(None, |best: Option<(i32, f64)>, p| match best {
                Some(b) if b.1 >= p.1 => Some(b),
                _ => Some(p),
            })
    }
}

/// Yearly listening score per focus artist: `songs + (51 − mean rank) / 10`,
/// zero in years the artist is absent. Artists never present are skipped.
pub fn focus_timeline(data: &WrappedData, artists: &[String]) -> Vec<FocusSeries> {
    let years = data.years();
    let mut out = Vec::new();

    for artist in artists {
        let rows: Vec<&WrappedEntry> = data.entries.iter().filter(|e| &e.artist_name == artist).collect();
        if rows.is_empty() {
            log::warn!("No wrapped data for {artist}");
            continue;
        }
        let points: Vec<(i32, f64)> = years
            .iter()
            .map(|&year| {
                let ranks: Vec<f64> = rows.iter().filter(|e| e.year == year).map(|e| e.rank).collect();
                let score = match crate::metrics::mean(&ranks) {
                    Some(avg_rank) => ranks.len() as f64 + (51.0 - avg_rank) / 10.0,
                    None => 0.0,
                };
                (year, score)
            })
            .collect();
        if points.iter().map(|(_, s)| s).sum::<f64>() > 0.0 {
            out.push(FocusSeries { artist: artist.clone(), points });
        }
    }
    out
}
