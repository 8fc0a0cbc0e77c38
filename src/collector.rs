use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::db::LiveDb;
use crate::db::models::{ArtistSnapshot, TimeRange, TrackSnapshot};

/// One ranked item as returned by the upstream service.
#[derive(Debug, Clone)]
pub struct TopTrack {
    pub id: Option<String>,
    pub name: String,
    /// Credited artists, primary first.
    pub artists: Vec<String>,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub popularity: i64,
    pub duration_ms: i64,
    pub explicit: bool,
    pub url: Option<String>,
}

/// Upstream source of ranked top tracks per look-back window.
pub trait TopTracksSource {
    fn top_tracks(&self, range: TimeRange, limit: usize) -> Result<Vec<TopTrack>>;
}

/// Outcome of one window within a collection run.
#[derive(Debug)]
pub struct WindowReport {
    pub range: TimeRange,
    pub tracks: usize,
    pub artists: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

/// Result of a collection run.
#[derive(Debug)]
pub struct CollectResult {
    pub windows: Vec<WindowReport>,
}

impl CollectResult {
    pub fn total_tracks(&self) -> usize {
        self.windows.iter().map(|w| w.tracks).sum()
    }

    pub fn failed_windows(&self) -> usize {
        self.windows.iter().filter(|w| w.error.is_some()).count()
    }
}

/// Fetch every look-back window and store it in the live tables.
///
/// A failing window is reported and skipped; the remaining windows still run.
/// Only storage errors abort the run.
pub fn collect_top_tracks(
    db: &LiveDb,
    source: &dyn TopTracksSource,
    limit: usize,
    collected_date: &str,
) -> Result<CollectResult> {
    let pb = ProgressBar::new(TimeRange::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} windows {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut windows = Vec::with_capacity(TimeRange::ALL.len());

    for range in TimeRange::ALL {
        pb.set_message(range.description());

        let report = match source.top_tracks(range, limit) {
            Ok(items) => {
                let window = build_window(range, &items, collected_date);
                db.store_window(range, &window.tracks, &window.artists)
                    .with_context(|| format!("Failed to store {range}"))?;
                log::info!(
                    "{range}: {} tracks, {} artists",
                    window.tracks.len(),
                    window.artists.len()
                );
                WindowReport {
                    range,
                    tracks: window.tracks.len(),
                    artists: window.artists.len(),
                    skipped: window.skipped,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("Failed to fetch {range}: {e:#}");
                WindowReport {
                    range,
                    tracks: 0,
                    artists: 0,
                    skipped: 0,
                    error: Some(format!("{e:#}")),
                }
            }
        };

        windows.push(report);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(CollectResult { windows })
}

/// Rows built from one window's response.
#[derive(Debug, Default)]
pub struct WindowRows {
    pub tracks: Vec<TrackSnapshot>,
    pub artists: Vec<ArtistSnapshot>,
    /// Items dropped for lacking an id or an artist, or repeating an earlier id.
    pub skipped: usize,
}

/// Build track rows (rank = 1-based response position) and per-artist
/// aggregates for a single window.
pub fn build_window(range: TimeRange, items: &[TopTrack], collected_date: &str) -> WindowRows {
    let mut rows = WindowRows::default();
    // artist -> (count, total popularity, rank sum), in first-seen order
    let mut stats: HashMap<&str, (i64, i64, i64)> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (idx, item) in items.iter().enumerate() {
        let rank = idx as i64 + 1;

        let (Some(id), Some(artist)) = (item.id.as_deref(), item.artists.first()) else {
            log::warn!("{range}: skipping '{}' at rank {rank} (no id or artist)", item.name);
            rows.skipped += 1;
            continue;
        };
        // One row per (track, window); the first listing keeps its rank
        if !seen.insert(id) {
            log::warn!("{range}: skipping repeat of '{}' at rank {rank}", item.name);
            rows.skipped += 1;
            continue;
        }

        rows.tracks.push(TrackSnapshot {
            track_id: id.to_string(),
            track_name: item.name.clone(),
            artist_name: artist.clone(),
            album_name: item.album_name.clone(),
            release_date: item.release_date.clone(),
            popularity: item.popularity,
            duration_ms: item.duration_ms,
            explicit: item.explicit,
            time_range: range,
            rank_position: rank,
            collected_date: collected_date.to_string(),
            spotify_url: item.url.clone(),
        });

        let entry = stats.entry(artist.as_str()).or_insert_with(|| {
            order.push(artist.as_str());
            (0, 0, 0)
        });
        entry.0 += 1;
        entry.1 += item.popularity;
        entry.2 += rank;
    }

    rows.artists = order
        .into_iter()
        .map(|name| {
            let (count, total_pop, rank_sum) = stats[name];
            ArtistSnapshot {
                artist_name: name.to_string(),
                time_range: range,
                track_count: count,
                total_popularity: total_pop,
                avg_rank: rank_sum as f64 / count as f64,
                collected_date: collected_date.to_string(),
            }
        })
        .collect();

    rows
}
