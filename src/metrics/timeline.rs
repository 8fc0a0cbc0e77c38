use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::db::models::{HistoricalArtist, TimeRange};

/// One archived observation of an artist within a window.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub avg_rank: f64,
    pub track_count: i64,
}

#[derive(Debug, Clone)]
pub struct ArtistTimeline {
    pub artist: String,
    pub range: TimeRange,
    /// Oldest collection first.
    pub points: Vec<TimelinePoint>,
}

/// Per (artist, window) series of archived rank and track count.
///
/// Only the `top` artists by summed track count over the whole archive are
/// kept. Series are ordered by that total, then by window (oldest first).
pub fn historical_timeline(rows: &[HistoricalArtist], top: usize) -> Vec<ArtistTimeline> {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for r in rows {
        *totals.entry(r.artist.artist_name.as_str()).or_default() += r.artist.track_count;
    }
    let mut ranked: Vec<(&str, i64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(top);

    let mut out = Vec::new();
    for (artist, _) in ranked {
        for range in TimeRange::CHRONOLOGICAL {
            let points: BTreeMap<NaiveDate, TimelinePoint> = rows
                .iter()
                .filter(|r| r.artist.artist_name == artist && r.artist.time_range == range)
                .map(|r| {
                    (
                        r.stamp.date,
                        TimelinePoint {
                            date: r.stamp.date,
                            avg_rank: r.artist.avg_rank,
                            track_count: r.artist.track_count,
                        },
                    )
                })
                .collect();
            if !points.is_empty() {
                out.push(ArtistTimeline {
                    artist: artist.to_string(),
                    range,
                    points: points.into_values().collect(),
                });
            }
        }
    }
    out
}

/// Distinct archived dates in `rows`, oldest first.
pub fn collection_dates(rows: &[HistoricalArtist]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = rows.iter().map(|r| r.stamp.date).collect();
    dates.sort();
    dates.dedup();
    dates
}
