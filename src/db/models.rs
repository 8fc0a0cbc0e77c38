use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use super::DbError;

/// One of the upstream service's fixed look-back windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TimeRange {
    #[serde(rename = "short_term")]
    Short,
    #[serde(rename = "medium_term")]
    Medium,
    #[serde(rename = "long_term")]
    Long,
}

impl TimeRange {
    /// Collection order: the order windows are fetched in.
    pub const ALL: [TimeRange; 3] = [TimeRange::Short, TimeRange::Medium, TimeRange::Long];

    /// Chronological order: oldest window first.
    pub const CHRONOLOGICAL: [TimeRange; 3] =
        [TimeRange::Long, TimeRange::Medium, TimeRange::Short];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short_term",
            Self::Medium => "medium_term",
            Self::Long => "long_term",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Short => "Last 4 weeks",
            Self::Medium => "Last 6 months",
            Self::Long => "Several years",
        }
    }

    /// Position on the time axis used for trend regression (long=1, medium=2, short=3).
    pub fn order(&self) -> u8 {
        match self {
            Self::Long => 1,
            Self::Medium => 2,
            Self::Short => 3,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" | "short" => Ok(Self::Short),
            "medium_term" | "medium" => Ok(Self::Medium),
            "long_term" | "long" => Ok(Self::Long),
            other => Err(DbError::InvalidValue(format!("unknown time range '{other}'"))),
        }
    }
}

impl ToSql for TimeRange {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TimeRange {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: DbError| FromSqlError::Other(Box::new(e)))
    }
}

/// A track row as held in the live `tracks` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    /// Upstream release date; often partial ("1999", "1999-05").
    pub release_date: Option<String>,
    pub popularity: i64,
    pub duration_ms: i64,
    pub explicit: bool,
    pub time_range: TimeRange,
    /// 1-based position within the window.
    pub rank_position: i64,
    pub collected_date: String,
    pub spotify_url: Option<String>,
}

/// Per-artist aggregate for one window, as held in the live `artists` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSnapshot {
    pub artist_name: String,
    pub time_range: TimeRange,
    pub track_count: i64,
    pub total_popularity: i64,
    pub avg_rank: f64,
    pub collected_date: String,
}

/// Full contents of the live tables at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tracks: Vec<TrackSnapshot>,
    pub artists: Vec<ArtistSnapshot>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Date key stamped onto every archived row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStamp {
    pub date: NaiveDate,
    /// `YYYY-MM`
    pub month: String,
    pub year: i32,
}

impl CollectionStamp {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            month: date.format("%Y-%m").to_string(),
            year: date.year(),
        }
    }
}

/// A track row from `historical_tracks`.
#[derive(Debug, Clone)]
pub struct HistoricalTrack {
    pub stamp: CollectionStamp,
    pub track: TrackSnapshot,
}

/// An artist row from `historical_artists`.
#[derive(Debug, Clone)]
pub struct HistoricalArtist {
    pub stamp: CollectionStamp,
    pub artist: ArtistSnapshot,
}

/// One archived day in `collection_log`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionLogEntry {
    pub collection_date: NaiveDate,
    pub collection_timestamp: String,
    pub tracks_collected: i64,
    pub artists_collected: i64,
    pub notes: String,
}

/// Live-table counts for the summary screen.
#[derive(Debug, Default)]
pub struct LiveStats {
    pub total_tracks: i64,
    pub unique_songs: i64,
    pub unique_artists: i64,
    pub windows: Vec<(TimeRange, i64)>,
    pub last_collected: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_round_trip_strings() {
        for range in TimeRange::ALL {
            assert_eq!(range.as_str().parse::<TimeRange>().unwrap(), range);
        }
        assert_eq!("short".parse::<TimeRange>().unwrap(), TimeRange::Short);
        assert!("yearly".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_time_range_order() {
        assert_eq!(TimeRange::Long.order(), 1);
        assert_eq!(TimeRange::Medium.order(), 2);
        assert_eq!(TimeRange::Short.order(), 3);
        let orders: Vec<u8> = TimeRange::CHRONOLOGICAL.iter().map(|r| r.order()).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_collection_stamp() {
        let stamp = CollectionStamp::for_date(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(stamp.month, "2025-03");
        assert_eq!(stamp.year, 2025);
    }
}
