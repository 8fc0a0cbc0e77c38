use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::db::history::AppendSummary;
use crate::db::{HistoryDb, LiveDb};

/// What an archive run did.
#[derive(Debug, PartialEq)]
pub enum ArchiveOutcome {
    /// The live tables were empty; nothing written.
    NoLiveData,
    /// The day was already archived and the caller declined to replace it.
    Declined,
    Archived(AppendSummary),
}

/// Copy the live tables into the historical store under `date`.
///
/// When `date` is already archived, `confirm_replace` decides whether the
/// existing day is deleted and rewritten. The live snapshot is read in one
/// transaction and written in another, so a partial day is never visible.
pub fn archive_snapshot(
    live: &LiveDb,
    history: &HistoryDb,
    date: NaiveDate,
    timestamp: &str,
    confirm_replace: impl FnOnce(NaiveDate) -> bool,
) -> Result<ArchiveOutcome> {
    let snapshot = live.snapshot().context("Failed to read live snapshot")?;
    if snapshot.is_empty() {
        log::warn!("No live data to archive; run `collect` first");
        return Ok(ArchiveOutcome::NoLiveData);
    }

    let replace = if history.is_archived(date)? {
        if !confirm_replace(date) {
            log::info!("Archive for {date} kept as is");
            return Ok(ArchiveOutcome::Declined);
        }
        true
    } else {
        false
    };

    let summary = history
        .append_snapshot(&snapshot, date, timestamp, replace)
        .with_context(|| format!("Failed to archive snapshot for {date}"))?;

    log::info!(
        "Archived {} tracks, {} artist entries for {date}",
        summary.tracks,
        summary.artists
    );
    Ok(ArchiveOutcome::Archived(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::{artist, track};
    use crate::db::models::TimeRange;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn seeded_live() -> LiveDb {
        let live = LiveDb::open_in_memory().unwrap();
        let tracks = vec![
            track("t1", "Song A", "X", TimeRange::Short, 1, 40),
            track("t2", "Song B", "Y", TimeRange::Short, 2, 70),
        ];
        let artists = vec![
            artist("X", TimeRange::Short, 1, 40, 1.0),
            artist("Y", TimeRange::Short, 1, 70, 2.0),
        ];
        live.store_window(TimeRange::Short, &tracks, &artists).unwrap();
        live
    }

    #[test]
    fn test_empty_live_is_no_op() {
        let live = LiveDb::open_in_memory().unwrap();
        let history = HistoryDb::open_in_memory().unwrap();
        let outcome = archive_snapshot(&live, &history, day(1), "ts", |_| true).unwrap();
        assert_eq!(outcome, ArchiveOutcome::NoLiveData);
        assert!(history.collection_log().unwrap().is_empty());
    }

    #[test]
    fn test_archive_counts_match_live() {
        let live = seeded_live();
        let history = HistoryDb::open_in_memory().unwrap();

        let outcome = archive_snapshot(&live, &history, day(1), "2025-06-01 09:00:00", |_| {
            panic!("no prompt expected for a fresh day")
        })
        .unwrap();
        let ArchiveOutcome::Archived(summary) = outcome else {
            panic!("expected archive");
        };
        assert_eq!(summary.tracks, 2);
        assert!(!summary.replaced);

        let (t, a) = history.count_rows(day(1)).unwrap();
        assert_eq!((t, a), (2, 2));
        let entry = history.log_entry(day(1)).unwrap().unwrap();
        assert_eq!(entry.tracks_collected, t);
        assert_eq!(entry.artists_collected, a);
    }

    #[test]
    fn test_declined_replace_leaves_archive() {
        let live = seeded_live();
        let history = HistoryDb::open_in_memory().unwrap();
        archive_snapshot(&live, &history, day(2), "first", |_| true).unwrap();

        let outcome = archive_snapshot(&live, &history, day(2), "second", |_| false).unwrap();
        assert_eq!(outcome, ArchiveOutcome::Declined);
        assert_eq!(history.log_entry(day(2)).unwrap().unwrap().collection_timestamp, "first");
        assert_eq!(history.count_rows(day(2)).unwrap(), (2, 2));
    }

    #[test]
    fn test_confirmed_replace_rewrites_day() {
        let live = seeded_live();
        let history = HistoryDb::open_in_memory().unwrap();
        archive_snapshot(&live, &history, day(3), "first", |_| true).unwrap();

        // Live window shrinks to one track before the second archive
        live.store_window(
            TimeRange::Short,
            &[track("t1", "Song A", "X", TimeRange::Short, 1, 40)],
            &[artist("X", TimeRange::Short, 1, 40, 1.0)],
        )
        .unwrap();

        let mut asked = None;
        let outcome = archive_snapshot(&live, &history, day(3), "second", |d| {
            asked = Some(d);
            true
        })
        .unwrap();
        assert_eq!(asked, Some(day(3)));
        assert!(matches!(outcome, ArchiveOutcome::Archived(ref s) if s.replaced));
        assert_eq!(history.count_rows(day(3)).unwrap(), (1, 1));
        assert_eq!(history.collection_log().unwrap().len(), 1);
    }
}
