use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use super::live::{ARTIST_COLUMNS, TRACK_COLUMNS, artist_from_row_at, track_from_row_at};
use super::models::{
    CollectionLogEntry, CollectionStamp, HistoricalArtist, HistoricalTrack, Snapshot,
};
use super::{DbError, Result, migrate, open_connection, open_memory_connection};

const HISTORY_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS historical_tracks (
        collection_date   TEXT NOT NULL,
        collection_month  TEXT NOT NULL,
        collection_year   INTEGER NOT NULL,
        track_id          TEXT NOT NULL,
        track_name        TEXT NOT NULL,
        artist_name       TEXT NOT NULL,
        album_name        TEXT,
        release_date      TEXT,
        popularity        INTEGER NOT NULL,
        duration_ms       INTEGER NOT NULL,
        explicit          INTEGER NOT NULL,
        time_range        TEXT NOT NULL,
        rank_position     INTEGER NOT NULL,
        collected_date    TEXT NOT NULL,
        spotify_url       TEXT,
        PRIMARY KEY (collection_date, track_id, time_range)
    );

    CREATE INDEX IF NOT EXISTS idx_hist_tracks_artist ON historical_tracks(artist_name);

    CREATE TABLE IF NOT EXISTS historical_artists (
        collection_date   TEXT NOT NULL,
        collection_month  TEXT NOT NULL,
        collection_year   INTEGER NOT NULL,
        artist_name       TEXT NOT NULL,
        time_range        TEXT NOT NULL,
        track_count       INTEGER NOT NULL,
        total_popularity  INTEGER NOT NULL,
        avg_rank          REAL NOT NULL,
        collected_date    TEXT NOT NULL,
        PRIMARY KEY (collection_date, artist_name, time_range)
    );

    CREATE TABLE IF NOT EXISTS collection_log (
        collection_date       TEXT PRIMARY KEY,
        collection_timestamp  TEXT NOT NULL,
        tracks_collected      INTEGER NOT NULL,
        artists_collected     INTEGER NOT NULL,
        notes                 TEXT NOT NULL
    );
";

/// Counts written for one archived day.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendSummary {
    pub date: NaiveDate,
    pub tracks: usize,
    pub artists: usize,
    /// True when an earlier archive of the same day was deleted first.
    pub replaced: bool,
}

/// The historical store: one immutable copy of the live tables per archived day.
pub struct HistoryDb {
    pub conn: Connection,
}

impl HistoryDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_connection(path)?;
        migrate(&conn, HISTORY_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = open_memory_connection()?;
        migrate(&conn, HISTORY_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Whether a collection log entry exists for `date`.
    pub fn is_archived(&self, date: NaiveDate) -> Result<bool> {
        is_archived(&self.conn, date)
    }

    /// Archive `snapshot` under `date` as one atomic unit.
    ///
    /// Fails with [`DbError::AlreadyArchived`] when the day already exists and
    /// `replace` is false. With `replace`, every historical row and the log
    /// entry for that day are deleted before the new copy is inserted.
    pub fn append_snapshot(
        &self,
        snapshot: &Snapshot,
        date: NaiveDate,
        timestamp: &str,
        replace: bool,
    ) -> Result<AppendSummary> {
        let stamp = CollectionStamp::for_date(date);
        let tx = self.conn.unchecked_transaction()?;

        let existed = is_archived(&tx, date)?;
        if existed {
            if !replace {
                return Err(DbError::AlreadyArchived(date));
            }
            let tracks = tx.execute("DELETE FROM historical_tracks WHERE collection_date = ?1", params![date])?;
            let artists = tx.execute("DELETE FROM historical_artists WHERE collection_date = ?1", params![date])?;
            tx.execute("DELETE FROM collection_log WHERE collection_date = ?1", params![date])?;
            log::info!("Replacing archive for {date} ({tracks} tracks, {artists} artists removed)");
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO historical_tracks (
                    collection_date, collection_month, collection_year,
                    track_id, track_name, artist_name, album_name, release_date,
                    popularity, duration_ms, explicit, time_range, rank_position,
                    collected_date, spotify_url
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for t in &snapshot.tracks {
                stmt.execute(params![
                    stamp.date, stamp.month, stamp.year,
                    t.track_id, t.track_name, t.artist_name, t.album_name, t.release_date,
                    t.popularity, t.duration_ms, t.explicit, t.time_range, t.rank_position,
                    t.collected_date, t.spotify_url,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO historical_artists (
                    collection_date, collection_month, collection_year,
                    artist_name, time_range, track_count, total_popularity, avg_rank,
                    collected_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for a in &snapshot.artists {
                stmt.execute(params![
                    stamp.date, stamp.month, stamp.year,
                    a.artist_name, a.time_range, a.track_count, a.total_popularity, a.avg_rank,
                    a.collected_date,
                ])?;
            }
        }

        let tracks = snapshot.tracks.len();
        let artists = snapshot.artists.len();
        tx.execute(
            "INSERT INTO collection_log (
                collection_date, collection_timestamp, tracks_collected, artists_collected, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date,
                timestamp,
                tracks as i64,
                artists as i64,
                format!("Automated collection - {tracks} tracks, {artists} artist entries"),
            ],
        )?;

        tx.commit()?;
        Ok(AppendSummary { date, tracks, artists, replaced: existed })
    }

    /// Collection log, newest first.
    pub fn collection_log(&self) -> Result<Vec<CollectionLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection_date, collection_timestamp, tracks_collected, artists_collected, notes
             FROM collection_log ORDER BY collection_date DESC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(CollectionLogEntry {
                    collection_date: row.get(0)?,
                    collection_timestamp: row.get(1)?,
                    tracks_collected: row.get(2)?,
                    artists_collected: row.get(3)?,
                    notes: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn log_entry(&self, date: NaiveDate) -> Result<Option<CollectionLogEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT collection_date, collection_timestamp, tracks_collected, artists_collected, notes
                 FROM collection_log WHERE collection_date = ?1",
                params![date],
                |row| {
                    Ok(CollectionLogEntry {
                        collection_date: row.get(0)?,
                        collection_timestamp: row.get(1)?,
                        tracks_collected: row.get(2)?,
                        artists_collected: row.get(3)?,
                        notes: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Archived track rows for one day, as a snapshot payload.
    pub fn tracks_on(&self, date: NaiveDate) -> Result<Snapshot> {
        let tracks = self
            .query_tracks("WHERE collection_date = ?1", params![date])?
            .into_iter()
            .map(|h| h.track)
            .collect();
        let artists = self
            .query_artists("WHERE collection_date = ?1", params![date])?
            .into_iter()
            .map(|h| h.artist)
            .collect();
        Ok(Snapshot { tracks, artists })
    }

    /// Every archived track row, oldest day first.
    pub fn historical_tracks(&self) -> Result<Vec<HistoricalTrack>> {
        self.query_tracks("", [])
    }

    /// Every archived artist row, oldest day first.
    pub fn historical_artists(&self) -> Result<Vec<HistoricalArtist>> {
        self.query_artists("", [])
    }

    pub fn count_rows(&self, date: NaiveDate) -> Result<(i64, i64)> {
        let tracks = self.conn.query_row(
            "SELECT COUNT(*) FROM historical_tracks WHERE collection_date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        let artists = self.conn.query_row(
            "SELECT COUNT(*) FROM historical_artists WHERE collection_date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        Ok((tracks, artists))
    }

    fn query_tracks<P: rusqlite::Params>(&self, filter: &str, p: P) -> Result<Vec<HistoricalTrack>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT collection_date, collection_month, collection_year, {TRACK_COLUMNS}
             FROM historical_tracks {filter}
             ORDER BY collection_date, time_range, rank_position"
        ))?;
        let rows = stmt
            .query_map(p, |row| {
                Ok(HistoricalTrack {
                    stamp: CollectionStamp {
                        date: row.get(0)?,
                        month: row.get(1)?,
                        year: row.get(2)?,
                    },
                    track: track_from_row_at(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_artists<P: rusqlite::Params>(&self, filter: &str, p: P) -> Result<Vec<HistoricalArtist>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT collection_date, collection_month, collection_year, {ARTIST_COLUMNS}
             FROM historical_artists {filter}
             ORDER BY collection_date, time_range, track_count DESC"
        ))?;
        let rows = stmt
            .query_map(p, |row| {
                Ok(HistoricalArtist {
                    stamp: CollectionStamp {
                        date: row.get(0)?,
                        month: row.get(1)?,
                        year: row.get(2)?,
                    },
                    artist: artist_from_row_at(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn is_archived(conn: &Connection, date: NaiveDate) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM collection_log WHERE collection_date = ?1",
        params![date],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::{artist, track};
    use crate::db::models::TimeRange;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    fn snapshot(n: usize) -> Snapshot {
        let tracks = (0..n)
            .map(|i| track(&format!("t{i}"), &format!("Song {i}"), "Artist", TimeRange::Short, i as i64 + 1, 50))
            .collect();
        Snapshot {
            tracks,
            artists: vec![artist("Artist", TimeRange::Short, n as i64, 50 * n as i64, 2.0)],
        }
    }

    #[test]
    fn test_append_fresh_day() {
        let db = HistoryDb::open_in_memory().unwrap();
        let summary = db.append_snapshot(&snapshot(3), day(1), "2025-02-01 10:00:00", false).unwrap();
        assert_eq!(summary.tracks, 3);
        assert_eq!(summary.artists, 1);
        assert!(!summary.replaced);

        assert!(db.is_archived(day(1)).unwrap());
        assert_eq!(db.count_rows(day(1)).unwrap(), (3, 1));

        let entry = db.log_entry(day(1)).unwrap().unwrap();
        assert_eq!(entry.tracks_collected, 3);
        assert_eq!(entry.artists_collected, 1);
        assert_eq!(entry.notes, "Automated collection - 3 tracks, 1 artist entries");
    }

    #[test]
    fn test_append_existing_day_without_replace_fails_and_changes_nothing() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.append_snapshot(&snapshot(3), day(1), "2025-02-01 10:00:00", false).unwrap();

        let err = db.append_snapshot(&snapshot(5), day(1), "2025-02-01 11:00:00", false).unwrap_err();
        assert!(matches!(err, DbError::AlreadyArchived(d) if d == day(1)));

        assert_eq!(db.count_rows(day(1)).unwrap(), (3, 1));
        let entry = db.log_entry(day(1)).unwrap().unwrap();
        assert_eq!(entry.collection_timestamp, "2025-02-01 10:00:00");
    }

    #[test]
    fn test_replace_is_full_day_replace() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.append_snapshot(&snapshot(5), day(1), "2025-02-01 10:00:00", false).unwrap();
        db.append_snapshot(&snapshot(2), day(2), "2025-02-02 10:00:00", false).unwrap();

        let summary = db.append_snapshot(&snapshot(3), day(1), "2025-02-01 12:00:00", true).unwrap();
        assert!(summary.replaced);

        assert_eq!(db.count_rows(day(1)).unwrap(), (3, 1));
        // Other days untouched
        assert_eq!(db.count_rows(day(2)).unwrap(), (2, 1));
        assert_eq!(db.collection_log().unwrap().len(), 2);
    }

    #[test]
    fn test_tracks_on_and_history_order() {
        let db = HistoryDb::open_in_memory().unwrap();
        db.append_snapshot(&snapshot(2), day(3), "2025-02-03 10:00:00", false).unwrap();
        db.append_snapshot(&snapshot(1), day(1), "2025-02-01 10:00:00", false).unwrap();

        let day3 = db.tracks_on(day(3)).unwrap();
        assert_eq!(day3.tracks.len(), 2);
        assert_eq!(day3.artists.len(), 1);

        let all = db.historical_tracks().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].stamp.date, day(1));
        assert_eq!(all[0].stamp.month, "2025-02");

        let log = db.collection_log().unwrap();
        assert_eq!(log[0].collection_date, day(3));
    }
}
