use std::path::Path;

use rusqlite::{Connection, Row, params};

use super::models::{ArtistSnapshot, LiveStats, Snapshot, TimeRange, TrackSnapshot};
use super::{Result, migrate, open_connection, open_memory_connection};

const LIVE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tracks (
        track_id        TEXT NOT NULL,
        track_name      TEXT NOT NULL,
        artist_name     TEXT NOT NULL,
        album_name      TEXT,
        release_date    TEXT,
        popularity      INTEGER NOT NULL,
        duration_ms     INTEGER NOT NULL,
        explicit        INTEGER NOT NULL,
        time_range      TEXT NOT NULL,
        rank_position   INTEGER NOT NULL,
        collected_date  TEXT NOT NULL,
        spotify_url     TEXT,
        PRIMARY KEY (track_id, time_range)
    );

    CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist_name);
    CREATE INDEX IF NOT EXISTS idx_tracks_range ON tracks(time_range, rank_position);

    CREATE TABLE IF NOT EXISTS artists (
        artist_name       TEXT NOT NULL,
        time_range        TEXT NOT NULL,
        track_count       INTEGER NOT NULL,
        total_popularity  INTEGER NOT NULL,
        avg_rank          REAL NOT NULL,
        collected_date    TEXT NOT NULL,
        PRIMARY KEY (artist_name, time_range)
    );
";

pub(super) const TRACK_COLUMNS: &str = "track_id, track_name, artist_name, album_name, release_date,
     popularity, duration_ms, explicit, time_range, rank_position,
     collected_date, spotify_url";

pub(super) const ARTIST_COLUMNS: &str =
    "artist_name, time_range, track_count, total_popularity, avg_rank, collected_date";

/// The live store: always the most recent fetch per look-back window.
pub struct LiveDb {
    pub conn: Connection,
}

impl LiveDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = open_connection(path)?;
        migrate(&conn, LIVE_SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = open_memory_connection()?;
        migrate(&conn, LIVE_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a track row, replacing any row with the same (track_id, time_range).
    pub fn upsert_track(&self, t: &TrackSnapshot) -> Result<()> {
        upsert_track_row(&self.conn, t)
    }

    /// Insert an artist row, replacing any row with the same (artist_name, time_range).
    pub fn upsert_artist(&self, a: &ArtistSnapshot) -> Result<()> {
        upsert_artist_row(&self.conn, a)
    }

    /// Store one window's fetch in a single transaction.
    ///
    /// Every row is upserted, then rows of the same window that were not part
    /// of this fetch are dropped, so the artist aggregates stay derivable from
    /// the track rows.
    pub fn store_window(
        &self,
        range: TimeRange,
        tracks: &[TrackSnapshot],
        artists: &[ArtistSnapshot],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        for t in tracks {
            upsert_track_row(&tx, t)?;
        }
        for a in artists {
            upsert_artist_row(&tx, a)?;
        }

        // Prune leftovers from an older fetch of this window
        tx.execute("CREATE TEMP TABLE IF NOT EXISTS fetched_keys (key TEXT PRIMARY KEY)", [])?;
        tx.execute("DELETE FROM fetched_keys", [])?;
        {
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO fetched_keys (key) VALUES (?1)")?;
            for t in tracks {
                stmt.execute(params![t.track_id])?;
            }
        }
        let stale_tracks = tx.execute(
            "DELETE FROM tracks
             WHERE time_range = ?1 AND track_id NOT IN (SELECT key FROM fetched_keys)",
            params![range],
        )?;

        tx.execute("DELETE FROM fetched_keys", [])?;
        {
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO fetched_keys (key) VALUES (?1)")?;
            for a in artists {
                stmt.execute(params![a.artist_name])?;
            }
        }
        let stale_artists = tx.execute(
            "DELETE FROM artists
             WHERE time_range = ?1 AND artist_name NOT IN (SELECT key FROM fetched_keys)",
            params![range],
        )?;
        tx.execute("DELETE FROM fetched_keys", [])?;

        tx.commit()?;

        if stale_tracks > 0 || stale_artists > 0 {
            log::debug!(
                "{range}: pruned {stale_tracks} stale tracks, {stale_artists} stale artists"
            );
        }
        Ok(())
    }

    /// All live track rows, ordered by window then rank.
    pub fn tracks(&self) -> Result<Vec<TrackSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks ORDER BY time_range, rank_position"
        ))?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    pub fn tracks_for_range(&self, range: TimeRange) -> Result<Vec<TrackSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE time_range = ?1 ORDER BY rank_position"
        ))?;
        let tracks = stmt
            .query_map(params![range], track_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    /// All live artist rows, ordered by window then track count.
    pub fn artists(&self) -> Result<Vec<ArtistSnapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ARTIST_COLUMNS} FROM artists ORDER BY time_range, track_count DESC, artist_name"
        ))?;
        let artists = stmt
            .query_map([], artist_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    /// Read both live tables in one consistent view.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let snapshot = Snapshot {
            tracks: self.tracks()?,
            artists: self.artists()?,
        };
        tx.commit()?;
        Ok(snapshot)
    }

    pub fn stats(&self) -> Result<LiveStats> {
        let (total_tracks, unique_songs, unique_artists, last_collected) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT track_name), COUNT(DISTINCT artist_name),
                    MAX(collected_date)
             FROM tracks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT time_range, COUNT(*) FROM tracks GROUP BY time_range")?;
        let mut windows: Vec<(TimeRange, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        windows.sort_by_key(|(range, _)| range.order());

        Ok(LiveStats {
            total_tracks,
            unique_songs,
            unique_artists,
            windows,
            last_collected,
        })
    }
}

fn upsert_track_row(conn: &Connection, t: &TrackSnapshot) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO tracks (
            track_id, track_name, artist_name, album_name, release_date,
            popularity, duration_ms, explicit, time_range, rank_position,
            collected_date, spotify_url
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(track_id, time_range) DO UPDATE SET
            track_name = excluded.track_name,
            artist_name = excluded.artist_name,
            album_name = excluded.album_name,
            release_date = excluded.release_date,
            popularity = excluded.popularity,
            duration_ms = excluded.duration_ms,
            explicit = excluded.explicit,
            rank_position = excluded.rank_position,
            collected_date = excluded.collected_date,
            spotify_url = excluded.spotify_url",
    )?
    .execute(params![
        t.track_id, t.track_name, t.artist_name, t.album_name, t.release_date,
        t.popularity, t.duration_ms, t.explicit, t.time_range, t.rank_position,
        t.collected_date, t.spotify_url,
    ])?;
    Ok(())
}

fn upsert_artist_row(conn: &Connection, a: &ArtistSnapshot) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO artists (
            artist_name, time_range, track_count, total_popularity, avg_rank, collected_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(artist_name, time_range) DO UPDATE SET
            track_count = excluded.track_count,
            total_popularity = excluded.total_popularity,
            avg_rank = excluded.avg_rank,
            collected_date = excluded.collected_date",
    )?
    .execute(params![
        a.artist_name, a.time_range, a.track_count, a.total_popularity, a.avg_rank,
        a.collected_date,
    ])?;
    Ok(())
}

/// Map a row selected with `TRACK_COLUMNS` (starting at `offset`).
pub(super) fn track_from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<TrackSnapshot> {
    Ok(TrackSnapshot {
        track_id: row.get(offset)?,
        track_name: row.get(offset + 1)?,
        artist_name: row.get(offset + 2)?,
        album_name: row.get(offset + 3)?,
        release_date: row.get(offset + 4)?,
        popularity: row.get(offset + 5)?,
        duration_ms: row.get(offset + 6)?,
        explicit: row.get(offset + 7)?,
        time_range: row.get(offset + 8)?,
        rank_position: row.get(offset + 9)?,
        collected_date: row.get(offset + 10)?,
        spotify_url: row.get(offset + 11)?,
    })
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<TrackSnapshot> {
    track_from_row_at(row, 0)
}

pub(super) fn artist_from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<ArtistSnapshot> {
    Ok(ArtistSnapshot {
        artist_name: row.get(offset)?,
        time_range: row.get(offset + 1)?,
        track_count: row.get(offset + 2)?,
        total_popularity: row.get(offset + 3)?,
        avg_rank: row.get(offset + 4)?,
        collected_date: row.get(offset + 5)?,
    })
}

fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<ArtistSnapshot> {
    artist_from_row_at(row, 0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(id: &str, name: &str, artist: &str, range: TimeRange, rank: i64, pop: i64) -> TrackSnapshot {
        TrackSnapshot {
            track_id: id.to_string(),
            track_name: name.to_string(),
            artist_name: artist.to_string(),
            album_name: Some(format!("{name} (Album)")),
            release_date: Some("2019-06-14".to_string()),
            popularity: pop,
            duration_ms: 215_000,
            explicit: false,
            time_range: range,
            rank_position: rank,
            collected_date: "2025-01-10 09:00:00".to_string(),
            spotify_url: Some(format!("https://open.spotify.com/track/{id}")),
        }
    }

    pub(crate) fn artist(name: &str, range: TimeRange, count: i64, total_pop: i64, avg_rank: f64) -> ArtistSnapshot {
        ArtistSnapshot {
            artist_name: name.to_string(),
            time_range: range,
            track_count: count,
            total_popularity: total_pop,
            avg_rank,
            collected_date: "2025-01-10 09:00:00".to_string(),
        }
    }

    #[test]
    fn test_upsert_track_replaces_same_key() {
        let db = LiveDb::open_in_memory().unwrap();
        let mut t = track("t1", "Heartbeats", "The Knife", TimeRange::Short, 1, 40);
        db.upsert_track(&t).unwrap();

        t.popularity = 77;
        db.upsert_track(&t).unwrap();

        let tracks = db.tracks().unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].popularity, 77);
    }

    #[test]
    fn test_same_track_different_windows_kept() {
        let db = LiveDb::open_in_memory().unwrap();
        db.upsert_track(&track("t1", "Heartbeats", "The Knife", TimeRange::Short, 1, 40)).unwrap();
        db.upsert_track(&track("t1", "Heartbeats", "The Knife", TimeRange::Long, 9, 40)).unwrap();
        assert_eq!(db.tracks().unwrap().len(), 2);
        assert_eq!(db.tracks_for_range(TimeRange::Long).unwrap()[0].rank_position, 9);
    }

    #[test]
    fn test_upsert_artist_replaces_same_key() {
        let db = LiveDb::open_in_memory().unwrap();
        db.upsert_artist(&artist("The Knife", TimeRange::Short, 2, 80, 3.0)).unwrap();
        db.upsert_artist(&artist("The Knife", TimeRange::Short, 3, 120, 4.0)).unwrap();
        let artists = db.artists().unwrap();
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].track_count, 3);
        assert!((artists[0].avg_rank - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_store_window_prunes_stale_rows_of_that_window_only() {
        let db = LiveDb::open_in_memory().unwrap();
        db.store_window(
            TimeRange::Short,
            &[
                track("a", "A", "X", TimeRange::Short, 1, 50),
                track("b", "B", "Y", TimeRange::Short, 2, 50),
            ],
            &[artist("X", TimeRange::Short, 1, 50, 1.0), artist("Y", TimeRange::Short, 1, 50, 2.0)],
        )
        .unwrap();
        db.store_window(
            TimeRange::Long,
            &[track("b", "B", "Y", TimeRange::Long, 1, 50)],
            &[artist("Y", TimeRange::Long, 1, 50, 1.0)],
        )
        .unwrap();

        // Refetch short_term: "b" dropped out
        db.store_window(
            TimeRange::Short,
            &[track("a", "A", "X", TimeRange::Short, 1, 60)],
            &[artist("X", TimeRange::Short, 1, 60, 1.0)],
        )
        .unwrap();

        let short = db.tracks_for_range(TimeRange::Short).unwrap();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].track_id, "a");
        assert_eq!(db.tracks_for_range(TimeRange::Long).unwrap().len(), 1);

        let artists = db.artists().unwrap();
        assert_eq!(artists.len(), 2);
        assert!(artists.iter().any(|a| a.artist_name == "Y" && a.time_range == TimeRange::Long));
        assert!(!artists.iter().any(|a| a.artist_name == "Y" && a.time_range == TimeRange::Short));
    }

    #[test]
    fn test_stats() {
        let db = LiveDb::open_in_memory().unwrap();
        assert_eq!(db.stats().unwrap().total_tracks, 0);

        db.upsert_track(&track("a", "A", "X", TimeRange::Short, 1, 50)).unwrap();
        db.upsert_track(&track("a", "A", "X", TimeRange::Long, 4, 50)).unwrap();
        db.upsert_track(&track("b", "B", "Y", TimeRange::Long, 1, 50)).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_tracks, 3);
        assert_eq!(stats.unique_songs, 2);
        assert_eq!(stats.unique_artists, 2);
        assert_eq!(stats.windows, vec![(TimeRange::Long, 2), (TimeRange::Short, 1)]);
    }
}
