//! HTML dashboards and CSV export.
//!
//! Page builders are pure functions from metric input to a [`Page`]; the
//! `write_*` functions render them into the output directory.

pub mod chart;
pub mod html;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::db::models::{ArtistSnapshot, HistoricalArtist, TimeRange, TrackSnapshot};
use crate::metrics::identity::{self, IdentitySignals, MoodSignals, SongCategory};
use crate::metrics::psychology;
use crate::metrics::stats::{self, TestResult};
use crate::metrics::timeline;
use crate::metrics::trends;
use crate::metrics::{duration_minutes, group_songs, release_year};
use crate::wrapped::{self, WrappedData};

use chart::{Annotation, Chart, ChartKind, Point, Series};
use html::{Page, Table};

/// Artists plotted on the historical timeline.
const TIMELINE_ARTISTS: usize = 8;

fn fmt1(v: f64) -> String {
    format!("{v:.1}")
}

fn opt1(v: Option<f64>) -> String {
    v.map(fmt1).unwrap_or_else(|| "n/a".to_string())
}

fn song_label(track: &str, artist: &str) -> String {
    format!("{track} - {artist}")
}

// --- Live dashboards ---

pub fn artist_dashboard(tracks: &[TrackSnapshot], artists: &[ArtistSnapshot]) -> Page {
    let overview = trends::overview(tracks, artists);
    let mut page = Page::new("Artist Dashboard");
    page.stats(vec![
        (overview.total_entries.to_string(), "Track entries".into()),
        (overview.unique_songs.to_string(), "Unique songs".into()),
        (overview.unique_artists.to_string(), "Unique artists".into()),
    ]);

    page.heading("Top artists per window");
    for (range, top) in &overview.per_window {
        page.chart(
            Chart::new(ChartKind::HorizontalBar, format!("{} ({})", range.description(), range))
                .axes("Tracks", "")
                .categories(top.iter().map(|a| a.artist_name.clone()))
                .series(Series::from_values("Tracks", top.iter().map(|a| a.track_count as f64))),
        );
    }

    page.heading("Overall top artists");
    let top = &overview.top_artists;
    page.chart(
        Chart::new(ChartKind::HorizontalBar, "Tracks across all windows")
            .axes("Tracks", "")
            .categories(top.iter().map(|a| a.artist.clone()))
            .series(Series::from_values("Tracks", top.iter().map(|a| a.total_tracks as f64))),
    );
    page.chart(
        Chart::new(ChartKind::Bar, "Cross-window consistency")
            .axes("", "Windows present")
            .y_range(0.0, 3.0)
            .categories(top.iter().map(|a| a.artist.clone()))
            .series(Series::from_values("Windows", top.iter().map(|a| a.windows as f64))),
    );

    page.heading("Time window comparison");
    let mut comparison = Chart::new(ChartKind::Bar, "Tracks per window for the overall top artists")
        .axes("", "Tracks")
        .categories(top.iter().map(|a| a.artist.clone()));
    for range in TimeRange::CHRONOLOGICAL {
        let values = top.iter().map(|a| {
            artists
                .iter()
                .find(|s| s.time_range == range && s.artist_name == a.artist)
                .map_or(0.0, |s| s.track_count as f64)
        });
        comparison = comparison.series(Series::from_values(range.description(), values));
    }
    page.chart(comparison);

    let mut table = Table::new(["Artist", "Tracks", "Windows", "Avg rank"]);
    for a in top {
        table.row(vec![
            a.artist.clone(),
            a.total_tracks.to_string(),
            a.windows.to_string(),
            fmt1(a.avg_rank),
        ]);
    }
    page.table(table);
    page
}

pub fn song_dashboard(tracks: &[TrackSnapshot]) -> Page {
    let mut page = Page::new("Song Dashboard");

    page.heading("Song consistency");
    let survivors = trends::song_survivors(tracks);
    let shown: Vec<_> = survivors.iter().take(15).collect();
    page.chart(
        Chart::new(ChartKind::HorizontalBar, "Songs present in more than one window")
            .axes("Average rank", "")
            .categories(shown.iter().map(|s| song_label(&s.track_name, &s.artist_name)))
            .series(Series::from_values("Average rank", shown.iter().map(|s| s.avg_rank))),
    );

    page.heading("Popularity vs duration");
    let mut scatter = Chart::new(ChartKind::Scatter, "Popularity vs duration")
        .axes("Duration (minutes)", "Popularity")
        .y_range(0.0, 100.0);
    for range in TimeRange::CHRONOLOGICAL {
        let points: Vec<Point> = tracks
            .iter()
            .filter(|t| t.time_range == range)
            .map(|t| Point::labeled(duration_minutes(t), t.popularity as f64, song_label(&t.track_name, &t.artist_name)))
            .collect();
        scatter = scatter.series(Series::new(range.description(), points));
    }
    page.chart(scatter);

    page.heading("Release year timeline");
    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for group in group_songs(tracks) {
        if let Some(year) = group.rows.first().and_then(|t| release_year(t)) {
            *per_year.entry(year).or_default() += 1;
        }
    }
    page.chart(
        Chart::new(ChartKind::Line, "Songs by release year")
            .axes("Release year", "Songs")
            .series(Series::new(
                "Songs",
                per_year.iter().map(|(&y, &n)| Point::new(y as f64, n as f64)).collect(),
            )),
    );

    page.heading("Top songs by period");
    let mut table = Table::new(["Window", "Rank", "Song", "Artist", "Popularity"]);
    for range in TimeRange::ALL {
        let mut rows: Vec<&TrackSnapshot> = tracks.iter().filter(|t| t.time_range == range).collect();
        rows.sort_by_key(|t| t.rank_position);
        for t in rows.into_iter().take(5) {
            table.row(vec![
                range.description().to_string(),
                t.rank_position.to_string(),
                t.track_name.clone(),
                t.artist_name.clone(),
                t.popularity.to_string(),
            ]);
        }
    }
    page.table(table);
    page
}

pub fn trend_analysis(tracks: &[TrackSnapshot], reference_year: i32) -> Page {
    let mut page = Page::new("Trend Analysis");

    page.heading("Song persistence");
    match trends::persistence_analysis(tracks, reference_year) {
        Some(p) => {
            page.stats(vec![
                (p.unique_songs.to_string(), "Unique songs".into()),
                (p.persistent_songs.to_string(), "Persistent songs".into()),
                (format!("{:.1}%", p.persistence_rate), "Persistence rate".into()),
            ]);
            let mut table = Table::new(["Group", "Songs", "Avg popularity", "Avg duration (min)", "Avg age (years)", "Avg rank"]);
            for (name, profile) in [("Persistent", &p.persistent), ("Single window", &p.non_persistent)] {
                if let Some(s) = profile {
                    table.row(vec![
                        name.to_string(),
                        s.songs.to_string(),
                        fmt1(s.avg_popularity),
                        format!("{:.2}", s.avg_duration_minutes),
                        opt1(s.avg_song_age),
                        fmt1(s.avg_rank),
                    ]);
                }
            }
            page.table(table);
        }
        None => {
            page.note("No tracks to analyse.");
        }
    }

    page.heading("Artist evolution trends");
    let artist_trends = trends::artist_trends(tracks);
    let shown: Vec<_> = artist_trends.iter().take(15).collect();
    page.chart(
        Chart::new(ChartKind::HorizontalBar, "Rank slope (negative = climbing)")
            .axes("Slope", "")
            .categories(shown.iter().map(|t| t.artist.clone()))
            .series(Series::from_values("Slope", shown.iter().map(|t| t.slope)))
            .annotate(Annotation::VLine { x: 0.0, text: String::new() }),
    );
    let mut table = Table::new(["Artist", "Direction", "Slope", "Windows", "Tracks"]);
    for t in &artist_trends {
        table.row(vec![
            t.artist.clone(),
            t.direction.to_string(),
            format!("{:.2}", t.slope),
            t.windows.to_string(),
            t.track_count.to_string(),
        ]);
    }
    page.table(table);

    page.heading("Era distribution");
    let eras = trends::era_analysis(tracks);
    page.chart(
        Chart::new(ChartKind::Bar, "Tracks per release era")
            .axes("Era", "Tracks")
            .categories(eras.iter().map(|e| e.era.label()))
            .series(Series::from_values("Tracks", eras.iter().map(|e| e.track_count as f64))),
    );

    page.heading("Ranking consistency vs popularity");
    let survivors = trends::song_survivors(tracks);
    page.chart(
        Chart::new(ChartKind::Scatter, "Rank spread vs popularity (repeated songs)")
            .axes("Average popularity", "Worst minus best rank")
            .series(Series::new(
                "Songs",
                survivors
                    .iter()
                    .map(|s| Point::labeled(s.avg_popularity, s.consistency as f64, song_label(&s.track_name, &s.artist_name)))
                    .collect(),
            )),
    );
    page
}

pub fn identity_vs_mood(tracks: &[TrackSnapshot], reference_year: i32) -> Page {
    let mut page = Page::new("Identity vs Mood Analysis");
    let (Some(id), Some(mood)) = (
        IdentitySignals::compute(tracks),
        MoodSignals::compute(tracks, reference_year),
    ) else {
        page.note("No tracks to analyse.");
        return page;
    };

    match identity::classify(&id, &mood) {
        Some(c) => {
            page.stats(vec![
                (c.driver.to_string(), "Primary driver".into()),
                (fmt1(c.identity_score), "Identity score".into()),
                (fmt1(c.mood_score), "Mood score".into()),
                (fmt1(c.confidence), "Confidence gap".into()),
            ]);
            page.chart(
                Chart::new(ChartKind::Bar, "Identity vs mood score")
                    .y_range(0.0, 100.0)
                    .categories(["Identity", "Mood"])
                    .series(Series::from_values("Score", [c.identity_score, c.mood_score])),
            );
        }
        None => {
            page.stats(vec![(fmt1(id.score()), "Identity score".into())]);
            page.note("Mood score needs at least two repeated songs and two tracks with popularity spread.");
        }
    }

    page.heading("Signals");
    let mut table = Table::new(["Signal", "Value"]);
    let rows = [
        ("Persistence score", format!("{:.1}% ({}/{})", id.persistence_score, id.persistent_songs, id.unique_songs)),
        ("Niche tracks", format!("{:.1}% ({})", id.niche_percentage, id.niche_tracks)),
        ("Average popularity", fmt1(id.avg_popularity)),
        ("Artist dominance", format!("{:.1}% ({} of {})", id.artist_dominance, id.artists_with_multiple_tracks, id.unique_artists)),
        ("Artist diversity", format!("{:.3}", id.artist_diversity)),
        ("Ranking volatility", opt1(mood.ranking_volatility)),
        ("Release years", mood.era_diversity.to_string()),
        ("Year span", mood.year_span.map_or_else(|| "n/a".into(), |y| y.to_string())),
        ("Average song age", opt1(mood.avg_song_age)),
        ("Popularity std", opt1(mood.popularity_std)),
        ("Popularity range", mood.popularity_range.to_string()),
        ("Explicit", format!("{:.1}%", mood.explicit_percentage)),
    ];
    for (k, v) in rows {
        table.row(vec![k.to_string(), v]);
    }
    page.table(table);

    if let Some(deep) = identity::deep_identity(tracks) {
        page.heading("Deep identity");
        page.stats(vec![
            (format!("{:.1}%", deep.mainstream_rejection), "Mainstream rejection".into()),
            (format!("{:.1}%", deep.underground_affinity), "Underground affinity".into()),
            (format!("{:.1}%", deep.core_cluster_share), "Core cluster share".into()),
            (format!("{:.1} ({})", deep.counter_cultural_score, deep.level), "Counter-cultural".into()),
        ]);
    }

    page.heading("Song identity categories");
    let songs = identity::song_categories(tracks);
    let counts: Vec<f64> = SongCategory::ALL
        .iter()
        .map(|c| songs.iter().filter(|s| s.category == *c).count() as f64)
        .collect();
    page.chart(
        Chart::new(ChartKind::Bar, "Songs per category")
            .axes("", "Songs")
            .categories(SongCategory::ALL.iter().map(|c| c.label()))
            .series(Series::from_values("Songs", counts)),
    );

    page.heading("Artist loyalty");
    let mut table = Table::new(["Artist", "Tracks", "Windows", "Avg rank", "Avg popularity", "Loyalty"]);
    for a in identity::artist_loyalty(tracks).iter().take(15) {
        table.row(vec![
            a.artist.clone(),
            a.track_count.to_string(),
            a.window_span.to_string(),
            fmt1(a.avg_rank),
            fmt1(a.avg_popularity),
            a.loyalty.label().to_string(),
        ]);
    }
    page.table(table);
    page
}

pub fn personality_radar(tracks: &[TrackSnapshot], reference_year: i32) -> Page {
    let mut page = Page::new("Musical Personality Radar");
    let Some(profile) = psychology::personality_profile(tracks, reference_year) else {
        page.note("No tracks to analyse.");
        return page;
    };

    if let Some(top) = profile.dominant() {
        page.stats(vec![(top.name.to_string(), "Dominant dimension".into())]);
    }
    page.chart(
        Chart::new(ChartKind::Radar, "Personality dimensions (0-6)")
            .y_range(0.0, 6.0)
            .categories(profile.dimensions.iter().map(|d| d.name))
            .series(Series::from_values("You", profile.dimensions.iter().map(|d| d.score as f64))),
    );
    let mut table = Table::new(["Dimension", "Score", "Level", "Description"]);
    for d in &profile.dimensions {
        table.row(vec![
            d.name.to_string(),
            format!("{}/6", d.score),
            psychology::level(d.score).to_string(),
            d.description.to_string(),
        ]);
    }
    page.table(table);
    page
}

fn test_row(name: &str, result: &TestResult, detail: String) -> Vec<String> {
    vec![
        name.to_string(),
        format!("{:.3}", result.statistic),
        format!("{:.4}", result.p_value),
        if result.significant() { "yes" } else { "no" }.to_string(),
        detail,
    ]
}

pub fn big_five_chart(tracks: &[TrackSnapshot], reference_year: i32) -> Page {
    let mut page = Page::new("Big Five Correlation Chart");
    let Some(b5) = psychology::big_five(tracks) else {
        page.note("No tracks to analyse.");
        return page;
    };

    let traits = b5.traits();
    page.chart(
        Chart::new(ChartKind::Bar, "Big Five trait proxies")
            .axes("", "Score")
            .y_range(0.0, 100.0)
            .categories(traits.iter().map(|(name, _)| *name))
            .series(Series::from_values("Score", traits.iter().map(|(_, v)| *v)))
            .annotate(Annotation::HLine { y: 50.0, text: "midpoint".into() }),
    );

    page.heading("Statistical tests");
    let report = stats::statistical_tests(tracks, reference_year);
    let mut table = Table::new(["Test", "Statistic", "p-value", "Significant", "Detail"]);
    if let Some(r) = &report.popularity_anova {
        table.row(test_row("Popularity across windows (ANOVA F)", r, format!("{} windows", report.windows)));
    }
    if let Some((r, n)) = &report.age_rank {
        table.row(test_row("Song age vs rank (Pearson r)", r, format!("n = {n}")));
    }
    if let Some(d) = &report.duration_explicit {
        table.row(test_row(
            "Duration explicit vs clean (t)",
            &d.test,
            format!("{:.2} vs {:.2} min", d.explicit_mean, d.clean_mean),
        ));
    }
    page.table(table);
    if let Some(rc) = &report.ranking_consistency {
        page.note(format!(
            "Ranking consistency: {} repeated songs, mean rank std {:.1} ({})",
            rc.repeated_songs, rc.avg_std, rc.level
        ));
    }
    page
}

pub fn historical_timeline(rows: &[HistoricalArtist]) -> Page {
    let mut page = Page::new("Historical Timeline");
    let dates = timeline::collection_dates(rows);
    let series = timeline::historical_timeline(rows, TIMELINE_ARTISTS);
    page.stats(vec![(dates.len().to_string(), "Archived collections".into())]);

    let labels: Vec<String> = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    for range in TimeRange::CHRONOLOGICAL {
        let mut chart = Chart::new(ChartKind::Line, format!("Average rank, {}", range.description()))
            .axes("Collection date", "Average rank")
            .categories(labels.clone());
        if !dates.is_empty() {
            chart = chart.x_range(-0.5, dates.len() as f64 - 0.5);
        }
        for s in series.iter().filter(|s| s.range == range) {
            let points = s
                .points
                .iter()
                .filter_map(|p| {
                    let idx = dates.iter().position(|d| *d == p.date)?;
                    Some(Point::labeled(idx as f64, p.avg_rank, format!("{} {}", s.artist, p.date)))
                })
                .collect();
            chart = chart.series(Series::new(s.artist.clone(), points));
        }
        page.chart(chart);
    }
    page
}

/// Render every live dashboard into `dir`.
pub fn write_live_reports(
    tracks: &[TrackSnapshot],
    artists: &[ArtistSnapshot],
    reference_year: i32,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let pages = [
        (artist_dashboard(tracks, artists), "artist_dashboard.html"),
        (song_dashboard(tracks), "song_dashboard.html"),
        (trend_analysis(tracks, reference_year), "trend_analysis.html"),
        (identity_vs_mood(tracks, reference_year), "identity_vs_mood_analysis.html"),
        (personality_radar(tracks, reference_year), "musical_personality_radar.html"),
        (big_five_chart(tracks, reference_year), "big_five_correlation_chart.html"),
    ];
    pages
        .iter()
        .map(|(page, name)| page.write_to(dir, name))
        .collect()
}

// --- Wrapped dashboards ---

pub fn diversity_evolution(data: &WrappedData) -> Page {
    let mut page = Page::new("Artist Diversity Evolution");
    let diversity = wrapped::diversity_by_year(data);
    let mut chart = Chart::new(ChartKind::Line, "Unique artists per year")
        .axes("Year", "Unique artists")
        .series(Series::new(
            "Unique artists",
            diversity.iter().map(|&(y, n)| Point::new(y as f64, n as f64)).collect(),
        ));
    if let Some(((most_y, most_n), (least_y, least_n))) = wrapped::diversity_extremes(&diversity) {
        chart = chart
            .annotate(Annotation::Text { x: most_y as f64, y: most_n as f64, text: "most diverse".into() })
            .annotate(Annotation::Text { x: least_y as f64, y: least_n as f64, text: "least diverse".into() });
        page.stats(vec![
            (format!("{most_y} ({most_n})"), "Most diverse year".into()),
            (format!("{least_y} ({least_n})"), "Least diverse year".into()),
        ]);
    }
    page.chart(chart);
    page
}

pub fn dimension_breakdown(data: &WrappedData) -> Page {
    let mut page = Page::new("Dimension Breakdown Evolution");
    let shares = wrapped::dimension_share(data);
    if shares.is_empty() {
        page.note("No dimension values in the data.");
        return page;
    }
    let years: Vec<i32> = data.years();
    let dimensions: BTreeSet<&str> = shares.iter().map(|s| s.dimension.as_str()).collect();

    let mut chart = Chart::new(ChartKind::Bar, "Share of songs per dimension")
        .axes("Year", "% of songs")
        .categories(years.iter().map(|y| y.to_string()));
    for dim in &dimensions {
        let values = years.iter().map(|y| {
            shares
                .iter()
                .find(|s| s.year == *y && s.dimension == *dim)
                .map_or(0.0, |s| s.percentage)
        });
        chart = chart.series(Series::from_values(*dim, values));
    }
    page.chart(chart);

    let mut table = Table::new(["Year", "Dimension", "Songs", "Share"]);
    for s in &shares {
        table.row(vec![s.year.to_string(), s.dimension.clone(), s.count.to_string(), format!("{:.1}%", s.percentage)]);
    }
    page.table(table);
    page
}

pub fn leaderboard_by_year(data: &WrappedData) -> Page {
    let mut page = Page::new("Artist Leaderboard by Year");
    for (year, top) in wrapped::leaderboard(data, 10) {
        page.chart(
            Chart::new(ChartKind::HorizontalBar, format!("Top artists of {year}"))
                .axes("Songs", "")
                .categories(top.iter().map(|(a, _)| a.clone()))
                .series(Series::from_values("Songs", top.iter().map(|(_, n)| *n as f64))),
        );
    }
    page
}

pub fn persistence_page(data: &WrappedData) -> Page {
    let mut page = Page::new("Artist Persistence Analysis");
    let persistence = wrapped::artist_persistence(data);
    let top: Vec<_> = persistence.iter().take(20).collect();
    page.stats(vec![
        (data.unique_artists().to_string(), "Unique artists".into()),
        (data.years().len().to_string(), "Years".into()),
    ]);
    page.chart(
        Chart::new(ChartKind::HorizontalBar, "Years present (top 20)")
            .axes("Years", "")
            .categories(top.iter().map(|a| a.artist.clone()))
            .series(Series::from_values("Years", top.iter().map(|a| a.years_present as f64))),
    );
    let mut table = Table::new(["Artist", "Years present", "Total songs"]);
    for a in &top {
        table.row(vec![a.artist.clone(), a.years_present.to_string(), a.total_songs.to_string()]);
    }
    page.table(table);
    page
}

pub fn focused_timeline(data: &WrappedData, focus: &[String]) -> Page {
    let mut page = Page::new("Focused Artist Timeline");
    let artists = wrapped::focus_artists(data, focus, 5);
    let series = wrapped::focus_timeline(data, &artists);
    let mut chart = Chart::new(ChartKind::Line, "Listening score per year")
        .axes("Year", "Score (songs + rank bonus)");
    for s in &series {
        chart = chart.series(Series::new(
            s.artist.clone(),
            s.points.iter().map(|&(y, v)| Point::new(y as f64, v)).collect(),
        ));
        if let Some((year, score)) = s.peak() {
            chart = chart.annotate(Annotation::Text { x: year as f64, y: score, text: format!("{} peak", s.artist) });
        }
    }
    page.chart(chart);
    page.note("Score per year: songs in the list + (51 - mean rank) / 10; zero when absent.");
    page
}

/// Render the wrapped dashboards into `dir`.
pub fn write_wrapped_reports(data: &WrappedData, focus: &[String], dir: &Path) -> Result<Vec<PathBuf>> {
    let pages = [
        (diversity_evolution(data), "artist_diversity_evolution.html"),
        (dimension_breakdown(data), "genre_breakdown_evolution.html"),
        (leaderboard_by_year(data), "artist_leaderboard_by_year.html"),
        (persistence_page(data), "artist_persistence_analysis.html"),
        (focused_timeline(data, focus), "focused_artist_timeline.html"),
    ];
    pages
        .iter()
        .map(|(page, name)| page.write_to(dir, name))
        .collect()
}

// --- CSV export ---

/// Write `tracks.csv` and `artists.csv` into `dir`.
pub fn export_csv(tracks: &[TrackSnapshot], artists: &[ArtistSnapshot], dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let tracks_path = dir.join("tracks.csv");
    let artists_path = dir.join("artists.csv");
    write_rows(&tracks_path, tracks)?;
    write_rows(&artists_path, artists)?;
    log::info!("Exported {} tracks and {} artist rows to {}", tracks.len(), artists.len(), dir.display());
    Ok((tracks_path, artists_path))
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::live::tests::artist;
    use crate::db::models::CollectionStamp;
    use crate::metrics::tests::song;
    use chrono::NaiveDate;

    fn sample() -> (Vec<TrackSnapshot>, Vec<ArtistSnapshot>) {
        let tracks = vec![
            song("Holocene", "Bon Iver", TimeRange::Long, 1, 70, "2011-06-17", false),
            song("Holocene", "Bon Iver", TimeRange::Short, 4, 70, "2011-06-17", false),
            song("Re: Stacks", "Bon Iver", TimeRange::Medium, 2, 55, "2007", false),
            song("Motion Sickness", "Phoebe Bridgers", TimeRange::Short, 1, 65, "2017-09-22", true),
            song("Kyoto", "Phoebe Bridgers", TimeRange::Medium, 3, 60, "2020-06", true),
            song("Kyoto", "Phoebe Bridgers", TimeRange::Short, 2, 60, "2020-06", true),
        ];
        let artists = vec![
            artist("Bon Iver", TimeRange::Long, 1, 70, 1.0),
            artist("Bon Iver", TimeRange::Medium, 1, 55, 2.0),
            artist("Bon Iver", TimeRange::Short, 1, 70, 4.0),
            artist("Phoebe Bridgers", TimeRange::Medium, 1, 60, 3.0),
            artist("Phoebe Bridgers", TimeRange::Short, 2, 125, 1.5),
        ];
        (tracks, artists)
    }

    fn wrapped_sample() -> WrappedData {
        let csv = "artist_name,year,rank,dimension\n\
                   Bon Iver,2019,1,Indie\n\
                   Bon Iver,2020,3,Indie\n\
                   Phoebe Bridgers,2020,2,Indie\n\
                   Phoebe Bridgers,2021,5,Folk\n";
        WrappedData::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_artist_dashboard_content() {
        let (tracks, artists) = sample();
        let html = artist_dashboard(&tracks, &artists).render();
        assert!(html.contains("Bon Iver"));
        assert!(html.contains("Phoebe Bridgers"));
        assert!(html.contains("Time window comparison"));
    }

    #[test]
    fn test_identity_page_handles_empty_input() {
        let html = identity_vs_mood(&[], 2025).render();
        assert!(html.contains("No tracks to analyse."));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn test_radar_has_four_dimensions() {
        let (tracks, _) = sample();
        let page = personality_radar(&tracks, 2025);
        assert_eq!(page.chart_count(), 1);
        let html = page.render();
        for name in ["Reflective", "Intense", "Upbeat", "Energetic"] {
            assert!(html.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_write_live_reports_writes_six_files() {
        let (tracks, artists) = sample();
        let dir = tempfile::tempdir().unwrap();
        let written = write_live_reports(&tracks, &artists, 2025, dir.path()).unwrap();
        assert_eq!(written.len(), 6);
        for name in [
            "artist_dashboard.html",
            "song_dashboard.html",
            "trend_analysis.html",
            "identity_vs_mood_analysis.html",
            "musical_personality_radar.html",
            "big_five_correlation_chart.html",
        ] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }
    }

    #[test]
    fn test_historical_timeline_one_chart_per_window() {
        let day = |d| CollectionStamp::for_date(NaiveDate::from_ymd_opt(2025, 3, d).unwrap());
        let rows = vec![
            HistoricalArtist { stamp: day(1), artist: artist("Bon Iver", TimeRange::Short, 2, 140, 3.0) },
            HistoricalArtist { stamp: day(8), artist: artist("Bon Iver", TimeRange::Short, 1, 70, 6.0) },
        ];
        let page = historical_timeline(&rows);
        assert_eq!(page.chart_count(), 3);
        let html = page.render();
        assert!(html.contains("2025-03-08"));
        assert_eq!(html.matches("<polyline").count(), 1);
    }

    #[test]
    fn test_wrapped_reports() {
        let data = wrapped_sample();
        let dir = tempfile::tempdir().unwrap();
        let written = write_wrapped_reports(&data, &[], dir.path()).unwrap();
        assert_eq!(written.len(), 5);

        let breakdown = std::fs::read_to_string(dir.path().join("genre_breakdown_evolution.html")).unwrap();
        assert!(breakdown.contains("Folk"));
        let focus = std::fs::read_to_string(dir.path().join("focused_artist_timeline.html")).unwrap();
        assert!(focus.contains("Bon Iver peak"));
    }

    #[test]
    fn test_export_csv() {
        let (tracks, artists) = sample();
        let dir = tempfile::tempdir().unwrap();
        let (t, a) = export_csv(&tracks, &artists, dir.path()).unwrap();

        let mut reader = csv::Reader::from_path(&t).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "track_name"));
        assert_eq!(reader.records().count(), tracks.len());

        let contents = std::fs::read_to_string(a).unwrap();
        assert!(contents.contains("short_term"));
        assert_eq!(contents.lines().count(), artists.len() + 1);
    }
}
