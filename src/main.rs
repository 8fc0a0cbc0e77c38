use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use listening_trends::config::AppConfig;
use listening_trends::db::models::{ArtistSnapshot, TrackSnapshot};
use listening_trends::db::{HistoryDb, LiveDb};
use listening_trends::metrics::identity::{self, IdentitySignals, MoodSignals, SongCategory};
use listening_trends::metrics::{psychology, stats, trends};

#[derive(Parser)]
#[command(name = "listening-trends", version, about = "Personal listening analytics")]
struct Cli {
    /// Path to the live snapshot database
    #[arg(long, global = true)]
    live_db: Option<PathBuf>,

    /// Path to the historical archive database
    #[arg(long, global = true)]
    history_db: Option<PathBuf>,

    /// Directory for generated reports
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Aspect {
    Profile,
    Patterns,
    Social,
    Emotional,
    BigFive,
    Stats,
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch top tracks for every look-back window into the live tables
    Collect {
        /// OAuth access token for the streaming service
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Items per window (upstream maximum is 50)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Copy today's live tables into the historical archive
    Archive {
        /// Replace an existing archive for today without asking
        #[arg(long)]
        yes: bool,
    },

    /// Show the archive collection log
    History,

    /// Show live table statistics
    Summary,

    /// Overview, song survival, artist trends, persistence and eras
    Analyze {
        /// Analyze an archived day (YYYY-MM-DD) instead of the live tables
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Identity vs mood classification
    Identity {
        /// Analyze an archived day (YYYY-MM-DD) instead of the live tables
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Listening psychology profiles
    Psychology {
        #[arg(value_enum, default_value = "all")]
        aspect: Aspect,

        /// Analyze an archived day (YYYY-MM-DD) instead of the live tables
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Export the live tables as tracks.csv and artists.csv
    Export {
        /// Target directory (defaults to the output directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Write the HTML dashboards
    Report {
        /// Report on an archived day (YYYY-MM-DD) instead of the live tables
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Analyze the yearly wrapped CSV export and write its dashboards
    Wrapped {
        /// CSV with artist_name, year, rank, dimension columns
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Serve the output directory on localhost
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Tracks and artists under analysis plus where they came from.
struct Dataset {
    tracks: Vec<TrackSnapshot>,
    artists: Vec<ArtistSnapshot>,
    source: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = AppConfig::load();

    // Paths: CLI > config > working-directory default
    let live_path = cli.live_db.clone().unwrap_or_else(|| config.live_db());
    let history_path = cli.history_db.clone().unwrap_or_else(|| config.history_db());
    let output_dir = cli.output_dir.clone().unwrap_or_else(|| config.output());
    log::info!("Live database: {}", live_path.display());
    log::info!("History database: {}", history_path.display());

    let reference_year = Local::now().year();

    match cli.command {
        Commands::Collect { token, limit } => {
            let Some(token) = token.or_else(|| config.spotify.access_token.clone()) else {
                println!("No access token. Pass --token, set SPOTIFY_ACCESS_TOKEN, or add it to the config file.");
                return Ok(());
            };
            let live = LiveDb::open(&live_path).context("Failed to open live database")?;
            let client = listening_trends::spotify::SpotifyClient::new(&config.spotify.api_base, &token);
            match client.current_user() {
                Ok(user) => println!("Collecting for {user}"),
                Err(e) => log::warn!("Could not fetch user profile: {e:#}"),
            }

            let limit = limit.unwrap_or(config.spotify.limit).clamp(1, 50);
            let collected = timestamp();
            let result = listening_trends::collector::collect_top_tracks(&live, &client, limit, &collected)
                .context("Collection failed")?;

            for w in &result.windows {
                match &w.error {
                    None => println!(
                        "  {:<14} {:>3} tracks, {:>3} artists{}",
                        w.range.description(),
                        w.tracks,
                        w.artists,
                        if w.skipped > 0 { format!(" ({} skipped)", w.skipped) } else { String::new() }
                    ),
                    Some(e) => println!("  {:<14} failed: {e}", w.range.description()),
                }
            }
            println!(
                "Collection complete: {} tracks, {} of {} windows failed",
                result.total_tracks(),
                result.failed_windows(),
                result.windows.len()
            );
        }

        Commands::Archive { yes } => {
            let live = LiveDb::open(&live_path).context("Failed to open live database")?;
            let history = HistoryDb::open(&history_path).context("Failed to open history database")?;
            let today = Local::now().date_naive();
            let outcome = listening_trends::archiver::archive_snapshot(
                &live,
                &history,
                today,
                &timestamp(),
                |date| yes || confirm(&format!("{date} is already archived. Replace it?")),
            )
            .context("Archive failed")?;

            use listening_trends::archiver::ArchiveOutcome;
            match outcome {
                ArchiveOutcome::NoLiveData => println!("No live data to archive. Run `collect` first."),
                ArchiveOutcome::Declined => println!("Archive for {today} left unchanged."),
                ArchiveOutcome::Archived(s) => println!(
                    "Archived {}: {} tracks, {} artist entries{}",
                    s.date,
                    s.tracks,
                    s.artists,
                    if s.replaced { " (replaced)" } else { "" }
                ),
            }
        }

        Commands::History => {
            if !history_path.exists() {
                println!("No history database at {}. Run `archive` first.", history_path.display());
                return Ok(());
            }
            let history = HistoryDb::open(&history_path).context("Failed to open history database")?;
            let log = history.collection_log().context("Query failed")?;
            if log.is_empty() {
                println!("No archived collections yet.");
                return Ok(());
            }

            println!("{:<12} {:<20} {:>7} {:>8}  {}", "Date", "Collected", "Tracks", "Artists", "Notes");
            println!("{}", "-".repeat(90));
            for e in &log {
                println!(
                    "{:<12} {:<20} {:>7} {:>8}  {}",
                    e.collection_date, e.collection_timestamp, e.tracks_collected, e.artists_collected, e.notes
                );
            }
            println!();
            println!("Total periods: {}", log.len());
            if let (Some(newest), Some(oldest)) = (log.first(), log.last()) {
                if log.len() > 1 {
                    let days = (newest.collection_date - oldest.collection_date).num_days();
                    println!(
                        "Data span: {} to {} ({days} days)",
                        oldest.collection_date, newest.collection_date
                    );
                }
            }
        }

        Commands::Summary => {
            let live = LiveDb::open(&live_path).context("Failed to open live database")?;
            let stats = live.stats().context("Failed to get stats")?;
            println!("Live Snapshot");
            println!("=============");
            println!("Track entries:   {}", stats.total_tracks);
            println!("Unique songs:    {}", stats.unique_songs);
            println!("Unique artists:  {}", stats.unique_artists);
            println!(
                "Last collected:  {}",
                stats.last_collected.as_deref().unwrap_or("never")
            );
            if !stats.windows.is_empty() {
                println!();
                for (range, count) in &stats.windows {
                    println!("  {:<14} {}", range.description(), count);
                }
            }
        }

        Commands::Analyze { date } => {
            let Some(data) = load_dataset(&live_path, &history_path, date)? else {
                return Ok(());
            };
            print_analysis(&data, reference_year);
        }

        Commands::Identity { date } => {
            let Some(data) = load_dataset(&live_path, &history_path, date)? else {
                return Ok(());
            };
            print_identity(&data, reference_year);
        }

        Commands::Psychology { aspect, date } => {
            let Some(data) = load_dataset(&live_path, &history_path, date)? else {
                return Ok(());
            };
            print_psychology(&data, aspect, reference_year);
        }

        Commands::Export { dir } => {
            let live = LiveDb::open(&live_path).context("Failed to open live database")?;
            let tracks = live.tracks().context("Query failed")?;
            let artists = live.artists().context("Query failed")?;
            if tracks.is_empty() {
                println!("No live data to export. Run `collect` first.");
                return Ok(());
            }
            let dir = dir.unwrap_or_else(|| output_dir.clone());
            let (t, a) = listening_trends::report::export_csv(&tracks, &artists, &dir)?;
            println!("Exported {} and {}", t.display(), a.display());
        }

        Commands::Report { date } => {
            let Some(data) = load_dataset(&live_path, &history_path, date)? else {
                return Ok(());
            };
            let mut written = listening_trends::report::write_live_reports(
                &data.tracks,
                &data.artists,
                reference_year,
                &output_dir,
            )?;

            if history_path.exists() {
                let history = HistoryDb::open(&history_path).context("Failed to open history database")?;
                let rows = history.historical_artists().context("Query failed")?;
                if rows.is_empty() {
                    log::info!("History is empty; skipping the timeline");
                } else {
                    let page = listening_trends::report::historical_timeline(&rows);
                    written.push(page.write_to(&output_dir, "historical_timeline.html")?);
                }
            }

            println!("Reports from {}:", data.source);
            for p in &written {
                println!("  {}", p.display());
            }
        }

        Commands::Wrapped { csv } => {
            let path = csv.unwrap_or_else(|| config.wrapped());
            if !path.exists() {
                println!("No wrapped data at {}.", path.display());
                return Ok(());
            }
            let data = listening_trends::wrapped::WrappedData::load(&path)?;
            if data.entries.is_empty() {
                println!("No usable rows in {}.", path.display());
                return Ok(());
            }
            print_wrapped(&data, &config.focus_artists);
            let written = listening_trends::report::write_wrapped_reports(&data, &config.focus_artists, &output_dir)?;
            println!();
            for p in &written {
                println!("  {}", p.display());
            }
        }

        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            println!("Serving {} at http://127.0.0.1:{port} (Ctrl-C to stop)", output_dir.display());
            listening_trends::server::serve(&output_dir, port)?;
        }
    }

    Ok(())
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush().ok();
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer).is_ok() && answer.trim().eq_ignore_ascii_case("y")
}

/// Live tables, or one archived day when `date` is set. `None` (after
/// printing why) when there is nothing to analyze.
fn load_dataset(live_path: &Path, history_path: &Path, date: Option<NaiveDate>) -> Result<Option<Dataset>> {
    let data = match date {
        Some(date) => {
            if !history_path.exists() {
                println!("No history database at {}.", history_path.display());
                return Ok(None);
            }
            let history = HistoryDb::open(history_path).context("Failed to open history database")?;
            let snapshot = history.tracks_on(date).context("Query failed")?;
            Dataset { tracks: snapshot.tracks, artists: snapshot.artists, source: format!("archive of {date}") }
        }
        None => {
            let live = LiveDb::open(live_path).context("Failed to open live database")?;
            Dataset {
                tracks: live.tracks().context("Query failed")?,
                artists: live.artists().context("Query failed")?,
                source: "live tables".to_string(),
            }
        }
    };
    if data.tracks.is_empty() {
        match date {
            Some(date) => println!("Nothing archived for {date}."),
            None => println!("No live data. Run `collect` first."),
        }
        return Ok(None);
    }
    Ok(Some(data))
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}

fn print_analysis(data: &Dataset, reference_year: i32) {
    let o = trends::overview(&data.tracks, &data.artists);
    println!("Overview ({})", data.source);
    println!("========");
    println!("Track entries:   {}", o.total_entries);
    println!("Unique songs:    {}", o.unique_songs);
    println!("Unique artists:  {}", o.unique_artists);
    println!();

    println!("{:<30} {:>6} {:>7} {:>8}", "Top artists", "Tracks", "Windows", "Avg rank");
    println!("{}", "-".repeat(54));
    for a in &o.top_artists {
        println!("{:<30} {:>6} {:>7} {:>8.1}", clip(&a.artist, 30), a.total_tracks, a.windows, a.avg_rank);
    }
    for (range, top) in &o.per_window {
        println!();
        println!("{}:", range.description());
        for a in top {
            println!("  {:<30} {} tracks", clip(&a.artist_name, 30), a.track_count);
        }
    }

    println!();
    let survivors = trends::song_survivors(&data.tracks);
    println!("Songs in more than one window: {}", survivors.len());
    println!("{:<40} {:>4} {:>8} {:>5} {:>5}", "Song", "Win", "Avg rank", "Best", "Worst");
    println!("{}", "-".repeat(66));
    for s in survivors.iter().take(15) {
        println!(
            "{:<40} {:>4} {:>8.1} {:>5} {:>5}",
            clip(&format!("{} - {}", s.track_name, s.artist_name), 40),
            s.windows.len(),
            s.avg_rank,
            s.best_rank,
            s.worst_rank
        );
    }

    println!();
    let artist_trends = trends::artist_trends(&data.tracks);
    if !artist_trends.is_empty() {
        println!("Artist trends (negative slope = climbing):");
        for t in artist_trends.iter().take(10) {
            println!("  {:<30} {:>7.2}  {}", clip(&t.artist, 30), t.slope, t.direction);
        }
        println!();
    }

    if let Some(p) = trends::persistence_analysis(&data.tracks, reference_year) {
        println!(
            "Persistence: {}/{} songs ({:.1}%)",
            p.persistent_songs, p.unique_songs, p.persistence_rate
        );
        for (name, profile) in [("persistent", &p.persistent), ("single-window", &p.non_persistent)] {
            if let Some(s) = profile {
                println!(
                    "  {:<14} pop {:.1}  {:.2} min  age {}  rank {:.1}",
                    name,
                    s.avg_popularity,
                    s.avg_duration_minutes,
                    opt(s.avg_song_age),
                    s.avg_rank
                );
            }
        }
        println!();
    }

    println!("{:<20} {:>6} {:>6} {:>8} {:>6}", "Era", "Tracks", "Pop", "Avg rank", "Min");
    println!("{}", "-".repeat(50));
    for e in trends::era_analysis(&data.tracks) {
        println!(
            "{:<20} {:>6} {:>6.1} {:>8.1} {:>6.2}",
            e.era, e.track_count, e.avg_popularity, e.avg_rank, e.avg_duration_minutes
        );
    }
}

fn print_identity(data: &Dataset, reference_year: i32) {
    let (Some(id), Some(mood)) = (
        IdentitySignals::compute(&data.tracks),
        MoodSignals::compute(&data.tracks, reference_year),
    ) else {
        println!("No tracks to analyze.");
        return;
    };

    println!("Identity vs Mood ({})", data.source);
    println!("================");
    println!("Persistence:        {:.1}% ({}/{})", id.persistence_score, id.persistent_songs, id.unique_songs);
    println!("Niche tracks:       {:.1}% ({})", id.niche_percentage, id.niche_tracks);
    println!("Avg popularity:     {:.1}", id.avg_popularity);
    println!(
        "Artist dominance:   {:.1}% ({} of {} artists)",
        id.artist_dominance, id.artists_with_multiple_tracks, id.unique_artists
    );
    println!("Artist diversity:   {:.3}", id.artist_diversity);
    println!("Ranking volatility: {}", opt(mood.ranking_volatility));
    println!("Release years:      {}", mood.era_diversity);
    println!("Avg song age:       {}", opt(mood.avg_song_age));
    println!("Popularity std:     {}", opt(mood.popularity_std));
    println!("Explicit:           {:.1}%", mood.explicit_percentage);
    println!();

    match identity::classify(&id, &mood) {
        Some(c) => {
            println!("Identity score: {:.1}", c.identity_score);
            println!("Mood score:     {:.1}", c.mood_score);
            println!("You are {} (confidence {:.1})", c.driver, c.confidence);
        }
        None => println!("Identity score: {:.1} (mood score undefined)", id.score()),
    }

    if !id.devotion.is_empty() {
        println!();
        println!("Most devoted artists:");
        for d in &id.devotion {
            println!(
                "  {:<30} {} tracks, pop {:.1}, devotion {:.2}",
                clip(&d.artist, 30),
                d.tracks,
                d.avg_popularity,
                d.devotion_score
            );
        }
    }

    if let Some(deep) = identity::deep_identity(&data.tracks) {
        println!();
        println!("Mainstream rejection:  {:.1}%", deep.mainstream_rejection);
        println!("Underground affinity:  {:.1}%", deep.underground_affinity);
        println!("Core cluster share:    {:.1}% ({} artists)", deep.core_cluster_share, deep.core_artists);
        println!("Counter-cultural:      {:.1} ({})", deep.counter_cultural_score, deep.level);
    }

    println!();
    let songs = identity::song_categories(&data.tracks);
    for category in SongCategory::ALL {
        let n = songs.iter().filter(|s| s.category == category).count();
        println!("  {:<18} {}", category.label(), n);
    }

    println!();
    println!("{:<30} {:>6} {:>7}  {}", "Artist", "Tracks", "Windows", "Loyalty");
    println!("{}", "-".repeat(64));
    for a in identity::artist_loyalty(&data.tracks).iter().take(15) {
        println!("{:<30} {:>6} {:>7}  {}", clip(&a.artist, 30), a.track_count, a.window_span, a.loyalty.label());
    }
}

fn print_psychology(data: &Dataset, aspect: Aspect, reference_year: i32) {
    let all = aspect == Aspect::All;
    let tracks = &data.tracks;
    println!("Listening psychology ({})", data.source);

    if all || aspect == Aspect::Profile {
        if let Some(profile) = psychology::personality_profile(tracks, reference_year) {
            println!();
            println!("Musical personality");
            for d in &profile.dimensions {
                println!("  {:<24} {}/6 {:<6}  {}", d.name, d.score, psychology::level(d.score), d.description);
            }
            if let Some(top) = profile.dominant() {
                println!("  Dominant: {}", top.name);
            }
        }
    }

    if all || aspect == Aspect::Patterns {
        if let Some(p) = psychology::listening_patterns(tracks, reference_year) {
            println!();
            println!("Listening patterns");
            println!("  Repeat rate:       {:.1}% ({})", p.repeat_rate, p.familiarity);
            println!("  Novelty seeking:   {:.1}%", p.novelty_seeking);
            println!("  Artist diversity:  {:.1}%", p.artist_diversity);
            for (from, to, overlap) in &p.overlaps {
                println!("  Overlap {} -> {}: {:.1}%", from.description(), to.description(), overlap);
            }
            println!(
                "  Taste stability:   {} ({})",
                p.taste_stability.map_or_else(|| "n/a".to_string(), |s| format!("{s:.1}%")),
                p.stability
            );
            println!("  Avg song age:      {}", opt(p.avg_song_age));
            for (era, n) in &p.era_distribution {
                println!("    {:<20} {}", era, n);
            }
            if let (Some(era), Some(kind)) = (p.dominant_era, p.temporal_type) {
                println!("  Dominant era: {era} ({kind})");
            }
        }
    }

    if all || aspect == Aspect::Social {
        if let Some(s) = psychology::social_behaviour(tracks, &data.artists) {
            println!();
            println!("Social behaviour");
            println!("  Avg popularity:    {:.1} (std {})", s.avg_popularity, opt(s.popularity_std));
            println!("  Mainstream level:  {}", s.mainstream_level);
            println!("  Concentration:     {}", s.concentration.map_or_else(|| "n/a".to_string(), |c| format!("{c:.2}")));
            if let (Some(d), Some(kind)) = (s.top_artist_dominance, s.loyalty_type) {
                println!("  Top artist share:  {d:.1}% ({kind})");
            }
            println!("  High popularity:   {:.1}%", s.high_popularity);
            println!("  Explicit rate:     {:.1}%", s.explicit_rate);
            println!("  Conformity:        {}/3 ({})", s.conformity_score, s.conformity_level);
        }
    }

    if all || aspect == Aspect::Emotional {
        if let Some(e) = psychology::emotional_patterns(tracks, reference_year) {
            println!();
            println!("Emotional patterns");
            println!("  Avg duration:      {:.2} min ({})", e.avg_duration_minutes, e.mood_type);
            println!("  Duration variance: {}", opt(e.duration_variance));
            println!("  Rank volatility:   {:.1} ({})", e.rank_volatility, e.stability);
            println!("  Complexity:        {}/3 ({})", e.complexity_score, e.processing_type);
        }
    }

    if all || aspect == Aspect::BigFive {
        if let Some(b) = psychology::big_five(tracks) {
            println!();
            println!("Big Five proxies");
            for (name, score) in b.traits() {
                println!("  {:<20} {:>5.1}", name, score);
            }
        }
    }

    if all || aspect == Aspect::Stats {
        let r = stats::statistical_tests(tracks, reference_year);
        println!();
        println!("Statistical tests ({} entries, {} unique songs, {} windows)", r.total_tracks, r.unique_songs, r.windows);
        let mark = |t: &stats::TestResult| if t.significant() { "significant" } else { "not significant" };
        if let Some(t) = &r.popularity_anova {
            println!("  Popularity by window: F = {:.3}, p = {:.4} ({})", t.statistic, t.p_value, mark(t));
        }
        if let Some((t, n)) = &r.age_rank {
            println!("  Song age vs rank:     r = {:.3}, p = {:.4}, n = {n} ({})", t.statistic, t.p_value, mark(t));
        }
        if let Some(d) = &r.duration_explicit {
            println!(
                "  Duration explicit vs clean: {:.2} vs {:.2} min, t = {:.3}, p = {:.4} ({})",
                d.explicit_mean, d.clean_mean, d.test.statistic, d.test.p_value, mark(&d.test)
            );
        }
        if let Some(c) = &r.ranking_consistency {
            println!(
                "  Ranking consistency:  {} repeated songs, mean std {:.1} ({})",
                c.repeated_songs, c.avg_std, c.level
            );
        }
    }
}

fn print_wrapped(data: &listening_trends::wrapped::WrappedData, focus: &[String]) {
    use listening_trends::wrapped;

    let years = data.years();
    println!(
        "Wrapped data: {} entries, {} artists, {} years{}",
        data.entries.len(),
        data.unique_artists(),
        years.len(),
        if data.dropped > 0 { format!(" ({} rows dropped)", data.dropped) } else { String::new() }
    );

    let diversity = wrapped::diversity_by_year(data);
    for (year, n) in &diversity {
        println!("  {year}: {n} unique artists");
    }
    if let Some(((most_y, most_n), (least_y, least_n))) = wrapped::diversity_extremes(&diversity) {
        println!("Most diverse: {most_y} ({most_n}), least diverse: {least_y} ({least_n})");
    }

    println!();
    println!("{:<30} {:>5} {:>6}", "Most persistent", "Years", "Songs");
    println!("{}", "-".repeat(43));
    for a in wrapped::artist_persistence(data).iter().take(20) {
        println!("{:<30} {:>5} {:>6}", clip(&a.artist, 30), a.years_present, a.total_songs);
    }

    let artists = wrapped::focus_artists(data, focus, 5);
    println!();
    for s in wrapped::focus_timeline(data, &artists) {
        if let Some((year, score)) = s.peak() {
            println!("{} peaked in {year} (score {score:.1})", s.artist);
        }
    }

    let last = years.last().copied();
    if let Some((year, top)) = wrapped::leaderboard(data, 10).into_iter().find(|(y, _)| Some(*y) == last) {
        println!();
        println!("Top artists of {year}:");
        for (i, (artist, n)) in top.iter().enumerate() {
            println!("  {:>2}. {:<30} {n}", i + 1, clip(artist, 30));
        }
    }
}
