//! Lakbay Analytics - dashboard aggregates for Lakbay CamSur
//!
//! A CLI over the analytics engine: rankings, category breakdowns,
//! monthly trends, CSV export and full reports, read either from the
//! hosted row store or from a local JSON snapshot.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, store setup, file output)

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use lakbay_analytics::analysis::GapPolicy;
use lakbay_analytics::cli::{Args, Command, OutputFormat, RankingArgs};
use lakbay_analytics::config::{Config, CONFIG_FILE};
use lakbay_analytics::dashboard::{Analytics, DashboardQuery};
use lakbay_analytics::export::{export_period, DirectorySink};
use lakbay_analytics::models::{
    CategoryShare, CategoryStat, ConfirmedVisits, DestinationViews, DestinationVisits,
    MonthlyTrend, Totals,
};
use lakbay_analytics::report::{self, Report, ReportMetadata};
use lakbay_analytics::store::{EventStore, MemoryStore, RestStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Lakbay Analytics v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", args.command);

    if let Err(e) = run(args).await {
        error!("Command failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .lakbay.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the store URL, row cap, display offset, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Open the configured row store: a snapshot file if one is set, otherwise
/// the remote REST endpoint.
fn open_store(config: &Config) -> Result<(Arc<dyn EventStore>, String)> {
    if let Some(ref snapshot) = config.store.snapshot {
        info!("Reading events from snapshot: {}", snapshot.display());
        let store = MemoryStore::load(snapshot, config.store.row_cap)?;
        return Ok((Arc::new(store), snapshot.display().to_string()));
    }

    let store = RestStore::new(
        &config.store.url,
        &config.store.anon_key,
        Duration::from_secs(config.store.timeout_seconds),
        config.store.row_cap,
    )
    .context("Set the store URL and key via --url/--key, SUPABASE_URL/SUPABASE_ANON_KEY, or .lakbay.toml")?;
    Ok((Arc::new(store), config.store.url.clone()))
}

fn spinner(args: &Args, message: &str) -> Option<ProgressBar> {
    if args.quiet || args.json {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Run the selected command.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let mut settings = config.analytics_settings()?;
    if let Command::Trends { fill_gaps: true, .. } = args.command {
        settings.gap_policy = GapPolicy::ZeroFill;
    }

    let (store, source) = open_store(&config)?;
    let analytics = Analytics::new(Arc::clone(&store), settings);
    let now = Utc::now();

    match &args.command {
        Command::Overview => {
            let query = DashboardQuery {
                top_n: config.analytics.top_n,
                trend_months: config.analytics.trend_months,
                ..DashboardQuery::default()
            };
            let pb = spinner(&args, "Loading dashboard...");
            let snapshot = analytics.snapshot(&query, now).await;
            finish(pb);

            if args.json {
                print_json(&snapshot)?;
            } else {
                print_totals(&snapshot.totals);
                print_most_viewed(&snapshot.most_viewed);
                print_most_visited(&snapshot.most_visited);
                print_most_confirmed(&snapshot.most_confirmed);
                print_category_shares(&snapshot.category_views);
                print_categories(&snapshot.categories);
                print_trends(&snapshot.monthly_trends);
            }
        }
        Command::TopViewed(ranking) => {
            let (limit, filter) = ranking_query(&analytics, &config, ranking);
            let pb = spinner(&args, "Ranking destinations by views...");
            let rows = analytics.most_viewed(limit, &filter).await;
            finish(pb);

            if args.json {
                print_json(&rows)?;
            } else {
                print_most_viewed(&rows);
            }
        }
        Command::TopVisited(ranking) => {
            let (limit, filter) = ranking_query(&analytics, &config, ranking);
            let pb = spinner(&args, "Ranking destinations by visits...");
            let rows = analytics.most_visited(limit, &filter).await;
            finish(pb);

            if args.json {
                print_json(&rows)?;
            } else {
                print_most_visited(&rows);
            }
        }
        Command::TopConfirmed(ranking) => {
            let (limit, filter) = ranking_query(&analytics, &config, ranking);
            let pb = spinner(&args, "Ranking destinations by confirmed visits...");
            let rows = analytics.most_confirmed(limit, &filter).await;
            finish(pb);

            if args.json {
                print_json(&rows)?;
            } else {
                print_most_confirmed(&rows);
            }
        }
        Command::Categories => {
            let pb = spinner(&args, "Aggregating categories...");
            let (shares, stats) =
                futures::join!(analytics.category_views(), analytics.category_rollup());
            finish(pb);

            if args.json {
                print_json(&serde_json::json!({
                    "category_views": shares,
                    "categories": stats,
                }))?;
            } else {
                print_category_shares(&shares);
                print_categories(&stats);
            }
        }
        Command::Trends { months, .. } => {
            let months = months.unwrap_or(config.analytics.trend_months);
            let pb = spinner(&args, "Bucketing monthly trends...");
            let trends = analytics.monthly_trends(months, now).await;
            finish(pb);

            if args.json {
                print_json(&trends)?;
            } else {
                print_trends(&trends);
            }
        }
        Command::Export { period, out_dir } => {
            let period = period.unwrap_or(config.export.period);
            let dir = out_dir
                .clone()
                .unwrap_or_else(|| config.export.output_dir.clone());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

            let sink = DirectorySink::new(&dir);
            let pb = spinner(&args, "Exporting CSV files...");
            let summary = export_period(&*store, period, now, &sink).await?;
            finish(pb);

            if args.json {
                print_json(&serde_json::json!({
                    "delivered": summary.delivered,
                    "skipped": summary.skipped,
                }))?;
            } else {
                println!("\n📦 Export ({}):", period);
                for file in &summary.delivered {
                    println!("   📄 {}", dir.join(file).display());
                }
                for file in &summary.skipped {
                    println!("   ⏭️  {} (no rows)", file);
                }
            }
        }
        Command::Report {
            output,
            format,
            top,
            months,
        } => {
            let query = DashboardQuery {
                top_n: top.unwrap_or(config.analytics.top_n),
                trend_months: months.unwrap_or(config.analytics.trend_months),
                ..DashboardQuery::default()
            };
            let pb = spinner(&args, "Building report...");
            let snapshot = analytics.snapshot(&query, now).await;
            finish(pb);

            let report = Report {
                metadata: ReportMetadata {
                    source,
                    generated_at: now,
                    row_cap: config.store.row_cap,
                    top_n: query.top_n,
                    trend_months: query.trend_months,
                },
                snapshot,
            };

            let content = match format {
                OutputFormat::Json => report::generate_json_report(&report)?,
                OutputFormat::Markdown => report::generate_markdown_report(&report),
            };

            std::fs::write(output, &content)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;

            if !args.quiet {
                println!("\n✅ Report saved to: {}", output.display());
            }
        }
        Command::InitConfig => return handle_init_config(),
    }

    debug!("Finished in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

fn ranking_query(
    analytics: &Analytics,
    config: &Config,
    ranking: &RankingArgs,
) -> (usize, lakbay_analytics::store::EventFilter) {
    let limit = ranking.top.unwrap_or(config.analytics.top_n);
    let filter = analytics.ranking_filter(ranking.category.as_ref(), ranking.month);
    (limit, filter)
}

fn print_totals(totals: &Totals) {
    println!("\n📊 Overview:");
    println!("   Total views: {}", totals.views);
    println!(
        "   Total visits: {} (✅ confirmed: {} | 🧭 intents: {})",
        totals.visits, totals.confirmed, totals.intents
    );
    println!(
        "   Destinations: {} across {} categories",
        totals.destinations, totals.categories
    );
}

fn print_most_viewed(rows: &[DestinationViews]) {
    println!("\n👀 Most Viewed:");
    if rows.is_empty() {
        println!("   No data yet.");
    }
    for (i, row) in rows.iter().enumerate() {
        println!(
            "   {:>2}. {} ({}, {}) - {} views",
            i + 1,
            row.name,
            row.category,
            row.municipality,
            row.views
        );
    }
}

fn print_most_visited(rows: &[DestinationVisits]) {
    println!("\n🚶 Most Visited:");
    if rows.is_empty() {
        println!("   No data yet.");
    }
    for (i, row) in rows.iter().enumerate() {
        println!(
            "   {:>2}. {} ({}, {}) - {} visits ({} confirmed, {} intents)",
            i + 1,
            row.name,
            row.category,
            row.municipality,
            row.visits,
            row.confirmed,
            row.intents
        );
    }
}

fn print_most_confirmed(rows: &[ConfirmedVisits]) {
    println!("\n✅ Confirmed Visits:");
    if rows.is_empty() {
        println!("   No data yet.");
    }
    for (i, row) in rows.iter().enumerate() {
        println!(
            "   {:>2}. {} ({}, {}) - {}",
            i + 1,
            row.name,
            row.category,
            row.municipality,
            row.visits
        );
    }
}

fn print_category_shares(rows: &[CategoryShare]) {
    println!("\n🏷️  Views by Category:");
    if rows.is_empty() {
        println!("   No data yet.");
    }
    for row in rows {
        println!("   {} - {} views ({:.1}%)", row.name, row.views, row.share);
    }
}

fn print_categories(rows: &[CategoryStat]) {
    println!("\n📂 Category Performance:");
    if rows.is_empty() {
        println!("   No data yet.");
    }
    for row in rows {
        println!(
            "   {} - {} destinations | {} views | {} visits ({} confirmed, {} intents)",
            row.name,
            row.destination_count,
            row.total_views,
            row.total_visits,
            row.confirmed,
            row.intents
        );
    }
}

fn print_trends(rows: &[MonthlyTrend]) {
    println!("\n📈 Monthly Trends:");
    if rows.is_empty() {
        println!("   No data yet.");
    }
    for row in rows {
        println!("   {} - {} views | {} visits", row.month, row.views, row.visits);
    }
}
