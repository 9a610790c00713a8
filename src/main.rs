mod config;
mod db;
mod dedup;
mod enrich;
mod model;
mod normalize;
mod pipeline;
mod sources;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, warn};

use config::{PracujSettings, Settings};
use enrich::classifier::ChatClassifier;
use enrich::limiter::RateLimiter;
use enrich::{EnrichmentCoordinator, EnrichmentReport};
use model::JobPosting;
use sources::renderer::{PageRenderer, RenderSession};

#[derive(Parser)]
#[command(name = "jobs_etl", about = "Job postings ETL: scrape, normalize, enrich, store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Extract, clean, enrich, deduplicate and store new postings
    Run {
        /// Which source to pull from
        #[arg(short, long, value_enum, default_value = "all")]
        source: SourceArg,
        /// Max detail pages to fetch from the listing source
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Skip classifier enrichment
        #[arg(long)]
        no_enrich: bool,
        /// Do everything except writing to the database
        #[arg(long)]
        dry_run: bool,
        /// Write the new postings to this JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Show storage statistics
    Stats,
    /// Most recent postings
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Filter by source (jsearch, pracuj)
        #[arg(short, long)]
        source: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    All,
    Jsearch,
    Pracuj,
}

impl SourceArg {
    fn includes(self, other: SourceArg) -> bool {
        self == SourceArg::All || self == other
    }
}

struct RunOptions {
    source: SourceArg,
    limit: Option<usize>,
    no_enrich: bool,
    dry_run: bool,
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            println!("Schema ready at {}", settings.database_path.display());
            Ok(())
        }
        Commands::Run {
            source,
            limit,
            no_enrich,
            dry_run,
            export,
        } => {
            let opts = RunOptions {
                source,
                limit,
                no_enrich,
                dry_run,
                export,
            };
            run(&settings, opts).await
        }
        Commands::Stats => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:        {}", s.total);
            for (source, count) in &s.by_source {
                println!("  {:<10} {}", source, count);
            }
            println!("Salary:       {}", s.with_salary);
            println!("Requirements: {}", s.with_requirements);
            println!("Benefits:     {}", s.with_benefits);
            if let Some(r) = s.last_run {
                println!(
                    "Last run:     {} ({} scraped, {} new, {} classifier calls, {} failures)",
                    r.finished_at, r.scraped, r.inserted, r.classifier_calls, r.enrichment_failures
                );
            }
            Ok(())
        }
        Commands::List { limit, source } => {
            let conn = db::connect(&settings.database_path)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_recent(&conn, source.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No postings found. Run 'run' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<32} | {:<20} | {:<7} | {:<12} | {:<14} | {:>15} | {:<10}",
                "#", "Title", "Company", "Source", "Level", "Mode", "Salary/mo", "Added"
            );
            println!("{}", "-".repeat(132));

            for (i, r) in rows.iter().enumerate() {
                let salary = match (r.sal_min, r.sal_max) {
                    (Some(min), Some(max)) if min == max => min.to_string(),
                    (Some(min), Some(max)) => format!("{}-{}", min, max),
                    _ => "-".into(),
                };
                println!(
                    "{:>3} | {:<32} | {:<20} | {:<7} | {:<12} | {:<14} | {:>15} | {:<10}",
                    i + 1,
                    truncate(&r.title, 32),
                    truncate(&r.company, 20),
                    r.source,
                    truncate(&r.level.join(","), 12),
                    truncate(&r.mode.join(","), 14),
                    salary,
                    r.added_date
                );
            }
            println!("\n{} postings", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(settings: &Settings, opts: RunOptions) -> anyhow::Result<()> {
    let started_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

    // Phase 1: Extract
    let t_extract = Instant::now();
    let mut scraped: Vec<JobPosting> = Vec::new();
    if opts.source.includes(SourceArg::Jsearch) {
        let batch = sources::jsearch::extract(&settings.jsearch).await;
        println!("jsearch: {} postings", batch.len());
        scraped.extend(batch);
    }
    if opts.source.includes(SourceArg::Pracuj) {
        let batch = extract_pracuj(&settings.pracuj, opts.limit, RenderSession::open).await;
        scraped.extend(batch);
    }
    let scraped_count = scraped.len();
    println!(
        "Extracted {} postings in {:.1}s",
        scraped_count,
        t_extract.elapsed().as_secs_f64()
    );

    // Phase 2: Transform
    let mut cleaned = pipeline::clean(scraped);
    let cleaned_count = cleaned.len();

    let enrichment = match (opts.no_enrich, settings.classifier.token.clone()) {
        (true, _) => EnrichmentReport::default(),
        (false, None) => {
            warn!("GITHUB_TOKEN not set, skipping enrichment");
            EnrichmentReport::default()
        }
        (false, Some(token)) => {
            let t_enrich = Instant::now();
            let classifier = ChatClassifier::new(&settings.classifier, token)?;
            let limiter = RateLimiter::per_minute(
                settings.classifier.calls_per_minute,
                Duration::from_millis(settings.classifier.safety_margin_ms),
            );
            let mut coordinator = EnrichmentCoordinator::new(classifier, limiter);
            pipeline::enrich_batch(&mut coordinator, &mut cleaned).await;
            println!("Enriched in {}", format_duration(t_enrich.elapsed()));
            coordinator.into_report()
        }
    };

    // Phase 3: Load
    let conn = db::connect(&settings.database_path)?;
    db::init_schema(&conn)?;
    let existing = db::existing_urls(&conn)?;
    let fresh = dedup::select_new(&existing, cleaned);

    let inserted = if opts.dry_run {
        println!("Dry run: {} new postings not written", fresh.len());
        0
    } else {
        db::insert_new(&conn, &fresh)?
    };

    if let Some(path) = &opts.export {
        let json = serde_json::to_string_pretty(&fresh)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        println!("Exported {} postings to {}", fresh.len(), path.display());
    }

    if !opts.dry_run {
        let record = db::RunRecord {
            started_at,
            scraped: scraped_count,
            cleaned: cleaned_count,
            inserted,
        };
        db::record_run(&conn, &record, &enrichment)?;
    }

    println!(
        "Saved {} new of {} cleaned ({} scraped). Classifier: {} calls, {} filled, {} failures.",
        inserted,
        cleaned_count,
        scraped_count,
        enrichment.calls,
        enrichment.filled,
        enrichment.failures.len()
    );
    for f in &enrichment.failures {
        println!(
            "  [{}] {} {}: {}",
            f.reason,
            f.url.as_deref().unwrap_or("-"),
            f.section.as_str(),
            truncate(&f.detail, 80)
        );
    }
    Ok(())
}

/// Listing source through a render session. Missing credentials or a
/// session that cannot be opened skip this source only.
async fn extract_pracuj<R, F>(
    settings: &PracujSettings,
    limit: Option<usize>,
    open: F,
) -> Vec<JobPosting>
where
    R: PageRenderer,
    F: FnOnce(&str) -> anyhow::Result<R>,
{
    let Some(key) = settings.spider_api_key.as_deref() else {
        warn!("SPIDER_API_KEY not set, skipping pracuj");
        return Vec::new();
    };
    let session = match open(key) {
        Ok(session) => session,
        Err(e) => {
            error!("Skipping pracuj, render session failed to open: {:#}", e);
            return Vec::new();
        }
    };
    let (batch, report) = sources::pracuj::extract(&session, settings, limit).await;
    session.finish();
    println!(
        "pracuj: {} postings ({} listed, {} failed, {} recruiter links skipped)",
        batch.len(),
        report.listed,
        report.failed.len(),
        report.skipped_recruiter
    );
    batch
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
