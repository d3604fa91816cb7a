use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use magpie_core::config::SourcesConfig;
use magpie_core::pipeline::{Pipeline, RunReport};
use magpie_core::record::JobPosting;
use magpie_sources::{AtsKind, build_adapters};

#[derive(Parser)]
#[command(name = "magpie", version, about = "Job postings aggregation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured source and export the unique jobs
    Run {
        /// Path to the JSON source configuration
        #[arg(short, long, default_value = "sources.json")]
        config: PathBuf,

        /// Write the export here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Recency window in days, overriding the configuration (0 disables
        /// the filter)
        #[arg(long)]
        days_back: Option<u32>,

        /// Number of sources scraped in parallel
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// File of previously seen apply URLs, one per line
        #[arg(long)]
        known_urls: Option<PathBuf>,
    },

    /// Scrape a single source ad hoc and print a sample of its jobs
    Probe {
        /// Source kind (greenhouse, lever, smartrecruiters, workday,
        /// remoteok, himalayas, weworkremotely, rss, json, careers);
        /// detected from --url for known ATS hosts when omitted
        #[arg(short, long)]
        kind: Option<String>,

        /// Board slug for ATS kinds
        #[arg(short, long)]
        slug: Option<String>,

        /// Feed, board, or careers page URL
        #[arg(short, long)]
        url: Option<String>,

        /// Display name (company for ATS and careers kinds, feed name
        /// for feeds)
        #[arg(short, long)]
        name: Option<String>,

        /// Jobs to print
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            out,
            format,
            days_back,
            concurrency,
            known_urls,
        } => {
            cmd_run(
                &config,
                out.as_deref(),
                format,
                days_back,
                concurrency,
                known_urls.as_deref(),
            )
            .await
        }
        Commands::Probe {
            kind,
            slug,
            url,
            name,
            limit,
        } => cmd_probe(kind, slug, url, name, limit).await,
    }
}

async fn cmd_run(
    config_path: &Path,
    out: Option<&Path>,
    format: ExportFormat,
    days_back: Option<u32>,
    concurrency: usize,
    known_urls: Option<&Path>,
) -> Result<()> {
    // 1. Load configuration, letting the CLI override the recency window
    let mut config = SourcesConfig::load(config_path)?;
    if let Some(days) = days_back {
        config.days_back = Some(days).filter(|d| *d > 0);
    }

    // 2. Optional known-URL seed for cross-run dedup
    let known = match known_urls {
        Some(path) => load_known_urls(path)?,
        None => HashSet::new(),
    };

    // 3. One adapter per source
    let adapters = build_adapters(&config);
    anyhow::ensure!(
        !adapters.is_empty(),
        "No usable sources in {}",
        config_path.display()
    );

    // 4. Run the pipeline, cancelling cooperatively on CTRL+C
    let cancel = CancellationToken::new();
    tokio::spawn(watch_shutdown(cancel.clone()));

    let pipeline = Pipeline::new()
        .with_concurrency(concurrency)
        .with_days_back(config.days_back)
        .with_cancellation(cancel);
    let outcome = pipeline.run(&adapters, &known).await;

    // 5. Human summary to stderr, export payload to the chosen sink
    print_report(&outcome.report);
    match format {
        ExportFormat::Json => export_json(&outcome.jobs, out)?,
        ExportFormat::Csv => export_csv(&outcome.jobs, out)?,
    }

    Ok(())
}

async fn cmd_probe(
    kind: Option<String>,
    slug: Option<String>,
    url: Option<String>,
    name: Option<String>,
    limit: usize,
) -> Result<()> {
    // 1. Resolve the source kind, sniffing the URL when possible
    let kind = match kind {
        Some(kind) => kind,
        None => {
            let url = url
                .as_deref()
                .context("Pass --kind, or --url pointing at a known ATS host")?;
            let detected = AtsKind::detect(url)
                .context("URL does not match a known ATS host, pass --kind explicitly")?;
            tracing::info!(kind = detected.as_str(), "Detected ATS platform from URL");
            detected.as_str().to_string()
        }
    };

    // 2. Reuse the normal configuration path with a single entry
    let mut entry = serde_json::Map::new();
    entry.insert("kind".to_string(), kind.clone().into());
    if let Some(slug) = slug {
        entry.insert("slug".to_string(), slug.into());
    }
    if let Some(url) = url {
        entry.insert("url".to_string(), url.into());
    }
    if let Some(name) = name {
        entry.insert("name".to_string(), name.into());
    }
    let config_json = serde_json::json!({ "sources": [entry] }).to_string();
    let config = SourcesConfig::from_json(&config_json)?;

    let adapters = build_adapters(&config);
    let Some(adapter) = adapters.first() else {
        anyhow::bail!("The {kind} source needs more arguments, see the warnings above");
    };

    // 3. Scrape it once and show a sample
    tracing::info!(source = adapter.name(), "Probing source");
    let jobs = adapter.scrape().await?;

    println!("{}: {} jobs", adapter.name(), jobs.len());
    for job in jobs.iter().take(limit) {
        println!(
            "  {} | {} | {}{}",
            job.title,
            job.company,
            job.location.as_deref().unwrap_or("unspecified"),
            if job.is_remote { " (remote)" } else { "" },
        );
        println!("    {}", job.apply_url);
    }
    if jobs.len() > limit {
        println!("  ... and {} more", jobs.len() - limit);
    }

    Ok(())
}

async fn watch_shutdown(cancel: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received, finishing in-flight sources");
    cancel.cancel();
}

/// Reads one apply URL per line; blank lines and `#` comments are
/// ignored.
fn load_known_urls(path: &Path) -> Result<HashSet<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read known URLs from {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn print_report(report: &RunReport) {
    eprintln!(
        "Scraped {} jobs from {} sources, {} unique after dedup and filtering",
        report.scraped_count,
        report.per_source.len(),
        report.unique_count
    );
    for outcome in &report.per_source {
        match &outcome.error {
            Some(error) => eprintln!("  [failed] {}: {}", outcome.source, error),
            None => eprintln!("  [ok]     {}: {} jobs", outcome.source, outcome.count),
        }
    }
    if !report.per_domain.is_empty() {
        eprintln!("Jobs by domain:");
        for (domain, count) in &report.per_domain {
            eprintln!("  {domain}: {count}");
        }
    }
    if report.failed_sources > 0 {
        eprintln!("Run completed with {} failed sources", report.failed_sources);
    }
}

fn export_json(jobs: &[JobPosting], out: Option<&Path>) -> Result<()> {
    let envelope = serde_json::json!({
        "exported_at": Utc::now().to_rfc3339(),
        "total": jobs.len(),
        "jobs": jobs,
    });
    let payload = serde_json::to_string_pretty(&envelope)?;

    match out {
        Some(path) => {
            std::fs::write(path, payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} jobs to {}", jobs.len(), path.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}

fn export_csv(jobs: &[JobPosting], out: Option<&Path>) -> Result<()> {
    let sink: Box<dyn Write> = match out {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record([
        "title",
        "company",
        "location",
        "remote",
        "domain",
        "salary_min",
        "salary_max",
        "source",
        "posted_at",
        "apply_url",
    ])?;
    for job in jobs {
        let salary_min = job.salary_min.map_or(String::new(), |v| v.to_string());
        let salary_max = job.salary_max.map_or(String::new(), |v| v.to_string());
        let posted_at = job.posted_at.map_or(String::new(), |t| t.to_rfc3339());
        writer.write_record([
            job.title.as_str(),
            job.company.as_str(),
            job.location.as_deref().unwrap_or(""),
            if job.is_remote { "true" } else { "false" },
            job.domain.as_str(),
            salary_min.as_str(),
            salary_max.as_str(),
            job.source.as_str(),
            posted_at.as_str(),
            job.apply_url.as_str(),
        ])?;
    }
    writer.flush()?;

    if let Some(path) = out {
        tracing::info!("Wrote {} jobs to {}", jobs.len(), path.display());
    }
    Ok(())
}
