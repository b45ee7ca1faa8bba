//! reportq CLI: run the report worker pool and drive jobs from the shell.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use reportq::config::Config;
use reportq::model::job::{JobId, JobStatus, ReportJob, ReportRequest};
use reportq::service::ReportService;
use reportq::source::{ReportDataSource, StaticDataSource};
use reportq::telemetry::{TelemetryConfig, init_telemetry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "reportq", about = "Asynchronous report generation for waste collection data")]
struct Cli {
    /// Dataset TOML to report on (municipalities, collectors, requests, pickups)
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the worker pool until Ctrl-C
    Serve,
    /// Submit a report request
    Submit {
        /// Report title
        title: String,
        /// performance, collections, predictive or other
        #[arg(long = "type", default_value = "performance")]
        report_type: String,
        /// daily, weekly, monthly, quarterly or yearly
        #[arg(long, default_value = "monthly")]
        period: String,
        /// pdf, excel or both
        #[arg(long, default_value = "pdf")]
        format: String,
        /// Render charts alongside tables
        #[arg(long)]
        charts: bool,
        #[arg(long)]
        municipality: Option<String>,
        #[arg(long)]
        collector: Option<String>,
        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value = "cli")]
        requested_by: String,
        /// Block until the job finishes
        #[arg(long)]
        wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 300)]
        wait_secs: u64,
    },
    /// Show a job
    Show {
        /// Job ID (full UUID or prefix)
        id: String,
    },
    /// List recent jobs
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Maximum jobs to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Fetch a completed artifact
    Download {
        /// Job ID (full UUID or prefix)
        id: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "reportq".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    let source: Arc<dyn ReportDataSource> = match cli.data {
        Some(ref path) => Arc::new(StaticDataSource::load(path)?),
        None => Arc::new(StaticDataSource::empty()),
    };
    // Only `serve`, and `submit` against a private in-memory store, generate
    // reports. Everything else just reads the job store.
    let shared = config.database_url.is_some();
    let generates = match cli.command {
        Command::Serve => true,
        Command::Submit { .. } => !shared,
        Command::Show { .. } | Command::List { .. } | Command::Download { .. } => false,
    };
    let service = if generates {
        ReportService::from_config(&config, source).await?
    } else {
        ReportService::connect(&config, source).await?
    };

    let result = match cli.command {
        Command::Serve => cmd_serve(&service).await,
        Command::Submit {
            title,
            report_type,
            period,
            format,
            charts,
            municipality,
            collector,
            start,
            end,
            requested_by,
            wait,
            wait_secs,
        } => {
            let mut request =
                ReportRequest::new(title, report_type, period, format).include_charts(charts);
            if let Some(id) = municipality {
                request = request.municipality(id);
            }
            if let Some(id) = collector {
                request = request.collector(id);
            }
            request = request.date_range(start, end);
            // Without a shared store the job dies with this process.
            let wait = wait || !shared;
            if wait && shared {
                tracing::info!("waiting for a `reportq serve` process to generate the report");
            }
            cmd_submit(&service, &request, &requested_by, wait, wait_secs).await
        }
        Command::Show { id } => cmd_show(&service, &id).await,
        Command::List { status, limit } => cmd_list(&service, status, limit).await,
        Command::Download { id, out } => cmd_download(&service, &id, &out).await,
    };

    service.shutdown().await;
    result
}

async fn cmd_serve(service: &ReportService) -> anyhow::Result<()> {
    tracing::info!("serving, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!(active = service.active_workers(), "shutting down");
    Ok(())
}

async fn cmd_submit(
    service: &ReportService,
    request: &ReportRequest,
    requested_by: &str,
    wait: bool,
    wait_secs: u64,
) -> anyhow::Result<()> {
    let submission = service.submit(request, requested_by).await?;
    println!("Submitted: {} (status: {})", submission.id, submission.status);
    if !wait {
        return Ok(());
    }

    let job = service
        .tracker()
        .wait_for_terminal(
            submission.id,
            Duration::from_millis(200),
            Duration::from_secs(wait_secs),
        )
        .await?;
    print_job(&job);
    Ok(())
}

async fn cmd_show(service: &ReportService, id: &str) -> anyhow::Result<()> {
    let id = resolve_id(service, id).await?;
    let job = service.get(id).await?;
    print_job(&job);
    Ok(())
}

async fn cmd_list(
    service: &ReportService,
    status: Option<String>,
    limit: usize,
) -> anyhow::Result<()> {
    let status: Option<JobStatus> = match status {
        Some(s) => Some(
            s.parse()
                .map_err(|_| anyhow::anyhow!("invalid status: {s}"))?,
        ),
        None => None,
    };

    let reports = service.list(status, limit).await?;
    if reports.is_empty() {
        println!("No reports found.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<12}  {:<10}  {:<11}  {:<6}  {:<9}  TITLE",
        "ID", "TYPE", "PERIOD", "STATUS", "FORMAT", "SIZE"
    );
    println!("{}", "-".repeat(90));
    for report in &reports {
        let short_id = &report.id.to_string()[..8];
        println!(
            "{:<8}  {:<12}  {:<10}  {:<11}  {:<6}  {:<9}  {}",
            short_id,
            report.report_type,
            report.period,
            report.status,
            report.format,
            report.file_size.as_deref().unwrap_or("-"),
            report.title
        );
    }
    println!("\n{} report(s)", reports.len());
    Ok(())
}

async fn cmd_download(service: &ReportService, id: &str, out: &Path) -> anyhow::Result<()> {
    let id = resolve_id(service, id).await?;
    let download = service.download(id).await?;
    tokio::fs::create_dir_all(out).await?;
    let target = out.join(&download.filename);
    tokio::fs::write(&target, &download.bytes).await?;
    println!("Wrote {} ({} bytes)", target.display(), download.bytes.len());
    Ok(())
}

/// Accept a full UUID or a unique prefix of one.
async fn resolve_id(service: &ReportService, raw: &str) -> anyhow::Result<JobId> {
    if raw.len() >= 36 {
        return Ok(raw.parse()?);
    }
    let reports = service.list(None, 500).await?;
    let matches: Vec<_> = reports
        .iter()
        .filter(|r| r.id.to_string().starts_with(raw))
        .collect();
    match matches.as_slice() {
        [] => anyhow::bail!("no report matching prefix '{raw}'"),
        [only] => Ok(only.id),
        many => anyhow::bail!("{} reports match prefix '{raw}', be more specific", many.len()),
    }
}

fn print_job(job: &ReportJob) {
    println!("ID:           {}", job.id);
    println!("Title:        {}", job.title);
    println!("Type:         {}", job.report_type);
    println!("Period:       {}", job.period);
    println!("Format:       {}", job.format);
    println!("Charts:       {}", job.include_charts);
    println!(
        "Municipality: {}",
        job.filters.municipality_id.as_deref().unwrap_or("-")
    );
    println!(
        "Collector:    {}",
        job.filters.collector_id.as_deref().unwrap_or("-")
    );
    println!("Status:       {}", job.status);
    println!("Requested by: {}", job.requested_by);
    println!("Created:      {}", job.created_at);
    if let Some(generated) = job.generated_date {
        println!("Generated:    {generated}");
    }
    if let Some(ref path) = job.file_path {
        println!("File:         {path}");
    }
    if let Some(ref size) = job.file_size {
        println!("Size:         {size}");
    }
    if let Some(ref reason) = job.failure_reason {
        println!("Failure:      {reason}");
    }
}
