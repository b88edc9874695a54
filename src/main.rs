//! AuditQ - coalescing analysis queue for local projects
//!
//! Turns analysis triggers into per-module jobs, holds them in a bounded
//! queue that merges requests for the same module, and runs each job
//! through an external static-analysis engine.
//!
//! Exit codes:
//!   0 - Success (no issues above threshold, or no --fail-on set)
//!   1 - Runtime error (config, events file, report write, etc.)
//!   2 - Issues found above --fail-on threshold

mod analysis;
mod cli;
mod config;
mod models;
mod queue;
mod report;
mod scanner;

use analysis::{
    AnalysisEngine, AnalysisSession, CommandEngine, LoggingListener, ScopeResolver,
    SubmitOutcome, Submitter, TaskRunner, TriggerEvent,
};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use models::{JobOutcome, Severity};
use report::Report;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is resolved before logging so `general.verbose` can set the level.
    let (root, config, config_source) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level(args.quiet));

    info!("AuditQ v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    info!("Project root: {}", root.display());
    info!("Configuration: {}", config_source);

    match run(args, root, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .auditq.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set the engine command, queue capacity and module roots.");
    Ok(())
}

/// Initialize logging at `level`. RUST_LOG overrides the level.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Resolve the project root and the effective, validated configuration.
fn prepare(args: &Args) -> Result<(PathBuf, Config, String)> {
    let local = args
        .local
        .clone()
        .context("--local is required")?;
    let root = std::fs::canonicalize(&local)
        .with_context(|| format!("Failed to resolve project directory: {}", local.display()))?;

    let (mut config, source) = load_config(args, &root)?;
    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;

    Ok((root, config, source))
}

/// Run the submit/drain/report workflow. Returns exit code (0 or 2).
async fn run(args: Args, root: PathBuf, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let scanner = scanner::FileScanner::new(root.clone(), scanner::ScanConfig::from(&config.scanner));
    let submitter = Submitter::new(
        models::ProjectId::new(root.clone()),
        scanner,
        ScopeResolver::new(&config.scopes.roots),
    )
    .coalesce_manual(config.queue.coalesce_manual);

    let session = AnalysisSession::new(root.clone(), config.queue.capacity);

    let events = collect_events(&args, &submitter)?;
    info!("{} trigger event(s) to submit", events.len());

    let engine = CommandEngine::from(&config.engine);
    let runner = TaskRunner::new(engine)
        .with_listener(LoggingListener)
        .show_progress(!args.quiet);

    println!("📥 Submitting {} trigger event(s)...", events.len());
    println!(
        "   Queue capacity: {} | Coalescing: {}",
        config.queue.capacity,
        if config.queue.coalesce { "on" } else { "off" }
    );

    let mut submitted = SubmitOutcome::default();
    let mut outcomes: Vec<JobOutcome> = Vec::new();

    for event in &events {
        submitted += session.submit(&submitter, event, config.queue.coalesce).await?;

        if args.drain_each && !args.dry_run {
            outcomes.extend(runner.drain(&session).await);
        }
    }

    if submitted.rejected > 0 {
        warn!(
            "{} job(s) were rejected because the queue was full",
            submitted.rejected
        );
    }

    if args.dry_run {
        let pending = session.snapshot().await;
        print_dry_run(&pending, &submitted);
        session.close().await;
        return Ok(0);
    }

    println!("\n🔬 Running analysis with `{}`...", runner.engine().name());
    outcomes.extend(runner.drain(&session).await);
    session.close().await;

    if let Some(min_level) = args.min_severity {
        analysis::retain_min_severity(&mut outcomes, Severity::from(min_level));
    }

    let duration = start_time.elapsed().as_secs_f64();
    let report = Report::new(
        root.display().to_string(),
        runner.engine().name().to_string(),
        submitted,
        outcomes,
        duration,
    );

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    let summary = &report.summary;
    println!("\n📊 Analysis Summary:");
    println!(
        "   Jobs run: {} ({} failed)",
        report.metadata.jobs_run, report.metadata.jobs_failed
    );
    println!(
        "   Queue: {} queued | {} coalesced | {} rejected",
        submitted.queued, submitted.coalesced, submitted.rejected
    );
    println!("   Total issues: {}", summary.total);
    println!(
        "   - 🔴 Critical: {} | 🟠 High: {} | 🟡 Medium: {} | 🟢 Low: {}",
        summary.critical, summary.high, summary.medium, summary.low
    );
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    if let Some(fail_level) = args.fail_on {
        let threshold = Severity::from(fail_level);
        let has_issues_above = report
            .jobs
            .iter()
            .flat_map(|j| &j.issues)
            .any(|i| i.severity >= threshold);

        if has_issues_above {
            eprintln!(
                "\n⛔ Issues found at or above {} severity. Failing (exit code 2).",
                threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Trigger events from --events, positional files, or a full project scan.
fn collect_events(args: &Args, submitter: &Submitter) -> Result<Vec<TriggerEvent>> {
    if let Some(ref path) = args.events {
        info!("Reading trigger events from: {}", path.display());
        return TriggerEvent::read_jsonl(path);
    }

    if !args.files.is_empty() {
        return Ok(vec![TriggerEvent::new(args.trigger, args.files.clone())]);
    }

    debug!("No files given, scanning the whole project");
    Ok(vec![submitter.scan_event(args.trigger)?])
}

/// Handle --dry-run: print the queued jobs without running the engine.
fn print_dry_run(pending: &[models::Job], submitted: &SubmitOutcome) {
    println!("\n🔍 Dry run: jobs queued (engine not called)...\n");

    if pending.is_empty() {
        println!("   Queue is empty. No matching source files.");
    } else {
        for (i, job) in pending.iter().enumerate() {
            println!(
                "   {}. {} [{}] - {} files",
                i + 1,
                job.scope(),
                job.trigger(),
                job.files().len()
            );
            for file in job.files() {
                println!("        📄 {}", file.display());
            }
        }
    }

    println!(
        "\n   {} queued, {} coalesced, {} rejected, {} files skipped",
        submitted.queued, submitted.coalesced, submitted.rejected, submitted.skipped_files
    );
    println!("\n✅ Dry run complete. No analysis was run.");
}

/// Load configuration: explicit path, then the project root, then the working directory.
///
/// Returns the configuration and a description of where it came from.
fn load_config(args: &Args, root: &Path) -> Result<(Config, String)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    if let Some(config) = Config::load_from_dir(root)? {
        return Ok((config, root.join(config::CONFIG_FILE).display().to_string()));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, config::CONFIG_FILE.to_string())),
        Ok(None) => Ok((Config::default(), "defaults".to_string())),
        Err(e) => Ok((Config::default(), format!("defaults ({:#})", e))),
    }
}
