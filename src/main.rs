//! Tokenboard - AI coding-assistant usage dashboard
//!
//! A CLI tool that merges daily token/cost exports from several AI
//! coding assistants and renders dashboard data: totals, trend lines,
//! an activity heatmap and the model distribution.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing input, parse failure, bad config, etc.)

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use report::DashboardOptions;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("Tokenboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Dashboard build failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .tokenboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the input path, range, metric and providers.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report written to stdout stays parseable.
fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load exports, build the dashboard and write the report.
fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input = config.input_path();
    let document = loader::load_path(&input)
        .with_context(|| format!("Failed to load usage data from {}", input.display()))?;

    let sources = document.provider_records();
    let series = analysis::merge_daily(&sources);
    if series.is_empty() {
        warn!("No usable daily records in {}", input.display());
    }
    info!(
        "Merged {} providers into {} days",
        sources.len(),
        series.len()
    );

    let mut options =
        DashboardOptions::from_report_config(&config.report, config.data.providers.clone());
    options.source = input.display().to_string();
    options.exported_at = document.generated_at.clone();

    let dashboard = report::build_dashboard(&series, &options);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&dashboard, config.report.daily_rows)
        }
    };

    let Some(ref path) = config.general.output else {
        println!("{}", output);
        return Ok(());
    };

    std::fs::write(path, &output).with_context(|| format!("Failed to write report to {}", path))?;

    // Print summary
    let totals = &dashboard.totals;
    println!("\n📊 Usage Summary ({}):", dashboard.metadata.range.label());
    println!("   Active days: {}", totals.active_days);
    println!(
        "   Tokens: {} | Cost: {}",
        report::generator::format_tokens(totals.total_tokens),
        report::generator::format_cost(totals.cost)
    );
    if let Some(top) = dashboard.models.first() {
        println!("   Top model: {} ({:.2}%)", top.model, top.percentage);
    }
    if let Some(ref trend) = dashboard.trend {
        println!("   Trend: {}", trend.direction);
    }
    println!("\n✅ Dashboard saved to: {}", path);

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
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
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
