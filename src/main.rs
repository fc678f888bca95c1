//! ecomdash - E-commerce dashboard reports from CSV extracts
//!
//! Loads pre-aggregated order, review, seller and customer tables,
//! applies a purchase date range and renders the data behind every
//! dashboard chart as a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (bad arguments, missing table, malformed data, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod extract;
mod loader;
mod models;
mod report;

use analysis::DateRange;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use loader::{DataFiles, TableLoader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

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

    // Config is read before logging so `[general] verbose` can set the level
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(&args));

    info!("ecomdash v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_source);
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config) {
        error!("Dashboard failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .ecomdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to customize file names, thresholds and report sizes.");
    Ok(())
}

/// Initialize logging at `level`.
///
/// `RUST_LOG` wins over the level picked from flags and config.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
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

/// Run the selected workflow.
fn run(args: Args, config: Config) -> Result<()> {
    let data_dir = PathBuf::from(&config.data.dir);
    let settings = config.analysis_settings();

    if let Some(ref raw_dir) = args.extract_from {
        return handle_extract(raw_dir, &data_dir, &config, &args);
    }

    let start_time = Instant::now();

    println!("📥 Loading tables from: {}", data_dir.display());
    let loader = TableLoader::new(data_dir.clone(), !args.quiet);
    let mut dataset = loader
        .load_dataset(&DataFiles::from(&config.data))
        .with_context(|| format!("Failed to load tables from {}", data_dir.display()))?;

    let annotated = analysis::append_delay_days(&mut dataset.shipping);
    debug!("Computed delay for {} shipments", annotated);

    let bounds = DateRange::bounds(&dataset.revenue)?;

    if args.dry_run {
        return handle_dry_run(&dataset, bounds);
    }

    let range = DateRange::select(bounds, args.start, args.end)?;
    println!("🔬 Building dashboard for {}", range);

    let dashboard = analysis::build_dashboard(&dataset, bounds, range, &settings)?;

    println!("\n📝 Generating report...");
    let (output, output_path) = match args.format {
        OutputFormat::Json => (
            report::generate_json_report(&dashboard)?,
            output_path(&args, &config, "json"),
        ),
        OutputFormat::Markdown => (
            report::generate_markdown_report(
                &dashboard,
                &report::ReportOptions::from(&config.report),
            ),
            output_path(&args, &config, "md"),
        ),
    };

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Dashboard Summary:");
    println!("   Orders in range: {}", dashboard.metrics.total_orders);
    println!(
        "   Revenue in range: {}",
        report::generator::format_currency(
            dashboard.metrics.total_revenue,
            &config.report.currency_symbol
        )
    );
    println!("   Months: {}", dashboard.monthly_orders.len());
    println!("   Cities on map: {}", dashboard.customer_map.markers.len());
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Dashboard complete! Report saved to: {}",
        output_path.display()
    );

    Ok(())
}

/// The configured output path, with a `.json` extension swapped in when
/// JSON is requested without an explicit `--output`.
fn output_path(args: &Args, config: &Config, extension: &str) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if args.output.is_none() && extension == "json" {
        path.with_extension(extension)
    } else {
        path
    }
}

/// Handle --extract-from: aggregate raw extracts into the data directory.
fn handle_extract(raw_dir: &Path, data_dir: &Path, config: &Config, args: &Args) -> Result<()> {
    println!("🧮 Building summary tables from: {}", raw_dir.display());

    let loader = TableLoader::new(raw_dir.to_path_buf(), !args.quiet);
    let raw = loader
        .load_raw()
        .with_context(|| format!("Failed to load raw extracts from {}", raw_dir.display()))?;

    let written = extract::build_extracts(
        &raw,
        data_dir,
        &DataFiles::from(&config.data),
        &config.analysis_settings(),
    )?;

    for table in &written {
        println!("     📄 {} ({} rows)", table.path.display(), table.rows);
    }
    println!("\n✅ Wrote {} summary tables.", written.len());
    Ok(())
}

/// Handle --dry-run: report what was loaded and exit.
fn handle_dry_run(dataset: &loader::Dataset, bounds: DateRange) -> Result<()> {
    println!("\n🔍 Dry run: tables loaded, no report written\n");

    for (table, rows) in dataset.row_counts() {
        println!("     📄 {} ({} rows)", table, rows);
    }
    println!("\n   Purchases span {}", bounds);

    println!("\n✅ Dry run complete.");
    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so it returns a description of where
/// the configuration came from instead of logging it.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, config::CONFIG_FILE.to_string())),
        Ok(None) => Ok((Config::default(), "defaults".to_string())),
        Err(e) => {
            eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
            Ok((Config::default(), "defaults".to_string()))
        }
    }
}
