//! CLI entry point for the corridor prioritization feature pipeline.
//!
//! Provides subcommands for building the clustering-ready feature table
//! from 3-year accident data and for checking the corridor reference
//! grid.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use corridor_prioritizer::dates;
use corridor_prioritizer::output::write_feature_table;
use corridor_prioritizer::pipeline::build_feature_table;
use corridor_prioritizer::registry::CorridorRegistry;
use corridor_prioritizer::store::PgStore;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Known coverage of the accident store, as (year, month, day). As-of
/// dates outside this range cannot produce a meaningful 3-year table.
const COVERAGE_START: (i32, u32, u32) = (2018, 1, 1);
const COVERAGE_END: (i32, u32, u32) = (2023, 1, 31);

const DEFAULT_REGISTRY: &str = "Malla_Vial_Integral_Bogota_r2.geojson";

#[derive(Parser)]
#[command(name = "corridor_prioritizer")]
#[command(about = "Builds per-corridor road-safety features from accident data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the feature table from 3-year data up to a date
    Features {
        /// As-of year
        #[arg(long)]
        year: i32,

        /// As-of month
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        /// As-of day; clamped to the month's last day
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
        day: u32,

        /// Corridor reference GeoJSON file
        #[arg(short, long, default_value = DEFAULT_REGISTRY)]
        registry: String,

        /// CSV file to write the feature table to
        #[arg(short, long, default_value = "corridor_features.csv")]
        output: String,
    },
    /// Load the corridor reference grid and report usable corridors
    Corridors {
        /// Corridor reference GeoJSON file
        #[arg(short, long, default_value = DEFAULT_REGISTRY)]
        registry: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/corridor_prioritizer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("corridor_prioritizer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Features {
            year,
            month,
            day,
            registry,
            output,
        } => {
            if (year, month, day) < COVERAGE_START {
                anyhow::bail!(
                    "as-of date {year}-{month:02}-{day:02} predates store coverage ({}-{:02}-{:02})",
                    COVERAGE_START.0,
                    COVERAGE_START.1,
                    COVERAGE_START.2
                );
            }
            if (year, month, day) > COVERAGE_END {
                warn!(
                    year,
                    month, day, "As-of date is past known store coverage; the window may be short"
                );
            }

            let as_of = dates::clamp_day(year, month, day)
                .ok_or_else(|| anyhow::anyhow!("invalid date {year}-{month:02}-{day:02}"))?;
            info!(as_of = %as_of, "Building feature table");

            let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
            let store = PgStore::connect(&database_url).await?;

            let features = build_feature_table(&store, Path::new(&registry), as_of).await?;
            write_feature_table(&output, &features)?;
            info!(rows = features.len(), output = %output, "Feature table written");
        }
        Commands::Corridors { registry } => {
            let grid = CorridorRegistry::load(Path::new(&registry))?;
            info!(corridors = grid.len(), registry = %registry, "Corridor reference grid OK");
        }
    }

    Ok(())
}
