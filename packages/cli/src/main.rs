#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the road hazard tools.
//!
//! ```text
//! road_hazard serve
//! road_hazard replay-motion <samples.csv>
//! road_hazard analyze-route <route.json>
//! road_hazard nearby --at <lat,lng> [--radius 100]
//! ```
//!
//! Configuration comes from the embedded defaults, `ROAD_HAZARD_CONFIG`
//! and `ROAD_HAZARD_DATA_FILE`.

mod replay;

use std::fs::File;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use road_hazard_analytics::{filter_by_proximity, status_text};
use road_hazard_cli_utils::{init_logger, parse_point};
use road_hazard_config::AppConfig;
use road_hazard_models::{GeoPoint, HazardFilters, HazardRecord};
use road_hazard_prediction::{FixedRoute, NearestElevation, PredictionEngine};
use road_hazard_server_models::AnalyzeRouteRequest;
use road_hazard_store::{FileStore, HazardStore as _};

#[derive(Parser)]
#[command(name = "road_hazard", about = "Road hazard detection and verification tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,
    /// Classify recorded accelerometer samples (CSV: x,y,z,timestamp_ms)
    ReplayMotion {
        /// CSV file with one sample per row
        file: PathBuf,
    },
    /// Predict hazards along a saved route (JSON: {"route": ..., "elevations": [...]})
    AnalyzeRoute {
        /// Route file
        file: PathBuf,
    },
    /// List stored hazards around a position
    Nearby {
        /// Position as `lat,lng`
        #[arg(long, value_parser = parse_point)]
        at: GeoPoint,
        /// Search radius in meters (defaults to the warning distance)
        #[arg(long)]
        radius: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(road_hazard_server::run_server(config))
            })
            .await??;
        }
        Commands::ReplayMotion { file } => {
            let samples = replay::read_samples(File::open(&file)?)?;
            let detections = replay::replay(samples, config.motion).await;

            for detection in &detections {
                println!("{}", serde_json::to_string(detection)?);
            }
            println!("\n{} detection(s)", detections.len());
        }
        Commands::AnalyzeRoute { file } => {
            let request: AnalyzeRouteRequest = serde_json::from_reader(File::open(&file)?)?;
            let (Some(origin), Some(destination)) =
                (request.route.path.first(), request.route.path.last())
            else {
                eprintln!("Route in {} has no path", file.display());
                std::process::exit(1);
            };
            let (origin, destination) = (*origin, *destination);

            let existing = stored_hazards(&config).await;
            let engine = PredictionEngine::new(config.prediction);
            let (_, analysis) = engine
                .plan_and_analyze(
                    &FixedRoute::new(request.route),
                    origin,
                    destination,
                    &NearestElevation::new(request.elevations),
                    &existing,
                )
                .await?;

            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Nearby { at, radius } => {
            let radius = radius.unwrap_or(config.navigation.warning_distance_m);
            let hazards = stored_hazards(&config).await;
            let nearby = filter_by_proximity(&hazards, Some(at), radius, &HazardFilters::default());

            println!("{}", status_text(&nearby));
            for entry in &nearby {
                let hazard = &entry.hazard;
                println!(
                    "{:<34} {:<14} {:<7} {:>6.0}m {}",
                    hazard.id.as_str(),
                    hazard.hazard_type.as_ref(),
                    hazard.severity.as_ref(),
                    entry.distance_from_user,
                    if hazard.verified { "verified" } else { "" }
                );
            }
        }
    }

    Ok(())
}

/// Hazards from the configured data file, or none if it cannot be read.
async fn stored_hazards(config: &AppConfig) -> Vec<HazardRecord> {
    let store = FileStore::new(config.store.data_file.clone());
    match store.list().await {
        Ok(hazards) => hazards,
        Err(e) => {
            log::warn!(
                "Could not read hazards from {}: {e}",
                config.store.data_file.display()
            );
            Vec::new()
        }
    }
}
