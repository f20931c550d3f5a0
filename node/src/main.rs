use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::PathBuf;
use std::sync::Arc;
use taxiscore_pipeline::{
    FsHotspotModelSource, FsScoringSource, HotspotResources, HotspotService, TripScoringService,
};
use taxiscore_reference::{ZoneDirectory, ZoneLocator};
use taxiscore_rpc::{start_server, AppState};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod tools;

use config::{AppConfig, HotspotConfig, LoggingConfig, MetricsConfig};

#[derive(Parser)]
#[command(name = "taxiscore")]
#[command(about = "NYC taxi trip scoring and pickup hotspot prediction")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); defaults to ./taxiscore.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Project the taxi zone export (WKT, EPSG:2263) to WGS84 JSON
    PreprocessZones {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Convert an XGBoost or LightGBM JSON export to the native model format
    ConvertModel {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },

    /// Print the blake3 fingerprint of a model
    ModelHash { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Commands::PreprocessZones { input, output } => {
            for (place, zone) in tools::run_preprocess_zones(&input, &output)? {
                match zone {
                    Some(zone) => println!("{place}: {zone}"),
                    None => println!("{place}: no zone"),
                }
            }
            Ok(())
        }
        Commands::ConvertModel { input, output } => {
            let hash = tools::run_convert_model(&input, &output)?;
            println!("{hash}  {}", output.display());
            Ok(())
        }
        Commands::ModelHash { path } => {
            println!("{}", tools::run_model_hash(&path)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let metrics = init_metrics(&config.metrics);

    let zones = Arc::new(
        ZoneDirectory::load(&config.scoring.zone_coordinates).with_context(|| {
            format!(
                "failed to load zone directory {}",
                config.scoring.zone_coordinates.display()
            )
        })?,
    );
    let source = FsScoringSource::new(config.scoring.model_roots.clone(), zones);
    let trips = Arc::new(TripScoringService::new(Arc::new(source)));

    let months = config.scoring.preload()?;
    if !months.is_empty() {
        let service = trips.clone();
        tokio::task::spawn_blocking(move || service.preload(&months))
            .await
            .context("preload task failed")?
            .context("failed to preload scoring resources")?;
    }

    let mut state = AppState::new(trips);
    state.metrics = metrics;
    state.hotspots = load_hotspots(&config.hotspot).await;

    if let Some(path) = config.geometry.processed_zones.clone() {
        let locator = tokio::task::spawn_blocking(move || ZoneLocator::load_json(&path))
            .await
            .context("geometry task failed")?
            .context("failed to load processed zones")?;
        info!(zones = locator.len(), "zone lookup enabled");
        state.locator = Some(Arc::new(locator));
    }

    start_server(state, &config.server.addr()).await
}

/// Hotspot prediction is optional; failures disable the route.
async fn load_hotspots(config: &HotspotConfig) -> Option<Arc<HotspotService>> {
    if !config.enabled {
        info!("hotspot prediction disabled via configuration");
        return None;
    }

    let paths = config.paths();
    let lag_hours = config.lag_hours.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let zones = Arc::new(ZoneDirectory::load(&paths.zone_coordinates)?);
        let resources = HotspotResources::load(&paths, zones, lag_hours)?;
        let models = FsHotspotModelSource::new(&paths.models_dir);
        Ok::<_, taxiscore_pipeline::PipelineError>(HotspotService::new(
            Arc::new(resources),
            Arc::new(models),
        ))
    })
    .await;

    match loaded {
        Ok(Ok(service)) => {
            info!(
                zones = service.resources().zones.len(),
                "hotspot prediction enabled"
            );
            Some(Arc::new(service))
        }
        Ok(Err(err)) => {
            warn!("hotspot resources unavailable, /hotspots disabled: {}", err);
            None
        }
        Err(err) => {
            warn!("hotspot loading task failed: {}", err);
            None
        }
    }
}

fn init_metrics(config: &MetricsConfig) -> Option<PrometheusHandle> {
    if !config.enabled {
        info!("Prometheus metrics exporter disabled via configuration");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics exporter registered");
            describe_counter!(
                "taxiscore_http_requests_total",
                "HTTP requests handled, by route"
            );
            describe_histogram!(
                "taxiscore_score_duration_seconds",
                "Time spent scoring one trip, by model"
            );
            describe_histogram!(
                "taxiscore_hotspot_duration_seconds",
                "Time spent predicting hotspots for all zones"
            );
            Some(handle)
        }
        Err(err) => {
            warn!("Failed to install Prometheus metrics exporter: {}", err);
            None
        }
    }
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}
