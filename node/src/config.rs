use anyhow::{bail, Context, Result};
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use taxiscore_pipeline::HotspotPaths;
use taxiscore_reference::Month;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "taxiscore.toml";
pub const ENV_PREFIX: &str = "TAXISCORE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub scoring: ScoringConfig,
    pub hotspot: HotspotConfig,
    pub geometry: GeometryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter; `RUST_LOG` takes precedence.
    pub level: String,
    /// `pretty` or `json`-style single-line output.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Directories searched for `models/<month>/`, `Models/<month>/` and `<month>/`.
    pub model_roots: Vec<PathBuf>,
    pub zone_coordinates: PathBuf,
    /// Month names or abbreviations loaded before the server starts.
    pub preload_months: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_roots: vec![PathBuf::from("scoring_model"), PathBuf::from(".")],
            zone_coordinates: PathBuf::from("Data/zone_coordinates.csv"),
            preload_months: Vec::new(),
        }
    }
}

impl ScoringConfig {
    pub fn preload(&self) -> Result<Vec<Month>> {
        self.preload_months
            .iter()
            .map(|name| {
                Month::from_str(name)
                    .with_context(|| format!("invalid month in scoring.preload_months: {name}"))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    pub enabled: bool,
    pub zone_coordinates: PathBuf,
    pub poi: PathBuf,
    pub encoding_dir: PathBuf,
    pub model_features: PathBuf,
    pub models_dir: PathBuf,
    /// Adds proxy lag features from `lags` when set.
    pub use_lags: bool,
    pub lags: PathBuf,
    pub lag_hours: Vec<u32>,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        let dir = PathBuf::from("hotspot_model");
        Self {
            enabled: true,
            zone_coordinates: dir.join("zone_coordinates.csv"),
            poi: dir.join("zone_stats_with_all_densities.csv"),
            encoding_dir: PathBuf::from("models/encoding_maps"),
            model_features: dir.join("model_features.json"),
            models_dir: dir.join("models"),
            use_lags: false,
            lags: dir.join("historical_lags.csv"),
            lag_hours: vec![1, 2],
        }
    }
}

impl HotspotConfig {
    pub fn paths(&self) -> HotspotPaths {
        HotspotPaths {
            zone_coordinates: self.zone_coordinates.clone(),
            poi: self.poi.clone(),
            encoding_dir: self.encoding_dir.clone(),
            model_features: self.model_features.clone(),
            models_dir: self.models_dir.clone(),
            lags: self.use_lags.then(|| self.lags.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Output of `preprocess-zones`; enables `/zones/lookup`.
    pub processed_zones: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults, then the TOML file, then `TAXISCORE__SECTION__KEY` variables.
    pub fn load(config_path_override: Option<&Path>) -> Result<Self> {
        Self::load_with(config_path_override, None)
    }

    fn load_with(
        config_path_override: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let resolved_path = if let Some(path) = config_path_override {
            if !path.exists() {
                bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            Some(path.to_path_buf())
        } else {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            path.exists().then_some(path)
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .source(env),
        );

        let config = builder.build().context("failed to read configuration")?;
        config
            .try_deserialize()
            .context("failed to parse configuration")
    }
}
