//! Taxi zone geometry
//!
//! The zone export stores boundaries as WKT in EPSG:2263. Preprocessing
//! projects them once into WGS84 JSON, which [`ZoneLocator`] then answers
//! point queries against.

pub mod polygon;
pub mod projection;
pub mod wkt;

pub use polygon::GeoPolygon;
pub use projection::LongIslandProjection;

use crate::errors::{ReferenceError, Result};
use crate::table::{field, parse_float, parse_id, CsvTable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Known places reported after preprocessing as a sanity check.
pub const SAMPLE_LOCATIONS: [(&str, f64, f64); 4] = [
    ("JFK Airport", 40.6396, -73.7828),
    ("Times Square", 40.7580, -73.9855),
    ("Central Park", 40.7829, -73.9654),
    ("Outside NYC", 39.9526, -75.1652),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}

/// Zone with WGS84 polygons, as written by preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedZone {
    pub id: i64,
    pub name: String,
    pub borough: String,
    pub centroid: Centroid,
    pub polygons: Vec<GeoPolygon>,
}

impl ProcessedZone {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(lon, lat))
    }
}

/// Result of converting a zone CSV.
#[derive(Debug, Clone, Default)]
pub struct PreprocessOutcome {
    pub zones: Vec<ProcessedZone>,
    /// Names of rows that were dropped, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Project WKT polygons from EPSG:2263 feet into `[lon, lat]` rings.
pub fn project_wkt(text: &str, projection: &LongIslandProjection) -> Result<Vec<GeoPolygon>> {
    let to_geo = |ring: &wkt::Ring| -> Vec<[f64; 2]> {
        ring.iter()
            .map(|&(x, y)| {
                let (lon, lat) = projection.inverse(x, y);
                [lon, lat]
            })
            .collect()
    };

    Ok(wkt::parse_polygons(text)?
        .iter()
        .map(|p| GeoPolygon {
            exterior: to_geo(&p.exterior),
            holes: p.holes.iter().map(to_geo).collect(),
        })
        .collect())
}

/// Convert `zone_coordinates.csv` (with `LocationID`, `zone`, `borough`,
/// `centroid_lat`, `centroid_lon`, `geometry`) into processed zones.
#[instrument(level = "debug")]
pub fn preprocess_zones(csv_path: &Path) -> Result<PreprocessOutcome> {
    let table = CsvTable::load(csv_path)?;
    preprocess_table(&table)
}

pub fn preprocess_table(table: &CsvTable) -> Result<PreprocessOutcome> {
    let location_id = table.require("LocationID")?;
    let zone = table.require("zone")?;
    let borough = table.require("borough")?;
    let lat_col = table.require("centroid_lat")?;
    let lon_col = table.require("centroid_lon")?;
    let geometry = table.require("geometry")?;

    let projection = LongIslandProjection::new();
    let mut outcome = PreprocessOutcome::default();

    for record in table.records() {
        let name = field(record, zone).to_string();

        let Some(id) = parse_id(field(record, location_id)) else {
            warn!(zone = %name, "skipping zone without a LocationID");
            outcome.skipped.push((name, "missing LocationID".to_string()));
            continue;
        };
        let (Some(lat), Some(lon)) = (
            parse_float(field(record, lat_col)),
            parse_float(field(record, lon_col)),
        )
        else {
            warn!(zone = %name, id, "skipping zone without a centroid");
            outcome.skipped.push((name, "missing centroid".to_string()));
            continue;
        };

        match project_wkt(field(record, geometry), &projection) {
            Ok(polygons) if !polygons.is_empty() => {
                debug!(id, zone = %name, polygons = polygons.len(), "processed zone");
                outcome.zones.push(ProcessedZone {
                    id,
                    name,
                    borough: field(record, borough).to_string(),
                    centroid: Centroid { lat, lon },
                    polygons,
                });
            }
            Ok(_) => {
                warn!(id, zone = %name, "zone has no polygons");
                outcome.skipped.push((name, "empty geometry".to_string()));
            }
            Err(e) => {
                warn!(id, zone = %name, error = %e, "failed to process zone geometry");
                outcome.skipped.push((name, e.to_string()));
            }
        }
    }

    info!(
        processed = outcome.zones.len(),
        skipped = outcome.skipped.len(),
        "zone preprocessing finished"
    );
    Ok(outcome)
}

pub fn write_processed(path: &Path, zones: &[ProcessedZone]) -> Result<()> {
    let json = serde_json::to_string_pretty(zones).map_err(|e| ReferenceError::json(path, e))?;
    std::fs::write(path, json).map_err(|e| ReferenceError::io(path, e))
}

/// Finds the zone containing a WGS84 point.
#[derive(Debug, Clone, Default)]
pub struct ZoneLocator {
    zones: Vec<ProcessedZone>,
    bounds: Vec<Option<[f64; 4]>>,
}

impl ZoneLocator {
    pub fn new(zones: Vec<ProcessedZone>) -> Self {
        let bounds = zones
            .iter()
            .map(|z| {
                z.polygons
                    .iter()
                    .filter_map(GeoPolygon::bounds)
                    .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])])
            })
            .collect();
        Self { zones, bounds }
    }

    #[instrument(level = "debug")]
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReferenceError::io(path, e))?;
        let zones: Vec<ProcessedZone> =
            serde_json::from_str(&text).map_err(|e| ReferenceError::json(path, e))?;
        debug!(zones = zones.len(), "loaded processed zones");
        Ok(Self::new(zones))
    }

    /// First zone, in file order, whose polygons contain the point.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<&ProcessedZone> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        self.zones
            .iter()
            .zip(&self.bounds)
            .filter(|(_, b)| {
                b.map_or(false, |[x0, y0, x1, y1]| {
                    lon >= x0 && lon <= x1 && lat >= y0 && lat <= y1
                })
            })
            .map(|(z, _)| z)
            .find(|z| z.contains(lat, lon))
    }

    pub fn zones(&self) -> &[ProcessedZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
