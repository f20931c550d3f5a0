//! Point-in-polygon tests on `[lon, lat]` rings

use serde::{Deserialize, Serialize};

/// Polygon in geographic coordinates, each position `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPolygon {
    pub exterior: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<[f64; 2]>>,
}

/// Even-odd ray casting. Points exactly on an edge may land either side.
pub fn ring_contains(ring: &[[f64; 2]], lon: f64, lat: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > lat) != (yj > lat) {
            let x_cross = (xj - xi) * (lat - yi) / (yj - yi) + xi;
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

impl GeoPolygon {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        ring_contains(&self.exterior, lon, lat)
            && !self.holes.iter().any(|h| ring_contains(h, lon, lat))
    }

    /// `(min_lon, min_lat, max_lon, max_lat)` of the exterior ring.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let first = self.exterior.first()?;
        Some(self.exterior.iter().fold(
            [first[0], first[1], first[0], first[1]],
            |[x0, y0, x1, y1], p| [x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1])],
        ))
    }
}
