//! EPSG:2263 (NAD83 / New York Long Island, US survey feet) ⇄ WGS84
//!
//! Lambert conformal conic with two standard parallels on the GRS80
//! ellipsoid. NAD83 and WGS84 are treated as identical, which is well below
//! the precision of the zone boundaries.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const SEMI_MAJOR_M: f64 = 6_378_137.0;
const INVERSE_FLATTENING: f64 = 298.257_222_101;

/// Metres per US survey foot.
pub const US_SURVEY_FOOT_M: f64 = 1200.0 / 3937.0;

const LAT_1_DEG: f64 = 41.0 + 2.0 / 60.0;
const LAT_2_DEG: f64 = 40.0 + 40.0 / 60.0;
const LAT_ORIGIN_DEG: f64 = 40.0 + 10.0 / 60.0;
const LON_ORIGIN_DEG: f64 = -74.0;
const FALSE_EASTING_M: f64 = 300_000.0;
const FALSE_NORTHING_M: f64 = 0.0;

const MAX_ITERATIONS: usize = 15;
const CONVERGENCE_RAD: f64 = 1e-12;

/// Precomputed projection constants.
#[derive(Debug, Clone, Copy)]
pub struct LongIslandProjection {
    e: f64,
    n: f64,
    a_f: f64,
    rho_0: f64,
    lon_0: f64,
}

impl Default for LongIslandProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl LongIslandProjection {
    pub fn new() -> Self {
        let f = 1.0 / INVERSE_FLATTENING;
        let e = (2.0 * f - f * f).sqrt();

        let m = |phi: f64| phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt();
        let t = |phi: f64| {
            let es = e * phi.sin();
            (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
        };

        let phi_1 = LAT_1_DEG.to_radians();
        let phi_2 = LAT_2_DEG.to_radians();
        let phi_0 = LAT_ORIGIN_DEG.to_radians();

        let (m1, m2) = (m(phi_1), m(phi_2));
        let (t1, t2, t0) = (t(phi_1), t(phi_2), t(phi_0));

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let a_f = SEMI_MAJOR_M * big_f;

        Self {
            e,
            n,
            a_f,
            rho_0: a_f * t0.powf(n),
            lon_0: LON_ORIGIN_DEG.to_radians(),
        }
    }

    fn t(&self, phi: f64) -> f64 {
        let es = self.e * phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)
    }

    /// `(lon, lat)` in degrees → `(x, y)` in US survey feet.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.a_f * self.t(lat.to_radians()).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon_0);

        let easting = FALSE_EASTING_M + rho * theta.sin();
        let northing = FALSE_NORTHING_M + self.rho_0 - rho * theta.cos();
        (easting / US_SURVEY_FOOT_M, northing / US_SURVEY_FOOT_M)
    }

    /// `(x, y)` in US survey feet → `(lon, lat)` in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let de = x * US_SURVEY_FOOT_M - FALSE_EASTING_M;
        let dn = self.rho_0 - (y * US_SURVEY_FOOT_M - FALSE_NORTHING_M);

        let rho = self.n.signum() * (de * de + dn * dn).sqrt();
        let t = (rho / self.a_f).powf(1.0 / self.n);
        let theta = de.atan2(dn);

        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..MAX_ITERATIONS {
            let es = self.e * phi.sin();
            let next =
                FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            let done = (next - phi).abs() < CONVERGENCE_RAD;
            phi = next;
            if done {
                break;
            }
        }

        let lon = theta / self.n + self.lon_0;
        (lon.to_degrees(), phi.to_degrees())
    }
}
