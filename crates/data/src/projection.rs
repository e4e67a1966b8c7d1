use std::f64::consts::FRAC_PI_4;

use geo::{Coord, Rect};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Coordinate system of the borough boundary geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCrs {
    /// Longitude/latitude degrees.
    Wgs84,
    /// EPSG:2263, NAD83 / New York Long Island in US survey feet.
    NyLongIsland,
}

impl BoundaryCrs {
    /// `Ok(None)` means detect from the data.
    pub fn parse(value: &str) -> Result<Option<Self>, String> {
        match value.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(None),
            "wgs84" | "epsg4326" | "epsg:4326" | "4326" => Ok(Some(Self::Wgs84)),
            "epsg2263" | "epsg:2263" | "2263" | "ny-long-island" => Ok(Some(Self::NyLongIsland)),
            other => Err(format!(
                "unknown boundary crs `{other}` (expected auto, wgs84 or epsg2263)"
            )),
        }
    }

    /// Degrees never exceed 360 in magnitude; state plane feet always do.
    pub fn detect(bounds: Rect<f64>) -> Self {
        let min = bounds.min();
        let max = bounds.max();
        if [min.x, min.y, max.x, max.y]
            .iter()
            .any(|value| value.abs() > 360.0)
        {
            Self::NyLongIsland
        } else {
            Self::Wgs84
        }
    }

    /// Maps a WGS84 point into this system's plane.
    pub fn project(self, latitude: f64, longitude: f64) -> Coord<f64> {
        match self {
            Self::Wgs84 => Coord {
                x: longitude,
                y: latitude,
            },
            Self::NyLongIsland => LONG_ISLAND.forward(latitude, longitude),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wgs84 => "wgs84",
            Self::NyLongIsland => "epsg2263",
        }
    }
}

const GRS80_A: f64 = 6_378_137.0;
const GRS80_INV_F: f64 = 298.257_222_101;
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

static LONG_ISLAND: Lazy<LambertConic> = Lazy::new(|| {
    LambertConic::new(
        dms(41.0, 2.0),
        dms(40.0, 40.0),
        dms(40.0, 10.0),
        -74.0,
        300_000.0,
        0.0,
    )
});

fn dms(degrees: f64, minutes: f64) -> f64 {
    degrees + minutes / 60.0
}

/// Lambert Conformal Conic with two standard parallels on GRS80.
struct LambertConic {
    e: f64,
    n: f64,
    big_f: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LambertConic {
    fn new(
        parallel_1: f64,
        parallel_2: f64,
        origin_lat: f64,
        origin_lon: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let f = 1.0 / GRS80_INV_F;
        let e = (f * (2.0 - f)).sqrt();

        let phi1 = parallel_1.to_radians();
        let phi2 = parallel_2.to_radians();
        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let t1 = t(phi1, e);
        let t2 = t(phi2, e);
        let t0 = t(origin_lat.to_radians(), e);

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let rho0 = GRS80_A * big_f * t0.powf(n);

        Self {
            e,
            n,
            big_f,
            rho0,
            lon0: origin_lon.to_radians(),
            false_easting,
            false_northing,
        }
    }

    fn forward(&self, latitude: f64, longitude: f64) -> Coord<f64> {
        let rho = GRS80_A * self.big_f * t(latitude.to_radians(), self.e).powf(self.n);
        let theta = self.n * (longitude.to_radians() - self.lon0);

        let easting = self.false_easting + rho * theta.sin();
        let northing = self.false_northing + self.rho0 - rho * theta.cos();

        Coord {
            x: easting / US_SURVEY_FOOT,
            y: northing / US_SURVEY_FOOT,
        }
    }
}

fn m(phi: f64, e: f64) -> f64 {
    phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Coord<f64>, x: f64, y: f64) {
        assert!((actual.x - x).abs() < 1.0, "easting {} vs {x}", actual.x);
        assert!((actual.y - y).abs() < 1.0, "northing {} vs {y}", actual.y);
    }

    #[test]
    fn projects_into_long_island_state_plane_feet() {
        assert_close(
            BoundaryCrs::NyLongIsland.project(40.758, -73.9855),
            988_267.07,
            215_436.88,
        );
        assert_close(
            BoundaryCrs::NyLongIsland.project(40.6782, -73.9442),
            999_727.3,
            186_367.9,
        );
        assert_close(
            BoundaryCrs::NyLongIsland.project(40.5795, -74.1502),
            942_527.2,
            150_439.7,
        );
    }

    #[test]
    fn wgs84_is_lon_lat() {
        let coord = BoundaryCrs::Wgs84.project(40.7, -74.0);
        assert_eq!((coord.x, coord.y), (-74.0, 40.7));
    }

    #[test]
    fn detects_projected_bounds() {
        let degrees = Rect::new(Coord { x: -74.3, y: 40.4 }, Coord { x: -73.7, y: 40.9 });
        let feet = Rect::new(
            Coord { x: 913_000.0, y: 120_000.0 },
            Coord { x: 1_067_000.0, y: 273_000.0 },
        );
        assert_eq!(BoundaryCrs::detect(degrees), BoundaryCrs::Wgs84);
        assert_eq!(BoundaryCrs::detect(feet), BoundaryCrs::NyLongIsland);
    }

    #[test]
    fn parses_cli_values() {
        assert_eq!(BoundaryCrs::parse("auto"), Ok(None));
        assert_eq!(BoundaryCrs::parse("EPSG:2263"), Ok(Some(BoundaryCrs::NyLongIsland)));
        assert!(BoundaryCrs::parse("mercator").is_err());
    }
}
