use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use gotham_core::Borough;
use tracing::{debug, warn};

use crate::error::CleanError;
use crate::loader::RawTable;
use crate::projection::BoundaryCrs;

const NAME_COLUMNS: [&str; 4] = ["BoroName", "boro_name", "borough", "name"];

#[derive(Debug, Clone)]
pub struct BoroughBoundary {
    pub borough: Borough,
    pub geometry: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl BoroughBoundary {
    /// `None` for an empty geometry.
    pub fn new(borough: Borough, geometry: MultiPolygon<f64>) -> Option<Self> {
        let bounds = geometry.bounding_rect()?;
        Some(Self {
            borough,
            geometry,
            bounds,
        })
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    fn contains(&self, point: Point<f64>) -> bool {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        if point.x() < min.x || point.x() > max.x || point.y() < min.y || point.y() > max.y {
            return false;
        }
        self.geometry.contains(&point)
    }
}

/// Point-in-polygon lookup over the borough boundaries, in file order.
#[derive(Debug, Clone)]
pub struct BoroughIndex {
    boundaries: Vec<BoroughBoundary>,
    crs: BoundaryCrs,
}

impl BoroughIndex {
    pub fn new(boundaries: Vec<BoroughBoundary>, crs: Option<BoundaryCrs>) -> Self {
        let crs = crs.unwrap_or_else(|| {
            boundaries
                .iter()
                .map(BoroughBoundary::bounds)
                .reduce(|acc, rect| {
                    let (a, b) = (acc.min(), rect.min());
                    let (c, d) = (acc.max(), rect.max());
                    Rect::new(
                        (a.x.min(b.x), a.y.min(b.y)),
                        (c.x.max(d.x), c.y.max(d.y)),
                    )
                })
                .map_or(BoundaryCrs::Wgs84, BoundaryCrs::detect)
        });

        Self { boundaries, crs }
    }

    pub fn from_table(table: &RawTable, crs: Option<BoundaryCrs>) -> Result<Self, CleanError> {
        let name_idx = table
            .column_index(&NAME_COLUMNS)
            .ok_or_else(|| CleanError::Validation {
                dataset: "boroughs",
                reason: format!(
                    "no borough name column (expected one of {})",
                    NAME_COLUMNS.join(", ")
                ),
            })?;

        let mut boundaries = Vec::new();
        for (row_idx, row) in table.rows.iter().enumerate() {
            let label = row.get(Some(name_idx)).unwrap_or_default();
            let Some(borough) = Borough::parse(label) else {
                warn!(row = row_idx, label, "skipping boundary with unrecognised borough name");
                continue;
            };
            let Some(boundary) = row
                .geometry
                .clone()
                .and_then(|geometry| BoroughBoundary::new(borough, geometry))
            else {
                warn!(row = row_idx, %borough, "skipping boundary without geometry");
                continue;
            };
            boundaries.push(boundary);
        }

        if boundaries.is_empty() {
            return Err(CleanError::Validation {
                dataset: "boroughs",
                reason: "no usable borough polygons".to_string(),
            });
        }

        let index = Self::new(boundaries, crs);
        debug!(boundaries = index.len(), crs = index.crs.as_str(), "borough index ready");
        Ok(index)
    }

    /// First boundary strictly containing the point, otherwise `unknown`.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Borough {
        let point = Point::from(self.crs.project(latitude, longitude));
        self.boundaries
            .iter()
            .find(|boundary| boundary.contains(point))
            .map_or(Borough::Unknown, |boundary| boundary.borough)
    }

    pub fn crs(&self) -> BoundaryCrs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}
