use std::collections::HashSet;

use gotham_core::{
    AttractionRecord, Borough, BudgetTier, HotelRecord, RestaurantRecord, Venue,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::boundary::BoroughIndex;
use crate::error::CleanError;
use crate::loader::{load_table, RawRow, RawTable, SourcePaths};
use crate::projection::BoundaryCrs;
use crate::store::DatasetRepository;

mod columns {
    pub const NAME: &[&str] = &["name", "hotel_name"];
    pub const HOTEL_ADDRESS: &[&str] = &["address1", "address"];
    pub const LATITUDE: &[&str] = &["latitude", "lat"];
    pub const LONGITUDE: &[&str] = &["longitude", "lon", "lng"];
    pub const STARS: &[&str] = &["star_rating", "stars", "rating"];
    pub const LOW_RATE: &[&str] = &["low_rate"];
    pub const HIGH_RATE: &[&str] = &["high_rate"];

    pub const ATTRACTION_NAME: &[&str] = &["tourist_spot", "name", "attraction"];
    pub const ADDRESS: &[&str] = &["address"];
    pub const ZIPCODE: &[&str] = &["zipcode", "zip", "zip_code"];
    pub const CATEGORY: &[&str] = &["category", "type"];
    pub const RATING: &[&str] = &["rating"];

    pub const RESTAURANT_NAME: &[&str] = &["name"];
    pub const RESTAURANT_LATITUDE: &[&str] = &["lat", "latitude"];
    pub const RESTAURANT_LONGITUDE: &[&str] = &["lon", "lng", "longitude"];
    pub const CUISINE: &[&str] = &["cuisine", "category", "detailed ratings"];
    pub const PRICE: &[&str] = &["price category", "price", "price_tier"];
}

/// Per-dataset counters from one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub dataset: &'static str,
    pub rows_read: usize,
    pub kept: usize,
    pub missing_fields: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub unknown_borough: usize,
}

impl CleanReport {
    fn new(dataset: &'static str, rows_read: usize) -> Self {
        Self {
            dataset,
            rows_read,
            ..Self::default()
        }
    }

    pub fn dropped(&self) -> usize {
        self.missing_fields + self.invalid + self.duplicates
    }

    fn log(&self) {
        info!(
            dataset = self.dataset,
            rows_read = self.rows_read,
            kept = self.kept,
            missing_fields = self.missing_fields,
            invalid = self.invalid,
            duplicates = self.duplicates,
            unknown_borough = self.unknown_borough,
            "dataset cleaned"
        );
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    pub boundary_crs: BoundaryCrs,
    pub boundaries: usize,
    pub reports: Vec<CleanReport>,
}

impl GenerateSummary {
    pub fn rows_dropped(&self) -> usize {
        self.reports.iter().map(CleanReport::dropped).sum()
    }
}

/// Loads the four raw sources, cleans them and writes the cleaned tables.
#[instrument(skip_all, fields(crs = crs.map_or("auto", BoundaryCrs::as_str)))]
pub fn generate_datasets<R: DatasetRepository>(
    paths: &SourcePaths,
    crs: Option<BoundaryCrs>,
    repository: &R,
) -> Result<GenerateSummary, CleanError> {
    let boroughs = load_table("boroughs", &paths.boroughs)?;
    let index = BoroughIndex::from_table(&boroughs, crs)?;
    info!(
        boundaries = index.len(),
        crs = index.crs().as_str(),
        "borough boundaries loaded"
    );

    let hotels = load_table("hotels", &paths.hotels)?;
    let attractions = load_table("attractions", &paths.attractions)?;
    let restaurants = load_table("restaurants", &paths.restaurants)?;

    let (hotels, hotel_report) = clean_hotels(&hotels, &index)?;
    let (attractions, attraction_report) = clean_attractions(&attractions, &index)?;
    let (restaurants, restaurant_report) = clean_restaurants(&restaurants, &index)?;

    repository.save_hotels(&hotels)?;
    repository.save_attractions(&attractions)?;
    repository.save_restaurants(&restaurants)?;

    Ok(GenerateSummary {
        boundary_crs: index.crs(),
        boundaries: index.len(),
        reports: vec![hotel_report, attraction_report, restaurant_report],
    })
}

pub fn clean_hotels(
    table: &RawTable,
    index: &BoroughIndex,
) -> Result<(Vec<HotelRecord>, CleanReport), CleanError> {
    const DATASET: &str = "hotels";
    let name = require(table, DATASET, "name", columns::NAME)?;
    let latitude = require(table, DATASET, "latitude", columns::LATITUDE)?;
    let longitude = require(table, DATASET, "longitude", columns::LONGITUDE)?;
    let address = table.column_index(columns::HOTEL_ADDRESS);
    let stars = table.column_index(columns::STARS);
    let low_rate = table.column_index(columns::LOW_RATE);
    let high_rate = table.column_index(columns::HIGH_RATE);

    let mut report = CleanReport::new(DATASET, table.len());
    let mut dedup = Dedup::default();
    let mut records = Vec::new();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(name) = row.get(Some(name)) else {
            drop_row(&mut report, row_idx, RowIssue::Missing("name"));
            continue;
        };
        let (lat, lon) = match coordinates(row, latitude, longitude) {
            Ok(Some(coords)) => coords,
            Ok(None) => {
                drop_row(&mut report, row_idx, RowIssue::Missing("coordinates"));
                continue;
            }
            Err(issue) => {
                drop_row(&mut report, row_idx, issue);
                continue;
            }
        };
        let low = match rate(row, low_rate, "low_rate") {
            Ok(value) => value,
            Err(issue) => {
                drop_row(&mut report, row_idx, issue);
                continue;
            }
        };
        let high = match rate(row, high_rate, "high_rate") {
            Ok(value) => value,
            Err(issue) => {
                drop_row(&mut report, row_idx, issue);
                continue;
            }
        };

        let record = HotelRecord {
            name: name.to_string(),
            address: row.get(address).map(str::to_string),
            latitude: lat,
            longitude: lon,
            borough: index.locate(lat, lon),
            star_rating: row.get(stars).and_then(parse_number),
            low_rate: low,
            high_rate: high,
            budget_tier: high.map(BudgetTier::from_rate),
        };
        keep(&mut records, &mut report, &mut dedup, row_idx, record);
    }

    report.log();
    Ok((records, report))
}

pub fn clean_attractions(
    table: &RawTable,
    index: &BoroughIndex,
) -> Result<(Vec<AttractionRecord>, CleanReport), CleanError> {
    const DATASET: &str = "attractions";
    let name = require(table, DATASET, "name", columns::ATTRACTION_NAME)?;
    let address = table.column_index(columns::ADDRESS);
    let latitude = table.column_index(columns::LATITUDE);
    let longitude = table.column_index(columns::LONGITUDE);
    let has_coordinates = latitude.is_some() && longitude.is_some();
    if address.is_none() && !has_coordinates {
        return Err(CleanError::Validation {
            dataset: DATASET,
            reason: "needs an address column or both coordinate columns".to_string(),
        });
    }
    let zipcode = table.column_index(columns::ZIPCODE);
    let category = table.column_index(columns::CATEGORY);
    let rating = table.column_index(columns::RATING);

    let mut report = CleanReport::new(DATASET, table.len());
    let mut dedup = Dedup::default();
    let mut records = Vec::new();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(name) = row.get(Some(name)) else {
            drop_row(&mut report, row_idx, RowIssue::Missing("name"));
            continue;
        };
        let coords = match (latitude, longitude) {
            (Some(lat), Some(lon)) => match coordinates(row, lat, lon) {
                Ok(coords) => coords,
                Err(issue) => {
                    drop_row(&mut report, row_idx, issue);
                    continue;
                }
            },
            _ => None,
        };
        let address = row.get(address);
        if coords.is_none() && address.is_none() {
            drop_row(&mut report, row_idx, RowIssue::Missing("address"));
            continue;
        }

        let borough = match coords {
            Some((lat, lon)) => index.locate(lat, lon),
            None => address.map_or(Borough::Unknown, guess_borough),
        };

        let record = AttractionRecord {
            name: name.to_string(),
            address: address.map(str::to_string),
            zipcode: row.get(zipcode).map(str::to_string),
            region: address.and_then(region_of),
            latitude: coords.map(|(lat, _)| lat),
            longitude: coords.map(|(_, lon)| lon),
            borough,
            category: row.get(category).map(str::to_string),
            rating: row.get(rating).and_then(parse_number),
        };
        keep(&mut records, &mut report, &mut dedup, row_idx, record);
    }

    report.log();
    Ok((records, report))
}

pub fn clean_restaurants(
    table: &RawTable,
    index: &BoroughIndex,
) -> Result<(Vec<RestaurantRecord>, CleanReport), CleanError> {
    const DATASET: &str = "restaurants";
    let name = require(table, DATASET, "name", columns::RESTAURANT_NAME)?;
    let latitude = require(table, DATASET, "latitude", columns::RESTAURANT_LATITUDE)?;
    let longitude = require(table, DATASET, "longitude", columns::RESTAURANT_LONGITUDE)?;
    let address = table.column_index(columns::ADDRESS);
    let cuisine = table.column_index(columns::CUISINE);
    let rating = table.column_index(columns::RATING);
    let price = table.column_index(columns::PRICE);

    let mut report = CleanReport::new(DATASET, table.len());
    let mut dedup = Dedup::default();
    let mut records = Vec::new();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(name) = row.get(Some(name)) else {
            drop_row(&mut report, row_idx, RowIssue::Missing("name"));
            continue;
        };
        let (lat, lon) = match coordinates(row, latitude, longitude) {
            Ok(Some(coords)) => coords,
            Ok(None) => {
                drop_row(&mut report, row_idx, RowIssue::Missing("coordinates"));
                continue;
            }
            Err(issue) => {
                drop_row(&mut report, row_idx, issue);
                continue;
            }
        };

        let record = RestaurantRecord {
            name: name.to_string(),
            address: row.get(address).map(str::to_string),
            latitude: lat,
            longitude: lon,
            borough: index.locate(lat, lon),
            cuisine: row.get(cuisine).map(str::to_string),
            rating: row.get(rating).and_then(parse_number),
            price_tier: row.get(price).map(str::to_string),
        };
        keep(&mut records, &mut report, &mut dedup, row_idx, record);
    }

    report.log();
    Ok((records, report))
}

fn require(
    table: &RawTable,
    dataset: &'static str,
    field: &str,
    aliases: &[&str],
) -> Result<usize, CleanError> {
    table
        .column_index(aliases)
        .ok_or_else(|| CleanError::Validation {
            dataset,
            reason: format!(
                "required column `{field}` not found (looked for {})",
                aliases.join(", ")
            ),
        })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RowIssue {
    Missing(&'static str),
    Invalid(&'static str),
}

fn drop_row(report: &mut CleanReport, row_idx: usize, issue: RowIssue) {
    match issue {
        RowIssue::Missing(field) => {
            report.missing_fields += 1;
            debug!(dataset = report.dataset, row = row_idx, field, "dropping row with missing field");
        }
        RowIssue::Invalid(field) => {
            report.invalid += 1;
            debug!(dataset = report.dataset, row = row_idx, field, "dropping row with invalid value");
        }
    }
}

#[derive(Default)]
struct Dedup {
    seen: HashSet<String>,
}

fn keep<V: Venue>(
    records: &mut Vec<V>,
    report: &mut CleanReport,
    dedup: &mut Dedup,
    row_idx: usize,
    record: V,
) {
    if !dedup.seen.insert(record.identity_key()) {
        report.duplicates += 1;
        debug!(dataset = report.dataset, row = row_idx, name = record.name(), "dropping duplicate");
        return;
    }
    if !record.borough().is_known() {
        report.unknown_borough += 1;
    }
    report.kept += 1;
    records.push(record);
}

/// Both blank is `Ok(None)`; one blank, unparseable or out of range is an issue.
fn coordinates(
    row: &RawRow,
    latitude: usize,
    longitude: usize,
) -> Result<Option<(f64, f64)>, RowIssue> {
    let (lat, lon) = match (row.get(Some(latitude)), row.get(Some(longitude))) {
        (None, None) => return Ok(None),
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(RowIssue::Missing("coordinates")),
    };

    let lat = parse_number(lat)
        .filter(|lat| (-90.0..=90.0).contains(lat))
        .ok_or(RowIssue::Invalid("latitude"))?;
    let lon = parse_number(lon)
        .filter(|lon| (-180.0..=180.0).contains(lon))
        .ok_or(RowIssue::Invalid("longitude"))?;

    Ok(Some((lat, lon)))
}

/// Absent column is fine; a present column needs a positive value.
fn rate(row: &RawRow, column: Option<usize>, field: &'static str) -> Result<Option<f64>, RowIssue> {
    if column.is_none() {
        return Ok(None);
    }
    let raw = row.get(column).ok_or(RowIssue::Missing(field))?;
    parse_number(raw)
        .filter(|value| *value > 0.0)
        .map(Some)
        .ok_or(RowIssue::Invalid(field))
}

/// Trims, strips `$` and thousands separators, rejects NaN and infinities.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw
        .trim()
        .chars()
        .filter(|ch| *ch != '$' && *ch != ',')
        .collect::<String>();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Last comma-separated chunk of an address.
pub fn region_of(address: &str) -> Option<String> {
    address
        .rsplit(',')
        .next()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
}

/// Borough from address text, for attractions without coordinates.
pub fn guess_borough(address: &str) -> Borough {
    let text = address.to_lowercase();
    if text.contains("staten island") {
        Borough::StatenIsland
    } else if text.contains("brooklyn") {
        Borough::Brooklyn
    } else if text.contains("queens") {
        Borough::Queens
    } else if text.contains("bronx") {
        Borough::Bronx
    } else if text.contains("manhattan") || text.contains("new york, ny") {
        Borough::Manhattan
    } else {
        debug!(address, "address does not name a borough");
        Borough::Unknown
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::boundary::BoroughBoundary;

    fn index() -> BoroughIndex {
        let square = |min_x: f64, min_y: f64| {
            MultiPolygon::new(vec![polygon![
                (x: min_x, y: min_y),
                (x: min_x + 0.1, y: min_y),
                (x: min_x + 0.1, y: min_y + 0.1),
                (x: min_x, y: min_y + 0.1),
                (x: min_x, y: min_y),
            ]])
        };
        BoroughIndex::new(
            vec![
                BoroughBoundary::new(Borough::Manhattan, square(-74.0, 40.7)).unwrap(),
                BoroughBoundary::new(Borough::Brooklyn, square(-74.0, 40.6)).unwrap(),
            ],
            Some(BoundaryCrs::Wgs84),
        )
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            name: "test".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|cells| RawRow {
                    cells: cells.iter().map(|c| c.to_string()).collect(),
                    geometry: None,
                })
                .collect(),
        }
    }

    #[test]
    fn numbers_tolerate_currency_and_separators() {
        assert_eq!(parse_number(" $1,250.50 "), Some(1250.5));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn hotels_drop_bad_rows_and_duplicates() {
        let raw = table(
            &["Name", "Address1", "Latitude", "Longitude", "star_rating", "low_rate", "high_rate"],
            &[
                &["Harbor Inn", "1 Water St", "40.65", "-73.95", "3", "80", "120"],
                &["Harbor Inn", "1 Water St", "40.65", "-73.95", "3", "80", "120"],
                &["", "2 Main St", "40.75", "-73.95", "4", "100", "200"],
                &["Free Stay", "3 Main St", "40.75", "-73.95", "2", "0", "90"],
                &["Far Away", "4 Main St", "95.0", "-73.95", "2", "50", "90"],
                &["Midtown Grand", "5 W 44th St", "40.75", "-73.95", "4", "$210", "$1,340"],
            ],
        );

        let (hotels, report) = clean_hotels(&raw, &index()).unwrap();
        assert_eq!(hotels.len(), 2);
        assert_eq!(hotels[0].borough, Borough::Brooklyn);
        assert_eq!(hotels[0].budget_tier, Some(BudgetTier::Medium));
        assert_eq!(hotels[1].high_rate, Some(1340.0));
        assert_eq!(hotels[1].budget_tier, Some(BudgetTier::High));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.missing_fields, 1);
        assert_eq!(report.invalid, 2);
        assert_eq!(report.dropped(), 4);
    }

    #[test]
    fn hotels_without_coordinate_columns_fail_validation() {
        let raw = table(&["name", "address"], &[&["Harbor Inn", "1 Water St"]]);
        let err = clean_hotels(&raw, &index()).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn attractions_fall_back_to_address_text() {
        let raw = table(
            &["Tourist_Spot", "Address", "Zipcode"],
            &[
                &["Prospect Park", "Brooklyn, NY 11225", "11225"],
                &["High Line", "New York, NY 10011", "10011"],
                &["Somewhere", "Hoboken, NJ", ""],
                &["No Address", "", ""],
            ],
        );

        let (attractions, report) = clean_attractions(&raw, &index()).unwrap();
        assert_eq!(attractions.len(), 3);
        assert_eq!(attractions[0].borough, Borough::Brooklyn);
        assert_eq!(attractions[0].region.as_deref(), Some("NY 11225"));
        assert_eq!(attractions[1].borough, Borough::Manhattan);
        assert_eq!(attractions[2].borough, Borough::Unknown);
        assert_eq!(attractions[2].zipcode, None);
        assert_eq!(report.unknown_borough, 1);
        assert_eq!(report.missing_fields, 1);
    }

    #[test]
    fn attractions_with_coordinates_use_the_polygons() {
        let raw = table(
            &["name", "lat", "lon"],
            &[&["Pier", "40.75", "-73.95"], &["Offshore", "40.0", "-73.95"]],
        );
        let (attractions, _) = clean_attractions(&raw, &index()).unwrap();
        assert_eq!(attractions[0].borough, Borough::Manhattan);
        assert_eq!(attractions[1].borough, Borough::Unknown);
    }

    #[test]
    fn restaurants_use_lat_lon_aliases() {
        let raw = table(
            &["Name", "Lat", "Lon", "Cuisine", "Rating", "Price Category"],
            &[
                &["Di Fara", "40.625", "-73.961", "Pizza", "4.6", "$$"],
                &["Ghost Kitchen", "", "", "Thai", "4.0", "$"],
            ],
        );

        let (restaurants, report) = clean_restaurants(&raw, &index()).unwrap();
        assert_eq!(restaurants.len(), 1);
        assert_eq!(restaurants[0].borough, Borough::Brooklyn);
        assert_eq!(restaurants[0].price_tier.as_deref(), Some("$$"));
        assert_eq!(report.missing_fields, 1);
    }

    #[test]
    fn text_guess_checks_staten_island_first() {
        assert_eq!(guess_borough("Staten Island, NY 10301"), Borough::StatenIsland);
        assert_eq!(guess_borough("Bronx, NY 10460"), Borough::Bronx);
        assert_eq!(guess_borough("Flushing, Queens"), Borough::Queens);
        assert_eq!(guess_borough("Jersey City, NJ"), Borough::Unknown);
    }
}
