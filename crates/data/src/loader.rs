use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};
use tracing::{debug, instrument};

use crate::error::LoadError;

/// Locations of the four raw sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub hotels: PathBuf,
    pub boroughs: PathBuf,
    pub attractions: PathBuf,
    pub restaurants: PathBuf,
}

impl SourcePaths {
    pub const HOTELS_VAR: &'static str = "NYC_HOTEL_PATH";
    pub const BOROUGHS_VAR: &'static str = "NYC_BOURUGH_COORDS";
    pub const ATTRACTIONS_VAR: &'static str = "NYC_ATTRACTIONS_PATH";
    pub const RESTAURANTS_VAR: &'static str = "NYC_RESTAURANTS_PATH";

    pub fn from_env() -> Result<Self, LoadError> {
        let read = |name: &'static str| {
            env::var_os(name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .ok_or(LoadError::MissingVariable(name))
        };

        Ok(Self {
            hotels: read(Self::HOTELS_VAR)?,
            boroughs: read(Self::BOROUGHS_VAR)?,
            attractions: read(Self::ATTRACTIONS_VAR)?,
            restaurants: read(Self::RESTAURANTS_VAR)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited(u8),
    Workbook,
    GeoJson,
    Shapefile,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" | "txt" => Some(Self::Delimited(b',')),
            "tsv" => Some(Self::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Workbook),
            "geojson" | "json" => Some(Self::GeoJson),
            "shp" => Some(Self::Shapefile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub cells: Vec<String>,
    pub geometry: Option<MultiPolygon<f64>>,
}

impl RawRow {
    /// Trimmed cell value, `None` when the column is absent or blank.
    pub fn get(&self, idx: Option<usize>) -> Option<&str> {
        idx.and_then(|idx| self.cells.get(idx))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }
}

/// A source file as read from disk: header names plus string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Position of the first alias present in the header, case-insensitive.
    pub fn column_index(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.columns
                .iter()
                .position(|column| column.trim().eq_ignore_ascii_case(alias))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[instrument(skip_all, fields(dataset = name, path = %path.display()))]
pub fn load_table(name: &str, path: &Path) -> Result<RawTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::MissingFile(path.to_path_buf()));
    }
    let format = SourceFormat::from_path(path)
        .ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;

    let (columns, rows) = match format {
        SourceFormat::Delimited(delimiter) => read_delimited(path, delimiter)?,
        SourceFormat::Workbook => read_workbook(path)?,
        SourceFormat::GeoJson => read_geojson(path)?,
        SourceFormat::Shapefile => read_shapefile(path)?,
    };

    debug!(columns = columns.len(), rows = rows.len(), "source loaded");
    Ok(RawTable {
        name: name.to_string(),
        columns,
        rows,
    })
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<(Vec<String>, Vec<RawRow>), LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let header = reader
        .byte_headers()
        .map_err(|err| LoadError::parse(path, err))?
        .iter()
        .map(decode_cell)
        .collect::<Vec<_>>();
    if header.iter().all(|column| column.trim().is_empty()) {
        return Err(LoadError::parse(path, "missing header row"));
    }

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|err| LoadError::parse(path, err))?;
        let mut cells = record.iter().map(decode_cell).collect::<Vec<_>>();
        cells.resize(header.len().max(cells.len()), String::new());
        rows.push(RawRow {
            cells,
            geometry: None,
        });
    }

    Ok((header, rows))
}

/// UTF-8 when valid, otherwise Latin-1.
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

fn read_workbook(path: &Path) -> Result<(Vec<String>, Vec<RawRow>), LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|err| LoadError::parse(path, err))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::parse(path, "workbook has no worksheets"))?
        .map_err(|err| LoadError::parse(path, err))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| LoadError::parse(path, "missing header row"))?
        .iter()
        .map(render_cell)
        .collect::<Vec<_>>();
    if header.iter().all(|column| column.trim().is_empty()) {
        return Err(LoadError::parse(path, "missing header row"));
    }

    let rows = rows
        .map(|row| RawRow {
            cells: row.iter().map(render_cell).collect(),
            geometry: None,
        })
        .collect();

    Ok((header, rows))
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => render_float(*value),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => render_float(value.as_f64()),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Integral floats print without a trailing `.0` so zip codes survive.
fn render_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn read_geojson(path: &Path) -> Result<(Vec<String>, Vec<RawRow>), LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&text).map_err(|err| LoadError::parse(path, err))?;

    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| LoadError::parse(path, "expected a FeatureCollection"))?;

    let mut columns: Vec<String> = Vec::new();
    for feature in features {
        if let Some(properties) = feature.get("properties").and_then(Value::as_object) {
            for key in properties.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut rows = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        let properties = feature.get("properties").and_then(Value::as_object);
        let cells = columns
            .iter()
            .map(|column| {
                properties
                    .and_then(|props| props.get(column))
                    .map(render_json)
                    .unwrap_or_default()
            })
            .collect();

        let geometry = feature
            .get("geometry")
            .filter(|geometry| !geometry.is_null())
            .map(|geometry| {
                json_geometry(geometry)
                    .map_err(|reason| LoadError::parse(path, format!("feature {idx}: {reason}")))
            })
            .transpose()?;

        rows.push(RawRow { cells, geometry });
    }

    Ok((columns, rows))
}

fn render_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number
            .as_f64()
            .map(render_float)
            .unwrap_or_else(|| number.to_string()),
        other => other.to_string(),
    }
}

fn json_geometry(geometry: &Value) -> Result<MultiPolygon<f64>, String> {
    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry has no type")?;
    let coordinates = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or("geometry has no coordinates")?;

    match kind {
        "Polygon" => Ok(MultiPolygon::new(vec![json_polygon(coordinates)?])),
        "MultiPolygon" => coordinates
            .iter()
            .map(|polygon| {
                polygon
                    .as_array()
                    .ok_or_else(|| "malformed multipolygon".to_string())
                    .and_then(|rings| json_polygon(rings))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(MultiPolygon::new),
        other => Err(format!("geometry type {other} is not a polygon")),
    }
}

fn json_polygon(rings: &[Value]) -> Result<Polygon<f64>, String> {
    let mut rings = rings.iter().map(json_ring);
    let exterior = rings.next().ok_or("polygon has no rings")??;
    let interiors = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn json_ring(ring: &Value) -> Result<LineString<f64>, String> {
    ring.as_array()
        .ok_or("malformed ring")?
        .iter()
        .map(|position| {
            let pair = position.as_array().ok_or("malformed position")?;
            match (
                pair.first().and_then(Value::as_f64),
                pair.get(1).and_then(Value::as_f64),
            ) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err("position is not numeric".to_string()),
            }
        })
        .collect::<Result<Vec<_>, String>>()
        .map(LineString::from)
}

fn read_shapefile(path: &Path) -> Result<(Vec<String>, Vec<RawRow>), LoadError> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|err| LoadError::parse(path, err))?;

    let mut records = Vec::new();
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item.map_err(|err| LoadError::parse(path, err))?;
        let geometry = shape_geometry(shape).map_err(|reason| LoadError::parse(path, reason))?;
        let fields = record
            .into_iter()
            .map(|(name, value)| (name, render_field(value)))
            .collect::<Vec<_>>();
        records.push((fields, geometry));
    }

    // dbase records are unordered maps; sort the header for stable output
    let mut columns = records
        .iter()
        .flat_map(|(fields, _)| fields.iter().map(|(name, _)| name.clone()))
        .collect::<Vec<_>>();
    columns.sort();
    columns.dedup();

    let rows = records
        .into_iter()
        .map(|(fields, geometry)| {
            let cells = columns
                .iter()
                .map(|column| {
                    fields
                        .iter()
                        .find(|(name, _)| name == column)
                        .map(|(_, value)| value.clone())
                        .unwrap_or_default()
                })
                .collect();
            RawRow { cells, geometry }
        })
        .collect();

    Ok((columns, rows))
}

fn shape_geometry(shape: Shape) -> Result<Option<MultiPolygon<f64>>, String> {
    let rings = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polygon(polygon) => polygon
            .rings()
            .iter()
            .map(|ring| ring_coords(ring, |point| (point.x, point.y)))
            .collect::<Vec<_>>(),
        Shape::PolygonM(polygon) => polygon
            .rings()
            .iter()
            .map(|ring| ring_coords(ring, |point| (point.x, point.y)))
            .collect(),
        Shape::PolygonZ(polygon) => polygon
            .rings()
            .iter()
            .map(|ring| ring_coords(ring, |point| (point.x, point.y)))
            .collect(),
        other => return Err(format!("shape type {:?} is not a polygon", other.shapetype())),
    };

    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for (outer, ring) in rings {
        if outer {
            polygons.push(Polygon::new(ring, Vec::new()));
        } else if let Some(last) = polygons.last_mut() {
            last.interiors_push(ring);
        } else {
            return Err("inner ring before any outer ring".to_string());
        }
    }

    Ok(Some(MultiPolygon::new(polygons)))
}

fn ring_coords<P>(ring: &PolygonRing<P>, xy: impl Fn(&P) -> (f64, f64)) -> (bool, LineString<f64>) {
    let outer = matches!(ring, PolygonRing::Outer(_));
    let coords = ring
        .points()
        .iter()
        .map(|point| {
            let (x, y) = xy(point);
            Coord { x, y }
        })
        .collect::<Vec<_>>();
    (outer, LineString::from(coords))
}

fn render_field(value: FieldValue) -> String {
    match value {
        FieldValue::Character(text) => text.unwrap_or_default().trim().to_string(),
        FieldValue::Memo(text) => text,
        FieldValue::Numeric(number) => number.map(render_float).unwrap_or_default(),
        FieldValue::Float(number) => number
            .map(|value| render_float(f64::from(value)))
            .unwrap_or_default(),
        FieldValue::Double(number) | FieldValue::Currency(number) => render_float(number),
        FieldValue::Integer(number) => number.to_string(),
        FieldValue::Logical(flag) => flag.map(|flag| flag.to_string()).unwrap_or_default(),
        other => format!("{other:?}"),
    }
}
