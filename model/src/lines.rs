//! Turns the assembled table into one GeoJSON file per line, with every trip as a LineString
//! through space and time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use gtfs::{LineLabel, StopID, TripID};
use serde::Deserialize;

use crate::output::{ensure_dir_exists, write_atomically};
use crate::{Config, Diagnostics, Encoding};

/// One stop visit from the assembled table. Other columns are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct MetroRow {
    pub trip_id: TripID,
    pub stop_id: StopID,
    pub route_short_name: LineLabel,
    pub stop_lon: f64,
    pub stop_lat: f64,
    pub elevation: f64,
    pub elapsed_seconds: i64,
    #[serde(default)]
    pub stop_sequence: Option<u32>,
}

/// One trip, ready to become a feature
#[derive(Clone, Debug, PartialEq)]
pub struct TripPath {
    pub trip_id: TripID,
    /// (longitude, latitude, elevation, elapsed seconds), in the order the stops are visited
    pub points: Vec<[f64; 4]>,
    pub trips: Vec<TripID>,
    pub stops: Vec<StopID>,
    pub routes: Vec<LineLabel>,
}

impl TripPath {
    fn new(trip_id: TripID, rows: &[&MetroRow]) -> Self {
        Self {
            trip_id,
            points: rows
                .iter()
                .map(|r| [r.stop_lon, r.stop_lat, r.elevation, r.elapsed_seconds as f64])
                .collect(),
            trips: dedupe(rows.iter().map(|r| r.trip_id.clone())),
            stops: dedupe(rows.iter().map(|r| r.stop_id.clone())),
            routes: dedupe(rows.iter().map(|r| r.route_short_name.clone())),
        }
    }

    pub fn to_feature(&self) -> Feature {
        let mut feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(
                self.points.iter().map(|pt| pt.to_vec()).collect(),
            ))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property(
            "trip",
            self.trips.iter().map(|x| x.as_str()).collect::<Vec<_>>(),
        );
        feature.set_property(
            "stop",
            self.stops.iter().map(|x| x.as_str()).collect::<Vec<_>>(),
        );
        feature.set_property(
            "route",
            self.routes.iter().map(|x| x.as_str()).collect::<Vec<_>>(),
        );
        feature
    }
}

pub fn read_metro_rows(path: &Path) -> Result<Vec<MetroRow>> {
    let bytes = fs_err::read(path)?;
    let bytes = bytes
        .strip_prefix(Encoding::Utf8Sig.preamble())
        .unwrap_or(&bytes);
    let mut rows = Vec::new();
    for rec in csv::Reader::from_reader(bytes).deserialize() {
        let rec: MetroRow = rec.map_err(|err| anyhow!("{}: {err}", path.display()))?;
        rows.push(rec);
    }
    Ok(rows)
}

/// Every line, in the order first seen
pub fn line_labels(rows: &[MetroRow]) -> Vec<LineLabel> {
    dedupe(rows.iter().map(|r| r.route_short_name.clone()))
}

/// All trips on one line, ordered by trip ID: numerically when every ID on the line is a number,
/// otherwise as text. Points follow `stop_sequence` when the table has it, otherwise the table's
/// row order.
pub fn trip_paths(rows: &[MetroRow], line: &LineLabel) -> Vec<TripPath> {
    let mut per_trip: BTreeMap<TripID, Vec<&MetroRow>> = BTreeMap::new();
    for row in rows.iter().filter(|r| &r.route_short_name == line) {
        per_trip
            .entry(row.trip_id.clone())
            .or_insert_with(Vec::new)
            .push(row);
    }

    let mut paths = Vec::new();
    for (trip_id, mut trip_rows) in per_trip {
        // Stable, so ties and missing sequence numbers keep the table order
        trip_rows.sort_by_key(|r| r.stop_sequence);
        paths.push(TripPath::new(trip_id, &trip_rows));
    }

    let numeric: Option<Vec<u64>> = paths
        .iter()
        .map(|p| p.trip_id.as_str().parse::<u64>().ok())
        .collect();
    if let Some(keys) = numeric {
        let mut keyed: Vec<(u64, TripPath)> = keys.into_iter().zip(paths).collect();
        // Stable, so "07" and "7" keep their text order
        keyed.sort_by_key(|(key, _)| *key);
        paths = keyed.into_iter().map(|(_, path)| path).collect();
    }
    paths
}

pub fn line_document(paths: &[TripPath]) -> GeoJson {
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: paths.iter().map(|p| p.to_feature()).collect(),
        foreign_members: None,
    })
}

/// Compact JSON with every object's keys sorted. Non-ASCII text is written as-is. Whole-number
/// elevations and times are written as integers, like `[2.17,41.38,0,28800]`.
pub fn serialize_document(gj: &GeoJson) -> Result<String> {
    let mut value = serde_json::to_value(gj)?;
    if let Some(features) = value
        .get_mut("features")
        .and_then(serde_json::Value::as_array_mut)
    {
        for feature in features {
            if let Some(points) = feature
                .pointer_mut("/geometry/coordinates")
                .and_then(serde_json::Value::as_array_mut)
            {
                for point in points.iter_mut().filter_map(serde_json::Value::as_array_mut) {
                    for measure in point.iter_mut().skip(2) {
                        integer_if_whole(measure);
                    }
                }
            }
        }
    }
    Ok(serde_json::to_string(&sort_keys(value))?)
}

fn integer_if_whole(value: &mut serde_json::Value) {
    if let Some(x) = value.as_f64() {
        if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
            *value = serde_json::Value::from(x as i64);
        }
    }
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(list) => {
            serde_json::Value::Array(list.into_iter().map(sort_keys).collect())
        }
        x => x,
    }
}

/// The label becomes a file name, so it can't reach outside the output directory.
pub fn file_name_for(line: &LineLabel) -> Result<String> {
    let label = line.as_str();
    if label.is_empty()
        || label == "."
        || label == ".."
        || label.contains('/')
        || label.contains('\\')
        || label.contains('\0')
    {
        bail!("Line {label:?} can't be used as a file name");
    }
    Ok(format!("{label}.geojson"))
}

/// Reads the assembled table and writes every line's document. Returns the paths written.
pub fn run_builder(config: &Config, diagnostics: &mut dyn Diagnostics) -> Result<Vec<PathBuf>> {
    let input = config.assembled_path();
    let rows = match read_metro_rows(&input) {
        Ok(rows) => rows,
        Err(err) => {
            diagnostics.error(&format!("Couldn't load {}: {err:#}", input.display()));
            return Err(err);
        }
    };
    diagnostics.info(&format!(
        "Loaded {} stop visits from {}",
        rows.len(),
        input.display()
    ));
    ensure_dir_exists(&config.output_dir, diagnostics)?;
    write_line_documents(&rows, &config.output_dir, config.encoding, diagnostics)
}

/// One line failing doesn't stop the others from being written; the failures are reported
/// together at the end.
pub fn write_line_documents(
    rows: &[MetroRow],
    output_dir: &Path,
    encoding: Encoding,
    diagnostics: &mut dyn Diagnostics,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut failed = Vec::new();
    for line in line_labels(rows) {
        if line.as_str().is_empty() {
            diagnostics.error("Skipping stop visits with no route_short_name");
            continue;
        }
        diagnostics.info(&format!("Processing line {line}"));

        let paths = trip_paths(rows, &line);
        if paths.is_empty() {
            diagnostics.error(&format!("Line {line} has no trips; skipping"));
            continue;
        }

        match write_line(&line, &paths, output_dir, encoding) {
            Ok(path) => {
                diagnostics.info(&format!(
                    "Wrote {} trips to {}",
                    paths.len(),
                    path.display()
                ));
                written.push(path);
            }
            Err(err) => {
                diagnostics.error(&format!("Couldn't write line {line}: {err:#}"));
                failed.push(line);
            }
        }
    }

    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|l| l.as_str()).collect();
        bail!("Failed to write {} lines: {}", failed.len(), names.join(", "));
    }
    diagnostics.info(&format!("All {} lines written", written.len()));
    Ok(written)
}

fn write_line(
    line: &LineLabel,
    paths: &[TripPath],
    output_dir: &Path,
    encoding: Encoding,
) -> Result<PathBuf> {
    let path = output_dir.join(file_name_for(line)?);
    let contents = serialize_document(&line_document(paths))?;
    write_atomically(&path, contents.as_bytes(), encoding)?;
    Ok(path)
}

fn dedupe<T: Clone + Ord, I: Iterator<Item = T>>(items: I) -> Vec<T> {
    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    for x in items {
        if seen.insert(x.clone()) {
            result.push(x);
        }
    }
    result
}
