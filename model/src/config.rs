use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use gtfs::{FeedTable, RouteType};
use serde::{Deserialize, Serialize};

/// Settings for both stages. Every field has a default, so a JSON config file only needs the
/// fields it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Holds the assembled table, and the raw feed unless `feed` says otherwise
    pub data_dir: PathBuf,
    /// A directory or `.zip` with the raw feed
    pub feed: Option<PathBuf>,
    pub assembled_file: String,
    /// One GeoJSON file per line is written here
    pub output_dir: PathBuf,
    pub route_type: RouteType,
    pub encoding: Encoding,
    pub drop_columns: DropColumns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            feed: None,
            assembled_file: "metro_data.csv".to_string(),
            output_dir: PathBuf::from("geojson"),
            route_type: RouteType::Subway,
            encoding: Encoding::Utf8,
            drop_columns: DropColumns::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs_err::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|err| anyhow!("{}: {err}", path.display()))
    }

    pub fn feed_path(&self) -> PathBuf {
        self.feed.clone().unwrap_or_else(|| self.data_dir.clone())
    }

    pub fn assembled_path(&self) -> PathBuf {
        self.data_dir.join(&self.assembled_file)
    }
}

/// Columns to throw away right after loading each table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropColumns {
    pub trips: Vec<String>,
    pub routes: Vec<String>,
    pub stops: Vec<String>,
    pub stop_times: Vec<String>,
}

impl Default for DropColumns {
    fn default() -> Self {
        let list = |columns: &[&str]| columns.iter().map(|c| c.to_string()).collect();
        Self {
            trips: list(&[
                "service_id",
                "trip_headsign",
                "direction_id",
                "shape_id",
                "wheelchair_accessible",
            ]),
            routes: list(&["route_text_color", "route_url"]),
            stops: list(&[
                "stop_code",
                "stop_name",
                "stop_url",
                "location_type",
                "parent_station",
                "wheelchair_boarding",
            ]),
            stop_times: Vec::new(),
        }
    }
}

impl DropColumns {
    pub fn none() -> Self {
        Self {
            trips: Vec::new(),
            routes: Vec::new(),
            stops: Vec::new(),
            stop_times: Vec::new(),
        }
    }

    pub fn get(&self, table: FeedTable) -> &[String] {
        match table {
            FeedTable::Trips => &self.trips,
            FeedTable::Routes => &self.routes,
            FeedTable::Stops => &self.stops,
            FeedTable::StopTimes => &self.stop_times,
        }
    }
}

/// Text encoding of every file written
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-8 with a leading byte order mark, which some spreadsheet tools want
    #[serde(rename = "utf-8-sig")]
    Utf8Sig,
}

impl Encoding {
    pub fn preamble(self) -> &'static [u8] {
        match self {
            Encoding::Utf8 => &[],
            Encoding::Utf8Sig => b"\xEF\xBB\xBF",
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(Encoding::Utf8Sig),
            _ => bail!("Unsupported encoding {raw}; use utf-8 or utf-8-sig"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_file() {
        let config: Config = serde_json::from_str(
            r#"{"data_dir": "feeds/bcn", "encoding": "utf-8-sig", "drop_columns": {"routes": []}}"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("feeds/bcn"));
        assert_eq!(config.encoding, Encoding::Utf8Sig);
        assert_eq!(config.route_type, RouteType::Subway);
        assert!(config.drop_columns.routes.is_empty());
        assert_eq!(config.drop_columns.trips.len(), 5);
        assert_eq!(config.assembled_path(), PathBuf::from("feeds/bcn/metro_data.csv"));
        assert_eq!(config.feed_path(), PathBuf::from("feeds/bcn"));
    }

    #[test]
    fn test_route_type_by_code() {
        let config: Config = serde_json::from_str(r#"{"route_type": 0}"#).unwrap();
        assert_eq!(config.route_type, RouteType::Tram);
        assert!(serde_json::from_str::<Config>(r#"{"route_type": 9}"#).is_err());
    }

    #[test]
    fn test_parse_encoding() {
        assert_eq!("UTF8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("utf_8_sig".parse::<Encoding>().unwrap(), Encoding::Utf8Sig);
        assert!("latin-1".parse::<Encoding>().is_err());
    }
}
