#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod ids;
mod routes;
mod stop_times;
mod table;

use std::io::{Read, Seek};
use std::path::Path;

use anyhow::Result;
use zip::ZipArchive;

pub use ids::{LineLabel, StopID, TripID};
pub use routes::RouteType;
pub use stop_times::{parse_time_of_day, retain_parseable_times, seconds_since_midnight, TIME_FORMAT};
pub use table::Table;

/// The four files of a feed needed to trace trips through space and time
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FeedTable {
    Trips,
    Routes,
    Stops,
    StopTimes,
}

impl FeedTable {
    pub fn all() -> Vec<Self> {
        vec![
            FeedTable::Trips,
            FeedTable::Routes,
            FeedTable::Stops,
            FeedTable::StopTimes,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            FeedTable::Trips => "trips",
            FeedTable::Routes => "routes",
            FeedTable::Stops => "stops",
            FeedTable::StopTimes => "stop_times",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.txt", self.name())
    }
}

pub struct Feed {
    pub trips: Table,
    pub routes: Table,
    pub stops: Table,
    pub stop_times: Table,
}

impl Feed {
    /// Loads from a directory of `.txt` files, or from a `.zip` archive of them.
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Self::load_from_dir(path);
        }
        let file = fs_err::File::open(path)?;
        let mut archive = ZipArchive::new(file).map_err(|err| anyhow!("{}: {err}", path.display()))?;
        Self::load_from_zip(&mut archive)
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_each(|table| {
            let path = dir.join(table.file_name());
            debug!("Loading {}", path.display());
            Table::load(table.name(), fs_err::File::open(path)?)
        })
    }

    pub fn load_from_zip<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        Self::load_each(|table| {
            let entry = find_zip_entry(archive, &table.file_name())?;
            debug!("Loading {entry} from archive");
            let file = archive
                .by_name(&entry)
                .map_err(|err| anyhow!("{entry}: {err}"))?;
            Table::load(table.name(), file)
        })
    }

    fn load_each<F: FnMut(FeedTable) -> Result<Table>>(mut load: F) -> Result<Self> {
        Ok(Self {
            trips: load(FeedTable::Trips)?,
            routes: load(FeedTable::Routes)?,
            stops: load(FeedTable::Stops)?,
            stop_times: load(FeedTable::StopTimes)?,
        })
    }

    pub fn table_mut(&mut self, table: FeedTable) -> &mut Table {
        match table {
            FeedTable::Trips => &mut self.trips,
            FeedTable::Routes => &mut self.routes,
            FeedTable::Stops => &mut self.stops,
            FeedTable::StopTimes => &mut self.stop_times,
        }
    }
}

// Feeds are often zipped with everything inside one top-level directory
fn find_zip_entry<R: Read + Seek>(archive: &ZipArchive<R>, file_name: &str) -> Result<String> {
    let suffix = format!("/{file_name}");
    let mut candidates: Vec<&str> = archive
        .file_names()
        .filter(|name| *name == file_name || name.ends_with(&suffix))
        .collect();
    // Prefer the shallowest match
    candidates.sort_by_key(|name| (name.matches('/').count(), name.to_string()));
    match candidates.first() {
        Some(name) => Ok(name.to_string()),
        None => bail!("archive has no {file_name}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::write::{FileOptions, ZipWriter};

    use super::*;

    fn zip_feed(prefix: &str) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let files = [
            ("trips.txt", "route_id,trip_id\nR1,T1\n"),
            ("routes.txt", "route_id,route_short_name,route_type\nR1,L1,1\n"),
            ("stops.txt", "stop_id,stop_lat,stop_lon\nS1,41.38,2.17\n"),
            (
                "stop_times.txt",
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nT1,08:00:00,08:00:30,S1,1\n",
            ),
        ];
        for (name, contents) in files {
            writer
                .start_file(format!("{prefix}{name}"), FileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        let bytes = writer.finish().unwrap().into_inner();
        ZipArchive::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_load_from_zip() {
        for prefix in ["", "gtfs/"] {
            let feed = Feed::load_from_zip(&mut zip_feed(prefix)).unwrap();
            assert_eq!(feed.trips.len(), 1);
            assert_eq!(feed.routes.headers(), &["route_id", "route_short_name", "route_type"]);
            assert_eq!(feed.stops.name(), "stops");
            assert_eq!(feed.stop_times.len(), 1);
        }
    }

    #[test]
    fn test_missing_zip_entry() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("trips.txt", FileOptions::default())
            .unwrap();
        writer.write_all(b"route_id,trip_id\n").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let err = Feed::load_from_zip(&mut archive).err().unwrap();
        assert_eq!(err.to_string(), "archive has no routes.txt");
    }
}
