//! Joins the raw feed tables into one row per stop visit, keeping only one type of route.

use std::path::PathBuf;

use anyhow::Result;
use gtfs::{Feed, FeedTable, Table};

use crate::output::{ensure_dir_exists, write_atomically};
use crate::{Config, Diagnostics, DropColumns};

pub const ELAPSED_SECONDS: &str = "elapsed_seconds";
pub const ELEVATION: &str = "elevation";

/// Loads the feed, assembles it, and writes the result. Returns the path written.
pub fn run_assembler(config: &Config, diagnostics: &mut dyn Diagnostics) -> Result<PathBuf> {
    match try_run_assembler(config, diagnostics) {
        Ok(path) => Ok(path),
        Err(err) => {
            diagnostics.error(&format!("Assembling the feed failed: {err:#}"));
            Err(err)
        }
    }
}

fn try_run_assembler(config: &Config, diagnostics: &mut dyn Diagnostics) -> Result<PathBuf> {
    let feed_path = config.feed_path();
    diagnostics.info(&format!("Loading feed from {}", feed_path.display()));
    let feed = Feed::load(&feed_path)?;

    let table = assemble(feed, config, diagnostics)?;

    ensure_dir_exists(&config.data_dir, diagnostics)?;
    let path = config.assembled_path();
    let mut contents = Vec::new();
    table.write_csv(&mut contents)?;
    write_atomically(&path, &contents, config.encoding)?;
    diagnostics.info(&format!(
        "Wrote {} stop visits to {}",
        table.len(),
        path.display()
    ));
    Ok(path)
}

/// The whole transformation, with no I/O.
pub fn assemble(mut feed: Feed, config: &Config, diagnostics: &mut dyn Diagnostics) -> Result<Table> {
    drop_configured_columns(&mut feed, &config.drop_columns, diagnostics)?;

    let total_stop_times = feed.stop_times.len();
    let dropped = gtfs::retain_parseable_times(&mut feed.stop_times)?;
    if dropped > 0 {
        diagnostics.info(&format!(
            "Dropped {dropped} of {total_stop_times} stop times with a time that isn't HH:MM:SS"
        ));
    }
    require_rows(&feed.stop_times, "after parsing times")?;

    let trips_and_routes = Table::join(&feed.trips, &feed.routes, "route_id")?;
    require_rows(&trips_and_routes, "after matching trips to routes")?;

    let mut stops_with_times = Table::join(&feed.stop_times, &feed.stops, "stop_id")?;
    require_rows(&stops_with_times, "after matching stop times to stops")?;
    coerce_coordinates(&mut stops_with_times)?;

    let mut metro = Table::join(&stops_with_times, &trips_and_routes, "trip_id")?;
    require_rows(&metro, "after matching stop times to trips")?;

    let route_type = metro.column("route_type")?;
    metro.retain(|row| config.route_type.matches_field(&row[route_type]));
    require_rows(
        &metro,
        &format!("after keeping only route_type {}", config.route_type.code()),
    )?;

    let arrival = metro.column("arrival_time")?;
    let mut elapsed = Vec::with_capacity(metro.len());
    for row in metro.rows() {
        let time = match gtfs::parse_time_of_day(&row[arrival]) {
            Some(time) => time,
            None => bail!("arrival_time {:?} didn't survive parsing", &row[arrival]),
        };
        elapsed.push(gtfs::seconds_since_midnight(time).to_string());
    }
    let elevation = vec!["0".to_string(); metro.len()];
    metro.push_column(ELAPSED_SECONDS, elapsed)?;
    metro.push_column(ELEVATION, elevation)?;

    diagnostics.info(&format!(
        "Assembled {} stop visits from {total_stop_times} stop times",
        metro.len()
    ));
    Ok(metro)
}

// Feeds differ in which optional columns they carry, so asking to drop a missing one is fine
fn drop_configured_columns(
    feed: &mut Feed,
    drop_columns: &DropColumns,
    diagnostics: &mut dyn Diagnostics,
) -> Result<()> {
    for which in FeedTable::all() {
        let table = feed.table_mut(which);
        let mut present = Vec::new();
        for column in drop_columns.get(which) {
            if table.has_column(column) {
                present.push(column.as_str());
            } else {
                diagnostics.info(&format!(
                    "{} has no column {column} to drop",
                    which.name()
                ));
            }
        }
        table.drop_columns(&present)?;
    }
    Ok(())
}

fn require_rows(table: &Table, stage: &str) -> Result<()> {
    if table.is_empty() {
        bail!(
            "No rows left {stage} ({}); does the feed have the expected columns and IDs?",
            table.name()
        );
    }
    Ok(())
}

/// Rewrites `stop_lat` and `stop_lon` as plain numbers, so the table only ever holds numeric
/// coordinates. Anything that isn't a finite number is an error naming the stop.
fn coerce_coordinates(table: &mut Table) -> Result<()> {
    let stop_id = table.column("stop_id")?;
    let lat = table.column("stop_lat")?;
    let lon = table.column("stop_lon")?;
    table.try_map_rows(|row| {
        let mut out = Vec::with_capacity(row.len());
        for (idx, field) in row.iter().enumerate() {
            if idx != lat && idx != lon {
                out.push(field.to_string());
                continue;
            }
            let column = if idx == lat { "stop_lat" } else { "stop_lon" };
            match field.trim().parse::<f64>() {
                Ok(x) if x.is_finite() => out.push(x.to_string()),
                _ => bail!(
                    "Stop {} has {column} {field:?}, which isn't a number",
                    &row[stop_id]
                ),
            }
        }
        Ok(out.into_iter().collect())
    })
}
