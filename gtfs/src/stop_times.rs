use anyhow::Result;
use chrono::{NaiveTime, Timelike};

use crate::Table;

/// Times must look like `HH:MM:SS`. GTFS allows hours past 24 for service running after
/// midnight; those don't parse here and the rows are dropped.
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .ok()
        // chrono reads a seconds field of 60 as a leap second
        .filter(|time| time.nanosecond() < 1_000_000_000)
}

pub fn seconds_since_midnight(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight()
}

/// Parses `arrival_time` and `departure_time` in place, normalizing both to `HH:MM:SS`. Rows
/// where either fails to parse are removed. Returns how many rows were removed.
pub fn retain_parseable_times(stop_times: &mut Table) -> Result<usize> {
    let arrival = stop_times.column("arrival_time")?;
    let departure = stop_times.column("departure_time")?;
    stop_times.filter_map_rows(|row| {
        let arrival_time = parse_time_of_day(&row[arrival])?;
        let departure_time = parse_time_of_day(&row[departure])?;
        Some(
            row.iter()
                .enumerate()
                .map(|(idx, field)| {
                    if idx == arrival {
                        arrival_time.format(TIME_FORMAT).to_string()
                    } else if idx == departure {
                        departure_time.format(TIME_FORMAT).to_string()
                    } else {
                        field.to_string()
                    }
                })
                .collect(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_since_midnight() {
        let time = parse_time_of_day("08:15:30").unwrap();
        assert_eq!(seconds_since_midnight(time), 8 * 3600 + 15 * 60 + 30);
        assert_eq!(seconds_since_midnight(parse_time_of_day("00:00:00").unwrap()), 0);
    }

    #[test]
    fn test_rejects_bad_times() {
        assert!(parse_time_of_day("25:61:00").is_none());
        assert!(parse_time_of_day("24:00:00").is_none());
        assert!(parse_time_of_day("08:00:60").is_none());
        assert!(parse_time_of_day("08:60:00").is_none());
        assert!(parse_time_of_day("23:59:60").is_none());
        assert!(parse_time_of_day("08:00").is_none());
        assert!(parse_time_of_day("").is_none());
        assert!(parse_time_of_day("soon").is_none());
    }

    #[test]
    fn test_retain_parseable_times() {
        let mut stop_times = Table::load(
            "stop_times",
            "trip_id,arrival_time,departure_time,stop_id\n\
             T1,8:00:00,08:00:30,S1\n\
             T1,25:61:00,25:61:30,S2\n\
             T1,08:05:00,24:10:00,S3\n\
             T1,08:07:60,08:08:00,S3\n\
             T1,08:10:00,08:10:30,S4\n"
                .as_bytes(),
        )
        .unwrap();
        assert_eq!(retain_parseable_times(&mut stop_times).unwrap(), 3);

        let rows: Vec<Vec<&str>> = stop_times.rows().iter().map(|r| r.iter().collect()).collect();
        assert_eq!(
            rows,
            vec![
                vec!["T1", "08:00:00", "08:00:30", "S1"],
                vec!["T1", "08:10:00", "08:10:30", "S4"],
            ]
        );
    }

    #[test]
    fn test_missing_time_column() {
        let mut stop_times =
            Table::load("stop_times", "trip_id,stop_id\nT1,S1\n".as_bytes()).unwrap();
        assert!(retain_parseable_times(&mut stop_times).is_err());
    }
}
