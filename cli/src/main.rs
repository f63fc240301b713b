use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use gtfs::RouteType;
use model::{Config, Encoding, LogDiagnostics};

#[derive(StructOpt)]
#[structopt(
    name = "metro_lines",
    about = "Turns a GTFS feed into one GeoJSON file per metro line"
)]
enum Command {
    /// Join the feed's tables into one table of metro stop visits
    Assemble(Args),
    /// Write one GeoJSON file per line from the assembled table
    BuildLines(Args),
    /// Assemble, then build lines
    Run(Args),
}

#[derive(StructOpt)]
struct Args {
    /// A JSON file with settings. Flags given here override it.
    #[structopt(long)]
    config: Option<PathBuf>,
    /// Where the assembled table goes, and where the feed is unless --feed is given
    #[structopt(long)]
    data_dir: Option<PathBuf>,
    /// A directory or .zip with trips.txt, routes.txt, stops.txt, and stop_times.txt
    #[structopt(long)]
    feed: Option<PathBuf>,
    /// Where to write one GeoJSON file per line
    #[structopt(long)]
    output_dir: Option<PathBuf>,
    /// Keep routes with this GTFS route_type code. Defaults to 1, subway.
    #[structopt(long)]
    route_type: Option<RouteType>,
    /// utf-8 or utf-8-sig
    #[structopt(long)]
    encoding: Option<Encoding>,
    /// Keep every column of the feed instead of dropping the usual unneeded ones
    #[structopt(long)]
    keep_all_columns: bool,
    /// Show debug messages
    #[structopt(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match self.config {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        };
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(feed) = self.feed {
            config.feed = Some(feed);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(route_type) = self.route_type {
            config.route_type = route_type;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if self.keep_all_columns {
            config.drop_columns = model::DropColumns::none();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cmd = Command::from_args();
    let args = match cmd {
        Command::Assemble(ref args) | Command::BuildLines(ref args) | Command::Run(ref args) => {
            args
        }
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    let mut diagnostics = LogDiagnostics;
    match cmd {
        Command::Assemble(args) => {
            model::run_assembler(&args.into_config()?, &mut diagnostics)?;
        }
        Command::BuildLines(args) => {
            model::run_builder(&args.into_config()?, &mut diagnostics)?;
        }
        Command::Run(args) => {
            model::run_pipeline(&args.into_config()?, &mut diagnostics)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Command::from_iter_safe(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = match parse(&["metro_lines", "run"]) {
            Command::Run(args) => args.into_config().unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override() {
        let config = match parse(&[
            "metro_lines",
            "build-lines",
            "--data-dir",
            "feeds/bcn",
            "--output-dir",
            "out",
            "--route-type",
            "0",
            "--encoding",
            "utf-8-sig",
            "--keep-all-columns",
        ]) {
            Command::BuildLines(args) => args.into_config().unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(config.data_dir, PathBuf::from("feeds/bcn"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.route_type, RouteType::Tram);
        assert_eq!(config.encoding, Encoding::Utf8Sig);
        assert!(config.drop_columns.trips.is_empty());
    }

    #[test]
    fn test_bad_route_type() {
        assert!(Command::from_iter_safe(&["metro_lines", "assemble", "--route-type", "99"]).is_err());
    }
}
