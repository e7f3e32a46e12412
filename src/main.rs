// src/main.rs
//! DriveLog - record drives from a GPS receiver and review past trips

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use drivelog::{
    display::TerminalDisplay,
    metrics::TripSummary,
    route::{ExportFormat, RouteOverlay, TripExporter},
    DistanceUnit, DriveLogConfig, PositionFeed, Recorder, SortOrder, SpeedUnit, TripKey,
    TripStore,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drivelog", version, about = "GPS trip logger")]
struct Cli {
    /// Trips directory (overrides the configuration)
    #[arg(long, global = true)]
    trips_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Trip(TripCommand),
    /// Show or change settings
    Config {
        #[arg(long)]
        speed_unit: Option<SpeedUnit>,
        #[arg(long)]
        distance_unit: Option<DistanceUnit>,
        #[arg(long)]
        gpsd: Option<String>,
        #[arg(long)]
        serial: Option<String>,
        #[arg(long, default_value_t = 9600)]
        baudrate: u32,
    },
    /// List serial ports that may have a GPS receiver attached
    Ports,
}

/// Commands that work on the trip store
#[derive(Subcommand)]
enum TripCommand {
    /// Record a trip until Ctrl+C, then save it
    Record,
    /// List stored trips
    List {
        #[arg(long)]
        oldest_first: bool,
        /// Only show trips whose key or title contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Show metrics for one trip
    Show { key: String },
    /// Export a trip to GPX, GeoJSON or CSV
    Export {
        key: String,
        #[arg(long, value_enum, default_value_t = Format::Gpx)]
        format: Format,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a trip
    Delete { key: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Gpx,
    Geojson,
    Csv,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Gpx => ExportFormat::Gpx,
            Format::Geojson => ExportFormat::GeoJson,
            Format::Csv => ExportFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = DriveLogConfig::load().unwrap_or_else(|e| {
        tracing::warn!("using default configuration: {}", e);
        DriveLogConfig::default()
    });
    if let Some(dir) = cli.trips_dir {
        config.trips_dir = Some(dir);
    }

    match cli.command {
        Command::Config {
            speed_unit,
            distance_unit,
            gpsd,
            serial,
            baudrate,
        } => configure(config, speed_unit, distance_unit, gpsd, serial, baudrate),
        Command::Ports => {
            let ports = drivelog::feed::list_serial_ports()?;
            if ports.is_empty() {
                println!("No serial ports found.");
            }
            for port in ports {
                println!("  {}", port);
            }
            Ok(())
        }
        Command::Trip(command) => {
            let store = TripStore::open(config.trips_dir()?)?;
            run_trip_command(command, &config, &store).await
        }
    }
}

async fn run_trip_command(command: TripCommand, config: &DriveLogConfig, store: &TripStore) -> anyhow::Result<()> {
    match command {
        TripCommand::Record => record(config, store).await,
        TripCommand::List {
            oldest_first,
            search,
        } => {
            let order = if oldest_first {
                SortOrder::OldestFirst
            } else {
                SortOrder::NewestFirst
            };
            let mut keys = store.list(order);
            if let Some(query) = search {
                keys = drivelog::store::search(&keys, &query);
            }

            if keys.is_empty() {
                println!("You have no trips so far");
            }
            for key in keys {
                println!("{}  {}", key, key.title());
            }
            Ok(())
        }
        TripCommand::Show { key } => {
            let key = TripKey::parse(&key)?;
            let samples = store.load(&key)?;
            let summary = TripSummary::from_samples(&samples).display(config.speed_unit, config.distance_unit);

            println!("{}", key.title());
            println!("  Distance:      {}", summary.distance);
            println!("  Average speed: {}", summary.average_speed);
            println!("  Top speed:     {}", summary.top_speed);
            println!("  Duration:      {}", summary.duration);
            match RouteOverlay::from_samples(&samples) {
                Some(route) => {
                    println!("  Start:         {:.6}, {:.6}", route.start.latitude, route.start.longitude);
                    println!("  End:           {:.6}, {:.6}", route.end.latitude, route.end.longitude);
                    println!("  Points:        {}", route.line.len());
                }
                None => println!("  No positions recorded"),
            }
            Ok(())
        }
        TripCommand::Export { key, format, output } => {
            let key = TripKey::parse(&key)?;
            let samples = store.load(&key)?;
            let format = ExportFormat::from(format);
            let path = output.unwrap_or_else(|| PathBuf::from(format!("trip{}.{}", key, format.extension())));

            TripExporter::new(&key, &samples)
                .export_to_file(&path, format)
                .with_context(|| format!("exporting {} to {}", key, path.display()))?;
            println!("Exported {} as {} to {}", key, format.display_name(), path.display());
            Ok(())
        }
        TripCommand::Delete { key } => {
            let key = TripKey::parse(&key)?;
            if store.delete(&key)? {
                println!("Deleted {}", key.title());
            } else {
                println!("Trip {} was already gone", key);
            }
            Ok(())
        }
    }
}

async fn record(config: &DriveLogConfig, store: &TripStore) -> anyhow::Result<()> {
    let feed = PositionFeed::new();
    feed.start(config.feed_source()?)
        .await
        .context("connecting to the GPS receiver")?;

    let mut recorder = Recorder::new(feed.fix(), config.poll_interval());
    recorder.start()?;

    let display = TerminalDisplay::new(config.speed_unit, config.distance_unit);
    let shown = display.run_until_interrupted(recorder.subscribe_progress()).await;

    let saved = recorder.stop_and_save(store).await;
    feed.stop();
    shown?;

    match saved.context("saving trip")? {
        Some(key) => println!("Saved {}", key.title()),
        None => println!("No positions were captured; nothing saved."),
    }
    Ok(())
}

fn configure(
    mut config: DriveLogConfig,
    speed_unit: Option<SpeedUnit>,
    distance_unit: Option<DistanceUnit>,
    gpsd: Option<String>,
    serial: Option<String>,
    baudrate: u32,
) -> anyhow::Result<()> {
    if gpsd.is_some() && serial.is_some() {
        bail!("choose either --gpsd or --serial, not both");
    }

    let changed = speed_unit.is_some() || distance_unit.is_some() || gpsd.is_some() || serial.is_some();
    config.update_units(speed_unit, distance_unit);

    if let Some(address) = gpsd {
        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => (host.to_string(), port.parse().context("invalid gpsd port")?),
            None => (address, 2947),
        };
        config.update_gpsd(host, port);
    }
    if let Some(port) = serial {
        config.update_serial(port, baudrate);
    }

    if changed {
        config.save()?;
        println!("Configuration saved to {}", DriveLogConfig::get_config_path()?.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
