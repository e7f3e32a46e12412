// src/gps/gpsd.rs
//! GPSD client implementation

use super::data::Coordinate;
use super::source::FixState;
use crate::error::{DriveLogError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::TcpStream,
};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct GpsdMessage {
    class: String,
    #[serde(flatten)]
    data: HashMap<String, serde_json::Value>,
}

/// Connect to a gpsd daemon and return a stream reader
pub async fn connect_gpsd(host: &str, port: u16) -> Result<BufReader<TcpStream>> {
    let mut stream = TcpStream::connect(format!("{}:{}", host, port))
        .await
        .map_err(|e| {
            DriveLogError::Connection(format!("Failed to connect to gpsd at {}:{}: {}", host, port, e))
        })?;

    // Send WATCH command to start receiving JSON data
    let watch_cmd = "?WATCH={\"enable\":true,\"json\":true}\n";
    stream
        .write_all(watch_cmd.as_bytes())
        .await
        .map_err(|e| DriveLogError::Connection(format!("Failed to send WATCH command: {}", e)))?;

    Ok(BufReader::new(stream))
}

/// Parse a single line of gpsd JSON data
pub fn parse_gpsd_json(fix: &mut FixState, line: &str) -> Result<()> {
    let msg: GpsdMessage = serde_json::from_str(line)
        .map_err(|e| DriveLogError::Parse(format!("Failed to parse gpsd JSON: {}", e)))?;

    match msg.class.as_str() {
        "TPV" => parse_tpv_message(fix, &msg.data),
        "VERSION" => {
            if let Some(version) = msg.data.get("release").and_then(|v| v.as_str()) {
                info!("connected to gpsd version {}", version);
            }
        }
        other => debug!("ignoring gpsd {} message", other),
    }

    Ok(())
}

/// Parse TPV (Time Position Velocity) message
fn parse_tpv_message(fix: &mut FixState, msg_data: &HashMap<String, serde_json::Value>) {
    // mode 0/1 means no fix yet
    if let Some(mode) = msg_data.get("mode").and_then(|v| v.as_u64()) {
        if mode < 2 {
            fix.set_unavailable("gpsd reports no fix");
            return;
        }
    }

    let lat = msg_data.get("lat").and_then(|v| v.as_f64());
    let lon = msg_data.get("lon").and_then(|v| v.as_f64());
    if let (Some(lat), Some(lon)) = (lat, lon) {
        let coordinate = Coordinate::new(lat, lon);
        if coordinate.is_valid() {
            fix.set_coordinate(coordinate);
        }
    }

    // gpsd already reports speed in m/s
    if let Some(speed) = msg_data.get("speed").and_then(|v| v.as_f64()) {
        fix.set_speed(speed);
    }
}
