// src/gps/nmea.rs
//! NMEA sentence parsing

use super::data::Coordinate;
use super::source::FixState;

/// Knots to meters per second
const KNOTS_TO_MPS: f64 = 0.514444;

/// Parse a single NMEA sentence and update the fix
pub fn parse_nmea_sentence(fix: &mut FixState, line: &str) {
    let line = line.split('*').next().unwrap_or(line);
    let parts: Vec<&str> = line.split(',').collect();

    if line.starts_with("$GPGGA") || line.starts_with("$GNGGA") {
        parse_gga(fix, &parts);
    } else if line.starts_with("$GPRMC") || line.starts_with("$GNRMC") {
        parse_rmc(fix, &parts);
    }
}

/// Convert an NMEA `ddmm.mmmm` field plus hemisphere into signed degrees
fn parse_degrees(value: &str, hemisphere: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let mut result = degrees + minutes / 60.0;
    if hemisphere == "S" || hemisphere == "W" {
        result = -result;
    }
    Some(result)
}

fn parse_position(parts: &[&str], lat_idx: usize) -> Option<Coordinate> {
    let latitude = parse_degrees(parts[lat_idx], parts[lat_idx + 1])?;
    let longitude = parse_degrees(parts[lat_idx + 2], parts[lat_idx + 3])?;
    let coordinate = Coordinate::new(latitude, longitude);
    coordinate.is_valid().then_some(coordinate)
}

/// Parse GGA (Global Positioning System Fix Data) sentence
fn parse_gga(fix: &mut FixState, parts: &[&str]) {
    if parts.len() < 15 {
        return;
    }

    // Fix quality (field 6), 0 means invalid
    if parts[6] == "0" {
        fix.set_unavailable("receiver reports no fix");
        return;
    }

    if let Some(coordinate) = parse_position(parts, 2) {
        fix.set_coordinate(coordinate);
    }
}

/// Parse RMC (Recommended Minimum Course) sentence
fn parse_rmc(fix: &mut FixState, parts: &[&str]) {
    if parts.len() < 10 {
        return;
    }

    // Status (field 2): A = active, V = void
    if parts[2] != "A" {
        fix.set_unavailable("receiver reports void fix");
        return;
    }

    if let Some(coordinate) = parse_position(parts, 3) {
        fix.set_coordinate(coordinate);
    }

    // Speed over ground in knots (field 7)
    if !parts[7].is_empty() {
        if let Ok(speed_knots) = parts[7].parse::<f64>() {
            fix.set_speed(speed_knots * KNOTS_TO_MPS);
        }
    }
}
