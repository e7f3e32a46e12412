// src/gps/data.rs
//! Position samples captured while recording

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS-84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether the values lie within valid latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One observation taken on a sampling tick.
///
/// Position and speed arrive independently, so either may be missing. A
/// missing speed means "not observed", never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSample {
    pub timestamp: DateTime<Utc>,
    pub coordinate: Option<Coordinate>,
    /// Ground speed in meters per second
    pub speed: Option<f64>,
}

impl GeoSample {
    pub fn new(timestamp: DateTime<Utc>, coordinate: Option<Coordinate>, speed: Option<f64>) -> Self {
        Self {
            timestamp,
            coordinate,
            speed,
        }
    }

    /// Sample with both position and speed
    pub fn at(timestamp: DateTime<Utc>, latitude: f64, longitude: f64, speed: f64) -> Self {
        Self::new(timestamp, Some(Coordinate::new(latitude, longitude)), Some(speed))
    }

    /// Check if the sample carries a position
    pub fn has_fix(&self) -> bool {
        self.coordinate.is_some()
    }

    /// A tick with neither position nor speed is not worth keeping
    pub fn is_empty(&self) -> bool {
        self.coordinate.is_none() && self.speed.is_none()
    }

    /// Format coordinate for display
    pub fn format_coordinate(coord: Option<f64>) -> String {
        match coord {
            Some(val) => format!("{:>12.6}°", val),
            None => "No fix".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sample_fix() {
        let ts = Utc.with_ymd_and_hms(2024, 4, 14, 9, 30, 0).unwrap();
        let sample = GeoSample::at(ts, 42.438878, -71.119277, 12.5);
        assert!(sample.has_fix());
        assert!(!sample.is_empty());

        let speed_only = GeoSample::new(ts, None, Some(3.0));
        assert!(!speed_only.has_fix());
        assert!(!speed_only.is_empty());

        assert!(GeoSample::new(ts, None, None).is_empty());
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(48.117, 11.517).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_format_coordinate() {
        assert_eq!(GeoSample::format_coordinate(None), "No fix");
        assert!(GeoSample::format_coordinate(Some(48.117)).contains("48.117000"));
    }
}
