// src/metrics.rs
//! Trip metrics: distance, average and top speed
//!
//! All functions are pure and work in SI units. Conversion to mph/kph and
//! miles/km happens in [`TripSummary::display`].

use crate::error::{DriveLogError, Result};
use crate::gps::{Coordinate, GeoSample};
use crate::units::{round_summary, DistanceUnit, SpeedUnit};
use chrono::Duration;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Placeholder shown when a metric has no data
pub const NO_DATA: &str = "--";

/// Great-circle distance between two coordinates in meters
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Sum of distances between consecutive positioned samples, in meters.
///
/// Samples without a coordinate are skipped; the path continues from the
/// last known position.
pub fn total_distance(samples: &[GeoSample]) -> f64 {
    let mut coordinates = samples.iter().filter_map(|s| s.coordinate.as_ref());
    let Some(mut previous) = coordinates.next() else {
        return 0.0;
    };

    let mut total = 0.0;
    for current in coordinates {
        total += haversine_distance(previous, current);
        previous = current;
    }
    total
}

fn recorded_speeds(samples: &[GeoSample]) -> impl Iterator<Item = f64> + '_ {
    samples.iter().filter_map(|s| s.speed)
}

/// Mean of all recorded speeds in m/s
pub fn average_speed(samples: &[GeoSample]) -> Result<f64> {
    let (sum, count) = recorded_speeds(samples).fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        return Err(DriveLogError::EmptyInput);
    }
    Ok(sum / count as f64)
}

/// Highest recorded speed in m/s
pub fn top_speed(samples: &[GeoSample]) -> Result<f64> {
    recorded_speeds(samples)
        .reduce(f64::max)
        .ok_or(DriveLogError::EmptyInput)
}

/// Time between the first and last sample
pub fn duration(samples: &[GeoSample]) -> Duration {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => last.timestamp.signed_duration_since(first.timestamp),
        _ => Duration::zero(),
    }
}

/// Derived trip metrics, recomputed every time a trip is viewed
#[derive(Debug, Clone, PartialEq)]
pub struct TripSummary {
    pub distance_m: f64,
    pub average_speed_mps: Option<f64>,
    pub top_speed_mps: Option<f64>,
    pub duration: Duration,
    pub sample_count: usize,
}

impl TripSummary {
    pub fn from_samples(samples: &[GeoSample]) -> Self {
        Self {
            distance_m: total_distance(samples),
            average_speed_mps: average_speed(samples).ok(),
            top_speed_mps: top_speed(samples).ok(),
            duration: duration(samples),
            sample_count: samples.len(),
        }
    }

    /// Summary values converted to display units and rounded to integers
    pub fn display(&self, speed_unit: SpeedUnit, distance_unit: DistanceUnit) -> SummaryDisplay {
        let speed = |v: Option<f64>| match v {
            Some(mps) => format!("{} {}", round_summary(speed_unit.convert(mps)), speed_unit.label()),
            None => NO_DATA.to_string(),
        };

        SummaryDisplay {
            distance: format!(
                "{} {}",
                round_summary(distance_unit.convert(self.distance_m)),
                distance_unit.label()
            ),
            average_speed: speed(self.average_speed_mps),
            top_speed: speed(self.top_speed_mps),
            duration: format_duration(self.duration),
        }
    }
}

/// Ready-to-print summary strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDisplay {
    pub distance: String,
    pub average_speed: String,
    pub top_speed: String,
    pub duration: String,
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(secs: i64, lat: f64, lon: f64, speed: Option<f64>) -> GeoSample {
        let ts = Utc.with_ymd_and_hms(2024, 4, 14, 9, 0, 0).unwrap() + Duration::seconds(secs);
        GeoSample::new(ts, Some(Coordinate::new(lat, lon)), speed)
    }

    #[test]
    fn test_one_degree_on_equator() {
        let samples = vec![sample(0, 0.0, 0.0, None), sample(3, 0.0, 1.0, None)];
        let km = total_distance(&samples) / 1000.0;
        assert!((km - 111.19).abs() / 111.19 < 0.005, "got {} km", km);
    }

    #[test]
    fn test_distance_short_sequences() {
        assert_eq!(total_distance(&[]), 0.0);
        assert_eq!(total_distance(&[sample(0, 42.0, -71.0, Some(1.0))]), 0.0);
    }

    #[test]
    fn test_distance_additive() {
        let p0 = sample(0, 42.3601, -71.0589, None);
        let p1 = sample(3, 42.3736, -71.1097, None);
        let p2 = sample(6, 42.4072, -71.3824, None);

        let whole = total_distance(&[p0.clone(), p1.clone(), p2.clone()]);
        let parts = total_distance(&[p0, p1.clone()]) + total_distance(&[p1, p2]);
        assert!((whole - parts).abs() < 1e-6);
    }

    #[test]
    fn test_distance_skips_unpositioned() {
        let ts = Utc.with_ymd_and_hms(2024, 4, 14, 9, 0, 0).unwrap();
        let with_gap = vec![
            sample(0, 0.0, 0.0, None),
            GeoSample::new(ts, None, Some(10.0)),
            sample(6, 0.0, 1.0, None),
        ];
        let without_gap = vec![sample(0, 0.0, 0.0, None), sample(6, 0.0, 1.0, None)];
        assert_eq!(total_distance(&with_gap), total_distance(&without_gap));
    }

    #[test]
    fn test_average_and_top_speed() {
        let samples = vec![
            sample(0, 0.0, 0.0, Some(10.0)),
            sample(3, 0.0, 0.001, Some(20.0)),
            sample(6, 0.0, 0.002, Some(30.0)),
        ];
        assert_eq!(average_speed(&samples).unwrap(), 20.0);
        assert_eq!(top_speed(&samples).unwrap(), 30.0);
    }

    #[test]
    fn test_speed_ignores_missing_values() {
        let samples = vec![
            sample(0, 0.0, 0.0, Some(10.0)),
            sample(3, 0.0, 0.001, None),
            sample(6, 0.0, 0.002, Some(20.0)),
        ];
        assert_eq!(average_speed(&samples).unwrap(), 15.0);
    }

    #[test]
    fn test_speed_empty_input() {
        let samples = vec![sample(0, 0.0, 0.0, None)];
        assert!(matches!(average_speed(&samples), Err(DriveLogError::EmptyInput)));
        assert!(matches!(top_speed(&samples), Err(DriveLogError::EmptyInput)));
        assert!(matches!(top_speed(&[]), Err(DriveLogError::EmptyInput)));
    }

    #[test]
    fn test_summary_display() {
        let samples = vec![
            sample(0, 0.0, 0.0, Some(10.0)),
            sample(65, 0.0, 1.0, Some(30.0)),
        ];
        let summary = TripSummary::from_samples(&samples);
        assert_eq!(summary.sample_count, 2);

        let metric = summary.display(SpeedUnit::Kph, DistanceUnit::Kilometers);
        assert_eq!(metric.distance, "111 km");
        assert_eq!(metric.average_speed, "72 kph");
        assert_eq!(metric.top_speed, "108 kph");
        assert_eq!(metric.duration, "1m 5s");

        let imperial = summary.display(SpeedUnit::Mph, DistanceUnit::Miles);
        assert_eq!(imperial.distance, "69 mi");
        assert_eq!(imperial.top_speed, "67 mph");
    }

    #[test]
    fn test_summary_without_speeds() {
        let summary = TripSummary::from_samples(&[sample(0, 0.0, 0.0, None)]);
        let shown = summary.display(SpeedUnit::Mph, DistanceUnit::Miles);
        assert_eq!(shown.average_speed, NO_DATA);
        assert_eq!(shown.top_speed, NO_DATA);
        assert_eq!(shown.distance, "0 mi");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(3725)), "1h 2m 5s");
    }
}
