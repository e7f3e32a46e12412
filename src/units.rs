// src/units.rs
//! Unit conversion between stored SI values and display units
//!
//! Samples and metrics are always kept in SI base units (meters, meters per
//! second). Conversion happens only when a value is shown to the user:
//! - Speed: m/s to mph or kph
//! - Distance: meters to miles or kilometers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// m/s to mph
pub const MPS_TO_MPH: f64 = 2.23694;
/// m/s to km/h
pub const MPS_TO_KPH: f64 = 3.6;
/// meters to miles
pub const METERS_TO_MILES: f64 = 0.000621371;
/// meters to kilometers
pub const METERS_TO_KM: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Imperial,
    Metric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Speed,
    Distance,
}

fn factor(quantity: Quantity, system: UnitSystem) -> f64 {
    match (quantity, system) {
        (Quantity::Speed, UnitSystem::Imperial) => MPS_TO_MPH,
        (Quantity::Speed, UnitSystem::Metric) => MPS_TO_KPH,
        (Quantity::Distance, UnitSystem::Imperial) => METERS_TO_MILES,
        (Quantity::Distance, UnitSystem::Metric) => METERS_TO_KM,
    }
}

/// Convert an SI value (m/s or m) into display units
pub fn to_display_units(value_si: f64, quantity: Quantity, system: UnitSystem) -> f64 {
    value_si * factor(quantity, system)
}

/// Convert a display value back into SI units
pub fn from_display_units(value: f64, quantity: Quantity, system: UnitSystem) -> f64 {
    value / factor(quantity, system)
}

/// Short unit label used next to displayed values
pub fn unit_label(quantity: Quantity, system: UnitSystem) -> &'static str {
    match (quantity, system) {
        (Quantity::Speed, UnitSystem::Imperial) => "mph",
        (Quantity::Speed, UnitSystem::Metric) => "kph",
        (Quantity::Distance, UnitSystem::Imperial) => "mi",
        (Quantity::Distance, UnitSystem::Metric) => "km",
    }
}

/// Rounding for values shown while a trip is in progress (one decimal)
pub fn round_live(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounding for trip summary values (nearest integer)
pub fn round_summary(value: f64) -> f64 {
    value.round()
}

/// Speed unit chosen in the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Mph,
    Kph,
}

impl SpeedUnit {
    pub fn system(self) -> UnitSystem {
        match self {
            SpeedUnit::Mph => UnitSystem::Imperial,
            SpeedUnit::Kph => UnitSystem::Metric,
        }
    }

    /// Convert m/s into this unit
    pub fn convert(self, mps: f64) -> f64 {
        to_display_units(mps, Quantity::Speed, self.system())
    }

    pub fn label(self) -> &'static str {
        unit_label(Quantity::Speed, self.system())
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SpeedUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mph" => Ok(SpeedUnit::Mph),
            "kph" | "km/h" | "kmh" => Ok(SpeedUnit::Kph),
            other => Err(format!("unknown speed unit '{}' (expected mph or kph)", other)),
        }
    }
}

/// Distance unit chosen in the settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn system(self) -> UnitSystem {
        match self {
            DistanceUnit::Miles => UnitSystem::Imperial,
            DistanceUnit::Kilometers => UnitSystem::Metric,
        }
    }

    /// Convert meters into this unit
    pub fn convert(self, meters: f64) -> f64 {
        to_display_units(meters, Quantity::Distance, self.system())
    }

    pub fn label(self) -> &'static str {
        unit_label(Quantity::Distance, self.system())
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceUnit::Miles => f.write_str("miles"),
            DistanceUnit::Kilometers => f.write_str("kilometers"),
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "km" | "kilometer" | "kilometers" => Ok(DistanceUnit::Kilometers),
            other => Err(format!(
                "unknown distance unit '{}' (expected miles or kilometers)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_conversion() {
        let mph = to_display_units(10.0, Quantity::Speed, UnitSystem::Imperial);
        assert!((mph - 22.3694).abs() < 1e-9);

        let kph = to_display_units(10.0, Quantity::Speed, UnitSystem::Metric);
        assert!((kph - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_conversion() {
        let km = to_display_units(1500.0, Quantity::Distance, UnitSystem::Metric);
        assert!((km - 1.5).abs() < 1e-12);

        // 1609.344 m is one statute mile
        let mi = to_display_units(1609.344, Quantity::Distance, UnitSystem::Imperial);
        assert!((mi - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_mph_round_trip() {
        for mps in [0.0, 1.0, 13.4, 27.78, 55.5] {
            let mph = to_display_units(mps, Quantity::Speed, UnitSystem::Imperial);
            let back = from_display_units(mph, Quantity::Speed, UnitSystem::Imperial);
            assert!((back - mps).abs() < 1e-9, "{} -> {} -> {}", mps, mph, back);
        }
    }

    #[test]
    fn test_rounding_policy() {
        assert_eq!(round_live(42.46), 42.5);
        assert_eq!(round_live(0.04), 0.0);
        assert_eq!(round_summary(42.46), 42.0);
        assert_eq!(round_summary(42.5), 43.0);
    }

    #[test]
    fn test_unit_labels() {
        assert_eq!(SpeedUnit::Mph.label(), "mph");
        assert_eq!(SpeedUnit::Kph.label(), "kph");
        assert_eq!(DistanceUnit::Miles.label(), "mi");
        assert_eq!(DistanceUnit::Kilometers.label(), "km");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("KPH".parse::<SpeedUnit>(), Ok(SpeedUnit::Kph));
        assert_eq!("miles".parse::<DistanceUnit>(), Ok(DistanceUnit::Miles));
        assert_eq!("km".parse::<DistanceUnit>(), Ok(DistanceUnit::Kilometers));
        assert!("knots".parse::<SpeedUnit>().is_err());
    }

    #[test]
    fn test_settings_serialization() {
        assert_eq!(serde_json::to_string(&SpeedUnit::Kph).unwrap(), "\"kph\"");
        assert_eq!(
            serde_json::from_str::<DistanceUnit>("\"kilometers\"").unwrap(),
            DistanceUnit::Kilometers
        );
    }
}
