// src/gps/source.rs
//! Interface the recorder uses to pull position and speed

use super::data::Coordinate;
use crate::error::{DriveLogError, Result};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Something that can be polled for the device's latest position and speed.
///
/// `Ok(None)` means nothing new is available this tick. An `Err` reports that
/// positioning is unavailable; callers treat it the same as no data.
pub trait GeoSource: Send + Sync {
    fn current_coordinate(&self) -> Result<Option<Coordinate>>;

    /// Current ground speed in meters per second
    fn current_speed(&self) -> Result<Option<f64>>;
}

impl<T: GeoSource + ?Sized> GeoSource for Arc<T> {
    fn current_coordinate(&self) -> Result<Option<Coordinate>> {
        (**self).current_coordinate()
    }

    fn current_speed(&self) -> Result<Option<f64>> {
        (**self).current_speed()
    }
}

/// Latest values reported by a receiver, written by a feed task
#[derive(Debug, Clone, Default)]
pub struct FixState {
    pub coordinate: Option<Coordinate>,
    pub speed: Option<f64>,
    pub updated: Option<DateTime<Utc>>,
    /// Set when the receiver reports it cannot produce a fix
    pub error: Option<String>,
}

impl FixState {
    /// Out-of-range or non-finite positions are dropped
    pub fn set_coordinate(&mut self, coordinate: Coordinate) {
        if !coordinate.is_valid() {
            return;
        }
        self.coordinate = Some(coordinate);
        self.error = None;
        self.updated = Some(Utc::now());
    }

    /// Negative or non-finite speeds mean the receiver has no estimate
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() || speed < 0.0 {
            return;
        }
        self.speed = Some(speed);
        self.error = None;
        self.updated = Some(Utc::now());
    }

    pub fn set_unavailable(&mut self, reason: &str) {
        self.error = Some(reason.to_string());
        self.updated = Some(Utc::now());
    }
}

/// Shared latest-fix cell.
///
/// Values are taken on read, so a fix that arrives once is sampled once even
/// if the receiver goes quiet afterwards.
#[derive(Debug, Clone, Default)]
pub struct LatestFix {
    state: Arc<RwLock<FixState>>,
}

impl LatestFix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update from the feed side
    pub fn update<F: FnOnce(&mut FixState)>(&self, f: F) {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Copy of the current state without consuming anything
    pub fn snapshot(&self) -> FixState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn take<T>(&self, f: impl FnOnce(&mut FixState) -> Option<T>) -> Result<Option<T>> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| DriveLogError::Other("fix state lock poisoned".to_string()))?;
        if let Some(reason) = guard.error.clone() {
            return Err(DriveLogError::PositioningUnavailable(reason));
        }
        Ok(f(&mut guard))
    }
}

impl GeoSource for LatestFix {
    fn current_coordinate(&self) -> Result<Option<Coordinate>> {
        self.take(|state| state.coordinate.take())
    }

    fn current_speed(&self) -> Result<Option<f64>> {
        self.take(|state| state.speed.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_consumed() {
        let fix = LatestFix::new();
        fix.update(|s| {
            s.set_coordinate(Coordinate::new(48.117, 11.517));
            s.set_speed(12.0);
        });

        assert_eq!(
            fix.current_coordinate().unwrap(),
            Some(Coordinate::new(48.117, 11.517))
        );
        assert_eq!(fix.current_speed().unwrap(), Some(12.0));

        // Nothing new since the last read
        assert_eq!(fix.current_coordinate().unwrap(), None);
        assert_eq!(fix.current_speed().unwrap(), None);
    }

    #[test]
    fn test_speed_and_position_independent() {
        let fix = LatestFix::new();
        fix.update(|s| s.set_speed(4.2));

        assert_eq!(fix.current_coordinate().unwrap(), None);
        assert_eq!(fix.current_speed().unwrap(), Some(4.2));
    }

    #[test]
    fn test_unavailable_reports_error() {
        let fix = LatestFix::new();
        fix.update(|s| s.set_unavailable("no fix"));

        assert!(matches!(
            fix.current_coordinate(),
            Err(DriveLogError::PositioningUnavailable(_))
        ));

        // A fresh fix clears the condition
        fix.update(|s| s.set_coordinate(Coordinate::new(1.0, 2.0)));
        assert!(fix.current_coordinate().unwrap().is_some());
    }

    #[test]
    fn test_invalid_speed_ignored() {
        let fix = LatestFix::new();
        fix.update(|s| s.set_speed(-1.0));
        assert_eq!(fix.snapshot().speed, None);
    }

    #[test]
    fn test_invalid_coordinate_ignored() {
        let fix = LatestFix::new();
        fix.update(|s| s.set_coordinate(Coordinate::new(f64::NAN, 1.0)));
        fix.update(|s| s.set_coordinate(Coordinate::new(95.0, 1.0)));
        assert_eq!(fix.snapshot().coordinate, None);
    }
}
