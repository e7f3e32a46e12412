// src/lib.rs
//! DriveLog Library
//!
//! Records GPS trips while driving, stores each trip as a JSON file and
//! computes distance and speed metrics for past trips.

pub mod config;
pub mod display;
pub mod error;
pub mod feed;
pub mod gps;
pub mod metrics;
pub mod recorder;
pub mod route;
pub mod store;
pub mod units;

// Re-export main types for convenience
pub use config::DriveLogConfig;
pub use error::{DriveLogError, Result};
pub use feed::{FeedSource, PositionFeed};
pub use gps::{Coordinate, GeoSample, GeoSource, LatestFix};
pub use metrics::TripSummary;
pub use recorder::{Recorder, RecorderState};
pub use store::{SortOrder, TripKey, TripStore};
pub use units::{DistanceUnit, SpeedUnit, UnitSystem};
