// src/gps/mod.rs
//! Position sources and receiver protocol parsing

pub mod data;
pub mod gpsd;
pub mod nmea;
pub mod source;

pub use data::{Coordinate, GeoSample};
pub use source::{FixState, GeoSource, LatestFix};
