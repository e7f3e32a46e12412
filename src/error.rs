// src/error.rs
//! Error types for the trip logger

use crate::store::TripKey;
use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, DriveLogError>;

#[derive(Debug)]
pub enum DriveLogError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Connection(String),
    Parse(String),
    /// Persisting a trip failed; nothing was left behind at `path`.
    Write { path: PathBuf, source: std::io::Error },
    /// A stored trip exists but cannot be read back.
    Decode { key: TripKey, message: String },
    NotFound(TripKey),
    /// A sample holds a value that cannot be stored faithfully.
    InvalidSample { index: usize, message: String },
    /// Metrics or persistence requested on a trip with no usable samples.
    EmptyInput,
    PositioningUnavailable(String),
    AlreadyRecording,
    NotRecording,
    InvalidKey(String),
    Other(String),
}

impl fmt::Display for DriveLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveLogError::Io(e) => write!(f, "IO error: {}", e),
            DriveLogError::Serial(e) => write!(f, "Serial error: {}", e),
            DriveLogError::Json(e) => write!(f, "JSON error: {}", e),
            DriveLogError::Connection(msg) => write!(f, "Connection error: {}", msg),
            DriveLogError::Parse(msg) => write!(f, "Parse error: {}", msg),
            DriveLogError::Write { path, source } => {
                write!(f, "Failed to write trip file {}: {}", path.display(), source)
            }
            DriveLogError::Decode { key, message } => {
                write!(f, "Cannot load trip {}: {}", key, message)
            }
            DriveLogError::NotFound(key) => write!(f, "Trip {} not found", key),
            DriveLogError::InvalidSample { index, message } => {
                write!(f, "Invalid sample {}: {}", index, message)
            }
            DriveLogError::EmptyInput => write!(f, "No data"),
            DriveLogError::PositioningUnavailable(msg) => {
                write!(f, "Positioning unavailable: {}", msg)
            }
            DriveLogError::AlreadyRecording => write!(f, "A trip is already being recorded"),
            DriveLogError::NotRecording => write!(f, "No trip is being recorded"),
            DriveLogError::InvalidKey(key) => write!(f, "Invalid trip key: {}", key),
            DriveLogError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DriveLogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriveLogError::Io(e) => Some(e),
            DriveLogError::Serial(e) => Some(e),
            DriveLogError::Json(e) => Some(e),
            DriveLogError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DriveLogError {
    fn from(error: std::io::Error) -> Self {
        DriveLogError::Io(error)
    }
}

impl From<tokio_serial::Error> for DriveLogError {
    fn from(error: tokio_serial::Error) -> Self {
        DriveLogError::Serial(error)
    }
}

impl From<serde_json::Error> for DriveLogError {
    fn from(error: serde_json::Error) -> Self {
        DriveLogError::Json(error)
    }
}
