// src/store.rs
//! File-backed trip storage
//!
//! Each trip is one JSON file named `trip<yyyyMMddHHmmss>.json`, holding an
//! array of `{ "latitude", "longitude", "speed", "timestamp" }` records. The
//! three numeric keys are required; `null` marks a value that was not observed
//! on that tick.

use crate::error::{DriveLogError, Result};
use crate::gps::{Coordinate, GeoSample};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const FILE_PREFIX: &str = "trip";
const FILE_EXTENSION: &str = "json";
const KEY_FORMAT: &str = "%Y%m%d%H%M%S";
const TITLE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const KEY_LEN: usize = 14;

/// Saving gives up after this many occupied seconds in a row
const MAX_KEY_ATTEMPTS: i64 = 60;

/// Trip identifier: the local creation time at second resolution
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripKey(String);

impl TripKey {
    pub fn from_datetime<Tz: TimeZone>(created: &DateTime<Tz>) -> Self {
        Self(created.naive_local().format(KEY_FORMAT).to_string())
    }

    /// Parse a 14-digit `yyyyMMddHHmmss` key
    pub fn parse(key: &str) -> Result<Self> {
        if key.len() != KEY_LEN || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DriveLogError::InvalidKey(key.to_string()));
        }
        NaiveDateTime::parse_from_str(key, KEY_FORMAT)
            .map_err(|_| DriveLogError::InvalidKey(key.to_string()))?;
        Ok(Self(key.to_string()))
    }

    /// Extract the key from a `trip<key>.json` file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (stem, extension) = name.rsplit_once('.')?;
        if !extension.eq_ignore_ascii_case(FILE_EXTENSION) {
            return None;
        }
        let key = stem.strip_prefix(FILE_PREFIX)?;
        Self::parse(key).ok()
    }

    pub fn file_name(&self) -> String {
        format!("{}{}.{}", FILE_PREFIX, self.0, FILE_EXTENSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The creation time encoded in the key (local wall clock)
    pub fn created(&self) -> NaiveDateTime {
        // Keys are validated on construction
        NaiveDateTime::parse_from_str(&self.0, KEY_FORMAT).unwrap_or_default()
    }

    /// Human readable title, e.g. `Trip on 2024-04-14 09:30:00`
    pub fn title(&self) -> String {
        format!("Trip on {}", self.created().format(TITLE_FORMAT))
    }

    fn next_second(&self) -> Self {
        let next = self.created() + chrono::Duration::seconds(1);
        Self(next.format(KEY_FORMAT).to_string())
    }
}

impl fmt::Display for TripKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// On-disk shape of one sample
#[derive(Debug, Serialize, Deserialize)]
struct SampleRecord {
    #[serde(deserialize_with = "nullable_number")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "nullable_number")]
    longitude: Option<f64>,
    #[serde(deserialize_with = "nullable_number")]
    speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

/// Required key whose value may be `null`
fn nullable_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f64>, D::Error> {
    Option::<f64>::deserialize(deserializer)
}

impl From<&GeoSample> for SampleRecord {
    fn from(sample: &GeoSample) -> Self {
        Self {
            latitude: sample.coordinate.map(|c| c.latitude),
            longitude: sample.coordinate.map(|c| c.longitude),
            speed: sample.speed,
            timestamp: Some(sample.timestamp),
        }
    }
}

impl SampleRecord {
    fn into_sample(self, fallback_time: DateTime<Utc>) -> std::result::Result<GeoSample, String> {
        let coordinate = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            (None, None) => None,
            _ => return Err("latitude and longitude must both be set or both be null".to_string()),
        };
        Ok(GeoSample::new(
            self.timestamp.unwrap_or(fallback_time),
            coordinate,
            self.speed,
        ))
    }
}

/// Directory of trip files
#[derive(Debug, Clone)]
pub struct TripStore {
    dir: PathBuf,
}

impl TripStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            DriveLogError::Other(format!("Failed to create trips directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &TripKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn exists(&self, key: &TripKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Persist a finished trip under a key derived from the current time
    pub fn save(&self, samples: &[GeoSample]) -> Result<TripKey> {
        self.save_at(samples, Local::now())
    }

    /// Persist a finished trip created at `created`.
    ///
    /// The file appears atomically and never replaces an existing trip: if the
    /// second is taken, the key moves forward one second at a time.
    pub fn save_at<Tz: TimeZone>(&self, samples: &[GeoSample], created: DateTime<Tz>) -> Result<TripKey> {
        if samples.is_empty() {
            return Err(DriveLogError::EmptyInput);
        }
        validate_samples(samples)?;

        let records: Vec<SampleRecord> = samples.iter().map(SampleRecord::from).collect();
        let contents = serde_json::to_vec_pretty(&records)?;

        let mut key = TripKey::from_datetime(&created);
        let mut temp = self.write_temp(&contents, &key)?;

        for _ in 0..MAX_KEY_ATTEMPTS {
            let path = self.path_for(&key);
            match temp.persist_noclobber(&path) {
                Ok(_) => {
                    info!("saved trip {} ({} samples)", key, samples.len());
                    return Ok(key);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!("trip key {} already taken", key);
                    temp = e.file;
                    key = key.next_second();
                }
                Err(e) => {
                    return Err(DriveLogError::Write {
                        path,
                        source: e.error,
                    })
                }
            }
        }

        Err(DriveLogError::Write {
            path: self.path_for(&key),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "no free trip key"),
        })
    }

    fn write_temp(&self, contents: &[u8], key: &TripKey) -> Result<NamedTempFile> {
        let write_error = |source| DriveLogError::Write {
            path: self.path_for(key),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(write_error)?;
        temp.write_all(contents).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        Ok(temp)
    }

    /// All stored trip keys in the requested order.
    ///
    /// Unreadable directories produce an empty list and a warning.
    pub fn list(&self, order: SortOrder) -> Vec<TripKey> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("failed to list trips in {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut keys: Vec<TripKey> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping unreadable directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| TripKey::from_file_name(&entry.file_name().to_string_lossy()))
            .collect();

        // Fixed-width keys sort chronologically as strings
        keys.sort();
        if order == SortOrder::NewestFirst {
            keys.reverse();
        }
        keys
    }

    /// Read back the samples of a stored trip
    pub fn load(&self, key: &TripKey) -> Result<Vec<GeoSample>> {
        let path = self.path_for(key);
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DriveLogError::NotFound(key.clone()))
            }
            Err(e) => {
                return Err(DriveLogError::Decode {
                    key: key.clone(),
                    message: e.to_string(),
                })
            }
        };

        let decode_error = |message: String| DriveLogError::Decode {
            key: key.clone(),
            message,
        };

        let records: Vec<SampleRecord> =
            serde_json::from_slice(&contents).map_err(|e| decode_error(e.to_string()))?;

        let fallback_time = Local
            .from_local_datetime(&key.created())
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&key.created()));

        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                record
                    .into_sample(fallback_time)
                    .map_err(|msg| decode_error(format!("record {}: {}", i, msg)))
            })
            .collect()
    }

    /// Remove a trip. Returns `false` if it was already gone.
    pub fn delete(&self, key: &TripKey) -> Result<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("deleted trip {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("trip {} already absent", key);
                Ok(false)
            }
            Err(e) => Err(DriveLogError::Io(e)),
        }
    }
}

/// Filter an already listed set of keys by a case-insensitive text query.
///
/// JSON has no NaN or infinity, so such values would come back as `null`
/// or make the file unreadable.
fn validate_samples(samples: &[GeoSample]) -> Result<()> {
    for (index, sample) in samples.iter().enumerate() {
        if let Some(coordinate) = sample.coordinate {
            if !coordinate.is_valid() {
                return Err(DriveLogError::InvalidSample {
                    index,
                    message: format!(
                        "coordinate {}, {} is out of range",
                        coordinate.latitude, coordinate.longitude
                    ),
                });
            }
        }
        if let Some(speed) = sample.speed {
            if !speed.is_finite() || speed < 0.0 {
                return Err(DriveLogError::InvalidSample {
                    index,
                    message: format!("speed {} is not a valid value", speed),
                });
            }
        }
    }
    Ok(())
}

/// Matches against both the raw key and the display title. An empty query
/// keeps everything.
pub fn search(keys: &[TripKey], query: &str) -> Vec<TripKey> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return keys.to_vec();
    }
    keys.iter()
        .filter(|key| key.as_str().contains(&query) || key.title().to_lowercase().contains(&query))
        .cloned()
        .collect()
}
