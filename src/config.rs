// src/config.rs
//! Configuration management: position source, sampling interval, units

use crate::error::{DriveLogError, Result};
use crate::feed::FeedSource;
use crate::units::{DistanceUnit, SpeedUnit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveLogConfig {
    pub source_type: String, // "gpsd" or "serial"
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub poll_interval_secs: u64,
    pub speed_unit: SpeedUnit,
    pub distance_unit: DistanceUnit,
    pub trips_dir: Option<PathBuf>,
}

impl Default for DriveLogConfig {
    fn default() -> Self {
        Self {
            source_type: "gpsd".to_string(),
            serial_port: None,
            serial_baudrate: Some(9600),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(2947),
            poll_interval_secs: 3,
            speed_unit: SpeedUnit::Mph,
            distance_unit: DistanceUnit::Miles,
            trips_dir: None,
        }
    }
}

impl DriveLogConfig {
    /// Load configuration from `$HOME/.config/drivelog/config.json`
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to `$HOME/.config/drivelog/config.json`
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Load from an explicit file; a missing file yields the defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| DriveLogError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| DriveLogError::Other(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DriveLogError::Other(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| DriveLogError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, contents)
            .map_err(|e| DriveLogError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn home_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| DriveLogError::Other("HOME environment variable not set".to_string()))?;
        Ok(PathBuf::from(home))
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join(".config").join("drivelog").join("config.json"))
    }

    /// Directory holding trip files
    pub fn trips_dir(&self) -> Result<PathBuf> {
        match &self.trips_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::home_dir()?
                .join(".local")
                .join("share")
                .join("drivelog")
                .join("trips")),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Receiver connection described by this configuration
    pub fn feed_source(&self) -> Result<FeedSource> {
        match self.source_type.as_str() {
            "serial" => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    DriveLogError::Other("serial source selected but no serial_port configured".to_string())
                })?;
                Ok(FeedSource::Serial {
                    port,
                    baudrate: self.serial_baudrate.unwrap_or(9600),
                })
            }
            "gpsd" => Ok(FeedSource::Gpsd {
                host: self.gpsd_host.clone().unwrap_or_else(|| "localhost".to_string()),
                port: self.gpsd_port.unwrap_or(2947),
            }),
            other => Err(DriveLogError::Other(format!("Unknown source type '{}'", other))),
        }
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }

    /// Update unit preferences
    pub fn update_units(&mut self, speed: Option<SpeedUnit>, distance: Option<DistanceUnit>) {
        if let Some(speed) = speed {
            self.speed_unit = speed;
        }
        if let Some(distance) = distance {
            self.distance_unit = distance;
        }
    }
}
