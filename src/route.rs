// src/route.rs
//! Route geometry for drawing a trip on a map, and trip export

use crate::error::{DriveLogError, Result};
use crate::gps::{Coordinate, GeoSample};
use crate::store::TripKey;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Extra margin around the route when framing the map, as a fraction of the span
const REGION_PADDING: f64 = 0.2;
/// Smallest span in degrees, so a single point still gets a usable map
const MIN_SPAN_DEG: f64 = 0.005;

/// Visible map area: center plus latitude/longitude extent in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center: Coordinate,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

/// Everything a map view needs to draw a trip
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOverlay {
    pub line: Vec<Coordinate>,
    pub start: Coordinate,
    pub end: Coordinate,
    pub region: MapRegion,
}

impl RouteOverlay {
    /// Build the overlay from the positioned samples; `None` if there are none
    pub fn from_samples(samples: &[GeoSample]) -> Option<Self> {
        let line: Vec<Coordinate> = samples.iter().filter_map(|s| s.coordinate).collect();
        let start = *line.first()?;
        let end = *line.last()?;

        let (mut min_lat, mut max_lat) = (start.latitude, start.latitude);
        let (mut min_lon, mut max_lon) = (start.longitude, start.longitude);
        for c in &line {
            min_lat = min_lat.min(c.latitude);
            max_lat = max_lat.max(c.latitude);
            min_lon = min_lon.min(c.longitude);
            max_lon = max_lon.max(c.longitude);
        }

        let region = MapRegion {
            center: Coordinate::new((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0),
            latitude_span: ((max_lat - min_lat) * (1.0 + REGION_PADDING)).max(MIN_SPAN_DEG),
            longitude_span: ((max_lon - min_lon) * (1.0 + REGION_PADDING)).max(MIN_SPAN_DEG),
        };

        Some(Self {
            line,
            start,
            end,
            region,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportFormat {
    Gpx,
    GeoJson,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &str {
        match self {
            ExportFormat::Gpx => "gpx",
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ExportFormat::Gpx => "GPX (GPS Exchange)",
            ExportFormat::GeoJson => "GeoJSON",
            ExportFormat::Csv => "CSV",
        }
    }
}

/// Renders one stored trip into an exchange format
pub struct TripExporter<'a> {
    key: &'a TripKey,
    samples: &'a [GeoSample],
}

impl<'a> TripExporter<'a> {
    pub fn new(key: &'a TripKey, samples: &'a [GeoSample]) -> Self {
        Self { key, samples }
    }

    pub fn render(&self, format: ExportFormat) -> Result<String> {
        if self.samples.is_empty() {
            return Err(DriveLogError::EmptyInput);
        }

        match format {
            ExportFormat::Gpx => Ok(self.to_gpx()),
            ExportFormat::GeoJson => self.to_geojson(),
            ExportFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let content = self.render(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    fn to_gpx(&self) -> String {
        let mut gpx = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="DriveLog" xmlns="http://www.topografix.com/GPX/1/1">
"#,
        );
        gpx.push_str(&format!("  <trk>\n    <name>{}</name>\n    <trkseg>\n", self.key.title()));

        for sample in self.samples {
            let Some(c) = sample.coordinate else { continue };
            gpx.push_str(&format!(
                "      <trkpt lat=\"{}\" lon=\"{}\">\n        <time>{}</time>\n",
                c.latitude,
                c.longitude,
                sample.timestamp.to_rfc3339()
            ));
            if let Some(speed) = sample.speed {
                gpx.push_str(&format!(
                    "        <extensions><speed>{}</speed></extensions>\n",
                    speed
                ));
            }
            gpx.push_str("      </trkpt>\n");
        }

        gpx.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
        gpx
    }

    fn to_geojson(&self) -> Result<String> {
        let coordinates: Vec<serde_json::Value> = self
            .samples
            .iter()
            .filter_map(|s| s.coordinate)
            .map(|c| serde_json::json!([c.longitude, c.latitude]))
            .collect();
        let times: Vec<String> = self
            .samples
            .iter()
            .filter(|s| s.coordinate.is_some())
            .map(|s| s.timestamp.to_rfc3339())
            .collect();

        let feature = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates
            },
            "properties": {
                "name": self.key.title(),
                "key": self.key.as_str(),
                "times": times
            }
        });

        let feature_collection = serde_json::json!({
            "type": "FeatureCollection",
            "features": [feature]
        });

        serde_json::to_string_pretty(&feature_collection).map_err(DriveLogError::Json)
    }

    fn to_csv(&self) -> String {
        let mut csv = String::from("timestamp,latitude,longitude,speed\n");

        for sample in self.samples {
            let opt = |v: Option<f64>| v.map_or(String::new(), |v| v.to_string());
            csv.push_str(&format!(
                "{},{},{},{}\n",
                sample.timestamp.to_rfc3339(),
                opt(sample.coordinate.map(|c| c.latitude)),
                opt(sample.coordinate.map(|c| c.longitude)),
                opt(sample.speed)
            ));
        }

        csv
    }
}
