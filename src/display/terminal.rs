// src/display/terminal.rs
//! Terminal panel shown while a trip is being recorded

use crate::{
    error::{DriveLogError, Result},
    gps::GeoSample,
    metrics::format_duration,
    recorder::LiveProgress,
    units::{round_live, DistanceUnit, SpeedUnit},
};
use chrono::{DateTime, Utc};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    time::Duration,
};
use tokio::{sync::watch, time::sleep};

pub struct TerminalDisplay {
    speed_unit: SpeedUnit,
    distance_unit: DistanceUnit,
}

impl TerminalDisplay {
    pub fn new(speed_unit: SpeedUnit, distance_unit: DistanceUnit) -> Self {
        Self {
            speed_unit,
            distance_unit,
        }
    }

    /// Redraw the live panel once a second until Ctrl+C is pressed
    pub async fn run_until_interrupted(&self, progress: watch::Receiver<LiveProgress>) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(stdout, Hide, DisableLineWrap).map_err(DriveLogError::Io)?;

        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);

        let outcome = loop {
            let snapshot = progress.borrow().clone();
            if let Err(e) = self.redraw(&mut stdout, &snapshot) {
                break Err(e);
            }

            tokio::select! {
                signal = &mut interrupted => break signal.map_err(DriveLogError::Io),
                _ = sleep(Duration::from_secs(1)) => {}
            }
        };

        execute!(stdout, Show, EnableLineWrap).map_err(DriveLogError::Io)?;
        println!("\nStopping recording...");
        outcome
    }

    fn redraw(&self, stdout: &mut io::Stdout, progress: &LiveProgress) -> Result<()> {
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0)).map_err(DriveLogError::Io)?;
        self.render_progress(stdout, progress, Utc::now())?;
        stdout.flush().map_err(DriveLogError::Io)
    }

    /// Render the recording panel
    pub fn render_progress(
        &self,
        stdout: &mut impl Write,
        progress: &LiveProgress,
        now: DateTime<Utc>,
    ) -> Result<()> {
        execute!(
            stdout,
            SetForegroundColor(Color::Green),
            Print("=".repeat(50)),
            Print("\n"),
            Print("DriveLog - Recording"),
            Print("\n"),
            Print("=".repeat(50)),
            Print("\n"),
            ResetColor
        )
        .map_err(DriveLogError::Io)?;

        let elapsed = progress
            .started
            .map(|start| format_duration(now.signed_duration_since(start)))
            .unwrap_or_else(|| "-".to_string());

        let speed = match progress.speed_mps {
            Some(mps) => format!("{:.1} {}", round_live(self.speed_unit.convert(mps)), self.speed_unit.label()),
            None => "--".to_string(),
        };
        let distance = format!(
            "{:.1} {}",
            round_live(self.distance_unit.convert(progress.distance_m)),
            self.distance_unit.label()
        );

        execute!(
            stdout,
            SetForegroundColor(Color::Cyan),
            Print("TRIP:\n"),
            ResetColor,
            Print(format!("  Elapsed:   {:>12}\n", elapsed)),
            Print(format!("  Samples:   {:>12}\n", progress.samples)),
            Print(format!("  Speed:     {:>12}\n", speed)),
            Print(format!("  Distance:  {:>12}\n\n", distance))
        )
        .map_err(DriveLogError::Io)?;

        let (lat, lon) = match progress.last_coordinate {
            Some(c) => (Some(c.latitude), Some(c.longitude)),
            None => (None, None),
        };
        execute!(
            stdout,
            SetForegroundColor(Color::Yellow),
            Print("POSITION:\n"),
            ResetColor,
            Print(format!("  Latitude:  {}\n", GeoSample::format_coordinate(lat))),
            Print(format!("  Longitude: {}\n\n", GeoSample::format_coordinate(lon))),
            SetForegroundColor(Color::Green),
            Print("Press Ctrl+C to stop and save"),
            Print("\n"),
            ResetColor
        )
        .map_err(DriveLogError::Io)?;

        Ok(())
    }
}
