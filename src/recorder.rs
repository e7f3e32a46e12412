// src/recorder.rs
//! Trip recorder: turns a live position source into a finished sample list
//!
//! The recorder is a two-state machine. `start` arms it and spawns a single
//! sampling task that polls the [`GeoSource`] on a fixed interval. `stop`
//! flips the state back to idle; the task sees the flip on a watch channel,
//! leaves its loop and hands the buffer back exactly once over a oneshot.

use crate::error::{DriveLogError, Result};
use crate::gps::{Coordinate, GeoSample, GeoSource};
use crate::metrics::haversine_distance;
use crate::store::{TripKey, TripStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default time between two polls of the position source
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Armed,
}

/// Snapshot of the trip being recorded, for live display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveProgress {
    pub started: Option<DateTime<Utc>>,
    pub samples: usize,
    /// Distance covered so far in meters
    pub distance_m: f64,
    /// Most recent speed in m/s
    pub speed_mps: Option<f64>,
    pub last_coordinate: Option<Coordinate>,
}

impl LiveProgress {
    fn record(&mut self, sample: &GeoSample) {
        self.samples += 1;
        if let Some(speed) = sample.speed {
            self.speed_mps = Some(speed);
        }
        if let Some(current) = sample.coordinate {
            if let Some(previous) = self.last_coordinate {
                self.distance_m += haversine_distance(&previous, &current);
            }
            self.last_coordinate = Some(current);
        }
    }
}

struct Session {
    handoff: oneshot::Receiver<Vec<GeoSample>>,
    task: JoinHandle<()>,
}

pub struct Recorder {
    source: Arc<dyn GeoSource>,
    interval: Duration,
    state: watch::Sender<RecorderState>,
    progress: Arc<watch::Sender<LiveProgress>>,
    session: Option<Session>,
}

impl Recorder {
    pub fn new<S: GeoSource + 'static>(source: S, interval: Duration) -> Self {
        let (state, _) = watch::channel(RecorderState::Idle);
        let (progress, _) = watch::channel(LiveProgress::default());
        Self {
            source: Arc::new(source),
            interval,
            state,
            progress: Arc::new(progress),
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        *self.state.borrow()
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecorderState::Armed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Latest progress of the current (or last) recording
    pub fn progress(&self) -> LiveProgress {
        self.progress.borrow().clone()
    }

    /// Receiver that is notified whenever a sample is captured
    pub fn subscribe_progress(&self) -> watch::Receiver<LiveProgress> {
        self.progress.subscribe()
    }

    /// Arm the recorder and spawn the sampling task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(DriveLogError::AlreadyRecording);
        }

        self.progress.send_replace(LiveProgress {
            started: Some(Utc::now()),
            ..LiveProgress::default()
        });
        self.state.send_replace(RecorderState::Armed);

        let (handoff_tx, handoff) = oneshot::channel();
        let task = tokio::spawn(sample_loop(
            Arc::clone(&self.source),
            self.interval,
            self.state.subscribe(),
            Arc::clone(&self.progress),
            handoff_tx,
        ));

        info!("recording started, polling every {:?}", self.interval);
        self.session = Some(Session { handoff, task });
        Ok(())
    }

    /// Disarm the recorder and take the captured samples.
    ///
    /// Returns as soon as the sampling task has observed the state change,
    /// without waiting for the next tick.
    pub async fn stop(&mut self) -> Result<Vec<GeoSample>> {
        let session = self.session.take().ok_or(DriveLogError::NotRecording)?;
        self.state.send_replace(RecorderState::Idle);

        let samples = session.handoff.await.map_err(|_| {
            DriveLogError::Other("sampling task ended without handing off its samples".to_string())
        })?;
        info!("recording stopped with {} samples", samples.len());
        Ok(samples)
    }

    /// Stop recording and persist the trip.
    ///
    /// An empty recording is discarded and `None` is returned; nothing is
    /// written. The save runs on the blocking thread pool.
    pub async fn stop_and_save(&mut self, store: &TripStore) -> Result<Option<TripKey>> {
        let samples = self.stop().await?;
        if samples.is_empty() {
            info!("no samples captured, trip discarded");
            return Ok(None);
        }

        let store = store.clone();
        let key = tokio::task::spawn_blocking(move || store.save(&samples))
            .await
            .map_err(|e| DriveLogError::Other(format!("save task failed: {}", e)))??;
        Ok(Some(key))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            warn!("recorder dropped while armed, samples discarded");
            session.task.abort();
        }
    }
}

async fn sample_loop(
    source: Arc<dyn GeoSource>,
    period: Duration,
    mut state: watch::Receiver<RecorderState>,
    progress: Arc<watch::Sender<LiveProgress>>,
    handoff: oneshot::Sender<Vec<GeoSample>>,
) {
    let mut buffer = Vec::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() == RecorderState::Idle {
                    break;
                }
            }
            _ = ticker.tick() => {
                if *state.borrow() != RecorderState::Armed {
                    break;
                }
                if let Some(sample) = poll_once(source.as_ref(), Utc::now()) {
                    debug!(
                        "captured sample {}: {:?} at {:?} m/s",
                        buffer.len() + 1,
                        sample.coordinate,
                        sample.speed
                    );
                    progress.send_modify(|p| p.record(&sample));
                    buffer.push(sample);
                }
            }
        }
    }

    if handoff.send(buffer).is_err() {
        warn!("recorder went away before the trip was handed off");
    }
}

/// Read position and speed once. Errors count as "no value this tick".
pub fn poll_once(source: &dyn GeoSource, now: DateTime<Utc>) -> Option<GeoSample> {
    let coordinate = source.current_coordinate().unwrap_or_else(|e| {
        warn!("no position this tick: {}", e);
        None
    });
    let speed = source.current_speed().unwrap_or_else(|e| {
        debug!("no speed this tick: {}", e);
        None
    });

    let sample = GeoSample::new(now, coordinate, speed);
    (!sample.is_empty()).then_some(sample)
}
