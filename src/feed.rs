// src/feed.rs
//! Background tasks that keep a `LatestFix` current from a GPS receiver

use crate::{
    error::{DriveLogError, Result},
    gps::{gpsd, nmea, LatestFix},
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tracing::{info, warn};

/// GPS data source configuration
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Serial { port: String, baudrate: u32 },
    Gpsd { host: String, port: u16 },
}

/// Reads a receiver in the background and publishes into a shared fix
pub struct PositionFeed {
    fix: LatestFix,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PositionFeed {
    pub fn new() -> Self {
        Self {
            fix: LatestFix::new(),
            running: Arc::new(AtomicBool::new(true)),
            task: Mutex::new(None),
        }
    }

    /// The fix cell this feed writes into; hand it to a `Recorder`
    pub fn fix(&self) -> LatestFix {
        self.fix.clone()
    }

    /// Connect to the source and spawn the reader task
    pub async fn start(&self, source: FeedSource) -> Result<()> {
        self.running.store(true, Ordering::Relaxed);
        match source {
            FeedSource::Serial { port, baudrate } => self.connect_serial(&port, baudrate).await,
            FeedSource::Gpsd { host, port } => self.connect_gpsd(&host, port).await,
        }
    }

    async fn connect_serial(&self, port: &str, baudrate: u32) -> Result<()> {
        info!("connecting to GPS on {} at {} baud", port, baudrate);

        let serial = tokio_serial::new(port, baudrate)
            .timeout(Duration::from_millis(1000))
            .open_native_async()
            .map_err(|e| {
                DriveLogError::Connection(format!("Failed to open serial port {}: {}", port, e))
            })?;

        let fix = self.fix.clone();
        let running = Arc::clone(&self.running);

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(serial);
            let mut line = String::new();

            while running.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            fix.update(|state| nmea::parse_nmea_sentence(state, line));
                        }
                    }
                    Err(e) => {
                        warn!("error reading from serial port: {}", e);
                        fix.update(|state| state.set_unavailable("serial port read failed"));
                        break;
                    }
                }
            }
            info!("serial feed stopped");
        });
        self.set_task(task);

        Ok(())
    }

    async fn connect_gpsd(&self, host: &str, port: u16) -> Result<()> {
        info!("connecting to gpsd at {}:{}", host, port);

        let mut reader = gpsd::connect_gpsd(host, port).await?;

        let fix = self.fix.clone();
        let running = Arc::clone(&self.running);

        let task = tokio::spawn(async move {
            let mut line = String::new();

            while running.load(Ordering::Relaxed) {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let mut parsed = Ok(());
                        fix.update(|state| parsed = gpsd::parse_gpsd_json(state, line));
                        if let Err(e) = parsed {
                            warn!("error parsing gpsd JSON: {}", e);
                        }
                    }
                    Err(e) => {
                        warn!("error reading from gpsd: {}", e);
                        fix.update(|state| state.set_unavailable("gpsd connection lost"));
                        break;
                    }
                }
            }
            info!("gpsd feed stopped");
        });
        self.set_task(task);

        Ok(())
    }

    fn set_task(&self, task: JoinHandle<()>) {
        if let Ok(mut current) = self.task.lock() {
            if let Some(previous) = current.replace(task) {
                previous.abort();
            }
        }
    }

    /// Stop the reader task, even if it is waiting on a quiet link
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Ok(mut current) = self.task.lock() {
            if let Some(task) = current.take() {
                task.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for PositionFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Default for PositionFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| DriveLogError::Other(format!("Failed to list serial ports: {}", e)))?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::GeoSource;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_gpsd_feed_updates_fix() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"{\"class\":\"TPV\",\"mode\":3,\"lat\":48.117,\"lon\":11.517,\"speed\":7.5}\n")
                .await
                .unwrap();
            // Keep the connection open until the test is done
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let feed = PositionFeed::new();
        feed.start(FeedSource::Gpsd {
            host: "127.0.0.1".to_string(),
            port,
        })
        .await
        .unwrap();

        let fix = feed.fix();
        let mut speed = None;
        for _ in 0..50 {
            if let Some(s) = fix.current_speed().unwrap() {
                speed = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        feed.stop();

        assert_eq!(speed, Some(7.5));
        assert!(!feed.is_running());
    }

    #[tokio::test]
    async fn test_stop_releases_quiet_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let feed = PositionFeed::new();
        let (start, accepted) = tokio::join!(
            feed.start(FeedSource::Gpsd {
                host: "127.0.0.1".to_string(),
                port,
            }),
            listener.accept()
        );
        start.unwrap();
        let (socket, _) = accepted.unwrap();
        let mut socket = tokio::io::BufReader::new(socket);

        let mut watch = String::new();
        socket.read_line(&mut watch).await.unwrap();
        assert!(watch.starts_with("?WATCH"));

        // The server never sends anything; the reader sits in read_line
        feed.stop();

        let mut rest = String::new();
        let closed = tokio::time::timeout(Duration::from_secs(2), socket.read_line(&mut rest))
            .await
            .expect("reader task kept the connection open");
        assert_eq!(closed.unwrap(), 0);
        assert!(!feed.is_running());
    }

    #[tokio::test]
    async fn test_gpsd_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let feed = PositionFeed::new();
        let result = feed
            .start(FeedSource::Gpsd {
                host: "127.0.0.1".to_string(),
                port,
            })
            .await;
        assert!(matches!(result, Err(DriveLogError::Connection(_))));
    }
}
