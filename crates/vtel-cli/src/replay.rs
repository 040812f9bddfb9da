//! Feed replay – drives recorded samples through a simulated vehicle client.
//!
//! A feed is a JSON-lines file, one [`RawSignalEvent`] per line:
//!
//! ```text
//! # comment lines and blank lines are skipped
//! {"topic": "vehicle.speed", "value": 45.0, "validity": "valid"}
//! {"topic": "vehicle.total_distance", "value": 98765}
//! {"topic": "vehicle.distance_to_object", "value": {"float": 3.5, "integer": 3}}
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, info};
use vtel_hal::SimVehicleClient;
use vtel_middleware::{ReadingReceiver, VehicleDataSubscriber};
use vtel_types::{RawSignalEvent, SubscriberError, VehicleReading};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to read feed {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed sample on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse the feed at `path`.
pub fn load_feed(path: &Path) -> Result<Vec<RawSignalEvent>, FeedError> {
    let raw = fs::read_to_string(path).map_err(|source| FeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_feed(&raw)
}

/// Parse JSON-lines feed text.  Line numbers in errors are 1-based.
pub fn parse_feed(raw: &str) -> Result<Vec<RawSignalEvent>, FeedError> {
    raw.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| {
            serde_json::from_str(text).map_err(|source| FeedError::Parse { line, source })
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Replay loop
// ────────────────────────────────────────────────────────────────────────────

/// Counts from one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayProgress {
    /// Samples handed to the client's signal handler.
    pub emitted: usize,
    /// Samples the client dropped because no handler was attached.
    pub dropped: usize,
    /// `true` when the run stopped early on the shutdown flag.
    pub interrupted: bool,
}

/// Emit `events` through `client`, pausing `interval` between samples.
///
/// Checks `shutdown` before every sample and stops as soon as it is set.
pub async fn replay_feed(
    client: &SimVehicleClient,
    events: &[RawSignalEvent],
    interval: Duration,
    shutdown: &AtomicBool,
) -> ReplayProgress {
    let mut progress = ReplayProgress::default();
    for (i, event) in events.iter().enumerate() {
        if shutdown.load(Ordering::SeqCst) {
            info!(remaining = events.len() - i, "replay interrupted");
            progress.interrupted = true;
            break;
        }
        if i > 0 && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
        if client.emit(event.clone()) {
            progress.emitted += 1;
        } else {
            progress.dropped += 1;
        }
    }
    debug!(?progress, "replay finished");
    progress
}

// ────────────────────────────────────────────────────────────────────────────
// Speed summary
// ────────────────────────────────────────────────────────────────────────────

/// Aggregate of the speed readings seen on the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedSummary {
    pub samples: u64,
    pub min_kmh: f64,
    pub max_kmh: f64,
    pub mean_kmh: f64,
}

impl SpeedSummary {
    fn add(&mut self, speed_kmh: f64) {
        if self.samples == 0 {
            self.min_kmh = speed_kmh;
            self.max_kmh = speed_kmh;
        } else {
            self.min_kmh = self.min_kmh.min(speed_kmh);
            self.max_kmh = self.max_kmh.max(speed_kmh);
        }
        self.samples += 1;
        self.mean_kmh += (speed_kmh - self.mean_kmh) / self.samples as f64;
    }
}

/// Consume speed readings from `receiver` until its bus closes.
pub async fn track_speed(mut receiver: ReadingReceiver) -> SpeedSummary {
    let mut summary = SpeedSummary::default();
    while let Some(reading) = receiver.recv().await {
        if let VehicleReading::Speed(kmh) = reading {
            summary.add(kmh);
        }
    }
    summary
}

// ────────────────────────────────────────────────────────────────────────────
// Console output
// ────────────────────────────────────────────────────────────────────────────

/// Prints every delivered reading to stdout.
pub struct ConsoleSubscriber;

impl VehicleDataSubscriber for ConsoleSubscriber {
    fn name(&self) -> &str {
        "console"
    }

    fn on_vehicle_speed(&self, speed_kmh: f64) -> Result<(), SubscriberError> {
        println!("  {} {:>8.1} km/h", "speed".cyan().bold(), speed_kmh);
        Ok(())
    }

    fn on_total_vehicle_distance(&self, distance: u64) -> Result<(), SubscriberError> {
        println!("  {} {:>8}", "odometer".cyan().bold(), distance);
        Ok(())
    }

    fn on_vehicle_distance_to_object(&self, distance: u64) -> Result<(), SubscriberError> {
        println!("  {} {:>8}", "object".cyan().bold(), distance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vtel_hal::{SignalHandler, VehicleClient};
    use vtel_middleware::ReadingBus;
    use vtel_types::{SignalValue, Topic, ValidityState};

    #[test]
    fn parse_feed_skips_comments_and_blank_lines() {
        let raw = r#"
# recorded on the test track
{"topic": "vehicle.speed", "value": 45.0, "validity": "valid"}

{"topic": "vehicle.total_distance", "value": 98765}
{"topic": "vehicle.distance_to_object", "value": {"float": 3.5, "integer": 4}, "validity": "invalid"}
"#;
        let events = parse_feed(raw).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            RawSignalEvent::float(Topic::Speed, 45.0, ValidityState::Valid)
        );
        assert_eq!(events[1].value, Some(SignalValue::from_i64(98_765)));
        assert_eq!(events[1].validity, ValidityState::Unknown);
        assert_eq!(events[2].value, Some(SignalValue::with_views(3.5, 4)));
    }

    #[test]
    fn parse_feed_keeps_missing_values() {
        let events = parse_feed(r#"{"topic": "vehicle.speed"}"#).unwrap();
        assert_eq!(events[0].value, None);
    }

    #[test]
    fn parse_error_reports_line_number() {
        let raw = "{\"topic\": \"vehicle.speed\", \"value\": 1.0}\n\nnot json\n";
        match parse_feed(raw) {
            Err(FeedError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_feed_reads_file_and_reports_missing_path() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("feed.jsonl");
        fs::write(&path, "{\"topic\": \"vehicle.speed\", \"value\": 12.0}\n").unwrap();

        assert_eq!(load_feed(&path).unwrap().len(), 1);
        assert!(matches!(
            load_feed(&dir.path().join("absent.jsonl")),
            Err(FeedError::Read { .. })
        ));
    }

    #[test]
    fn speed_summary_tracks_extremes_and_mean() {
        let mut summary = SpeedSummary::default();
        for kmh in [40.0, 60.0, 50.0] {
            summary.add(kmh);
        }
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.min_kmh, 40.0);
        assert_eq!(summary.max_kmh, 60.0);
        assert!((summary.mean_kmh - 50.0).abs() < 1e-9);
    }

    fn connected_client() -> (SimVehicleClient, Arc<std::sync::atomic::AtomicUsize>) {
        let client = SimVehicleClient::builder().build();
        client.initialize().unwrap();
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = seen.clone();
        let handler: SignalHandler = Arc::new(move |_event: RawSignalEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        client.connect(handler).unwrap();
        (client, seen)
    }

    #[tokio::test]
    async fn replay_emits_every_sample() {
        let (client, seen) = connected_client();
        let events = vec![RawSignalEvent::float(Topic::Speed, 10.0, ValidityState::Valid); 4];
        let shutdown = AtomicBool::new(false);

        let progress = replay_feed(&client, &events, Duration::ZERO, &shutdown).await;

        assert_eq!(
            progress,
            ReplayProgress {
                emitted: 4,
                dropped: 0,
                interrupted: false
            }
        );
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn replay_stops_on_shutdown_flag() {
        let (client, seen) = connected_client();
        let events = vec![RawSignalEvent::float(Topic::Speed, 10.0, ValidityState::Valid); 4];
        let shutdown = AtomicBool::new(true);

        let progress = replay_feed(&client, &events, Duration::ZERO, &shutdown).await;

        assert!(progress.interrupted);
        assert_eq!(progress.emitted, 0);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn replay_counts_samples_dropped_while_disconnected() {
        let client = SimVehicleClient::builder().build();
        let events = vec![RawSignalEvent::float(Topic::Speed, 10.0, ValidityState::Valid); 2];
        let shutdown = AtomicBool::new(false);

        let progress = replay_feed(&client, &events, Duration::ZERO, &shutdown).await;

        assert_eq!(progress.emitted, 0);
        assert_eq!(progress.dropped, 2);
    }

    #[tokio::test]
    async fn track_speed_ends_when_bus_is_dropped() {
        let bus = ReadingBus::new(16);
        let task = tokio::spawn(track_speed(bus.subscribe_topic(Topic::Speed)));

        bus.publish(VehicleReading::Speed(30.0));
        bus.publish(VehicleReading::TotalDistance(5));
        bus.publish(VehicleReading::Speed(50.0));
        drop(bus);

        let summary = task.await.unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.max_kmh, 50.0);
        assert!((summary.mean_kmh - 40.0).abs() < 1e-9);
    }
}
