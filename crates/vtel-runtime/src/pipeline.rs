//! [`IngestionPipeline`] – validator and dispatcher composition.
//!
//! Every raw sample taken from the vehicle client goes through
//! [`IngestionPipeline::on_raw_event`]:
//!
//! ```text
//! RawSignalEvent ──► Validator ──┬─ accepted ──► Dispatcher::publish ──► subscribers
//!                                ├─ rejected ──► DiagnosticSink (one record)
//!                                └─ unknown topic ──► dropped (trace log only)
//! ```
//!
//! Rejected samples are never retried: each one is a point-in-time
//! measurement, and the next sample supersedes it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;
use vtel_kernel::Validator;
use vtel_middleware::{DiagnosticSink, Dispatcher, PublishReport};
use vtel_types::{DiagnosticRecord, RawSignalEvent, RejectReason};

/// What happened to one raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Validated and fanned out.
    Delivered(PublishReport),
    /// Failed its topic rule; a diagnostic record was emitted.
    Rejected(RejectReason),
    /// Unknown topic; dropped silently.
    Ignored,
}

/// Running totals of [`IngestOutcome`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
    pub ignored: u64,
}

/// Validates raw samples and fans accepted readings out.
pub struct IngestionPipeline {
    validator: Validator,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn DiagnosticSink>,
    accepted: AtomicU64,
    rejected: AtomicU64,
    ignored: AtomicU64,
}

impl IngestionPipeline {
    /// Build a pipeline using the default validation rules.
    pub fn new(dispatcher: Arc<Dispatcher>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self::with_validator(Validator::default(), dispatcher, sink)
    }

    pub fn with_validator(
        validator: Validator,
        dispatcher: Arc<Dispatcher>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            validator,
            dispatcher,
            sink,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    /// Handle one raw sample from the vehicle client.
    pub fn on_raw_event(&self, event: RawSignalEvent) -> IngestOutcome {
        match self.validator.validate(&event) {
            Ok(reading) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                IngestOutcome::Delivered(self.dispatcher.publish(reading))
            }
            Err(rejection) if rejection.reason.is_ignored() => {
                self.ignored.fetch_add(1, Ordering::Relaxed);
                trace!(topic = %event.topic, "ignoring sample on unknown topic");
                IngestOutcome::Ignored
            }
            Err(rejection) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                self.sink.record(DiagnosticRecord::from(&rejection));
                IngestOutcome::Rejected(rejection.reason)
            }
        }
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vtel_middleware::{MemorySink, VehicleDataSubscriber};
    use vtel_types::{SignalValue, SubscriberError, Topic, ValidityState, VehicleReading};

    #[derive(Default)]
    struct Recorder {
        readings: Mutex<Vec<VehicleReading>>,
    }

    impl Recorder {
        fn readings(&self) -> Vec<VehicleReading> {
            self.readings.lock().unwrap().clone()
        }
    }

    impl VehicleDataSubscriber for Recorder {
        fn on_vehicle_speed(&self, speed_kmh: f64) -> Result<(), SubscriberError> {
            self.readings.lock().unwrap().push(VehicleReading::Speed(speed_kmh));
            Ok(())
        }
        fn on_total_vehicle_distance(&self, distance: u64) -> Result<(), SubscriberError> {
            self.readings.lock().unwrap().push(VehicleReading::TotalDistance(distance));
            Ok(())
        }
        fn on_vehicle_distance_to_object(&self, distance: u64) -> Result<(), SubscriberError> {
            self.readings.lock().unwrap().push(VehicleReading::DistanceToObject(distance));
            Ok(())
        }
    }

    fn pipeline() -> (IngestionPipeline, Arc<Recorder>, Arc<Recorder>, Arc<MemorySink>) {
        let dispatcher = Arc::new(Dispatcher::new());
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        dispatcher.register(a.clone());
        dispatcher.register(b.clone());
        let sink = Arc::new(MemorySink::new());
        (IngestionPipeline::new(dispatcher, sink.clone()), a, b, sink)
    }

    #[test]
    fn valid_speed_reaches_every_subscriber_once() {
        let (pipeline, a, b, sink) = pipeline();

        let outcome =
            pipeline.on_raw_event(RawSignalEvent::float(Topic::Speed, 45.0, ValidityState::Valid));

        assert_eq!(
            outcome,
            IngestOutcome::Delivered(PublishReport { delivered: 2, failed: 0 })
        );
        assert_eq!(a.readings(), vec![VehicleReading::Speed(45.0)]);
        assert_eq!(b.readings(), vec![VehicleReading::Speed(45.0)]);
        assert!(sink.is_empty());
    }

    #[test]
    fn out_of_range_speed_logs_one_diagnostic_and_notifies_nobody() {
        let (pipeline, a, b, sink) = pipeline();

        let outcome =
            pipeline.on_raw_event(RawSignalEvent::float(Topic::Speed, 200.0, ValidityState::Valid));

        assert_eq!(outcome, IngestOutcome::Rejected(RejectReason::OutOfRangeOrInvalid));
        assert!(a.readings().is_empty());
        assert!(b.readings().is_empty());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, RejectReason::OutOfRangeOrInvalid);
        assert_eq!(records[0].topic, "vehicle.speed");
        assert_eq!(records[0].value, Some(SignalValue::from_f64(200.0)));
    }

    #[test]
    fn negative_total_distance_is_rejected() {
        let (pipeline, a, _, sink) = pipeline();

        let outcome = pipeline
            .on_raw_event(RawSignalEvent::integer(Topic::TotalDistance, -5, ValidityState::Valid));

        assert_eq!(outcome, IngestOutcome::Rejected(RejectReason::NegativeValue));
        assert!(a.readings().is_empty());
        assert_eq!(sink.records()[0].reason, RejectReason::NegativeValue);
    }

    #[test]
    fn unknown_topic_is_ignored_without_diagnostic() {
        let (pipeline, a, _, sink) = pipeline();

        let outcome = pipeline.on_raw_event(RawSignalEvent {
            topic: "vehicle.engine_temperature".to_string(),
            value: Some(SignalValue::from_f64(90.0)),
            validity: ValidityState::Valid,
        });

        assert_eq!(outcome, IngestOutcome::Ignored);
        assert!(a.readings().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn distances_are_delivered_as_integers() {
        let (pipeline, a, _, _) = pipeline();

        pipeline.on_raw_event(RawSignalEvent::integer(
            Topic::TotalDistance,
            98_765,
            ValidityState::Invalid,
        ));
        pipeline.on_raw_event(RawSignalEvent::float(
            Topic::DistanceToObject,
            3.9,
            ValidityState::Valid,
        ));

        assert_eq!(
            a.readings(),
            vec![
                VehicleReading::TotalDistance(98_765),
                VehicleReading::DistanceToObject(3)
            ]
        );
    }

    #[test]
    fn stats_count_each_outcome() {
        let (pipeline, _, _, _) = pipeline();

        pipeline.on_raw_event(RawSignalEvent::float(Topic::Speed, 10.0, ValidityState::Valid));
        pipeline.on_raw_event(RawSignalEvent::float(Topic::Speed, 10.0, ValidityState::Invalid));
        pipeline.on_raw_event(RawSignalEvent {
            topic: "unknown".to_string(),
            value: None,
            validity: ValidityState::Unknown,
        });
        pipeline.on_raw_event(RawSignalEvent {
            topic: Topic::TotalDistance.id().to_string(),
            value: None,
            validity: ValidityState::Valid,
        });

        assert_eq!(
            pipeline.stats(),
            IngestStats {
                accepted: 1,
                rejected: 2,
                ignored: 1
            }
        );
    }

    #[test]
    fn custom_validator_is_used() {
        let dispatcher = Arc::new(Dispatcher::new());
        let sink = Arc::new(MemorySink::new());
        let pipeline =
            IngestionPipeline::with_validator(Validator::new(80.0), dispatcher, sink.clone());

        let outcome =
            pipeline.on_raw_event(RawSignalEvent::float(Topic::Speed, 100.0, ValidityState::Valid));

        assert_eq!(outcome, IngestOutcome::Rejected(RejectReason::OutOfRangeOrInvalid));
        assert_eq!(pipeline.validator().max_speed_kmh(), 80.0);
    }
}
