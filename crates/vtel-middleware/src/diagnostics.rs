//! Sinks for rejected-sample diagnostics.
//!
//! The ingestion pipeline hands one [`DiagnosticRecord`] to its
//! [`DiagnosticSink`] for every sample that failed validation.  Two sinks are
//! provided:
//!
//! - [`TracingSink`] – logs each record through `tracing`, optionally
//!   rate-limited so a misbehaving sensor cannot flood the log.
//! - [`MemorySink`] – keeps records in memory; useful for tests and for
//!   embedding applications that surface diagnostics themselves.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::info;
use vtel_types::DiagnosticRecord;

/// Observability collaborator receiving rejected-sample records.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: DiagnosticRecord);
}

/// Logs diagnostic records at `info` level.
#[derive(Default)]
pub struct TracingSink {
    limiter: Option<DefaultDirectRateLimiter>,
    suppressed: AtomicU64,
}

impl TracingSink {
    /// A sink that logs every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that logs at most `max_per_second` records per second and
    /// counts the rest.
    pub fn rate_limited(max_per_second: NonZeroU32) -> Self {
        Self {
            limiter: Some(RateLimiter::direct(Quota::per_second(max_per_second))),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Number of records dropped by the rate limiter so far.
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }
}

impl DiagnosticSink for TracingSink {
    fn record(&self, record: DiagnosticRecord) {
        if let Some(limiter) = &self.limiter
            && limiter.check().is_err()
        {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return;
        }
        info!(
            topic = %record.topic,
            reason = %record.reason,
            value = ?record.value,
            validity = %record.validity,
            "rejected vehicle sample"
        );
    }
}

/// Collects diagnostic records in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record received so far, oldest first.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, record: DiagnosticRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtel_types::{RawSignalEvent, RejectReason, Rejection, Topic, ValidityState};

    fn record(value: f64) -> DiagnosticRecord {
        let event = RawSignalEvent::float(Topic::Speed, value, ValidityState::Valid);
        DiagnosticRecord::from(&Rejection::of(&event, RejectReason::OutOfRangeOrInvalid))
    }

    #[test]
    fn memory_sink_keeps_records_in_order() {
        let sink = MemorySink::new();
        sink.record(record(200.0));
        sink.record(record(-1.0));

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value.map(|v| v.float), Some(200.0));
        assert_eq!(records[1].value.map(|v| v.float), Some(-1.0));
    }

    #[test]
    fn unlimited_tracing_sink_never_suppresses() {
        let sink = TracingSink::new();
        for _ in 0..100 {
            sink.record(record(300.0));
        }
        assert_eq!(sink.suppressed(), 0);
    }

    #[test]
    fn rate_limited_tracing_sink_suppresses_bursts() {
        let sink = TracingSink::rate_limited(NonZeroU32::new(1).unwrap());
        for _ in 0..10 {
            sink.record(record(300.0));
        }
        // One record fits the quota; a burst of ten cannot all pass within a second.
        assert!(sink.suppressed() >= 8, "suppressed {}", sink.suppressed());
    }
}
