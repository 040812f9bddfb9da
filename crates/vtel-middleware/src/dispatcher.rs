//! Typed, in-process fan-out of vehicle readings.
//!
//! The [`Dispatcher`] owns an ordered registry of [`VehicleDataSubscriber`]
//! handles and delivers every published [`VehicleReading`] to the matching
//! topic callback of each one.
//!
//! # Delivery rules
//!
//! | Rule | Behaviour |
//! |---|---|
//! | Order | Registration order, synchronously within [`Dispatcher::publish`]. |
//! | Snapshot | Each publish iterates a copy of the registry taken under the lock; changes made during delivery apply to the next publish. |
//! | Isolation | A callback returning `Err` or panicking is logged and skipped; later subscribers still receive the reading. |
//! | Duplicates | Registering the same handle twice yields two callbacks per reading. |
//!
//! Callbacks run without the registry lock held, so a subscriber may call
//! [`Dispatcher::register`] or [`Dispatcher::remove`] from inside a callback.
//! Callbacks must not block: there is no buffering, and a slow subscriber
//! delays every subscriber after it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};
use vtel_types::{SubscriberError, VehicleReading};

/// Capability interface implemented by every consumer of vehicle readings.
///
/// All callbacks default to a no-op so a subscriber only implements the
/// topics it cares about.
pub trait VehicleDataSubscriber: Send + Sync {
    /// Name used in log records.
    fn name(&self) -> &str {
        "subscriber"
    }

    /// Vehicle speed in km/h.
    fn on_vehicle_speed(&self, _speed_kmh: f64) -> Result<(), SubscriberError> {
        Ok(())
    }

    fn on_total_vehicle_distance(&self, _distance: u64) -> Result<(), SubscriberError> {
        Ok(())
    }

    fn on_vehicle_distance_to_object(&self, _distance: u64) -> Result<(), SubscriberError> {
        Ok(())
    }
}

/// Shared handle to a subscriber.  Identity is the `Arc` allocation.
pub type SubscriberHandle = Arc<dyn VehicleDataSubscriber>;

/// Per-publish delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Callbacks that returned `Ok`.
    pub delivered: usize,
    /// Callbacks that returned `Err` or panicked.
    pub failed: usize,
}

/// Subscriber registry and fan-out broadcaster.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vtel_middleware::{Dispatcher, SubscriberHandle, VehicleDataSubscriber};
/// use vtel_types::VehicleReading;
///
/// struct Dashboard;
/// impl VehicleDataSubscriber for Dashboard {}
///
/// let dispatcher = Dispatcher::new();
/// let dashboard: SubscriberHandle = Arc::new(Dashboard);
/// dispatcher.register(dashboard.clone());
///
/// let report = dispatcher.publish(VehicleReading::Speed(45.0));
/// assert_eq!(report.delivered, 1);
///
/// dispatcher.remove(&dashboard);
/// assert!(dispatcher.is_empty());
/// ```
#[derive(Default)]
pub struct Dispatcher {
    subscribers: Mutex<Vec<SubscriberHandle>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `subscriber` to the registry.  Duplicates are not filtered.
    pub fn register(&self, subscriber: SubscriberHandle) {
        debug!(subscriber = subscriber.name(), "registering subscriber");
        self.registry().push(subscriber);
    }

    /// Remove the first registration of `subscriber`.
    ///
    /// Returns `false` (and does nothing) when it is not registered.
    pub fn remove(&self, subscriber: &SubscriberHandle) -> bool {
        let mut registry = self.registry();
        match registry.iter().position(|s| Arc::ptr_eq(s, subscriber)) {
            Some(index) => {
                registry.remove(index);
                debug!(subscriber = subscriber.name(), "removed subscriber");
                true
            }
            None => false,
        }
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.registry().clear();
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    /// Deliver `reading` to every subscriber registered at call time.
    pub fn publish(&self, reading: VehicleReading) -> PublishReport {
        let snapshot: Vec<SubscriberHandle> = self.registry().clone();
        let mut report = PublishReport::default();

        for subscriber in &snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                deliver(subscriber.as_ref(), reading)
            }));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        subscriber = subscriber.name(),
                        topic = %reading.topic(),
                        error = %e,
                        "subscriber callback failed"
                    );
                }
                Err(panic_err) => {
                    report.failed += 1;
                    error!(
                        subscriber = subscriber.name(),
                        topic = %reading.topic(),
                        panic = %panic_message(panic_err.as_ref()),
                        "subscriber callback panicked"
                    );
                }
            }
        }
        report
    }

    // Callbacks never run while this guard is held, so poisoning can only
    // come from a panic inside Vec itself; the list is still usable then.
    fn registry(&self) -> MutexGuard<'_, Vec<SubscriberHandle>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn deliver(
    subscriber: &dyn VehicleDataSubscriber,
    reading: VehicleReading,
) -> Result<(), SubscriberError> {
    match reading {
        VehicleReading::Speed(speed) => subscriber.on_vehicle_speed(speed),
        VehicleReading::TotalDistance(distance) => subscriber.on_total_vehicle_distance(distance),
        VehicleReading::DistanceToObject(distance) => {
            subscriber.on_vehicle_distance_to_object(distance)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
