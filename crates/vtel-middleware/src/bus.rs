//! Async bridge from the synchronous dispatcher to Tokio consumers.
//!
//! Register a [`BusSubscriber`] with the
//! [`Dispatcher`][crate::dispatcher::Dispatcher] and every reading it
//! receives is re-broadcast on a [`ReadingBus`] built on
//! [`tokio::sync::broadcast`].  Async tasks then `recv().await` readings
//! without implementing [`VehicleDataSubscriber`] themselves.
//!
//! The channel is bounded.  A receiver that falls behind loses the oldest
//! readings and resumes with the freshest ones; telemetry prefers freshness
//! over completeness.

use tokio::sync::broadcast;
use tracing::warn;
use vtel_types::{SubscriberError, Topic, VehicleReading};

use crate::dispatcher::VehicleDataSubscriber;

/// Default channel capacity (readings buffered per slow receiver).
const DEFAULT_CAPACITY: usize = 256;

/// Broadcast channel of validated readings.  Clones share the channel.
#[derive(Clone, Debug)]
pub struct ReadingBus {
    sender: broadcast::Sender<VehicleReading>,
}

impl ReadingBus {
    /// Create a bus buffering up to `capacity` readings per receiver.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (a Tokio broadcast requirement).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast `reading` to every live receiver.
    ///
    /// Returns the number of receivers handed the reading; `0` when nobody
    /// is listening (a normal condition, not an error).
    pub fn publish(&self, reading: VehicleReading) -> usize {
        self.sender.send(reading).unwrap_or(0)
    }

    /// Receive every reading published from now on.
    pub fn subscribe(&self) -> ReadingReceiver {
        ReadingReceiver {
            topic: None,
            receiver: self.sender.subscribe(),
        }
    }

    /// Receive only readings for `topic`.
    pub fn subscribe_topic(&self, topic: Topic) -> ReadingReceiver {
        ReadingReceiver {
            topic: Some(topic),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReadingBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Async receiving end of a [`ReadingBus`].
pub struct ReadingReceiver {
    topic: Option<Topic>,
    receiver: broadcast::Receiver<VehicleReading>,
}

impl ReadingReceiver {
    /// Wait for the next matching reading.
    ///
    /// Lagging is logged and skipped.  Returns `None` once every
    /// [`ReadingBus`] clone has been dropped.
    pub async fn recv(&mut self) -> Option<VehicleReading> {
        loop {
            match self.receiver.recv().await {
                Ok(reading) if self.topic.is_none_or(|t| t == reading.topic()) => {
                    return Some(reading);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "reading receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The topic filter, if any.
    pub fn topic(&self) -> Option<Topic> {
        self.topic
    }
}

/// Dispatcher subscriber that forwards every reading onto a [`ReadingBus`].
pub struct BusSubscriber {
    bus: ReadingBus,
}

impl BusSubscriber {
    pub fn new(bus: ReadingBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &ReadingBus {
        &self.bus
    }
}

impl VehicleDataSubscriber for BusSubscriber {
    fn name(&self) -> &str {
        "reading-bus"
    }

    fn on_vehicle_speed(&self, speed_kmh: f64) -> Result<(), SubscriberError> {
        self.bus.publish(VehicleReading::Speed(speed_kmh));
        Ok(())
    }

    fn on_total_vehicle_distance(&self, distance: u64) -> Result<(), SubscriberError> {
        self.bus.publish(VehicleReading::TotalDistance(distance));
        Ok(())
    }

    fn on_vehicle_distance_to_object(&self, distance: u64) -> Result<(), SubscriberError> {
        self.bus.publish(VehicleReading::DistanceToObject(distance));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = ReadingBus::default();
        assert_eq!(bus.publish(VehicleReading::Speed(10.0)), 0);
    }

    #[tokio::test]
    async fn multiple_receivers_get_same_reading() {
        let bus = ReadingBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(VehicleReading::TotalDistance(42)), 2);

        assert_eq!(rx1.recv().await, Some(VehicleReading::TotalDistance(42)));
        assert_eq!(rx2.recv().await, Some(VehicleReading::TotalDistance(42)));
    }

    #[tokio::test]
    async fn topic_receiver_skips_other_topics() {
        let bus = ReadingBus::default();
        let mut speed_rx = bus.subscribe_topic(Topic::Speed);

        bus.publish(VehicleReading::DistanceToObject(3));
        bus.publish(VehicleReading::Speed(88.0));

        assert_eq!(speed_rx.recv().await, Some(VehicleReading::Speed(88.0)));
        assert_eq!(speed_rx.topic(), Some(Topic::Speed));
    }

    #[tokio::test]
    async fn topic_receiver_does_not_see_unrelated_readings() {
        let bus = ReadingBus::default();
        let mut distance_rx = bus.subscribe_topic(Topic::TotalDistance);

        bus.publish(VehicleReading::Speed(50.0));

        let result = tokio::time::timeout(Duration::from_millis(50), distance_rx.recv()).await;
        assert!(result.is_err(), "TotalDistance receiver must not see a speed reading");
    }

    #[tokio::test]
    async fn lagging_receiver_resumes_with_fresh_readings() {
        let bus = ReadingBus::new(4);
        let mut slow = bus.subscribe();

        for i in 0..100 {
            bus.publish(VehicleReading::TotalDistance(i));
        }

        // Oldest readings were dropped; the receiver resumes inside the last window.
        match slow.recv().await {
            Some(VehicleReading::TotalDistance(n)) => assert!(n >= 96, "got stale reading {n}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn receiver_ends_when_bus_dropped() {
        let bus = ReadingBus::default();
        let mut rx = bus.subscribe();
        drop(bus);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn bus_subscriber_bridges_dispatcher_to_receivers() {
        let bus = ReadingBus::default();
        let mut rx = bus.subscribe();
        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(BusSubscriber::new(bus.clone())));

        dispatcher.publish(VehicleReading::Speed(61.5));
        dispatcher.publish(VehicleReading::DistanceToObject(9));

        assert_eq!(rx.recv().await, Some(VehicleReading::Speed(61.5)));
        assert_eq!(rx.recv().await, Some(VehicleReading::DistanceToObject(9)));
    }
}
