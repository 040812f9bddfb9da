//! `vtel-middleware` – The fan-out layer
//!
//! Routes validated vehicle readings to every interested component without
//! caring what the components do with them.
//!
//! # Modules
//!
//! - [`dispatcher`] – synchronous, snapshot-based fan-out of
//!   [`VehicleReading`][vtel_types::VehicleReading]s to registered
//!   [`VehicleDataSubscriber`]s, isolating failing subscribers.
//! - [`bus`] – Tokio broadcast bridge so async consumers can await readings.
//! - [`diagnostics`] – sinks for rejected-sample diagnostic records.

pub mod bus;
pub mod diagnostics;
pub mod dispatcher;

pub use bus::{BusSubscriber, ReadingBus, ReadingReceiver};
pub use diagnostics::{DiagnosticSink, MemorySink, TracingSink};
pub use dispatcher::{Dispatcher, PublishReport, SubscriberHandle, VehicleDataSubscriber};
