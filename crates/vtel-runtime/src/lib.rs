//! `vtel-runtime` – Ingestion and lifecycle
//!
//! Wires the validator, the dispatcher and a vehicle client into a running
//! telemetry engine.
//!
//! # Modules
//!
//! - [`pipeline`] – [`IngestionPipeline`][pipeline::IngestionPipeline]:
//!   validates each raw sample and either publishes the typed reading or
//!   records a diagnostic.
//! - [`lifecycle`] – [`LifecycleManager`][lifecycle::LifecycleManager]:
//!   SDK init/deinit and vehicle connect/disconnect, attaching the pipeline
//!   to the client while connected.  Failures never propagate; they surface
//!   as an [`Outcome`][lifecycle::Outcome] and a log record.
//! - [`telemetry`] – `tracing` subscriber and optional OTLP export.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vtel_hal::SimVehicleClient;
//! use vtel_middleware::{Dispatcher, TracingSink};
//! use vtel_runtime::{IngestionPipeline, LifecycleManager};
//! use vtel_types::{ConnectionState, RawSignalEvent, Topic, ValidityState};
//!
//! let client = Arc::new(SimVehicleClient::builder().build());
//! let dispatcher = Arc::new(Dispatcher::new());
//! let pipeline = Arc::new(IngestionPipeline::new(dispatcher, Arc::new(TracingSink::new())));
//! let manager = LifecycleManager::new(client.clone(), pipeline.clone());
//!
//! assert!(manager.initialize_sdk());
//! assert!(manager.connect_vehicle());
//! assert_eq!(manager.state(), ConnectionState::Connected);
//!
//! client.emit(RawSignalEvent::float(Topic::Speed, 45.0, ValidityState::Valid));
//! assert_eq!(pipeline.stats().accepted, 1);
//!
//! manager.disconnect_vehicle();
//! manager.deinitialize_sdk();
//! ```

pub mod lifecycle;
pub mod pipeline;
pub mod telemetry;

pub use lifecycle::{LifecycleManager, Outcome};
pub use pipeline::{IngestOutcome, IngestStats, IngestionPipeline};
