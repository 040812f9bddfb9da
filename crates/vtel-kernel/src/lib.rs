//! `vtel-kernel` – Signal validation
//!
//! Decides which raw vehicle samples are trustworthy enough to be delivered
//! to subscribers.  It performs no I/O and holds no state between calls.
//!
//! # Modules
//!
//! - [`validator`] – [`Validator`][validator::Validator]: the per-topic
//!   numeric and validity rules that turn a
//!   [`RawSignalEvent`][vtel_types::RawSignalEvent] into a
//!   [`VehicleReading`][vtel_types::VehicleReading] or a
//!   [`Rejection`][vtel_types::Rejection].

pub mod validator;

pub use validator::{MAX_SPEED_KMH, Validator, validate};
