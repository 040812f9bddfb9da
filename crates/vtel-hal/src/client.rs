//! Generic `VehicleClient` trait for vendor telemetry SDK bindings.

use std::sync::Arc;

use vtel_types::{ClientError, RawSignalEvent};

/// Callback a connected client invokes once per decoded sample.
///
/// Clients may call it from any thread, one sample at a time.
pub type SignalHandler = Arc<dyn Fn(RawSignalEvent) + Send + Sync>;

/// Binding to a vehicle telemetry SDK.
///
/// Implementations own SDK initialisation and the vehicle connection.  The
/// [`SignalHandler`] passed to [`connect`][Self::connect] is the only path by
/// which samples leave the client; [`disconnect`][Self::disconnect] and
/// [`terminate`][Self::terminate] must drop it.
pub trait VehicleClient: Send + Sync {
    /// Initialise the SDK.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the SDK cannot be brought up.
    fn initialize(&self) -> Result<(), ClientError>;

    /// Tear the SDK down, dropping any live connection.
    fn terminate(&self) -> Result<(), ClientError>;

    /// Connect to the vehicle and start feeding samples into `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the connection attempt fails.  A failed
    /// attempt may still leave the client connected; callers query
    /// [`is_connected`][Self::is_connected] for the live status.
    fn connect(&self, handler: SignalHandler) -> Result<(), ClientError>;

    /// Close the vehicle connection and stop delivering samples.
    fn disconnect(&self) -> Result<(), ClientError>;

    /// Live connection status as reported by the SDK.
    fn is_connected(&self) -> bool;
}
