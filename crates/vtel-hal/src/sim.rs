//! In-process simulated vehicle client for tests and replays.
//!
//! [`SimVehicleClient`] behaves like an SDK binding that is always in range
//! of a vehicle: it tracks initialisation and connection state, keeps the
//! [`SignalHandler`] installed by `connect`, and lets the caller inject raw
//! samples with [`SimVehicleClient::emit`].  Failures of every management
//! call can be scripted through [`SimFaults`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use vtel_hal::{SimVehicleClient, VehicleClient};
//! use vtel_types::{RawSignalEvent, Topic, ValidityState};
//!
//! let client = SimVehicleClient::builder().build();
//! client.initialize().unwrap();
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! client
//!     .connect(Arc::new(move |_event: RawSignalEvent| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }))
//!     .unwrap();
//!
//! assert!(client.emit(RawSignalEvent::float(Topic::Speed, 50.0, ValidityState::Valid)));
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use vtel_types::{ClientError, RawSignalEvent};

use crate::client::{SignalHandler, VehicleClient};

/// Scripted failures for a [`SimVehicleClient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimFaults {
    pub initialize: bool,
    pub terminate: bool,
    pub connect: bool,
    pub disconnect: bool,
    /// When `connect` fails, leave the link up anyway (the SDK reported an
    /// error after the connection was established).
    pub link_despite_connect_error: bool,
}

#[derive(Default)]
struct SimState {
    initialized: bool,
    connected: bool,
    handler: Option<SignalHandler>,
    attach_count: usize,
}

/// Simulated [`VehicleClient`].
pub struct SimVehicleClient {
    faults: SimFaults,
    state: Mutex<SimState>,
}

impl SimVehicleClient {
    pub fn builder() -> SimVehicleClientBuilder {
        SimVehicleClientBuilder::default()
    }

    /// Feed `event` to the installed handler.
    ///
    /// Returns `false` when no handler is attached (client not connected).
    /// The handler runs without the client's internal lock held.
    pub fn emit(&self, event: RawSignalEvent) -> bool {
        let handler = self.state().handler.clone();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => {
                debug!(topic = %event.topic, "sim client dropped sample: no handler attached");
                false
            }
        }
    }

    /// Number of times a handler has been installed by `connect`.
    pub fn attach_count(&self) -> usize {
        self.state().attach_count
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn has_handler(&self) -> bool {
        self.state().handler.is_some()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VehicleClient for SimVehicleClient {
    fn initialize(&self) -> Result<(), ClientError> {
        if self.faults.initialize {
            return Err(ClientError::new("simulated SDK initialisation failure"));
        }
        self.state().initialized = true;
        Ok(())
    }

    fn terminate(&self) -> Result<(), ClientError> {
        let mut state = self.state();
        state.connected = false;
        state.handler = None;
        if self.faults.terminate {
            return Err(ClientError::new("simulated SDK termination failure"));
        }
        state.initialized = false;
        Ok(())
    }

    fn connect(&self, handler: SignalHandler) -> Result<(), ClientError> {
        let mut state = self.state();
        if !state.initialized {
            return Err(ClientError::new("SDK not initialised"));
        }
        if self.faults.connect {
            if self.faults.link_despite_connect_error {
                state.connected = true;
                state.handler = Some(handler);
                state.attach_count += 1;
            }
            return Err(ClientError::new("simulated vehicle connection failure"));
        }
        state.connected = true;
        state.handler = Some(handler);
        state.attach_count += 1;
        Ok(())
    }

    fn disconnect(&self) -> Result<(), ClientError> {
        if self.faults.disconnect {
            return Err(ClientError::new("simulated vehicle disconnection failure"));
        }
        let mut state = self.state();
        state.connected = false;
        state.handler = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}

/// Builder for [`SimVehicleClient`].
#[derive(Default)]
pub struct SimVehicleClientBuilder {
    faults: SimFaults,
    preconnected: bool,
}

impl SimVehicleClientBuilder {
    pub fn faults(mut self, faults: SimFaults) -> Self {
        self.faults = faults;
        self
    }

    pub fn fail_initialize(mut self) -> Self {
        self.faults.initialize = true;
        self
    }

    pub fn fail_terminate(mut self) -> Self {
        self.faults.terminate = true;
        self
    }

    pub fn fail_connect(mut self) -> Self {
        self.faults.connect = true;
        self
    }

    pub fn fail_disconnect(mut self) -> Self {
        self.faults.disconnect = true;
        self
    }

    /// Start initialised and already linked to the vehicle, with no handler
    /// attached (another owner connected the SDK).
    pub fn preconnected(mut self) -> Self {
        self.preconnected = true;
        self
    }

    pub fn build(self) -> SimVehicleClient {
        SimVehicleClient {
            faults: self.faults,
            state: Mutex::new(SimState {
                initialized: self.preconnected,
                connected: self.preconnected,
                ..SimState::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vtel_types::{Topic, ValidityState};

    fn counting_handler() -> (SignalHandler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handler: SignalHandler = Arc::new(move |_event: RawSignalEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (handler, count)
    }

    fn speed() -> RawSignalEvent {
        RawSignalEvent::float(Topic::Speed, 30.0, ValidityState::Valid)
    }

    #[test]
    fn connect_requires_initialisation() {
        let client = SimVehicleClient::builder().build();
        let (handler, _) = counting_handler();
        assert!(client.connect(handler).is_err());
        assert!(!client.is_connected());
    }

    #[test]
    fn emit_reaches_handler_only_while_connected() {
        let client = SimVehicleClient::builder().build();
        client.initialize().unwrap();
        let (handler, count) = counting_handler();

        assert!(!client.emit(speed()));
        client.connect(handler).unwrap();
        assert!(client.emit(speed()));
        client.disconnect().unwrap();
        assert!(!client.emit(speed()));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(client.attach_count(), 1);
    }

    #[test]
    fn terminate_drops_connection() {
        let client = SimVehicleClient::builder().build();
        client.initialize().unwrap();
        let (handler, _) = counting_handler();
        client.connect(handler).unwrap();

        client.terminate().unwrap();
        assert!(!client.is_connected());
        assert!(!client.is_initialized());
        assert!(!client.has_handler());
    }

    #[test]
    fn scripted_faults_surface_as_errors() {
        let client = SimVehicleClient::builder()
            .fail_initialize()
            .fail_terminate()
            .build();
        assert!(client.initialize().is_err());
        assert!(client.terminate().is_err());
    }

    #[test]
    fn link_despite_connect_error_leaves_client_connected() {
        let client = SimVehicleClient::builder()
            .faults(SimFaults {
                connect: true,
                link_despite_connect_error: true,
                ..SimFaults::default()
            })
            .build();
        client.initialize().unwrap();
        let (handler, _) = counting_handler();

        assert!(client.connect(handler).is_err());
        assert!(client.is_connected());
    }

    #[test]
    fn preconnected_client_has_no_handler() {
        let client = SimVehicleClient::builder().preconnected().build();
        assert!(client.is_connected());
        assert!(!client.has_handler());
        assert!(!client.emit(speed()));
    }
}
