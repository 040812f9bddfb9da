//! [`LifecycleManager`] – SDK and vehicle-connection state machine.
//!
//! ```text
//!                initialize_sdk ok
//! Uninitialized ─────────────────► Initialized ──connect_vehicle ok──► Connected
//!       ▲                                                               │    ▲
//!       │ deinitialize_sdk ok (from any state)        disconnect_vehicle│    │connect_vehicle ok
//!       │                                                               ▼    │
//!       └──────────────────────────────────────────────────────────── Disconnected
//!
//! deinitialize_sdk failing ──► TerminatedWithError
//! ```
//!
//! `initialize_sdk` only moves the state out of `Uninitialized` or
//! `TerminatedWithError`; calling it while `Connected` or `Disconnected`
//! leaves the connection state as it is.
//!
//! Entering `Connected` installs the [`IngestionPipeline`] as the client's
//! signal handler; `disconnect_vehicle` and `deinitialize_sdk` remove it.
//! An in-flight `publish` is never interrupted.
//!
//! # Failure contract
//!
//! Nothing here propagates an error.  Each operation has an `*_outcome`
//! form returning an [`Outcome`] (success flag plus the diagnostic, if any)
//! and a plain form matching the management surface (`bool` or `()`), which
//! logs the diagnostic and discards it.
//!
//! `connect_vehicle` reports the client's live connection status *after* the
//! attempt, not whether the attempt itself raised: a caller cannot tell
//! "was already connected" from "just connected".

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info};
use vtel_hal::{SignalHandler, VehicleClient};
use vtel_types::{ConnectionState, LifecycleError, RawSignalEvent};

use crate::pipeline::IngestionPipeline;

/// Result of a management operation: never an `Err`, always a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    /// The failure swallowed by the operation, if any.  May be present even
    /// when `success` is `true` (a connect that raised after linking up).
    pub diagnostic: Option<LifecycleError>,
}

impl Outcome {
    fn ok() -> Self {
        Self {
            success: true,
            diagnostic: None,
        }
    }

    fn failed(diagnostic: LifecycleError) -> Self {
        Self {
            success: false,
            diagnostic: Some(diagnostic),
        }
    }

    fn log(self) -> Self {
        if let Some(e) = &self.diagnostic {
            error!(error = %e, "vehicle lifecycle operation failed");
        }
        self
    }
}

/// Owns the SDK lifecycle and connection state for one vehicle client.
///
/// Built once by the application's composition root and shared by `Arc`.
pub struct LifecycleManager {
    client: Arc<dyn VehicleClient>,
    pipeline: Arc<IngestionPipeline>,
    state: Mutex<ConnectionState>,
}

impl LifecycleManager {
    pub fn new(client: Arc<dyn VehicleClient>, pipeline: Arc<IngestionPipeline>) -> Self {
        Self {
            client,
            pipeline,
            state: Mutex::new(ConnectionState::Uninitialized),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    pub fn pipeline(&self) -> &Arc<IngestionPipeline> {
        &self.pipeline
    }

    // ------------------------------------------------------------------
    // Management surface
    // ------------------------------------------------------------------

    /// Initialise the SDK.  Returns `false` on failure.
    pub fn initialize_sdk(&self) -> bool {
        self.initialize_sdk_outcome().log().success
    }

    /// Terminate the SDK, best effort.
    pub fn deinitialize_sdk(&self) {
        self.deinitialize_sdk_outcome().log();
    }

    /// Connect to the vehicle if not connected yet.  Returns the live
    /// connection status after the attempt.
    pub fn connect_vehicle(&self) -> bool {
        self.connect_vehicle_outcome().log().success
    }

    /// Disconnect from the vehicle if connected.
    pub fn disconnect_vehicle(&self) {
        self.disconnect_vehicle_outcome().log();
    }

    // ------------------------------------------------------------------
    // Explicit outcomes
    // ------------------------------------------------------------------

    pub fn initialize_sdk_outcome(&self) -> Outcome {
        let mut state = self.lock_state();
        match self.client.initialize() {
            Ok(()) => {
                // Re-initialising an SDK that already holds a vehicle link
                // does not drop the link or detach the pipeline.
                if matches!(
                    *state,
                    ConnectionState::Uninitialized | ConnectionState::TerminatedWithError
                ) {
                    *state = ConnectionState::Initialized;
                }
                info!(state = %*state, "vehicle SDK initialised");
                Outcome::ok()
            }
            Err(e) => Outcome::failed(LifecycleError::InitializationFailure(e)),
        }
    }

    pub fn deinitialize_sdk_outcome(&self) -> Outcome {
        let mut state = self.lock_state();
        match self.client.terminate() {
            Ok(()) => {
                *state = ConnectionState::Uninitialized;
                info!("vehicle SDK terminated");
                Outcome::ok()
            }
            Err(e) => {
                *state = ConnectionState::TerminatedWithError;
                Outcome::failed(LifecycleError::TerminationFailure(e))
            }
        }
    }

    pub fn connect_vehicle_outcome(&self) -> Outcome {
        let mut state = self.lock_state();
        let diagnostic = if self.client.is_connected() {
            None
        } else {
            match self.client.connect(self.handler()) {
                Ok(()) => {
                    *state = ConnectionState::Connected;
                    info!("vehicle connected; ingestion attached");
                    None
                }
                Err(e) => Some(LifecycleError::ConnectionFailure(e)),
            }
        };
        Outcome {
            success: self.client.is_connected(),
            diagnostic,
        }
    }

    pub fn disconnect_vehicle_outcome(&self) -> Outcome {
        let mut state = self.lock_state();
        if !self.client.is_connected() {
            return Outcome::ok();
        }
        match self.client.disconnect() {
            Ok(()) => {
                *state = ConnectionState::Disconnected;
                info!("vehicle disconnected; ingestion detached");
                Outcome::ok()
            }
            Err(e) => Outcome::failed(LifecycleError::DisconnectionFailure(e)),
        }
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn handler(&self) -> SignalHandler {
        let pipeline = Arc::clone(&self.pipeline);
        Arc::new(move |event: RawSignalEvent| {
            pipeline.on_raw_event(event);
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
