use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of vehicle signal kinds the engine understands.
///
/// Each variant maps to a stable wire identifier used by the vehicle client.
/// Identifiers outside this set are ignored, never treated as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Vehicle speed in km/h.
    Speed,
    /// Total distance travelled by the vehicle (odometer).
    TotalDistance,
    /// Distance to the object ahead of the vehicle.
    DistanceToObject,
}

impl Topic {
    /// Every topic, in subscription order.
    pub const ALL: [Topic; 3] = [Topic::Speed, Topic::TotalDistance, Topic::DistanceToObject];

    /// Wire identifier reported by the vehicle client for this topic.
    pub fn id(self) -> &'static str {
        match self {
            Topic::Speed => "vehicle.speed",
            Topic::TotalDistance => "vehicle.total_distance",
            Topic::DistanceToObject => "vehicle.distance_to_object",
        }
    }

    /// Resolve a wire identifier.  Returns `None` for unknown topics.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.id() == id)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Confidence flag the vehicle client attaches to every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidityState {
    Valid,
    Invalid,
    #[default]
    Unknown,
}

impl fmt::Display for ValidityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidityState::Valid => f.write_str("VALID"),
            ValidityState::Invalid => f.write_str("INVALID"),
            ValidityState::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// The float and integer views of one raw sample.
///
/// The vehicle client exposes both views independently, so they are not
/// guaranteed to agree.  [`SignalValue::from_f64`] derives the integer view
/// by truncating toward zero (saturating at the `i64` bounds, NaN → 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SignalValueRepr")]
pub struct SignalValue {
    pub float: f64,
    pub integer: i64,
}

impl SignalValue {
    pub fn from_f64(value: f64) -> Self {
        Self {
            float: value,
            integer: value as i64,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        Self {
            float: value as f64,
            integer: value,
        }
    }

    /// Build a value whose views were reported separately by the client.
    pub fn with_views(float: f64, integer: i64) -> Self {
        Self { float, integer }
    }
}

// Feeds may carry either a bare number or both views explicitly.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignalValueRepr {
    Views { float: f64, integer: i64 },
    // Tried before `Number` so odometer values beyond 2^53 keep every digit.
    Integer(i64),
    Number(f64),
}

impl From<SignalValueRepr> for SignalValue {
    fn from(repr: SignalValueRepr) -> Self {
        match repr {
            SignalValueRepr::Views { float, integer } => SignalValue::with_views(float, integer),
            SignalValueRepr::Integer(value) => SignalValue::from_i64(value),
            SignalValueRepr::Number(value) => SignalValue::from_f64(value),
        }
    }
}

/// One decoded message as delivered by the vehicle client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSignalEvent {
    /// Wire identifier, e.g. `"vehicle.speed"`.
    pub topic: String,
    /// `None` when the client delivered a message without a value.
    #[serde(default)]
    pub value: Option<SignalValue>,
    #[serde(default)]
    pub validity: ValidityState,
}

impl RawSignalEvent {
    pub fn new(topic: Topic, value: SignalValue, validity: ValidityState) -> Self {
        Self {
            topic: topic.id().to_string(),
            value: Some(value),
            validity,
        }
    }

    /// Convenience constructor for a float sample on a known topic.
    pub fn float(topic: Topic, value: f64, validity: ValidityState) -> Self {
        Self::new(topic, SignalValue::from_f64(value), validity)
    }

    /// Convenience constructor for an integer sample on a known topic.
    pub fn integer(topic: Topic, value: i64, validity: ValidityState) -> Self {
        Self::new(topic, SignalValue::from_i64(value), validity)
    }
}

/// A validated, topic-typed value ready for delivery to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "value", rename_all = "snake_case")]
pub enum VehicleReading {
    /// km/h, within `[0, max_speed]`.
    Speed(f64),
    TotalDistance(u64),
    DistanceToObject(u64),
}

impl VehicleReading {
    pub fn topic(&self) -> Topic {
        match self {
            VehicleReading::Speed(_) => Topic::Speed,
            VehicleReading::TotalDistance(_) => Topic::TotalDistance,
            VehicleReading::DistanceToObject(_) => Topic::DistanceToObject,
        }
    }
}

/// Why a raw sample was not turned into a [`VehicleReading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Speed outside `[0, max]` or not flagged valid.
    OutOfRangeOrInvalid,
    NegativeValue,
    /// The message carried no value at all.
    MissingValue,
    /// The topic is not one the engine understands.  Ignored, not logged.
    UnknownTopic,
}

impl RejectReason {
    /// Ignored samples are dropped silently rather than reported.
    pub fn is_ignored(self) -> bool {
        matches!(self, RejectReason::UnknownTopic)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::OutOfRangeOrInvalid => "out of range or invalid",
            RejectReason::NegativeValue => "negative value",
            RejectReason::MissingValue => "missing value",
            RejectReason::UnknownTopic => "unknown topic",
        };
        f.write_str(s)
    }
}

/// A sample that failed its topic rule, with everything needed to log it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("rejected {topic} sample ({reason}): value={value:?} validity={validity}")]
pub struct Rejection {
    pub topic: String,
    pub reason: RejectReason,
    pub value: Option<SignalValue>,
    pub validity: ValidityState,
}

impl Rejection {
    pub fn of(event: &RawSignalEvent, reason: RejectReason) -> Self {
        Self {
            topic: event.topic.clone(),
            reason,
            value: event.value,
            validity: event.validity,
        }
    }
}

/// Diagnostic record emitted for every rejected (non-ignored) sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub reason: RejectReason,
    pub value: Option<SignalValue>,
    pub validity: ValidityState,
}

impl From<&Rejection> for DiagnosticRecord {
    fn from(rejection: &Rejection) -> Self {
        Self {
            timestamp: Utc::now(),
            topic: rejection.topic.clone(),
            reason: rejection.reason,
            value: rejection.value,
            validity: rejection.validity,
        }
    }
}

/// Connection lifecycle of the vehicle client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Uninitialized,
    Initialized,
    Connected,
    Disconnected,
    /// The SDK failed to terminate cleanly.
    TerminatedWithError,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Initialized => "initialized",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::TerminatedWithError => "terminated-with-error",
        };
        f.write_str(s)
    }
}

/// Failure reported by a vehicle client implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("vehicle client error: {0}")]
pub struct ClientError(pub String);

impl ClientError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure of a management-surface operation.  Never propagated past the
/// lifecycle manager's boolean API; surfaced only through its `Outcome`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Initialization of the SDK has failed: {0}")]
    InitializationFailure(#[source] ClientError),

    #[error("Termination of SDK failed: {0}")]
    TerminationFailure(#[source] ClientError),

    #[error("Connect VehicleClient failed: {0}")]
    ConnectionFailure(#[source] ClientError),

    #[error("Disconnect VehicleClient failed: {0}")]
    DisconnectionFailure(#[source] ClientError),
}

/// Error a subscriber may return from one of its callbacks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("subscriber callback failed: {0}")]
pub struct SubscriberError(pub String);

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
