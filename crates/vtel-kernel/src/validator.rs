//! [`Validator`] – per-topic acceptance rules for raw vehicle samples.
//!
//! Every sample delivered by the vehicle client passes through
//! [`Validator::validate`] before it may reach a subscriber.  The rules are:
//!
//! | Topic | Accepted when | Delivered as | Rejection |
//! |---|---|---|---|
//! | [`Topic::Speed`] | `0 <= float <= max_speed` **and** validity is `Valid` | float view | `OutOfRangeOrInvalid` |
//! | [`Topic::TotalDistance`] | `integer >= 0` (validity ignored) | integer view | `NegativeValue` |
//! | [`Topic::DistanceToObject`] | `float >= 0` (validity ignored) | integer view | `NegativeValue` |
//!
//! A sample without a value is rejected with `MissingValue`; a sample on an
//! unknown topic is rejected with `UnknownTopic`, which callers treat as
//! "ignore".
//!
//! # Distance-to-object views
//!
//! `DistanceToObject` is checked on the float view but delivered as the
//! integer view.  The two views come from the client independently, so a
//! sample such as `{float: 0.2, integer: -1}` passes the check with a
//! negative integer; the delivered distance is clamped to `0` in that case.

use vtel_types::{RawSignalEvent, RejectReason, Rejection, Topic, ValidityState, VehicleReading};

/// Upper bound of a plausible vehicle speed in km/h.
pub const MAX_SPEED_KMH: f64 = 162.0;

/// Stateless rule set.  Only the speed ceiling is configurable.
///
/// # Example
///
/// ```
/// use vtel_kernel::Validator;
/// use vtel_types::{RawSignalEvent, Topic, ValidityState, VehicleReading};
///
/// let validator = Validator::default();
///
/// let ok = RawSignalEvent::float(Topic::Speed, 45.0, ValidityState::Valid);
/// assert_eq!(validator.validate(&ok), Ok(VehicleReading::Speed(45.0)));
///
/// let too_fast = RawSignalEvent::float(Topic::Speed, 200.0, ValidityState::Valid);
/// assert!(validator.validate(&too_fast).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validator {
    max_speed_kmh: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_speed_kmh: MAX_SPEED_KMH,
        }
    }
}

impl Validator {
    /// Build a validator with a custom speed ceiling in km/h.
    ///
    /// `max_speed_kmh` must be finite and non-negative; a NaN or negative
    /// ceiling would reject every speed sample.
    pub fn new(max_speed_kmh: f64) -> Self {
        debug_assert!(
            max_speed_kmh.is_finite() && max_speed_kmh >= 0.0,
            "speed ceiling must be finite and non-negative, got {max_speed_kmh}"
        );
        Self { max_speed_kmh }
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed_kmh
    }

    /// Map a raw sample to a typed reading, or explain why it was refused.
    pub fn validate(&self, event: &RawSignalEvent) -> Result<VehicleReading, Rejection> {
        let Some(topic) = Topic::from_id(&event.topic) else {
            return Err(Rejection::of(event, RejectReason::UnknownTopic));
        };
        let Some(value) = event.value else {
            return Err(Rejection::of(event, RejectReason::MissingValue));
        };

        match topic {
            Topic::Speed => {
                let speed = value.float;
                if (0.0..=self.max_speed_kmh).contains(&speed)
                    && event.validity == ValidityState::Valid
                {
                    Ok(VehicleReading::Speed(speed))
                } else {
                    Err(Rejection::of(event, RejectReason::OutOfRangeOrInvalid))
                }
            }
            Topic::TotalDistance => match u64::try_from(value.integer) {
                Ok(distance) => Ok(VehicleReading::TotalDistance(distance)),
                Err(_) => Err(Rejection::of(event, RejectReason::NegativeValue)),
            },
            Topic::DistanceToObject => {
                if value.float >= 0.0 {
                    let distance = u64::try_from(value.integer).unwrap_or(0);
                    Ok(VehicleReading::DistanceToObject(distance))
                } else {
                    Err(Rejection::of(event, RejectReason::NegativeValue))
                }
            }
        }
    }
}

/// Validate `event` with the default rule set.
pub fn validate(event: &RawSignalEvent) -> Result<VehicleReading, Rejection> {
    Validator::default().validate(event)
}
