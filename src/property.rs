//! Controller-facing properties and the values exchanged for them.

use crate::convert;
use core::fmt::{Display, Formatter};
use strum::{EnumString, FromRepr, IntoStaticStr};

/// A controller-facing property handled by the codec.
///
/// The string representation matches the property names used by the host,
/// e.g. `rotationSpeed`.
#[derive(strum::Display, EnumString, IntoStaticStr, PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[strum(serialize_all = "camelCase")]
pub enum Property {
    /// Whether the device is switched on.
    Active,
    /// Rotation speed in percent.
    RotationSpeed,
    /// Derived operational state, see [`CurrentState`].
    CurrentAirPurifierState,
}

/// Operational state derived from the device mode and speed step.
#[derive(FromRepr, strum::Display, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum CurrentState {
    /// Device is switched off.
    Inactive = 0,
    /// Device is running with speed step 0.
    Idle = 1,
    /// Device is moving air.
    Purifying = 2,
}

/// Top-level operating mode reported by the device.
///
/// Known values are `0` (off), `1` to `5` (running sub-modes) and `4` (Turbo).
/// Other values are kept as reported.
#[derive(PartialEq, Copy, Clone, Debug)]
pub struct DeviceMode(f64);

impl DeviceMode {
    /// Device is switched off.
    pub const OFF: Self = Self(0.0);
    /// Regular running mode, used when setting a speed step.
    pub const NORMAL: Self = Self(1.0);
    /// Turbo mode.
    pub const TURBO: Self = Self(4.0);

    /// Parses a raw mode payload.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        convert::parse_number(raw).map(Self)
    }

    /// Returns the numeric mode value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` if the device is switched off.
    #[must_use]
    pub fn is_off(self) -> bool {
        self == Self::OFF
    }

    /// Returns `true` if the device is in Turbo mode.
    #[must_use]
    pub fn is_turbo(self) -> bool {
        self == Self::TURBO
    }

    /// Returns `true` for the running sub-modes `1` to `5`.
    #[must_use]
    pub fn is_submode(self) -> bool {
        (1.0..=5.0).contains(&self.0)
    }
}

impl From<u8> for DeviceMode {
    fn from(val: u8) -> Self {
        Self(val.into())
    }
}

impl Display for DeviceMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value passed to or returned from the codec.
#[derive(PartialEq, Clone, Debug)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Number value.
    Number(f64),
    /// Textual value, e.g. a raw payload.
    Text(String),
    /// Operational state.
    State(CurrentState),
}

impl Value {
    /// Interprets the value as a number.
    ///
    /// Booleans map to `1` and `0`, text is parsed with
    /// [`parse_number`](convert::parse_number).
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(val) => Some(if *val { 1.0 } else { 0.0 }),
            Self::Number(num) if !num.is_nan() => Some(*num),
            Self::Number(_) => None,
            Self::Text(text) => convert::parse_number(text),
            Self::State(state) => Some(f64::from(*state as u8)),
        }
    }

    /// Returns whether the value counts as switched on.
    ///
    /// Zero, `NaN`, `false` and empty text are off, everything else is on.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(val) => *val,
            Self::Number(num) => *num != 0.0 && !num.is_nan(),
            Self::Text(text) => !text.is_empty(),
            Self::State(_) => true,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bool(val) => write!(f, "{val}"),
            Self::Number(num) => write!(f, "{num}"),
            Self::Text(text) => write!(f, "{text}"),
            Self::State(state) => write!(f, "{}", *state as u8),
        }
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Self::Bool(val)
    }
}

impl From<u8> for Value {
    fn from(val: u8) -> Self {
        Self::Number(val.into())
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Self::Number(val)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<CurrentState> for Value {
    fn from(state: CurrentState) -> Self {
        Self::State(state)
    }
}
