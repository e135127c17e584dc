//! Control Rusclimate air purifiers through a percentage-based fan interface.
//!
//! # Overview
//!
//! The `rusclimate` crate translates between controllers that express fan speed
//! as a rotation speed percentage (`0..=100`) and Rusclimate devices, which
//! offer eight discrete speed steps (`0..=7`) and a separate Turbo mode.
//! It also derives the purifier's operational state (inactive, idle or
//! purifying) from the reported device mode and speed.
//!
//! Depending on your needs, you can:
//!
//! - Use the [`convert`] functions for stateless percentage and step conversions.
//! - Drive a [`Codec`] directly from your own event loop.
//! - Spawn an [`actor`] task that owns the codec and takes care of the Turbo
//!   reconciliation deadline.
//!
//! # Device protocol
//!
//! The device is controlled through two topics:
//!
//! - **Mode:** `0` switches the device off, `1` to `5` select a running mode,
//!   `4` is Turbo.
//! - **Speed:** the speed step `0..=7`, only meaningful outside of Turbo.
//!
//! Setting a rotation speed of 100 % requests Turbo mode. Any other percentage
//! selects mode `1` and the nearest speed step, in units of 12.5 %.
//! While the device is in Turbo mode, 100 % is reported regardless of the
//! speed step.
//!
//! Some firmware versions accept the Turbo command without entering Turbo mode.
//! If Turbo is not reported within the reconciliation delay (one second by
//! default), the codec pushes the speed derived from the actual device state
//! back to the controller.
//!
//! # Examples
//!
//! ```
//! use rusclimate::{Codec, Config, Property, Transport, Value};
//!
//! #[derive(Default)]
//! struct Log(Vec<String>);
//!
//! impl Transport for Log {
//!     fn publish(&mut self, topic: &str, payload: &str) {
//!         self.0.push(format!("{topic} <- {payload}"));
//!     }
//!
//!     fn notify(&mut self, prop: Property, val: Value) {
//!         self.0.push(format!("{prop} = {val}"));
//!     }
//! }
//!
//! let cfg = Config::from_json(
//!     r#"{"topics": {"setActive": "control/mode", "setRotationSpeed": "control/speed"}}"#,
//! )?;
//! let mut codec = Codec::new(&cfg, Log::default());
//!
//! codec.encode(Property::RotationSpeed, &Value::from(37u8));
//!
//! assert_eq!(codec.transport().0, ["control/mode <- 1", "control/speed <- 3"]);
//! # Ok::<(), rusclimate::Error>(())
//! ```

#![warn(missing_docs)]

pub mod actor;
pub mod codec;
pub mod config;
pub mod convert;
pub mod property;
pub mod reconcile;

pub use codec::{Codec, Transport};
pub use config::{Config, Topics};
pub use property::{CurrentState, DeviceMode, Property, Value};

use core::fmt::{Display, Formatter};

/// A specialized [`Result`] type for fallible operations of this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Error type for fallible operations of this crate.
///
/// The codec itself never fails. Errors only occur when loading the
/// configuration or when talking to a stopped [`actor`].
///
/// This enum is marked `#[non_exhaustive]` to allow for future variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// The configuration file could not be read.
    Io(std::io::Error),
    /// The configuration is not valid JSON.
    Config(serde_json::Error),
    /// The actor task has stopped.
    ActorStopped,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "input/output error: {err}"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::ActorStopped => write!(f, "actor stopped"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::ActorStopped => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err)
    }
}
