//! Codec configuration.
//!
//! The configuration uses the host's accessory format, for example:
//!
//! ```json
//! {
//!     "topics": {
//!         "setActive": "rusclimate/control/mode",
//!         "getActive": "rusclimate/state/mode",
//!         "setRotationSpeed": "rusclimate/control/speed",
//!         "getRotationSpeed": "rusclimate/state/speed"
//!     },
//!     "turboReconcileMs": 1500
//! }
//! ```
//!
//! Every topic is optional. Publishing to a missing topic is skipped.
//! Unknown keys are ignored.

use crate::{Result, convert, reconcile::DEFAULT_DELAY};
use core::time::Duration;
use serde::{Deserialize, Deserializer};
use std::{fs, path::Path};

/// Topic names used by a single device.
#[derive(Deserialize, Default, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct Topics {
    /// Topic for setting the device mode (e.g. `control/mode`).
    pub set_active: Option<String>,
    /// Topic on which the device reports its mode (e.g. `state/mode`).
    pub get_active: Option<String>,
    /// Topic for setting the speed step (e.g. `control/speed`).
    pub set_rotation_speed: Option<String>,
    /// Topic on which the device reports its speed step (e.g. `state/speed`).
    pub get_rotation_speed: Option<String>,
}

/// Configuration of a single codec instance.
#[derive(Deserialize, Default, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Topic names.
    pub topics: Topics,
    /// Delay before an unconfirmed Turbo request is corrected.
    ///
    /// Invalid values in the configuration file are treated as unset.
    #[serde(rename = "turboReconcileMs", deserialize_with = "lenient_millis")]
    pub turbo_reconcile: Option<Duration>,
}

impl Config {
    /// Parses a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;

        Self::from_json(&json)
    }

    /// Returns the reconciliation delay, falling back to the default of one second.
    #[must_use]
    pub fn reconcile_delay(&self) -> Duration {
        self.turbo_reconcile.unwrap_or(DEFAULT_DELAY)
    }
}

/// Converts a delay in milliseconds into a [`Duration`].
///
/// Returns [`None`] for values that are not finite or not positive.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn delay_from_millis(ms: f64) -> Option<Duration> {
    const MAX_NANOS: f64 = 1.8e19;

    let nanos = (ms * 1_000_000.0).round();

    if ms.is_finite() && ms > 0.0 && nanos < MAX_NANOS {
        // Bounded by the check above
        Some(Duration::from_nanos(nanos as u64))
    } else {
        None
    }
}

fn lenient_millis<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Duration>, D::Error> {
    let ms = match serde_json::Value::deserialize(de)? {
        serde_json::Value::Number(num) => num.as_f64(),
        serde_json::Value::String(text) => convert::parse_number(&text),
        _ => None,
    };

    Ok(ms.and_then(delay_from_millis))
}
