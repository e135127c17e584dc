//! Conversions between rotation speed percentages and device speed steps.
//!
//! The device exposes eight discrete speed steps (`0..=7`) and a separate
//! Turbo mode. Percentages are quantized in units of 12.5 %, so step `8`
//! stands for a Turbo request and maps back to exactly 100 %.
//!
//! The conversions are not exact inverses of each other. For example,
//! step 3 reports 38 %, which converts back to step 3, but 37 % and 43 %
//! both convert to step 3 as well.

/// Highest step the device accepts on its speed topic.
pub const MAX_DEVICE_STEP: u8 = 7;

/// Pseudo step requesting Turbo mode.
pub const TURBO_STEP: u8 = 8;

/// Width of a single step in percent.
const PERCENT_PER_STEP: f64 = 12.5;

/// Parses a raw payload token as a number.
///
/// Leading and trailing whitespace is ignored. Empty tokens, tokens that are not
/// numbers and `NaN` yield [`None`]. Infinite values are returned as-is and are
/// clamped by the conversion functions.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }

    raw.parse::<f64>().ok().filter(|num| !num.is_nan())
}

/// Clamps a number into `[lo, hi]`, rejecting `NaN`.
fn clamp(num: f64, lo: f64, hi: f64) -> Option<f64> {
    if num.is_nan() {
        None
    } else {
        Some(num.clamp(lo, hi))
    }
}

/// Converts a rotation speed percentage into a step in `0..=8`.
///
/// The percentage is clamped to `0..=100` first. A result of [`TURBO_STEP`]
/// requests Turbo mode. Returns [`None`] if `pct` is `NaN`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent_to_step(pct: f64) -> Option<u8> {
    let pct = clamp(pct, 0.0, 100.0)?;

    // Bounded by the clamp above
    Some((pct / PERCENT_PER_STEP).round() as u8)
}

/// Converts a step in `0..=8` into a rotation speed percentage.
///
/// The step is clamped to `0..=8` first. [`TURBO_STEP`] always maps to 100 %.
/// Returns [`None`] if `step` is `NaN`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn step_to_percent(step: f64) -> Option<u8> {
    let step = clamp(step, 0.0, f64::from(TURBO_STEP))?;

    if step == f64::from(TURBO_STEP) {
        return Some(100);
    }

    Some((step / f64::from(TURBO_STEP) * 100.0).round() as u8)
}

/// Clamps a reported speed into a device step in `0..=7`.
///
/// Fractional values are rounded half away from zero after clamping.
/// Returns [`None`] if `speed` is `NaN`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_device_step(speed: f64) -> Option<u8> {
    let speed = clamp(speed, 0.0, f64::from(MAX_DEVICE_STEP))?;

    Some(speed.round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers() {
        assert_eq!(parse_number("4"), Some(4.0), "integer should parse");
        assert_eq!(parse_number(" 2.5\n"), Some(2.5), "whitespace should be ignored");
        assert_eq!(parse_number("-1"), Some(-1.0), "negative number should parse");
        assert_eq!(
            parse_number("inf"),
            Some(f64::INFINITY),
            "infinity should parse"
        );
        assert_eq!(parse_number("abc"), None, "text should be rejected");
        assert_eq!(parse_number(""), None, "empty token should be rejected");
        assert_eq!(parse_number("   "), None, "blank token should be rejected");
        assert_eq!(parse_number("NaN"), None, "NaN should be rejected");
    }

    #[test]
    fn percent_to_step_anchors() {
        assert_eq!(percent_to_step(0.0), Some(0), "0 % should be step 0");
        assert_eq!(percent_to_step(50.0), Some(4), "50 % should be step 4");
        assert_eq!(percent_to_step(100.0), Some(8), "100 % should be Turbo");
        assert_eq!(percent_to_step(37.0), Some(3), "37 % should be step 3");
        assert_eq!(
            percent_to_step(6.25),
            Some(1),
            "halfway should round away from zero"
        );
        assert_eq!(percent_to_step(93.0), Some(7), "93 % should be step 7");
        assert_eq!(percent_to_step(94.0), Some(8), "94 % should be Turbo");
    }

    #[test]
    fn percent_to_step_clamps() {
        assert_eq!(percent_to_step(-20.0), Some(0), "negative should clamp");
        assert_eq!(percent_to_step(250.0), Some(8), "overflow should clamp");
        assert_eq!(
            percent_to_step(f64::NEG_INFINITY),
            Some(0),
            "negative infinity should clamp"
        );
        assert_eq!(percent_to_step(f64::NAN), None, "NaN should be rejected");
    }

    #[test]
    fn percent_to_step_is_monotonic() {
        let mut prev = 0;

        for pct in 0..=1000 {
            let step = percent_to_step(f64::from(pct) / 10.0).unwrap();

            assert!(step <= TURBO_STEP, "step should be within range");
            assert!(step >= prev, "step should not decrease");
            prev = step;
        }
    }

    #[test]
    fn step_to_percent_values() {
        let expected = [0, 13, 25, 38, 50, 63, 75, 88, 100];

        for (step, pct) in expected.into_iter().enumerate() {
            assert_eq!(
                step_to_percent(step as f64),
                Some(pct),
                "step {step} should report {pct} %"
            );
        }

        assert_eq!(step_to_percent(12.0), Some(100), "overflow should clamp");
        assert_eq!(step_to_percent(-3.0), Some(0), "negative should clamp");
        assert_eq!(step_to_percent(f64::NAN), None, "NaN should be rejected");
    }

    #[test]
    fn round_trip_is_quantized() {
        // 3 -> 38 % -> 3, but 37 % also lands on step 3 and reports 38 %
        let pct = step_to_percent(3.0).unwrap();

        assert_eq!(percent_to_step(f64::from(pct)), Some(3), "step should survive");
        assert_eq!(
            step_to_percent(f64::from(percent_to_step(37.0).unwrap())),
            Some(38),
            "37 % should be reported as 38 %"
        );
    }

    #[test]
    fn device_step_clamps() {
        assert_eq!(clamp_device_step(3.0), Some(3), "step should be kept");
        assert_eq!(clamp_device_step(9.0), Some(7), "overflow should clamp");
        assert_eq!(clamp_device_step(-1.0), Some(0), "negative should clamp");
        assert_eq!(clamp_device_step(2.5), Some(3), "half should round up");
        assert_eq!(clamp_device_step(f64::NAN), None, "NaN should be rejected");
    }
}
