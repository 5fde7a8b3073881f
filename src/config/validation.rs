//! Configuration validation.
//!
//! The same checks the firmware runs against the persisted image at boot:
//! a mount that fails them refuses to leave programming mode.

use crate::error::ConfigError;

use super::mount::{DriverFamily, MountConfig};
use super::axis::AxisConfig;

/// Fastest accepted sidereal period.
pub const SIDEREAL_PERIOD_MIN: u16 = 50;

/// Slowest accepted sidereal period.
pub const SIDEREAL_PERIOD_MAX: u16 = 1200;

/// Validate a mount configuration.
///
/// Checks:
/// - Microstep count is a power of two, at most 16 for the A498x family
///   and at most 32 otherwise
/// - Sidereal periods are within the accepted range
/// - Goto periods are non-zero
/// - Acceleration tables are strictly decreasing in period
pub fn validate(config: &MountConfig) -> Result<(), ConfigError> {
    let microsteps = config.microsteps;
    if !microsteps.is_power_of_two() {
        return Err(ConfigError::InvalidMicrosteps(microsteps));
    }
    let limit = match config.driver {
        DriverFamily::A498x => 16,
        _ => 32,
    };
    if microsteps > limit {
        return Err(ConfigError::InvalidMicrosteps(microsteps));
    }

    validate_axis(&config.ra)?;
    validate_axis(&config.dec)?;
    Ok(())
}

fn validate_axis(axis: &AxisConfig) -> Result<(), ConfigError> {
    if !(SIDEREAL_PERIOD_MIN..=SIDEREAL_PERIOD_MAX).contains(&axis.sidereal_period) {
        return Err(ConfigError::SiderealPeriodOutOfRange(axis.sidereal_period));
    }
    if axis.goto_period == 0 {
        return Err(ConfigError::ZeroGotoPeriod);
    }
    if !axis.accel.is_monotonic() {
        // Locate the offending entry for the report.
        for i in 1..crate::motion::ACCEL_TABLE_LEN {
            if axis.accel.entry(i).period >= axis.accel.entry(i - 1).period {
                return Err(ConfigError::AccelTableNotMonotonic { index: i });
            }
        }
    }
    Ok(())
}
