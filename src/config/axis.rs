//! Per-axis configuration.

use serde::Deserialize;

use crate::motion::AccelTable;

/// Configuration of one mount axis.
///
/// The first three fields are the Synta `a`, `b` and `s` constants the host
/// reads at connect time; the rest parameterise the step engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AxisConfig {
    /// Microsteps per full axis revolution (the `a` value, 24 bits).
    pub steps_per_rev: u32,
    /// Timer-count divisor giving the sidereal step rate (the `b` value):
    /// the ideal step period is `8 MHz / sidereal_divisor` timer ticks.
    pub sidereal_divisor: u32,
    /// Microsteps per worm revolution (the `s` value).
    pub worm_steps: u32,
    /// Step period at exactly sidereal rate, in timer interrupts per
    /// half-step (the `I` value EQMOD uses as its speed reference).
    pub sidereal_period: u16,
    /// Cruise period for goto moves.
    pub goto_period: u8,
    /// Reverse the direction sense of this axis.
    #[serde(default)]
    pub reverse: bool,
    /// Acceleration schedule.
    #[serde(default)]
    pub accel: AccelTable,
}

impl Default for AxisConfig {
    fn default() -> Self {
        // 200-step motors, 16 microsteps, 144:1 worm: a mid-size German
        // equatorial.
        Self {
            steps_per_rev: 2_457_600,
            sidereal_divisor: 280_481,
            worm_steps: 17_067,
            sidereal_period: 600,
            goto_period: 48,
            reverse: false,
            accel: AccelTable::default(),
        }
    }
}
