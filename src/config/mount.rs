//! Whole-mount configuration.

use serde::Deserialize;

use super::axis::AxisConfig;

/// Stepper driver family populated on the board.
///
/// The family decides the legal microstep range and the mode-pin patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverFamily {
    /// Allegro A4983/A4988.
    A498x,
    /// TI DRV8824/DRV8825.
    Drv882x,
    /// TI DRV8834 (low voltage; floats a mode line for some step modes).
    Drv8834,
}

impl DriverFamily {
    /// Protocol code for the `d`/`D` commands.
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            DriverFamily::A498x => 0,
            DriverFamily::Drv882x => 1,
            DriverFamily::Drv8834 => 2,
        }
    }

    /// Family for a protocol code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DriverFamily::A498x),
            1 => Some(DriverFamily::Drv882x),
            2 => Some(DriverFamily::Drv8834),
            _ => None,
        }
    }
}

/// Complete mount configuration, read once at boot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MountConfig {
    /// Right ascension axis.
    pub ra: AxisConfig,
    /// Declination axis.
    pub dec: AxisConfig,
    /// Driver family on both axes.
    pub driver: DriverFamily,
    /// Microsteps per full step in normal mode (1, 2, 4, 8, 16 or 32).
    pub microsteps: u8,
    /// Allow the 8x gear change into the coarse microstep mode for rapid
    /// moves.
    #[serde(default = "default_true")]
    pub gear_change: bool,
    /// Probe for an advanced hand controller on the ST4 IRQ line.
    #[serde(default)]
    pub advanced_hc_detect: bool,
}

fn default_true() -> bool {
    true
}

impl MountConfig {
    /// Whether rapid moves may switch into the coarse microstep gear.
    /// Requires at least 1/8 stepping in normal mode so an 8x coarser mode
    /// exists.
    #[inline]
    pub fn can_high_speed(&self) -> bool {
        self.microsteps >= 8 && self.gear_change
    }

    /// Step-size multiplier reported as the Synta `g` constant.
    #[inline]
    pub fn high_speed_factor(&self) -> u8 {
        if self.can_high_speed() {
            8
        } else {
            1
        }
    }

    /// Whether the power-on microstep state is the coarse pattern. Below
    /// 1/8 stepping the normal-mode pattern does not exist and the coarse
    /// map is the only one.
    #[inline]
    pub fn default_fast_mode(&self) -> bool {
        self.microsteps < 8
    }
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            ra: AxisConfig::default(),
            dec: AxisConfig::default(),
            driver: DriverFamily::Drv882x,
            microsteps: 16,
            gear_change: true,
            advanced_hc_detect: false,
        }
    }
}
