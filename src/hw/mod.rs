//! Hardware seams.
//!
//! The engine core talks to pins only through these traits; concrete
//! implementations over embedded-hal 1.0 pin types live in [`gpio`].

mod gpio;

pub use gpio::{GpioAxisDriver, GpioDriverError, GpioSt4};

use core::fmt::Debug;

/// Electrical level of a microstep mode line.
///
/// The DRV8834 family selects some step modes by floating a mode pin, so
/// the level is a three-state value; push-pull-only implementations reject
/// [`LineLevel::Float`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineLevel {
    /// Driven low.
    Low,
    /// Driven high.
    High,
    /// High impedance.
    Float,
}

/// Levels for the three microstep mode lines of one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeLines(pub [LineLevel; 3]);

/// Pin-level interface of one axis: step, direction, enable and the
/// microstep mode lines.
pub trait AxisDriver {
    /// Pin operation error.
    type Error: Debug;

    /// Drive the step pin. The engine raises it to begin a pulse and drops
    /// it to complete one.
    fn set_step(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Drive the direction pin. Must be stable before the next rising step
    /// edge; the controller only changes it on a quiescent motor.
    fn set_direction(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Power the driver stage up or down.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Apply a microstep mode pattern.
    fn apply_mode(&mut self, mode: ModeLines) -> Result<(), Self::Error>;
}

/// One of the four autoguide buttons on the ST4 port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum St4Button {
    /// Right ascension, east.
    RaPlus,
    /// Right ascension, west.
    RaMinus,
    /// Declination, north.
    DecPlus,
    /// Declination, south.
    DecMinus,
}

/// The ST4 port: four active-low buttons plus the shared IRQ line with its
/// controllable pull resistor, used for the hand-controller probe at boot
/// and as the speed-select line in basic standalone mode.
pub trait St4Port {
    /// Pin operation error.
    type Error: Debug;

    /// Whether a button is currently pressed. Implementations resolve the
    /// active-low electrical convention.
    fn pressed(&mut self, button: St4Button) -> Result<bool, Self::Error>;

    /// Level of the shared IRQ line. Implementations must allow for the
    /// input synchroniser settling time after a pull change before the
    /// level is trusted.
    fn irq_level(&mut self) -> Result<bool, Self::Error>;

    /// Set the pull resistor on the IRQ line high or low.
    fn set_pull(&mut self, high: bool) -> Result<(), Self::Error>;
}
