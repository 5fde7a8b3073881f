//! embedded-hal 1.0 implementations of the hardware seams.

use embedded_hal::digital::{InputPin, OutputPin};

use super::{AxisDriver, LineLevel, ModeLines, St4Button, St4Port};

/// Error type of the GPIO-backed drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioDriverError<E> {
    /// Underlying pin returned an error.
    Pin(E),
    /// A mode pattern asked for a floating line but the mode pins here are
    /// push-pull only. DRV8834 1/32 stepping needs a tri-state capable
    /// [`AxisDriver`] implementation.
    FloatUnsupported,
}

impl<E> From<E> for GpioDriverError<E> {
    fn from(e: E) -> Self {
        GpioDriverError::Pin(e)
    }
}

/// Axis driver over plain push-pull output pins.
///
/// The enable pin is active low (driver powered when the pin is low), as on
/// the A498x/DRV88xx boards.
pub struct GpioAxisDriver<STEP, DIR, EN, MODE>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    MODE: OutputPin,
{
    step: STEP,
    dir: DIR,
    enable: EN,
    mode: [MODE; 3],
}

impl<STEP, DIR, EN, MODE> GpioAxisDriver<STEP, DIR, EN, MODE>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    MODE: OutputPin,
{
    /// Bundle the pins of one axis. The caller should have configured them
    /// as outputs; initial levels are established by [`crate::motor::Axis`].
    pub fn new(step: STEP, dir: DIR, enable: EN, mode: [MODE; 3]) -> Self {
        Self {
            step,
            dir,
            enable,
            mode,
        }
    }

    /// Give the pins back.
    pub fn release(self) -> (STEP, DIR, EN, [MODE; 3]) {
        (self.step, self.dir, self.enable, self.mode)
    }
}

impl<STEP, DIR, EN, MODE, E> AxisDriver for GpioAxisDriver<STEP, DIR, EN, MODE>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
    MODE: OutputPin<Error = E>,
    E: core::fmt::Debug,
{
    type Error = GpioDriverError<E>;

    fn set_step(&mut self, high: bool) -> Result<(), Self::Error> {
        if high {
            self.step.set_high()?;
        } else {
            self.step.set_low()?;
        }
        Ok(())
    }

    fn set_direction(&mut self, high: bool) -> Result<(), Self::Error> {
        if high {
            self.dir.set_high()?;
        } else {
            self.dir.set_low()?;
        }
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        // Active low enable.
        if enabled {
            self.enable.set_low()?;
        } else {
            self.enable.set_high()?;
        }
        Ok(())
    }

    fn apply_mode(&mut self, mode: ModeLines) -> Result<(), Self::Error> {
        for (pin, level) in self.mode.iter_mut().zip(mode.0) {
            match level {
                LineLevel::Low => pin.set_low()?,
                LineLevel::High => pin.set_high()?,
                LineLevel::Float => return Err(GpioDriverError::FloatUnsupported),
            }
        }
        Ok(())
    }
}

/// ST4 port over input pins with pull-ups plus the pull-control output.
pub struct GpioSt4<IN, PULL>
where
    IN: InputPin,
    PULL: OutputPin,
{
    ra_plus: IN,
    ra_minus: IN,
    dec_plus: IN,
    dec_minus: IN,
    irq: IN,
    pull: PULL,
}

impl<IN, PULL> GpioSt4<IN, PULL>
where
    IN: InputPin,
    PULL: OutputPin,
{
    /// Bundle the ST4 pins. Button inputs are active low with internal
    /// pull-ups.
    pub fn new(
        ra_plus: IN,
        ra_minus: IN,
        dec_plus: IN,
        dec_minus: IN,
        irq: IN,
        pull: PULL,
    ) -> Self {
        Self {
            ra_plus,
            ra_minus,
            dec_plus,
            dec_minus,
            irq,
            pull,
        }
    }
}

impl<IN, PULL, E> St4Port for GpioSt4<IN, PULL>
where
    IN: InputPin<Error = E>,
    PULL: OutputPin<Error = E>,
    E: core::fmt::Debug,
{
    type Error = E;

    fn pressed(&mut self, button: St4Button) -> Result<bool, Self::Error> {
        let pin = match button {
            St4Button::RaPlus => &mut self.ra_plus,
            St4Button::RaMinus => &mut self.ra_minus,
            St4Button::DecPlus => &mut self.dec_plus,
            St4Button::DecMinus => &mut self.dec_minus,
        };
        pin.is_low()
    }

    fn irq_level(&mut self) -> Result<bool, Self::Error> {
        self.irq.is_high()
    }

    fn set_pull(&mut self, high: bool) -> Result<(), Self::Error> {
        if high {
            self.pull.set_high()
        } else {
            self.pull.set_low()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn step_and_direction_drive_pins() {
        let step = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let dir = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let enable = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mode = [PinMock::new(&[]), PinMock::new(&[]), PinMock::new(&[])];

        let mut driver = GpioAxisDriver::new(step, dir, enable, mode);
        driver.set_step(true).unwrap();
        driver.set_step(false).unwrap();
        driver.set_direction(true).unwrap();
        driver.set_enabled(true).unwrap();

        let (mut step, mut dir, mut enable, mode) = driver.release();
        step.done();
        dir.done();
        enable.done();
        for mut pin in mode {
            pin.done();
        }
    }

    #[test]
    fn float_mode_line_is_rejected() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[]);
        let enable = PinMock::new(&[]);
        let mode = [
            PinMock::new(&[PinTransaction::set(PinState::Low)]),
            PinMock::new(&[]),
            PinMock::new(&[]),
        ];

        let mut driver = GpioAxisDriver::new(step, dir, enable, mode);
        let result = driver.apply_mode(ModeLines([
            LineLevel::Low,
            LineLevel::Float,
            LineLevel::High,
        ]));
        assert_eq!(result, Err(GpioDriverError::FloatUnsupported));

        let (mut step, mut dir, mut enable, mode) = driver.release();
        step.done();
        dir.done();
        enable.done();
        for mut pin in mode {
            pin.done();
        }
    }
}
