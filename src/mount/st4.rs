//! The ST4 autoguide handler.
//!
//! Runs on any edge of the four button inputs, but only while neither axis
//! has a goto armed: guiding nudges the tracking rate, it never fights a
//! slew to a target.

use crate::error::MotorError;
use crate::hw::{AxisDriver, St4Button, St4Port};
use crate::motion::Direction;

use super::Mount;

/// Target periods the ST4 buttons select, rebuilt whenever the speed
/// profile changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct St4Speeds {
    /// RA period while the east button is held.
    pub ra_plus: u16,
    /// RA period while the west button is held.
    pub ra_minus: u16,
    /// RA period with neither button held.
    pub ra_rest: u16,
    /// DEC period while either declination button is held.
    pub dec: u16,
    /// Whether the west button may reverse RA instead of merely slowing
    /// it below sidereal.
    pub ra_reverse: bool,
}

impl St4Speeds {
    /// Guide-rate profile for a tracking mount: 1.25x sidereal east,
    /// 0.75x west, 0.25x on declination.
    pub fn guide(ra_sidereal: u16, dec_sidereal: u16) -> Self {
        Self {
            ra_plus: scale(ra_sidereal, 4, 5),
            ra_minus: scale(ra_sidereal, 4, 3),
            ra_rest: ra_sidereal,
            dec: dec_sidereal.saturating_mul(4),
            ra_reverse: false,
        }
    }

    /// Standalone profile for the basic hand controller: 2x sidereal both
    /// ways, with RA allowed to reverse.
    pub fn standalone(ra_sidereal: u16, dec_sidereal: u16) -> Self {
        Self {
            ra_plus: ra_sidereal / 2,
            ra_minus: ra_sidereal / 2,
            ra_rest: ra_sidereal,
            dec: dec_sidereal / 2,
            ra_reverse: true,
        }
    }

    /// High-speed profile selected by the basic controller's speed line:
    /// both axes at their goto cruise period, releasing back to sidereal.
    pub fn high_speed(ra_goto: u16, dec_goto: u16, ra_sidereal: u16) -> Self {
        Self {
            ra_plus: ra_goto,
            ra_minus: ra_goto,
            ra_rest: ra_sidereal,
            dec: dec_goto,
            ra_reverse: true,
        }
    }
}

/// Period for `rate = sidereal * denom / num`, i.e. `period * num / denom`.
fn scale(period: u16, num: u32, denom: u32) -> u16 {
    (u32::from(period) * num / denom).min(u16::MAX as u32 - 1) as u16
}

impl<RA, DC, ST4> Mount<RA, DC, ST4>
where
    RA: AxisDriver,
    DC: AxisDriver,
    ST4: St4Port,
{
    /// Body of the ST4 pin-change interrupt.
    pub fn st4_event(&mut self) -> Result<(), MotorError> {
        if !self.st4_active {
            return Ok(());
        }
        if self.ra.state().goto_armed || self.dec.state().goto_armed {
            return Ok(());
        }

        self.st4_ra()?;
        self.st4_dec()
    }

    fn st4_ra(&mut self) -> Result<(), MotorError> {
        let speeds = self.st4_speeds;
        // With reversal allowed the axis may always be retargeted as if it
        // were at rest.
        let at_rest = self.ra.stopped() || speeds.ra_reverse;

        let minus = self
            .st4
            .pressed(St4Button::RaMinus)
            .map_err(|_| MotorError::PinError)?;
        let plus = self
            .st4
            .pressed(St4Button::RaPlus)
            .map_err(|_| MotorError::PinError)?;

        // A reverse-travelling axis (only possible when reversal is
        // disallowed and a slew is winding down) ignores the buttons and
        // is simply asked back to sidereal.
        let travelling_backwards = self.ra.state().dir.is_reverse() && !at_rest;

        let (dir, period) = if travelling_backwards {
            (Direction::Forward, speeds.ra_rest)
        } else if minus {
            if speeds.ra_reverse {
                (Direction::Reverse, speeds.ra_minus)
            } else {
                (Direction::Forward, speeds.ra_minus)
            }
        } else if plus {
            (Direction::Forward, speeds.ra_plus)
        } else {
            (Direction::Forward, speeds.ra_rest)
        };

        if self.ra.stopped() {
            self.ra.set_direction(dir);
            self.ra.set_step_magnitude(1, false);
            self.ra.state_mut().gval = 1;
            self.ra.set_requested_period(u32::from(period));
            self.ra.start()?;
        } else {
            let state = self.ra.state_mut();
            state.target_period = period;
            // Keep the stop threshold above the new target so the axis
            // does not run itself down between updates.
            if state.stop_period < period {
                state.stop_period = period;
            }
        }
        Ok(())
    }

    fn st4_dec(&mut self) -> Result<(), MotorError> {
        let speeds = self.st4_speeds;

        let minus = self
            .st4
            .pressed(St4Button::DecMinus)
            .map_err(|_| MotorError::PinError)?;
        let plus = self
            .st4
            .pressed(St4Button::DecPlus)
            .map_err(|_| MotorError::PinError)?;

        let dir = if minus {
            Direction::Reverse
        } else if plus {
            Direction::Forward
        } else {
            // Released: raise the target past the stop threshold and let
            // the engine ramp itself to a halt.
            let state = self.dec.state_mut();
            state.target_period = state.stop_period.saturating_add(1);
            return Ok(());
        };

        self.dec.set_direction(dir);
        self.dec.set_step_magnitude(1, false);
        self.dec.state_mut().gval = 1;
        self.dec.set_requested_period(u32::from(speeds.dec));
        self.dec.start()
    }
}
