//! The main-loop supervisor.
//!
//! Called once per foreground loop iteration. It periodically probes the
//! ST4 IRQ line to detect a hand controller, tracks the basic controller's
//! speed-select line, and consumes deferred movement starts once their
//! axis has come to rest.

use crate::error::MotorError;
use crate::hw::{AxisDriver, St4Port};
use crate::motion::Direction;

use super::{with_axis, AxisId, Mount, PollEvent, ReadyToGo, RunMode, St4Speeds};

impl<RA, DC, ST4> Mount<RA, DC, ST4>
where
    RA: AxisDriver,
    DC: AxisDriver,
    ST4: St4Port,
{
    /// One iteration of the main loop.
    ///
    /// Returns a [`PollEvent`] when the mount has just switched into a
    /// standalone mode and the embedder must reconfigure the link.
    pub fn poll(&mut self) -> Result<Option<PollEvent>, MotorError> {
        self.loop_count = self.loop_count.wrapping_add(1);

        let mut event = None;
        // Once per counter wrap, look for a hand controller. Standalone
        // mode is latched until reset.
        if self.run_mode == RunMode::Eqmod && self.loop_count == 0 {
            event = self.standalone_check()?;
        }
        if self.run_mode == RunMode::BasicHc {
            self.basic_speed_poll()?;
        }

        self.service(AxisId::Ra)?;
        self.service(AxisId::Dec)?;
        Ok(event)
    }

    /// Three-state probe of the ST4 IRQ line.
    ///
    /// The line has a controllable pull resistor: pull it one way and see
    /// whether it follows. Driven high means an advanced controller,
    /// driven low a basic one, floating means a plain serial host.
    pub fn probe_hand_controller(&mut self) -> Result<RunMode, MotorError> {
        if self.advanced_hc_detect {
            self.st4.set_pull(false).map_err(|_| MotorError::PinError)?;
            if self.st4.irq_level().map_err(|_| MotorError::PinError)? {
                self.st4.set_pull(true).map_err(|_| MotorError::PinError)?;
                return Ok(RunMode::AdvancedHc);
            }
        }
        self.st4.set_pull(true).map_err(|_| MotorError::PinError)?;
        if !self.st4.irq_level().map_err(|_| MotorError::PinError)? {
            return Ok(RunMode::BasicHc);
        }
        Ok(RunMode::Eqmod)
    }

    fn standalone_check(&mut self) -> Result<Option<PollEvent>, MotorError> {
        let mode = self.probe_hand_controller()?;
        if mode == RunMode::Eqmod {
            return Ok(None);
        }

        // Entering standalone: quiesce everything and recentre.
        self.ra.stop(true);
        self.dec.stop(true);
        self.ready = [ReadyToGo::Idle; 2];
        self.recentre();
        self.run_mode = mode;

        match mode {
            RunMode::AdvancedHc => {
                // Synta continues over SPI; the ST4 pins now belong to the
                // controller's bus, so button events are dead.
                self.st4_active = false;
                Ok(Some(PollEvent::EnteredAdvanced))
            }
            _ => self.enter_basic_mode().map(Some),
        }
    }

    fn enter_basic_mode(&mut self) -> Result<PollEvent, MotorError> {
        // The IRQ line doubles as the speed-select input; it needs the
        // pull-up while the controller drives it.
        self.st4.set_pull(true).map_err(|_| MotorError::PinError)?;

        // The basic controller never changes gear; pin the default
        // microstep pattern.
        let pattern = self.mode_map[usize::from(self.default_fast)];
        self.ra.apply_mode_pins(pattern)?;
        self.dec.apply_mode_pins(pattern)?;

        self.hc_fast = false;
        self.st4_speeds = St4Speeds::standalone(
            self.ra.sidereal_period(),
            self.dec.sidereal_period(),
        );

        self.ra.enable()?;
        self.dec.enable()?;

        // Arm sidereal tracking on RA; the ST4 buttons steer from there.
        self.ra.state_mut().gval = 1;
        self.dec.state_mut().gval = 1;
        self.ra.set_direction(Direction::Forward);
        self.dec.set_direction(Direction::Forward);
        let sidereal = self.ra.sidereal_period();
        self.ra.set_requested_period(u32::from(sidereal));
        self.ready[AxisId::Ra.index()] = ReadyToGo::Armed;

        Ok(PollEvent::EnteredBasic)
    }

    /// Track the basic controller's speed-select line: high selects the
    /// standalone guide speeds, low the high-speed set.
    fn basic_speed_poll(&mut self) -> Result<(), MotorError> {
        let normal = self.st4.irq_level().map_err(|_| MotorError::PinError)?;
        if normal {
            if self.hc_fast {
                self.st4_speeds = St4Speeds::standalone(
                    self.ra.sidereal_period(),
                    self.dec.sidereal_period(),
                );
                self.hc_fast = false;
            }
        } else if !self.hc_fast {
            self.st4_speeds = St4Speeds::high_speed(
                u16::from(self.ra.goto_period()),
                u16::from(self.dec.goto_period()),
                self.ra.sidereal_period(),
            );
            self.hc_fast = true;
        }
        Ok(())
    }

    /// Consume a deferred movement start once the axis is quiescent.
    ///
    /// This is the only place the microstep gear changes: the motor is
    /// stopped, so the mode pins and step size can be reconfigured safely
    /// before the engine is armed.
    fn service(&mut self, axis: AxisId) -> Result<(), MotorError> {
        let index = axis.index();
        if self.ready[index] != ReadyToGo::Armed || !self.stopped(axis) {
            return Ok(());
        }

        let gval = with_axis!(self, axis, |ax| ax.state().gval);

        if self.can_high_speed {
            if gval == 1 || gval == 2 {
                let pattern = self.mode_map[0];
                with_axis!(self, axis, |ax| ax.apply_step_mode(pattern, 1, false))?;
            } else {
                let pattern = self.mode_map[1];
                let factor = self.high_speed_factor;
                with_axis!(self, axis, |ax| ax.apply_step_mode(pattern, factor, true))?;
            }
        } else {
            with_axis!(self, axis, |ax| ax.set_step_magnitude(1, false));
        }

        if gval & 1 == 1 {
            with_axis!(self, axis, |ax| ax.begin_slew())?;
            // Running: speed updates may land without restarting.
            self.ready[index] = ReadyToGo::Running;
        } else {
            with_axis!(self, axis, |ax| ax.begin_goto())?;
            // Locked until the goto completes or is cancelled.
            self.ready[index] = ReadyToGo::Idle;
        }
        Ok(())
    }
}
