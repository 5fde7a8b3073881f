//! One mount axis: motion state, rate and acceleration tables, the timer
//! model and the step engine that runs on it.
//!
//! The foreground (command decoder, supervisor, ST4 handler) calls the
//! controller operations; [`Axis::capture_event`] is the body of the axis
//! timer's capture interrupt and is the only place the position advances.

use crate::config::AxisConfig;
use crate::error::MotorError;
use crate::hw::{AxisDriver, ModeLines};
use crate::motion::{
    AccelEntry, AccelTable, Direction, MotionState, Position, RateTable, ACCEL_TABLE_LEN,
};

/// Model of one 16-bit axis timer in CTC mode.
///
/// On hardware `top` is the capture-compare register and `irq_enabled` the
/// capture-interrupt-enable bit the foreground masks around every shared
/// write. A hosted port drives [`Axis::capture_event`] from a periodic
/// scheduler at `top` timer-tick intervals.
#[derive(Debug, Clone, Copy)]
struct StepTimer {
    /// Clock source running.
    running: bool,
    /// Capture interrupt enabled.
    irq_enabled: bool,
    /// Reload value: timer ticks per capture interrupt.
    top: u16,
}

/// One axis of the mount.
pub struct Axis<D: AxisDriver> {
    driver: D,
    state: MotionState,
    rates: RateTable,
    accel: AccelTable,
    timer: StepTimer,

    // Synta constants for this axis.
    steps_per_rev: u32,
    sidereal_divisor: u32,
    worm_steps: u32,
    sidereal_period: u16,
    goto_period: u8,
    reverse: bool,
}

impl<D: AxisDriver> Axis<D> {
    /// Build an axis from its configuration and park the output pins:
    /// step low, direction low, driver powered down.
    pub fn new(config: &AxisConfig, mut driver: D) -> Result<Self, MotorError> {
        driver.set_step(false).map_err(|_| MotorError::PinError)?;
        driver.set_direction(false).map_err(|_| MotorError::PinError)?;
        driver.set_enabled(false).map_err(|_| MotorError::PinError)?;

        let rates = RateTable::from_divisor(config.sidereal_divisor.max(1));
        let min_period = config.accel.slowest();

        Ok(Self {
            driver,
            state: MotionState::new(min_period),
            timer: StepTimer {
                running: false,
                irq_enabled: false,
                top: rates.period(0),
            },
            rates,
            accel: config.accel.clone(),
            steps_per_rev: config.steps_per_rev,
            sidereal_divisor: config.sidereal_divisor,
            worm_steps: config.worm_steps,
            sidereal_period: config.sidereal_period,
            goto_period: config.goto_period,
            reverse: config.reverse,
        })
    }

    // ---------------------------------------------------------------
    // Step engine (interrupt context)
    // ---------------------------------------------------------------

    /// Body of the axis timer capture interrupt.
    ///
    /// Counts down interrupts to the next pulse edge; on an edge it
    /// refreshes the dithered timer top (one table slot per completed
    /// step), toggles the step pin, advances the position on the falling
    /// edge, latches goto deceleration at the precomputed marker, walks
    /// the acceleration table on the rising edge, and disarms itself once
    /// a pulse completes slower than the stop threshold.
    pub fn capture_event(&mut self) -> Result<(), MotorError> {
        if !self.timer.running || !self.timer.irq_enabled {
            return Ok(());
        }

        let remaining = self.state.irq_to_next.wrapping_sub(1);
        if remaining != 0 {
            self.state.irq_to_next = remaining;
            return Ok(());
        }

        // Edge due. Refresh the interrupt base rate from the distribution
        // table; the slot advances once per completed step (two edges).
        let segment = self.state.segment;
        self.timer.top = self.rates.period((segment >> 1) as usize);
        self.state.segment = segment.wrapping_add(1);

        let mut current = self.state.current_period;
        self.state.irq_to_next = current;

        if self.state.step_high {
            // Falling edge: the step completes here.
            self.driver.set_step(false).map_err(|_| MotorError::PinError)?;
            self.state.step_high = false;
            self.state.position = self.state.position.offset(self.state.step_delta);

            if self.state.goto_running
                && !self.state.goto_decelerating
                && self.state.position == self.state.goto_target
            {
                // Deceleration marker reached: retarget past the stop
                // threshold so the ramp runs all the way down.
                self.state.goto_decelerating = true;
                self.state.target_period = self.state.stop_period.saturating_add(1);
                self.state.accel_repeats_left = 0;
            }

            if current > self.state.stop_period {
                if self.state.goto_running {
                    self.state.goto_armed = false;
                    self.state.goto_running = false;
                }
                self.state.stopped = true;
                self.timer.running = false;
                self.timer.irq_enabled = false;
            }
        } else {
            // Rising edge: start the next step and walk the ramp.
            self.driver.set_step(true).map_err(|_| MotorError::PinError)?;
            self.state.step_high = true;

            if self.state.accel_repeats_left > 0 {
                self.state.accel_repeats_left -= 1;
            } else {
                let target = self.state.target_period;
                if current > target {
                    // Too slow.
                    let index = self.state.accel_index as usize;
                    if index >= ACCEL_TABLE_LEN - 1 {
                        current = target;
                        self.state.accel_index = (ACCEL_TABLE_LEN - 1) as u8;
                    } else {
                        let index = index + 1;
                        self.state.accel_index = index as u8;
                        current = self.accel.entry(index).period;
                        if current <= target {
                            current = target;
                        } else {
                            self.state.accel_repeats_left =
                                self.accel.repeats_at(index, self.state.high_speed);
                        }
                    }
                } else if current < target {
                    // Too fast.
                    let index = self.state.accel_index as usize;
                    if index == 0 {
                        current = target;
                    } else {
                        let index = index - 1;
                        self.state.accel_index = index as u8;
                        current = self.accel.entry(index).period;
                        if current >= target {
                            current = target;
                        } else {
                            self.state.accel_repeats_left =
                                self.accel.repeats_at(index, self.state.high_speed);
                        }
                    }
                }
                self.state.current_period = current;
            }
        }

        Ok(())
    }

    /// Whether the axis timer would fire capture interrupts.
    #[inline]
    pub fn timer_armed(&self) -> bool {
        self.timer.running && self.timer.irq_enabled
    }

    /// Current timer reload value in timer ticks.
    #[inline]
    pub fn timer_top(&self) -> u16 {
        self.timer.top
    }

    // ---------------------------------------------------------------
    // Controller operations (foreground)
    // ---------------------------------------------------------------

    /// Power the driver stage up.
    pub fn enable(&mut self) -> Result<(), MotorError> {
        self.driver.set_enabled(true).map_err(|_| MotorError::PinError)?;
        self.state.enabled = true;
        Ok(())
    }

    /// Power the driver stage down.
    pub fn disable(&mut self) -> Result<(), MotorError> {
        self.driver.set_enabled(false).map_err(|_| MotorError::PinError)?;
        self.state.enabled = false;
        Ok(())
    }

    /// Start a continuous move at the requested period.
    pub fn begin_slew(&mut self) -> Result<(), MotorError> {
        self.start()
    }

    /// Start a bounded move of `goto_steps` positions.
    ///
    /// Plans the deceleration marker so the ramp-down lands the move on
    /// the commanded count exactly; in high-speed mode the distance is
    /// first masked down to a multiple of the 8-step size. The
    /// deceleration budget is clamped to half the move so short moves
    /// still spend at least half their steps getting up to speed.
    pub fn begin_goto(&mut self) -> Result<(), MotorError> {
        let magnitude = self.state.step_delta.unsigned_abs() as u32;
        let high_speed = self.state.high_speed;

        let mut budget =
            self.accel.deceleration_steps(self.goto_period as u16, high_speed) as u32 * magnitude;

        if self.state.goto_steps < 2 * magnitude {
            self.state.goto_steps = 2 * magnitude;
        }
        let mut distance = self.state.goto_steps;
        let mut half = distance >> 1;
        if magnitude == 8 {
            distance &= !0x7;
            half &= !0x7;
        }
        if half < budget {
            budget = half;
        }

        self.state.goto_target = self
            .state
            .position
            .advanced(distance - budget, self.state.dir);
        self.state.requested_period = self.goto_period as u16;
        self.state.goto_decelerating = false;
        self.state.goto_running = true;
        self.start()
    }

    /// Arm the engine toward the requested period.
    ///
    /// Picks the starting period so a retarget mid-motion never jumps the
    /// speed: an already-moving axis keeps its current period when that is
    /// faster than `min_period`, and everything slower starts from the
    /// stop threshold. From standstill the ramp state is reset and the
    /// timer armed. All shared fields are written with the capture
    /// interrupt masked.
    pub fn start(&mut self) -> Result<(), MotorError> {
        let requested = self.state.requested_period;
        let stopping = requested.max(self.state.min_period);
        let start_period = if self.state.stopped {
            stopping
        } else if self.state.current_period < self.state.min_period {
            self.state.current_period
        } else {
            stopping
        };

        self.timer.irq_enabled = false;
        self.state.target_period = requested;
        self.state.current_period = start_period;
        self.state.stop_period = stopping;
        let dir_level = self.reverse != self.state.dir.is_reverse();
        self.driver
            .set_direction(dir_level)
            .map_err(|_| MotorError::PinError)?;

        if self.state.stopped {
            self.state.irq_to_next = 1;
            self.state.accel_repeats_left = self.accel.entry(0).repeats as u16;
            self.state.accel_index = 0;
            self.state.segment = 0;
            self.timer.top = self.rates.period(0);
            self.timer.running = true;
            self.state.stopped = false;
        }
        self.timer.irq_enabled = true;
        Ok(())
    }

    /// Stop the axis.
    ///
    /// An emergency stop disarms the timer on the spot and clears all goto
    /// state; the motor freewheels. A graceful stop retargets past the
    /// stop threshold so the engine ramps down through the acceleration
    /// table and disarms itself on the pulse that crosses it.
    pub fn stop(&mut self, emergency: bool) {
        if emergency {
            self.timer.running = false;
            self.timer.irq_enabled = false;
            self.state.goto_armed = false;
            self.state.goto_running = false;
            self.state.goto_decelerating = false;
            self.state.gval = 0;
            self.state.stopped = true;
        } else if !self.state.stopped {
            self.state.goto_armed = false;
            self.state.goto_running = false;
            self.state.gval = 0;

            self.timer.irq_enabled = false;
            if self.state.target_period < self.state.min_period
                && self.state.stop_period > self.state.min_period
            {
                self.state.stop_period = self.state.min_period;
            }
            self.state.target_period = self.state.stop_period.saturating_add(1);
            self.timer.irq_enabled = true;
        }
    }

    /// Apply a microstep mode pattern and the matching step size.
    pub fn apply_step_mode(
        &mut self,
        mode: ModeLines,
        magnitude: u8,
        high_speed: bool,
    ) -> Result<(), MotorError> {
        self.driver
            .apply_mode(mode)
            .map_err(|_| MotorError::PinError)?;
        self.set_step_magnitude(magnitude, high_speed);
        Ok(())
    }

    /// Set the step size without touching the mode pins (for boards that
    /// cannot change gear).
    pub fn set_step_magnitude(&mut self, magnitude: u8, high_speed: bool) {
        self.state.step_delta = self.state.dir.step_delta(magnitude);
        self.state.high_speed = high_speed;
    }

    /// Drive the microstep mode pins without changing the step size.
    pub fn apply_mode_pins(&mut self, mode: ModeLines) -> Result<(), MotorError> {
        self.driver
            .apply_mode(mode)
            .map_err(|_| MotorError::PinError)
    }

    // ---------------------------------------------------------------
    // State access
    // ---------------------------------------------------------------

    /// Shared motion state.
    #[inline]
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Mutable motion state for the foreground; the caller holds the
    /// masking discipline.
    #[inline]
    pub(crate) fn state_mut(&mut self) -> &mut MotionState {
        &mut self.state
    }

    /// Current absolute position.
    #[inline]
    pub fn position(&self) -> Position {
        self.state.position
    }

    /// Overwrite the absolute position (the `E` command, and the
    /// standalone-mode recentre). Masked against the engine.
    pub fn set_position(&mut self, position: Position) {
        self.timer.irq_enabled = false;
        self.state.position = position;
        self.timer.irq_enabled = true;
    }

    /// Whether the engine is idle.
    #[inline]
    pub fn stopped(&self) -> bool {
        self.state.stopped
    }

    /// Clamp and store a requested period (the `I` command). The request
    /// is floored at the fastest acceleration-table entry so a later ramp
    /// cannot end in a discontinuous jump.
    pub fn set_requested_period(&mut self, value: u32) -> u16 {
        let fastest = self.accel.fastest() as u32;
        let clamped = value.max(fastest).min(u16::MAX as u32 - 1) as u16;
        self.state.requested_period = clamped;
        clamped
    }

    // Synta constants.

    /// Microsteps per axis revolution (the `a` value).
    #[inline]
    pub fn steps_per_rev(&self) -> u32 {
        self.steps_per_rev
    }

    /// Sidereal timer divisor (the `b` value).
    #[inline]
    pub fn sidereal_divisor(&self) -> u32 {
        self.sidereal_divisor
    }

    /// Microsteps per worm revolution (the `s` value).
    #[inline]
    pub fn worm_steps(&self) -> u32 {
        self.worm_steps
    }

    /// Step period at sidereal rate.
    #[inline]
    pub fn sidereal_period(&self) -> u16 {
        self.sidereal_period
    }

    /// Goto cruise period.
    #[inline]
    pub fn goto_period(&self) -> u8 {
        self.goto_period
    }

    /// Direction sense reversal flag.
    #[inline]
    pub fn reversed(&self) -> bool {
        self.reverse
    }

    /// The acceleration schedule.
    #[inline]
    pub fn accel_table(&self) -> &AccelTable {
        &self.accel
    }

    /// The dithered rate table.
    #[inline]
    pub fn rate_table(&self) -> &RateTable {
        &self.rates
    }

    // Programming-mode configuration writes. The motors are force-stopped
    // in programming mode, so nothing races the engine here.

    pub(crate) fn set_steps_per_rev(&mut self, value: u32) {
        self.steps_per_rev = value;
    }

    /// Store a new sidereal divisor and rebuild the rate table.
    pub(crate) fn set_sidereal_divisor(&mut self, value: u32) {
        self.sidereal_divisor = value;
        self.rates = RateTable::from_divisor(value.max(1));
    }

    pub(crate) fn set_worm_steps(&mut self, value: u32) {
        self.worm_steps = value;
    }

    pub(crate) fn set_sidereal_period(&mut self, value: u16) {
        self.sidereal_period = value;
    }

    pub(crate) fn set_goto_period(&mut self, value: u8) {
        self.goto_period = value;
    }

    pub(crate) fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    pub(crate) fn accel_entry(&self, index: usize) -> AccelEntry {
        self.accel.entry(index)
    }

    pub(crate) fn set_accel_entry(&mut self, index: usize, entry: AccelEntry) {
        self.accel.set_entry(index, entry);
        self.state.min_period = self.accel.slowest();
    }

    /// Rebuild an [`AxisConfig`] from the live values (for the `T` store
    /// command).
    pub(crate) fn current_config(&self) -> AxisConfig {
        AxisConfig {
            steps_per_rev: self.steps_per_rev,
            sidereal_divisor: self.sidereal_divisor,
            worm_steps: self.worm_steps,
            sidereal_period: self.sidereal_period,
            goto_period: self.goto_period,
            reverse: self.reverse,
            accel: self.accel.clone(),
        }
    }

    /// Set the commanded direction (buffered; takes effect at the next
    /// start on a quiescent motor).
    pub(crate) fn set_direction(&mut self, dir: Direction) {
        self.state.dir = dir;
    }
}
