//! Synta command execution.
//!
//! Stateless translation from a decoded packet to motor-controller calls
//! and a reply. Movement starts are deferred: `J` only arms
//! [`ReadyToGo::Armed`] and the supervisor consumes it once the axis is
//! quiescent, so direction and microstep reconfiguration always happen on
//! a stopped motor.

use crate::error::MotorError;
use crate::hw::{AxisDriver, St4Port};
use crate::motion::{AccelEntry, Position, ACCEL_TABLE_LEN};
use crate::protocol::{
    data_reply, empty_reply, error_reply, Decoded, ErrorCode, Packet, Reply,
};

use super::{
    build_mode_map, with_axis, AxisId, DriverFamily, Mount, ReadyToGo, FIRMWARE_VERSION,
    PROG_RUN,
};

impl<RA, DC, ST4> Mount<RA, DC, ST4>
where
    RA: AxisDriver,
    DC: AxisDriver,
    ST4: St4Port,
{
    /// Feed one received byte through the packet parser; a completed
    /// packet is executed and its reply returned.
    pub fn process_byte(&mut self, byte: u8) -> Result<Option<Reply>, MotorError> {
        match self.parser.push(byte) {
            Decoded::Pending => Ok(None),
            Decoded::Fault(code) => Ok(Some(error_reply(code))),
            Decoded::Packet(packet) => self.execute(&packet).map(Some),
        }
    }

    /// Execute a command packet.
    pub fn execute(&mut self, packet: &Packet) -> Result<Reply, MotorError> {
        let axis = packet.axis;
        let index = axis.index();

        let reply = match packet.command {
            // Read-only constants -----------------------------------
            b'e' => data_reply(b'e', FIRMWARE_VERSION),
            b'a' => data_reply(b'a', with_axis!(self, axis, |ax| ax.steps_per_rev())),
            b'b' => {
                let divisor = with_axis!(self, axis, |ax| ax.sidereal_divisor());
                data_reply(b'b', self.b_response(axis, divisor))
            }
            b'g' => data_reply(b'g', u32::from(self.high_speed_factor)),
            b's' => data_reply(b's', with_axis!(self, axis, |ax| ax.worm_steps())),
            b'f' => {
                let status = with_axis!(self, axis, |ax| ax.state().status_word());
                data_reply(b'f', u32::from(status))
            }
            b'j' => data_reply(b'j', self.position(axis).value()),

            // Motion ------------------------------------------------
            b'K' => {
                with_axis!(self, axis, |ax| ax.stop(false));
                self.ready[index] = ReadyToGo::Idle;
                empty_reply()
            }
            b'L' => {
                with_axis!(self, axis, |ax| ax.stop(true));
                self.ready[index] = ReadyToGo::Idle;
                with_axis!(self, axis, |ax| ax.disable())?;
                empty_reply()
            }
            b'G' => {
                let mode = packet.payload[0].wrapping_sub(b'0');
                if mode > 9 {
                    return Ok(error_reply(ErrorCode::InvalidCharacter));
                }
                let dir = if packet.payload[1] != b'0' {
                    crate::motion::Direction::Reverse
                } else {
                    crate::motion::Direction::Forward
                };
                with_axis!(self, axis, |ax| {
                    ax.state_mut().gval = mode;
                    ax.set_direction(dir);
                });
                self.ready[index] = ReadyToGo::Idle;
                empty_reply()
            }
            b'H' => match packet.value() {
                Some(steps) => {
                    with_axis!(self, axis, |ax| ax.state_mut().goto_steps = steps);
                    self.ready[index] = ReadyToGo::Idle;
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'I' => match packet.value() {
                Some(period) => {
                    with_axis!(self, axis, |ax| ax.set_requested_period(period));
                    if self.ready[index] == ReadyToGo::Running {
                        // Live retarget of a slew in progress.
                        with_axis!(self, axis, |ax| ax.start())?;
                    } else {
                        self.ready[index] = ReadyToGo::Idle;
                    }
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'E' => match packet.value() {
                Some(position) => {
                    with_axis!(self, axis, |ax| ax.set_position(Position::new(position)));
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'F' => {
                if self.prog_mode == PROG_RUN {
                    with_axis!(self, axis, |ax| ax.enable())?;
                    empty_reply()
                } else {
                    error_reply(ErrorCode::MotorBusy)
                }
            }
            b'J' => {
                if self.prog_mode == PROG_RUN {
                    self.ready[index] = ReadyToGo::Armed;
                    with_axis!(self, axis, |ax| {
                        if ax.state().gval & 1 == 0 {
                            ax.state_mut().goto_armed = true;
                        }
                    });
                    empty_reply()
                } else {
                    error_reply(ErrorCode::NotInitialized)
                }
            }
            b'R' => {
                self.reset_armed = true;
                empty_reply()
            }
            b'M' => empty_reply(),

            // Configuration -----------------------------------------
            b'A' => match packet.value() {
                Some(v) => {
                    with_axis!(self, axis, |ax| ax.set_steps_per_rev(v));
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'B' => match packet.value() {
                Some(v) => {
                    with_axis!(self, axis, |ax| ax.set_sidereal_divisor(v));
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'S' => match packet.value() {
                Some(v) => {
                    with_axis!(self, axis, |ax| ax.set_worm_steps(v));
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'n' => {
                let period = with_axis!(self, axis, |ax| ax.sidereal_period());
                data_reply(b'n', u32::from(period))
            }
            b'N' => match packet.value() {
                Some(v) => {
                    with_axis!(self, axis, |ax| ax.set_sidereal_period(v as u16));
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'd' => {
                let value = match axis {
                    AxisId::Ra => self.driver.code(),
                    AxisId::Dec => self.microsteps,
                };
                data_reply(b'd', u32::from(value))
            }
            b'D' => match packet.value() {
                Some(v) => return Ok(self.set_driver_setting(axis, v as u8)),
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'z' => {
                let period = with_axis!(self, axis, |ax| ax.goto_period());
                data_reply(b'z', u32::from(period))
            }
            b'Z' => match packet.value() {
                Some(0) | None => error_reply(ErrorCode::InvalidCharacter),
                Some(v) => {
                    with_axis!(self, axis, |ax| ax.set_goto_period(v as u8));
                    empty_reply()
                }
            },
            b'c' => {
                let reversed = with_axis!(self, axis, |ax| ax.reversed());
                data_reply(b'c', u32::from(reversed))
            }
            b'C' => {
                let reverse = packet.payload[0] != b'0';
                with_axis!(self, axis, |ax| ax.set_reverse(reverse));
                empty_reply()
            }
            // The wire convention for the feature flags is inverted:
            // `q`/`Q` carry "detection disabled" and "gear change
            // disabled".
            b'q' => {
                let value = match axis {
                    AxisId::Ra => !self.advanced_hc_detect,
                    AxisId::Dec => !self.gear_change,
                };
                data_reply(b'q', u32::from(value))
            }
            b'Q' => match packet.value() {
                Some(v) => {
                    match axis {
                        AxisId::Ra => self.advanced_hc_detect = v == 0,
                        AxisId::Dec => {
                            self.gear_change = v == 0;
                            self.can_high_speed = self.microsteps >= 8 && self.gear_change;
                            self.high_speed_factor = if self.can_high_speed { 8 } else { 1 };
                        }
                    }
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'x' => {
                let cursor = self.accel_cursor[index] as usize;
                let entry = with_axis!(self, axis, |ax| ax.accel_entry(cursor));
                self.accel_cursor[index] = ((cursor + 1) % ACCEL_TABLE_LEN) as u8;
                data_reply(b'x', u32::from(entry.period) | u32::from(entry.repeats) << 16)
            }
            b'X' => match packet.value() {
                Some(v) => {
                    let cursor = self.accel_cursor[index] as usize;
                    let entry = AccelEntry {
                        period: v as u16,
                        repeats: (v >> 16) as u8,
                    };
                    with_axis!(self, axis, |ax| ax.set_accel_entry(cursor, entry));
                    self.accel_cursor[index] = ((cursor + 1) % ACCEL_TABLE_LEN) as u8;
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            b'Y' => match packet.value() {
                Some(v) if (v as usize) < ACCEL_TABLE_LEN => {
                    self.accel_cursor[index] = v as u8;
                    empty_reply()
                }
                _ => error_reply(ErrorCode::InvalidCharacter),
            },
            b'O' => {
                let mode = packet.payload[0].wrapping_sub(b'0');
                if mode > 3 {
                    return Ok(error_reply(ErrorCode::InvalidCharacter));
                }
                return self.set_prog_mode(mode);
            }
            b'T' => return Ok(self.run_prog_action()),

            _ => error_reply(ErrorCode::UnknownCommand),
        };

        Ok(reply)
    }

    /// The `b` reply, with the rounding correction EQMOD's driver DLL
    /// expects outside programming mode. Wrapping 32-bit arithmetic keeps
    /// it bit-exact with the firmware it replaces.
    fn b_response(&self, axis: AxisId, divisor: u32) -> u32 {
        if self.prog_mode != PROG_RUN {
            return divisor;
        }
        let period = match axis {
            AxisId::Ra => self.ra.sidereal_period(),
            AxisId::Dec => self.dec.sidereal_period(),
        };
        let correction = u32::from(period) << 1;
        divisor.wrapping_mul(correction + 1) / correction.max(1)
    }

    /// `D`: driver family on the RA selector, microstep count on DEC.
    /// Out-of-range values are rejected without mutating anything.
    fn set_driver_setting(&mut self, axis: AxisId, value: u8) -> Reply {
        match axis {
            AxisId::Ra => match DriverFamily::from_code(value) {
                Some(family) => {
                    self.driver = family;
                    self.mode_map = build_mode_map(self.microsteps, self.driver);
                    empty_reply()
                }
                None => error_reply(ErrorCode::InvalidCharacter),
            },
            AxisId::Dec => {
                let limit = match self.driver {
                    DriverFamily::A498x => 16,
                    _ => 32,
                };
                if !value.is_power_of_two() || value > limit {
                    return error_reply(ErrorCode::InvalidCharacter);
                }
                self.microsteps = value;
                self.can_high_speed = value >= 8 && self.gear_change;
                self.high_speed_factor = if self.can_high_speed { 8 } else { 1 };
                self.default_fast = value < 8;
                self.mode_map = build_mode_map(self.microsteps, self.driver);
                empty_reply()
            }
        }
    }

    /// `O`: change programming mode. Entering it force-stops and powers
    /// down both motors; leaving it is refused until the live
    /// configuration passes the boot checks.
    fn set_prog_mode(&mut self, mode: u8) -> Result<Reply, MotorError> {
        if mode != PROG_RUN {
            self.prog_mode = mode;
            self.ra.stop(true);
            self.dec.stop(true);
            self.ready = [ReadyToGo::Idle; 2];
            self.ra.disable()?;
            self.dec.disable()?;
            return Ok(empty_reply());
        }

        if crate::config::validate(&self.current_config()).is_ok() {
            self.prog_mode = PROG_RUN;
            self.config_valid = true;
            Ok(empty_reply())
        } else {
            Ok(error_reply(ErrorCode::NotInitialized))
        }
    }

    /// `T`: run the action selected by the programming-mode bits —
    /// validate (bit 0), store the image (bit 1), or rewrite just the
    /// magic of a blank image (both).
    fn run_prog_action(&mut self) -> Reply {
        if self.prog_mode & 2 != 0 {
            if self.prog_mode & 1 != 0 {
                let _ = crate::config::store::write_magic(&mut self.nv_image);
            } else {
                let _ = crate::config::store::save(&self.current_config(), &mut self.nv_image);
            }
            empty_reply()
        } else if self.prog_mode & 1 != 0 {
            if crate::config::validate(&self.current_config()).is_ok() {
                empty_reply()
            } else {
                error_reply(ErrorCode::NotInitialized)
            }
        } else {
            empty_reply()
        }
    }
}
