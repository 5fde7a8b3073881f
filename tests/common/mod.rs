//! Simulated hardware and tick harness shared by the integration tests.
//!
//! The simulated drivers record pin activity; the tick runner stands in
//! for the per-axis timer capture interrupts, driving the step engines one
//! interrupt at a time.

#![allow(dead_code)]

use core::convert::Infallible;

use eq_drive::hw::ModeLines;
use eq_drive::motion::{AccelEntry, AccelTable, ACCEL_TABLE_LEN};
use eq_drive::{
    AxisConfig, AxisDriver, AxisId, DriverFamily, Mount, MountConfig, St4Button, St4Port,
};

/// Simulated axis driver: records pin levels and counts step edges.
#[derive(Debug, Default)]
pub struct SimDriver {
    pub step_high: bool,
    pub rising_edges: u32,
    pub falling_edges: u32,
    pub enabled: bool,
    pub dir_high: bool,
    pub mode: Option<ModeLines>,
}

impl AxisDriver for SimDriver {
    type Error = Infallible;

    fn set_step(&mut self, high: bool) -> Result<(), Infallible> {
        if high && !self.step_high {
            self.rising_edges += 1;
        }
        if !high && self.step_high {
            self.falling_edges += 1;
        }
        self.step_high = high;
        Ok(())
    }

    fn set_direction(&mut self, high: bool) -> Result<(), Infallible> {
        self.dir_high = high;
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Infallible> {
        self.enabled = enabled;
        Ok(())
    }

    fn apply_mode(&mut self, mode: ModeLines) -> Result<(), Infallible> {
        self.mode = Some(mode);
        Ok(())
    }
}

/// Simulated ST4 port. `drive` models an external device driving the IRQ
/// line; with nothing attached the line follows the pull resistor.
#[derive(Debug)]
pub struct SimSt4 {
    pub buttons: [bool; 4],
    pub drive: Option<bool>,
    pub pull_high: bool,
}

impl Default for SimSt4 {
    fn default() -> Self {
        Self {
            buttons: [false; 4],
            drive: None,
            pull_high: true,
        }
    }
}

impl SimSt4 {
    fn button_index(button: St4Button) -> usize {
        match button {
            St4Button::RaPlus => 0,
            St4Button::RaMinus => 1,
            St4Button::DecPlus => 2,
            St4Button::DecMinus => 3,
        }
    }
}

impl St4Port for SimSt4 {
    type Error = Infallible;

    fn pressed(&mut self, button: St4Button) -> Result<bool, Infallible> {
        Ok(self.buttons[Self::button_index(button)])
    }

    fn irq_level(&mut self) -> Result<bool, Infallible> {
        Ok(self.drive.unwrap_or(self.pull_high))
    }

    fn set_pull(&mut self, high: bool) -> Result<(), Infallible> {
        self.pull_high = high;
        Ok(())
    }
}

pub type SimMount = Mount<SimDriver, SimDriver, SimSt4>;

/// Acceleration table from parallel period/repeat arrays.
pub fn accel(periods: [u16; ACCEL_TABLE_LEN], repeats: [u8; ACCEL_TABLE_LEN]) -> AccelTable {
    let mut entries = [AccelEntry { period: 0, repeats: 0 }; ACCEL_TABLE_LEN];
    for i in 0..ACCEL_TABLE_LEN {
        entries[i] = AccelEntry {
            period: periods[i],
            repeats: repeats[i],
        };
    }
    AccelTable::new(entries).expect("test table must be monotonic")
}

/// An axis with an exactly-divisible sidereal rate and a ramp whose slow
/// end equals the sidereal period, so tracking starts without a transient.
pub fn tracking_axis() -> AxisConfig {
    AxisConfig {
        steps_per_rev: 0x25_8000,
        sidereal_divisor: 40_000,
        worm_steps: 0x2_A30,
        sidereal_period: 1000,
        goto_period: 16,
        reverse: false,
        accel: accel([1000, 800, 600, 400, 200, 100], [0; 6]),
    }
}

/// An axis tuned for goto tests: the ramp's fast end meets the goto
/// cruise period.
pub fn goto_axis() -> AxisConfig {
    AxisConfig {
        steps_per_rev: 0x25_8000,
        sidereal_divisor: 40_000,
        worm_steps: 0x2_A30,
        sidereal_period: 1000,
        goto_period: 16,
        reverse: false,
        accel: accel([2000, 1200, 600, 200, 64, 16], [1, 1, 1, 2, 2, 3]),
    }
}

pub fn sim_config(ra: AxisConfig, dec: AxisConfig) -> MountConfig {
    MountConfig {
        ra,
        dec,
        driver: DriverFamily::Drv882x,
        microsteps: 16,
        gear_change: true,
        advanced_hc_detect: false,
    }
}

pub fn sim_mount(config: MountConfig) -> SimMount {
    Mount::new(
        config,
        SimDriver::default(),
        SimDriver::default(),
        SimSt4::default(),
    )
    .expect("test config must be valid")
}

/// Feed a command line to the mount, returning the reply it produced.
pub fn send(mount: &mut SimMount, line: &str) -> String {
    let mut reply = None;
    for &byte in line.as_bytes() {
        if let Some(r) = mount.process_byte(byte).expect("pin sim is infallible") {
            reply = Some(r);
        }
    }
    reply.expect("command line must produce a reply").to_string()
}

/// Run `n` timer capture interrupts on one axis. Interrupts while the
/// timer is disarmed are idle ticks.
pub fn run_ticks(mount: &mut SimMount, axis: AxisId, n: u32) {
    for _ in 0..n {
        if mount.timer_armed(axis) {
            mount.capture(axis).expect("pin sim is infallible");
        }
    }
}

/// Run capture interrupts until the axis reports stopped, with a safety
/// bound.
pub fn run_until_stopped(mount: &mut SimMount, axis: AxisId, bound: u32) {
    for _ in 0..bound {
        if mount.stopped(axis) {
            return;
        }
        if mount.timer_armed(axis) {
            mount.capture(axis).expect("pin sim is infallible");
        }
    }
    panic!("axis did not stop within {} ticks", bound);
}

/// Arm a movement and let the supervisor start it.
pub fn poll_once(mount: &mut SimMount) {
    mount.poll().expect("pin sim is infallible");
}
