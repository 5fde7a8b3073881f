//! Host-side simulation: run a goto on the declination axis and print the
//! ramp as it happens.
//!
//! ```sh
//! cargo run --example sim_goto
//! ```

use core::convert::Infallible;

use eq_drive::hw::ModeLines;
use eq_drive::{AxisDriver, AxisId, Mount, MountConfig, St4Button, St4Port};

#[derive(Default)]
struct SimDriver {
    step_high: bool,
}

impl AxisDriver for SimDriver {
    type Error = Infallible;

    fn set_step(&mut self, high: bool) -> Result<(), Infallible> {
        self.step_high = high;
        Ok(())
    }

    fn set_direction(&mut self, _high: bool) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_enabled(&mut self, _enabled: bool) -> Result<(), Infallible> {
        Ok(())
    }

    fn apply_mode(&mut self, _mode: ModeLines) -> Result<(), Infallible> {
        Ok(())
    }
}

struct SimSt4;

impl St4Port for SimSt4 {
    type Error = Infallible;

    fn pressed(&mut self, _button: St4Button) -> Result<bool, Infallible> {
        Ok(false)
    }

    fn irq_level(&mut self) -> Result<bool, Infallible> {
        Ok(true)
    }

    fn set_pull(&mut self, _high: bool) -> Result<(), Infallible> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MountConfig::default();
    let mut mount = Mount::new(config, SimDriver::default(), SimDriver::default(), SimSt4)?;

    // 0x800 steps forward on DEC at normal speed.
    for line in [":F2\r", ":G200\r", ":H2000800\r", ":J2\r"] {
        for &byte in line.as_bytes() {
            if let Some(reply) = mount.process_byte(byte)? {
                println!("{:8} -> {}", line.trim_end(), reply.trim_end());
            }
        }
    }
    mount.poll()?;

    let start = mount.position(AxisId::Dec).value();
    let mut last_period = 0;
    let mut ticks: u64 = 0;
    while !mount.stopped(AxisId::Dec) {
        if mount.timer_armed(AxisId::Dec) {
            mount.capture(AxisId::Dec)?;
        }
        ticks += 1;
        let state = mount.dec().state();
        if state.current_period != last_period {
            last_period = state.current_period;
            println!(
                "tick {:>8}  position +{:<5}  period {:>5}  {}",
                ticks,
                mount.position(AxisId::Dec).value() - start,
                last_period,
                if state.goto_decelerating { "decel" } else { "ramp/cruise" },
            );
        }
    }

    println!(
        "landed: +{} steps in {} timer interrupts",
        mount.position(AxisId::Dec).value() - start,
        ticks
    );
    Ok(())
}
