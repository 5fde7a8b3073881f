//! Hand-controller detection, basic standalone mode and the ST4 handler.

mod common;

use common::*;
use eq_drive::{AxisId, RunMode};

fn press(mount: &mut SimMount, button: usize, down: bool) {
    mount_buttons(mount)[button] = down;
    mount.st4_event().unwrap();
}

fn mount_buttons(mount: &mut SimMount) -> &mut [bool; 4] {
    // Buttons live on the simulated ST4 port.
    &mut mount.st4_mut().buttons
}

/// Three-state probe: a floating IRQ line follows the pull resistor and
/// means a plain serial host; a line held low is a basic controller; a
/// line held high against our pull-down is an advanced one.
#[test]
fn hand_controller_probe() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));
    assert_eq!(mount.probe_hand_controller().unwrap(), RunMode::Eqmod);

    mount.st4_mut().drive = Some(false);
    assert_eq!(mount.probe_hand_controller().unwrap(), RunMode::BasicHc);

    // The advanced probe only runs when detection is configured on.
    let mut config = sim_config(tracking_axis(), tracking_axis());
    config.advanced_hc_detect = true;
    let mut mount = sim_mount(config);
    mount.st4_mut().drive = Some(true);
    assert_eq!(mount.probe_hand_controller().unwrap(), RunMode::AdvancedHc);
}

/// Entering basic standalone mode recentres both axes and starts sidereal
/// tracking on RA.
#[test]
fn basic_mode_entry_starts_tracking() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));
    mount.st4_mut().drive = Some(false);

    // The probe runs when the loop counter wraps.
    let mut event = None;
    for _ in 0..=0x10000 {
        if let Some(e) = mount.poll().unwrap() {
            event = Some(e);
        }
    }
    assert_eq!(event, Some(eq_drive::PollEvent::EnteredBasic));
    assert_eq!(mount.run_mode(), RunMode::BasicHc);

    assert_eq!(mount.position(AxisId::Ra).value(), 0x80_0000);
    assert!(!mount.stopped(AxisId::Ra));
    assert!(mount.ra().state().enabled);

    run_ticks(&mut mount, AxisId::Ra, 32_000);
    assert_eq!(mount.position(AxisId::Ra).value() - 0x80_0000, 16);
}

/// ST4 buttons are dead while a goto is armed.
#[test]
fn st4_inert_during_goto() {
    let mut mount = sim_mount(sim_config(goto_axis(), goto_axis()));

    assert_eq!(send(&mut mount, ":G200\r"), "=\r");
    assert_eq!(send(&mut mount, ":H2002000\r"), "=\r");
    assert_eq!(send(&mut mount, ":J2\r"), "=\r");
    poll_once(&mut mount);
    run_ticks(&mut mount, AxisId::Dec, 10_000);
    assert!(mount.dec().state().goto_running);

    let ra_before = mount.ra().state().clone();
    let dec_target_before = mount.dec().state().target_period;

    press(&mut mount, 0, true); // RA+
    press(&mut mount, 2, true); // DEC+

    assert_eq!(mount.ra().state().target_period, ra_before.target_period);
    assert!(mount.ra().state().stopped);
    assert_eq!(mount.dec().state().target_period, dec_target_before);
}

/// Guiding while tracking: RA+ speeds up to 1.25x sidereal, RA- slows to
/// 0.75x, release returns to sidereal; the period never changes by a jump
/// since all guide targets sit below the slowest ramp entry.
#[test]
fn st4_guides_ra_rate() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    // Track at sidereal.
    assert_eq!(send(&mut mount, ":G110\r"), "=\r");
    assert_eq!(send(&mut mount, ":J1\r"), "=\r");
    poll_once(&mut mount);
    run_ticks(&mut mount, AxisId::Ra, 8_000);
    assert_eq!(mount.ra().state().current_period, 1000);

    press(&mut mount, 0, true); // RA+ -> 1.25x rate -> 0.8x period
    assert_eq!(mount.ra().state().target_period, 800);
    assert!(!mount.stopped(AxisId::Ra));

    press(&mut mount, 0, false); // release -> sidereal
    assert_eq!(mount.ra().state().target_period, 1000);

    press(&mut mount, 1, true); // RA- -> 0.75x rate -> 4/3 period
    assert_eq!(mount.ra().state().target_period, 1333);
    // The stop threshold follows the slower target so the axis keeps
    // moving between updates.
    assert!(mount.ra().state().stop_period >= 1333);

    press(&mut mount, 1, false);
    assert_eq!(mount.ra().state().target_period, 1000);
}

/// Declination guiding starts the axis on press and ramps it to a halt on
/// release.
#[test]
fn st4_drives_dec_axis() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    assert!(mount.stopped(AxisId::Dec));
    press(&mut mount, 2, true); // DEC+
    assert!(!mount.stopped(AxisId::Dec));
    // 0.25x sidereal rate = 4x period.
    assert_eq!(mount.dec().state().target_period, 4000);

    run_ticks(&mut mount, AxisId::Dec, 50_000);
    let moved = mount.position(AxisId::Dec).value();
    assert!(moved > 0x80_0000, "DEC crept forward");

    press(&mut mount, 2, false); // release
    run_until_stopped(&mut mount, AxisId::Dec, 2_000_000);
    assert!(mount.stopped(AxisId::Dec));

    // South button drives the other way.
    press(&mut mount, 3, true);
    run_ticks(&mut mount, AxisId::Dec, 100_000);
    assert!(mount.position(AxisId::Dec).value() < moved);
}
