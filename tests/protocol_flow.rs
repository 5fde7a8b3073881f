//! End-to-end Synta exchanges against a simulated mount.

mod common;

use common::*;
use eq_drive::config::store;
use eq_drive::{AxisId, Mount};

#[test]
fn read_only_constants() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    // Version, steps per revolution, worm steps, high-speed factor.
    assert_eq!(send(&mut mount, ":e1\r"), "=EF0200\r"); // 751
    assert_eq!(send(&mut mount, ":a1\r"), "=008025\r"); // 0x258000
    assert_eq!(send(&mut mount, ":s1\r"), "=302A00\r"); // 0x002A30
    assert_eq!(send(&mut mount, ":g1\r"), "=08\r");
    assert_eq!(send(&mut mount, ":n1\r"), "=E80300\r"); // 1000
}

/// The `b` reply carries the rounding correction for the host driver DLL:
/// b * (2 * sidereal + 1) / (2 * sidereal), in wrapping 32-bit arithmetic.
#[test]
fn b_reply_is_corrected_outside_programming_mode() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    // 40000 * 2001 / 2000 = 40020
    assert_eq!(send(&mut mount, ":b1\r"), "=549C00\r"); // 0x009C54

    // In programming mode the raw divisor comes back.
    assert_eq!(send(&mut mount, ":O11\r"), "=\r");
    assert_eq!(send(&mut mount, ":b1\r"), "=409C00\r"); // 0x009C40 = 40000
}

#[test]
fn position_read_and_write() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    assert_eq!(send(&mut mount, ":j1\r"), "=000080\r");
    assert_eq!(send(&mut mount, ":E1563412\r"), "=\r");
    assert_eq!(mount.position(AxisId::Ra).value(), 0x123456);
    assert_eq!(send(&mut mount, ":j1\r"), "=563412\r");
}

#[test]
fn status_word_reflects_motion() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    // Idle, no driver power.
    assert_eq!(send(&mut mount, ":f1\r"), "=000\r");

    assert_eq!(send(&mut mount, ":F1\r"), "=\r");
    assert_eq!(send(&mut mount, ":G110\r"), "=\r");
    assert_eq!(send(&mut mount, ":J1\r"), "=\r");
    poll_once(&mut mount);

    // Slew mode, running, enabled.
    assert_eq!(send(&mut mount, ":f1\r"), "=111\r");

    assert_eq!(send(&mut mount, ":K1\r"), "=\r");
    run_until_stopped(&mut mount, AxisId::Ra, 2_000_000);
    assert_eq!(send(&mut mount, ":f1\r"), "=001\r");
}

#[test]
fn malformed_packets_get_error_replies() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    assert_eq!(send(&mut mount, ":W1\r"), "!0\r"); // unknown command
    assert_eq!(send(&mut mount, ":I112\r"), "!1\r"); // bad length
    assert_eq!(send(&mut mount, ":j9\r"), "!3\r"); // bad axis
    assert_eq!(send(&mut mount, ":E1ZZZZZZ\r"), "!3\r"); // bad hex

    // Still healthy afterwards.
    assert_eq!(send(&mut mount, ":j1\r"), "=000080\r");
}

#[test]
fn enable_is_refused_in_programming_mode() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    assert_eq!(send(&mut mount, ":O11\r"), "=\r");
    assert_eq!(send(&mut mount, ":F1\r"), "!2\r");
    assert_eq!(send(&mut mount, ":J1\r"), "!4\r");

    assert_eq!(send(&mut mount, ":O10\r"), "=\r");
    assert_eq!(send(&mut mount, ":F1\r"), "=\r");
}

/// Entering programming mode force-stops both axes.
#[test]
fn programming_mode_stops_motion() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    assert_eq!(send(&mut mount, ":G110\r"), "=\r");
    assert_eq!(send(&mut mount, ":J1\r"), "=\r");
    poll_once(&mut mount);
    run_ticks(&mut mount, AxisId::Ra, 10_000);
    assert!(!mount.stopped(AxisId::Ra));

    assert_eq!(send(&mut mount, ":O12\r"), "=\r");
    assert!(mount.stopped(AxisId::Ra));
    assert!(!mount.ra().state().enabled);
}

#[test]
fn reset_command_arms_watchdog_request() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));
    assert!(!mount.reset_requested());
    assert_eq!(send(&mut mount, ":R1\r"), "=\r");
    assert!(mount.reset_requested());
}

/// The accel-table cursor auto-advances on reads and writes and wraps at
/// the table length; `Y` rejects out-of-range indices.
#[test]
fn accel_table_commands() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));
    assert_eq!(send(&mut mount, ":O12\r"), "=\r"); // programming mode

    // Entry 0: period 1000 = 0x3E8, repeats 0.
    assert_eq!(send(&mut mount, ":x1\r"), "=E80300\r");
    // Cursor moved on: entry 1 is 800 = 0x320.
    assert_eq!(send(&mut mount, ":x1\r"), "=200300\r");

    // Rewrite entry 0 as period 0x0520, repeats 2.
    assert_eq!(send(&mut mount, ":Y100\r"), "=\r");
    assert_eq!(send(&mut mount, ":X1200502\r"), "=\r");
    assert_eq!(send(&mut mount, ":Y100\r"), "=\r");
    assert_eq!(send(&mut mount, ":x1\r"), "=200502\r");

    assert_eq!(send(&mut mount, ":Y106\r"), "!3\r"); // index out of range
}

/// Configuration written over the wire survives a store, a simulated
/// reboot from the image, and a read-back.
#[test]
fn config_round_trips_through_image() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));

    assert_eq!(send(&mut mount, ":O12\r"), "=\r"); // store mode
    assert_eq!(send(&mut mount, ":A1001122\r"), "=\r"); // a := 0x221100
    assert_eq!(send(&mut mount, ":B1409C00\r"), "=\r"); // b := 40000
    assert_eq!(send(&mut mount, ":S2302A00\r"), "=\r"); // s[dec] := 0x2A30
    assert_eq!(send(&mut mount, ":N1F40100\r"), "=\r"); // sidereal := 500
    assert_eq!(send(&mut mount, ":Z120\r"), "=\r"); // goto period := 0x20
    assert_eq!(send(&mut mount, ":C21\r"), "=\r"); // reverse DEC
    assert_eq!(send(&mut mount, ":T1\r"), "=\r"); // write the image

    let image = *mount.persisted_image();
    let restored = store::load(&image).expect("stored image must validate");
    assert_eq!(restored.ra.steps_per_rev, 0x221100);
    assert_eq!(restored.ra.sidereal_divisor, 40_000);
    assert_eq!(restored.dec.worm_steps, 0x2A30);
    assert_eq!(restored.ra.sidereal_period, 500);
    assert_eq!(restored.ra.goto_period, 0x20);
    assert!(restored.dec.reverse);
    assert!(!restored.ra.reverse);

    // Reboot from the image: identical configuration.
    let mut rebooted = Mount::new(
        restored.clone(),
        SimDriver::default(),
        SimDriver::default(),
        SimSt4::default(),
    )
    .unwrap();
    assert_eq!(rebooted.current_config(), restored);
    assert_eq!(send(&mut rebooted, ":a1\r"), "=001122\r");
    assert_eq!(send(&mut rebooted, ":z1\r"), "=20\r");
}

/// A blank image boots into programming mode; motion commands are
/// rejected until the configuration is made valid and `O` releases it.
#[test]
fn blank_image_boots_into_programming_mode() {
    let blank = [0u8; store::IMAGE_LEN];
    let mut mount: SimMount = Mount::from_image(
        &blank,
        SimDriver::default(),
        SimDriver::default(),
        SimSt4::default(),
    )
    .unwrap();

    assert!(!mount.config_valid());
    assert_eq!(send(&mut mount, ":J1\r"), "!4\r");
    assert_eq!(send(&mut mount, ":F1\r"), "!2\r");

    // Defaults are valid, so programming mode can be released.
    assert_eq!(send(&mut mount, ":O10\r"), "=\r");
    assert!(mount.config_valid());
    assert_eq!(send(&mut mount, ":F1\r"), "=\r");
}

/// Rejected configuration writes leave state untouched.
#[test]
fn out_of_range_settings_are_rejected() {
    let mut mount = sim_mount(sim_config(tracking_axis(), tracking_axis()));
    assert_eq!(send(&mut mount, ":O12\r"), "=\r");

    assert_eq!(send(&mut mount, ":D109\r"), "!3\r"); // unknown driver family
    assert_eq!(send(&mut mount, ":D240\r"), "!3\r"); // 64 microsteps
    assert_eq!(send(&mut mount, ":Z100\r"), "!3\r"); // zero goto period

    assert_eq!(send(&mut mount, ":d1\r"), "=01\r"); // still drv882x
    assert_eq!(send(&mut mount, ":d2\r"), "=10\r"); // still 16 microsteps
    assert_eq!(send(&mut mount, ":z1\r"), "=10\r"); // still 16
}
