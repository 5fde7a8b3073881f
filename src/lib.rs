//! # eq-drive
//!
//! Drive engine for a two-axis equatorial telescope mount (right ascension
//! and declination) built on step/dir stepper drivers, speaking the
//! Synta/Skywatcher serial protocol used by EQMOD and the Synta hand
//! controllers.
//!
//! ## Features
//!
//! - **Dithered step timing**: a 32-slot period table keeps the long-term
//!   sidereal rate exact while any single step is never more than one timer
//!   tick off
//! - **Table-driven ramping**: shared acceleration/deceleration schedule
//!   with exact goto landing and transparent high-speed gear changes
//! - **Synta protocol**: packet parser, command decoder and response
//!   encoder for the EQMOD command set plus the configuration commands
//! - **embedded-hal 1.0**: `OutputPin`/`InputPin` backed GPIO drivers, with
//!   trait seams so hosts and tests can substitute simulated hardware
//! - **no_std compatible**: no heap, no floating point on the hot path
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eq_drive::{AxisId, Mount, MountConfig};
//!
//! let config: MountConfig = eq_drive::load_config("mount.toml")?;
//! let mut mount = Mount::new(config, ra_driver, dec_driver, st4)?;
//!
//! loop {
//!     if let Some(byte) = serial.read() {
//!         if let Some(resp) = mount.process_byte(byte)? {
//!             serial.write(resp.as_bytes());
//!         }
//!     }
//!     mount.poll()?;
//! }
//!
//! // From the per-axis timer capture interrupt handlers:
//! mount.capture(AxisId::Ra)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Derives `defmt::Format` on public types for embedded logging

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod config;
pub mod error;
pub mod hw;
pub mod motion;
pub mod motor;
pub mod mount;
pub mod protocol;

// Re-exports for ergonomic API
pub use config::{AxisConfig, DriverFamily, MountConfig};
pub use error::{Error, Result};
pub use hw::{AxisDriver, St4Button, St4Port};
pub use motion::{AccelTable, Direction, RateTable};
pub use motor::Axis;
pub use mount::{AxisId, Mount, PollEvent, RunMode};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::load_config;
