//! Mount configuration.
//!
//! Provides the per-axis and global configuration types, validation rules,
//! the fixed-layout persisted byte image, and TOML loading (with the `std`
//! feature).

mod axis;
#[cfg(feature = "std")]
mod loader;
mod mount;
pub mod store;
mod validation;

pub use axis::AxisConfig;
pub use mount::{DriverFamily, MountConfig};
pub use validation::{validate, SIDEREAL_PERIOD_MAX, SIDEREAL_PERIOD_MIN};

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};
