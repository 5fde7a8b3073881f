//! Motion primitives: dithered rate tables, the acceleration profile and
//! the per-axis motion state the step engine runs on.

mod accel;
mod rates;
mod state;

pub use accel::{AccelEntry, AccelTable, ACCEL_TABLE_LEN};
pub use rates::{RateTable, MAX_PERIOD, MIN_PERIOD, RATE_SLOTS, TIMER_HZ};
pub use state::{Direction, MotionState, Position, POSITION_CENTER};
