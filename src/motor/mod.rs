//! Per-axis motor control: the foreground controller operations and the
//! interrupt-context step engine.

mod axis;

pub use axis::Axis;
