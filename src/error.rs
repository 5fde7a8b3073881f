//! Error types for the mount drive engine.
//!
//! Configuration faults and hardware faults are the only conditions that
//! surface as Rust errors. Protocol-level faults (unknown command, bad
//! payload) are not errors: they become `!<code>` response packets on the
//! wire, see [`crate::protocol::ErrorCode`].

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all drive-engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor or GPIO operation error
    Motor(MotorError),
}

/// Configuration-related errors.
///
/// These mirror the boot-time image checks of the firmware: a mount with an
/// invalid configuration refuses to leave programming mode.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Persisted image does not start with the expected magic string
    BadMagic,
    /// Persisted image is shorter than the fixed layout
    ImageTooShort {
        /// Bytes required by the layout
        expected: usize,
        /// Bytes actually supplied
        actual: usize,
    },
    /// Unknown stepper driver family code
    UnknownDriver(u8),
    /// Invalid microstep count (must be a power of two, at most 16 for the
    /// A498x family and at most 32 otherwise)
    InvalidMicrosteps(u8),
    /// Sidereal period outside the accepted range
    SiderealPeriodOutOfRange(u16),
    /// Goto cruise period must be non-zero
    ZeroGotoPeriod,
    /// Acceleration table periods must be strictly decreasing
    AccelTableNotMonotonic {
        /// First index that fails the ordering check
        index: usize,
    },
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motor operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// GPIO pin operation failed
    PinError,
    /// The configured microstep mode needs a floating mode line the
    /// attached driver implementation cannot produce
    FloatUnsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadMagic => write!(f, "Persisted image has no valid magic"),
            ConfigError::ImageTooShort { expected, actual } => {
                write!(f, "Image too short: {} bytes, need {}", actual, expected)
            }
            ConfigError::UnknownDriver(v) => write!(f, "Unknown driver family: {}", v),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32", v)
            }
            ConfigError::SiderealPeriodOutOfRange(v) => {
                write!(f, "Sidereal period {} outside accepted range", v)
            }
            ConfigError::ZeroGotoPeriod => write!(f, "Goto period must be non-zero"),
            ConfigError::AccelTableNotMonotonic { index } => {
                write!(f, "Accel table period not decreasing at index {}", index)
            }
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
            MotorError::FloatUnsupported => {
                write!(f, "Driver cannot float a microstep mode line")
            }
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}
