//! The mount: two axes, the ST4 port, the Synta command decoder and the
//! main-loop supervisor, assembled into one state machine.

mod dispatch;
mod st4;
mod supervisor;

pub use st4::St4Speeds;

use crate::config::{store, validate, DriverFamily, MountConfig};
use crate::error::{Error, MotorError};
use crate::hw::{AxisDriver, LineLevel, ModeLines, St4Port};
use crate::motion::{Position, POSITION_CENTER};
use crate::motor::Axis;
use crate::protocol::PacketParser;

/// Firmware version reported by the `e` command.
pub const FIRMWARE_VERSION: u32 = 751;

/// Unsolicited greeting the embedder sends after switching the link to an
/// advanced hand controller.
pub const ADVANCED_WELCOME: &str = "=4B\r";

/// Axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisId {
    /// Right ascension.
    Ra,
    /// Declination.
    Dec,
}

impl AxisId {
    /// Array index for per-axis state.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            AxisId::Ra => 0,
            AxisId::Dec => 1,
        }
    }
}

/// What the mount decided it is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunMode {
    /// Serial host speaking Synta (EQMOD or the configuration utility).
    Eqmod,
    /// Basic hand controller on the ST4 port; Synta processing off.
    BasicHc,
    /// Advanced hand controller speaking Synta over SPI.
    AdvancedHc,
}

/// Supervisor notification for the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollEvent {
    /// Basic hand controller detected: disable the serial port.
    EnteredBasic,
    /// Advanced hand controller detected: bring up SPI and send
    /// [`ADVANCED_WELCOME`].
    EnteredAdvanced,
}

/// Deferred-start state of one axis, driven by the `J` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadyToGo {
    /// No movement pending.
    Idle,
    /// `J` received; start once the axis is quiescent.
    Armed,
    /// Slewing; `I` commands retarget the speed live.
    Running,
}

// Programming-mode bits (the `O` command digit): bit 0 validates, bit 1
// writes, both together rebuild a blank image.
pub(crate) const PROG_RUN: u8 = 0;
pub(crate) const PROG_VALIDATE: u8 = 1;

/// Run a closure against the axis selected at runtime. The two axes have
/// different driver types, so this monomorphises the body per axis instead
/// of unifying them behind one reference type.
macro_rules! with_axis {
    ($mount:expr, $axis:expr, |$ax:ident| $body:expr) => {
        match $axis {
            $crate::mount::AxisId::Ra => {
                let $ax = &mut $mount.ra;
                $body
            }
            $crate::mount::AxisId::Dec => {
                let $ax = &mut $mount.dec;
                $body
            }
        }
    };
}
pub(crate) use with_axis;

/// Microstep mode-pin patterns for a driver family: `[normal, coarse]`.
///
/// Below 1/8 stepping no 8x coarser mode exists, so the coarse map is
/// generated for `microsteps * 8` and used as the only pattern.
pub(crate) fn build_mode_map(microsteps: u8, driver: DriverFamily) -> [ModeLines; 2] {
    use LineLevel::{Float, High, Low};

    let microsteps = if microsteps < 8 {
        microsteps * 8
    } else {
        microsteps
    };

    match microsteps {
        8 => [
            // 1/8 and full step
            ModeLines([High, High, Low]),
            ModeLines([Low, Low, Low]),
        ],
        32 => {
            if driver == DriverFamily::Drv8834 {
                // 1/32 and 1/4, mode line 2 floating
                [
                    ModeLines([Low, High, Float]),
                    ModeLines([Low, Low, Float]),
                ]
            } else {
                [
                    ModeLines([High, High, High]),
                    ModeLines([Low, High, Low]),
                ]
            }
        }
        // 1/16 and 1/2; also the fallback for unknown counts
        _ => {
            if driver == DriverFamily::Drv882x {
                [
                    ModeLines([High, Low, Low]),
                    ModeLines([Low, Low, High]),
                ]
            } else {
                [
                    ModeLines([High, High, High]),
                    ModeLines([High, Low, Low]),
                ]
            }
        }
    }
}

/// The whole mount.
///
/// Generic over the two axis drivers and the ST4 port so hosts, targets
/// and tests can plug in real pins or simulations.
pub struct Mount<RA, DC, ST4>
where
    RA: AxisDriver,
    DC: AxisDriver,
    ST4: St4Port,
{
    pub(crate) ra: Axis<RA>,
    pub(crate) dec: Axis<DC>,
    pub(crate) st4: ST4,

    pub(crate) parser: PacketParser,
    pub(crate) ready: [ReadyToGo; 2],
    pub(crate) accel_cursor: [u8; 2],

    pub(crate) prog_mode: u8,
    pub(crate) config_valid: bool,
    pub(crate) run_mode: RunMode,
    pub(crate) st4_active: bool,
    pub(crate) hc_fast: bool,
    pub(crate) loop_count: u16,
    pub(crate) reset_armed: bool,

    pub(crate) driver: DriverFamily,
    pub(crate) microsteps: u8,
    pub(crate) gear_change: bool,
    pub(crate) advanced_hc_detect: bool,
    pub(crate) can_high_speed: bool,
    pub(crate) default_fast: bool,
    pub(crate) high_speed_factor: u8,
    pub(crate) mode_map: [ModeLines; 2],
    pub(crate) st4_speeds: St4Speeds,

    pub(crate) nv_image: [u8; store::IMAGE_LEN],
}

impl<RA, DC, ST4> Mount<RA, DC, ST4>
where
    RA: AxisDriver,
    DC: AxisDriver,
    ST4: St4Port,
{
    /// Build a mount from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the boot checks fail, or a motor
    /// error when initial pin setup fails.
    pub fn new(config: MountConfig, ra: RA, dec: DC, st4: ST4) -> Result<Self, Error> {
        validate(&config)?;
        let mut mount = Self::build(config, ra, dec, st4)?;
        mount.config_valid = true;
        // Cannot fail: the buffer is layout-sized.
        let _ = store::save(&mount.current_config(), &mut mount.nv_image);
        Ok(mount)
    }

    /// Build a mount from a persisted configuration image.
    ///
    /// An unreadable or invalid image is not fatal: the mount comes up in
    /// programming mode with defaults, rejecting motion commands until it
    /// is reconfigured.
    pub fn from_image(image: &[u8], ra: RA, dec: DC, st4: ST4) -> Result<Self, Error> {
        match store::load(image) {
            Ok(config) => Self::new(config, ra, dec, st4),
            Err(_) => {
                let mut mount = Self::build(MountConfig::default(), ra, dec, st4)?;
                mount.prog_mode = PROG_VALIDATE;
                mount.config_valid = false;
                Ok(mount)
            }
        }
    }

    fn build(config: MountConfig, ra: RA, dec: DC, st4: ST4) -> Result<Self, Error> {
        let mode_map = build_mode_map(config.microsteps, config.driver);
        let default_fast = config.default_fast_mode();

        let mut ra = Axis::new(&config.ra, ra).map_err(Error::Motor)?;
        let mut dec = Axis::new(&config.dec, dec).map_err(Error::Motor)?;

        // Power-on microstep pattern.
        let initial = mode_map[usize::from(default_fast)];
        ra.apply_mode_pins(initial).map_err(Error::Motor)?;
        dec.apply_mode_pins(initial).map_err(Error::Motor)?;

        let st4_speeds = St4Speeds::guide(
            config.ra.sidereal_period,
            config.dec.sidereal_period,
        );

        Ok(Self {
            ra,
            dec,
            st4,
            parser: PacketParser::new(),
            ready: [ReadyToGo::Idle; 2],
            accel_cursor: [0; 2],
            prog_mode: PROG_RUN,
            config_valid: false,
            run_mode: RunMode::Eqmod,
            st4_active: true,
            hc_fast: false,
            loop_count: 0,
            reset_armed: false,
            driver: config.driver,
            microsteps: config.microsteps,
            gear_change: config.gear_change,
            advanced_hc_detect: config.advanced_hc_detect,
            can_high_speed: config.can_high_speed(),
            default_fast,
            high_speed_factor: config.high_speed_factor(),
            mode_map,
            st4_speeds,
            nv_image: [0; store::IMAGE_LEN],
        })
    }

    /// Forward one axis timer capture interrupt to its step engine.
    #[inline]
    pub fn capture(&mut self, axis: AxisId) -> Result<(), MotorError> {
        with_axis!(self, axis, |ax| ax.capture_event())
    }

    /// Whether an axis timer would fire capture interrupts.
    #[inline]
    pub fn timer_armed(&self, axis: AxisId) -> bool {
        match axis {
            AxisId::Ra => self.ra.timer_armed(),
            AxisId::Dec => self.dec.timer_armed(),
        }
    }

    /// The right ascension axis.
    #[inline]
    pub fn ra(&self) -> &Axis<RA> {
        &self.ra
    }

    /// The declination axis.
    #[inline]
    pub fn dec(&self) -> &Axis<DC> {
        &self.dec
    }

    /// Mutable access to the ST4 port, for embedders that share it with
    /// other duties and for host-side simulations.
    #[inline]
    pub fn st4_mut(&mut self) -> &mut ST4 {
        &mut self.st4
    }

    /// Absolute position of an axis.
    #[inline]
    pub fn position(&self, axis: AxisId) -> Position {
        match axis {
            AxisId::Ra => self.ra.position(),
            AxisId::Dec => self.dec.position(),
        }
    }

    /// Whether an axis is idle.
    #[inline]
    pub fn stopped(&self, axis: AxisId) -> bool {
        match axis {
            AxisId::Ra => self.ra.stopped(),
            AxisId::Dec => self.dec.stopped(),
        }
    }

    /// Mode the supervisor is running in.
    #[inline]
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Whether the live configuration has passed the boot checks. False
    /// means the mount is stuck in programming mode until reconfigured.
    #[inline]
    pub fn config_valid(&self) -> bool {
        self.config_valid
    }

    /// True after an `R` command: the embedder should arm the watchdog for
    /// a 120 ms reset.
    #[inline]
    pub fn reset_requested(&self) -> bool {
        self.reset_armed
    }

    /// The persisted configuration image, refreshed by the `T` store
    /// command. The embedder writes it to non-volatile memory.
    #[inline]
    pub fn persisted_image(&self) -> &[u8; store::IMAGE_LEN] {
        &self.nv_image
    }

    /// Snapshot of the live configuration.
    pub fn current_config(&self) -> MountConfig {
        MountConfig {
            ra: self.ra.current_config(),
            dec: self.dec.current_config(),
            driver: self.driver,
            microsteps: self.microsteps,
            gear_change: self.gear_change,
            advanced_hc_detect: self.advanced_hc_detect,
        }
    }

    /// Recentre both axes, as on standalone-mode entry.
    pub(crate) fn recentre(&mut self) {
        self.ra.set_position(Position::new(POSITION_CENTER));
        self.dec.set_position(Position::new(POSITION_CENTER));
    }
}
