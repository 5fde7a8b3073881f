//! The persisted configuration image.
//!
//! A fixed 80-byte layout, written by the configuration utility over the
//! programming commands and read once at boot. The backing memory (EEPROM,
//! flash page, file) is the embedder's concern; this module only encodes
//! and decodes the byte image.

use crate::error::ConfigError;
use crate::motion::{AccelEntry, AccelTable, ACCEL_TABLE_LEN};

use super::axis::AxisConfig;
use super::mount::{DriverFamily, MountConfig};
use super::validation;

/// Identification string at the start of a valid image.
pub const MAGIC: &[u8; 8] = b"AstroEQ\0";

/// Total size of the image.
pub const IMAGE_LEN: usize = 80;

// Field offsets.
const MAGIC_AT: usize = 0;
const A_VAL_AT: [usize; 2] = [8, 12];
const B_VAL_AT: [usize; 2] = [16, 20];
const S_VAL_AT: [usize; 2] = [24, 28];
const REVERSE_AT: [usize; 2] = [32, 33];
const DRIVER_AT: usize = 34;
const MICROSTEPS_AT: usize = 35;
const GOTO_AT: [usize; 2] = [36, 37];
const SIDEREAL_AT: [usize; 2] = [38, 40];
const GEAR_CHANGE_AT: usize = 42;
const ADV_HC_AT: usize = 43;
const ACCEL_AT: [usize; 2] = [44, 62];
const ACCEL_BYTES: usize = 3 * ACCEL_TABLE_LEN;

/// Decode and validate a configuration image.
///
/// # Errors
///
/// Returns an error for a short image, a missing magic, or any value the
/// boot checks reject — see [`validation::validate`].
pub fn load(image: &[u8]) -> Result<MountConfig, ConfigError> {
    if image.len() < IMAGE_LEN {
        return Err(ConfigError::ImageTooShort {
            expected: IMAGE_LEN,
            actual: image.len(),
        });
    }
    if &image[MAGIC_AT..MAGIC_AT + 8] != MAGIC {
        return Err(ConfigError::BadMagic);
    }

    let driver = DriverFamily::from_code(image[DRIVER_AT])
        .ok_or(ConfigError::UnknownDriver(image[DRIVER_AT]))?;

    let config = MountConfig {
        ra: load_axis(image, 0)?,
        dec: load_axis(image, 1)?,
        driver,
        microsteps: image[MICROSTEPS_AT],
        gear_change: image[GEAR_CHANGE_AT] != 0,
        advanced_hc_detect: image[ADV_HC_AT] != 0,
    };

    validation::validate(&config)?;
    Ok(config)
}

fn load_axis(image: &[u8], index: usize) -> Result<AxisConfig, ConfigError> {
    let mut entries = [AccelEntry { period: 0, repeats: 0 }; ACCEL_TABLE_LEN];
    let base = ACCEL_AT[index];
    for (i, entry) in entries.iter_mut().enumerate() {
        let at = base + 3 * i;
        entry.period = read_u16(image, at);
        entry.repeats = image[at + 2];
    }

    Ok(AxisConfig {
        steps_per_rev: read_u32(image, A_VAL_AT[index]),
        sidereal_divisor: read_u32(image, B_VAL_AT[index]),
        worm_steps: read_u32(image, S_VAL_AT[index]),
        sidereal_period: read_u16(image, SIDEREAL_AT[index]),
        goto_period: image[GOTO_AT[index]],
        reverse: image[REVERSE_AT[index]] != 0,
        accel: AccelTable::new(entries)?,
    })
}

/// Encode a configuration into its image.
///
/// # Errors
///
/// Returns [`ConfigError::ImageTooShort`] when the target buffer is too
/// small. The configuration itself is written as-is; run
/// [`validation::validate`] first if it is untrusted.
pub fn save(config: &MountConfig, image: &mut [u8]) -> Result<(), ConfigError> {
    if image.len() < IMAGE_LEN {
        return Err(ConfigError::ImageTooShort {
            expected: IMAGE_LEN,
            actual: image.len(),
        });
    }

    image[MAGIC_AT..MAGIC_AT + 8].copy_from_slice(MAGIC);
    save_axis(&config.ra, image, 0);
    save_axis(&config.dec, image, 1);
    image[DRIVER_AT] = config.driver.code();
    image[MICROSTEPS_AT] = config.microsteps;
    image[GEAR_CHANGE_AT] = u8::from(config.gear_change);
    image[ADV_HC_AT] = u8::from(config.advanced_hc_detect);
    Ok(())
}

/// Write just the magic, turning a blank image into a rebuildable one (the
/// `T` rebuild command).
pub fn write_magic(image: &mut [u8]) -> Result<(), ConfigError> {
    if image.len() < MAGIC_AT + 8 {
        return Err(ConfigError::ImageTooShort {
            expected: IMAGE_LEN,
            actual: image.len(),
        });
    }
    image[MAGIC_AT..MAGIC_AT + 8].copy_from_slice(MAGIC);
    Ok(())
}

fn save_axis(axis: &AxisConfig, image: &mut [u8], index: usize) {
    write_u32(image, A_VAL_AT[index], axis.steps_per_rev);
    write_u32(image, B_VAL_AT[index], axis.sidereal_divisor);
    write_u32(image, S_VAL_AT[index], axis.worm_steps);
    image[REVERSE_AT[index]] = u8::from(axis.reverse);
    image[GOTO_AT[index]] = axis.goto_period;
    write_u16(image, SIDEREAL_AT[index], axis.sidereal_period);

    let base = ACCEL_AT[index];
    for i in 0..ACCEL_TABLE_LEN {
        let entry = axis.accel.entry(i);
        let at = base + 3 * i;
        write_u16(image, at, entry.period);
        image[at + 2] = entry.repeats;
    }
    debug_assert!(base + ACCEL_BYTES <= IMAGE_LEN);
}

#[inline]
fn read_u16(image: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([image[at], image[at + 1]])
}

#[inline]
fn read_u32(image: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([image[at], image[at + 1], image[at + 2], image[at + 3]])
}

#[inline]
fn write_u16(image: &mut [u8], at: usize, value: u16) {
    image[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn write_u32(image: &mut [u8], at: usize, value: u32) {
    image[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut config = MountConfig::default();
        config.ra.steps_per_rev = 0x25_8000;
        config.ra.reverse = true;
        config.dec.sidereal_period = 437;
        config.microsteps = 32;
        config.advanced_hc_detect = true;

        let mut image = [0u8; IMAGE_LEN];
        save(&config, &mut image).unwrap();
        let restored = load(&image).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn blank_image_has_no_magic() {
        let image = [0u8; IMAGE_LEN];
        assert_eq!(load(&image), Err(ConfigError::BadMagic));
    }

    #[test]
    fn short_image_rejected() {
        let image = [0u8; 10];
        assert!(matches!(
            load(&image),
            Err(ConfigError::ImageTooShort { .. })
        ));
    }

    #[test]
    fn corrupt_driver_code_rejected() {
        let mut image = [0u8; IMAGE_LEN];
        save(&MountConfig::default(), &mut image).unwrap();
        image[DRIVER_AT] = 9;
        assert_eq!(load(&image), Err(ConfigError::UnknownDriver(9)));
    }
}
