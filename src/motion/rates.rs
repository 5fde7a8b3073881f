//! Dithered timer-period tables.
//!
//! The 16-bit axis timers quantise the sidereal step period to whole timer
//! ticks, which at typical rates is a ~0.3% error — enough to smear stars
//! over a long exposure. Instead of one period the engine cycles through 32
//! nearby periods whose sum is the exact ideal total, cutting the effective
//! quantisation error by 32x.

use libm::ceilf;

/// Timer count rate in Hz. Both axis timers count at this fixed rate.
pub const TIMER_HZ: u32 = 8_000_000;

/// Number of slots the fractional remainder is dithered across.
pub const RATE_SLOTS: usize = 32;

/// Smallest period the timer is allowed to run at.
pub const MIN_PERIOD: u16 = 128;

/// Largest representable timer period.
pub const MAX_PERIOD: u16 = 65535;

/// A 32-slot table of timer top values traversed cyclically by the step
/// engine, one slot per completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    periods: [u16; RATE_SLOTS],
}

impl RateTable {
    /// Build the table for a divisor: the ideal (generally fractional)
    /// period is `TIMER_HZ / divisor` timer ticks.
    ///
    /// The integer quotient fills every slot; the remainder is converted to
    /// a count of extra ticks per 32 steps and those are spread across the
    /// table at ceiling-rounded, equally spaced offsets. Dividing a small
    /// remainder by the divisor keeps the float step accurate where a
    /// single large division would not be.
    pub fn from_divisor(divisor: u32) -> Self {
        debug_assert!(divisor > 0);
        let quotient = TIMER_HZ / divisor;
        let remainder = TIMER_HZ % divisor;

        let fractional = remainder as f32 / divisor as f32;
        let extra = (fractional * RATE_SLOTS as f32 + 0.5) as u32;

        let base = if quotient > MAX_PERIOD as u32 {
            MAX_PERIOD
        } else if quotient < MIN_PERIOD as u32 {
            MIN_PERIOD
        } else {
            quotient as u16
        };

        let mut periods = [base; RATE_SLOTS];

        // Spread the extra ticks evenly over the table.
        for i in 0..extra {
            let offset = i as f32 * RATE_SLOTS as f32 / extra as f32;
            let index = ceilf(offset) as usize;
            debug_assert!(index < RATE_SLOTS);
            periods[index % RATE_SLOTS] = periods[index % RATE_SLOTS].saturating_add(1);
        }

        Self { periods }
    }

    /// Period for a dither slot; the slot index wraps at the table size.
    #[inline]
    pub fn period(&self, slot: usize) -> u16 {
        self.periods[slot & (RATE_SLOTS - 1)]
    }

    /// The raw slot array.
    #[inline]
    pub fn periods(&self) -> &[u16; RATE_SLOTS] {
        &self.periods
    }

    /// Total ticks across one full traversal of the table.
    pub fn total_ticks(&self) -> u32 {
        self.periods.iter().map(|&p| p as u32).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ideal_total(divisor: u32) -> u32 {
        // round(32 * TIMER_HZ / divisor)
        let scaled = RATE_SLOTS as u64 * TIMER_HZ as u64;
        ((scaled + divisor as u64 / 2) / divisor as u64) as u32
    }

    #[test]
    fn exact_divisor_needs_no_dither() {
        // 8e6 / 40000 = 200 exactly
        let table = RateTable::from_divisor(40_000);
        assert!(table.periods().iter().all(|&p| p == 200));
        assert_eq!(table.total_ticks(), 32 * 200);
    }

    #[test]
    fn total_matches_ideal_within_one() {
        for divisor in [
            26_041u32, 40_000, 40_017, 93_750, 123_457, 280_481, 999_983,
        ] {
            let table = RateTable::from_divisor(divisor);
            let ideal = ideal_total(divisor);
            let total = table.total_ticks();
            let diff = total.abs_diff(ideal);
            assert!(diff <= 1, "divisor {}: total {} ideal {}", divisor, total, ideal);
        }
    }

    #[test]
    fn entries_stay_within_bounds() {
        for divisor in [2u32, 100, 40_017, 10_000_000, 80_000_000] {
            let table = RateTable::from_divisor(divisor);
            for &p in table.periods() {
                assert!((MIN_PERIOD..=MAX_PERIOD).contains(&p));
            }
        }
    }

    #[test]
    fn slow_rate_clamps_to_max_period() {
        // 8e6 / 2 would need a 22-bit period
        let table = RateTable::from_divisor(2);
        assert!(table.periods().iter().all(|&p| p == MAX_PERIOD));
    }

    #[test]
    fn fast_rate_clamps_to_min_period() {
        let table = RateTable::from_divisor(TIMER_HZ);
        assert!(table.periods().iter().all(|&p| p >= MIN_PERIOD));
    }

    #[test]
    fn dither_never_off_by_more_than_one_tick() {
        let table = RateTable::from_divisor(40_017);
        let base = 8_000_000 / 40_017;
        for &p in table.periods() {
            assert!(p as u32 == base || p as u32 == base + 1);
        }
    }
}
