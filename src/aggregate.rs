//! Windowed aggregation of sensor readings
//!
//! Readings are accumulated over a count-based window; when the window
//! fills, a `Summary` with truncating means and sample variances is emitted
//! and the window resets. The reset is committed at fill time, before the
//! caller attempts delivery, so a failed broadcast never replays a window.

use crate::error::{Error, Result};
use crate::protocol::{Reading, Summary};
use log::warn;

/// Safety ceiling on the sample count, independent of the configured
/// window capacity. If the window somehow never fills (capacity
/// misconfigured above the ceiling), the history is discarded rather than
/// allowed to grow without bound.
pub const HARD_SAMPLE_LIMIT: u16 = 4096;

/// Count-based window aggregator
///
/// Owns all window state; the single `intake` operation is the only way to
/// mutate it. No I/O, deterministic for a given input sequence.
#[derive(Debug)]
pub struct Aggregator {
    capacity: u16,
    sum25: u32,
    sum10: u32,
    history25: Vec<u16>,
    history10: Vec<u16>,
    sensor_id: [u8; 2],
}

impl Aggregator {
    /// Create an aggregator emitting one summary per `capacity` readings
    ///
    /// A capacity below 2 is rejected: the sample variance divides by
    /// `count - 1`.
    pub fn new(capacity: u16) -> Result<Self> {
        if capacity < 2 {
            return Err(Error::InvalidParameter(format!(
                "window of {capacity} samples cannot produce a variance (minimum 2)"
            )));
        }
        Ok(Self {
            capacity,
            sum25: 0,
            sum10: 0,
            history25: Vec::with_capacity(capacity as usize),
            history10: Vec::with_capacity(capacity as usize),
            sensor_id: [0; 2],
        })
    }

    /// Configured window capacity
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Readings accumulated in the current window
    pub fn count(&self) -> u16 {
        self.history25.len() as u16
    }

    /// Consume one reading; returns a summary exactly on the intake that
    /// fills the window
    pub fn intake(&mut self, reading: &Reading) -> Option<Summary> {
        self.sum25 += u32::from(reading.pm25);
        self.sum10 += u32::from(reading.pm10);
        self.history25.push(reading.pm25);
        self.history10.push(reading.pm10);
        self.sensor_id = reading.id;

        let count = self.count();
        if count == self.capacity {
            let summary = self.summarize(count);
            self.reset();
            return Some(summary);
        }
        if count >= HARD_SAMPLE_LIMIT {
            warn!(
                "window never filled after {} samples (capacity {}), discarding",
                count, self.capacity
            );
            self.reset();
        }
        None
    }

    fn summarize(&self, count: u16) -> Summary {
        // The mean of u16 samples always fits a u16.
        let mean25 = (self.sum25 / u32::from(count)) as u16;
        let mean10 = (self.sum10 / u32::from(count)) as u16;
        Summary {
            mean25,
            mean10,
            variance25: sample_variance(&self.history25, mean25),
            variance10: sample_variance(&self.history10, mean10),
            samples: count,
            id: self.sensor_id,
        }
    }

    fn reset(&mut self) {
        self.sum25 = 0;
        self.sum10 = 0;
        self.history25.clear();
        self.history10.clear();
    }
}

/// Sample variance `Σ(x − mean)² / (count − 1)`, truncating
///
/// Deviations are signed so a sample below the mean cannot underflow.
/// Saturates at `u16::MAX` for the wire field.
fn sample_variance(history: &[u16], mean: u16) -> u16 {
    debug_assert!(history.len() >= 2);
    let sum_sq: u64 = history
        .iter()
        .map(|&x| {
            let dev = i64::from(x) - i64::from(mean);
            (dev * dev) as u64
        })
        .sum();
    let variance = sum_sq / (history.len() as u64 - 1);
    u16::try_from(variance).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(pm25: u16, pm10: u16) -> Reading {
        Reading {
            pm25,
            pm10,
            id: [0x01, 0x02],
        }
    }

    #[test]
    fn test_rejects_degenerate_capacity() {
        assert!(Aggregator::new(0).is_err());
        assert!(Aggregator::new(1).is_err());
        assert!(Aggregator::new(2).is_ok());
    }

    #[test]
    fn test_two_sample_window() {
        let mut agg = Aggregator::new(2).unwrap();
        assert_eq!(agg.intake(&reading(5, 10)), None);
        let summary = agg.intake(&reading(7, 20)).unwrap();
        assert_eq!(summary.mean25, 6);
        assert_eq!(summary.mean10, 15);
        assert_eq!(summary.variance25, 2);
        assert_eq!(summary.variance10, 50);
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.id, [0x01, 0x02]);
        assert_eq!(agg.count(), 0);
    }

    #[test]
    fn test_emits_exactly_at_capacity() {
        let mut agg = Aggregator::new(3).unwrap();
        assert_eq!(agg.intake(&reading(1, 1)), None);
        assert_eq!(agg.intake(&reading(1, 1)), None);
        assert!(agg.intake(&reading(1, 1)).is_some());
        // The next window starts from scratch: no second emission.
        assert_eq!(agg.intake(&reading(1, 1)), None);
        assert_eq!(agg.count(), 1);
    }

    #[test]
    fn test_identical_readings_have_zero_variance() {
        let mut agg = Aggregator::new(4).unwrap();
        for _ in 0..3 {
            assert_eq!(agg.intake(&reading(42, 17)), None);
        }
        let summary = agg.intake(&reading(42, 17)).unwrap();
        assert_eq!(summary.mean25, 42);
        assert_eq!(summary.mean10, 17);
        assert_eq!(summary.variance25, 0);
        assert_eq!(summary.variance10, 0);
    }

    #[test]
    fn test_mean_truncates() {
        let mut agg = Aggregator::new(2).unwrap();
        agg.intake(&reading(1, 0));
        let summary = agg.intake(&reading(2, 1)).unwrap();
        // 3 / 2 truncates to 1, no rounding
        assert_eq!(summary.mean25, 1);
        assert_eq!(summary.mean10, 0);
    }

    #[test]
    fn test_window_isolation_after_emission() {
        let mut agg = Aggregator::new(2).unwrap();
        agg.intake(&reading(0, 0));
        let first = agg.intake(&reading(0, 0)).unwrap();
        assert_eq!(first.mean25, 0);

        // Second window must not be contaminated by the first.
        agg.intake(&reading(10, 10));
        let second = agg.intake(&reading(20, 30)).unwrap();
        assert_eq!(second.mean25, 15);
        assert_eq!(second.mean10, 20);
        assert_eq!(second.samples, 2);
    }

    #[test]
    fn test_hard_limit_forces_reset_without_emission() {
        // Capacity above the ceiling: the window can never fill, so the
        // safeguard must discard the history instead.
        let mut agg = Aggregator::new(HARD_SAMPLE_LIMIT + 1).unwrap();
        for _ in 0..HARD_SAMPLE_LIMIT {
            assert_eq!(agg.intake(&reading(3, 4)), None);
        }
        assert_eq!(agg.count(), 0);
    }

    #[test]
    fn test_variance_saturates_at_field_width() {
        let mut agg = Aggregator::new(2).unwrap();
        agg.intake(&reading(0, 0));
        let summary = agg.intake(&reading(u16::MAX, 0)).unwrap();
        // (32767² + 32768²) / 1 far exceeds a u16
        assert_eq!(summary.variance25, u16::MAX);
    }
}
