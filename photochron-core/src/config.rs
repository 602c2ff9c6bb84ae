//! Configuration type definitions
//!
//! All tunables are compile-time or boot-time constants; there is no
//! CLI, file or network configuration surface.

use crate::hysteresis::ThresholdSet;

/// Moving average window length, in samples
pub const FILTER_WINDOW: usize = 8;

/// Edge channel capacity per monitored line (usable slots are one less)
pub const EDGE_CHANNEL_CAPACITY: usize = 512;

/// Boot-time measurement configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasureConfig {
    /// ADC sampling period in microseconds (20 us - 1 ms is sensible)
    pub sample_period_us: u32,
    /// Sensor debounce separation as a fraction of one capture-clock
    /// second: `capture_hz / debounce_divisor` ticks
    pub debounce_divisor: u32,
    /// Thresholds in effect until the first successful calibration
    pub default_thresholds: ThresholdSet,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            sample_period_us: 100,
            debounce_divisor: 8,
            // Centered defaults for a 12-bit ADC; replaced by calibration
            default_thresholds: ThresholdSet::new(1200, 1400, 2600, 2900),
        }
    }
}
