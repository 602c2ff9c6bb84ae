//! Calibration controller for the hysteresis thresholds
//!
//! While a calibration run is active the controller watches the filtered
//! sensor value and records its extremes; the display is expected to
//! blink through both levels during the run. Finishing the run derives
//! the four hysteresis thresholds from the observed range.

use crate::hysteresis::ThresholdSet;

/// Threshold positions within the observed range, in percent
const INTERMEDIATE_TO_LOW_PCT: u32 = 5;
const LOW_TO_INTERMEDIATE_PCT: u32 = 10;
const HIGH_TO_INTERMEDIATE_PCT: u32 = 80;
const INTERMEDIATE_TO_HIGH_PCT: u32 = 95;

/// Calibration run phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// Not calibrating; thresholds unchanged
    Idle,
    /// Accumulating min/max of the filtered sensor value
    Calibrating,
}

/// Why a calibration run produced no threshold set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// No run was in progress
    NotCalibrating,
    /// The sensor value never moved enough to derive an ordered,
    /// non-overlapping threshold band
    DegenerateRange,
}

/// Min/max accumulator that turns an observed sensor range into a
/// [`ThresholdSet`]
///
/// State machine: `Idle -> Calibrating -> Idle`. The accumulator is
/// reset on every [`begin`](Self::begin) and consumed by
/// [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct Calibrator {
    phase: CalibrationPhase,
    min: u16,
    max: u16,
}

impl Calibrator {
    /// Create an idle calibrator
    pub const fn new() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            min: u16::MAX,
            max: 0,
        }
    }

    /// Current phase
    pub const fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Whether a run is in progress
    pub const fn is_calibrating(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Calibrating)
    }

    /// Start a run, discarding any previous accumulator
    pub fn begin(&mut self) {
        self.phase = CalibrationPhase::Calibrating;
        self.min = u16::MAX;
        self.max = 0;
    }

    /// Feed one filtered sensor sample into the accumulator
    ///
    /// O(1); ignored while idle.
    pub fn observe(&mut self, raw: u16) {
        if self.phase == CalibrationPhase::Calibrating {
            self.min = self.min.min(raw);
            self.max = self.max.max(raw);
        }
    }

    /// Extremes observed so far, if any sample was seen
    pub fn observed_range(&self) -> Option<(u16, u16)> {
        (self.min <= self.max).then_some((self.min, self.max))
    }

    /// End the run and derive thresholds from the observed range
    ///
    /// A range too narrow for a valid band (including a sensor that
    /// never moved at all) is reported as
    /// [`CalibrationError::DegenerateRange`] so the caller can keep the
    /// previous thresholds instead of installing unusable ones.
    pub fn finish(&mut self) -> Result<ThresholdSet, CalibrationError> {
        if self.phase != CalibrationPhase::Calibrating {
            return Err(CalibrationError::NotCalibrating);
        }
        self.phase = CalibrationPhase::Idle;

        if self.min > self.max {
            // No sample ever observed
            return Err(CalibrationError::DegenerateRange);
        }

        let min = self.min as u32;
        let range = (self.max - self.min) as u32;
        let at = |pct: u32| (min + range * pct / 100) as u16;

        let thresholds = ThresholdSet::new(
            at(INTERMEDIATE_TO_LOW_PCT),
            at(LOW_TO_INTERMEDIATE_PCT),
            at(HIGH_TO_INTERMEDIATE_PCT),
            at(INTERMEDIATE_TO_HIGH_PCT),
        );

        if !thresholds.is_valid() {
            return Err(CalibrationError::DegenerateRange);
        }
        Ok(thresholds)
    }

    /// Abort a run, discarding the accumulator
    pub fn abort(&mut self) {
        self.phase = CalibrationPhase::Idle;
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new()
    }
}
