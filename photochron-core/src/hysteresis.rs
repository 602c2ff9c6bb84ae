//! Hysteresis state machine for the analog photosensor
//!
//! A single switching threshold would chatter under sensor noise. The
//! transition is instead split through an intermediate holding state that
//! only confirms once the average reaches the far threshold band, so each
//! physical transition produces exactly one virtual edge. The edge is
//! emitted the moment the signal is unambiguously heading to its new
//! level, which is earlier than waiting for the final threshold.

use crate::capture::EdgeDirection;

/// Logical state of the sensor line as seen by the state machine
///
/// `Unknown` is only valid at power-on and is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorLevel {
    /// No confirmed level yet (initial state)
    Unknown,
    /// Confirmed bright (white region visible)
    High,
    /// Confirmed dark (black region visible)
    Low,
    /// Leaving High, falling transition not yet confirmed
    IntermediateHL,
    /// Leaving Low, rising transition not yet confirmed
    IntermediateLH,
}

/// The four raw-sample levels bounding the hysteresis band
///
/// Invariant: `intermediate_to_low < low_to_intermediate <=
/// high_to_intermediate < intermediate_to_high`, a non-overlapping band
/// straddling the switching point. Set once at boot with defaults and
/// replaced atomically by the calibration controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThresholdSet {
    /// Below this, an in-progress falling transition confirms Low
    pub intermediate_to_low: u16,
    /// Above this, a confirmed Low starts a rising transition
    pub low_to_intermediate: u16,
    /// Below this, a confirmed High starts a falling transition
    pub high_to_intermediate: u16,
    /// Above this, an in-progress rising transition confirms High
    pub intermediate_to_high: u16,
}

impl ThresholdSet {
    /// Create a threshold set without validation
    pub const fn new(
        intermediate_to_low: u16,
        low_to_intermediate: u16,
        high_to_intermediate: u16,
        intermediate_to_high: u16,
    ) -> Self {
        Self {
            intermediate_to_low,
            low_to_intermediate,
            high_to_intermediate,
            intermediate_to_high,
        }
    }

    /// Check the non-overlapping band ordering invariant
    pub const fn is_valid(&self) -> bool {
        self.intermediate_to_low < self.low_to_intermediate
            && self.low_to_intermediate <= self.high_to_intermediate
            && self.high_to_intermediate < self.intermediate_to_high
    }

    /// Pack into one word for a single-store atomic publish
    ///
    /// The whole set must cross the task/interrupt boundary as one
    /// atomic write so the sampler never observes a half-updated set.
    pub const fn to_bits(&self) -> u64 {
        (self.intermediate_to_low as u64)
            | (self.low_to_intermediate as u64) << 16
            | (self.high_to_intermediate as u64) << 32
            | (self.intermediate_to_high as u64) << 48
    }

    /// Unpack a set previously packed with [`to_bits`](Self::to_bits)
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            intermediate_to_low: bits as u16,
            low_to_intermediate: (bits >> 16) as u16,
            high_to_intermediate: (bits >> 32) as u16,
            intermediate_to_high: (bits >> 48) as u16,
        }
    }
}

/// Hysteresis detector fed once per sampling tick
///
/// Maps the current moving average into a [`SensorLevel`] and reports
/// confirmed transitions as virtual edges. O(1) and allocation-free, fit
/// for the periodic sampling interrupt.
#[derive(Debug, Clone)]
pub struct HysteresisDetector {
    level: SensorLevel,
    thresholds: ThresholdSet,
}

impl HysteresisDetector {
    /// Create a detector in the `Unknown` state
    pub const fn new(thresholds: ThresholdSet) -> Self {
        Self {
            level: SensorLevel::Unknown,
            thresholds,
        }
    }

    /// Current state of the sensor line
    pub const fn level(&self) -> SensorLevel {
        self.level
    }

    /// Thresholds currently in effect
    pub const fn thresholds(&self) -> ThresholdSet {
        self.thresholds
    }

    /// Install a freshly calibrated threshold set
    ///
    /// Takes effect from the next call to [`sample`](Self::sample); the
    /// current level is kept.
    pub fn apply_thresholds(&mut self, thresholds: ThresholdSet) {
        self.thresholds = thresholds;
    }

    /// Evaluate one filtered sample
    ///
    /// Returns the direction of a confirmed transition, to be stamped
    /// with the hardware time of this tick and emitted as a virtual
    /// sensor edge. All other ticks return `None`.
    pub fn sample(&mut self, average: u16) -> Option<EdgeDirection> {
        let t = &self.thresholds;
        match self.level {
            SensorLevel::Unknown => {
                if average <= t.intermediate_to_low {
                    self.level = SensorLevel::Low;
                } else if average >= t.intermediate_to_high {
                    self.level = SensorLevel::High;
                }
                None
            }
            SensorLevel::High => {
                if average <= t.high_to_intermediate {
                    self.level = SensorLevel::IntermediateHL;
                }
                None
            }
            SensorLevel::IntermediateHL => {
                if average <= t.intermediate_to_low {
                    self.level = SensorLevel::Low;
                    return Some(EdgeDirection::Falling);
                }
                None
            }
            SensorLevel::Low => {
                if average >= t.low_to_intermediate {
                    self.level = SensorLevel::IntermediateLH;
                }
                None
            }
            SensorLevel::IntermediateLH => {
                if average >= t.intermediate_to_high {
                    self.level = SensorLevel::High;
                    return Some(EdgeDirection::Rising);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const THRESHOLDS: ThresholdSet = ThresholdSet::new(120, 140, 420, 460);

    fn detector_at(level: SensorLevel) -> HysteresisDetector {
        let mut detector = HysteresisDetector::new(THRESHOLDS);
        let steps: &[u16] = match level {
            SensorLevel::Unknown => &[],
            SensorLevel::High => &[500],
            SensorLevel::Low => &[100],
            SensorLevel::IntermediateHL => &[500, 400],
            SensorLevel::IntermediateLH => &[100, 200],
        };
        for &sample in steps {
            assert_eq!(detector.sample(sample), None);
        }
        assert_eq!(detector.level(), level);
        detector
    }

    #[test]
    fn test_unknown_resolves_at_band_edges() {
        let mut detector = HysteresisDetector::new(THRESHOLDS);
        // Samples inside the band leave the state undecided
        assert_eq!(detector.sample(300), None);
        assert_eq!(detector.level(), SensorLevel::Unknown);

        assert_eq!(detector.sample(460), None);
        assert_eq!(detector.level(), SensorLevel::High);

        let mut detector = HysteresisDetector::new(THRESHOLDS);
        assert_eq!(detector.sample(120), None);
        assert_eq!(detector.level(), SensorLevel::Low);
    }

    #[test]
    fn test_single_edge_per_ramp_cycle() {
        let mut detector = detector_at(SensorLevel::Low);
        let mut rising = 0;
        let mut falling = 0;

        // Ramp from below the band to above it and back
        let up = (100..=500).step_by(10);
        let down = (100..=500).rev().step_by(10);
        for average in up.chain(down) {
            match detector.sample(average) {
                Some(EdgeDirection::Rising) => rising += 1,
                Some(EdgeDirection::Falling) => falling += 1,
                None => {}
            }
        }

        assert_eq!(rising, 1);
        assert_eq!(falling, 1);
        assert_eq!(detector.level(), SensorLevel::Low);
    }

    #[test]
    fn test_retreat_from_intermediate_emits_nothing() {
        // Dip out of High into the band, then recover without reaching
        // the far threshold: no edge may be reported
        let mut detector = detector_at(SensorLevel::High);
        assert_eq!(detector.sample(400), None);
        assert_eq!(detector.level(), SensorLevel::IntermediateHL);
        for _ in 0..100 {
            assert_eq!(detector.sample(450), None);
        }
        // The eventual confirmed fall still produces exactly one edge
        assert_eq!(detector.sample(110), Some(EdgeDirection::Falling));
        assert_eq!(detector.level(), SensorLevel::Low);
    }

    #[test]
    fn test_threshold_bits_round_trip() {
        let bits = THRESHOLDS.to_bits();
        assert_eq!(ThresholdSet::from_bits(bits), THRESHOLDS);
    }

    #[test]
    fn test_threshold_ordering_validation() {
        assert!(THRESHOLDS.is_valid());
        // Equal inner thresholds are allowed
        assert!(ThresholdSet::new(100, 200, 200, 300).is_valid());
        // Collapsed or inverted bands are not
        assert!(!ThresholdSet::new(200, 200, 300, 400).is_valid());
        assert!(!ThresholdSet::new(100, 300, 200, 400).is_valid());
        assert!(!ThresholdSet::new(100, 100, 100, 100).is_valid());
    }

    proptest! {
        /// Samples confined to the hysteresis band, never reaching the
        /// far bound, never produce an edge
        #[test]
        fn prop_no_chatter_inside_band(
            samples in prop::collection::vec(121u16..=419, 1..200),
            start_high in any::<bool>(),
        ) {
            let start = if start_high { SensorLevel::High } else { SensorLevel::Low };
            let mut detector = detector_at(start);
            for sample in samples {
                prop_assert_eq!(detector.sample(sample), None);
            }
        }

        /// A full ramp cycle from an arbitrary noise floor emits exactly
        /// one rising and one falling edge
        #[test]
        fn prop_single_edge_per_transition(
            noise in prop::collection::vec(140u16..=420, 0..50),
        ) {
            let mut detector = detector_at(SensorLevel::Low);
            let mut edges = heapless::Vec::<EdgeDirection, 8>::new();

            // Two ticks at each extreme: one may only enter the
            // intermediate state, the next confirms
            for &sample in noise.iter().chain(&[500, 500]) {
                if let Some(edge) = detector.sample(sample) {
                    edges.push(edge).unwrap();
                }
            }
            for &sample in noise.iter().chain(&[100, 100]) {
                if let Some(edge) = detector.sample(sample) {
                    edges.push(edge).unwrap();
                }
            }

            prop_assert_eq!(edges.as_slice(), &[EdgeDirection::Rising, EdgeDirection::Falling]);
        }
    }
}
