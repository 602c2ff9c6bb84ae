//! Edge correlation and latency computation
//!
//! Consumes the merged capture event stream and pairs each qualifying
//! sensor transition with the most recent blink transition of the same
//! direction. Unmatchable edges are dropped silently: a missing or late
//! blink edge skips a measurement rather than reporting a stale one.

use crate::capture::{CaptureClock, CaptureEvent, EdgeDirection, LineSource};

/// Logical state of a monitored line as tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineLevel {
    /// No edge seen yet on this line (initial state)
    Unknown,
    High,
    Low,
}

/// Which display transition a latency value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatencyDirection {
    /// Blink rising edge to sensor rising edge
    BlackToWhite,
    /// Blink falling edge to sensor falling edge
    WhiteToBlack,
}

/// One display-to-sensor latency result
///
/// Derived, never persisted; recomputed each time a qualifying sensor
/// transition is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LatencyMeasurement {
    /// Transition this latency was measured for
    pub direction: LatencyDirection,
    /// Elapsed capture ticks between blink edge and sensor edge
    pub elapsed_ticks: u64,
}

impl LatencyMeasurement {
    /// Elapsed time in microseconds for a given capture clock
    pub fn elapsed_micros(&self, clock: CaptureClock) -> u64 {
        clock.ticks_to_micros(self.elapsed_ticks)
    }
}

/// Correlates blink and sensor edges into latency measurements
///
/// Owned entirely by the consumer task; the producers only ever hand it
/// events through the edge channel.
#[derive(Debug, Clone)]
pub struct LatencyEngine {
    blink_level: LineLevel,
    sensor_level: LineLevel,
    /// Reference timestamps for the next matching sensor edge
    blink_rising_at: Option<u64>,
    blink_falling_at: Option<u64>,
    /// Timestamp of the last accepted (debounced) sensor edge
    sensor_accepted_at: Option<u64>,
    /// Minimum separation between accepted sensor edges, in ticks
    min_separation_ticks: u64,
    latest_black_to_white: Option<u64>,
    latest_white_to_black: Option<u64>,
}

impl LatencyEngine {
    /// Create an engine with the given sensor debounce separation
    pub const fn new(min_separation_ticks: u64) -> Self {
        Self {
            blink_level: LineLevel::Unknown,
            sensor_level: LineLevel::Unknown,
            blink_rising_at: None,
            blink_falling_at: None,
            sensor_accepted_at: None,
            min_separation_ticks,
            latest_black_to_white: None,
            latest_white_to_black: None,
        }
    }

    /// Current blink line state
    pub const fn blink_level(&self) -> LineLevel {
        self.blink_level
    }

    /// Current sensor line state
    pub const fn sensor_level(&self) -> LineLevel {
        self.sensor_level
    }

    /// Most recent latency for a direction, in capture ticks
    pub const fn latest(&self, direction: LatencyDirection) -> Option<u64> {
        match direction {
            LatencyDirection::BlackToWhite => self.latest_black_to_white,
            LatencyDirection::WhiteToBlack => self.latest_white_to_black,
        }
    }

    /// Process one capture event
    ///
    /// Returns a measurement when a debounced sensor edge confirms a
    /// transition whose matching blink edge has been recorded.
    pub fn handle(&mut self, event: CaptureEvent) -> Option<LatencyMeasurement> {
        match event.source {
            LineSource::Blink => {
                self.handle_blink(event);
                None
            }
            LineSource::Sensor => self.handle_sensor(event),
        }
    }

    fn handle_blink(&mut self, event: CaptureEvent) {
        // Overwriting an unconsumed reference ages out the edge the
        // display never delivered in time
        match event.direction {
            EdgeDirection::Rising => {
                self.blink_level = LineLevel::High;
                self.blink_rising_at = Some(event.timestamp);
            }
            EdgeDirection::Falling => {
                self.blink_level = LineLevel::Low;
                self.blink_falling_at = Some(event.timestamp);
            }
        }
    }

    fn handle_sensor(&mut self, event: CaptureEvent) -> Option<LatencyMeasurement> {
        // Debounce: reject edges closer than the minimum separation to
        // the previously accepted one, regardless of direction
        if let Some(last) = self.sensor_accepted_at {
            if event.timestamp.wrapping_sub(last) < self.min_separation_ticks {
                return None;
            }
        }
        self.sensor_accepted_at = Some(event.timestamp);

        // A latency is only valid when the blink line already sits at
        // the level this sensor edge is arriving at
        match event.direction {
            EdgeDirection::Rising => {
                self.sensor_level = LineLevel::High;
                if self.blink_level == LineLevel::High {
                    self.blink_rising_at.take().map(|blink_at| {
                        let elapsed = event.timestamp.wrapping_sub(blink_at);
                        self.latest_black_to_white = Some(elapsed);
                        LatencyMeasurement {
                            direction: LatencyDirection::BlackToWhite,
                            elapsed_ticks: elapsed,
                        }
                    })
                } else {
                    None
                }
            }
            EdgeDirection::Falling => {
                self.sensor_level = LineLevel::Low;
                if self.blink_level == LineLevel::Low {
                    self.blink_falling_at.take().map(|blink_at| {
                        let elapsed = event.timestamp.wrapping_sub(blink_at);
                        self.latest_white_to_black = Some(elapsed);
                        LatencyMeasurement {
                            direction: LatencyDirection::WhiteToBlack,
                            elapsed_ticks: elapsed,
                        }
                    })
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEPARATION: u64 = 1000;

    fn blink(timestamp: u64, direction: EdgeDirection) -> CaptureEvent {
        CaptureEvent {
            source: LineSource::Blink,
            timestamp,
            direction,
        }
    }

    fn sensor(timestamp: u64, direction: EdgeDirection) -> CaptureEvent {
        CaptureEvent {
            source: LineSource::Sensor,
            timestamp,
            direction,
        }
    }

    #[test]
    fn test_rising_match_yields_black_to_white() {
        let mut engine = LatencyEngine::new(SEPARATION);

        assert_eq!(engine.handle(blink(100, EdgeDirection::Rising)), None);
        let m = engine.handle(sensor(150, EdgeDirection::Rising));
        assert_eq!(
            m,
            Some(LatencyMeasurement {
                direction: LatencyDirection::BlackToWhite,
                elapsed_ticks: 50,
            })
        );
        assert_eq!(engine.latest(LatencyDirection::BlackToWhite), Some(50));
        assert_eq!(engine.blink_level(), LineLevel::High);
        assert_eq!(engine.sensor_level(), LineLevel::High);
    }

    #[test]
    fn test_no_blink_reference_no_measurement() {
        let mut engine = LatencyEngine::new(SEPARATION);

        // First period after startup: sensor edge arrives before any
        // blink edge of that direction was seen
        assert_eq!(engine.handle(sensor(150, EdgeDirection::Rising)), None);
        assert_eq!(engine.latest(LatencyDirection::BlackToWhite), None);
        // The sensor state still updates
        assert_eq!(engine.sensor_level(), LineLevel::High);
    }

    #[test]
    fn test_wrong_blink_level_no_measurement() {
        let mut engine = LatencyEngine::new(SEPARATION);

        let _ = engine.handle(blink(100, EdgeDirection::Rising));
        let _ = engine.handle(blink(200, EdgeDirection::Falling));
        // Blink is Low now; a rising sensor edge has no valid precursor
        assert_eq!(engine.handle(sensor(5000, EdgeDirection::Rising)), None);
    }

    #[test]
    fn test_full_period() {
        let mut engine = LatencyEngine::new(SEPARATION);

        let _ = engine.handle(blink(1_000, EdgeDirection::Rising));
        let m1 = engine.handle(sensor(1_400, EdgeDirection::Rising));
        let _ = engine.handle(blink(10_000, EdgeDirection::Falling));
        let m2 = engine.handle(sensor(10_900, EdgeDirection::Falling));

        assert_eq!(m1.map(|m| m.elapsed_ticks), Some(400));
        assert_eq!(m2.map(|m| m.elapsed_ticks), Some(900));
        assert_eq!(engine.latest(LatencyDirection::BlackToWhite), Some(400));
        assert_eq!(engine.latest(LatencyDirection::WhiteToBlack), Some(900));
    }

    #[test]
    fn test_debounce_rejects_close_sensor_edges() {
        let mut engine = LatencyEngine::new(SEPARATION);

        let _ = engine.handle(blink(100, EdgeDirection::Rising));
        assert!(engine.handle(sensor(200, EdgeDirection::Rising)).is_some());

        // A bounce inside the separation window is rejected regardless
        // of direction, and does not move the acceptance reference
        assert_eq!(engine.handle(sensor(300, EdgeDirection::Falling)), None);
        assert_eq!(engine.sensor_level(), LineLevel::High);

        let _ = engine.handle(blink(5_000, EdgeDirection::Falling));
        assert!(engine.handle(sensor(5_100, EdgeDirection::Falling)).is_some());
    }

    #[test]
    fn test_blink_reference_consumed_once() {
        let mut engine = LatencyEngine::new(SEPARATION);

        let _ = engine.handle(blink(100, EdgeDirection::Rising));
        assert!(engine.handle(sensor(200, EdgeDirection::Rising)).is_some());
        // A second debounce-spaced rising edge has no fresh blink edge
        // to pair with; ambiguous measurements are dropped, not guessed
        assert_eq!(engine.handle(sensor(2_000, EdgeDirection::Rising)), None);
    }

    #[test]
    fn test_missed_blink_edge_skips_one_measurement() {
        let mut engine = LatencyEngine::new(SEPARATION);

        let _ = engine.handle(blink(100, EdgeDirection::Rising));
        let _ = engine.handle(sensor(150, EdgeDirection::Rising));
        let _ = engine.handle(blink(1_000, EdgeDirection::Falling));
        let _ = engine.handle(sensor(1_200, EdgeDirection::Falling));

        // Display misses the next rising edge entirely; the sensor edge
        // goes unmatched because blink still reads Low
        assert_eq!(engine.handle(sensor(3_000, EdgeDirection::Rising)), None);

        // The following complete period measures again
        let _ = engine.handle(blink(10_000, EdgeDirection::Falling));
        let m = engine.handle(sensor(10_300, EdgeDirection::Falling));
        assert_eq!(m.map(|m| m.elapsed_ticks), Some(300));
    }

    #[test]
    fn test_latency_across_counter_wrap() {
        let mut engine = LatencyEngine::new(SEPARATION);

        let _ = engine.handle(blink(u64::MAX - 10, EdgeDirection::Rising));
        let m = engine.handle(sensor(40, EdgeDirection::Rising));
        assert_eq!(m.map(|m| m.elapsed_ticks), Some(51));
    }

    #[test]
    fn test_elapsed_micros_conversion() {
        let clock = CaptureClock::new(80_000_000);
        let measurement = LatencyMeasurement {
            direction: LatencyDirection::BlackToWhite,
            elapsed_ticks: 80_000,
        };
        assert_eq!(measurement.elapsed_micros(clock), 1_000);
    }
}
