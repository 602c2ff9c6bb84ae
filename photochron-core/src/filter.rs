//! Moving average filter for raw photosensor samples
//!
//! Runs once per sampling tick inside the periodic interrupt, so the
//! running sum is maintained incrementally (subtract the evicted sample,
//! add the new one) instead of being recomputed over the window.

/// Fixed-window moving average over the last `N` raw samples
///
/// Invariant: `sum` always equals the sum of the buffered samples.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter<const N: usize> {
    buffer: [u16; N],
    sum: u32,
    head: usize,
    len: usize,
}

impl<const N: usize> MovingAverageFilter<N> {
    /// Create an empty filter
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            sum: 0,
            head: 0,
            len: 0,
        }
    }

    /// Push one raw sample and return the updated average
    ///
    /// O(1): one eviction, one insertion, one division.
    pub fn update(&mut self, sample: u16) -> u16 {
        if self.len == N {
            self.sum -= self.buffer[self.head] as u32;
        } else {
            self.len += 1;
        }
        self.buffer[self.head] = sample;
        self.sum += sample as u32;
        self.head = (self.head + 1) % N;

        (self.sum / self.len as u32) as u16
    }

    /// Current average without pushing a sample
    ///
    /// Returns 0 while the filter is empty.
    pub fn average(&self) -> u16 {
        if self.len == 0 {
            0
        } else {
            (self.sum / self.len as u32) as u16
        }
    }

    /// Whether the window has been filled at least once
    pub fn is_primed(&self) -> bool {
        self.len == N
    }

    /// Discard all buffered samples
    pub fn reset(&mut self) {
        self.buffer = [0; N];
        self.sum = 0;
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for MovingAverageFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_over_partial_window() {
        let mut filter: MovingAverageFilter<4> = MovingAverageFilter::new();
        assert_eq!(filter.update(100), 100);
        assert_eq!(filter.update(200), 150);
        assert!(!filter.is_primed());
    }

    #[test]
    fn test_average_over_full_window() {
        let mut filter: MovingAverageFilter<4> = MovingAverageFilter::new();
        for _ in 0..4 {
            filter.update(100);
        }
        assert!(filter.is_primed());

        // One outlier moves a 4-wide window by a quarter of the step
        assert_eq!(filter.update(500), 200);
    }

    #[test]
    fn test_eviction_keeps_sum_consistent() {
        let mut filter: MovingAverageFilter<3> = MovingAverageFilter::new();
        let samples = [10u16, 20, 30, 40, 50, 60, 70];
        for (i, &s) in samples.iter().enumerate() {
            let avg = filter.update(s);
            // Recompute the window average the slow way and compare
            let window_start = i.saturating_sub(2);
            let window = &samples[window_start..=i];
            let expected = window.iter().map(|&v| v as u32).sum::<u32>() / window.len() as u32;
            assert_eq!(avg as u32, expected);
        }
    }

    #[test]
    fn test_reset() {
        let mut filter: MovingAverageFilter<4> = MovingAverageFilter::new();
        filter.update(1000);
        filter.reset();
        assert_eq!(filter.average(), 0);
        assert!(!filter.is_primed());
        assert_eq!(filter.update(40), 40);
    }

    #[test]
    fn test_no_overflow_at_full_scale() {
        // 16 samples at u16::MAX must not overflow the running sum
        let mut filter: MovingAverageFilter<16> = MovingAverageFilter::new();
        for _ in 0..32 {
            assert_eq!(filter.update(u16::MAX), u16::MAX);
        }
    }
}
