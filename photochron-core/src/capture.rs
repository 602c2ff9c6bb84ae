//! Capture events and the interrupt-to-task hand-off channel
//!
//! Edge timestamp sources (hardware edge capture or the ADC-derived
//! virtual edge path) produce [`CaptureEvent`]s in interrupt context.
//! They cross to the correlation task through a bounded SPSC queue that
//! never blocks the producer: on overflow the newest event is dropped
//! and counted.

use heapless::spsc::{Consumer, Producer, Queue};
use portable_atomic::{AtomicU32, Ordering};

/// Which monitored line an edge was observed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineSource {
    /// The digital line driven by the display's blink region
    Blink,
    /// The photosensor line (hardware edge or virtual edge)
    Sensor,
}

/// Direction of a level transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeDirection {
    /// Low to high (black to white on screen)
    Rising,
    /// High to low (white to black on screen)
    Falling,
}

/// One timestamped edge observation
///
/// Produced exclusively by capture sources; immutable once created.
/// The timestamp is in ticks of the free-running capture counter
/// described by [`CaptureClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureEvent {
    /// Line the edge was observed on
    pub source: LineSource,
    /// Free-running counter value at the moment of capture
    pub timestamp: u64,
    /// Observed transition direction
    pub direction: EdgeDirection,
}

/// Description of the free-running capture counter
///
/// The counter frequency defines the time resolution of every
/// measurement; downstream code uses it to convert ticks to real time
/// and to derive the debounce separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureClock {
    hz: u32,
}

impl CaptureClock {
    /// Create a clock description for a counter running at `hz` ticks/second
    pub const fn new(hz: u32) -> Self {
        Self { hz }
    }

    /// Counter frequency in Hz
    pub const fn hz(&self) -> u32 {
        self.hz
    }

    /// Convert a tick count to microseconds
    pub fn ticks_to_micros(&self, ticks: u64) -> u64 {
        (ticks as u128 * 1_000_000 / self.hz as u128) as u64
    }

    /// Minimum separation between accepted sensor edges, in ticks
    ///
    /// A fraction of one second of capture clock, e.g. divisor 8 gives
    /// 125 ms worth of ticks.
    pub const fn debounce_ticks(&self, divisor: u32) -> u64 {
        (self.hz / divisor) as u64
    }
}

/// Modular "a is not later than b" comparison for wrapping counters
pub fn ticks_not_after(a: u64, b: u64) -> bool {
    b.wrapping_sub(a) < u64::MAX / 2
}

/// Bounded single-producer single-consumer edge channel
///
/// One channel per monitored line, so per-source timestamp order is the
/// queue order. Capacity is `N - 1` events (one slot is reserved by the
/// underlying queue).
pub struct EdgeChannel<const N: usize> {
    queue: Queue<CaptureEvent, N>,
    dropped: AtomicU32,
}

impl<const N: usize> EdgeChannel<N> {
    /// Create an empty channel
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Split into the producer half (interrupt context) and the
    /// consumer half (task context)
    pub fn split(&mut self) -> (EdgeProducer<'_, N>, EdgeConsumer<'_, N>) {
        let dropped = &self.dropped;
        let (producer, consumer) = self.queue.split();
        (
            EdgeProducer { producer, dropped },
            EdgeConsumer { consumer, dropped },
        )
    }
}

impl<const N: usize> Default for EdgeChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half of an [`EdgeChannel`]
///
/// `push` is the only way to emit an event and is bounded-time,
/// allocation-free and non-blocking, so it is safe to call from
/// interrupt context.
pub struct EdgeProducer<'a, const N: usize> {
    producer: Producer<'a, CaptureEvent, N>,
    dropped: &'a AtomicU32,
}

impl<const N: usize> EdgeProducer<'_, N> {
    /// Hand an event to the consumer
    ///
    /// Returns `false` if the channel was full; the event is dropped and
    /// the drop counter incremented, the producer is never blocked.
    pub fn push(&mut self, event: CaptureEvent) -> bool {
        match self.producer.enqueue(event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

/// Consumer half of an [`EdgeChannel`]
pub struct EdgeConsumer<'a, const N: usize> {
    consumer: Consumer<'a, CaptureEvent, N>,
    dropped: &'a AtomicU32,
}

impl<const N: usize> EdgeConsumer<'_, N> {
    /// Take the oldest pending event, if any
    pub fn pop(&mut self) -> Option<CaptureEvent> {
        self.consumer.dequeue()
    }

    /// Look at the oldest pending event without taking it
    pub fn peek(&self) -> Option<&CaptureEvent> {
        self.consumer.peek()
    }

    /// Number of events dropped on overflow so far
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Pop the timestamp-earliest event across the two per-line channels
///
/// Cross-source channel arrival order is only as good as interrupt
/// latency, so the correlation engine consumes events in timestamp
/// order, not arrival order.
pub fn next_in_order<const N: usize, const M: usize>(
    blink: &mut EdgeConsumer<'_, N>,
    sensor: &mut EdgeConsumer<'_, M>,
) -> Option<CaptureEvent> {
    match (blink.peek(), sensor.peek()) {
        (Some(b), Some(s)) => {
            if ticks_not_after(b.timestamp, s.timestamp) {
                blink.pop()
            } else {
                sensor.pop()
            }
        }
        (Some(_), None) => blink.pop(),
        (None, Some(_)) => sensor.pop(),
        (None, None) => None,
    }
}
