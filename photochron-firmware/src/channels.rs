//! Cross-task shared state
//!
//! Every static here has exactly one writer and one reader; word-size
//! values cross as single atomic stores, multi-field capture events
//! cross only through the bounded edge channels set up in main.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU16, AtomicU64};

/// Latest filtered sensor sample
/// (written by the sampler task, read by correlation and calibration)
pub static FILTERED_SAMPLE: AtomicU16 = AtomicU16::new(0);

/// Currently published hysteresis thresholds, packed with
/// `ThresholdSet::to_bits`
/// (written by the calibration task, picked up by the sampler between
/// ticks; one store publishes the whole set)
pub static THRESHOLD_BITS: AtomicU64 = AtomicU64::new(0);

/// Notification that new capture events are pending in an edge channel
pub static EDGE_PENDING: Signal<CriticalSectionRawMutex, ()> = Signal::new();
