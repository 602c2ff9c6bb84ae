//! Correlation task: drain, match, report
//!
//! Single consumer of both edge channels. Events are consumed in
//! timestamp order, run through the latency engine, and summarized as
//! one report line per completed blink period.

use defmt::*;
use embassy_futures::select::select;
use embassy_time::{Duration, Timer};
use portable_atomic::Ordering;

use photochron_core::capture::{next_in_order, CaptureClock, EdgeConsumer};
use photochron_core::config::{MeasureConfig, EDGE_CHANNEL_CAPACITY};
use photochron_core::correlate::{LatencyDirection, LatencyEngine};

use crate::channels::{EDGE_PENDING, FILTERED_SAMPLE};

/// Upper bound on how long the drain loop waits for a notification
const DRAIN_TIMEOUT_MS: u64 = 100;

/// Correlation task
///
/// Owns all correlation state; blocks only on the bounded drain timeout.
#[embassy_executor::task]
pub async fn correlate_task(
    mut blink: EdgeConsumer<'static, EDGE_CHANNEL_CAPACITY>,
    mut sensor: EdgeConsumer<'static, EDGE_CHANNEL_CAPACITY>,
    clock: CaptureClock,
    config: MeasureConfig,
) {
    let min_separation = clock.debounce_ticks(config.debounce_divisor);
    info!(
        "Correlation task started (debounce {} ticks)",
        min_separation
    );

    let mut engine = LatencyEngine::new(min_separation);
    let mut reported_drops: u32 = 0;

    loop {
        while let Some(event) = next_in_order(&mut blink, &mut sensor) {
            let Some(measurement) = engine.handle(event) else {
                continue;
            };

            debug!(
                "{} latency: {} us",
                measurement.direction,
                measurement.elapsed_micros(clock)
            );

            // The white-to-black confirmation closes a blink period
            if measurement.direction == LatencyDirection::WhiteToBlack {
                let b2w = engine
                    .latest(LatencyDirection::BlackToWhite)
                    .map(|t| clock.ticks_to_micros(t));
                let w2b = engine
                    .latest(LatencyDirection::WhiteToBlack)
                    .map(|t| clock.ticks_to_micros(t));
                info!(
                    "blink={} sensor={} sample={} B->W={} us W->B={} us",
                    engine.blink_level(),
                    engine.sensor_level(),
                    FILTERED_SAMPLE.load(Ordering::Relaxed),
                    b2w,
                    w2b
                );
            }
        }

        let drops = blink.dropped() + sensor.dropped();
        if drops != reported_drops {
            warn!("Edge channel overflow: {} events dropped so far", drops);
            reported_drops = drops;
        }

        // Block with a bounded timeout for the next batch of events
        let _ = select(
            EDGE_PENDING.wait(),
            Timer::after(Duration::from_millis(DRAIN_TIMEOUT_MS)),
        )
        .await;
    }
}
