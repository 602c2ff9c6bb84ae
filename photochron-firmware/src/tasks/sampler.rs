//! ADC sampling tick for the analog photosensor
//!
//! Runs on a fixed period: read one raw sample, update the moving
//! average, and feed the hysteresis detector. Confirmed transitions are
//! pushed as virtual sensor edges stamped with the time of this tick.

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_time::{Duration, Instant, Ticker};
use portable_atomic::Ordering;

use photochron_core::capture::{CaptureEvent, EdgeProducer, LineSource};
use photochron_core::config::{MeasureConfig, EDGE_CHANNEL_CAPACITY, FILTER_WINDOW};
use photochron_core::filter::MovingAverageFilter;
use photochron_core::hysteresis::{HysteresisDetector, ThresholdSet};

use crate::channels::{EDGE_PENDING, FILTERED_SAMPLE, THRESHOLD_BITS};

/// Sampler task
///
/// Sole writer of the raw filter state and the sensor hysteresis state.
#[embassy_executor::task]
pub async fn sampler_task(
    mut adc: Adc<'static, Async>,
    mut sensor: Channel<'static>,
    mut producer: EdgeProducer<'static, EDGE_CHANNEL_CAPACITY>,
    config: MeasureConfig,
) {
    info!("Sampler task started ({} us period)", config.sample_period_us);

    let mut filter: MovingAverageFilter<FILTER_WINDOW> = MovingAverageFilter::new();
    let mut detector = HysteresisDetector::new(ThresholdSet::from_bits(
        THRESHOLD_BITS.load(Ordering::Relaxed),
    ));

    let mut ticker = Ticker::every(Duration::from_micros(config.sample_period_us as u64));

    loop {
        ticker.next().await;

        // Pick up freshly calibrated thresholds between ticks
        let bits = THRESHOLD_BITS.load(Ordering::Relaxed);
        if bits != detector.thresholds().to_bits() {
            detector.apply_thresholds(ThresholdSet::from_bits(bits));
            debug!("Sampler switched to new thresholds");
        }

        let raw = match adc.read(&mut sensor).await {
            Ok(raw) => raw,
            Err(_) => {
                warn!("ADC read error");
                continue;
            }
        };

        let average = filter.update(raw);
        FILTERED_SAMPLE.store(average, Ordering::Relaxed);

        if let Some(direction) = detector.sample(average) {
            let timestamp = Instant::now().as_ticks();
            producer.push(CaptureEvent {
                source: LineSource::Sensor,
                timestamp,
                direction,
            });
            EDGE_PENDING.signal(());
        }
    }
}
