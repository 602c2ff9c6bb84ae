//! Calibration button handling and threshold publication
//!
//! A press on the calibration button starts a run; while it is active
//! the task feeds the published filtered sample into the min/max
//! accumulator. The next press ends the run and publishes the derived
//! thresholds as a single atomic store.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Timer};
use portable_atomic::Ordering;

use photochron_core::calibrate::Calibrator;

use crate::channels::{FILTERED_SAMPLE, THRESHOLD_BITS};

/// Button debounce settle time
const BUTTON_SETTLE_MS: u64 = 30;

/// Accumulator polling period while a run is active
const OBSERVE_PERIOD_MS: u64 = 5;

/// Calibration task (active-low push button)
#[embassy_executor::task]
pub async fn calibration_task(mut button: Input<'static>) {
    info!("Calibration task started");

    let mut calibrator = Calibrator::new();

    loop {
        wait_for_press(&mut button).await;
        calibrator.begin();
        info!("Calibration started: keep the display blinking through both levels");

        loop {
            match select(
                button.wait_for_falling_edge(),
                Timer::after(Duration::from_millis(OBSERVE_PERIOD_MS)),
            )
            .await
            {
                Either::First(()) => break,
                Either::Second(()) => {
                    calibrator.observe(FILTERED_SAMPLE.load(Ordering::Relaxed));
                }
            }
        }
        Timer::after(Duration::from_millis(BUTTON_SETTLE_MS)).await;

        match calibrator.finish() {
            Ok(thresholds) => {
                // One store publishes the whole set to the sampler
                THRESHOLD_BITS.store(thresholds.to_bits(), Ordering::Relaxed);
                info!(
                    "Calibration complete: I->L={} L->I={} H->I={} I->H={}",
                    thresholds.intermediate_to_low,
                    thresholds.low_to_intermediate,
                    thresholds.high_to_intermediate,
                    thresholds.intermediate_to_high
                );
            }
            Err(e) => {
                warn!("Calibration failed ({}), keeping previous thresholds", e);
            }
        }
    }
}

/// Wait for a debounced press on the active-low button
async fn wait_for_press(button: &mut Input<'static>) {
    loop {
        button.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(BUTTON_SETTLE_MS)).await;
        if button.is_low() {
            return;
        }
    }
}
