//! Photochron - Display Latency Checker Firmware
//!
//! Measures the optical latency between the display's blink region
//! changing state and a photosensor pointed at the screen detecting the
//! change, for both black->white and white->black transitions.
//!
//! Two sensing variants share the whole correlation pipeline:
//! - default: the photosensor is sampled by the ADC and virtual edges
//!   are synthesized by a hysteresis state machine
//! - `digital-sensor` feature: the sensor is conditioned to a digital
//!   line and captured like the blink line

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Pull};
use portable_atomic::Ordering;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use photochron_core::capture::{CaptureClock, EdgeChannel, LineSource};
use photochron_core::config::{MeasureConfig, EDGE_CHANNEL_CAPACITY};

#[cfg(not(feature = "digital-sensor"))]
use embassy_rp::adc::{Adc, Channel, InterruptHandler as AdcInterruptHandler};
#[cfg(not(feature = "digital-sensor"))]
use embassy_rp::bind_interrupts;

mod channels;
mod tasks;

#[cfg(not(feature = "digital-sensor"))]
bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

// Edge channels live forever; the halves are split once at boot
static BLINK_CHANNEL: StaticCell<EdgeChannel<EDGE_CHANNEL_CAPACITY>> = StaticCell::new();
static SENSOR_CHANNEL: StaticCell<EdgeChannel<EDGE_CHANNEL_CAPACITY>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Photochron firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = MeasureConfig::default();

    // embassy-time drives the free-running capture timebase
    let clock = CaptureClock::new(embassy_time::TICK_HZ as u32);
    info!("Capture clock: {} Hz", clock.hz());

    channels::THRESHOLD_BITS.store(config.default_thresholds.to_bits(), Ordering::Relaxed);

    let (blink_producer, blink_consumer) = BLINK_CHANNEL.init(EdgeChannel::new()).split();
    let (sensor_producer, sensor_consumer) = SENSOR_CHANNEL.init(EdgeChannel::new()).split();

    // The display's blink region output, looped back as a digital input
    let blink_pin = Input::new(p.PIN_22, Pull::None);
    spawner
        .spawn(tasks::edge_capture_task(
            blink_pin,
            LineSource::Blink,
            blink_producer,
        ))
        .unwrap();

    #[cfg(feature = "digital-sensor")]
    {
        let sensor_pin = Input::new(p.PIN_21, Pull::None);
        spawner
            .spawn(tasks::edge_capture_task(
                sensor_pin,
                LineSource::Sensor,
                sensor_producer,
            ))
            .unwrap();
        info!("Digital sensor capture enabled");
    }

    #[cfg(not(feature = "digital-sensor"))]
    {
        let adc = Adc::new(p.ADC, Irqs, embassy_rp::adc::Config::default());
        let sensor_channel = Channel::new_pin(p.PIN_26, Pull::None);
        spawner
            .spawn(tasks::sampler_task(
                adc,
                sensor_channel,
                sensor_producer,
                config,
            ))
            .unwrap();

        let calibration_button = Input::new(p.PIN_16, Pull::Up);
        spawner
            .spawn(tasks::calibration_task(calibration_button))
            .unwrap();
        info!("ADC sensor sampling every {} us", config.sample_period_us);
    }

    spawner
        .spawn(tasks::correlate_task(
            blink_consumer,
            sensor_consumer,
            clock,
            config,
        ))
        .unwrap();

    info!("All tasks spawned, measuring");

    // All work happens in the spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
