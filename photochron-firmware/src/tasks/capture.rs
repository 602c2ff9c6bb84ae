//! Hardware edge timestamp source
//!
//! One task instance per monitored digital line. Each level change is
//! stamped with the free-running timebase and handed to the correlation
//! task; the push never blocks and overflow is counted by the channel.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Instant;

use photochron_core::capture::{CaptureEvent, EdgeDirection, EdgeProducer, LineSource};
use photochron_core::config::EDGE_CHANNEL_CAPACITY;

use crate::channels::EDGE_PENDING;

/// Edge capture task
///
/// Both edges of one line share this mechanism; the blink line always
/// runs one instance, the sensor line runs a second one in the
/// digital-sensor variant.
#[embassy_executor::task(pool_size = 2)]
pub async fn edge_capture_task(
    mut pin: Input<'static>,
    source: LineSource,
    mut producer: EdgeProducer<'static, EDGE_CHANNEL_CAPACITY>,
) {
    info!("Edge capture task started for {}", source);

    loop {
        pin.wait_for_any_edge().await;
        let timestamp = Instant::now().as_ticks();
        let direction = if pin.is_high() {
            EdgeDirection::Rising
        } else {
            EdgeDirection::Falling
        };

        producer.push(CaptureEvent {
            source,
            timestamp,
            direction,
        });
        EDGE_PENDING.signal(());
    }
}
