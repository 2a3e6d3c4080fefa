//! Demo task
//!
//! Stands in for the probe on the primary link: the stream simulator's
//! bursts are fed through the receive port in UART-sized fragments.

use bathys_core::queue::RxPort;
use bathys_core::sim::{fragments, StreamSimulator};
use defmt::*;
use embassy_time::{Duration, Ticker, Timer};

use super::now_ms;
use crate::channels::{RxFault, QUEUE_SIZE, RX_FAULTS};

/// Time between simulated bursts
const BURST_PERIOD_MS: u64 = 200;

/// Gap between fragments of one burst
const FRAGMENT_GAP_MS: u64 = 2;

/// Demo task - generates probe traffic
#[embassy_executor::task]
pub async fn demo_task(mut port: RxPort<'static, QUEUE_SIZE>) {
    info!("Demo task started on {:?} link", port.source());

    let mut sim = StreamSimulator::new();
    let mut ticker = Ticker::every(Duration::from_millis(BURST_PERIOD_MS));

    loop {
        ticker.next().await;

        let burst = match sim.next_burst() {
            Ok(burst) => burst,
            Err(e) => {
                warn!("Simulator step {} failed: {:?}", sim.step(), e);
                continue;
            }
        };

        for chunk in fragments(&burst) {
            let overflowed = port.on_bytes_received(chunk, now_ms());
            if overflowed > 0 {
                let _ = RX_FAULTS.try_send(RxFault::Overflow {
                    source: port.source(),
                    bytes: overflowed as u16,
                });
            }
            Timer::after(Duration::from_millis(FRAGMENT_GAP_MS)).await;
        }
    }
}
