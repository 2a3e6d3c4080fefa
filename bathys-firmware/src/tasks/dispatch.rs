//! Dispatch task
//!
//! Owns the dispatcher and the display sink. Runs one dispatcher poll per
//! tick, applies message dismissals as soon as the button fires, and logs
//! receive faults reported by the link tasks.

use bathys_core::dispatch::Dispatcher;
use defmt::*;
use embassy_futures::select::{select, Either};

use super::now_ms;
use super::tick::TICK_SIGNAL;
use crate::channels::{RxFault, MESSAGE_DISMISS, QUEUE_SIZE, RX_FAULTS};
use crate::display::LogSink;

/// Dispatch task - drains the link queues into the display
#[embassy_executor::task]
pub async fn dispatch_task(mut dispatcher: Dispatcher<'static, QUEUE_SIZE>, mut sink: LogSink) {
    info!("Dispatch task started");

    loop {
        match select(TICK_SIGNAL.wait(), MESSAGE_DISMISS.wait()).await {
            Either::First(()) => {}
            Either::Second(()) => {
                sink.dismiss();
                continue;
            }
        }

        while let Ok(fault) = RX_FAULTS.try_receive() {
            match fault {
                RxFault::Overflow { source, bytes } => {
                    warn!("{:?} queue full, {} bytes dropped", source, bytes);
                }
                RxFault::Uart { source, error } => {
                    warn!("{:?} UART error: {:?}", source, error);
                }
            }
        }

        // Sampled after the wake-up so no byte stamp is newer than the poll time
        let decoded = dispatcher.poll(now_ms(), &mut sink);
        if decoded > 0 {
            trace!("Tick {}: {} frames", dispatcher.ticks(), decoded);
        }
    }
}
