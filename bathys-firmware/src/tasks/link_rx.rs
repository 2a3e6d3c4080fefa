//! UART receive task
//!
//! Moves bytes from a buffered UART into its link's byte queue. One
//! instance runs per enabled link.

use bathys_core::queue::RxPort;
use defmt::*;
use embassy_stm32::usart::BufferedUartRx;
use embedded_io_async::Read;

use super::now_ms;
use crate::channels::{RxFault, QUEUE_SIZE, RX_FAULTS};

/// Bytes taken from the UART buffer per read
const RX_CHUNK_SIZE: usize = 64;

/// Link RX task - feeds every received byte to the receive port
#[embassy_executor::task(pool_size = 2)]
pub async fn link_rx_task(mut rx: BufferedUartRx<'static>, mut port: RxPort<'static, QUEUE_SIZE>) {
    let source = port.source();
    info!("{:?} link RX task started", source);

    let mut buf = [0u8; RX_CHUNK_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("{:?} RX: {} bytes", source, n);
                let overflowed = port.on_bytes_received(&buf[..n], now_ms());
                if overflowed > 0 {
                    report(RxFault::Overflow {
                        source,
                        bytes: overflowed as u16,
                    });
                }
            }
            Ok(_) => {
                // No bytes read, continue
            }
            Err(error) => {
                report(RxFault::Uart { source, error });
            }
        }
    }
}

/// Hand a fault to the dispatch task, dropping it if the channel is full
fn report(fault: RxFault) {
    if RX_FAULTS.try_send(fault).is_err() {
        trace!("Fault channel full, dropping {:?}", fault);
    }
}
