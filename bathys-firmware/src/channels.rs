//! Inter-task communication channels
//!
//! Byte queues from the UART receive tasks to the dispatcher, plus the
//! embassy-sync primitives used for everything else.

use bathys_core::metrics::LinkSource;
use bathys_core::queue::ByteQueue;
use embassy_stm32::usart;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use static_cell::ConstStaticCell;

/// Byte queue capacity per link (one slot stays free)
pub const QUEUE_SIZE: usize = 4096;

/// Channel capacity for receive faults
const FAULT_CHANNEL_SIZE: usize = 8;

/// Primary (probe) link queue
pub static PRIMARY_QUEUE: ConstStaticCell<ByteQueue<QUEUE_SIZE>> =
    ConstStaticCell::new(ByteQueue::new());

/// Secondary (relay) link queue
pub static SECONDARY_QUEUE: ConstStaticCell<ByteQueue<QUEUE_SIZE>> =
    ConstStaticCell::new(ByteQueue::new());

/// Recoverable receive-side fault, logged by the dispatch task
#[derive(Debug, Clone, Copy, defmt::Format)]
pub enum RxFault {
    /// Queue was full; bytes were discarded
    Overflow { source: LinkSource, bytes: u16 },
    /// UART reported framing, parity, noise or overrun
    Uart {
        source: LinkSource,
        error: usart::Error,
    },
}

/// Faults from the receive tasks (dropped when full)
pub static RX_FAULTS: Channel<CriticalSectionRawMutex, RxFault, FAULT_CHANNEL_SIZE> =
    Channel::new();

/// Operator dismissed the message on screen (user button)
pub static MESSAGE_DISMISS: Signal<CriticalSectionRawMutex, ()> = Signal::new();
