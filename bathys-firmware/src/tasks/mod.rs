//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod button;
#[cfg(feature = "demo")]
pub mod demo;
pub mod dispatch;
pub mod link_rx;
pub mod tick;

pub use button::button_task;
#[cfg(feature = "demo")]
pub use demo::demo_task;
pub use dispatch::dispatch_task;
pub use link_rx::link_rx_task;
pub use tick::tick_task;

use embassy_time::Instant;

/// Milliseconds since boot, wrapping after ~49 days
///
/// Shared time base for byte stamps and dispatch ticks.
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
