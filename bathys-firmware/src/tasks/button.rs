//! User button task
//!
//! A press closes the message currently shown.

use defmt::*;
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer};

use crate::channels::MESSAGE_DISMISS;

/// Debounce delay after an edge
const DEBOUNCE_MS: u64 = 20;

/// Button press task (active high)
#[embassy_executor::task]
pub async fn button_task(mut btn: ExtiInput<'static>) {
    info!("Button task started");

    loop {
        btn.wait_for_rising_edge().await;

        // Debounce
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;

        if btn.is_high() {
            debug!("Button: dismiss");
            MESSAGE_DISMISS.signal(());
            btn.wait_for_falling_edge().await;
            Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        }
    }
}
