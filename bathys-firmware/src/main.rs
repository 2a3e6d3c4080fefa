//! Bathys - Downhole Telemetry Display Firmware
//!
//! Main firmware binary for the STM32F767 display board. Two UART links
//! feed probe telemetry into lock-free byte queues; a dispatch task parses
//! the frames and drives the display.
//!
//! Named after the Greek "bathys" meaning "deep".

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::bind_interrupts;
use embassy_stm32::exti::{self, ExtiInput};
use embassy_stm32::gpio::Pull;
use embassy_stm32::peripherals::{USART2, USART3};
use embassy_stm32::usart::{self, BufferedUart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use bathys_core::config::{LinkConfig, Parity};
use bathys_core::dispatch::Dispatcher;
use bathys_core::metrics::LinkSource;
use bathys_core::queue::RxPort;

mod channels;
mod config;
mod display;
mod tasks;

bind_interrupts!(struct Irqs {
    USART2 => usart::BufferedInterruptHandler<USART2>;
    USART3 => usart::BufferedInterruptHandler<USART3>;
    EXTI15_10 => exti::InterruptHandler<embassy_stm32::interrupt::typelevel::EXTI15_10>;
});

/// UART driver receive buffer (interrupt side, ahead of the byte queues)
const UART_RX_BUF_SIZE: usize = 256;

/// Links are receive-only; the driver still wants a transmit buffer
const UART_TX_BUF_SIZE: usize = 16;

// Static cells for UART buffers (must live forever)
static PRIMARY_TX_BUF: StaticCell<[u8; UART_TX_BUF_SIZE]> = StaticCell::new();
static PRIMARY_RX_BUF: StaticCell<[u8; UART_RX_BUF_SIZE]> = StaticCell::new();
static SECONDARY_TX_BUF: StaticCell<[u8; UART_TX_BUF_SIZE]> = StaticCell::new();
static SECONDARY_RX_BUF: StaticCell<[u8; UART_RX_BUF_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Bathys firmware starting...");

    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();
    let started_ms = tasks::now_ms();

    // Split the static queues: producers go to the receive side, consumers
    // to the dispatcher
    let (primary_tx, primary_rx) = channels::PRIMARY_QUEUE.take().split();
    let (secondary_tx, secondary_rx) = channels::SECONDARY_QUEUE.take().split();

    let mut dispatcher = Dispatcher::new(&config);
    unwrap!(dispatcher.attach(LinkSource::Primary, primary_rx));
    unwrap!(dispatcher.attach(LinkSource::Secondary, secondary_rx));

    let primary_port = RxPort::new(primary_tx, LinkSource::Primary)
        .with_quiet_window(started_ms, config.primary.quiet_ms);
    let secondary_port = RxPort::new(secondary_tx, LinkSource::Secondary)
        .with_quiet_window(started_ms, config.secondary.quiet_ms);

    // Primary probe link: USART2 (PD6=RX, PD5=TX), or the simulator in demo builds
    #[cfg(feature = "demo")]
    {
        info!("Demo build: simulator replaces the primary link");
        spawner.spawn(tasks::demo_task(primary_port)).unwrap();
    }
    #[cfg(not(feature = "demo"))]
    {
        if config.primary.enabled {
            match BufferedUart::new(
                p.USART2,
                p.PD6, // RX
                p.PD5, // TX
                PRIMARY_TX_BUF.init([0u8; UART_TX_BUF_SIZE]),
                PRIMARY_RX_BUF.init([0u8; UART_RX_BUF_SIZE]),
                Irqs,
                uart_config(&config.primary),
            ) {
                Ok(uart) => {
                    let (_tx, rx) = uart.split();
                    spawner.spawn(tasks::link_rx_task(rx, primary_port)).unwrap();
                    info!("USART2 initialized for primary link");
                }
                Err(e) => error!("USART2 config rejected: {:?}", e),
            }
        } else {
            info!("Primary link disabled");
        }
    }

    // Secondary relay link: USART3 (PD9=RX, PD8=TX)
    if config.secondary.enabled {
        match BufferedUart::new(
            p.USART3,
            p.PD9, // RX
            p.PD8, // TX
            SECONDARY_TX_BUF.init([0u8; UART_TX_BUF_SIZE]),
            SECONDARY_RX_BUF.init([0u8; UART_RX_BUF_SIZE]),
            Irqs,
            uart_config(&config.secondary),
        ) {
            Ok(uart) => {
                let (_tx, rx) = uart.split();
                spawner.spawn(tasks::link_rx_task(rx, secondary_port)).unwrap();
                info!("USART3 initialized for secondary link");
            }
            Err(e) => error!("USART3 config rejected: {:?}", e),
        }
    } else {
        info!("Secondary link disabled");
    }

    // User button (PC13) dismisses messages
    let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::Down, Irqs);

    spawner.spawn(tasks::tick_task(config.dispatch.tick_ms)).unwrap();
    spawner
        .spawn(tasks::dispatch_task(dispatcher, display::LogSink::new()))
        .unwrap();
    spawner.spawn(tasks::button_task(button)).unwrap();

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// UART settings for a link (8 data bits, 1 stop bit)
fn uart_config(link: &LinkConfig) -> usart::Config {
    let mut cfg = usart::Config::default();
    cfg.baudrate = link.baudrate;
    cfg.parity = match link.parity {
        Parity::None => usart::Parity::ParityNone,
        Parity::Even => usart::Parity::ParityEven,
        Parity::Odd => usart::Parity::ParityOdd,
    };
    cfg
}
