//! Byte transport between the UART receive path and the dispatcher
//!
//! Each link owns one [`ByteQueue`]. The receive side holds the
//! [`Producer`] (usually wrapped in an [`RxPort`]) and the dispatcher holds
//! the [`Consumer`].

pub mod port;
pub mod ring;

pub use port::{RxOutcome, RxPort};
pub use ring::{ByteQueue, Consumer, Producer, QueueFull};
