#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod console;
pub mod history;
pub mod line;
pub mod menu;
pub mod render;
pub mod tokenize;

#[cfg(feature = "firmware")]
pub mod board;
#[cfg(feature = "firmware")]
pub mod usb;

pub use console::{Console, ConsoleConfig, Transport};
pub use render::Arg;

// Common error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Disconnected,
    BufferOverflow,
    /// The transport did not take the packet yet; retry it.
    Busy,
}

// Common constants
pub const LINE_CAPACITY: usize = 256;
pub const HISTORY_DEPTH: usize = 10;
pub const ARG_CAPACITY: usize = 64;
pub const OUTBOUND_CAPACITY: usize = 64;
pub const INBOUND_QUEUE: usize = 256;
pub const PRINT_CAPACITY: usize = 128;
pub const PROMPT_SUFFIX: &str = ">";
pub const NEWLINE: &[u8] = b"\r\n";

pub const ESC: u8 = 0x1b;
pub const DEL: u8 = 0x7f;
