//! Hardware abstraction for the serial link and the time source.
//!
//! The stack never touches hardware directly; it probes a byte-oriented
//! serial port and a free-running microsecond counter through the two
//! traits of this module, enabling:
//! - Testability through mock implementations
//! - Portability to any MCU UART or hosted serial device
//!
//! ## Design Pattern
//!
//! This follows the **Dependency Inversion Principle (DIP)**:
//! - High-level modules (the TP-UART driver, the device scheduler)
//!   depend on abstractions ([`SerialPort`], [`Clock`])
//! - Low-level modules (UART drivers, the in-crate mocks) implement the
//!   same abstractions
//! - Both can vary independently
//!
//! All operations are non-blocking: the driver advances at most one byte
//! per poll and never suspends.

use core::fmt;

pub mod mock;

/// Baud rate required by the TP-UART chip.
pub const TPUART_BAUD_RATE: u32 = 19_200;

/// Serial line configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialMode {
    /// 8 data bits, even parity, 1 stop bit (the TP-UART framing)
    Data8EvenParity1,
}

impl fmt::Display for SerialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data8EvenParity1 => write!(f, "8E1"),
        }
    }
}

/// Non-blocking byte-oriented serial port.
///
/// # Examples
///
/// ## Implementing for a custom UART
///
/// ```rust,ignore
/// use knx_tpuart::hal::{SerialMode, SerialPort};
///
/// struct Uart0 { /* ... peripheral registers ... */ }
///
/// impl SerialPort for Uart0 {
///     fn available(&self) -> usize {
///         // number of bytes in the RX FIFO
///     }
///
///     fn read(&mut self) -> Option<u8> {
///         // pop one byte from the RX FIFO
///     }
///
///     fn write(&mut self, byte: u8) -> usize {
///         // push one byte into the TX FIFO
///     }
/// }
/// ```
pub trait SerialPort {
    /// Configure and open the port.
    ///
    /// # Default Implementation
    ///
    /// Default implementation does nothing (no-op). Override if your
    /// port requires explicit configuration before use.
    fn begin(&mut self, _baud: u32, _mode: SerialMode) {}

    /// Close the port and release resources.
    ///
    /// Default implementation does nothing.
    fn end(&mut self) {}

    /// Number of bytes ready to be read without blocking.
    fn available(&self) -> usize;

    /// Pop one received byte, or `None` when the RX queue is empty.
    fn read(&mut self) -> Option<u8>;

    /// Send one byte.
    ///
    /// Returns the number of bytes accepted (0 when the TX queue is
    /// full).
    fn write(&mut self, byte: u8) -> usize;
}

/// Free-running monotonic microsecond counter.
///
/// The counter wraps around roughly every 71.6 minutes; all time
/// arithmetic in the stack uses wrap-safe differences via
/// [`time_delta`].
pub trait Clock {
    /// Current counter value in microseconds.
    fn now_us(&self) -> u32;
}

/// Wrap-safe elapsed microseconds between two counter samples.
#[inline(always)]
pub const fn time_delta(now: u32, before: u32) -> u32 {
    now.wrapping_sub(before)
}
