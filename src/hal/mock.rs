//! Mock serial port and clock for testing.
//!
//! The mocks use interior mutability so a test can keep a shared handle
//! while the device owns another: implement the HAL traits for `&Mock`
//! and hand the device a reference.
//!
//! ## Example
//!
//! ```
//! use knx_tpuart::hal::mock::{MockClock, MockSerialPort};
//! use knx_tpuart::hal::{Clock, SerialPort};
//!
//! let serial = MockSerialPort::new();
//! let clock = MockClock::new();
//!
//! // simulate chip-side traffic
//! serial.push_rx(&[0x03]);
//! clock.advance(1_000);
//!
//! // the device side sees it through the trait
//! let mut port = &serial;
//! assert_eq!(port.available(), 1);
//! assert_eq!(port.read(), Some(0x03));
//! assert_eq!((&clock).now_us(), 1_000);
//! ```

use crate::hal::{Clock, SerialMode, SerialPort};
use core::cell::{Cell, RefCell};
use heapless::{Deque, Vec};

/// Capacity of the mock RX queue.
const RX_CAPACITY: usize = 512;
/// Capacity of the mock TX record.
const TX_CAPACITY: usize = 1024;

/// Mock serial port with scriptable RX bytes and a TX record.
///
/// Bytes pushed with [`push_rx`](Self::push_rx) are returned by `read()`
/// in FIFO order; every byte passed to `write()` is recorded and can be
/// drained with [`take_tx`](Self::take_tx).
#[derive(Debug, Default)]
pub struct MockSerialPort {
    rx: RefCell<Deque<u8, RX_CAPACITY>>,
    tx: RefCell<Vec<u8, TX_CAPACITY>>,
    open: Cell<bool>,
}

impl MockSerialPort {
    /// Create a new mock serial port.
    pub const fn new() -> Self {
        Self {
            rx: RefCell::new(Deque::new()),
            tx: RefCell::new(Vec::new()),
            open: Cell::new(false),
        }
    }

    /// Queue bytes to be returned by subsequent `read()` calls.
    ///
    /// Bytes beyond the queue capacity are dropped.
    pub fn push_rx(&self, bytes: &[u8]) {
        let mut rx = self.rx.borrow_mut();
        for &byte in bytes {
            let _ = rx.push_back(byte);
        }
    }

    /// Number of recorded TX bytes not yet drained.
    pub fn tx_len(&self) -> usize {
        self.tx.borrow().len()
    }

    /// Drain and return everything written so far.
    pub fn take_tx(&self) -> Vec<u8, TX_CAPACITY> {
        let mut tx = self.tx.borrow_mut();
        let drained = tx.clone();
        tx.clear();
        drained
    }

    /// Whether `begin()` has been called without a matching `end()`.
    pub fn is_open(&self) -> bool {
        self.open.get()
    }
}

impl SerialPort for &MockSerialPort {
    fn begin(&mut self, _baud: u32, _mode: SerialMode) {
        self.open.set(true);
    }

    fn end(&mut self) {
        self.open.set(false);
        self.rx.borrow_mut().clear();
    }

    fn available(&self) -> usize {
        self.rx.borrow().len()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.borrow_mut().pop_front()
    }

    fn write(&mut self, byte: u8) -> usize {
        match self.tx.borrow_mut().push(byte) {
            Ok(()) => 1,
            Err(_) => 0,
        }
    }
}

/// Mock microsecond clock driven by the test.
///
/// [`advance`](Self::advance) moves time forward explicitly; an optional
/// auto-advance step moves it on every `now_us()` sample, which lets
/// busy-wait loops (the reset handshake) run to their timeout.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u32>,
    step: Cell<u32>,
}

impl MockClock {
    /// Create a clock starting at zero.
    pub const fn new() -> Self {
        Self {
            now: Cell::new(0),
            step: Cell::new(0),
        }
    }

    /// Move time forward by `us` microseconds.
    pub fn advance(&self, us: u32) {
        self.now.set(self.now.get().wrapping_add(us));
    }

    /// Set the counter to an absolute value.
    pub fn set(&self, us: u32) {
        self.now.set(us);
    }

    /// Advance the counter by `step_us` on every sample.
    pub fn set_auto_advance(&self, step_us: u32) {
        self.step.set(step_us);
    }
}

impl Clock for &MockClock {
    fn now_us(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step.get()));
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_fifo_order() {
        let mock = MockSerialPort::new();
        let mut port = &mock;

        mock.push_rx(&[1, 2, 3]);
        assert_eq!(port.available(), 3);
        assert_eq!(port.read(), Some(1));
        assert_eq!(port.read(), Some(2));
        assert_eq!(port.read(), Some(3));
        assert_eq!(port.read(), None);
    }

    #[test]
    fn test_serial_tx_record() {
        let mock = MockSerialPort::new();
        let mut port = &mock;

        port.write(0xAA);
        port.write(0xBB);
        assert_eq!(mock.tx_len(), 2);
        assert_eq!(mock.take_tx().as_slice(), &[0xAA, 0xBB]);
        assert_eq!(mock.tx_len(), 0);
    }

    #[test]
    fn test_serial_open_close() {
        let mock = MockSerialPort::new();
        let mut port = &mock;
        assert!(!mock.is_open());
        port.begin(19_200, SerialMode::Data8EvenParity1);
        assert!(mock.is_open());
        port.end();
        assert!(!mock.is_open());
    }

    #[test]
    fn test_clock_advance() {
        let clock = MockClock::new();
        assert_eq!((&clock).now_us(), 0);
        clock.advance(500);
        assert_eq!((&clock).now_us(), 500);
    }

    #[test]
    fn test_clock_auto_advance() {
        let clock = MockClock::new();
        clock.set_auto_advance(100);
        assert_eq!((&clock).now_us(), 0);
        assert_eq!((&clock).now_us(), 100);
        assert_eq!((&clock).now_us(), 200);
    }
}
