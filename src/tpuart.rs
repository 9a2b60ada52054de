//! TP-UART driver.
//!
//! The TP-UART is a line-coupler chip bridging an MCU UART to the KNX
//! twisted-pair physical layer through a proprietary byte protocol. The
//! driver is a full-duplex pair of byte-oriented state machines:
//!
//! - **RX** reassembles bus telegrams from the serial stream, decides
//!   whether they address this device (individual address or any group
//!   address of the communication-object table), acknowledges addressed
//!   frames towards the chip and queues a
//!   [`TpUartEvent::TelegramReceived`].
//! - **TX** serializes one outgoing telegram at a time. Every
//!   transmitted byte is echoed back by the chip roughly one byte-time
//!   later; the next byte is only sent once the echo of the previous one
//!   was seen. After the last byte the driver waits for the chip's
//!   transmit confirmation, retrying up to three times on a negative
//!   one.
//!
//! ## Host to chip services
//!
//! | Byte | Meaning |
//! |------|---------|
//! | `0x01` | Reset request |
//! | `0x02` | State request |
//! | `0x05` | Activate bus monitor |
//! | `0x80 + i` | Data start/continue, telegram byte `i` follows |
//! | `0x40 + i` | Data end, last telegram byte `i` follows |
//! | `0x11` | Acknowledge an addressed incoming frame |
//!
//! ## Chip to host services
//!
//! | Byte | Meaning |
//! |------|---------|
//! | `0x03` | Reset indication |
//! | `xxxx x111` | State indication |
//! | `0x8B` | Transmit confirm, positive |
//! | `0x0B` | Transmit confirm, negative |
//! | other | Echoed TX bytes and incoming telegram bytes |

use crate::addressing::IndividualAddress;
use crate::com_object::ComObject;
use crate::error::{KnxError, Result};
use crate::hal::{time_delta, Clock, SerialMode, SerialPort, TPUART_BAUD_RATE};
use crate::telegram::{Telegram, TelegramValidity, HEADER_SIZE, MAX_SIZE};
use heapless::Deque;

// --- Chip service bytes (see the TP-UART datasheet) ---
const RESET_REQ: u8 = 0x01;
const STATE_REQ: u8 = 0x02;
const RESET_INDICATION: u8 = 0x03;
const ACTIVATE_BUSMON_REQ: u8 = 0x05;
const STATE_INDICATION: u8 = 0x07;
const STATE_INDICATION_MASK: u8 = 0x07;
const DATA_START_CONTINUE_REQ: u8 = 0x80;
const DATA_END_REQ: u8 = 0x40;
const RX_ACK_ADDRESSED: u8 = 0x11;
const DATA_CONFIRM_SUCCESS: u8 = 0x8B;
const DATA_CONFIRM_FAILED: u8 = 0x0B;
// bit 7 of a transmit confirm carries the outcome
const DATA_CONFIRM_MASK: u8 = 0x7F;

// control-field pattern marking the start of a standard frame
const EIB_CONTROL_PATTERN_MASK: u8 = 0b1101_0011;
const EIB_CONTROL_VALID_PATTERN: u8 = 0b1001_0000;

// --- Timings (µs) ---
/// Echo of a transmitted byte must arrive within one telegram byte-time
/// plus margin.
const BYTE_ECHO_TIMEOUT_US: u32 = 2_000;
/// Inter-byte silence after which a partial RX frame is abandoned.
const RX_BYTE_TIMEOUT_US: u32 = 2_000;
/// Transmit confirmation deadline after the last byte.
const ACK_TIMEOUT_US: u32 = 500_000;
/// Reset indication deadline per reset attempt.
const RESET_TIMEOUT_US: u32 = 1_000_000;

const RESET_ATTEMPTS: u8 = 3;
const MAX_NACK_RETRIES: u8 = 3;

/// Capacity of the pending event queue.
const EVENT_QUEUE_SIZE: usize = 4;

/// Operating mode of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TpUartMode {
    /// Acknowledge and deliver only telegrams addressing this device
    Normal,
    /// Deliver every telegram on the bus without acknowledging
    BusMonitor,
}

/// Events surfaced to the device scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TpUartEvent {
    /// An addressed, valid telegram was received; fetch it with
    /// [`TpUart::received_telegram`]
    TelegramReceived,
    /// The pending transmission concluded
    TxAck(TxAckStatus),
    /// The chip signalled a spontaneous reset; re-run `reset()`/`init()`
    Reset,
}

/// Outcome of a telegram transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxAckStatus {
    /// The telegram was acknowledged on the bus
    Ack,
    /// Negative confirmation three times in a row
    Nack,
    /// No confirmation within the deadline
    NoAnswerTimeout,
    /// The transmission was cut short by a chip reset
    Reset,
}

/// Chip initialization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ResetState {
    NotInitialized,
    ResetPending,
    Normal,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum RxState {
    Idle,
    Telegram,
    AddressedTelegram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum TxState {
    Idle,
    Ongoing,
    WaitingAck,
    Stopped,
}

struct RxContext {
    state: RxState,
    telegram: Telegram,
    byte_index: u8,
    last_byte_time: u32,
    targeted_index: Option<u8>,
}

struct TxContext {
    state: TxState,
    telegram: Telegram,
    length: u8,
    byte_index: u8,
    byte_sent_time: u32,
    echo_seen: bool,
    ack_wait_start: u32,
    nack_retries: u8,
    nack_count: u16,
}

/// Driver for the TP-UART line-coupler chip.
///
/// The driver owns the serial port and the clock. It is pumped by
/// [`rx_task`](Self::rx_task) and [`tx_task`](Self::tx_task) from the
/// device scheduler and reports through the event queue drained by
/// [`poll_event`](Self::poll_event).
pub struct TpUart<S: SerialPort, C: Clock> {
    serial: S,
    clock: C,
    physical_addr: IndividualAddress,
    mode: TpUartMode,
    state: ResetState,
    rx: RxContext,
    tx: TxContext,
    events: Deque<TpUartEvent, EVENT_QUEUE_SIZE>,
    dropped_events: u16,
}

impl<S: SerialPort, C: Clock> TpUart<S, C> {
    /// Create a driver and configure the serial port (19200 baud, 8E1).
    ///
    /// The chip is not touched yet; call [`reset`](Self::reset) and
    /// [`init`](Self::init) before sending telegrams.
    pub fn new(
        mut serial: S,
        clock: C,
        physical_addr: IndividualAddress,
        mode: TpUartMode,
    ) -> Self {
        serial.begin(TPUART_BAUD_RATE, SerialMode::Data8EvenParity1);
        Self {
            serial,
            clock,
            physical_addr,
            mode,
            state: ResetState::NotInitialized,
            rx: RxContext {
                state: RxState::Idle,
                telegram: Telegram::new(),
                byte_index: 0,
                last_byte_time: 0,
                targeted_index: None,
            },
            tx: TxContext {
                state: TxState::Idle,
                telegram: Telegram::new(),
                length: 0,
                byte_index: 0,
                byte_sent_time: 0,
                echo_seen: false,
                ack_wait_start: 0,
                nack_retries: 0,
                nack_count: 0,
            },
            events: Deque::new(),
            dropped_events: 0,
        }
    }

    /// Run the chip reset handshake.
    ///
    /// Sends a reset request and busy-waits for the reset indication
    /// with a 1 s deadline, retrying up to three times. On success the
    /// driver is left in the reset-pending state awaiting
    /// [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns a reset error when all attempts time out; the driver is
    /// stopped until the next `reset()` call.
    pub fn reset(&mut self) -> Result<()> {
        self.rx.state = RxState::Idle;
        self.tx.state = TxState::Idle;
        self.state = ResetState::ResetPending;

        // drop stale bytes before the handshake
        while self.serial.read().is_some() {}

        for _ in 0..RESET_ATTEMPTS {
            self.serial.write(RESET_REQ);
            let start = self.clock.now_us();
            while time_delta(self.clock.now_us(), start) < RESET_TIMEOUT_US {
                if self.serial.read() == Some(RESET_INDICATION) {
                    return Ok(());
                }
            }
        }
        self.state = ResetState::Stopped;
        knx_log!(error, "tpuart reset failed");
        Err(KnxError::reset_failed())
    }

    /// Bring the chip into operation after a successful reset.
    ///
    /// In normal mode a state request is issued (the response is
    /// informational); in bus-monitor mode monitoring is activated.
    pub fn init(&mut self) {
        match self.mode {
            TpUartMode::Normal => {
                self.serial.write(STATE_REQ);
            }
            TpUartMode::BusMonitor => {
                self.serial.write(ACTIVATE_BUSMON_REQ);
            }
        }
        self.rx.state = RxState::Idle;
        self.tx.state = TxState::Idle;
        self.state = ResetState::Normal;
    }

    /// Hand a telegram over for transmission.
    ///
    /// The telegram is copied; the source address is stamped with the
    /// device's individual address and the checksum refreshed before
    /// serialization. The first byte goes out immediately, the rest is
    /// paced by [`tx_task`](Self::tx_task).
    ///
    /// # Errors
    ///
    /// Returns an error when the chip is not initialized or a
    /// transmission is already pending.
    pub fn send_telegram(&mut self, telegram: &Telegram) -> Result<()> {
        if self.state != ResetState::Normal {
            return Err(KnxError::not_initialized());
        }
        if self.tx.state != TxState::Idle {
            return Err(KnxError::tpuart_busy());
        }

        self.tx.telegram = *telegram;
        self.tx.telegram.set_source_address(self.physical_addr.raw());
        self.tx.telegram.update_checksum();
        self.tx.length = self.tx.telegram.total_length();
        self.tx.byte_index = 0;
        self.tx.nack_retries = 0;
        self.tx.state = TxState::Ongoing;
        self.send_current_byte();
        Ok(())
    }

    /// Drain the serial RX side.
    ///
    /// `objects` is the device's communication-object table, used to
    /// decide whether a reassembled telegram addresses this device.
    /// Draining stops once a complete telegram has been delivered so the
    /// scheduler handles it before further bytes are consumed.
    pub fn rx_task(&mut self, objects: &[ComObject]) {
        let now = self.clock.now_us();
        if self.rx.state != RxState::Idle
            && time_delta(now, self.rx.last_byte_time) > RX_BYTE_TIMEOUT_US
        {
            // inter-byte silence: abandon the partial frame
            self.rx.state = RxState::Idle;
        }

        while let Some(byte) = self.serial.read() {
            self.rx.last_byte_time = self.clock.now_us();
            match self.rx.state {
                RxState::Idle => self.handle_service_byte(byte),
                RxState::Telegram | RxState::AddressedTelegram => {
                    if self.handle_telegram_byte(byte, objects) {
                        break;
                    }
                }
            }
        }
    }

    /// Pace the serial TX side.
    ///
    /// Sends the next telegram byte once the echo of the previous one
    /// was seen, and enforces the echo and confirmation deadlines.
    pub fn tx_task(&mut self) {
        let now = self.clock.now_us();
        match self.tx.state {
            TxState::WaitingAck => {
                if time_delta(now, self.tx.ack_wait_start) > ACK_TIMEOUT_US {
                    self.tx.state = TxState::Idle;
                    self.push_event(TpUartEvent::TxAck(TxAckStatus::NoAnswerTimeout));
                }
            }
            TxState::Ongoing => {
                // hold off while a bus telegram is being reassembled
                if self.rx.state != RxState::Idle {
                    return;
                }
                if self.tx.echo_seen {
                    self.tx.byte_index += 1;
                    self.send_current_byte();
                } else if time_delta(now, self.tx.byte_sent_time) > BYTE_ECHO_TIMEOUT_US {
                    // lost sync with the chip: abort and force a reset
                    knx_log!(warn, "tpuart echo timeout, requesting chip reset");
                    self.tx.state = TxState::Stopped;
                    self.state = ResetState::ResetPending;
                    self.serial.write(RESET_REQ);
                    self.push_event(TpUartEvent::TxAck(TxAckStatus::Reset));
                    self.push_event(TpUartEvent::Reset);
                }
            }
            TxState::Idle | TxState::Stopped => {}
        }
    }

    /// Pop the next pending event.
    pub fn poll_event(&mut self) -> Option<TpUartEvent> {
        self.events.pop_front()
    }

    /// The last completely received telegram.
    ///
    /// Valid after a [`TpUartEvent::TelegramReceived`] until the next
    /// [`rx_task`](Self::rx_task) call.
    pub fn received_telegram(&self) -> &Telegram {
        &self.rx.telegram
    }

    /// Table index of the communication object targeted by the last
    /// received telegram, or `None` for unicast services.
    pub fn targeted_com_object_index(&self) -> Option<u8> {
        self.rx.targeted_index
    }

    /// Whether either state machine is mid-frame.
    pub fn is_active(&self) -> bool {
        self.tx.state != TxState::Idle || self.rx.state != RxState::Idle
    }

    /// Negative transmit confirmations seen since construction.
    pub fn nack_count(&self) -> u16 {
        self.tx.nack_count
    }

    /// Events lost to a full event queue since construction.
    ///
    /// A non-zero count means the scheduler is not draining
    /// [`poll_event`](Self::poll_event) fast enough.
    pub fn dropped_event_count(&self) -> u16 {
        self.dropped_events
    }

    /// Tear down the driver and give the serial port back.
    pub fn release(mut self) -> S {
        self.serial.end();
        self.serial
    }

    // --- internal helpers ---

    fn push_event(&mut self, event: TpUartEvent) {
        if self.events.push_back(event).is_err() {
            self.dropped_events = self.dropped_events.saturating_add(1);
            knx_log!(error, "tpuart event queue overflow");
        }
    }

    fn send_current_byte(&mut self) {
        let index = self.tx.byte_index;
        let opcode = if index == self.tx.length - 1 {
            DATA_END_REQ + index
        } else {
            DATA_START_CONTINUE_REQ + index
        };
        self.serial.write(opcode);
        self.serial.write(self.tx.telegram.read_raw_byte(index));
        self.tx.echo_seen = false;
        self.tx.byte_sent_time = self.clock.now_us();
    }

    /// One byte received while no frame is being reassembled.
    fn handle_service_byte(&mut self, byte: u8) {
        // echo of the byte we are currently transmitting
        if self.tx.state == TxState::Ongoing
            && !self.tx.echo_seen
            && byte == self.tx.telegram.read_raw_byte(self.tx.byte_index)
        {
            self.tx.echo_seen = true;
            if self.tx.byte_index + 1 == self.tx.length {
                // last byte on the wire: the confirm may follow right away
                self.tx.state = TxState::WaitingAck;
                self.tx.ack_wait_start = self.clock.now_us();
            }
            return;
        }

        if byte == RESET_INDICATION {
            // spontaneous chip reset
            self.state = ResetState::ResetPending;
            if self.tx.state != TxState::Idle {
                self.tx.state = TxState::Idle;
                self.push_event(TpUartEvent::TxAck(TxAckStatus::Reset));
            }
            self.push_event(TpUartEvent::Reset);
            return;
        }

        if byte & DATA_CONFIRM_MASK == DATA_CONFIRM_FAILED {
            if self.tx.state == TxState::WaitingAck {
                if byte == DATA_CONFIRM_SUCCESS {
                    self.tx.state = TxState::Idle;
                    self.push_event(TpUartEvent::TxAck(TxAckStatus::Ack));
                } else {
                    self.handle_nack();
                }
            }
            return;
        }

        if byte & STATE_INDICATION_MASK == STATE_INDICATION {
            // state response, informational only
            return;
        }

        if byte & EIB_CONTROL_PATTERN_MASK == EIB_CONTROL_VALID_PATTERN {
            // start of a standard frame
            self.rx.telegram.write_raw_byte(0, byte);
            self.rx.byte_index = 1;
            self.rx.targeted_index = None;
            self.rx.state = RxState::Telegram;
        }
        // anything else: unknown chip service, ignored
    }

    /// One byte of an ongoing frame. Returns true when a telegram was
    /// delivered.
    fn handle_telegram_byte(&mut self, byte: u8, objects: &[ComObject]) -> bool {
        if usize::from(self.rx.byte_index) < MAX_SIZE {
            self.rx.telegram.write_raw_byte(self.rx.byte_index, byte);
        }
        self.rx.byte_index += 1;

        if usize::from(self.rx.byte_index) == HEADER_SIZE {
            self.resolve_target(objects);
        }

        if self.rx.byte_index >= self.rx.telegram.total_length() {
            let addressed = self.rx.state == RxState::AddressedTelegram;
            self.rx.state = RxState::Idle;
            if addressed && self.rx.telegram.validity() == TelegramValidity::Valid {
                if self.mode == TpUartMode::Normal {
                    self.serial.write(RX_ACK_ADDRESSED);
                }
                self.push_event(TpUartEvent::TelegramReceived);
                return true;
            }
            // not addressed or malformed: dropped silently
        }
        false
    }

    /// Header complete: does the frame address this device?
    fn resolve_target(&mut self, objects: &[ComObject]) {
        if self.mode == TpUartMode::BusMonitor {
            self.rx.state = RxState::AddressedTelegram;
            return;
        }
        let target = self.rx.telegram.target_address();
        if self.rx.telegram.is_multicast() {
            if let Some(index) = objects
                .iter()
                .position(|object| object.addr().raw() == target)
            {
                self.rx.targeted_index = Some(index as u8);
                self.rx.state = RxState::AddressedTelegram;
            }
        } else if target == self.physical_addr.raw() {
            self.rx.state = RxState::AddressedTelegram;
        }
    }

    /// Negative transmit confirm while waiting for the ack.
    fn handle_nack(&mut self) {
        self.tx.nack_count = self.tx.nack_count.saturating_add(1);
        self.tx.nack_retries += 1;
        if self.tx.nack_retries < MAX_NACK_RETRIES {
            // retransmit as a repeated frame
            self.tx.telegram.set_repeated();
            self.tx.telegram.update_checksum();
            self.tx.byte_index = 0;
            self.tx.state = TxState::Ongoing;
            self.send_current_byte();
        } else {
            self.tx.state = TxState::Idle;
            self.push_event(TpUartEvent::TxAck(TxAckStatus::Nack));
        }
    }
}
