//! KNX device scheduler.
//!
//! [`KnxDevice`] is the abstraction the application talks to: it owns
//! the TP-UART driver, the communication-object table and a FIFO queue
//! of pending bus actions, and interleaves four duties on every
//! [`task`](KnxDevice::task) call:
//!
//! 1. **Init sweep** - one `ValueRead` request per object flagged
//!    `INIT_READ`, spaced 500 ms apart to protect the bus.
//! 2. **RX pump** - drain the TP-UART receive side every 400 µs.
//! 3. **Action dispatch** - when idle, pop one queued action and
//!    serialize the matching telegram.
//! 4. **TX pump** - pace the TP-UART transmit side every 800 µs.
//!
//! The application registers no global callback; it passes a
//! [`KnxEvents`] sink (any `FnMut(u8)` closure will do) into `task`,
//! which is invoked with the object index after a bus write or response
//! updated a local value.

use crate::addressing::IndividualAddress;
use crate::com_object::{flags, ComObject};
use crate::error::{KnxError, Result};
use crate::hal::{time_delta, Clock, SerialPort};
use crate::telegram::{Command, Telegram};
use crate::tpuart::{TpUart, TpUartEvent, TpUartMode, TxAckStatus};
use heapless::Deque;

/// Capacity of the transmit action queue.
pub const ACTIONS_QUEUE_SIZE: usize = 16;

// Inter-request gap of the init-read sweep (bus-load protection).
const INIT_READ_INTERVAL_US: u32 = 500_000;
// RX pump cadence.
const RX_TASK_INTERVAL_US: u32 = 400;
// TX pump cadence.
const TX_TASK_INTERVAL_US: u32 = 800;

/// Sink for bus-driven value updates.
///
/// Implemented for every `FnMut(u8)` closure, so applications can pass
/// `&mut |index| { ... }` straight into [`KnxDevice::task`].
pub trait KnxEvents {
    /// A communication object was updated from the bus.
    ///
    /// Fired for `ValueWrite` telegrams on objects carrying the W flag
    /// and `ValueResponse` telegrams on objects carrying the U flag,
    /// after the local value has been updated.
    fn on_knx_event(&mut self, index: u8);
}

impl<F: FnMut(u8)> KnxEvents for F {
    fn on_knx_event(&mut self, index: u8) {
        self(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum DeviceState {
    Init,
    Idle,
    TxOngoing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxActionCommand {
    Read,
    Write,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionValue {
    None,
    Short(u8),
    Long([u8; 14]),
}

#[derive(Debug, Clone, Copy)]
struct TxAction {
    command: TxActionCommand,
    index: u8,
    value: ActionValue,
}

/// A KNX bus device.
///
/// Owns the communication-object table for its lifetime; the TP-UART
/// driver is created by [`begin`](Self::begin) and torn down by
/// [`end`](Self::end). The application must call
/// [`task`](Self::task) repeatedly (1 kHz or faster) from its main loop.
///
/// # Examples
///
/// ```rust,ignore
/// let mut objects = [
///     ComObject::new(ga!(0/2/1), DptId::Switch, flags::LOGIC_IN),
///     ComObject::new(ga!(0/2/2), DptId::Temperature, flags::SENSOR),
/// ];
/// let mut device = KnxDevice::new(&mut objects, clock);
/// device.begin(serial, ia!(1, 1, 10))?;
///
/// loop {
///     device.task(&mut |index: u8| {
///         // react to bus updates
///     });
/// }
/// ```
pub struct KnxDevice<'a, S: SerialPort, C: Clock + Clone> {
    state: DeviceState,
    tpuart: Option<TpUart<S, C>>,
    clock: C,
    objects: &'a mut [ComObject],
    tx_actions: Deque<TxAction, ACTIONS_QUEUE_SIZE>,
    init_completed: bool,
    init_index: u8,
    last_init_time: u32,
    last_rx_time: u32,
    last_tx_time: u32,
    tx_telegram: Telegram,
}

impl<'a, S: SerialPort, C: Clock + Clone> KnxDevice<'a, S, C> {
    /// Create a device over a communication-object table.
    ///
    /// The device is inert until [`begin`](Self::begin) succeeds.
    pub fn new(objects: &'a mut [ComObject], clock: C) -> Self {
        Self {
            state: DeviceState::Init,
            tpuart: None,
            clock,
            objects,
            tx_actions: Deque::new(),
            init_completed: false,
            init_index: 0,
            last_init_time: 0,
            last_rx_time: 0,
            last_tx_time: 0,
            tx_telegram: Telegram::new(),
        }
    }

    /// Start the device.
    ///
    /// Creates the TP-UART driver on `serial`, runs the chip reset
    /// handshake and brings the chip into operation.
    ///
    /// # Errors
    ///
    /// Returns an error when the device is already running or the chip
    /// does not answer the reset handshake (three attempts).
    pub fn begin(&mut self, serial: S, physical_addr: IndividualAddress) -> Result<()> {
        if self.state != DeviceState::Init {
            return Err(KnxError::InvalidState);
        }

        let mut tpuart = TpUart::new(serial, self.clock.clone(), physical_addr, TpUartMode::Normal);
        tpuart.reset()?;
        tpuart.init();
        self.tpuart = Some(tpuart);

        self.state = DeviceState::Idle;
        self.init_completed = false;
        self.init_index = 0;
        let now = self.clock.now_us();
        self.last_init_time = now;
        self.last_rx_time = now;
        self.last_tx_time = now;
        knx_log!(info, "knx device started");
        Ok(())
    }

    /// Stop the device, clear pending actions and release the serial
    /// port.
    pub fn end(&mut self) -> Option<S> {
        self.state = DeviceState::Init;
        self.tx_actions.clear();
        self.init_completed = false;
        self.init_index = 0;
        self.tpuart.take().map(TpUart::release)
    }

    /// Device execution task.
    ///
    /// Shall be called repeatedly from the application main loop; a
    /// cadence of 1 kHz or better keeps the byte pacing deadlines.
    pub fn task<E: KnxEvents + ?Sized>(&mut self, events: &mut E) {
        if self.tpuart.is_none() {
            return;
        }

        // STEP 1: enqueue one read request per not-yet-valid object
        // carrying the InitRead flag, 500 ms apart
        if !self.init_completed {
            let now = self.clock.now_us();
            if time_delta(now, self.last_init_time) > INIT_READ_INTERVAL_US {
                while usize::from(self.init_index) < self.objects.len()
                    && self.objects[usize::from(self.init_index)].valid()
                {
                    self.init_index += 1;
                }
                if usize::from(self.init_index) == self.objects.len() {
                    self.init_completed = true;
                    knx_log!(info, "com object init sweep completed");
                } else {
                    let action = TxAction {
                        command: TxActionCommand::Read,
                        index: self.init_index,
                        value: ActionValue::None,
                    };
                    if self.tx_actions.push_back(action).is_err() {
                        knx_log!(warn, "tx action queue full, init read dropped");
                    }
                    self.init_index += 1;
                    self.last_init_time = self.clock.now_us();
                }
            }
        }

        // STEP 2: get received bus telegrams from the TP-UART
        let now = self.clock.now_us();
        if time_delta(now, self.last_rx_time) > RX_TASK_INTERVAL_US {
            self.last_rx_time = now;
            if let Some(tpuart) = self.tpuart.as_mut() {
                tpuart.rx_task(&*self.objects);
            }
            self.drain_tpuart_events(events);
        }

        // STEP 3: send one queued action when idle
        if self.state == DeviceState::Idle {
            if let Some(action) = self.tx_actions.pop_front() {
                self.dispatch_action(action);
            }
        }

        // STEP 4: let the TP-UART transmit
        let now = self.clock.now_us();
        if time_delta(now, self.last_tx_time) > TX_TASK_INTERVAL_US {
            self.last_tx_time = now;
            if let Some(tpuart) = self.tpuart.as_mut() {
                tpuart.tx_task();
            }
            self.drain_tpuart_events(events);
        }
    }

    /// Quick read of a short (one byte) com object.
    ///
    /// The returned value is hazardous for long objects (it is the first
    /// stored byte only); prefer [`read_raw`](Self::read_raw) or the
    /// typed readers for those.
    pub fn read(&self, index: u8) -> u8 {
        self.objects
            .get(usize::from(index))
            .map_or(0, ComObject::value)
    }

    /// Read a com object as an unsigned integer.
    ///
    /// Short objects yield their low byte; long objects are decoded
    /// according to their datapoint format.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or a format without an
    /// unsigned interpretation.
    pub fn read_unsigned(&self, index: u8) -> Result<u32> {
        let object = self.object(index)?;
        if object.is_short() {
            return Ok(u32::from(object.value()));
        }
        let mut dpt_value = [0u8; 14];
        object.read_value(&mut dpt_value)?;
        object.dpt_id().format().decode_unsigned(&dpt_value)
    }

    /// Read a com object as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or a format without a
    /// signed interpretation.
    pub fn read_signed(&self, index: u8) -> Result<i32> {
        let object = self.object(index)?;
        if object.is_short() {
            return Ok(i32::from(object.value()));
        }
        let mut dpt_value = [0u8; 14];
        object.read_value(&mut dpt_value)?;
        object.dpt_id().format().decode_signed(&dpt_value)
    }

    /// Read a com object as a float.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index, `NotImplemented` for F32,
    /// or an error for a format without a float interpretation.
    pub fn read_float(&self, index: u8) -> Result<f32> {
        let object = self.object(index)?;
        if object.is_short() {
            return Ok(f32::from(object.value()));
        }
        let mut dpt_value = [0u8; 14];
        object.read_value(&mut dpt_value)?;
        object.dpt_id().format().decode_float(&dpt_value)
    }

    /// Copy the raw com object value into `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or a too-small buffer.
    pub fn read_raw(&self, index: u8, dest: &mut [u8]) -> Result<()> {
        self.object(index)?.read_value(dest)
    }

    /// Write a com object from an unsigned integer.
    ///
    /// The local value is updated when the queued action is dispatched;
    /// a `ValueWrite` telegram goes on the bus if the object carries the
    /// T flag. Short objects store the value truncated to 8 bits, long
    /// objects encode it per their datapoint format.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index, a failing conversion or a
    /// full action queue.
    pub fn write_unsigned(&mut self, index: u8, value: u32) -> Result<()> {
        let object = self.object(index)?;
        let action_value = if object.is_short() {
            ActionValue::Short(value as u8)
        } else {
            let mut dpt_value = [0u8; 14];
            object.dpt_id().format().encode_unsigned(value, &mut dpt_value)?;
            ActionValue::Long(dpt_value)
        };
        self.enqueue_write(index, action_value)
    }

    /// Write a com object from a signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index, a failing conversion or a
    /// full action queue.
    pub fn write_signed(&mut self, index: u8, value: i32) -> Result<()> {
        let object = self.object(index)?;
        let action_value = if object.is_short() {
            ActionValue::Short(value as u8)
        } else {
            let mut dpt_value = [0u8; 14];
            object.dpt_id().format().encode_signed(value, &mut dpt_value)?;
            ActionValue::Long(dpt_value)
        };
        self.enqueue_write(index, action_value)
    }

    /// Write a com object from a float.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index, a failing conversion
    /// (`NotImplemented` for F32, range errors for F16) or a full action
    /// queue.
    pub fn write_float(&mut self, index: u8, value: f32) -> Result<()> {
        let object = self.object(index)?;
        let action_value = if object.is_short() {
            ActionValue::Short(value as u8)
        } else {
            let mut dpt_value = [0u8; 14];
            object.dpt_id().format().encode_float(value, &mut dpt_value)?;
            ActionValue::Long(dpt_value)
        };
        self.enqueue_write(index, action_value)
    }

    /// Write a long com object from its raw datapoint bytes.
    ///
    /// # Errors
    ///
    /// Returns a wrong-length error for short objects, a buffer error
    /// when `value` is shorter than the object, or a queue-full error.
    pub fn write_raw(&mut self, index: u8, value: &[u8]) -> Result<()> {
        let object = self.object(index)?;
        if object.is_short() {
            return Err(KnxError::wrong_length());
        }
        let count = usize::from(object.length() - 1);
        let source = value.get(..count).ok_or_else(KnxError::buffer_too_small)?;
        let mut dpt_value = [0u8; 14];
        dpt_value[..count].copy_from_slice(source);
        self.enqueue_write(index, ActionValue::Long(dpt_value))
    }

    /// Request the object to be refreshed from the bus.
    ///
    /// Asynchronous: the completion is notified through the
    /// [`KnxEvents`] sink once the response telegram arrives.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown index or a full action queue.
    pub fn update(&mut self, index: u8) -> Result<()> {
        self.object(index)?;
        let action = TxAction {
            command: TxActionCommand::Read,
            index,
            value: ActionValue::None,
        };
        self.tx_actions
            .push_back(action)
            .map_err(|_| KnxError::queue_full())
    }

    /// Whether there is RX/TX activity ongoing or pending.
    pub fn is_active(&self) -> bool {
        if let Some(tpuart) = self.tpuart.as_ref() {
            if tpuart.is_active() {
                return true;
            }
        }
        self.state == DeviceState::TxOngoing || !self.tx_actions.is_empty()
    }

    /// The communication-object table.
    pub fn objects(&self) -> &[ComObject] {
        self.objects
    }

    // --- internal helpers ---

    fn object(&self, index: u8) -> Result<&ComObject> {
        self.objects
            .get(usize::from(index))
            .ok_or_else(KnxError::index_out_of_range)
    }

    fn enqueue_write(&mut self, index: u8, value: ActionValue) -> Result<()> {
        let action = TxAction {
            command: TxActionCommand::Write,
            index,
            value,
        };
        self.tx_actions
            .push_back(action)
            .map_err(|_| KnxError::queue_full())
    }

    /// Serialize one popped action into the TX telegram and hand it to
    /// the TP-UART.
    fn dispatch_action(&mut self, action: TxAction) {
        let index = usize::from(action.index);
        if index >= self.objects.len() {
            return;
        }

        match action.command {
            TxActionCommand::Read => {
                let object = &self.objects[index];
                object.copy_attributes_into(&mut self.tx_telegram);
                self.tx_telegram.clear_long_payload();
                self.tx_telegram.clear_first_payload_byte();
                self.tx_telegram.set_command(Command::ValueRead);
                self.tx_telegram.update_checksum();
                self.send_tx_telegram();
            }
            TxActionCommand::Response => {
                let object = &self.objects[index];
                object.copy_attributes_into(&mut self.tx_telegram);
                object.copy_value_into(&mut self.tx_telegram);
                self.tx_telegram.set_command(Command::ValueResponse);
                self.tx_telegram.update_checksum();
                self.send_tx_telegram();
            }
            TxActionCommand::Write => {
                {
                    let object = &mut self.objects[index];
                    match action.value {
                        ActionValue::Short(value) => {
                            let _ = object.set_value(value);
                        }
                        ActionValue::Long(value) => {
                            object.update_value(&value);
                        }
                        ActionValue::None => {}
                    }
                }
                // transmit only if the object carries the T flag
                let object = &self.objects[index];
                if object.indicator() & flags::TRANSMIT != 0 {
                    object.copy_attributes_into(&mut self.tx_telegram);
                    object.copy_value_into(&mut self.tx_telegram);
                    self.tx_telegram.set_command(Command::ValueWrite);
                    self.tx_telegram.update_checksum();
                    self.send_tx_telegram();
                }
            }
        }
    }

    fn send_tx_telegram(&mut self) {
        if let Some(tpuart) = self.tpuart.as_mut() {
            match tpuart.send_telegram(&self.tx_telegram) {
                Ok(()) => self.state = DeviceState::TxOngoing,
                Err(_) => knx_log!(warn, "telegram handoff refused, action lost"),
            }
        }
    }

    fn drain_tpuart_events<E: KnxEvents + ?Sized>(&mut self, events: &mut E) {
        loop {
            let event = match self.tpuart.as_mut() {
                Some(tpuart) => tpuart.poll_event(),
                None => None,
            };
            let Some(event) = event else {
                return;
            };
            match event {
                TpUartEvent::TelegramReceived => self.handle_received_telegram(events),
                TpUartEvent::TxAck(status) => {
                    self.state = DeviceState::Idle;
                    if status != TxAckStatus::Ack {
                        knx_log!(warn, "telegram transmission failed");
                    }
                }
                TpUartEvent::Reset => self.handle_chip_reset(),
            }
        }
    }

    fn handle_received_telegram<E: KnxEvents + ?Sized>(&mut self, events: &mut E) {
        self.state = DeviceState::Idle;

        let Some(tpuart) = self.tpuart.as_ref() else {
            return;
        };
        let telegram = *tpuart.received_telegram();
        let target = tpuart.targeted_com_object_index();

        // unicast services (e.g. MemoryWrite) carry no com object
        let Some(index) = target else {
            return;
        };
        let i = usize::from(index);
        if i >= self.objects.len() {
            return;
        }

        match telegram.command() {
            Some(Command::ValueRead) => {
                // answer only if the object can be read from the bus
                if self.objects[i].indicator() & flags::READ != 0 {
                    let action = TxAction {
                        command: TxActionCommand::Response,
                        index,
                        value: ActionValue::None,
                    };
                    if self.tx_actions.push_back(action).is_err() {
                        knx_log!(warn, "tx action queue full, response dropped");
                    }
                }
            }
            Some(Command::ValueResponse) => {
                if self.objects[i].indicator() & flags::UPDATE != 0
                    && self.objects[i].update_from_telegram(&telegram).is_ok()
                {
                    events.on_knx_event(index);
                }
            }
            Some(Command::ValueWrite) => {
                if self.objects[i].indicator() & flags::WRITE != 0
                    && self.objects[i].update_from_telegram(&telegram).is_ok()
                {
                    events.on_knx_event(index);
                }
            }
            Some(Command::MemoryWrite) | None => {}
        }
    }

    /// The chip reset spontaneously: re-run the handshake until it
    /// succeeds, then resume.
    fn handle_chip_reset(&mut self) {
        let Some(tpuart) = self.tpuart.as_mut() else {
            return;
        };
        while tpuart.reset().is_err() {}
        tpuart.init();
        self.state = DeviceState::Idle;
    }
}
