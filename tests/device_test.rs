//! Integration tests for the KNX device stack.
//!
//! These tests drive a complete [`KnxDevice`] against the mock serial
//! port, with a small scripted pump playing the chip side of the TP-UART
//! protocol: it echoes every transmitted data byte, confirms completed
//! frames and injects bus telegrams.

use knx_tpuart::com_object::flags;
use knx_tpuart::hal::mock::{MockClock, MockSerialPort};
use knx_tpuart::{ga, ia, Command, ComObject, DptId, KnxDevice, Telegram, TelegramValidity};

const RESET_INDICATION: u8 = 0x03;
const DATA_START_CONTINUE_REQ: u8 = 0x80;
const DATA_END_REQ: u8 = 0x40;
const DATA_CONFIRM_SUCCESS: u8 = 0x8B;

/// Chip-side pump: echo data bytes of outgoing frames, confirm frame
/// ends, record the raw telegrams put on the bus.
#[derive(Default)]
struct ChipSide {
    bus_telegrams: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl ChipSide {
    fn pump(&mut self, serial: &MockSerialPort) {
        let sent = serial.take_tx();
        let mut bytes = sent.iter().copied();
        while let Some(byte) = bytes.next() {
            if byte < DATA_END_REQ {
                // rx acknowledge (0x11) or another chip service, not frame data
                continue;
            }
            let is_end = byte < DATA_START_CONTINUE_REQ;
            let Some(data) = bytes.next() else { break };
            serial.push_rx(&[data]);
            self.current.push(data);
            if is_end {
                serial.push_rx(&[DATA_CONFIRM_SUCCESS]);
                self.bus_telegrams.push(core::mem::take(&mut self.current));
            }
        }
    }
}

struct Harness<'a> {
    device: KnxDevice<'a, &'a MockSerialPort, &'a MockClock>,
    serial: &'a MockSerialPort,
    clock: &'a MockClock,
    chip: ChipSide,
    events: Vec<u8>,
}

impl<'a> Harness<'a> {
    fn begin(
        objects: &'a mut [ComObject],
        serial: &'a MockSerialPort,
        clock: &'a MockClock,
    ) -> Self {
        let mut device = KnxDevice::new(objects, clock);
        serial.push_rx(&[RESET_INDICATION]);
        device.begin(serial, ia!(1, 1, 10)).unwrap();
        serial.take_tx(); // discard the handshake bytes
        Self {
            device,
            serial,
            clock,
            chip: ChipSide::default(),
            events: Vec::new(),
        }
    }

    /// Run the device loop for `us` microseconds in 100 µs steps.
    fn run(&mut self, us: u32) {
        let events = &mut self.events;
        for _ in 0..us / 100 {
            self.clock.advance(100);
            self.device.task(&mut |index: u8| events.push(index));
            self.chip.pump(self.serial);
        }
    }

    /// Put a bus telegram on the device's RX line.
    fn inject(&mut self, telegram: &Telegram) {
        let mut bytes = Vec::new();
        for i in 0..telegram.total_length() {
            bytes.push(telegram.read_raw_byte(i));
        }
        self.serial.push_rx(&bytes);
    }

    fn sent_telegram(&self, index: usize) -> Telegram {
        let bytes = &self.chip.bus_telegrams[index];
        let mut telegram = Telegram::new();
        for (i, byte) in bytes.iter().enumerate() {
            telegram.write_raw_byte(i as u8, *byte);
        }
        telegram
    }
}

fn write_telegram(target: u16, value: u8) -> Telegram {
    let mut telegram = Telegram::new();
    telegram.set_source_address(0x11FF);
    telegram.set_target_address(target);
    telegram.set_command(Command::ValueWrite);
    telegram.set_first_payload_byte(value);
    telegram.update_checksum();
    telegram
}

fn read_telegram(target: u16) -> Telegram {
    let mut telegram = Telegram::new();
    telegram.set_source_address(0x11FF);
    telegram.set_target_address(target);
    telegram.set_command(Command::ValueRead);
    telegram.update_checksum();
    telegram
}

#[test]
fn group_write_updates_short_object() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/1), DptId::Switch, flags::LOGIC_IN)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.inject(&write_telegram(0x0A01, 1));
    harness.run(2_000);

    assert_eq!(harness.device.read(0), 1);
    assert_eq!(harness.events, [0], "callback fired exactly once");
    assert!(!harness.device.is_active());
}

#[test]
fn group_write_without_write_flag_is_ignored() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    // sensor objects answer reads but refuse bus writes
    let mut objects = [ComObject::new(ga!(1/2/1), DptId::Switch, flags::SENSOR)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.inject(&write_telegram(0x0A01, 1));
    harness.run(2_000);

    assert_eq!(harness.device.read(0), 0);
    assert!(harness.events.is_empty());
}

#[test]
fn bus_read_is_answered_with_a_response() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/2), DptId::Brightness, flags::SENSOR)];
    objects[0].update_value(&[0x12, 0x34]);
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.inject(&read_telegram(0x0A02));
    harness.run(50_000);

    assert_eq!(harness.chip.bus_telegrams.len(), 1, "one telegram on the bus");
    let response = harness.sent_telegram(0);
    assert_eq!(response.validity(), TelegramValidity::Valid);
    assert_eq!(response.command(), Some(Command::ValueResponse));
    assert_eq!(response.target_address(), 0x0A02);
    assert_eq!(response.source_address(), 0x110A);
    assert_eq!(response.payload_length(), 3);
    assert_eq!(response.read_raw_byte(8), 0x12);
    assert_eq!(response.read_raw_byte(9), 0x34);
    // nothing was reported to the application
    assert!(harness.events.is_empty());
}

#[test]
fn init_sweep_reads_flagged_objects_once() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [
        ComObject::new(ga!(1/2/1), DptId::Switch, flags::LOGIC_IN_INIT),
        ComObject::new(ga!(1/2/2), DptId::Brightness, flags::SENSOR),
        ComObject::new(ga!(1/2/3), DptId::Temperature, flags::LOGIC_IN_INIT),
    ];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    // three init periods plus transmission time
    harness.run(1_700_000);

    assert_eq!(harness.chip.bus_telegrams.len(), 2, "exactly two init reads");
    let first = harness.sent_telegram(0);
    assert_eq!(first.command(), Some(Command::ValueRead));
    assert_eq!(first.target_address(), 0x0A01, "index 0 first");
    assert_eq!(first.payload_length(), 1);
    let second = harness.sent_telegram(1);
    assert_eq!(second.command(), Some(Command::ValueRead));
    assert_eq!(second.target_address(), 0x0A03, "index 2 second");
    assert_eq!(second.payload_length(), 3);

    // further time adds no more reads
    harness.run(1_200_000);
    assert_eq!(harness.chip.bus_telegrams.len(), 2);

    // the flagged objects stay invalid until the bus answers
    assert!(!harness.device.objects()[0].valid());
    assert!(harness.device.objects()[1].valid());
}

#[test]
fn init_read_response_validates_object() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/1), DptId::Switch, flags::LOGIC_IN_INIT)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    // let the init read go out
    harness.run(600_000);
    assert_eq!(harness.chip.bus_telegrams.len(), 1);
    assert!(!harness.device.objects()[0].valid());

    // another participant responds with the current value
    let mut response = Telegram::new();
    response.set_source_address(0x11FE);
    response.set_target_address(0x0A01);
    response.set_command(Command::ValueResponse);
    response.set_first_payload_byte(1);
    response.update_checksum();
    harness.inject(&response);
    harness.run(2_000);

    assert!(harness.device.objects()[0].valid());
    assert_eq!(harness.device.read(0), 1);
    assert_eq!(harness.events, [0]);
}

#[test]
fn local_write_with_transmit_flag_reaches_the_bus() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [
        ComObject::new(ga!(1/2/1), DptId::Switch, flags::COMMUNICATION | flags::TRANSMIT),
        ComObject::new(ga!(1/2/2), DptId::Brightness, flags::SENSOR),
    ];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.device.write_unsigned(0, 1).unwrap();
    harness.device.write_unsigned(1, 0x1234).unwrap();
    harness.run(100_000);

    assert_eq!(harness.device.read(0), 1);
    assert_eq!(harness.device.read_unsigned(1).unwrap(), 0x1234);

    assert_eq!(harness.chip.bus_telegrams.len(), 2);
    let first = harness.sent_telegram(0);
    assert_eq!(first.command(), Some(Command::ValueWrite));
    assert_eq!(first.target_address(), 0x0A01);
    assert_eq!(first.first_payload_byte(), 1);
    assert_eq!(first.validity(), TelegramValidity::Valid);

    let second = harness.sent_telegram(1);
    assert_eq!(second.command(), Some(Command::ValueWrite));
    assert_eq!(second.target_address(), 0x0A02);
    assert_eq!(second.read_raw_byte(8), 0x12);
    assert_eq!(second.read_raw_byte(9), 0x34);
}

#[test]
fn local_write_without_transmit_flag_stays_local() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/1), DptId::Switch, flags::LOGIC_IN)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.device.write_unsigned(0, 1).unwrap();
    harness.run(20_000);

    assert_eq!(harness.device.read(0), 1);
    assert!(harness.chip.bus_telegrams.is_empty());
    assert!(!harness.device.is_active());
}

#[test]
fn float_write_encodes_f16_payload() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/3), DptId::Temperature, flags::SENSOR)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.device.write_float(0, 21.5).unwrap();
    harness.run(50_000);

    assert_eq!(harness.chip.bus_telegrams.len(), 1);
    let telegram = harness.sent_telegram(0);
    assert_eq!(telegram.read_raw_byte(8), 0x0C);
    assert_eq!(telegram.read_raw_byte(9), 0x33);

    let value = harness.device.read_float(0).unwrap();
    assert!((value - 21.5).abs() < 0.01);
}

#[test]
fn update_request_round_trip() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/2), DptId::Brightness, flags::LOGIC_IN)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.device.update(0).unwrap();
    assert!(harness.device.is_active());
    harness.run(50_000);

    // a read request went out
    assert_eq!(harness.chip.bus_telegrams.len(), 1);
    assert_eq!(harness.sent_telegram(0).command(), Some(Command::ValueRead));

    // the response updates the local value and notifies the app
    let mut response = Telegram::new();
    response.set_source_address(0x11FE);
    response.set_target_address(0x0A02);
    response.set_payload_length(3);
    response.set_command(Command::ValueResponse);
    response.set_long_payload(&[0x20, 0x40]);
    response.update_checksum();
    harness.inject(&response);
    harness.run(2_000);

    assert_eq!(harness.device.read_unsigned(0).unwrap(), 0x2040);
    assert_eq!(harness.events, [0]);
    assert!(!harness.device.is_active());
}

#[test]
fn telegram_for_foreign_group_address_is_ignored() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/1), DptId::Switch, flags::LOGIC_IN)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    harness.inject(&write_telegram(0x0BFF, 1));
    harness.run(5_000);

    assert_eq!(harness.device.read(0), 0);
    assert!(harness.events.is_empty());
    // not addressed: never acknowledged towards the chip
    assert!(harness.chip.bus_telegrams.is_empty());
}

#[test]
fn is_active_reflects_queue_and_driver() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();
    let mut objects = [ComObject::new(ga!(1/2/1), DptId::Switch, flags::SENSOR)];
    let mut harness = Harness::begin(&mut objects, &serial, &clock);

    assert!(!harness.device.is_active());
    harness.device.write_unsigned(0, 1).unwrap();
    assert!(harness.device.is_active());
    harness.run(100_000);
    assert!(!harness.device.is_active());
}
