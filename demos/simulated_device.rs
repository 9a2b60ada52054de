//! Full device loop against a simulated TP-UART chip.
//!
//! A two-object device (a switch and a temperature sensor) runs its
//! task loop on the host; a small scripted pump plays the chip side of
//! the serial protocol, echoing transmitted bytes, confirming frames
//! and injecting bus traffic.
//!
//! ```bash
//! cargo run --example simulated_device
//! ```

use knx_tpuart::com_object::flags;
use knx_tpuart::hal::mock::{MockClock, MockSerialPort};
use knx_tpuart::{ga, ia, Command, ComObject, DptId, KnxDevice, Telegram};

const RESET_INDICATION: u8 = 0x03;
const DATA_START_CONTINUE_REQ: u8 = 0x80;
const DATA_END_REQ: u8 = 0x40;
const DATA_CONFIRM_SUCCESS: u8 = 0x8B;

/// Chip side of the link: echo outgoing frame bytes, confirm frame
/// ends, collect completed telegrams.
fn pump_chip(serial: &MockSerialPort, bus: &mut Vec<Vec<u8>>, current: &mut Vec<u8>) {
    let sent = serial.take_tx();
    let mut bytes = sent.iter().copied();
    while let Some(byte) = bytes.next() {
        if byte < DATA_END_REQ {
            continue; // rx acknowledge or another chip service
        }
        let is_end = byte < DATA_START_CONTINUE_REQ;
        let Some(data) = bytes.next() else { break };
        serial.push_rx(&[data]);
        current.push(data);
        if is_end {
            serial.push_rx(&[DATA_CONFIRM_SUCCESS]);
            bus.push(std::mem::take(current));
        }
    }
}

/// Run the device loop for `us` microseconds in 100 µs steps.
fn run_loop(
    device: &mut KnxDevice<'_, &MockSerialPort, &MockClock>,
    serial: &MockSerialPort,
    clock: &MockClock,
    bus: &mut Vec<Vec<u8>>,
    current: &mut Vec<u8>,
    us: u32,
) {
    for _ in 0..us / 100 {
        clock.advance(100);
        device.task(&mut |index: u8| {
            println!("  -> knx event: object {index} updated from the bus");
        });
        pump_chip(serial, bus, current);
    }
}

/// Serialize a telegram onto the device's RX line.
fn inject(serial: &MockSerialPort, telegram: &Telegram) {
    let mut wire = Vec::new();
    for i in 0..telegram.total_length() {
        wire.push(telegram.read_raw_byte(i));
    }
    serial.push_rx(&wire);
}

fn print_bus(bus: &mut Vec<Vec<u8>>) {
    for bytes in bus.drain(..) {
        let mut telegram = Telegram::new();
        for (i, byte) in bytes.iter().enumerate() {
            telegram.write_raw_byte(i as u8, *byte);
        }
        println!("  [bus] {telegram}");
    }
}

fn main() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();

    let mut objects = [
        ComObject::new(ga!(0/2/1), DptId::Switch, flags::LOGIC_IN),
        ComObject::new(ga!(0/2/2), DptId::Temperature, flags::SENSOR),
    ];

    let mut device = KnxDevice::new(&mut objects, &clock);
    serial.push_rx(&[RESET_INDICATION]);
    device
        .begin(&serial, ia!(1, 1, 10))
        .expect("simulated chip answers the reset handshake");
    serial.take_tx();
    println!("device up as 1.1.10 with {} com objects", device.objects().len());

    let mut bus: Vec<Vec<u8>> = Vec::new();
    let mut current = Vec::new();

    // a wall switch on 0/2/1 turns our lamp on
    println!("\n[bus] group write 0/2/1 = on");
    let mut write = Telegram::new();
    write.set_source_address(0x11FF);
    write.set_target_address(ga!(0/2/1).raw());
    write.set_command(Command::ValueWrite);
    write.set_first_payload_byte(1);
    write.update_checksum();
    inject(&serial, &write);
    run_loop(&mut device, &serial, &clock, &mut bus, &mut current, 5_000);
    println!("  lamp object now reads {}", device.read(0));

    // publish a new temperature measurement
    println!("\n[app] write 21.5 degrees to the sensor object");
    device.write_float(1, 21.5).expect("value fits the F16 range");
    run_loop(&mut device, &serial, &clock, &mut bus, &mut current, 100_000);
    print_bus(&mut bus);

    // another participant asks for the temperature
    println!("\n[bus] group read 0/2/2");
    let mut read = Telegram::new();
    read.set_source_address(0x11FE);
    read.set_target_address(ga!(0/2/2).raw());
    read.set_command(Command::ValueRead);
    read.update_checksum();
    inject(&serial, &read);
    run_loop(&mut device, &serial, &clock, &mut bus, &mut current, 100_000);
    print_bus(&mut bus);

    device.end();
    println!("\ndevice stopped");
}
