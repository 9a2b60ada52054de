//! Passive bus monitor built on the raw TP-UART driver.
//!
//! In bus-monitor mode the driver delivers every telegram on the line
//! without acknowledging any of them, which makes a handy protocol
//! debugging tool.
//!
//! ```bash
//! cargo run --example bus_sniffer
//! ```

use knx_tpuart::hal::mock::{MockClock, MockSerialPort};
use knx_tpuart::{ga, ia, Command, Telegram, TpUart, TpUartEvent, TpUartMode};

const RESET_INDICATION: u8 = 0x03;

fn main() {
    let serial = MockSerialPort::new();
    let clock = MockClock::new();

    let mut tpuart = TpUart::new(&serial, &clock, ia!(1, 1, 99), TpUartMode::BusMonitor);
    serial.push_rx(&[RESET_INDICATION]);
    tpuart.reset().expect("simulated chip answers the reset handshake");
    tpuart.init();
    println!("sniffing as 1.1.99 (no acknowledgements are sent)\n");

    // replay some recorded bus traffic
    let mut traffic = Vec::new();
    for (source, target, command, value) in [
        (0x11FF, ga!(0/2/1).raw(), Command::ValueWrite, 1),
        (0x11FE, ga!(0/2/2).raw(), Command::ValueRead, 0),
        (0x1105, ga!(4/0/7).raw(), Command::ValueWrite, 0),
    ] {
        let mut telegram = Telegram::new();
        telegram.set_source_address(source);
        telegram.set_target_address(target);
        telegram.set_command(command);
        telegram.set_first_payload_byte(value);
        telegram.update_checksum();
        for i in 0..telegram.total_length() {
            traffic.push(telegram.read_raw_byte(i));
        }
    }

    // feed the line byte by byte, pumping the driver as we go
    for byte in traffic {
        serial.push_rx(&[byte]);
        clock.advance(1_100); // roughly one byte-time on the bus
        tpuart.rx_task(&[]);
        while let Some(event) = tpuart.poll_event() {
            if event == TpUartEvent::TelegramReceived {
                println!("{}", tpuart.received_telegram());
            }
        }
    }
}
