//! KNX standard-frame telegram container.
//!
//! This module handles the on-wire representation of standard-length
//! L_DATA telegrams (visit "www.knx.org" for more info).
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (6 bytes)                         │
//! │  ├─ Control Field (1 byte)               │
//! │  ├─ Source Address (2 bytes, BE)         │
//! │  ├─ Target Address (2 bytes, BE)         │
//! │  └─ Routing Field (1 byte)               │
//! ├──────────────────────────────────────────┤
//! │ Payload (2 up to 16 bytes)               │
//! │  ├─ Command High (1 byte)                │
//! │  ├─ Command Low + 1st payload (1 byte)   │
//! │  └─ Payload bytes 2..L (optional)        │
//! ├──────────────────────────────────────────┤
//! │ Checksum (1 byte)                        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Field details
//!
//! - Control Field: `FFR1 PP00` format with FF = frame format (10 =
//!   standard L_DATA), R = repeat flag (1 = not repeated, 0 = repeated),
//!   PP = priority (00 = system, 01 = high, 10 = alarm, 11 = normal)
//! - Routing Field: `TCCC LLLL` format with T = target address type
//!   (1 = group/multicast, 0 = individual/unicast), CCC = routing
//!   counter, LLLL = payload length (1-15)
//! - Command Field: `00XX XXCC CCDD DDDD` format with CC CC = command
//!   and DD DDDD = first payload byte
//!
//! Total length ranges from 9 bytes (1-byte payload) to 23 bytes
//! (15-byte payload). The checksum is the bitwise complement of the
//! XOR sum of all preceding bytes.

use core::fmt;

/// Size of the telegram header (control, source, target, routing)
pub const HEADER_SIZE: usize = 6;
/// Maximum payload size including the two command bytes
pub const PAYLOAD_MAX_SIZE: usize = 16;
/// Minimum total telegram length (1-byte payload)
pub const MIN_SIZE: usize = 9;
/// Maximum total telegram length (15-byte payload)
pub const MAX_SIZE: usize = 23;
/// Offset between payload length and total telegram length
const LENGTH_OFFSET: u8 = 8;

// --- Control field values & masks ---
/// Standard frame format, not repeated, normal priority
const CONTROL_DEFAULT: u8 = 0b1011_1100;
const CONTROL_FRAME_FORMAT_MASK: u8 = 0b1100_0000;
const CONTROL_STANDARD_FRAME: u8 = 0b1000_0000;
const CONTROL_REPEATED_MASK: u8 = 0b0010_0000;
const CONTROL_PRIORITY_MASK: u8 = 0b0000_1100;
const CONTROL_PATTERN_MASK: u8 = 0b0001_0011;
const CONTROL_VALID_PATTERN: u8 = 0b0001_0000;

// --- Routing field values & masks ---
/// Multicast, routing counter 6, payload length 1
const ROUTING_DEFAULT: u8 = 0b1110_0001;
const ROUTING_ADDRESS_TYPE_MASK: u8 = 0b1000_0000;
const ROUTING_COUNTER_MASK: u8 = 0b0111_0000;
const ROUTING_LENGTH_MASK: u8 = 0b0000_1111;

// --- Command field masks ---
const COMMAND_HIGH_MASK: u8 = 0x03;
const COMMAND_LOW_MASK: u8 = 0xC0;
const COMMAND_DATA_MASK: u8 = 0x3F;
const COMMAND_PATTERN_MASK: u8 = 0b1100_0000;
const COMMAND_VALID_PATTERN: u8 = 0b0000_0000;

/// KNX telegram priority levels
///
/// Encoded in bits 3-2 of the control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Priority {
    /// System priority (highest)
    System = 0b00,
    /// High priority
    High = 0b01,
    /// Alarm priority
    Alarm = 0b10,
    /// Normal priority (default)
    Normal = 0b11,
}

impl Priority {
    /// Convert the 2-bit field value to a Priority
    pub const fn from_u8(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::System,
            0b01 => Self::High,
            0b10 => Self::Alarm,
            0b11 => Self::Normal,
            _ => Self::Normal, // unreachable, but needed for exhaustiveness
        }
    }

    /// Convert Priority to its 2-bit field value
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// KNX application commands recognized by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// `A_GroupValue_Read`
    ValueRead = 0b0000,
    /// `A_GroupValue_Response`
    ValueResponse = 0b0001,
    /// `A_GroupValue_Write`
    ValueWrite = 0b0010,
    /// `A_Memory_Write` (recognized as valid, otherwise ignored)
    MemoryWrite = 0b1010,
}

impl Command {
    /// Convert a 4-bit field value to a Command
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0b0000 => Some(Self::ValueRead),
            0b0001 => Some(Self::ValueResponse),
            0b0010 => Some(Self::ValueWrite),
            0b1010 => Some(Self::MemoryWrite),
            _ => None,
        }
    }

    /// Convert Command to its 4-bit field value
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Result of [`Telegram::validity`] classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelegramValidity {
    /// The telegram is well formed
    Valid,
    /// The fixed bits of the control field do not match
    InvalidControlField,
    /// The frame format is not standard L_DATA
    UnsupportedFrameFormat,
    /// The payload length field is zero
    IncorrectPayloadLength,
    /// The fixed bits of the command-high byte are not zero
    InvalidCommandField,
    /// The 4-bit command is not in the recognized set
    UnknownCommand,
    /// The stored checksum does not match the computed one
    IncorrectChecksum,
}

/// A standard-length KNX L_DATA telegram.
///
/// The telegram is a plain 23-byte value; all fields are reached through
/// accessors reading and writing fixed byte offsets, which is portable
/// across endianness.
///
/// # Examples
///
/// ```
/// use knx_tpuart::{Command, Telegram};
///
/// let mut telegram = Telegram::new();
/// telegram.set_source_address(0x11FF);
/// telegram.set_target_address(0x0A01);
/// telegram.set_command(Command::ValueWrite);
/// telegram.set_first_payload_byte(1);
/// telegram.update_checksum();
/// assert_eq!(telegram.total_length(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telegram {
    raw: [u8; MAX_SIZE],
}

impl Telegram {
    /// Build a telegram with the default values: standard frame format,
    /// not repeated, normal priority, empty payload, multicast, routing
    /// counter 6, payload length 1.
    pub const fn new() -> Self {
        let mut raw = [0u8; MAX_SIZE];
        raw[0] = CONTROL_DEFAULT;
        raw[5] = ROUTING_DEFAULT;
        Self { raw }
    }

    /// Reset the telegram to the default values
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // --- Control field ---

    /// Set the priority bits of the control field
    #[inline]
    pub fn set_priority(&mut self, priority: Priority) {
        self.raw[0] = (self.raw[0] & !CONTROL_PRIORITY_MASK) | (priority.to_u8() << 2);
    }

    /// Get the priority encoded in the control field
    #[inline]
    pub const fn priority(&self) -> Priority {
        Priority::from_u8((self.raw[0] & CONTROL_PRIORITY_MASK) >> 2)
    }

    /// Mark the telegram as a retransmission (clears the repeat flag bit)
    #[inline]
    pub fn set_repeated(&mut self) {
        self.raw[0] &= !CONTROL_REPEATED_MASK;
    }

    /// Check whether the telegram is a retransmission
    #[inline]
    pub const fn is_repeated(&self) -> bool {
        self.raw[0] & CONTROL_REPEATED_MASK == 0
    }

    // --- Addresses (big-endian on the wire) ---

    /// Set the source (individual) address
    #[inline]
    pub fn set_source_address(&mut self, addr: u16) {
        let bytes = addr.to_be_bytes();
        self.raw[1] = bytes[0];
        self.raw[2] = bytes[1];
    }

    /// Get the source (individual) address
    #[inline]
    pub const fn source_address(&self) -> u16 {
        u16::from_be_bytes([self.raw[1], self.raw[2]])
    }

    /// Set the target (group or individual) address
    #[inline]
    pub fn set_target_address(&mut self, addr: u16) {
        let bytes = addr.to_be_bytes();
        self.raw[3] = bytes[0];
        self.raw[4] = bytes[1];
    }

    /// Get the target (group or individual) address
    #[inline]
    pub const fn target_address(&self) -> u16 {
        u16::from_be_bytes([self.raw[3], self.raw[4]])
    }

    // --- Routing field ---

    /// Set the target address type (true = group/multicast)
    #[inline]
    pub fn set_multicast(&mut self, multicast: bool) {
        if multicast {
            self.raw[5] |= ROUTING_ADDRESS_TYPE_MASK;
        } else {
            self.raw[5] &= !ROUTING_ADDRESS_TYPE_MASK;
        }
    }

    /// Check whether the target address is a group address
    #[inline]
    pub const fn is_multicast(&self) -> bool {
        self.raw[5] & ROUTING_ADDRESS_TYPE_MASK != 0
    }

    /// Set the routing counter (0-7)
    #[inline]
    pub fn set_routing_counter(&mut self, counter: u8) {
        self.raw[5] = (self.raw[5] & !ROUTING_COUNTER_MASK) | ((counter << 4) & ROUTING_COUNTER_MASK);
    }

    /// Get the routing counter (0-7)
    #[inline]
    pub const fn routing_counter(&self) -> u8 {
        (self.raw[5] & ROUTING_COUNTER_MASK) >> 4
    }

    /// Set the payload length (1-15)
    #[inline]
    pub fn set_payload_length(&mut self, length: u8) {
        self.raw[5] = (self.raw[5] & !ROUTING_LENGTH_MASK) | (length & ROUTING_LENGTH_MASK);
    }

    /// Get the payload length (1-15)
    #[inline]
    pub const fn payload_length(&self) -> u8 {
        self.raw[5] & ROUTING_LENGTH_MASK
    }

    /// Get the total telegram length including header and checksum
    #[inline]
    pub const fn total_length(&self) -> u8 {
        LENGTH_OFFSET + self.payload_length()
    }

    // --- Command field ---

    /// Set the 4-bit command, split across bytes 6 and 7
    #[inline]
    pub fn set_command(&mut self, command: Command) {
        let cmd = command.to_u8();
        self.raw[6] = (self.raw[6] & !COMMAND_HIGH_MASK) | (cmd >> 2);
        self.raw[7] = (self.raw[7] & !COMMAND_LOW_MASK) | (cmd << 6);
    }

    /// Get the raw 4-bit command value
    #[inline]
    pub const fn command_raw(&self) -> u8 {
        ((self.raw[7] & COMMAND_LOW_MASK) >> 6) | ((self.raw[6] & COMMAND_HIGH_MASK) << 2)
    }

    /// Get the command, if it is one of the recognized values
    #[inline]
    pub const fn command(&self) -> Option<Command> {
        Command::from_u8(self.command_raw())
    }

    // --- First payload byte (6 lowest bits of byte 7) ---

    /// Set the first payload byte (6 bits)
    #[inline]
    pub fn set_first_payload_byte(&mut self, data: u8) {
        self.raw[7] = (self.raw[7] & !COMMAND_DATA_MASK) | (data & COMMAND_DATA_MASK);
    }

    /// Clear the first payload byte
    #[inline]
    pub fn clear_first_payload_byte(&mut self) {
        self.raw[7] &= !COMMAND_DATA_MASK;
    }

    /// Get the first payload byte (6 bits)
    #[inline]
    pub const fn first_payload_byte(&self) -> u8 {
        self.raw[7] & COMMAND_DATA_MASK
    }

    // --- Raw byte access ---

    /// Read the telegram byte at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`MAX_SIZE`].
    #[inline]
    pub const fn read_raw_byte(&self, index: u8) -> u8 {
        self.raw[index as usize]
    }

    /// Write the telegram byte at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`MAX_SIZE`].
    #[inline]
    pub fn write_raw_byte(&mut self, index: u8, data: u8) {
        self.raw[index as usize] = data;
    }

    // --- Long payload (payload bytes 2..16, i.e. raw bytes 8..22) ---

    /// Set payload bytes starting from the 2nd payload byte.
    ///
    /// At most 14 bytes are copied; a longer `origin` is truncated.
    pub fn set_long_payload(&mut self, origin: &[u8]) {
        let count = origin.len().min(PAYLOAD_MAX_SIZE - 2);
        self.raw[8..8 + count].copy_from_slice(&origin[..count]);
    }

    /// Get payload bytes starting from the 2nd payload byte.
    ///
    /// At most 14 bytes are copied; a longer `destination` is left
    /// untouched past that point.
    pub fn long_payload(&self, destination: &mut [u8]) {
        let count = destination.len().min(PAYLOAD_MAX_SIZE - 2);
        destination[..count].copy_from_slice(&self.raw[8..8 + count]);
    }

    /// Clear the whole payload except the 1st payload byte
    pub fn clear_long_payload(&mut self) {
        for byte in &mut self.raw[8..8 + PAYLOAD_MAX_SIZE - 1] {
            *byte = 0;
        }
    }

    // --- Checksum ---

    /// Get the checksum byte stored after the payload
    #[inline]
    pub const fn checksum(&self) -> u8 {
        self.raw[HEADER_SIZE + self.payload_length() as usize + 1]
    }

    /// Compute the checksum over the current telegram content.
    ///
    /// The checksum is the 1's complement of the XOR sum of all bytes
    /// before the checksum position.
    pub fn compute_checksum(&self) -> u8 {
        let end = HEADER_SIZE + self.payload_length() as usize + 1;
        let mut xor_sum = 0u8;
        for byte in &self.raw[..end] {
            xor_sum ^= byte;
        }
        !xor_sum
    }

    /// Compute and store the proper checksum value in the telegram
    pub fn update_checksum(&mut self) {
        let index = HEADER_SIZE + self.payload_length() as usize + 1;
        self.raw[index] = self.compute_checksum();
    }

    /// Check whether the stored checksum matches the computed one
    #[inline]
    pub fn is_checksum_correct(&self) -> bool {
        self.checksum() == self.compute_checksum()
    }

    // --- Copies ---

    /// Copy the telegram content (total length bytes) into `dest`
    pub fn copy_into(&self, dest: &mut Telegram) {
        let length = self.total_length() as usize;
        dest.raw[..length].copy_from_slice(&self.raw[..length]);
    }

    /// Copy the 6 header bytes into `dest`
    pub fn copy_header_into(&self, dest: &mut Telegram) {
        dest.raw[..HEADER_SIZE].copy_from_slice(&self.raw[..HEADER_SIZE]);
    }

    // --- Validity ---

    /// Classify the telegram.
    ///
    /// The checks run in a fixed order: control-field pattern, frame
    /// format, payload length, command-field pattern, checksum, and
    /// finally command membership.
    pub fn validity(&self) -> TelegramValidity {
        if self.raw[0] & CONTROL_PATTERN_MASK != CONTROL_VALID_PATTERN {
            return TelegramValidity::InvalidControlField;
        }
        if self.raw[0] & CONTROL_FRAME_FORMAT_MASK != CONTROL_STANDARD_FRAME {
            return TelegramValidity::UnsupportedFrameFormat;
        }
        if self.payload_length() == 0 {
            return TelegramValidity::IncorrectPayloadLength;
        }
        if self.raw[6] & COMMAND_PATTERN_MASK != COMMAND_VALID_PATTERN {
            return TelegramValidity::InvalidCommandField;
        }
        if !self.is_checksum_correct() {
            return TelegramValidity::IncorrectChecksum;
        }
        if self.command().is_none() {
            return TelegramValidity::UnknownCommand;
        }
        TelegramValidity::Valid
    }
}

impl Default for Telegram {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = match self.command() {
            Some(Command::ValueRead) => "VAL_READ",
            Some(Command::ValueResponse) => "VAL_RESP",
            Some(Command::ValueWrite) => "VAL_WRITE",
            Some(Command::MemoryWrite) => "MEM_WRITE",
            None => "UNKNOWN",
        };
        write!(
            f,
            "src={:04X} dst={:04X} {} len={} cmd={} payload={:02X}",
            self.source_address(),
            self.target_address(),
            if self.is_multicast() { "grp" } else { "ind" },
            self.payload_length(),
            command,
            self.first_payload_byte(),
        )?;
        for i in 0..self.payload_length().saturating_sub(1) {
            write!(f, " {:02X}", self.raw[8 + i as usize])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let telegram = Telegram::new();
        assert_eq!(telegram.read_raw_byte(0), 0b1011_1100);
        assert_eq!(telegram.read_raw_byte(5), 0b1110_0001);
        assert!(!telegram.is_repeated());
        assert_eq!(telegram.priority(), Priority::Normal);
        assert!(telegram.is_multicast());
        assert_eq!(telegram.routing_counter(), 6);
        assert_eq!(telegram.payload_length(), 1);
        assert_eq!(telegram.total_length(), 9);
        assert_eq!(telegram.source_address(), 0);
        assert_eq!(telegram.target_address(), 0);
    }

    #[test]
    fn test_priority_round_trip() {
        let mut telegram = Telegram::new();
        for priority in [Priority::System, Priority::High, Priority::Alarm, Priority::Normal] {
            telegram.set_priority(priority);
            assert_eq!(telegram.priority(), priority);
        }
        // other control bits untouched
        assert_eq!(telegram.read_raw_byte(0) & !CONTROL_PRIORITY_MASK, 0b1011_0000);
    }

    #[test]
    fn test_address_round_trip() {
        let mut telegram = Telegram::new();
        telegram.set_source_address(0x11FF);
        telegram.set_target_address(0x0A01);
        assert_eq!(telegram.source_address(), 0x11FF);
        assert_eq!(telegram.target_address(), 0x0A01);
        // big-endian on the wire
        assert_eq!(telegram.read_raw_byte(1), 0x11);
        assert_eq!(telegram.read_raw_byte(2), 0xFF);
        assert_eq!(telegram.read_raw_byte(3), 0x0A);
        assert_eq!(telegram.read_raw_byte(4), 0x01);
    }

    #[test]
    fn test_repeated_flag() {
        let mut telegram = Telegram::new();
        assert!(!telegram.is_repeated());
        telegram.set_repeated();
        assert!(telegram.is_repeated());
        assert_eq!(telegram.read_raw_byte(0), 0b1001_1100);
    }

    #[test]
    fn test_routing_round_trip() {
        let mut telegram = Telegram::new();
        telegram.set_multicast(false);
        assert!(!telegram.is_multicast());
        telegram.set_multicast(true);
        assert!(telegram.is_multicast());

        telegram.set_routing_counter(3);
        assert_eq!(telegram.routing_counter(), 3);

        for length in 1..=15u8 {
            telegram.set_payload_length(length);
            assert_eq!(telegram.payload_length(), length);
            assert_eq!(telegram.total_length(), length + 8);
        }
        assert_eq!(telegram.routing_counter(), 3);
    }

    #[test]
    fn test_command_round_trip() {
        let mut telegram = Telegram::new();
        for command in [
            Command::ValueRead,
            Command::ValueResponse,
            Command::ValueWrite,
            Command::MemoryWrite,
        ] {
            telegram.set_command(command);
            assert_eq!(telegram.command(), Some(command));
        }
    }

    #[test]
    fn test_command_does_not_clobber_payload() {
        let mut telegram = Telegram::new();
        telegram.set_first_payload_byte(0x2A);
        telegram.set_command(Command::ValueWrite);
        assert_eq!(telegram.first_payload_byte(), 0x2A);
        assert_eq!(telegram.command(), Some(Command::ValueWrite));

        telegram.clear_first_payload_byte();
        assert_eq!(telegram.first_payload_byte(), 0);
        assert_eq!(telegram.command(), Some(Command::ValueWrite));
    }

    #[test]
    fn test_long_payload() {
        let mut telegram = Telegram::new();
        telegram.set_payload_length(5);
        telegram.set_long_payload(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut out = [0u8; 4];
        telegram.long_payload(&mut out);
        assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);

        telegram.clear_long_payload();
        telegram.long_payload(&mut out);
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn test_checksum_known_frame() {
        // Group write of value 1 from 1.1.255 to 1/2/1
        let bytes = [0xBC, 0x11, 0xFF, 0x0A, 0x01, 0xE1, 0x00, 0x81];
        let mut telegram = Telegram::new();
        for (i, byte) in bytes.iter().enumerate() {
            telegram.write_raw_byte(i as u8, *byte);
        }
        assert_eq!(telegram.compute_checksum(), 0xC6);

        telegram.update_checksum();
        assert_eq!(telegram.checksum(), 0xC6);
        assert!(telegram.is_checksum_correct());
        assert_eq!(telegram.validity(), TelegramValidity::Valid);

        // any other checksum value is rejected
        telegram.write_raw_byte(8, 0x52);
        assert_eq!(telegram.validity(), TelegramValidity::IncorrectChecksum);
    }

    #[test]
    fn test_checksum_tracks_payload_length() {
        let mut telegram = Telegram::new();
        telegram.set_target_address(0x0A02);
        telegram.set_payload_length(3);
        telegram.set_command(Command::ValueResponse);
        telegram.set_long_payload(&[0x12, 0x34]);
        telegram.update_checksum();
        assert_eq!(telegram.total_length(), 11);
        assert_eq!(telegram.checksum(), telegram.read_raw_byte(10));
        assert_eq!(telegram.validity(), TelegramValidity::Valid);
    }

    #[test]
    fn test_validity_classification_order() {
        // invalid control field pattern (bit 4 cleared)
        let mut telegram = Telegram::new();
        telegram.write_raw_byte(0, 0b1010_1100);
        assert_eq!(telegram.validity(), TelegramValidity::InvalidControlField);

        // extended frame format
        let mut telegram = Telegram::new();
        telegram.write_raw_byte(0, 0b0011_1100);
        assert_eq!(telegram.validity(), TelegramValidity::UnsupportedFrameFormat);

        // zero payload length
        let mut telegram = Telegram::new();
        telegram.set_payload_length(0);
        assert_eq!(telegram.validity(), TelegramValidity::IncorrectPayloadLength);

        // command-high pattern bits set
        let mut telegram = Telegram::new();
        telegram.write_raw_byte(6, 0b0100_0000);
        assert_eq!(telegram.validity(), TelegramValidity::InvalidCommandField);

        // checksum is checked before command membership
        let mut telegram = Telegram::new();
        telegram.write_raw_byte(6, 0x01); // command 0b0100, not recognized
        assert_eq!(telegram.validity(), TelegramValidity::IncorrectChecksum);
        telegram.update_checksum();
        assert_eq!(telegram.validity(), TelegramValidity::UnknownCommand);
    }

    #[test]
    fn test_valid_telegram() {
        let mut telegram = Telegram::new();
        telegram.set_source_address(0x1101);
        telegram.set_target_address(0x0A03);
        telegram.set_command(Command::ValueWrite);
        telegram.set_first_payload_byte(1);
        telegram.update_checksum();
        assert_eq!(telegram.validity(), TelegramValidity::Valid);
    }

    #[test]
    fn test_copies() {
        let mut src = Telegram::new();
        src.set_source_address(0x1101);
        src.set_target_address(0x0A03);
        src.set_payload_length(3);
        src.set_long_payload(&[0xAA, 0xBB]);
        src.update_checksum();

        let mut whole = Telegram::new();
        src.copy_into(&mut whole);
        for i in 0..src.total_length() {
            assert_eq!(whole.read_raw_byte(i), src.read_raw_byte(i));
        }

        let mut header = Telegram::new();
        src.copy_header_into(&mut header);
        assert_eq!(header.target_address(), 0x0A03);
        assert_eq!(header.payload_length(), 3);
        // payload untouched
        assert_eq!(header.read_raw_byte(8), 0);
    }

    #[test]
    fn test_raw_byte_access() {
        let mut telegram = Telegram::new();
        telegram.write_raw_byte(12, 0x5A);
        assert_eq!(telegram.read_raw_byte(12), 0x5A);
    }

    #[test]
    fn test_clear_restores_defaults() {
        let mut telegram = Telegram::new();
        telegram.set_source_address(0x1101);
        telegram.set_payload_length(7);
        telegram.set_repeated();
        telegram.clear();
        assert_eq!(telegram, Telegram::new());
    }
}
