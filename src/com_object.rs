//! KNX Communication Objects.
//!
//! A communication object is a device-local, group-addressed, typed bus
//! variable. The application declares a fixed table of objects at
//! startup; indices into that table are the only object handles used by
//! the stack.
//!
//! Each object carries immutable identity (group address, datapoint
//! type, access flags, priority, derived payload length) and mutable
//! state (the value and a validity marker). Objects flagged `INIT_READ`
//! start invalid and stay so until the first update from the bus.

use crate::addressing::GroupAddress;
use crate::dpt::DptId;
use crate::error::{KnxError, Result};
use crate::telegram::{Priority, Telegram};
use core::fmt;

/// Access flag bits of a communication object.
///
/// ```text
/// INDICATOR field : B7  B6  B5  B4  B3  B2  B1  B0
///                   xx  xx   C   R   W   T   U   I
/// ```
///
/// See "knx.org" for the com obj indicators specification.
pub mod flags {
    /// Communication (C) - the object participates in bus traffic
    pub const COMMUNICATION: u8 = 0x20;
    /// Read (R) - read requests from the bus are answered
    pub const READ: u8 = 0x10;
    /// Write (W) - write telegrams from the bus update the value
    pub const WRITE: u8 = 0x08;
    /// Transmit (T) - local writes are transmitted on the bus
    pub const TRANSMIT: u8 = 0x04;
    /// Update (U) - response telegrams from the bus update the value
    pub const UPDATE: u8 = 0x02;
    /// Init Read (I) - the value is fetched from the bus at startup
    pub const INIT_READ: u8 = 0x01;

    /// Sensor profile (Communication | Read | Transmit)
    pub const SENSOR: u8 = COMMUNICATION | READ | TRANSMIT;
    /// Logic input profile (Communication | Write | Update)
    pub const LOGIC_IN: u8 = COMMUNICATION | WRITE | UPDATE;
    /// Logic input initialized at bus power-up
    pub const LOGIC_IN_INIT: u8 = COMMUNICATION | WRITE | UPDATE | INIT_READ;
}

/// Maximum stored value width: a 15-byte payload carries 14 value bytes
/// after the first payload byte.
pub const VALUE_MAX_SIZE: usize = 14;

/// A typed, group-addressed bus variable.
///
/// Values of up to one byte ("short" objects, payload length <= 2) live
/// in the first value byte; wider values occupy `length - 1` bytes of
/// the inline buffer. No allocator is involved.
///
/// # Examples
///
/// ```
/// use knx_tpuart::{ComObject, DptId, ga};
/// use knx_tpuart::com_object::flags;
///
/// let mut objects = [
///     ComObject::new(ga!(0/2/1), DptId::Switch, flags::LOGIC_IN),
///     ComObject::new(ga!(0/2/2), DptId::Temperature, flags::SENSOR),
/// ];
/// assert_eq!(objects[0].length(), 1);
/// assert_eq!(objects[1].length(), 3);
///
/// objects[0].set_value(1)?;
/// assert_eq!(objects[0].value(), 1);
/// # Ok::<(), knx_tpuart::KnxError>(())
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComObject {
    addr: GroupAddress,
    dpt: DptId,
    indicator: u8,
    priority: Priority,
    // data length, calculated in the same way as the telegram payload length
    length: u8,
    // remains false for "InitRead" objects until the value is updated
    validity: bool,
    value: [u8; VALUE_MAX_SIZE],
}

impl ComObject {
    /// Create a communication object with normal priority.
    pub const fn new(addr: GroupAddress, dpt: DptId, indicator: u8) -> Self {
        Self::with_priority(addr, dpt, indicator, Priority::Normal)
    }

    /// Create a communication object with an explicit bus priority.
    pub const fn with_priority(
        addr: GroupAddress,
        dpt: DptId,
        indicator: u8,
        priority: Priority,
    ) -> Self {
        Self {
            addr,
            dpt,
            indicator,
            priority,
            length: dpt.payload_length(),
            validity: indicator & flags::INIT_READ == 0,
            value: [0; VALUE_MAX_SIZE],
        }
    }

    /// Group address the object is bound to
    #[inline(always)]
    pub const fn addr(&self) -> GroupAddress {
        self.addr
    }

    /// Datapoint type of the object
    #[inline(always)]
    pub const fn dpt_id(&self) -> DptId {
        self.dpt
    }

    /// Access flag bits (see [`flags`])
    #[inline(always)]
    pub const fn indicator(&self) -> u8 {
        self.indicator
    }

    /// Bus priority used for telegrams carrying this object
    #[inline(always)]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Whether the value has been set since startup.
    ///
    /// Objects with the `INIT_READ` flag start invalid.
    #[inline(always)]
    pub const fn valid(&self) -> bool {
        self.validity
    }

    /// Telegram payload length of the object (1-15)
    #[inline(always)]
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// Whether the value fits in a single byte
    #[inline(always)]
    pub const fn is_short(&self) -> bool {
        self.length <= 2
    }

    /// Return the object value (short value case only).
    ///
    /// For long objects this returns the first value byte, which is
    /// rarely what the caller wants; use [`read_value`](Self::read_value)
    /// instead.
    #[inline(always)]
    pub const fn value(&self) -> u8 {
        self.value[0]
    }

    /// Update the object value (short value case only).
    ///
    /// # Errors
    ///
    /// Returns a wrong-length error when the object is a long one.
    pub fn set_value(&mut self, new_value: u8) -> Result<()> {
        if self.length > 2 {
            return Err(KnxError::wrong_length());
        }
        self.value[0] = new_value;
        self.validity = true;
        Ok(())
    }

    /// Toggle bit 0 of the value (for objects with "B1" format).
    ///
    /// The validity is left unchanged.
    pub fn toggle_value(&mut self) {
        self.value[0] ^= 0x01;
    }

    /// Copy the object value into `dest` (short and long value cases).
    ///
    /// # Errors
    ///
    /// Returns a buffer error when `dest` cannot hold the value.
    pub fn read_value(&self, dest: &mut [u8]) -> Result<()> {
        let count = self.value_len();
        let dest = dest.get_mut(..count).ok_or_else(KnxError::buffer_too_small)?;
        dest.copy_from_slice(&self.value[..count]);
        Ok(())
    }

    /// Update the object value from `origin` (short and long value cases).
    ///
    /// Marks the object valid. `origin` must hold at least
    /// `length - 1` bytes (one byte for short objects).
    pub fn update_value(&mut self, origin: &[u8]) {
        let count = self.value_len().min(origin.len());
        self.value[..count].copy_from_slice(&origin[..count]);
        self.validity = true;
    }

    /// Update the object value from a telegram payload.
    ///
    /// # Errors
    ///
    /// Returns a wrong-length error when the telegram payload length
    /// differs from the object one; the value is left untouched.
    pub fn update_from_telegram(&mut self, origin: &Telegram) -> Result<()> {
        if origin.payload_length() != self.length {
            return Err(KnxError::wrong_length());
        }
        if self.length == 1 {
            self.value[0] = origin.first_payload_byte();
        } else {
            origin.long_payload(&mut self.value[..usize::from(self.length - 1)]);
        }
        self.validity = true;
        Ok(())
    }

    /// Copy the object attributes (target address, priority, payload
    /// length) into a telegram.
    pub fn copy_attributes_into(&self, dest: &mut Telegram) {
        dest.set_priority(self.priority);
        dest.set_target_address(self.addr.raw());
        dest.set_payload_length(self.length);
    }

    /// Copy the object value into a telegram payload.
    pub fn copy_value_into(&self, dest: &mut Telegram) {
        if self.length == 1 {
            dest.set_first_payload_byte(self.value[0]);
        } else {
            dest.set_long_payload(&self.value[..usize::from(self.length - 1)]);
        }
    }

    // number of stored value bytes
    const fn value_len(&self) -> usize {
        if self.length <= 2 {
            1
        } else {
            (self.length - 1) as usize
        }
    }
}

impl fmt::Display for ComObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "addr={} dpt={} flags={:02X} len={} valid={}",
            self.addr,
            self.dpt.identifier(),
            self.indicator,
            self.length,
            if self.validity { "yes" } else { "no" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::Command;

    fn switch_object(indicator: u8) -> ComObject {
        ComObject::new(GroupAddress::from_raw(0x0A01), DptId::Switch, indicator)
    }

    #[test]
    fn test_lengths_from_dpt() {
        let short = switch_object(flags::LOGIC_IN);
        assert_eq!(short.length(), 1);
        assert!(short.is_short());

        let wide = ComObject::new(GroupAddress::from_raw(0x0A02), DptId::Brightness, flags::SENSOR);
        assert_eq!(wide.length(), 3);
        assert!(!wide.is_short());

        let energy =
            ComObject::new(GroupAddress::from_raw(0x0A03), DptId::ActiveEnergy, flags::SENSOR);
        assert_eq!(energy.length(), 5);
    }

    #[test]
    fn test_validity_follows_init_read_flag() {
        assert!(switch_object(flags::LOGIC_IN).valid());
        assert!(!switch_object(flags::LOGIC_IN_INIT).valid());

        let mut object = switch_object(flags::LOGIC_IN_INIT);
        object.set_value(1).unwrap();
        assert!(object.valid());
    }

    #[test]
    fn test_short_value_access() {
        let mut object = switch_object(flags::LOGIC_IN);
        object.set_value(1).unwrap();
        assert_eq!(object.value(), 1);

        object.toggle_value();
        assert_eq!(object.value(), 0);
        object.toggle_value();
        assert_eq!(object.value(), 1);
    }

    #[test]
    fn test_set_value_rejects_long_objects() {
        let mut object =
            ComObject::new(GroupAddress::from_raw(0x0A02), DptId::Temperature, flags::SENSOR);
        assert!(object.set_value(1).is_err());
        assert!(object.valid());
    }

    #[test]
    fn test_long_value_round_trip() {
        let mut object =
            ComObject::new(GroupAddress::from_raw(0x0A03), DptId::LongCount, flags::SENSOR);
        object.update_value(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut out = [0u8; 4];
        object.read_value(&mut out).unwrap();
        assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);

        let mut small = [0u8; 2];
        assert!(object.read_value(&mut small).is_err());
    }

    #[test]
    fn test_update_from_telegram_short() {
        let mut telegram = Telegram::new();
        telegram.set_target_address(0x0A01);
        telegram.set_command(Command::ValueWrite);
        telegram.set_first_payload_byte(1);
        telegram.update_checksum();

        let mut object = switch_object(flags::LOGIC_IN_INIT);
        object.update_from_telegram(&telegram).unwrap();
        assert_eq!(object.value(), 1);
        assert!(object.valid());
    }

    #[test]
    fn test_update_from_telegram_long() {
        let mut telegram = Telegram::new();
        telegram.set_target_address(0x0A02);
        telegram.set_payload_length(3);
        telegram.set_command(Command::ValueResponse);
        telegram.set_long_payload(&[0x12, 0x34]);
        telegram.update_checksum();

        let mut object =
            ComObject::new(GroupAddress::from_raw(0x0A02), DptId::Brightness, flags::LOGIC_IN);
        object.update_from_telegram(&telegram).unwrap();
        let mut out = [0u8; 2];
        object.read_value(&mut out).unwrap();
        assert_eq!(out, [0x12, 0x34]);
    }

    #[test]
    fn test_update_from_telegram_length_mismatch() {
        let telegram = Telegram::new(); // payload length 1
        let mut object =
            ComObject::new(GroupAddress::from_raw(0x0A02), DptId::Brightness, flags::LOGIC_IN);
        assert!(object.update_from_telegram(&telegram).is_err());
    }

    #[test]
    fn test_copy_into_telegram() {
        let mut object = ComObject::with_priority(
            GroupAddress::from_raw(0x0A02),
            DptId::Brightness,
            flags::SENSOR,
            Priority::High,
        );
        object.update_value(&[0x12, 0x34]);

        let mut telegram = Telegram::new();
        object.copy_attributes_into(&mut telegram);
        object.copy_value_into(&mut telegram);
        telegram.set_command(Command::ValueResponse);
        telegram.update_checksum();

        assert_eq!(telegram.target_address(), 0x0A02);
        assert_eq!(telegram.priority(), Priority::High);
        assert_eq!(telegram.payload_length(), 3);
        assert_eq!(telegram.read_raw_byte(8), 0x12);
        assert_eq!(telegram.read_raw_byte(9), 0x34);
    }

    #[test]
    fn test_copy_short_value_into_telegram() {
        let mut object = switch_object(flags::SENSOR);
        object.set_value(1).unwrap();

        let mut telegram = Telegram::new();
        object.copy_attributes_into(&mut telegram);
        object.copy_value_into(&mut telegram);
        assert_eq!(telegram.payload_length(), 1);
        assert_eq!(telegram.first_payload_byte(), 1);
    }
}
