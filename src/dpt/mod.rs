//! KNX Datapoint Types (DPT)
//!
//! This module provides the datapoint catalogue used by the
//! communication-object table and the encoding/decoding of the common
//! numeric formats.
//!
//! A [`DptId`] names a concrete datapoint type (e.g. 9.001 temperature);
//! every id maps to a [`DptFormat`] tag that fixes the bit width and the
//! wire encoding. The payload length of a communication object is derived
//! from the format: `length = bits / 8 + 1`. The logical bit formats of
//! up to 6 bits travel in the low bits of the first payload byte.
//!
//! ## Supported DPT Families
//!
//! - **DPT 1.xxx** - Boolean (1 bit): switches, buttons, binary sensors
//! - **DPT 2.xxx** - 1-bit controlled
//! - **DPT 3.xxx** - 3-bit controlled: dimming, blind control
//! - **DPT 5.xxx** - 8-bit unsigned: percentages, angles, counters
//! - **DPT 6.xxx** - 8-bit signed
//! - **DPT 7.xxx** - 16-bit unsigned: pulses, brightness
//! - **DPT 8.xxx** - 16-bit signed
//! - **DPT 9.xxx** - 2-byte float: temperature, illuminance, pressure
//! - **DPT 12.xxx** - 32-bit unsigned
//! - **DPT 13.xxx** - 32-bit signed: energy, flow rate, long counters
//! - **DPT 14.xxx** - 4-byte float (catalogued, conversion not implemented)

mod convert;

/// Wire format tag of a datapoint type.
///
/// The tag keys the numeric conversions: the caller picks the native
/// type (`u32`, `i32` or `f32`) and casts at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DptFormat {
    /// 1-bit boolean
    B1,
    /// 1-bit controlled (control + value)
    B2,
    /// 3-bit controlled (control + stepcode)
    B1U3,
    /// 8-bit unsigned
    U8,
    /// 8-bit signed
    V8,
    /// 16-bit unsigned
    U16,
    /// 16-bit signed
    V16,
    /// 2-byte float (KNX half precision)
    F16,
    /// 32-bit unsigned
    U32,
    /// 32-bit signed
    V32,
    /// 4-byte IEEE float (conversion not implemented)
    F32,
}

impl DptFormat {
    /// Bit width of the format on the wire
    pub const fn bit_length(self) -> u8 {
        match self {
            Self::B1 => 1,
            Self::B2 => 2,
            Self::B1U3 => 4,
            Self::U8 | Self::V8 => 8,
            Self::U16 | Self::V16 | Self::F16 => 16,
            Self::U32 | Self::V32 | Self::F32 => 32,
        }
    }

    /// Payload length of a telegram carrying this format.
    ///
    /// Data length is calculated in the same way as the telegram payload
    /// length: the formats of up to 6 bits fit into the first payload
    /// byte, wider formats occupy `bits / 8` extra payload bytes.
    pub const fn payload_length(self) -> u8 {
        self.bit_length() / 8 + 1
    }
}

/// Datapoint type identifiers.
///
/// A curated catalogue of the common datapoint types. Each identifier
/// carries its wire format; adding a new subtype is a one-line addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DptId {
    /// DPT 1.001 - Switch (on/off)
    Switch,
    /// DPT 1.002 - Boolean
    Bool,
    /// DPT 1.003 - Enable
    Enable,
    /// DPT 1.008 - Up/Down
    UpDown,
    /// DPT 1.009 - Open/Close
    OpenClose,
    /// DPT 2.001 - Switch control
    SwitchControl,
    /// DPT 3.007 - Dimming control
    DimmingControl,
    /// DPT 3.008 - Blind control
    BlindControl,
    /// DPT 5.001 - Percentage (0-100%)
    Percentage,
    /// DPT 5.003 - Angle (degrees)
    Angle,
    /// DPT 5.010 - Unsigned counter pulses
    CounterPulses,
    /// DPT 6.010 - Signed counter pulses
    SignedCounterPulses,
    /// DPT 7.001 - 2-byte pulse count
    PulseCount,
    /// DPT 7.013 - Brightness (lux)
    Brightness,
    /// DPT 8.001 - 2-byte signed count
    SignedCount,
    /// DPT 9.001 - Temperature (°C)
    Temperature,
    /// DPT 9.004 - Illuminance (lux)
    Illuminance,
    /// DPT 9.006 - Pressure (Pa)
    Pressure,
    /// DPT 9.007 - Humidity (%)
    Humidity,
    /// DPT 12.001 - 4-byte unsigned count
    LongCount,
    /// DPT 13.001 - 4-byte signed count
    SignedLongCount,
    /// DPT 13.010 - Active energy (Wh)
    ActiveEnergy,
    /// DPT 14.056 - Power (W, 4-byte float)
    PowerFloat,
}

impl DptId {
    /// Get the DPT identifier string
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Switch => "1.001",
            Self::Bool => "1.002",
            Self::Enable => "1.003",
            Self::UpDown => "1.008",
            Self::OpenClose => "1.009",
            Self::SwitchControl => "2.001",
            Self::DimmingControl => "3.007",
            Self::BlindControl => "3.008",
            Self::Percentage => "5.001",
            Self::Angle => "5.003",
            Self::CounterPulses => "5.010",
            Self::SignedCounterPulses => "6.010",
            Self::PulseCount => "7.001",
            Self::Brightness => "7.013",
            Self::SignedCount => "8.001",
            Self::Temperature => "9.001",
            Self::Illuminance => "9.004",
            Self::Pressure => "9.006",
            Self::Humidity => "9.007",
            Self::LongCount => "12.001",
            Self::SignedLongCount => "13.001",
            Self::ActiveEnergy => "13.010",
            Self::PowerFloat => "14.056",
        }
    }

    /// Get the wire format of this datapoint type
    pub const fn format(self) -> DptFormat {
        match self {
            Self::Switch | Self::Bool | Self::Enable | Self::UpDown | Self::OpenClose => {
                DptFormat::B1
            }
            Self::SwitchControl => DptFormat::B2,
            Self::DimmingControl | Self::BlindControl => DptFormat::B1U3,
            Self::Percentage | Self::Angle | Self::CounterPulses => DptFormat::U8,
            Self::SignedCounterPulses => DptFormat::V8,
            Self::PulseCount | Self::Brightness => DptFormat::U16,
            Self::SignedCount => DptFormat::V16,
            Self::Temperature | Self::Illuminance | Self::Pressure | Self::Humidity => {
                DptFormat::F16
            }
            Self::LongCount => DptFormat::U32,
            Self::SignedLongCount | Self::ActiveEnergy => DptFormat::V32,
            Self::PowerFloat => DptFormat::F32,
        }
    }

    /// Payload length of a telegram carrying this datapoint type
    pub const fn payload_length(self) -> u8 {
        self.format().payload_length()
    }
}
