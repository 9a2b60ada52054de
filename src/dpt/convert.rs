//! Numeric conversions between native types and DPT wire formats.
//!
//! The conversions are keyed on the [`DptFormat`] tag; the caller picks
//! the native type and casts at the boundary. Only the usual formats are
//! supported (U16, V16, U32, V32 and F16); F32 is catalogued but returns
//! `NotImplemented`.
//!
//! ## F16 format
//!
//! ```text
//! Byte 0: SEEE EMMM
//! Byte 1: MMMM MMMM
//!
//! S = Sign bit (0 = positive, 1 = negative)
//! E = Exponent (4 bits, unsigned, range 0-15)
//! M = Mantissa (11 bits, two's complement when S=1)
//!
//! Value = 0.01 * M * 2^E
//! ```

use crate::dpt::DptFormat;
use crate::error::{KnxError, Result};

/// Smallest F16 mantissa value
const F16_MANTISSA_MIN: i32 = -2048;
/// Largest F16 mantissa value
const F16_MANTISSA_MAX: i32 = 2047;
/// Largest F16 exponent value
const F16_EXPONENT_MAX: u8 = 15;

impl DptFormat {
    /// Decode raw DPT data to an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is shorter than the format width or
    /// the format has no unsigned integer interpretation.
    pub fn decode_unsigned(self, data: &[u8]) -> Result<u32> {
        match self {
            Self::U16 | Self::V16 => {
                let bytes = data.get(..2).ok_or_else(KnxError::invalid_dpt_data)?;
                Ok(u32::from(u16::from_be_bytes([bytes[0], bytes[1]])))
            }
            Self::U32 | Self::V32 => {
                let bytes = data.get(..4).ok_or_else(KnxError::invalid_dpt_data)?;
                Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            Self::F32 => Err(KnxError::NotImplemented),
            _ => Err(KnxError::unsupported_dpt_format()),
        }
    }

    /// Decode raw DPT data to a signed integer.
    ///
    /// The 16-bit formats are sign-extended.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is shorter than the format width or
    /// the format has no signed integer interpretation.
    pub fn decode_signed(self, data: &[u8]) -> Result<i32> {
        match self {
            Self::U16 => Ok(self.decode_unsigned(data)? as i32),
            Self::V16 => {
                let bytes = data.get(..2).ok_or_else(KnxError::invalid_dpt_data)?;
                Ok(i32::from(i16::from_be_bytes([bytes[0], bytes[1]])))
            }
            Self::U32 | Self::V32 => Ok(self.decode_unsigned(data)? as i32),
            Self::F32 => Err(KnxError::NotImplemented),
            _ => Err(KnxError::unsupported_dpt_format()),
        }
    }

    /// Decode raw DPT data to a float.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is shorter than the format width,
    /// `NotImplemented` for F32, or an error if the format has no float
    /// interpretation.
    pub fn decode_float(self, data: &[u8]) -> Result<f32> {
        match self {
            Self::F16 => {
                let bytes = data.get(..2).ok_or_else(KnxError::invalid_dpt_data)?;
                let sign_negative = bytes[0] & 0x80 != 0;
                let exponent = (bytes[0] >> 3) & 0x0F;
                let mantissa_raw = (u16::from(bytes[0] & 0x07) << 8) | u16::from(bytes[1]);
                // negative mantissa is two's complement on 11 bits
                let mantissa: i32 = if sign_negative {
                    -(i32::from((!mantissa_raw & 0x07FF) + 1))
                } else {
                    i32::from(mantissa_raw)
                };
                Ok(0.01 * (mantissa << exponent) as f32)
            }
            Self::U16 | Self::V16 | Self::U32 | Self::V32 => {
                Ok(self.decode_signed(data)? as f32)
            }
            Self::F32 => Err(KnxError::NotImplemented),
            _ => Err(KnxError::unsupported_dpt_format()),
        }
    }

    /// Encode an unsigned integer into raw DPT data.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` is shorter than the format width or the
    /// format has no unsigned integer interpretation.
    pub fn encode_unsigned(self, value: u32, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::U16 | Self::V16 => {
                let bytes = buf.get_mut(..2).ok_or_else(KnxError::buffer_too_small)?;
                bytes.copy_from_slice(&(value as u16).to_be_bytes());
                Ok(2)
            }
            Self::U32 | Self::V32 => {
                let bytes = buf.get_mut(..4).ok_or_else(KnxError::buffer_too_small)?;
                bytes.copy_from_slice(&value.to_be_bytes());
                Ok(4)
            }
            Self::F32 => Err(KnxError::NotImplemented),
            _ => Err(KnxError::unsupported_dpt_format()),
        }
    }

    /// Encode a signed integer into raw DPT data.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if `buf` is shorter than the format width or the
    /// format has no signed integer interpretation.
    pub fn encode_signed(self, value: i32, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::U16 | Self::V16 => {
                let bytes = buf.get_mut(..2).ok_or_else(KnxError::buffer_too_small)?;
                bytes.copy_from_slice(&(value as i16).to_be_bytes());
                Ok(2)
            }
            Self::U32 | Self::V32 => self.encode_unsigned(value as u32, buf),
            Self::F32 => Err(KnxError::NotImplemented),
            _ => Err(KnxError::unsupported_dpt_format()),
        }
    }

    /// Encode a float into raw DPT data.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `NotImplemented` for F32 and a range error when the value
    /// does not fit the F16 range.
    pub fn encode_float(self, value: f32, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::F16 => {
                let bytes = buf.get_mut(..2).ok_or_else(KnxError::buffer_too_small)?;

                // scale to the 0.01 resolution, rounding to nearest
                let scaled = value * 100.0;
                let mut x100: i32 = if scaled >= 0.0 {
                    (scaled + 0.5) as i32
                } else {
                    (scaled - 0.5) as i32
                };

                // normalize into the 11-bit mantissa, tracking the last
                // shifted-out bit for round-half-up
                let mut exponent = 0u8;
                let mut round = false;
                while !(F16_MANTISSA_MIN..=F16_MANTISSA_MAX).contains(&x100) {
                    if exponent == F16_EXPONENT_MAX {
                        return Err(KnxError::dpt_value_out_of_range());
                    }
                    round = x100 & 1 != 0;
                    x100 >>= 1;
                    exponent += 1;
                }
                if round {
                    x100 += 1;
                    if x100 > F16_MANTISSA_MAX {
                        if exponent == F16_EXPONENT_MAX {
                            return Err(KnxError::dpt_value_out_of_range());
                        }
                        x100 >>= 1;
                        exponent += 1;
                    }
                }

                let mantissa = (x100 as u16) & 0x07FF;
                let mut byte0 = ((mantissa >> 8) as u8) | (exponent << 3);
                if x100 < 0 {
                    byte0 |= 0x80;
                }
                bytes[0] = byte0;
                bytes[1] = mantissa as u8;
                Ok(2)
            }
            Self::U16 | Self::V16 | Self::U32 | Self::V32 => {
                self.encode_signed(value as i32, buf)
            }
            Self::F32 => Err(KnxError::NotImplemented),
            _ => Err(KnxError::unsupported_dpt_format()),
        }
    }
}
