//! Error types for KNX operations following M-ERRORS-CANONICAL-STRUCTS guideline.
//!
//! This module provides structured error types with backtraces (when std is enabled)
//! and helper methods for error information.

use core::fmt;

#[cfg(feature = "std")]
use std::backtrace::Backtrace;

/// Result type alias for KNX operations.
pub type Result<T> = core::result::Result<T, KnxError>;

// =============================================================================
// Error Kind Enums (Internal)
// =============================================================================

/// DPT conversion error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum DptErrorKind {
    InvalidData,
    ValueOutOfRange,
    UnsupportedFormat,
}

/// Communication-object error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum ObjectErrorKind {
    WrongLength,
    IndexOutOfRange,
    BufferTooSmall,
    InvalidAddress,
}

/// Device scheduler error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum DeviceErrorKind {
    QueueFull,
}

/// TP-UART driver error variants (internal)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum TpUartErrorKind {
    Busy,
    ResetFailed,
    NotInitialized,
}

// =============================================================================
// Main Error Type
// =============================================================================

/// KNX error type.
///
/// This is the main error type returned by all fallible operations of the
/// stack. It contains a backtrace (when the std feature is enabled) and
/// detailed error information through helper methods.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KnxError {
    /// Datapoint conversion errors (encoding, decoding, range)
    Dpt(DptError),
    /// Communication-object access errors (length, index, buffer)
    Object(ObjectError),
    /// Device scheduler errors (queue, lifecycle)
    Device(DeviceError),
    /// TP-UART driver errors (busy, reset handshake)
    TpUart(TpUartError),
    /// The requested conversion exists in the datapoint catalogue but is
    /// not implemented (F32)
    NotImplemented,
    /// Operation not permitted in the current state
    InvalidState,
}

// =============================================================================
// Structured Error Types
// =============================================================================

/// DPT conversion error with optional backtrace
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DptError {
    kind: DptErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl DptError {
    pub(crate) fn new(kind: DptErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if the value did not fit the datapoint format
    pub fn is_out_of_range(&self) -> bool {
        matches!(self.kind, DptErrorKind::ValueOutOfRange)
    }

    /// Check if the raw data was too short or malformed
    pub fn is_invalid_data(&self) -> bool {
        matches!(self.kind, DptErrorKind::InvalidData)
    }
}

/// Communication-object error with optional backtrace
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ObjectError {
    kind: ObjectErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl ObjectError {
    pub(crate) fn new(kind: ObjectErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if a short-value accessor was used on a long object (or the
    /// other way round)
    pub fn is_wrong_length(&self) -> bool {
        matches!(self.kind, ObjectErrorKind::WrongLength)
    }

    /// Check if the object index was outside the table
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self.kind, ObjectErrorKind::IndexOutOfRange)
    }
}

/// Device scheduler error with optional backtrace
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceError {
    kind: DeviceErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl DeviceError {
    pub(crate) fn new(kind: DeviceErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if the action queue was full
    pub fn is_queue_full(&self) -> bool {
        matches!(self.kind, DeviceErrorKind::QueueFull)
    }
}

/// TP-UART driver error with optional backtrace
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TpUartError {
    kind: TpUartErrorKind,
    #[cfg(feature = "std")]
    backtrace: Backtrace,
}

impl TpUartError {
    pub(crate) fn new(kind: TpUartErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "std")]
            backtrace: Backtrace::capture(),
        }
    }

    /// Check if a transmission was already ongoing
    pub fn is_busy(&self) -> bool {
        matches!(self.kind, TpUartErrorKind::Busy)
    }

    /// Check if the chip reset handshake failed
    pub fn is_reset_failed(&self) -> bool {
        matches!(self.kind, TpUartErrorKind::ResetFailed)
    }
}

// =============================================================================
// Convenience Constructors for KnxError
// =============================================================================

impl KnxError {
    // DPT errors
    pub(crate) fn invalid_dpt_data() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::InvalidData))
    }

    pub(crate) fn dpt_value_out_of_range() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::ValueOutOfRange))
    }

    pub(crate) fn unsupported_dpt_format() -> Self {
        Self::Dpt(DptError::new(DptErrorKind::UnsupportedFormat))
    }

    // Communication-object errors
    pub(crate) fn wrong_length() -> Self {
        Self::Object(ObjectError::new(ObjectErrorKind::WrongLength))
    }

    pub(crate) fn index_out_of_range() -> Self {
        Self::Object(ObjectError::new(ObjectErrorKind::IndexOutOfRange))
    }

    pub(crate) fn buffer_too_small() -> Self {
        Self::Object(ObjectError::new(ObjectErrorKind::BufferTooSmall))
    }

    pub(crate) fn invalid_address() -> Self {
        Self::Object(ObjectError::new(ObjectErrorKind::InvalidAddress))
    }

    // Device errors
    pub(crate) fn queue_full() -> Self {
        Self::Device(DeviceError::new(DeviceErrorKind::QueueFull))
    }

    // TP-UART errors
    pub(crate) fn tpuart_busy() -> Self {
        Self::TpUart(TpUartError::new(TpUartErrorKind::Busy))
    }

    pub(crate) fn reset_failed() -> Self {
        Self::TpUart(TpUartError::new(TpUartErrorKind::ResetFailed))
    }

    pub(crate) fn not_initialized() -> Self {
        Self::TpUart(TpUartError::new(TpUartErrorKind::NotInitialized))
    }
}

// =============================================================================
// Display Implementation
// =============================================================================

impl fmt::Display for KnxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnxError::Dpt(e) => write!(f, "DPT error: {:?}", e.kind),
            KnxError::Object(e) => write!(f, "Com object error: {:?}", e.kind),
            KnxError::Device(e) => write!(f, "Device error: {:?}", e.kind),
            KnxError::TpUart(e) => write!(f, "TP-UART error: {:?}", e.kind),
            KnxError::NotImplemented => write!(f, "Not implemented"),
            KnxError::InvalidState => write!(f, "Invalid state"),
        }

        // Note: Backtrace will be printed when std::error::Error::source() is called
    }
}

// Implement std::error::Error for std-based applications
#[cfg(feature = "std")]
impl std::error::Error for KnxError {}
