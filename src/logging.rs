//! Unified Logging Macros
//!
//! This module provides a unified logging interface that automatically
//! selects between `defmt::` and `log::` based on the active feature
//! flags, and compiles to nothing when neither backend is enabled.
//!
//! # Usage
//!
//! ```rust,ignore
//! knx_log!(info, "device started");
//! knx_log!(warn, "tx action queue full");
//! ```
//!
//! # Feature Flags
//!
//! - `defmt` - Uses `defmt::` (most efficient for embedded targets)
//! - `log` - Uses the `log::` crate (for hosted targets)
//! - Neither - All log statements compile away

/// Unified logging macro - selects defmt:: or log:: based on features
///
/// The macro provides a consistent logging API across the whole stack,
/// regardless of which logging backend is configured at compile time.
#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! knx_log {
    (info, $($arg:tt)*) => { defmt::info!($($arg)*) };
    (debug, $($arg:tt)*) => { defmt::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { defmt::warn!($($arg)*) };
    (error, $($arg:tt)*) => { defmt::error!($($arg)*) };
    (trace, $($arg:tt)*) => { defmt::trace!($($arg)*) };
}

#[macro_export]
#[cfg(all(feature = "log", not(feature = "defmt")))]
macro_rules! knx_log {
    (info, $($arg:tt)*) => { log::info!($($arg)*) };
    (debug, $($arg:tt)*) => { log::debug!($($arg)*) };
    (warn, $($arg:tt)*) => { log::warn!($($arg)*) };
    (error, $($arg:tt)*) => { log::error!($($arg)*) };
    (trace, $($arg:tt)*) => { log::trace!($($arg)*) };
}

#[macro_export]
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! knx_log {
    ($level:ident, $($arg:tt)*) => {{
        let _ = ($($arg)*);
    }};
}
