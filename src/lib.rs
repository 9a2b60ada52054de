#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

//! # knx-tpuart
//!
//! KNX TP1 bus-device stack for embedded systems.
//!
//! This crate provides a `no_std` implementation of a KNX bus device
//! that drives a TP-UART line-coupler chip over a byte-oriented serial
//! link. Applications declare a table of communication objects and
//! interact with the bus purely by reading and writing those objects;
//! the stack owns the wire protocol.
//!
//! ## Features
//!
//! - Bit-exact KNX standard-length L_DATA telegram codec
//! - Typed, group-addressed communication objects with access flags
//! - Datapoint encode/decode for the common numeric formats
//! - Full-duplex TP-UART driver with per-byte echo confirmation
//! - Cooperative scheduler with init-read sweep and action queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use knx_tpuart::{ComObject, DptId, KnxDevice, com_object::flags, ga, ia};
//!
//! let mut objects = [
//!     ComObject::new(ga!(0/2/1), DptId::Switch, flags::LOGIC_IN),
//! ];
//! let mut device = KnxDevice::new(&mut objects, clock);
//! device.begin(serial, ia!(1.1.255))?;
//! loop {
//!     device.task(&mut |index: u8| {
//!         // a communication object was updated from the bus
//!     });
//! }
//! ```

// Macro modules (must be declared before use)
#[macro_use]
pub mod logging;
#[macro_use]
pub mod macros;

pub mod addressing;
pub mod com_object;
pub mod device;
pub mod dpt;
pub mod error;
pub mod hal;
pub mod telegram;
pub mod tpuart;

// Re-export commonly used types
#[doc(inline)]
pub use addressing::{GroupAddress, IndividualAddress};
#[doc(inline)]
pub use com_object::ComObject;
#[doc(inline)]
pub use device::{KnxDevice, KnxEvents};
#[doc(inline)]
pub use dpt::{DptFormat, DptId};
#[doc(inline)]
pub use error::{KnxError, Result};
#[doc(inline)]
pub use telegram::{Command, Priority, Telegram, TelegramValidity};
#[doc(inline)]
pub use tpuart::{TpUart, TpUartEvent, TpUartMode, TxAckStatus};
