//! KNX addressing types.
//!
//! Two address kinds exist on a KNX TP1 network:
//! - [`IndividualAddress`] - identifies a physical device (Area.Line.Device)
//! - [`GroupAddress`] - multicast destination identifying a logical
//!   variable shared across devices (Main/Middle/Sub)
//!
//! Both are 16-bit values, transmitted big-endian on the wire.

pub mod group;
pub mod individual;

#[doc(inline)]
pub use group::GroupAddress;
#[doc(inline)]
pub use individual::IndividualAddress;
