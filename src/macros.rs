//! Convenience macros for working with KNX addresses.
//!
//! This module provides declarative macros that build addresses from the
//! familiar KNX notations with compile-time range validation.

/// Creates a [`GroupAddress`](crate::addressing::GroupAddress) from 3-level notation.
///
/// # Syntax
///
/// ```text
/// ga!(main/middle/sub)
/// ```
///
/// Where:
/// - `main`: Main group (0-31)
/// - `middle`: Middle group (0-7)
/// - `sub`: Sub group (0-255)
///
/// # Examples
///
/// ```
/// use knx_tpuart::ga;
///
/// let switch = ga!(0/2/1);
/// let temperature = ga!(1/2/10);
/// assert_eq!(switch.raw(), 0x0201);
/// ```
///
/// # Compile-Time Validation
///
/// ```compile_fail
/// // This will fail to compile: main group > 31
/// let addr = knx_tpuart::ga!(32/0/0);
/// ```
#[macro_export]
macro_rules! ga {
    ($main:literal / $middle:literal / $sub:literal) => {{
        const _: () = {
            if $main > 31 {
                panic!("Main group must be 0-31");
            }
            if $middle > 7 {
                panic!("Middle group must be 0-7");
            }
            if $sub > 255 {
                panic!("Sub group must be 0-255");
            }
        };
        $crate::addressing::GroupAddress::from_raw(
            (($main as u16) << 11) | (($middle as u16) << 8) | ($sub as u16),
        )
    }};
}

/// Creates an [`IndividualAddress`](crate::addressing::IndividualAddress)
/// from its Area.Line.Device components.
///
/// # Syntax
///
/// ```text
/// ia!(area, line, device)
/// ```
///
/// Where:
/// - `area`: Area (0-15)
/// - `line`: Line (0-15)
/// - `device`: Device (0-255)
///
/// # Examples
///
/// ```
/// use knx_tpuart::ia;
///
/// let addr = ia!(1, 1, 255);
/// assert_eq!(addr.raw(), 0x11FF);
/// ```
#[macro_export]
macro_rules! ia {
    ($area:literal, $line:literal, $device:literal) => {{
        const _: () = {
            if $area > 15 {
                panic!("Area must be 0-15");
            }
            if $line > 15 {
                panic!("Line must be 0-15");
            }
            if $device > 255 {
                panic!("Device must be 0-255");
            }
        };
        $crate::addressing::IndividualAddress::from_raw(
            (($area as u16) << 12) | (($line as u16) << 8) | ($device as u16),
        )
    }};
}
