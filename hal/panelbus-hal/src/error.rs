//! Vendor status codes

use core::fmt;

/// Non-zero status returned by a hardware call
///
/// The code is passed through unchanged so callers can match it against
/// the vendor's error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwError(pub i32);

impl HwError {
    /// Generic failure
    pub const FAIL: Self = Self(-1);
    /// Out of memory
    pub const NO_MEM: Self = Self(0x101);
    /// Invalid argument
    pub const INVALID_ARG: Self = Self(0x102);
    /// Invalid state (e.g. bus already installed)
    pub const INVALID_STATE: Self = Self(0x103);
    /// Operation or feature not supported
    pub const NOT_SUPPORTED: Self = Self(0x106);
    /// Operation timed out
    pub const TIMEOUT: Self = Self(0x107);

    /// Raw status code
    pub const fn code(self) -> i32 {
        self.0
    }

    /// True when the hardware layer ran out of memory
    pub const fn is_no_mem(self) -> bool {
        self.0 == Self::NO_MEM.0
    }
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
