//! Bus configuration
//!
//! Caller-facing argument types for each transport, with the defaults
//! display drivers expect, and the validation that turns them into the
//! wire configuration the hardware layer consumes. Nothing in here touches
//! hardware, so every decision can be checked on the host.

pub mod i2c;
pub mod i80;
pub mod rgb;
pub mod spi;

pub use i2c::I2cBusArgs;
pub use i80::I80BusArgs;
pub use rgb::{RgbBusArgs, SyncTiming};
pub use spi::{route, HostPins, SpiBusArgs, SpiPinSet, SpiResolved, SpiRouting};

use heapless::Vec;
use panelbus_hal::{Gpio, MAX_DATA_LINES};

use crate::error::ValidationError;

/// Default command and parameter width in bits
pub const DEFAULT_CMD_BITS: u8 = 8;

/// Transfers a panel IO may queue; one in flight per bus
pub const TRANS_QUEUE_DEPTH: usize = 1;

/// Default time `tx_color` blocks for a DMA completion
pub const DEFAULT_TRANSFER_TIMEOUT_US: u32 = 1_000_000;

/// Collect parallel data lines, least significant first
///
/// Lines must be assigned contiguously from `data0`; the number assigned
/// is the bus width and must be 8 or 16.
pub fn data_lines(
    pins: &[Option<Gpio>; MAX_DATA_LINES],
    max_width: u8,
) -> Result<Vec<Gpio, MAX_DATA_LINES>, ValidationError> {
    let width = pins.iter().take_while(|p| p.is_some()).count();

    if pins[width..].iter().any(Option::is_some) {
        // A gap: data lines past the first unassigned one
        return Err(ValidationError::InvalidBusWidth(width as u8));
    }
    if !(width == 8 || width == 16) || width > max_width as usize {
        return Err(ValidationError::InvalidBusWidth(width as u8));
    }

    Ok(pins.iter().flatten().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> [Option<Gpio>; MAX_DATA_LINES] {
        let mut pins = [None; MAX_DATA_LINES];
        for (i, pin) in pins.iter_mut().enumerate().take(n) {
            *pin = Some(10 + i as u8);
        }
        pins
    }

    #[test]
    fn test_eight_and_sixteen_lines() {
        assert_eq!(data_lines(&lines(8), 16).map(|v| v.len()), Ok(8));
        assert_eq!(data_lines(&lines(16), 16).map(|v| v.len()), Ok(16));
    }

    #[test]
    fn test_order_preserved() {
        let v = data_lines(&lines(8), 16).unwrap();
        assert_eq!(v.first(), Some(&10));
        assert_eq!(v.last(), Some(&17));
    }

    #[test]
    fn test_bad_widths() {
        assert_eq!(
            data_lines(&lines(12), 16),
            Err(ValidationError::InvalidBusWidth(12))
        );
        assert_eq!(
            data_lines(&lines(16), 8),
            Err(ValidationError::InvalidBusWidth(16))
        );
    }

    #[test]
    fn test_gap_rejected() {
        let mut pins = lines(8);
        pins[10] = Some(40);
        assert_eq!(
            data_lines(&pins, 16),
            Err(ValidationError::InvalidBusWidth(8))
        );
    }
}
