//! GPIO routing
//!
//! Display transports claim their pins through the vendor bus drivers.
//! The only direct GPIO operation the bus layer needs is handing a pin
//! back to the GPIO matrix when a bus is torn down.

use crate::HwError;

/// Logical GPIO number
pub type Gpio = u8;

/// GPIO matrix control
pub trait PinMatrix {
    /// Detach `pin` from any peripheral signal and leave it a floating input
    fn release_to_input(&mut self, pin: Gpio) -> Result<(), HwError>;
}
