//! LCD bus implementations
//!
//! Concrete buses for the facade defined in panelbus-core, written
//! against the capability traits of panelbus-hal:
//!
//! - SPI (IOMUX or GPIO-matrix routed, optional quad mode)
//! - I2C (small monochrome panels such as the SSD1306)
//! - I80 (8 or 16 bit Intel 8080 parallel)
//! - RGB (DPI panels that own their frame buffers)
//!
//! [`AnyBus`] wraps all four behind one type for callers that pick the
//! transport at runtime.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
extern crate panelbus_core;

mod panel_io;

pub mod any;
pub mod i2c;
pub mod i80;
pub mod rgb;
pub mod spi;

#[cfg(test)]
mod testutil;

pub use any::AnyBus;
pub use i2c::I2cBus;
pub use i80::I80Bus;
pub use rgb::RgbBus;
pub use spi::SpiBus;
