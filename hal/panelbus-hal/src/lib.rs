//! Panelbus Hardware Abstraction Layer
//!
//! This crate defines the hardware capabilities the LCD bus drivers call
//! into: capability-tagged memory, pin routing, and the vendor transport
//! engines (SPI, I2C, Intel 8080 parallel, RGB/DPI). Chip-specific HALs
//! implement these traits; `panelbus-hal-sim` implements them on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Display driver / graphics layer        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  panelbus-drivers (SPI/I2C/I80/RGB)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  panelbus-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  chip HAL     │       │ panelbus-hal- │
//! │  (ESP-IDF)    │       │     sim       │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`Platform`] - memory pool, delay and SoC capabilities
//! - [`PinMatrix`] - returning pins to the GPIO matrix
//! - [`PanelIo`] - command/parameter/pixel transfers on an attached panel
//! - [`SpiHal`], [`I2cHal`], [`I80Hal`], [`RgbHal`] - per-transport engines
//! - [`TransferDoneIsr`] - interrupt-context completion hook

#![no_std]
#![deny(unsafe_code)]

pub mod error;
pub mod gpio;
pub mod i2c;
pub mod i80;
pub mod io;
pub mod memory;
pub mod platform;
pub mod rgb;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use error::HwError;
pub use gpio::{Gpio, PinMatrix};
pub use i2c::{I2cBusConfig, I2cHal, I2cPanelIoConfig, I2cPort};
pub use i80::{DcLevels, I80BusConfig, I80Hal, I80IoFlags, I80PanelIoConfig};
pub use io::{PanelIo, TransferDoneIsr};
pub use memory::{MemCaps, MemoryPool};
pub use platform::{Platform, SocCaps};
pub use rgb::{Area, RgbHal, RgbPanel, RgbPanelConfig, RgbPanelFlags, RgbTiming, RgbTimingFlags};
pub use spi::{Mode, SpiBusConfig, SpiBusFlags, SpiHal, SpiHost, SpiIoFlags, SpiPanelIoConfig};

/// Maximum number of data lines on a parallel (I80 or RGB) bus
pub const MAX_DATA_LINES: usize = 16;
