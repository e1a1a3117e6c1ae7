//! Target capabilities

use embedded_hal::delay::DelayNs;

use crate::memory::MemoryPool;

/// What the current SoC can do
///
/// Bus constructors check these before touching hardware so that asking
/// for an RGB bus on a chip without an LCD controller fails cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocCaps {
    /// Largest SPI transfer without DMA, in bytes
    pub spi_max_transfer: usize,
    /// Number of I2C ports
    pub i2c_ports: u8,
    /// Intel 8080 parallel bus present
    pub i80: bool,
    /// RGB/DPI panel controller present
    pub rgb: bool,
    /// Widest parallel data bus
    pub max_data_width: u8,
}

impl SocCaps {
    /// Classic ESP32 (I80 through the I2S peripheral, no RGB)
    pub const ESP32: Self = Self {
        spi_max_transfer: 64,
        i2c_ports: 2,
        i80: true,
        rgb: false,
        max_data_width: 16,
    };

    /// ESP32-S3 (LCD_CAM: I80 and RGB)
    pub const ESP32_S3: Self = Self {
        spi_max_transfer: 64,
        i2c_ports: 2,
        i80: true,
        rgb: true,
        max_data_width: 16,
    };

    /// ESP32-C3 (SPI and I2C only)
    pub const ESP32_C3: Self = Self {
        spi_max_transfer: 64,
        i2c_ports: 1,
        i80: false,
        rgb: false,
        max_data_width: 0,
    };
}

impl Default for SocCaps {
    fn default() -> Self {
        Self::ESP32
    }
}

/// Services every transport needs from the platform
///
/// The delay is used to poll for transfer completion when no callback
/// is registered.
pub trait Platform: MemoryPool + DelayNs {
    /// Capabilities of the running SoC
    fn caps(&self) -> SocCaps;
}
