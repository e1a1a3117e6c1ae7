//! I2C panel transport
//!
//! Small monochrome controllers (SSD1306 and friends) sit on I2C. The
//! command/data distinction travels in a control byte in front of every
//! transfer instead of on a DC pin.

use crate::{Gpio, HwError, PanelIo, Platform, TransferDoneIsr};

/// I2C port number
pub type I2cPort = u8;

/// Master port configuration (`i2c_config_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cBusConfig {
    pub sda: Gpio,
    pub scl: Gpio,
    pub sda_pullup: bool,
    pub scl_pullup: bool,
    /// Clock frequency in Hz
    pub clk_speed_hz: u32,
}

impl I2cBusConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD_HZ: u32 = 100_000;

    /// Fast mode (400 kHz)
    pub const FAST_HZ: u32 = 400_000;

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS_HZ: u32 = 1_000_000;
}

/// Panel IO configuration (`esp_lcd_panel_io_i2c_config_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cPanelIoConfig {
    /// 7-bit device address
    pub dev_addr: u8,
    /// Length of the control phase in bytes
    pub control_phase_bytes: u8,
    /// Bit within the control phase carrying the DC flag
    pub dc_bit_offset: u8,
    pub lcd_cmd_bits: u8,
    pub lcd_param_bits: u8,
    pub dc_low_on_data: bool,
    /// Send no control phase at all
    pub disable_control_phase: bool,
}

/// Vendor I2C master driver
pub trait I2cHal: Platform {
    /// Panel IO attached to an installed port
    type I2cIo: PanelIo;

    /// Configure `port` as a master
    fn i2c_param_config(&mut self, port: I2cPort, config: &I2cBusConfig) -> Result<(), HwError>;

    /// Install the driver on a configured port
    fn i2c_driver_install(&mut self, port: I2cPort) -> Result<(), HwError>;

    /// Attach a panel IO to an installed port
    fn new_i2c_panel_io(
        &mut self,
        port: I2cPort,
        config: &I2cPanelIoConfig,
        on_done: &'static dyn TransferDoneIsr,
    ) -> Result<Self::I2cIo, HwError>;

    /// Detach and delete a panel IO
    fn del_i2c_panel_io(&mut self, io: Self::I2cIo) -> Result<(), HwError>;

    /// Remove the driver from `port`
    fn i2c_driver_delete(&mut self, port: I2cPort) -> Result<(), HwError>;
}
