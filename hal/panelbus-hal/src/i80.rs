//! Intel 8080 parallel transport
//!
//! 8 or 16 data lines clocked by a write strobe, with a DC line selecting
//! between command and data cycles.

use heapless::Vec;

use crate::{Gpio, HwError, PanelIo, Platform, TransferDoneIsr, MAX_DATA_LINES};

/// Bus configuration (`esp_lcd_i80_bus_config_t`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I80BusConfig {
    pub dc: Gpio,
    pub wr: Gpio,
    /// Data lines, least significant first; the length is the bus width
    pub data: Vec<Gpio, MAX_DATA_LINES>,
    /// Largest single transfer in bytes
    pub max_transfer_bytes: usize,
}

impl I80BusConfig {
    /// Number of data lines
    pub fn bus_width(&self) -> usize {
        self.data.len()
    }
}

/// DC line level for each bus phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DcLevels {
    pub idle: bool,
    pub cmd: bool,
    pub dummy: bool,
    pub data: bool,
}

/// Panel IO signal flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct I80IoFlags {
    pub cs_active_high: bool,
    pub reverse_color_bits: bool,
    pub swap_color_bytes: bool,
    pub pclk_active_neg: bool,
    pub pclk_idle_low: bool,
}

/// Panel IO configuration (`esp_lcd_panel_io_i80_config_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I80PanelIoConfig {
    pub cs: Gpio,
    pub pclk_hz: u32,
    pub trans_queue_depth: usize,
    pub lcd_cmd_bits: u8,
    pub lcd_param_bits: u8,
    pub dc_levels: DcLevels,
    pub flags: I80IoFlags,
}

/// Vendor I80 driver
pub trait I80Hal: Platform {
    /// Installed bus handle
    type I80Bus;
    /// Panel IO attached to a bus
    type I80Io: PanelIo;

    /// Create the bus
    fn new_i80_bus(&mut self, config: &I80BusConfig) -> Result<Self::I80Bus, HwError>;

    /// Attach a panel IO to `bus`
    fn new_i80_panel_io(
        &mut self,
        bus: &Self::I80Bus,
        config: &I80PanelIoConfig,
        on_done: &'static dyn TransferDoneIsr,
    ) -> Result<Self::I80Io, HwError>;

    /// Detach and delete a panel IO
    fn del_i80_panel_io(&mut self, io: Self::I80Io) -> Result<(), HwError>;

    /// Delete the bus
    fn del_i80_bus(&mut self, bus: Self::I80Bus) -> Result<(), HwError>;
}
