//! SPI panel transport
//!
//! The vendor SPI master driver owns the bus (clock, data lines and
//! DMA channel); a panel IO is then attached to it with its own chip
//! select, DC line and command/parameter framing.

use bitflags::bitflags;

use crate::{Gpio, HwError, PanelIo, PinMatrix, Platform, TransferDoneIsr};

/// SPI host peripheral number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiHost(pub u8);

impl SpiHost {
    /// HSPI
    pub const HSPI: Self = Self(2);
    /// VSPI
    pub const VSPI: Self = Self(3);
}

bitflags! {
    /// Bus capability flags passed to the SPI driver
    ///
    /// Values match the ESP-IDF `SPICOMMON_BUSFLAG_*` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiBusFlags: u32 {
        /// Master mode
        const MASTER = 1 << 0;
        /// Pins must use the direct IOMUX routing
        const IOMUX_PINS = 1 << 1;
        /// Pins are routed through the GPIO matrix
        const GPIO_PINS = 1 << 2;
        /// SCLK required
        const SCLK = 1 << 3;
        /// MISO required
        const MISO = 1 << 4;
        /// MOSI required
        const MOSI = 1 << 5;
        /// Dual data lines
        const DUAL = (1 << 6) | Self::MISO.bits() | Self::MOSI.bits();
        /// WP and HD lines required
        const WPHD = 1 << 7;
        /// Quad data lines
        const QUAD = Self::DUAL.bits() | Self::WPHD.bits();
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SpiBusFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "SpiBusFlags({=u32:#x})", self.bits())
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    /// Numeric mode as the vendor driver expects it
    pub const fn number(self) -> u8 {
        match self {
            Mode::Mode0 => 0,
            Mode::Mode1 => 1,
            Mode::Mode2 => 2,
            Mode::Mode3 => 3,
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Mode0),
            1 => Ok(Mode::Mode1),
            2 => Ok(Mode::Mode2),
            3 => Ok(Mode::Mode3),
            other => Err(other),
        }
    }
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

/// Bus-level SPI configuration (`spi_bus_config_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiBusConfig {
    pub sclk: Option<Gpio>,
    pub mosi: Option<Gpio>,
    pub miso: Option<Gpio>,
    /// Quad write-protect line (data 2)
    pub quadwp: Option<Gpio>,
    /// Quad hold line (data 3)
    pub quadhd: Option<Gpio>,
    /// Largest single transfer in bytes
    pub max_transfer_sz: usize,
    pub flags: SpiBusFlags,
}

/// Panel IO framing flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiIoFlags {
    /// DC low means data, high means command
    pub dc_low_on_data: bool,
    /// Read and write over the single MOSI line
    pub sio_mode: bool,
    /// Shift out the least significant bit first
    pub lsb_first: bool,
    /// Chip select is active high
    pub cs_high_active: bool,
}

/// Panel IO configuration (`esp_lcd_panel_io_spi_config_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPanelIoConfig {
    pub cs: Option<Gpio>,
    pub dc: Gpio,
    pub spi_mode: Mode,
    pub pclk_hz: u32,
    /// Transfers the driver may queue before blocking
    pub trans_queue_depth: usize,
    pub lcd_cmd_bits: u8,
    pub lcd_param_bits: u8,
    pub flags: SpiIoFlags,
}

/// Vendor SPI master driver
pub trait SpiHal: Platform + PinMatrix {
    /// Panel IO attached to an installed host
    type SpiIo: PanelIo;

    /// Install the bus on `host`, with or without an automatic DMA channel
    fn spi_bus_initialize(
        &mut self,
        host: SpiHost,
        config: &SpiBusConfig,
        dma: bool,
    ) -> Result<(), HwError>;

    /// Attach a panel IO to an installed host
    ///
    /// `on_done` is called from interrupt context after each color transfer.
    fn new_spi_panel_io(
        &mut self,
        host: SpiHost,
        config: &SpiPanelIoConfig,
        on_done: &'static dyn TransferDoneIsr,
    ) -> Result<Self::SpiIo, HwError>;

    /// Detach and delete a panel IO
    fn del_spi_panel_io(&mut self, io: Self::SpiIo) -> Result<(), HwError>;

    /// Uninstall the bus from `host`
    fn spi_bus_free(&mut self, host: SpiHost) -> Result<(), HwError>;
}
