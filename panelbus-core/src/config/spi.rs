//! SPI bus arguments and pin routing
//!
//! SPI signals reach their pins either through the IOMUX (direct, fast)
//! or through the GPIO matrix (any pin, capped near 26.6 MHz). Each host
//! has one fixed IOMUX pin set; if every assigned line sits on that set
//! the bus can run at 80 MHz.
//!
//! | host | sclk | mosi | miso | cs | wp | hd |
//! |------|------|------|------|----|----|----|
//! | 2    | 14   | 13   | 12   | 15 | 2  | 4  |
//! | 3    | 18   | 23   | 19   | 5  | 22 | 21 |

use core::fmt;

use panelbus_hal::{Gpio, Mode, SpiBusConfig, SpiBusFlags, SpiHost, SpiIoFlags, SpiPanelIoConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{DEFAULT_CMD_BITS, DEFAULT_TRANSFER_TIMEOUT_US, TRANS_QUEUE_DEPTH};
use crate::buffer::BufferOptions;
use crate::error::ValidationError;

/// Default clock with IOMUX routing
pub const IOMUX_FREQ_HZ: u32 = 80_000_000;

/// Default clock through the GPIO matrix
pub const GPIO_MATRIX_FREQ_HZ: u32 = 26_600_000;

/// Fixed IOMUX pins of one host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPinSet {
    pub sclk: Gpio,
    pub mosi: Gpio,
    pub miso: Gpio,
    pub cs: Gpio,
    pub wp: Gpio,
    pub hd: Gpio,
}

/// Host and its IOMUX pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostPins {
    pub host: SpiHost,
    pub pins: SpiPinSet,
}

/// IOMUX pin sets, one per host
pub const HOST_PINS: [HostPins; 2] = [
    HostPins {
        host: SpiHost::HSPI,
        pins: SpiPinSet {
            sclk: 14,
            mosi: 13,
            miso: 12,
            cs: 15,
            wp: 2,
            hd: 4,
        },
    },
    HostPins {
        host: SpiHost::VSPI,
        pins: SpiPinSet {
            sclk: 18,
            mosi: 23,
            miso: 19,
            cs: 5,
            wp: 22,
            hd: 21,
        },
    },
];

/// IOMUX pins of `host`, if it has any
pub fn host_pins(host: SpiHost) -> Option<&'static SpiPinSet> {
    HOST_PINS.iter().find(|h| h.host == host).map(|h| &h.pins)
}

/// SPI bus arguments
///
/// Unset pins (`None`) are either defaulted from the host's IOMUX set or
/// left unused, see [`route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpiBusArgs {
    /// Data/command select
    pub dc: Gpio,
    pub host: u8,
    pub mosi: Option<Gpio>,
    pub miso: Option<Gpio>,
    pub sclk: Option<Gpio>,
    pub cs: Option<Gpio>,
    /// Quad write-protect line
    pub wp: Option<Gpio>,
    /// Quad hold line
    pub hd: Option<Gpio>,
    /// Clock in Hz; `None` picks the fastest the routing allows
    pub freq: Option<u32>,
    pub quad_spi: bool,
    /// No read line; MISO is never claimed
    pub tx_only: bool,
    pub cmd_bits: u8,
    pub param_bits: u8,
    pub dc_low_on_data: bool,
    pub sio_mode: bool,
    pub lsb_first: bool,
    pub cs_high_active: bool,
    /// Raw SPI mode, checked to be 0..=3
    pub spi_mode: u8,
    pub buffer: BufferOptions,
    /// How long `tx_color` waits for a DMA completion
    pub timeout_us: u32,
}

impl SpiBusArgs {
    /// Arguments with defaults for everything but the DC pin
    pub const fn new(dc: Gpio) -> Self {
        Self {
            dc,
            host: SpiHost::HSPI.0,
            mosi: None,
            miso: None,
            sclk: None,
            cs: None,
            wp: None,
            hd: None,
            freq: None,
            quad_spi: false,
            tx_only: false,
            cmd_bits: DEFAULT_CMD_BITS,
            param_bits: DEFAULT_CMD_BITS,
            dc_low_on_data: false,
            sio_mode: false,
            lsb_first: false,
            cs_high_active: false,
            spi_mode: 0,
            buffer: BufferOptions {
                size: None,
                fb_in_psram: false,
                use_dma: true,
            },
            timeout_us: DEFAULT_TRANSFER_TIMEOUT_US,
        }
    }

    #[must_use]
    pub fn host(mut self, host: u8) -> Self {
        self.host = host;
        self
    }

    /// Assign the data and clock lines
    #[must_use]
    pub fn pins(mut self, mosi: Option<Gpio>, miso: Option<Gpio>, sclk: Option<Gpio>) -> Self {
        self.mosi = mosi;
        self.miso = miso;
        self.sclk = sclk;
        self
    }

    #[must_use]
    pub fn cs(mut self, cs: Gpio) -> Self {
        self.cs = Some(cs);
        self
    }

    #[must_use]
    pub fn freq(mut self, hz: u32) -> Self {
        self.freq = Some(hz);
        self
    }

    /// Enable quad mode, optionally with explicit WP/HD lines
    #[must_use]
    pub fn quad(mut self, wp: Option<Gpio>, hd: Option<Gpio>) -> Self {
        self.quad_spi = true;
        self.wp = wp;
        self.hd = hd;
        self
    }

    #[must_use]
    pub fn tx_only(mut self) -> Self {
        self.tx_only = true;
        self
    }

    #[must_use]
    pub fn spi_mode(mut self, mode: u8) -> Self {
        self.spi_mode = mode;
        self
    }

    #[must_use]
    pub fn bits(mut self, cmd_bits: u8, param_bits: u8) -> Self {
        self.cmd_bits = cmd_bits;
        self.param_bits = param_bits;
        self
    }

    #[must_use]
    pub fn buffer(mut self, buffer: BufferOptions) -> Self {
        self.buffer = buffer;
        self
    }

    #[must_use]
    pub fn timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeout_us = timeout_us;
        self
    }

    /// Validate and resolve into wire configuration
    pub fn resolve(&self) -> Result<SpiResolved, ValidationError> {
        let mode = Mode::try_from(self.spi_mode).map_err(ValidationError::InvalidSpiMode)?;
        let routing = route(self)?;

        let io = SpiPanelIoConfig {
            cs: routing.cs,
            dc: self.dc,
            spi_mode: mode,
            pclk_hz: routing.freq_hz,
            trans_queue_depth: TRANS_QUEUE_DEPTH,
            lcd_cmd_bits: self.cmd_bits,
            lcd_param_bits: self.param_bits,
            flags: SpiIoFlags {
                dc_low_on_data: self.dc_low_on_data,
                sio_mode: self.sio_mode,
                lsb_first: self.lsb_first,
                cs_high_active: self.cs_high_active,
            },
        };

        Ok(SpiResolved {
            host: SpiHost(self.host),
            routing,
            io,
        })
    }
}

/// Outcome of the routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiRouting {
    pub sclk: Gpio,
    pub mosi: Gpio,
    pub miso: Option<Gpio>,
    pub cs: Option<Gpio>,
    pub wp: Option<Gpio>,
    pub hd: Option<Gpio>,
    pub flags: SpiBusFlags,
    pub freq_hz: u32,
}

impl SpiRouting {
    /// True when the direct IOMUX path was selected
    pub fn iomux(&self) -> bool {
        self.flags.contains(SpiBusFlags::IOMUX_PINS)
    }

    /// Bus configuration for the hardware layer
    pub fn bus_config(&self, max_transfer_sz: usize) -> SpiBusConfig {
        SpiBusConfig {
            sclk: Some(self.sclk),
            mosi: Some(self.mosi),
            miso: self.miso,
            quadwp: self.wp,
            quadhd: self.hd,
            max_transfer_sz,
            flags: self.flags,
        }
    }

    /// Lines handed back to the GPIO matrix on teardown
    pub fn data_lines(&self) -> impl Iterator<Item = Gpio> {
        [self.miso, Some(self.mosi), Some(self.sclk)]
            .into_iter()
            .flatten()
    }
}

/// Validated SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiResolved {
    pub host: SpiHost,
    pub routing: SpiRouting,
    pub io: SpiPanelIoConfig,
}

fn matches_set(
    set: &SpiPinSet,
    sclk: Gpio,
    mosi: Gpio,
    miso: Option<Gpio>,
    wp: Option<Gpio>,
    hd: Option<Gpio>,
    cs: Option<Gpio>,
) -> bool {
    let wildcard = |pin: Option<Gpio>, fixed: Gpio| pin.map_or(true, |p| p == fixed);

    sclk == set.sclk
        && mosi == set.mosi
        && wildcard(miso, set.miso)
        && wildcard(wp, set.wp)
        && wildcard(hd, set.hd)
        && wildcard(cs, set.cs)
}

/// Decide pins, routing flags and clock for an SPI bus
///
/// - The host must have an IOMUX pin set, whether or not its pins are used.
/// - MOSI, MISO and SCLK all unset: take the host's IOMUX pins (and CS,
///   and WP/HD in quad mode where not given).
/// - Not quad: WP/HD are dropped. Quad: the QUAD flag is added.
/// - `tx_only`: MISO is dropped.
/// - All assigned lines on one host's IOMUX set (unset MISO/WP/HD/CS match
///   anything): IOMUX_PINS and 80 MHz, otherwise GPIO_PINS and 26.6 MHz.
///   An explicit frequency always wins.
pub fn route(args: &SpiBusArgs) -> Result<SpiRouting, ValidationError> {
    let (mut mosi, mut miso, mut sclk) = (args.mosi, args.miso, args.sclk);
    let (mut cs, mut wp, mut hd) = (args.cs, args.wp, args.hd);

    let defaults =
        host_pins(SpiHost(args.host)).ok_or(ValidationError::InvalidHost(args.host))?;

    if mosi.is_none() && miso.is_none() && sclk.is_none() {
        mosi = Some(defaults.mosi);
        miso = Some(defaults.miso);
        sclk = Some(defaults.sclk);
        cs = Some(defaults.cs);
        if args.quad_spi {
            wp = wp.or(Some(defaults.wp));
            hd = hd.or(Some(defaults.hd));
        }
    }

    let mut flags = SpiBusFlags::MASTER;
    if args.quad_spi {
        flags |= SpiBusFlags::QUAD;
    } else {
        wp = None;
        hd = None;
    }

    if args.tx_only {
        miso = None;
    }

    let sclk = sclk.ok_or(ValidationError::MissingPin("sclk"))?;
    let mosi = mosi.ok_or(ValidationError::MissingPin("mosi"))?;

    let iomux = HOST_PINS
        .iter()
        .any(|h| matches_set(&h.pins, sclk, mosi, miso, wp, hd, cs));

    let default_freq = if iomux {
        flags |= SpiBusFlags::IOMUX_PINS;
        IOMUX_FREQ_HZ
    } else {
        flags |= SpiBusFlags::GPIO_PINS;
        GPIO_MATRIX_FREQ_HZ
    };

    Ok(SpiRouting {
        sclk,
        mosi,
        miso,
        cs,
        wp,
        hd,
        flags,
        freq_hz: args.freq.unwrap_or(default_freq),
    })
}

impl fmt::Display for SpiRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn pin(p: Option<Gpio>) -> i16 {
            p.map_or(-1, i16::from)
        }

        write!(
            f,
            "sclk={}, mosi={}, miso={}, cs={}, wp={}, hd={}, freq={}, {}",
            self.sclk,
            self.mosi,
            pin(self.miso),
            pin(self.cs),
            pin(self.wp),
            pin(self.hd),
            self.freq_hz,
            if self.iomux() { "iomux" } else { "gpio matrix" }
        )
    }
}
