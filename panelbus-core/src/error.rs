//! Bus error taxonomy
//!
//! Every bus operation reports failure synchronously through [`BusError`].
//! Nothing is retried; the caller decides whether to reconstruct the bus.

use core::fmt;

use panelbus_hal::{HwError, MemCaps};

/// Hardware call that produced a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwOp {
    SpiBusInitialize,
    SpiBusFree,
    I2cParamConfig,
    I2cDriverInstall,
    I2cDriverDelete,
    NewI80Bus,
    DelI80Bus,
    NewPanelIo,
    DelPanelIo,
    NewRgbPanel,
    RegisterVsync,
    PanelReset,
    PanelInit,
    DelPanel,
    ReleasePin,
    TxParam,
    RxParam,
    TxColor,
    DrawBitmap,
}

impl HwOp {
    /// Vendor function name, as it appears in error messages
    pub const fn name(self) -> &'static str {
        match self {
            HwOp::SpiBusInitialize => "spi_bus_initialize",
            HwOp::SpiBusFree => "spi_bus_free",
            HwOp::I2cParamConfig => "i2c_param_config",
            HwOp::I2cDriverInstall => "i2c_driver_install",
            HwOp::I2cDriverDelete => "i2c_driver_delete",
            HwOp::NewI80Bus => "esp_lcd_new_i80_bus",
            HwOp::DelI80Bus => "esp_lcd_del_i80_bus",
            HwOp::NewPanelIo => "esp_lcd_new_panel_io",
            HwOp::DelPanelIo => "esp_lcd_panel_io_del",
            HwOp::NewRgbPanel => "esp_lcd_new_rgb_panel",
            HwOp::RegisterVsync => "esp_lcd_rgb_panel_register_event_callbacks",
            HwOp::PanelReset => "esp_lcd_panel_reset",
            HwOp::PanelInit => "esp_lcd_panel_init",
            HwOp::DelPanel => "esp_lcd_panel_del",
            HwOp::ReleasePin => "esp_rom_gpio_pad_select_gpio",
            HwOp::TxParam => "esp_lcd_panel_io_tx_param",
            HwOp::RxParam => "esp_lcd_panel_io_rx_param",
            HwOp::TxColor => "esp_lcd_panel_io_tx_color",
            HwOp::DrawBitmap => "esp_lcd_panel_draw_bitmap",
        }
    }
}

/// Why a transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportCode {
    /// Status code from the hardware layer
    Status(HwError),
    /// The completion interrupt never arrived
    Timeout,
}

/// Configuration rejected before any hardware was touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// SPI mode outside 0..=3
    InvalidSpiMode(u8),
    /// Host has no default pin set
    InvalidHost(u8),
    /// Required pin left unassigned
    MissingPin(&'static str),
    /// I2C address does not fit in 7 bits
    InvalidAddress(u8),
    /// I2C port does not exist on this target
    InvalidPort(u8),
    /// DC bit lies outside the control phase
    InvalidDcBitOffset(u8),
    /// Parallel data lines must be 8 or 16 wide without gaps
    InvalidBusWidth(u8),
    /// RGB panels take one or two frame buffers
    InvalidFrameBufferCount(u8),
    /// Width or height of zero
    InvalidResolution,
    /// Bits per pixel below one byte
    InvalidBitsPerPixel(u8),
    /// Transfer buffer of zero bytes
    ZeroBufferSize,
    /// Frame size does not fit the 32-bit address space
    FrameTooLarge,
    /// Transport not available on this target
    UnsupportedTransport(&'static str),
    /// RGB draw needs a region
    MissingRegion,
    /// Region given to a transport that has no use for it
    UnexpectedRegion,
    /// Region outside the configured resolution
    RegionOutOfBounds,
    /// Payload shorter than the region or longer than the buffer
    LengthMismatch { expected: usize, actual: usize },
    /// Frame buffer index other than 1 or 2
    InvalidFrameBufferIndex(u8),
    /// Frame buffer requested that this bus does not have
    NoFrameBuffer,
}

/// Operation issued in the wrong bus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleError {
    /// Transfer before `init`
    NotInitialized,
    /// `init` on a bus that is already running
    AlreadyInitialized,
    /// Operation after `deinit`
    Released,
    /// A previous `init` failed; the bus must be reconstructed
    Failed,
}

/// Bus operation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Invalid configuration or arguments
    Validation(ValidationError),
    /// Installing or attaching the bus failed
    HardwareClaim { op: HwOp, code: HwError },
    /// The memory pool could not satisfy a buffer request
    OutOfMemory { requested: usize, caps: MemCaps },
    /// A transfer failed
    Transport { op: HwOp, code: TransportCode },
    /// Wrong bus state for the operation
    Lifecycle(LifecycleError),
    /// The transport lacks this capability (e.g. reading from an RGB panel)
    Unsupported,
}

impl BusError {
    /// Claim failure, reported as out-of-memory when the hardware says so
    pub fn claim(op: HwOp, code: HwError, requested: usize, caps: MemCaps) -> Self {
        if code.is_no_mem() {
            BusError::OutOfMemory { requested, caps }
        } else {
            BusError::HardwareClaim { op, code }
        }
    }

    /// Transfer failure with a hardware status
    pub const fn transport(op: HwOp, code: HwError) -> Self {
        BusError::Transport {
            op,
            code: TransportCode::Status(code),
        }
    }

    /// Transfer that never completed
    pub const fn timeout(op: HwOp) -> Self {
        BusError::Transport {
            op,
            code: TransportCode::Timeout,
        }
    }
}

impl From<ValidationError> for BusError {
    fn from(e: ValidationError) -> Self {
        BusError::Validation(e)
    }
}

impl From<LifecycleError> for BusError {
    fn from(e: LifecycleError) -> Self {
        BusError::Lifecycle(e)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidSpiMode(m) => {
                write!(f, "invalid spi mode ({}), must be 0-3", m)
            }
            ValidationError::InvalidHost(h) => write!(f, "invalid spi host ({})", h),
            ValidationError::MissingPin(name) => write!(f, "pin {} is required", name),
            ValidationError::InvalidAddress(a) => write!(f, "invalid i2c address 0x{:02x}", a),
            ValidationError::InvalidPort(p) => write!(f, "invalid i2c port ({})", p),
            ValidationError::InvalidDcBitOffset(o) => {
                write!(f, "dc bit offset {} outside control phase", o)
            }
            ValidationError::InvalidBusWidth(w) => write!(f, "invalid data bus width ({})", w),
            ValidationError::InvalidFrameBufferCount(n) => {
                write!(f, "invalid frame buffer count ({})", n)
            }
            ValidationError::InvalidResolution => write!(f, "width and height must be non-zero"),
            ValidationError::InvalidBitsPerPixel(b) => {
                write!(f, "invalid bits per pixel ({})", b)
            }
            ValidationError::ZeroBufferSize => write!(f, "buffer size must be non-zero"),
            ValidationError::FrameTooLarge => write!(f, "frame size overflows the address space"),
            ValidationError::UnsupportedTransport(t) => {
                write!(f, "{} bus is not supported on this target", t)
            }
            ValidationError::MissingRegion => write!(f, "rgb draw requires a region"),
            ValidationError::UnexpectedRegion => write!(f, "region not accepted by this bus"),
            ValidationError::RegionOutOfBounds => write!(f, "region outside the display"),
            ValidationError::LengthMismatch { expected, actual } => {
                write!(f, "expected {} bytes, got {}", expected, actual)
            }
            ValidationError::InvalidFrameBufferIndex(i) => {
                write!(f, "invalid frame buffer index ({})", i)
            }
            ValidationError::NoFrameBuffer => write!(f, "frame buffer not allocated"),
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            LifecycleError::NotInitialized => "bus not initialized",
            LifecycleError::AlreadyInitialized => "bus already initialized",
            LifecycleError::Released => "bus released",
            LifecycleError::Failed => "bus initialization failed",
        };
        f.write_str(msg)
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Validation(e) => write!(f, "{}", e),
            BusError::HardwareClaim { op, code } => write!(f, "{}({})", code, op.name()),
            BusError::OutOfMemory { requested, caps } => write!(
                f,
                "out of memory allocating {} bytes (caps 0x{:x})",
                requested,
                caps.bits()
            ),
            BusError::Transport {
                op,
                code: TransportCode::Status(code),
            } => write!(f, "{}({})", code, op.name()),
            BusError::Transport {
                op,
                code: TransportCode::Timeout,
            } => write!(f, "timeout({})", op.name()),
            BusError::Lifecycle(e) => write!(f, "{}", e),
            BusError::Unsupported => write!(f, "operation not supported by this bus"),
        }
    }
}
