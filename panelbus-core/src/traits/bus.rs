//! Uniform LCD bus interface

use crate::completion::{BusId, CompletionCallback};
use crate::error::{BusError, LifecycleError, ValidationError};
use crate::registry::FbIndex;

/// Bus lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    /// Configured and validated, no hardware claimed
    Constructed,
    /// Bus installed and panel attached; transfers allowed
    Initialized,
    /// Torn down by `deinit`
    Released,
    /// `init` failed part way; reconstruct to retry
    Failed,
}

impl BusState {
    /// Transfers are only allowed on an initialized bus
    pub fn require_initialized(self) -> Result<(), LifecycleError> {
        match self {
            BusState::Initialized => Ok(()),
            BusState::Constructed => Err(LifecycleError::NotInitialized),
            BusState::Released => Err(LifecycleError::Released),
            BusState::Failed => Err(LifecycleError::Failed),
        }
    }

    /// A bus is initialized once
    pub fn require_constructed(self) -> Result<(), LifecycleError> {
        match self {
            BusState::Constructed => Ok(()),
            BusState::Initialized => Err(LifecycleError::AlreadyInitialized),
            BusState::Released => Err(LifecycleError::Released),
            BusState::Failed => Err(LifecycleError::Failed),
        }
    }
}

/// Pixel payload for `tx_color`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pixels<'a> {
    /// Caller-owned bytes
    Slice(&'a [u8]),
    /// First `len` bytes of one of the bus's own frame buffers
    ///
    /// This is how a display driver sends the buffer it rendered into
    /// after fetching it with `get_frame_buffer`.
    FrameBuffer { index: FbIndex, len: usize },
}

impl<'a> Pixels<'a> {
    /// Whole frame buffer `index`
    pub const fn frame(index: FbIndex) -> Self {
        Pixels::FrameBuffer {
            index,
            len: usize::MAX,
        }
    }

    /// Clamp a frame buffer request to the buffer's size
    ///
    /// `usize::MAX` means the whole buffer; anything else must fit.
    pub fn frame_len(len: usize, available: usize) -> Result<usize, ValidationError> {
        if len == usize::MAX {
            Ok(available)
        } else if len <= available {
            Ok(len)
        } else {
            Err(ValidationError::LengthMismatch {
                expected: available,
                actual: len,
            })
        }
    }
}

/// Command, parameter and pixel traffic to a display controller
///
/// Implemented by every transport. `Region` is `()` for transports where
/// the controller places pixels itself (SPI, I2C, I80: the driver sends
/// the address window as parameters first) and an area for RGB panels,
/// which draw straight into a frame buffer.
pub trait LcdBus {
    /// Where a `tx_color` lands
    type Region;

    /// Identifier carried in completion events
    fn bus_id(&self) -> BusId;

    /// Current lifecycle state
    fn state(&self) -> BusState;

    /// Claim the hardware for a `width` x `height` display at `bpp`
    ///
    /// Allocates transfer buffers now if no explicit size was configured.
    fn init(&mut self, width: u16, height: u16, bpp: u8) -> Result<(), BusError>;

    /// Release the hardware and the transfer buffers
    fn deinit(&mut self) -> Result<(), BusError>;

    /// Send a command with optional parameter bytes
    fn tx_param(&mut self, cmd: i32, params: Option<&[u8]>) -> Result<(), BusError>;

    /// Send pixels
    ///
    /// With DMA and no callback this blocks until the transfer is done.
    /// With a callback registered it returns once the transfer is queued
    /// and the callback runs after completion; until then the buffer that
    /// was sent must not be modified.
    fn tx_color(&mut self, cmd: i32, pixels: Pixels<'_>, region: Self::Region)
        -> Result<(), BusError>;

    /// Deliver completions to `callback` with `user_ctx`
    ///
    /// Replaces any earlier registration.
    fn register_callback(&mut self, callback: CompletionCallback, user_ctx: usize);

    /// Transfer or frame buffer `index`; `None` if the bus does not have it
    fn get_frame_buffer(&mut self, index: FbIndex) -> Option<&mut [u8]>;

    /// Size of each frame buffer in bytes, zero before allocation
    fn get_frame_buffer_size(&self) -> usize;
}

/// Reading from the display controller
///
/// RGB panels have no command channel and do not implement this.
pub trait ReadParams {
    /// Send `cmd` and read the reply into `buf`
    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), BusError>;
}
