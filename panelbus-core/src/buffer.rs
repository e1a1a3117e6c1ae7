//! Transfer buffer allocation
//!
//! Pixel data handed to a DMA engine must live in memory the engine can
//! reach and must stay untouched until the transfer completes. With DMA a
//! bus therefore owns two buffers: the caller renders into one while the
//! other is on the wire. Without DMA a single buffer suffices because every
//! transfer completes before `tx_color` returns.

use panelbus_hal::{MemCaps, MemoryPool};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{BusError, ValidationError};

/// Divisor applied to a full frame for partial-refresh transports
///
/// SPI, I2C and I80 displays are fed in strips; a tenth of the screen is
/// the usual strip size for LVGL-style renderers.
pub const PARTIAL_FRAME_DIVISOR: usize = 10;

/// Caller-facing buffering options shared by every transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BufferOptions {
    /// Explicit buffer size in bytes; `None` derives it at `init`
    pub size: Option<usize>,
    /// Place buffers in external PSRAM instead of internal RAM
    pub fb_in_psram: bool,
    /// Transfer through DMA (and double-buffer)
    pub use_dma: bool,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            size: None,
            fb_in_psram: false,
            use_dma: true,
        }
    }
}

impl BufferOptions {
    /// Buffers of `size` bytes in internal DMA-capable RAM
    pub const fn sized(size: usize) -> Self {
        Self {
            size: Some(size),
            fb_in_psram: false,
            use_dma: true,
        }
    }

    /// Capabilities every buffer is allocated with
    pub fn caps(&self) -> MemCaps {
        let mut caps = if self.fb_in_psram {
            MemCaps::SPIRAM
        } else {
            MemCaps::INTERNAL
        };
        if self.use_dma {
            caps |= MemCaps::DMA;
        }
        caps
    }

    /// Two buffers with DMA, one without
    pub const fn double_buffered(&self) -> bool {
        self.use_dma
    }
}

fn check_geometry(width: u16, height: u16, bpp: u8) -> Result<(), ValidationError> {
    if width == 0 || height == 0 {
        return Err(ValidationError::InvalidResolution);
    }
    if bpp < 8 {
        return Err(ValidationError::InvalidBitsPerPixel(bpp));
    }
    Ok(())
}

/// `pixels * (bpp / 8)` in 32 bits, the address width of the targets
fn frame_bytes(pixels: u32, bpp: u8) -> Result<usize, ValidationError> {
    pixels
        .checked_mul(u32::from(bpp / 8))
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or(ValidationError::FrameTooLarge)
}

/// Strip buffer size for SPI, I2C and I80: a tenth of the frame
///
/// `(width * height / 10) * (bpp / 8)`, with integer division at each step.
pub fn partial_frame_size(width: u16, height: u16, bpp: u8) -> Result<usize, ValidationError> {
    check_geometry(width, height, bpp)?;
    let pixels = u32::from(width) * u32::from(height) / PARTIAL_FRAME_DIVISOR as u32;
    let size = frame_bytes(pixels, bpp)?;
    if size == 0 {
        return Err(ValidationError::ZeroBufferSize);
    }
    Ok(size)
}

/// Frame buffer size for RGB panels: the whole frame
pub fn full_frame_size(width: u16, height: u16, bpp: u8) -> Result<usize, ValidationError> {
    check_geometry(width, height, bpp)?;
    frame_bytes(u32::from(width) * u32::from(height), bpp)
}

/// One or two equally sized transfer buffers
///
/// Buffers go back to their pool when this is dropped.
#[derive(Debug)]
pub struct TransferBuffers<B> {
    size: usize,
    caps: MemCaps,
    first: B,
    second: Option<B>,
}

impl<B> TransferBuffers<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Allocate one buffer, or two when `double` is set
    ///
    /// Either every requested buffer is allocated or none is: if the second
    /// allocation fails the first is returned to the pool before reporting
    /// [`BusError::OutOfMemory`].
    pub fn allocate<P>(
        pool: &mut P,
        size: usize,
        caps: MemCaps,
        double: bool,
    ) -> Result<Self, BusError>
    where
        P: MemoryPool<Buffer = B>,
    {
        if size == 0 {
            return Err(ValidationError::ZeroBufferSize.into());
        }

        let oom = BusError::OutOfMemory {
            requested: size,
            caps,
        };

        let first = pool.allocate(size, caps).ok_or(oom)?;
        let second = if double {
            match pool.allocate(size, caps) {
                Some(buf) => Some(buf),
                None => {
                    bus_warn!("second transfer buffer of {=usize} bytes failed", size);
                    drop(first);
                    return Err(oom);
                }
            }
        } else {
            None
        };

        bus_debug!(
            "allocated {=usize} transfer buffer(s) of {=usize} bytes",
            if double { 2usize } else { 1usize },
            size
        );

        Ok(Self {
            size,
            caps,
            first,
            second,
        })
    }

    /// Size of each buffer in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Capabilities the buffers were allocated with
    pub fn caps(&self) -> MemCaps {
        self.caps
    }

    pub fn is_double_buffered(&self) -> bool {
        self.second.is_some()
    }

    /// Buffer by zero-based position
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        match index {
            0 => Some(&self.first.as_ref()[..self.size]),
            1 => self.second.as_ref().map(|b| &b.as_ref()[..self.size]),
            _ => None,
        }
    }

    /// Mutable buffer by zero-based position
    pub fn get_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let size = self.size;
        match index {
            0 => Some(&mut self.first.as_mut()[..size]),
            1 => self.second.as_mut().map(|b| &mut b.as_mut()[..size]),
            _ => None,
        }
    }
}
