//! Frame buffer registry
//!
//! Keeps a bus's transfer buffers and hands them out by the 1-based index
//! display drivers use (`get_frame_buffer(1)`, `get_frame_buffer(2)`).

use crate::buffer::TransferBuffers;
use crate::error::ValidationError;

/// Which of the (up to) two buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FbIndex {
    First,
    Second,
}

impl FbIndex {
    /// Zero-based position
    pub const fn position(self) -> usize {
        match self {
            FbIndex::First => 0,
            FbIndex::Second => 1,
        }
    }
}

impl TryFrom<u8> for FbIndex {
    type Error = ValidationError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(FbIndex::First),
            2 => Ok(FbIndex::Second),
            other => Err(ValidationError::InvalidFrameBufferIndex(other)),
        }
    }
}

/// Transfer buffers owned by one bus
#[derive(Debug)]
pub struct FrameBufferRegistry<B> {
    buffers: Option<TransferBuffers<B>>,
}

impl<B> Default for FrameBufferRegistry<B> {
    fn default() -> Self {
        Self { buffers: None }
    }
}

impl<B> FrameBufferRegistry<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    pub const fn new() -> Self {
        Self { buffers: None }
    }

    /// True once buffers have been installed
    pub fn is_allocated(&self) -> bool {
        self.buffers.is_some()
    }

    /// Take ownership of freshly allocated buffers
    ///
    /// Returns the previous buffers, if any, so the caller decides when they
    /// go back to the pool.
    pub fn install(&mut self, buffers: TransferBuffers<B>) -> Option<TransferBuffers<B>> {
        self.buffers.replace(buffers)
    }

    /// Give up the buffers
    pub fn release(&mut self) -> Option<TransferBuffers<B>> {
        self.buffers.take()
    }

    /// Size of each buffer, zero before allocation
    pub fn size(&self) -> usize {
        self.buffers.as_ref().map_or(0, TransferBuffers::size)
    }

    pub fn is_double_buffered(&self) -> bool {
        self.buffers
            .as_ref()
            .is_some_and(TransferBuffers::is_double_buffered)
    }

    /// Buffer `index`, or `None` if it was never allocated
    pub fn get(&mut self, index: FbIndex) -> Option<&mut [u8]> {
        self.buffers.as_mut()?.get_mut(index.position())
    }

    /// Read-only view of buffer `index`
    pub fn view(&self, index: FbIndex) -> Option<&[u8]> {
        self.buffers.as_ref()?.get(index.position())
    }
}
