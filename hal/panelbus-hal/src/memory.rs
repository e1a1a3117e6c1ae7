//! Capability-tagged memory
//!
//! Transfer buffers must come from memory the transport engine can reach.
//! A DMA engine typically cannot read arbitrary RAM, and external PSRAM is
//! large but slow, so every allocation names the capabilities it needs.

use bitflags::bitflags;

bitflags! {
    /// Memory capability flags
    ///
    /// Values match the ESP-IDF `MALLOC_CAP_*` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemCaps: u32 {
        /// Reachable by the DMA engine
        const DMA = 1 << 3;
        /// External PSRAM
        const SPIRAM = 1 << 10;
        /// Internal SRAM
        const INTERNAL = 1 << 11;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MemCaps {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "MemCaps({=u32:#x})", self.bits())
    }
}

/// Allocator for transfer buffers
pub trait MemoryPool {
    /// Owned buffer handle; memory returns to the pool when it is dropped
    type Buffer: AsRef<[u8]> + AsMut<[u8]>;

    /// Allocate `size` bytes satisfying every flag in `caps`
    ///
    /// Returns `None` when no region with those capabilities has room.
    fn allocate(&mut self, size: usize, caps: MemCaps) -> Option<Self::Buffer>;
}
