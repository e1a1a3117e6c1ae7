//! Budgeted memory pool

use std::cell::Cell;
use std::rc::Rc;

use panelbus_hal::{MemCaps, MemoryPool};

use crate::SimHal;

/// Heap buffer charged against a simulated memory region
pub struct SimBuffer {
    data: Vec<u8>,
    caps: MemCaps,
    region: Rc<Cell<usize>>,
}

impl SimBuffer {
    /// Capabilities the buffer was allocated with
    pub fn caps(&self) -> MemCaps {
        self.caps
    }
}

impl std::fmt::Debug for SimBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBuffer")
            .field("len", &self.data.len())
            .field("caps", &self.caps)
            .finish()
    }
}

impl AsRef<[u8]> for SimBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for SimBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for SimBuffer {
    fn drop(&mut self) {
        self.region.set(self.region.get() - self.data.len());
    }
}

impl MemoryPool for SimHal {
    type Buffer = SimBuffer;

    fn allocate(&mut self, size: usize, caps: MemCaps) -> Option<SimBuffer> {
        let state = self.state.borrow();

        let (region, budget) = if caps.contains(MemCaps::SPIRAM) {
            if caps.contains(MemCaps::DMA) && !state.psram_dma {
                return None;
            }
            (state.spiram_used.clone(), state.spiram_budget)
        } else {
            (state.internal_used.clone(), state.internal_budget)
        };

        if region.get() + size > budget {
            return None;
        }
        region.set(region.get() + size);

        Some(SimBuffer {
            data: vec![0; size],
            caps,
            region,
        })
    }
}
