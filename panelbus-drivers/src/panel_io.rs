//! State shared by the panel-IO transports (SPI, I2C, I80)
//!
//! These transports all carry commands, parameters and pixel strips
//! through a vendor panel IO, own their transfer buffers and complete
//! color transfers through the same bridge. Only bus installation differs.

use embedded_hal::delay::DelayNs;
use panelbus_core::buffer::partial_frame_size;
use panelbus_core::{
    BufferOptions, BusError, BusState, CompletionBridge, FbIndex, FrameBufferRegistry, HwOp,
    LifecycleError, Pixels, TransferBuffers, ValidationError,
};
use panelbus_hal::{MemoryPool, PanelIo};

pub(crate) struct PanelIoCore<B> {
    pub bridge: &'static CompletionBridge,
    pub buffers: FrameBufferRegistry<B>,
    pub options: BufferOptions,
    pub timeout_us: u32,
    pub state: BusState,
}

impl<B> PanelIoCore<B>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    pub fn new(bridge: &'static CompletionBridge, options: BufferOptions, timeout_us: u32) -> Self {
        Self {
            bridge,
            buffers: FrameBufferRegistry::new(),
            options,
            timeout_us,
            state: BusState::Constructed,
        }
    }

    /// Allocate now if the caller gave an explicit size
    pub fn allocate_explicit<P>(&mut self, pool: &mut P) -> Result<(), BusError>
    where
        P: MemoryPool<Buffer = B>,
    {
        if let Some(size) = self.options.size {
            self.allocate(pool, size)?;
        }
        Ok(())
    }

    /// Buffers for a `width` x `height` display, allocating them on first use
    ///
    /// Returns the buffer size.
    pub fn ensure_buffers<P>(
        &mut self,
        pool: &mut P,
        width: u16,
        height: u16,
        bpp: u8,
    ) -> Result<usize, BusError>
    where
        P: MemoryPool<Buffer = B>,
    {
        if !self.buffers.is_allocated() {
            let size = partial_frame_size(width, height, bpp)?;
            self.allocate(pool, size)?;
        }
        Ok(self.buffers.size())
    }

    fn allocate<P>(&mut self, pool: &mut P, size: usize) -> Result<(), BusError>
    where
        P: MemoryPool<Buffer = B>,
    {
        let bufs = TransferBuffers::allocate(
            pool,
            size,
            self.options.caps(),
            self.options.double_buffered(),
        )?;
        self.buffers.install(bufs);
        Ok(())
    }

    pub fn check_ready(&self) -> Result<(), BusError> {
        self.state.require_initialized().map_err(BusError::from)
    }

    pub fn mark_failed(&mut self) {
        self.state = BusState::Failed;
        self.buffers.release();
    }

    pub fn tx_param<IO: PanelIo>(
        &self,
        io: Option<&mut IO>,
        cmd: i32,
        params: Option<&[u8]>,
    ) -> Result<(), BusError> {
        self.check_ready()?;
        let io = io.ok_or(LifecycleError::NotInitialized)?;
        io.tx_param(cmd, params)
            .map_err(|code| BusError::transport(HwOp::TxParam, code))
    }

    pub fn rx_param<IO: PanelIo>(
        &self,
        io: Option<&mut IO>,
        cmd: i32,
        buf: &mut [u8],
    ) -> Result<(), BusError> {
        self.check_ready()?;
        let io = io.ok_or(LifecycleError::NotInitialized)?;
        io.rx_param(cmd, buf)
            .map_err(|code| BusError::transport(HwOp::RxParam, code))
    }

    /// Send pixels and complete through the bridge
    ///
    /// | DMA | callback | behaviour                                      |
    /// |-----|----------|------------------------------------------------|
    /// | yes | no       | block until the interrupt (or the timeout)     |
    /// | yes | yes      | return once queued; callback after interrupt   |
    /// | no  | yes      | transfer is done; callback scheduled directly  |
    /// | no  | no       | transfer is done                               |
    ///
    /// Caller slices are never left in flight: with DMA and a callback a
    /// `Pixels::Slice` still waits for the interrupt before returning (the
    /// callback runs as usual). Only the bus's own frame buffers are
    /// returned to the caller while the hardware reads them.
    pub fn tx_color<IO, D>(
        &self,
        io: Option<&mut IO>,
        delay: &mut D,
        cmd: i32,
        pixels: Pixels<'_>,
    ) -> Result<(), BusError>
    where
        IO: PanelIo,
        D: DelayNs,
    {
        self.check_ready()?;
        let io = io.ok_or(LifecycleError::NotInitialized)?;

        let (data, owned) = match pixels {
            Pixels::Slice(data) => (data, false),
            Pixels::FrameBuffer { index, len } => {
                let fb = self
                    .buffers
                    .view(index)
                    .ok_or(ValidationError::NoFrameBuffer)?;
                let len = Pixels::frame_len(len, fb.len())?;
                (&fb[..len], true)
            }
        };

        let dma = self.options.use_dma;
        let registered = self.bridge.sink().is_registered();

        if dma {
            self.bridge.arm();
        }
        if let Err(code) = io.tx_color(cmd, data) {
            if dma {
                self.bridge.disarm();
            }
            bus_warn!("tx_color failed: {=i32}", code.0);
            return Err(BusError::transport(HwOp::TxColor, code));
        }

        if dma && (!registered || !owned) {
            self.bridge.wait_done(delay, self.timeout_us)?;
        } else if !dma && registered {
            self.bridge.complete_inline();
        }
        Ok(())
    }

    pub fn frame_buffer(&mut self, index: FbIndex) -> Option<&mut [u8]> {
        self.buffers.get(index)
    }
}

/// First failure among teardown steps that all ran
pub(crate) fn first_error(results: &[Result<(), BusError>]) -> Result<(), BusError> {
    match results.iter().copied().find_map(Result::err) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
