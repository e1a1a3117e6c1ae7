//! Simulated panel IO and RGB panel

use panelbus_hal::{Area, HwError, PanelIo, RgbPanel, TransferDoneIsr};

use crate::{SimBuffer, SimEvent, SimHal, SimOp};

/// Panel IO attached to a simulated bus
pub struct SimPanelIo {
    pub(crate) hal: SimHal,
    pub(crate) on_done: &'static dyn TransferDoneIsr,
    /// Color transfers complete asynchronously
    pub(crate) dma: bool,
}

impl PanelIo for SimPanelIo {
    fn tx_param(&mut self, cmd: i32, params: Option<&[u8]>) -> Result<(), HwError> {
        self.hal.check(SimOp::TxParam)?;
        self.hal.record(SimEvent::TxParam {
            cmd,
            params: params.map(<[u8]>::to_vec),
        });
        Ok(())
    }

    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), HwError> {
        self.hal.check(SimOp::RxParam)?;
        {
            let state = self.hal.state.borrow();
            for (dst, src) in buf.iter_mut().zip(state.rx_reply.iter()) {
                *dst = *src;
            }
        }
        self.hal.record(SimEvent::RxParam {
            cmd,
            len: buf.len(),
        });
        Ok(())
    }

    fn tx_color(&mut self, cmd: i32, pixels: &[u8]) -> Result<(), HwError> {
        self.hal.check(SimOp::TxColor)?;
        self.hal.record(SimEvent::TxColor {
            cmd,
            data: pixels.to_vec(),
        });

        if self.dma {
            self.hal.state.borrow_mut().pending.push(self.on_done);
        } else {
            // Polled transfer: done before returning, interrupt still fires
            self.on_done.on_transfer_done();
        }
        Ok(())
    }
}

/// Simulated RGB panel holding its frame buffers
pub struct SimRgbPanel {
    pub(crate) hal: SimHal,
    pub(crate) fbs: Vec<SimBuffer>,
    pub(crate) h_res: usize,
    pub(crate) bytes_per_pixel: usize,
    pub(crate) active: usize,
}

impl SimRgbPanel {
    /// Frame buffer being scanned out
    pub fn active(&self) -> usize {
        self.active
    }
}

impl RgbPanel for SimRgbPanel {
    fn draw_bitmap(&mut self, area: &Area, data: &[u8]) -> Result<(), HwError> {
        self.hal.check(SimOp::DrawBitmap)?;

        let row_bytes = area.width() * self.bytes_per_pixel;
        if let Some(fb) = self.fbs.get_mut(self.active) {
            let fb = fb.as_mut();
            for (row, chunk) in data.chunks(row_bytes).take(area.height()).enumerate() {
                let y = area.y_start as usize + row;
                let start = (y * self.h_res + area.x_start as usize) * self.bytes_per_pixel;
                let end = (start + chunk.len()).min(fb.len());
                if start < end {
                    fb[start..end].copy_from_slice(&chunk[..end - start]);
                }
            }
        }

        self.hal.record(SimEvent::DrawBitmap {
            area: *area,
            len: data.len(),
        });
        Ok(())
    }

    fn present_frame_buffer(&mut self, area: &Area, index: usize) -> Result<(), HwError> {
        self.hal.check(SimOp::DrawBitmap)?;
        if index >= self.fbs.len() {
            return Err(HwError::INVALID_ARG);
        }
        self.active = index;
        self.hal.record(SimEvent::PresentFrameBuffer { area: *area, index });
        Ok(())
    }

    fn frame_buffer(&mut self, index: usize) -> Option<&mut [u8]> {
        self.fbs.get_mut(index).map(|b| b.as_mut())
    }
}
