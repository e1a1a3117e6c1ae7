//! RGB (DPI) LCD bus
//!
//! The panel controller scans its own frame buffers out continuously, so
//! there is no command channel: `tx_param` is accepted and dropped, and
//! drawing copies a region into the active frame buffer. Frame buffers are
//! full frames owned by the hardware panel; the bus only sizes them.
//!
//! With a callback registered, each draw arms the completion bridge and
//! the next vertical sync completes it.

use core::fmt;

use panelbus_core::buffer::full_frame_size;
use panelbus_core::config::rgb::RgbBusArgs;
use panelbus_core::{
    Area, BusError, BusId, BusState, CompletionBridge, CompletionCallback, FbIndex, HwOp, LcdBus,
    LifecycleError, Pixels, ValidationError,
};
use panelbus_hal::{RgbHal, RgbPanel};

/// Resolution fixed by `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    width: u16,
    height: u16,
    bpp: u8,
    fb_size: usize,
    num_fbs: u8,
}

/// LCD bus on an RGB panel controller
pub struct RgbBus<H: RgbHal> {
    hal: H,
    args: RgbBusArgs,
    bridge: &'static CompletionBridge,
    geometry: Option<Geometry>,
    panel: Option<H::Panel>,
    state: BusState,
}

impl<H: RgbHal> RgbBus<H> {
    pub fn new(
        hal: H,
        args: RgbBusArgs,
        bridge: &'static CompletionBridge,
    ) -> Result<Self, BusError> {
        args.validate(&hal.caps())?;
        Ok(Self {
            hal,
            args,
            bridge,
            geometry: None,
            panel: None,
            state: BusState::Constructed,
        })
    }

    /// Number of frame buffers the panel holds once initialized
    pub fn num_fbs(&self) -> u8 {
        self.geometry.map_or(0, |g| g.num_fbs)
    }

    fn ready(&mut self) -> Result<(&mut H::Panel, Geometry), BusError> {
        self.state.require_initialized()?;
        match (self.panel.as_mut(), self.geometry) {
            (Some(panel), Some(geometry)) => Ok((panel, geometry)),
            _ => Err(LifecycleError::NotInitialized.into()),
        }
    }

    fn claim(&mut self, width: u16, height: u16, bpp: u8) -> Result<Geometry, BusError> {
        let config = self.args.resolve(&self.hal.caps(), width, height, bpp)?;
        let geometry = Geometry {
            width,
            height,
            bpp,
            fb_size: config.fb_size,
            num_fbs: config.num_fbs,
        };

        let mut panel = self.hal.new_rgb_panel(&config).map_err(|code| {
            BusError::claim(HwOp::NewRgbPanel, code, config.fb_size, config.fb_caps)
        })?;

        let setup = self
            .hal
            .rgb_register_vsync(&mut panel, self.bridge)
            .map_err(|code| BusError::HardwareClaim {
                op: HwOp::RegisterVsync,
                code,
            })
            .and_then(|()| {
                self.hal
                    .rgb_panel_reset(&mut panel)
                    .map_err(|code| BusError::transport(HwOp::PanelReset, code))
            })
            .and_then(|()| {
                self.hal
                    .rgb_panel_init(&mut panel)
                    .map_err(|code| BusError::transport(HwOp::PanelInit, code))
            });

        match setup {
            Ok(()) => {
                self.panel = Some(panel);
                Ok(geometry)
            }
            Err(e) => {
                if let Err(_undo) = self.hal.del_rgb_panel(panel) {
                    bus_warn!(
                        "rgb bus {=u8}: deleting panel failed: {=i32}",
                        self.bridge.bus().0,
                        _undo.0
                    );
                }
                Err(e)
            }
        }
    }

    fn draw(
        panel: &mut H::Panel,
        geometry: Geometry,
        pixels: Pixels<'_>,
        area: &Area,
    ) -> Result<(), BusError> {
        match pixels {
            Pixels::Slice(data) => {
                let expected = area.pixel_count() * usize::from(geometry.bpp / 8);
                if data.len() < expected {
                    return Err(ValidationError::LengthMismatch {
                        expected,
                        actual: data.len(),
                    }
                    .into());
                }
                panel
                    .draw_bitmap(area, &data[..expected])
                    .map_err(|code| BusError::transport(HwOp::DrawBitmap, code))
            }
            Pixels::FrameBuffer { index, len } => {
                if index.position() >= usize::from(geometry.num_fbs) {
                    return Err(ValidationError::NoFrameBuffer.into());
                }
                Pixels::frame_len(len, geometry.fb_size)?;
                panel
                    .present_frame_buffer(area, index.position())
                    .map_err(|code| BusError::transport(HwOp::DrawBitmap, code))
            }
        }
    }
}

impl<H: RgbHal> LcdBus for RgbBus<H> {
    type Region = Area;

    fn bus_id(&self) -> BusId {
        self.bridge.bus()
    }

    fn state(&self) -> BusState {
        self.state
    }

    fn init(&mut self, width: u16, height: u16, bpp: u8) -> Result<(), BusError> {
        self.state.require_constructed()?;
        // Resolution checks come before any hardware is touched
        full_frame_size(width, height, bpp)?;

        match self.claim(width, height, bpp) {
            Ok(geometry) => {
                self.geometry = Some(geometry);
                self.state = BusState::Initialized;
                bus_info!(
                    "rgb bus {=u8}: {=u16}x{=u16}@{=u8}, {=u8} x {=usize} byte frame buffers",
                    self.bus_id().0,
                    width,
                    height,
                    bpp,
                    geometry.num_fbs,
                    geometry.fb_size
                );
                Ok(())
            }
            Err(e) => {
                bus_error!("rgb bus {=u8}: init failed", self.bus_id().0);
                self.state = BusState::Failed;
                Err(e)
            }
        }
    }

    fn deinit(&mut self) -> Result<(), BusError> {
        self.state.require_initialized()?;
        self.bridge.disarm();

        let result = match self.panel.take() {
            Some(panel) => self
                .hal
                .del_rgb_panel(panel)
                .map_err(|code| BusError::transport(HwOp::DelPanel, code)),
            None => Ok(()),
        };
        self.state = BusState::Released;
        result
    }

    fn tx_param(&mut self, _cmd: i32, _params: Option<&[u8]>) -> Result<(), BusError> {
        self.state.require_initialized()?;
        Ok(())
    }

    fn tx_color(&mut self, _cmd: i32, pixels: Pixels<'_>, area: Area) -> Result<(), BusError> {
        let bridge = self.bridge;
        let (panel, geometry) = self.ready()?;
        if !area.fits(geometry.width, geometry.height) {
            return Err(ValidationError::RegionOutOfBounds.into());
        }

        let registered = bridge.sink().is_registered();
        if registered {
            bridge.arm();
        }
        let result = Self::draw(panel, geometry, pixels, &area);
        if result.is_err() && registered {
            bridge.disarm();
        }
        result
    }

    fn register_callback(&mut self, callback: CompletionCallback, user_ctx: usize) {
        self.bridge.register(callback, user_ctx);
    }

    fn get_frame_buffer(&mut self, index: FbIndex) -> Option<&mut [u8]> {
        let geometry = self.geometry?;
        if index.position() >= usize::from(geometry.num_fbs) {
            return None;
        }
        self.panel.as_mut()?.frame_buffer(index.position())
    }

    fn get_frame_buffer_size(&self) -> usize {
        match (self.state, self.geometry) {
            (BusState::Initialized, Some(g)) if g.num_fbs > 0 => g.fb_size,
            _ => 0,
        }
    }
}

impl<H: RgbHal> fmt::Display for RgbBus<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = &self.args;
        write!(
            f,
            "RGB(hsync={}, vsync={}, de={}, disp={}, pclk={}, freq={}, num_fbs={}, \
             bounce_buffer_size_px={}, fb_in_psram={})",
            args.hsync,
            args.vsync,
            args.de,
            args.disp,
            args.pclk,
            args.freq,
            args.num_fbs,
            args.bounce_buffer_size_px,
            args.fb_in_psram
        )
    }
}
