//! RGB (DPI) panel transport
//!
//! An RGB panel has no command channel. The LCD controller continuously
//! scans one of its frame buffers out on the data lines, framed by
//! HSYNC/VSYNC/DE. Drawing means copying pixels into a frame buffer.

use heapless::Vec;

use crate::{Gpio, HwError, MemCaps, Platform, TransferDoneIsr, MAX_DATA_LINES};

/// Rectangle with inclusive corners, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Area {
    pub x_start: u16,
    pub y_start: u16,
    pub x_end: u16,
    pub y_end: u16,
}

impl Area {
    /// Area spanning the given inclusive corners
    pub const fn new(x_start: u16, y_start: u16, x_end: u16, y_end: u16) -> Self {
        Self {
            x_start,
            y_start,
            x_end,
            y_end,
        }
    }

    /// Width in pixels, zero if the corners are reversed
    pub const fn width(&self) -> usize {
        if self.x_end < self.x_start {
            0
        } else {
            (self.x_end - self.x_start) as usize + 1
        }
    }

    /// Height in pixels, zero if the corners are reversed
    pub const fn height(&self) -> usize {
        if self.y_end < self.y_start {
            0
        } else {
            (self.y_end - self.y_start) as usize + 1
        }
    }

    /// Number of pixels covered
    pub const fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// True if the area lies inside a `width` x `height` screen
    pub const fn fits(&self, width: u16, height: u16) -> bool {
        self.x_start <= self.x_end
            && self.y_start <= self.y_end
            && self.x_end < width
            && self.y_end < height
    }
}

/// Sync and clock polarity flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbTimingFlags {
    pub hsync_idle_low: bool,
    pub vsync_idle_low: bool,
    pub de_idle_high: bool,
    pub pclk_active_neg: bool,
    pub pclk_idle_high: bool,
}

/// Panel timing (`esp_lcd_rgb_timing_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbTiming {
    pub pclk_hz: u32,
    pub h_res: u16,
    pub v_res: u16,
    pub hsync_pulse_width: u16,
    pub hsync_back_porch: u16,
    pub hsync_front_porch: u16,
    pub vsync_pulse_width: u16,
    pub vsync_back_porch: u16,
    pub vsync_front_porch: u16,
    pub flags: RgbTimingFlags,
}

/// Panel-level flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbPanelFlags {
    pub disp_active_low: bool,
    /// Only scan out when explicitly refreshed
    pub refresh_on_demand: bool,
    pub fb_in_psram: bool,
    /// Stream from bounce buffers only, no frame buffer
    pub no_fb: bool,
    pub bb_invalidate_cache: bool,
}

/// Panel configuration (`esp_lcd_rgb_panel_config_t`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbPanelConfig {
    pub timings: RgbTiming,
    pub bits_per_pixel: u8,
    /// Frame buffers to allocate (0 with `no_fb`)
    pub num_fbs: u8,
    /// Size of each frame buffer in bytes
    pub fb_size: usize,
    /// Capabilities frame buffers are allocated with
    pub fb_caps: MemCaps,
    pub bounce_buffer_size_px: usize,
    pub hsync: Gpio,
    pub vsync: Gpio,
    pub de: Gpio,
    pub pclk: Gpio,
    pub disp: Gpio,
    /// Data lines, least significant first; the length is the data width
    pub data: Vec<Gpio, MAX_DATA_LINES>,
    pub flags: RgbPanelFlags,
}

/// An installed RGB panel
///
/// The panel owns its frame buffers; they live as long as the panel.
pub trait RgbPanel {
    /// Copy `data` into the active frame buffer at `area`
    fn draw_bitmap(&mut self, area: &Area, data: &[u8]) -> Result<(), HwError>;

    /// Present frame buffer `index` (zero-based) after `area` was drawn into it
    fn present_frame_buffer(&mut self, area: &Area, index: usize) -> Result<(), HwError>;

    /// Frame buffer `index` (zero-based), if allocated
    fn frame_buffer(&mut self, index: usize) -> Option<&mut [u8]>;
}

/// Vendor RGB panel driver
pub trait RgbHal: Platform {
    /// Panel handle
    type Panel: RgbPanel;

    /// Create the panel and allocate its frame buffers
    fn new_rgb_panel(&mut self, config: &RgbPanelConfig) -> Result<Self::Panel, HwError>;

    /// Call `on_vsync` from interrupt context at every vertical sync
    fn rgb_register_vsync(
        &mut self,
        panel: &mut Self::Panel,
        on_vsync: &'static dyn TransferDoneIsr,
    ) -> Result<(), HwError>;

    /// Reset the panel
    fn rgb_panel_reset(&mut self, panel: &mut Self::Panel) -> Result<(), HwError>;

    /// Start scanning out
    fn rgb_panel_init(&mut self, panel: &mut Self::Panel) -> Result<(), HwError>;

    /// Stop the panel and free its frame buffers
    fn del_rgb_panel(&mut self, panel: Self::Panel) -> Result<(), HwError>;
}
