//! RGB (DPI) bus arguments

use panelbus_hal::{
    Gpio, RgbPanelConfig, RgbPanelFlags, RgbTiming, RgbTimingFlags, SocCaps, MAX_DATA_LINES,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::data_lines;
use crate::buffer::{full_frame_size, BufferOptions};
use crate::error::ValidationError;

/// Default pixel clock
pub const DEFAULT_RGB_FREQ_HZ: u32 = 8_000_000;

/// Front porch, back porch and pulse of one sync signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncTiming {
    pub front_porch: u16,
    pub back_porch: u16,
    pub pulse_width: u16,
    /// Sync line idles low
    pub idle_low: bool,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            front_porch: 0,
            back_porch: 0,
            pulse_width: 1,
            idle_low: false,
        }
    }
}

impl SyncTiming {
    #[must_use]
    pub fn front_porch(mut self, v: u16) -> Self {
        self.front_porch = v;
        self
    }

    #[must_use]
    pub fn back_porch(mut self, v: u16) -> Self {
        self.back_porch = v;
        self
    }

    #[must_use]
    pub fn pulse_width(mut self, v: u16) -> Self {
        self.pulse_width = v;
        self
    }

    #[must_use]
    pub fn idle_low(mut self, v: bool) -> Self {
        self.idle_low = v;
        self
    }
}

/// RGB bus arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RgbBusArgs {
    pub hsync: Gpio,
    pub vsync: Gpio,
    pub de: Gpio,
    pub disp: Gpio,
    pub pclk: Gpio,
    /// `data[0..8]` required, `data[8..16]` optional
    pub data: [Option<Gpio>; MAX_DATA_LINES],
    pub freq: u32,
    pub num_fbs: u8,
    pub bounce_buffer_size_px: usize,
    pub h_timing: SyncTiming,
    pub v_timing: SyncTiming,
    pub de_idle_high: bool,
    pub pclk_idle_high: bool,
    pub pclk_active_neg: bool,
    pub disp_active_low: bool,
    pub refresh_on_demand: bool,
    pub fb_in_psram: bool,
    pub no_fb: bool,
    pub bb_invalidate_cache: bool,
}

impl RgbBusArgs {
    /// 8-bit panel on `data`
    pub fn new(hsync: Gpio, vsync: Gpio, de: Gpio, disp: Gpio, pclk: Gpio, data: [Gpio; 8]) -> Self {
        let mut lines = [None; MAX_DATA_LINES];
        for (slot, pin) in lines.iter_mut().zip(data) {
            *slot = Some(pin);
        }
        Self {
            hsync,
            vsync,
            de,
            disp,
            pclk,
            data: lines,
            freq: DEFAULT_RGB_FREQ_HZ,
            num_fbs: 2,
            bounce_buffer_size_px: 0,
            h_timing: SyncTiming::default(),
            v_timing: SyncTiming::default(),
            de_idle_high: false,
            pclk_idle_high: false,
            pclk_active_neg: false,
            disp_active_low: false,
            refresh_on_demand: false,
            fb_in_psram: false,
            no_fb: false,
            bb_invalidate_cache: false,
        }
    }

    /// Widen to 16 bits with `high` as data8..data15
    #[must_use]
    pub fn high_lines(mut self, high: [Gpio; 8]) -> Self {
        for (slot, pin) in self.data[8..].iter_mut().zip(high) {
            *slot = Some(pin);
        }
        self
    }

    #[must_use]
    pub fn freq(mut self, hz: u32) -> Self {
        self.freq = hz;
        self
    }

    #[must_use]
    pub fn num_fbs(mut self, n: u8) -> Self {
        self.num_fbs = n;
        self
    }

    #[must_use]
    pub fn h_timing(mut self, timing: SyncTiming) -> Self {
        self.h_timing = timing;
        self
    }

    #[must_use]
    pub fn v_timing(mut self, timing: SyncTiming) -> Self {
        self.v_timing = timing;
        self
    }

    #[must_use]
    pub fn fb_in_psram(mut self, v: bool) -> Self {
        self.fb_in_psram = v;
        self
    }

    /// Frame buffer placement; RGB scan-out always goes through DMA
    pub fn buffer_options(&self) -> BufferOptions {
        BufferOptions {
            size: None,
            fb_in_psram: self.fb_in_psram,
            use_dma: true,
        }
    }

    /// Checks that do not depend on the resolution
    pub fn validate(&self, caps: &SocCaps) -> Result<(), ValidationError> {
        if !caps.rgb {
            return Err(ValidationError::UnsupportedTransport("rgb"));
        }
        data_lines(&self.data, caps.max_data_width)?;
        if !(1..=2).contains(&self.num_fbs) {
            return Err(ValidationError::InvalidFrameBufferCount(self.num_fbs));
        }
        Ok(())
    }

    /// Full panel configuration once the resolution is known
    pub fn resolve(
        &self,
        caps: &SocCaps,
        width: u16,
        height: u16,
        bpp: u8,
    ) -> Result<RgbPanelConfig, ValidationError> {
        self.validate(caps)?;
        let data = data_lines(&self.data, caps.max_data_width)?;
        let fb_size = full_frame_size(width, height, bpp)?;

        let timings = RgbTiming {
            pclk_hz: self.freq,
            h_res: width,
            v_res: height,
            hsync_pulse_width: self.h_timing.pulse_width,
            hsync_back_porch: self.h_timing.back_porch,
            hsync_front_porch: self.h_timing.front_porch,
            vsync_pulse_width: self.v_timing.pulse_width,
            vsync_back_porch: self.v_timing.back_porch,
            vsync_front_porch: self.v_timing.front_porch,
            flags: RgbTimingFlags {
                hsync_idle_low: self.h_timing.idle_low,
                vsync_idle_low: self.v_timing.idle_low,
                de_idle_high: self.de_idle_high,
                pclk_active_neg: self.pclk_active_neg,
                pclk_idle_high: self.pclk_idle_high,
            },
        };

        Ok(RgbPanelConfig {
            timings,
            bits_per_pixel: bpp,
            num_fbs: if self.no_fb { 0 } else { self.num_fbs },
            fb_size,
            fb_caps: self.buffer_options().caps(),
            bounce_buffer_size_px: self.bounce_buffer_size_px,
            hsync: self.hsync,
            vsync: self.vsync,
            de: self.de,
            pclk: self.pclk,
            disp: self.disp,
            data,
            flags: RgbPanelFlags {
                disp_active_low: self.disp_active_low,
                refresh_on_demand: self.refresh_on_demand,
                fb_in_psram: self.fb_in_psram,
                no_fb: self.no_fb,
                bb_invalidate_cache: self.bb_invalidate_cache,
            },
        })
    }
}
