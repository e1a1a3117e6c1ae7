//! Intel 8080 bus arguments

use panelbus_hal::{DcLevels, Gpio, I80BusConfig, I80IoFlags, I80PanelIoConfig, SocCaps, MAX_DATA_LINES};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{data_lines, DEFAULT_CMD_BITS, DEFAULT_TRANSFER_TIMEOUT_US, TRANS_QUEUE_DEPTH};
use crate::buffer::BufferOptions;
use crate::error::ValidationError;

/// Default write strobe clock
pub const DEFAULT_I80_FREQ_HZ: u32 = 10_000_000;

/// I80 bus arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I80BusArgs {
    pub dc: Gpio,
    pub wr: Gpio,
    pub cs: Gpio,
    /// `data[0..8]` required, `data[8..16]` optional
    pub data: [Option<Gpio>; MAX_DATA_LINES],
    pub freq: u32,
    pub dc_levels: DcLevels,
    pub cmd_bits: u8,
    pub param_bits: u8,
    pub flags: I80IoFlags,
    pub buffer: BufferOptions,
    pub timeout_us: u32,
}

impl I80BusArgs {
    /// 8-bit bus on `data`
    pub fn new(dc: Gpio, wr: Gpio, cs: Gpio, data: [Gpio; 8]) -> Self {
        let mut lines = [None; MAX_DATA_LINES];
        for (slot, pin) in lines.iter_mut().zip(data) {
            *slot = Some(pin);
        }
        Self {
            dc,
            wr,
            cs,
            data: lines,
            freq: DEFAULT_I80_FREQ_HZ,
            dc_levels: DcLevels::default(),
            cmd_bits: DEFAULT_CMD_BITS,
            param_bits: DEFAULT_CMD_BITS,
            flags: I80IoFlags::default(),
            buffer: BufferOptions::default(),
            timeout_us: DEFAULT_TRANSFER_TIMEOUT_US,
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
    pub fn dc_levels(mut self, levels: DcLevels) -> Self {
        self.dc_levels = levels;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: I80IoFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn buffer(mut self, buffer: BufferOptions) -> Self {
        self.buffer = buffer;
        self
    }

    /// Validate against the target and build wire configuration
    ///
    /// `max_transfer_bytes` is the transfer buffer size, known either now
    /// or at `init`.
    pub fn resolve(
        &self,
        caps: &SocCaps,
        max_transfer_bytes: usize,
    ) -> Result<(I80BusConfig, I80PanelIoConfig), ValidationError> {
        if !caps.i80 {
            return Err(ValidationError::UnsupportedTransport("i80"));
        }
        let data = data_lines(&self.data, caps.max_data_width)?;

        let bus = I80BusConfig {
            dc: self.dc,
            wr: self.wr,
            data,
            max_transfer_bytes,
        };
        let io = I80PanelIoConfig {
            cs: self.cs,
            pclk_hz: self.freq,
            trans_queue_depth: TRANS_QUEUE_DEPTH,
            lcd_cmd_bits: self.cmd_bits,
            lcd_param_bits: self.param_bits,
            dc_levels: self.dc_levels,
            flags: self.flags,
        };
        Ok((bus, io))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: [Gpio; 8] = [8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn test_eight_bit_bus() {
        let (bus, io) = I80BusArgs::new(1, 2, 3, LOW)
            .resolve(&SocCaps::ESP32_S3, 4096)
            .unwrap();

        assert_eq!(bus.bus_width(), 8);
        assert_eq!(bus.max_transfer_bytes, 4096);
        assert_eq!(io.pclk_hz, DEFAULT_I80_FREQ_HZ);
        assert_eq!(io.cs, 3);
    }

    #[test]
    fn test_sixteen_bit_bus() {
        let (bus, _) = I80BusArgs::new(1, 2, 3, LOW)
            .high_lines([16, 17, 18, 19, 20, 21, 38, 39])
            .resolve(&SocCaps::ESP32_S3, 4096)
            .unwrap();

        assert_eq!(bus.bus_width(), 16);
        assert_eq!(bus.data[15], 39);
    }

    #[test]
    fn test_partial_high_lines_rejected() {
        let mut args = I80BusArgs::new(1, 2, 3, LOW);
        args.data[8] = Some(16);
        args.data[9] = Some(17);
        assert_eq!(
            args.resolve(&SocCaps::ESP32_S3, 4096),
            Err(ValidationError::InvalidBusWidth(10))
        );
    }

    #[test]
    fn test_target_without_i80() {
        assert_eq!(
            I80BusArgs::new(1, 2, 3, LOW).resolve(&SocCaps::ESP32_C3, 4096),
            Err(ValidationError::UnsupportedTransport("i80"))
        );
    }
}
