//! I2C bus arguments

use panelbus_hal::{Gpio, I2cBusConfig, I2cPanelIoConfig, I2cPort, SocCaps};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{DEFAULT_CMD_BITS, DEFAULT_TRANSFER_TIMEOUT_US};
use crate::buffer::BufferOptions;
use crate::error::ValidationError;

/// I2C bus arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I2cBusArgs {
    pub sda: Gpio,
    pub scl: Gpio,
    /// 7-bit device address
    pub addr: u8,
    pub host: I2cPort,
    pub control_phase_bytes: u8,
    /// Bit of the control phase that carries DC (6 for SSD1306)
    pub dc_bit_offset: u8,
    pub freq: u32,
    pub cmd_bits: u8,
    pub param_bits: u8,
    pub dc_low_on_data: bool,
    pub sda_pullup: bool,
    pub scl_pullup: bool,
    pub disable_control_phase: bool,
    pub buffer: BufferOptions,
    pub timeout_us: u32,
}

impl I2cBusArgs {
    pub const fn new(sda: Gpio, scl: Gpio, addr: u8) -> Self {
        Self {
            sda,
            scl,
            addr,
            host: 0,
            control_phase_bytes: 1,
            dc_bit_offset: 6,
            freq: I2cBusConfig::FAST_HZ,
            cmd_bits: DEFAULT_CMD_BITS,
            param_bits: DEFAULT_CMD_BITS,
            dc_low_on_data: false,
            sda_pullup: true,
            scl_pullup: true,
            disable_control_phase: false,
            buffer: BufferOptions {
                size: None,
                fb_in_psram: false,
                use_dma: true,
            },
            timeout_us: DEFAULT_TRANSFER_TIMEOUT_US,
        }
    }

    #[must_use]
    pub fn host(mut self, port: I2cPort) -> Self {
        self.host = port;
        self
    }

    #[must_use]
    pub fn freq(mut self, hz: u32) -> Self {
        self.freq = hz;
        self
    }

    /// Control phase length and DC bit position within it
    #[must_use]
    pub fn control_phase(mut self, bytes: u8, dc_bit_offset: u8) -> Self {
        self.control_phase_bytes = bytes;
        self.dc_bit_offset = dc_bit_offset;
        self
    }

    #[must_use]
    pub fn buffer(mut self, buffer: BufferOptions) -> Self {
        self.buffer = buffer;
        self
    }

    /// Validate against the target and build wire configuration
    pub fn resolve(
        &self,
        caps: &SocCaps,
    ) -> Result<(I2cBusConfig, I2cPanelIoConfig), ValidationError> {
        if self.addr > 0x7F {
            return Err(ValidationError::InvalidAddress(self.addr));
        }
        if self.host >= caps.i2c_ports {
            return Err(ValidationError::InvalidPort(self.host));
        }
        if !self.disable_control_phase
            && u16::from(self.dc_bit_offset) >= u16::from(self.control_phase_bytes) * 8
        {
            return Err(ValidationError::InvalidDcBitOffset(self.dc_bit_offset));
        }

        let bus = I2cBusConfig {
            sda: self.sda,
            scl: self.scl,
            sda_pullup: self.sda_pullup,
            scl_pullup: self.scl_pullup,
            clk_speed_hz: self.freq,
        };
        let io = I2cPanelIoConfig {
            dev_addr: self.addr,
            control_phase_bytes: self.control_phase_bytes,
            dc_bit_offset: self.dc_bit_offset,
            lcd_cmd_bits: self.cmd_bits,
            lcd_param_bits: self.param_bits,
            dc_low_on_data: self.dc_low_on_data,
            disable_control_phase: self.disable_control_phase,
        };
        Ok((bus, io))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let (bus, io) = I2cBusArgs::new(21, 22, 0x3C)
            .resolve(&SocCaps::ESP32)
            .unwrap();

        assert!(bus.sda_pullup && bus.scl_pullup);
        assert_eq!(bus.clk_speed_hz, 400_000);
        assert_eq!(io.dev_addr, 0x3C);
        assert_eq!(io.control_phase_bytes, 1);
        assert_eq!(io.dc_bit_offset, 6);
        assert!(!io.disable_control_phase);
    }

    #[test]
    fn test_address_must_be_7_bit() {
        assert_eq!(
            I2cBusArgs::new(21, 22, 0x80).resolve(&SocCaps::ESP32),
            Err(ValidationError::InvalidAddress(0x80))
        );
    }

    #[test]
    fn test_port_exists() {
        assert!(I2cBusArgs::new(21, 22, 0x3C)
            .host(1)
            .resolve(&SocCaps::ESP32)
            .is_ok());
        assert_eq!(
            I2cBusArgs::new(21, 22, 0x3C)
                .host(1)
                .resolve(&SocCaps::ESP32_C3),
            Err(ValidationError::InvalidPort(1))
        );
    }

    #[test]
    fn test_dc_bit_inside_control_phase() {
        assert_eq!(
            I2cBusArgs::new(21, 22, 0x3C)
                .control_phase(1, 8)
                .resolve(&SocCaps::ESP32),
            Err(ValidationError::InvalidDcBitOffset(8))
        );
        assert!(I2cBusArgs::new(21, 22, 0x3C)
            .control_phase(2, 8)
            .resolve(&SocCaps::ESP32)
            .is_ok());
    }
}
