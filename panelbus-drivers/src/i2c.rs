//! I2C LCD bus
//!
//! For small monochrome controllers (SSD1306, SH1106) where DC travels in
//! a control byte ahead of the payload rather than on its own pin.

use core::fmt;

use panelbus_core::config::i2c::I2cBusArgs;
use panelbus_core::{
    BusError, BusId, BusState, CompletionBridge, CompletionCallback, FbIndex, HwOp, LcdBus,
    Pixels, ReadParams,
};
use panelbus_hal::{I2cBusConfig, I2cHal, I2cPanelIoConfig, I2cPort};

use crate::panel_io::{first_error, PanelIoCore};

/// LCD bus on an I2C port
pub struct I2cBus<H: I2cHal> {
    hal: H,
    port: I2cPort,
    bus_config: I2cBusConfig,
    io_config: I2cPanelIoConfig,
    core: PanelIoCore<H::Buffer>,
    io: Option<H::I2cIo>,
}

impl<H: I2cHal> I2cBus<H> {
    pub fn new(
        mut hal: H,
        args: I2cBusArgs,
        bridge: &'static CompletionBridge,
    ) -> Result<Self, BusError> {
        let (bus_config, io_config) = args.resolve(&hal.caps())?;
        let mut core = PanelIoCore::new(bridge, args.buffer, args.timeout_us);
        core.allocate_explicit(&mut hal)?;

        Ok(Self {
            hal,
            port: args.host,
            bus_config,
            io_config,
            core,
            io: None,
        })
    }

    pub fn port(&self) -> I2cPort {
        self.port
    }

    fn claim(&mut self) -> Result<(), BusError> {
        let size = self.core.buffers.size();
        let caps = self.core.options.caps();
        let port = self.port;

        self.hal
            .i2c_param_config(port, &self.bus_config)
            .map_err(|code| BusError::claim(HwOp::I2cParamConfig, code, size, caps))?;
        self.hal
            .i2c_driver_install(port)
            .map_err(|code| BusError::claim(HwOp::I2cDriverInstall, code, size, caps))?;

        match self
            .hal
            .new_i2c_panel_io(port, &self.io_config, self.core.bridge)
        {
            Ok(io) => {
                self.io = Some(io);
                Ok(())
            }
            Err(code) => {
                if let Err(_undo) = self.hal.i2c_driver_delete(port) {
                    bus_warn!(
                        "i2c bus {=u8}: deleting driver on port {=u8} failed: {=i32}",
                        self.core.bridge.bus().0,
                        port,
                        _undo.0
                    );
                }
                Err(BusError::claim(HwOp::NewPanelIo, code, size, caps))
            }
        }
    }
}

impl<H: I2cHal> LcdBus for I2cBus<H> {
    type Region = ();

    fn bus_id(&self) -> BusId {
        self.core.bridge.bus()
    }

    fn state(&self) -> BusState {
        self.core.state
    }

    fn init(&mut self, width: u16, height: u16, bpp: u8) -> Result<(), BusError> {
        self.core.state.require_constructed()?;
        self.core.ensure_buffers(&mut self.hal, width, height, bpp)?;

        if let Err(e) = self.claim() {
            bus_error!("i2c bus {=u8}: init failed", self.bus_id().0);
            self.core.mark_failed();
            return Err(e);
        }

        self.core.state = BusState::Initialized;
        bus_info!(
            "i2c bus {=u8}: addr 0x{=u8:x} on port {=u8}",
            self.bus_id().0,
            self.io_config.dev_addr,
            self.port
        );
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), BusError> {
        self.core.state.require_initialized()?;

        let del_io = match self.io.take() {
            Some(io) => self
                .hal
                .del_i2c_panel_io(io)
                .map_err(|code| BusError::transport(HwOp::DelPanelIo, code)),
            None => Ok(()),
        };
        let delete = self
            .hal
            .i2c_driver_delete(self.port)
            .map_err(|code| BusError::transport(HwOp::I2cDriverDelete, code));

        self.core.buffers.release();
        self.core.state = BusState::Released;
        first_error(&[del_io, delete])
    }

    fn tx_param(&mut self, cmd: i32, params: Option<&[u8]>) -> Result<(), BusError> {
        self.core.tx_param(self.io.as_mut(), cmd, params)
    }

    fn tx_color(&mut self, cmd: i32, pixels: Pixels<'_>, _region: ()) -> Result<(), BusError> {
        self.core
            .tx_color(self.io.as_mut(), &mut self.hal, cmd, pixels)
    }

    fn register_callback(&mut self, callback: CompletionCallback, user_ctx: usize) {
        self.core.bridge.register(callback, user_ctx);
    }

    fn get_frame_buffer(&mut self, index: FbIndex) -> Option<&mut [u8]> {
        self.core.frame_buffer(index)
    }

    fn get_frame_buffer_size(&self) -> usize {
        self.core.buffers.size()
    }
}

impl<H: I2cHal> ReadParams for I2cBus<H> {
    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), BusError> {
        self.core.rx_param(self.io.as_mut(), cmd, buf)
    }
}

impl<H: I2cHal> fmt::Display for I2cBus<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bus = &self.bus_config;
        let io = &self.io_config;
        write!(
            f,
            "I2C(port={}, sda={}, scl={}, addr=0x{:02x}, freq={}, control_phase={}, \
             dc_bit_offset={}, cmd_bits={}, param_bits={})",
            self.port,
            bus.sda,
            bus.scl,
            io.dev_addr,
            bus.clk_speed_hz,
            io.control_phase_bytes,
            io.dc_bit_offset,
            io.lcd_cmd_bits,
            io.lcd_param_bits
        )
    }
}
