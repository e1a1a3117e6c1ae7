//! Transport trait implementations

use panelbus_hal::{
    Gpio, HwError, I2cBusConfig, I2cHal, I2cPanelIoConfig, I2cPort, I80BusConfig, I80Hal,
    I80PanelIoConfig, MemoryPool, PinMatrix, RgbHal, RgbPanelConfig, SpiBusConfig, SpiHal,
    SpiHost, SpiPanelIoConfig, TransferDoneIsr,
};

use crate::{SimEvent, SimHal, SimOp, SimPanelIo, SimRgbPanel};

impl PinMatrix for SimHal {
    fn release_to_input(&mut self, pin: Gpio) -> Result<(), HwError> {
        self.check(SimOp::ReleasePin)?;
        self.record(SimEvent::PinReleased(pin));
        Ok(())
    }
}

impl SpiHal for SimHal {
    type SpiIo = SimPanelIo;

    fn spi_bus_initialize(
        &mut self,
        host: SpiHost,
        config: &SpiBusConfig,
        dma: bool,
    ) -> Result<(), HwError> {
        self.check(SimOp::SpiBusInitialize)?;
        {
            let mut state = self.state.borrow_mut();
            if !state.spi_hosts.insert(host.0) {
                return Err(HwError::INVALID_STATE);
            }
            if dma {
                state.spi_dma.insert(host.0);
            }
        }
        self.record(SimEvent::SpiBusInitialize {
            host,
            config: *config,
            dma,
        });
        Ok(())
    }

    fn new_spi_panel_io(
        &mut self,
        host: SpiHost,
        config: &SpiPanelIoConfig,
        on_done: &'static dyn TransferDoneIsr,
    ) -> Result<SimPanelIo, HwError> {
        self.check(SimOp::NewPanelIo)?;
        let dma = {
            let state = self.state.borrow();
            if !state.spi_hosts.contains(&host.0) {
                return Err(HwError::INVALID_STATE);
            }
            state.spi_dma.contains(&host.0)
        };
        self.record(SimEvent::NewSpiPanelIo {
            host,
            config: *config,
        });
        Ok(SimPanelIo {
            hal: self.clone(),
            on_done,
            dma,
        })
    }

    fn del_spi_panel_io(&mut self, io: SimPanelIo) -> Result<(), HwError> {
        self.check(SimOp::DelPanelIo)?;
        drop(io);
        self.record(SimEvent::DelPanelIo);
        Ok(())
    }

    fn spi_bus_free(&mut self, host: SpiHost) -> Result<(), HwError> {
        self.check(SimOp::SpiBusFree)?;
        {
            let mut state = self.state.borrow_mut();
            if !state.spi_hosts.remove(&host.0) {
                return Err(HwError::INVALID_STATE);
            }
            state.spi_dma.remove(&host.0);
        }
        self.record(SimEvent::SpiBusFree { host });
        Ok(())
    }
}

impl I2cHal for SimHal {
    type I2cIo = SimPanelIo;

    fn i2c_param_config(&mut self, port: I2cPort, config: &I2cBusConfig) -> Result<(), HwError> {
        self.check(SimOp::I2cParamConfig)?;
        if config.clk_speed_hz > I2cBusConfig::FAST_PLUS_HZ {
            return Err(HwError::INVALID_ARG);
        }
        self.record(SimEvent::I2cParamConfig {
            port,
            config: *config,
        });
        Ok(())
    }

    fn i2c_driver_install(&mut self, port: I2cPort) -> Result<(), HwError> {
        self.check(SimOp::I2cDriverInstall)?;
        if !self.state.borrow_mut().i2c_ports.insert(port) {
            return Err(HwError::INVALID_STATE);
        }
        self.record(SimEvent::I2cDriverInstall { port });
        Ok(())
    }

    fn new_i2c_panel_io(
        &mut self,
        port: I2cPort,
        config: &I2cPanelIoConfig,
        on_done: &'static dyn TransferDoneIsr,
    ) -> Result<SimPanelIo, HwError> {
        self.check(SimOp::NewPanelIo)?;
        self.record(SimEvent::NewI2cPanelIo {
            port,
            config: *config,
        });
        // I2C transfers are polled by the driver
        Ok(SimPanelIo {
            hal: self.clone(),
            on_done,
            dma: false,
        })
    }

    fn del_i2c_panel_io(&mut self, io: SimPanelIo) -> Result<(), HwError> {
        self.check(SimOp::DelPanelIo)?;
        drop(io);
        self.record(SimEvent::DelPanelIo);
        Ok(())
    }

    fn i2c_driver_delete(&mut self, port: I2cPort) -> Result<(), HwError> {
        self.check(SimOp::I2cDriverDelete)?;
        if !self.state.borrow_mut().i2c_ports.remove(&port) {
            return Err(HwError::INVALID_STATE);
        }
        self.record(SimEvent::I2cDriverDelete { port });
        Ok(())
    }
}

/// Handle for a simulated I80 bus
#[derive(Debug)]
pub struct SimI80Bus {
    pub width: usize,
}

impl I80Hal for SimHal {
    type I80Bus = SimI80Bus;
    type I80Io = SimPanelIo;

    fn new_i80_bus(&mut self, config: &I80BusConfig) -> Result<SimI80Bus, HwError> {
        self.check(SimOp::NewI80Bus)?;
        self.record(SimEvent::NewI80Bus {
            config: config.clone(),
        });
        Ok(SimI80Bus {
            width: config.bus_width(),
        })
    }

    fn new_i80_panel_io(
        &mut self,
        _bus: &SimI80Bus,
        config: &I80PanelIoConfig,
        on_done: &'static dyn TransferDoneIsr,
    ) -> Result<SimPanelIo, HwError> {
        self.check(SimOp::NewPanelIo)?;
        self.record(SimEvent::NewI80PanelIo { config: *config });
        Ok(SimPanelIo {
            hal: self.clone(),
            on_done,
            dma: true,
        })
    }

    fn del_i80_panel_io(&mut self, io: SimPanelIo) -> Result<(), HwError> {
        self.check(SimOp::DelPanelIo)?;
        drop(io);
        self.record(SimEvent::DelPanelIo);
        Ok(())
    }

    fn del_i80_bus(&mut self, bus: SimI80Bus) -> Result<(), HwError> {
        self.check(SimOp::DelI80Bus)?;
        drop(bus);
        self.record(SimEvent::DelI80Bus);
        Ok(())
    }
}

impl RgbHal for SimHal {
    type Panel = SimRgbPanel;

    fn new_rgb_panel(&mut self, config: &RgbPanelConfig) -> Result<SimRgbPanel, HwError> {
        self.check(SimOp::NewRgbPanel)?;

        let mut fbs = Vec::with_capacity(config.num_fbs as usize);
        for _ in 0..config.num_fbs {
            // Partially allocated buffers drop back to the pool on failure
            let fb = self
                .allocate(config.fb_size, config.fb_caps)
                .ok_or(HwError::NO_MEM)?;
            fbs.push(fb);
        }

        self.record(SimEvent::NewRgbPanel {
            config: config.clone(),
        });
        Ok(SimRgbPanel {
            hal: self.clone(),
            fbs,
            h_res: usize::from(config.timings.h_res),
            bytes_per_pixel: usize::from(config.bits_per_pixel / 8),
            active: 0,
        })
    }

    fn rgb_register_vsync(
        &mut self,
        _panel: &mut SimRgbPanel,
        on_vsync: &'static dyn TransferDoneIsr,
    ) -> Result<(), HwError> {
        self.check(SimOp::RegisterVsync)?;
        self.state.borrow_mut().vsync_hooks.push(on_vsync);
        self.record(SimEvent::RgbRegisterVsync);
        Ok(())
    }

    fn rgb_panel_reset(&mut self, _panel: &mut SimRgbPanel) -> Result<(), HwError> {
        self.check(SimOp::PanelReset)?;
        self.record(SimEvent::RgbPanelReset);
        Ok(())
    }

    fn rgb_panel_init(&mut self, _panel: &mut SimRgbPanel) -> Result<(), HwError> {
        self.check(SimOp::PanelInit)?;
        self.record(SimEvent::RgbPanelInit);
        Ok(())
    }

    fn del_rgb_panel(&mut self, panel: SimRgbPanel) -> Result<(), HwError> {
        self.check(SimOp::DelPanel)?;
        drop(panel);
        self.state.borrow_mut().vsync_hooks.clear();
        self.record(SimEvent::DelRgbPanel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelbus_hal::SpiBusFlags;

    fn bus_config() -> SpiBusConfig {
        SpiBusConfig {
            sclk: Some(14),
            mosi: Some(13),
            miso: None,
            quadwp: None,
            quadhd: None,
            max_transfer_sz: 64,
            flags: SpiBusFlags::MASTER,
        }
    }

    #[test]
    fn test_host_claimed_once() {
        let mut hal = SimHal::esp32();
        hal.spi_bus_initialize(SpiHost::HSPI, &bus_config(), true)
            .unwrap();
        assert_eq!(
            hal.spi_bus_initialize(SpiHost::HSPI, &bus_config(), true),
            Err(HwError::INVALID_STATE)
        );
        hal.spi_bus_free(SpiHost::HSPI).unwrap();
        assert!(hal
            .spi_bus_initialize(SpiHost::HSPI, &bus_config(), false)
            .is_ok());
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut hal = SimHal::esp32();
        hal.fail_next(SimOp::SpiBusInitialize, HwError(0x105));
        assert_eq!(
            hal.spi_bus_initialize(SpiHost::HSPI, &bus_config(), true),
            Err(HwError(0x105))
        );
        assert!(hal
            .spi_bus_initialize(SpiHost::HSPI, &bus_config(), true)
            .is_ok());
    }

    #[test]
    fn test_failures_armed_per_op() {
        let mut hal = SimHal::esp32();
        hal.fail_next(SimOp::SpiBusInitialize, HwError::INVALID_STATE);
        hal.fail_next(SimOp::SpiBusFree, HwError::FAIL);
        hal.fail_next(SimOp::SpiBusInitialize, HwError::NO_MEM);

        assert_eq!(hal.spi_bus_free(SpiHost::HSPI), Err(HwError::FAIL));
        assert_eq!(
            hal.spi_bus_initialize(SpiHost::HSPI, &bus_config(), true),
            Err(HwError::NO_MEM)
        );
        assert!(hal
            .spi_bus_initialize(SpiHost::HSPI, &bus_config(), true)
            .is_ok());
    }

    #[test]
    fn test_release_recorded() {
        let mut hal = SimHal::esp32();
        hal.release_to_input(12).unwrap();
        hal.release_to_input(13).unwrap();
        assert_eq!(hal.released_pins(), vec![12, 13]);
    }
}
