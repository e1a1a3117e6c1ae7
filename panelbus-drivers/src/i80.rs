//! Intel 8080 parallel LCD bus
//!
//! 8 or 16 data lines plus DC and a write strobe. The hardware transfer
//! limit is the buffer size, so the bus is only created at `init` once
//! that size is known.

use core::fmt;

use panelbus_core::config::i80::I80BusArgs;
use panelbus_core::{
    BusError, BusId, BusState, CompletionBridge, CompletionCallback, FbIndex, HwOp, LcdBus,
    Pixels, ReadParams,
};
use panelbus_hal::{I80Hal, SocCaps};

use crate::panel_io::{first_error, PanelIoCore};

/// LCD bus on the I80 peripheral
pub struct I80Bus<H: I80Hal> {
    hal: H,
    args: I80BusArgs,
    width: usize,
    core: PanelIoCore<H::Buffer>,
    bus: Option<H::I80Bus>,
    io: Option<H::I80Io>,
}

impl<H: I80Hal> I80Bus<H> {
    pub fn new(
        mut hal: H,
        args: I80BusArgs,
        bridge: &'static CompletionBridge,
    ) -> Result<Self, BusError> {
        // Pins and target are checked now; the transfer size is filled in later
        let (bus_config, _) = args.resolve(&hal.caps(), 0)?;
        let mut core = PanelIoCore::new(bridge, args.buffer, args.timeout_us);
        core.allocate_explicit(&mut hal)?;

        Ok(Self {
            hal,
            args,
            width: bus_config.bus_width(),
            core,
            bus: None,
            io: None,
        })
    }

    /// Number of data lines, 8 or 16
    pub fn bus_width(&self) -> usize {
        self.width
    }

    fn claim(&mut self, caps: &SocCaps) -> Result<(), BusError> {
        let size = self.core.buffers.size();
        let mem = self.core.options.caps();
        let (bus_config, io_config) = self.args.resolve(caps, size)?;

        let bus = self
            .hal
            .new_i80_bus(&bus_config)
            .map_err(|code| BusError::claim(HwOp::NewI80Bus, code, size, mem))?;

        match self
            .hal
            .new_i80_panel_io(&bus, &io_config, self.core.bridge)
        {
            Ok(io) => {
                self.bus = Some(bus);
                self.io = Some(io);
                Ok(())
            }
            Err(code) => {
                if let Err(_undo) = self.hal.del_i80_bus(bus) {
                    bus_warn!(
                        "i80 bus {=u8}: deleting bus failed: {=i32}",
                        self.core.bridge.bus().0,
                        _undo.0
                    );
                }
                Err(BusError::claim(HwOp::NewPanelIo, code, size, mem))
            }
        }
    }
}

impl<H: I80Hal> LcdBus for I80Bus<H> {
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

        let caps = self.hal.caps();
        if let Err(e) = self.claim(&caps) {
            bus_error!("i80 bus {=u8}: init failed", self.bus_id().0);
            self.core.mark_failed();
            return Err(e);
        }

        self.core.state = BusState::Initialized;
        bus_info!(
            "i80 bus {=u8}: {=usize} bit, {=u32} Hz",
            self.bus_id().0,
            self.width,
            self.args.freq
        );
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), BusError> {
        self.core.state.require_initialized()?;

        // Panel IO before the bus it is attached to
        let del_io = match self.io.take() {
            Some(io) => self
                .hal
                .del_i80_panel_io(io)
                .map_err(|code| BusError::transport(HwOp::DelPanelIo, code)),
            None => Ok(()),
        };
        let del_bus = match self.bus.take() {
            Some(bus) => self
                .hal
                .del_i80_bus(bus)
                .map_err(|code| BusError::transport(HwOp::DelI80Bus, code)),
            None => Ok(()),
        };

        self.core.buffers.release();
        self.core.state = BusState::Released;
        first_error(&[del_io, del_bus])
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

impl<H: I80Hal> ReadParams for I80Bus<H> {
    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), BusError> {
        self.core.rx_param(self.io.as_mut(), cmd, buf)
    }
}

impl<H: I80Hal> fmt::Display for I80Bus<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = &self.args;
        write!(f, "I80(dc={}, wr={}, cs={}, data=[", args.dc, args.wr, args.cs)?;
        for (i, pin) in args.data.iter().flatten().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", pin)?;
        }
        write!(
            f,
            "], width={}, freq={}, cmd_bits={}, param_bits={})",
            self.width, args.freq, args.cmd_bits, args.param_bits
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testutil::{counter, leak_bridge, Counter};
    use panelbus_core::{BufferOptions, CompletionEvent, LifecycleError, ValidationError};
    use panelbus_hal::{Gpio, HwError, MemCaps, SocCaps};
    use panelbus_hal_sim::{CompletionMode, SimEvent, SimHal, SimOp};
    use std::string::ToString;
    use std::vec;

    const LOW: [Gpio; 8] = [8, 9, 10, 11, 12, 13, 14, 15];
    const HIGH: [Gpio; 8] = [16, 17, 18, 19, 20, 21, 38, 39];

    fn st7796(hal: &SimHal, args: I80BusArgs) -> I80Bus<SimHal> {
        I80Bus::new(hal.clone(), args, leak_bridge(2)).unwrap()
    }

    #[test]
    fn test_width_from_data_pins() {
        let hal = SimHal::esp32_s3();
        assert_eq!(st7796(&hal, I80BusArgs::new(0, 47, 6, LOW)).bus_width(), 8);
        assert_eq!(
            st7796(&hal, I80BusArgs::new(0, 47, 6, LOW).high_lines(HIGH)).bus_width(),
            16
        );
    }

    #[test]
    fn test_gap_in_data_lines() {
        let mut args = I80BusArgs::new(0, 47, 6, LOW);
        args.data[8] = Some(16);
        let result = I80Bus::new(SimHal::esp32_s3(), args, leak_bridge(2));
        assert!(matches!(
            result.err(),
            Some(BusError::Validation(ValidationError::InvalidBusWidth(_)))
        ));
    }

    #[test]
    fn test_missing_low_line() {
        let mut args = I80BusArgs::new(0, 47, 6, LOW);
        args.data[3] = None;
        assert!(I80Bus::new(SimHal::esp32_s3(), args, leak_bridge(2)).is_err());
    }

    #[test]
    fn test_unsupported_target() {
        let result = I80Bus::new(
            SimHal::new(SocCaps::ESP32_C3),
            I80BusArgs::new(0, 47, 6, LOW),
            leak_bridge(2),
        );
        assert_eq!(
            result.err(),
            Some(BusError::Validation(ValidationError::UnsupportedTransport(
                "i80"
            )))
        );
    }

    #[test]
    fn test_init_creates_bus_with_buffer_limit() {
        let hal = SimHal::esp32_s3();
        let mut bus = st7796(&hal, I80BusArgs::new(0, 47, 6, LOW).high_lines(HIGH));
        bus.init(480, 320, 16).unwrap();

        let events = hal.events();
        match &events[0] {
            SimEvent::NewI80Bus { config } => {
                assert_eq!(config.bus_width(), 16);
                assert_eq!(config.max_transfer_bytes, 30720);
                assert_eq!(config.dc, 0);
                assert_eq!(config.wr, 47);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &events[1] {
            SimEvent::NewI80PanelIo { config } => {
                assert_eq!(config.cs, 6);
                assert_eq!(config.pclk_hz, 10_000_000);
                assert!(!config.dc_levels.data);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(hal.internal_in_use(), 2 * 30720);
    }

    #[test]
    fn test_psram_buffers_without_dma() {
        let hal = SimHal::esp32_s3();
        let args = I80BusArgs::new(0, 47, 6, LOW).buffer(BufferOptions {
            size: Some(2048),
            fb_in_psram: true,
            use_dma: false,
        });
        let mut bus = st7796(&hal, args);

        assert_eq!(hal.psram_in_use(), 2048);
        assert_eq!(hal.internal_in_use(), 0);
        bus.init(480, 320, 16).unwrap();
        assert!(bus.get_frame_buffer(FbIndex::Second).is_none());
    }

    #[test]
    fn test_out_of_memory_is_atomic() {
        let hal = SimHal::esp32_s3().with_internal(40_000);
        let mut bus = st7796(&hal, I80BusArgs::new(0, 47, 6, LOW));

        assert_eq!(
            bus.init(480, 320, 16),
            Err(BusError::OutOfMemory {
                requested: 30720,
                caps: MemCaps::INTERNAL | MemCaps::DMA
            })
        );
        assert_eq!(hal.internal_in_use(), 0);
        assert!(hal.events().is_empty());
    }

    #[test]
    fn test_hardware_no_mem_reported_as_oom() {
        let hal = SimHal::esp32_s3();
        hal.fail_next(SimOp::NewI80Bus, HwError::NO_MEM);
        let mut bus = st7796(&hal, I80BusArgs::new(0, 47, 6, LOW));

        assert!(matches!(
            bus.init(480, 320, 16),
            Err(BusError::OutOfMemory { .. })
        ));
        assert_eq!(bus.state(), BusState::Failed);
    }

    #[test]
    fn test_panel_io_failure_deletes_bus() {
        let hal = SimHal::esp32_s3();
        hal.fail_next(SimOp::NewPanelIo, HwError::INVALID_ARG);
        let mut bus = st7796(&hal, I80BusArgs::new(0, 47, 6, LOW));

        assert!(bus.init(480, 320, 16).is_err());
        assert_eq!(hal.events().last(), Some(&SimEvent::DelI80Bus));
    }

    #[test]
    fn test_deferred_callback_after_dma() {
        static HITS: Counter = counter();
        fn on_flush(ev: CompletionEvent) {
            HITS.fetch_add(ev.user_ctx);
        }

        let hal = SimHal::esp32_s3();
        hal.set_completion(CompletionMode::Manual);
        let bridge = leak_bridge(6);
        let mut bus =
            I80Bus::new(hal.clone(), I80BusArgs::new(0, 47, 6, LOW), bridge).unwrap();
        bus.init(480, 320, 16).unwrap();
        bus.register_callback(on_flush, 5);

        bus.get_frame_buffer(FbIndex::First).unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);
        bus.tx_color(
            0x2C,
            Pixels::FrameBuffer {
                index: FbIndex::First,
                len: 4,
            },
            (),
        )
        .unwrap();

        assert_eq!(hal.pending_transfers(), 1);
        assert_eq!(hal.complete_transfers(), 1);
        assert_eq!(bridge.scheduler().run_pending(), 1);
        assert_eq!(HITS.get(), 5);
        assert!(hal.events().contains(&SimEvent::TxColor {
            cmd: 0x2C,
            data: vec![1, 2, 3, 4]
        }));
    }

    #[test]
    fn test_deinit_order() {
        let hal = SimHal::esp32_s3();
        let mut bus = st7796(&hal, I80BusArgs::new(0, 47, 6, LOW));
        bus.init(480, 320, 16).unwrap();
        hal.clear_events();

        bus.deinit().unwrap();
        assert_eq!(hal.events(), vec![SimEvent::DelPanelIo, SimEvent::DelI80Bus]);
        assert_eq!(hal.internal_in_use(), 0);
        assert_eq!(
            bus.tx_color(0x2C, Pixels::Slice(&[0; 2]), ()),
            Err(BusError::Lifecycle(LifecycleError::Released))
        );
    }

    #[test]
    fn test_display() {
        let bus = st7796(&SimHal::esp32_s3(), I80BusArgs::new(0, 47, 6, LOW));
        assert_eq!(
            bus.to_string(),
            "I80(dc=0, wr=47, cs=6, data=[8, 9, 10, 11, 12, 13, 14, 15], width=8, \
             freq=10000000, cmd_bits=8, param_bits=8)"
        );
    }
}
