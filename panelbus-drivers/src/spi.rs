//! SPI LCD bus
//!
//! The workhorse transport for small TFTs (ST7789, ILI9341, GC9A01...).
//! Pin routing and the default clock are decided at construction, see
//! [`panelbus_core::config::spi::route`]; the host is only claimed by
//! `init`.

use core::fmt;

use panelbus_core::config::spi::{SpiBusArgs, SpiResolved, SpiRouting};
use panelbus_core::{
    BusError, BusId, BusState, CompletionBridge, CompletionCallback, FbIndex, HwOp, LcdBus,
    Pixels, ReadParams,
};
use panelbus_hal::SpiHal;

use crate::panel_io::{first_error, PanelIoCore};

/// LCD bus on an SPI host
pub struct SpiBus<H: SpiHal> {
    hal: H,
    config: SpiResolved,
    core: PanelIoCore<H::Buffer>,
    io: Option<H::SpiIo>,
}

impl<H: SpiHal> SpiBus<H> {
    /// Validate `args` and allocate buffers if an explicit size was given
    ///
    /// No bus hardware is touched until [`LcdBus::init`].
    pub fn new(
        mut hal: H,
        args: SpiBusArgs,
        bridge: &'static CompletionBridge,
    ) -> Result<Self, BusError> {
        let config = args.resolve()?;
        let mut core = PanelIoCore::new(bridge, args.buffer, args.timeout_us);
        core.allocate_explicit(&mut hal)?;

        bus_debug!(
            "spi bus {=u8}: host {=u8}, {=u32} Hz",
            bridge.bus().0,
            config.host.0,
            config.routing.freq_hz
        );

        Ok(Self {
            hal,
            config,
            core,
            io: None,
        })
    }

    /// Resolved pins, routing flags and clock
    pub fn routing(&self) -> &SpiRouting {
        &self.config.routing
    }

    /// Largest transfer the SPI driver is configured for
    ///
    /// The buffer size with DMA, the SoC's non-DMA limit otherwise.
    pub fn max_transfer_sz(&self) -> usize {
        if self.core.options.use_dma {
            self.core.buffers.size()
        } else {
            self.hal.caps().spi_max_transfer
        }
    }

    fn claim(&mut self) -> Result<(), BusError> {
        let host = self.config.host;
        let dma = self.core.options.use_dma;
        let bus_config = self.config.routing.bus_config(self.max_transfer_sz());
        let size = self.core.buffers.size();
        let caps = self.core.options.caps();

        self.hal
            .spi_bus_initialize(host, &bus_config, dma)
            .map_err(|code| BusError::claim(HwOp::SpiBusInitialize, code, size, caps))?;

        match self
            .hal
            .new_spi_panel_io(host, &self.config.io, self.core.bridge)
        {
            Ok(io) => {
                self.io = Some(io);
                Ok(())
            }
            Err(code) => {
                // Leave the host free for a fresh attempt
                if let Err(_undo) = self.hal.spi_bus_free(host) {
                    bus_warn!(
                        "spi bus {=u8}: freeing host {=u8} failed: {=i32}",
                        self.core.bridge.bus().0,
                        host.0,
                        _undo.0
                    );
                }
                Err(BusError::claim(HwOp::NewPanelIo, code, size, caps))
            }
        }
    }
}

impl<H: SpiHal> LcdBus for SpiBus<H> {
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
            bus_error!("spi bus {=u8}: init failed", self.bus_id().0);
            self.core.mark_failed();
            return Err(e);
        }

        self.core.state = BusState::Initialized;
        bus_info!(
            "spi bus {=u8}: {=u16}x{=u16}@{=u8}, buffer {=usize}",
            self.bus_id().0,
            width,
            height,
            bpp,
            self.core.buffers.size()
        );
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), BusError> {
        self.core.state.require_initialized()?;
        let host = self.config.host;

        let del_io = match self.io.take() {
            Some(io) => self
                .hal
                .del_spi_panel_io(io)
                .map_err(|code| BusError::transport(HwOp::DelPanelIo, code)),
            None => Ok(()),
        };
        let free = self
            .hal
            .spi_bus_free(host)
            .map_err(|code| BusError::transport(HwOp::SpiBusFree, code));

        let mut release = Ok(());
        for pin in self.config.routing.data_lines() {
            if let Err(code) = self.hal.release_to_input(pin) {
                release = Err(BusError::transport(HwOp::ReleasePin, code));
            }
        }

        self.core.buffers.release();
        self.core.state = BusState::Released;
        first_error(&[del_io, free, release])
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

impl<H: SpiHal> ReadParams for SpiBus<H> {
    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), BusError> {
        self.core.rx_param(self.io.as_mut(), cmd, buf)
    }
}

impl<H: SpiHal> fmt::Display for SpiBus<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let io = &self.config.io;
        write!(
            f,
            "SPI(host={}, dc={}, {}, mode={}, cmd_bits={}, param_bits={}, dma={})",
            self.config.host.0,
            io.dc,
            self.config.routing,
            io.spi_mode.number(),
            io.lcd_cmd_bits,
            io.lcd_param_bits,
            self.core.options.use_dma
        )
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testutil::{counter, leak_bridge, Counter};
    use panelbus_core::{BufferOptions, CompletionEvent, LifecycleError, TransportCode, ValidationError};
    use panelbus_hal::{HwError, MemCaps, SpiBusFlags, SpiHost};
    use panelbus_hal_sim::{CompletionMode, SimEvent, SimHal, SimOp};
    use std::string::ToString;
    use std::vec;

    const RAMWR: i32 = 0x2C;

    fn spi_bus(hal: &SimHal, args: SpiBusArgs) -> SpiBus<SimHal> {
        SpiBus::new(hal.clone(), args, leak_bridge(0)).unwrap()
    }

    #[test]
    fn test_deferred_buffers_sized_at_init() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));

        assert_eq!(bus.get_frame_buffer_size(), 0);
        assert_eq!(hal.internal_in_use(), 0);

        bus.init(320, 240, 16).unwrap();

        assert_eq!(bus.get_frame_buffer_size(), 15360);
        assert_eq!(hal.internal_in_use(), 2 * 15360);
        assert!(bus.get_frame_buffer(FbIndex::First).is_some());
        assert!(bus.get_frame_buffer(FbIndex::Second).is_some());
    }

    #[test]
    fn test_init_installs_bus_with_routing() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(320, 240, 16).unwrap();

        let events = hal.events();
        match &events[0] {
            SimEvent::SpiBusInitialize { host, config, dma } => {
                assert_eq!(*host, SpiHost::HSPI);
                assert!(*dma);
                assert_eq!(config.sclk, Some(14));
                assert_eq!(config.mosi, Some(13));
                assert_eq!(config.miso, Some(12));
                assert_eq!(config.max_transfer_sz, 15360);
                assert!(config.flags.contains(SpiBusFlags::IOMUX_PINS));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &events[1] {
            SimEvent::NewSpiPanelIo { config, .. } => {
                assert_eq!(config.pclk_hz, 80_000_000);
                assert_eq!(config.cs, Some(15));
                assert_eq!(config.trans_queue_depth, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_dma_uses_soc_transfer_limit() {
        let hal = SimHal::esp32();
        let args = SpiBusArgs::new(21).buffer(BufferOptions {
            use_dma: false,
            ..Default::default()
        });
        let mut bus = spi_bus(&hal, args);
        bus.init(320, 240, 16).unwrap();

        assert_eq!(bus.max_transfer_sz(), 64);
        assert!(bus.get_frame_buffer(FbIndex::Second).is_none());
        assert_eq!(hal.internal_in_use(), 15360);
        assert!(matches!(
            hal.events()[0],
            SimEvent::SpiBusInitialize { dma: false, .. }
        ));
    }

    #[test]
    fn test_explicit_size_allocated_at_construction() {
        let hal = SimHal::esp32();
        let bus = spi_bus(&hal, SpiBusArgs::new(21).buffer(BufferOptions::sized(4096)));

        assert_eq!(bus.get_frame_buffer_size(), 4096);
        assert_eq!(hal.internal_in_use(), 8192);
        assert!(hal.events().is_empty());
    }

    #[test]
    fn test_explicit_size_kept_at_init() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21).buffer(BufferOptions::sized(4096)));
        bus.init(320, 240, 16).unwrap();
        assert_eq!(bus.get_frame_buffer_size(), 4096);
        assert_eq!(hal.internal_in_use(), 8192);
    }

    #[test]
    fn test_construction_out_of_memory() {
        let hal = SimHal::esp32().with_internal(6000);
        let result = SpiBus::new(
            hal.clone(),
            SpiBusArgs::new(21).buffer(BufferOptions::sized(4000)),
            leak_bridge(0),
        );

        assert_eq!(
            result.err(),
            Some(BusError::OutOfMemory {
                requested: 4000,
                caps: MemCaps::INTERNAL | MemCaps::DMA
            })
        );
        assert_eq!(hal.internal_in_use(), 0);
    }

    #[test]
    fn test_invalid_mode_touches_nothing() {
        let hal = SimHal::esp32();
        let result = SpiBus::new(
            hal.clone(),
            SpiBusArgs::new(21)
                .spi_mode(4)
                .buffer(BufferOptions::sized(1024)),
            leak_bridge(0),
        );

        assert_eq!(
            result.err(),
            Some(BusError::Validation(ValidationError::InvalidSpiMode(4)))
        );
        assert!(hal.events().is_empty());
        assert_eq!(hal.internal_in_use(), 0);
    }

    #[test]
    fn test_tx_before_init() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));

        let not_init = BusError::Lifecycle(LifecycleError::NotInitialized);
        assert_eq!(bus.tx_param(0x11, None), Err(not_init));
        assert_eq!(
            bus.tx_color(RAMWR, Pixels::Slice(&[0; 4]), ()),
            Err(not_init)
        );
        assert_eq!(bus.rx_param(0x04, &mut [0; 3]), Err(not_init));
        assert!(hal.events().is_empty());
    }

    #[test]
    fn test_init_twice_rejected() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(320, 240, 16).unwrap();
        assert_eq!(
            bus.init(320, 240, 16),
            Err(BusError::Lifecycle(LifecycleError::AlreadyInitialized))
        );
    }

    #[test]
    fn test_tx_param_forwards() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(240, 240, 16).unwrap();
        hal.clear_events();

        bus.tx_param(0x2A, Some(&[0, 0, 0, 239])).unwrap();
        bus.tx_param(0x29, None).unwrap();

        assert_eq!(
            hal.events(),
            vec![
                SimEvent::TxParam {
                    cmd: 0x2A,
                    params: Some(vec![0, 0, 0, 239])
                },
                SimEvent::TxParam {
                    cmd: 0x29,
                    params: None
                },
            ]
        );
    }

    #[test]
    fn test_rx_param_reads_reply() {
        let hal = SimHal::esp32();
        hal.set_rx_reply(&[0x85, 0x85, 0x52]);
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(240, 240, 16).unwrap();

        let mut id = [0u8; 3];
        bus.rx_param(0x04, &mut id).unwrap();
        assert_eq!(id, [0x85, 0x85, 0x52]);
    }

    #[test]
    fn test_dma_without_callback_blocks_until_done() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(320, 240, 16).unwrap();

        bus.get_frame_buffer(FbIndex::First).unwrap().fill(0x5A);
        bus.tx_color(RAMWR, Pixels::frame(FbIndex::First), ())
            .unwrap();

        // The wait polled until the sim completed the transfer
        assert_eq!(hal.pending_transfers(), 0);
        assert!(hal.elapsed_ns() > 0);
        let sent = hal
            .events()
            .into_iter()
            .find_map(|e| match e {
                SimEvent::TxColor { cmd, data } => Some((cmd, data)),
                _ => None,
            })
            .unwrap();
        assert_eq!(sent.0, RAMWR);
        assert_eq!(sent.1.len(), 15360);
        assert!(sent.1.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_dma_wait_times_out() {
        let hal = SimHal::esp32();
        hal.set_completion(CompletionMode::Never);
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21).timeout_us(500));
        bus.init(320, 240, 16).unwrap();

        assert_eq!(
            bus.tx_color(RAMWR, Pixels::Slice(&[0; 32]), ()),
            Err(BusError::Transport {
                op: HwOp::TxColor,
                code: TransportCode::Timeout
            })
        );
        assert!(hal.elapsed_ns() >= 500_000);
    }

    #[test]
    fn test_dma_callback_fires_once_after_interrupt() {
        static HITS: Counter = counter();
        fn flush_ready(ev: CompletionEvent) {
            assert_eq!(ev.user_ctx, 0xBEEF);
            HITS.fetch_add(1);
        }

        let hal = SimHal::esp32();
        hal.set_completion(CompletionMode::Manual);
        let bridge = leak_bridge(3);
        let mut bus = SpiBus::new(hal.clone(), SpiBusArgs::new(21), bridge).unwrap();
        bus.init(320, 240, 16).unwrap();
        bus.register_callback(flush_ready, 0xBEEF);

        // Returns with the transfer still in flight
        bus.tx_color(RAMWR, Pixels::frame(FbIndex::Second), ())
            .unwrap();
        assert_eq!(hal.pending_transfers(), 1);
        assert_eq!(bridge.scheduler().run_pending(), 0);

        hal.complete_transfers();
        assert_eq!(HITS.get(), 0);
        assert_eq!(bridge.scheduler().run_pending(), 1);
        assert_eq!(HITS.get(), 1);

        // A repeated interrupt does not re-run the callback
        bridge_interrupt(bridge);
        assert_eq!(bridge.scheduler().run_pending(), 0);
        assert_eq!(HITS.get(), 1);
    }

    fn bridge_interrupt(bridge: &'static CompletionBridge) {
        use panelbus_hal::TransferDoneIsr;
        bridge.on_transfer_done();
    }

    #[test]
    fn test_dma_callback_with_caller_slice_waits() {
        static HITS: Counter = counter();
        fn flush_ready(_: CompletionEvent) {
            HITS.fetch_add(1);
        }

        let hal = SimHal::esp32();
        let bridge = leak_bridge(4);
        let mut bus = SpiBus::new(hal.clone(), SpiBusArgs::new(21), bridge).unwrap();
        bus.init(320, 240, 16).unwrap();
        bus.register_callback(flush_ready, 0);

        let pixels = [0u8; 64];
        bus.tx_color(RAMWR, Pixels::Slice(&pixels), ()).unwrap();

        assert_eq!(hal.pending_transfers(), 0);
        assert_eq!(bridge.scheduler().run_pending(), 1);
        assert_eq!(HITS.get(), 1);
    }

    #[test]
    fn test_non_dma_callback_scheduled_once() {
        static HITS: Counter = counter();
        fn flush_ready(_: CompletionEvent) {
            HITS.fetch_add(1);
        }

        let hal = SimHal::esp32();
        let bridge = leak_bridge(5);
        let args = SpiBusArgs::new(21).buffer(BufferOptions {
            use_dma: false,
            ..Default::default()
        });
        let mut bus = SpiBus::new(hal.clone(), args, bridge).unwrap();
        bus.init(320, 240, 16).unwrap();
        bus.register_callback(flush_ready, 0);

        bus.tx_color(RAMWR, Pixels::frame(FbIndex::First), ())
            .unwrap();

        // The polled transfer's own interrupt was ignored
        assert_eq!(bridge.scheduler().run_pending(), 1);
        assert_eq!(HITS.get(), 1);
    }

    #[test]
    fn test_frame_buffer_payload_bounds() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21).buffer(BufferOptions::sized(100)));
        bus.init(320, 240, 16).unwrap();

        assert!(bus
            .tx_color(
                RAMWR,
                Pixels::FrameBuffer {
                    index: FbIndex::First,
                    len: 40
                },
                ()
            )
            .is_ok());
        assert_eq!(
            bus.tx_color(
                RAMWR,
                Pixels::FrameBuffer {
                    index: FbIndex::First,
                    len: 101
                },
                ()
            ),
            Err(BusError::Validation(ValidationError::LengthMismatch {
                expected: 100,
                actual: 101
            }))
        );
    }

    #[test]
    fn test_tx_color_hardware_error() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(320, 240, 16).unwrap();
        hal.fail_next(SimOp::TxColor, HwError::INVALID_STATE);

        let err = bus
            .tx_color(RAMWR, Pixels::Slice(&[1, 2, 3, 4]), ())
            .unwrap_err();
        assert_eq!(err, BusError::transport(HwOp::TxColor, HwError::INVALID_STATE));
        assert_eq!(err.to_string(), "259(esp_lcd_panel_io_tx_color)");
    }

    #[test]
    fn test_claim_failure_marks_failed() {
        let hal = SimHal::esp32();
        hal.fail_next(SimOp::NewPanelIo, HwError::INVALID_ARG);
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));

        assert_eq!(
            bus.init(320, 240, 16),
            Err(BusError::HardwareClaim {
                op: HwOp::NewPanelIo,
                code: HwError::INVALID_ARG
            })
        );
        assert_eq!(bus.state(), BusState::Failed);
        // Host handed back and buffers freed
        assert!(hal
            .events()
            .contains(&SimEvent::SpiBusFree { host: SpiHost::HSPI }));
        assert_eq!(hal.internal_in_use(), 0);
        assert_eq!(
            bus.tx_param(0x11, None),
            Err(BusError::Lifecycle(LifecycleError::Failed))
        );
    }

    #[test]
    fn test_failed_rollback_keeps_claim_error() {
        let hal = SimHal::esp32();
        hal.fail_next(SimOp::NewPanelIo, HwError::INVALID_ARG);
        hal.fail_next(SimOp::SpiBusFree, HwError::INVALID_STATE);
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));

        assert_eq!(
            bus.init(320, 240, 16),
            Err(BusError::HardwareClaim {
                op: HwOp::NewPanelIo,
                code: HwError::INVALID_ARG
            })
        );
        assert_eq!(bus.state(), BusState::Failed);
        assert_eq!(hal.internal_in_use(), 0);
    }

    #[test]
    fn test_unknown_host_touches_nothing() {
        let hal = SimHal::esp32();
        let result = SpiBus::new(
            hal.clone(),
            SpiBusArgs::new(21)
                .host(7)
                .pins(Some(13), None, Some(14))
                .buffer(BufferOptions::sized(1024)),
            leak_bridge(0),
        );

        assert_eq!(
            result.err(),
            Some(BusError::Validation(ValidationError::InvalidHost(7)))
        );
        assert!(hal.events().is_empty());
        assert_eq!(hal.internal_in_use(), 0);
    }

    #[test]
    fn test_host_already_claimed() {
        let hal = SimHal::esp32();
        let mut first = spi_bus(&hal, SpiBusArgs::new(21));
        let mut second = spi_bus(&hal, SpiBusArgs::new(22));
        first.init(240, 240, 16).unwrap();

        assert_eq!(
            second.init(240, 240, 16),
            Err(BusError::HardwareClaim {
                op: HwOp::SpiBusInitialize,
                code: HwError::INVALID_STATE
            })
        );
    }

    #[test]
    fn test_deinit_releases_everything() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21));
        bus.init(320, 240, 16).unwrap();
        hal.clear_events();

        bus.deinit().unwrap();

        assert_eq!(hal.released_pins(), vec![12, 13, 14]);
        assert_eq!(
            &hal.events()[..2],
            &[
                SimEvent::DelPanelIo,
                SimEvent::SpiBusFree {
                    host: SpiHost::HSPI
                }
            ]
        );
        assert_eq!(hal.internal_in_use(), 0);
        assert_eq!(bus.state(), BusState::Released);
        assert!(bus.get_frame_buffer(FbIndex::First).is_none());

        assert_eq!(
            bus.deinit(),
            Err(BusError::Lifecycle(LifecycleError::Released))
        );
        assert_eq!(
            bus.tx_param(0x11, None),
            Err(BusError::Lifecycle(LifecycleError::Released))
        );
    }

    #[test]
    fn test_tx_only_keeps_miso_unclaimed() {
        let hal = SimHal::esp32();
        let mut bus = spi_bus(&hal, SpiBusArgs::new(21).tx_only());
        bus.init(240, 240, 16).unwrap();
        bus.deinit().unwrap();
        assert_eq!(hal.released_pins(), vec![13, 14]);
    }

    #[test]
    fn test_display() {
        let hal = SimHal::esp32();
        let bus = spi_bus(&hal, SpiBusArgs::new(21));
        assert_eq!(
            bus.to_string(),
            "SPI(host=2, dc=21, sclk=14, mosi=13, miso=12, cs=15, wp=-1, hd=-1, \
             freq=80000000, iomux, mode=0, cmd_bits=8, param_bits=8, dma=true)"
        );
    }
}
