//! Host simulation of the panelbus HAL
//!
//! Implements every capability trait of `panelbus-hal` in memory so that
//! bus drivers can be exercised on the host. A [`SimHal`] is a cheap,
//! cloneable handle on shared state: hand one clone to a bus and keep
//! another to inspect what the bus did.
//!
//! - Every hardware call is recorded as a [`SimEvent`]
//! - Memory comes from byte budgets for internal RAM and PSRAM
//! - Any call can be made to fail once with [`SimHal::fail_next`]; several
//!   calls can be armed at the same time
//! - DMA completions are raised according to [`CompletionMode`]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use panelbus_hal::{
    Area, Gpio, HwError, I2cBusConfig, I2cPanelIoConfig, I80BusConfig, I80PanelIoConfig,
    Platform, RgbPanelConfig, SocCaps, SpiBusConfig, SpiHost, SpiPanelIoConfig, TransferDoneIsr,
};

mod io;
mod memory;
mod transport;

pub use io::{SimPanelIo, SimRgbPanel};
pub use memory::SimBuffer;
pub use transport::SimI80Bus;

/// Hardware calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    SpiBusInitialize,
    SpiBusFree,
    NewPanelIo,
    DelPanelIo,
    I2cParamConfig,
    I2cDriverInstall,
    I2cDriverDelete,
    NewI80Bus,
    DelI80Bus,
    NewRgbPanel,
    RegisterVsync,
    PanelReset,
    PanelInit,
    DelPanel,
    ReleasePin,
    TxParam,
    RxParam,
    TxColor,
    DrawBitmap,
}

/// Recorded hardware call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    SpiBusInitialize {
        host: SpiHost,
        config: SpiBusConfig,
        dma: bool,
    },
    NewSpiPanelIo {
        host: SpiHost,
        config: SpiPanelIoConfig,
    },
    SpiBusFree {
        host: SpiHost,
    },
    I2cParamConfig {
        port: u8,
        config: I2cBusConfig,
    },
    I2cDriverInstall {
        port: u8,
    },
    NewI2cPanelIo {
        port: u8,
        config: I2cPanelIoConfig,
    },
    I2cDriverDelete {
        port: u8,
    },
    NewI80Bus {
        config: I80BusConfig,
    },
    NewI80PanelIo {
        config: I80PanelIoConfig,
    },
    DelI80Bus,
    DelPanelIo,
    NewRgbPanel {
        config: RgbPanelConfig,
    },
    RgbRegisterVsync,
    RgbPanelReset,
    RgbPanelInit,
    DelRgbPanel,
    PinReleased(Gpio),
    TxParam {
        cmd: i32,
        params: Option<Vec<u8>>,
    },
    RxParam {
        cmd: i32,
        len: usize,
    },
    TxColor {
        cmd: i32,
        data: Vec<u8>,
    },
    DrawBitmap {
        area: Area,
        len: usize,
    },
    PresentFrameBuffer {
        area: Area,
        index: usize,
    },
}

/// When queued DMA transfers report completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// On the next delay, as if the transfer finished while the CPU waited
    #[default]
    OnDelay,
    /// Only when the test calls [`SimHal::complete_transfers`]
    Manual,
    /// Never; the interrupt is lost
    Never,
}

pub(crate) struct SimState {
    pub events: Vec<SimEvent>,
    pub fail: Vec<(SimOp, HwError)>,
    pub completion: CompletionMode,
    pub pending: Vec<&'static dyn TransferDoneIsr>,
    pub vsync_hooks: Vec<&'static dyn TransferDoneIsr>,
    pub spi_hosts: HashSet<u8>,
    pub spi_dma: HashSet<u8>,
    pub i2c_ports: HashSet<u8>,
    pub rx_reply: Vec<u8>,
    pub elapsed_ns: u64,
    pub internal_budget: usize,
    pub spiram_budget: usize,
    pub psram_dma: bool,
    pub internal_used: Rc<Cell<usize>>,
    pub spiram_used: Rc<Cell<usize>>,
}

impl SimState {
    /// Consume an injected failure for `op`
    pub fn check(&mut self, op: SimOp) -> Result<(), HwError> {
        match self.fail.iter().position(|(target, _)| *target == op) {
            Some(at) => Err(self.fail.remove(at).1),
            None => Ok(()),
        }
    }
}

/// Simulated platform
#[derive(Clone)]
pub struct SimHal {
    caps: SocCaps,
    pub(crate) state: Rc<RefCell<SimState>>,
}

/// Internal RAM available by default
pub const DEFAULT_INTERNAL_BYTES: usize = 320 * 1024;

impl SimHal {
    /// Platform with `caps`, 320 KiB of internal RAM and no PSRAM
    pub fn new(caps: SocCaps) -> Self {
        Self {
            caps,
            state: Rc::new(RefCell::new(SimState {
                events: Vec::new(),
                fail: Vec::new(),
                completion: CompletionMode::default(),
                pending: Vec::new(),
                vsync_hooks: Vec::new(),
                spi_hosts: HashSet::new(),
                spi_dma: HashSet::new(),
                i2c_ports: HashSet::new(),
                rx_reply: Vec::new(),
                elapsed_ns: 0,
                internal_budget: DEFAULT_INTERNAL_BYTES,
                spiram_budget: 0,
                psram_dma: caps.rgb,
                internal_used: Rc::new(Cell::new(0)),
                spiram_used: Rc::new(Cell::new(0)),
            })),
        }
    }

    /// Classic ESP32
    pub fn esp32() -> Self {
        Self::new(SocCaps::ESP32)
    }

    /// ESP32-S3 with 8 MiB of PSRAM
    pub fn esp32_s3() -> Self {
        Self::new(SocCaps::ESP32_S3).with_psram(8 * 1024 * 1024)
    }

    #[must_use]
    pub fn with_internal(self, bytes: usize) -> Self {
        self.state.borrow_mut().internal_budget = bytes;
        self
    }

    #[must_use]
    pub fn with_psram(self, bytes: usize) -> Self {
        self.state.borrow_mut().spiram_budget = bytes;
        self
    }

    /// Make the next call to `op` fail with `code`
    ///
    /// Replaces a failure already armed for the same `op`.
    pub fn fail_next(&self, op: SimOp, code: HwError) {
        let mut state = self.state.borrow_mut();
        state.fail.retain(|(target, _)| *target != op);
        state.fail.push((op, code));
    }

    pub fn set_completion(&self, mode: CompletionMode) {
        self.state.borrow_mut().completion = mode;
    }

    /// Bytes `rx_param` reads back
    pub fn set_rx_reply(&self, reply: &[u8]) {
        self.state.borrow_mut().rx_reply = reply.to_vec();
    }

    /// Everything recorded so far
    pub fn events(&self) -> Vec<SimEvent> {
        self.state.borrow().events.clone()
    }

    /// Drop the recorded events
    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Pins returned to the GPIO matrix, in order
    pub fn released_pins(&self) -> Vec<Gpio> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                SimEvent::PinReleased(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Bytes currently allocated from internal RAM
    pub fn internal_in_use(&self) -> usize {
        self.state.borrow().internal_used.get()
    }

    /// Bytes currently allocated from PSRAM
    pub fn psram_in_use(&self) -> usize {
        self.state.borrow().spiram_used.get()
    }

    /// Total time spent in delays
    pub fn elapsed_ns(&self) -> u64 {
        self.state.borrow().elapsed_ns
    }

    /// Transfers queued but not yet reported complete
    pub fn pending_transfers(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Raise the completion interrupt for every queued transfer
    pub fn complete_transfers(&self) -> usize {
        let hooks = std::mem::take(&mut self.state.borrow_mut().pending);
        for hook in &hooks {
            hook.on_transfer_done();
        }
        hooks.len()
    }

    /// Raise a vertical sync on every RGB panel
    pub fn vsync(&self) {
        let hooks = self.state.borrow().vsync_hooks.clone();
        for hook in hooks {
            hook.on_transfer_done();
        }
    }

    pub(crate) fn record(&self, event: SimEvent) {
        self.state.borrow_mut().events.push(event);
    }

    pub(crate) fn check(&self, op: SimOp) -> Result<(), HwError> {
        self.state.borrow_mut().check(op)
    }
}

impl DelayNs for SimHal {
    fn delay_ns(&mut self, ns: u32) {
        let mode = {
            let mut state = self.state.borrow_mut();
            state.elapsed_ns += u64::from(ns);
            state.completion
        };
        if mode == CompletionMode::OnDelay {
            self.complete_transfers();
        }
    }
}

impl Platform for SimHal {
    fn caps(&self) -> SocCaps {
        self.caps
    }
}
