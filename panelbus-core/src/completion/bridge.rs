//! Per-bus completion state machine

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use panelbus_hal::TransferDoneIsr;
use portable_atomic::{AtomicU8, Ordering};

use super::events::{BusId, CompletionCallback, CompletionEvent, CompletionSink};
use super::scheduler::Scheduler;
use crate::error::{BusError, HwOp};

/// Step between completion flag checks while blocking
pub const POLL_INTERVAL_US: u32 = 10;

/// Where the current transfer stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferState {
    /// No transfer awaiting completion
    Idle = 0,
    /// Transfer queued, interrupt expected
    Armed = 1,
    /// Interrupt arrived
    Signaled = 2,
}

impl TransferState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => TransferState::Armed,
            2 => TransferState::Signaled,
            _ => TransferState::Idle,
        }
    }
}

/// Completion bridge for one bus
///
/// Lives in a `static` (or is leaked) because the hardware layer keeps a
/// reference to it for the lifetime of the panel IO.
pub struct CompletionBridge {
    bus: BusId,
    scheduler: &'static Scheduler,
    sink: Mutex<CriticalSectionRawMutex, Cell<CompletionSink>>,
    state: AtomicU8,
}

impl CompletionBridge {
    pub const fn new(bus: BusId, scheduler: &'static Scheduler) -> Self {
        Self {
            bus,
            scheduler,
            sink: Mutex::new(Cell::new(CompletionSink::None)),
            state: AtomicU8::new(TransferState::Idle as u8),
        }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn scheduler(&self) -> &'static Scheduler {
        self.scheduler
    }

    /// Deliver completions to `callback`, replacing any earlier registration
    pub fn register(&self, callback: CompletionCallback, user_ctx: usize) {
        self.sink.lock(|sink| {
            sink.set(CompletionSink::Callback { callback, user_ctx });
        });
    }

    /// Go back to blocking completion
    pub fn clear(&self) {
        self.sink.lock(|sink| sink.set(CompletionSink::None));
    }

    pub fn sink(&self) -> CompletionSink {
        self.sink.lock(Cell::get)
    }

    pub fn state(&self) -> TransferState {
        TransferState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Expect a completion interrupt
    ///
    /// Must be called before the transfer is handed to hardware, which may
    /// complete before the queueing call returns.
    pub fn arm(&self) {
        self.state
            .store(TransferState::Armed as u8, Ordering::Release);
    }

    /// Abandon the armed transfer (it was never queued)
    pub fn disarm(&self) {
        self.state.store(TransferState::Idle as u8, Ordering::Release);
    }

    /// Report a transfer that already finished synchronously
    ///
    /// Schedules the registered callback, if any. Returns whether one was
    /// scheduled.
    pub fn complete_inline(&self) -> bool {
        match self.sink() {
            CompletionSink::Callback { callback, user_ctx } => self.scheduler.schedule(
                callback,
                CompletionEvent {
                    bus: self.bus,
                    user_ctx,
                },
            ),
            CompletionSink::None => false,
        }
    }

    /// Block until the armed transfer signals, polling through `delay`
    ///
    /// Fails with a transport timeout after `timeout_us`; the bridge is idle
    /// afterwards either way, so a late interrupt is ignored.
    pub fn wait_done<D: DelayNs>(&self, delay: &mut D, timeout_us: u32) -> Result<(), BusError> {
        let mut waited = 0u32;
        loop {
            if self
                .state
                .compare_exchange(
                    TransferState::Signaled as u8,
                    TransferState::Idle as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return Ok(());
            }

            if waited >= timeout_us {
                self.disarm();
                bus_error!("bus {=u8}: transfer not done after {=u32} us", self.bus.0, waited);
                return Err(BusError::timeout(HwOp::TxColor));
            }

            delay.delay_us(POLL_INTERVAL_US);
            waited = waited.saturating_add(POLL_INTERVAL_US);
        }
    }
}

impl TransferDoneIsr for CompletionBridge {
    fn on_transfer_done(&self) -> bool {
        if self
            .state
            .compare_exchange(
                TransferState::Armed as u8,
                TransferState::Signaled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        if let CompletionSink::Callback { callback, user_ctx } = self.sink() {
            self.scheduler.schedule(
                callback,
                CompletionEvent {
                    bus: self.bus,
                    user_ctx,
                },
            );
        }
        false
    }
}
