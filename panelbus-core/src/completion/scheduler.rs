//! Deferred callback queue
//!
//! Interrupt handlers may not run application code. They post the
//! callback here instead and the application drains the queue, either by
//! polling [`Scheduler::run_pending`] from its main loop or by awaiting
//! [`Scheduler::run`] on an executor (posting wakes the awaiting task).

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicU32, Ordering};

use super::events::{CompletionCallback, CompletionEvent};

/// Callbacks that may be waiting at once
pub const SCHEDULER_DEPTH: usize = 8;

#[derive(Clone, Copy)]
struct Deferred {
    callback: CompletionCallback,
    event: CompletionEvent,
}

impl Deferred {
    fn invoke(self) {
        (self.callback)(self.event)
    }
}

/// Queue of callbacks posted from interrupt context
pub struct Scheduler {
    queue: Channel<CriticalSectionRawMutex, Deferred, SCHEDULER_DEPTH>,
    dropped: AtomicU32,
    /// Drops not yet reported by a drain
    unreported: AtomicU32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            dropped: AtomicU32::new(0),
            unreported: AtomicU32::new(0),
        }
    }

    /// Post `callback` for later execution; safe from interrupt context
    ///
    /// Returns `false` and counts the loss if the queue is full.
    pub fn schedule(&self, callback: CompletionCallback, event: CompletionEvent) -> bool {
        match self.queue.try_send(Deferred { callback, event }) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                self.unreported.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Run every queued callback, returning how many ran
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.queue.try_receive() {
            job.invoke();
            ran += 1;
        }
        let dropped = self.unreported.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            bus_warn!("{=u32} completion callback(s) dropped", dropped);
        }
        ran
    }

    /// Wait for the next callback and run it
    pub async fn run_next(&self) {
        let job = self.queue.receive().await;
        job.invoke();
    }

    /// Run callbacks forever
    pub async fn run(&self) -> ! {
        loop {
            self.run_next().await;
        }
    }

    /// Callbacks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Callbacks lost because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
