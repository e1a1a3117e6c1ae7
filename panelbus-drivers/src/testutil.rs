extern crate std;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::boxed::Box;

use panelbus_core::{BusId, CompletionBridge, Scheduler};

/// Bridge with its own scheduler, leaked for the `'static` the HAL wants
pub fn leak_bridge(id: u8) -> &'static CompletionBridge {
    let scheduler: &'static Scheduler = Box::leak(Box::new(Scheduler::new()));
    Box::leak(Box::new(CompletionBridge::new(BusId(id), scheduler)))
}

/// Hit counter for `fn` callbacks, which cannot capture
pub struct Counter(AtomicUsize);

pub const fn counter() -> Counter {
    Counter(AtomicUsize::new(0))
}

impl Counter {
    pub fn fetch_add(&self, n: usize) -> usize {
        self.0.fetch_add(n, Ordering::SeqCst)
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
