//! Completion events and sinks

/// Identifies a bus in completion events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusId(pub u8);

/// Delivered to a completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompletionEvent {
    /// Bus whose transfer finished
    pub bus: BusId,
    /// Opaque value given at registration (e.g. a display driver handle)
    pub user_ctx: usize,
}

/// Application completion callback
///
/// Runs from the application context that drains the [`Scheduler`],
/// never from the interrupt.
///
/// [`Scheduler`]: super::Scheduler
pub type CompletionCallback = fn(CompletionEvent);

/// Where a bus delivers completions
#[derive(Debug, Clone, Copy, Default)]
pub enum CompletionSink {
    /// Nobody listens; DMA transfers block until done
    #[default]
    None,
    /// Schedule `callback` with `user_ctx`
    Callback {
        callback: CompletionCallback,
        user_ctx: usize,
    },
}

impl CompletionSink {
    pub const fn is_registered(&self) -> bool {
        matches!(self, CompletionSink::Callback { .. })
    }
}
