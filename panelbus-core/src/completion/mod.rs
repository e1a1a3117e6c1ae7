//! Transfer completion
//!
//! Bridges the hardware "transfer done" interrupt into something the
//! application can act on: either a callback run later from the
//! application's own context, or the release of a blocking `tx_color`.
//!
//! ```text
//!          arm()                on_transfer_done()           wait_done() / arm()
//!   Idle ─────────► Armed ─────────────────────────► Signaled ─────────────────► Idle
//!                     │   callback registered: post (callback, event)
//!                     │   to the Scheduler; otherwise raise the flag
//! ```
//!
//! Interrupts that arrive while the bridge is not armed are ignored, so a
//! callback runs at most once per transfer.

pub mod bridge;
pub mod events;
pub mod scheduler;

pub use bridge::{CompletionBridge, TransferState, POLL_INTERVAL_US};
pub use events::{BusId, CompletionCallback, CompletionEvent, CompletionSink};
pub use scheduler::{Scheduler, SCHEDULER_DEPTH};
