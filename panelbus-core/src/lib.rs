//! Transport-agnostic logic for LCD buses
//!
//! This crate contains everything about driving a display bus that does
//! not depend on a particular transport implementation:
//!
//! - Bus facade trait shared by SPI, I2C, I80 and RGB
//! - Transfer buffer allocation and double-buffering policy
//! - Interrupt-to-caller completion bridge and deferred callback queue
//! - Per-transport argument types, defaults and validation
//!   (including SPI pin routing)
//! - Error taxonomy
//!
//! # Architecture
//!
//! ```text
//!   caller ──tx_color──► bus ──arm──► CompletionBridge
//!                         │                 ▲
//!                         ▼                 │ on_transfer_done (ISR)
//!                   panelbus-hal ───────────┘
//!                                           │
//!                                           ▼
//!                  Scheduler ◄── (callback, event) ── or ── done flag
//!                      │                                      │
//!                      ▼                                      ▼
//!           callback runs in caller context        blocking tx_color returns
//! ```

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod devlog;

#[doc(hidden)]
#[cfg(feature = "defmt")]
pub use defmt as __log;

pub mod buffer;
pub mod completion;
pub mod config;
pub mod error;
pub mod registry;
pub mod traits;

pub use buffer::{BufferOptions, TransferBuffers};
pub use completion::{
    BusId, CompletionBridge, CompletionCallback, CompletionEvent, CompletionSink, Scheduler,
};
pub use error::{BusError, HwOp, LifecycleError, TransportCode, ValidationError};
pub use registry::{FbIndex, FrameBufferRegistry};
pub use traits::{BusState, LcdBus, Pixels, ReadParams};

pub use panelbus_hal::Area;
