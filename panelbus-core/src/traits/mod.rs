//! Bus abstraction traits
//!
//! These traits define the interface between display drivers and the
//! transport that carries their traffic.

pub mod bus;

pub use bus::{BusState, LcdBus, Pixels, ReadParams};
