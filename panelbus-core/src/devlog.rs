//! Logging macros
//!
//! Forward to `defmt` when the `defmt` feature is enabled and expand to
//! nothing otherwise, so log sites cost nothing on builds without a logger.

#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! bus_error {
    () => {};
    ($($arg:tt)*) => {
        $crate::__log::error!($($arg)*);
    }
}

#[macro_export]
#[cfg(not(feature = "defmt"))]
macro_rules! bus_error {
    () => {};
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! bus_warn {
    () => {};
    ($($arg:tt)*) => {
        $crate::__log::warn!($($arg)*);
    }
}

#[macro_export]
#[cfg(not(feature = "defmt"))]
macro_rules! bus_warn {
    () => {};
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! bus_info {
    () => {};
    ($($arg:tt)*) => {
        $crate::__log::info!($($arg)*);
    }
}

#[macro_export]
#[cfg(not(feature = "defmt"))]
macro_rules! bus_info {
    () => {};
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! bus_debug {
    () => {};
    ($($arg:tt)*) => {
        $crate::__log::debug!($($arg)*);
    }
}

#[macro_export]
#[cfg(not(feature = "defmt"))]
macro_rules! bus_debug {
    () => {};
    ($($arg:tt)*) => {};
}

#[macro_export]
#[cfg(feature = "defmt")]
macro_rules! bus_trace {
    () => {};
    ($($arg:tt)*) => {
        $crate::__log::trace!($($arg)*);
    }
}

#[macro_export]
#[cfg(not(feature = "defmt"))]
macro_rules! bus_trace {
    () => {};
    ($($arg:tt)*) => {};
}
