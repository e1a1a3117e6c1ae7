//! Panel IO
//!
//! A panel IO handle is what a vendor bus driver hands back once a panel
//! has been attached to an installed bus. It knows how to frame commands
//! and parameters for its transport (DC line, I2C control byte, ...).

use crate::HwError;

/// Command, parameter and pixel transfers to an attached panel
pub trait PanelIo {
    /// Send `cmd` followed by optional parameter bytes
    fn tx_param(&mut self, cmd: i32, params: Option<&[u8]>) -> Result<(), HwError>;

    /// Send `cmd` and read the panel's reply into `buf`
    fn rx_param(&mut self, cmd: i32, buf: &mut [u8]) -> Result<(), HwError>;

    /// Queue a pixel transfer
    ///
    /// When the transport uses DMA the call may return before the data has
    /// left the buffer; the [`TransferDoneIsr`] registered with the panel IO
    /// fires once it has.
    fn tx_color(&mut self, cmd: i32, pixels: &[u8]) -> Result<(), HwError>;
}

/// Completion hook invoked from interrupt context
///
/// Implementations must not block or allocate.
pub trait TransferDoneIsr {
    /// A queued transfer (or a vsync, on RGB panels) has finished
    ///
    /// Returns `true` if a higher-priority task was woken and a context
    /// switch should be requested on interrupt exit.
    fn on_transfer_done(&self) -> bool;
}
