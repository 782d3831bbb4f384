//! Pointer report source for the emulator

use rtmouse_protocol::PointerReport;

/// Supplier of generic pointer reports (buttons and relative deltas)
///
/// On hardware this is the USB-host bridge; in tests, a scripted sequence.
pub trait PointerSource {
    /// Wait for the next report
    fn next_report(&mut self) -> impl core::future::Future<Output = PointerReport>;
}
