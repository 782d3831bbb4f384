//! Adapter command port

use rtmouse_protocol::WireStep;

/// Hands wire steps to the adapter
///
/// `start` only begins the exchange. The adapter's completion code comes back
/// later through [`crate::host::Host::on_wire_completion`], typically from an
/// interrupt or receive task. Implementations must not report the completion
/// from inside `start`, since `start` runs with the host state locked.
pub trait CommandPort {
    fn start(&mut self, step: WireStep);
}

impl<T: CommandPort + ?Sized> CommandPort for &mut T {
    fn start(&mut self, step: WireStep) {
        (**self).start(step)
    }
}
