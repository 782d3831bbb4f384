//! One-shot tick timer
//!
//! Used by the button disambiguator to schedule a delayed re-check. The
//! implementation calls back into the owner when the timer expires; how that
//! happens (interrupt, task, test harness) is up to the platform.

/// A single re-armable one-shot timer measured in platform ticks
///
/// Both operations are idempotent: arming an armed timer restarts it, and
/// cancelling an idle timer does nothing.
pub trait TickTimer {
    /// Start (or restart) the timer to fire after `ticks`
    fn arm(&mut self, ticks: u32);

    /// Stop the timer if it is running
    fn cancel(&mut self);
}

impl<T: TickTimer + ?Sized> TickTimer for &mut T {
    fn arm(&mut self, ticks: u32) {
        (**self).arm(ticks)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}
