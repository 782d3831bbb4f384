//! Deadline-based tick timer for the button disambiguator
//!
//! Arming only records a deadline; the mouse task waits on it alongside its
//! other inputs and calls back into the disambiguator when it passes.

use embassy_time::{Duration, Instant, Timer};

use rtmouse_hal::TickTimer;

/// Length of one disambiguator tick
pub const TICK_MS: u64 = 10;

#[derive(Default)]
pub struct DeadlineTimer {
    deadline: Option<Instant>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Forget an expired deadline before handling it
    pub fn clear(&mut self) {
        self.deadline = None;
    }
}

impl TickTimer for DeadlineTimer {
    fn arm(&mut self, ticks: u32) {
        self.deadline = Some(Instant::now() + Duration::from_millis(ticks as u64 * TICK_MS));
    }

    fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Resolve at `deadline`, or never when there is none
pub async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => Timer::at(at).await,
        None => core::future::pending().await,
    }
}
