//! Three-button emulation from two physical buttons
//!
//! Pressing left and right together reads as middle. A single press from
//! idle is withheld for a short settle window so that a slightly late second
//! press can still turn it into a middle click:
//!
//! 1. Both buttons down counts as middle.
//! 2. Not settling, buttons changed:
//!    - coming from middle with anything still held stays middle until both
//!      buttons are released;
//!    - coming from nothing to a single button starts settling.
//! 3. Settling, buttons unchanged: one more check; after the check limit the
//!    single press is final.
//! 4. Settling, buttons changed: settling ends. A release straight back to
//!    nothing first replays the withheld press so the click is not lost.

use rtmouse_hal::TickTimer;
use rtmouse_protocol::Buttons;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisambiguatorConfig {
    /// Delay before re-checking a fresh single press, in timer ticks
    pub settle_ticks: u32,
    /// Delay between timer-driven re-checks, in timer ticks
    pub poll_ticks: u32,
    /// Checks after which a single press is final
    pub max_checks: u8,
}

impl Default for DisambiguatorConfig {
    fn default() -> Self {
        Self {
            settle_ticks: 4,
            poll_ticks: 2,
            max_checks: 2,
        }
    }
}

/// Result of feeding one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    /// Button state to report, possibly rewritten
    pub buttons: Buttons,
    /// Press to report before `buttons`
    pub synthetic: Option<Buttons>,
    /// Report now; false while a single press is settling
    pub emit: bool,
}

#[derive(Debug, Clone)]
pub struct ButtonDisambiguator {
    config: DisambiguatorConfig,
    last: Buttons,
    /// 0 when not settling, otherwise the number of the current check
    checks: u8,
}

impl ButtonDisambiguator {
    pub fn new(config: DisambiguatorConfig) -> Self {
        Self {
            config,
            last: Buttons::NONE,
            checks: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.checks != 0
    }

    pub fn last(&self) -> Buttons {
        self.last
    }

    /// Forget any settling press
    pub fn reset<T: TickTimer>(&mut self, timer: &mut T) {
        timer.cancel();
        self.last = Buttons::NONE;
        self.checks = 0;
    }

    /// Feed the button state of a new report
    pub fn on_report<T: TickTimer>(&mut self, buttons: Buttons, timer: &mut T) -> Decision {
        let mut new = if buttons == Buttons::BOTH {
            Buttons::MIDDLE
        } else {
            buttons
        };
        let mut synthetic = None;

        if !self.is_pending() {
            if self.last != new {
                if self.last == Buttons::MIDDLE && new != Buttons::NONE {
                    new = Buttons::MIDDLE;
                } else if self.last == Buttons::NONE && new != Buttons::MIDDLE {
                    timer.arm(self.config.settle_ticks);
                    self.checks = 1;
                }
            }
        } else if self.last == new {
            timer.cancel();
            self.checks += 1;
            if self.checks > self.config.max_checks {
                self.checks = 0;
            } else {
                timer.arm(self.config.settle_ticks);
            }
        } else {
            timer.cancel();
            self.checks = 0;
            if new == Buttons::NONE {
                synthetic = Some(self.last);
            }
        }

        self.last = new;
        Decision {
            buttons: new,
            synthetic,
            emit: !self.is_pending(),
        }
    }

    /// The re-check timer fired with no report in between
    ///
    /// Returns true when the withheld state should be reported now.
    pub fn on_timer<T: TickTimer>(&mut self, timer: &mut T) -> bool {
        if self.is_pending() {
            self.checks += 1;
            if self.checks > self.config.max_checks {
                self.checks = 0;
            } else {
                timer.arm(self.config.poll_ticks);
            }
        }
        !self.is_pending()
    }
}

impl Default for ButtonDisambiguator {
    fn default() -> Self {
        Self::new(DisambiguatorConfig::default())
    }
}
