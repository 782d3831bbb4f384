//! Report discipline
//!
//! Sits between decoded movement frames and the consumer. Runs the button
//! disambiguator and keeps movement from withheld reports so it is delivered
//! with the next report that goes out.

use heapless::Vec;

use rtmouse_hal::TickTimer;
use rtmouse_protocol::{Buttons, Movement};

use crate::buttons::{ButtonDisambiguator, DisambiguatorConfig};

/// Reports released by one input, oldest first
pub type Delivery = Vec<Movement, 2>;

pub struct Discipline<T> {
    buttons: ButtonDisambiguator,
    timer: T,
    dx: i16,
    dy: i16,
    withholding: bool,
}

impl<T: TickTimer> Discipline<T> {
    pub fn new(config: DisambiguatorConfig, timer: T) -> Self {
        Self {
            buttons: ButtonDisambiguator::new(config),
            timer,
            dx: 0,
            dy: 0,
            withholding: false,
        }
    }

    /// Whether a report is being held back
    pub fn is_withholding(&self) -> bool {
        self.withholding
    }

    pub fn timer(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Drop held movement and any settling press
    pub fn reset(&mut self) {
        self.buttons.reset(&mut self.timer);
        self.dx = 0;
        self.dy = 0;
        self.withholding = false;
    }

    /// Feed a decoded movement frame
    pub fn on_report(&mut self, report: Movement) -> Delivery {
        self.dx = self.dx.saturating_add(report.dx);
        self.dy = self.dy.saturating_add(report.dy);

        let decision = self.buttons.on_report(report.buttons, &mut self.timer);
        let mut out = Delivery::new();

        if let Some(press) = decision.synthetic {
            let _ = out.push(self.take(press));
        }
        if decision.emit {
            let _ = out.push(self.take(decision.buttons));
        } else {
            self.withholding = true;
        }
        out
    }

    /// The disambiguator timer fired
    pub fn on_timer(&mut self) -> Option<Movement> {
        let release = self.buttons.on_timer(&mut self.timer);
        if release && self.withholding {
            Some(self.take(self.buttons.last()))
        } else {
            None
        }
    }

    fn take(&mut self, buttons: Buttons) -> Movement {
        let m = Movement::new(buttons, self.dx, self.dy);
        self.dx = 0;
        self.dy = 0;
        self.withholding = false;
        m
    }
}
