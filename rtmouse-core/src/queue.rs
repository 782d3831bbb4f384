//! Transaction queue
//!
//! FIFO of submitted commands. Only the head has a wire exchange outstanding.
//! The queue is pure bookkeeping: it tells its owner which step to hand to the
//! adapter next and which command finished, and never fails on its own.
//!
//! Completion handling for the head:
//!
//! | code        | first step of split       | final step             |
//! |-------------|---------------------------|------------------------|
//! | success     | send the parameter step   | finish `Ok`            |
//! | busy reject | resend                    | resend                 |
//! | soft error  | skip to parameter, park   | park                   |
//! | terminal    | finish `Err`, no step 2   | finish `Err`           |
//!
//! A parked queue sends nothing until [`TransactionQueue::resume`].

use heapless::Deque;

use rtmouse_protocol::{AdapterError, Command, Completion, WireStep};

/// Size of the command slot pool
pub const POOL_SIZE: usize = 10;

/// Index of a command slot, `0..POOL_SIZE`
pub type Ticket = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    First,
    Final,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    ticket: Ticket,
    command: Command,
    stage: Stage,
}

impl Entry {
    fn new(ticket: Ticket, command: Command) -> Self {
        let stage = if command.is_split() {
            Stage::First
        } else {
            Stage::Final
        };
        Self {
            ticket,
            command,
            stage,
        }
    }

    fn current_step(&self) -> WireStep {
        match self.stage {
            Stage::First => self.command.first_step().unwrap_or(self.command.final_step()),
            Stage::Final => self.command.final_step(),
        }
    }
}

/// Queue has no room for another command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// Outcome of a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Progress {
    /// Command that reached its terminal result
    pub finished: Option<(Ticket, Result<(), AdapterError>)>,
    /// Step to hand to the adapter now
    pub next: Option<WireStep>,
}

#[derive(Debug, Default)]
pub struct TransactionQueue {
    entries: Deque<Entry, POOL_SIZE>,
    in_flight: bool,
    parked: bool,
}

impl TransactionQueue {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            in_flight: false,
            parked: false,
        }
    }

    /// Append a command
    ///
    /// Returns the step to start if the queue was idle.
    pub fn submit(&mut self, ticket: Ticket, command: Command) -> Result<Option<WireStep>, QueueFull> {
        self.entries
            .push_back(Entry::new(ticket, command))
            .map_err(|_| QueueFull)?;
        Ok(self.start_head())
    }

    fn start_head(&mut self) -> Option<WireStep> {
        if self.in_flight || self.parked {
            return None;
        }
        let step = self.entries.front()?.current_step();
        self.in_flight = true;
        Some(step)
    }

    /// Apply the adapter's completion code for the outstanding step
    ///
    /// A completion with nothing in flight is ignored.
    pub fn complete(&mut self, code: u16) -> Progress {
        if !self.in_flight {
            return Progress::default();
        }
        self.in_flight = false;

        let Some(head) = self.entries.front_mut() else {
            return Progress::default();
        };

        match Completion::classify(code) {
            Completion::Busy => {
                self.in_flight = true;
                Progress {
                    finished: None,
                    next: Some(head.current_step()),
                }
            }
            Completion::SoftError => {
                // Step 1 is treated as satisfied without re-verifying it
                head.stage = Stage::Final;
                self.parked = true;
                Progress::default()
            }
            Completion::Done if head.stage == Stage::First => {
                head.stage = Stage::Final;
                self.in_flight = true;
                Progress {
                    finished: None,
                    next: Some(head.current_step()),
                }
            }
            Completion::Done => self.finish(Ok(())),
            Completion::Failed(e) => self.finish(Err(e)),
        }
    }

    fn finish(&mut self, result: Result<(), AdapterError>) -> Progress {
        let finished = self.entries.pop_front().map(|e| (e.ticket, result));
        Progress {
            finished,
            next: self.start_head(),
        }
    }

    /// The adapter recovered from a soft error; restart the head
    pub fn resume(&mut self) -> Option<WireStep> {
        if !self.parked {
            return None;
        }
        self.parked = false;
        self.start_head()
    }

    pub fn is_idle(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a command with this ticket is still queued
    pub fn contains(&self, ticket: Ticket) -> bool {
        self.entries.iter().any(|e| e.ticket == ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rtmouse_protocol::result::{MS_BUSY_REJ, RESULT_OK, SOFT_ERROR};

    const RATE_40: Command = Command::Split {
        selector: 0x03,
        opcode: 0x8a,
        param: 40,
    };
    const ENABLE: Command = Command::Single(WireStep::new(0x03, 0x08));
    const RESET: Command = Command::Single(WireStep::new(0x04, 0x01));

    #[test]
    fn test_first_submit_starts_transmission() {
        let mut q = TransactionQueue::new();
        assert_eq!(q.submit(0, ENABLE), Ok(Some(WireStep::new(0x03, 0x08))));
        // Second command waits behind the head
        assert_eq!(q.submit(1, RESET), Ok(None));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_split_command_sends_both_steps() {
        let mut q = TransactionQueue::new();
        assert_eq!(q.submit(3, RATE_40), Ok(Some(WireStep::new(0x03, 0x8a))));

        let p = q.complete(RESULT_OK);
        assert_eq!(p.finished, None);
        assert_eq!(p.next, Some(WireStep::new(0x03, 40)));

        let p = q.complete(RESULT_OK);
        assert_eq!(p.finished, Some((3, Ok(()))));
        assert_eq!(p.next, None);
        assert!(q.is_idle());
    }

    #[test]
    fn test_busy_reject_resends_same_step() {
        let mut q = TransactionQueue::new();
        q.submit(0, RATE_40).unwrap();
        q.complete(RESULT_OK);

        let p = q.complete(MS_BUSY_REJ);
        assert_eq!(p.finished, None);
        assert_eq!(p.next, Some(WireStep::new(0x03, 40)));
    }

    #[test]
    fn test_failed_first_step_skips_second() {
        let mut q = TransactionQueue::new();
        q.submit(0, RATE_40).unwrap();
        q.submit(1, ENABLE).unwrap();

        let p = q.complete(0xe2);
        assert_eq!(p.finished, Some((0, Err(AdapterError::AckTimeout))));
        // Next command starts instead of the parameter step
        assert_eq!(p.next, Some(WireStep::new(0x03, 0x08)));
    }

    #[test]
    fn test_soft_error_forces_second_step_after_resume() {
        let mut q = TransactionQueue::new();
        q.submit(0, RATE_40).unwrap();

        let p = q.complete(SOFT_ERROR);
        assert_eq!(p, Progress::default());
        assert!(q.is_parked());

        // Parked: new submissions do not start
        assert_eq!(q.submit(1, ENABLE), Ok(None));

        assert_eq!(q.resume(), Some(WireStep::new(0x03, 40)));
        let p = q.complete(RESULT_OK);
        assert_eq!(p.finished, Some((0, Ok(()))));
        assert_eq!(p.next, Some(WireStep::new(0x03, 0x08)));
    }

    #[test]
    fn test_soft_error_on_final_step_retries_it() {
        let mut q = TransactionQueue::new();
        q.submit(0, ENABLE).unwrap();
        q.complete(SOFT_ERROR);
        assert_eq!(q.resume(), Some(WireStep::new(0x03, 0x08)));
        assert_eq!(q.resume(), None);
    }

    #[test]
    fn test_spurious_completion_ignored() {
        let mut q = TransactionQueue::new();
        assert_eq!(q.complete(RESULT_OK), Progress::default());
        q.submit(0, ENABLE).unwrap();
        q.complete(RESULT_OK);
        assert_eq!(q.complete(RESULT_OK), Progress::default());
    }

    #[test]
    fn test_full_queue() {
        let mut q = TransactionQueue::new();
        for t in 0..POOL_SIZE as u8 {
            q.submit(t, ENABLE).unwrap();
        }
        assert_eq!(q.submit(99, ENABLE), Err(QueueFull));
        assert!(q.contains(9));
        assert!(!q.contains(99));
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![Just(ENABLE), Just(RESET), Just(RATE_40)]
    }

    proptest! {
        #[test]
        fn prop_completions_in_submission_order(
            commands in prop::collection::vec(arb_command(), 1..POOL_SIZE),
            busy in prop::collection::vec(0usize..4, POOL_SIZE * 2),
        ) {
            let mut q = TransactionQueue::new();
            let mut outstanding = 0usize;
            for (t, cmd) in commands.iter().enumerate() {
                if q.submit(t as u8, *cmd).unwrap().is_some() {
                    outstanding += 1;
                }
            }
            prop_assert_eq!(outstanding, 1);

            let mut finished = std::vec::Vec::new();
            let mut rejects = busy.into_iter();
            while !q.is_idle() {
                for _ in 0..rejects.next().unwrap_or(0) {
                    let p = q.complete(MS_BUSY_REJ);
                    prop_assert!(p.finished.is_none());
                    prop_assert!(p.next.is_some());
                }
                let p = q.complete(RESULT_OK);
                if let Some((ticket, result)) = p.finished {
                    prop_assert_eq!(result, Ok(()));
                    finished.push(ticket);
                }
            }

            let expected: std::vec::Vec<u8> = (0..commands.len() as u8).collect();
            prop_assert_eq!(finished, expected);
        }
    }
}
