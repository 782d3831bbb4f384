//! Host controller
//!
//! Owns the transaction queue, the device configuration and the byte router
//! for one mouse session. Two paths meet here:
//!
//! ```text
//!  callers ──command()/query()──► queue ──start()──► CommandPort ──► adapter
//!                                   ▲
//!  adapter ──on_wire_completion()───┘
//!  mouse   ──on_byte()──► capture (query in progress) / assembler ──► Routed
//! ```
//!
//! A blocking mutex guards the shared state and is held only for state
//! transitions. Callers wait on per-slot signals. Multi-byte queries take the
//! occupancy token; while it is held unsolicited bytes are captured by the
//! query instead of reaching the report assembler.

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;

use rtmouse_protocol::{
    AdapterError, Command, DecodeError, Op, ReportAssembler, ReportFrame, Variant, WireStep,
    MAX_FRAME_LEN,
};

use crate::config::Configuration;
use crate::error::Error;
use crate::queue::{Ticket, TransactionQueue, POOL_SIZE};
use crate::traits::CommandPort;

/// Where a received byte went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Routed {
    /// Taken by the query in progress
    Captured,
    /// Device acknowledged the command in flight; report its completion
    Ack,
    /// Part of an unfinished frame or acknowledgment, or noise
    Pending,
    Frame(ReportFrame),
    /// Frame discarded, the assembler resynchronizes
    Malformed(DecodeError),
    /// Not listening, or a query owns the channel
    Dropped,
}

#[derive(Debug, Default)]
struct Capture {
    buf: Vec<u8, MAX_FRAME_LEN>,
    expect: usize,
    armed: bool,
}

impl Capture {
    fn arm(&mut self, expect: usize) {
        self.buf.clear();
        self.expect = expect;
        self.armed = expect > 0;
    }

    fn is_full(&self) -> bool {
        self.buf.len() >= self.expect
    }
}

struct Shared<P> {
    port: P,
    queue: TransactionQueue,
    config: Configuration,
    capture: Capture,
    assembler: ReportAssembler,
    listening: bool,
    occupied: bool,
    /// Device acks still expected for the step in flight
    acks_owed: u8,
    /// Tickets whose waiter gave up before completion, one bit per ticket
    orphans: u16,
}

pub struct Host<M: RawMutex, P> {
    shared: Mutex<M, RefCell<Shared<P>>>,
    slots: [Signal<M, Result<(), AdapterError>>; POOL_SIZE],
    free: Channel<M, Ticket, POOL_SIZE>,
    token: AsyncMutex<M, ()>,
    reply: Signal<M, ()>,
    variant: &'static Variant,
}

impl<P: CommandPort> Shared<P> {
    /// Put a step on the wire; a device that acknowledges sends one ack per
    /// byte, so an inline parameter owes a second
    fn start(&mut self, step: WireStep, device_acks: bool) {
        self.acks_owed = match (device_acks, step.param) {
            (false, _) => 0,
            (true, None) => 1,
            (true, Some(_)) => 2,
        };
        self.port.start(step);
    }
}

impl<M: RawMutex, P> Host<M, P> {
    pub fn new(variant: &'static Variant, port: P) -> Self {
        let free = Channel::new();
        for ticket in 0..POOL_SIZE as Ticket {
            let _ = free.try_send(ticket);
        }

        Self {
            shared: Mutex::new(RefCell::new(Shared {
                port,
                queue: TransactionQueue::new(),
                config: Configuration::default(),
                capture: Capture::default(),
                assembler: ReportAssembler::new(variant.layout),
                listening: false,
                occupied: false,
                acks_owed: 0,
                orphans: 0,
            })),
            slots: core::array::from_fn(|_| Signal::new()),
            free,
            token: AsyncMutex::new(()),
            reply: Signal::new(),
            variant,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Shared<P>) -> R) -> R {
        self.shared.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn variant(&self) -> &'static Variant {
        self.variant
    }

    /// Settings confirmed by the device so far
    pub fn config(&self) -> Configuration {
        self.with(|s| s.config)
    }

    pub fn update_config(&self, f: impl FnOnce(&mut Configuration)) {
        self.with(|s| f(&mut s.config))
    }

    /// Deliver unsolicited frames to the caller of [`Host::on_byte`]
    pub fn set_listening(&self, listening: bool) {
        self.with(|s| {
            s.listening = listening;
            s.assembler.reset();
        })
    }

    pub fn is_listening(&self) -> bool {
        self.with(|s| s.listening)
    }

    /// No command queued or in flight
    pub fn is_idle(&self) -> bool {
        self.with(|s| s.queue.is_idle())
    }

    fn release(&self, ticket: Ticket) {
        let _ = self.free.try_send(ticket);
    }
}

impl<M: RawMutex, P: CommandPort> Host<M, P> {
    /// Submit a command and wait for its terminal result
    ///
    /// Waits for a free slot when all are in use.
    pub async fn command(&self, command: Command) -> Result<(), Error> {
        let ticket = self.free.receive().await;
        self.run(ticket, command).await
    }

    /// Like [`Host::command`], but fails with [`Error::QueueExhausted`]
    /// instead of waiting for a slot
    pub async fn try_command(&self, command: Command) -> Result<(), Error> {
        let ticket = self.free.try_receive().map_err(|_| Error::QueueExhausted)?;
        self.run(ticket, command).await
    }

    /// Translate an operation for the active variant and run it
    pub async fn issue(&self, op: Op) -> Result<(), Error> {
        let command = self.variant.command(op).ok_or(Error::Unsupported)?;
        self.command(command).await
    }

    async fn run(&self, ticket: Ticket, command: Command) -> Result<(), Error> {
        let _lease = SlotLease { host: self, ticket };
        let slot = &self.slots[ticket as usize];
        slot.reset();

        let device_acks = self.variant.device_ack.is_some();
        self.with(|s| {
            let step = s
                .queue
                .submit(ticket, command)
                .map_err(|_| Error::QueueExhausted)?;
            if let Some(step) = step {
                s.start(step, device_acks);
            }
            Ok::<_, Error>(())
        })?;

        slot.wait().await.map_err(Error::from)
    }

    /// Completion code for the step in flight
    pub fn on_wire_completion(&self, code: u16) {
        let device_acks = self.variant.device_ack.is_some();
        let finished = self.with(|s| {
            let progress = s.queue.complete(code);
            s.acks_owed = 0;
            if let Some(step) = progress.next {
                s.start(step, device_acks);
            }
            progress.finished.map(|(ticket, result)| {
                let bit = 1u16 << ticket;
                let orphaned = s.orphans & bit != 0;
                s.orphans &= !bit;
                (ticket, result, orphaned)
            })
        });

        match finished {
            Some((ticket, _, true)) => self.release(ticket),
            Some((ticket, result, false)) => self.slots[ticket as usize].signal(result),
            None => {}
        }
    }

    /// The adapter recovered from a soft error
    pub fn resume(&self) {
        let device_acks = self.variant.device_ack.is_some();
        self.with(|s| {
            if let Some(step) = s.queue.resume() {
                s.start(step, device_acks);
            }
        })
    }

    /// Route one byte received from the mouse
    pub fn on_byte(&self, byte: u8) -> Routed {
        let device_ack = self.variant.device_ack;

        let (routed, full) = self.with(|s| {
            let ack_expected = if s.capture.armed {
                s.capture.buf.is_empty()
            } else {
                !s.assembler.in_frame()
            };
            if device_ack == Some(byte) && s.acks_owed > 0 && ack_expected {
                s.acks_owed -= 1;
                let routed = if s.acks_owed == 0 {
                    Routed::Ack
                } else {
                    Routed::Pending
                };
                return (routed, false);
            }

            if s.capture.armed {
                let _ = s.capture.buf.push(byte);
                let full = s.capture.is_full();
                if full {
                    s.capture.armed = false;
                }
                return (Routed::Captured, full);
            }

            if !s.listening || s.occupied {
                s.assembler.reset();
                return (Routed::Dropped, false);
            }

            let routed = match s.assembler.feed(byte) {
                Ok(Some(frame)) => Routed::Frame(frame),
                Ok(None) => Routed::Pending,
                Err(e) => Routed::Malformed(e),
            };
            (routed, false)
        });

        if full {
            self.reply.signal(());
        }
        routed
    }

    /// Run a command with a reply while streaming is paused
    ///
    /// Takes the occupancy token. If the device is enabled it is disabled for
    /// the exchange and re-enabled afterwards. `reply` receives up to
    /// [`MAX_FRAME_LEN`] bytes.
    pub async fn query<D: DelayNs>(
        &self,
        delay: &mut D,
        op: Op,
        reply: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let _token = self.token.lock().await;
        let _occupancy = Occupancy::claim(self);

        let paused = self.with(|s| s.config.enabled);
        if paused {
            self.issue(Op::Disable).await?;
        }

        let result = self.exchange(delay, op, reply, timeout_ms).await;

        if paused {
            let resumed = self.issue(Op::Enable).await;
            result?;
            return resumed;
        }
        result
    }

    /// Run a command with a reply under the occupancy token, without pausing
    pub async fn transact<D: DelayNs>(
        &self,
        delay: &mut D,
        op: Op,
        reply: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let _token = self.token.lock().await;
        let _occupancy = Occupancy::claim(self);
        self.exchange(delay, op, reply, timeout_ms).await
    }

    async fn exchange<D: DelayNs>(
        &self,
        delay: &mut D,
        op: Op,
        reply: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), Error> {
        let expected = reply.len().min(MAX_FRAME_LEN);
        self.reply.reset();
        self.with(|s| s.capture.arm(expected));

        let outcome = self.await_reply(delay, op, expected, timeout_ms).await;

        let got = self.with(|s| {
            s.capture.armed = false;
            let got = s.capture.buf.len();
            reply[..got].copy_from_slice(&s.capture.buf);
            got
        });

        match outcome {
            Err(Error::ReplyTimeout) if got == expected => Ok(()),
            Err(Error::ReplyTimeout) if got > 0 => Err(Error::ShortReply {
                expected: expected as u8,
                got: got as u8,
            }),
            other => other,
        }
    }

    async fn await_reply<D: DelayNs>(
        &self,
        delay: &mut D,
        op: Op,
        expected: usize,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        self.issue(op).await?;
        if expected == 0 {
            return Ok(());
        }
        match select(self.reply.wait(), delay.delay_ms(timeout_ms)).await {
            Either::First(()) => Ok(()),
            Either::Second(()) => Err(Error::ReplyTimeout),
        }
    }
}

/// Returns a slot to the pool, or marks it orphaned while its command is
/// still queued
struct SlotLease<'a, M: RawMutex, P> {
    host: &'a Host<M, P>,
    ticket: Ticket,
}

impl<M: RawMutex, P> Drop for SlotLease<'_, M, P> {
    fn drop(&mut self) {
        let ticket = self.ticket;
        let queued = self.host.with(|s| {
            let queued = s.queue.contains(ticket);
            if queued {
                s.orphans |= 1 << ticket;
            }
            queued
        });
        if !queued {
            self.host.release(ticket);
        }
    }
}

/// Diverts received bytes away from the assembler for its lifetime
struct Occupancy<'a, M: RawMutex, P> {
    host: &'a Host<M, P>,
}

impl<'a, M: RawMutex, P> Occupancy<'a, M, P> {
    fn claim(host: &'a Host<M, P>) -> Self {
        host.with(|s| {
            s.occupied = true;
            s.assembler.reset();
        });
        Self { host }
    }
}

impl<M: RawMutex, P> Drop for Occupancy<'_, M, P> {
    fn drop(&mut self) {
        self.host.with(|s| {
            s.occupied = false;
            s.capture.armed = false;
        });
    }
}
