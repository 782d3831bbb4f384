//! Reset and configuration handshake
//!
//! [`Negotiator`] decides, [`negotiate`] carries its actions out on a
//! [`Host`] and feeds the outcomes back as events.

pub mod events;
pub mod machine;

pub use events::{Action, Event, Failure};
pub use machine::{Negotiator, State, MAX_RESET_ATTEMPTS};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use rtmouse_protocol::{
    MouseKind, Op, ReportMode, Resolution, SampleRate, Scaling, Variant, MAX_FRAME_LEN,
};

use crate::config::Configuration;
use crate::error::Error;
use crate::host::Host;
use crate::traits::CommandPort;

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Exhausted => Error::ProtocolFailure,
            Failure::ConfigMismatch(byte) => Error::ConfigMismatch(byte),
            Failure::Command(e) => Error::Command(e),
            Failure::NoReply => Error::ReplyTimeout,
        }
    }
}

/// Bring the mouse to the ready state
///
/// Returns the identified mouse model. Listening and the device
/// configuration are left to the caller.
pub async fn negotiate<M, P, D>(
    host: &Host<M, P>,
    delay: &mut D,
    timeout_ms: u32,
) -> Result<MouseKind, Error>
where
    M: RawMutex,
    P: CommandPort,
    D: DelayNs,
{
    let variant = host.variant();
    let mut machine = Negotiator::new(variant);
    let mut action = machine.step(Event::Begin);

    loop {
        action = match action {
            Action::Issue(op) => match host.issue(op).await {
                Ok(()) => machine.step(Event::Accepted),
                Err(Error::Command(e)) => machine.step(Event::Rejected(e)),
                Err(e) => return Err(e),
            },
            Action::Query { op, reply_len } => {
                let mut buf = [0u8; MAX_FRAME_LEN];
                let reply = &mut buf[..reply_len.min(MAX_FRAME_LEN)];
                match host.transact(delay, op, reply, timeout_ms).await {
                    Ok(()) => {
                        machine.step(Event::Accepted);
                        machine.step(reply_event(variant, op, reply))
                    }
                    Err(Error::Command(e)) => machine.step(Event::Rejected(e)),
                    Err(Error::ReplyTimeout | Error::ShortReply { .. }) => {
                        machine.step(Event::Accepted);
                        machine.step(Event::ReplyMissing)
                    }
                    Err(e) => return Err(e),
                }
            }
            Action::Finished(kind) => return Ok(kind),
            Action::Failed(failure) => return Err(failure.into()),
            // Every command above yields an event, so the machine never idles
            Action::Wait => return Err(Error::ProtocolFailure),
        };
    }
}

fn reply_event(variant: &Variant, op: Op, reply: &[u8]) -> Event {
    match op {
        Op::Reset => variant
            .match_reset_ack(reply)
            .map(Event::ResetAck)
            .unwrap_or(Event::ResetReplyBad),
        _ => reply
            .first()
            .map(|byte| Event::ConfigByte(*byte))
            .unwrap_or(Event::ReplyMissing),
    }
}

/// Restore settings that differ from the power-on defaults
///
/// Run after a successful negotiation. Every command is idempotent.
pub async fn replay<M, P>(host: &Host<M, P>, config: &Configuration) -> Result<(), Error>
where
    M: RawMutex,
    P: CommandPort,
{
    if config.mode != ReportMode::default() {
        host.issue(Op::Mode(config.mode)).await?;
    }
    if config.scaling != Scaling::default() {
        host.issue(Op::Scaling(config.scaling)).await?;
    }
    if config.sample_rate != SampleRate::default() {
        host.issue(Op::SampleRate(config.sample_rate)).await?;
    }
    if config.resolution != Resolution::default() {
        host.issue(Op::Resolution(config.resolution)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::{host, respond, wait_steps, InstantDelay, NeverDelay};
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use rtmouse_protocol::result::RESULT_OK;
    use rtmouse_protocol::{ReportFrame, WireStep};

    fn ack_bytes(variant: &Variant, kind: MouseKind) -> std::vec::Vec<u8> {
        variant
            .layout
            .encode(&ReportFrame::ResetAck(kind))
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn test_rt_negotiation() {
        let (host, log) = host(&Variant::RT_PC);
        let ack = ack_bytes(&Variant::RT_PC, MouseKind::Optical);
        let replies: [(u8, &[u8]); 2] = [(0x01, &ack[..]), (0x06, &[0x10])];

        let (result, _) = block_on(join(
            negotiate(&host, &mut NeverDelay, 500),
            respond(&host, &log, &replies, 1..=5),
        ));

        assert_eq!(result, Ok(MouseKind::Optical));
        assert_eq!(
            &log.borrow()[..],
            &[
                WireStep::new(0x00, 0x35),
                WireStep::new(0x04, 0x01),
                WireStep::new(0x04, 0x06),
                WireStep::new(0x00, 0x25),
                WireStep::new(0x03, 0x08),
            ]
        );
    }

    #[test]
    fn test_ps2_negotiation() {
        let (host, log) = host(&Variant::PS2);
        // Every command byte is acknowledged before any reply
        let replies: [(u8, &[u8]); 3] = [
            (0xff, &[0xfa, 0xaa, 0x00]),
            (0xf2, &[0xfa, 0x00]),
            (0xf4, &[0xfa]),
        ];

        let (result, _) = block_on(join(
            negotiate(&host, &mut NeverDelay, 500),
            respond(&host, &log, &replies, 1..=3),
        ));

        assert_eq!(result, Ok(MouseKind::Generic));
        assert_eq!(
            &log.borrow()[..],
            &[
                WireStep::new(0x00, 0xff),
                WireStep::new(0x00, 0xf2),
                WireStep::new(0x00, 0xf4),
            ]
        );
        assert!(host.is_idle());
    }

    #[test]
    fn test_silent_mouse_exhausts_attempts() {
        let (host, log) = host(&Variant::PS2);

        let (result, _) = block_on(join(
            negotiate(&host, &mut InstantDelay, 500),
            respond(&host, &log, &[], 1..=MAX_RESET_ATTEMPTS as usize),
        ));

        assert_eq!(result, Err(Error::ProtocolFailure));
        assert_eq!(log.borrow().len(), MAX_RESET_ATTEMPTS as usize);
        assert!(log.borrow().iter().all(|s| s.byte == 0xff));
    }

    #[test]
    fn test_config_mismatch_is_surfaced() {
        let (host, log) = host(&Variant::RT_PC);
        let ack = ack_bytes(&Variant::RT_PC, MouseKind::Generic);
        let replies: [(u8, &[u8]); 2] = [(0x01, &ack[..]), (0x06, &[0x30])];

        let (result, _) = block_on(join(
            negotiate(&host, &mut NeverDelay, 500),
            respond(&host, &log, &replies, 1..=3),
        ));
        assert_eq!(result, Err(Error::ConfigMismatch(0x30)));
    }

    #[test]
    fn test_replay_only_non_defaults() {
        let (host, log) = host(&Variant::RT_PC);
        let config = Configuration {
            mode: ReportMode::Remote,
            resolution: Resolution::Cpi200,
            ..Configuration::default()
        };

        let (result, _) = block_on(join(replay(&host, &config), async {
            // Two split commands, two steps each
            for n in 1..=4 {
                wait_steps(&log, n).await;
                host.on_wire_completion(RESULT_OK);
            }
        }));

        assert_eq!(result, Ok(()));
        assert_eq!(
            &log.borrow()[..],
            &[
                WireStep::new(0x03, 0x8d),
                WireStep::new(0x03, 0x03),
                WireStep::new(0x03, 0x89),
                WireStep::new(0x03, 0x00),
            ]
        );
    }
}
