//! Mouse session and control surface
//!
//! A [`Session`] is created by [`Session::open`], which sets up the adapter
//! link and negotiates. Its methods are the control surface: mode, status,
//! read-XY, enable/disable, scaling, rate and resolution. Timeout-class
//! failures are retried up to the retry budget; past it the session
//! resynchronizes (negotiates again and replays the configuration) and
//! returns the error.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use rtmouse_hal::TickTimer;
use rtmouse_protocol::{
    baud_divisor, DecodeError, MouseKind, Movement, Op, ReportFrame, ReportMode, Resolution,
    SampleRate, Scaling, StatusReport, MAX_FRAME_LEN,
};

use crate::config::{Configuration, SessionConfig};
use crate::discipline::Discipline;
use crate::error::Error;
use crate::host::Host;
use crate::negotiate::{negotiate, replay};
use crate::traits::CommandPort;

pub struct Session<'h, M: RawMutex, P, D> {
    host: &'h Host<M, P>,
    delay: D,
    config: SessionConfig,
    kind: MouseKind,
}

impl<'h, M, P, D> Session<'h, M, P, D>
where
    M: RawMutex,
    P: CommandPort,
    D: DelayNs,
{
    /// Set up the link, negotiate and start listening
    pub async fn open(
        host: &'h Host<M, P>,
        mut delay: D,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        host.set_listening(false);

        if host.variant().adapter.is_some() {
            let divisor = baud_divisor(config.baud).ok_or(Error::Unsupported)?;
            host.issue(Op::LinkEnable).await?;
            host.issue(Op::LinkBaud(divisor)).await?;
            host.issue(Op::LinkFraming(config.framing)).await?;
        }

        let kind = negotiate(host, &mut delay, config.reply_timeout_ms).await?;
        host.update_config(|c| {
            *c = Configuration {
                enabled: true,
                ..Configuration::default()
            }
        });
        host.set_listening(true);

        Ok(Self {
            host,
            delay,
            config,
            kind,
        })
    }

    pub fn kind(&self) -> MouseKind {
        self.kind
    }

    pub fn host(&self) -> &'h Host<M, P> {
        self.host
    }

    pub fn config(&self) -> Configuration {
        self.host.config()
    }

    /// Report discipline using this session's button timings
    pub fn discipline<T: TickTimer>(&self, timer: T) -> Discipline<T> {
        Discipline::new(self.config.buttons, timer)
    }

    pub async fn set_mode(&mut self, mode: ReportMode) -> Result<(), Error> {
        self.perform(Op::Mode(mode), &mut []).await?;
        self.host.update_config(|c| c.mode = mode);
        Ok(())
    }

    /// Raw status block
    pub async fn read_status(&mut self) -> Result<StatusReport, Error> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = self.host.variant().status_len();
        self.perform(Op::ReadStatus, &mut buf[..len]).await?;
        match self.host.variant().layout.decode(&buf[..len])? {
            ReportFrame::Status(status) => Ok(status),
            _ => Err(Error::BadReply(DecodeError::Malformed)),
        }
    }

    /// Synchronous read-data
    pub async fn read_xy(&mut self) -> Result<Movement, Error> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = self.host.variant().layout.frame_len();
        self.perform(Op::ReadData, &mut buf[..len]).await?;
        match self.host.variant().layout.decode(&buf[..len])? {
            ReportFrame::Movement(movement) => Ok(movement),
            _ => Err(Error::BadReply(DecodeError::Malformed)),
        }
    }

    pub async fn enable(&mut self) -> Result<(), Error> {
        self.perform(Op::Enable, &mut []).await?;
        self.host.update_config(|c| c.enabled = true);
        Ok(())
    }

    pub async fn disable(&mut self) -> Result<(), Error> {
        self.perform(Op::Disable, &mut []).await?;
        self.host.update_config(|c| c.enabled = false);
        Ok(())
    }

    pub async fn set_scaling(&mut self, scaling: Scaling) -> Result<(), Error> {
        self.perform(Op::Scaling(scaling), &mut []).await?;
        self.host.update_config(|c| c.scaling = scaling);
        Ok(())
    }

    /// Set the sample rate in reports per second
    ///
    /// A rate the variant does not support falls back to the default.
    /// Returns the rate applied.
    pub async fn set_sample_rate(&mut self, hz: u8) -> Result<SampleRate, Error> {
        let variant = self.host.variant();
        let rate = SampleRate::from_hz(hz)
            .filter(|rate| variant.supports_rate(*rate))
            .unwrap_or_default();
        self.perform(Op::SampleRate(rate), &mut []).await?;
        self.host.update_config(|c| c.sample_rate = rate);
        Ok(rate)
    }

    /// Set the resolution by code (0..=3: 200, 100, 50, 25 counts per inch)
    ///
    /// An unknown code falls back to the default. Returns the resolution
    /// applied.
    pub async fn set_resolution(&mut self, code: u8) -> Result<Resolution, Error> {
        let resolution = Resolution::from_code_or_default(code);
        self.perform(Op::Resolution(resolution), &mut []).await?;
        self.host.update_config(|c| c.resolution = resolution);
        Ok(resolution)
    }

    /// Negotiate again and restore the configuration
    pub async fn resync(&mut self) -> Result<(), Error> {
        let saved = self.host.config();
        self.host.set_listening(false);

        self.kind = negotiate(self.host, &mut self.delay, self.config.reply_timeout_ms).await?;
        replay(self.host, &saved).await?;
        if !saved.enabled {
            self.host.issue(Op::Disable).await?;
        }

        self.host.update_config(|c| *c = saved);
        self.host.set_listening(true);
        Ok(())
    }

    /// Stop transmission and forget the configuration
    pub async fn close(self) -> Result<(), Error> {
        self.host.set_listening(false);
        let result = self.host.issue(Op::Disable).await;
        self.host.update_config(|c| *c = Configuration::default());
        result
    }

    /// Run a command, with a reply when `reply` is non-empty
    async fn perform(&mut self, op: Op, reply: &mut [u8]) -> Result<(), Error> {
        let mut retries = 0;
        loop {
            let result = if reply.is_empty() {
                self.host.issue(op).await
            } else {
                let timeout = self.config.reply_timeout_ms;
                self.host.query(&mut self.delay, op, reply, timeout).await
            };

            match result {
                Err(e) if e.is_transient() => {
                    if retries >= self.config.retry_budget {
                        self.resync().await?;
                        return Err(e);
                    }
                    retries += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::{
        host, respond, wait_steps, InstantDelay, MockPort, NeverDelay, StepLog, TestHost,
    };
    use crate::host::Routed;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_futures::join::join;
    use rtmouse_protocol::result::RESULT_OK;
    use rtmouse_protocol::{Buttons, Variant, WireStep};

    /// Open an RT PC session against a well-behaved mouse
    fn open_rt<'a, D: DelayNs>(
        host: &'a TestHost,
        log: &StepLog,
        delay: D,
        config: SessionConfig,
    ) -> Session<'a, NoopRawMutex, MockPort, D> {
        let ack: [u8; 4] = [0xff, 0x08, 0x00, 0x00];
        let replies: [(u8, &[u8]); 2] = [(0x01, &ack[..]), (0x06, &[0x20])];
        let (session, _) = block_on(join(
            Session::open(host, delay, config),
            respond(host, log, &replies, 1..=8),
        ));
        session.unwrap()
    }

    #[test]
    fn test_open_sets_up_link_and_listens() {
        let (host, log) = host(&Variant::RT_PC);
        let session = open_rt(&host, &log, NeverDelay, SessionConfig::default());

        assert_eq!(session.kind(), MouseKind::Generic);
        assert_eq!(
            &log.borrow()[..3],
            &[
                WireStep::new(0x00, 0x3c),
                WireStep::new(0x05, 251),
                WireStep::new(0x06, 0x84),
            ]
        );
        assert!(host.is_listening());
        assert!(session.config().enabled);
    }

    #[test]
    fn test_open_rejects_unreachable_baud() {
        for baud in [50, 0] {
            let (host, log) = host(&Variant::RT_PC);
            let config = SessionConfig {
                baud,
                ..SessionConfig::default()
            };
            let result = block_on(Session::open(&host, NeverDelay, config));
            assert!(matches!(result, Err(Error::Unsupported)));
            assert!(log.borrow().is_empty());
        }
    }

    #[test]
    fn test_ps2_session_streams_after_rate_change() {
        let (host, log) = host(&Variant::PS2);
        let replies: [(u8, &[u8]); 4] = [
            (0xff, &[0xfa, 0xaa, 0x00]),
            (0xf2, &[0xfa, 0x00]),
            (0xf4, &[0xfa]),
            (0xf3, &[0xfa, 0xfa]),
        ];
        let (session, _) = block_on(join(
            Session::open(&host, NeverDelay, SessionConfig::default()),
            respond(&host, &log, &replies, 1..=3),
        ));
        let mut session = session.unwrap();

        let (rate, _) = block_on(join(
            session.set_sample_rate(40),
            respond(&host, &log, &replies, 4..=4),
        ));
        assert_eq!(rate, Ok(SampleRate::Hz40));
        assert_eq!(log.borrow()[3], WireStep::with_param(0x00, 0xf3, 40));

        let frame = [0x09, 0x04, 0xfe];
        assert_eq!(host.on_byte(frame[0]), Routed::Pending);
        assert_eq!(host.on_byte(frame[1]), Routed::Pending);
        assert_eq!(
            host.on_byte(frame[2]),
            Routed::Frame(ReportFrame::Movement(Movement::new(Buttons::LEFT, 4, -2)))
        );
    }

    #[test]
    fn test_rate_and_resolution_fallbacks() {
        let (host, log) = host(&Variant::RT_PC);
        let mut session = open_rt(&host, &log, NeverDelay, SessionConfig::default());

        let (rate, _) = block_on(join(session.set_sample_rate(40), respond(&host, &log, &[], 9..=10)));
        assert_eq!(rate, Ok(SampleRate::Hz40));
        assert_eq!(log.borrow()[9], WireStep::new(0x03, 40));

        // 200 Hz exists only on PS/2
        let (rate, _) = block_on(join(session.set_sample_rate(200), respond(&host, &log, &[], 11..=12)));
        assert_eq!(rate, Ok(SampleRate::Hz100));

        let (res, _) = block_on(join(session.set_resolution(9), respond(&host, &log, &[], 13..=14)));
        assert_eq!(res, Ok(Resolution::Cpi100));
        assert_eq!(log.borrow()[13], WireStep::new(0x03, 0x01));

        let config = session.config();
        assert_eq!(config.sample_rate, SampleRate::Hz100);
        assert_eq!(config.resolution, Resolution::Cpi100);
    }

    #[test]
    fn test_read_status_and_xy() {
        let (host, log) = host(&Variant::RT_PC);
        let mut session = open_rt(&host, &log, NeverDelay, SessionConfig::default());

        let status: [(u8, &[u8]); 1] = [(0x73, &[0xe9, 0x00, 0x01, 0x64])];
        let (result, _) = block_on(join(session.read_status(), respond(&host, &log, &status, 9..=11)));
        let status = result.unwrap();
        assert!(status.enabled);
        assert_eq!(status.sample_rate, 100);
        assert_eq!(status.resolution, 1);

        let data: [(u8, &[u8]); 1] = [(0x0b, &[0x0b, 0x20, 0x05, 0x00])];
        let (result, _) = block_on(join(session.read_xy(), respond(&host, &log, &data, 12..=14)));
        assert_eq!(result, Ok(Movement::new(Buttons::LEFT, 5, 0)));
    }

    #[test]
    fn test_mode_scaling_and_enable_tracked() {
        let (host, log) = host(&Variant::RT_PC);
        let mut session = open_rt(&host, &log, NeverDelay, SessionConfig::default());

        let (r, _) = block_on(join(session.set_mode(ReportMode::Remote), respond(&host, &log, &[], 9..=10)));
        assert_eq!(r, Ok(()));
        let (r, _) = block_on(join(
            session.set_scaling(Scaling::Exponential),
            respond(&host, &log, &[], 11..=11),
        ));
        assert_eq!(r, Ok(()));
        let (r, _) = block_on(join(session.disable(), respond(&host, &log, &[], 12..=12)));
        assert_eq!(r, Ok(()));

        let config = session.config();
        assert_eq!(config.mode, ReportMode::Remote);
        assert_eq!(config.scaling, Scaling::Exponential);
        assert!(!config.enabled);
    }

    #[test]
    fn test_failed_command_leaves_config() {
        let (host, log) = host(&Variant::RT_PC);
        let mut session = open_rt(&host, &log, NeverDelay, SessionConfig::default());

        let (r, _) = block_on(join(session.set_scaling(Scaling::Exponential), async {
            wait_steps(&log, 9).await;
            host.on_wire_completion(0xe4);
        }));
        assert_eq!(r, Err(Error::Command(rtmouse_protocol::AdapterError::RcvError)));
        assert_eq!(session.config().scaling, Scaling::Linear);
    }

    #[test]
    fn test_timeouts_trigger_resync() {
        let (host, log) = host(&Variant::RT_PC);
        let config = SessionConfig {
            retry_budget: 1,
            ..SessionConfig::default()
        };
        let mut session = open_rt(&host, &log, InstantDelay, config);

        let ack: [u8; 4] = [0xff, 0x08, 0x00, 0x00];
        let replies: [(u8, &[u8]); 2] = [(0x01, &ack[..]), (0x06, &[0x20])];
        // Two read-data attempts (disable, read, enable each), then five
        // negotiation steps
        let (result, _) = block_on(join(session.read_xy(), respond(&host, &log, &replies, 9..=19)));

        assert_eq!(result, Err(Error::ReplyTimeout));
        assert_eq!(log.borrow().len(), 19);
        assert_eq!(log.borrow()[14], WireStep::new(0x00, 0x35));
        assert!(host.is_listening());
        assert!(session.config().enabled);
    }

    #[test]
    fn test_close_resets_config() {
        let (host, log) = host(&Variant::RT_PC);
        let session = open_rt(&host, &log, NeverDelay, SessionConfig::default());
        let (r, _) = block_on(join(session.close(), async {
            wait_steps(&log, 9).await;
            host.on_wire_completion(RESULT_OK);
        }));
        assert_eq!(r, Ok(()));
        assert_eq!(host.config(), Configuration::default());
        assert!(!host.is_listening());
    }
}
