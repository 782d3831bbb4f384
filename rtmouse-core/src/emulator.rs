//! Peripheral emulator
//!
//! Plays the mouse towards a host. Command bytes from the host drive a small
//! interpreter; pointer reports accumulate between sample ticks and are
//! streamed as wire frames in whichever layout the variant uses.
//!
//! Movement beyond one frame's range is carried over to the next frame.

use rtmouse_hal::UartTx;
use rtmouse_protocol::{
    Buttons, MouseKind, Movement, Opcode, PointerReport, ReportFrame, ReportMode, Resolution,
    SampleRate, Scaling, StatusReport, Variant,
};

use crate::config::MouseSection;

/// Device settings as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub enabled: bool,
    pub scaling: Scaling,
    pub mode: ReportMode,
    pub rate: SampleRate,
    pub resolution: Resolution,
}

/// What a command byte did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Handled {
    Command(Opcode),
    /// Parameter byte for a pending command
    Parameter(Opcode, u8),
    /// Echoed back in wrap mode
    Echoed,
    /// Not a command of this variant
    Ignored,
}

/// 2:1 transfer curve for small deltas
const EXP_CURVE: [i32; 6] = [0, 1, 1, 3, 6, 9];

fn scale_exponential(delta: i32) -> i32 {
    let magnitude = delta.unsigned_abs() as usize;
    let scaled = EXP_CURVE
        .get(magnitude)
        .copied()
        .unwrap_or(magnitude as i32 * 2);
    if delta < 0 {
        -scaled
    } else {
        scaled
    }
}

pub struct Peripheral<W> {
    tx: W,
    variant: &'static Variant,
    kind: MouseKind,
    invert_y: bool,
    power_on_rate: SampleRate,
    power_on_resolution: Resolution,
    state: DeviceState,
    /// Command waiting for its parameter byte
    pending: Option<Opcode>,
    wrap: bool,
    dx: i32,
    dy: i32,
    buttons: Buttons,
    sent_buttons: Buttons,
}

impl<W: UartTx> Peripheral<W> {
    pub fn new(tx: W, variant: &'static Variant, mouse: &MouseSection) -> Self {
        let power_on_rate = if variant.supports_rate(mouse.sample_rate) {
            mouse.sample_rate
        } else {
            SampleRate::default()
        };

        let mut peripheral = Self {
            tx,
            variant,
            kind: mouse.kind,
            invert_y: mouse.invert_y,
            power_on_rate,
            power_on_resolution: mouse.resolution,
            state: DeviceState {
                enabled: false,
                scaling: Scaling::Linear,
                mode: ReportMode::Stream,
                rate: power_on_rate,
                resolution: mouse.resolution,
            },
            pending: None,
            wrap: false,
            dx: 0,
            dy: 0,
            buttons: Buttons::NONE,
            sent_buttons: Buttons::NONE,
        };
        peripheral.power_on();
        peripheral
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_wrapping(&self) -> bool {
        self.wrap
    }

    /// Interval between stream reports at the current rate
    pub fn sample_period_ms(&self) -> u32 {
        self.state.rate.period_ms()
    }

    fn power_on(&mut self) {
        self.state = DeviceState {
            enabled: false,
            scaling: Scaling::Linear,
            mode: ReportMode::Stream,
            rate: self.power_on_rate,
            resolution: self.power_on_resolution,
        };
        self.pending = None;
        self.wrap = false;
        self.clear_motion();
    }

    fn clear_motion(&mut self) {
        self.dx = 0;
        self.dy = 0;
        self.sent_buttons = self.buttons;
    }

    fn send(&mut self, frame: &ReportFrame) -> Result<(), W::Error> {
        let wire = self.variant.layout.encode(frame);
        self.tx.write_blocking(wire.as_bytes())
    }

    fn ack(&mut self) -> Result<(), W::Error> {
        match self.variant.device_ack {
            Some(ack) => self.tx.write_blocking(&[ack]),
            None => Ok(()),
        }
    }

    /// Interpret one byte from the host
    pub fn on_command_byte(&mut self, byte: u8) -> Result<Handled, W::Error> {
        if let Some(op) = self.pending.take() {
            self.ack()?;
            self.apply_param(op, byte);
            return Ok(Handled::Parameter(op, byte));
        }

        let opcode = self.variant.opcode(byte);

        if self.wrap && !matches!(opcode, Some(Opcode::WrapOff | Opcode::Reset)) {
            self.tx.write_blocking(&[byte])?;
            return Ok(Handled::Echoed);
        }

        let Some(op) = opcode else {
            return Ok(Handled::Ignored);
        };

        self.ack()?;
        match op {
            Opcode::Reset => {
                self.power_on();
                self.send(&ReportFrame::ResetAck(self.kind))?;
            }
            Opcode::ReadConfig => {
                let id = self.variant.config_id(self.kind);
                self.tx.write_blocking(&[id])?;
            }
            Opcode::ReadStatus => {
                let status = self.status();
                self.send(&ReportFrame::Status(status))?;
            }
            Opcode::ReadData => {
                let movement = self.take_movement();
                self.send(&ReportFrame::Movement(movement))?;
            }
            Opcode::Enable => {
                self.state.enabled = true;
                self.clear_motion();
            }
            Opcode::Disable => self.state.enabled = false,
            Opcode::WrapOn => self.wrap = true,
            Opcode::WrapOff => self.wrap = false,
            Opcode::Scaling(scaling) => self.state.scaling = scaling,
            Opcode::Mode(mode) => self.state.mode = mode,
            Opcode::SetRate | Opcode::SetResolution | Opcode::SetMode => {
                self.pending = Some(op);
            }
        }
        self.tx.flush()?;
        Ok(Handled::Command(op))
    }

    /// Out-of-range parameters leave the setting unchanged
    fn apply_param(&mut self, op: Opcode, param: u8) {
        match op {
            Opcode::SetRate => {
                if let Some(rate) = self.variant.rate_from_param(param) {
                    self.state.rate = rate;
                }
            }
            Opcode::SetResolution => {
                if let Some(resolution) = self.variant.resolution_from_param(param) {
                    self.state.resolution = resolution;
                }
            }
            Opcode::SetMode => {
                if let Some(mode) = self.variant.mode_from_param(param) {
                    self.state.mode = mode;
                }
            }
            _ => {}
        }
    }

    fn status(&self) -> StatusReport {
        StatusReport {
            buttons: self.buttons,
            enabled: self.state.enabled,
            scaling: self.state.scaling,
            mode: self.state.mode,
            resolution: self.variant.resolution_param(self.state.resolution),
            sample_rate: self.state.rate.hz(),
        }
    }

    /// Accumulate a report from the pointer source
    pub fn on_pointer(&mut self, report: &PointerReport) {
        self.on_movement(report.to_movement(self.invert_y));
    }

    /// Accumulate movement already in mouse orientation
    pub fn on_movement(&mut self, movement: Movement) {
        self.dx = self.dx.saturating_add(movement.dx as i32);
        self.dy = self.dy.saturating_add(movement.dy as i32);
        self.buttons = movement.buttons;
    }

    /// One frame's worth of accumulated movement, the rest carried over
    fn take_movement(&mut self) -> Movement {
        let dx = self.dx.clamp(i8::MIN as i32, i8::MAX as i32);
        let dy = self.dy.clamp(i8::MIN as i32, i8::MAX as i32);
        self.dx -= dx;
        self.dy -= dy;
        self.sent_buttons = self.buttons;

        let (dx, dy) = match self.state.scaling {
            Scaling::Linear => (dx, dy),
            Scaling::Exponential => (scale_exponential(dx), scale_exponential(dy)),
        };
        Movement::new(self.buttons, dx as i16, dy as i16)
    }

    /// Sample period elapsed; stream a report if there is anything to say
    ///
    /// Returns true when a frame was sent.
    pub fn on_sample_tick(&mut self) -> Result<bool, W::Error> {
        let streaming = self.state.enabled && self.state.mode == ReportMode::Stream && !self.wrap;
        if !streaming || self.pending.is_some() {
            return Ok(false);
        }
        if self.dx == 0 && self.dy == 0 && self.buttons == self.sent_buttons {
            return Ok(false);
        }

        let movement = self.take_movement();
        self.send(&ReportFrame::Movement(movement))?;
        self.tx.flush()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct MockTx {
        written: std::vec::Vec<u8>,
    }

    impl UartTx for MockTx {
        type Error = Infallible;

        fn write_blocking(&mut self, data: &[u8]) -> Result<(), Infallible> {
            self.written.extend_from_slice(data);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    fn peripheral(variant: &'static Variant) -> Peripheral<MockTx> {
        Peripheral::new(MockTx::default(), variant, &MouseSection::default())
    }

    fn feed(p: &mut Peripheral<MockTx>, bytes: &[u8]) -> std::vec::Vec<u8> {
        for b in bytes {
            p.on_command_byte(*b).unwrap();
        }
        core::mem::take(&mut p.tx.written)
    }

    fn pointer(buttons: u8, dx: i16, dy: i16) -> PointerReport {
        PointerReport { buttons, dx, dy }
    }

    fn decode(p: &Peripheral<MockTx>, bytes: &[u8]) -> ReportFrame {
        p.variant.layout.decode(bytes).unwrap()
    }

    #[test]
    fn test_rt_reset_and_config() {
        let mut p = peripheral(&Variant::RT_PC);
        assert_eq!(feed(&mut p, &[0x01]), [0xff, 0x08, 0x00, 0x00]);
        assert!(!p.state().enabled);
        assert_eq!(feed(&mut p, &[0x06]), [0x20]);

        let optical = MouseSection {
            kind: MouseKind::Optical,
            ..MouseSection::default()
        };
        let mut p = Peripheral::new(MockTx::default(), &Variant::RT_PC, &optical);
        assert_eq!(feed(&mut p, &[0x01]), [0xff, 0x04, 0x00, 0x00]);
        assert_eq!(feed(&mut p, &[0x06]), [0x10]);
    }

    #[test]
    fn test_ps2_acks_every_byte() {
        let mut p = peripheral(&Variant::PS2);
        assert_eq!(feed(&mut p, &[0xff]), [0xfa, 0xaa, 0x00]);
        assert_eq!(feed(&mut p, &[0xf2]), [0xfa, 0x00]);
        assert_eq!(feed(&mut p, &[0xf3, 40]), [0xfa, 0xfa]);
        assert_eq!(p.state().rate, SampleRate::Hz40);
        assert_eq!(p.sample_period_ms(), 25);

        // Unknown rate is acknowledged and ignored
        feed(&mut p, &[0xf3, 55]);
        assert_eq!(p.state().rate, SampleRate::Hz40);
    }

    #[test]
    fn test_rt_two_step_parameters() {
        let mut p = peripheral(&Variant::RT_PC);
        assert_eq!(p.on_command_byte(0x8a).unwrap(), Handled::Command(Opcode::SetRate));
        assert_eq!(
            p.on_command_byte(60).unwrap(),
            Handled::Parameter(Opcode::SetRate, 60)
        );
        assert_eq!(p.state().rate, SampleRate::Hz60);

        // 200 Hz is PS/2 only
        feed(&mut p, &[0x8a, 200]);
        assert_eq!(p.state().rate, SampleRate::Hz60);

        feed(&mut p, &[0x89, 0x00, 0x8d, 0x03]);
        assert_eq!(p.state().resolution, Resolution::Cpi200);
        assert_eq!(p.state().mode, ReportMode::Remote);
        assert_eq!(p.on_command_byte(0x55).unwrap(), Handled::Ignored);
    }

    #[test]
    fn test_status_reply() {
        let mut p = peripheral(&Variant::PS2);
        feed(&mut p, &[0xf4, 0xe7]);
        let reply = feed(&mut p, &[0xe9]);
        assert_eq!(reply[0], 0xfa);
        match decode(&p, &reply[1..]) {
            ReportFrame::Status(s) => {
                assert!(s.enabled);
                assert_eq!(s.scaling, Scaling::Exponential);
                // PS/2 numbers resolutions from the coarse end
                assert_eq!(s.resolution, 2);
                assert_eq!(s.sample_rate, 100);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_stream_saturates_and_carries() {
        let mut p = peripheral(&Variant::RT_PC);
        feed(&mut p, &[0x08]);
        p.on_pointer(&pointer(0x01, 300, 10));

        let mut frames = std::vec::Vec::new();
        while p.on_sample_tick().unwrap() {
            let bytes = core::mem::take(&mut p.tx.written);
            frames.push(decode(&p, &bytes));
        }
        assert_eq!(
            frames,
            [
                ReportFrame::Movement(Movement::new(Buttons::LEFT, 127, -10)),
                ReportFrame::Movement(Movement::new(Buttons::LEFT, 127, 0)),
                ReportFrame::Movement(Movement::new(Buttons::LEFT, 46, 0)),
            ]
        );
    }

    #[test]
    fn test_button_change_alone_is_reported() {
        let mut p = peripheral(&Variant::PS2);
        feed(&mut p, &[0xf4]);
        assert!(!p.on_sample_tick().unwrap());
        p.on_pointer(&pointer(0x02, 0, 0));
        assert!(p.on_sample_tick().unwrap());
        assert!(!p.on_sample_tick().unwrap());
    }

    #[test]
    fn test_no_stream_when_disabled_or_remote() {
        let mut p = peripheral(&Variant::RT_PC);
        p.on_pointer(&pointer(0, 5, 0));
        assert!(!p.on_sample_tick().unwrap());

        feed(&mut p, &[0x08, 0x8d, 0x03]);
        p.on_pointer(&pointer(0, 5, 0));
        assert!(!p.on_sample_tick().unwrap());

        let reply = feed(&mut p, &[0x0b]);
        assert_eq!(
            decode(&p, &reply),
            ReportFrame::Movement(Movement::new(Buttons::NONE, 5, 0))
        );
    }

    #[test]
    fn test_wrap_mode_echoes() {
        let mut p = peripheral(&Variant::RT_PC);
        assert!(feed(&mut p, &[0x0e]).is_empty());
        assert!(p.is_wrapping());
        assert_eq!(feed(&mut p, &[0x42, 0x08]), [0x42, 0x08]);
        assert!(!p.state().enabled);
        assert!(feed(&mut p, &[0x0f]).is_empty());
        assert!(!p.is_wrapping());
    }

    #[test]
    fn test_exponential_curve() {
        assert_eq!(scale_exponential(0), 0);
        assert_eq!(scale_exponential(2), 1);
        assert_eq!(scale_exponential(4), 6);
        assert_eq!(scale_exponential(-5), -9);
        assert_eq!(scale_exponential(6), 12);
    }
}
