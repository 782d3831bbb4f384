//! Variant descriptors.
//!
//! A [`Variant`] bundles everything that differs between the RT PC mouse and
//! the PS/2 planar mouse: the opcode table, how parameters travel, the report
//! layout, the reset and configuration replies, and the adapter commands used
//! to set up the serial link. The session picks one at construction.

use crate::command::{Command, Framing, Op, WireStep};
use crate::report::{Layout, ReportFrame};
use crate::settings::{MouseKind, ReportMode, Resolution, SampleRate, Scaling};

/// Adapter oscillator feeding the mouse UART baud generator
pub const ADAPTER_OSC_HZ: u32 = 9_216_000;

/// Baud divisor byte for the adapter UART
///
/// Returns `None` when the rate cannot be produced by the 8-bit divider.
pub fn baud_divisor(baud: u32) -> Option<u8> {
    let quotient = ADAPTER_OSC_HZ.checked_div(baud.checked_mul(192)?)?;
    if quotient == 0 || quotient > 255 {
        return None;
    }
    Some((256 - quotient) as u8)
}

/// Command bytes understood by the mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeTable {
    pub reset: u8,
    pub read_config: u8,
    pub read_status: u8,
    pub read_data: u8,
    pub enable: u8,
    pub disable: u8,
    pub wrap_on: u8,
    pub wrap_off: u8,
    pub scale_exp: u8,
    pub scale_linear: u8,
    pub set_rate: u8,
    pub set_resolution: u8,
    pub mode: ModeOpcodes,
}

/// How stream/remote mode is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOpcodes {
    /// One opcode followed by a mode parameter
    Parameter { opcode: u8, stream: u8, remote: u8 },
    /// One opcode per mode
    Direct { stream: u8, remote: u8 },
}

/// Decoded command byte, as seen by the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    Reset,
    ReadConfig,
    ReadStatus,
    ReadData,
    Enable,
    Disable,
    WrapOn,
    WrapOff,
    Scaling(Scaling),
    SetRate,
    SetResolution,
    SetMode,
    Mode(ReportMode),
}

impl Opcode {
    /// Whether the next byte on the wire is this command's parameter
    pub fn takes_param(self) -> bool {
        matches!(self, Opcode::SetRate | Opcode::SetResolution | Opcode::SetMode)
    }
}

/// Keyboard/locator adapter commands for the mouse UART
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterTable {
    pub ext_selector: u8,
    pub block_on: u8,
    pub block_off: u8,
    pub uart_enable: u8,
    pub baud_selector: u8,
    pub framing_selector: u8,
    pub frame_odd: u8,
    pub frame_even: u8,
}

/// Protocol variant descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub name: &'static str,
    pub layout: Layout,
    pub opcodes: OpcodeTable,
    /// Selector for commands that produce a reply
    pub query_selector: u8,
    /// Selector for commands without a reply
    pub control_selector: u8,
    /// Parameterized commands go out as two exchanges
    pub split_params: bool,
    pub adapter: Option<AdapterTable>,
    pub rates: &'static [SampleRate],
    /// Resolutions indexed by wire code
    pub resolutions: [Resolution; 4],
    /// Models recognized from the reset acknowledgment
    pub kinds: &'static [MouseKind],
    /// Reply to read-config, indexed like [`MouseKind`] (generic, optical)
    pub config_ids: [u8; 2],
    /// Byte the device sends to acknowledge each received byte
    pub device_ack: Option<u8>,
}

impl Variant {
    /// IBM RT PC mouse behind the keyboard/locator adapter
    pub const RT_PC: Variant = Variant {
        name: "rt",
        layout: Layout::BitPacked,
        opcodes: OpcodeTable {
            reset: 0x01,
            read_config: 0x06,
            read_status: 0x73,
            read_data: 0x0b,
            enable: 0x08,
            disable: 0x09,
            wrap_on: 0x0e,
            wrap_off: 0x0f,
            scale_exp: 0x78,
            scale_linear: 0x6c,
            set_rate: 0x8a,
            set_resolution: 0x89,
            mode: ModeOpcodes::Parameter {
                opcode: 0x8d,
                stream: 0x00,
                remote: 0x03,
            },
        },
        query_selector: 0x04,
        control_selector: 0x03,
        split_params: true,
        adapter: Some(AdapterTable {
            ext_selector: 0x00,
            block_on: 0x35,
            block_off: 0x25,
            uart_enable: 0x3c,
            baud_selector: 0x05,
            framing_selector: 0x06,
            frame_odd: 0x84,
            frame_even: 0x04,
        }),
        rates: &[
            SampleRate::Hz10,
            SampleRate::Hz20,
            SampleRate::Hz40,
            SampleRate::Hz60,
            SampleRate::Hz80,
            SampleRate::Hz100,
        ],
        resolutions: [
            Resolution::Cpi200,
            Resolution::Cpi100,
            Resolution::Cpi50,
            Resolution::Cpi25,
        ],
        kinds: &[MouseKind::Generic, MouseKind::Optical],
        config_ids: [0x20, 0x10],
        device_ack: None,
    };

    /// PS/2 planar mouse
    pub const PS2: Variant = Variant {
        name: "ps2",
        layout: Layout::ByteAligned,
        opcodes: OpcodeTable {
            reset: 0xff,
            read_config: 0xf2,
            read_status: 0xe9,
            read_data: 0xeb,
            enable: 0xf4,
            disable: 0xf5,
            wrap_on: 0xee,
            wrap_off: 0xec,
            scale_exp: 0xe7,
            scale_linear: 0xe6,
            set_rate: 0xf3,
            set_resolution: 0xe8,
            mode: ModeOpcodes::Direct {
                stream: 0xea,
                remote: 0xf0,
            },
        },
        query_selector: 0x00,
        control_selector: 0x00,
        split_params: false,
        adapter: None,
        rates: &SampleRate::ALL,
        resolutions: [
            Resolution::Cpi25,
            Resolution::Cpi50,
            Resolution::Cpi100,
            Resolution::Cpi200,
        ],
        kinds: &[MouseKind::Generic],
        config_ids: [0x00, 0x00],
        device_ack: Some(0xfa),
    };

    /// Look up a variant by its configuration name
    pub fn by_name(name: &str) -> Option<&'static Variant> {
        match name {
            "rt" => Some(&Variant::RT_PC),
            "ps2" => Some(&Variant::PS2),
            _ => None,
        }
    }

    /// Translate an operation; `None` if the variant has no such command
    pub fn command(&self, op: Op) -> Option<Command> {
        let t = &self.opcodes;
        let query = |byte| Some(Command::Single(WireStep::new(self.query_selector, byte)));
        let control = |byte| Some(Command::Single(WireStep::new(self.control_selector, byte)));

        match op {
            Op::Reset => query(t.reset),
            Op::ReadConfig => query(t.read_config),
            Op::ReadStatus => query(t.read_status),
            Op::ReadData => query(t.read_data),
            Op::Enable => control(t.enable),
            Op::Disable => control(t.disable),
            Op::Wrap(true) => control(t.wrap_on),
            Op::Wrap(false) => control(t.wrap_off),
            Op::Scaling(Scaling::Exponential) => control(t.scale_exp),
            Op::Scaling(Scaling::Linear) => control(t.scale_linear),
            Op::SampleRate(rate) => {
                let param = self.rate_param(rate)?;
                Some(self.parameterized(t.set_rate, param))
            }
            Op::Resolution(resolution) => {
                Some(self.parameterized(t.set_resolution, self.resolution_param(resolution)))
            }
            Op::Mode(mode) => match t.mode {
                ModeOpcodes::Parameter {
                    opcode,
                    stream,
                    remote,
                } => {
                    let param = match mode {
                        ReportMode::Stream => stream,
                        ReportMode::Remote => remote,
                    };
                    Some(self.parameterized(opcode, param))
                }
                ModeOpcodes::Direct { stream, remote } => match mode {
                    ReportMode::Stream => control(stream),
                    ReportMode::Remote => control(remote),
                },
            },
            Op::BlockMode(on) => {
                let a = self.adapter?;
                let byte = if on { a.block_on } else { a.block_off };
                Some(Command::Single(WireStep::new(a.ext_selector, byte)))
            }
            Op::LinkEnable => {
                let a = self.adapter?;
                Some(Command::Single(WireStep::new(a.ext_selector, a.uart_enable)))
            }
            Op::LinkBaud(divisor) => {
                let a = self.adapter?;
                Some(Command::Single(WireStep::new(a.baud_selector, divisor)))
            }
            Op::LinkFraming(framing) => {
                let a = self.adapter?;
                let byte = match framing {
                    Framing::Odd => a.frame_odd,
                    Framing::Even => a.frame_even,
                };
                Some(Command::Single(WireStep::new(a.framing_selector, byte)))
            }
        }
    }

    fn parameterized(&self, opcode: u8, param: u8) -> Command {
        if self.split_params {
            Command::Split {
                selector: self.control_selector,
                opcode,
                param,
            }
        } else {
            Command::Single(WireStep::with_param(self.control_selector, opcode, param))
        }
    }

    pub fn supports_rate(&self, rate: SampleRate) -> bool {
        self.rates.contains(&rate)
    }

    /// Wire parameter for a sample rate, if the variant supports it
    pub fn rate_param(&self, rate: SampleRate) -> Option<u8> {
        self.supports_rate(rate).then(|| rate.hz())
    }

    pub fn rate_from_param(&self, param: u8) -> Option<SampleRate> {
        SampleRate::from_hz(param).filter(|rate| self.supports_rate(*rate))
    }

    /// Wire code for a resolution in this variant's numbering
    pub fn resolution_param(&self, resolution: Resolution) -> u8 {
        self.resolutions
            .iter()
            .position(|r| *r == resolution)
            .unwrap_or(0) as u8
    }

    pub fn resolution_from_param(&self, code: u8) -> Option<Resolution> {
        self.resolutions.get(code as usize).copied()
    }

    /// Mode carried by a set-mode parameter byte
    pub fn mode_from_param(&self, param: u8) -> Option<ReportMode> {
        match self.opcodes.mode {
            ModeOpcodes::Parameter { stream, remote, .. } => {
                if param == stream {
                    Some(ReportMode::Stream)
                } else if param == remote {
                    Some(ReportMode::Remote)
                } else {
                    None
                }
            }
            ModeOpcodes::Direct { .. } => None,
        }
    }

    /// Number of bytes in a reset acknowledgment
    pub fn reset_ack_len(&self) -> usize {
        self.layout
            .encode(&ReportFrame::ResetAck(MouseKind::Generic))
            .as_bytes()
            .len()
    }

    /// Identify the mouse from its reset reply
    pub fn match_reset_ack(&self, reply: &[u8]) -> Option<MouseKind> {
        self.kinds.iter().copied().find(|kind| {
            self.layout
                .encode(&ReportFrame::ResetAck(*kind))
                .as_bytes()
                == reply
        })
    }

    /// Expected read-config reply for a mouse model
    pub fn config_id(&self, kind: MouseKind) -> u8 {
        match kind {
            MouseKind::Generic => self.config_ids[0],
            MouseKind::Optical => self.config_ids[1],
        }
    }

    /// Number of bytes in a status reply
    pub fn status_len(&self) -> usize {
        match self.layout {
            Layout::BitPacked => 4,
            Layout::ByteAligned => 3,
        }
    }

    /// Decode a command byte received by the emulator
    pub fn opcode(&self, byte: u8) -> Option<Opcode> {
        let t = &self.opcodes;
        let fixed = [
            (t.reset, Opcode::Reset),
            (t.read_config, Opcode::ReadConfig),
            (t.read_status, Opcode::ReadStatus),
            (t.read_data, Opcode::ReadData),
            (t.enable, Opcode::Enable),
            (t.disable, Opcode::Disable),
            (t.wrap_on, Opcode::WrapOn),
            (t.wrap_off, Opcode::WrapOff),
            (t.scale_exp, Opcode::Scaling(Scaling::Exponential)),
            (t.scale_linear, Opcode::Scaling(Scaling::Linear)),
            (t.set_rate, Opcode::SetRate),
            (t.set_resolution, Opcode::SetResolution),
        ];
        if let Some((_, op)) = fixed.iter().find(|(b, _)| *b == byte) {
            return Some(*op);
        }
        match t.mode {
            ModeOpcodes::Parameter { opcode, .. } if opcode == byte => Some(Opcode::SetMode),
            ModeOpcodes::Direct { stream, .. } if stream == byte => {
                Some(Opcode::Mode(ReportMode::Stream))
            }
            ModeOpcodes::Direct { remote, .. } if remote == byte => {
                Some(Opcode::Mode(ReportMode::Remote))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_divisor() {
        assert_eq!(baud_divisor(9600), Some(251));
        assert_eq!(baud_divisor(4800), Some(246));
        assert_eq!(baud_divisor(300), Some(96));
        assert_eq!(baud_divisor(19200), Some(254));
        assert_eq!(baud_divisor(50), None);
        assert_eq!(baud_divisor(0), None);
    }

    #[test]
    fn test_rt_two_step_commands() {
        let v = Variant::RT_PC;
        assert_eq!(
            v.command(Op::SampleRate(SampleRate::Hz40)),
            Some(Command::Split {
                selector: 0x03,
                opcode: 0x8a,
                param: 0x28
            })
        );
        assert_eq!(
            v.command(Op::Mode(ReportMode::Remote)),
            Some(Command::Split {
                selector: 0x03,
                opcode: 0x8d,
                param: 0x03
            })
        );
        assert_eq!(
            v.command(Op::Resolution(Resolution::Cpi100)),
            Some(Command::Split {
                selector: 0x03,
                opcode: 0x89,
                param: 0x01
            })
        );
        assert_eq!(v.command(Op::SampleRate(SampleRate::Hz200)), None);
    }

    #[test]
    fn test_rt_single_step_commands() {
        let v = Variant::RT_PC;
        assert_eq!(
            v.command(Op::Reset),
            Some(Command::Single(WireStep::new(0x04, 0x01)))
        );
        assert_eq!(
            v.command(Op::Enable),
            Some(Command::Single(WireStep::new(0x03, 0x08)))
        );
        assert_eq!(
            v.command(Op::BlockMode(true)),
            Some(Command::Single(WireStep::new(0x00, 0x35)))
        );
        assert_eq!(
            v.command(Op::LinkFraming(Framing::Odd)),
            Some(Command::Single(WireStep::new(0x06, 0x84)))
        );
    }

    #[test]
    fn test_ps2_commands() {
        let v = Variant::PS2;
        assert_eq!(
            v.command(Op::SampleRate(SampleRate::Hz200)),
            Some(Command::Single(WireStep::with_param(0x00, 0xf3, 200)))
        );
        assert_eq!(
            v.command(Op::Resolution(Resolution::Cpi100)),
            Some(Command::Single(WireStep::with_param(0x00, 0xe8, 0x02)))
        );
        assert_eq!(
            v.command(Op::Mode(ReportMode::Remote)),
            Some(Command::Single(WireStep::new(0x00, 0xf0)))
        );
        assert_eq!(v.command(Op::BlockMode(true)), None);
        assert_eq!(v.command(Op::LinkEnable), None);
    }

    #[test]
    fn test_reset_ack_matching() {
        let v = Variant::RT_PC;
        assert_eq!(v.reset_ack_len(), 4);
        assert_eq!(v.match_reset_ack(&[0xff, 0x08, 0, 0]), Some(MouseKind::Generic));
        assert_eq!(v.match_reset_ack(&[0xff, 0x04, 0, 0]), Some(MouseKind::Optical));
        assert_eq!(v.match_reset_ack(&[0xff, 0x00, 0, 0]), None);
        assert_eq!(v.config_id(MouseKind::Optical), 0x10);

        let v = Variant::PS2;
        assert_eq!(v.reset_ack_len(), 2);
        assert_eq!(v.match_reset_ack(&[0xaa, 0x00]), Some(MouseKind::Generic));
        assert_eq!(v.match_reset_ack(&[0xfc, 0x00]), None);
    }

    #[test]
    fn test_opcode_decode() {
        let v = Variant::RT_PC;
        assert_eq!(v.opcode(0x8d), Some(Opcode::SetMode));
        assert_eq!(v.opcode(0x78), Some(Opcode::Scaling(Scaling::Exponential)));
        assert_eq!(v.opcode(0x42), None);
        assert_eq!(v.mode_from_param(0x03), Some(ReportMode::Remote));
        assert_eq!(v.mode_from_param(0x07), None);

        let v = Variant::PS2;
        assert_eq!(v.opcode(0xf0), Some(Opcode::Mode(ReportMode::Remote)));
        assert_eq!(v.opcode(0xe9), Some(Opcode::ReadStatus));
        assert!(Opcode::SetRate.takes_param());
        assert!(!Opcode::Reset.takes_param());
    }

    #[test]
    fn test_resolution_numbering() {
        assert_eq!(Variant::RT_PC.resolution_param(Resolution::Cpi200), 0);
        assert_eq!(Variant::PS2.resolution_param(Resolution::Cpi200), 3);
        assert_eq!(Variant::PS2.resolution_from_param(0), Some(Resolution::Cpi25));
        assert_eq!(Variant::PS2.rate_from_param(200), Some(SampleRate::Hz200));
        assert_eq!(Variant::RT_PC.rate_from_param(200), None);
    }
}
