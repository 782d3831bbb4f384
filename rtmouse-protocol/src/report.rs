//! Report frames and the two wire layouts.
//!
//! Bit-packed layout (RT PC, 4 bytes):
//! ```text
//!          7     6     5     4     3     2     1     0
//! byte 0 ┌─────────────────────────────────────────────┐ 0x0b movement
//!        │                    tag                      │ 0xff reset
//!        └─────────────────────────────────────────────┘ 0x61 | bits status
//! byte 1 │ R   │ M   │ L   │ 0   │ rst │ xs  │ ys  │ 0  │
//! byte 2 │ 0   │            X magnitude (7 bits)        │
//! byte 3 │ 0   │            Y magnitude (7 bits)        │
//! ```
//!
//! Byte-aligned layout (PS/2, 3 bytes):
//! ```text
//! byte 0 │ yov │ xov │ ys  │ xs  │ 1   │ M   │ R   │ L  │
//! byte 1 │            X delta, two's complement        │
//! byte 2 │            Y delta, two's complement        │
//! ```
//!
//! Both layouts carry deltas in `-128..=127`. Encoding saturates.

use core::ops::BitOr;

use crate::settings::{MouseKind, ReportMode, Scaling};

/// Largest frame on either layout
pub const MAX_FRAME_LEN: usize = 4;

/// Bit-packed movement tag
pub const DATA_TAG: u8 = 0x0b;
/// Bit-packed reset acknowledgment tag
pub const RESET_TAG: u8 = 0xff;
/// Bit-packed status tag (ready bit and flag bits clear)
pub const STATUS_TAG: u8 = 0x61;

const STATUS_TAG_MASK: u8 = 0x71;
const STATUS_READY: u8 = 0x80;
const STATUS_LINEAR: u8 = 0x08;
const STATUS_DISABLED: u8 = 0x04;
const STATUS_REMOTE: u8 = 0x02;

const RT_RIGHT: u8 = 0x80;
const RT_MIDDLE: u8 = 0x40;
const RT_LEFT: u8 = 0x20;
const RT_RESET_GENERIC: u8 = 0x08;
const RT_RESET_OPTICAL: u8 = 0x04;
const RT_XSIGN: u8 = 0x04;
const RT_YSIGN: u8 = 0x02;
const RT_FLAGS_RESERVED: u8 = 0x19;
const RT_MAGNITUDE: u8 = 0x7f;
const RT_SIGN_EXTEND: u8 = !RT_MAGNITUDE;

const PS2_SYNC: u8 = 0x08;
const PS2_XSIGN: u8 = 0x10;
const PS2_YSIGN: u8 = 0x20;
const PS2_XOVERFLOW: u8 = 0x40;
const PS2_YOVERFLOW: u8 = 0x80;
const PS2_STATUS_RIGHT: u8 = 0x01;
const PS2_STATUS_MIDDLE: u8 = 0x02;
const PS2_STATUS_LEFT: u8 = 0x04;
const PS2_STATUS_RESERVED: u8 = 0x88;
const PS2_STATUS_SCALING: u8 = 0x10;
const PS2_STATUS_ENABLED: u8 = 0x20;
const PS2_STATUS_REMOTE: u8 = 0x40;

/// PS/2 self-test passed, followed by the device id
pub const PS2_RESET_ACK: [u8; 2] = [0xaa, 0x00];

/// Logical button set
///
/// Bits follow the USB boot-protocol order, which is also the PS/2 data
/// report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(u8);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);
    pub const LEFT: Buttons = Buttons(0x01);
    pub const RIGHT: Buttons = Buttons(0x02);
    pub const MIDDLE: Buttons = Buttons(0x04);
    /// Left and right together, the chord folded into a middle click
    pub const BOTH: Buttons = Buttons(0x03);

    /// Build from a boot-protocol bitmask; extra buttons are ignored
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x07)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Buttons;

    fn bitor(self, rhs: Buttons) -> Buttons {
        Buttons(self.0 | rhs.0)
    }
}

/// Relative movement report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Movement {
    pub buttons: Buttons,
    /// Positive to the right
    pub dx: i16,
    /// Positive away from the user
    pub dy: i16,
}

impl Movement {
    pub const fn new(buttons: Buttons, dx: i16, dy: i16) -> Self {
        Self { buttons, dx, dy }
    }
}

/// Device status as answered to a status request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub buttons: Buttons,
    pub enabled: bool,
    pub scaling: Scaling,
    pub mode: ReportMode,
    /// Resolution code in the variant's own numbering
    pub resolution: u8,
    /// Sample rate wire value
    pub sample_rate: u8,
}

/// A decoded report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportFrame {
    Movement(Movement),
    Status(StatusReport),
    ResetAck(MouseKind),
}

/// Errors from decoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Wrong number of bytes for the layout
    Length,
    /// Leading byte is not a known tag
    UnknownTag(u8),
    /// A reserved bit was set or the acknowledgment was not recognized
    Malformed,
}

/// Encoded frame, at most [`MAX_FRAME_LEN`] bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WireFrame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl WireFrame {
    fn new(bytes: &[u8]) -> Self {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = bytes.len().min(MAX_FRAME_LEN);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { bytes: buf, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Clamp a delta into one signed byte, reporting whether it had to clamp
pub fn saturate(delta: i16) -> (i8, bool) {
    let clamped = delta.clamp(i8::MIN as i16, i8::MAX as i16);
    (clamped as i8, clamped != delta)
}

/// Report layout on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Layout {
    /// RT PC 4-byte layout with 7-bit magnitudes and separate sign bits
    BitPacked,
    /// PS/2 3-byte layout with 8-bit two's-complement deltas
    ByteAligned,
}

impl Layout {
    /// Length of an unsolicited report frame
    pub const fn frame_len(self) -> usize {
        match self {
            Layout::BitPacked => 4,
            Layout::ByteAligned => 3,
        }
    }

    /// Whether `byte` may start an unsolicited report
    pub fn is_sync(self, byte: u8) -> bool {
        match self {
            Layout::BitPacked => byte == DATA_TAG || byte == RESET_TAG || is_status_tag(byte),
            Layout::ByteAligned => byte & PS2_SYNC != 0,
        }
    }

    pub fn encode(self, frame: &ReportFrame) -> WireFrame {
        match self {
            Layout::BitPacked => encode_bit_packed(frame),
            Layout::ByteAligned => encode_byte_aligned(frame),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<ReportFrame, DecodeError> {
        match self {
            Layout::BitPacked => decode_bit_packed(bytes),
            Layout::ByteAligned => decode_byte_aligned(bytes),
        }
    }
}

fn is_status_tag(byte: u8) -> bool {
    byte != RESET_TAG && byte & STATUS_TAG_MASK == STATUS_TAG
}

fn rt_buttons(buttons: Buttons) -> u8 {
    let mut bits = 0;
    if buttons.contains(Buttons::LEFT) {
        bits |= RT_LEFT;
    }
    if buttons.contains(Buttons::RIGHT) {
        bits |= RT_RIGHT;
    }
    if buttons.contains(Buttons::MIDDLE) {
        bits |= RT_MIDDLE;
    }
    bits
}

fn buttons_from_rt(flags: u8) -> Buttons {
    let mut bits = 0;
    if flags & RT_LEFT != 0 {
        bits |= Buttons::LEFT.bits();
    }
    if flags & RT_RIGHT != 0 {
        bits |= Buttons::RIGHT.bits();
    }
    if flags & RT_MIDDLE != 0 {
        bits |= Buttons::MIDDLE.bits();
    }
    Buttons::from_bits(bits)
}

fn rt_axis(magnitude: u8, negative: bool) -> i16 {
    if negative {
        (magnitude | RT_SIGN_EXTEND) as i8 as i16
    } else {
        magnitude as i16
    }
}

fn encode_bit_packed(frame: &ReportFrame) -> WireFrame {
    match *frame {
        ReportFrame::Movement(m) => {
            let (dx, _) = saturate(m.dx);
            let (dy, _) = saturate(m.dy);
            let mut flags = rt_buttons(m.buttons);
            if dx < 0 {
                flags |= RT_XSIGN;
            }
            if dy < 0 {
                flags |= RT_YSIGN;
            }
            WireFrame::new(&[
                DATA_TAG,
                flags,
                dx as u8 & RT_MAGNITUDE,
                dy as u8 & RT_MAGNITUDE,
            ])
        }
        ReportFrame::Status(s) => {
            let mut tag = STATUS_TAG | STATUS_READY;
            if s.scaling == Scaling::Linear {
                tag |= STATUS_LINEAR;
            }
            if !s.enabled {
                tag |= STATUS_DISABLED;
            }
            if s.mode == ReportMode::Remote {
                tag |= STATUS_REMOTE;
            }
            WireFrame::new(&[
                tag,
                rt_buttons(s.buttons),
                s.resolution & RT_MAGNITUDE,
                s.sample_rate & RT_MAGNITUDE,
            ])
        }
        ReportFrame::ResetAck(kind) => {
            let flag = match kind {
                MouseKind::Generic => RT_RESET_GENERIC,
                MouseKind::Optical => RT_RESET_OPTICAL,
            };
            WireFrame::new(&[RESET_TAG, flag, 0, 0])
        }
    }
}

fn decode_bit_packed(bytes: &[u8]) -> Result<ReportFrame, DecodeError> {
    let [tag, flags, x, y] = match bytes {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => return Err(DecodeError::Length),
    };
    if (x | y) & !RT_MAGNITUDE != 0 {
        return Err(DecodeError::Malformed);
    }

    if tag == DATA_TAG {
        if flags & RT_FLAGS_RESERVED != 0 {
            return Err(DecodeError::Malformed);
        }
        return Ok(ReportFrame::Movement(Movement {
            buttons: buttons_from_rt(flags),
            dx: rt_axis(x, flags & RT_XSIGN != 0),
            dy: rt_axis(y, flags & RT_YSIGN != 0),
        }));
    }

    if tag == RESET_TAG {
        return match [flags, x, y] {
            [RT_RESET_GENERIC, 0, 0] => Ok(ReportFrame::ResetAck(MouseKind::Generic)),
            [RT_RESET_OPTICAL, 0, 0] => Ok(ReportFrame::ResetAck(MouseKind::Optical)),
            _ => Err(DecodeError::Malformed),
        };
    }

    if is_status_tag(tag) {
        return Ok(ReportFrame::Status(StatusReport {
            buttons: buttons_from_rt(flags),
            enabled: tag & STATUS_DISABLED == 0,
            scaling: if tag & STATUS_LINEAR != 0 {
                Scaling::Linear
            } else {
                Scaling::Exponential
            },
            mode: if tag & STATUS_REMOTE != 0 {
                ReportMode::Remote
            } else {
                ReportMode::Stream
            },
            resolution: x,
            sample_rate: y,
        }));
    }

    Err(DecodeError::UnknownTag(tag))
}

fn encode_byte_aligned(frame: &ReportFrame) -> WireFrame {
    match *frame {
        ReportFrame::Movement(m) => {
            let (dx, x_clamped) = saturate(m.dx);
            let (dy, y_clamped) = saturate(m.dy);
            let mut head = PS2_SYNC | m.buttons.bits();
            if dx < 0 {
                head |= PS2_XSIGN;
            }
            if dy < 0 {
                head |= PS2_YSIGN;
            }
            if x_clamped {
                head |= PS2_XOVERFLOW;
            }
            if y_clamped {
                head |= PS2_YOVERFLOW;
            }
            WireFrame::new(&[head, dx as u8, dy as u8])
        }
        ReportFrame::Status(s) => {
            let mut head = 0;
            if s.buttons.contains(Buttons::RIGHT) {
                head |= PS2_STATUS_RIGHT;
            }
            if s.buttons.contains(Buttons::MIDDLE) {
                head |= PS2_STATUS_MIDDLE;
            }
            if s.buttons.contains(Buttons::LEFT) {
                head |= PS2_STATUS_LEFT;
            }
            if s.scaling == Scaling::Exponential {
                head |= PS2_STATUS_SCALING;
            }
            if s.enabled {
                head |= PS2_STATUS_ENABLED;
            }
            if s.mode == ReportMode::Remote {
                head |= PS2_STATUS_REMOTE;
            }
            WireFrame::new(&[head, s.resolution, s.sample_rate])
        }
        ReportFrame::ResetAck(_) => WireFrame::new(&PS2_RESET_ACK),
    }
}

fn decode_byte_aligned(bytes: &[u8]) -> Result<ReportFrame, DecodeError> {
    let [head, x, y] = match bytes {
        [a, b, c] => [*a, *b, *c],
        [a, b] if [*a, *b] == PS2_RESET_ACK => {
            return Ok(ReportFrame::ResetAck(MouseKind::Generic))
        }
        [_, _] => return Err(DecodeError::Malformed),
        _ => return Err(DecodeError::Length),
    };

    if head & PS2_SYNC != 0 {
        return Ok(ReportFrame::Movement(Movement {
            buttons: Buttons::from_bits(head),
            dx: x as i8 as i16,
            dy: y as i8 as i16,
        }));
    }

    if head & PS2_STATUS_RESERVED != 0 {
        return Err(DecodeError::UnknownTag(head));
    }

    let mut buttons = Buttons::NONE;
    if head & PS2_STATUS_RIGHT != 0 {
        buttons = buttons | Buttons::RIGHT;
    }
    if head & PS2_STATUS_MIDDLE != 0 {
        buttons = buttons | Buttons::MIDDLE;
    }
    if head & PS2_STATUS_LEFT != 0 {
        buttons = buttons | Buttons::LEFT;
    }
    Ok(ReportFrame::Status(StatusReport {
        buttons,
        enabled: head & PS2_STATUS_ENABLED != 0,
        scaling: if head & PS2_STATUS_SCALING != 0 {
            Scaling::Exponential
        } else {
            Scaling::Linear
        },
        mode: if head & PS2_STATUS_REMOTE != 0 {
            ReportMode::Remote
        } else {
            ReportMode::Stream
        },
        resolution: x,
        sample_rate: y,
    }))
}
