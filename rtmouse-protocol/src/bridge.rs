//! Pointer bridge framing.
//!
//! The emulator receives pointer reports from a USB-host helper over a plain
//! UART. Every message is framed:
//!
//! - START (1 byte): 0xAA synchronization byte
//! - LENGTH (1 byte): payload length (0-32)
//! - TYPE (1 byte): message type identifier
//! - PAYLOAD (0-32 bytes): postcard-encoded message body
//! - CHECKSUM (1 byte): XOR of LENGTH, TYPE, and all PAYLOAD bytes

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::report::{Buttons, Movement};

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xAA;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 32;

/// START + LENGTH + TYPE + MAX_PAYLOAD + CHECKSUM
pub const MAX_FRAME_SIZE: usize = 1 + 1 + 1 + MAX_PAYLOAD_SIZE + 1;

/// Pointer report from the USB side
pub const MSG_POINTER: u8 = 0x01;
/// Liveness ping from the USB side, no payload
pub const MSG_PING: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError {
    PayloadTooLarge,
    InvalidChecksum,
    InvalidFrame,
    BufferTooSmall,
    UnknownType(u8),
    /// Payload did not decode as the message body
    Payload,
}

/// A generic pointer report, USB boot-protocol conventions
///
/// `dy` is positive towards the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PointerReport {
    pub buttons: u8,
    pub dx: i16,
    pub dy: i16,
}

impl PointerReport {
    pub fn buttons(&self) -> Buttons {
        Buttons::from_bits(self.buttons)
    }

    /// Convert to a mouse-protocol movement, optionally flipping Y
    pub fn to_movement(&self, invert_y: bool) -> Movement {
        let dy = if invert_y {
            self.dy.saturating_neg()
        } else {
            self.dy
        };
        Movement::new(self.buttons(), self.dx, dy)
    }
}

/// Messages carried by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeMessage {
    Pointer(PointerReport),
    Ping,
}

impl BridgeMessage {
    fn kind(&self) -> u8 {
        match self {
            BridgeMessage::Pointer(_) => MSG_POINTER,
            BridgeMessage::Ping => MSG_PING,
        }
    }

    /// Write this message as one complete frame, returning its length
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, BridgeError> {
        if out.len() < FRAME_OVERHEAD {
            return Err(BridgeError::BufferTooSmall);
        }
        let body_end = out.len() - 1;
        let used = match self {
            BridgeMessage::Pointer(report) => postcard::to_slice(report, &mut out[3..body_end])
                .map_err(|_| BridgeError::BufferTooSmall)?
                .len(),
            BridgeMessage::Ping => 0,
        };
        if used > MAX_PAYLOAD_SIZE {
            return Err(BridgeError::PayloadTooLarge);
        }

        out[0] = FRAME_START;
        out[1] = used as u8;
        out[2] = self.kind();
        out[3 + used] = checksum(&out[1..3 + used]);
        Ok(FRAME_OVERHEAD + used)
    }

    fn decode(kind: u8, payload: &[u8]) -> Result<Self, BridgeError> {
        match kind {
            MSG_POINTER => postcard::from_bytes::<PointerReport>(payload)
                .map(BridgeMessage::Pointer)
                .map_err(|_| BridgeError::Payload),
            MSG_PING => Ok(BridgeMessage::Ping),
            other => Err(BridgeError::UnknownType(other)),
        }
    }
}

/// START + LENGTH + TYPE + CHECKSUM
const FRAME_OVERHEAD: usize = 4;

/// XOR over LENGTH, TYPE and PAYLOAD
fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Incremental decoder for the bridge byte stream
///
/// Bytes outside a frame are skipped until the next START. A frame is
/// buffered whole (START excluded) and checked once its declared length
/// has arrived.
#[derive(Debug, Clone, Default)]
pub struct BridgeDecoder {
    frame: Vec<u8, { MAX_FRAME_SIZE - 1 }>,
    in_frame: bool,
}

impl BridgeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.frame.clear();
        self.in_frame = false;
    }

    /// Feed one byte; yields a message when it completes a valid frame
    pub fn feed(&mut self, byte: u8) -> Result<Option<BridgeMessage>, BridgeError> {
        if !self.in_frame {
            self.in_frame = byte == FRAME_START;
            return Ok(None);
        }

        // LENGTH was bounded below, so the frame always fits
        let _ = self.frame.push(byte);
        let declared = self.frame[0] as usize;
        if declared > MAX_PAYLOAD_SIZE {
            self.reset();
            return Err(BridgeError::InvalidFrame);
        }
        if self.frame.len() < declared + FRAME_OVERHEAD - 1 {
            return Ok(None);
        }

        let (body, sum) = self.frame.split_at(declared + 2);
        let result = if checksum(body) == sum[0] {
            BridgeMessage::decode(body[1], &body[2..]).map(Some)
        } else {
            Err(BridgeError::InvalidChecksum)
        };
        self.reset();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(msg: &BridgeMessage) -> std::vec::Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = msg.encode(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    fn decode_all(decoder: &mut BridgeDecoder, bytes: &[u8]) -> std::vec::Vec<Result<BridgeMessage, BridgeError>> {
        bytes
            .iter()
            .filter_map(|&b| decoder.feed(b).transpose())
            .collect()
    }

    #[test]
    fn test_ping_frame_bytes() {
        assert_eq!(encoded(&BridgeMessage::Ping), [FRAME_START, 0, MSG_PING, MSG_PING]);
    }

    #[test]
    fn test_pointer_message_through_decoder() {
        let msg = BridgeMessage::Pointer(PointerReport {
            buttons: 0x01,
            dx: -300,
            dy: 12,
        });
        let mut decoder = BridgeDecoder::new();
        assert_eq!(decode_all(&mut decoder, &encoded(&msg)), [Ok(msg)]);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let msg = BridgeMessage::Pointer(PointerReport::default());
        assert_eq!(msg.encode(&mut [0u8; 3]), Err(BridgeError::BufferTooSmall));
        assert_eq!(msg.encode(&mut [0u8; 5]), Err(BridgeError::BufferTooSmall));
        assert_eq!(BridgeMessage::Ping.encode(&mut [0u8; 4]), Ok(4));
    }

    #[test]
    fn test_decoder_invalid_checksum() {
        let mut bytes = encoded(&BridgeMessage::Ping);
        *bytes.last_mut().unwrap() ^= 0xFF;

        let mut decoder = BridgeDecoder::new();
        assert_eq!(decode_all(&mut decoder, &bytes), [Err(BridgeError::InvalidChecksum)]);
        assert_eq!(decode_all(&mut decoder, &encoded(&BridgeMessage::Ping)), [Ok(BridgeMessage::Ping)]);
    }

    #[test]
    fn test_decoder_resync_after_garbage() {
        let mut data = vec![0x00, 0xFF, 0x12, 0x34];
        data.extend(encoded(&BridgeMessage::Ping));

        let mut decoder = BridgeDecoder::new();
        assert_eq!(decode_all(&mut decoder, &data), [Ok(BridgeMessage::Ping)]);
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut decoder = BridgeDecoder::new();
        assert_eq!(decoder.feed(FRAME_START), Ok(None));
        assert_eq!(decoder.feed(0xff), Err(BridgeError::InvalidFrame));
        assert_eq!(decoder.feed(0x00), Ok(None));
    }

    #[test]
    fn test_unknown_type() {
        let mut decoder = BridgeDecoder::new();
        let frame = [FRAME_START, 0, 0x42, 0x42];
        assert_eq!(decode_all(&mut decoder, &frame), [Err(BridgeError::UnknownType(0x42))]);
    }

    #[test]
    fn test_truncated_pointer_payload() {
        let mut decoder = BridgeDecoder::new();
        let frame = [FRAME_START, 1, MSG_POINTER, 0x01, 1 ^ MSG_POINTER ^ 0x01];
        assert_eq!(decode_all(&mut decoder, &frame), [Err(BridgeError::Payload)]);
    }

    #[test]
    fn test_pointer_to_movement_inverts_y() {
        let report = PointerReport {
            buttons: 0x0f,
            dx: 3,
            dy: 5,
        };
        let m = report.to_movement(true);
        assert_eq!((m.dx, m.dy), (3, -5));
        assert_eq!(m.buttons, Buttons::from_bits(0x07));
        assert_eq!(report.to_movement(false).dy, 5);
    }

    proptest! {
        #[test]
        fn prop_pointer_frames_survive_decoder(buttons in any::<u8>(), dx in any::<i16>(), dy in any::<i16>()) {
            let msg = BridgeMessage::Pointer(PointerReport { buttons, dx, dy });
            let mut decoder = BridgeDecoder::new();
            prop_assert_eq!(decode_all(&mut decoder, &encoded(&msg)), [Ok(msg)]);
        }
    }
}
