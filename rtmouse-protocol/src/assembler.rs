//! Reassembly of unsolicited reports from the receive byte stream.

use heapless::Vec;

use crate::report::{DecodeError, Layout, ReportFrame, MAX_FRAME_LEN};

/// Accumulates fixed-length frames for one layout
///
/// A frame may only start on a byte matching the layout's sync pattern; any
/// byte continues a partially filled frame. Bytes seen while idle that are not
/// sync bytes are dropped.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    layout: Layout,
    buffer: Vec<u8, MAX_FRAME_LEN>,
}

impl ReportAssembler {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            buffer: Vec::new(),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Whether a frame is partially assembled
    pub fn in_frame(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Feed a single received byte
    ///
    /// Returns `Ok(Some(frame))` when a frame completes and decodes,
    /// `Ok(None)` when more bytes are needed or the byte was discarded, and
    /// `Err` when a complete frame failed validation. The buffer is reset in
    /// both terminal cases.
    pub fn feed(&mut self, byte: u8) -> Result<Option<ReportFrame>, DecodeError> {
        if self.buffer.is_empty() && !self.layout.is_sync(byte) {
            return Ok(None);
        }

        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            return Err(DecodeError::Length);
        }

        if self.buffer.len() < self.layout.frame_len() {
            return Ok(None);
        }

        let result = self.layout.decode(&self.buffer);
        self.buffer.clear();
        result.map(Some)
    }

    /// Feed several bytes, returning the first complete frame
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<ReportFrame>, DecodeError> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Buttons, Movement};

    fn collect(assembler: &mut ReportAssembler, bytes: &[u8]) -> (usize, usize) {
        let mut frames = 0;
        let mut errors = 0;
        for &b in bytes {
            match assembler.feed(b) {
                Ok(Some(_)) => frames += 1,
                Ok(None) => {}
                Err(_) => errors += 1,
            }
        }
        (frames, errors)
    }

    #[test]
    fn test_noise_then_frame_yields_one_frame() {
        let mut assembler = ReportAssembler::new(Layout::BitPacked);
        let noise = [0x00, 0x12, 0x20, 0x7f, 0x01];
        for b in noise {
            assert_eq!(assembler.feed(b), Ok(None));
        }
        assert!(!assembler.in_frame());

        let mut frames = 0;
        for b in [0x0b, 0x20, 0x03, 0x04] {
            if let Some(frame) = assembler.feed(b).unwrap() {
                assert_eq!(
                    frame,
                    ReportFrame::Movement(Movement::new(Buttons::LEFT, 3, 4))
                );
                frames += 1;
            }
        }
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_continuation_bytes_not_checked_for_sync() {
        let mut assembler = ReportAssembler::new(Layout::ByteAligned);
        // 0x00 would not start a frame but is a valid delta
        let (frames, errors) = collect(&mut assembler, &[0x08, 0x00, 0x00]);
        assert_eq!((frames, errors), (1, 0));
    }

    #[test]
    fn test_malformed_frame_is_discarded() {
        let mut assembler = ReportAssembler::new(Layout::BitPacked);
        assert_eq!(
            assembler.feed_bytes(&[0x0b, 0x01, 0x00, 0x00]),
            Err(DecodeError::Malformed)
        );
        assert!(!assembler.in_frame());
        let frame = assembler.feed_bytes(&[0x0b, 0x00, 0x01, 0x00]).unwrap();
        assert!(frame.is_some());
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let mut assembler = ReportAssembler::new(Layout::BitPacked);
        assembler.feed_bytes(&[0x0b, 0x00]).unwrap();
        assert!(assembler.in_frame());
        assembler.reset();
        assert_eq!(assembler.feed(0x00), Ok(None));
        assert!(!assembler.in_frame());
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut assembler = ReportAssembler::new(Layout::ByteAligned);
        let bytes = [0x09, 0x01, 0x01, 0x0a, 0xff, 0x02];
        let (frames, errors) = collect(&mut assembler, &bytes);
        assert_eq!((frames, errors), (2, 0));
    }
}
