//! Pointer source fed by the USB-host bridge
//!
//! The bridge UART carries framed messages; only pointer reports are handed
//! on. Pings and bad frames are logged and skipped.

use defmt::*;
use embassy_time::Instant;
use embedded_io_async::Read;
use portable_atomic::Ordering;

use rtmouse_core::traits::PointerSource;
use rtmouse_protocol::{BridgeDecoder, BridgeMessage, PointerReport};

use crate::channels::BRIDGE_LAST_SEEN_MS;

pub struct BridgeSource<R> {
    rx: R,
    decoder: BridgeDecoder,
}

impl<R: Read> BridgeSource<R> {
    pub fn new(rx: R) -> Self {
        Self {
            rx,
            decoder: BridgeDecoder::new(),
        }
    }

    /// Next complete frame's message, one byte at a time so nothing is lost
    /// if the caller stops waiting
    async fn next_message(&mut self) -> BridgeMessage {
        let mut byte = [0u8; 1];
        loop {
            match self.rx.read(&mut byte).await {
                Ok(1) => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("Bridge read error: {:?}", Debug2Format(&e));
                    continue;
                }
            }
            trace!("Bridge RX {=u8:#04x}", byte[0]);

            match self.decoder.feed(byte[0]) {
                Ok(Some(msg)) => {
                    BRIDGE_LAST_SEEN_MS.store(Instant::now().as_millis() as u32, Ordering::Relaxed);
                    return msg;
                }
                Ok(None) => {}
                Err(e) => warn!("Bad bridge frame: {:?}", e),
            }
        }
    }
}

impl<R: Read> PointerSource for BridgeSource<R> {
    async fn next_report(&mut self) -> PointerReport {
        loop {
            match self.next_message().await {
                BridgeMessage::Pointer(report) => return report,
                BridgeMessage::Ping => trace!("Bridge ping"),
            }
        }
    }
}
