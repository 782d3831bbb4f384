//! Bridge receive task
//!
//! Pulls pointer reports off the bridge UART and queues them for the mouse
//! task.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;

use rtmouse_core::traits::PointerSource;

use crate::bridge::BridgeSource;
use crate::channels::POINTER_CHANNEL;

#[embassy_executor::task]
pub async fn bridge_rx_task(mut source: BridgeSource<BufferedUartRx>) {
    info!("Bridge RX task started");

    loop {
        let report = source.next_report().await;
        trace!("Pointer report: {:?}", report);
        if POINTER_CHANNEL.try_send(report).is_err() {
            warn!("Pointer channel full, dropping report");
        }
    }
}
