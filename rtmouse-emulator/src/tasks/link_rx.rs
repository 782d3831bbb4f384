//! Mouse line receive task
//!
//! Forwards command bytes from the host to the mouse task.

use defmt::*;
use rtmouse_hal::UartRx;
use rtmouse_hal_rp2040::uart::LinkRx;

use crate::channels::COMMAND_CHANNEL;

#[embassy_executor::task]
pub async fn link_rx_task(mut rx: LinkRx<'static>) {
    info!("Link RX task started");

    loop {
        match rx.read_byte().await {
            Ok(byte) => {
                trace!("Host RX {=u8:#04x}", byte);
                if COMMAND_CHANNEL.try_send(byte).is_err() {
                    warn!("Command channel full, dropping {=u8:#04x}", byte);
                }
            }
            Err(e) => {
                warn!("Link read error: {:?}", e);
            }
        }
    }
}
