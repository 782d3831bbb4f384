//! rtmouse - RT PC mouse emulator firmware
//!
//! Presents an IBM RT PC (or PS/2) mouse to a host on one UART while taking
//! pointer reports from a USB-host bridge on the other.
//!
//! Wiring:
//! - UART1 (GPIO8 TX, GPIO9 RX): mouse line to the host, via a level shifter
//! - UART0 (GPIO0 TX, GPIO1 RX): bridge from the USB-host helper

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{UART0, UART1};
use embassy_rp::uart::{BufferedInterruptHandler, InterruptHandler as UartInterruptHandler, Uart};
use embassy_time::{Instant, Timer};
use portable_atomic::Ordering;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use rtmouse_core::config::{parse_config, EmulatorConfig};
use rtmouse_hal_rp2040::uart::{line_config, LinkRx, LinkTx};

use crate::bridge::BridgeSource;
use crate::channels::BRIDGE_LAST_SEEN_MS;

/// Embedded configuration (compiled into firmware)
/// Edit emulator.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../emulator.toml");

/// Bridge silence after which the main loop complains
const BRIDGE_QUIET_MS: u32 = 5_000;

mod bridge;
mod channels;
mod tasks;
mod timer;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => UartInterruptHandler<UART1>;
});

// Static cells for bridge UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("rtmouse emulator starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();
    debug!("Configuration: {:?}", config);

    // Mouse line
    let link = Uart::new(
        p.UART1,
        p.PIN_8,
        p.PIN_9,
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        line_config(&config.link.uart()),
    );
    let (link_tx, link_rx) = link.split();
    info!(
        "Mouse line on UART1: {} baud, {:?} parity",
        config.link.baud, config.link.parity
    );

    // Bridge
    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let bridge = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, line_config(&config.bridge.uart()));
    let bridge = bridge.into_buffered(Irqs, tx_buf, rx_buf);
    let (_bridge_tx, bridge_rx) = bridge.split();
    info!("Bridge on UART0: {} baud", config.bridge.baud);

    spawner.spawn(tasks::link_rx_task(LinkRx::new(link_rx))).unwrap();
    spawner
        .spawn(tasks::bridge_rx_task(BridgeSource::new(bridge_rx)))
        .unwrap();
    spawner
        .spawn(tasks::mouse_task(LinkTx::new(link_tx), config))
        .unwrap();

    info!("All tasks spawned, emulator running");

    loop {
        Timer::after_millis(BRIDGE_QUIET_MS as u64).await;

        let now = Instant::now().as_millis() as u32;
        let last = BRIDGE_LAST_SEEN_MS.load(Ordering::Relaxed);
        if now.wrapping_sub(last) > BRIDGE_QUIET_MS {
            warn!("No bridge traffic for {} ms", now.wrapping_sub(last));
        } else {
            trace!("Main loop heartbeat");
        }
    }
}

fn load_config() -> EmulatorConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default configuration");
            EmulatorConfig::default()
        }
    }
}
