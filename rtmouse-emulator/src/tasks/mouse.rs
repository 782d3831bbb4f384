//! Emulated mouse task
//!
//! Owns the peripheral emulator and the transmit half of the mouse line.
//! Interleaves host commands, pointer reports, sample ticks and the
//! disambiguator timer.

use defmt::*;
use embassy_futures::select::{select4, Either4};
use embassy_time::{Duration, Ticker};

use rtmouse_core::config::EmulatorConfig;
use rtmouse_core::discipline::Discipline;
use rtmouse_core::emulator::{Handled, Peripheral};
use rtmouse_hal_rp2040::uart::LinkTx;
use rtmouse_protocol::{Movement, Opcode};

use crate::channels::{COMMAND_CHANNEL, POINTER_CHANNEL};
use crate::timer::{wait_deadline, DeadlineTimer};

type Mouse = Peripheral<LinkTx<'static>>;

fn sample_ticker(period_ms: u32) -> Ticker {
    Ticker::every(Duration::from_millis(period_ms as u64))
}

#[embassy_executor::task]
pub async fn mouse_task(tx: LinkTx<'static>, config: EmulatorConfig) {
    let variant = config.link.protocol.variant();
    let mut mouse = Peripheral::new(tx, variant, &config.mouse);
    let mut discipline = config
        .mouse
        .chord_middle
        .then(|| Discipline::new(config.mouse.buttons, DeadlineTimer::new()));

    let mut period = mouse.sample_period_ms();
    let mut ticker = sample_ticker(period);

    info!(
        "Mouse task started ({} variant, {} ms sample period, chording {})",
        variant.name,
        period,
        discipline.is_some()
    );

    loop {
        let deadline = discipline.as_mut().and_then(|d| d.timer().deadline());

        match select4(
            COMMAND_CHANNEL.receive(),
            POINTER_CHANNEL.receive(),
            ticker.next(),
            wait_deadline(deadline),
        )
        .await
        {
            Either4::First(byte) => {
                match mouse.on_command_byte(byte) {
                    Ok(Handled::Ignored) => debug!("Ignoring byte {=u8:#04x}", byte),
                    Ok(handled) => {
                        debug!("Host command: {:?}", handled);
                        if handled == Handled::Command(Opcode::Reset) {
                            if let Some(d) = discipline.as_mut() {
                                d.reset();
                            }
                        }
                    }
                    Err(e) => warn!("Link write failed: {:?}", e),
                }

                if mouse.sample_period_ms() != period {
                    period = mouse.sample_period_ms();
                    ticker = sample_ticker(period);
                    debug!("Sample period now {} ms", period);
                }
            }
            Either4::Second(report) => {
                let movement = report.to_movement(config.mouse.invert_y);
                match discipline.as_mut() {
                    Some(d) => {
                        let delivery = d.on_report(movement);
                        deliver(&mut mouse, &delivery);
                    }
                    None => mouse.on_movement(movement),
                }
            }
            Either4::Third(()) => {
                if let Err(e) = mouse.on_sample_tick() {
                    warn!("Report write failed: {:?}", e);
                }
            }
            Either4::Fourth(()) => {
                if let Some(d) = discipline.as_mut() {
                    d.timer().clear();
                    if let Some(movement) = d.on_timer() {
                        mouse.on_movement(movement);
                    }
                }
            }
        }
    }
}

/// Hand released reports to the emulator
///
/// All but the last are streamed straight away so a replayed press is not
/// overwritten by the release that follows it.
fn deliver(mouse: &mut Mouse, movements: &[Movement]) {
    let Some((last, earlier)) = movements.split_last() else {
        return;
    };
    for movement in earlier {
        mouse.on_movement(*movement);
        if let Err(e) = mouse.on_sample_tick() {
            warn!("Report write failed: {:?}", e);
        }
    }
    mouse.on_movement(*last);
}
