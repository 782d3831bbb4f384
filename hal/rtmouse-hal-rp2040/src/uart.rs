//! Mouse line UART for RP2040
//!
//! RP2040 has two UART peripherals. The mouse line runs on one of them with
//! DMA; the halves are wrapped here so the protocol code only sees the
//! `rtmouse-hal` traits.

use embassy_rp::uart::{self, Async};

use rtmouse_hal::uart::{DataBits, Parity, StopBits, UartConfig};

/// Error from mouse line operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    Overrun,
    Break,
    Parity,
    Framing,
    Other,
}

impl From<uart::Error> for LinkError {
    fn from(e: uart::Error) -> Self {
        match e {
            uart::Error::Overrun => LinkError::Overrun,
            uart::Error::Break => LinkError::Break,
            uart::Error::Parity => LinkError::Parity,
            uart::Error::Framing => LinkError::Framing,
            _ => LinkError::Other,
        }
    }
}

/// Build the embassy-rp configuration for a HAL line configuration
pub fn line_config(cfg: &UartConfig) -> uart::Config {
    let mut out = uart::Config::default();
    out.baudrate = cfg.baudrate;
    out.data_bits = match cfg.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    out.parity = match cfg.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    out.stop_bits = match cfg.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    out
}

/// Transmit half of the mouse line
pub struct LinkTx<'d> {
    tx: uart::UartTx<'d, Async>,
}

impl<'d> LinkTx<'d> {
    pub fn new(tx: uart::UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl rtmouse_hal::UartTx for LinkTx<'_> {
    type Error = LinkError;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.tx.blocking_write(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        self.tx.blocking_flush()?;
        Ok(())
    }
}

/// Receive half of the mouse line
pub struct LinkRx<'d> {
    rx: uart::UartRx<'d, Async>,
}

impl<'d> LinkRx<'d> {
    pub fn new(rx: uart::UartRx<'d, Async>) -> Self {
        Self { rx }
    }
}

impl rtmouse_hal::UartRx for LinkRx<'_> {
    type Error = LinkError;

    async fn read(&mut self, buf: &mut [u8]) -> Result<(), LinkError> {
        self.rx.read(buf).await?;
        Ok(())
    }
}
