//! [`Transport`] over an async SPI device.
//!
//! The slave is a plain SPI peripheral: one chip-select assertion, three bytes
//! clocked out while three bytes are clocked in. Chip-select handling is left
//! to the `SpiDevice` implementation (e.g. `embedded_hal_bus::spi::ExclusiveDevice`).

use embedded_hal_async::spi::SpiDevice;
use log::error;

use crate::acquisition::{Transport, TransportError};
use crate::protocol::{ControlFrame, FRAME_LEN, StatusFrame};

pub struct SpiTransport<D> {
    device: D,
}

impl<D: SpiDevice<u8>> SpiTransport<D> {
    pub const fn new(device: D) -> Self {
        Self { device }
    }

    pub fn release(self) -> D {
        self.device
    }
}

impl<D: SpiDevice<u8>> Transport for SpiTransport<D> {
    async fn exchange(&mut self, frame: ControlFrame) -> Result<StatusFrame, TransportError> {
        let mut buf: [u8; FRAME_LEN] = frame.as_bytes();
        self.device.transfer_in_place(&mut buf).await.map_err(|e| {
            error!("SPI transfer failed: {:?}", e);
            TransportError::Bus {
                operation: "full-duplex transfer",
            }
        })?;
        Ok(StatusFrame::from_bytes(buf))
    }
}
