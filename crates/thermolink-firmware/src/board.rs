//! Pin and bus setup for the slave link.
//!
//! | signal | GPIO |
//! |--------|------|
//! | SCK    | 12   |
//! | MOSI   | 11   |
//! | MISO   | 13   |
//! | CS     | 10   |

use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::Async;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::peripherals::{GPIO10, GPIO11, GPIO12, GPIO13, SPI2};
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config, Spi};
use esp_hal::time::Rate;
use log::{error, info};

use crate::error::InitError;

/// The slave is clocked at 1 MHz in mode 0.
const SLAVE_SPI_FREQUENCY_KHZ: u32 = 1000;

pub type SlaveSpi = ExclusiveDevice<Spi<'static, Async>, Output<'static>, NoDelay>;

/// Configure SPI2 as master for the slave link.
pub fn init_slave_spi(
    spi: SPI2<'static>,
    sck: GPIO12<'static>,
    mosi: GPIO11<'static>,
    miso: GPIO13<'static>,
    cs: GPIO10<'static>,
) -> Result<SlaveSpi, InitError> {
    let config = Config::default()
        .with_frequency(Rate::from_khz(SLAVE_SPI_FREQUENCY_KHZ))
        .with_mode(Mode::_0);

    let bus = Spi::new(spi, config)
        .map_err(|e| {
            error!("SPI2 configuration failed: {:?}", e);
            InitError::SpiConfig
        })?
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso)
        .into_async();

    let cs = Output::new(cs, Level::High, OutputConfig::default());
    let device = ExclusiveDevice::new_no_delay(bus, cs).map_err(|_| InitError::SpiConfig)?;

    info!("Slave SPI ready ({} kHz, mode 0)", SLAVE_SPI_FREQUENCY_KHZ);
    Ok(device)
}
