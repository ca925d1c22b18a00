#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use static_cell::StaticCell;

use thermolink_core::acquisition::AcquisitionLane;
use thermolink_core::http::Router;
use thermolink_core::registers::SharedRegisters;
use thermolink_core::spi_transport::SpiTransport;
use thermolink_firmware::board::{self, SlaveSpi};
use thermolink_firmware::{assets, config, net};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static REGISTERS: StaticCell<SharedRegisters> = StaticCell::new();
static ROUTER: StaticCell<Router<'static>> = StaticCell::new();

#[embassy_executor::task]
async fn acquisition_task(mut lane: AcquisitionLane<'static, SpiTransport<SlaveSpi>>) {
    lane.run().await
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    // esp-radio needs a heap
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let config = config::load();
    let (command_port, acquisition_port) = REGISTERS.init(SharedRegisters::new()).split();

    match board::init_slave_spi(
        peripherals.SPI2,
        peripherals.GPIO12,
        peripherals.GPIO11,
        peripherals.GPIO13,
        peripherals.GPIO10,
    ) {
        Ok(spi) => {
            let lane = AcquisitionLane::new(
                SpiTransport::new(spi),
                acquisition_port,
                config.acquisition,
            );
            if let Err(e) = spawner.spawn(acquisition_task(lane)) {
                error!("Failed to spawn acquisition task: {:?}", e);
            }
        }
        Err(e) => error!("Slave link unavailable, acquisition disabled: {}", e),
    }

    let router = ROUTER.init(Router::new(command_port, assets::ASSETS));
    match net::spawn_wifi_and_http(&spawner, peripherals.WIFI, config, router) {
        Ok(()) => info!("Network lane started"),
        Err(e) => warn!("Running without HTTP: {}", e),
    }

    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}
