//! Wi-Fi station, network stack and the HTTP worker.
//!
//! Bring-up failures are logged and leave the device without HTTP; the
//! acquisition lane keeps running either way.

use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{info, warn};
use static_cell::StaticCell;

use thermolink_core::config::{Config, HttpConfig, InternetConfig};
use thermolink_core::http::{Router, serve_connection};

use crate::error::InitError;

const HTTP_RX_BUFFER: usize = 1024;
const HTTP_TX_BUFFER: usize = 1024;

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

pub fn spawn_wifi_and_http(
    spawner: &Spawner,
    wifi_peripheral: WIFI<'static>,
    config: Config<'static>,
    router: &'static Router<'static>,
) -> Result<(), InitError> {
    let radio = esp_radio::init().map_err(|e| {
        warn!("Wi-Fi radio init failed: {:?}", e);
        InitError::Radio
    })?;
    let radio = RADIO.init(radio);

    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi_peripheral, Default::default())
        .map_err(|e| {
            warn!("Wi-Fi driver init failed: {:?}", e);
            InitError::Wifi
        })?;

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner
        .spawn(wifi_task(controller, config.internet))
        .map_err(|_| InitError::Spawn { task: "wifi" })?;
    spawner
        .spawn(net_task(runner))
        .map_err(|_| InitError::Spawn { task: "net" })?;
    spawner
        .spawn(http_worker(stack, router, config.http))
        .map_err(|_| InitError::Spawn { task: "http" })?;

    Ok(())
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

#[embassy_executor::task]
async fn wifi_task(mut controller: WifiController<'static>, internet: InternetConfig<'static>) {
    info!("Wi-Fi task starting (ssid=\"{}\")", internet.ssid);

    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(internet.ssid.into())
                    .with_password(internet.password.into()),
            );
            if let Err(e) = controller.set_config(&client_config) {
                warn!("Wi-Fi set_config error: {:?}", e);
                Timer::after(Duration::from_secs(10)).await;
                continue;
            }
            info!("Starting Wi-Fi STA");
            if let Err(e) = controller.start_async().await {
                warn!("Wi-Fi start error: {:?}", e);
                Timer::after(Duration::from_secs(10)).await;
                continue;
            }
        }

        info!("Connecting to Wi-Fi SSID=\"{}\"", internet.ssid);
        match controller.connect_async().await {
            Ok(()) => {
                info!("Wi-Fi connected");
                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                warn!("Wi-Fi disconnected; will retry");
                Timer::after(Duration::from_secs(5)).await;
            }
            Err(e) => {
                warn!("Wi-Fi connect error: {:?}", e);
                Timer::after(Duration::from_secs(10)).await;
            }
        }
    }
}

/// Accepts one connection at a time on the configured port.
#[embassy_executor::task]
async fn http_worker(stack: Stack<'static>, router: &'static Router<'static>, http: HttpConfig) {
    let mut rx_buf = [0u8; HTTP_RX_BUFFER];
    let mut tx_buf = [0u8; HTTP_TX_BUFFER];

    stack.wait_config_up().await;
    if let Some(cfg) = stack.config_v4() {
        info!("Web server running at http://{}:{}", cfg.address.address(), http.port);
    }

    loop {
        stack.wait_config_up().await;

        let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(Duration::from_millis(http.request_timeout_ms)));

        match socket.accept(http.port).await {
            Ok(()) => {
                let mut conn = Connection(&mut socket);
                if let Err(e) = serve_connection(&mut conn, router).await {
                    warn!("HTTP connection error: {}", e);
                }
                socket.close();
                if let Err(e) = socket.flush().await {
                    warn!("HTTP close flush error: {:?}", e);
                }
            }
            Err(e) => {
                warn!("HTTP accept error: {:?}", e);
                Timer::after(Duration::from_millis(200)).await;
            }
        }

        socket.abort();
    }
}

/// Exposes a `TcpSocket` through the `embedded-io-async` traits the core
/// library is written against.
struct Connection<'s, 'b>(&'s mut TcpSocket<'b>);

impl ErrorType for Connection<'_, '_> {
    type Error = ErrorKind;
}

impl Read for Connection<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).await.map_err(|_| ErrorKind::ConnectionReset)
    }
}

impl Write for Connection<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).await.map_err(|_| ErrorKind::ConnectionReset)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().await.map_err(|_| ErrorKind::ConnectionReset)
    }
}
