//! Desktop simulator for the thermolink bridge.
//!
//! Runs the real acquisition lane against a simulated slave and serves the
//! real HTTP router on localhost, so the web page and the JSON API can be
//! exercised without hardware.
//!
//! ```text
//! thermolink-simulator [config.json]
//! ```
//!
//! The optional JSON file uses the same schema as the firmware
//! configuration. Without it the server listens on port 8080.

use std::io::{Read as _, Write as _};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use log::{error, info, warn};

use thermolink_core::acquisition::{AcquisitionLane, Transport, TransportError};
use thermolink_core::config::Config;
use thermolink_core::http::{Assets, Router, serve_connection};
use thermolink_core::protocol::{ControlFrame, StatusFrame};
use thermolink_core::registers::SharedRegisters;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Port used when no configuration file is given.
const SIMULATOR_HTTP_PORT: u16 = 8080;

const ASSETS: Assets = Assets {
    index_html: include_bytes!("../../thermolink-firmware/web/index.html"),
    main_css: include_bytes!("../../thermolink-firmware/web/main.css"),
    app_js: include_bytes!("../../thermolink-firmware/web/app.js"),
};

// ---------------------------------------------------------------------------
// Simulated slave
// ---------------------------------------------------------------------------

/// Stands in for the SPI slave: latches LED commands and reports a slowly
/// drifting thermistor reading.
struct SimulatedSlave {
    started: Instant,
    led: u8,
}

impl SimulatedSlave {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            led: 0,
        }
    }

    /// ADC counts between roughly 1650 and 2450 (about 72 °F to 61 °F).
    fn raw_adc(&self) -> u16 {
        let t = self.started.elapsed().as_secs_f64();
        let raw = 2048.0 + 350.0 * (t / 60.0).sin() + 50.0 * (t / 7.0).cos();
        raw as u16
    }
}

impl Transport for SimulatedSlave {
    async fn exchange(&mut self, frame: ControlFrame) -> Result<StatusFrame, TransportError> {
        if frame.led_command != 0 {
            self.led = frame.led_command;
        }
        let [low, high] = self.raw_adc().to_le_bytes();
        Ok(StatusFrame::from_bytes([low, high, self.led]))
    }
}

// ---------------------------------------------------------------------------
// Socket adapter
// ---------------------------------------------------------------------------

/// Blocking `TcpStream` behind the async I/O traits used by the router.
struct StdConnection<'a>(&'a mut TcpStream);

impl ErrorType for StdConnection<'_> {
    type Error = ErrorKind;
}

impl Read for StdConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).map_err(|e| {
            warn!("Socket read failed: {}", e);
            ErrorKind::Other
        })
    }
}

impl Write for StdConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).map_err(|e| {
            warn!("Socket write failed: {}", e);
            ErrorKind::Other
        })
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().map_err(|_| ErrorKind::Other)
    }
}

// ---------------------------------------------------------------------------
// Lanes
// ---------------------------------------------------------------------------

fn serve_http(listener: TcpListener, router: &Router<'_>, request_timeout: Duration) {
    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };
        if let Err(e) = stream.set_read_timeout(Some(request_timeout)) {
            warn!("Could not set read timeout: {}", e);
        }

        if let Err(e) = block_on(serve_connection(&mut StdConnection(&mut stream), router)) {
            warn!("HTTP connection error: {}", e);
        }
        let _ = stream.shutdown(Shutdown::Both);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_bytes = std::env::args().nth(1).map(|path| match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Cannot read config {}: {}", path, e);
            std::process::exit(1);
        }
    });

    let config = match config_bytes.as_deref() {
        Some(bytes) => match Config::from_json(bytes) {
            Ok(config) => config,
            Err(e) => {
                error!("Invalid config: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            let mut config = Config::default();
            config.http.port = SIMULATOR_HTTP_PORT;
            config
        }
    };

    let listener = match TcpListener::bind(("127.0.0.1", config.http.port)) {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot listen on port {}: {}", config.http.port, e);
            std::process::exit(1);
        }
    };
    info!("Web server running at http://127.0.0.1:{}", config.http.port);

    let mut registers = SharedRegisters::new();
    let (command_port, acquisition_port) = registers.split();
    let router = Router::new(command_port, ASSETS);
    let mut lane = AcquisitionLane::new(SimulatedSlave::new(), acquisition_port, config.acquisition);
    let request_timeout = Duration::from_millis(config.http.request_timeout_ms);

    std::thread::scope(|s| {
        s.spawn(|| block_on(lane.run()));
        // The acquisition thread never finishes, so neither does the scope.
        serve_http(listener, &router, request_timeout);
    });
}
