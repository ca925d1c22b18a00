//! Acquisition lane: the periodic SPI exchange with the slave.
//!
//! Each cycle drains the pending LED command, exchanges one frame pair with
//! the slave, converts the ADC reading and publishes the result. Failures
//! never stop the loop:
//!
//! - a transport error or timeout leaves the registers at their last values
//! - a conversion error publishes the fresh LED state with the previous
//!   temperature
//!
//! A command taken from the register is never put back, so a command is
//! delivered to the slave at most once even if its exchange fails.

use core::future::Future;

use embassy_time::{Duration, Ticker, with_timeout};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::config::AcquisitionConfig;
use crate::protocol::{ControlFrame, LedCommand, StatusFrame};
use crate::registers::{AcquisitionPort, Snapshot};
use crate::thermistor::{self, DomainError, ThermistorParams};

/// How often the lane logs its counters.
const STATS_LOG_INTERVAL_CYCLES: u32 = 60;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("exchange did not complete within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("bus error during {operation}")]
    Bus { operation: &'static str },
}

/// One full-duplex frame exchange with the slave.
pub trait Transport {
    fn exchange(
        &mut self,
        frame: ControlFrame,
    ) -> impl Future<Output = Result<StatusFrame, TransportError>>;
}

/// What a single cycle ended up publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// LED state and temperature both updated.
    Published(Snapshot),
    /// LED state updated, temperature kept from the previous cycle.
    TemperatureRetained {
        snapshot: Snapshot,
        error: DomainError,
    },
    /// Nothing published; registers still hold the last good values.
    Stale(TransportError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub cycles: u32,
    pub commands_sent: u32,
    pub transport_failures: u32,
    pub domain_errors: u32,
}

pub struct AcquisitionLane<'a, T> {
    transport: T,
    port: AcquisitionPort<'a>,
    params: ThermistorParams,
    config: AcquisitionConfig,
    stats: AcquisitionStats,
}

impl<'a, T: Transport> AcquisitionLane<'a, T> {
    pub fn new(transport: T, port: AcquisitionPort<'a>, config: AcquisitionConfig) -> Self {
        Self {
            transport,
            port,
            params: ThermistorParams::DEFAULT,
            config,
            stats: AcquisitionStats::default(),
        }
    }

    /// Use a different thermistor divider than the stock board.
    pub fn with_params(mut self, params: ThermistorParams) -> Self {
        self.params = params;
        self
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    /// Run cycles forever, one per configured period. Never returns.
    pub async fn run(&mut self) {
        info!(
            "Acquisition lane starting (period={} ms, exchange timeout={} ms)",
            self.config.period_ms, self.config.exchange_timeout_ms
        );
        let mut ticker = Ticker::every(Duration::from_millis(self.config.period_ms));
        loop {
            self.run_cycle().await;
            if self.stats.cycles % STATS_LOG_INTERVAL_CYCLES == 0 {
                info!("Acquisition stats: {:?}", self.stats);
            }
            ticker.next().await;
        }
    }

    /// Perform one acquisition cycle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycles = self.stats.cycles.wrapping_add(1);

        let command = self.port.take_command();
        if command != 0 {
            debug!("LED command: {}", LedCommand::from_bits_retain(command));
        }
        let frame_out = ControlFrame::encode(command);

        let frame_in = match self.exchange(frame_out).await {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.transport_failures = self.stats.transport_failures.wrapping_add(1);
                if command != 0 {
                    warn!("SPI exchange failed, LED command {} dropped: {}", command, e);
                } else {
                    warn!("SPI exchange failed, keeping last values: {}", e);
                }
                return CycleOutcome::Stale(e);
            }
        };
        if command != 0 {
            self.stats.commands_sent = self.stats.commands_sent.wrapping_add(1);
        }

        debug!(
            "Sent: {:02X?} | Received: {:02X?}",
            frame_out.as_bytes(),
            frame_in.as_bytes()
        );

        let reading = frame_in.decode();
        debug!("Current LED byte: {}", reading.led());

        match thermistor::convert(reading.raw_adc, &self.params) {
            Ok(temperature) => {
                debug!("Temperature: {} °F", temperature.fahrenheit);
                let snapshot = Snapshot {
                    led_state: reading.led_state,
                    temp_raw: temperature.register_value(),
                };
                self.port.publish(snapshot);
                CycleOutcome::Published(snapshot)
            }
            Err(error) => {
                self.stats.domain_errors = self.stats.domain_errors.wrapping_add(1);
                warn!("Temperature conversion failed, keeping previous value: {}", error);
                let snapshot = Snapshot {
                    led_state: reading.led_state,
                    temp_raw: self.port.snapshot().temp_raw,
                };
                self.port.publish(snapshot);
                CycleOutcome::TemperatureRetained { snapshot, error }
            }
        }
    }

    async fn exchange(&mut self, frame: ControlFrame) -> Result<StatusFrame, TransportError> {
        let timeout_ms = self.config.exchange_timeout_ms;
        with_timeout(
            Duration::from_millis(timeout_ms),
            self.transport.exchange(frame),
        )
        .await
        .map_err(|_| TransportError::Timeout { timeout_ms })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ADC_MAX;
    use crate::registers::SharedRegisters;
    use embassy_futures::block_on;

    /// Slave that echoes the last non-zero command it received.
    struct EchoSlave {
        led: u8,
        raw_adc: u16,
        sent: Vec<ControlFrame>,
    }

    impl EchoSlave {
        fn new(raw_adc: u16) -> Self {
            Self {
                led: 0,
                raw_adc,
                sent: Vec::new(),
            }
        }
    }

    impl Transport for EchoSlave {
        async fn exchange(&mut self, frame: ControlFrame) -> Result<StatusFrame, TransportError> {
            self.sent.push(frame);
            if frame.led_command != 0 {
                self.led = frame.led_command;
            }
            let [lo, hi] = self.raw_adc.to_le_bytes();
            Ok(StatusFrame::from_bytes([lo, hi, self.led]))
        }
    }

    struct BrokenBus;

    impl Transport for BrokenBus {
        async fn exchange(&mut self, _frame: ControlFrame) -> Result<StatusFrame, TransportError> {
            Err(TransportError::Bus {
                operation: "transfer",
            })
        }
    }

    /// Slave that never answers.
    struct HungSlave;

    impl Transport for HungSlave {
        async fn exchange(&mut self, _frame: ControlFrame) -> Result<StatusFrame, TransportError> {
            core::future::pending().await
        }
    }

    fn fast_config() -> AcquisitionConfig {
        AcquisitionConfig {
            period_ms: 10,
            exchange_timeout_ms: 20,
        }
    }

    #[test]
    fn test_cycle_publishes_led_and_temperature() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        let mut lane = AcquisitionLane::new(EchoSlave::new(2048), acq, fast_config());

        http.write_command(5);
        let outcome = block_on(lane.run_cycle());

        let expected = Snapshot {
            led_state: 5,
            temp_raw: 66,
        };
        assert_eq!(outcome, CycleOutcome::Published(expected));
        assert_eq!(http.snapshot(), expected);
        assert_eq!(lane.stats().commands_sent, 1);
    }

    #[test]
    fn test_command_is_sent_once() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        let mut lane = AcquisitionLane::new(EchoSlave::new(1000), acq, fast_config());

        http.write_command(3);
        block_on(lane.run_cycle());
        block_on(lane.run_cycle());

        let sent: Vec<u8> = lane.transport.sent.iter().map(|f| f.led_command).collect();
        assert_eq!(sent, [3, 0]);
        assert_eq!(http.pending_command(), 0);
        // Slave keeps its LEDs on after the command is consumed
        assert_eq!(http.snapshot().led_state, 3);
    }

    #[test]
    fn test_full_scale_reading_keeps_previous_temperature() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        let mut lane = AcquisitionLane::new(EchoSlave::new(3000), acq, fast_config());

        block_on(lane.run_cycle());
        assert_eq!(http.snapshot().temp_raw, 50);

        lane.transport.raw_adc = ADC_MAX;
        http.write_command(2);
        let outcome = block_on(lane.run_cycle());

        let expected = Snapshot {
            led_state: 2,
            temp_raw: 50,
        };
        assert_eq!(
            outcome,
            CycleOutcome::TemperatureRetained {
                snapshot: expected,
                error: DomainError::DivideByZero { raw: ADC_MAX },
            }
        );
        assert_eq!(http.snapshot(), expected);
        assert_eq!(lane.stats().domain_errors, 1);
    }

    #[test]
    fn test_bus_error_keeps_registers_and_drops_command() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        acq.publish(Snapshot {
            led_state: 1,
            temp_raw: 70,
        });
        let mut lane = AcquisitionLane::new(BrokenBus, acq, fast_config());

        http.write_command(4);
        let outcome = block_on(lane.run_cycle());

        assert_eq!(
            outcome,
            CycleOutcome::Stale(TransportError::Bus {
                operation: "transfer"
            })
        );
        assert_eq!(
            http.snapshot(),
            Snapshot {
                led_state: 1,
                temp_raw: 70
            }
        );
        assert_eq!(http.pending_command(), 0);
        assert_eq!(lane.stats().transport_failures, 1);
        assert_eq!(lane.stats().commands_sent, 0);
    }

    #[test]
    fn test_hung_exchange_times_out() {
        let mut regs = SharedRegisters::new();
        let (http, acq) = regs.split();
        let mut lane = AcquisitionLane::new(HungSlave, acq, fast_config());

        let outcome = block_on(lane.run_cycle());

        assert_eq!(
            outcome,
            CycleOutcome::Stale(TransportError::Timeout { timeout_ms: 20 })
        );
        assert_eq!(http.snapshot(), Snapshot::default());
    }
}
