//! Runtime configuration shared by the firmware and the simulator.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Default acquisition period, one exchange per second.
pub const DEFAULT_PERIOD_MS: u64 = 1000;
/// Default bound on a single SPI exchange.
pub const DEFAULT_EXCHANGE_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_HTTP_PORT: u16 = 80;
/// Default time a client gets to send its request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl<'a> Config<'a> {
    /// Parse a JSON configuration; omitted sections keep their defaults.
    pub fn from_json(json: &'a [u8]) -> Result<Self, ConfigError> {
        serde_json_core::from_slice(json)
            .map(|(config, _)| config)
            .map_err(|_| ConfigError::InvalidJson)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration is not valid JSON for this schema")]
    InvalidJson,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub period_ms: u64,
    pub exchange_timeout_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            exchange_timeout_ms: DEFAULT_EXCHANGE_TIMEOUT_MS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_HTTP_PORT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}
