//! Hardware-independent core library for thermolink
//!
//! thermolink bridges an SPI slave (a board reporting a thermistor reading and
//! the state of three LEDs) to HTTP clients. This crate holds everything that
//! does not depend on the ESP32-S3: the SPI frame codec, the thermistor
//! conversion, the register set shared between the acquisition lane and the
//! HTTP service, the acquisition loop itself and the HTTP router.
//!
//! It is `#![no_std]` so it compiles on both the embedded target and desktop
//! hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod config;
pub mod http;
pub mod protocol;
pub mod registers;
pub mod spi_transport;
pub mod thermistor;
