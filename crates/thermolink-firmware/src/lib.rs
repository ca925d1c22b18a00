//! ESP32-S3 firmware-specific modules for thermolink
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: SPI and GPIO bring-up for the slave link, Wi-Fi association, the
//! embassy-net HTTP worker, and the embedded web assets.

#![no_std]

pub mod assets;
pub mod board;
pub mod config;
pub mod error;
pub mod net;
