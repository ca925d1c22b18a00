//! Build-time configuration for the firmware.

use thermolink_core::config::{Config, InternetConfig};

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");

/// Default timings with the credentials baked in by `build.rs`.
pub fn load() -> Config<'static> {
    Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        ..Default::default()
    }
}
