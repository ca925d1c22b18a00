//! Exports Wi-Fi credentials to the firmware at compile time.
//!
//! Values come from the environment, or from a `.env` file found by
//! `dotenvy` in the current directory or any parent.

const CREDENTIAL_KEYS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

fn main() {
    let _ = dotenvy::dotenv();

    for key in CREDENTIAL_KEYS {
        let value = std::env::var(key).unwrap_or_default();
        if value.is_empty() {
            println!("cargo:warning={key} is not set; Wi-Fi will fail to associate");
        }
        println!("cargo:rustc-env={key}={value}");
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.env");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
