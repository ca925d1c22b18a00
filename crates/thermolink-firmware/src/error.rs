use thiserror_no_std::Error;

/// Bring-up failures. None of them stops the firmware; the affected lane is
/// skipped and the rest keeps running.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("SPI bus configuration rejected")]
    SpiConfig,
    #[error("Wi-Fi radio initialization failed")]
    Radio,
    #[error("Wi-Fi driver initialization failed")]
    Wifi,
    #[error("failed to spawn the {task} task")]
    Spawn { task: &'static str },
}
