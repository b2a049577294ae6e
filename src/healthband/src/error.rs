use healthband_codec::SensorChannel;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("{self:?}")]
pub enum ConfigError {
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    InvertedHeartRateRange {
        low: u32,
        high: u32,
    },
    EmptyColor(String),
    NotMotionChannel(SensorChannel),
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("{0} has no bias to calibrate")]
    NotMotionChannel(SensorChannel),
    #[error("no {0} samples collected, keep the device connected and still")]
    InsufficientData(SensorChannel),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no BLE adapters found")]
    NoAdapter,
    #[error("adapter `{0}` not found")]
    AdapterNotFound(String),
    #[error("device `{0}` not found")]
    DeviceNotFound(String),
    #[error("link lost")]
    LinkLost,
    #[error("supervisor is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Ble(#[from] btleplug::Error),
}
