#[macro_use]
extern crate log;

mod alert;
pub use alert::{AlertGate, AlertPolicy};

mod calibration;
pub use calibration::{CalibrationEngine, CalibrationOptions, CalibrationProfile};

pub mod config;
pub use config::{ConfigUpdate, GraphSeries, StoreConfig};

pub mod device;
pub use device::{BleSession, BleTransport};

mod error;
pub use error::{CalibrationError, ConfigError, ConnectionError};

mod logger;
pub use logger::{DataLogger, LogRecord, LogWriter};

pub mod monitor;

mod periodic;
pub use periodic::PeriodicTask;

mod store;
pub use store::{ConnectionState, SensorStore, StoreView};

mod supervisor;
pub use supervisor::{ConnectionSupervisor, SupervisorOptions};

pub mod transport;
