use std::{
    collections::BTreeSet,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Local};
use healthband_algos::{AlarmEvaluator, AlarmKind, Vitals};
use healthband_codec::{SensorChannel, SensorReading, Vector3};
use strum::EnumCount;

use crate::{
    calibration::CalibrationProfile,
    config::{ConfigUpdate, StoreConfig},
    error::ConfigError,
    logger::{DataLogger, LogRecord, LogWriter},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// Point-in-time copy of the store, safe to render without holding any lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreView {
    pub readings: [Option<SensorReading>; SensorChannel::COUNT],
    /// Derived from the accel reading in `readings` and the bias in effect
    /// when that reading arrived.
    pub linear_acceleration: Option<f64>,
    pub accel_bias: Vector3,
    pub gyro_bias: Vector3,
    pub connection_state: ConnectionState,
    pub active_alarms: BTreeSet<AlarmKind>,
    pub rejected_payloads: u64,
}

impl StoreView {
    pub fn reading(&self, channel: SensorChannel) -> Option<&SensorReading> {
        self.readings[channel.index()].as_ref()
    }

    pub fn vector(&self, channel: SensorChannel) -> Option<Vector3> {
        self.reading(channel)?.value.as_vector()
    }

    pub fn scalar(&self, channel: SensorChannel) -> Option<f64> {
        self.reading(channel)?.value.as_scalar()
    }

    /// Motion reading with the current bias taken off.
    pub fn calibrated(&self, channel: SensorChannel) -> Option<Vector3> {
        let raw = self.vector(channel)?;
        match channel {
            SensorChannel::Accel => Some(raw - self.accel_bias),
            SensorChannel::Gyro => Some(raw - self.gyro_bias),
            _ => None,
        }
    }

    pub fn vitals(&self) -> Vitals {
        Vitals {
            spo2: self.scalar(SensorChannel::Spo2),
            heart_rate: self.scalar(SensorChannel::HeartRate),
        }
    }

    pub fn log_record(&self, timestamp: DateTime<Local>) -> LogRecord {
        LogRecord {
            timestamp,
            accel: self.vector(SensorChannel::Accel),
            gyro: self.vector(SensorChannel::Gyro),
            spo2: self.scalar(SensorChannel::Spo2),
            heart_rate: self.scalar(SensorChannel::HeartRate),
            temp: self.scalar(SensorChannel::Temp),
            hearttemp: self.scalar(SensorChannel::HeartTemp),
        }
    }
}

struct StoreState {
    view: StoreView,
    config: StoreConfig,
}

impl StoreState {
    fn apply(&mut self, reading: SensorReading) {
        if reading.channel == SensorChannel::Accel {
            self.view.linear_acceleration = reading
                .value
                .as_vector()
                .map(|raw| raw.linear_acceleration(self.view.accel_bias));
        }
        self.view.readings[reading.channel.index()] = Some(reading);
    }
}

/// Latest value of every channel plus calibration and display settings.
///
/// Written by the connection task, read by any number of pollers. Every
/// mutation happens under one lock and the lock is never held across I/O.
pub struct SensorStore {
    state: Mutex<StoreState>,
    logger: Option<LogWriter>,
}

impl SensorStore {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self::with_config(profile, StoreConfig::default())
    }

    pub fn with_config(profile: CalibrationProfile, config: StoreConfig) -> Self {
        let view = StoreView {
            accel_bias: profile.accel_bias,
            gyro_bias: profile.gyro_bias,
            ..Default::default()
        };

        Self {
            state: Mutex::new(StoreState { view, config }),
            logger: None,
        }
    }

    pub fn with_logger(mut self, writer: LogWriter) -> Self {
        self.logger = Some(writer);
        self
    }

    pub fn logger(&self) -> Option<&Arc<DataLogger>> {
        self.logger.as_ref().map(LogWriter::logger)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // updates never panic while holding the lock, so poisoned state is still whole
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decodes and stores one notification payload. Malformed payloads are
    /// logged and counted; the channel keeps its previous reading.
    pub fn update(&self, channel: SensorChannel, payload: &[u8], time: DateTime<Local>) {
        let reading = match SensorReading::decode(channel, payload, time) {
            Ok(reading) => reading,
            Err(error) => {
                warn!(
                    "Dropping {} payload `{}`: {}",
                    channel,
                    String::from_utf8_lossy(payload),
                    error
                );
                self.lock().view.rejected_payloads += 1;
                return;
            }
        };

        let record = {
            let mut state = self.lock();
            state.apply(reading);
            state.view.active_alarms =
                AlarmEvaluator::evaluate(&state.view.vitals(), &state.config.alarm_thresholds);
            state.view.log_record(time)
        };

        if let Some(logger) = &self.logger {
            logger.send(record);
        }
    }

    pub fn snapshot(&self) -> StoreView {
        self.lock().view.clone()
    }

    pub fn config(&self) -> StoreConfig {
        self.lock().config.clone()
    }

    /// Only future accel readings use the new bias.
    pub fn set_bias(&self, channel: SensorChannel, bias: Vector3) -> Result<(), ConfigError> {
        let mut state = self.lock();
        match channel {
            SensorChannel::Accel => state.view.accel_bias = bias,
            SensorChannel::Gyro => state.view.gyro_bias = bias,
            other => return Err(ConfigError::NotMotionChannel(other)),
        }
        Ok(())
    }

    pub fn set_config(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let mut state = self.lock();
        let next = state.config.merged(update)?;
        // new thresholds apply to what is already on screen
        state.view.active_alarms =
            AlarmEvaluator::evaluate(&state.view.vitals(), &next.alarm_thresholds);
        state.config = next;
        Ok(())
    }

    /// Returns whether the state actually changed.
    pub fn set_connection_state(&self, connection_state: ConnectionState) -> bool {
        let mut state = self.lock();
        let changed = state.view.connection_state != connection_state;
        state.view.connection_state = connection_state;
        changed
    }

    pub fn profile(&self) -> CalibrationProfile {
        let state = self.lock();
        CalibrationProfile {
            accel_bias: state.view.accel_bias,
            gyro_bias: state.view.gyro_bias,
        }
    }
}

impl Default for SensorStore {
    fn default() -> Self {
        Self::new(CalibrationProfile::default())
    }
}
