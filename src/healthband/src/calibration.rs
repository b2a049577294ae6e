use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use healthband_algos::BiasAccumulator;
use healthband_codec::{SensorChannel, Vector3};
use serde::{Deserialize, Serialize};
use tokio::time::{MissedTickBehavior, interval};

use crate::{error::CalibrationError, store::SensorStore};

/// Per-axis biases of the motion sensors, persisted as
/// `{"accel_bias": {"x", "y", "z"}, "gyro_bias": {"x", "y", "z"}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub accel_bias: Vector3,
    pub gyro_bias: Vector3,
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationOptions {
    pub sample_count: usize,
    pub sample_interval: Duration,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            sample_count: 100,
            sample_interval: Duration::from_millis(10),
        }
    }
}

pub struct CalibrationEngine {
    store: Arc<SensorStore>,
    path: PathBuf,
}

impl CalibrationEngine {
    pub fn new(store: Arc<SensorStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples `channel` while the device is held still and applies the mean
    /// as its new bias. Ticks without a reading are skipped; with none at all
    /// the store is left untouched.
    pub async fn calibrate(
        &self,
        channel: SensorChannel,
        options: CalibrationOptions,
    ) -> Result<Vector3, CalibrationError> {
        let remove_gravity = match channel {
            SensorChannel::Accel => true,
            SensorChannel::Gyro => false,
            other => return Err(CalibrationError::NotMotionChannel(other)),
        };

        let mut ticker = interval(options.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut samples = BiasAccumulator::new();
        for _ in 0..options.sample_count {
            ticker.tick().await;
            if let Some(sample) = self.store.snapshot().vector(channel) {
                samples.push(sample);
            }
        }

        let bias = samples
            .finish(remove_gravity)
            .ok_or(CalibrationError::InsufficientData(channel))?;

        self.store.set_bias(channel, bias)?;
        info!(
            "{} calibrated from {} samples, bias {}",
            channel,
            samples.samples(),
            bias
        );
        Ok(bias)
    }

    pub fn persist(&self, profile: &CalibrationProfile) -> Result<(), CalibrationError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, json)?;
        info!("Calibration saved to {}", self.path.display());
        Ok(())
    }

    /// Falls back to zero biases when the file is missing or unreadable.
    pub fn load(&self) -> CalibrationProfile {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    "No calibration at {} ({}), using default biases",
                    self.path.display(),
                    error
                );
                return CalibrationProfile::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(profile) => profile,
            Err(error) => {
                warn!(
                    "Invalid calibration file {} ({}), using default biases",
                    self.path.display(),
                    error
                );
                CalibrationProfile::default()
            }
        }
    }

    /// Loads the saved profile and applies it to the store.
    pub fn restore(&self) -> Result<CalibrationProfile, CalibrationError> {
        let profile = self.load();
        self.store.set_bias(SensorChannel::Accel, profile.accel_bias)?;
        self.store.set_bias(SensorChannel::Gyro, profile.gyro_bias)?;
        Ok(profile)
    }

    /// Saves the biases currently in the store.
    pub fn persist_current(&self) -> Result<CalibrationProfile, CalibrationError> {
        let profile = self.store.profile();
        self.persist(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;

    fn engine(dir: &Path) -> (Arc<SensorStore>, CalibrationEngine) {
        let store = Arc::new(SensorStore::default());
        let engine = CalibrationEngine::new(store.clone(), dir.join("calibration.json"));
        (store, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn no_samples_is_an_error_and_keeps_bias() {
        let dir = tempfile::tempdir().unwrap();
        let (store, engine) = engine(dir.path());
        let before = store.profile();

        let result = engine
            .calibrate(SensorChannel::Accel, CalibrationOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(CalibrationError::InsufficientData(SensorChannel::Accel))
        ));
        assert_eq!(store.profile(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn accel_bias_removes_gravity() {
        let dir = tempfile::tempdir().unwrap();
        let (store, engine) = engine(dir.path());
        store.update(SensorChannel::Accel, b"0.02,-0.04,1.05", Local::now());

        let bias = engine
            .calibrate(SensorChannel::Accel, CalibrationOptions::default())
            .await
            .unwrap();

        assert!((bias.x - 0.02).abs() < 1e-9);
        assert!((bias.y + 0.04).abs() < 1e-9);
        assert!((bias.z - 0.05).abs() < 1e-9);
        assert_eq!(store.snapshot().accel_bias, bias);
    }

    #[tokio::test(start_paused = true)]
    async fn gyro_bias_is_plain_mean() {
        let dir = tempfile::tempdir().unwrap();
        let (store, engine) = engine(dir.path());
        store.update(SensorChannel::Gyro, b"1.5,-0.5,0.25", Local::now());

        let bias = engine
            .calibrate(
                SensorChannel::Gyro,
                CalibrationOptions {
                    sample_count: 10,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(bias, Vector3::new(1.5, -0.5, 0.25));
        assert_eq!(store.snapshot().gyro_bias, bias);
        assert_eq!(store.snapshot().accel_bias, Vector3::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn samples_arriving_mid_window_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let (store, engine) = engine(dir.path());

        let feeder = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                store.update(SensorChannel::Gyro, b"0.5,0.25,-0.5", Local::now());
            })
        };

        let bias = engine
            .calibrate(SensorChannel::Gyro, CalibrationOptions::default())
            .await
            .unwrap();
        feeder.await.unwrap();

        assert_eq!(bias, Vector3::new(0.5, 0.25, -0.5));
    }

    #[tokio::test]
    async fn scalar_channels_cannot_be_calibrated() {
        let dir = tempfile::tempdir().unwrap();
        let (_, engine) = engine(dir.path());
        let result = engine
            .calibrate(SensorChannel::HeartRate, CalibrationOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(CalibrationError::NotMotionChannel(SensorChannel::HeartRate))
        ));
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let (_, engine) = engine(dir.path());
        let profile = CalibrationProfile {
            accel_bias: Vector3::new(0.01, 0.02, 0.03),
            gyro_bias: Vector3::new(-0.1, 0.0, 0.1),
        };

        engine.persist(&profile).unwrap();
        assert_eq!(engine.load(), profile);
    }

    #[test]
    fn file_format_uses_named_axes() {
        let dir = tempfile::tempdir().unwrap();
        let (_, engine) = engine(dir.path());
        engine.persist(&CalibrationProfile::default()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(engine.path()).unwrap()).unwrap();
        assert_eq!(json["accel_bias"]["z"], 0.0);
        assert_eq!(json["gyro_bias"]["x"], 0.0);
    }

    #[test]
    fn missing_file_loads_zero_bias() {
        let dir = tempfile::tempdir().unwrap();
        let (_, engine) = engine(dir.path());
        assert_eq!(engine.load(), CalibrationProfile::default());
    }

    #[test]
    fn corrupt_file_loads_zero_bias() {
        let dir = tempfile::tempdir().unwrap();
        let (_, engine) = engine(dir.path());
        fs::write(engine.path(), "{\"accel_bias\": [1, 2").unwrap();
        assert_eq!(engine.load(), CalibrationProfile::default());

        fs::write(engine.path(), "{\"accel_bias\": {\"x\": 1.0}}").unwrap();
        assert_eq!(engine.load(), CalibrationProfile::default());
    }

    #[test]
    fn restore_applies_saved_biases() {
        let dir = tempfile::tempdir().unwrap();
        let (store, engine) = engine(dir.path());
        let profile = CalibrationProfile {
            accel_bias: Vector3::new(0.0, 0.0, 0.02),
            gyro_bias: Vector3::new(0.3, 0.2, 0.1),
        };
        engine.persist(&profile).unwrap();

        assert_eq!(engine.restore().unwrap(), profile);
        assert_eq!(store.profile(), profile);
    }

    #[test]
    fn persist_current_saves_store_biases() {
        let dir = tempfile::tempdir().unwrap();
        let (store, engine) = engine(dir.path());
        store
            .set_bias(SensorChannel::Gyro, Vector3::new(0.5, 0.5, 0.5))
            .unwrap();

        let saved = engine.persist_current().unwrap();
        assert_eq!(engine.load(), saved);
        assert_eq!(saved.gyro_bias, Vector3::new(0.5, 0.5, 0.5));
    }
}
