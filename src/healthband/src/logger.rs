use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc},
    thread::{self, JoinHandle},
};

use chrono::{DateTime, Local, TimeDelta};
use healthband_codec::{Vector3, constants::NO_DATA, legacy};

pub const HEADER: [&str; 7] = [
    "Timestamp",
    "Accelerometer",
    "Gyroscope",
    "SpO2",
    "HeartRate",
    "Temperature",
    "HeartTemperature",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One CSV row: the latest value of every logged channel at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub accel: Option<Vector3>,
    pub gyro: Option<Vector3>,
    pub spo2: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temp: Option<f64>,
    pub hearttemp: Option<f64>,
}

impl LogRecord {
    pub fn row(&self) -> [String; 7] {
        fn triple(v: Option<Vector3>) -> String {
            v.map(legacy::format_triple)
                .unwrap_or_else(|| NO_DATA.to_owned())
        }

        fn scalar(v: Option<f64>) -> String {
            v.map(|v| v.to_string())
                .unwrap_or_else(|| NO_DATA.to_owned())
        }

        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            triple(self.accel),
            triple(self.gyro),
            scalar(self.spo2),
            scalar(self.heart_rate),
            scalar(self.temp),
            scalar(self.hearttemp),
        ]
    }
}

struct LoggerState {
    path: PathBuf,
    last_write: Option<DateTime<Local>>,
}

/// Append-only CSV log, at most one row per second.
pub struct DataLogger {
    state: Mutex<LoggerState>,
}

impl DataLogger {
    pub const MIN_INTERVAL_MS: i64 = 1000;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(LoggerState {
                path: path.into(),
                last_write: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoggerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Later rows go to `path`; rows already written stay where they are.
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        info!("Logging sensor data to {}", path.display());
        self.lock().path = path;
    }

    /// Writes `record` unless a row was written less than a second before
    /// it. Returns whether a row was written; failures are logged, never
    /// returned.
    pub fn append(&self, record: &LogRecord) -> bool {
        let mut state = self.lock();

        if let Some(last) = state.last_write {
            let elapsed = record.timestamp - last;
            // a clock stepping backwards must not stall the log
            if elapsed >= TimeDelta::zero()
                && elapsed < TimeDelta::milliseconds(Self::MIN_INTERVAL_MS)
            {
                return false;
            }
        }

        match write_row(&state.path, record) {
            Ok(()) => {
                state.last_write = Some(record.timestamp);
                true
            }
            Err(error) => {
                warn!("Unable to log to {}: {}", state.path.display(), error);
                false
            }
        }
    }

    /// Removes the log file. Returns `false` when there was nothing to
    /// remove.
    pub fn clear(&self) -> io::Result<bool> {
        let mut state = self.lock();
        state.last_write = None;
        match fs::remove_file(&state.path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error),
        }
    }
}

/// Feeds a [`DataLogger`] from a dedicated thread, so a slow disk never
/// holds up the caller. Pending rows are written before drop returns.
pub struct LogWriter {
    logger: Arc<DataLogger>,
    records: Option<mpsc::Sender<LogRecord>>,
    worker: Option<JoinHandle<()>>,
}

impl LogWriter {
    pub fn spawn(logger: Arc<DataLogger>) -> io::Result<Self> {
        let (records, queue) = mpsc::channel::<LogRecord>();
        let worker = {
            let logger = logger.clone();
            thread::Builder::new()
                .name("healthband-log".to_owned())
                .spawn(move || {
                    for record in queue {
                        logger.append(&record);
                    }
                })?
        };

        Ok(Self {
            logger,
            records: Some(records),
            worker: Some(worker),
        })
    }

    pub fn logger(&self) -> &Arc<DataLogger> {
        &self.logger
    }

    pub fn send(&self, record: LogRecord) {
        let Some(records) = &self.records else {
            return;
        };
        if records.send(record).is_err() {
            warn!("Log writer stopped, dropping row for {}", record.timestamp);
        }
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        // closing the queue ends the worker loop
        self.records.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Log writer panicked");
            }
        }
    }
}

fn write_row(path: &Path, record: &LogRecord) -> csv::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        writer.write_record(HEADER)?;
    }
    writer.write_record(record.row())?;
    writer.flush()?;
    Ok(())
}
