#[macro_use]
extern crate log;

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use anyhow::anyhow;
use clap::{Args, CommandFactory, Parser, Subcommand};
use dotenv::dotenv;
use healthband::{
    AlertGate, AlertPolicy, BleTransport, CalibrationEngine, CalibrationOptions, ConfigUpdate,
    ConnectionState, ConnectionSupervisor, DataLogger, LogWriter, PeriodicTask, SensorStore,
    device,
    monitor::{self, SeriesTrends},
};
use healthband_algos::AlarmThresholds;
use healthband_codec::SensorChannel;
use tokio::{
    sync::{broadcast, mpsc},
    time::{sleep, timeout},
};

#[derive(Parser)]
#[command(version, about = "Companion for the healthband BLE sensor")]
pub struct HealthbandCli {
    #[arg(env, long)]
    pub ble_interface: Option<String>,
    #[arg(env, long, default_value = "sensor_data.csv")]
    pub log_file: PathBuf,
    #[arg(env, long, default_value = "calibration.json")]
    pub calibration_file: PathBuf,
    #[clap(subcommand)]
    pub subcommand: HealthbandCommand,
}

#[derive(Subcommand)]
pub enum HealthbandCommand {
    ///
    /// Scan for healthband devices
    ///
    Scan {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
    ///
    /// Stream live readings, log them and raise alarms
    ///
    Monitor {
        #[arg(long, env)]
        device: String,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        #[arg(long, default_value_t = 100)]
        graph_points: usize,
        /// Channels to leave out of the display
        #[arg(long, value_delimiter = ',')]
        hide: Vec<SensorChannel>,
        #[arg(long, value_enum, default_value_t)]
        alert: AlertPolicy,
        /// How often the status is printed
        #[arg(long, default_value_t = 1000)]
        refresh_ms: u64,
    },
    ///
    /// Measure motion sensor bias, keep the device still while this runs
    ///
    Calibrate {
        #[arg(long, env)]
        device: String,
        #[arg(long, value_delimiter = ',', default_value = "accel,gyro")]
        channels: Vec<SensorChannel>,
        #[arg(long, default_value_t = 100)]
        samples: usize,
        #[arg(long, default_value_t = 10)]
        interval_ms: u64,
    },
    ///
    /// Delete the sensor log
    ///
    ClearLog,
    ///
    /// Print shell completions
    ///
    Completions { shell: clap_complete::Shell },
}

#[derive(Args)]
pub struct ThresholdArgs {
    #[arg(long, default_value_t = 90)]
    spo2_low: u32,
    #[arg(long, default_value_t = 60)]
    heart_rate_low: u32,
    #[arg(long, default_value_t = 100)]
    heart_rate_high: u32,
}

impl From<ThresholdArgs> for AlarmThresholds {
    fn from(args: ThresholdArgs) -> Self {
        Self {
            spo2_low: args.spo2_low,
            heart_rate_low: args.heart_rate_low,
            heart_rate_high: args.heart_rate_high,
        }
    }
}

const VALUE_REFRESH: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = HealthbandCli::parse();

    let logger = Arc::new(DataLogger::new(&cli.log_file));
    let store = Arc::new(SensorStore::default().with_logger(LogWriter::spawn(logger.clone())?));
    let calibration = CalibrationEngine::new(store.clone(), &cli.calibration_file);

    match cli.subcommand {
        HealthbandCommand::Scan { seconds } => {
            let adapter = device::adapter(cli.ble_interface.as_deref()).await?;
            let devices = device::scan(&adapter, Duration::from_secs(seconds)).await?;
            if devices.is_empty() {
                println!("No devices found");
            }

            for device in devices {
                println!("Address: {}", device.address);
                println!("Name: {:?}", device.name);
                println!("RSSI: {:?}", device.rssi);
                println!();
            }
            Ok(())
        }
        HealthbandCommand::Monitor {
            device: address,
            thresholds,
            graph_points,
            hide,
            alert,
            refresh_ms,
        } => {
            calibration.restore()?;
            let mut update = ConfigUpdate::default()
                .with_thresholds(thresholds.into())
                .with_graph_data_points(graph_points);
            for channel in hide {
                update = update.with_visibility(channel, false);
            }
            store.set_config(update)?;

            let adapter = device::adapter(cli.ble_interface.as_deref()).await?;
            let supervisor = ConnectionSupervisor::new(BleTransport::new(adapter), store.clone());
            let events = supervisor.subscribe();
            supervisor.start(address)?;
            let watcher = tokio::spawn(watch_connection(events));

            let trends = Arc::new(Mutex::new(SeriesTrends::new(graph_points)));
            let _values = {
                let store = store.clone();
                let trends = trends.clone();
                let mut gate = AlertGate::new(alert);
                PeriodicTask::spawn(VALUE_REFRESH, move || {
                    let view = store.snapshot();
                    trends
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .sample(&view, &store.config());

                    if gate.should_sound(&view.active_alarms) {
                        // terminal bell
                        print!("\x07");
                        let _ = io::stdout().flush();
                        for alarm in &view.active_alarms {
                            warn!("Alarm: {}", alarm);
                        }
                    }
                })
            };
            let _status = {
                let store = store.clone();
                let trends = trends.clone();
                PeriodicTask::spawn(Duration::from_millis(refresh_ms.max(100)), move || {
                    let trends = trends.lock().unwrap_or_else(PoisonError::into_inner);
                    println!("{}", monitor::render(&store.snapshot(), &store.config(), &trends));
                })
            };

            wait_for_ctrl_c().await?;
            info!("Stopping");
            supervisor.stop().await;
            watcher.abort();
            Ok(())
        }
        HealthbandCommand::Calibrate {
            device: address,
            channels,
            samples,
            interval_ms,
        } => {
            // calibration samples should not end up in the log
            let store = Arc::new(SensorStore::default());
            let calibration = CalibrationEngine::new(store.clone(), &cli.calibration_file);
            calibration.restore()?;

            let adapter = device::adapter(cli.ble_interface.as_deref()).await?;
            let supervisor = ConnectionSupervisor::new(BleTransport::new(adapter), store.clone());
            let mut events = supervisor.subscribe();
            supervisor.start(address)?;

            let connected = timeout(Duration::from_secs(60), async {
                loop {
                    match events.recv().await {
                        Ok(ConnectionState::Connected) => return true,
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return false,
                    }
                }
            })
            .await;

            if !matches!(connected, Ok(true)) {
                supervisor.stop().await;
                return Err(anyhow!("Device did not connect"));
            }

            // let the first notifications arrive
            sleep(Duration::from_secs(1)).await;

            let options = CalibrationOptions {
                sample_count: samples,
                sample_interval: Duration::from_millis(interval_ms),
            };

            let mut result = Ok(());
            for channel in channels {
                match calibration.calibrate(channel, options).await {
                    Ok(bias) => println!("{} bias: {}", channel, bias),
                    Err(error) => {
                        result = Err(error);
                        break;
                    }
                }
            }

            supervisor.stop().await;
            result?;

            let profile = calibration.persist_current()?;
            println!(
                "Saved to {}: accel {}, gyro {}",
                calibration.path().display(),
                profile.accel_bias,
                profile.gyro_bias
            );
            Ok(())
        }
        HealthbandCommand::ClearLog => {
            if logger.clear()? {
                println!("Removed {}", logger.path().display());
            } else {
                println!("Nothing to remove at {}", logger.path().display());
            }
            Ok(())
        }
        HealthbandCommand::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut HealthbandCli::command(),
                env!("CARGO_PKG_NAME"),
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

async fn watch_connection(mut events: broadcast::Receiver<ConnectionState>) {
    loop {
        match events.recv().await {
            Ok(state) => println!("Connection: {}", state),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn wait_for_ctrl_c() -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    rx.recv().await;
    Ok(())
}
