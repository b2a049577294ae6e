use std::{collections::BTreeSet, pin::Pin, time::Duration};

use btleplug::{
    api::{
        BDAddr, Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter,
        ValueNotification,
    },
    platform::{Adapter, Manager, Peripheral},
};
use futures::{Stream, StreamExt};
use healthband_codec::{Notification, SensorChannel, constants::HEALTHBAND_SERVICE};
use tokio::time::{Instant, sleep};
use uuid::Uuid;

use crate::{
    error::ConnectionError,
    transport::{Session, Transport},
};

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// Picks the adapter whose name starts with `interface`, or the first one.
pub async fn adapter(interface: Option<&str>) -> Result<Adapter, ConnectionError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    let Some(interface) = interface else {
        return adapters.into_iter().next().ok_or(ConnectionError::NoAdapter);
    };

    for adapter in adapters {
        let name = adapter.adapter_info().await?;
        if name.starts_with(interface) {
            return Ok(adapter);
        }
    }

    Err(ConnectionError::AdapterNotFound(interface.to_owned()))
}

#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub address: BDAddr,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// Lists advertising healthband devices seen within `window`.
pub async fn scan(adapter: &Adapter, window: Duration) -> Result<Vec<DiscoveredDevice>, ConnectionError> {
    adapter
        .start_scan(ScanFilter {
            services: vec![HEALTHBAND_SERVICE],
        })
        .await?;
    sleep(window).await;

    let devices = discovered(adapter).await;
    let stopped = adapter.stop_scan().await;
    let devices = devices?;
    stopped?;
    Ok(devices)
}

async fn discovered(adapter: &Adapter) -> Result<Vec<DiscoveredDevice>, ConnectionError> {
    let mut devices = Vec::new();
    for peripheral in adapter.peripherals().await? {
        let Some(properties) = peripheral.properties().await? else {
            continue;
        };

        if !properties.services.contains(&HEALTHBAND_SERVICE) {
            continue;
        }

        devices.push(DiscoveredDevice {
            address: properties.address,
            name: properties.local_name,
            rssi: properties.rssi,
        });
    }
    Ok(devices)
}

/// BLE link through a btleplug adapter.
pub struct BleTransport {
    adapter: Adapter,
    scan_timeout: Duration,
}

impl BleTransport {
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            scan_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    async fn find(&self, address: &str) -> Result<Peripheral, ConnectionError> {
        self.adapter
            .start_scan(ScanFilter {
                services: vec![HEALTHBAND_SERVICE],
            })
            .await?;

        let found = self.poll_peripherals(address).await;
        // stop scanning even when polling failed
        let stopped = self.adapter.stop_scan().await;

        let peripheral = found?;
        stopped?;
        peripheral.ok_or_else(|| ConnectionError::DeviceNotFound(address.to_owned()))
    }

    async fn poll_peripherals(&self, address: &str) -> Result<Option<Peripheral>, ConnectionError> {
        let deadline = Instant::now() + self.scan_timeout;
        while Instant::now() < deadline {
            for peripheral in self.adapter.peripherals().await? {
                let Some(properties) = peripheral.properties().await? else {
                    continue;
                };

                if !properties.services.contains(&HEALTHBAND_SERVICE) {
                    continue;
                }

                let name = properties.local_name.as_deref();
                if matches_device(&properties.address.to_string(), name, address) {
                    return Ok(Some(peripheral));
                }
            }

            sleep(Duration::from_secs(1)).await;
        }

        Ok(None)
    }
}

/// CoreBluetooth hides the MAC address, so a name prefix matches too.
fn matches_device(peripheral_address: &str, local_name: Option<&str>, wanted: &str) -> bool {
    peripheral_address.eq_ignore_ascii_case(wanted)
        || local_name.is_some_and(|name| name.starts_with(wanted))
}

impl Transport for BleTransport {
    type Session = BleSession;

    async fn connect(&self, address: &str) -> Result<BleSession, ConnectionError> {
        let peripheral = self.find(address).await?;
        info!("Connecting to {}", address);

        peripheral.connect().await?;
        peripheral.discover_services().await?;
        let notifications = peripheral.notifications().await?;

        Ok(BleSession {
            peripheral,
            notifications,
            open: true,
        })
    }
}

pub struct BleSession {
    peripheral: Peripheral,
    notifications: NotificationStream,
    open: bool,
}

impl BleSession {
    const LINK_CHECK: Duration = Duration::from_millis(100);

    fn create_char(characteristic: Uuid) -> Characteristic {
        Characteristic {
            uuid: characteristic,
            service_uuid: HEALTHBAND_SERVICE,
            properties: CharPropFlags::empty(),
            descriptors: BTreeSet::new(),
        }
    }
}

impl Session for BleSession {
    async fn subscribe(&mut self, channel: SensorChannel) -> Result<(), ConnectionError> {
        self.peripheral
            .subscribe(&Self::create_char(channel.uuid()))
            .await?;
        Ok(())
    }

    async fn next_notification(&mut self) -> Result<Option<Notification>, ConnectionError> {
        loop {
            tokio::select! {
                notification = self.notifications.next() => {
                    let Some(notification) = notification else {
                        return Ok(None);
                    };

                    match SensorChannel::from_uuid(notification.uuid) {
                        Ok(channel) => {
                            return Ok(Some(Notification::new(channel, notification.value)));
                        }
                        Err(error) => debug!("Ignoring notification: {}", error),
                    }
                },
                _ = sleep(Self::LINK_CHECK) => {
                    if !self.peripheral.is_connected().await? {
                        return Err(ConnectionError::LinkLost);
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if !std::mem::replace(&mut self.open, false) {
            return;
        }

        for channel in SensorChannel::ALL {
            let characteristic = Self::create_char(channel.uuid());
            if let Err(error) = self.peripheral.unsubscribe(&characteristic).await {
                debug!("Unsubscribe from {} failed: {}", channel, error);
                break;
            }
        }

        if let Err(error) = self.peripheral.disconnect().await {
            warn!("Disconnect failed: {}", error);
        }
    }
}
