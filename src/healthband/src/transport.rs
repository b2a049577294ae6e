use std::future::Future;

use healthband_codec::{Notification, SensorChannel};

use crate::error::ConnectionError;

/// Something that can open a notification session to a device.
pub trait Transport: Send + Sync + 'static {
    type Session: Session;

    fn connect(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Session, ConnectionError>> + Send;
}

/// An open link to one device.
pub trait Session: Send + 'static {
    fn subscribe(
        &mut self,
        channel: SensorChannel,
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Waits for the next payload. `Ok(None)` means the device closed the
    /// stream cleanly. Must be cancel safe.
    fn next_notification(
        &mut self,
    ) -> impl Future<Output = Result<Option<Notification>, ConnectionError>> + Send;

    /// Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
