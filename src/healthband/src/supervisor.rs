use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use healthband_codec::SensorChannel;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::sleep,
};

use crate::{
    error::ConnectionError,
    store::{ConnectionState, SensorStore},
    transport::{Session, Transport},
};

#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    pub backoff: Duration,
    pub keep_retrying: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            keep_retrying: true,
        }
    }
}

struct Shared<T> {
    transport: T,
    store: Arc<SensorStore>,
    events: broadcast::Sender<ConnectionState>,
    backoff: Duration,
    keep_retrying: AtomicBool,
}

struct Worker {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Keeps one device connected and streams its notifications into the store.
pub struct ConnectionSupervisor<T: Transport> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<Worker>>,
}

impl<T: Transport> ConnectionSupervisor<T> {
    pub fn new(transport: T, store: Arc<SensorStore>) -> Self {
        Self::with_options(transport, store, SupervisorOptions::default())
    }

    pub fn with_options(transport: T, store: Arc<SensorStore>, options: SupervisorOptions) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            shared: Arc::new(Shared {
                transport,
                store,
                events,
                backoff: options.backoff,
                keep_retrying: AtomicBool::new(options.keep_retrying),
            }),
            worker: Mutex::new(None),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every state transition, in order. Lagging receivers lose the oldest.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.store.snapshot().connection_state
    }

    pub fn store(&self) -> &Arc<SensorStore> {
        &self.shared.store
    }

    pub fn set_keep_retrying(&self, keep_retrying: bool) {
        self.shared
            .keep_retrying
            .store(keep_retrying, Ordering::SeqCst);
    }

    /// Starts connecting to `address` in the background. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, address: impl Into<String>) -> Result<(), ConnectionError> {
        let mut worker = self.worker();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return Err(ConnectionError::AlreadyRunning);
        }

        let (stop, stopped) = watch::channel(false);
        let shared = self.shared.clone();
        let handle = tokio::spawn(shared.run(address.into(), stopped));
        *worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Cancels any pending retry, closes the session and waits for the
    /// background task to exit. Ends in `Disconnected`.
    pub async fn stop(&self) {
        let worker = self.worker().take();
        if let Some(Worker { stop, handle }) = worker {
            let _ = stop.send(true);
            if let Err(error) = handle.await {
                error!("Connection task failed: {}", error);
            }
        }
        self.shared.transition(ConnectionState::Disconnected);
    }
}

enum Outcome {
    Stopped,
    Failed(ConnectionError),
}

impl<T: Transport> Shared<T> {
    fn transition(&self, state: ConnectionState) {
        if self.store.set_connection_state(state) {
            info!("Connection state: {}", state);
            // no receivers is fine
            let _ = self.events.send(state);
        }
    }

    async fn run(self: Arc<Self>, address: String, mut stop: watch::Receiver<bool>) {
        loop {
            self.transition(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = stopped(&mut stop) => break,
                result = self.transport.connect(&address) => result,
            };

            let outcome = match connected {
                Ok(mut session) => {
                    let outcome = self.pump(&mut session, &mut stop).await;
                    session.close().await;
                    outcome
                }
                Err(error) => Outcome::Failed(error),
            };

            match outcome {
                Outcome::Stopped => break,
                Outcome::Failed(error) => {
                    warn!("Connection to {} lost: {}", address, error);
                    self.transition(ConnectionState::Disconnected);
                }
            }

            if !self.keep_retrying.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                _ = stopped(&mut stop) => break,
                _ = sleep(self.backoff) => {}
            }

            // the flag may have been cleared while waiting
            if !self.keep_retrying.load(Ordering::SeqCst) {
                break;
            }
        }

        self.transition(ConnectionState::Disconnected);
    }

    async fn pump(&self, session: &mut T::Session, stop: &mut watch::Receiver<bool>) -> Outcome {
        for channel in SensorChannel::ALL {
            tokio::select! {
                _ = stopped(stop) => return Outcome::Stopped,
                result = session.subscribe(channel) => {
                    if let Err(error) = result {
                        return Outcome::Failed(error);
                    }
                }
            }
        }

        self.transition(ConnectionState::Connected);

        loop {
            tokio::select! {
                _ = stopped(stop) => return Outcome::Stopped,
                next = session.next_notification() => match next {
                    Ok(Some(notification)) => {
                        trace!("{}", notification);
                        self.store.update(
                            notification.channel,
                            &notification.payload,
                            notification.time,
                        );
                    }
                    Ok(None) => return Outcome::Failed(ConnectionError::LinkLost),
                    Err(error) => return Outcome::Failed(error),
                },
            }
        }
    }
}

/// Resolves once stop was requested or the supervisor went away.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            return;
        }
    }
}
