//! BLE runtime — drives the connection state machine over btleplug.
//!
//! [`BleManager::run`] owns the adapter and runs a single event loop:
//! central events, write requests, and the retry timer all funnel into
//! [`state::transition`] through one dispatch queue, so there are no
//! nested callbacks and no connection flags outside the state machine.
//! The current [`ConnectionState`] is the sole source of truth for
//! whether a write is accepted.

use std::collections::VecDeque;
use std::time::Duration;

use btleplug::api::{
    BDAddr, Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::config;
use crate::connection::state::{self, Action, ConnectionEvent, ConnectionState, SCAN_RETRY_DELAY};
use crate::error::{BindicateError, Result};
use crate::protocol::{BINDICATORS_SERVICE_UUID, LEDS_CHARACTERISTIC_UUID};
use crate::queue::CommandSink;

/// Depth of the write-request channel. The queue writes one command at a
/// time, so this only needs to absorb a handful of callers.
const REQUEST_CHANNEL_DEPTH: usize = 8;

enum LinkRequest {
    Write {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Caller-side handle to the connection manager.
///
/// Cheap to clone; all clones talk to the same manager task.
#[derive(Clone)]
pub struct LinkHandle {
    requests: mpsc::Sender<LinkRequest>,
    status: watch::Receiver<ConnectionState>,
}

impl LinkHandle {
    /// Write one command to the LED characteristic.
    ///
    /// Fails immediately with [`BindicateError::NotConnected`] unless the
    /// link is in `Ready` — callers must treat that as a delivery failure
    /// for this attempt, not block waiting for the link.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(LinkRequest::Write {
                data: data.to_vec(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| BindicateError::NotConnected)?;
        reply_rx.await.map_err(|_| BindicateError::NotConnected)?
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.status.borrow()
    }

    /// Subscribe to state transitions (drives "connected" indicators).
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.status.clone()
    }

    /// Wait until the link reaches `Ready`, bounded by `timeout`.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let mut status = self.status.clone();
        let wait = async {
            loop {
                if status.borrow_and_update().is_ready() {
                    return true;
                }
                if status.changed().await.is_err() {
                    return false;
                }
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(true) => Ok(()),
            _ => Err(BindicateError::NotConnected),
        }
    }
}

impl CommandSink for LinkHandle {
    async fn write(&self, data: &[u8]) -> Result<()> {
        LinkHandle::write(self, data).await
    }
}

/// Owns the Bluetooth adapter and maintains the link to the one
/// configured peripheral, reconnecting indefinitely on any failure.
pub struct BleManager {
    adapter: Adapter,
    target: BDAddr,
    requests: mpsc::Receiver<LinkRequest>,
    status_tx: watch::Sender<ConnectionState>,
}

impl BleManager {
    /// Create a manager targeting the given advertised address, using the
    /// first Bluetooth adapter on the host.
    pub async fn new(address: &str) -> Result<(Self, LinkHandle)> {
        let target = parse_target(address)?;
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BindicateError::NoAdapter)?;
        Ok(Self::with_adapter(adapter, target))
    }

    /// Create a manager on a specific adapter (injected for multi-adapter
    /// hosts and tests).
    pub fn with_adapter(adapter: Adapter, target: BDAddr) -> (Self, LinkHandle) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_DEPTH);
        let (status_tx, status_rx) = watch::channel(ConnectionState::Idle);
        let manager = BleManager {
            adapter,
            target,
            requests: request_rx,
            status_tx,
        };
        let handle = LinkHandle {
            requests: request_tx,
            status: status_rx,
        };
        (manager, handle)
    }

    /// Run the connection lifecycle until every [`LinkHandle`] is dropped.
    pub async fn run(self) -> Result<()> {
        let BleManager {
            adapter,
            target,
            mut requests,
            status_tx,
        } = self;

        let mut events = adapter.events().await?;
        let mut driver = Driver {
            adapter,
            target,
            state: ConnectionState::Idle,
            peripheral: None,
            characteristic: None,
            status_tx,
            retry_at: None,
        };

        driver.dispatch(ConnectionEvent::Start).await;

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => driver.handle_central_event(event).await,
                    None => break,
                },
                request = requests.recv() => match request {
                    Some(request) => driver.handle_request(request).await,
                    None => break,
                },
                _ = retry_timer(driver.retry_at) => {
                    driver.retry_at = None;
                    driver.dispatch(ConnectionEvent::RetryElapsed).await;
                }
            }
        }

        if let Some(peripheral) = &driver.peripheral {
            let _ = peripheral.disconnect().await;
        }
        Ok(())
    }
}

async fn retry_timer(at: Option<Instant>) {
    match at {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn parse_target(address: &str) -> Result<BDAddr> {
    config::parse_address(address)
        .ok_or_else(|| BindicateError::Config(format!("invalid Bluetooth address: {address}")))
}

struct Driver {
    adapter: Adapter,
    target: BDAddr,
    state: ConnectionState,
    peripheral: Option<Peripheral>,
    characteristic: Option<Characteristic>,
    status_tx: watch::Sender<ConnectionState>,
    retry_at: Option<Instant>,
}

impl Driver {
    /// Feed one event through the state machine, executing the resulting
    /// actions. Actions may produce follow-up events (e.g. a failed scan
    /// start), which are queued rather than recursed into.
    async fn dispatch(&mut self, event: ConnectionEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let (next, actions) = state::transition(self.state, event);
            if next != self.state {
                log::info!("bluetooth link: {} -> {next}", self.state);
                self.state = next;
                let _ = self.status_tx.send(next);
            }
            for action in actions {
                if let Some(follow_up) = self.perform(action).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn perform(&mut self, action: Action) -> Option<ConnectionEvent> {
        match action {
            Action::StartScan => match self.adapter.start_scan(ScanFilter::default()).await {
                Ok(()) => {
                    log::debug!("bluetooth scan started");
                    None
                }
                Err(e) => {
                    log::warn!("bluetooth scan failed to start: {e}");
                    Some(ConnectionEvent::ScanFailed)
                }
            },
            Action::StopScan => {
                self.retry_at = None;
                if let Err(e) = self.adapter.stop_scan().await {
                    log::debug!("bluetooth scan stop error (ignored): {e}");
                }
                None
            }
            Action::Connect => {
                let Some(peripheral) = &self.peripheral else {
                    return Some(ConnectionEvent::ConnectFailed);
                };
                log::info!("bluetooth establishing connection with {}", self.target);
                match peripheral.connect().await {
                    Ok(()) => Some(ConnectionEvent::ConnectSucceeded),
                    Err(e) => {
                        log::warn!("bluetooth connection error: {e}");
                        Some(ConnectionEvent::ConnectFailed)
                    }
                }
            }
            Action::DiscoverTarget => {
                let Some(peripheral) = &self.peripheral else {
                    return Some(ConnectionEvent::DiscoveryFailed);
                };
                if let Err(e) = peripheral.discover_services().await {
                    log::warn!("bluetooth service discovery error: {e}");
                    return Some(ConnectionEvent::DiscoveryFailed);
                }
                let characteristic = peripheral.characteristics().into_iter().find(|c| {
                    c.uuid == LEDS_CHARACTERISTIC_UUID
                        && c.service_uuid == BINDICATORS_SERVICE_UUID
                });
                match characteristic {
                    Some(characteristic) => {
                        self.characteristic = Some(characteristic);
                        Some(ConnectionEvent::CharacteristicFound)
                    }
                    None => {
                        log::warn!("bluetooth device missing LED characteristic");
                        Some(ConnectionEvent::DiscoveryFailed)
                    }
                }
            }
            Action::Disconnect => {
                self.characteristic = None;
                if let Some(peripheral) = &self.peripheral {
                    let _ = peripheral.disconnect().await;
                }
                if self.state == ConnectionState::Disconnected {
                    Some(ConnectionEvent::CleanupComplete)
                } else {
                    None
                }
            }
            Action::ScheduleRetry => {
                self.retry_at = Some(Instant::now() + SCAN_RETRY_DELAY);
                None
            }
        }
    }

    async fn handle_central_event(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                if self.state != ConnectionState::Scanning {
                    return;
                }
                let Ok(peripheral) = self.adapter.peripheral(&id).await else {
                    return;
                };
                let address = match peripheral.properties().await {
                    Ok(Some(properties)) => properties.address,
                    _ => return,
                };
                if address == self.target {
                    self.peripheral = Some(peripheral);
                    self.dispatch(ConnectionEvent::PeripheralMatched).await;
                }
            }
            CentralEvent::DeviceDisconnected(id) => {
                let ours = self
                    .peripheral
                    .as_ref()
                    .is_some_and(|p| p.id() == id);
                if ours {
                    self.dispatch(ConnectionEvent::LinkLost).await;
                }
            }
            _ => {}
        }
    }

    async fn handle_request(&mut self, request: LinkRequest) {
        match request {
            LinkRequest::Write { data, reply } => {
                let result = self.write(&data).await;
                let failed_on_link = matches!(result, Err(BindicateError::WriteFailed(_)));
                let _ = reply.send(result);
                if failed_on_link {
                    self.dispatch(ConnectionEvent::LinkLost).await;
                }
            }
        }
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        if !self.state.is_ready() {
            return Err(BindicateError::NotConnected);
        }
        let (Some(peripheral), Some(characteristic)) = (&self.peripheral, &self.characteristic)
        else {
            return Err(BindicateError::NotConnected);
        };
        peripheral
            .write(characteristic, data, WriteType::WithResponse)
            .await
            .map_err(|e| {
                log::warn!("bluetooth write error: {e}");
                BindicateError::WriteFailed(e.to_string())
            })
    }
}
