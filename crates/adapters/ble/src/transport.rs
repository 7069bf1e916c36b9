//! [`Transport`] implementation backed by btleplug.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use btleplug::api::{Central as _, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use scalelog_app::link_loss::LinkLoss;
use scalelog_app::ports::{Transport, TransportError};
use scalelog_domain::gatt::CharacteristicDescriptor;
use scalelog_domain::reading::RawFrame;

use crate::config::BleConfig;
use crate::error::BleError;
use crate::gatt;

/// Delay between peripheral list checks while locating a device.
const LOCATE_POLL: Duration = Duration::from_millis(250);

/// Background tasks attached to one connection.
#[derive(Default)]
struct LinkTasks {
    forwarders: HashMap<uuid::Uuid, JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl LinkTasks {
    fn abort_all(&mut self) {
        for (_, handle) in self.forwarders.drain() {
            handle.abort();
        }
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
    }
}

/// One established GATT connection.
#[derive(Clone)]
pub struct BleLink {
    central: Adapter,
    peripheral: Peripheral,
    tasks: Arc<Mutex<LinkTasks>>,
}

impl BleLink {
    fn tasks(&self) -> std::sync::MutexGuard<'_, LinkTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// GATT transport over the host's first BLE adapter.
pub struct BtleplugTransport {
    manager: Manager,
    config: BleConfig,
}

impl BtleplugTransport {
    /// Create the transport.
    ///
    /// # Errors
    ///
    /// Returns [`BleError`] if the platform BLE manager cannot be created.
    pub async fn new(config: BleConfig) -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        Ok(Self { manager, config })
    }

    pub(crate) async fn central(&self) -> Result<Adapter, BleError> {
        let adapters = self.manager.adapters().await?;
        adapters.into_iter().next().ok_or(BleError::NotAvailable)
    }

    /// Look for `address` among known peripherals, scanning if needed.
    #[tracing::instrument(skip(self, central))]
    async fn locate(&self, central: &Adapter, address: &str) -> Result<Peripheral, BleError> {
        if let Some(peripheral) = find_known(central, address).await? {
            return Ok(peripheral);
        }

        central.start_scan(ScanFilter::default()).await?;
        let deadline = tokio::time::Instant::now() + self.config.locate_timeout();

        let found = loop {
            if let Some(peripheral) = find_known(central, address).await? {
                break Some(peripheral);
            }
            if tokio::time::Instant::now() >= deadline {
                break None;
            }
            tokio::time::sleep(LOCATE_POLL).await;
        };

        if let Err(err) = central.stop_scan().await {
            tracing::debug!(%err, "failed to stop scan cleanly");
        }

        found.ok_or_else(|| BleError::DeviceNotFound {
            address: address.to_string(),
        })
    }

    async fn connect_inner(&self, address: &str) -> Result<BleLink, BleError> {
        let central = self.central().await?;
        let peripheral = self.locate(&central, address).await?;

        if !peripheral.is_connected().await? {
            tokio::time::timeout(self.config.connect_timeout(), peripheral.connect())
                .await
                .map_err(|_| BleError::ConnectTimeout)??;
        }
        tracing::info!(%address, "GATT connected");

        Ok(BleLink {
            central,
            peripheral,
            tasks: Arc::new(Mutex::new(LinkTasks::default())),
        })
    }

    async fn subscribe_inner(
        link: &BleLink,
        uuid: uuid::Uuid,
        frames: mpsc::Sender<RawFrame>,
    ) -> Result<(), BleError> {
        let characteristic = gatt::find_characteristic(&link.peripheral, uuid)?;
        let mut notifications = link.peripheral.notifications().await?;
        link.peripheral.subscribe(&characteristic).await?;

        // The stream ends when the peripheral disconnects, which drops the
        // sender and closes the session's channel.
        let forwarder = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != uuid {
                    continue;
                }
                let frame = RawFrame::captured(uuid, notification.value);
                if frames.send(frame).await.is_err() {
                    break;
                }
            }
            tracing::debug!(characteristic = %uuid, "notification stream ended");
        });

        if let Some(previous) = link.tasks().forwarders.insert(uuid, forwarder) {
            previous.abort();
        }
        Ok(())
    }

    async fn unsubscribe_inner(link: &BleLink, uuid: uuid::Uuid) -> Result<(), BleError> {
        if let Some(forwarder) = link.tasks().forwarders.remove(&uuid) {
            forwarder.abort();
        }
        let characteristic = gatt::find_characteristic(&link.peripheral, uuid)?;
        link.peripheral.unsubscribe(&characteristic).await?;
        Ok(())
    }

    async fn read_inner(link: &BleLink, uuid: uuid::Uuid) -> Result<Vec<u8>, BleError> {
        let characteristic = gatt::find_characteristic(&link.peripheral, uuid)?;
        Ok(link.peripheral.read(&characteristic).await?)
    }

    async fn discover_inner(link: &BleLink) -> Result<Vec<CharacteristicDescriptor>, BleError> {
        link.peripheral.discover_services().await?;
        Ok(gatt::descriptors(
            &link.peripheral.services(),
            &link.peripheral.characteristics(),
        ))
    }
}

async fn find_known(central: &Adapter, address: &str) -> Result<Option<Peripheral>, BleError> {
    for peripheral in central.peripherals().await? {
        let reported = match peripheral.properties().await? {
            Some(props) => props.address.to_string(),
            None => peripheral.address().to_string(),
        };
        if gatt::matches_address(&reported, &peripheral.id().to_string(), address) {
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

impl Transport for BtleplugTransport {
    type Link = BleLink;

    async fn connect(&self, address: &str) -> Result<BleLink, TransportError> {
        Ok(self.connect_inner(address).await?)
    }

    async fn discover(&self, link: &BleLink) -> Result<Vec<CharacteristicDescriptor>, TransportError> {
        Ok(Self::discover_inner(link).await?)
    }

    async fn subscribe(
        &self,
        link: &BleLink,
        characteristic: uuid::Uuid,
        frames: mpsc::Sender<RawFrame>,
    ) -> Result<(), TransportError> {
        Ok(Self::subscribe_inner(link, characteristic, frames).await?)
    }

    async fn unsubscribe(
        &self,
        link: &BleLink,
        characteristic: uuid::Uuid,
    ) -> Result<(), TransportError> {
        Ok(Self::unsubscribe_inner(link, characteristic).await?)
    }

    async fn read_once(
        &self,
        link: &BleLink,
        characteristic: uuid::Uuid,
    ) -> Result<Vec<u8>, TransportError> {
        Ok(Self::read_inner(link, characteristic).await?)
    }

    async fn is_connected(&self, link: &BleLink) -> bool {
        link.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn watch_disconnect(&self, link: &BleLink, signal: LinkLoss) -> bool {
        let mut events = match link.central.events().await {
            Ok(events) => events,
            Err(err) => {
                tracing::debug!(%err, "adapter events unavailable");
                return false;
            }
        };

        let id = link.peripheral.id();
        let watched = signal.clone();
        let watcher = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if matches!(&event, CentralEvent::DeviceDisconnected(gone) if *gone == id) {
                    tracing::debug!("peripheral disconnect event");
                    watched.set();
                    break;
                }
            }
        });
        if let Some(previous) = link.tasks().watcher.replace(watcher) {
            previous.abort();
        }

        // A disconnect that happened before the watcher started is not
        // replayed as an event.
        if !self.is_connected(link).await {
            signal.set();
        }
        true
    }

    async fn disconnect(&self, link: &BleLink) -> Result<(), TransportError> {
        link.tasks().abort_all();
        if link.peripheral.is_connected().await.unwrap_or(false) {
            link.peripheral
                .disconnect()
                .await
                .map_err(BleError::from)?;
        }
        tracing::info!("GATT disconnected");
        Ok(())
    }
}
