//! BlueZ D-Bus GATT backend.
//!
//! Implements [`GattClient`] over the `bluer` crate. Characteristics are
//! located by walking the resolved services of the connected device and
//! cached per UUID for the lifetime of the client.

use super::{BleError, GattClient};
use bluer::gatt::remote::Characteristic;
use bluer::{Adapter, Address, Device, Session, Uuid};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel buffer size for raw notification payloads.
const NOTIFY_CHANNEL_BUFFER_SIZE: usize = 16;

impl From<bluer::Error> for BleError {
    fn from(err: bluer::Error) -> Self {
        BleError::Backend(err.to_string())
    }
}

/// [`GattClient`] backed by the BlueZ daemon.
pub struct BluerClient {
    // The session must outlive the device handle.
    _session: Session,
    device: Device,
    characteristics: HashMap<String, Characteristic>,
    /// Forwarding tasks of active notification subscriptions, by UUID.
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl BluerClient {
    /// Attach to the device with the given address on the default
    /// adapter. No connection is made yet; the facade connects lazily.
    pub async fn new(address: Address) -> Result<Self, BleError> {
        let session = Session::new().await?;
        let adapter: Adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;
        let device = adapter.device(address)?;
        Ok(BluerClient {
            _session: session,
            device,
            characteristics: HashMap::new(),
            subscriptions: HashMap::new(),
        })
    }

    async fn characteristic(&mut self, uuid: &str) -> Result<Characteristic, BleError> {
        if let Some(characteristic) = self.characteristics.get(uuid) {
            return Ok(characteristic.clone());
        }

        let wanted =
            Uuid::parse_str(uuid).map_err(|_| BleError::CharacteristicNotFound(uuid.to_string()))?;
        for service in self.device.services().await? {
            for characteristic in service.characteristics().await? {
                if characteristic.uuid().await? == wanted {
                    self.characteristics
                        .insert(uuid.to_string(), characteristic.clone());
                    return Ok(characteristic);
                }
            }
        }
        Err(BleError::CharacteristicNotFound(uuid.to_string()))
    }
}

impl GattClient for BluerClient {
    async fn connect(&mut self) -> Result<(), BleError> {
        self.device.connect().await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BleError> {
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
        self.characteristics.clear();
        self.device.disconnect().await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.device.is_connected().await.unwrap_or(false)
    }

    async fn read_characteristic(&mut self, uuid: &str) -> Result<Vec<u8>, BleError> {
        let characteristic = self.characteristic(uuid).await?;
        Ok(characteristic.read().await?)
    }

    async fn write_characteristic(&mut self, uuid: &str, data: &[u8]) -> Result<(), BleError> {
        let characteristic = self.characteristic(uuid).await?;
        characteristic.write(data).await?;
        Ok(())
    }

    async fn subscribe(&mut self, uuid: &str) -> Result<mpsc::Receiver<Vec<u8>>, BleError> {
        let characteristic = self.characteristic(uuid).await?;
        let notifications = characteristic.notify().await?;

        let (tx, rx) = mpsc::channel(NOTIFY_CHANNEL_BUFFER_SIZE);
        let task = tokio::spawn(async move {
            let mut notifications = std::pin::pin!(notifications);
            while let Some(payload) = notifications.next().await {
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });

        // Dropping a previous task's stream ends its notify session.
        if let Some(previous) = self.subscriptions.insert(uuid.to_string(), task) {
            previous.abort();
        }
        Ok(rx)
    }

    async fn unsubscribe(&mut self, uuid: &str) -> Result<(), BleError> {
        if let Some(task) = self.subscriptions.remove(uuid) {
            task.abort();
        }
        Ok(())
    }
}
