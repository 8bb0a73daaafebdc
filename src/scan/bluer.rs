//! BlueZ D-Bus advertisement source.
//!
//! Uses the `bluer` crate to register an advertisement monitor matching
//! the OMRON manufacturer data and yields the raw payloads to the scan
//! session loop. Requires the `bluetoothd` daemon.

use super::AdvertisementSource;
use crate::advertisement::COMPANY_ID;
use crate::ble::BleError;
use bluer::monitor::{Monitor, MonitorEvent, MonitorHandle, Pattern};
use bluer::{Adapter, Address, Session};
use futures::StreamExt;
use std::future::Future;
use std::pin::Pin;

/// OMRON company identifier as little-endian bytes, the byte order BlueZ
/// monitor patterns use for manufacturer IDs.
const COMPANY_ID_BYTES: [u8; 2] = [0xD5, 0x02];

/// Bluetooth manufacturer-specific data AD type (0xFF).
const MANUFACTURER_DATA_TYPE: u8 = 0xff;

/// Advertisement source backed by a BlueZ advertisement monitor.
///
/// The monitor registration is released when the source is dropped at the
/// end of the scan window.
pub struct BluerAdvertisements {
    // Session and monitor manager must stay alive for the monitor handle
    // to keep delivering events.
    _session: Session,
    _monitor_manager: bluer::monitor::MonitorManager,
    adapter: Adapter,
    events: MonitorHandle,
    target: Option<Address>,
}

impl BluerAdvertisements {
    /// Register a monitor for OMRON manufacturer data on the default
    /// adapter, optionally restricted to one device address.
    pub async fn open(target: Option<Address>) -> Result<Self, BleError> {
        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;

        let pattern = Pattern {
            data_type: MANUFACTURER_DATA_TYPE,
            start_position: 0,
            content: COMPANY_ID_BYTES.to_vec(),
        };

        let monitor_manager = adapter.monitor().await?;
        let events = monitor_manager
            .register(Monitor {
                patterns: Some(vec![pattern]),
                ..Default::default()
            })
            .await?;

        Ok(BluerAdvertisements {
            _session: session,
            _monitor_manager: monitor_manager,
            adapter,
            events,
            target,
        })
    }

    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        while let Some(event) = self.events.next().await {
            let MonitorEvent::DeviceFound(device_id) = event else {
                continue;
            };
            if let Some(target) = self.target
                && device_id.device != target
            {
                continue;
            }
            match self.manufacturer_payload(device_id.device).await {
                Ok(Some(payload)) => return Some(payload),
                Ok(None) => continue,
                Err(error) => {
                    log::debug!("skipping device {}: {error}", device_id.device);
                    continue;
                }
            }
        }
        None
    }

    async fn manufacturer_payload(&self, address: Address) -> Result<Option<Vec<u8>>, BleError> {
        let device = self.adapter.device(address)?;
        let Some(data) = device.manufacturer_data().await? else {
            return Ok(None);
        };
        Ok(data.get(&COMPANY_ID).cloned())
    }
}

impl AdvertisementSource for BluerAdvertisements {
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + '_>> {
        Box::pin(self.next_payload())
    }
}
