//! BLE device facade: connected GATT operations.
//!
//! The sensor exposes each register as a GATT characteristic whose UUID
//! is the fixed template below parameterized by the 16-bit register
//! address. [`BleDevice`] wraps a [`GattClient`] implementation with the
//! register schemas; the client trait exposes only the handful of
//! blocking-per-call operations the driver actually uses, so tests can
//! substitute a scripted fake and platform backends stay out of the core.
//!
//! Scanning and a live connection are mutually exclusive: the device
//! stops broadcasting detailed advertisements while connected, so callers
//! must disconnect before starting a scan session.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::codec::{self, RegisterData};
use crate::device::{DeviceError, encode_merged};
use crate::record::Record;
use crate::schema::{
    self, ADVERTISE_SETTING, LATEST_CALCULATION_DATA, LATEST_SENSING_DATA, LED_SETTING,
    VIBRATION_COUNT,
};
use log::warn;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel buffer size for decoded notification records.
const NOTIFY_CHANNEL_BUFFER_SIZE: usize = 16;

/// UUID of the characteristic backing a register address; the 16-bit
/// address slots into the fixed `ab70xxxx-...` service template.
pub fn characteristic_uuid(address: u16) -> String {
    format!("ab70{address:04x}-0a3a-11e8-ba89-0ed5f89f718b")
}

/// Errors from the underlying GATT backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleError {
    #[error("bluetooth error: {0}")]
    Backend(String),
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(String),
}

/// The connected-mode operations the driver needs from a BLE stack.
///
/// One method per operation actually used; implement it once per
/// platform backend. Operations are sequential per connection, enforced
/// by the `&mut self` receivers.
#[allow(async_fn_in_trait)]
pub trait GattClient {
    async fn connect(&mut self) -> Result<(), BleError>;
    async fn disconnect(&mut self) -> Result<(), BleError>;
    async fn is_connected(&self) -> bool;
    async fn read_characteristic(&mut self, uuid: &str) -> Result<Vec<u8>, BleError>;
    async fn write_characteristic(&mut self, uuid: &str, data: &[u8]) -> Result<(), BleError>;
    /// Enable notifications on a characteristic, delivering raw values
    /// through the returned channel until unsubscribed.
    async fn subscribe(&mut self, uuid: &str) -> Result<mpsc::Receiver<Vec<u8>>, BleError>;
    async fn unsubscribe(&mut self, uuid: &str) -> Result<(), BleError>;
}

/// High-level facade over a GATT connection to one sensor.
pub struct BleDevice<C: GattClient> {
    client: C,
}

impl<C: GattClient> BleDevice<C> {
    pub fn new(client: C) -> Self {
        BleDevice { client }
    }

    /// Connect if not already connected. Every operation goes through
    /// this, so the connection is established lazily on first use.
    async fn ensure_connected(&mut self) -> Result<(), DeviceError> {
        if !self.client.is_connected().await {
            self.client.connect().await?;
        }
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.client.disconnect().await?;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    /// Read a register and decode it. Registers without a layout table
    /// come back as raw bytes.
    pub async fn read(&mut self, address: u16) -> Result<RegisterData, DeviceError> {
        self.ensure_connected().await?;
        let payload = self
            .client
            .read_characteristic(&characteristic_uuid(address))
            .await?;
        Ok(codec::decode_register(address, &payload)?)
    }

    async fn read_record(&mut self, address: u16) -> Result<Record, DeviceError> {
        match self.read(address).await? {
            RegisterData::Record(record) => Ok(record),
            RegisterData::Raw { address, .. } => Err(DeviceError::UnknownRegister(address)),
        }
    }

    /// Partially update a read/write register.
    ///
    /// Reads the current value first and overlays `updates` (raw wire
    /// integers) onto it, so fields not named keep their current value.
    pub async fn write_fields(
        &mut self,
        address: u16,
        updates: &[(&str, i64)],
    ) -> Result<(), DeviceError> {
        let schema =
            schema::schema_for_address(address).ok_or(DeviceError::UnknownRegister(address))?;
        let current = self.read_record(address).await?;
        let payload = encode_merged(schema, &current, updates)?;
        self.client
            .write_characteristic(&characteristic_uuid(address), &payload)
            .await?;
        Ok(())
    }

    /// 2.2 Latest sensing data (0x5012).
    pub async fn latest_sensing_data(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LATEST_SENSING_DATA).await
    }

    /// 2.2 Latest calculation data (0x5013).
    pub async fn latest_calculation_data(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LATEST_CALCULATION_DATA).await
    }

    /// 4.5.7 Vibration count (0x5031).
    pub async fn vibration_count(&mut self) -> Result<Record, DeviceError> {
        self.read_record(VIBRATION_COUNT).await
    }

    /// 4.5.8 LED setting, normal state (0x5111).
    pub async fn led(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LED_SETTING).await
    }

    /// Update the LED display rule and/or color, keeping whatever is not
    /// specified.
    pub async fn set_led(
        &mut self,
        rule: Option<u16>,
        rgb: Option<(u8, u8, u8)>,
    ) -> Result<(), DeviceError> {
        let mut updates: Vec<(&str, i64)> = Vec::new();
        if let Some(rule) = rule {
            updates.push(("rule", i64::from(rule)));
        }
        if let Some((red, green, blue)) = rgb {
            updates.push(("red", i64::from(red)));
            updates.push(("green", i64::from(green)));
            updates.push(("blue", i64::from(blue)));
        }
        self.write_fields(LED_SETTING, &updates).await
    }

    /// 4.5.12 Advertise setting (0x5115).
    pub async fn advertise_setting(&mut self) -> Result<Record, DeviceError> {
        self.read_record(ADVERTISE_SETTING).await
    }

    /// Update the advertising interval (unit 0.625 ms) and/or mode,
    /// keeping whatever is not specified.
    pub async fn set_advertise_setting(
        &mut self,
        interval: Option<u16>,
        mode: Option<u8>,
    ) -> Result<(), DeviceError> {
        let mut updates: Vec<(&str, i64)> = Vec::new();
        if let Some(interval) = interval {
            updates.push(("interval", i64::from(interval)));
        }
        if let Some(mode) = mode {
            updates.push(("mode", i64::from(mode)));
        }
        self.write_fields(ADVERTISE_SETTING, &updates).await
    }

    /// Enable notifications on a register, delivering decoded records
    /// until [`Self::stop_notify`]. Subscriptions to different registers
    /// deliver independently.
    pub async fn start_notify(
        &mut self,
        address: u16,
    ) -> Result<mpsc::Receiver<Record>, DeviceError> {
        self.ensure_connected().await?;
        let mut raw = self
            .client
            .subscribe(&characteristic_uuid(address))
            .await?;

        let (tx, rx) = mpsc::channel(NOTIFY_CHANNEL_BUFFER_SIZE);
        tokio::spawn(async move {
            while let Some(payload) = raw.recv().await {
                match codec::decode_register(address, &payload) {
                    Ok(RegisterData::Record(record)) => {
                        if tx.send(record).await.is_err() {
                            break;
                        }
                    }
                    Ok(RegisterData::Raw { .. }) => {}
                    Err(error) => warn!("dropping notification for {address:#06x}: {error}"),
                }
            }
        });
        Ok(rx)
    }

    /// Disable notifications on a register and release the listener.
    pub async fn stop_notify(&mut self, address: u16) -> Result<(), DeviceError> {
        self.client
            .unsubscribe(&characteristic_uuid(address))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeGatt {
        connected: bool,
        connects: usize,
        characteristics: HashMap<String, Vec<u8>>,
        written: Vec<(String, Vec<u8>)>,
        notifications: HashMap<String, Vec<Vec<u8>>>,
    }

    impl FakeGatt {
        fn with_register(address: u16, payload: &[u8]) -> Self {
            let mut fake = FakeGatt::default();
            fake.characteristics
                .insert(characteristic_uuid(address), payload.to_vec());
            fake
        }
    }

    impl GattClient for FakeGatt {
        async fn connect(&mut self) -> Result<(), BleError> {
            self.connected = true;
            self.connects += 1;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), BleError> {
            self.connected = false;
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            self.connected
        }

        async fn read_characteristic(&mut self, uuid: &str) -> Result<Vec<u8>, BleError> {
            self.characteristics
                .get(uuid)
                .cloned()
                .ok_or_else(|| BleError::CharacteristicNotFound(uuid.to_string()))
        }

        async fn write_characteristic(&mut self, uuid: &str, data: &[u8]) -> Result<(), BleError> {
            self.characteristics.insert(uuid.to_string(), data.to_vec());
            self.written.push((uuid.to_string(), data.to_vec()));
            Ok(())
        }

        async fn subscribe(&mut self, uuid: &str) -> Result<mpsc::Receiver<Vec<u8>>, BleError> {
            let payloads = self.notifications.remove(uuid).unwrap_or_default();
            let (tx, rx) = mpsc::channel(payloads.len().max(1));
            tokio::spawn(async move {
                for payload in payloads {
                    let _ = tx.send(payload).await;
                }
            });
            Ok(rx)
        }

        async fn unsubscribe(&mut self, _uuid: &str) -> Result<(), BleError> {
            Ok(())
        }
    }

    fn sensing_payload() -> Vec<u8> {
        let mut payload = vec![0x2A];
        payload.extend_from_slice(&crate::test_utils::SENSING_BLOCK);
        payload
    }

    #[test]
    fn test_characteristic_uuid_template() {
        assert_eq!(
            characteristic_uuid(0x5012),
            "ab705012-0a3a-11e8-ba89-0ed5f89f718b"
        );
        assert_eq!(
            characteristic_uuid(0x180a),
            "ab70180a-0a3a-11e8-ba89-0ed5f89f718b"
        );
    }

    #[tokio::test]
    async fn test_read_connects_lazily_and_decodes() {
        let fake = FakeGatt::with_register(LATEST_SENSING_DATA, &sensing_payload());
        let mut device = BleDevice::new(fake);

        let record = device.latest_sensing_data().await.unwrap();
        assert_eq!(record.raw("seq"), Some(0x2A));
        assert_eq!(record.get("temperature").unwrap().to_string(), "27.93");

        // Connected once, lazily; a second read reuses the connection.
        device.latest_sensing_data().await.unwrap();
        assert_eq!(device.client.connects, 1);
        assert!(device.is_connected().await);
    }

    #[tokio::test]
    async fn test_read_unknown_register_returns_raw() {
        let fake = FakeGatt::with_register(0x5999, &[0xDE, 0xAD]);
        let mut device = BleDevice::new(fake);

        let data = device.read(0x5999).await.unwrap();
        assert_eq!(
            data,
            RegisterData::Raw {
                address: 0x5999,
                bytes: vec![0xDE, 0xAD],
            }
        );
    }

    #[tokio::test]
    async fn test_write_fields_get_then_merge() {
        // advertise setting: interval 160, mode 1
        let fake = FakeGatt::with_register(ADVERTISE_SETTING, &[0xA0, 0x00, 0x01]);
        let mut device = BleDevice::new(fake);

        device.set_advertise_setting(None, Some(3)).await.unwrap();

        // The write carried the full field set with interval untouched.
        let (uuid, payload) = &device.client.written[0];
        assert_eq!(uuid, &characteristic_uuid(ADVERTISE_SETTING));
        assert_eq!(payload, &[0xA0, 0x00, 0x03]);

        // A subsequent read sees interval=160 and the new mode.
        let record = device.advertise_setting().await.unwrap();
        assert_eq!(record.get("interval"), Some(&Value::Int(160)));
        assert_eq!(record.get("mode"), Some(&Value::Int(3)));
    }

    #[tokio::test]
    async fn test_set_led_keeps_unspecified_color() {
        // rule 1, red 255, green 0, blue 0
        let fake = FakeGatt::with_register(LED_SETTING, &[0x01, 0x00, 0xFF, 0x00, 0x00]);
        let mut device = BleDevice::new(fake);

        device.set_led(Some(2), None).await.unwrap();

        let record = device.led().await.unwrap();
        assert_eq!(record.raw("rule"), Some(2));
        assert_eq!(record.raw("red"), Some(255));
    }

    #[tokio::test]
    async fn test_write_fields_unknown_register() {
        let mut device = BleDevice::new(FakeGatt::default());
        let err = device.write_fields(0x5999, &[("mode", 1)]).await.unwrap_err();
        assert!(matches!(err, DeviceError::UnknownRegister(0x5999)));
    }

    #[tokio::test]
    async fn test_notifications_decode_per_register() {
        let mut fake = FakeGatt::default();
        fake.notifications.insert(
            characteristic_uuid(LATEST_SENSING_DATA),
            vec![sensing_payload(), sensing_payload()],
        );
        let mut device = BleDevice::new(fake);

        let mut rx = device.start_notify(LATEST_SENSING_DATA).await.unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(first.schema(), "latest_sensing_data");
        assert_eq!(first.get("humidity").unwrap().to_string(), "54.21");
        assert!(rx.recv().await.is_some());

        device.stop_notify(LATEST_SENSING_DATA).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_notification_is_dropped() {
        let mut fake = FakeGatt::default();
        fake.notifications.insert(
            characteristic_uuid(LATEST_SENSING_DATA),
            vec![vec![0x01, 0x02], sensing_payload()],
        );
        let mut device = BleDevice::new(fake);

        let mut rx = device.start_notify(LATEST_SENSING_DATA).await.unwrap();
        // The short payload is skipped; the valid one still arrives.
        let record = rx.recv().await.unwrap();
        assert_eq!(record.raw("seq"), Some(0x2A));
        assert!(rx.recv().await.is_none());
    }
}
