//! Driver for the OMRON 2JCIE-BU01 environmental sensor.
//!
//! The sensor is reachable over two transports: a framed USB serial link
//! and BLE (advertisements plus connected GATT operations). The core of
//! this crate is transport-independent: declarative register schemas, a
//! pure codec between payload bytes and typed records, the CRC16 serial
//! frame protocol, and the stateful reassembly of split advertisement
//! packets. Hardware backends live behind the `serial` and `bluer`
//! features.
//!
//! ```no_run
//! use omron_2jcie_bu01::SerialDevice;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), omron_2jcie_bu01::DeviceError> {
//! let mut sensor = SerialDevice::open("/dev/ttyUSB0", Duration::from_secs(1))?;
//! let data = sensor.latest_data_long()?;
//! println!("temperature: {}", data.get("temperature").unwrap());
//! # Ok(())
//! # }
//! ```

pub mod advertisement;
pub mod ble;
pub mod codec;
pub mod crc;
pub mod device;
pub mod frame;
pub mod record;
pub mod scan;
pub mod schema;
pub mod serial;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{AdvertisementError, COMPANY_ID, Emission, Reassembler};
pub use ble::{BleDevice, BleError, GattClient, characteristic_uuid};
pub use codec::{CodecError, RegisterData, decode, decode_register, encode};
pub use crc::crc16;
pub use device::DeviceError;
pub use frame::{FrameError, MAGIC, ResponsePayload, build_frame};
pub use record::{DeviceInfo, Record, Scaled, Value};
pub use scan::{AdvertisementSource, ScanOptions, ScanResult, run_scan};
pub use schema::{AdvRole, Schema, schema_for_address, schema_for_advertisement};
pub use serial::SerialDevice;
pub use transport::{SerialLink, TransportError};
