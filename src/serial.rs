//! Serial device facade: framed request/response over a byte stream.
//!
//! Strictly synchronous, one outstanding request at a time: write a
//! command frame, then block reading the response with the link's
//! timeout. Retries are the caller's decision; a timeout aborts only the
//! current exchange.

use crate::codec::{self, RegisterData};
use crate::device::{DeviceError, encode_merged};
use crate::frame::{self, HEADER_LEN, ResponsePayload};
use crate::record::{DeviceInfo, Record};
use crate::schema::{
    self, ADVERTISE_SETTING, DEVICE_INFORMATION, LATEST_CALCULATION_DATA, LATEST_DATA_LONG,
    LATEST_SENSING_DATA, LED_SETTING, VIBRATION_COUNT,
};
use crate::transport::SerialLink;
use log::debug;

/// High-level facade over the USB serial interface of one sensor.
pub struct SerialDevice<L: SerialLink> {
    link: L,
}

#[cfg(feature = "serial")]
impl SerialDevice<crate::transport::UsbSerialLink> {
    /// Open the serial port at `path` (e.g. `/dev/ttyUSB0` or `COM5`).
    pub fn open(path: &str, timeout: std::time::Duration) -> Result<Self, DeviceError> {
        Ok(SerialDevice::new(crate::transport::UsbSerialLink::open(
            path, timeout,
        )?))
    }
}

impl<L: SerialLink> SerialDevice<L> {
    pub fn new(link: L) -> Self {
        SerialDevice { link }
    }

    /// One write/read exchange: send a command frame, read and validate
    /// the response frame.
    fn exchange(&mut self, address: u16, payload: &[u8]) -> Result<ResponsePayload, DeviceError> {
        let command = frame::build_frame(address, payload);
        debug!("-> {:02x?}", command);
        self.link.send(&command)?;

        let mut header = [0u8; HEADER_LEN];
        self.link.recv_exact(&mut header)?;
        let length = frame::parse_header(&header)?;

        let mut body = vec![0u8; usize::from(length)];
        self.link.recv_exact(&mut body)?;
        debug!("<- {:02x?} {:02x?}", header, body);

        Ok(frame::parse_body(&header, &body)?)
    }

    /// Read a register and decode it. Registers without a layout table
    /// come back as raw bytes.
    pub fn read(&mut self, address: u16) -> Result<RegisterData, DeviceError> {
        let response = self.exchange(address, &[])?;
        // The response echoes the address; decode with the echoed one, as
        // that is what the device actually answered.
        Ok(codec::decode_register(response.address, &response.payload)?)
    }

    fn read_record(&mut self, address: u16) -> Result<Record, DeviceError> {
        match self.read(address)? {
            RegisterData::Record(record) => Ok(record),
            RegisterData::Raw { address, .. } => Err(DeviceError::UnknownRegister(address)),
        }
    }

    /// Partially update a read/write register.
    ///
    /// Reads the current value first and overlays `updates` (raw wire
    /// integers) onto it, so fields not named keep their current value.
    /// Returns the register content echoed by the device.
    pub fn write_fields(
        &mut self,
        address: u16,
        updates: &[(&str, i64)],
    ) -> Result<Record, DeviceError> {
        let schema =
            schema::schema_for_address(address).ok_or(DeviceError::UnknownRegister(address))?;
        let current = self.read_record(address)?;
        let payload = encode_merged(schema, &current, updates)?;

        let response = self.exchange(address, &payload)?;
        match codec::decode_register(response.address, &response.payload)? {
            RegisterData::Record(record) => Ok(record),
            RegisterData::Raw { address, .. } => Err(DeviceError::UnknownRegister(address)),
        }
    }

    /// 4.4.2 Latest sensing data (0x5012).
    pub fn latest_sensing_data(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LATEST_SENSING_DATA)
    }

    /// 4.4.2 Latest calculation data (0x5013).
    pub fn latest_calculation_data(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LATEST_CALCULATION_DATA)
    }

    /// 4.4.3 Latest data long (0x5021).
    pub fn latest_data_long(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LATEST_DATA_LONG)
    }

    /// 4.5.7 Vibration count (0x5031).
    pub fn vibration_count(&mut self) -> Result<Record, DeviceError> {
        self.read_record(VIBRATION_COUNT)
    }

    /// 4.5.8 LED setting, normal state (0x5111).
    pub fn led(&mut self) -> Result<Record, DeviceError> {
        self.read_record(LED_SETTING)
    }

    /// Update the LED display rule and/or color, keeping whatever is not
    /// specified.
    pub fn set_led(
        &mut self,
        rule: Option<u16>,
        rgb: Option<(u8, u8, u8)>,
    ) -> Result<Record, DeviceError> {
        let mut updates: Vec<(&str, i64)> = Vec::new();
        if let Some(rule) = rule {
            updates.push(("rule", i64::from(rule)));
        }
        if let Some((red, green, blue)) = rgb {
            updates.push(("red", i64::from(red)));
            updates.push(("green", i64::from(green)));
            updates.push(("blue", i64::from(blue)));
        }
        self.write_fields(LED_SETTING, &updates)
    }

    /// 4.5.12 Advertise setting (0x5115).
    pub fn advertise_setting(&mut self) -> Result<Record, DeviceError> {
        self.read_record(ADVERTISE_SETTING)
    }

    /// Update the advertising interval (unit 0.625 ms) and/or mode,
    /// keeping whatever is not specified.
    pub fn set_advertise_setting(
        &mut self,
        interval: Option<u16>,
        mode: Option<u8>,
    ) -> Result<Record, DeviceError> {
        let mut updates: Vec<(&str, i64)> = Vec::new();
        if let Some(interval) = interval {
            updates.push(("interval", i64::from(interval)));
        }
        if let Some(mode) = mode {
            updates.push(("mode", i64::from(mode)));
        }
        self.write_fields(ADVERTISE_SETTING, &updates)
    }

    /// 4.5.25 Device information (0x180a): fixed-width identification
    /// strings.
    pub fn device_info(&mut self) -> Result<DeviceInfo, DeviceError> {
        let response = self.exchange(DEVICE_INFORMATION, &[])?;
        Ok(codec::decode_device_info(&response.payload)?)
    }
}
