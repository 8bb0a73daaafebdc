//! Shared pieces of the serial and BLE device facades.

use crate::ble::BleError;
use crate::codec::{self, CodecError};
use crate::frame::FrameError;
use crate::record::Record;
use crate::schema::Schema;
use crate::transport::TransportError;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by the device facades.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Ble(#[from] BleError),
    /// Operation needs a register layout this crate has no table for.
    #[error("no layout table for register {0:#06x}")]
    UnknownRegister(u16),
    /// A partial update named a field the register does not have.
    #[error("register has no field named '{0}'")]
    UnknownField(String),
}

/// Overlay partial updates on a freshly read record and re-encode the
/// full field set.
///
/// This is the write half of get-then-merge: fields not named in
/// `updates` keep the value just read, so a partial update can never
/// clobber untouched fields. Update values are raw wire integers.
pub(crate) fn encode_merged(
    schema: &Schema,
    current: &Record,
    updates: &[(&str, i64)],
) -> Result<Vec<u8>, DeviceError> {
    let mut values: HashMap<&str, i64> = current
        .iter()
        .map(|(name, value)| (name, value.raw()))
        .collect();
    for (name, raw) in updates {
        if !schema.has_field(name) {
            return Err(DeviceError::UnknownField((*name).to_string()));
        }
        values.insert(name, *raw);
    }
    Ok(codec::encode(schema, &values)?)
}
