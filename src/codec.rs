//! Pure encode/decode between byte payloads and [`Record`]s.
//!
//! Encoding takes raw (already-scaled) integers; the divisor only applies
//! when decoding to human-readable values. Both directions are pure
//! functions of the schema and the input.

use crate::record::{DeviceInfo, Record, Scaled, Value};
use crate::schema::{Field, Primitive, Schema, schema_for_address};
use std::collections::HashMap;
use thiserror::Error;

/// Encode- and decode-time errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A named schema field was not supplied to `encode`.
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    /// A supplied value does not fit the field's wire type.
    #[error("value {value} out of range for field '{name}'")]
    ValueOutOfRange { name: &'static str, value: i64 },
    /// Payload length does not match the schema width.
    #[error("payload of {actual} bytes does not match schema '{schema}' ({expected} bytes)")]
    SchemaMismatch {
        schema: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A decoded register payload.
///
/// Registers without a schema table decode to [`RegisterData::Raw`] so
/// undocumented addresses still pass through (forward compatibility with
/// newer firmware).
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterData {
    Record(Record),
    Raw { address: u16, bytes: Vec<u8> },
}

fn pack(spec_name: &'static str, primitive: Primitive, raw: i64, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let out_of_range = || CodecError::ValueOutOfRange {
        name: spec_name,
        value: raw,
    };
    match primitive {
        Primitive::UInt8 => {
            let v = u8::try_from(raw).map_err(|_| out_of_range())?;
            out.push(v);
        }
        Primitive::UInt16 => {
            let v = u16::try_from(raw).map_err(|_| out_of_range())?;
            out.extend_from_slice(&v.to_le_bytes());
        }
        Primitive::SInt16 => {
            let v = i16::try_from(raw).map_err(|_| out_of_range())?;
            out.extend_from_slice(&v.to_le_bytes());
        }
        Primitive::UInt32 => {
            let v = u32::try_from(raw).map_err(|_| out_of_range())?;
            out.extend_from_slice(&v.to_le_bytes());
        }
        Primitive::SInt32 => {
            let v = i32::try_from(raw).map_err(|_| out_of_range())?;
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    Ok(())
}

fn unpack(primitive: Primitive, bytes: &[u8]) -> i64 {
    match primitive {
        Primitive::UInt8 => i64::from(bytes[0]),
        Primitive::UInt16 => i64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        Primitive::SInt16 => i64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        Primitive::UInt32 => i64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        Primitive::SInt32 => i64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
    }
}

/// Encode raw field values into a payload laid out per `schema`.
///
/// Reserved spans are zero-filled. Every named field must be present in
/// `values` as its raw wire integer.
pub fn encode(schema: &Schema, values: &HashMap<&str, i64>) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(schema.width());
    for field in &schema.fields {
        match field {
            Field::Reserved { width } => out.extend(std::iter::repeat_n(0u8, *width)),
            Field::Value(spec) => {
                let raw = *values
                    .get(spec.name)
                    .ok_or(CodecError::MissingField(spec.name))?;
                pack(spec.name, spec.primitive, raw, &mut out)?;
            }
        }
    }
    Ok(out)
}

/// Decode a payload into a [`Record`] per `schema`.
///
/// The payload length must equal the schema width exactly; reserved spans
/// are consumed without producing fields.
pub fn decode(schema: &'static Schema, bytes: &[u8]) -> Result<Record, CodecError> {
    if bytes.len() != schema.width() {
        return Err(CodecError::SchemaMismatch {
            schema: schema.name,
            expected: schema.width(),
            actual: bytes.len(),
        });
    }

    let mut record = Record::new(schema.name);
    let mut offset = 0;
    for field in &schema.fields {
        let width = field.width();
        if let Field::Value(spec) = field {
            let raw = unpack(spec.primitive, &bytes[offset..offset + width]);
            let value = if spec.divisor == 1 {
                Value::Int(raw)
            } else {
                Value::Scaled(Scaled {
                    raw,
                    divisor: spec.divisor,
                })
            };
            record.push(spec.name, value);
        }
        offset += width;
    }
    Ok(record)
}

/// Decode a register payload, passing unknown addresses through as raw
/// bytes.
pub fn decode_register(address: u16, payload: &[u8]) -> Result<RegisterData, CodecError> {
    match schema_for_address(address) {
        Some(schema) => Ok(RegisterData::Record(decode(schema, payload)?)),
        None => Ok(RegisterData::Raw {
            address,
            bytes: payload.to_vec(),
        }),
    }
}

/// Fixed text field widths of the device information payload:
/// model, serial number, firmware revision, hardware revision,
/// manufacturer.
const DEVICE_INFO_WIDTHS: [usize; 5] = [10, 10, 5, 5, 5];

fn text_field(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Decode the fixed-width text payload of the device information register
/// (0x180a).
pub fn decode_device_info(payload: &[u8]) -> Result<DeviceInfo, CodecError> {
    let expected: usize = DEVICE_INFO_WIDTHS.iter().sum();
    if payload.len() != expected {
        return Err(CodecError::SchemaMismatch {
            schema: "device_info",
            expected,
            actual: payload.len(),
        });
    }

    let mut parts = DEVICE_INFO_WIDTHS.iter().scan(0usize, |offset, &width| {
        let field = text_field(&payload[*offset..*offset + width]);
        *offset += width;
        Some(field)
    });

    Ok(DeviceInfo {
        model: parts.next().unwrap_or_default(),
        serial_number: parts.next().unwrap_or_default(),
        firmware_revision: parts.next().unwrap_or_default(),
        hardware_revision: parts.next().unwrap_or_default(),
        manufacturer: parts.next().unwrap_or_default(),
    })
}
