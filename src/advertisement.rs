//! Reassembly of 2JCIE-BU01 BLE advertisements.
//!
//! In advertising mode 0x03 one logical reading is split across two
//! packets sharing a sequence number: a 19-byte indication with the
//! sensing fields and a 27-byte scan response with the calculation
//! fields. The radio repeats both every broadcast interval and BlueZ may
//! deliver them out of order or drop either half, so a [`Reassembler`]
//! keeps the indication halves pending until the matching response shows
//! up and suppresses repeats of the same sequence number.
//!
//! One reassembler instance belongs to exactly one scan session; its
//! state must not be shared across sessions.

use crate::codec::{CodecError, decode};
use crate::record::Record;
use crate::schema::{AdvRole, schema_for_advertisement};
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// OMRON company identifier keying the manufacturer-specific data.
pub const COMPANY_ID: u16 = 0x02D5;

/// Upper bound on indication halves waiting for their response.
///
/// Responses for a pending sequence number can simply never arrive, so
/// without a bound a long scan session would grow the table forever. When
/// full, the oldest pending entry is evicted.
const PENDING_CAPACITY: usize = 32;

/// Per-packet errors from the reassembler. Orphaned responses and
/// suppressed duplicates are not errors; only packets the schema table
/// cannot place end up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvertisementError {
    /// Datatype/length combination absent from the schema table.
    #[error("unrecognized advertisement (datatype {datatype:#04x}, {len} bytes)")]
    UnrecognizedAdvertisement { datatype: u8, len: usize },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Outcome of feeding one packet to the reassembler.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// A complete decoded reading.
    Record(Record),
    /// Nothing to deliver: duplicate, orphaned response, or an
    /// indication still waiting for its other half.
    Suppressed,
}

/// Stateful engine that stitches split advertisements into complete
/// records and filters duplicate broadcasts.
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: HashMap<u8, Record>,
    /// Insertion order of `pending` keys, oldest first.
    order: VecDeque<u8>,
    last_seq: Option<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one raw advertisement payload and emit zero or one record.
    ///
    /// With `distinct` set, packets repeating the last accepted sequence
    /// number are suppressed so each logical reading is delivered once
    /// per broadcast interval rather than once per radio repeat.
    pub fn on_packet(
        &mut self,
        raw: &[u8],
        distinct: bool,
    ) -> Result<Emission, AdvertisementError> {
        if raw.len() < 2 {
            return Err(AdvertisementError::UnrecognizedAdvertisement {
                datatype: raw.first().copied().unwrap_or_default(),
                len: raw.len(),
            });
        }
        let (datatype, seq) = (raw[0], raw[1]);

        let Some((role, schema)) = schema_for_advertisement(datatype, raw.len()) else {
            return Err(AdvertisementError::UnrecognizedAdvertisement {
                datatype,
                len: raw.len(),
            });
        };

        match role {
            AdvRole::Simple => {
                if distinct && self.last_seq == Some(seq) {
                    return Ok(Emission::Suppressed);
                }
                self.last_seq = Some(seq);
                Ok(Emission::Record(decode(schema, raw)?))
            }
            AdvRole::Indication => {
                if distinct && self.last_seq == Some(seq) {
                    return Ok(Emission::Suppressed);
                }
                self.last_seq = Some(seq);
                // Radios repeat indications before the response arrives; a
                // newer half for the same sequence number replaces the
                // stale one.
                self.insert_pending(seq, decode(schema, raw)?);
                Ok(Emission::Suppressed)
            }
            AdvRole::Response => match self.take_pending(seq) {
                Some(mut indication) => {
                    indication.merge(decode(schema, raw)?);
                    Ok(Emission::Record(indication))
                }
                None => {
                    // BLE delivery is lossy; a response whose indication
                    // never arrived is dropped, not an error.
                    debug!("dropping orphaned response for seq {seq}");
                    Ok(Emission::Suppressed)
                }
            },
        }
    }

    fn insert_pending(&mut self, seq: u8, record: Record) {
        if self.pending.insert(seq, record).is_some() {
            self.order.retain(|&s| s != seq);
        } else if self.pending.len() > PENDING_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.pending.remove(&oldest);
                warn!("pending table full, evicting indication for seq {oldest}");
            }
        }
        self.order.push_back(seq);
    }

    fn take_pending(&mut self, seq: u8) -> Option<Record> {
        let record = self.pending.remove(&seq)?;
        self.order.retain(|&s| s != seq);
        Some(record)
    }
}
