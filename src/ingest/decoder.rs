//! NDJSON batch decoding.
//!
//! # Responsibilities
//! - Split a body into consecutive JSON values (not a JSON array)
//! - Canonicalize each value (sorted keys) before forwarding
//! - Extract the required integer id for the record kind
//! - Project item payloads down to the forwarded fields
//!
//! # Design Decisions
//! - Any decode failure fails the whole batch; no partial batches
//! - Projection failure is not a batch failure: the record is forwarded
//!   with its unprojected payload and the failure is logged

use std::io::Read;

use serde::Deserialize;
use serde_json::{Deserializer, Map, Value};
use thiserror::Error;

use crate::ingest::record::{Record, RecordKind};

/// Error that aborts a batch.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode incoming {kind} data: {source}")]
    Decode {
        kind: RecordKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to marshal incoming {kind} data: {source}")]
    Encode {
        kind: RecordKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to unmarshal incoming {kind} data: {source}")]
    Extract {
        kind: RecordKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct ItemKey {
    itemid: i64,
}

#[derive(Deserialize)]
struct EventKey {
    eventid: i64,
}

fn extract_id(kind: RecordKind, canonical: &str) -> Result<i64, serde_json::Error> {
    match kind {
        RecordKind::Item => serde_json::from_str::<ItemKey>(canonical).map(|k| k.itemid),
        RecordKind::Event => serde_json::from_str::<EventKey>(canonical).map(|k| k.eventid),
    }
}

/// Decode every JSON value in `reader` into records of `kind`.
///
/// An empty stream yields an empty batch. Unbuffered readers should be
/// wrapped in a `BufReader`.
pub fn decode_batch<R: Read>(reader: R, kind: RecordKind) -> Result<Vec<Record>, DecodeError> {
    let mut records = Vec::new();

    for value in Deserializer::from_reader(reader).into_iter::<Value>() {
        let value = value.map_err(|source| DecodeError::Decode { kind, source })?;

        if !value.is_object() {
            return Err(DecodeError::Extract {
                kind,
                source: serde::de::Error::custom("expected a JSON object"),
            });
        }

        let canonical =
            serde_json::to_string(&value).map_err(|source| DecodeError::Encode { kind, source })?;

        let id = extract_id(kind, &canonical)
            .map_err(|source| DecodeError::Extract { kind, source })?;

        tracing::trace!(kind = %kind, id, "Received record");

        let raw_payload = match kind.projection() {
            Some(fields) => project_or_keep(canonical, fields),
            None => canonical,
        };

        records.push(Record::new(kind, id, raw_payload));
    }

    Ok(records)
}

/// Keep only `fields` of the JSON object in `raw`.
pub fn project(raw: &str, fields: &[&str]) -> Result<String, serde_json::Error> {
    let mut object: Map<String, Value> = serde_json::from_str(raw)?;

    let kept: Map<String, Value> = fields
        .iter()
        .filter_map(|field| object.remove_entry(*field))
        .collect();

    serde_json::to_string(&kept)
}

/// Project `raw`, falling back to the unprojected payload on failure.
pub fn project_or_keep(raw: String, fields: &[&str]) -> String {
    match project(&raw, fields) {
        Ok(projected) => projected,
        Err(e) => {
            tracing::error!(error = %e, "Failed to filter item data, forwarding it unfiltered");
            raw
        }
    }
}
