//! Decoded telemetry records.

use std::fmt;

/// The two record kinds accepted over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Item,
    Event,
}

impl RecordKind {
    /// Name of the required integer id field.
    pub fn id_field(&self) -> &'static str {
        match self {
            RecordKind::Item => "itemid",
            RecordKind::Event => "eventid",
        }
    }

    /// Fields kept in the forwarded payload, `None` keeps everything.
    pub fn projection(&self) -> Option<&'static [&'static str]> {
        match self {
            RecordKind::Item => Some(&["itemid", "name", "value"]),
            RecordKind::Event => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Item => "item",
            RecordKind::Event => "event",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a batch, ready to be forwarded.
///
/// `raw_payload` is canonical JSON (sorted keys), projected for items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    kind: RecordKind,
    id: i64,
    raw_payload: String,
}

impl Record {
    pub(crate) fn new(kind: RecordKind, id: i64, raw_payload: String) -> Self {
        Self {
            kind,
            id,
            raw_payload,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Message key used on the broker.
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }
}
