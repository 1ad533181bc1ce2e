//! Ingest subsystem: request body → typed records.
//!
//! # Data Flow
//! ```text
//! request body (NDJSON)
//!     → decoder.rs (value by value: parse → canonicalize → extract id)
//!     → decoder.rs (projection, items only)
//!     → Vec<Record> handed to the publisher in decode order
//! ```

pub mod decoder;
pub mod record;

pub use decoder::{decode_batch, DecodeError};
pub use record::{Record, RecordKind};
