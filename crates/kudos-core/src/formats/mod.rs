//! # Formats
//!
//! Byte-level encodings of the ledger. File I/O stays in the app layer.

mod snapshot;

pub use snapshot::{
    MAX_SNAPSHOT_PAYLOAD_SIZE, SnapshotHeader, ledger_from_bytes, ledger_to_bytes,
};
