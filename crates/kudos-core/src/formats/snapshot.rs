//! # Snapshot Format
//!
//! Binary snapshot of a [`MemoryLedger`], used by the file backend.
//!
//! Format: header (5 bytes) followed by the postcard-encoded tables.
//! - 4 bytes: magic (`"KUDO"`)
//! - 1 byte: version
//!
//! The size limit and the header are checked before the payload is decoded,
//! so a truncated or foreign file fails fast with `SerializationError`.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES};
use crate::storage::{LedgerTables, MemoryLedger};
use crate::KudosError;

/// Largest snapshot accepted for decoding.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header that precedes every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), KudosError> {
        if &self.magic != MAGIC_BYTES {
            return Err(KudosError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(KudosError::SerializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KudosError> {
        let Some(head) = bytes.get(..HEADER_SIZE) else {
            return Err(KudosError::SerializationError(
                "Snapshot too short: header missing".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[0..4]);
        Ok(Self {
            magic,
            version: head[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode the committed state of a ledger.
pub fn ledger_to_bytes(ledger: &MemoryLedger) -> Result<Vec<u8>, KudosError> {
    let tables = ledger.snapshot()?;
    let payload = postcard::to_stdvec(&tables)
        .map_err(|e| KudosError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a snapshot into a fresh ledger.
pub fn ledger_from_bytes(bytes: &[u8]) -> Result<MemoryLedger, KudosError> {
    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(KudosError::SerializationError(format!(
            "Snapshot of {} bytes exceeds maximum of {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let tables: LedgerTables = postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        KudosError::SerializationError(format!("Failed to decode snapshot: {}", e))
    })?;
    Ok(MemoryLedger::from_tables(tables))
}

// =============================================================================
// TESTS
// =============================================================================
