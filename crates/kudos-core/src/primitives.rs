//! # Primitives
//!
//! Compiled-in limits and format constants for the kudos engine.

/// Default number of reactants rewritten per recount transaction.
///
/// Each batch deletes and rebuilds the cached rows of at most this many
/// reactants inside one write transaction, bounding memory and the time
/// the writer lock is held.
pub const DEFAULT_RECOUNT_BATCH_SIZE: usize = 500;

/// Upper bound accepted for a configured recount batch size.
pub const MAX_RECOUNT_BATCH_SIZE: usize = 100_000;

/// Maximum length (bytes) of a reaction type name.
pub const MAX_TYPE_NAME_LENGTH: usize = 64;

/// Maximum length (bytes) of a host type tag.
pub const MAX_HOST_TYPE_LENGTH: usize = 255;

/// Magic bytes for the kudos snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"KUDO";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Validate a catalog name or host tag against a length limit.
///
/// Returns the offending name inside `KudosError::InvalidName`.
pub fn validate_name(name: &str, max_len: usize) -> Result<(), crate::KudosError> {
    if name.trim().is_empty() {
        return Err(crate::KudosError::InvalidName(format!(
            "'{}' is empty",
            name
        )));
    }
    if name.len() > max_len {
        return Err(crate::KudosError::InvalidName(format!(
            "'{}' exceeds {} bytes",
            name, max_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"KUDO");
    }

    #[test]
    fn validate_name_rejects_blank_and_long() {
        assert!(validate_name("Like", MAX_TYPE_NAME_LENGTH).is_ok());
        assert!(validate_name("", MAX_TYPE_NAME_LENGTH).is_err());
        assert!(validate_name("   ", MAX_TYPE_NAME_LENGTH).is_err());
        let long = "x".repeat(MAX_TYPE_NAME_LENGTH + 1);
        assert!(validate_name(&long, MAX_TYPE_NAME_LENGTH).is_err());
    }
}
