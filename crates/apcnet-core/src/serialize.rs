//! Versioned snapshot header and serialization errors.
//!
//! Saved device state is encoded with `bitcode` and prefixed by a
//! [`SnapshotHeader`] so that format and version can be checked before the
//! payload is trusted.

use serde::{Deserialize, Serialize};

/// Magic number identifying an APC device snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xA9C0_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

/// Header prepended to every serialized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Simulation tick at which the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Encode any serde value with bitcode.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    bitcode::serialize(value).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode a bitcode payload produced by [`encode`].
pub fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, DeserializeError> {
    bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
}
