//! Log file and frame format for the durable backend.
//!
//! # File Layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Header (8 bytes)                   │
//! ├────────────────────────────────────┤
//! │ Frame 1                            │
//! ├────────────────────────────────────┤
//! │ Frame 2                            │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```
//!
//! # Frame Layout
//!
//! ```text
//! ┌─────────────────┬─────────────────────────┬──────────┐
//! │ Length (4 bytes)│ Payload (JSON record)   │ CRC32 (4)│
//! └─────────────────┴─────────────────────────┴──────────┘
//! ```
//!
//! Length and CRC are little-endian; the CRC covers the payload only.

use grantstate_core::{BusinessKey, Document, StateError, StateResult, Timestamp, VersionTag};
use serde::{Deserialize, Serialize};

/// Magic bytes identifying a state log: "GRST"
pub const LOG_MAGIC: [u8; 4] = *b"GRST";

/// Current log format version
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Size of the file header in bytes
pub const LOG_HEADER_SIZE: usize = 8;

/// Frames larger than this are treated as corruption
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

const FRAME_OVERHEAD: usize = 8;

/// Header bytes for a fresh log
pub fn header_bytes() -> [u8; LOG_HEADER_SIZE] {
    let mut bytes = [0u8; LOG_HEADER_SIZE];
    bytes[0..4].copy_from_slice(&LOG_MAGIC);
    bytes[4..8].copy_from_slice(&LOG_FORMAT_VERSION.to_le_bytes());
    bytes
}

/// Check a header, returning the format version
pub fn check_header(bytes: &[u8]) -> StateResult<u32> {
    if bytes.len() < LOG_HEADER_SIZE || bytes[0..4] != LOG_MAGIC {
        return Err(StateError::storage("not a grantstate log: bad magic"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    let version = u32::from_le_bytes(version);
    if version != LOG_FORMAT_VERSION {
        return Err(StateError::storage(format!(
            "unsupported log format version {}",
            version
        )));
    }
    Ok(version)
}

/// A decoded log entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogRecord {
    /// Upsert of (key, tag)
    Put {
        /// Business key
        key: BusinessKey,
        /// Version slot
        tag: VersionTag,
        /// New payload
        payload: Document,
        /// Write time
        at: Timestamp,
        /// Original creation time, set by compaction only
        #[serde(default)]
        created_at: Option<Timestamp>,
    },
    /// Removal of (key, tag)
    Remove {
        /// Business key
        key: BusinessKey,
        /// Version slot
        tag: VersionTag,
    },
}

/// Borrowed twin of [`LogRecord`] used on the write path
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogRecordRef<'a> {
    /// Upsert of (key, tag)
    Put {
        /// Business key
        key: &'a BusinessKey,
        /// Version slot
        tag: &'a VersionTag,
        /// New payload
        payload: &'a Document,
        /// Write time
        at: Timestamp,
        /// Original creation time, set by compaction only
        #[serde(skip_serializing_if = "Option::is_none")]
        created_at: Option<Timestamp>,
    },
    /// Removal of (key, tag)
    Remove {
        /// Business key
        key: &'a BusinessKey,
        /// Version slot
        tag: &'a VersionTag,
    },
}

/// Encode one record as a frame
pub fn encode_frame(record: &LogRecordRef<'_>) -> StateResult<Vec<u8>> {
    let payload = serde_json::to_vec(record)?;
    if payload.len() > MAX_FRAME_BYTES {
        return Err(StateError::storage(format!(
            "record of {} bytes exceeds frame limit",
            payload.len()
        )));
    }
    let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(frame)
}

/// Outcome of decoding the frame at the start of a buffer
#[derive(Debug)]
pub enum Decoded {
    /// A complete, valid frame and the number of bytes it occupied
    Record(LogRecord, usize),
    /// The buffer ends inside a frame (torn write)
    Incomplete,
    /// The frame is complete but fails its checksum or does not parse
    Corrupt(String),
}

/// Decode the frame at the start of `buf`
pub fn decode_frame(buf: &[u8]) -> Decoded {
    if buf.len() < 4 {
        return Decoded::Incomplete;
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&buf[0..4]);
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        return Decoded::Corrupt(format!("frame length {} exceeds limit", len));
    }
    let total = len + FRAME_OVERHEAD;
    if buf.len() < total {
        return Decoded::Incomplete;
    }

    let payload = &buf[4..4 + len];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&buf[4 + len..total]);
    let expected = u32::from_le_bytes(crc_bytes);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Decoded::Corrupt(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            expected, actual
        ));
    }

    match serde_json::from_slice(payload) {
        Ok(record) => Decoded::Record(record, total),
        Err(e) => Decoded::Corrupt(format!("undecodable record: {}", e)),
    }
}
