//! Durable log-backed document index
//!
//! `LogIndex` keeps the live state in a [`ShardedIndex`] and records every
//! mutation in an append-only, checksummed log (`state.log`) inside its data
//! directory. Opening the index replays the log in order.
//!
//! ## Write Path
//!
//! Each `put` / `remove` runs under one writer mutex:
//! 1. encode and append the frame (flush, plus `sync_data` in `Always` mode)
//! 2. apply the mutation in memory
//!
//! A failed append leaves memory untouched and truncates the file back to the
//! last complete frame, so the log never holds a torn frame followed by good
//! ones. Reads go straight to memory and never wait on the writer mutex.
//!
//! ## Recovery
//!
//! A file shorter than the header that matches its prefix is a crash during
//! creation and gets a fresh header. Replay stops at the first incomplete or
//! corrupt frame. Everything from that offset on is truncated with a warning;
//! the records before it are the recovered state.
//!
//! ## Compaction
//!
//! `compact()` writes the live records to `state.log.compact` and renames it
//! over the log, dropping superseded puts and removed records while keeping
//! each key's creation order.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use grantstate_core::{
    BusinessKey, Document, PutOutcome, StateError, StateRecord, StateResult, Timestamp,
    VersionTag,
};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::frame::{
    check_header, decode_frame, encode_frame, header_bytes, Decoded, LogRecord, LogRecordRef,
    LOG_HEADER_SIZE,
};
use crate::index::{DocumentIndex, IndexStats};
use crate::sharded::ShardedIndex;

/// Log file name inside the data directory
pub const LOG_FILE_NAME: &str = "state.log";

const COMPACT_FILE_NAME: &str = "state.log.compact";

/// When appended frames reach stable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Flush to the OS after every frame; a machine crash may lose the tail
    #[default]
    Standard,
    /// `sync_data` after every frame
    Always,
}

impl DurabilityMode {
    /// Parse `"standard"` / `"always"`
    pub fn parse(s: &str) -> StateResult<Self> {
        match s {
            "standard" => Ok(DurabilityMode::Standard),
            "always" => Ok(DurabilityMode::Always),
            other => Err(StateError::malformed(format!(
                "invalid durability mode '{}', expected \"standard\" or \"always\"",
                other
            ))),
        }
    }
}

/// What replay found when the log was opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Frames applied
    pub frames: u64,
    /// Bytes cut from a torn or corrupt tail
    pub truncated_bytes: u64,
}

/// Before/after sizes of a compaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Frames in the log before compaction
    pub frames_before: u64,
    /// Frames written by compaction (one per live record)
    pub frames_after: u64,
    /// Log size before compaction
    pub bytes_before: u64,
    /// Log size after compaction
    pub bytes_after: u64,
}

struct LogWriter {
    file: File,
    /// Length of the file up to the last complete frame
    committed_len: u64,
    frames: u64,
    /// Set when a failed append could not be rolled back
    failed: bool,
}

impl LogWriter {
    fn append(&mut self, frame: &[u8], durability: DurabilityMode) -> StateResult<()> {
        if self.failed {
            return Err(StateError::storage(
                "log is unwritable after an unrecoverable append failure",
            ));
        }
        match self.write_frame(frame, durability) {
            Ok(()) => {
                self.committed_len += frame.len() as u64;
                self.frames += 1;
                Ok(())
            }
            Err(e) => {
                if self.rollback().is_err() {
                    self.failed = true;
                }
                Err(StateError::storage(format!("log append failed: {}", e)))
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8], durability: DurabilityMode) -> std::io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;
        if durability == DurabilityMode::Always {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Swap in the compacted log
    ///
    /// On failure the old handle points at an unlinked inode, so the writer
    /// is poisoned instead.
    fn install(
        &mut self,
        reopened: std::io::Result<File>,
        committed_len: u64,
        frames: u64,
    ) -> StateResult<()> {
        match reopened {
            Ok(file) => {
                self.file = file;
                self.committed_len = committed_len;
                self.frames = frames;
                self.failed = false;
                Ok(())
            }
            Err(e) => {
                self.failed = true;
                Err(StateError::storage(format!(
                    "reopening compacted log failed: {}",
                    e
                )))
            }
        }
    }

    fn rollback(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.committed_len)?;
        self.file.seek(SeekFrom::Start(self.committed_len))?;
        Ok(())
    }
}

/// Durable [`DocumentIndex`] backed by an append-only log
///
/// # Example
///
/// ```ignore
/// use grantstate_storage::{DurabilityMode, LogIndex};
///
/// let index = LogIndex::open("/var/lib/grantstate", DurabilityMode::Standard)?;
/// index.put(&key, &tag, payload)?;
/// drop(index);
///
/// // Reopening replays the log
/// let index = LogIndex::open("/var/lib/grantstate", DurabilityMode::Standard)?;
/// ```
pub struct LogIndex {
    memory: ShardedIndex,
    writer: Mutex<LogWriter>,
    dir: PathBuf,
    durability: DurabilityMode,
    recovery: RecoveryReport,
}

impl LogIndex {
    /// Open (or create) the log in `dir` and replay it
    pub fn open(dir: impl AsRef<Path>, durability: DurabilityMode) -> StateResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let memory = ShardedIndex::new();
        let header = header_bytes();
        let (committed_len, recovery) = if bytes.len() < LOG_HEADER_SIZE && header.starts_with(&bytes) {
            if !bytes.is_empty() {
                warn!(
                    target: "grantstate::storage",
                    path = %path.display(),
                    truncated_bytes = bytes.len(),
                    "Rewriting torn log header"
                );
                file.set_len(0)?;
                file.seek(SeekFrom::Start(0))?;
            }
            file.write_all(&header)?;
            file.sync_data()?;
            (
                LOG_HEADER_SIZE as u64,
                RecoveryReport {
                    frames: 0,
                    truncated_bytes: bytes.len() as u64,
                },
            )
        } else {
            check_header(&bytes)?;
            let (valid_len, frames) = replay(&bytes, &memory);
            let truncated_bytes = (bytes.len() - valid_len) as u64;
            if truncated_bytes > 0 {
                warn!(
                    target: "grantstate::storage",
                    path = %path.display(),
                    truncated_bytes,
                    "Truncating torn or corrupt log tail"
                );
                file.set_len(valid_len as u64)?;
                file.sync_data()?;
            }
            (
                valid_len as u64,
                RecoveryReport {
                    frames,
                    truncated_bytes,
                },
            )
        };
        file.seek(SeekFrom::Start(committed_len))?;

        info!(
            target: "grantstate::storage",
            path = %path.display(),
            frames = recovery.frames,
            keys = memory.stats().keys,
            "State log opened"
        );

        Ok(Self {
            memory,
            writer: Mutex::new(LogWriter {
                file,
                committed_len,
                frames: recovery.frames,
                failed: false,
            }),
            dir,
            durability,
            recovery,
        })
    }

    /// Data directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Configured durability mode
    pub fn durability(&self) -> DurabilityMode {
        self.durability
    }

    /// What replay found at open time
    pub fn recovery(&self) -> RecoveryReport {
        self.recovery
    }

    /// Frames currently in the log
    pub fn frames(&self) -> u64 {
        self.writer.lock().frames
    }

    /// Rewrite the log to hold only live records
    pub fn compact(&self) -> StateResult<CompactionReport> {
        let mut writer = self.writer.lock();
        let frames_before = writer.frames;
        let bytes_before = writer.committed_len;

        let tmp_path = self.dir.join(COMPACT_FILE_NAME);
        let records = self.memory.snapshot();
        let mut out = Vec::with_capacity(bytes_before as usize);
        out.extend_from_slice(&header_bytes());
        for record in &records {
            out.extend_from_slice(&encode_frame(&LogRecordRef::Put {
                key: &record.key,
                tag: &record.tag,
                payload: &record.payload,
                at: record.updated_at,
                created_at: Some(record.created_at),
            })?);
        }

        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&out)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, self.log_path())?;

        let reopened = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.log_path())
            .and_then(|mut file| file.seek(SeekFrom::End(0)).map(|_| file));
        writer.install(reopened, out.len() as u64, records.len() as u64)?;

        let report = CompactionReport {
            frames_before,
            frames_after: writer.frames,
            bytes_before,
            bytes_after: writer.committed_len,
        };
        info!(
            target: "grantstate::storage",
            frames_before = report.frames_before,
            frames_after = report.frames_after,
            bytes_after = report.bytes_after,
            "State log compacted"
        );
        Ok(report)
    }
}

/// Apply every intact frame to `memory`; returns (valid length, frames applied)
fn replay(bytes: &[u8], memory: &ShardedIndex) -> (usize, u64) {
    let mut offset = LOG_HEADER_SIZE;
    let mut frames = 0u64;
    while offset < bytes.len() {
        match decode_frame(&bytes[offset..]) {
            Decoded::Record(record, used) => {
                apply(memory, record);
                offset += used;
                frames += 1;
            }
            Decoded::Incomplete => break,
            Decoded::Corrupt(reason) => {
                warn!(target: "grantstate::storage", offset, %reason, "Corrupt log frame");
                break;
            }
        }
    }
    (offset, frames)
}

fn apply(memory: &ShardedIndex, record: LogRecord) {
    match record {
        LogRecord::Put {
            key,
            tag,
            payload,
            at,
            created_at,
        } => {
            memory.put_with_times(&key, &tag, payload, created_at.unwrap_or(at), at);
        }
        LogRecord::Remove { key, tag } => {
            memory.remove_record(&key, &tag);
        }
    }
}

impl DocumentIndex for LogIndex {
    fn put(
        &self,
        key: &BusinessKey,
        tag: &VersionTag,
        payload: Document,
    ) -> StateResult<PutOutcome> {
        let mut writer = self.writer.lock();
        let at = Timestamp::now();
        let frame = encode_frame(&LogRecordRef::Put {
            key,
            tag,
            payload: &payload,
            at,
            created_at: None,
        })?;
        writer.append(&frame, self.durability)?;
        Ok(self.memory.put_with_times(key, tag, payload, at, at))
    }

    fn get(&self, key: &BusinessKey, tag: &VersionTag) -> StateResult<Option<StateRecord>> {
        self.memory.get(key, tag)
    }

    fn list_versions(&self, key: &BusinessKey) -> StateResult<Vec<VersionTag>> {
        self.memory.list_versions(key)
    }

    fn remove(&self, key: &BusinessKey, tag: &VersionTag) -> StateResult<bool> {
        let mut writer = self.writer.lock();
        if !self.memory.contains(key, tag) {
            return Ok(false);
        }
        let frame = encode_frame(&LogRecordRef::Remove { key, tag })?;
        writer.append(&frame, self.durability)?;
        Ok(self.memory.remove_record(key, tag))
    }

    fn stats(&self) -> IndexStats {
        self.memory.stats()
    }

    fn backend_name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantstate_core::KeySchema;
    use serde_json::json;
    use tempfile::TempDir;

    fn key(sbi: &str) -> BusinessKey {
        KeySchema::farm_business().key([sbi, "test-grant"]).unwrap()
    }

    fn tag(t: &str) -> VersionTag {
        VersionTag::new(t).unwrap()
    }

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_durability_parse() {
        assert_eq!(DurabilityMode::parse("standard").unwrap(), DurabilityMode::Standard);
        assert_eq!(DurabilityMode::parse("always").unwrap(), DurabilityMode::Always);
        assert!(DurabilityMode::parse("sometimes").is_err());
    }

    #[test]
    fn test_open_creates_log_with_header() {
        let temp = TempDir::new().unwrap();
        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        let bytes = fs::read(index.log_path()).unwrap();
        assert_eq!(bytes.len(), LOG_HEADER_SIZE);
        assert_eq!(index.frames(), 0);
        assert_eq!(index.backend_name(), "log");
    }

    #[test]
    fn test_reopen_restores_state_and_order() {
        let temp = TempDir::new().unwrap();
        {
            let index = LogIndex::open(temp.path(), DurabilityMode::Always).unwrap();
            index.put(&key("1"), &tag("R2"), doc(json!({"v": 2}))).unwrap();
            index.put(&key("1"), &tag("R1"), doc(json!({"v": 1}))).unwrap();
            index.put(&key("1"), &tag("R2"), doc(json!({"v": 22}))).unwrap();
            index.put(&key("2"), &tag("1"), doc(json!({}))).unwrap();
            assert!(index.remove(&key("2"), &tag("1")).unwrap());
        }

        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert_eq!(index.recovery().frames, 5);
        assert_eq!(
            index.list_versions(&key("1")).unwrap(),
            vec![tag("R2"), tag("R1")]
        );
        let record = index.get(&key("1"), &tag("R2")).unwrap().unwrap();
        assert_eq!(record.payload, doc(json!({"v": 22})));
        assert!(index.list_versions(&key("2")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_of_missing_record_is_not_logged() {
        let temp = TempDir::new().unwrap();
        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert!(!index.remove(&key("1"), &tag("1")).unwrap());
        assert_eq!(index.frames(), 0);
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let temp = TempDir::new().unwrap();
        let path;
        {
            let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
            index.put(&key("1"), &tag("1"), doc(json!({"a": 1}))).unwrap();
            index.put(&key("1"), &tag("2"), doc(json!({"a": 2}))).unwrap();
            path = index.log_path();
        }
        let full = fs::read(&path).unwrap();
        fs::write(&path, &full[..full.len() - 3]).unwrap();

        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert_eq!(index.recovery().frames, 1);
        assert!(index.recovery().truncated_bytes > 0);
        assert_eq!(index.list_versions(&key("1")).unwrap(), vec![tag("1")]);

        // Appends after recovery land on a clean boundary
        index.put(&key("1"), &tag("3"), doc(json!({"a": 3}))).unwrap();
        drop(index);
        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert_eq!(index.recovery().truncated_bytes, 0);
        assert_eq!(
            index.list_versions(&key("1")).unwrap(),
            vec![tag("1"), tag("3")]
        );
    }

    #[test]
    fn test_torn_header_is_rewritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(LOG_FILE_NAME);
        fs::write(&path, &header_bytes()[..3]).unwrap();

        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert_eq!(index.recovery().frames, 0);
        assert_eq!(index.recovery().truncated_bytes, 3);
        assert_eq!(fs::read(&path).unwrap(), header_bytes().to_vec());

        index.put(&key("1"), &tag("1"), doc(json!({"a": 1}))).unwrap();
        drop(index);
        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert_eq!(index.recovery().frames, 1);
        assert_eq!(index.list_versions(&key("1")).unwrap(), vec![tag("1")]);
    }

    #[test]
    fn test_short_foreign_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LOG_FILE_NAME), b"GRX").unwrap();
        let result = LogIndex::open(temp.path(), DurabilityMode::Standard);
        assert!(matches!(result, Err(StateError::Storage { .. })));
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LOG_FILE_NAME), b"definitely not a log").unwrap();
        let result = LogIndex::open(temp.path(), DurabilityMode::Standard);
        assert!(matches!(result, Err(StateError::Storage { .. })));
    }

    #[test]
    fn test_failed_reopen_after_compaction_poisons_writer() {
        let temp = TempDir::new().unwrap();
        let file = File::create(temp.path().join("scratch")).unwrap();
        let mut writer = LogWriter {
            file,
            committed_len: 0,
            frames: 0,
            failed: false,
        };

        let reopened = Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = writer.install(reopened, 8, 2).unwrap_err();
        assert!(err.to_string().contains("reopening compacted log failed"));
        assert!(writer.failed);
        assert_eq!(writer.frames, 0);

        let err = writer.append(b"frame", DurabilityMode::Standard).unwrap_err();
        assert!(matches!(err, StateError::Storage { .. }));
    }

    #[test]
    fn test_compact_keeps_live_records_and_times() {
        let temp = TempDir::new().unwrap();
        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        for i in 0..5 {
            index.put(&key("1"), &tag("1"), doc(json!({"i": i}))).unwrap();
        }
        index.put(&key("1"), &tag("2"), doc(json!({}))).unwrap();
        index.put(&key("9"), &tag("1"), doc(json!({}))).unwrap();
        index.remove(&key("9"), &tag("1")).unwrap();
        let before = index.get(&key("1"), &tag("1")).unwrap().unwrap();

        let report = index.compact().unwrap();
        assert_eq!(report.frames_before, 8);
        assert_eq!(report.frames_after, 2);
        assert!(report.bytes_after < report.bytes_before);

        index.put(&key("1"), &tag("3"), doc(json!({}))).unwrap();
        drop(index);

        let index = LogIndex::open(temp.path(), DurabilityMode::Standard).unwrap();
        assert_eq!(index.recovery().frames, 3);
        assert_eq!(
            index.list_versions(&key("1")).unwrap(),
            vec![tag("1"), tag("2"), tag("3")]
        );
        let after = index.get(&key("1"), &tag("1")).unwrap().unwrap();
        assert_eq!(after, before);
    }
}
