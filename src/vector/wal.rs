//! Write-ahead record log backing a persisted vector store.
//!
//! Each store owns one append-only file, `<collection>.log`. Every entry is
//! written as a frame:
//!
//! ```text
//! [payload length: u32 LE][crc32 of payload: u32 LE][bincode payload]
//! ```
//!
//! A frame is either complete and checksummed or it is ignored, so a crash in
//! the middle of a batch never exposes a half-written record. Replay stops at
//! the first incomplete or corrupt frame and the file is cut back to the last
//! good frame before new entries are appended.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{MarqueeError, Result};
use crate::storage::{Storage, StorageOutput};
use crate::vector::core::distance::DistanceMetric;
use crate::vector::core::record::ItemId;

/// File name suffix of record logs.
pub const WAL_SUFFIX: &str = ".log";

const FRAME_HEADER_LEN: u64 = 8;

/// Upper bound on one frame's payload; anything larger is treated as corruption.
const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

pub type SeqNumber = u64;

/// A single operation in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalEntry {
    /// Establishes the store's dimension and metric. Written once, before the
    /// first record.
    Schema {
        dimension: usize,
        metric: DistanceMetric,
    },
    /// Insert or overwrite one record.
    Put {
        id: ItemId,
        embedding: Vec<f32>,
        document: Option<String>,
    },
}

/// A log entry with its sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: SeqNumber,
    pub entry: WalEntry,
}

/// Result of reading a log back.
#[derive(Debug, Default)]
pub struct WalReplay {
    /// Every complete, checksummed record in file order.
    pub records: Vec<WalRecord>,
    /// Number of trailing bytes that did not form a valid frame.
    pub discarded_bytes: u64,
}

/// Manages the record log of one collection.
#[derive(Debug)]
pub struct WalManager {
    storage: Arc<dyn Storage>,
    path: String,
    writer: Mutex<Option<Box<dyn StorageOutput>>>,
    next_seq: AtomicU64,
}

impl WalManager {
    /// Create a manager for the log of collection `name`.
    pub fn new(storage: Arc<dyn Storage>, name: &str) -> Self {
        Self {
            storage,
            path: format!("{name}{WAL_SUFFIX}"),
            writer: Mutex::new(None),
            next_seq: AtomicU64::new(1),
        }
    }

    /// The log's file name within its storage.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the log file exists.
    pub fn exists(&self) -> bool {
        self.storage.file_exists(&self.path)
    }

    /// Get the last used sequence number.
    pub fn last_seq(&self) -> SeqNumber {
        self.next_seq.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Read every valid record, repairing a torn tail in place.
    ///
    /// Also advances the next sequence number past the highest one read.
    pub fn replay(&self) -> Result<WalReplay> {
        let tmp_path = self.tmp_path();
        if self.storage.file_exists(&tmp_path) {
            log::warn!("{tmp_path}: removing leftover of an interrupted rewrite");
            self.storage.delete_file(&tmp_path)?;
        }

        if !self.exists() {
            return Ok(WalReplay::default());
        }

        let mut input = self.storage.open_input(&self.path)?;
        let mut bytes = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut bytes)?;

        let (records, valid_len) = decode_frames(&bytes);
        let discarded_bytes = bytes.len() as u64 - valid_len;

        if discarded_bytes > 0 {
            log::warn!(
                "{}: discarding {} trailing bytes after {} valid records",
                self.path,
                discarded_bytes,
                records.len()
            );
            self.rewrite_bytes(&bytes[..valid_len as usize])?;
        }

        if let Some(max_seq) = records.iter().map(|r| r.seq).max() {
            self.next_seq.fetch_max(max_seq + 1, Ordering::SeqCst);
        }

        Ok(WalReplay {
            records,
            discarded_bytes,
        })
    }

    /// Append a batch of entries and sync once at the end.
    ///
    /// Returns the sequence number of the last entry.
    pub fn append_batch(&self, entries: &[WalEntry]) -> Result<SeqNumber> {
        let mut writer_guard = self.writer.lock();
        if writer_guard.is_none() {
            *writer_guard = Some(self.storage.create_output_append(&self.path)?);
        }
        let writer = writer_guard
            .as_mut()
            .ok_or_else(|| MarqueeError::internal("log writer missing after open"))?;
        let start = writer.position();
        let first_seq = self.next_seq.load(Ordering::SeqCst);

        let written = Self::write_entries(writer, entries, first_seq);
        match written {
            Ok(last) => {
                self.next_seq.store(last + 1, Ordering::SeqCst);
                Ok(last)
            }
            Err(err) => {
                // Drop the writer and cut the file back so a partial frame
                // never sits in front of later appends.
                *writer_guard = None;
                drop(writer_guard);
                if let Err(repair) = self.truncate_to(start) {
                    log::error!("{}: failed to roll back partial batch: {repair}", self.path);
                }
                Err(err)
            }
        }
    }

    fn write_entries(
        writer: &mut Box<dyn StorageOutput>,
        entries: &[WalEntry],
        first_seq: SeqNumber,
    ) -> Result<SeqNumber> {
        let mut last = first_seq.saturating_sub(1);
        for (offset, entry) in entries.iter().enumerate() {
            let seq = first_seq + offset as SeqNumber;
            write_frame(
                writer,
                &WalRecord {
                    seq,
                    entry: entry.clone(),
                },
            )?;
            last = seq;
        }
        writer.flush_and_sync()?;
        Ok(last)
    }

    fn truncate_to(&self, len: u64) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }
        let mut input = self.storage.open_input(&self.path)?;
        let mut bytes = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut bytes)?;
        drop(input);

        if (bytes.len() as u64) > len {
            self.rewrite_bytes(&bytes[..len as usize])?;
        }
        Ok(())
    }

    /// Replace the log with exactly `entries`, renumbered from 1.
    ///
    /// The new log is written to a temporary file and renamed over the old one.
    pub fn rewrite(&self, entries: &[WalEntry]) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        *writer_guard = None;

        let tmp_path = self.tmp_path();
        let mut output = self.storage.create_output(&tmp_path)?;
        for (i, entry) in entries.iter().enumerate() {
            write_frame(
                &mut output,
                &WalRecord {
                    seq: i as SeqNumber + 1,
                    entry: entry.clone(),
                },
            )?;
        }
        output.close()?;
        drop(output);

        self.storage.rename_file(&tmp_path, &self.path)?;
        self.storage.sync()?;
        self.next_seq
            .store(entries.len() as SeqNumber + 1, Ordering::SeqCst);
        Ok(())
    }

    fn tmp_path(&self) -> String {
        format!("{}.tmp", self.path)
    }

    /// Callers must not hold the writer lock.
    fn rewrite_bytes(&self, bytes: &[u8]) -> Result<()> {
        let mut writer_guard = self.writer.lock();
        *writer_guard = None;
        drop(writer_guard);

        let tmp_path = self.tmp_path();
        let mut output = self.storage.create_output(&tmp_path)?;
        output.write_all(bytes)?;
        output.close()?;
        drop(output);

        self.storage.rename_file(&tmp_path, &self.path)?;
        self.storage.sync()
    }
}

fn write_frame<W: Write + ?Sized>(writer: &mut W, record: &WalRecord) -> Result<()> {
    let payload = bincode::serialize(record)
        .map_err(|e| MarqueeError::storage(format!("Failed to encode log record: {e}")))?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            MarqueeError::invalid_argument(format!(
                "log record of {} bytes is too large",
                payload.len()
            ))
        })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN as usize + payload.len());
    frame.write_u32::<LittleEndian>(len)?;
    frame.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
    frame.extend_from_slice(&payload);
    writer.write_all(&frame)?;
    Ok(())
}

/// Decode frames until the first invalid one. Returns the records and the
/// byte length of the valid prefix.
fn decode_frames(bytes: &[u8]) -> (Vec<WalRecord>, u64) {
    let mut records = Vec::new();
    let mut position = 0usize;

    loop {
        let rest = &bytes[position..];
        if rest.len() < FRAME_HEADER_LEN as usize {
            break;
        }

        let mut header = &rest[..FRAME_HEADER_LEN as usize];
        let (Ok(len), Ok(crc)) = (
            header.read_u32::<LittleEndian>(),
            header.read_u32::<LittleEndian>(),
        ) else {
            break;
        };
        if len > MAX_FRAME_LEN {
            break;
        }

        let start = FRAME_HEADER_LEN as usize;
        let end = start + len as usize;
        if rest.len() < end {
            break;
        }

        let payload = &rest[start..end];
        if crc32fast::hash(payload) != crc {
            break;
        }
        let Ok(record) = bincode::deserialize::<WalRecord>(payload) else {
            break;
        };

        records.push(record);
        position += end;
    }

    (records, position as u64)
}
