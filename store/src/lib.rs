//! Append-only record store.
//!
//! The file is a plain sequence of frames:
//!
//! ```text
//! [4 bytes: len (u32 LE)][len bytes: postcard-encoded Record][4 bytes: len][...]
//! ```
//!
//! Writers only ever append whole frames. Readers stop at the first frame
//! that is cut short or fails to decode, so a record torn by a concurrent or
//! interrupted write hides itself instead of poisoning the read.

use postwatch_core::{CoreError, Record, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};


const LEN_PREFIX: usize = 4;

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single frame, creating the file if needed.
    pub async fn append(&self, record: &Record) -> Result<(), CoreError> {
        let frame = encode_frame(record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&frame).await?;
        file.flush().await?;
        file.sync_data().await?;

        debug!("Appended post {} to {}", record.id(), self.path.display());
        Ok(())
    }

    /// Appends records in order, one frame each.
    pub async fn append_all(&self, records: &[Record]) -> Result<(), CoreError> {
        for record in records {
            self.append(record).await?;
        }
        Ok(())
    }

    /// Every decodable record in file order. A missing file reads as empty.
    pub async fn read_all(&self) -> Result<Vec<Record>, CoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store {} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(decode_frames(&bytes))
    }
}

pub fn encode_frame(record: &Record) -> Result<Vec<u8>, CoreError> {
    let payload = postcard::to_allocvec(record).map_err(StorageError::from)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StorageError::RecordTooLarge { len: payload.len() })?;

    let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode_frames(bytes: &[u8]) -> Vec<Record> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let Some(prefix) = bytes.get(offset..offset + LEN_PREFIX) else {
            warn!("Ignoring truncated length prefix at byte {}", offset);
            break;
        };
        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(prefix);
        let len = u32::from_le_bytes(len_bytes) as usize;

        let start = offset + LEN_PREFIX;
        let Some(payload) = start.checked_add(len).and_then(|end| bytes.get(start..end)) else {
            warn!("Ignoring truncated record at byte {}", offset);
            break;
        };

        match postcard::from_bytes::<Record>(payload) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Ignoring undecodable record at byte {}: {}", offset, e);
                break;
            }
        }
        offset = start + len;
    }

    records
}
