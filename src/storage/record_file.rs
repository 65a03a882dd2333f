//! Record File - fixed-width record slots with stable positions.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::common::config::RECORD_HEADER_SIZE;
use crate::common::{Error, RecordPosition, Result};
use crate::record::RecordStore;

/// Append-only file of fixed-width records.
///
/// # File Layout
/// ```text
/// ┌───────────┬─────────────────────────────┬─────────────┬─────┐
/// │ live: u32 │ Slot 0                      │ Slot 1      │ ... │
/// │  (4 B)    │ live u8 | crc32 u32 | bytes │             │     │
/// └───────────┴─────────────────────────────┴─────────────┴─────┘
/// ```
///
/// A record's position is the byte offset of its slot. Removal clears the
/// slot's live flag in place, so other positions held by the index stay
/// valid; removed slots are never reused.
///
/// # Checksum
/// Each slot stores the CRC32 of its record bytes, verified on every read.
pub struct RecordFile {
    file: File,
    record_size: usize,
    /// Number of live records (mirrors the header).
    live: u32,
    file_len: u64,
}

impl RecordFile {
    const SLOT_HEADER_SIZE: usize = 5;
    const LIVE: u8 = 1;
    const REMOVED: u8 = 0;

    /// Create a new, empty record file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or `record_size` is zero.
    pub fn create<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self> {
        Self::check_record_size(record_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::init(file, record_size)
    }

    /// Open an existing record file.
    ///
    /// # Errors
    /// Returns `Error::CorruptFile` if the header is short or the body is not
    /// a whole number of slots.
    pub fn open<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self> {
        Self::check_record_size(record_size)?;
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let file_len = file.metadata()?.len();
        if file_len < RECORD_HEADER_SIZE as u64 {
            return Err(Error::corrupt(0, "record file header is truncated"));
        }

        let mut header = [0u8; RECORD_HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        let live = u32::from_le_bytes(header);

        let slot_size = (Self::SLOT_HEADER_SIZE + record_size) as u64;
        let body = file_len - RECORD_HEADER_SIZE as u64;
        if body % slot_size != 0 {
            return Err(Error::corrupt(
                file_len,
                format!("record area of {} bytes is not a multiple of {}", body, slot_size),
            ));
        }
        if u64::from(live) > body / slot_size {
            return Err(Error::corrupt(0, "live record count exceeds slot count"));
        }

        Ok(Self {
            file,
            record_size,
            live,
            file_len,
        })
    }

    /// Open an existing record file, or create it if it doesn't exist.
    ///
    /// A file too short to hold a header is reinitialized.
    pub fn open_or_create<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self> {
        let path = path.as_ref();
        match path.metadata() {
            Ok(meta) if meta.len() >= RECORD_HEADER_SIZE as u64 => Self::open(path, record_size),
            _ => {
                Self::check_record_size(record_size)?;
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?;
                Self::init(file, record_size)
            }
        }
    }

    fn init(file: File, record_size: usize) -> Result<Self> {
        let mut records = Self {
            file,
            record_size,
            live: 0,
            file_len: RECORD_HEADER_SIZE as u64,
        };
        records.write_header()?;
        debug!(record_size, "created record file");
        Ok(records)
    }

    fn check_record_size(record_size: usize) -> Result<()> {
        if record_size == 0 {
            return Err(Error::InvalidConfig("record size must be non-zero".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    #[inline]
    fn slot_size(&self) -> usize {
        Self::SLOT_HEADER_SIZE + self.record_size
    }

    /// Slots ever written, live or removed.
    pub fn slot_count(&self) -> u64 {
        (self.file_len - RECORD_HEADER_SIZE as u64) / self.slot_size() as u64
    }

    /// Positions of all live records in file order.
    pub fn live_positions(&mut self) -> Result<Vec<RecordPosition>> {
        let mut positions = Vec::with_capacity(self.live as usize);
        for slot in 0..self.slot_count() {
            let position = RECORD_HEADER_SIZE as u64 + slot * self.slot_size() as u64;
            if self.read_flag(position)? == Self::LIVE {
                positions.push(position);
            }
        }
        Ok(positions)
    }

    /// Flush all writes to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.live.to_le_bytes())?;
        Ok(())
    }

    fn check_position(&self, position: RecordPosition) -> Result<()> {
        let header = RECORD_HEADER_SIZE as u64;
        let slot = self.slot_size() as u64;
        if position < header || (position - header) % slot != 0 || position + slot > self.file_len {
            return Err(Error::corrupt(
                position,
                "record position does not name a slot",
            ));
        }
        Ok(())
    }

    fn read_flag(&mut self, position: RecordPosition) -> Result<u8> {
        let mut flag = [0u8; 1];
        self.file.seek(SeekFrom::Start(position))?;
        self.file.read_exact(&mut flag)?;
        Ok(flag[0])
    }
}

impl RecordStore for RecordFile {
    fn append(&mut self, bytes: &[u8]) -> Result<RecordPosition> {
        if bytes.len() != self.record_size {
            return Err(Error::Format(format!(
                "record is {} bytes, expected {}",
                bytes.len(),
                self.record_size
            )));
        }

        let mut slot = Vec::with_capacity(self.slot_size());
        slot.push(Self::LIVE);
        slot.extend_from_slice(&crc32fast::hash(bytes).to_le_bytes());
        slot.extend_from_slice(bytes);

        let position = self.file_len;
        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(&slot)?;
        self.file_len += slot.len() as u64;

        self.live += 1;
        self.write_header()?;
        Ok(position)
    }

    fn read(&mut self, position: RecordPosition) -> Result<Vec<u8>> {
        self.check_position(position)?;

        let mut slot = vec![0u8; self.slot_size()];
        self.file.seek(SeekFrom::Start(position))?;
        self.file.read_exact(&mut slot)?;

        if slot[0] != Self::LIVE {
            return Err(Error::corrupt(position, "record was removed"));
        }
        let mut stored = [0u8; 4];
        stored.copy_from_slice(&slot[1..Self::SLOT_HEADER_SIZE]);
        let record = slot.split_off(Self::SLOT_HEADER_SIZE);
        if crc32fast::hash(&record) != u32::from_le_bytes(stored) {
            return Err(Error::corrupt(position, "record checksum mismatch"));
        }
        Ok(record)
    }

    fn remove(&mut self, position: RecordPosition) -> Result<()> {
        self.check_position(position)?;
        if self.read_flag(position)? != Self::LIVE {
            return Err(Error::corrupt(position, "record was already removed"));
        }

        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(&[Self::REMOVED])?;
        self.live -= 1;
        self.write_header()
    }

    fn len(&self) -> usize {
        self.live as usize
    }
}
