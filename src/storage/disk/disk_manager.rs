use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::{PageId, Result, RowstoreError, PAGE_SIZE};

/// DiskManager is responsible for reading and writing pages to/from disk.
/// It manages a single database file whose length is always a whole
/// number of pages.
pub struct DiskManager {
    /// The database file
    db_file: Mutex<File>,
    /// Path to the database file
    db_path: String,
    /// Current file length in bytes
    file_length: AtomicU64,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the database file for read+write, creating it if it doesn't exist.
    /// Fails with `CorruptFile` if the existing length is not page-aligned.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(RowstoreError::CorruptFile {
                length: file_length,
            });
        }

        Ok(Self {
            db_file: Mutex::new(file),
            db_path: path_str,
            file_length: AtomicU64::new(file_length),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads a page from disk into the provided buffer.
    /// A short read at end-of-file leaves the rest of the buffer zeroed.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(page_id.file_offset()))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            match file.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a full page to its offset in the file.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let offset = page_id.file_offset();

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.file_length
            .fetch_max(offset + PAGE_SIZE as u64, Ordering::SeqCst);
        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of whole pages currently in the file.
    pub fn get_num_pages(&self) -> u32 {
        (self.get_file_length() / PAGE_SIZE as u64) as u32
    }

    /// Returns the file length in bytes.
    pub fn get_file_length(&self) -> u64 {
        self.file_length.load(Ordering::SeqCst)
    }

    /// Returns the number of page reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the database file.
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.db_file.lock();
        file.sync_all()?;
        Ok(())
    }
}
