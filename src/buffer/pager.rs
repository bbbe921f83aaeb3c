use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::common::{PageId, Result, RowstoreError, PAGE_SIZE};
use crate::storage::disk::DiskManager;

/// Raw contents of one page.
pub type Page = [u8; PAGE_SIZE];

struct CachedPage {
    data: Box<Page>,
    dirty: bool,
}

/// Pager owns the database file and an in-memory cache of its pages.
///
/// Pages are loaded lazily on first access and stay resident until the
/// pager is dropped; nothing is evicted. Page numbers are handed out in
/// increasing order and never reused.
pub struct Pager {
    disk_manager: DiskManager,
    /// Cached pages keyed by page number
    pages: HashMap<PageId, CachedPage>,
    /// Number of pages materialized so far (on disk or in cache)
    num_pages: u32,
    /// Pages numbered at or above this are refused
    max_pages: u32,
}

impl Pager {
    /// Opens the backing file, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P, max_pages: u32) -> Result<Self> {
        let disk_manager = DiskManager::new(path)?;
        let num_pages = disk_manager.get_num_pages();

        debug!(
            path = disk_manager.get_db_path(),
            num_pages, "opened pager"
        );

        Ok(Self {
            disk_manager,
            pages: HashMap::new(),
            num_pages,
            max_pages,
        })
    }

    /// Returns a page for reading, loading it from disk on a cache miss.
    pub fn get_page(&mut self, page_id: PageId) -> Result<&Page> {
        let cached = self.load(page_id)?;
        Ok(&cached.data)
    }

    /// Returns a page for writing and marks it dirty.
    pub fn get_page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        let cached = self.load(page_id)?;
        cached.dirty = true;
        Ok(&mut cached.data)
    }

    fn load(&mut self, page_id: PageId) -> Result<&mut CachedPage> {
        if page_id.as_u32() >= self.max_pages {
            return Err(RowstoreError::PageOutOfBounds {
                page: page_id,
                max: self.max_pages,
            });
        }

        if !self.pages.contains_key(&page_id) {
            let mut data: Box<Page> = Box::new([0u8; PAGE_SIZE]);

            // Pages past the end of the file start out zeroed.
            if page_id.as_u32() < self.disk_manager.get_num_pages() {
                self.disk_manager.read_page(page_id, &mut data)?;
            }
            debug!(page = page_id.as_u32(), "page cache miss");

            if page_id.as_u32() >= self.num_pages {
                self.num_pages = page_id.as_u32() + 1;
            }
            self.pages.insert(page_id, CachedPage { data, dirty: false });
        }

        self.pages
            .get_mut(&page_id)
            .ok_or(RowstoreError::PageNotLoaded(page_id))
    }

    /// Writes a loaded page back to its file offset.
    pub fn flush(&mut self, page_id: PageId) -> Result<()> {
        let cached = self
            .pages
            .get_mut(&page_id)
            .ok_or(RowstoreError::PageNotLoaded(page_id))?;

        self.disk_manager.write_page(page_id, &cached.data)?;
        cached.dirty = false;
        Ok(())
    }

    /// Writes every dirty page in page order, then syncs the file.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut dirty: Vec<PageId> = self
            .pages
            .iter()
            .filter(|(_, cached)| cached.dirty)
            .map(|(&page_id, _)| page_id)
            .collect();
        dirty.sort_unstable();

        for &page_id in &dirty {
            self.flush(page_id)?;
        }
        self.disk_manager.sync()?;

        debug!(pages = dirty.len(), "flushed dirty pages");
        Ok(())
    }

    /// Returns the next unused page number. Until a page is fetched under
    /// that number, repeated calls return the same value.
    pub fn allocate_new_page_number(&self) -> PageId {
        PageId::new(self.num_pages)
    }

    /// Number of pages materialized so far.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Current length of the backing file in bytes.
    pub fn file_length(&self) -> u64 {
        self.disk_manager.get_file_length()
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    pub fn is_dirty(&self, page_id: PageId) -> bool {
        self.pages.get(&page_id).is_some_and(|cached| cached.dirty)
    }

    pub fn disk_manager(&self) -> &DiskManager {
        &self.disk_manager
    }
}
