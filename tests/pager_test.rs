//! Integration tests for the disk manager and pager

use std::fs;

use rowstore::buffer::Pager;
use rowstore::common::{PageId, PAGE_SIZE};
use rowstore::storage::disk::DiskManager;
use rowstore::RowstoreError;
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_random_access() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();
    assert_eq!(dm.get_num_pages(), 0);

    let write_order = [5, 2, 8, 0, 7, 3, 9, 1, 6, 4];
    for &i in &write_order {
        let mut data = [0u8; PAGE_SIZE];
        data[0] = i as u8;
        dm.write_page(PageId::new(i), &data).unwrap();
    }
    assert_eq!(dm.get_num_pages(), 10);
    assert_eq!(dm.get_file_length(), 10 * PAGE_SIZE as u64);

    for i in 0..10 {
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(i), &mut data).unwrap();
        assert_eq!(data[0], i as u8);
    }
    assert_eq!(dm.get_num_writes(), 10);
    assert_eq!(dm.get_num_reads(), 10);
}

#[test]
fn test_open_rejects_unaligned_file() {
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), vec![0u8; PAGE_SIZE + 100]).unwrap();

    assert!(matches!(
        Pager::open(temp_file.path(), 100),
        Err(RowstoreError::CorruptFile { length }) if length == PAGE_SIZE as u64 + 100
    ));
}

#[test]
fn test_pager_persists_flushed_pages() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let mut pager = Pager::open(&path, 100).unwrap();
        for i in 0..3u32 {
            let page = pager.get_page_mut(PageId::new(i)).unwrap();
            page[..4].copy_from_slice(&(i * 11).to_le_bytes());
            page[PAGE_SIZE - 1] = 0xEE;
        }
        assert_eq!(pager.num_pages(), 3);
        pager.flush_all().unwrap();
        assert_eq!(pager.file_length(), 3 * PAGE_SIZE as u64);
    }

    let mut pager = Pager::open(&path, 100).unwrap();
    assert_eq!(pager.num_pages(), 3);
    for i in 0..3u32 {
        let page = pager.get_page(PageId::new(i)).unwrap();
        assert_eq!(page[..4], (i * 11).to_le_bytes());
        assert_eq!(page[PAGE_SIZE - 1], 0xEE);
    }
}

#[test]
fn test_pager_unflushed_pages_are_lost() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let mut pager = Pager::open(&path, 100).unwrap();
        pager.get_page_mut(PageId::new(0)).unwrap()[0] = 1;
    }

    let pager = Pager::open(&path, 100).unwrap();
    assert_eq!(pager.num_pages(), 0);
    assert_eq!(pager.file_length(), 0);
}

#[test]
fn test_pager_page_out_of_bounds() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut pager = Pager::open(temp_file.path(), 4).unwrap();

    assert!(pager.get_page(PageId::new(3)).is_ok());
    assert!(matches!(
        pager.get_page(PageId::new(4)),
        Err(RowstoreError::PageOutOfBounds { max: 4, .. })
    ));
}

#[test]
fn test_pager_flush_unloaded_page() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut pager = Pager::open(temp_file.path(), 4).unwrap();

    assert!(matches!(
        pager.flush(PageId::new(2)),
        Err(RowstoreError::PageNotLoaded(PageId(2)))
    ));
}

#[test]
fn test_pager_allocation_is_monotonic() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut pager = Pager::open(temp_file.path(), 100).unwrap();

    let mut allocated = Vec::new();
    for _ in 0..5 {
        let page_id = pager.allocate_new_page_number();
        pager.get_page_mut(page_id).unwrap();
        allocated.push(page_id.as_u32());
    }
    assert_eq!(allocated, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_pager_reads_do_not_dirty() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut pager = Pager::open(temp_file.path(), 100).unwrap();

    pager.get_page(PageId::new(0)).unwrap();
    assert!(pager.is_cached(PageId::new(0)));
    assert!(!pager.is_dirty(PageId::new(0)));

    pager.get_page_mut(PageId::new(0)).unwrap();
    assert!(pager.is_dirty(PageId::new(0)));

    pager.flush_all().unwrap();
    assert!(!pager.is_dirty(PageId::new(0)));
}
