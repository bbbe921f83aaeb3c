use crate::common::{PageId, Result, RowstoreError};
use crate::tuple::Row;

use super::btree_page::{leaf_node_value_offset, LEAF_NODE_VALUE_SIZE};
use super::btree_table::Table;

/// A position in the table: a leaf page and a cell within it.
///
/// A cursor borrows its table mutably, so the tree cannot change under it.
pub struct Cursor<'a> {
    table: &'a mut Table,
    page_num: PageId,
    cell_num: u32,
    end_of_table: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(
        table: &'a mut Table,
        page_num: PageId,
        cell_num: u32,
        end_of_table: bool,
    ) -> Self {
        Self {
            table,
            page_num,
            cell_num,
            end_of_table,
        }
    }

    pub fn page_num(&self) -> PageId {
        self.page_num
    }

    pub fn cell_num(&self) -> u32 {
        self.cell_num
    }

    /// True once the cursor has moved past the last row.
    pub fn end_of_table(&self) -> bool {
        self.end_of_table
    }

    /// The serialized row under the cursor, borrowed from the cached page.
    /// Fails with `CursorAtEnd` if the cursor is not on a row.
    pub fn value(&mut self) -> Result<&[u8]> {
        let num_cells = self.table.leaf(self.page_num)?.num_cells();
        if self.end_of_table || self.cell_num >= num_cells {
            return Err(RowstoreError::CursorAtEnd);
        }

        let page = self.table.pager_mut().get_page(self.page_num)?;
        let offset = leaf_node_value_offset(self.cell_num);
        Ok(&page[offset..offset + LEAF_NODE_VALUE_SIZE])
    }

    /// Decodes the row under the cursor.
    pub fn row(&mut self) -> Result<Row> {
        Ok(Row::deserialize(self.value()?))
    }

    /// Moves to the next cell. Past the end of a leaf, continues in the
    /// leaf that holds the next larger key, if there is one.
    pub fn advance(&mut self) -> Result<()> {
        let (num_cells, max_key) = {
            let leaf = self.table.leaf(self.page_num)?;
            (leaf.num_cells(), leaf.max_key())
        };

        self.cell_num += 1;
        if self.cell_num < num_cells {
            return Ok(());
        }

        let Some(next_key) = max_key.and_then(|key| key.checked_add(1)) else {
            self.end_of_table = true;
            return Ok(());
        };

        let next_page_num = self.table.find_leaf(next_key)?;
        if next_page_num == self.page_num {
            self.end_of_table = true;
            return Ok(());
        }

        let leaf = self.table.leaf(next_page_num)?;
        let cell_num = leaf.find(next_key);
        if cell_num >= leaf.num_cells() {
            self.end_of_table = true;
            return Ok(());
        }

        self.page_num = next_page_num;
        self.cell_num = cell_num;
        Ok(())
    }
}

/// Single-pass iterator over rows in key order.
pub struct Rows<'a> {
    cursor: Cursor<'a>,
    pending_error: Option<RowstoreError>,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(cursor: Cursor<'a>) -> Self {
        Self {
            cursor,
            pending_error: None,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        if self.cursor.end_of_table {
            return None;
        }

        let row = match self.cursor.row() {
            Ok(row) => row,
            Err(e) => {
                self.cursor.end_of_table = true;
                return Some(Err(e));
            }
        };

        if let Err(e) = self.cursor.advance() {
            self.cursor.end_of_table = true;
            self.pending_error = Some(e);
        }

        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableConfig;
    use crate::index::btree_page::LEAF_NODE_MAX_CELLS;
    use tempfile::NamedTempFile;

    fn row(id: u32) -> Row {
        Row::new(id as i64, format!("user{id}"), format!("person{id}@example.com")).unwrap()
    }

    #[test]
    fn test_cursor_walks_single_leaf() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut table = Table::open(temp_file.path()).unwrap();
        for id in [5, 1, 3] {
            table.insert(&row(id)).unwrap();
        }

        let mut cursor = table.start().unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table() {
            seen.push(cursor.row().unwrap().id());
            cursor.advance().unwrap();
        }
        assert_eq!(seen, vec![1, 3, 5]);
    }

    #[test]
    fn test_cursor_value_is_serialized_row() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut table = Table::open(temp_file.path()).unwrap();
        table.insert(&row(9)).unwrap();

        let mut cursor = table.find(9).unwrap();
        assert!(!cursor.end_of_table());
        assert_eq!(cursor.value().unwrap(), &row(9).to_bytes()[..]);
    }

    #[test]
    fn test_find_past_last_key_is_end_of_table() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut table = Table::open(temp_file.path()).unwrap();
        for id in 0..3 {
            table.insert(&row(id)).unwrap();
        }

        let cursor = table.find(10).unwrap();
        assert_eq!(cursor.cell_num(), 3);
        assert!(cursor.end_of_table());
    }

    #[test]
    fn test_value_on_end_cursor_of_full_leaf() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut table = Table::open(temp_file.path()).unwrap();
        for id in 0..LEAF_NODE_MAX_CELLS as u32 {
            table.insert(&row(id)).unwrap();
        }

        let mut cursor = table.find(100).unwrap();
        assert!(cursor.end_of_table());
        assert_eq!(cursor.cell_num() as usize, LEAF_NODE_MAX_CELLS);
        assert!(matches!(cursor.value(), Err(RowstoreError::CursorAtEnd)));
        assert!(matches!(cursor.row(), Err(RowstoreError::CursorAtEnd)));
    }

    #[test]
    fn test_cursor_crosses_leaves() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = TableConfig::default().with_internal_node_max_keys(2);
        let mut table = Table::open_with_config(temp_file.path(), config).unwrap();

        let count = (LEAF_NODE_MAX_CELLS * 6) as u32;
        for id in 0..count {
            table.insert(&row(id * 3)).unwrap();
        }

        // Start mid-table and scan to the end.
        let mut cursor = table.find(30).unwrap();
        let mut seen = Vec::new();
        while !cursor.end_of_table() {
            seen.push(cursor.row().unwrap().id());
            cursor.advance().unwrap();
        }
        assert_eq!(seen, (10..count).map(|i| i * 3).collect::<Vec<_>>());
    }

    #[test]
    fn test_scan_stops_at_max_key() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut table = Table::open(temp_file.path()).unwrap();
        for id in (u32::MAX - 20)..=u32::MAX {
            table.insert(&row(id)).unwrap();
        }

        let ids: Vec<u32> = table.select().unwrap().map(|r| r.unwrap().id()).collect();
        assert_eq!(ids, ((u32::MAX - 20)..=u32::MAX).collect::<Vec<_>>());
    }
}
