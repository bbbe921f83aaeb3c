//! Byte layout of B-tree nodes.
//!
//! Every page holds exactly one node. All integers are little-endian.
//!
//! ```text
//! Common header (6 bytes)
//! +-----------+-----------+----------------+
//! | type (u8) | root (u8) | parent (u32)   |
//! +-----------+-----------+----------------+
//!
//! Leaf node                         Internal node
//! +----------------+                +----------------+-------------------+
//! | num_cells (u32)|                | num_keys (u32) | right_child (u32) |
//! +----------------+                +----------------+-------------------+
//! | key | row      | x num_cells    | key | child    | x num_keys
//! +----------------+                +----------------+
//! ```
//!
//! In an internal node, child `i` holds keys `<= key[i]` and `right_child`
//! holds every key greater than the last stored key.
//!
//! The views here borrow a page buffer and never copy it. They are generic
//! over the buffer so the same type serves `&Page` and `&mut Page`.

use crate::common::{PageId, Result, RowstoreError, PAGE_SIZE, ROW_SIZE};
use crate::tuple::Row;

// Common node header layout
pub const NODE_TYPE_SIZE: usize = 1;
pub const NODE_TYPE_OFFSET: usize = 0;
pub const IS_ROOT_SIZE: usize = 1;
pub const IS_ROOT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const PARENT_POINTER_SIZE: usize = 4;
pub const PARENT_POINTER_OFFSET: usize = IS_ROOT_OFFSET + IS_ROOT_SIZE;
pub const COMMON_NODE_HEADER_SIZE: usize = NODE_TYPE_SIZE + IS_ROOT_SIZE + PARENT_POINTER_SIZE;

// Leaf node header layout
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_HEADER_SIZE: usize = COMMON_NODE_HEADER_SIZE + LEAF_NODE_NUM_CELLS_SIZE;

// Leaf node body layout
pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_KEY_OFFSET: usize = 0;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_VALUE_OFFSET: usize = LEAF_NODE_KEY_OFFSET + LEAF_NODE_KEY_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;
pub const LEAF_NODE_MAX_CELLS: usize = LEAF_NODE_SPACE_FOR_CELLS / LEAF_NODE_CELL_SIZE;
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 1) - LEAF_NODE_RIGHT_SPLIT_COUNT;

// Internal node header layout
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    COMMON_NODE_HEADER_SIZE + INTERNAL_NODE_NUM_KEYS_SIZE + INTERNAL_NODE_RIGHT_CHILD_SIZE;

// Internal node body layout
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_OFFSET: usize = 0;
pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_CHILD_OFFSET: usize = INTERNAL_NODE_KEY_OFFSET + INTERNAL_NODE_KEY_SIZE;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_KEY_SIZE + INTERNAL_NODE_CHILD_SIZE;
pub const INTERNAL_NODE_MAX_KEYS: usize =
    (PAGE_SIZE - INTERNAL_NODE_HEADER_SIZE) / INTERNAL_NODE_CELL_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Internal = 0,
    Leaf = 1,
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Reads the node type byte of a page.
pub fn node_type(data: &[u8]) -> Result<NodeType> {
    match data[NODE_TYPE_OFFSET] {
        0 => Ok(NodeType::Internal),
        1 => Ok(NodeType::Leaf),
        other => Err(RowstoreError::UnknownNodeType(other)),
    }
}

/// Largest key stored directly in a node: a leaf's last cell key, or an
/// internal node's last stored key. `None` for an empty node.
pub fn node_max_key(page: PageId, data: &[u8]) -> Result<Option<u32>> {
    Ok(match node_type(data)? {
        NodeType::Leaf => {
            let leaf = LeafNode::new(data);
            leaf.validate(page)?;
            leaf.max_key()
        }
        NodeType::Internal => {
            let node = InternalNode::new(data);
            node.validate(page)?;
            node.max_key()
        }
    })
}

/// Accessors for the header shared by leaf and internal nodes.
pub trait NodeHeader {
    fn bytes(&self) -> &[u8];

    fn node_type(&self) -> Result<NodeType> {
        node_type(self.bytes())
    }

    fn is_root(&self) -> bool {
        self.bytes()[IS_ROOT_OFFSET] != 0
    }

    fn parent(&self) -> PageId {
        PageId::new(read_u32(self.bytes(), PARENT_POINTER_OFFSET))
    }
}

pub trait NodeHeaderMut: NodeHeader {
    fn bytes_mut(&mut self) -> &mut [u8];

    fn set_node_type(&mut self, node_type: NodeType) {
        self.bytes_mut()[NODE_TYPE_OFFSET] = node_type as u8;
    }

    fn set_root(&mut self, is_root: bool) {
        self.bytes_mut()[IS_ROOT_OFFSET] = u8::from(is_root);
    }

    fn set_parent(&mut self, parent: PageId) {
        write_u32(self.bytes_mut(), PARENT_POINTER_OFFSET, parent.as_u32());
    }
}

/// A page viewed only through its common header.
pub struct Node<B> {
    data: B,
}

impl<B: AsRef<[u8]>> Node<B> {
    pub fn new(data: B) -> Self {
        debug_assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { data }
    }
}

impl<B: AsRef<[u8]>> NodeHeader for Node<B> {
    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> NodeHeaderMut for Node<B> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}

/// Byte offset of the serialized row in leaf cell `cell_num`.
pub fn leaf_node_value_offset(cell_num: u32) -> usize {
    LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE + LEAF_NODE_VALUE_OFFSET
}

/// A page viewed as a leaf node.
pub struct LeafNode<B> {
    data: B,
}

impl<B: AsRef<[u8]>> NodeHeader for LeafNode<B> {
    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> NodeHeaderMut for LeafNode<B> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}

impl<B: AsRef<[u8]>> LeafNode<B> {
    pub fn new(data: B) -> Self {
        debug_assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { data }
    }

    pub fn num_cells(&self) -> u32 {
        read_u32(self.bytes(), LEAF_NODE_NUM_CELLS_OFFSET)
    }

    fn cell_offset(cell_num: u32) -> usize {
        LEAF_NODE_HEADER_SIZE + cell_num as usize * LEAF_NODE_CELL_SIZE
    }

    /// The whole cell (key followed by the serialized row).
    pub fn cell(&self, cell_num: u32) -> &[u8] {
        let offset = Self::cell_offset(cell_num);
        &self.bytes()[offset..offset + LEAF_NODE_CELL_SIZE]
    }

    pub fn key(&self, cell_num: u32) -> u32 {
        read_u32(self.bytes(), Self::cell_offset(cell_num) + LEAF_NODE_KEY_OFFSET)
    }

    /// The serialized row stored in a cell.
    pub fn value(&self, cell_num: u32) -> &[u8] {
        let offset = Self::cell_offset(cell_num) + LEAF_NODE_VALUE_OFFSET;
        &self.bytes()[offset..offset + LEAF_NODE_VALUE_SIZE]
    }

    pub fn max_key(&self) -> Option<u32> {
        self.num_cells()
            .checked_sub(1)
            .map(|last| self.key(last))
    }

    /// Binary search for `key`. Returns its cell index if present, otherwise
    /// the index at which it would be inserted.
    pub fn find(&self, key: u32) -> u32 {
        let mut min_index = 0;
        let mut one_past_max_index = self.num_cells();

        while one_past_max_index != min_index {
            let index = min_index + (one_past_max_index - min_index) / 2;
            let key_at_index = self.key(index);
            if key == key_at_index {
                return index;
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        min_index
    }

    /// Fails with `CorruptTree` unless this is a leaf whose cell count fits
    /// in a page.
    pub fn validate(&self, page: PageId) -> Result<()> {
        if self.node_type()? != NodeType::Leaf {
            return Err(RowstoreError::CorruptTree {
                page,
                reason: "expected a leaf node",
            });
        }
        if self.num_cells() as usize > LEAF_NODE_MAX_CELLS {
            return Err(RowstoreError::CorruptTree {
                page,
                reason: "leaf cell count exceeds capacity",
            });
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafNode<B> {
    /// Zeroes the page and shapes it as an empty, non-root leaf.
    pub fn initialize(&mut self) {
        self.bytes_mut().fill(0);
        self.set_node_type(NodeType::Leaf);
        self.set_root(false);
        self.set_num_cells(0);
    }

    pub fn set_num_cells(&mut self, num_cells: u32) {
        write_u32(self.bytes_mut(), LEAF_NODE_NUM_CELLS_OFFSET, num_cells);
    }

    pub fn set_cell(&mut self, cell_num: u32, cell: &[u8]) {
        let offset = Self::cell_offset(cell_num);
        self.bytes_mut()[offset..offset + LEAF_NODE_CELL_SIZE].copy_from_slice(cell);
    }

    /// Writes `key` and `row` into a cell slot without touching `num_cells`.
    pub fn write_cell(&mut self, cell_num: u32, key: u32, row: &Row) {
        let offset = Self::cell_offset(cell_num);
        let data = self.bytes_mut();
        write_u32(data, offset + LEAF_NODE_KEY_OFFSET, key);
        row.serialize(&mut data[offset + LEAF_NODE_VALUE_OFFSET..]);
    }

    /// Sets `num_cells` and zeroes every cell slot past it.
    pub fn truncate(&mut self, num_cells: u32) {
        let start = Self::cell_offset(num_cells);
        self.bytes_mut()[start..].fill(0);
        self.set_num_cells(num_cells);
    }

    /// Inserts a cell at `cell_num`, shifting later cells one slot right.
    /// The caller guarantees the leaf is not full.
    pub fn insert_cell(&mut self, cell_num: u32, key: u32, row: &Row) {
        let num_cells = self.num_cells();
        debug_assert!((num_cells as usize) < LEAF_NODE_MAX_CELLS);

        if cell_num < num_cells {
            let start = Self::cell_offset(cell_num);
            let end = Self::cell_offset(num_cells);
            self.bytes_mut()
                .copy_within(start..end, start + LEAF_NODE_CELL_SIZE);
        }

        self.write_cell(cell_num, key, row);
        self.set_num_cells(num_cells + 1);
    }
}

/// A page viewed as an internal node.
pub struct InternalNode<B> {
    data: B,
}

impl<B: AsRef<[u8]>> NodeHeader for InternalNode<B> {
    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> NodeHeaderMut for InternalNode<B> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}

impl<B: AsRef<[u8]>> InternalNode<B> {
    pub fn new(data: B) -> Self {
        debug_assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { data }
    }

    pub fn num_keys(&self) -> u32 {
        read_u32(self.bytes(), INTERNAL_NODE_NUM_KEYS_OFFSET)
    }

    pub fn right_child(&self) -> PageId {
        PageId::new(read_u32(self.bytes(), INTERNAL_NODE_RIGHT_CHILD_OFFSET))
    }

    fn cell_offset(key_num: u32) -> usize {
        INTERNAL_NODE_HEADER_SIZE + key_num as usize * INTERNAL_NODE_CELL_SIZE
    }

    pub fn key(&self, key_num: u32) -> u32 {
        read_u32(self.bytes(), Self::cell_offset(key_num) + INTERNAL_NODE_KEY_OFFSET)
    }

    /// Child pointer `child_num`; `num_keys` addresses the right child.
    pub fn child(&self, child_num: u32) -> Result<PageId> {
        let num_keys = self.num_keys();
        if child_num > num_keys {
            return Err(RowstoreError::ChildIndexOutOfBounds {
                index: child_num as usize,
                num_keys: num_keys as usize,
            });
        }
        if child_num == num_keys {
            return Ok(self.right_child());
        }
        Ok(PageId::new(read_u32(
            self.bytes(),
            Self::cell_offset(child_num) + INTERNAL_NODE_CHILD_OFFSET,
        )))
    }

    pub fn max_key(&self) -> Option<u32> {
        self.num_keys()
            .checked_sub(1)
            .map(|last| self.key(last))
    }

    /// Index of the child that should contain `key`: the first stored key
    /// `>= key`, or `num_keys` (the right child) if there is none.
    pub fn find_child(&self, key: u32) -> u32 {
        let mut min_index = 0;
        let mut max_index = self.num_keys();

        while min_index != max_index {
            let index = min_index + (max_index - min_index) / 2;
            if self.key(index) >= key {
                max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        min_index
    }

    /// Position of `page` among this node's children, if it is one.
    pub fn child_index_of(&self, page: PageId) -> Option<u32> {
        let num_keys = self.num_keys();
        (0..num_keys)
            .find(|&i| {
                read_u32(self.bytes(), Self::cell_offset(i) + INTERNAL_NODE_CHILD_OFFSET)
                    == page.as_u32()
            })
            .or_else(|| (self.right_child() == page).then_some(num_keys))
    }

    /// All children in key order, the right child last.
    pub fn children(&self) -> Result<Vec<PageId>> {
        (0..=self.num_keys()).map(|i| self.child(i)).collect()
    }

    /// Reads the body back as `(key, child)` cells.
    pub fn entries(&self) -> Result<Vec<(u32, PageId)>> {
        (0..self.num_keys())
            .map(|i| Ok((self.key(i), self.child(i)?)))
            .collect()
    }

    /// Fails with `CorruptTree` unless this is an internal node whose key
    /// count fits in a page.
    pub fn validate(&self, page: PageId) -> Result<()> {
        if self.node_type()? != NodeType::Internal {
            return Err(RowstoreError::CorruptTree {
                page,
                reason: "expected an internal node",
            });
        }
        if self.num_keys() as usize > INTERNAL_NODE_MAX_KEYS {
            return Err(RowstoreError::CorruptTree {
                page,
                reason: "internal key count exceeds capacity",
            });
        }
        Ok(())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalNode<B> {
    /// Zeroes the page and shapes it as an empty, non-root internal node.
    pub fn initialize(&mut self) {
        self.bytes_mut().fill(0);
        self.set_node_type(NodeType::Internal);
        self.set_root(false);
        self.set_num_keys(0);
    }

    pub fn set_num_keys(&mut self, num_keys: u32) {
        write_u32(self.bytes_mut(), INTERNAL_NODE_NUM_KEYS_OFFSET, num_keys);
    }

    pub fn set_right_child(&mut self, child: PageId) {
        write_u32(
            self.bytes_mut(),
            INTERNAL_NODE_RIGHT_CHILD_OFFSET,
            child.as_u32(),
        );
    }

    pub fn set_key(&mut self, key_num: u32, key: u32) {
        write_u32(
            self.bytes_mut(),
            Self::cell_offset(key_num) + INTERNAL_NODE_KEY_OFFSET,
            key,
        );
    }

    /// Sets child pointer `child_num`; `num_keys` addresses the right child.
    pub fn set_child(&mut self, child_num: u32, child: PageId) -> Result<()> {
        let num_keys = self.num_keys();
        if child_num > num_keys {
            return Err(RowstoreError::ChildIndexOutOfBounds {
                index: child_num as usize,
                num_keys: num_keys as usize,
            });
        }
        if child_num == num_keys {
            self.set_right_child(child);
        } else {
            write_u32(
                self.bytes_mut(),
                Self::cell_offset(child_num) + INTERNAL_NODE_CHILD_OFFSET,
                child.as_u32(),
            );
        }
        Ok(())
    }

    /// Rewrites the node body from `(key, child)` cells plus a right child.
    pub fn write_entries(&mut self, cells: &[(u32, PageId)], right_child: PageId) {
        let body_start = Self::cell_offset(0);
        self.bytes_mut()[body_start..].fill(0);

        for (i, &(key, child)) in cells.iter().enumerate() {
            let offset = Self::cell_offset(i as u32);
            let data = self.bytes_mut();
            write_u32(data, offset + INTERNAL_NODE_KEY_OFFSET, key);
            write_u32(data, offset + INTERNAL_NODE_CHILD_OFFSET, child.as_u32());
        }
        self.set_num_keys(cells.len() as u32);
        self.set_right_child(right_child);
    }
}
