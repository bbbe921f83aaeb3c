use std::path::Path;

use tracing::{debug, info, warn};

use crate::buffer::{Page, Pager};
use crate::common::{PageId, Result, RowstoreError, TableConfig, ROOT_PAGE_ID};
use crate::tuple::Row;

use super::btree_cursor::{Cursor, Rows};
use super::btree_page::{
    node_type, InternalNode, LeafNode, Node, NodeHeader, NodeHeaderMut, NodeType,
    LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT,
};

/// A single table stored as a B-tree keyed by row id.
///
/// The root always lives on page 0. When the root splits, its old contents
/// move to a fresh page and page 0 is rewritten as the new internal root.
pub struct Table {
    pager: Pager,
    root_page_num: PageId,
    config: TableConfig,
}

impl Table {
    /// Opens a table with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, TableConfig::default())
    }

    /// Opens a table, initializing page 0 as an empty root leaf if the file
    /// is new.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: TableConfig) -> Result<Self> {
        config.validate()?;
        let mut pager = Pager::open(path, config.max_pages)?;

        if pager.num_pages() == 0 {
            let mut root = LeafNode::new(pager.get_page_mut(ROOT_PAGE_ID)?);
            root.initialize();
            root.set_root(true);
        }

        info!(
            path = pager.disk_manager().get_db_path(),
            num_pages = pager.num_pages(),
            "opened table"
        );

        Ok(Self {
            pager,
            root_page_num: ROOT_PAGE_ID,
            config,
        })
    }

    /// Flushes every dirty page and releases the file.
    pub fn close(mut self) -> Result<()> {
        self.pager.flush_all()?;
        info!(num_pages = self.pager.num_pages(), "closed table");
        Ok(())
    }

    /// Flushes every dirty page without closing.
    pub fn flush(&mut self) -> Result<()> {
        self.pager.flush_all()
    }

    pub fn root_page_num(&self) -> PageId {
        self.root_page_num
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub(crate) fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    /// Cursor at the first row of the table.
    pub fn start(&mut self) -> Result<Cursor<'_>> {
        self.find(0)
    }

    /// Cursor at `key`, or at the position where `key` would be inserted.
    pub fn find(&mut self, key: u32) -> Result<Cursor<'_>> {
        let (page_num, cell_num, num_cells) = self.leaf_position(key)?;
        Ok(Cursor::new(self, page_num, cell_num, cell_num >= num_cells))
    }

    /// Lazily yields every row in ascending id order.
    pub fn select(&mut self) -> Result<Rows<'_>> {
        Ok(Rows::new(self.start()?))
    }

    /// Inserts `row` under its id.
    ///
    /// Fails with `DuplicateKey` if the id is already present and with
    /// `TableFull` if a split would need pages beyond the configured cap.
    /// Neither failure modifies the tree.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        let key = row.id();
        let (page_num, cell_num, num_cells) = self.leaf_position(key)?;

        if cell_num < num_cells {
            let leaf = self.leaf(page_num)?;
            if leaf.key(cell_num) == key {
                warn!(key, "rejected duplicate key");
                return Err(RowstoreError::DuplicateKey(key));
            }
        }

        if (num_cells as usize) < LEAF_NODE_MAX_CELLS {
            LeafNode::new(self.pager.get_page_mut(page_num)?).insert_cell(cell_num, key, row);
            return Ok(());
        }

        let needed = self.pages_needed_for_split(page_num)?;
        if u64::from(self.pager.num_pages()) + u64::from(needed)
            > u64::from(self.pager.max_pages())
        {
            warn!(
                key,
                num_pages = self.pager.num_pages(),
                needed,
                "table full"
            );
            return Err(RowstoreError::TableFull);
        }

        self.leaf_split_and_insert(page_num, cell_num, key, row)
    }

    /// Leaf page, cell index and leaf cell count for `key`.
    fn leaf_position(&mut self, key: u32) -> Result<(PageId, u32, u32)> {
        let page_num = self.find_leaf(key)?;
        let leaf = self.leaf(page_num)?;
        Ok((page_num, leaf.find(key), leaf.num_cells()))
    }

    /// Reads `page_num` as a leaf, rejecting pages that are not a
    /// well-formed leaf.
    pub(crate) fn leaf(&mut self, page_num: PageId) -> Result<LeafNode<&Page>> {
        let leaf = LeafNode::new(self.pager.get_page(page_num)?);
        leaf.validate(page_num)?;
        Ok(leaf)
    }

    /// Reads `page_num` as an internal node, rejecting pages that are not a
    /// well-formed internal node.
    pub(crate) fn internal(&mut self, page_num: PageId) -> Result<InternalNode<&Page>> {
        let node = InternalNode::new(self.pager.get_page(page_num)?);
        node.validate(page_num)?;
        Ok(node)
    }

    /// Descends from the root to the leaf whose key range covers `key`.
    pub(crate) fn find_leaf(&mut self, key: u32) -> Result<PageId> {
        let mut page_num = self.root_page_num;

        for _ in 0..=self.pager.num_pages() {
            let kind = node_type(self.pager.get_page(page_num)?)?;
            match kind {
                NodeType::Leaf => return Ok(page_num),
                NodeType::Internal => {
                    let node = self.internal(page_num)?;
                    page_num = node.child(node.find_child(key))?;
                }
            }
        }

        Err(RowstoreError::CorruptTree {
            page: page_num,
            reason: "descent did not reach a leaf",
        })
    }

    /// Largest key anywhere under `page_num`, found by following right
    /// children down to a leaf.
    pub fn subtree_max_key(&mut self, mut page_num: PageId) -> Result<Option<u32>> {
        for _ in 0..=self.pager.num_pages() {
            let kind = node_type(self.pager.get_page(page_num)?)?;
            match kind {
                NodeType::Leaf => return Ok(self.leaf(page_num)?.max_key()),
                NodeType::Internal => page_num = self.internal(page_num)?.right_child(),
            }
        }

        Err(RowstoreError::CorruptTree {
            page: page_num,
            reason: "right spine did not reach a leaf",
        })
    }

    /// Counts the pages a split starting at a full leaf will allocate: one
    /// per node that splits, plus one more if the root splits.
    fn pages_needed_for_split(&mut self, leaf_page_num: PageId) -> Result<u32> {
        let mut needed = 1;
        let mut page_num = leaf_page_num;

        for _ in 0..=self.pager.num_pages() {
            let node = Node::new(self.pager.get_page(page_num)?);
            if node.is_root() {
                return Ok(needed + 1);
            }

            let parent = node.parent();
            let parent_keys = self.internal(parent)?.num_keys();
            if (parent_keys as usize) < self.config.internal_node_max_keys {
                return Ok(needed);
            }

            needed += 1;
            page_num = parent;
        }

        Err(RowstoreError::CorruptTree {
            page: page_num,
            reason: "parent chain did not reach the root",
        })
    }

    fn set_parent(&mut self, page_num: PageId, parent: PageId) -> Result<()> {
        Node::new(self.pager.get_page_mut(page_num)?).set_parent(parent);
        Ok(())
    }

    /// Splits a full leaf around the new cell. The left half stays on the
    /// old page and the right half moves to a new page.
    fn leaf_split_and_insert(
        &mut self,
        page_num: PageId,
        cell_num: u32,
        key: u32,
        row: &Row,
    ) -> Result<()> {
        let old_page: Page = *self.pager.get_page(page_num)?;
        let old = LeafNode::new(&old_page[..]);
        let parent = old.parent();
        let was_root = old.is_root();

        let new_page_num = self.pager.allocate_new_page_number();
        {
            let mut right = LeafNode::new(self.pager.get_page_mut(new_page_num)?);
            right.initialize();
            right.set_parent(parent);
        }

        // Cell i of the combined sequence is the new cell at cell_num and
        // the old cells shifted around it.
        for i in 0..=LEAF_NODE_MAX_CELLS as u32 {
            let (dest_page, index_within_node) = if i as usize >= LEAF_NODE_LEFT_SPLIT_COUNT {
                (new_page_num, i - LEAF_NODE_LEFT_SPLIT_COUNT as u32)
            } else {
                (page_num, i)
            };

            let mut dest = LeafNode::new(self.pager.get_page_mut(dest_page)?);
            match i.cmp(&cell_num) {
                std::cmp::Ordering::Equal => dest.write_cell(index_within_node, key, row),
                std::cmp::Ordering::Greater => dest.set_cell(index_within_node, old.cell(i - 1)),
                std::cmp::Ordering::Less => dest.set_cell(index_within_node, old.cell(i)),
            }
        }

        let left_max = {
            let mut left = LeafNode::new(self.pager.get_page_mut(page_num)?);
            left.truncate(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
            left.key(LEAF_NODE_LEFT_SPLIT_COUNT as u32 - 1)
        };
        LeafNode::new(self.pager.get_page_mut(new_page_num)?)
            .set_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

        debug!(
            left = page_num.as_u32(),
            right = new_page_num.as_u32(),
            left_max,
            "split leaf"
        );

        if was_root {
            self.create_new_root(new_page_num)
        } else {
            self.insert_into_parent(parent, page_num, left_max, new_page_num)
        }
    }

    /// Handles a root split. The old root is copied to a new page that
    /// becomes the left child, and the root page is reinitialized as an
    /// internal node over that copy and `right_child_page_num`.
    fn create_new_root(&mut self, right_child_page_num: PageId) -> Result<()> {
        let root_page_num = self.root_page_num;
        let old_root: Page = *self.pager.get_page(root_page_num)?;

        let left_child_page_num = self.pager.allocate_new_page_number();
        {
            let left = self.pager.get_page_mut(left_child_page_num)?;
            left.copy_from_slice(&old_root);
            let mut node = Node::new(left);
            node.set_root(false);
            node.set_parent(root_page_num);
        }

        if node_type(&old_root)? == NodeType::Internal {
            for child in InternalNode::new(&old_root[..]).children()? {
                self.set_parent(child, left_child_page_num)?;
            }
        }
        self.set_parent(right_child_page_num, root_page_num)?;

        let left_child_max_key =
            self.subtree_max_key(left_child_page_num)?
                .ok_or(RowstoreError::CorruptTree {
                    page: left_child_page_num,
                    reason: "split produced an empty left child",
                })?;

        let mut root = InternalNode::new(self.pager.get_page_mut(root_page_num)?);
        root.initialize();
        root.set_root(true);
        root.write_entries(
            &[(left_child_max_key, left_child_page_num)],
            right_child_page_num,
        );

        debug!(
            left = left_child_page_num.as_u32(),
            right = right_child_page_num.as_u32(),
            key = left_child_max_key,
            "created new root"
        );
        Ok(())
    }

    /// Records that child `left` of `parent` split into `left` (now ending at
    /// `left_max`) and `right`, which took over the upper part of its range.
    fn insert_into_parent(
        &mut self,
        parent: PageId,
        left: PageId,
        left_max: u32,
        right: PageId,
    ) -> Result<()> {
        let (mut cells, mut right_child, index) = {
            let node = self.internal(parent)?;
            let index = node
                .child_index_of(left)
                .ok_or(RowstoreError::ChildNotFound {
                    parent,
                    child: left,
                })?;
            (node.entries()?, node.right_child(), index as usize)
        };

        if index == cells.len() {
            cells.push((left_max, left));
            right_child = right;
        } else {
            let right_max = cells[index].0;
            cells[index].0 = left_max;
            cells.insert(index + 1, (right_max, right));
        }
        self.set_parent(right, parent)?;

        if cells.len() <= self.config.internal_node_max_keys {
            InternalNode::new(self.pager.get_page_mut(parent)?).write_entries(&cells, right_child);
            return Ok(());
        }

        self.internal_split(parent, cells, right_child)
    }

    /// Splits an overfull internal node. The first half of the children
    /// stays on `page_num`; the rest move to a new page.
    fn internal_split(
        &mut self,
        page_num: PageId,
        cells: Vec<(u32, PageId)>,
        right_child: PageId,
    ) -> Result<()> {
        let (was_root, parent) = {
            let node = Node::new(self.pager.get_page(page_num)?);
            (node.is_root(), node.parent())
        };

        let left_children = (cells.len() + 2) / 2;
        let (separator, left_right_child) = cells[left_children - 1];
        let left_cells = &cells[..left_children - 1];
        let right_cells = &cells[left_children..];

        let new_page_num = self.pager.allocate_new_page_number();
        {
            let mut node = InternalNode::new(self.pager.get_page_mut(new_page_num)?);
            node.initialize();
            node.set_parent(parent);
            node.write_entries(right_cells, right_child);
        }
        for &(_, child) in right_cells {
            self.set_parent(child, new_page_num)?;
        }
        self.set_parent(right_child, new_page_num)?;

        InternalNode::new(self.pager.get_page_mut(page_num)?)
            .write_entries(left_cells, left_right_child);

        debug!(
            left = page_num.as_u32(),
            right = new_page_num.as_u32(),
            separator,
            "split internal node"
        );

        if was_root {
            self.create_new_root(new_page_num)
        } else {
            self.insert_into_parent(parent, page_num, separator, new_page_num)
        }
    }
}
