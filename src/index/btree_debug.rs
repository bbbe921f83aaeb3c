//! Introspection dumps used by the `.constants` and `.btree` meta-commands.

use crate::common::{PageId, Result, ROW_SIZE};

use super::btree_page::{
    node_type, NodeType, COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE,
    LEAF_NODE_MAX_CELLS, LEAF_NODE_SPACE_FOR_CELLS,
};
use super::btree_table::Table;

/// One `NAME: value` line per layout constant.
pub fn constants() -> String {
    [
        ("ROW_SIZE", ROW_SIZE),
        ("COMMON_NODE_HEADER_SIZE", COMMON_NODE_HEADER_SIZE),
        ("LEAF_NODE_HEADER_SIZE", LEAF_NODE_HEADER_SIZE),
        ("LEAF_NODE_CELL_SIZE", LEAF_NODE_CELL_SIZE),
        ("LEAF_NODE_SPACE_FOR_CELLS", LEAF_NODE_SPACE_FOR_CELLS),
        ("LEAF_NODE_MAX_CELLS", LEAF_NODE_MAX_CELLS),
    ]
    .iter()
    .map(|(name, value)| format!("{name}: {value}\n"))
    .collect()
}

impl Table {
    /// Renders the tree rooted at the root page, one node or key per line.
    pub fn tree(&mut self) -> Result<String> {
        let mut out = String::new();
        let root = self.root_page_num();
        self.write_node(&mut out, root, 0)?;
        Ok(out)
    }

    fn write_node(&mut self, out: &mut String, page_num: PageId, level: usize) -> Result<()> {
        let kind = node_type(self.pager_mut().get_page(page_num)?)?;

        match kind {
            NodeType::Leaf => {
                let leaf = self.leaf(page_num)?;
                let num_cells = leaf.num_cells();
                out.push_str(&format!("{:level$}- leaf (size {num_cells})\n", ""));
                for i in 0..num_cells {
                    out.push_str(&format!("{:width$}- {}\n", "", leaf.key(i), width = level + 1));
                }
            }
            NodeType::Internal => {
                let node = self.internal(page_num)?;
                let num_keys = node.num_keys();
                let entries = node.entries()?;
                let right_child = node.right_child();

                out.push_str(&format!("{:level$}- internal (size {num_keys})\n", ""));
                for (key, child) in entries {
                    self.write_node(out, child, level + 1)?;
                    out.push_str(&format!("{:width$}- key {key}\n", "", width = level + 1));
                }
                self.write_node(out, right_child, level + 1)?;
            }
        }

        Ok(())
    }
}
