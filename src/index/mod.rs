pub mod btree_cursor;
pub mod btree_debug;
pub mod btree_page;
pub mod btree_table;

pub use btree_cursor::{Cursor, Rows};
pub use btree_debug::constants;
pub use btree_page::{InternalNode, LeafNode, Node, NodeHeader, NodeHeaderMut, NodeType};
pub use btree_table::Table;
