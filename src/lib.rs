//! Rowstore - a single-table, single-file B-tree row store.
//!
//! Rows are fixed-width records keyed by a `u32` id. They live in the leaves
//! of a B-tree whose nodes are 4096-byte pages of one database file.
//!
//! # Architecture
//!
//! The crate is organized into layers, leaves first:
//!
//! - **Storage Layer** (`storage`): page-granular file I/O
//!   - `DiskManager`: reads and writes whole pages at their file offsets
//!
//! - **Pager** (`buffer`): in-memory page cache with dirty tracking
//!
//! - **Tuple** (`tuple`): the fixed-width `Row` and its byte codec
//!
//! - **Index** (`index`): the B-tree
//!   - `LeafNode`/`InternalNode`: typed views over page bytes
//!   - `Cursor`/`Rows`: positioned reads and ordered scans
//!   - `Table`: lookup, insert and node splitting
//!
//! - **Engine** (`engine`): the `Database` façade and the statement parser
//!   used by the REPL binary
//!
//! # Example
//!
//! ```rust,no_run
//! use rowstore::{Database, Row};
//!
//! let mut db = Database::open("test.db").unwrap();
//! db.insert(&Row::new(1, "alice", "alice@example.com").unwrap()).unwrap();
//!
//! for row in db.select().unwrap() {
//!     println!("{}", row.unwrap());
//! }
//!
//! db.close().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod engine;
pub mod index;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{PageId, Result, RowstoreError, TableConfig};
pub use engine::{Database, ExecuteResult};
pub use index::Table;
pub use tuple::Row;
