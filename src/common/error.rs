use thiserror::Error;

use super::types::PageId;

/// Database error types
#[derive(Error, Debug)]
pub enum RowstoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Db file is not a whole number of pages ({length} bytes). Corrupt file.")]
    CorruptFile { length: u64 },

    #[error("Tried to fetch page number out of bounds: {page} >= {max}")]
    PageOutOfBounds { page: PageId, max: u32 },

    #[error("Tried to access child {index} > num_keys {num_keys}")]
    ChildIndexOutOfBounds { index: usize, num_keys: usize },

    #[error("Tried to flush page {0} which was never loaded")]
    PageNotLoaded(PageId),

    #[error("Unrecognized node type byte {0}")]
    UnknownNodeType(u8),

    #[error("Page {child} is not a child of internal node {parent}")]
    ChildNotFound { parent: PageId, child: PageId },

    #[error("Corrupt tree at {page}: {reason}")]
    CorruptTree { page: PageId, reason: &'static str },

    #[error("Cursor is past the last row")]
    CursorAtEnd,

    #[error("Duplicate key: {0}")]
    DuplicateKey(u32),

    #[error("Table full")]
    TableFull,

    #[error("ID must be positive, got {0}")]
    NegativeId(i64),

    #[error("ID {0} does not fit in 32 bits")]
    IdOutOfRange(i64),

    #[error("String is too long: {field} is {len} bytes, max {max}")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid value for {name}: {message}")]
    InvalidConfig { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, RowstoreError>;
