use std::fmt;

/// Page identifier type - a page's position in the database file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Byte offset of this page within the database file.
    pub fn file_offset(&self) -> u64 {
        (self.0 as u64) * (super::PAGE_SIZE as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

/// The page number of the tree root. It never changes for the lifetime of a file.
pub const ROOT_PAGE_ID: PageId = PageId(0);
