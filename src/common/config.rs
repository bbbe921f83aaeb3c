//! Byte-size constants and table configuration.
//!
//! The row and page constants fix the on-disk format and never change at
//! runtime. [`TableConfig`] only tunes limits that leave the format intact.
//!
//! # Environment Variables
//!
//! - `ROWSTORE_MAX_PAGES`: upper bound on pages in one file (default: `1000000`)
//! - `ROWSTORE_INTERNAL_MAX_KEYS`: keys per internal node before it splits
//!   (default and maximum: `510`)

use super::error::{Result, RowstoreError};

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Maximum username length accepted from callers, in bytes.
pub const COLUMN_USERNAME_SIZE: usize = 32;

/// Maximum email length accepted from callers, in bytes.
pub const COLUMN_EMAIL_SIZE: usize = 255;

pub const ID_SIZE: usize = 4;
/// On-disk width of the username field (one spare byte keeps a terminator).
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
/// On-disk width of the email field (one spare byte keeps a terminator).
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Serialized row width: 293 bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// Default cap on the number of pages a table may allocate.
pub const DEFAULT_MAX_PAGES: u32 = 1_000_000;

const MAX_PAGES_VAR: &str = "ROWSTORE_MAX_PAGES";
const INTERNAL_MAX_KEYS_VAR: &str = "ROWSTORE_INTERNAL_MAX_KEYS";

/// Tunable limits for an open table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Pages numbered at or above this are never allocated; inserts that
    /// would need them report a full table.
    pub max_pages: u32,
    /// Keys an internal node holds before the next insert splits it.
    pub internal_node_max_keys: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            internal_node_max_keys: crate::index::btree_page::INTERNAL_NODE_MAX_KEYS,
        }
    }
}

impl TableConfig {
    /// Loads configuration from the environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(MAX_PAGES_VAR) {
            config.max_pages = parse_var(MAX_PAGES_VAR, &raw)?;
        }
        if let Ok(raw) = std::env::var(INTERNAL_MAX_KEYS_VAR) {
            config.internal_node_max_keys = parse_var(INTERNAL_MAX_KEYS_VAR, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_internal_node_max_keys(mut self, max_keys: usize) -> Self {
        self.internal_node_max_keys = max_keys;
        self
    }

    /// Checks that the limits describe a usable tree.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(RowstoreError::InvalidConfig {
                name: MAX_PAGES_VAR.to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let upper = crate::index::btree_page::INTERNAL_NODE_MAX_KEYS;
        if !(2..=upper).contains(&self.internal_node_max_keys) {
            return Err(RowstoreError::InvalidConfig {
                name: INTERNAL_MAX_KEYS_VAR.to_string(),
                message: format!(
                    "{} is outside 2..={}",
                    self.internal_node_max_keys, upper
                ),
            });
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| RowstoreError::InvalidConfig {
            name: name.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}
