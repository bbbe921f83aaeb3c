//! The engine façade: the narrow surface the REPL drives.

mod statement;

pub use statement::{parse_meta_command, prepare_statement, MetaCommand, PrepareError, Statement};

use std::fmt;
use std::path::Path;

use crate::common::{Result, RowstoreError, TableConfig};
use crate::index::{self, Rows, Table};
use crate::tuple::Row;

/// Outcome of a statement the table accepted for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    Success,
    DuplicateKey,
    TableFull,
}

impl fmt::Display for ExecuteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteResult::Success => write!(f, "Executed."),
            ExecuteResult::DuplicateKey => write!(f, "Error: Duplicate key."),
            ExecuteResult::TableFull => write!(f, "Error: Table full."),
        }
    }
}

pub struct Database {
    table: Table,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, TableConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: TableConfig) -> Result<Self> {
        Ok(Self {
            table: Table::open_with_config(path, config)?,
        })
    }

    /// Inserts a row. Duplicate keys and a full table are reported as
    /// results; anything else is an error.
    pub fn insert(&mut self, row: &Row) -> Result<ExecuteResult> {
        match self.table.insert(row) {
            Ok(()) => Ok(ExecuteResult::Success),
            Err(RowstoreError::DuplicateKey(_)) => Ok(ExecuteResult::DuplicateKey),
            Err(RowstoreError::TableFull) => Ok(ExecuteResult::TableFull),
            Err(e) => Err(e),
        }
    }

    pub fn select(&mut self) -> Result<Rows<'_>> {
        self.table.select()
    }

    /// Runs a prepared statement, passing each selected row to `emit`.
    pub fn execute<F>(&mut self, statement: &Statement, mut emit: F) -> Result<ExecuteResult>
    where
        F: FnMut(&Row),
    {
        match statement {
            Statement::Insert(row) => self.insert(row),
            Statement::Select => {
                for row in self.select()? {
                    emit(&row?);
                }
                Ok(ExecuteResult::Success)
            }
        }
    }

    pub fn constants(&self) -> String {
        index::constants()
    }

    pub fn tree(&mut self) -> Result<String> {
        self.table.tree()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    /// Flushes every dirty page and releases the file.
    pub fn close(self) -> Result<()> {
        self.table.close()
    }
}
