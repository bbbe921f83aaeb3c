//! Front-end parsing for the REPL: meta-commands and `insert`/`select`.

use thiserror::Error;

use crate::common::RowstoreError;
use crate::tuple::Row;

/// Commands starting with `.` that act on the session rather than the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    BTree,
    Constants,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

/// Rejections raised before a statement reaches the table.
///
/// `Display` is the exact message the REPL prints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error("ID must be positive.")]
    NegativeId,

    #[error("String is too long.")]
    StringTooLong,

    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,

    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),
}

/// Parses a `.`-prefixed line. `None` means the command is unknown.
pub fn parse_meta_command(line: &str) -> Option<MetaCommand> {
    match line {
        ".exit" => Some(MetaCommand::Exit),
        ".btree" => Some(MetaCommand::BTree),
        ".constants" => Some(MetaCommand::Constants),
        _ => None,
    }
}

pub fn prepare_statement(line: &str) -> Result<Statement, PrepareError> {
    if line.starts_with("insert") {
        return prepare_insert(line);
    }
    if line == "select" {
        return Ok(Statement::Select);
    }
    Err(PrepareError::UnrecognizedStatement(line.to_string()))
}

/// `insert <id> <username> <email>`; tokens after the email are ignored.
fn prepare_insert(line: &str) -> Result<Statement, PrepareError> {
    let mut tokens = line.split_whitespace().skip(1);
    let (Some(id), Some(username), Some(email)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(PrepareError::SyntaxError);
    };

    let id: i64 = id.parse().map_err(|_| PrepareError::SyntaxError)?;

    match Row::new(id, username, email) {
        Ok(row) => Ok(Statement::Insert(row)),
        Err(RowstoreError::NegativeId(_)) => Err(PrepareError::NegativeId),
        Err(RowstoreError::StringTooLong { .. }) => Err(PrepareError::StringTooLong),
        Err(_) => Err(PrepareError::SyntaxError),
    }
}
