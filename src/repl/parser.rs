//! The mini-language parser (collaborator, §6 CLI surface): turns a line of
//! input into a `Statement`, rejecting malformed commands before they ever
//! reach the row codec.
use crate::row::{Row, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};

#[derive(Debug, PartialEq, Eq)]
pub enum PrepareResult {
    Success,
    NegativeId,
    StringTooLong,
    SyntaxError,
    UnrecognizedStatement,
}

pub enum Statement {
    Insert(Row),
    Select,
}

/// Parses one line of REPL input into a `Statement`, or a `PrepareResult`
/// describing why it was rejected.
pub fn prepare_statement(input: &str) -> Result<Statement, PrepareResult> {
    if input == "select" {
        return Ok(Statement::Select);
    }
    if let Some(rest) = input.strip_prefix("insert") {
        return prepare_insert(rest);
    }
    Err(PrepareResult::UnrecognizedStatement)
}

fn prepare_insert(args: &str) -> Result<Statement, PrepareResult> {
    let mut fields = args.split_whitespace();
    let id_str = fields.next().ok_or(PrepareResult::SyntaxError)?;
    let username = fields.next().ok_or(PrepareResult::SyntaxError)?;
    let email = fields.next().ok_or(PrepareResult::SyntaxError)?;
    if fields.next().is_some() {
        return Err(PrepareResult::SyntaxError);
    }

    let id: i64 = id_str.parse().map_err(|_| PrepareResult::SyntaxError)?;
    if id < 0 {
        return Err(PrepareResult::NegativeId);
    }
    let id: u32 = id.try_into().map_err(|_| PrepareResult::SyntaxError)?;

    if username.len() > COLUMN_USERNAME_SIZE || email.len() > COLUMN_EMAIL_SIZE {
        return Err(PrepareResult::StringTooLong);
    }

    Ok(Statement::Insert(Row::new(id, username, email)))
}
