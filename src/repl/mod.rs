//! The REPL (collaborator, §6 CLI surface): a thin line-oriented loop over
//! stdin. Everything it touches — parsing, meta-commands, printing — lives
//! under this module so the core (`btree`/`pager`/`table`/`cursor`) stays
//! free of any notion of a terminal.
pub mod meta;
pub mod parser;

use crate::btree;
use crate::cursor::Cursor;
use crate::errors::Error;
use crate::row::Row;
use crate::table::{db_close, Table};
use meta::MetaCommandResult;
use parser::{PrepareResult, Statement};
use std::io::{self, BufRead, Write};
use tracing::warn;

const PROMPT: &str = "db > ";

/// Runs the REPL until `.exit` or end-of-input. Returns `Ok(())` on a
/// clean `.exit`; a fatal `Error` otherwise.
pub fn run(table: &mut Table) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        crate::echo!("{}", PROMPT);
        io::stdout().flush().ok();

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input == ".exit" {
            db_close(table)?;
            return Ok(());
        }

        if input.starts_with('.') {
            match meta::do_meta_command(input, table)? {
                MetaCommandResult::Success => {}
                MetaCommandResult::Unrecognized => {
                    crate::echo!("Unrecognized command '{}'.\n", input);
                }
            }
            continue;
        }

        match parser::prepare_statement(input) {
            Ok(statement) => execute_statement(statement, table)?,
            Err(PrepareResult::NegativeId) => crate::echo!("ID must be positive.\n"),
            Err(PrepareResult::StringTooLong) => crate::echo!("String is too long.\n"),
            Err(PrepareResult::SyntaxError) => {
                crate::echo!("Syntax error. Could not parse statement.\n")
            }
            Err(PrepareResult::UnrecognizedStatement) => {
                crate::echo!("Unrecognized keyword at start of '{}'.\n", input)
            }
        }
    }

    db_close(table)
}

fn execute_statement(statement: Statement, table: &mut Table) -> Result<(), Error> {
    match statement {
        Statement::Insert(row) => execute_insert(&row, table),
        Statement::Select => execute_select(table),
    }
}

fn execute_insert(row: &Row, table: &mut Table) -> Result<(), Error> {
    let mut cursor = btree::find(table, row.id)?;
    match btree::insert(&mut cursor, row.id, row)? {
        btree::ExecuteResult::Success => {
            crate::echo!("Executed.\n");
            Ok(())
        }
        btree::ExecuteResult::DuplicateKey => {
            crate::echo!("Error: Duplicate key.\n");
            Ok(())
        }
        btree::ExecuteResult::TableFull => {
            warn!("insert rejected, table is full");
            crate::echo!("Error: Table full.\n");
            Ok(())
        }
    }
}

fn execute_select(table: &mut Table) -> Result<(), Error> {
    let mut cursor = Cursor::table_start(table)?;
    while !cursor.end_of_table {
        let row = Row::deserialize(cursor.value()?);
        crate::echo!("{}\n", row);
        cursor.advance()?;
    }
    crate::echo!("Executed.\n");
    Ok(())
}
