mod console;
mod errors;
mod btree;
mod cursor;
mod node;
mod pager;
mod repl;
mod row;
mod table;

use clap::Parser;
use errors::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A single-file embedded B+-tree database engine with a line-oriented
/// REPL front end.
#[derive(Parser)]
#[command(name = "pagedb", version = VERSION, about = "Tiny B+-tree database.")]
struct Cli {
    /// Path to the database file. Created if it doesn't exist.
    filename: PathBuf,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(&cli.filename) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            crate::echo_error!("Error: {}\n", e);
            ExitCode::FAILURE
        }
    }
}

fn run(filename: &Path) -> Result<(), Error> {
    let mut table = table::db_open(filename)?;
    repl::run(&mut table)
}
