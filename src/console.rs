//! Thin line-printing helpers for the REPL, kept separate from the core so
//! that nothing under `btree`/`pager`/`table` ever touches stdout directly.
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::{execute, ExecutableCommand};
use std::io::{self, Write};

pub fn echo(s: String) {
    let _ = io::stdout().execute(Print(s));
    let _ = io::stdout().flush();
}

pub fn echo_error(s: String) {
    let _ = execute!(
        io::stdout(),
        SetForegroundColor(Color::Red),
        Print(s),
        ResetColor,
    );
    let _ = io::stdout().flush();
}

pub fn echo_lines(s: String) {
    for l in s.lines() {
        echo(format!("{}\n", l));
    }
}

#[macro_export]
macro_rules! echo {
    ($($arg:tt)*) => {
        $crate::console::echo(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! echo_error {
    ($($arg:tt)*) => {
        $crate::console::echo_error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! echo_lines {
    ($($arg:tt)*) => {
        $crate::console::echo_lines(format!($($arg)*))
    };
}
