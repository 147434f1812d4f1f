pub mod convert;
pub mod text;

use std::io::{self, IsTerminal};

/// Returns `true` if stderr is a terminal (interactive).
pub fn stderr_is_tty() -> bool {
    io::stderr().is_terminal()
}
