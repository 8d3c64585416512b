//! An interactive command-line shell with raw-mode line editing.
//!
//! The crate is split along the per-line data flow: the [`editor`] reads one
//! line keystroke-by-keystroke (history recall and tab-completion included),
//! the [`lexer`] resolves quoting and escaping into plain tokens, the
//! [`parser`] splices out redirections and opens their targets, and the
//! [`Interpreter`] dispatches to a built-in or spawns an external executable
//! found on PATH. The public modules [`command`] and [`env`] expose the traits
//! and types for implementing commands and for interacting with the process
//! environment.
//!
//! The binary target wires these together into a REPL; the library surface is
//! what the tests (and any embedder) drive directly.

mod builtin;
pub mod command;
pub mod completion;
pub mod editor;
pub mod env;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod terminal;

pub use editor::{Event, LineEditor};
pub use interpreter::Interpreter;

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serializes tests that read or mutate the process working directory.
    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap()
    }
}
