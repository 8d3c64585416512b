use std::cell::RefCell;
use std::io::{self, Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// Sink that forwards to the process standard output.
///
/// Used when a line carries no stdout redirection. Children spawned with this
/// sink inherit the terminal.
pub struct InheritedStdout;

impl Write for InheritedStdout {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        io::stdout().write(data)
    }

    fn flush(&mut self) -> IoResult<()> {
        io::stdout().flush()
    }
}

impl crate::command::Stdout for InheritedStdout {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Sink that forwards to the process standard error.
pub struct InheritedStderr;

impl Write for InheritedStderr {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        io::stderr().write(data)
    }

    fn flush(&mut self) -> IoResult<()> {
        io::stderr().flush()
    }
}

impl crate::command::Stdout for InheritedStderr {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Memory-backed writer for capturing command output in tests.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    /// Public constructor.
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    /// In-memory writers are only handed to commands executed in-process.
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}
