//! Raw-mode lifecycle for the controlling terminal.
//!
//! The attributes in force at guard construction are saved and re-applied on
//! drop, so every exit path (Enter, Ctrl-C, fatal read error, panic unwind)
//! leaves the terminal cooked.

use std::io;
use std::os::unix::io::RawFd;
use termios::{tcsetattr, Termios, ECHO, ICANON, ISIG, TCSANOW, VMIN, VTIME};

/// Whether standard input is attached to a terminal.
pub fn stdin_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 }
}

/// Scoped raw-mode handle.
///
/// While alive, canonical processing, echo and signal generation are disabled
/// and reads return byte-by-byte (`VMIN=1`, `VTIME=0`); Ctrl-C arrives as byte
/// 3 instead of raising SIGINT. Dropping the guard restores the saved
/// attributes.
pub struct RawModeGuard {
    fd: RawFd,
    saved: Termios,
}

impl RawModeGuard {
    pub fn new(fd: RawFd) -> io::Result<Self> {
        let saved = Termios::from_fd(fd)?;
        let mut raw = saved;
        raw.c_lflag &= !(ICANON | ECHO | ISIG);
        raw.c_cc[VMIN] = 1;
        raw.c_cc[VTIME] = 0;
        tcsetattr(fd, TCSANOW, &raw)?;
        Ok(Self { fd, saved })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = tcsetattr(self.fd, TCSANOW, &self.saved);
    }
}
