//! Raw-mode line editor: keystroke dispatch, in-buffer editing with cursor
//! tracking, history recall and tab-completion.

use crate::completion::{Completer, Completion};
use crate::env::Environment;
use crate::terminal::{self, RawModeGuard};
use anyhow::Result;
use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::os::unix::io::AsRawFd;

/// Fixed prompt printed at the start of every input line.
pub const PROMPT: &str = "$ ";

/// Number of accepted lines the history ring retains.
pub const HISTORY_CAPACITY: usize = 5;

const CTRL_C: u8 = 3;
const TAB: u8 = 9;
const BACKSPACE: u8 = 127;
const ESC: u8 = 27;
const BELL: &str = "\x07";
const CURSOR_LEFT: &str = "\x1b[D";
const CURSOR_RIGHT: &str = "\x1b[C";
const CLEAR_LINE: &str = "\x1b[2K";

/// Result of one editor interaction.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    /// The user committed a line with Enter (possibly blank).
    Line(String),
    /// Ctrl-C: the shell should terminate with status 0.
    Interrupted,
    /// End of input (only reachable when stdin is not a tty, or closed).
    Eof,
}

/// Bounded FIFO of accepted non-blank input lines.
///
/// A cursor of -1 means "not navigating"; 0 addresses the newest entry and
/// `len - 1` the oldest.
pub(crate) struct History {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: isize,
}

impl History {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            cursor: -1,
        }
    }

    fn push(&mut self, line: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
        self.cursor = -1;
    }

    fn reset(&mut self) {
        self.cursor = -1;
    }

    /// Walk one step toward the oldest entry; `None` when already there.
    fn up(&mut self) -> Option<String> {
        let next = self.cursor + 1;
        if (next as usize) < self.entries.len() {
            self.cursor = next;
            Some(self.entry(next))
        } else {
            None
        }
    }

    /// Walk one step back toward the newest entry; crossing it yields an
    /// empty line, and `None` means navigation is not active.
    fn down(&mut self) -> Option<String> {
        if self.cursor < 0 {
            return None;
        }
        self.cursor -= 1;
        if self.cursor < 0 {
            Some(String::new())
        } else {
            Some(self.entry(self.cursor))
        }
    }

    fn entry(&self, cursor: isize) -> String {
        let index = self.entries.len() - 1 - cursor as usize;
        self.entries[index].clone()
    }
}

/// Edit buffer plus cursor. The cursor is a byte index and never exceeds the
/// buffer length; every mutating method upholds that invariant.
pub(crate) struct EditBuffer {
    bytes: Vec<u8>,
    cursor: usize,
}

impl EditBuffer {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            cursor: 0,
        }
    }

    fn insert(&mut self, data: &[u8]) {
        self.bytes
            .splice(self.cursor..self.cursor, data.iter().copied());
        self.cursor += data.len();
    }

    /// Remove the byte left of the cursor; false when at column 0.
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.bytes.remove(self.cursor);
        true
    }

    fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    fn move_right(&mut self) -> bool {
        if self.cursor == self.bytes.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    fn set_contents(&mut self, line: &str) {
        self.bytes = line.as_bytes().to_vec();
        self.cursor = self.bytes.len();
    }

    fn tail(&self) -> &[u8] {
        &self.bytes[self.cursor..]
    }

    /// The completion prefix: everything left of the cursor.
    fn prefix(&self) -> String {
        String::from_utf8_lossy(&self.bytes[..self.cursor]).into_owned()
    }

    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// The interactive line editor owned by the driver loop.
///
/// `read_line` acquires raw mode for the duration of one line and releases it
/// on return, so command dispatch (and any spawned child) always runs against
/// a cooked terminal.
pub struct LineEditor {
    history: History,
    completer: Completer,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            history: History::new(HISTORY_CAPACITY),
            completer: Completer::new(),
        }
    }

    /// Print the prompt and read one line of input.
    ///
    /// When stdin is not a terminal, falls back to cooked line reading so the
    /// shell stays usable under pipes.
    pub fn read_line(&mut self, env: &Environment) -> Result<Event> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", PROMPT)?;
        stdout.flush()?;

        if !terminal::stdin_is_tty() {
            return self.read_line_cooked();
        }
        self.read_line_raw(env)
    }

    fn read_line_cooked(&mut self) -> Result<Event> {
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Ok(Event::Eof);
        }
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if !line.trim().is_empty() {
            self.history.push(line.clone());
        }
        Ok(Event::Line(line))
    }

    fn read_line_raw(&mut self, env: &Environment) -> Result<Event> {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        let mut stdout = io::stdout();
        let _raw = RawModeGuard::new(io::stdin().as_raw_fd())?;

        let mut buf = EditBuffer::new();
        self.history.reset();

        loop {
            let byte = match read_byte(&mut stdin) {
                Ok(byte) => byte,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(Event::Eof);
                }
                Err(e) => return Err(e.into()),
            };

            match byte {
                CTRL_C => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    return Ok(Event::Interrupted);
                }
                b'\r' | b'\n' => {
                    write!(stdout, "\r\n")?;
                    stdout.flush()?;
                    let line = buf.contents();
                    if !line.trim().is_empty() {
                        self.history.push(line.clone());
                    }
                    return Ok(Event::Line(line));
                }
                BACKSPACE => {
                    if buf.backspace() {
                        // overwrite the vacated last column with a space
                        write!(stdout, "{}", CURSOR_LEFT)?;
                        stdout.write_all(buf.tail())?;
                        write!(stdout, " ")?;
                        move_cursor_left(&mut stdout, buf.tail().len() + 1)?;
                    }
                    self.completer.note_input();
                }
                TAB => self.handle_tab(&mut buf, env, &mut stdout)?,
                ESC => self.handle_escape(&mut buf, &mut stdin, &mut stdout)?,
                byte => {
                    insert_and_repaint(&mut buf, &[byte], &mut stdout)?;
                    self.completer.note_input();
                }
            }
            stdout.flush()?;
        }
    }

    fn handle_tab(
        &mut self,
        buf: &mut EditBuffer,
        env: &Environment,
        stdout: &mut impl Write,
    ) -> Result<()> {
        let prefix = buf.prefix();
        if prefix.trim().is_empty() {
            insert_and_repaint(buf, b"    ", stdout)?;
            return Ok(());
        }

        match self.completer.complete(&prefix, env) {
            Completion::NoMatch | Completion::Pending => write!(stdout, "{}", BELL)?,
            Completion::Single { suffix } => {
                let mut insertion = suffix.into_bytes();
                insertion.push(b' ');
                insert_and_repaint(buf, &insertion, stdout)?;
            }
            Completion::Extend { suffix } => {
                insert_and_repaint(buf, suffix.as_bytes(), stdout)?;
            }
            Completion::Candidates(candidates) => {
                write!(stdout, "\r\n{}\r\n{}", candidates.join("  "), PROMPT)?;
                stdout.write_all(&buf.bytes)?;
                move_cursor_left(stdout, buf.tail().len())?;
            }
        }
        Ok(())
    }

    fn handle_escape(
        &mut self,
        buf: &mut EditBuffer,
        stdin: &mut impl Read,
        stdout: &mut impl Write,
    ) -> Result<()> {
        if read_byte(stdin)? != b'[' {
            return Ok(());
        }
        match read_byte(stdin)? {
            b'A' => {
                if let Some(entry) = self.history.up() {
                    replace_line(buf, &entry, stdout)?;
                }
            }
            b'B' => {
                if let Some(entry) = self.history.down() {
                    replace_line(buf, &entry, stdout)?;
                }
            }
            b'C' => {
                if buf.move_right() {
                    write!(stdout, "{}", CURSOR_RIGHT)?;
                }
            }
            b'D' => {
                if buf.move_left() {
                    write!(stdout, "{}", CURSOR_LEFT)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn read_byte(reader: &mut impl Read) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Insert bytes at the cursor and repaint the tail so the physical cursor
/// lands just after the insertion.
fn insert_and_repaint(
    buf: &mut EditBuffer,
    data: &[u8],
    stdout: &mut impl Write,
) -> io::Result<()> {
    buf.insert(data);
    stdout.write_all(data)?;
    stdout.write_all(buf.tail())?;
    move_cursor_left(stdout, buf.tail().len())
}

/// Clear the current line and redraw prompt plus the replacement contents.
fn replace_line(buf: &mut EditBuffer, line: &str, stdout: &mut impl Write) -> io::Result<()> {
    buf.set_contents(line);
    write!(stdout, "\r{}{}", CLEAR_LINE, PROMPT)?;
    stdout.write_all(&buf.bytes)
}

fn move_cursor_left(stdout: &mut impl Write, count: usize) -> io::Result<()> {
    for _ in 0..count {
        write!(stdout, "{}", CURSOR_LEFT)?;
    }
    Ok(())
}
