//! A module implementing lexical analysis (tokenization) of shell input lines.
//!
//! Quoting disappears here: the tokens handed to the parser are plain strings
//! with all quote and escape characters already resolved.

use std::fmt;

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    UnterminatedQuote,
    /// The line ended with an unescaped backslash.
    TrailingEscape,
}

impl fmt::Display for LexingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexingError::UnterminatedQuote => write!(f, "unterminated quote"),
            LexingError::TrailingEscape => write!(f, "trailing backslash"),
        }
    }
}

impl std::error::Error for LexingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    escaped: bool,
    buffer: String,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Unquoted,
            escaped: false,
            buffer: String::new(),
        }
    }

    /// Runs the machine over the whole input and returns the token vector.
    ///
    /// A pending escape at end of input is reported before an open quote
    /// context; both are structural errors that discard the line.
    fn make_tokens(&mut self) -> Result<Vec<String>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Unquoted => self.handle_unquoted(ch, &mut out),
                LexingState::SingleQuoted => self.handle_single_quote(ch),
                LexingState::DoubleQuoted => self.handle_double_quote(ch),
            }
        }

        if self.escaped {
            return Err(LexingError::TrailingEscape);
        }
        if self.state != LexingState::Unquoted {
            return Err(LexingError::UnterminatedQuote);
        }

        if !self.buffer.is_empty() {
            out.push(std::mem::take(&mut self.buffer));
        }

        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_unquoted(&mut self, ch: char, out: &mut Vec<String>) {
        if self.escaped {
            self.buffer.push(ch);
            self.escaped = false;
            return;
        }
        match ch {
            '\\' => self.escaped = true,
            '\'' => self.state = LexingState::SingleQuoted,
            '"' => self.state = LexingState::DoubleQuoted,
            ' ' | '\t' => {
                if !self.buffer.is_empty() {
                    out.push(std::mem::take(&mut self.buffer));
                }
            }
            c => self.buffer.push(c),
        }
    }

    /// Inside single quotes every character is literal; backslash has no effect.
    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::Unquoted,
            c => self.buffer.push(c),
        }
    }

    /// Inside double quotes backslash only escapes `\`, `"`, `$` and newline;
    /// for any other character the backslash itself is preserved.
    fn handle_double_quote(&mut self, ch: char) {
        if self.escaped {
            self.escaped = false;
            match ch {
                '\\' | '"' | '$' | '\n' => self.buffer.push(ch),
                c => {
                    self.buffer.push('\\');
                    self.buffer.push(c);
                }
            }
            return;
        }
        match ch {
            '\\' => self.escaped = true,
            '"' => self.state = LexingState::Unquoted,
            c => self.buffer.push(c),
        }
    }
}

/// Split an input line into tokens, honouring quote and escape rules.
///
/// Leading and trailing whitespace is trimmed first; an empty or
/// whitespace-only line yields an empty vector rather than an error.
pub fn tokenize(line: &str) -> Result<Vec<String>, LexingError> {
    let mut lexer = LexingFSM::new(line.trim());
    lexer.make_tokens()
}
