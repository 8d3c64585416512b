//! Splits a token vector into a command invocation plus its redirections,
//! and opens the redirection targets with the correct modes.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

/// Output stream a redirection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A single parsed redirection: stream, append/truncate mode and target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub stream: Stream,
    pub append: bool,
    pub target: String,
}

/// Errors that can occur while splitting tokens into argv and redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A redirection operator was not followed by a filename token.
    MissingTarget(String),
    /// A pipe operator was found; pipelines are recognized but not executed.
    UnsupportedPipeline,
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::MissingTarget(op) => {
                write!(f, "syntax error: expected filename after {}", op)
            }
            ParsingError::UnsupportedPipeline => write!(f, "pipelines are not supported"),
        }
    }
}

impl std::error::Error for ParsingError {}

/// The residual command invocation after redirection extraction.
///
/// `argv` never contains redirection operators or their filenames; the
/// redirects keep their original left-to-right order so that a later
/// redirection of the same stream can supersede an earlier one.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub argv: Vec<String>,
    pub redirects: Vec<Redirect>,
}

fn redirect_op(token: &str) -> Option<(Stream, bool)> {
    match token {
        ">" | "1>" => Some((Stream::Stdout, false)),
        ">>" | "1>>" => Some((Stream::Stdout, true)),
        "2>" => Some((Stream::Stderr, false)),
        "2>>" => Some((Stream::Stderr, true)),
        _ => None,
    }
}

/// Scan the token vector left-to-right, splicing out operator/filename pairs.
///
/// Built as a single forward pass: argv is assembled from the non-redirection
/// tokens instead of removing pairs from the vector in place.
pub fn parse_command(tokens: Vec<String>) -> Result<ParsedCommand, ParsingError> {
    let mut argv = Vec::new();
    let mut redirects = Vec::new();

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        if token == "|" {
            return Err(ParsingError::UnsupportedPipeline);
        }
        if let Some((stream, append)) = redirect_op(&token) {
            let target = iter.next().ok_or(ParsingError::MissingTarget(token))?;
            redirects.push(Redirect {
                stream,
                append,
                target,
            });
        } else {
            argv.push(token);
        }
    }

    Ok(ParsedCommand { argv, redirects })
}

/// Open file handles for a command's redirections.
///
/// Dropping the struct (or replacing a field) closes the underlying files, so
/// handles are released on every exit path of the invocation.
#[derive(Debug, Default)]
pub struct Redirections {
    pub stdout: Option<File>,
    pub stderr: Option<File>,
}

impl Redirect {
    fn open(&self) -> std::io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .append(self.append)
            .truncate(!self.append)
            .mode(0o644)
            .open(&self.target)
    }
}

/// Open every redirection target in order. The last redirection of a given
/// stream wins; the file opened for a superseded one is closed on replacement.
pub fn open_redirections(redirects: &[Redirect]) -> Result<Redirections> {
    let mut opened = Redirections::default();
    for redirect in redirects {
        let file = redirect
            .open()
            .with_context(|| format!("cannot open {}", redirect.target))?;
        match redirect.stream {
            Stream::Stdout => opened.stdout = Some(file),
            Stream::Stderr => opened.stderr = Some(file),
        }
    }
    Ok(opened)
}
