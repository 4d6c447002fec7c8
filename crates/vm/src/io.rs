//! Runtime I/O bridge: the input token stream and the output sink behind
//! the `geti`/`getf`/`getc` and `puti`/`putf`/`putc` built-ins.
//!
//! Input is pulled lazily, one line at a time, so a blocking reader such as
//! stdin suspends the run until the next token is available.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use tac_common::value::format_float;
use thiserror::Error;

/// Input or output failure during a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// The input stream ended before a requested value.
    #[error("end of input while reading {expected}")]
    EndOfInput { expected: &'static str },

    /// A token that does not parse as the requested type.
    #[error("malformed input '{token}', expected {expected}")]
    MalformedToken {
        token: String,
        expected: &'static str,
    },

    /// The host reader failed.
    #[error("failed to read input: {0}")]
    Read(String),

    /// The host writer failed.
    #[error("failed to write output: {0}")]
    Write(String),
}

/// Whitespace-delimited tokens and raw characters over any [`BufRead`].
pub struct TokenReader<R> {
    reader: R,
    pending: VecDeque<char>,
    exhausted: bool,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Make sure at least one character is buffered. Returns false at end of input.
    fn fill(&mut self) -> Result<bool, IoError> {
        while self.pending.is_empty() {
            if self.exhausted {
                return Ok(false);
            }
            let mut line = String::new();
            let n = self
                .reader
                .read_line(&mut line)
                .map_err(|e| IoError::Read(e.to_string()))?;
            if n == 0 {
                self.exhausted = true;
            } else {
                self.pending.extend(line.chars());
            }
        }
        Ok(true)
    }

    /// Next raw character, whitespace included.
    pub fn next_char(&mut self) -> Result<Option<char>, IoError> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(self.pending.pop_front())
    }

    /// Next whitespace-delimited token.
    ///
    /// Leading whitespace is skipped; the delimiter after the token is left
    /// in the stream.
    pub fn next_token(&mut self) -> Result<Option<String>, IoError> {
        loop {
            if !self.fill()? {
                return Ok(None);
            }
            match self.pending.front() {
                Some(c) if c.is_whitespace() => {
                    self.pending.pop_front();
                }
                _ => break,
            }
        }

        let mut token = String::new();
        while self.fill()? {
            match self.pending.front() {
                Some(&c) if !c.is_whitespace() => {
                    token.push(c);
                    self.pending.pop_front();
                }
                _ => break,
            }
        }
        Ok(Some(token))
    }

    /// `geti`: one integer token.
    pub fn read_int(&mut self) -> Result<i32, IoError> {
        let token = self
            .next_token()?
            .ok_or(IoError::EndOfInput { expected: "int" })?;
        token.parse().map_err(|_| IoError::MalformedToken {
            token,
            expected: "int",
        })
    }

    /// `getf`: one float token. Integer tokens are accepted.
    pub fn read_float(&mut self) -> Result<f32, IoError> {
        let token = self
            .next_token()?
            .ok_or(IoError::EndOfInput { expected: "float" })?;
        match token.parse::<f32>() {
            Ok(x) if x.is_finite() => Ok(x),
            _ => Err(IoError::MalformedToken {
                token,
                expected: "float",
            }),
        }
    }

    /// `getc`: the code point of the next character.
    pub fn read_char(&mut self) -> Result<i32, IoError> {
        let c = self
            .next_char()?
            .ok_or(IoError::EndOfInput { expected: "char" })?;
        Ok(c as i32)
    }
}

/// `puti`.
pub fn write_int<W: Write>(out: &mut W, n: i32) -> Result<(), IoError> {
    write!(out, "{n}").map_err(|e| IoError::Write(e.to_string()))
}

/// `putf`: shortest round-trip form with a fractional part (`3.0`).
pub fn write_float<W: Write>(out: &mut W, x: f32) -> Result<(), IoError> {
    out.write_all(format_float(x).as_bytes())
        .map_err(|e| IoError::Write(e.to_string()))
}

/// `putc`: UTF-8 encoding of `c`.
pub fn write_char<W: Write>(out: &mut W, c: char) -> Result<(), IoError> {
    let mut buf = [0u8; 4];
    out.write_all(c.encode_utf8(&mut buf).as_bytes())
        .map_err(|e| IoError::Write(e.to_string()))
}
