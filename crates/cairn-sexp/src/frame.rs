//! Stream framing: one self-delimited term per frame.
//!
//! Two framings, chosen at startup:
//! - `Line`: one machine-rendered term per line. Blank lines are
//!   skipped on read.
//! - `Length`: `#<decimal-byte-count>\n` followed by exactly that many
//!   payload bytes, then one newline. Payloads may span lines, so this
//!   is the mode that tolerates human-rendered frames.

use std::io::{BufRead, Write};

use crate::error::FrameError;
use crate::parse::parse_sexp;
use crate::print::{PrintMode, print_sexp};
use crate::sexp::Sexp;

/// Frame boundary discipline for a protocol stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    #[default]
    Line,
    Length,
}

/// Reads framed terms from a buffered stream.
pub struct FrameReader<R: BufRead> {
    inner: R,
    framing: Framing,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(inner: R, framing: Framing) -> Self {
        Self { inner, framing }
    }

    /// Read the next frame. `Ok(None)` signals clean end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Sexp>, FrameError> {
        match self.framing {
            Framing::Line => self.read_line_frame(),
            Framing::Length => self.read_length_frame(),
        }
    }

    fn read_line_frame(&mut self) -> Result<Option<Sexp>, FrameError> {
        loop {
            let mut line = String::new();
            let read = self.inner.read_line(&mut line)?;
            if read == 0 {
                return Ok(None);
            }
            if line.trim().is_empty() {
                continue;
            }
            return parse_sexp(line.trim()).map(Some).map_err(FrameError::from);
        }
    }

    fn read_length_frame(&mut self) -> Result<Option<Sexp>, FrameError> {
        let header = loop {
            let mut line = String::new();
            let read = self.inner.read_line(&mut line)?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            break trimmed.to_string();
        };

        let count = header
            .strip_prefix('#')
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| FrameError::BadLengthHeader(header.clone()))?;

        let mut payload = vec![0u8; count];
        let mut filled = 0;
        while filled < count {
            let read = self.inner.read(&mut payload[filled..])?;
            if read == 0 {
                return Err(FrameError::Truncated {
                    expected: count,
                    actual: filled,
                });
            }
            filled += read;
        }
        // Consume the newline that terminates the payload, if present.
        let mut terminator = String::new();
        let _ = self.inner.read_line(&mut terminator)?;

        let text = String::from_utf8(payload).map_err(|err| FrameError::BadPayload {
            offset: err.utf8_error().valid_up_to(),
        })?;
        parse_sexp(text.trim()).map(Some).map_err(FrameError::from)
    }
}

/// Writes framed terms to a stream, flushing per frame.
pub struct FrameWriter<W: Write> {
    inner: W,
    framing: Framing,
    mode: PrintMode,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W, framing: Framing, mode: PrintMode) -> Self {
        Self {
            inner,
            framing,
            mode,
        }
    }

    pub fn write_frame(&mut self, term: &Sexp) -> Result<(), FrameError> {
        match self.framing {
            // Line framing cannot carry embedded newlines, so it always
            // uses the machine rendering regardless of print mode.
            Framing::Line => {
                let rendered = print_sexp(term, PrintMode::Machine);
                writeln!(self.inner, "{rendered}")?;
            }
            Framing::Length => {
                let rendered = print_sexp(term, self.mode);
                writeln!(self.inner, "#{}", rendered.len())?;
                self.inner.write_all(rendered.as_bytes())?;
                writeln!(self.inner)?;
            }
        }
        self.inner.flush()?;
        Ok(())
    }
}
