//! Error types for wire-term parsing and framing.

/// Errors raised while lexing or parsing a wire term.
///
/// Offsets are byte positions into the parsed input (frame-relative,
/// not stream-relative).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SexpError {
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unbalanced parenthesis at byte {offset}")]
    UnbalancedParen { offset: usize },

    #[error("unsupported string escape `\\{escape}` at byte {offset}")]
    BadEscape { offset: usize, escape: char },

    #[error("malformed token `{token}` at byte {offset}")]
    BadToken { offset: usize, token: String },

    #[error("trailing input after term at byte {offset}")]
    TrailingInput { offset: usize },
}

/// Errors raised while reading or writing framed terms on a stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error(transparent)]
    Parse(#[from] SexpError),

    #[error("i/o failure on protocol stream: {0}")]
    Io(String),

    #[error("invalid length header `{0}` (expected `#<decimal-byte-count>`)")]
    BadLengthHeader(String),

    #[error("frame payload is not valid UTF-8 (first bad byte at offset {offset})")]
    BadPayload { offset: usize },

    #[error("frame shorter than declared length: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err.to_string())
    }
}
