//! # cairn-sexp
//!
//! Wire terms for the cairn protocol.
//!
//! Every value that crosses the protocol boundary is one `Sexp`: an
//! atomic token or a parenthesized tagged list. This crate provides:
//! - `Sexp` / `Atom` (the term type)
//! - parsing with byte offsets (`parse_sexp`, `parse_many`)
//! - machine and human printers over the same terms
//! - stream framing (one term per line, or byte-length headers)
//!
//! It intentionally knows nothing about what the terms mean; typed
//! encoding/decoding lives in `cairn-codec`.

pub mod error;
pub mod frame;
pub mod parse;
pub mod print;
pub mod sexp;

pub use error::{FrameError, SexpError};
pub use frame::{FrameReader, FrameWriter, Framing};
pub use parse::{parse_many, parse_sexp};
pub use print::{PrintMode, print_sexp};
pub use sexp::{Atom, Sexp};
