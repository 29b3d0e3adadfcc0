//! The wire term type.

use std::fmt;

use crate::print::{PrintMode, print_sexp};

/// An atomic wire token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// Signed integer literal.
    Int(i64),
    /// Double-quoted string with escapes.
    Str(String),
    /// Bare symbol (constructor tags, command tags, field names).
    Sym(String),
    /// `true` / `false`.
    Bool(bool),
}

/// One self-delimited wire term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    Atom(Atom),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn sym(name: impl Into<String>) -> Self {
        Sexp::Atom(Atom::Sym(name.into()))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Sexp::Atom(Atom::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Sexp::Atom(Atom::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Sexp::Atom(Atom::Bool(value))
    }

    pub fn list(items: Vec<Sexp>) -> Self {
        Sexp::List(items)
    }

    /// The empty list, the distinguished empty-container token.
    pub fn nil() -> Self {
        Sexp::List(Vec::new())
    }

    /// Build `(Tag arg1 arg2 ...)`.
    pub fn tagged(tag: &str, args: impl IntoIterator<Item = Sexp>) -> Self {
        let mut items = vec![Sexp::sym(tag)];
        items.extend(args);
        Sexp::List(items)
    }

    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Sexp::Atom(Atom::Sym(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Sexp::Atom(Atom::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Sexp::Atom(Atom::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Sexp::Atom(Atom::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Split `(Tag arg1 ...)` into `(Tag, args)`.
    ///
    /// Returns `None` for atoms, the empty list, and lists whose head
    /// is not a symbol.
    pub fn tag_and_args(&self) -> Option<(&str, &[Sexp])> {
        let items = self.as_list()?;
        let (head, rest) = items.split_first()?;
        Some((head.as_sym()?, rest))
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_sexp(self, PrintMode::Machine))
    }
}
