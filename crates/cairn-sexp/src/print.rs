//! Machine and human renderings of wire terms.
//!
//! Both modes print the same terms and parse back to identical values;
//! the human mode only adds layout. Formatting is a front-end concern
//! chosen at startup, never a semantic one.

use crate::sexp::{Atom, Sexp};

/// Rendering mode, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintMode {
    /// Single line, minimal spacing. The default wire rendering.
    #[default]
    Machine,
    /// Indented multi-line layout for nested lists.
    Human,
}

/// Width under which a human-mode list stays on one line.
const FLAT_WIDTH: usize = 60;

pub fn print_sexp(term: &Sexp, mode: PrintMode) -> String {
    match mode {
        PrintMode::Machine => {
            let mut out = String::new();
            write_flat(term, &mut out);
            out
        }
        PrintMode::Human => {
            let mut out = String::new();
            write_human(term, 0, &mut out);
            out
        }
    }
}

fn write_atom(atom: &Atom, out: &mut String) {
    match atom {
        Atom::Int(n) => out.push_str(&n.to_string()),
        Atom::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Atom::Sym(s) => out.push_str(s),
        Atom::Str(s) => {
            out.push('"');
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
    }
}

fn write_flat(term: &Sexp, out: &mut String) {
    match term {
        Sexp::Atom(atom) => write_atom(atom, out),
        Sexp::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_flat(item, out);
            }
            out.push(')');
        }
    }
}

fn write_human(term: &Sexp, indent: usize, out: &mut String) {
    let mut flat = String::new();
    write_flat(term, &mut flat);
    if flat.len() <= FLAT_WIDTH || !matches!(term, Sexp::List(items) if items.len() > 1) {
        out.push_str(&flat);
        return;
    }

    let Sexp::List(items) = term else {
        out.push_str(&flat);
        return;
    };

    // Head stays on the opening line; each argument gets its own line.
    out.push('(');
    write_human(&items[0], indent + 1, out);
    for item in &items[1..] {
        out.push('\n');
        for _ in 0..indent + 1 {
            out.push_str("  ");
        }
        write_human(item, indent + 1, out);
    }
    out.push(')');
}
