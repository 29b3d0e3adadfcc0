//! Sentence segmentation.
//!
//! Splits raw input into statements at an unquoted, uncommented `.`
//! followed by whitespace or end of input. `(* ... *)` comments nest;
//! string literals use `"` with `""` as the escaped quote. Segmentation
//! failures are carried into addressable failed nodes by the document
//! layer, never crashes.

use crate::statement::{Loc, Statement, parse_statement};

/// Errors raised while splitting input into sentences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error("unterminated comment opened at byte {offset}")]
    UnterminatedComment { offset: usize },

    #[error("unterminated string literal opened at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("input ends inside a sentence (missing final `.`) at byte {offset}")]
    MissingTerminator { offset: usize },
}

/// Split `text` into parsed statements.
///
/// `base_offset` shifts reported spans so locations refer to the
/// original added text. Sentences that are entirely comments or
/// whitespace are dropped; zero statements is a valid result.
pub fn segment(text: &str, base_offset: usize) -> Result<Vec<Statement>, SegmentError> {
    let bytes = text.as_bytes();
    let mut statements = Vec::new();
    let mut sentence_start = 0usize;
    let mut pos = 0usize;

    while pos < bytes.len() {
        match bytes[pos] {
            b'(' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = skip_comment(bytes, pos).map_err(|()| {
                    SegmentError::UnterminatedComment {
                        offset: base_offset + pos,
                    }
                })?;
            }
            b'"' => {
                pos = skip_string(bytes, pos).map_err(|()| SegmentError::UnterminatedString {
                    offset: base_offset + pos,
                })?;
            }
            b'.' => {
                let followed_by_break = match bytes.get(pos + 1) {
                    None => true,
                    Some(next) => next.is_ascii_whitespace(),
                };
                if followed_by_break {
                    push_sentence(
                        text,
                        sentence_start,
                        pos + 1,
                        base_offset,
                        &mut statements,
                    );
                    pos += 1;
                    sentence_start = pos;
                } else {
                    // Qualified names (`Init.Prelude`) keep their dots.
                    pos += 1;
                }
            }
            _ => pos += 1,
        }
    }

    let rest = &text[sentence_start..];
    if !strip_leading_comments(rest).trim().is_empty() {
        return Err(SegmentError::MissingTerminator {
            offset: base_offset + sentence_start,
        });
    }

    Ok(statements)
}

fn push_sentence(
    text: &str,
    start: usize,
    stop: usize,
    base_offset: usize,
    out: &mut Vec<Statement>,
) {
    let raw = &text[start..stop];
    // Leading comments carry no execution content; the statement
    // begins after them.
    let effective = strip_leading_comments(raw).trim_end();
    if effective.is_empty() {
        return;
    }
    let lead = raw.len() - effective.len();
    let loc = Loc {
        start: base_offset + start + lead,
        stop: base_offset + stop,
    };
    out.push(parse_statement(effective, loc));
}

fn strip_leading_comments(sentence: &str) -> &str {
    let mut rest = sentence.trim_start();
    while rest.starts_with("(*") {
        match skip_comment(rest.as_bytes(), 0) {
            Ok(end) => rest = rest[end..].trim_start(),
            // Unterminated comments are caught by the main scan.
            Err(()) => break,
        }
    }
    rest
}

fn skip_comment(bytes: &[u8], open: usize) -> Result<usize, ()> {
    let mut depth = 0usize;
    let mut pos = open;
    while pos < bytes.len() {
        if bytes[pos] == b'(' && bytes.get(pos + 1) == Some(&b'*') {
            depth += 1;
            pos += 2;
        } else if bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b')') {
            depth -= 1;
            pos += 2;
            if depth == 0 {
                return Ok(pos);
            }
        } else {
            pos += 1;
        }
    }
    Err(())
}

fn skip_string(bytes: &[u8], open: usize) -> Result<usize, ()> {
    let mut pos = open + 1;
    while pos < bytes.len() {
        if bytes[pos] == b'"' {
            if bytes.get(pos + 1) == Some(&b'"') {
                pos += 2;
            } else {
                return Ok(pos + 1);
            }
        } else {
            pos += 1;
        }
    }
    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementHead;

    #[test]
    fn splits_at_sentence_dots() {
        let statements = segment("Theorem t. Proof. reflexivity. Qed.", 0).expect("segment");
        assert_eq!(statements.len(), 4);
        assert_eq!(
            statements[0].head,
            StatementHead::Theorem {
                name: "t".to_string()
            }
        );
        assert_eq!(statements[3].head, StatementHead::Qed);
    }

    #[test]
    fn qualified_names_do_not_split() {
        let statements = segment("Require Init.Prelude.", 0).expect("segment");
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].head,
            StatementHead::Require {
                module: "Init.Prelude".to_string()
            }
        );
    }

    #[test]
    fn dots_inside_comments_and_strings_are_ignored() {
        let statements =
            segment("(* intro. no split. *) Definition s := \"a. b\". Qed.", 0).expect("segment");
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            statements[0].head,
            StatementHead::Definition { .. }
        ));
    }

    #[test]
    fn nested_comments_close_properly() {
        let statements = segment("(* outer (* inner. *) still. *) Qed.", 0).expect("segment");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].head, StatementHead::Qed);
    }

    #[test]
    fn locations_are_relative_to_the_added_text() {
        let statements = segment("Theorem t. Qed.", 100).expect("segment");
        assert_eq!(statements[0].loc, Loc { start: 100, stop: 110 });
        assert_eq!(statements[1].loc, Loc { start: 111, stop: 115 });
    }

    #[test]
    fn empty_and_comment_only_input_yields_no_statements() {
        assert_eq!(segment("", 0).expect("empty"), Vec::new());
        assert_eq!(segment("  (* nothing. *)  ", 0).expect("comment"), Vec::new());
    }

    #[test]
    fn unterminated_constructs_are_errors() {
        assert_eq!(
            segment("(* open forever", 0),
            Err(SegmentError::UnterminatedComment { offset: 0 })
        );
        assert_eq!(
            segment("Definition s := \"open", 5),
            Err(SegmentError::UnterminatedString { offset: 21 })
        );
        assert_eq!(
            segment("Theorem t", 0),
            Err(SegmentError::MissingTerminator { offset: 0 })
        );
    }
}
