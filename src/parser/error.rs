//! Structured parse errors and the farthest-error slot.

use crate::lexer::{Token, TokenKind};
use std::fmt;

/// A parse failure: which rule failed, which token classes it would have
/// accepted, and the offending token (or end of input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Name of the grammar rule that failed.
    pub from: &'static str,
    /// Token classes the rule would have accepted at this position.
    pub expected: Vec<TokenKind>,
    /// The offending token; `None` when the stream ended early.
    pub got: Option<Token>,
    /// Token-stream position of the offending token.
    pub pos: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected: Vec<&str> = self.expected.iter().map(|k| k.as_str()).collect();
        match &self.got {
            Some(token) => write!(
                f,
                "parsing {}, expected [{}], got {} at position {}",
                self.from,
                expected.join(" "),
                token,
                self.pos
            ),
            None => write!(
                f,
                "parsing {}, expected [{}], got end of input at position {}",
                self.from,
                expected.join(" "),
                self.pos
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Retains the error whose token position is the highest seen so far.
///
/// Speculative alternatives fail constantly while parsing; the error that
/// made it farthest into the stream is the one that pinpoints the first
/// token the grammar cannot explain, so it is the one surfaced to the user.
#[derive(Debug, Default)]
pub struct FarthestError {
    slot: Option<(usize, ParseError)>,
}

impl FarthestError {
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Record `err` if it is at least as far as anything seen before.
    pub fn observe(&mut self, err: &ParseError) {
        let farther = match &self.slot {
            None => true,
            Some((pos, _)) => err.pos > *pos,
        };
        if farther {
            self.slot = Some((err.pos, err.clone()));
        }
    }

    pub fn position(&self) -> Option<usize> {
        self.slot.as_ref().map(|(pos, _)| *pos)
    }

    pub fn error(&self) -> Option<ParseError> {
        self.slot.as_ref().map(|(_, err)| err.clone())
    }
}
