//! Regex-directed longest-match lexer engine.
//!
//! A [`Lexer`] is an ordered sequence of `(pattern, factory)` rules. At each
//! position the rule with the longest match wins; ties break in favour of the
//! earliest registered rule, which is how the Verilog table gives keywords
//! priority over the identifier pattern. A factory may return more than one
//! token for a single lexeme.

pub mod tokens;
pub mod verilog;

pub use tokens::{Token, TokenKind};
pub use verilog::verilog_lexer;

use regex::Regex;
use thiserror::Error;

/// Lexing failure. Lexing halts at the first error; the tokens produced up to
/// that point are still handed back to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("no token matches input at offset {offset}")]
    NoToken { offset: usize },
    #[error("cannot tokenize {lexeme:?}: {message}")]
    BadLexeme { lexeme: String, message: String },
}

type Factory = Box<dyn Fn(&str) -> Result<Vec<Token>, LexError> + Send + Sync>;

struct Rule {
    pattern: Regex,
    factory: Factory,
}

/// Ordered pattern table driving the scan loop.
pub struct Lexer {
    rules: Vec<Rule>,
}

impl Lexer {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule whose factory turns the matched lexeme into one or
    /// more tokens. Patterns must be anchored with `^`.
    pub fn rule<F>(&mut self, pattern: &str, factory: F)
    where
        F: Fn(&str) -> Result<Vec<Token>, LexError> + Send + Sync + 'static,
    {
        debug_assert!(pattern.starts_with('^'), "lexer patterns must be anchored");
        self.rules.push(Rule {
            pattern: Regex::new(pattern).expect("lexer pattern must be a valid regex"),
            factory: Box::new(factory),
        });
    }

    /// Register a rule that emits a single token of `kind` carrying the whole
    /// matched lexeme.
    pub fn keep(&mut self, pattern: &str, kind: TokenKind) {
        self.rule(pattern, move |lexeme| Ok(vec![Token::new(kind, lexeme)]));
    }

    /// Tokenize `code`.
    ///
    /// Returns every token lexed before the first failure, and the failure if
    /// one occurred. On success the tokens cover the entire input.
    pub fn lex(&self, code: &str) -> (Vec<Token>, Option<LexError>) {
        let mut tokens = Vec::new();
        let mut i = 0;
        let mut line: u32 = 0;
        let mut line_start = 0usize;

        while i < code.len() {
            let rest = &code[i..];

            // Longest match across all rules; earliest rule wins ties.
            let mut best_len = 0;
            let mut best: Option<&Rule> = None;
            for rule in &self.rules {
                if let Some(m) = rule.pattern.find(rest) {
                    if m.start() == 0 && m.end() > best_len {
                        best_len = m.end();
                        best = Some(rule);
                    }
                }
            }

            let rule = match best {
                Some(rule) => rule,
                None => return (tokens, Some(LexError::NoToken { offset: i })),
            };

            let lexeme = &rest[..best_len];
            let produced = match (rule.factory)(lexeme) {
                Ok(produced) => produced,
                Err(err) => return (tokens, Some(err)),
            };

            // Tokens from one lexeme are stamped sequentially from the match
            // start, each spanning its own value.
            let mut col = (i - line_start) as u32;
            for mut token in produced {
                token.line = line;
                token.start_col = col;
                token.end_col = col + token.value.len() as u32;
                col = token.end_col;
                tokens.push(token);
            }

            for (offset, _) in lexeme.match_indices('\n') {
                line += 1;
                line_start = i + offset + 1;
            }
            i += best_len;
        }

        (tokens, None)
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_lexer() -> Lexer {
        let mut lexer = Lexer::new();
        lexer.keep(r"^[\t ]+", TokenKind::Whitespace);
        lexer.keep(r"^\n+", TokenKind::Newline);
        lexer.keep(r"^for", TokenKind::For);
        lexer.keep(r"^[a-z]+", TokenKind::Identifier);
        lexer.keep(r"^[0-9]+", TokenKind::Literal);
        lexer
    }

    #[test]
    fn test_longest_match_wins() {
        // "fortune" matches both the keyword (3) and identifier (7) rules.
        let (tokens, err) = toy_lexer().lex("fortune");
        assert!(err.is_none());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "fortune");
    }

    #[test]
    fn test_insertion_order_breaks_ties() {
        // "for" matches the keyword and identifier rules at equal length; the
        // keyword registered first so it wins.
        let (tokens, err) = toy_lexer().lex("for");
        assert!(err.is_none());
        assert_eq!(tokens[0].kind, TokenKind::For);
    }

    #[test]
    fn test_no_token_error_reports_offset() {
        let (tokens, err) = toy_lexer().lex("ab !");
        assert_eq!(err, Some(LexError::NoToken { offset: 3 }));
        // Partial tokens before the failure are kept.
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "ab");
    }

    #[test]
    fn test_totality_covers_input() {
        let input = "for x 12\n  y 3";
        let (tokens, err) = toy_lexer().lex(input);
        assert!(err.is_none());
        let total: usize = tokens.iter().map(|t| t.value.len()).sum();
        assert_eq!(total, input.len());
    }

    #[test]
    fn test_line_and_column_stamping() {
        let (tokens, err) = toy_lexer().lex("ab 12\ncd");
        assert!(err.is_none());
        assert_eq!(tokens[0].line, 0);
        assert_eq!((tokens[0].start_col, tokens[0].end_col), (0, 2));
        assert_eq!((tokens[2].start_col, tokens[2].end_col), (3, 5));
        let cd = tokens.last().unwrap();
        assert_eq!(cd.line, 1);
        assert_eq!((cd.start_col, cd.end_col), (0, 2));
    }

    #[test]
    fn test_column_monotonicity() {
        let (tokens, err) = toy_lexer().lex("abc de 1\nf 23 g\n\nhh");
        assert!(err.is_none());
        let mut prev_line = 0;
        let mut prev_start = None::<u32>;
        for token in &tokens {
            assert!(token.start_col <= token.end_col);
            assert!(token.line >= prev_line);
            if token.line == prev_line {
                if let Some(prev) = prev_start {
                    assert!(token.start_col > prev);
                }
            } else {
                prev_start = None;
            }
            prev_line = token.line;
            prev_start = Some(token.start_col);
        }
    }

    #[test]
    fn test_multi_token_factory() {
        let mut lexer = Lexer::new();
        lexer.keep(r"^[\t ]+", TokenKind::Whitespace);
        // One lexeme, two logical tokens.
        lexer.rule(r"^[a-z]+=[a-z]+", |lexeme| {
            let (lhs, rhs) = lexeme.split_once('=').ok_or(LexError::BadLexeme {
                lexeme: lexeme.to_string(),
                message: "missing =".to_string(),
            })?;
            Ok(vec![
                Token::new(TokenKind::Identifier, lhs),
                Token::new(TokenKind::Identifier, rhs),
            ])
        });
        let (tokens, err) = lexer.lex("ab=cd");
        assert!(err.is_none());
        assert_eq!(tokens.len(), 2);
        assert_eq!((tokens[0].start_col, tokens[0].end_col), (0, 2));
        assert_eq!((tokens[1].start_col, tokens[1].end_col), (2, 4));
    }

    #[test]
    fn test_factory_error_surfaces() {
        let mut lexer = Lexer::new();
        lexer.rule(r"^[a-z]+", |lexeme| {
            Err(LexError::BadLexeme {
                lexeme: lexeme.to_string(),
                message: "rejected".to_string(),
            })
        });
        let (tokens, err) = lexer.lex("abc");
        assert!(tokens.is_empty());
        assert!(matches!(err, Some(LexError::BadLexeme { .. })));
    }
}
