//! The Verilog pattern table.
//!
//! Registration order is significant: keywords come before the identifier
//! pattern so that longest-match plus the engine's insertion-order tie-break
//! classifies `module` as a keyword while still lexing `modules` as an
//! identifier. The comparator rule precedes the `=+` rule for the same
//! reason, so `==` lexes as a comparator rather than an equal sign.

use super::{Lexer, Token, TokenKind};

/// Build a lexer configured for the Verilog subset.
pub fn verilog_lexer() -> Lexer {
    let mut lexer = Lexer::new();

    // Skippables
    lexer.keep(r"^[\t ]+", TokenKind::Whitespace);
    lexer.keep(r"^[\r\n]+", TokenKind::Newline);
    lexer.keep(r"^//.*", TokenKind::Comment);
    lexer.keep(r"^(?s)/\*.*?\*/", TokenKind::Comment);

    // Keywords
    lexer.keep(r"^module", TokenKind::Module);
    lexer.keep(r"^endmodule", TokenKind::Endmodule);
    lexer.keep(r"^begin", TokenKind::Begin);
    lexer.keep(r"^end", TokenKind::End);
    lexer.keep(r"^case", TokenKind::Case);
    lexer.keep(r"^endcase", TokenKind::Endcase);
    lexer.keep(r"^generate", TokenKind::Generate);
    lexer.keep(r"^endgenerate", TokenKind::Endgenerate);
    lexer.keep(r"^for", TokenKind::For);
    lexer.keep(r"^if", TokenKind::If);
    lexer.keep(r"^else", TokenKind::Else);
    lexer.keep(r"^assign", TokenKind::Assign);
    lexer.keep(r"^initial", TokenKind::Initial);
    lexer.keep(r"^always", TokenKind::Always);
    lexer.keep(r"^((negedge)|(posedge))", TokenKind::Time);
    lexer.keep(r"^default", TokenKind::Default);
    lexer.keep(r"^task", TokenKind::Task);
    lexer.keep(r"^endtask", TokenKind::Endtask);
    lexer.keep(r"^defparam", TokenKind::Defparam);
    lexer.keep(r"^signed", TokenKind::Signed);

    // Comparisons and operators. The comparator alternation lists the
    // three-character forms first because the regex engine prefers earlier
    // alternatives.
    lexer.keep(
        r"^((===)|(!==)|(==)|(!=)|(<=)|(>=)|>|<)",
        TokenKind::Comparator,
    );
    lexer.keep(
        r"^((&&)|(\|\|)|(<<)|(>>)|\+|-|\*|/|\||&)",
        TokenKind::Operator,
    );
    lexer.keep(r"^~", TokenKind::Tilde);

    // Punctuation
    lexer.keep(r"^\(", TokenKind::LParen);
    lexer.keep(r"^\)", TokenKind::RParen);
    lexer.keep(r"^\[", TokenKind::LBracket);
    lexer.keep(r"^\]", TokenKind::RBracket);
    lexer.keep(r"^\{", TokenKind::LCurl);
    lexer.keep(r"^\}", TokenKind::RCurl);
    lexer.keep(r"^:", TokenKind::Colon);
    lexer.keep(r"^,", TokenKind::Comma);
    lexer.keep(r"^\.", TokenKind::Dot);
    lexer.keep(r"^;", TokenKind::Semicolon);
    lexer.keep(r"^\?", TokenKind::Question);
    lexer.keep(r"^@", TokenKind::At);
    lexer.keep(r"^=+", TokenKind::Equal);
    lexer.keep(r"^#", TokenKind::Pound);

    // Compiler directives. The include marker stops after the directive name;
    // the file-name string that follows lexes as an ordinary literal.
    lexer.keep(r"^`include", TokenKind::Include);
    lexer.keep(r"^`define", TokenKind::Define);
    lexer.keep(r"^`timescale", TokenKind::Timescale);

    // System functions
    lexer.keep(r"^\$((realtime)|(time))", TokenKind::FuncLiteral);
    lexer.keep(r"^\$", TokenKind::Dollar);

    // Types and directions
    lexer.keep(
        r"^((reg)|(wire)|(genvar)|(parameter)|(integer))",
        TokenKind::Type,
    );
    lexer.keep(r"^((input)|(output)|(inout))", TokenKind::Direction);

    // Identifiers, optionally prefixed with a backtick for directive
    // references. The token value drops the backtick.
    lexer.rule(r"^`?[A-Za-z][A-Za-z0-9_]*", |lexeme| {
        let name = lexeme.strip_prefix('`').unwrap_or(lexeme);
        Ok(vec![Token::new(TokenKind::Identifier, name)])
    });

    // Literals: based, decimal, or string.
    lexer.keep(
        r#"^(([0-9]*'[hbd][0-9xzXZA-Fa-f]+)|([0-9]+)|("[^\s]*"))"#,
        TokenKind::Literal,
    );

    lexer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LexError;

    fn lex(code: &str) -> Vec<Token> {
        let (tokens, err) = verilog_lexer().lex(code);
        assert!(err.is_none(), "unexpected lex error: {err:?}");
        tokens
    }

    fn kinds(code: &str) -> Vec<TokenKind> {
        lex(code)
            .into_iter()
            .filter(|t| !t.kind.is_skippable())
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_beat_identifier() {
        assert_eq!(
            kinds("module endmodule begin end"),
            vec![
                TokenKind::Module,
                TokenKind::Endmodule,
                TokenKind::Begin,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        // Longer identifier match outweighs the keyword rule.
        assert_eq!(kinds("modules"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("formats"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("ending"), vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_end_vs_endmodule() {
        let tokens = lex("endmodule");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Endmodule);
    }

    #[test]
    fn test_backtick_identifier_strips_backtick() {
        let tokens = lex("`WIDTH");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].value, "WIDTH");
    }

    #[test]
    fn test_directive_markers() {
        assert_eq!(
            kinds("`define WIDTH 8"),
            vec![TokenKind::Define, TokenKind::Identifier, TokenKind::Literal]
        );
        assert_eq!(
            kinds("`include \"cpu.v\""),
            vec![TokenKind::Include, TokenKind::Literal]
        );
        assert_eq!(kinds("`timescale")[0], TokenKind::Timescale);
    }

    #[test]
    fn test_comparators_and_equal() {
        assert_eq!(
            kinds("== != === <= >= < > ="),
            vec![
                TokenKind::Comparator,
                TokenKind::Comparator,
                TokenKind::Comparator,
                TokenKind::Comparator,
                TokenKind::Comparator,
                TokenKind::Comparator,
                TokenKind::Comparator,
                TokenKind::Equal,
            ]
        );
        // === is one comparator, not == then =.
        let tokens = lex("===");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "===");
    }

    #[test]
    fn test_shift_is_operator_not_comparators() {
        let tokens = lex("<<");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Operator);
        let tokens = lex(">>");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Operator);
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            kinds("&& || & |"),
            vec![
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Operator,
                TokenKind::Operator,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(kinds("42"), vec![TokenKind::Literal]);
        assert_eq!(kinds("8'hFF"), vec![TokenKind::Literal]);
        assert_eq!(kinds("4'b1010"), vec![TokenKind::Literal]);
        assert_eq!(kinds("'d10"), vec![TokenKind::Literal]);
        assert_eq!(kinds("\"top.v\""), vec![TokenKind::Literal]);
        let tokens = lex("3'bxxz");
        assert_eq!(tokens[0].value, "3'bxxz");
    }

    #[test]
    fn test_types_and_directions() {
        assert_eq!(
            kinds("reg wire genvar parameter integer"),
            vec![TokenKind::Type; 5]
        );
        assert_eq!(
            kinds("input output inout"),
            vec![TokenKind::Direction; 3]
        );
    }

    #[test]
    fn test_system_functions() {
        assert_eq!(
            kinds("$time $realtime"),
            vec![TokenKind::FuncLiteral, TokenKind::FuncLiteral]
        );
        assert_eq!(
            kinds("$display"),
            vec![TokenKind::Dollar, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_line_comment() {
        let tokens = lex("wire // trailing words\nclk");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Type,
                TokenKind::Whitespace,
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let tokens = lex("a /* one\ntwo */ b");
        let comment = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Comment)
            .unwrap();
        assert_eq!(comment.line, 0);
        let b = tokens.last().unwrap();
        assert_eq!(b.line, 1);
        assert_eq!(b.value, "b");
    }

    #[test]
    fn test_posedge_negedge() {
        assert_eq!(
            kinds("posedge clk or negedge rst"),
            vec![
                TokenKind::Time,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Time,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_totality_over_module() {
        let input = "module m(a, b);\n  wire a;\n  assign b = a;\nendmodule\n";
        let (tokens, err) = verilog_lexer().lex(input);
        assert!(err.is_none());
        let total: usize = tokens.iter().map(|t| t.value.len()).sum();
        assert_eq!(total, input.len());
    }

    #[test]
    fn test_unlexable_input_reports_offset() {
        let (_, err) = verilog_lexer().lex("wire %");
        assert_eq!(err, Some(LexError::NoToken { offset: 5 }));
    }
}
