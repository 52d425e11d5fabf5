//! Goto definition/declaration/implementation.
//!
//! No AST is consulted here. The file is scanned line by line up to the
//! cursor, tracking the most recently opened module; the cursor line is then
//! re-lexed to find the token under the cursor, and the symbol tables do the
//! rest. Definition, declaration, and implementation all behave identically.

use tower_lsp::lsp_types::Location;

use crate::lexer::{Lexer, Token, TokenKind};

use super::workspace::WorkspaceIndex;

/// What sits under the cursor: the token itself and the name of the module
/// the cursor is inside, when one opened above it.
pub struct LocationDetails {
    pub token: Token,
    pub current_module: Option<String>,
}

/// Identify the token at `(line, character)` by re-lexing that line.
///
/// Column intervals are accumulated from token value lengths, so skippable
/// tokens count toward positioning too.
pub fn location_details(
    lexer: &Lexer,
    contents: &str,
    line: u32,
    character: u32,
) -> Option<LocationDetails> {
    let mut current_module = None;
    let mut line_text = None;

    for (idx, text) in contents.lines().enumerate() {
        let idx = idx as u32;
        if idx > line {
            break;
        }
        // Cheap prefilter; the token check below rules out `endmodule`.
        if text.contains("module") {
            let (tokens, _) = lexer.lex(text);
            for (i, token) in tokens.iter().enumerate() {
                if token.kind == TokenKind::Module {
                    if let Some(name) = next_identifier(&tokens, i + 1) {
                        current_module = Some(name);
                    }
                }
            }
        }
        if idx == line {
            line_text = Some(text);
        }
    }

    let (tokens, _) = lexer.lex(line_text?);
    let mut start = 0u32;
    for token in tokens {
        let end = start + token.value.len() as u32;
        if start <= character && character < end {
            return Some(LocationDetails {
                token,
                current_module,
            });
        }
        start = end;
    }
    None
}

fn next_identifier(tokens: &[Token], from: usize) -> Option<String> {
    let mut pos = from;
    while pos < tokens.len() && tokens[pos].kind.is_skippable() {
        pos += 1;
    }
    match tokens.get(pos) {
        Some(token) if token.kind == TokenKind::Identifier => Some(token.value.clone()),
        _ => None,
    }
}

/// Resolve the identifier under the cursor to its defining location:
/// global symbols first, then the current module's variables.
pub fn jump_to(
    index: &WorkspaceIndex,
    lexer: &Lexer,
    contents: &str,
    line: u32,
    character: u32,
) -> Vec<Location> {
    let details = match location_details(lexer, contents, line, character) {
        Some(details) => details,
        None => return Vec::new(),
    };

    if details.token.kind != TokenKind::Identifier {
        return Vec::new();
    }

    if let Some(location) = index.symbol_map.get(&details.token.value) {
        return vec![location.clone()];
    }

    if let Some(module) = &details.current_module {
        if let Some(variables) = index.variable_definitions.get(module) {
            if let Some(location) = variables.get(&details.token.value) {
                return vec![location.clone()];
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::verilog_lexer;
    use crate::parser::Parser;
    use std::path::Path;

    fn indexed(contents: &str) -> WorkspaceIndex {
        let (tokens, err) = verilog_lexer().lex(contents);
        assert!(err.is_none());
        let file = Parser::new().parse_file(&tokens).expect("parse");
        let mut index = WorkspaceIndex::new();
        index.apply_file(Path::new("/ws/top.v"), &file);
        index
    }

    const SOURCE: &str = "module top(a);\n  wire x;\n  assign x = a;\nendmodule\n";

    #[test]
    fn test_details_track_current_module() {
        let lexer = verilog_lexer();
        let details = location_details(&lexer, SOURCE, 2, 9).expect("details");
        assert_eq!(details.current_module.as_deref(), Some("top"));
        assert_eq!(details.token.value, "x");
    }

    #[test]
    fn test_cursor_between_tokens() {
        let lexer = verilog_lexer();
        // Column 7 of line 1 is inside `x`; column 6 is the space before it.
        let details = location_details(&lexer, SOURCE, 1, 6).expect("details");
        assert_eq!(details.token.kind, TokenKind::Whitespace);
    }

    #[test]
    fn test_jump_to_variable_definition() {
        let lexer = verilog_lexer();
        let index = indexed(SOURCE);
        // `x` on the assign line resolves to the wire declaration.
        let locations = jump_to(&index, &lexer, SOURCE, 2, 9);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].range.start.line, 1);
        assert_eq!(locations[0].range.start.character, 7);
    }

    #[test]
    fn test_jump_to_module_symbol() {
        let lexer = verilog_lexer();
        let mut index = indexed(SOURCE);
        let other = "module child; endmodule";
        let (tokens, _) = lexer.lex(other);
        let file = Parser::new().parse_file(&tokens).expect("parse");
        index.apply_file(Path::new("/ws/child.v"), &file);

        let use_site = "module top;\n  child c(a);\nendmodule\n";
        let locations = jump_to(&index, &lexer, use_site, 1, 3);
        assert_eq!(locations.len(), 1);
        assert!(locations[0].uri.as_str().ends_with("child.v"));
    }

    #[test]
    fn test_non_identifier_yields_nothing() {
        let lexer = verilog_lexer();
        let index = indexed(SOURCE);
        // Cursor on the `=` of the assign line.
        let locations = jump_to(&index, &lexer, SOURCE, 2, 11);
        assert!(locations.is_empty());
    }
}
