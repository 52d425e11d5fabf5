//! Semantic-token retagging and delta encoding.
//!
//! The encoder starts from the plain lexer output. When the file also
//! parses, the AST upgrades specific identifier tokens: module-application
//! names become `existing_module`, named-port labels become `port`, and
//! system-task names become `funcliteral`. Both retag passes scan the token
//! stream forward monotonically, mirroring source order of the flattened
//! statements.

use tower_lsp::lsp_types::{
    SemanticToken, SemanticTokensFullOptions, SemanticTokensLegend, SemanticTokensOptions,
    SemanticTokensServerCapabilities, SemanticTokenType,
};

use crate::ast::{flatten, FileNode, InteriorNode};
use crate::lexer::{Token, TokenKind};

/// Legend order is fixed; the indices below depend on it.
pub fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![
            SemanticTokenType::TYPE,      // 0
            SemanticTokenType::COMMENT,   // 1
            SemanticTokenType::NUMBER,    // 2
            SemanticTokenType::MACRO,     // 3
            SemanticTokenType::VARIABLE,  // 4
            SemanticTokenType::CLASS,     // 5
            SemanticTokenType::PARAMETER, // 6
            SemanticTokenType::FUNCTION,  // 7
        ],
        token_modifiers: vec![],
    }
}

pub fn capabilities() -> SemanticTokensServerCapabilities {
    SemanticTokensServerCapabilities::SemanticTokensOptions(SemanticTokensOptions {
        legend: legend(),
        full: Some(SemanticTokensFullOptions::Bool(true)),
        range: Some(false),
        ..Default::default()
    })
}

/// Legend index for a token kind; `None` is skipped by the encoder.
fn legend_index(kind: TokenKind) -> Option<u32> {
    match kind {
        TokenKind::Type | TokenKind::Direction | TokenKind::Defparam => Some(0),
        TokenKind::Comment => Some(1),
        TokenKind::Literal => Some(2),
        TokenKind::Module
        | TokenKind::Endmodule
        | TokenKind::Begin
        | TokenKind::End
        | TokenKind::Case
        | TokenKind::Endcase
        | TokenKind::Generate
        | TokenKind::Endgenerate
        | TokenKind::For
        | TokenKind::If
        | TokenKind::Else
        | TokenKind::Assign
        | TokenKind::Initial
        | TokenKind::Always
        | TokenKind::Time
        | TokenKind::Default
        | TokenKind::Task
        | TokenKind::Endtask
        | TokenKind::Include
        | TokenKind::Define
        | TokenKind::Timescale => Some(3),
        TokenKind::Identifier => Some(4),
        TokenKind::ExistingModule => Some(5),
        TokenKind::Port => Some(6),
        TokenKind::FuncLiteral | TokenKind::Signed | TokenKind::Dollar | TokenKind::Pound => {
            Some(7)
        }
        _ => None,
    }
}

fn same_token(token: &Token, target: &Token) -> bool {
    token.line == target.line
        && token.start_col == target.start_col
        && token.value == target.value
}

/// Reclassify identifier tokens using the parsed file.
pub fn retag(tokens: &mut [Token], file: &FileNode) {
    let mut idx = 0;
    for interior in flatten::interior_statements(file) {
        if let InteriorNode::ModuleApplication(application) = interior {
            while idx < tokens.len() && !same_token(&tokens[idx], &application.module_name) {
                idx += 1;
            }
            if idx < tokens.len() {
                tokens[idx].kind = TokenKind::ExistingModule;
            }

            for argument in &application.arguments {
                if let Some(label) = &argument.label {
                    while idx < tokens.len() && !same_token(&tokens[idx], label) {
                        idx += 1;
                    }
                    if idx < tokens.len() {
                        tokens[idx].kind = TokenKind::Port;
                    }
                }
            }
        }
    }

    let mut idx = 0;
    for call in flatten::system_calls(file) {
        while idx < tokens.len() && !same_token(&tokens[idx], &call.function) {
            idx += 1;
        }
        if idx < tokens.len() {
            tokens[idx].kind = TokenKind::FuncLiteral;
        }
    }
}

/// Delta-encode the token stream into the protocol's flat 5-tuple array.
pub fn encode(tokens: &[Token]) -> Vec<SemanticToken> {
    let mut result = Vec::new();
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;

    for token in tokens {
        let token_type = match legend_index(token.kind) {
            Some(index) => index,
            None => continue,
        };
        // Crossing a line resets the column reference.
        if token.line != prev_line {
            prev_start = 0;
        }
        result.push(SemanticToken {
            delta_line: token.line - prev_line,
            delta_start: token.start_col - prev_start,
            length: token.value.len() as u32,
            token_type,
            token_modifiers_bitset: 0,
        });
        prev_line = token.line;
        prev_start = token.start_col;
    }

    result
}
