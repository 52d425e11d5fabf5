//! Language server for a Verilog-family hardware description language.
//!
//! The crate is organised as a small compiler front-end feeding an LSP layer:
//!
//! - [`lexer`] — a regex-directed longest-match lexer engine plus the Verilog
//!   pattern table that instantiates it
//! - [`ast`] — the typed syntax tree and flattening utilities
//! - [`parser`] — a recursive-descent parser with farthest-error tracking
//! - [`interp`] — the symbol-environment walk that produces
//!   unknown-identifier diagnostics
//! - [`lsp`] — the tower-lsp server, workspace index, and feature providers

pub mod ast;
pub mod interp;
pub mod lexer;
pub mod lsp;
pub mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
