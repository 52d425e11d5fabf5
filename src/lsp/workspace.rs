//! Workspace symbol index.
//!
//! Four maps fed by every successful reparse:
//!
//! - `modules`: file path → modules defined there
//! - `defines`: file path → top-level defines
//! - `symbol_map`: global symbol name → defining location (last writer wins)
//! - `variable_definitions`: module name → variable name → location
//!
//! A failed parse leaves the previous entries in place so cross-file
//! features keep working while the user is mid-edit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::{Diagnostic, Location, Position, Range};

use crate::ast::flatten;
use crate::ast::{DefineNode, FileNode, InteriorNode, ModuleNode, TopLevelStatement};
use crate::interp::Interpreter;
use crate::lexer::Token;

use super::document::path_to_uri;

#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    /// Workspace root from the first workspaceFolders entry at initialize.
    pub root: Option<PathBuf>,
    pub modules: HashMap<PathBuf, Vec<ModuleNode>>,
    pub defines: HashMap<PathBuf, Vec<DefineNode>>,
    pub symbol_map: HashMap<String, Location>,
    pub variable_definitions: HashMap<String, HashMap<String, Location>>,
}

fn token_location(uri: &tower_lsp::lsp_types::Url, token: &Token) -> Location {
    Location {
        uri: uri.clone(),
        range: Range {
            start: Position::new(token.line, token.start_col),
            end: Position::new(token.line, token.end_col),
        },
    }
}

impl WorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace this file's entries in all four maps from a fresh parse.
    pub fn apply_file(&mut self, path: &Path, file: &FileNode) {
        let uri = path_to_uri(path);

        // This file's previous global symbols go away before re-adding, so a
        // renamed module does not leave a stale entry behind.
        self.symbol_map.retain(|_, location| location.uri != uri);

        let mut modules = Vec::new();
        let mut defines = Vec::new();

        for statement in &file.statements {
            match statement {
                TopLevelStatement::Module(module) => {
                    let mut variables = HashMap::new();
                    for interior in flatten::module_interior_statements(module) {
                        if let InteriorNode::Declaration(decl) = interior {
                            for variable in &decl.variables {
                                variables.insert(
                                    variable.identifier.value.clone(),
                                    token_location(&uri, &variable.identifier),
                                );
                            }
                        }
                    }
                    self.variable_definitions
                        .insert(module.identifier.value.clone(), variables);
                    modules.push(module.clone());
                }
                TopLevelStatement::Directive(directive) => {
                    if let Some(define) = &directive.define {
                        defines.push(define.clone());
                    }
                }
            }
        }

        for module in &modules {
            self.symbol_map.insert(
                module.identifier.value.clone(),
                token_location(&uri, &module.identifier),
            );
        }
        for define in &defines {
            self.symbol_map.insert(
                define.identifier.value.clone(),
                token_location(&uri, &define.identifier),
            );
        }

        self.modules.insert(path.to_path_buf(), modules);
        self.defines.insert(path.to_path_buf(), defines);
    }

    /// Run the semantic walk for `file` against the current index.
    pub fn interpret(&self, file: &FileNode) -> Vec<Diagnostic> {
        Interpreter::new(&self.modules, &self.defines).interpret(file)
    }

    /// Recursively enumerate `.v` files under the workspace root.
    pub fn scan_workspace(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        if let Some(root) = &self.root {
            scan_directory(root, &mut found);
        }
        found
    }
}

fn scan_directory(dir: &Path, found: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "cannot read workspace directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_directory(&path, found);
        } else if path.to_string_lossy().ends_with(".v") {
            found.push(path);
        }
    }
}
