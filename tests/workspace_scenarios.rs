//! End-to-end scenarios over the core pipeline: lex → parse → index →
//! interpret, plus goto resolution through the symbol tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use verilog_ls::ast::FileNode;
use verilog_ls::lexer::verilog_lexer;
use verilog_ls::lsp::definition;
use verilog_ls::lsp::workspace::WorkspaceIndex;
use verilog_ls::parser::Parser;

/// A handful of in-memory files indexed as a workspace.
struct TestWorkspace {
    index: WorkspaceIndex,
    sources: HashMap<PathBuf, String>,
}

impl TestWorkspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let mut workspace = Self {
            index: WorkspaceIndex::new(),
            sources: HashMap::new(),
        };
        for (name, source) in files {
            workspace.update(name, source).expect("initial sources parse");
        }
        workspace
    }

    /// Reparse one file, updating the index on success. Mirrors the server's
    /// didChange path: a failed parse leaves previous entries alone.
    fn update(&mut self, name: &str, source: &str) -> Result<FileNode, String> {
        let path = PathBuf::from(format!("/ws/{name}"));
        self.sources.insert(path.clone(), source.to_string());

        let (tokens, lex_err) = verilog_lexer().lex(source);
        if let Some(err) = lex_err {
            return Err(err.to_string());
        }
        let file = Parser::new()
            .parse_file(&tokens)
            .map_err(|err| err.to_string())?;
        self.index.apply_file(&path, &file);
        Ok(file)
    }

    fn diagnostics(&self, name: &str) -> Vec<String> {
        let path = PathBuf::from(format!("/ws/{name}"));
        let source = &self.sources[&path];
        let (tokens, _) = verilog_lexer().lex(source);
        let file = Parser::new().parse_file(&tokens).expect("parse");
        self.index
            .interpret(&file)
            .into_iter()
            .map(|d| d.message)
            .collect()
    }
}

#[test]
fn s1_trivial_module() {
    let workspace = TestWorkspace::new(&[(
        "m.v",
        "module m(a, b); wire a; assign b = a; endmodule",
    )]);

    assert!(workspace.index.symbol_map.contains_key("m"));
    assert!(workspace.index.variable_definitions["m"].contains_key("a"));
    assert!(workspace.diagnostics("m.v").is_empty());
}

#[test]
fn s2_unknown_variable() {
    let workspace = TestWorkspace::new(&[("m.v", "module m; assign y = x; endmodule")]);
    assert_eq!(
        workspace.diagnostics("m.v"),
        vec!["Unknown variable: y", "Unknown variable: x"]
    );
}

#[test]
fn s3_unknown_module() {
    let workspace = TestWorkspace::new(&[
        ("b.v", "module mod_b; endmodule"),
        ("top.v", "module top; mod_c inst(.p(1)); endmodule"),
    ]);
    // No diagnostic for .p: the module is unknown, so ports are not checked.
    assert_eq!(workspace.diagnostics("top.v"), vec!["Unknown module: mod_c"]);
}

#[test]
fn s4_named_port_check() {
    let workspace = TestWorkspace::new(&[
        ("child.v", "module child(a, b); endmodule"),
        ("top.v", "module top; child c(.a(1), .q(2)); endmodule"),
    ]);
    assert_eq!(
        workspace.diagnostics("top.v"),
        vec!["Unknown module port: q"]
    );
}

#[test]
fn s5_define_visibility() {
    let workspace = TestWorkspace::new(&[
        ("a.v", "`define WIDTH 8\n"),
        ("b.v", "module m; reg [`WIDTH:0] r; endmodule"),
    ]);
    assert!(workspace.diagnostics("b.v").is_empty());
}

#[test]
fn s6_parse_error_preserves_index() {
    let mut workspace = TestWorkspace::new(&[("m.v", "module m; wire w; endmodule")]);
    assert!(workspace.index.symbol_map.contains_key("m"));

    // The edit makes the file unparseable; the error lands on the @ token.
    let err = workspace
        .update("m.v", "module m; wire @ ; endmodule")
        .expect_err("expected a parse error");
    assert!(err.contains("@"));

    // Previous index entries survive the failed parse.
    assert!(workspace.index.symbol_map.contains_key("m"));
    assert!(workspace.index.variable_definitions["m"].contains_key("w"));
}

#[test]
fn parse_failure_in_one_file_leaves_others_untouched() {
    let mut workspace = TestWorkspace::new(&[
        ("a.v", "module alpha; endmodule"),
        ("b.v", "module beta; endmodule"),
    ]);

    workspace
        .update("b.v", "module beta; garbage @ endmodule")
        .expect_err("expected a parse error");

    assert!(workspace.index.symbol_map.contains_key("alpha"));
    assert!(workspace.index.symbol_map.contains_key("beta"));
    assert_eq!(workspace.index.modules[Path::new("/ws/a.v")].len(), 1);
    assert_eq!(workspace.index.modules[Path::new("/ws/b.v")].len(), 1);
}

#[test]
fn goto_round_trip_over_symbol_map() {
    let workspace = TestWorkspace::new(&[
        ("defs.v", "`define WIDTH 8\n`define DEPTH 4\n"),
        (
            "mods.v",
            "module alpha(x);\nendmodule\nmodule beta;\nwire y;\nendmodule\n",
        ),
    ]);

    // Every symbol's stored range covers a token whose value is the symbol.
    for (name, location) in &workspace.index.symbol_map {
        let path = PathBuf::from(location.uri.path());
        let source = &workspace.sources[&path];
        let (tokens, _) = verilog_lexer().lex(source);
        let found = tokens.iter().any(|t| {
            t.line == location.range.start.line
                && t.start_col == location.range.start.character
                && t.value == *name
        });
        assert!(found, "symbol {name} does not round-trip to a token");
    }
}

#[test]
fn goto_definition_across_files() {
    let workspace = TestWorkspace::new(&[
        ("child.v", "module child(a, b);\nendmodule\n"),
        (
            "top.v",
            "module top;\n  child c0(.a(1), .b(2));\nendmodule\n",
        ),
    ]);

    let lexer = verilog_lexer();
    let source = &workspace.sources[Path::new("/ws/top.v")];
    // Cursor on `child` in the instantiation line.
    let locations = definition::jump_to(&workspace.index, &lexer, source, 1, 4);
    assert_eq!(locations.len(), 1);
    assert!(locations[0].uri.as_str().ends_with("child.v"));
    assert_eq!(locations[0].range.start.line, 0);

    // Cursor on a local variable resolves inside the module.
    let source = &workspace.sources[Path::new("/ws/child.v")];
    let locations = definition::jump_to(&workspace.index, &lexer, source, 0, 13);
    // `a` is a port, not a declared variable, so nothing resolves.
    assert!(locations.is_empty());
}

#[test]
fn reindex_after_edit_updates_locations() {
    let mut workspace = TestWorkspace::new(&[("m.v", "module m;\nwire a;\nendmodule\n")]);
    let before = workspace.index.variable_definitions["m"]["a"].clone();
    assert_eq!(before.range.start.line, 1);

    workspace
        .update("m.v", "module m;\n\nwire a;\nendmodule\n")
        .expect("reparse");
    let after = workspace.index.variable_definitions["m"]["a"].clone();
    assert_eq!(after.range.start.line, 2);
}
