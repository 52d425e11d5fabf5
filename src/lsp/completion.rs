//! Completion assembly.
//!
//! The list mixes global items (emoji shortcodes, workspace defines, module
//! snippets, keywords, snippets) with the variables visible in the module
//! under the cursor. It is always marked incomplete so the client keeps
//! asking as the user types.

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, InsertTextFormat, Location,
};

use crate::ast::ModuleNode;

use super::workspace::WorkspaceIndex;

/// Emoji shortcodes offered in completion. Static asset.
pub const EMOJIS: &[(&str, &str)] = &[
    ("checkmark", "✔️"),
    ("cross", "❌"),
    ("warning", "⚠️"),
    ("fire", "🔥"),
    ("rocket", "🚀"),
    ("bug", "🐛"),
    ("zap", "⚡"),
    ("gear", "⚙️"),
    ("chip", "🖥️"),
    ("light_bulb", "💡"),
    ("hourglass", "⏳"),
    ("clock", "⏰"),
    ("thumbsup", "👍"),
    ("thumbsdown", "👎"),
    ("tada", "🎉"),
];

/// Keywords offered in completion. Static asset.
pub const KEYWORDS: &[&str] = &[
    "module",
    "endmodule",
    "begin",
    "end",
    "case",
    "endcase",
    "generate",
    "endgenerate",
    "for",
    "if",
    "else",
    "assign",
    "initial",
    "always",
    "posedge",
    "negedge",
    "default",
    "task",
    "endtask",
    "defparam",
    "signed",
    "reg",
    "wire",
    "genvar",
    "parameter",
    "integer",
    "input",
    "output",
    "inout",
];

/// Snippets offered in completion. Static asset.
pub const SNIPPETS: &[(&str, &str)] = &[
    (
        "module block",
        "module ${1:name}(${2:ports});\n\t$0\nendmodule",
    ),
    (
        "always block",
        "always @(posedge ${1:clk}) begin\n\t$0\nend",
    ),
    (
        "case block",
        "case (${1:expr})\n\t${2:value}: $0\n\tdefault:\nendcase",
    ),
    (
        "for loop",
        "for (${1:i} = 0; $1 < ${2:limit}; $1 = $1 + 1) begin\n\t$0\nend",
    ),
    ("initial block", "initial begin\n\t$0\nend"),
];

/// Snippet stub that instantiates `module` with every port labelled and a
/// tab stop per argument: `name ${1:name}(.a($2), .b($3));`
fn application_snippet(module: &ModuleNode) -> String {
    let arguments: Vec<String> = module
        .ports
        .iter()
        .enumerate()
        .map(|(i, port)| format!(".{}(${})", port.value, i + 2))
        .collect();
    format!(
        "{} ${{1:name}}({});",
        module.identifier.value,
        arguments.join(", ")
    )
}

/// Assemble the full completion list.
pub fn completion_list(
    index: &WorkspaceIndex,
    variables: Option<&HashMap<String, Location>>,
) -> CompletionList {
    let mut items = Vec::new();

    for (word, emoji) in EMOJIS {
        items.push(CompletionItem {
            label: (*word).to_string(),
            detail: Some((*emoji).to_string()),
            insert_text: Some((*emoji).to_string()),
            ..Default::default()
        });
    }

    for defines in index.defines.values() {
        for define in defines {
            let reference = format!("`{}", define.identifier.value);
            items.push(CompletionItem {
                label: reference.clone(),
                detail: Some("define".to_string()),
                kind: Some(CompletionItemKind::CONSTANT),
                insert_text: Some(reference),
                ..Default::default()
            });
        }
    }

    for modules in index.modules.values() {
        for module in modules {
            items.push(CompletionItem {
                label: module.identifier.value.clone(),
                detail: Some("module".to_string()),
                kind: Some(CompletionItemKind::MODULE),
                insert_text: Some(application_snippet(module)),
                insert_text_format: Some(InsertTextFormat::SNIPPET),
                ..Default::default()
            });
        }
    }

    for keyword in KEYWORDS {
        items.push(CompletionItem {
            label: (*keyword).to_string(),
            detail: Some("keyword".to_string()),
            kind: Some(CompletionItemKind::KEYWORD),
            insert_text: Some((*keyword).to_string()),
            ..Default::default()
        });
    }

    for (name, snippet) in SNIPPETS {
        items.push(CompletionItem {
            label: (*name).to_string(),
            detail: Some("snippet".to_string()),
            kind: Some(CompletionItemKind::SNIPPET),
            insert_text: Some((*snippet).to_string()),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            ..Default::default()
        });
    }

    if let Some(variables) = variables {
        for name in variables.keys() {
            items.push(CompletionItem {
                label: name.clone(),
                detail: Some("variable".to_string()),
                kind: Some(CompletionItemKind::VARIABLE),
                insert_text: Some(name.clone()),
                ..Default::default()
            });
        }
    }

    CompletionList {
        is_incomplete: true,
        items,
    }
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
        index.apply_file(Path::new("/ws/a.v"), &file);
        index
    }

    #[test]
    fn test_application_snippet_lists_every_port() {
        let index = indexed("module fifo(clk, rst, data); endmodule");
        let module = &index.modules[Path::new("/ws/a.v")][0];
        assert_eq!(
            application_snippet(module),
            "fifo ${1:name}(.clk($2), .rst($3), .data($4));"
        );
    }

    #[test]
    fn test_list_is_incomplete_and_has_all_sections() {
        let index = indexed("`define WIDTH 8\nmodule fifo(clk); endmodule");
        let list = completion_list(&index, None);
        assert!(list.is_incomplete);

        let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"`WIDTH"));
        assert!(labels.contains(&"fifo"));
        assert!(labels.contains(&"endgenerate"));
        assert!(labels.contains(&"always block"));
        assert!(labels.contains(&"rocket"));
    }

    #[test]
    fn test_variables_of_current_module_included() {
        let index = indexed("module m; wire ready; endmodule");
        let variables = index.variable_definitions.get("m").unwrap();
        let list = completion_list(&index, Some(variables));
        assert!(list.items.iter().any(|i| i.label == "ready"));
    }

    #[test]
    fn test_module_item_is_snippet() {
        let index = indexed("module m(a); endmodule");
        let list = completion_list(&index, None);
        let item = list.items.iter().find(|i| i.label == "m").unwrap();
        assert_eq!(item.insert_text_format, Some(InsertTextFormat::SNIPPET));
        assert_eq!(item.insert_text.as_deref(), Some("m ${1:name}(.a($2));"));
    }
}
