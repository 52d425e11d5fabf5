//! Semantic-diagnostics walk over parsed files.
//!
//! Given the workspace-wide module and define tables, the interpreter walks a
//! file's modules and reports references to identifiers that were never
//! introduced, applications of unknown modules, and named ports that do not
//! exist on the referenced module. Scoping is deliberately flat inside a
//! module: `for`, `if`, `begin/end`, `always`, `initial`, and `generate` do
//! not open inner scopes, so a variable introduced anywhere is visible to
//! siblings and later statements.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::ast::*;
use crate::lexer::{Token, TokenKind};

/// Gate primitives that are always valid module-application targets.
pub const BUILTIN_GATES: &[&str] = &[
    "and", "or", "xor", "nand", "nor", "xnor", "buf", "not", "bufif1", "notif1", "bufif0",
    "notif0",
];

type SymbolSet = HashSet<String>;

/// One walk over one file, against a snapshot of the workspace tables.
pub struct Interpreter<'a> {
    modules: HashMap<&'a str, &'a ModuleNode>,
    defines: Vec<&'a DefineNode>,
    builtins: HashSet<&'static str>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        modules: &'a HashMap<PathBuf, Vec<ModuleNode>>,
        defines: &'a HashMap<PathBuf, Vec<DefineNode>>,
    ) -> Self {
        let mut module_map = HashMap::new();
        for file_modules in modules.values() {
            for module in file_modules {
                module_map.insert(module.identifier.value.as_str(), module);
            }
        }
        let flattened_defines = defines.values().flatten().collect();

        Self {
            modules: module_map,
            defines: flattened_defines,
            builtins: BUILTIN_GATES.iter().copied().collect(),
            diagnostics: Vec::new(),
        }
    }

    /// Walk every module in `file` and return the collected warnings.
    pub fn interpret(mut self, file: &FileNode) -> Vec<Diagnostic> {
        for statement in &file.statements {
            if let TopLevelStatement::Module(module) = statement {
                self.diagnose_module(module);
            }
        }
        self.diagnostics
    }

    fn diagnose_module(&mut self, module: &ModuleNode) {
        // Ports are in scope from the start, and every workspace define is
        // seeded in its backtick-prefixed form.
        let mut env: SymbolSet = module.ports.iter().map(|p| p.value.clone()).collect();
        env.extend(
            self.defines
                .iter()
                .map(|d| format!("`{}", d.identifier.value)),
        );

        for statement in &module.interior {
            env = self.walk_interior(statement, env);
        }
    }

    fn unknown(&mut self, token: &Token, kind: &str) {
        self.diagnostics.push(Diagnostic {
            range: Range {
                start: Position::new(token.line, token.start_col),
                end: Position::new(token.line, token.end_col),
            },
            severity: Some(DiagnosticSeverity::WARNING),
            message: format!("Unknown {}: {}", kind, token.value),
            ..Default::default()
        });
    }

    fn walk_interior(&mut self, node: &InteriorNode, mut env: SymbolSet) -> SymbolSet {
        match node {
            InteriorNode::Declaration(decl) => {
                // Type ranges and initializer expressions are not checked;
                // constant expressions would be all noise.
                for variable in &decl.variables {
                    env.insert(variable.identifier.value.clone());
                }
            }
            InteriorNode::Assignment(assignment) => {
                self.check_assignment(assignment, &env);
            }
            InteriorNode::ModuleApplication(application) => {
                self.check_application(application, &env);
            }
            InteriorNode::Generate(generate) => {
                for statement in &generate.statements {
                    env = self.walk_statement(statement, env);
                }
            }
            InteriorNode::Always(always) => {
                env = self.walk_statement(&always.statement, env);
            }
            InteriorNode::DefParam(defparam) => {
                self.check_expression(&defparam.value, &env);
                if let Some(first) = defparam.identifiers.first() {
                    env.insert(first.value.clone());
                }
            }
            InteriorNode::Initial(initial) => {
                env = self.walk_statement(&initial.statement, env);
            }
            InteriorNode::Directive(directive) => {
                if let Some(define) = &directive.define {
                    env.insert(define.identifier.value.clone());
                }
            }
            InteriorNode::Task(task) => {
                for statement in &task.statements {
                    env = match statement {
                        TaskStatement::Interior(interior) => self.walk_interior(interior, env),
                        TaskStatement::Begin(block) => {
                            let mut env = env;
                            for statement in &block.statements {
                                env = self.walk_statement(statement, env);
                            }
                            env
                        }
                    };
                }
            }
        }
        env
    }

    fn walk_statement(&mut self, statement: &AlwaysStatement, mut env: SymbolSet) -> SymbolSet {
        match statement {
            AlwaysStatement::Begin(block) => {
                for statement in &block.statements {
                    env = self.walk_statement(statement, env);
                }
                env
            }
            AlwaysStatement::For(block) => {
                if let Some(initializer) = &block.initializer {
                    self.check_assignment(initializer, &env);
                }
                if let Some(condition) = &block.condition {
                    self.check_expression(condition, &env);
                }
                if let Some(incrementor) = &block.incrementor {
                    self.check_assignment(incrementor, &env);
                }
                // The body sees the current symbols, but nothing it
                // introduces escapes back out.
                let _ = self.walk_statement(&block.body, env.clone());
                env
            }
            AlwaysStatement::If(block) => {
                self.check_expression(&block.condition, &env);
                let body_env = self.walk_statement(&block.body, env.clone());
                // When an else branch exists, its resulting symbols replace
                // the parent's; the body's survive only without an else.
                match &block.else_body {
                    Some(else_body) => self.walk_statement(else_body, env),
                    None => body_env,
                }
            }
            AlwaysStatement::Case(case) => {
                self.check_expression(&case.scrutinee, &env);
                for arm in &case.cases {
                    for condition in &arm.conditions {
                        self.check_expression(condition, &env);
                    }
                    env = self.walk_statement(&arm.statement, env);
                }
                if let Some(default) = &case.default {
                    env = self.walk_statement(default, env);
                }
                env
            }
            AlwaysStatement::SystemCall(call) => {
                for argument in &call.arguments {
                    self.check_expression(argument, &env);
                }
                env
            }
            AlwaysStatement::Delay(_) => env,
            AlwaysStatement::Interior(interior) => self.walk_interior(interior, env),
        }
    }

    fn check_assignment(&mut self, assignment: &AssignmentNode, env: &SymbolSet) {
        if !env.contains(&assignment.identifier.value) {
            self.unknown(&assignment.identifier, "variable");
        }
        self.check_expression(&assignment.value, env);
        if let Some(index) = &assignment.index {
            self.check_expression(&index.index, env);
        }
    }

    fn check_application(&mut self, application: &ModuleApplicationNode, env: &SymbolSet) {
        let name = application.module_name.value.as_str();
        let known = self.modules.get(name).copied();
        if known.is_none() && !self.builtins.contains(name) {
            self.unknown(&application.module_name, "module");
        }

        for argument in &application.arguments {
            if let Some(value) = &argument.value {
                self.check_expression(value, env);
            }
            // Named ports are only checked against modules we know about.
            if let (Some(label), Some(module)) = (&argument.label, known) {
                let exists = module.ports.iter().any(|p| p.value == label.value);
                if !exists {
                    self.unknown(label, "module port");
                }
            }
        }
    }

    fn check_expression(&mut self, expr: &ExprNode, env: &SymbolSet) {
        match &expr.primary {
            ExprPrimary::Value(sized) => self.check_sized_value(sized, env),
            ExprPrimary::Paren(inner) => self.check_expression(inner, env),
        }
        if let Some(right) = &expr.right {
            self.check_expression(right, env);
        }
        if let Some(expr_true) = &expr.expr_true {
            self.check_expression(expr_true, env);
        }
        if let Some(expr_false) = &expr.expr_false {
            self.check_expression(expr_false, env);
        }
    }

    fn check_sized_value(&mut self, sized: &SizedValueNode, env: &SymbolSet) {
        match &sized.value {
            SizedValue::Single(value) => self.check_value(value, env),
            SizedValue::Concat(children) => {
                for child in children {
                    self.check_sized_value(child, env);
                }
            }
        }
    }

    fn check_value(&mut self, value: &ValueNode, env: &SymbolSet) {
        for token in &value.path {
            if token.kind == TokenKind::Identifier && !env.contains(&token.value) {
                self.unknown(token, "variable");
            }
        }
        for selector in &value.selectors {
            match selector {
                Selector::Index(index) => self.check_expression(&index.index, env),
                Selector::Range(range) => {
                    self.check_expression(&range.from, env);
                    self.check_expression(&range.to, env);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::verilog_lexer;
    use crate::parser::Parser;

    fn parse(code: &str) -> FileNode {
        let (tokens, err) = verilog_lexer().lex(code);
        assert!(err.is_none(), "lex error: {err:?}");
        Parser::new()
            .parse_file(&tokens)
            .unwrap_or_else(|err| panic!("parse error: {err}"))
    }

    /// Index `sources` as a workspace and interpret the last one.
    fn diagnose_workspace(sources: &[&str]) -> Vec<Diagnostic> {
        let mut modules = HashMap::new();
        let mut defines = HashMap::new();
        let mut last = None;
        for (i, source) in sources.iter().enumerate() {
            let file = parse(source);
            let path = PathBuf::from(format!("/ws/file{i}.v"));
            modules.insert(path.clone(), file.modules().cloned().collect::<Vec<_>>());
            defines.insert(path, file.defines().cloned().collect::<Vec<_>>());
            last = Some(file);
        }
        Interpreter::new(&modules, &defines).interpret(&last.unwrap())
    }

    fn diagnose(source: &str) -> Vec<Diagnostic> {
        diagnose_workspace(&[source])
    }

    #[test]
    fn test_clean_module_has_no_diagnostics() {
        let diags = diagnose("module m(a, b); wire a; assign b = a; endmodule");
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn test_unknown_variable_on_both_sides() {
        let diags = diagnose("module m; assign y = x; endmodule");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "Unknown variable: y");
        assert_eq!(diags[1].message, "Unknown variable: x");
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn test_declaration_before_use() {
        let diags = diagnose("module m; reg x; assign x = 0; endmodule");
        assert!(diags.is_empty());

        // Flat scope is still ordered: a use before the declaration warns.
        let diags = diagnose("module m; assign x = 0; reg x; endmodule");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown variable: x");
    }

    #[test]
    fn test_unknown_module() {
        let diags = diagnose_workspace(&[
            "module mod_b; endmodule",
            "module top; mod_c inst(.p(1)); endmodule",
        ]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown module: mod_c");
        // The .p label is not checked because mod_c is unknown.
    }

    #[test]
    fn test_builtin_gates_are_never_unknown() {
        for gate in BUILTIN_GATES {
            let source = format!("module top(a, b, y); {gate} g(y, a, b); endmodule");
            let diags = diagnose(&source);
            assert!(diags.is_empty(), "{gate} flagged: {diags:?}");
        }
    }

    #[test]
    fn test_unknown_module_port() {
        let diags = diagnose_workspace(&[
            "module child(a, b); endmodule",
            "module top; child c(.a(1), .q(2)); endmodule",
        ]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown module port: q");
    }

    #[test]
    fn test_known_ports_pass() {
        let diags = diagnose_workspace(&[
            "module child(a, b); endmodule",
            "module top; wire x; child c(.a(x), .b(x)); endmodule",
        ]);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn test_define_in_type_range_is_not_checked() {
        let diags = diagnose_workspace(&[
            "`define WIDTH 8\n",
            "module m; reg [`WIDTH:0] r; endmodule",
        ]);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn test_declaration_inside_always_extends_scope() {
        let diags = diagnose(
            "module m;\n\
             always @(posedge clk) begin\n\
               reg t;\n\
               t = 1;\n\
             end\n\
             assign t = 0;\n\
             endmodule",
        );
        // `t` leaks out of the always block by design (flat scoping); only
        // the sensitivity identifier use is unchecked, so nothing warns.
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn test_else_branch_result_replaces_parent_scope() {
        // The declaration in the if-body is dropped once an else branch
        // exists; the walker keeps the else branch's view of the scope.
        let diags = diagnose(
            "module m(s);\n\
             always @(posedge clk)\n\
               if (s) begin reg t; t = 1; end\n\
               else begin end\n\
             assign t = 0;\n\
             endmodule",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown variable: t");
    }

    #[test]
    fn test_for_body_symbols_do_not_escape() {
        let diags = diagnose(
            "module m;\n\
             genvar i;\n\
             generate\n\
               for (i = 0; i < 4; i = i + 1) begin\n\
                 reg t;\n\
               end\n\
             endgenerate\n\
             assign t = 0;\n\
             endmodule",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown variable: t");
    }

    #[test]
    fn test_for_initializer_is_checked() {
        let diags = diagnose(
            "module m;\n\
             generate\n\
               for (i = 0; i < 4; i = i + 1) begin\n\
               end\n\
             endgenerate\n\
             endmodule",
        );
        // i is never declared: initializer target, condition use, and
        // incrementor target plus its right-hand side all warn.
        assert_eq!(diags.len(), 4);
        assert!(diags.iter().all(|d| d.message == "Unknown variable: i"));
    }

    #[test]
    fn test_defparam_introduces_instance_name() {
        let diags = diagnose(
            "module m;\n\
             defparam u0.WIDTH = 8;\n\
             assign u0 = 0;\n\
             endmodule",
        );
        // u0 is added to the scope by the defparam; WIDTH is part of the
        // dotted path and never looked up.
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn test_nested_define_extends_scope() {
        let diags = diagnose(
            "module m;\n\
             `define LOCAL 1\n\
             assign LOCAL = 0;\n\
             endmodule",
        );
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
    }

    #[test]
    fn test_selector_expressions_are_checked() {
        let diags = diagnose("module m; reg y; assign y = y[idx]; endmodule");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unknown variable: idx");
    }

    #[test]
    fn test_case_arms_and_default_are_checked() {
        let diags = diagnose(
            "module m(s);\n\
             always @(s) case (s)\n\
               k: y = 0;\n\
               default: z = 1;\n\
             endcase\n\
             endmodule",
        );
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Unknown variable: k",
                "Unknown variable: y",
                "Unknown variable: z",
            ]
        );
    }

    #[test]
    fn test_diagnostic_range_matches_token() {
        let diags = diagnose("module m; assign y = x; endmodule");
        let x = diags
            .iter()
            .find(|d| d.message.ends_with(": x"))
            .expect("diagnostic for x");
        assert_eq!(x.range.start.line, 0);
        assert_eq!(x.range.start.character, 21);
        assert_eq!(x.range.end.character, 22);
    }
}
