//! Recursive-descent parser for the Verilog subset.
//!
//! Every grammar rule is a function `(tokens, pos) -> Result<(node, new_pos)>`
//! with no state besides the positional cursor; a failed speculative try
//! leaves the caller's cursor untouched. The only shared state is the
//! farthest-error slot: each failure records its position, and when the
//! top-level rule gives up it returns the error that made it deepest into
//! the token stream.

pub mod error;

pub use error::ParseError;

use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use error::FarthestError;

type ParseResult<T> = Result<(T, usize), ParseError>;

/// Parser over a lexed token stream. Create one per parse; the farthest-error
/// slot is reset by [`Parser::parse_file`].
pub struct Parser {
    farthest: FarthestError,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            farthest: FarthestError::default(),
        }
    }

    /// Position of the farthest error recorded during the last parse, if any.
    pub fn farthest_position(&self) -> Option<usize> {
        self.farthest.position()
    }

    /// Parse a whole file, returning the farthest error on failure.
    pub fn parse_file(&mut self, tokens: &[Token]) -> Result<FileNode, ParseError> {
        self.farthest.clear();
        let mut file = FileNode::default();
        let mut pos = 0;

        while !self.is_eof(tokens, pos) {
            if let Ok((directive, new_pos)) = self.parse_directive(tokens, pos) {
                file.statements
                    .push(TopLevelStatement::Directive(directive));
                pos = new_pos;
            } else {
                match self.parse_module(tokens, pos) {
                    Ok((module, new_pos)) => {
                        file.statements.push(TopLevelStatement::Module(module));
                        pos = new_pos;
                    }
                    Err(err) => return Err(self.farthest.error().unwrap_or(err)),
                }
            }
        }

        Ok(file)
    }

    // ==================== CURSOR HELPERS ====================

    fn skip(&self, tokens: &[Token], pos: usize) -> usize {
        let mut pos = pos;
        while pos < tokens.len() && tokens[pos].kind.is_skippable() {
            pos += 1;
        }
        pos
    }

    fn is_eof(&self, tokens: &[Token], pos: usize) -> bool {
        self.skip(tokens, pos) >= tokens.len()
    }

    fn error_from(
        &mut self,
        from: &'static str,
        expected: &[TokenKind],
        tokens: &[Token],
        pos: usize,
    ) -> ParseError {
        let err = ParseError {
            from,
            expected: expected.to_vec(),
            got: tokens.get(pos).cloned(),
            pos,
        };
        self.farthest.observe(&err);
        err
    }

    /// Skip skippables, then require one of `expected` at the cursor.
    /// Returns the position of the matched token itself.
    fn check(
        &mut self,
        from: &'static str,
        expected: &[TokenKind],
        tokens: &[Token],
        pos: usize,
    ) -> Result<usize, ParseError> {
        let pos = self.skip(tokens, pos);
        if pos >= tokens.len() {
            return Err(self.error_from(from, expected, tokens, tokens.len()));
        }
        if expected.contains(&tokens[pos].kind) {
            Ok(pos)
        } else {
            Err(self.error_from(from, expected, tokens, pos))
        }
    }

    // ==================== EXPRESSIONS ====================

    /// `range := LBRACKET expr COLON expr RBRACKET`
    fn parse_range(&mut self, tokens: &[Token], pos: usize) -> ParseResult<RangeNode> {
        let p = self.check("range node", &[TokenKind::LBracket], tokens, pos)?;
        let (from, p) = self.parse_expression(tokens, p + 1)?;
        let p = self.check("range node", &[TokenKind::Colon], tokens, p)?;
        let (to, p) = self.parse_expression(tokens, p + 1)?;
        let p = self.check("range node", &[TokenKind::RBracket], tokens, p)?;
        Ok((RangeNode { from, to }, p + 1))
    }

    /// `index := LBRACKET expr RBRACKET`
    fn parse_index(&mut self, tokens: &[Token], pos: usize) -> ParseResult<IndexNode> {
        let p = self.check("index node", &[TokenKind::LBracket], tokens, pos)?;
        let (index, p) = self.parse_expression(tokens, p + 1)?;
        let p = self.check("index node", &[TokenKind::RBracket], tokens, p)?;
        Ok((IndexNode { index }, p + 1))
    }

    /// `selector := LBRACKET expr [COLON expr] RBRACKET`
    fn parse_selector(&mut self, tokens: &[Token], pos: usize) -> ParseResult<Selector> {
        let p = self.check("selector node", &[TokenKind::LBracket], tokens, pos)?;
        let (first, mut pos) = self.parse_expression(tokens, p + 1)?;

        let selector = if let Ok(p) = self.check("selector node", &[TokenKind::Colon], tokens, pos)
        {
            let (second, new_pos) = self.parse_expression(tokens, p + 1)?;
            pos = new_pos;
            Selector::Range(RangeNode {
                from: first,
                to: second,
            })
        } else {
            Selector::Index(IndexNode { index: first })
        };

        let p = self.check("selector node", &[TokenKind::RBracket], tokens, pos)?;
        Ok((selector, p + 1))
    }

    /// The brace-concatenation arm of `sized_value`, with its optional size.
    fn parse_concat(&mut self, tokens: &[Token], pos: usize) -> ParseResult<SizedValueNode> {
        let mut pos = pos;
        let mut size = None;
        if let Ok(p) = self.check(
            "sized value",
            &[TokenKind::Literal, TokenKind::Identifier],
            tokens,
            pos,
        ) {
            size = Some(tokens[p].clone());
            pos = p + 1;
        }

        let p = self.check("sized value", &[TokenKind::LCurl], tokens, pos)?;
        let (first, new_pos) = self.parse_sized_value(tokens, p + 1)?;
        let mut values = vec![first];
        pos = new_pos;

        while let Ok(p) = self.check("sized value", &[TokenKind::Comma], tokens, pos) {
            let (next, new_pos) = self.parse_sized_value(tokens, p + 1)?;
            values.push(next);
            pos = new_pos;
        }

        let p = self.check("sized value", &[TokenKind::RCurl], tokens, pos)?;
        Ok((
            SizedValueNode {
                size,
                value: SizedValue::Concat(values),
            },
            p + 1,
        ))
    }

    /// `sized_value := [LITERAL|IDENT] LCURL sized_value {COMMA sized_value} RCURL | value`
    fn parse_sized_value(&mut self, tokens: &[Token], pos: usize) -> ParseResult<SizedValueNode> {
        if let Ok(result) = self.parse_concat(tokens, pos) {
            return Ok(result);
        }
        let (value, pos) = self.parse_value(tokens, pos)?;
        Ok((
            SizedValueNode {
                size: None,
                value: SizedValue::Single(value),
            },
            pos,
        ))
    }

    /// `maybe_signed := SIGNED LPAREN sized_value RPAREN | sized_value`
    fn parse_signed(&mut self, tokens: &[Token], pos: usize) -> ParseResult<SizedValueNode> {
        if let Ok(p) = self.check("signed", &[TokenKind::Signed], tokens, pos) {
            let p = self.check("signed", &[TokenKind::LParen], tokens, p + 1)?;
            let (value, p) = self.parse_sized_value(tokens, p + 1)?;
            let p = self.check("signed", &[TokenKind::RParen], tokens, p)?;
            return Ok((value, p + 1));
        }
        self.parse_sized_value(tokens, pos)
    }

    /// `value := [TILDE | "-"] (LITERAL | FUNCLITERAL | IDENT {DOT IDENT}) {selector}`
    fn parse_value(&mut self, tokens: &[Token], pos: usize) -> ParseResult<ValueNode> {
        let mut pos = pos;
        let mut unary = None;
        if let Ok(p) = self.check(
            "value node",
            &[TokenKind::Tilde, TokenKind::Operator],
            tokens,
            pos,
        ) {
            // A bare value admits at most one unary prefix, and the only
            // operator allowed in that role is minus.
            if tokens[p].kind == TokenKind::Operator && tokens[p].value != "-" {
                return Err(self.error_from("value node", &[TokenKind::Tilde], tokens, p));
            }
            unary = Some(if tokens[p].kind == TokenKind::Tilde {
                UnaryPrefix::Not
            } else {
                UnaryPrefix::Minus
            });
            pos = p + 1;
        }

        let p = self.check(
            "value node",
            &[
                TokenKind::Identifier,
                TokenKind::Literal,
                TokenKind::FuncLiteral,
            ],
            tokens,
            pos,
        )?;
        let mut path = vec![tokens[p].clone()];
        let is_identifier = tokens[p].kind == TokenKind::Identifier;
        pos = p + 1;

        if is_identifier {
            while let Ok(dot) = self.check("value node", &[TokenKind::Dot], tokens, pos) {
                let p = self.check("value node", &[TokenKind::Identifier], tokens, dot + 1)?;
                path.push(tokens[p].clone());
                pos = p + 1;
            }
        }

        let mut selectors = Vec::new();
        while let Ok((selector, new_pos)) = self.parse_selector(tokens, pos) {
            selectors.push(selector);
            pos = new_pos;
        }

        Ok((
            ValueNode {
                unary,
                path,
                selectors,
            },
            pos,
        ))
    }

    /// `expr := (primary | LPAREN expr RPAREN) [(OPERATOR|COMPARATOR) expr]
    ///          [QUESTION expr COLON expr]`
    ///
    /// Right-associative and flat; no precedence. Source grouping survives in
    /// the parenthesised primary.
    fn parse_expression(&mut self, tokens: &[Token], pos: usize) -> ParseResult<ExprNode> {
        let mut pos = pos;
        let primary = if let Ok(p) = self.check("expression", &[TokenKind::LParen], tokens, pos) {
            let (inner, new_pos) = self.parse_expression(tokens, p + 1)?;
            let p = self.check("expression", &[TokenKind::RParen], tokens, new_pos)?;
            pos = p + 1;
            ExprPrimary::Paren(Box::new(inner))
        } else {
            let (value, new_pos) = self.parse_signed(tokens, pos)?;
            pos = new_pos;
            ExprPrimary::Value(value)
        };

        let mut result = ExprNode {
            primary,
            combinator: None,
            right: None,
            expr_true: None,
            expr_false: None,
        };

        if let Ok(p) = self.check(
            "expression",
            &[TokenKind::Operator, TokenKind::Comparator],
            tokens,
            pos,
        ) {
            result.combinator = Some(tokens[p].clone());
            let (right, new_pos) = self.parse_expression(tokens, p + 1)?;
            result.right = Some(Box::new(right));
            pos = new_pos;
        }

        if let Ok(p) = self.check("expression", &[TokenKind::Question], tokens, pos) {
            let (expr_true, new_pos) = self.parse_expression(tokens, p + 1)?;
            let p = self.check("expression", &[TokenKind::Colon], tokens, new_pos)?;
            let (expr_false, new_pos) = self.parse_expression(tokens, p + 1)?;
            result.expr_true = Some(Box::new(expr_true));
            result.expr_false = Some(Box::new(expr_false));
            pos = new_pos;
        }

        Ok((result, pos))
    }

    // ==================== MODULE INTERIOR ====================

    /// `argument := DOT IDENT LPAREN [expr] RPAREN | expr`
    fn parse_argument(&mut self, tokens: &[Token], pos: usize) -> ParseResult<ArgumentNode> {
        if let Ok(p) = self.check("argument", &[TokenKind::Dot], tokens, pos) {
            let p = self.check("argument", &[TokenKind::Identifier], tokens, p + 1)?;
            let label = tokens[p].clone();
            let p = self.check("argument", &[TokenKind::LParen], tokens, p + 1)?;
            let mut pos = p + 1;

            // A named port may be left unconnected: `.clk()`.
            let mut value = None;
            if let Ok((expr, new_pos)) = self.parse_expression(tokens, pos) {
                value = Some(expr);
                pos = new_pos;
            }

            let p = self.check("argument", &[TokenKind::RParen], tokens, pos)?;
            return Ok((
                ArgumentNode {
                    label: Some(label),
                    value,
                },
                p + 1,
            ));
        }

        let (expr, pos) = self.parse_expression(tokens, pos)?;
        Ok((
            ArgumentNode {
                label: None,
                value: Some(expr),
            },
            pos,
        ))
    }

    /// `arguments := [argument {COMMA argument}]`
    fn parse_arguments(&mut self, tokens: &[Token], pos: usize) -> ParseResult<Vec<ArgumentNode>> {
        let mut result = Vec::new();
        let mut pos = pos;

        if let Ok((argument, new_pos)) = self.parse_argument(tokens, pos) {
            result.push(argument);
            pos = new_pos;
        }

        while let Ok(p) = self.check("arguments", &[TokenKind::Comma], tokens, pos) {
            match self.parse_argument(tokens, p + 1) {
                Ok((argument, new_pos)) => {
                    result.push(argument);
                    pos = new_pos;
                }
                // Malformed trailing argument; leave it to the caller's
                // closing-paren check.
                Err(_) => break,
            }
        }

        Ok((result, pos))
    }

    /// `module_application := IDENT [IDENT] [range] LPAREN arguments RPAREN SEMI`
    fn parse_module_application(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<ModuleApplicationNode> {
        let p = self.check("module application", &[TokenKind::Identifier], tokens, pos)?;
        let module_name = tokens[p].clone();
        let mut pos = p + 1;

        let mut instance_name = None;
        if let Ok(p) = self.check("module application", &[TokenKind::Identifier], tokens, pos) {
            instance_name = Some(tokens[p].clone());
            pos = p + 1;
        }

        let mut range = None;
        if let Ok((node, new_pos)) = self.parse_range(tokens, pos) {
            range = Some(node);
            pos = new_pos;
        }

        let p = self.check("module application", &[TokenKind::LParen], tokens, pos)?;
        let (arguments, new_pos) = self.parse_arguments(tokens, p + 1)?;
        let p = self.check("module application", &[TokenKind::RParen], tokens, new_pos)?;
        let p = self.check("module application", &[TokenKind::Semicolon], tokens, p + 1)?;

        Ok((
            ModuleApplicationNode {
                module_name,
                instance_name,
                range,
                arguments,
            },
            p + 1,
        ))
    }

    /// `variable := IDENT {range}`
    fn parse_variable(&mut self, tokens: &[Token], pos: usize) -> ParseResult<VariableNode> {
        let p = self.check("variable", &[TokenKind::Identifier], tokens, pos)?;
        let identifier = tokens[p].clone();
        let mut pos = p + 1;

        let mut ranges = Vec::new();
        while let Ok((range, new_pos)) = self.parse_range(tokens, pos) {
            ranges.push(range);
            pos = new_pos;
        }

        Ok((VariableNode { identifier, ranges }, pos))
    }

    /// `assignment_nosemi := [ASSIGN] IDENT [index] (EQUAL | "<=") expr`
    fn parse_assignment_nosemi(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<AssignmentNode> {
        let mut pos = pos;
        let mut is_continuous = false;
        if let Ok(p) = self.check("assignment", &[TokenKind::Assign], tokens, pos) {
            is_continuous = true;
            pos = p + 1;
        }

        let p = self.check("assignment", &[TokenKind::Identifier], tokens, pos)?;
        let identifier = tokens[p].clone();
        pos = p + 1;

        let mut index = None;
        if let Ok((node, new_pos)) = self.parse_index(tokens, pos) {
            index = Some(node);
            pos = new_pos;
        }

        let p = self.check(
            "assignment",
            &[TokenKind::Equal, TokenKind::Comparator],
            tokens,
            pos,
        )?;
        let mut is_nonblocking = false;
        if tokens[p].kind == TokenKind::Comparator {
            // `<=` doubles as the nonblocking assignment operator; any other
            // comparator here is a hard error.
            if tokens[p].value != "<=" {
                return Err(self.error_from("assignment", &[TokenKind::Equal], tokens, p));
            }
            is_nonblocking = true;
        }

        let (value, pos) = self.parse_expression(tokens, p + 1)?;
        Ok((
            AssignmentNode {
                identifier,
                index,
                value,
                is_continuous,
                is_nonblocking,
            },
            pos,
        ))
    }

    /// `assignment := assignment_nosemi SEMI`
    fn parse_assignment(&mut self, tokens: &[Token], pos: usize) -> ParseResult<AssignmentNode> {
        let (assignment, pos) = self.parse_assignment_nosemi(tokens, pos)?;
        let p = self.check("assignment", &[TokenKind::Semicolon], tokens, pos)?;
        Ok((assignment, p + 1))
    }

    /// `type := (TYPE | DIRECTION [TYPE]) {range}`
    fn parse_type(&mut self, tokens: &[Token], pos: usize) -> ParseResult<TypeNode> {
        let p = self.check(
            "type",
            &[TokenKind::Type, TokenKind::Direction],
            tokens,
            pos,
        )?;
        let (keyword, mut pos) = if tokens[p].kind == TokenKind::Direction {
            if let Ok(p2) = self.check("type", &[TokenKind::Type], tokens, p + 1) {
                (tokens[p2].clone(), p2 + 1)
            } else {
                (tokens[p].clone(), p + 1)
            }
        } else {
            (tokens[p].clone(), p + 1)
        };

        let mut ranges = Vec::new();
        while let Ok((range, new_pos)) = self.parse_range(tokens, pos) {
            ranges.push(range);
            pos = new_pos;
        }

        Ok((TypeNode { keyword, ranges }, pos))
    }

    /// `declaration := type variable (EQUAL expr {COMMA variable EQUAL expr}
    ///                               | {COMMA variable}) SEMI`
    fn parse_declaration(&mut self, tokens: &[Token], pos: usize) -> ParseResult<DeclarationNode> {
        let (ty, pos) = self.parse_type(tokens, pos)?;
        let (first, mut pos) = self.parse_variable(tokens, pos)?;
        let mut variables = vec![first];
        let mut values = Vec::new();

        if let Ok(p) = self.check("declaration", &[TokenKind::Equal], tokens, pos) {
            let (value, new_pos) = self.parse_expression(tokens, p + 1)?;
            values.push(value);
            pos = new_pos;

            // Once one variable is initialized, every further one must be.
            while let Ok(p) = self.check("declaration", &[TokenKind::Comma], tokens, pos) {
                let (variable, new_pos) = self.parse_variable(tokens, p + 1)?;
                variables.push(variable);
                let p = self.check("declaration", &[TokenKind::Equal], tokens, new_pos)?;
                let (value, new_pos) = self.parse_expression(tokens, p + 1)?;
                values.push(value);
                pos = new_pos;
            }
        } else {
            while let Ok(p) = self.check("declaration", &[TokenKind::Comma], tokens, pos) {
                let (variable, new_pos) = self.parse_variable(tokens, p + 1)?;
                variables.push(variable);
                pos = new_pos;
            }
        }

        let p = self.check("declaration", &[TokenKind::Semicolon], tokens, pos)?;
        Ok((
            DeclarationNode {
                ty,
                variables,
                values,
            },
            p + 1,
        ))
    }

    // ==================== ALWAYS-STATEMENTS ====================

    /// `begin_block := BEGIN [COLON IDENT] {always_stmt} END`
    fn parse_begin_block(&mut self, tokens: &[Token], pos: usize) -> ParseResult<BeginBlockNode> {
        let p = self.check("begin block", &[TokenKind::Begin], tokens, pos)?;
        let mut pos = p + 1;

        let mut label = None;
        if let Ok(p) = self.check("begin block", &[TokenKind::Colon], tokens, pos) {
            let p = self.check("begin block", &[TokenKind::Identifier], tokens, p + 1)?;
            label = Some(tokens[p].clone());
            pos = p + 1;
        }

        let (statements, new_pos) = self.parse_always_statements(tokens, pos)?;
        let p = self.check("begin block", &[TokenKind::End], tokens, new_pos)?;
        Ok((BeginBlockNode { label, statements }, p + 1))
    }

    /// `if := IF LPAREN expr RPAREN always_stmt [ELSE always_stmt]`
    fn parse_if_block(&mut self, tokens: &[Token], pos: usize) -> ParseResult<IfBlockNode> {
        let p = self.check("if block", &[TokenKind::If], tokens, pos)?;
        let p = self.check("if block", &[TokenKind::LParen], tokens, p + 1)?;
        let (condition, new_pos) = self.parse_expression(tokens, p + 1)?;
        let p = self.check("if block", &[TokenKind::RParen], tokens, new_pos)?;
        let (body, mut pos) = self.parse_always_statement(tokens, p + 1)?;

        let mut else_body = None;
        if let Ok(p) = self.check("if block", &[TokenKind::Else], tokens, pos) {
            let (stmt, new_pos) = self.parse_always_statement(tokens, p + 1)?;
            else_body = Some(stmt);
            pos = new_pos;
        }

        Ok((
            IfBlockNode {
                condition,
                body,
                else_body,
            },
            pos,
        ))
    }

    /// `for := FOR LPAREN [assignment_nosemi] SEMI [expr] SEMI
    ///         [assignment_nosemi] RPAREN always_stmt`
    fn parse_for_block(&mut self, tokens: &[Token], pos: usize) -> ParseResult<ForBlockNode> {
        let p = self.check("for block", &[TokenKind::For], tokens, pos)?;
        let p = self.check("for block", &[TokenKind::LParen], tokens, p + 1)?;
        let mut pos = p + 1;

        let mut initializer = None;
        if let Ok((assignment, new_pos)) = self.parse_assignment_nosemi(tokens, pos) {
            initializer = Some(assignment);
            pos = new_pos;
        }
        let p = self.check("for block", &[TokenKind::Semicolon], tokens, pos)?;
        pos = p + 1;

        let mut condition = None;
        if let Ok((expr, new_pos)) = self.parse_expression(tokens, pos) {
            condition = Some(expr);
            pos = new_pos;
        }
        let p = self.check("for block", &[TokenKind::Semicolon], tokens, pos)?;
        pos = p + 1;

        let mut incrementor = None;
        if let Ok((assignment, new_pos)) = self.parse_assignment_nosemi(tokens, pos) {
            incrementor = Some(assignment);
            pos = new_pos;
        }

        let p = self.check("for block", &[TokenKind::RParen], tokens, pos)?;
        let (body, pos) = self.parse_always_statement(tokens, p + 1)?;
        Ok((
            ForBlockNode {
                initializer,
                condition,
                incrementor,
                body,
            },
            pos,
        ))
    }

    /// `case_arm := expr {COMMA expr} COLON always_stmt`
    fn parse_case_arm(&mut self, tokens: &[Token], pos: usize) -> ParseResult<CaseNode> {
        let (first, mut pos) = self.parse_expression(tokens, pos)?;
        let mut conditions = vec![first];

        while let Ok(p) = self.check("case", &[TokenKind::Comma], tokens, pos) {
            let (expr, new_pos) = self.parse_expression(tokens, p + 1)?;
            conditions.push(expr);
            pos = new_pos;
        }

        let p = self.check("case", &[TokenKind::Colon], tokens, pos)?;
        let (statement, pos) = self.parse_always_statement(tokens, p + 1)?;
        Ok((
            CaseNode {
                conditions,
                statement,
            },
            pos,
        ))
    }

    /// `case_block := CASE LPAREN expr RPAREN {case_arm}
    ///                [DEFAULT COLON always_stmt] ENDCASE`
    fn parse_case_block(&mut self, tokens: &[Token], pos: usize) -> ParseResult<CaseBlock> {
        let p = self.check("case block", &[TokenKind::Case], tokens, pos)?;
        let p = self.check("case block", &[TokenKind::LParen], tokens, p + 1)?;
        let (scrutinee, new_pos) = self.parse_expression(tokens, p + 1)?;
        let p = self.check("case block", &[TokenKind::RParen], tokens, new_pos)?;
        let mut pos = p + 1;

        let mut cases = Vec::new();
        while let Ok((arm, new_pos)) = self.parse_case_arm(tokens, pos) {
            cases.push(arm);
            pos = new_pos;
        }

        let mut default = None;
        if let Ok(p) = self.check("case block", &[TokenKind::Default], tokens, pos) {
            let p = self.check("case block", &[TokenKind::Colon], tokens, p + 1)?;
            let (statement, new_pos) = self.parse_always_statement(tokens, p + 1)?;
            default = Some(statement);
            pos = new_pos;
        }

        let p = self.check("case block", &[TokenKind::Endcase], tokens, pos)?;
        Ok((
            CaseBlock {
                scrutinee,
                cases,
                default,
            },
            p + 1,
        ))
    }

    /// `always_stmt := begin_block | interior | for | if | sysfunc | delay
    ///               | case_block`
    fn parse_always_statement(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<AlwaysStatement> {
        if let Ok((block, p)) = self.parse_begin_block(tokens, pos) {
            return Ok((AlwaysStatement::Begin(block), p));
        }
        if let Ok((interior, p)) = self.parse_interior_statement(tokens, pos) {
            return Ok((AlwaysStatement::Interior(Box::new(interior)), p));
        }
        if let Ok((block, p)) = self.parse_for_block(tokens, pos) {
            return Ok((AlwaysStatement::For(Box::new(block)), p));
        }
        if let Ok((block, p)) = self.parse_if_block(tokens, pos) {
            return Ok((AlwaysStatement::If(Box::new(block)), p));
        }
        if let Ok((call, p)) = self.parse_system_call(tokens, pos) {
            return Ok((AlwaysStatement::SystemCall(call), p));
        }
        if let Ok((delay, p)) = self.parse_delay(tokens, pos) {
            return Ok((AlwaysStatement::Delay(delay), p));
        }
        let (case, p) = self.parse_case_block(tokens, pos)?;
        Ok((AlwaysStatement::Case(Box::new(case)), p))
    }

    fn parse_always_statements(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<Vec<AlwaysStatement>> {
        let mut result = Vec::new();
        let mut pos = pos;
        while let Ok((statement, new_pos)) = self.parse_always_statement(tokens, pos) {
            result.push(statement);
            pos = new_pos;
        }
        Ok((result, pos))
    }

    /// `generate := GENERATE {always_stmt} ENDGENERATE`
    fn parse_generate(&mut self, tokens: &[Token], pos: usize) -> ParseResult<GenerateNode> {
        let p = self.check("generate", &[TokenKind::Generate], tokens, pos)?;
        let (statements, new_pos) = self.parse_always_statements(tokens, p + 1)?;
        let p = self.check("generate", &[TokenKind::Endgenerate], tokens, new_pos)?;
        Ok((GenerateNode { statements }, p + 1))
    }

    /// `time := [TIME_EDGE] IDENT`
    fn parse_time(&mut self, tokens: &[Token], pos: usize) -> ParseResult<TimeNode> {
        let mut pos = pos;
        let mut edge = None;
        if let Ok(p) = self.check("time", &[TokenKind::Time], tokens, pos) {
            edge = Some(tokens[p].clone());
            pos = p + 1;
        }

        let p = self.check("time", &[TokenKind::Identifier], tokens, pos)?;
        Ok((
            TimeNode {
                edge,
                identifier: tokens[p].clone(),
            },
            p + 1,
        ))
    }

    /// `event := time {"or" time}`
    fn parse_event(&mut self, tokens: &[Token], pos: usize) -> ParseResult<Vec<TimeNode>> {
        let (first, mut pos) = self.parse_time(tokens, pos)?;
        let mut times = vec![first];

        while let Ok(p) = self.check("event", &[TokenKind::Identifier], tokens, pos) {
            // "or" is lexically an ordinary identifier.
            if tokens[p].value != "or" {
                return Err(self.error_from("event", &[TokenKind::Identifier], tokens, p));
            }
            let (time, new_pos) = self.parse_time(tokens, p + 1)?;
            times.push(time);
            pos = new_pos;
        }

        Ok((times, pos))
    }

    /// `delay := POUND (LITERAL | IDENT)`
    fn parse_delay(&mut self, tokens: &[Token], pos: usize) -> ParseResult<DelayNode> {
        let p = self.check("delay", &[TokenKind::Pound], tokens, pos)?;
        let p = self.check(
            "delay",
            &[TokenKind::Literal, TokenKind::Identifier],
            tokens,
            p + 1,
        )?;
        Ok((
            DelayNode {
                amount: tokens[p].clone(),
            },
            p + 1,
        ))
    }

    /// `always := ALWAYS [AT LPAREN event RPAREN] always_stmt`
    fn parse_always(&mut self, tokens: &[Token], pos: usize) -> ParseResult<AlwaysNode> {
        let p = self.check("always", &[TokenKind::Always], tokens, pos)?;
        let mut pos = p + 1;

        let mut times = Vec::new();
        if let Ok(p) = self.check("always", &[TokenKind::At], tokens, pos) {
            let p = self.check("always", &[TokenKind::LParen], tokens, p + 1)?;
            let (event, new_pos) = self.parse_event(tokens, p + 1)?;
            times = event;
            let p = self.check("always", &[TokenKind::RParen], tokens, new_pos)?;
            pos = p + 1;
        }

        let (statement, pos) = self.parse_always_statement(tokens, pos)?;
        Ok((AlwaysNode { times, statement }, pos))
    }

    /// `sysfunc := DOLLAR IDENT [LPAREN expr {COMMA expr} RPAREN] SEMI`
    fn parse_system_call(&mut self, tokens: &[Token], pos: usize) -> ParseResult<SystemCallNode> {
        let p = self.check("system call", &[TokenKind::Dollar], tokens, pos)?;
        let p = self.check("system call", &[TokenKind::Identifier], tokens, p + 1)?;
        let function = tokens[p].clone();
        let mut pos = p + 1;

        let mut arguments = Vec::new();
        if let Ok(p) = self.check("system call", &[TokenKind::LParen], tokens, pos) {
            let (expr, new_pos) = self.parse_expression(tokens, p + 1)?;
            arguments.push(expr);
            pos = new_pos;

            while let Ok(p) = self.check("system call", &[TokenKind::Comma], tokens, pos) {
                let (expr, new_pos) = self.parse_expression(tokens, p + 1)?;
                arguments.push(expr);
                pos = new_pos;
            }

            let p = self.check("system call", &[TokenKind::RParen], tokens, pos)?;
            pos = p + 1;
        }

        let p = self.check("system call", &[TokenKind::Semicolon], tokens, pos)?;
        Ok((
            SystemCallNode {
                function,
                arguments,
            },
            p + 1,
        ))
    }

    /// `defparam := DEFPARAM IDENT {DOT IDENT} EQUAL expr SEMI`
    fn parse_defparam(&mut self, tokens: &[Token], pos: usize) -> ParseResult<DefParamNode> {
        let p = self.check("def param", &[TokenKind::Defparam], tokens, pos)?;
        let p = self.check("def param", &[TokenKind::Identifier], tokens, p + 1)?;
        let mut identifiers = vec![tokens[p].clone()];
        let mut pos = p + 1;

        while let Ok(dot) = self.check("def param", &[TokenKind::Dot], tokens, pos) {
            let p = self.check("def param", &[TokenKind::Identifier], tokens, dot + 1)?;
            identifiers.push(tokens[p].clone());
            pos = p + 1;
        }

        let p = self.check("def param", &[TokenKind::Equal], tokens, pos)?;
        let (value, new_pos) = self.parse_expression(tokens, p + 1)?;
        let p = self.check("def param", &[TokenKind::Semicolon], tokens, new_pos)?;
        Ok((DefParamNode { identifiers, value }, p + 1))
    }

    /// `initial := INITIAL always_stmt`
    fn parse_initial(&mut self, tokens: &[Token], pos: usize) -> ParseResult<InitialNode> {
        let p = self.check("initial", &[TokenKind::Initial], tokens, pos)?;
        let (statement, pos) = self.parse_always_statement(tokens, p + 1)?;
        Ok((InitialNode { statement }, pos))
    }

    /// Interior-statement alternation. The order is authoritative: several
    /// productions share an identifier prefix.
    fn parse_interior_statement(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<InteriorNode> {
        if let Ok((node, p)) = self.parse_declaration(tokens, pos) {
            return Ok((InteriorNode::Declaration(node), p));
        }
        if let Ok((node, p)) = self.parse_module_application(tokens, pos) {
            return Ok((InteriorNode::ModuleApplication(node), p));
        }
        if let Ok((node, p)) = self.parse_assignment(tokens, pos) {
            return Ok((InteriorNode::Assignment(node), p));
        }
        if let Ok((node, p)) = self.parse_generate(tokens, pos) {
            return Ok((InteriorNode::Generate(node), p));
        }
        if let Ok((node, p)) = self.parse_always(tokens, pos) {
            return Ok((InteriorNode::Always(node), p));
        }
        if let Ok((node, p)) = self.parse_defparam(tokens, pos) {
            return Ok((InteriorNode::DefParam(node), p));
        }
        if let Ok((node, p)) = self.parse_initial(tokens, pos) {
            return Ok((InteriorNode::Initial(node), p));
        }
        if let Ok((node, p)) = self.parse_directive(tokens, pos) {
            return Ok((InteriorNode::Directive(node), p));
        }
        let (node, p) = self.parse_task(tokens, pos)?;
        Ok((InteriorNode::Task(node), p))
    }

    /// Zero or more interior statements; stops at the first token no
    /// production can explain (the caller's ENDMODULE check reports it).
    fn parse_module_interior(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<Vec<InteriorNode>> {
        let mut result = Vec::new();
        let mut pos = pos;
        while let Ok((statement, new_pos)) = self.parse_interior_statement(tokens, pos) {
            result.push(statement);
            pos = new_pos;
        }
        Ok((result, pos))
    }

    fn parse_task_interior(
        &mut self,
        tokens: &[Token],
        pos: usize,
    ) -> ParseResult<Vec<TaskStatement>> {
        let mut result = Vec::new();
        let mut pos = pos;
        loop {
            if let Ok((statement, new_pos)) = self.parse_interior_statement(tokens, pos) {
                result.push(TaskStatement::Interior(statement));
                pos = new_pos;
            } else if let Ok((block, new_pos)) = self.parse_begin_block(tokens, pos) {
                result.push(TaskStatement::Begin(block));
                pos = new_pos;
            } else {
                return Ok((result, pos));
            }
        }
    }

    /// `task := TASK IDENT SEMI {interior | begin_block} ENDTASK [SEMI]`
    fn parse_task(&mut self, tokens: &[Token], pos: usize) -> ParseResult<TaskNode> {
        let p = self.check("task", &[TokenKind::Task], tokens, pos)?;
        let p = self.check("task", &[TokenKind::Identifier], tokens, p + 1)?;
        let identifier = tokens[p].clone();
        let p = self.check("task", &[TokenKind::Semicolon], tokens, p + 1)?;
        let (statements, new_pos) = self.parse_task_interior(tokens, p + 1)?;
        let p = self.check("task", &[TokenKind::Endtask], tokens, new_pos)?;
        let mut pos = p + 1;
        if let Ok(p) = self.check("task", &[TokenKind::Semicolon], tokens, pos) {
            pos = p + 1;
        }
        Ok((
            TaskNode {
                identifier,
                statements,
            },
            pos,
        ))
    }

    // ==================== MODULE DEFINITION ====================

    /// `ports := IDENT {COMMA IDENT}`
    fn parse_ports(&mut self, tokens: &[Token], pos: usize) -> ParseResult<Vec<Token>> {
        let p = self.check("ports", &[TokenKind::Identifier], tokens, pos)?;
        let mut ports = vec![tokens[p].clone()];
        let mut pos = p + 1;

        while let Ok(comma) = self.check("ports", &[TokenKind::Comma], tokens, pos) {
            let p = self.check("ports", &[TokenKind::Identifier], tokens, comma + 1)?;
            ports.push(tokens[p].clone());
            pos = p + 1;
        }

        Ok((ports, pos))
    }

    /// `port_list := LPAREN [ports] RPAREN`
    fn parse_port_list(&mut self, tokens: &[Token], pos: usize) -> ParseResult<Vec<Token>> {
        let p = self.check("port list", &[TokenKind::LParen], tokens, pos)?;
        let mut pos = p + 1;

        let mut ports = Vec::new();
        if let Ok((list, new_pos)) = self.parse_ports(tokens, pos) {
            ports = list;
            pos = new_pos;
        }

        let p = self.check("port list", &[TokenKind::RParen], tokens, pos)?;
        Ok((ports, p + 1))
    }

    /// `module := MODULE IDENT [port_list] SEMI {interior} ENDMODULE [SEMI]`
    fn parse_module(&mut self, tokens: &[Token], pos: usize) -> ParseResult<ModuleNode> {
        let p = self.check("module", &[TokenKind::Module], tokens, pos)?;
        let p = self.check("module", &[TokenKind::Identifier], tokens, p + 1)?;
        let identifier = tokens[p].clone();
        let mut pos = p + 1;

        let mut ports = Vec::new();
        if let Ok((list, new_pos)) = self.parse_port_list(tokens, pos) {
            ports = list;
            pos = new_pos;
        }

        let p = self.check("module", &[TokenKind::Semicolon], tokens, pos)?;
        let (interior, new_pos) = self.parse_module_interior(tokens, p + 1)?;
        let p = self.check("module", &[TokenKind::Endmodule], tokens, new_pos)?;
        pos = p + 1;

        if let Ok(p) = self.check("module", &[TokenKind::Semicolon], tokens, pos) {
            pos = p + 1;
        }

        Ok((
            ModuleNode {
                identifier,
                ports,
                interior,
            },
            pos,
        ))
    }

    // ==================== DIRECTIVES ====================

    /// `define := DEFINE IDENT ... NEWLINE` — the body text is discarded.
    fn parse_define(&mut self, tokens: &[Token], pos: usize) -> ParseResult<DefineNode> {
        let p = self.check("define", &[TokenKind::Define], tokens, pos)?;
        let p = self.check("define", &[TokenKind::Identifier], tokens, p + 1)?;
        let define = DefineNode {
            identifier: tokens[p].clone(),
        };

        let mut pos = p + 1;
        while pos < tokens.len() && tokens[pos].kind != TokenKind::Newline {
            pos += 1;
        }
        Ok((define, pos))
    }

    /// `timescale := TIMESCALE ... NEWLINE` — parsed and discarded.
    fn skip_timescale(&mut self, tokens: &[Token], pos: usize) -> Result<usize, ParseError> {
        let p = self.check("timescale", &[TokenKind::Timescale], tokens, pos)?;
        let mut pos = p + 1;
        while pos < tokens.len() && tokens[pos].kind != TokenKind::Newline {
            pos += 1;
        }
        Ok(pos)
    }

    /// `include := INCLUDE LITERAL` — parsed and discarded.
    fn skip_include(&mut self, tokens: &[Token], pos: usize) -> Result<usize, ParseError> {
        let p = self.check("include", &[TokenKind::Include], tokens, pos)?;
        let p = self.check("include", &[TokenKind::Literal], tokens, p + 1)?;
        Ok(p + 1)
    }

    /// `directive := define | timescale | include`
    fn parse_directive(&mut self, tokens: &[Token], pos: usize) -> ParseResult<DirectiveNode> {
        if let Ok((define, p)) = self.parse_define(tokens, pos) {
            return Ok((
                DirectiveNode {
                    define: Some(define),
                },
                p,
            ));
        }
        if let Ok(p) = self.skip_timescale(tokens, pos) {
            return Ok((DirectiveNode { define: None }, p));
        }
        let p = self.skip_include(tokens, pos)?;
        Ok((DirectiveNode { define: None }, p))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
