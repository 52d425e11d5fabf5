//! Abstract syntax tree for the Verilog subset.
//!
//! Each variant family is a tagged union; recursive children are boxed so
//! node sizes stay bounded. Tokens are stored by value, so the tree owns its
//! positions and survives reparsing of other files.

pub mod flatten;

use crate::lexer::Token;
use serde::{Deserialize, Serialize};

/// A parsed source file: an ordered sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileNode {
    pub statements: Vec<TopLevelStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopLevelStatement {
    Directive(DirectiveNode),
    Module(ModuleNode),
}

/// A compiler directive. Only defines carry information; timescale and
/// include directives are parsed and discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveNode {
    pub define: Option<DefineNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefineNode {
    pub identifier: Token,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub identifier: Token,
    /// Port identifiers in declaration order.
    pub ports: Vec<Token>,
    pub interior: Vec<InteriorNode>,
}

/// A statement inside a module body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InteriorNode {
    Declaration(DeclarationNode),
    Assignment(AssignmentNode),
    ModuleApplication(ModuleApplicationNode),
    Generate(GenerateNode),
    Always(AlwaysNode),
    DefParam(DefParamNode),
    Initial(InitialNode),
    /// An inline directive inside a module body.
    Directive(DirectiveNode),
    Task(TaskNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationNode {
    pub ty: TypeNode,
    /// Declared variables, parallel to `values` when initializers are present.
    pub variables: Vec<VariableNode>,
    pub values: Vec<ExprNode>,
}

/// Base-type keyword plus packed ranges. Multi-dimensional ranges are kept as
/// a flat sequence; the packed/unpacked distinction is not modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeNode {
    pub keyword: Token,
    pub ranges: Vec<RangeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableNode {
    pub identifier: Token,
    pub ranges: Vec<RangeNode>,
}

/// `[from:to]`, MSB:LSB by convention. The bounds are not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeNode {
    pub from: ExprNode,
    pub to: ExprNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexNode {
    pub index: ExprNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selector {
    Index(IndexNode),
    Range(RangeNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentNode {
    pub identifier: Token,
    pub index: Option<IndexNode>,
    pub value: ExprNode,
    /// The source used the `assign` keyword.
    pub is_continuous: bool,
    /// The source used `<=` rather than `=`.
    pub is_nonblocking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleApplicationNode {
    pub module_name: Token,
    pub instance_name: Option<Token>,
    pub range: Option<RangeNode>,
    pub arguments: Vec<ArgumentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentNode {
    /// Present for named ports (`.label(expr)`).
    pub label: Option<Token>,
    /// Absent when a named port is left unconnected (`.label()`).
    pub value: Option<ExprNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryPrefix {
    /// `~`
    Not,
    /// `-`
    Minus,
}

/// A dotted identifier path or a literal, with selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueNode {
    pub unary: Option<UnaryPrefix>,
    /// One literal/funcliteral token, or one-or-more identifier tokens
    /// forming a dotted path.
    pub path: Vec<Token>,
    pub selectors: Vec<Selector>,
}

/// An optionally sized value: either a plain value or a brace-concatenation
/// of nested sized values, with an optional size token before the brace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedValueNode {
    pub size: Option<Token>,
    pub value: SizedValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizedValue {
    Single(ValueNode),
    Concat(Vec<SizedValueNode>),
}

/// Expression primary: a value or a parenthesised sub-expression. Grouping
/// from the source is preserved; no precedence is imposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprPrimary {
    Value(SizedValueNode),
    Paren(Box<ExprNode>),
}

/// A flat right-associative expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprNode {
    pub primary: ExprPrimary,
    /// Operator or comparator token combining `primary` with `right`.
    pub combinator: Option<Token>,
    pub right: Option<Box<ExprNode>>,
    pub expr_true: Option<Box<ExprNode>>,
    pub expr_false: Option<Box<ExprNode>>,
}

/// Statement forms allowed inside always/generate/initial bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlwaysStatement {
    Begin(BeginBlockNode),
    For(Box<ForBlockNode>),
    If(Box<IfBlockNode>),
    Case(Box<CaseBlock>),
    SystemCall(SystemCallNode),
    Delay(DelayNode),
    Interior(Box<InteriorNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeginBlockNode {
    /// `begin : label`
    pub label: Option<Token>,
    pub statements: Vec<AlwaysStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForBlockNode {
    pub initializer: Option<AssignmentNode>,
    pub condition: Option<ExprNode>,
    pub incrementor: Option<AssignmentNode>,
    pub body: AlwaysStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBlockNode {
    pub condition: ExprNode,
    pub body: AlwaysStatement,
    pub else_body: Option<AlwaysStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlwaysNode {
    /// Sensitivity list; empty when no `@(...)` clause was given.
    pub times: Vec<TimeNode>,
    pub statement: AlwaysStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeNode {
    /// `posedge` / `negedge`, when present.
    pub edge: Option<Token>,
    pub identifier: Token,
}

/// `# <amount>` delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayNode {
    pub amount: Token,
}

/// A system-task call: `$name(args...);`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCallNode {
    pub function: Token,
    pub arguments: Vec<ExprNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefParamNode {
    /// Dotted path, e.g. `defparam inst.WIDTH = 8`.
    pub identifiers: Vec<Token>,
    pub value: ExprNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialNode {
    pub statement: AlwaysStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateNode {
    pub statements: Vec<AlwaysStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBlock {
    pub scrutinee: ExprNode,
    pub cases: Vec<CaseNode>,
    pub default: Option<AlwaysStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseNode {
    /// One or more match expressions before the colon.
    pub conditions: Vec<ExprNode>,
    pub statement: AlwaysStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub identifier: Token,
    pub statements: Vec<TaskStatement>,
}

/// Task bodies permit begin blocks in addition to plain interior statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskStatement {
    Interior(InteriorNode),
    Begin(BeginBlockNode),
}

impl FileNode {
    /// Iterate over the modules defined in this file.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.statements.iter().filter_map(|s| match s {
            TopLevelStatement::Module(m) => Some(m),
            TopLevelStatement::Directive(_) => None,
        })
    }

    /// Iterate over the top-level defines in this file.
    pub fn defines(&self) -> impl Iterator<Item = &DefineNode> {
        self.statements.iter().filter_map(|s| match s {
            TopLevelStatement::Directive(d) => d.define.as_ref(),
            TopLevelStatement::Module(_) => None,
        })
    }
}
