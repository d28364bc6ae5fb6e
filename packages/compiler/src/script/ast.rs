//! Script AST
//!
//! Node definitions for Nextflow scripts: module declarations (includes,
//! feature flags, processes, workflows, functions, output blocks),
//! statements and expressions. Nodes are closed sums; shared metadata
//! (inferred types, resolved targets, parents) lives in side tables on the
//! owning source unit keyed by [`NodeId`].

use serde::{Deserialize, Serialize};

use crate::parse_util::ParseSourceSpan;

pub use super::lexer::StringTokenKind;

/// Identity of a node within its source unit. Ids are stamped in parse
/// order and index the unit's metadata tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

/// Hands out node ids during parsing. One generator per source unit.
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        NodeIdGen { next: 0 }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn count(&self) -> u32 {
        self.next
    }
}

// ---------------------------------------------------------------------------
// Module & declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptModule {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Declaration {
    Include(IncludeDecl),
    FeatureFlag(FeatureFlagDecl),
    Process(ProcessDef),
    Workflow(WorkflowDef),
    Function(FunctionDef),
    Output(OutputDef),
    Stmt(Statement),
}

/// `include { foo; bar as baz } from './module'`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeDecl {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub entries: Vec<IncludeEntry>,
    pub source: String,
    pub source_span: ParseSourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncludeEntry {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub alias: Option<String>,
}

impl IncludeEntry {
    /// The name the entry is visible under in the including script.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// `nextflow.enable.dsl = 2`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlagDecl {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessForm {
    /// Directive-form process bodies as written before typed inputs.
    Legacy,
    /// Typed inputs/outputs.
    Typed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessBodyKind {
    Script,
    Shell,
    Exec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessBody {
    pub kind: ProcessBodyKind,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDef {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub form: ProcessForm,
    pub directives: Vec<Statement>,
    pub inputs: Vec<Statement>,
    pub outputs: Vec<Statement>,
    pub when: Option<Expression>,
    pub body: Option<ProcessBody>,
    pub stub: Vec<Statement>,
    pub topics: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeEntry {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
}

/// `emit: out` or `emit: out = expr`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitEntry {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: Option<String>,
    pub name_span: Option<ParseSourceSpan>,
    pub value: Option<Expression>,
}

/// `publish: ch >> 'results'`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishEntry {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub source: Expression,
    pub target: String,
    pub target_span: ParseSourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    /// `None` for the entry workflow.
    pub name: Option<String>,
    pub name_span: Option<ParseSourceSpan>,
    pub takes: Vec<TakeEntry>,
    pub main: Vec<Statement>,
    pub emits: Vec<EmitEntry>,
    pub publishers: Vec<PublishEntry>,
    pub on_complete: Option<Box<Statement>>,
    pub on_error: Option<Box<Statement>>,
}

impl WorkflowDef {
    pub fn is_entry(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub ty: Option<TypeAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Vec<Statement>,
    /// Leading doc comment, if any.
    pub doc: Option<String>,
}

/// `output { results { ... } }` publish-schema block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDef {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub targets: Vec<OutputTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputTarget {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAnnotation {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub args: Vec<TypeAnnotation>,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Expr(ExprStmt),
    VarDecl(VarDeclStmt),
    Assignment(AssignmentStmt),
    Block(BlockStmt),
    If(IfStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    TryCatch(TryCatchStmt),
    Incomplete(IncompleteStmt),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub expression: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDeclName {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub ty: Option<TypeAnnotation>,
}

/// `def x = e`, `def (a, b) = e`, `String s = e`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDeclStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub names: Vec<VarDeclName>,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub op: String,
    pub target: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub value: Option<Expression>,
    /// Set when a trailing expression statement was rewritten into a
    /// return during return-type inference.
    pub synthetic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub param_name: String,
    pub param_span: ParseSourceSpan,
    pub ty: Option<TypeAnnotation>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryCatchStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub body: Vec<Statement>,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Vec<Statement>>,
}

/// Partial input kept in the tree so completion still has an anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteStmt {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Property(PropertyExpr),
    MethodCall(MethodCallExpr),
    Index(IndexExpr),
    Variable(VariableExpr),
    Tuple(TupleExpr),
    Range(RangeExpr),
    List(ListExpr),
    Map(MapExpr),
    Constant(ConstantExpr),
    Str(StringExpr),
    Closure(ClosureExpr),
    Cast(CastExpr),
    Ternary(TernaryExpr),
    Elvis(ElvisExpr),
    Paren(ParenExpr),
    Empty(EmptyExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub op: String,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub op: String,
    pub operand: Box<Expression>,
}

/// `receiver.name`, `receiver?.name`, `receiver*.name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub receiver: Box<Expression>,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub safe: bool,
    pub spread: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedArg {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub value: Expression,
}

/// A call, with or without receiver, parens or command form. Directive
/// statements inside processes (`cpus 4`) parse to this shape too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCallExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub receiver: Option<Box<Expression>>,
    pub name: String,
    pub name_span: ParseSourceSpan,
    pub args: Vec<Expression>,
    pub named_args: Vec<NamedArg>,
    pub safe: bool,
    /// Command-call form without parentheses.
    pub command_form: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub receiver: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub from: Box<Expression>,
    pub to: Box<Expression>,
    pub exclusive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEntry {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub key: String,
    pub key_span: ParseSourceSpan,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub value: ConstantValue,
}

/// String literal. `parts` holds embedded interpolation expressions for
/// double-quoted and slashy strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub value: String,
    pub kind: StringTokenKind,
    pub parts: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub params: Vec<Param>,
    /// No parameter list was written; the closure receives implicit `it`.
    pub implicit_params: bool,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub expression: Box<Expression>,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TernaryExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub condition: Box<Expression>,
    pub true_expr: Box<Expression>,
    pub false_expr: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElvisExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub value: Box<Expression>,
    pub fallback: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParenExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
    pub expression: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyExpr {
    pub id: NodeId,
    pub span: ParseSourceSpan,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl Declaration {
    pub fn id(&self) -> NodeId {
        match self {
            Declaration::Include(n) => n.id,
            Declaration::FeatureFlag(n) => n.id,
            Declaration::Process(n) => n.id,
            Declaration::Workflow(n) => n.id,
            Declaration::Function(n) => n.id,
            Declaration::Output(n) => n.id,
            Declaration::Stmt(s) => s.id(),
        }
    }

    pub fn span(&self) -> ParseSourceSpan {
        match self {
            Declaration::Include(n) => n.span,
            Declaration::FeatureFlag(n) => n.span,
            Declaration::Process(n) => n.span,
            Declaration::Workflow(n) => n.span,
            Declaration::Function(n) => n.span,
            Declaration::Output(n) => n.span,
            Declaration::Stmt(s) => s.span(),
        }
    }
}

impl Statement {
    pub fn id(&self) -> NodeId {
        match self {
            Statement::Expr(s) => s.id,
            Statement::VarDecl(s) => s.id,
            Statement::Assignment(s) => s.id,
            Statement::Block(s) => s.id,
            Statement::If(s) => s.id,
            Statement::Return(s) => s.id,
            Statement::Throw(s) => s.id,
            Statement::TryCatch(s) => s.id,
            Statement::Incomplete(s) => s.id,
        }
    }

    pub fn span(&self) -> ParseSourceSpan {
        match self {
            Statement::Expr(s) => s.span,
            Statement::VarDecl(s) => s.span,
            Statement::Assignment(s) => s.span,
            Statement::Block(s) => s.span,
            Statement::If(s) => s.span,
            Statement::Return(s) => s.span,
            Statement::Throw(s) => s.span,
            Statement::TryCatch(s) => s.span,
            Statement::Incomplete(s) => s.span,
        }
    }
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::Binary(e) => e.id,
            Expression::Unary(e) => e.id,
            Expression::Property(e) => e.id,
            Expression::MethodCall(e) => e.id,
            Expression::Index(e) => e.id,
            Expression::Variable(e) => e.id,
            Expression::Tuple(e) => e.id,
            Expression::Range(e) => e.id,
            Expression::List(e) => e.id,
            Expression::Map(e) => e.id,
            Expression::Constant(e) => e.id,
            Expression::Str(e) => e.id,
            Expression::Closure(e) => e.id,
            Expression::Cast(e) => e.id,
            Expression::Ternary(e) => e.id,
            Expression::Elvis(e) => e.id,
            Expression::Paren(e) => e.id,
            Expression::Empty(e) => e.id,
        }
    }

    pub fn span(&self) -> ParseSourceSpan {
        match self {
            Expression::Binary(e) => e.span,
            Expression::Unary(e) => e.span,
            Expression::Property(e) => e.span,
            Expression::MethodCall(e) => e.span,
            Expression::Index(e) => e.span,
            Expression::Variable(e) => e.span,
            Expression::Tuple(e) => e.span,
            Expression::Range(e) => e.span,
            Expression::List(e) => e.span,
            Expression::Map(e) => e.span,
            Expression::Constant(e) => e.span,
            Expression::Str(e) => e.span,
            Expression::Closure(e) => e.span,
            Expression::Cast(e) => e.span,
            Expression::Ternary(e) => e.span,
            Expression::Elvis(e) => e.span,
            Expression::Paren(e) => e.span,
            Expression::Empty(e) => e.span,
        }
    }

    /// Unwrap grouping parentheses.
    pub fn unwrapped(&self) -> &Expression {
        match self {
            Expression::Paren(p) => p.expression.unwrapped(),
            other => other,
        }
    }
}
