//! Abstract syntax tree
//!
//! The parser produces one `Module` per file; the module owns every node.
//! Expressions carry a module-unique `id` that the semantic analyzer keys
//! its inferred-type and binding tables on (nodes are never shared, so the
//! id is stable through every later phase).

use crate::diagnostics::Loc;
use std::path::PathBuf;

pub type ExprId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub file: PathBuf,
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|s| match s {
            Stmt::FunctionDef(f) => Some(f),
            _ => None,
        })
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions().find(|f| f.name == name)
    }
}

/// Source-level type annotation (`int`, `list[int]`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnn {
    Name(String),
    Generic(String, Vec<TypeAnn>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ann: Option<TypeAnn>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_ann: Option<TypeAnn>,
    pub body: Vec<Stmt>,
    pub loc: Loc,
}

/// The single `except` handler of a `try` statement. The matched class
/// name is kept for diagnostics but has no runtime meaning: the runtime
/// has one error channel and every handler is a catch-all.
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub class_name: Option<String>,
    pub bind_name: Option<String>,
    pub body: Vec<Stmt>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Name(String, Loc),
    Subscript { value: Expr, index: Expr, loc: Loc },
}

impl AssignTarget {
    pub fn loc(&self) -> Loc {
        match self {
            AssignTarget::Name(_, loc) => *loc,
            AssignTarget::Subscript { loc, .. } => *loc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    Import { names: Vec<String>, loc: Loc },
    ImportFrom { module: String, names: Vec<String>, loc: Loc },
    Assign { target: AssignTarget, value: Expr, loc: Loc },
    AugAssign { target: AssignTarget, op: BinOpKind, value: Expr, loc: Loc },
    If { branches: Vec<(Expr, Vec<Stmt>)>, orelse: Vec<Stmt>, loc: Loc },
    While { test: Expr, body: Vec<Stmt>, loc: Loc },
    For { var: String, iter: Expr, body: Vec<Stmt>, loc: Loc },
    Try { body: Vec<Stmt>, handler: Handler, orelse: Vec<Stmt>, finalbody: Vec<Stmt>, loc: Loc },
    Return { value: Option<Expr>, loc: Loc },
    ExprStmt { value: Expr, loc: Loc },
    Pass { loc: Loc },
    Break { loc: Loc },
    Continue { loc: Loc },
}

impl Stmt {
    pub fn loc(&self) -> Loc {
        match self {
            Stmt::FunctionDef(f) => f.loc,
            Stmt::Import { loc, .. }
            | Stmt::ImportFrom { loc, .. }
            | Stmt::Assign { loc, .. }
            | Stmt::AugAssign { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::Try { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::ExprStmt { loc, .. }
            | Stmt::Pass { loc }
            | Stmt::Break { loc }
            | Stmt::Continue { loc } => *loc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::FloorDiv => "//",
            BinOpKind::Mod => "%",
            BinOpKind::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOpKind {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOpKind {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOpKind::Eq => "==",
            CmpOpKind::NotEq => "!=",
            CmpOpKind::Lt => "<",
            CmpOpKind::LtE => "<=",
            CmpOpKind::Gt => ">",
            CmpOpKind::GtE => ">=",
            CmpOpKind::In => "in",
            CmpOpKind::NotIn => "not in",
            CmpOpKind::Is => "is",
            CmpOpKind::IsNot => "is not",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Text(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    Single(Box<Expr>),
    Slice {
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Bool(bool),
    NoneLit,
    FString(Vec<FStringPart>),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    ListComp { elt: Box<Expr>, var: String, iter: Box<Expr>, cond: Option<Box<Expr>> },
    SetComp { elt: Box<Expr>, var: String, iter: Box<Expr>, cond: Option<Box<Expr>> },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        var: String,
        iter: Box<Expr>,
        cond: Option<Box<Expr>>,
    },
    BinOp { op: BinOpKind, left: Box<Expr>, right: Box<Expr> },
    UnaryOp { op: UnaryOpKind, operand: Box<Expr> },
    BoolOp { op: BoolOpKind, left: Box<Expr>, right: Box<Expr> },
    Compare { op: CmpOpKind, left: Box<Expr>, right: Box<Expr> },
    IfExp { test: Box<Expr>, body: Box<Expr>, orelse: Box<Expr> },
    Call { func: Box<Expr>, args: Vec<Expr> },
    Attribute { value: Box<Expr>, attr: String },
    Subscript { value: Box<Expr>, index: Index },
}

impl Expr {
    /// True for literal nodes the constant folder can evaluate directly.
    pub fn is_const(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Int(_)
                | ExprKind::Float(_)
                | ExprKind::Str(_)
                | ExprKind::Bytes(_)
                | ExprKind::Bool(_)
                | ExprKind::NoneLit
        )
    }
}
