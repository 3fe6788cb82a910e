//! Abstract syntax tree produced by the parser and annotated in place by
//! the type checker.

use crate::token::SourceLocation;
use crate::types::Type;

/// A parameter in a function signature: `name: Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    pub location: SourceLocation,
}

/// One function definition: `fun name(params) : ReturnType { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Type,
    pub body: Expr,
    pub location: SourceLocation,
}

/// A whole source file: zero or more function definitions interleaved
/// with semicolon-separated top-level expressions, the latter wrapped
/// into a single implicit outer block.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub functions: Vec<FunctionDefinition>,
    pub top_level: Expr,
}

/// An expression node. Every variant carries the [`SourceLocation`] where
/// it began, used for error reporting; `inferred_type` is filled in by
/// the type checker and is `None` until then.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
    pub inferred_type: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(i64),
    BoolLiteral(bool),
    /// The value `()`. Produced implicitly for empty blocks and blocks
    /// ending in `;`; never written explicitly in source.
    UnitLiteral,
    Identifier(String),
    UnaryOp {
        op: String,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IfExpression {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    WhileLoop {
        condition: Box<Expr>,
        body: Box<Expr>,
    },
    Block {
        statements: Vec<Expr>,
        result: Box<Expr>,
    },
    VarDeclaration {
        name: String,
        declared_type: Option<Type>,
        value: Box<Expr>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    BreakStatement,
    ContinueStatement,
    ReturnStatement {
        value: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Expr {
            kind,
            location,
            inferred_type: None,
        }
    }

    pub fn ty(&self) -> &Type {
        self.inferred_type
            .as_ref()
            .expect("expression has not been type-checked")
    }

    /// Structural equality that ignores `SourceLocation` and
    /// `inferred_type`, for tests that build expected trees without
    /// tracking exact positions.
    pub fn shape_eq(&self, other: &Expr) -> bool {
        use ExprKind::*;
        match (&self.kind, &other.kind) {
            (IntLiteral(a), IntLiteral(b)) => a == b,
            (BoolLiteral(a), BoolLiteral(b)) => a == b,
            (UnitLiteral, UnitLiteral) => true,
            (Identifier(a), Identifier(b)) => a == b,
            (UnaryOp { op: oa, operand: a }, UnaryOp { op: ob, operand: b }) => {
                oa == ob && a.shape_eq(b)
            }
            (
                BinaryOp {
                    op: oa,
                    left: la,
                    right: ra,
                },
                BinaryOp {
                    op: ob,
                    left: lb,
                    right: rb,
                },
            ) => oa == ob && la.shape_eq(lb) && ra.shape_eq(rb),
            (
                IfExpression {
                    condition: ca,
                    then_branch: ta,
                    else_branch: ea,
                },
                IfExpression {
                    condition: cb,
                    then_branch: tb,
                    else_branch: eb,
                },
            ) => {
                ca.shape_eq(cb)
                    && ta.shape_eq(tb)
                    && match (ea, eb) {
                        (Some(x), Some(y)) => x.shape_eq(y),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (
                WhileLoop {
                    condition: ca,
                    body: ba,
                },
                WhileLoop {
                    condition: cb,
                    body: bb,
                },
            ) => ca.shape_eq(cb) && ba.shape_eq(bb),
            (
                Block {
                    statements: sa,
                    result: ra,
                },
                Block {
                    statements: sb,
                    result: rb,
                },
            ) => {
                sa.len() == sb.len()
                    && sa.iter().zip(sb).all(|(x, y)| x.shape_eq(y))
                    && ra.shape_eq(rb)
            }
            (
                VarDeclaration {
                    name: na,
                    declared_type: da,
                    value: va,
                },
                VarDeclaration {
                    name: nb,
                    declared_type: db,
                    value: vb,
                },
            ) => na == nb && da == db && va.shape_eq(vb),
            (FunctionCall { name: na, args: aa }, FunctionCall { name: nb, args: ab }) => {
                na == nb && aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| x.shape_eq(y))
            }
            (BreakStatement, BreakStatement) => true,
            (ContinueStatement, ContinueStatement) => true,
            (ReturnStatement { value: va }, ReturnStatement { value: vb }) => match (va, vb) {
                (Some(x), Some(y)) => x.shape_eq(y),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        }
    }
}
