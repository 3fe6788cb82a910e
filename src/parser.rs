//! Recursive-descent parser over a [`Token`] stream.
//!
//! Binary operators are parsed through an explicit precedence ladder
//! (lowest to highest): assignment, `or`, `and`, equality, relational,
//! additive, multiplicative. Unary operators bind tighter than any
//! binary operator.

use crate::ast::{Expr, ExprKind, FunctionDefinition, Module, Parameter};
use crate::error::CompileError;
use crate::token::{SourceLocation, Token, TokenKind};
use crate::types::Type;

/// Operators grouped by precedence level, loosest first. Level 0
/// (assignment) is handled separately since it is right-associative and
/// only valid in specific syntactic positions.
const PRECEDENCE_LEVELS: &[&[&str]] = &[
    &["or"],
    &["and"],
    &["==", "!="],
    &["<", "<=", ">", ">="],
    &["+", "-"],
    &["*", "/", "%"],
];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// `module := (fun_def | top_expr ';')* top_expr?`. Function definitions
    /// and semicolon-terminated top-level expressions may interleave
    /// freely; at most one trailing top-level expression may omit its
    /// semicolon, and it becomes the result of an implicit outer block
    /// wrapping every top-level expression.
    pub fn parse_module(mut self) -> Result<Module, CompileError> {
        let loc = self.location();
        let mut functions = Vec::new();
        let mut statements = Vec::new();
        let mut result = None;
        while self.peek().is_some() {
            if self.check_keyword("fun") {
                functions.push(self.parse_function_definition()?);
                continue;
            }
            let expr = self.parse_statement()?;
            if self.check_punct(";") {
                self.advance();
                statements.push(expr);
                continue;
            }
            if self.peek().is_none() {
                result = Some(expr);
                break;
            }
            if Self::can_omit_semicolon(&expr.kind) {
                statements.push(expr);
                continue;
            }
            return Err(CompileError::parse(
                self.location(),
                "expected ';' after top-level expression",
            ));
        }
        let result = result.unwrap_or_else(|| Expr::new(ExprKind::UnitLiteral, self.location()));
        Ok(Module {
            functions,
            top_level: Expr::new(ExprKind::Block { statements, result: Box::new(result) }, loc),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn location(&self) -> SourceLocation {
        self.peek()
            .map(|t| t.location)
            .unwrap_or_else(SourceLocation::synthetic)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn check_punct(&self, text: &str) -> bool {
        matches!(self.peek(), Some(t) if matches!(&t.kind, TokenKind::Punctuation(p) if p == text))
    }

    fn check_operator(&self, text: &str) -> bool {
        matches!(self.peek(), Some(t) if matches!(&t.kind, TokenKind::Operator(p) if p == text))
    }

    fn check_keyword(&self, text: &str) -> bool {
        matches!(self.peek(), Some(t) if matches!(&t.kind, TokenKind::Keyword(k) if k == text))
    }

    fn expect_punct(&mut self, text: &str) -> Result<(), CompileError> {
        if self.check_punct(text) {
            self.advance();
            Ok(())
        } else {
            Err(CompileError::parse(
                self.location(),
                format!("expected '{text}'"),
            ))
        }
    }

    fn expect_keyword(&mut self, text: &str) -> Result<(), CompileError> {
        if self.check_keyword(text) {
            self.advance();
            Ok(())
        } else {
            Err(CompileError::parse(
                self.location(),
                format!("expected keyword '{text}'"),
            ))
        }
    }

    fn expect_operator(&mut self, text: &str) -> Result<(), CompileError> {
        if self.check_operator(text) {
            self.advance();
            Ok(())
        } else {
            Err(CompileError::parse(
                self.location(),
                format!("expected operator '{text}'"),
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, SourceLocation), CompileError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                location,
            }) => {
                let name = name.clone();
                let location = *location;
                self.advance();
                Ok((name, location))
            }
            _ => Err(CompileError::parse(self.location(), "expected identifier")),
        }
    }

    fn parse_type(&mut self) -> Result<Type, CompileError> {
        let loc = self.location();
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Keyword(kw)) if kw == "Int" => {
                self.advance();
                Ok(Type::Int)
            }
            Some(TokenKind::Keyword(kw)) if kw == "Bool" => {
                self.advance();
                Ok(Type::Bool)
            }
            Some(TokenKind::Keyword(kw)) if kw == "Unit" => {
                self.advance();
                Ok(Type::Unit)
            }
            _ => Err(CompileError::parse(loc, "expected a type name")),
        }
    }

    // --- function definitions ---------------------------------------

    fn parse_function_definition(&mut self) -> Result<FunctionDefinition, CompileError> {
        let loc = self.location();
        self.expect_keyword("fun")?;
        let (name, _) = self.expect_identifier()?;
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.check_punct(")") {
            loop {
                let (pname, ploc) = self.expect_identifier()?;
                self.expect_punct(":")?;
                let ty = self.parse_type()?;
                params.push(Parameter {
                    name: pname,
                    ty,
                    location: ploc,
                });
                if self.check_punct(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect_punct(")")?;
        self.expect_punct(":")?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;
        Ok(FunctionDefinition {
            name,
            params,
            return_type,
            body,
            location: loc,
        })
    }

    // --- expressions ---------------------------------------------------

    /// `level == 0` is the assignment level: `assign := or_ ('=' assign)?`,
    /// right-associative.
    fn parse_expression(&mut self, level: usize) -> Result<Expr, CompileError> {
        if level == 0 {
            return self.parse_assignment();
        }
        self.parse_binary(level)
    }

    fn parse_assignment(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        let left = self.parse_binary(1)?;
        if self.check_operator("=") {
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Expr::new(
                ExprKind::BinaryOp {
                    op: "=".to_string(),
                    left: Box::new(left),
                    right: Box::new(value),
                },
                loc,
            ));
        }
        Ok(left)
    }

    /// `var` declarations are only legal at block/module top level, so
    /// they're parsed by [`Self::parse_statement`] rather than being a
    /// `parse_primary` alternative — using one as an operand (e.g.
    /// `1 + var x = 5`) falls through to `parse_primary`'s "expected an
    /// expression" error instead.
    fn parse_var_declaration(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        self.expect_keyword("var")?;
        let (name, _) = self.expect_identifier()?;
        let declared_type = if self.check_punct(":") {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect_operator("=")?;
        let value = self.parse_expression(0)?;
        Ok(Expr::new(
            ExprKind::VarDeclaration {
                name,
                declared_type,
                value: Box::new(value),
            },
            loc,
        ))
    }

    /// A statement is either a `var` declaration or an ordinary
    /// expression; this is the entry point used inside blocks and at
    /// module top level.
    fn parse_statement(&mut self) -> Result<Expr, CompileError> {
        if self.check_keyword("var") {
            return self.parse_var_declaration();
        }
        self.parse_expression(0)
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expr, CompileError> {
        if level > PRECEDENCE_LEVELS.len() {
            return self.parse_unary();
        }
        let ops = PRECEDENCE_LEVELS[level - 1];
        let mut left = self.parse_binary(level + 1)?;
        loop {
            let op = match self.peek() {
                Some(Token {
                    kind: TokenKind::Operator(op),
                    ..
                }) if ops.contains(&op.as_str()) => op.clone(),
                _ => break,
            };
            let loc = self.location();
            self.advance();
            let right = self.parse_binary(level + 1)?;
            left = Expr::new(
                ExprKind::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let is_unary_minus = self.check_operator("-");
        let is_not = self.check_operator("not");
        if is_unary_minus || is_not {
            let loc = self.location();
            let op = if is_unary_minus { "-" } else { "not" }.to_string();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::IntLiteral(v)) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral(v), loc))
            }
            Some(TokenKind::BoolLiteral(v)) => {
                self.advance();
                Ok(Expr::new(ExprKind::BoolLiteral(v), loc))
            }
            Some(TokenKind::Keyword(kw)) if kw == "if" => self.parse_if(),
            Some(TokenKind::Keyword(kw)) if kw == "while" => self.parse_while(),
            Some(TokenKind::Keyword(kw)) if kw == "return" => self.parse_return(),
            Some(TokenKind::Keyword(kw)) if kw == "break" => {
                self.advance();
                Ok(Expr::new(ExprKind::BreakStatement, loc))
            }
            Some(TokenKind::Keyword(kw)) if kw == "continue" => {
                self.advance();
                Ok(Expr::new(ExprKind::ContinueStatement, loc))
            }
            Some(TokenKind::Punctuation(p)) if p == "{" => self.parse_block(),
            Some(TokenKind::Punctuation(p)) if p == "(" => {
                self.advance();
                let inner = self.parse_expression(0)?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                if self.check_punct("(") {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check_punct(")") {
                        loop {
                            args.push(self.parse_expression(0)?);
                            if self.check_punct(",") {
                                self.advance();
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect_punct(")")?;
                    Ok(Expr::new(ExprKind::FunctionCall { name, args }, loc))
                } else {
                    Ok(Expr::new(ExprKind::Identifier(name), loc))
                }
            }
            _ => Err(CompileError::parse(loc, "expected an expression")),
        }
    }

    /// `'if' expr 'then' expr ('else' expr)?`. Branches are ordinary
    /// expressions, not braced blocks — `if c then { a } else { b }` is
    /// still valid since a block is itself an expression.
    fn parse_if(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        self.expect_keyword("if")?;
        let condition = self.parse_expression(1)?;
        self.expect_keyword("then")?;
        let then_branch = self.parse_expression(0)?;
        let else_branch = if self.check_keyword("else") {
            self.advance();
            Some(Box::new(self.parse_expression(0)?))
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::IfExpression {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            loc,
        ))
    }

    /// `'while' expr 'do' expr`.
    fn parse_while(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        self.expect_keyword("while")?;
        let condition = self.parse_expression(1)?;
        self.expect_keyword("do")?;
        let body = self.parse_expression(0)?;
        Ok(Expr::new(
            ExprKind::WhileLoop {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            loc,
        ))
    }

    fn parse_return(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        self.expect_keyword("return")?;
        let value = if self.check_punct(";") || self.check_punct("}") {
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };
        Ok(Expr::new(ExprKind::ReturnStatement { value }, loc))
    }

    /// `{ stmt; stmt; ...; result }`. An empty block evaluates to `Unit`.
    /// A block ending in `;` also evaluates to `Unit` (a synthetic
    /// literal is appended). Statement forms whose own syntax already
    /// ends in `}` (if/while/block) do not require a trailing `;` to
    /// separate them from the next statement.
    fn parse_block(&mut self) -> Result<Expr, CompileError> {
        let loc = self.location();
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        if self.check_punct("}") {
            self.advance();
            return Ok(Expr::new(
                ExprKind::Block {
                    statements: Vec::new(),
                    result: Box::new(Expr::new(ExprKind::UnitLiteral, loc)),
                },
                loc,
            ));
        }

        let mut last = self.parse_statement()?;
        loop {
            if self.check_punct("}") {
                self.advance();
                return Ok(Expr::new(
                    ExprKind::Block {
                        statements,
                        result: Box::new(last),
                    },
                    loc,
                ));
            }
            if self.check_punct(";") {
                self.advance();
                statements.push(last);
                if self.check_punct("}") {
                    let unit_loc = self.location();
                    self.advance();
                    return Ok(Expr::new(
                        ExprKind::Block {
                            statements,
                            result: Box::new(Expr::new(ExprKind::UnitLiteral, unit_loc)),
                        },
                        loc,
                    ));
                }
                last = self.parse_statement()?;
                continue;
            }
            if Self::can_omit_semicolon(&last.kind) {
                statements.push(last);
                last = self.parse_statement()?;
                continue;
            }
            return Err(CompileError::parse(
                self.location(),
                "expected ';' or '}' after statement",
            ));
        }
    }

    fn can_omit_semicolon(kind: &ExprKind) -> bool {
        matches!(
            kind,
            ExprKind::IfExpression { .. } | ExprKind::WhileLoop { .. } | ExprKind::Block { .. }
        )
    }
}

/// Parses a whole module from source tokens.
pub fn parse(tokens: Vec<Token>) -> Result<Module, CompileError> {
    Parser::new(tokens).parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn parse_src(src: &str) -> Module {
        parse(tokenize(src).unwrap()).unwrap()
    }

    /// `parse_module` always wraps its top-level expressions in an
    /// implicit outer block; these tests care about the sole result
    /// expression of a single-expression module, so unwrap it here.
    fn sole_result(m: &Module) -> &ExprKind {
        match &m.top_level.kind {
            ExprKind::Block { statements, result } if statements.is_empty() => &result.kind,
            other => other,
        }
    }

    #[test]
    fn test_parse_int_literal() {
        let m = parse_src("1");
        assert!(matches!(sole_result(&m), ExprKind::IntLiteral(1)));
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        let m = parse_src("1 + 2 * 3");
        match sole_result(&m) {
            ExprKind::BinaryOp { op, left, right } => {
                assert_eq!(op, "+");
                assert!(matches!(left.kind, ExprKind::IntLiteral(1)));
                assert!(matches!(right.kind, ExprKind::BinaryOp { .. }));
            }
            _ => panic!("expected binary op"),
        }
    }

    #[test]
    fn test_parse_unary_minus_binds_tighter_than_binary() {
        let m = parse_src("-1 + 2");
        match sole_result(&m) {
            ExprKind::BinaryOp { op, left, .. } => {
                assert_eq!(op, "+");
                assert!(matches!(left.kind, ExprKind::UnaryOp { .. }));
            }
            _ => panic!("expected binary op"),
        }
    }

    #[test]
    fn test_parse_if_else() {
        let m = parse_src("if true then 1 else 2");
        assert!(matches!(sole_result(&m), ExprKind::IfExpression { .. }));
    }

    #[test]
    fn test_parse_block_trailing_semicolon_is_unit() {
        let m = parse_src("{ 1; }");
        match sole_result(&m) {
            ExprKind::Block { result, .. } => {
                assert!(matches!(result.kind, ExprKind::UnitLiteral));
            }
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn test_parse_function_definition() {
        let m = parse_src("fun add(a: Int, b: Int): Int { a + b } add(1, 2)");
        assert_eq!(m.functions.len(), 1);
        assert_eq!(m.functions[0].name, "add");
        assert_eq!(m.functions[0].params.len(), 2);
    }

    #[test]
    fn test_parse_missing_closing_paren_errors() {
        let result = parse(tokenize("(1 + 2").unwrap());
        assert!(matches!(result, Err(CompileError::Parse(_, _))));
    }

    #[test]
    fn test_parse_var_declaration_with_type() {
        let m = parse_src("var x: Int = 5");
        match sole_result(&m) {
            ExprKind::VarDeclaration {
                name,
                declared_type,
                ..
            } => {
                assert_eq!(name, "x");
                assert_eq!(*declared_type, Some(Type::Int));
            }
            other => panic!("expected var declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_identifier_assignment_is_binary_op_not_declaration() {
        let m = parse_src("var x = 1; x = 2");
        match &m.top_level.kind {
            ExprKind::Block { statements, result } => {
                assert_eq!(statements.len(), 1);
                match &result.kind {
                    ExprKind::BinaryOp { op, left, .. } => {
                        assert_eq!(op, "=");
                        assert!(matches!(left.kind, ExprKind::Identifier(ref n) if n == "x"));
                    }
                    other => panic!("expected assignment binary op, got {other:?}"),
                }
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn test_var_as_operand_is_rejected() {
        let result = parse(tokenize("1 + var x = 5").unwrap());
        assert!(matches!(result, Err(CompileError::Parse(_, _))));
    }

    #[test]
    fn test_multiple_top_level_expressions_separated_by_semicolons() {
        let m = parse_src("print_int(1); print_int(2)");
        match &m.top_level.kind {
            ExprKind::Block { statements, result } => {
                assert_eq!(statements.len(), 1);
                assert!(matches!(result.kind, ExprKind::FunctionCall { .. }));
            }
            other => panic!("expected block, got {other:?}"),
        }
    }
}
