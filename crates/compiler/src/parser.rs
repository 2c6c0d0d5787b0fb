//! Recursive-descent parser
//!
//! Grammar notes that differ from full Python:
//! - single assignment targets only, no chained `a = b = c`
//! - comparisons are single-level; chaining (`a < b < c`) is rejected
//! - comprehensions have one source and at most one filter
//! - nested `def`, lambdas, classes, decorators, starred args and keyword
//!   arguments are rejected at the first token that introduces them
//!
//! Every rejection produces a ParseError whose note lists what was
//! expected at that point.

use crate::ast::*;
use crate::diagnostics::{CompileError, Diagnostic, Loc};
use crate::lexer::{tokenize, Token, TokenKind};
use std::path::{Path, PathBuf};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: PathBuf,
    next_expr_id: ExprId,
}

impl Parser {
    pub fn new(source: &str, file: &Path) -> Result<Self, CompileError> {
        let tokens = tokenize(source, file)?;
        Ok(Parser { tokens, pos: 0, file: file.to_path_buf(), next_expr_id: 0 })
    }

    pub fn parse(mut self) -> Result<Module, CompileError> {
        let mut body = Vec::new();
        while !self.check_eof() {
            self.skip_newlines();
            if self.check_eof() {
                break;
            }
            self.parse_line(&mut body)?;
        }
        Ok(Module { file: self.file, body })
    }

    // ------------------------------------------------------------------
    // token helpers

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn loc(&self) -> Loc {
        self.current().loc
    }

    fn check_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_kw(&self, kw: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.check_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn describe(kind: &TokenKind) -> String {
        match kind {
            TokenKind::Name(n) => format!("name '{}'", n),
            TokenKind::Keyword(k) => format!("keyword '{}'", k),
            TokenKind::Int(_) => "integer literal".to_string(),
            TokenKind::Float(_) => "float literal".to_string(),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Bytes(_) => "bytes literal".to_string(),
            TokenKind::FStr(_) => "f-string literal".to_string(),
            TokenKind::Op(o) => format!("'{}'", o),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }

    fn error(&self, message: impl Into<String>, expected: &str) -> CompileError {
        CompileError::Parse(
            Diagnostic::error("parse", message, &self.file, self.loc())
                .with_note(format!("expected {}", expected)),
        )
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        self.error(
            format!("unexpected {}", Self::describe(&self.current().kind)),
            expected,
        )
    }

    fn expect_op(&mut self, op: &str) -> Result<(), CompileError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", op)))
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<(String, Loc), CompileError> {
        let loc = self.loc();
        match &self.current().kind {
            TokenKind::Name(n) => {
                let n = n.clone();
                self.advance();
                Ok((n, loc))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_newline(&mut self) -> Result<(), CompileError> {
        match self.current().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn mk(&mut self, kind: ExprKind, loc: Loc) -> Expr {
        let id = self.next_expr_id;
        self.next_expr_id += 1;
        Expr { id, kind, loc }
    }

    // ------------------------------------------------------------------
    // statements

    /// Parse one source line (or one compound statement), appending the
    /// resulting statements. Simple statements may share a line separated
    /// by semicolons, which is why this appends instead of returning.
    fn parse_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), CompileError> {
        let loc = self.loc();
        if self.check_kw("def") {
            out.push(Stmt::FunctionDef(self.parse_function_def()?));
            return Ok(());
        }
        if self.check_kw("import") {
            out.push(self.parse_import()?);
            return Ok(());
        }
        if self.check_kw("from") {
            out.push(self.parse_import_from()?);
            return Ok(());
        }
        if self.check_kw("if") {
            out.push(self.parse_if()?);
            return Ok(());
        }
        if self.check_kw("while") {
            self.advance();
            let test = self.parse_expr()?;
            let body = self.parse_block()?;
            out.push(Stmt::While { test, body, loc });
            return Ok(());
        }
        if self.check_kw("for") {
            self.advance();
            let (var, _) = self.expect_name("loop variable")?;
            if !self.eat_kw("in") {
                return Err(self.unexpected("'in'"));
            }
            let iter = self.parse_expr()?;
            let body = self.parse_block()?;
            out.push(Stmt::For { var, iter, body, loc });
            return Ok(());
        }
        if self.check_kw("try") {
            out.push(self.parse_try()?);
            return Ok(());
        }
        if let TokenKind::Name(n) = &self.current().kind {
            if n == "class" {
                return Err(self.error("class definitions are outside the supported subset", "a statement"));
            }
        }
        out.push(self.parse_simple_statement()?);
        while self.eat_op(";") {
            if matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof) {
                break;
            }
            out.push(self.parse_simple_statement()?);
        }
        self.expect_newline()
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        if self.eat_kw("return") {
            if matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof) || self.check_op(";") {
                return Ok(Stmt::Return { value: None, loc });
            }
            let value = self.parse_expr()?;
            return Ok(Stmt::Return { value: Some(value), loc });
        }
        if self.eat_kw("pass") {
            return Ok(Stmt::Pass { loc });
        }
        if self.eat_kw("break") {
            return Ok(Stmt::Break { loc });
        }
        if self.eat_kw("continue") {
            return Ok(Stmt::Continue { loc });
        }

        let expr = self.parse_expr()?;
        let aug = [
            ("+=", BinOpKind::Add),
            ("-=", BinOpKind::Sub),
            ("*=", BinOpKind::Mul),
            ("/=", BinOpKind::Div),
        ]
        .iter()
        .find(|(op, _)| self.check_op(op))
        .map(|(_, kind)| *kind);
        if let Some(op) = aug {
            self.advance();
            let target = self.expr_to_target(expr)?;
            let value = self.parse_expr()?;
            return Ok(Stmt::AugAssign { target, op, value, loc });
        }
        if self.eat_op("=") {
            let target = self.expr_to_target(expr)?;
            let value = self.parse_expr()?;
            if self.check_op("=") {
                return Err(self.error("only single assignment targets are supported", "end of line"));
            }
            return Ok(Stmt::Assign { target, value, loc });
        }
        Ok(Stmt::ExprStmt { value: expr, loc })
    }

    fn expr_to_target(&self, expr: Expr) -> Result<AssignTarget, CompileError> {
        match expr.kind {
            ExprKind::Name(name) => Ok(AssignTarget::Name(name, expr.loc)),
            ExprKind::Subscript { value, index } => match index {
                Index::Single(index) => {
                    Ok(AssignTarget::Subscript { value: *value, index: *index, loc: expr.loc })
                }
                Index::Slice { .. } => Err(CompileError::Parse(
                    Diagnostic::error("parse", "slice assignment is not supported", &self.file, expr.loc)
                        .with_note("expected a name or an indexed element"),
                )),
            },
            _ => Err(CompileError::Parse(
                Diagnostic::error("parse", "invalid assignment target", &self.file, expr.loc)
                    .with_note("expected a name or an indexed element"),
            )),
        }
    }

    fn parse_function_def(&mut self) -> Result<FunctionDef, CompileError> {
        let loc = self.loc();
        self.advance(); // def
        let (name, _) = self.expect_name("function name")?;
        self.expect_op("(")?;
        let mut params = Vec::new();
        while !self.check_op(")") {
            if self.check_op("*") || self.check_op("**") {
                return Err(self.error("starred parameters are not supported", "a parameter name"));
            }
            let (pname, ploc) = self.expect_name("parameter name")?;
            let ann = if self.eat_op(":") { Some(self.parse_type_ann()?) } else { None };
            if self.check_op("=") {
                return Err(self.error("default parameter values are not supported", "',' or ')'"));
            }
            params.push(Param { name: pname, ann, loc: ploc });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        let return_ann = if self.eat_op("->") { Some(self.parse_type_ann()?) } else { None };
        let body = self.parse_block()?;
        for stmt in &body {
            if let Stmt::FunctionDef(inner) = stmt {
                return Err(CompileError::Parse(
                    Diagnostic::error(
                        "parse",
                        format!("nested function definition '{}' is not supported", inner.name),
                        &self.file,
                        inner.loc,
                    )
                    .with_note("expected a statement"),
                ));
            }
        }
        Ok(FunctionDef { name, params, return_ann, body, loc })
    }

    fn parse_type_ann(&mut self) -> Result<TypeAnn, CompileError> {
        let (name, _) = self.expect_name("type name")?;
        if self.eat_op("[") {
            let mut args = Vec::new();
            loop {
                args.push(self.parse_type_ann()?);
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op("]")?;
            return Ok(TypeAnn::Generic(name, args));
        }
        Ok(TypeAnn::Name(name))
    }

    fn parse_dotted_name(&mut self) -> Result<String, CompileError> {
        // `__future__` and friends lex as plain names; modules like
        // `os.path` arrive as name '.' name.
        let (mut name, _) = self.expect_name("module name")?;
        while self.check_op(".") {
            self.advance();
            let (part, _) = self.expect_name("module name")?;
            name.push('.');
            name.push_str(&part);
        }
        Ok(name)
    }

    fn parse_import(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.advance(); // import
        let mut names = vec![self.parse_dotted_name()?];
        while self.eat_op(",") {
            names.push(self.parse_dotted_name()?);
        }
        self.expect_newline()?;
        Ok(Stmt::Import { names, loc })
    }

    fn parse_import_from(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.advance(); // from
        let module = self.parse_dotted_name()?;
        if !self.eat_kw("import") {
            return Err(self.unexpected("'import'"));
        }
        let mut names = Vec::new();
        loop {
            let (n, _) = self.expect_name("imported name")?;
            names.push(n);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_newline()?;
        Ok(Stmt::ImportFrom { module, names, loc })
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.advance(); // if
        let mut branches = Vec::new();
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        branches.push((test, body));
        let mut orelse = Vec::new();
        loop {
            if self.check_kw("elif") {
                self.advance();
                let test = self.parse_expr()?;
                let body = self.parse_block()?;
                branches.push((test, body));
                continue;
            }
            if self.check_kw("else") {
                self.advance();
                orelse = self.parse_block()?;
            }
            break;
        }
        Ok(Stmt::If { branches, orelse, loc })
    }

    fn parse_try(&mut self) -> Result<Stmt, CompileError> {
        let loc = self.loc();
        self.advance(); // try
        let body = self.parse_block()?;
        if !self.check_kw("except") {
            return Err(self.unexpected("'except'"));
        }
        let handler_loc = self.loc();
        self.advance();
        let mut class_name = None;
        let mut bind_name = None;
        if let TokenKind::Name(n) = &self.current().kind {
            class_name = Some(n.clone());
            self.advance();
            if self.eat_kw("as") {
                let (n, _) = self.expect_name("exception binding name")?;
                bind_name = Some(n);
            }
        }
        let handler_body = self.parse_block()?;
        let handler =
            Handler { class_name, bind_name, body: handler_body, loc: handler_loc };
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        if self.check_kw("else") {
            self.advance();
            orelse = self.parse_block()?;
        }
        if self.check_kw("finally") {
            self.advance();
            finalbody = self.parse_block()?;
        }
        Ok(Stmt::Try { body, handler, orelse, finalbody, loc })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect_op(":")?;
        self.expect_newline()?;
        self.skip_newlines();
        if !matches!(self.current().kind, TokenKind::Indent) {
            return Err(self.unexpected("an indented block"));
        }
        self.advance();
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.current().kind, TokenKind::Dedent) {
                self.advance();
                break;
            }
            if self.check_eof() {
                break;
            }
            self.parse_line(&mut body)?;
        }
        if body.is_empty() {
            return Err(self.unexpected("at least one statement"));
        }
        Ok(body)
    }

    // ------------------------------------------------------------------
    // expressions, lowest precedence first

    pub fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let body = self.parse_or()?;
        if self.check_kw("if") {
            self.advance();
            let test = self.parse_or()?;
            if !self.eat_kw("else") {
                return Err(self.unexpected("'else'"));
            }
            let orelse = self.parse_expr()?;
            return Ok(self.mk(
                ExprKind::IfExp {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
                loc,
            ));
        }
        Ok(body)
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let mut left = self.parse_and()?;
        while self.eat_kw("or") {
            let right = self.parse_and()?;
            left = self.mk(
                ExprKind::BoolOp { op: BoolOpKind::Or, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let mut left = self.parse_not()?;
        while self.eat_kw("and") {
            let right = self.parse_not()?;
            left = self.mk(
                ExprKind::BoolOp { op: BoolOpKind::And, left: Box::new(left), right: Box::new(right) },
                loc,
            );
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        if self.eat_kw("not") {
            let operand = self.parse_not()?;
            return Ok(self.mk(ExprKind::UnaryOp { op: UnaryOpKind::Not, operand: Box::new(operand) }, loc));
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOpKind> {
        let op = match &self.current().kind {
            TokenKind::Op("==") => CmpOpKind::Eq,
            TokenKind::Op("!=") => CmpOpKind::NotEq,
            TokenKind::Op("<") => CmpOpKind::Lt,
            TokenKind::Op("<=") => CmpOpKind::LtE,
            TokenKind::Op(">") => CmpOpKind::Gt,
            TokenKind::Op(">=") => CmpOpKind::GtE,
            TokenKind::Keyword("in") => CmpOpKind::In,
            TokenKind::Keyword("not") => {
                // `not in` is the only comparison starting with `not`.
                if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Keyword("in"))) {
                    self.advance();
                    CmpOpKind::NotIn
                } else {
                    return None;
                }
            }
            TokenKind::Keyword("is") => {
                if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Keyword("not"))) {
                    self.advance();
                    CmpOpKind::IsNot
                } else {
                    CmpOpKind::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let left = self.parse_arith()?;
        if let Some(op) = self.comparison_op() {
            let right = self.parse_arith()?;
            let node = self.mk(
                ExprKind::Compare { op, left: Box::new(left), right: Box::new(right) },
                loc,
            );
            if self.comparison_op().is_some() {
                return Err(self.error(
                    "comparison chaining is not supported",
                    "'and'/'or' to combine comparisons",
                ));
            }
            return Ok(node);
        }
        Ok(left)
    }

    fn arith_op(&self) -> Option<BinOpKind> {
        match &self.current().kind {
            TokenKind::Op("+") => Some(BinOpKind::Add),
            TokenKind::Op("-") => Some(BinOpKind::Sub),
            _ => None,
        }
    }

    fn term_op(&self) -> Option<BinOpKind> {
        match &self.current().kind {
            TokenKind::Op("*") => Some(BinOpKind::Mul),
            TokenKind::Op("/") => Some(BinOpKind::Div),
            TokenKind::Op("//") => Some(BinOpKind::FloorDiv),
            TokenKind::Op("%") => Some(BinOpKind::Mod),
            _ => None,
        }
    }

    fn parse_arith(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let mut left = self.parse_term()?;
        while let Some(op) = self.arith_op() {
            self.advance();
            let right = self.parse_term()?;
            left = self.mk(ExprKind::BinOp { op, left: Box::new(left), right: Box::new(right) }, loc);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let mut left = self.parse_unary()?;
        while let Some(op) = self.term_op() {
            self.advance();
            let right = self.parse_unary()?;
            left = self.mk(ExprKind::BinOp { op, left: Box::new(left), right: Box::new(right) }, loc);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        if self.eat_op("-") {
            let operand = self.parse_unary()?;
            return Ok(self.mk(ExprKind::UnaryOp { op: UnaryOpKind::Neg, operand: Box::new(operand) }, loc));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        let base = self.parse_postfix()?;
        if self.eat_op("**") {
            let exp = self.parse_unary()?; // right-associative
            return Ok(self.mk(
                ExprKind::BinOp { op: BinOpKind::Pow, left: Box::new(base), right: Box::new(exp) },
                loc,
            ));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_atom()?;
        loop {
            let loc = self.loc();
            if self.eat_op(".") {
                let (attr, _) = self.expect_name("attribute name")?;
                expr = self.mk(ExprKind::Attribute { value: Box::new(expr), attr }, loc);
                continue;
            }
            if self.eat_op("(") {
                let mut args = Vec::new();
                while !self.check_op(")") {
                    if self.check_op("*") || self.check_op("**") {
                        return Err(self.error("starred arguments are not supported", "an expression"));
                    }
                    let arg = self.parse_expr()?;
                    if self.check_op("=") {
                        return Err(self.error("keyword arguments are not supported", "',' or ')'"));
                    }
                    args.push(arg);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op(")")?;
                expr = self.mk(ExprKind::Call { func: Box::new(expr), args }, loc);
                continue;
            }
            if self.eat_op("[") {
                let index = self.parse_index()?;
                self.expect_op("]")?;
                expr = self.mk(ExprKind::Subscript { value: Box::new(expr), index }, loc);
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_index(&mut self) -> Result<Index, CompileError> {
        let lo = if self.check_op(":") { None } else { Some(Box::new(self.parse_expr()?)) };
        if !self.eat_op(":") {
            return match lo {
                Some(e) => Ok(Index::Single(e)),
                None => Err(self.unexpected("an index expression")),
            };
        }
        let hi = if self.check_op(":") || self.check_op("]") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let step = if self.eat_op(":") {
            if self.check_op("]") { None } else { Some(Box::new(self.parse_expr()?)) }
        } else {
            None
        };
        Ok(Index::Slice { lo, hi, step })
    }

    fn parse_atom(&mut self) -> Result<Expr, CompileError> {
        let loc = self.loc();
        match self.current().kind.clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(self.mk(ExprKind::Int(n), loc))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(self.mk(ExprKind::Float(f), loc))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(self.mk(ExprKind::Str(s), loc))
            }
            TokenKind::Bytes(b) => {
                self.advance();
                Ok(self.mk(ExprKind::Bytes(b), loc))
            }
            TokenKind::FStr(raw) => {
                self.advance();
                let parts = self.parse_fstring_parts(&raw, loc)?;
                Ok(self.mk(ExprKind::FString(parts), loc))
            }
            TokenKind::Keyword("True") => {
                self.advance();
                Ok(self.mk(ExprKind::Bool(true), loc))
            }
            TokenKind::Keyword("False") => {
                self.advance();
                Ok(self.mk(ExprKind::Bool(false), loc))
            }
            TokenKind::Keyword("None") => {
                self.advance();
                Ok(self.mk(ExprKind::NoneLit, loc))
            }
            TokenKind::Name(name) => {
                if name == "lambda" {
                    return Err(self.error("lambdas are not supported", "an expression"));
                }
                if name == "yield" || name == "await" || name == "async" {
                    return Err(self.error(
                        format!("'{}' is outside the supported subset", name),
                        "an expression",
                    ));
                }
                self.advance();
                Ok(self.mk(ExprKind::Name(name), loc))
            }
            TokenKind::Op("(") => {
                self.advance();
                if self.eat_op(")") {
                    return Ok(self.mk(ExprKind::Tuple(vec![]), loc));
                }
                let first = self.parse_expr()?;
                if self.eat_op(",") {
                    let mut items = vec![first];
                    while !self.check_op(")") {
                        items.push(self.parse_expr()?);
                        if !self.eat_op(",") {
                            break;
                        }
                    }
                    self.expect_op(")")?;
                    return Ok(self.mk(ExprKind::Tuple(items), loc));
                }
                self.expect_op(")")?;
                Ok(first)
            }
            TokenKind::Op("[") => {
                self.advance();
                if self.eat_op("]") {
                    return Ok(self.mk(ExprKind::List(vec![]), loc));
                }
                let first = self.parse_expr()?;
                if self.check_kw("for") {
                    let (var, iter, cond) = self.parse_comp_clause()?;
                    self.expect_op("]")?;
                    return Ok(self.mk(
                        ExprKind::ListComp { elt: Box::new(first), var, iter: Box::new(iter), cond },
                        loc,
                    ));
                }
                let mut items = vec![first];
                while self.eat_op(",") {
                    if self.check_op("]") {
                        break;
                    }
                    items.push(self.parse_expr()?);
                }
                self.expect_op("]")?;
                Ok(self.mk(ExprKind::List(items), loc))
            }
            TokenKind::Op("{") => {
                self.advance();
                if self.eat_op("}") {
                    return Ok(self.mk(ExprKind::Dict(vec![]), loc));
                }
                let first = self.parse_expr()?;
                if self.eat_op(":") {
                    let value = self.parse_expr()?;
                    if self.check_kw("for") {
                        let (var, iter, cond) = self.parse_comp_clause()?;
                        self.expect_op("}")?;
                        return Ok(self.mk(
                            ExprKind::DictComp {
                                key: Box::new(first),
                                value: Box::new(value),
                                var,
                                iter: Box::new(iter),
                                cond,
                            },
                            loc,
                        ));
                    }
                    let mut items = vec![(first, value)];
                    while self.eat_op(",") {
                        if self.check_op("}") {
                            break;
                        }
                        let k = self.parse_expr()?;
                        self.expect_op(":")?;
                        let v = self.parse_expr()?;
                        items.push((k, v));
                    }
                    self.expect_op("}")?;
                    return Ok(self.mk(ExprKind::Dict(items), loc));
                }
                if self.check_kw("for") {
                    let (var, iter, cond) = self.parse_comp_clause()?;
                    self.expect_op("}")?;
                    return Ok(self.mk(
                        ExprKind::SetComp { elt: Box::new(first), var, iter: Box::new(iter), cond },
                        loc,
                    ));
                }
                let mut items = vec![first];
                while self.eat_op(",") {
                    if self.check_op("}") {
                        break;
                    }
                    items.push(self.parse_expr()?);
                }
                self.expect_op("}")?;
                Ok(self.mk(ExprKind::Set(items), loc))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `for NAME in expr [if expr]` — one source, one optional filter.
    fn parse_comp_clause(&mut self) -> Result<(String, Expr, Option<Box<Expr>>), CompileError> {
        self.advance(); // for
        let (var, _) = self.expect_name("comprehension variable")?;
        if !self.eat_kw("in") {
            return Err(self.unexpected("'in'"));
        }
        let iter = self.parse_or()?;
        let cond = if self.eat_kw("if") { Some(Box::new(self.parse_or()?)) } else { None };
        if self.check_kw("for") {
            return Err(self.error(
                "comprehensions over multiple sources are not supported",
                "']' or '}'",
            ));
        }
        Ok((var, iter, cond))
    }

    /// Split `text={expr}!` into literal and expression segments. `{{` and
    /// `}}` are brace escapes.
    fn parse_fstring_parts(&mut self, raw: &str, loc: Loc) -> Result<Vec<FStringPart>, CompileError> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    if !text.is_empty() {
                        parts.push(FStringPart::Text(std::mem::take(&mut text)));
                    }
                    let mut inner = String::new();
                    let mut depth = 1;
                    for c in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        inner.push(c);
                    }
                    if depth != 0 {
                        return Err(CompileError::Parse(
                            Diagnostic::error("parse", "unterminated '{' in f-string", &self.file, loc)
                                .with_note("expected '}'"),
                        ));
                    }
                    let expr = self.parse_fragment(&inner, loc)?;
                    parts.push(FStringPart::Expr(Box::new(expr)));
                }
                '}' => {
                    return Err(CompileError::Parse(
                        Diagnostic::error("parse", "single '}' in f-string", &self.file, loc)
                            .with_note("expected '}}' to emit a literal brace"),
                    ))
                }
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            parts.push(FStringPart::Text(text));
        }
        Ok(parts)
    }

    /// Parse an embedded f-string expression, keeping expression ids
    /// unique across the whole module.
    fn parse_fragment(&mut self, text: &str, loc: Loc) -> Result<Expr, CompileError> {
        let tokens = tokenize(text, &self.file).map_err(|_| {
            CompileError::Parse(
                Diagnostic::error("parse", "invalid expression in f-string", &self.file, loc)
                    .with_note("expected an expression"),
            )
        })?;
        let mut sub = Parser {
            tokens,
            pos: 0,
            file: self.file.clone(),
            next_expr_id: self.next_expr_id,
        };
        let expr = sub.parse_expr()?;
        if !matches!(sub.current().kind, TokenKind::Newline | TokenKind::Eof) {
            return Err(CompileError::Parse(
                Diagnostic::error("parse", "trailing tokens in f-string expression", &self.file, loc)
                    .with_note("expected '}'"),
            ));
        }
        self.next_expr_id = sub.next_expr_id;
        Ok(expr)
    }
}

/// Parse a whole source file.
pub fn parse(source: &str, file: &Path) -> Result<Module, CompileError> {
    Parser::new(source, file)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_ok(source: &str) -> Module {
        parse(source, &PathBuf::from("test.py")).unwrap()
    }

    fn parse_err(source: &str) -> String {
        match parse(source, &PathBuf::from("test.py")) {
            Err(CompileError::Parse(d)) => d.message,
            Err(CompileError::Lex(d)) => panic!("lex error instead of parse error: {}", d.message),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn function_with_annotations() {
        let m = parse_ok("def main() -> int:\n    return 0\n");
        let f = m.find_function("main").unwrap();
        assert_eq!(f.return_ann, Some(TypeAnn::Name("int".into())));
        assert!(matches!(f.body[0], Stmt::Return { .. }));
    }

    #[test]
    fn imports() {
        let m = parse_ok("import io, os\nfrom json import dumps\nimport os.path\n");
        assert!(matches!(&m.body[0], Stmt::Import { names, .. } if names == &vec!["io".to_string(), "os".to_string()]));
        assert!(matches!(&m.body[1], Stmt::ImportFrom { module, .. } if module == "json"));
        assert!(matches!(&m.body[2], Stmt::Import { names, .. } if names == &vec!["os.path".to_string()]));
    }

    #[test]
    fn if_elif_else() {
        let m = parse_ok("def f() -> int:\n    if a:\n        x = 1\n    elif b:\n        x = 2\n    else:\n        x = 3\n    return x\n");
        let f = m.find_function("f").unwrap();
        let Stmt::If { branches, orelse, .. } = &f.body[0] else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn try_except_else_finally() {
        let m = parse_ok(
            "def f() -> int:\n    try:\n        x = 1\n    except Exception as e:\n        x = 2\n    else:\n        x = x + 1\n    finally:\n        y = 4\n    return x\n",
        );
        let f = m.find_function("f").unwrap();
        let Stmt::Try { handler, orelse, finalbody, .. } = &f.body[0] else {
            panic!("expected try");
        };
        assert_eq!(handler.class_name.as_deref(), Some("Exception"));
        assert_eq!(handler.bind_name.as_deref(), Some("e"));
        assert_eq!(orelse.len(), 1);
        assert_eq!(finalbody.len(), 1);
    }

    #[test]
    fn comprehensions() {
        let m = parse_ok(
            "def f() -> int:\n    a = [x for x in xs if True]\n    b = {x for x in xs}\n    c = {x: x for x in xs}\n    return 0\n",
        );
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { value, .. } = &f.body[0] else { panic!() };
        assert!(matches!(value.kind, ExprKind::ListComp { .. }));
        let Stmt::Assign { value, .. } = &f.body[1] else { panic!() };
        assert!(matches!(value.kind, ExprKind::SetComp { .. }));
        let Stmt::Assign { value, .. } = &f.body[2] else { panic!() };
        assert!(matches!(value.kind, ExprKind::DictComp { .. }));
    }

    #[test]
    fn conditional_expression() {
        let m = parse_ok("def f() -> int:\n    return 0 if ok else 1\n");
        let f = m.find_function("f").unwrap();
        let Stmt::Return { value: Some(v), .. } = &f.body[0] else { panic!() };
        assert!(matches!(v.kind, ExprKind::IfExp { .. }));
    }

    #[test]
    fn slices() {
        let m = parse_ok("def f() -> int:\n    a = xs[1]\n    b = xs[1:3]\n    c = xs[::2]\n    return 0\n");
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { value, .. } = &f.body[1] else { panic!() };
        let ExprKind::Subscript { index: Index::Slice { lo, hi, step }, .. } = &value.kind else {
            panic!("expected slice")
        };
        assert!(lo.is_some() && hi.is_some() && step.is_none());
    }

    #[test]
    fn chained_comparison_rejected() {
        let msg = parse_err("def f() -> int:\n    return a < b < c\n");
        assert!(msg.contains("chaining"));
    }

    #[test]
    fn nested_def_rejected() {
        let msg = parse_err("def f() -> int:\n    def g() -> int:\n        return 1\n    return 0\n");
        assert!(msg.contains("nested function"));
    }

    #[test]
    fn lambda_rejected() {
        let msg = parse_err("def f() -> int:\n    g = lambda x: x\n    return 0\n");
        assert!(msg.contains("lambda"));
    }

    #[test]
    fn keyword_arguments_rejected() {
        let msg = parse_err("def f() -> int:\n    g(x=1)\n    return 0\n");
        assert!(msg.contains("keyword arguments"));
    }

    #[test]
    fn semicolon_statements() {
        let m = parse_ok("def f() -> int:\n    a = 1; b = 2\n    return a\n");
        let f = m.find_function("f").unwrap();
        assert_eq!(f.body.len(), 3);
        assert!(matches!(f.body[0], Stmt::Assign { .. }));
        assert!(matches!(f.body[1], Stmt::Assign { .. }));
    }

    #[test]
    fn fstring_parts() {
        let m = parse_ok("def f() -> int:\n    s = f'a{x}b{{c}}'\n    return 0\n");
        let f = m.find_function("f").unwrap();
        let Stmt::Assign { value, .. } = &f.body[0] else { panic!() };
        let ExprKind::FString(parts) = &value.kind else { panic!("expected f-string") };
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], FStringPart::Text(t) if t == "a"));
        assert!(matches!(&parts[1], FStringPart::Expr(_)));
        assert!(matches!(&parts[2], FStringPart::Text(t) if t == "b{c}"));
    }

    #[test]
    fn expr_ids_are_unique() {
        let m = parse_ok("def f() -> int:\n    a = 1 + 2\n    b = f'{a}'\n    return a\n");
        let mut ids = Vec::new();
        fn collect(e: &Expr, ids: &mut Vec<usize>) {
            ids.push(e.id);
            match &e.kind {
                ExprKind::BinOp { left, right, .. } => {
                    collect(left, ids);
                    collect(right, ids);
                }
                ExprKind::FString(parts) => {
                    for p in parts {
                        if let FStringPart::Expr(e) = p {
                            collect(e, ids);
                        }
                    }
                }
                _ => {}
            }
        }
        let f = m.find_function("f").unwrap();
        for s in &f.body {
            match s {
                Stmt::Assign { value, .. } => collect(value, &mut ids),
                Stmt::Return { value: Some(v), .. } => collect(v, &mut ids),
                _ => {}
            }
        }
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len(), "duplicate expression ids: {:?}", ids);
    }
}
