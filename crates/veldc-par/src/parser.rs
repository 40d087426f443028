//! Recursive-descent parser for the Veld language.
//!
//! Consumes the final token stream (indentation already resolved into
//! INDENT/DEDENT tokens) and produces the AST. Like the rest of the
//! front end it is fail-fast: the first syntax error aborts the parse.

use veldc_lex::{Keyword, Operator, Token, TokenKind};
use veldc_util::{fail, CompileResult, Location};

use crate::ast::{
    AstExpression, AstExpressionKind, AstSignature, AstStatement, AstStatementKind, AstToplevel,
    AstToplevelKind, AstType, BinaryOp, Constant, ConditionalBranch, ExprId,
};

/// Parses a whole source file into its top-level declarations.
pub fn parse(tokens: &[Token]) -> CompileResult<Vec<AstToplevel>> {
    Parser::new(tokens).parse_file()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    next_expr_id: u32,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| &t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            pos: 0,
            next_expr_id: 0,
        }
    }

    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_ahead(&self, n: usize) -> &'a Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    /// Consumes the current token. Never walks past the final EOF.
    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn unexpected<T>(&self, expected: &str) -> CompileResult<T> {
        let token = self.peek();
        fail!(
            token.location.clone(),
            "expected {}, got {}",
            expected,
            token.kind.describe()
        );
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if self.peek().kind == TokenKind::Operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, op: Operator) -> CompileResult<&'a Token> {
        if self.peek().kind == TokenKind::Operator(op) {
            Ok(self.advance())
        } else {
            self.unexpected(&format!("'{op}'"))
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.peek().kind == TokenKind::Keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_name(&mut self, expected: &str) -> CompileResult<(String, Location)> {
        match &self.peek().kind {
            TokenKind::Name(name) => {
                let name = name.clone();
                let location = self.advance().location.clone();
                Ok((name, location))
            }
            _ => self.unexpected(expected),
        }
    }

    fn expect_newline(&mut self) -> CompileResult<()> {
        if matches!(self.peek().kind, TokenKind::Newline(_)) {
            self.advance();
            Ok(())
        } else {
            self.unexpected("end of line")
        }
    }

    fn expr(&mut self, location: Location, kind: AstExpressionKind) -> AstExpression {
        let id = ExprId(self.next_expr_id);
        self.next_expr_id += 1;
        AstExpression { id, location, kind }
    }

    // ======================== top level ========================

    fn parse_file(&mut self) -> CompileResult<Vec<AstToplevel>> {
        let mut toplevels = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            toplevels.push(self.parse_toplevel()?);
        }
        Ok(toplevels)
    }

    fn parse_toplevel(&mut self) -> CompileResult<AstToplevel> {
        let location = self.peek().location.clone();
        let kind = match self.peek().kind {
            TokenKind::Keyword(Keyword::Def) => {
                self.advance();
                let signature = self.parse_signature()?;
                let body = self.parse_block()?;
                AstToplevelKind::DefineFunction { signature, body }
            }
            TokenKind::Keyword(Keyword::Declare) => {
                self.advance();
                let signature = self.parse_signature()?;
                self.expect_newline()?;
                AstToplevelKind::DeclareFunction(signature)
            }
            TokenKind::Keyword(Keyword::Struct) => {
                let (name, fields) = self.parse_struct_def()?;
                AstToplevelKind::DefineStruct { name, fields }
            }
            _ => return self.unexpected("a toplevel declaration"),
        };
        Ok(AstToplevel { location, kind })
    }

    fn parse_signature(&mut self) -> CompileResult<AstSignature> {
        let (name, location) = self.expect_name("a function name")?;
        self.expect_operator(Operator::LParen)?;

        let mut args = Vec::new();
        let mut takes_varargs = false;
        if !self.eat_operator(Operator::RParen) {
            loop {
                if self.eat_operator(Operator::Ellipsis) {
                    takes_varargs = true;
                    self.expect_operator(Operator::RParen)?;
                    break;
                }
                let (argname, _) = self.expect_name("an argument name")?;
                self.expect_operator(Operator::Colon)?;
                let ty = self.parse_type()?;
                args.push((argname, ty));
                if self.eat_operator(Operator::Comma) {
                    continue;
                }
                self.expect_operator(Operator::RParen)?;
                break;
            }
        }

        self.expect_operator(Operator::Arrow)?;
        let return_type = self.parse_type()?;
        Ok(AstSignature {
            name,
            location,
            args,
            takes_varargs,
            return_type,
        })
    }

    fn parse_struct_def(&mut self) -> CompileResult<(String, Vec<(String, AstType)>)> {
        self.advance(); // the `struct` keyword
        let (name, _) = self.expect_name("a struct name")?;
        self.expect_operator(Operator::Colon)?;
        self.expect_newline()?;
        if self.peek().kind != TokenKind::Indent {
            return self.unexpected("an indented list of struct fields");
        }
        self.advance();

        let mut fields = Vec::new();
        while self.peek().kind != TokenKind::Dedent {
            let (field_name, _) = self.expect_name("a field name")?;
            self.expect_operator(Operator::Colon)?;
            let ty = self.parse_type()?;
            self.expect_newline()?;
            fields.push((field_name, ty));
        }
        self.advance(); // the dedent
        Ok((name, fields))
    }

    /// A type is a base name followed by any number of `*`s. `void` is
    /// accepted here; the type checker rejects it where it cannot be
    /// used.
    fn parse_type(&mut self) -> CompileResult<AstType> {
        let token = self.peek();
        let name = match &token.kind {
            TokenKind::Keyword(Keyword::Int) => "int".to_string(),
            TokenKind::Keyword(Keyword::Byte) => "byte".to_string(),
            TokenKind::Keyword(Keyword::Bool) => "bool".to_string(),
            TokenKind::Keyword(Keyword::Void) => "void".to_string(),
            TokenKind::Name(name) => name.clone(),
            _ => return self.unexpected("a type"),
        };
        let location = token.location.clone();
        self.advance();

        let mut pointer_depth = 0;
        while self.eat_operator(Operator::Star) {
            pointer_depth += 1;
        }
        Ok(AstType {
            name,
            pointer_depth,
            location,
        })
    }

    // ======================== statements ========================

    /// `":" NEWLINE INDENT statement+ DEDENT`
    fn parse_block(&mut self) -> CompileResult<Vec<AstStatement>> {
        self.expect_operator(Operator::Colon)?;
        self.expect_newline()?;
        if self.peek().kind != TokenKind::Indent {
            return self.unexpected("an indented block");
        }
        self.advance();

        let mut body = Vec::new();
        while self.peek().kind != TokenKind::Dedent {
            body.push(self.parse_statement()?);
        }
        self.advance(); // the dedent
        Ok(body)
    }

    fn parse_statement(&mut self) -> CompileResult<AstStatement> {
        let location = self.peek().location.clone();
        let kind = match self.peek().kind {
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                if matches!(self.peek().kind, TokenKind::Newline(_)) {
                    self.advance();
                    AstStatementKind::ReturnWithoutValue
                } else {
                    let value = self.parse_expression()?;
                    self.expect_newline()?;
                    AstStatementKind::ReturnValue(value)
                }
            }
            TokenKind::Keyword(Keyword::If) => {
                self.advance();
                let mut if_and_elifs = vec![ConditionalBranch {
                    condition: self.parse_expression()?,
                    body: self.parse_block()?,
                }];
                while self.eat_keyword(Keyword::Elif) {
                    if_and_elifs.push(ConditionalBranch {
                        condition: self.parse_expression()?,
                        body: self.parse_block()?,
                    });
                }
                let else_body = if self.eat_keyword(Keyword::Else) {
                    self.parse_block()?
                } else {
                    Vec::new()
                };
                AstStatementKind::If {
                    if_and_elifs,
                    else_body,
                }
            }
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                AstStatementKind::While { condition, body }
            }
            TokenKind::Keyword(Keyword::For) => {
                self.advance();
                let init = Box::new(self.parse_oneline_statement()?);
                self.expect_operator(Operator::Semicolon)?;
                let condition = self.parse_expression()?;
                self.expect_operator(Operator::Semicolon)?;
                let increment = Box::new(self.parse_oneline_statement()?);
                let body = self.parse_block()?;
                AstStatementKind::For {
                    init,
                    condition,
                    increment,
                    body,
                }
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.expect_newline()?;
                AstStatementKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect_newline()?;
                AstStatementKind::Continue
            }
            _ => {
                let statement = self.parse_oneline_statement()?;
                self.expect_newline()?;
                return Ok(statement);
            }
        };
        Ok(AstStatement { location, kind })
    }

    /// A statement that fits on one line without its trailing newline:
    /// a local variable declaration, an assignment, or an expression.
    /// Used directly for the init and increment parts of `for`.
    fn parse_oneline_statement(&mut self) -> CompileResult<AstStatement> {
        let location = self.peek().location.clone();

        // `name: type [= value]` declares a local variable.
        if let TokenKind::Name(name) = &self.peek().kind {
            if self.peek_ahead(1).kind == TokenKind::Operator(Operator::Colon) {
                let name = name.clone();
                self.advance();
                self.advance();
                let ty = self.parse_type()?;
                let initial_value = if self.eat_operator(Operator::Assign) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                return Ok(AstStatement {
                    location,
                    kind: AstStatementKind::DeclareLocalVar {
                        name,
                        ty,
                        initial_value,
                    },
                });
            }
        }

        let target = self.parse_expression()?;
        let kind = if self.eat_operator(Operator::Assign) {
            let value = self.parse_expression()?;
            AstStatementKind::Assign { target, value }
        } else {
            AstStatementKind::ExpressionStatement(target)
        };
        Ok(AstStatement { location, kind })
    }

    // ======================== expressions ========================

    fn parse_expression(&mut self) -> CompileResult<AstExpression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> CompileResult<AstExpression> {
        let mut lhs = self.parse_and()?;
        while self.peek().kind == TokenKind::Keyword(Keyword::Or) {
            let location = self.advance().location.clone();
            let rhs = self.parse_and()?;
            lhs = self.expr(location, AstExpressionKind::Or(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> CompileResult<AstExpression> {
        let mut lhs = self.parse_not()?;
        while self.peek().kind == TokenKind::Keyword(Keyword::And) {
            let location = self.advance().location.clone();
            let rhs = self.parse_not()?;
            lhs = self.expr(
                location,
                AstExpressionKind::And(Box::new(lhs), Box::new(rhs)),
            );
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> CompileResult<AstExpression> {
        if self.peek().kind == TokenKind::Keyword(Keyword::Not) {
            let location = self.advance().location.clone();
            let operand = self.parse_not()?;
            return Ok(self.expr(location, AstExpressionKind::Not(Box::new(operand))));
        }
        self.parse_comparison()
    }

    fn comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Operator(Operator::EqEq) => Some(BinaryOp::Eq),
            TokenKind::Operator(Operator::NotEq) => Some(BinaryOp::Ne),
            TokenKind::Operator(Operator::Greater) => Some(BinaryOp::Gt),
            TokenKind::Operator(Operator::GreaterEq) => Some(BinaryOp::Ge),
            TokenKind::Operator(Operator::Less) => Some(BinaryOp::Lt),
            TokenKind::Operator(Operator::LessEq) => Some(BinaryOp::Le),
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> CompileResult<AstExpression> {
        let lhs = self.parse_add_sub()?;
        if let Some(op) = Self::comparison_op(&self.peek().kind) {
            let location = self.advance().location.clone();
            let rhs = self.parse_add_sub()?;
            if Self::comparison_op(&self.peek().kind).is_some() {
                fail!(
                    self.peek().location.clone(),
                    "comparisons cannot be chained"
                );
            }
            return Ok(self.expr(
                location,
                AstExpressionKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            ));
        }
        Ok(lhs)
    }

    fn parse_add_sub(&mut self) -> CompileResult<AstExpression> {
        let mut lhs = self.parse_mul_div()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Operator(Operator::Plus) => BinaryOp::Add,
                TokenKind::Operator(Operator::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let location = self.advance().location.clone();
            let rhs = self.parse_mul_div()?;
            lhs = self.expr(
                location,
                AstExpressionKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
    }

    fn parse_mul_div(&mut self) -> CompileResult<AstExpression> {
        let mut lhs = self.parse_as()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Operator(Operator::Star) => BinaryOp::Mul,
                TokenKind::Operator(Operator::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            let location = self.advance().location.clone();
            let rhs = self.parse_as()?;
            lhs = self.expr(
                location,
                AstExpressionKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            );
        }
    }

    fn parse_as(&mut self) -> CompileResult<AstExpression> {
        let mut expr = self.parse_prefix()?;
        while self.peek().kind == TokenKind::Keyword(Keyword::As) {
            let location = self.advance().location.clone();
            let target = self.parse_type()?;
            expr = self.expr(
                location,
                AstExpressionKind::As {
                    obj: Box::new(expr),
                    target,
                },
            );
        }
        Ok(expr)
    }

    fn parse_prefix(&mut self) -> CompileResult<AstExpression> {
        let ctor: fn(Box<AstExpression>) -> AstExpressionKind = match self.peek().kind {
            TokenKind::Operator(Operator::Ampersand) => AstExpressionKind::AddressOf,
            TokenKind::Operator(Operator::Star) => AstExpressionKind::Dereference,
            TokenKind::Operator(Operator::PlusPlus) => AstExpressionKind::PreIncrement,
            TokenKind::Operator(Operator::MinusMinus) => AstExpressionKind::PreDecrement,
            _ => return self.parse_postfix(),
        };
        let location = self.advance().location.clone();
        let operand = self.parse_prefix()?;
        Ok(self.expr(location, ctor(Box::new(operand))))
    }

    fn parse_postfix(&mut self) -> CompileResult<AstExpression> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek().kind {
                TokenKind::Operator(Operator::Dot) | TokenKind::Operator(Operator::Arrow) => {
                    let deref = self.peek().kind == TokenKind::Operator(Operator::Arrow);
                    let location = self.advance().location.clone();
                    let (field_name, _) = self.expect_name("a field name")?;
                    let obj = Box::new(expr);
                    let kind = if deref {
                        AstExpressionKind::DerefAndGetField { obj, field_name }
                    } else {
                        AstExpressionKind::GetField { obj, field_name }
                    };
                    expr = self.expr(location, kind);
                }
                TokenKind::Operator(Operator::LBracket) => {
                    let location = self.advance().location.clone();
                    let index = self.parse_expression()?;
                    self.expect_operator(Operator::RBracket)?;
                    expr = self.expr(
                        location,
                        AstExpressionKind::Indexing {
                            ptr: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                TokenKind::Operator(Operator::PlusPlus) => {
                    let location = self.advance().location.clone();
                    expr = self.expr(location, AstExpressionKind::PostIncrement(Box::new(expr)));
                }
                TokenKind::Operator(Operator::MinusMinus) => {
                    let location = self.advance().location.clone();
                    expr = self.expr(location, AstExpressionKind::PostDecrement(Box::new(expr)));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_atom(&mut self) -> CompileResult<AstExpression> {
        let token = self.peek();
        let location = token.location.clone();
        let kind = match &token.kind {
            TokenKind::Int(value) => {
                let value = *value;
                self.advance();
                AstExpressionKind::Constant(Constant::Integer {
                    value,
                    width_bits: 32,
                    signed: true,
                })
            }
            TokenKind::Char(c) => {
                let value = i64::from(*c);
                self.advance();
                AstExpressionKind::Constant(Constant::Integer {
                    value,
                    width_bits: 8,
                    signed: false,
                })
            }
            TokenKind::Str(bytes) => {
                let bytes = bytes.clone();
                self.advance();
                AstExpressionKind::Constant(Constant::Str(bytes))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                AstExpressionKind::Constant(Constant::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                AstExpressionKind::Constant(Constant::Bool(false))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                AstExpressionKind::Constant(Constant::Null)
            }
            TokenKind::Name(name) => {
                let name = name.clone();
                self.advance();
                match self.peek().kind {
                    TokenKind::Operator(Operator::LParen) => {
                        self.advance();
                        let args = self.parse_call_args()?;
                        AstExpressionKind::FunctionCall { name, args }
                    }
                    TokenKind::Operator(Operator::LBrace) => {
                        self.advance();
                        let fields = self.parse_brace_init_fields()?;
                        AstExpressionKind::BraceInit {
                            struct_name: name,
                            fields,
                        }
                    }
                    _ => AstExpressionKind::GetVariable(name),
                }
            }
            TokenKind::Operator(Operator::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_operator(Operator::RParen)?;
                return Ok(inner);
            }
            _ => return self.unexpected("an expression"),
        };
        Ok(self.expr(location, kind))
    }

    fn parse_call_args(&mut self) -> CompileResult<Vec<AstExpression>> {
        let mut args = Vec::new();
        if self.eat_operator(Operator::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat_operator(Operator::Comma) {
                continue;
            }
            self.expect_operator(Operator::RParen)?;
            return Ok(args);
        }
    }

    fn parse_brace_init_fields(&mut self) -> CompileResult<Vec<(String, AstExpression)>> {
        let mut fields = Vec::new();
        if self.eat_operator(Operator::RBrace) {
            return Ok(fields);
        }
        loop {
            let (field_name, _) = self.expect_name("a field name")?;
            self.expect_operator(Operator::Assign)?;
            let value = self.parse_expression()?;
            fields.push((field_name, value));
            if self.eat_operator(Operator::Comma) {
                continue;
            }
            self.expect_operator(Operator::RBrace)?;
            return Ok(fields);
        }
    }
}
