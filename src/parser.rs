use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error [{line}:{col}]: {msg}")]
    Error {
        msg: String,
        line: usize,
        col: usize,
    },
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        let tok = self.current();
        ParseError::Error {
            msg: msg.into(),
            line: tok.line,
            col: tok.col,
        }
    }

    fn current(&self) -> &Token {
        if self.pos < self.tokens.len() {
            &self.tokens[self.pos]
        } else {
            self.tokens.last().unwrap()
        }
    }

    fn peek(&self, offset: usize) -> &Token {
        let idx = self.pos + offset;
        if idx < self.tokens.len() {
            &self.tokens[idx]
        } else {
            self.tokens.last().unwrap()
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("{}: found {:?}", msg, self.current().kind)))
        }
    }

    fn expect_ident(&mut self, msg: &str) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!("{}: found {:?}", msg, self.current().kind)))
        }
    }

    /// Returns the type name a type-position token denotes, if any.
    fn current_type_text(&self) -> Option<String> {
        match &self.current().kind {
            TokenKind::Int => Some("int".to_string()),
            TokenKind::FloatKw => Some("float".to_string()),
            TokenKind::Bool => Some("bool".to_string()),
            TokenKind::Void => Some("void".to_string()),
            TokenKind::Ident(name) => Some(name.clone()),
            _ => None,
        }
    }

    fn expect_type(&mut self, msg: &str) -> Result<String, ParseError> {
        match self.current_type_text() {
            Some(ty) => {
                self.advance();
                Ok(ty)
            }
            None => Err(self.error(format!("{}: found {:?}", msg, self.current().kind))),
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();
        loop {
            self.skip_newlines();
            if self.is_eof() {
                break;
            }
            program.functions.push(self.parse_function()?);
        }
        Ok(program)
    }

    // -------------------------------------------------------------------------
    // Functions
    // -------------------------------------------------------------------------

    fn parse_function(&mut self) -> Result<FunctionDecl, ParseError> {
        let mut return_type = "void".to_string();
        if let Some(ty) = self.current_type_text() {
            // An identifier directly followed by '(' is the function name of a
            // header with no explicit return type (defaults to void).
            let ident_is_name = matches!(self.current().kind, TokenKind::Ident(_))
                && matches!(self.peek(1).kind, TokenKind::LParen);
            if !ident_is_name {
                return_type = ty;
                self.advance();
            }
        }

        let name = self.expect_ident("Expected function name")?;
        self.expect(TokenKind::LParen, "Expected '('")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param_type = self.expect_type("Expected parameter type")?;
                let param_name = self.expect_ident("Expected parameter name")?;
                params.push((param_type, param_name));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "Expected ')'")?;

        self.skip_newlines();
        let body = self.parse_block()?;

        Ok(FunctionDecl {
            return_type,
            name,
            params,
            body,
        })
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.skip_newlines();
        match &self.current().kind {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Return => self.parse_return(),
            TokenKind::If | TokenKind::Elif => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Print => self.parse_print(),
            TokenKind::Let => self.parse_var_decl(),
            _ => {
                if self.looks_like_decl() {
                    self.parse_var_decl()
                } else {
                    self.parse_expr_statement()
                }
            }
        }
    }

    /// A leading identifier opens a declaration only when the next token is
    /// also an identifier (`T name`); `x = 1;` stays an expression statement.
    fn looks_like_decl(&self) -> bool {
        match &self.current().kind {
            TokenKind::Ident(_) => matches!(self.peek(1).kind, TokenKind::Ident(_)),
            k => matches!(
                k,
                TokenKind::Int | TokenKind::FloatKw | TokenKind::Bool | TokenKind::Void
            ),
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::LBrace, "Expected '{'")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.current().kind, TokenKind::RBrace | TokenKind::Eof) {
                break;
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "Expected '}'")?;
        Ok(Stmt::Block(stmts))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Return, "Expected 'return'")?;
        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after return")?;
        Ok(Stmt::Return(expr))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        // `elif` opens the same statement shape as `if`
        match &self.current().kind {
            TokenKind::If | TokenKind::Elif => self.advance(),
            _ => return Err(self.error("Expected 'if' or 'elif'")),
        }

        self.expect(TokenKind::LParen, "Expected '(' after condition")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after condition")?;

        let then_branch = Box::new(self.parse_statement()?);

        self.skip_newlines();
        let else_branch = if self.check(&TokenKind::Elif) {
            Some(Box::new(self.parse_if()?))
        } else if self.matches(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::While, "Expected 'while'")?;
        self.expect(TokenKind::LParen, "Expected '(' after 'while'")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after while condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::For, "Expected 'for'")?;
        self.expect(TokenKind::LParen, "Expected '(' after 'for'")?;

        // The for-header owns all three separators; init never consumes ';'
        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if self.check(&TokenKind::Let) || self.looks_like_decl() {
            Some(Box::new(self.parse_var_decl_core()?))
        } else {
            Some(Box::new(Stmt::Expr(self.parse_expression()?)))
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after for-init")?;

        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after for-condition")?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RParen, "Expected ')' after for clauses")?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let decl = self.parse_var_decl_core()?;
        self.expect(TokenKind::Semicolon, "Expected ';' after variable declaration")?;
        Ok(decl)
    }

    /// Both declaration forms, without the trailing ';':
    ///   let name: type = expr
    ///   type name [= expr]
    fn parse_var_decl_core(&mut self) -> Result<Stmt, ParseError> {
        if self.matches(&TokenKind::Let) {
            let name = self.expect_ident("Expected variable name")?;
            self.expect(TokenKind::Colon, "Expected ':' after variable name")?;
            let ty = self.expect_type("Expected type after ':'")?;
            self.expect(TokenKind::Assign, "Expected '=' after type")?;
            let init = self.parse_expression()?;
            Ok(Stmt::VarDecl {
                name,
                ty,
                init: Some(init),
            })
        } else {
            let ty = self.expect_type("Expected type for variable declaration")?;
            let name = self.expect_ident("Expected variable name")?;
            let init = if self.matches(&TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            Ok(Stmt::VarDecl { name, ty, init })
        }
    }

    fn parse_print(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Print, "Expected 'print'")?;
        self.expect(TokenKind::LParen, "Expected '(' after 'print'")?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')'")?;
        self.expect(TokenKind::Semicolon, "Expected ';' after print statement")?;
        Ok(Stmt::Print(expr))
    }

    fn parse_expr_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    // -------------------------------------------------------------------------
    // Expressions, lowest precedence first
    // -------------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_comma()
    }

    fn parse_comma(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_assignment()?;
        if self.matches(&TokenKind::Comma) {
            let right = self.parse_comma()?;
            Ok(Expr::Binary(BinOp::Comma, Box::new(left), Box::new(right)))
        } else {
            Ok(left)
        }
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_logical_or()?;
        if self.matches(&TokenKind::Assign) {
            if let Expr::Ident(name) = left {
                let value = self.parse_assignment()?;
                Ok(Expr::Assign(name, Box::new(value)))
            } else {
                Err(self.error("Invalid assignment target"))
            }
        } else {
            Ok(left)
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.matches(&TokenKind::OrOr) {
            let right = self.parse_logical_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.matches(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Neq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Lte => BinOp::Le,
                TokenKind::Gte => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match &self.current().kind {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            Ok(Expr::Unary(op, Box::new(operand)))
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(&TokenKind::LParen) {
                let args = self.parse_args()?;
                self.expect(TokenKind::RParen, "Expected ')' after arguments")?;
                if let Expr::Ident(name) = expr {
                    expr = Expr::Call(name, args);
                } else {
                    return Err(self.error("Invalid function call"));
                }
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Comma-separated argument list; the caller consumed '(' and consumes ')'.
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let expr = match &self.current().kind {
            TokenKind::True => {
                self.advance();
                Expr::Literal(LitKind::Bool, "1".to_string())
            }
            TokenKind::False => {
                self.advance();
                Expr::Literal(LitKind::Bool, "0".to_string())
            }
            TokenKind::Integer(text) => {
                let text = text.clone();
                self.advance();
                Expr::Literal(LitKind::Int, text)
            }
            TokenKind::Float(text) => {
                let text = text.clone();
                self.advance();
                Expr::Literal(LitKind::Float, text)
            }
            TokenKind::Str(text) => {
                let text = text.clone();
                self.advance();
                Expr::Literal(LitKind::Str, text)
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Expr::Ident(name)
            }
            TokenKind::Input => {
                self.advance();
                Expr::Input(self.parse_optional_prompt()?)
            }
            TokenKind::KeyPressed => {
                self.advance();
                Expr::KeyPressed(self.parse_optional_prompt()?)
            }
            TokenKind::Screen => self.builtin_call("screen")?,
            TokenKind::ClearScreen => self.builtin_call("clearScreen")?,
            TokenKind::DrawPixel => self.builtin_call("drawPixel")?,
            TokenKind::DrawRect => self.builtin_call("drawRect")?,
            TokenKind::DrawLine => self.builtin_call("drawLine")?,
            TokenKind::DrawCircle => self.builtin_call("drawCircle")?,
            TokenKind::Display => self.builtin_call("display")?,
            TokenKind::Quit => self.builtin_call("quit")?,
            TokenKind::IsKeyDown => self.builtin_call("isKeyDown")?,
            TokenKind::UpdateInput => self.builtin_call("updateInput")?,
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "Expected ')'")?;
                expr
            }
            other => {
                return Err(self.error(format!("Unexpected token in expression: {:?}", other)));
            }
        };
        Ok(expr)
    }

    /// `input` / `key_pressed` accept a bare form, `()`, or `(<expr>)`.
    fn parse_optional_prompt(&mut self) -> Result<Option<Box<Expr>>, ParseError> {
        if self.matches(&TokenKind::LParen) {
            let prompt = if self.check(&TokenKind::RParen) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(TokenKind::RParen, "Expected ')'")?;
            Ok(prompt)
        } else {
            Ok(None)
        }
    }

    /// Builtin keywords parse as calls with their canonical name; the bare
    /// keyword form (no parentheses) yields an empty argument list.
    fn builtin_call(&mut self, name: &str) -> Result<Expr, ParseError> {
        self.advance();
        let mut args = Vec::new();
        if self.matches(&TokenKind::LParen) {
            args = self.parse_args()?;
            self.expect(TokenKind::RParen, "Expected ')'")?;
        }
        Ok(Expr::Call(name.to_string(), args))
    }
}
