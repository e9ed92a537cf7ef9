use crate::expr::{Expr, Stmt};
use crate::scanner::{Literal, Token, TokenType, TokenType::*};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct StaticError {
    token: Token,
    msg: String,
}

impl Display for StaticError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.token.token_type == EOF {
            write!(f, "[line {}] Error at end: {}", self.token.line, self.msg)
        } else {
            write!(
                f,
                "[line {}] Error at '{}': {}",
                self.token.line, self.token.lexeme, self.msg
            )
        }
    }
}

impl Error for StaticError {}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<StaticError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            errors: vec![],
        }
    }

    /// Parses the token stream into statements, collecting every syntax
    /// error along the way. A failed declaration is dropped and parsing
    /// resumes at the next statement boundary.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<StaticError>) {
        let mut stmts = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        (stmts, self.errors)
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let res = if self.match_(vec![FUN]) {
            self.function("function")
        } else if self.match_(vec![VAR]) {
            self.var_declaration()
        } else {
            self.statement()
        };
        match res {
            Ok(stmt) => Some(stmt),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, StaticError> {
        if self.match_(vec![FOR]) {
            self.for_statement()
        } else if self.match_(vec![IF]) {
            self.if_statement()
        } else if self.match_(vec![PRINT]) {
            self.print_statement()
        } else if self.match_(vec![RETURN]) {
            self.return_statement()
        } else if self.match_(vec![WHILE]) {
            self.while_statement()
        } else if self.match_(vec![LeftBrace]) {
            Ok(Stmt::Block {
                statements: self.block()?,
            })
        } else {
            self.expression_statement()
        }
    }

    fn return_statement(&mut self) -> Result<Stmt, StaticError> {
        let keyword = self.previous().clone();
        let value = if !self.check(&SEMICOLON) {
            Some(*self.expression()?)
        } else {
            None
        };
        self.consume(SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn for_statement(&mut self) -> Result<Stmt, StaticError> {
        self.consume(LeftParen, "Expect '(' after 'for'.")?;
        let init: Option<Stmt> = if self.match_(vec![SEMICOLON]) {
            None
        } else if self.match_(vec![VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };
        let condition = if !self.check(&SEMICOLON) {
            Some(*self.expression()?)
        } else {
            None
        };
        self.consume(SEMICOLON, "Expect ';' after loop condition.")?;
        let increment = if !self.check(&RightParen) {
            Some(*self.expression()?)
        } else {
            None
        };
        self.consume(RightParen, "Expect ')' after for clauses.")?;
        let mut body = self.statement()?;

        // Lower to the equivalent while loop.
        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![body, Stmt::Expression(increment)],
            }
        }
        body = Stmt::While {
            condition: condition.unwrap_or(Expr::LiteralNode(Literal::Boolean(true))),
            body: Box::new(body),
        };
        if let Some(init) = init {
            body = Stmt::Block {
                statements: vec![init, body],
            }
        }
        Ok(body)
    }

    fn while_statement(&mut self) -> Result<Stmt, StaticError> {
        self.consume(LeftParen, "Expect '(' after 'while'.")?;
        let condition = *self.expression()?;
        self.consume(RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn if_statement(&mut self) -> Result<Stmt, StaticError> {
        self.consume(LeftParen, "Expect '(' after 'if'.")?;
        let condition = *self.expression()?;
        self.consume(RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_(vec![ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>, StaticError> {
        let mut statements = vec![];
        while !self.check(&RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn function(&mut self, kind: &str) -> Result<Stmt, StaticError> {
        let name = self.consume(IDENTIFIER, &format!("Expect {} name.", kind))?;
        self.consume(LeftParen, &format!("Expect '(' after {} name.", kind))?;
        let mut params = vec![];
        if !self.check(&RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.error(token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(IDENTIFIER, "Expect parameter name.")?);
                if !self.match_(vec![COMMA]) {
                    break;
                }
            }
        }
        self.consume(RightParen, "Expect ')' after parameters.")?;
        self.consume(LeftBrace, &format!("Expect '{{' before {} body.", kind))?;
        let body = self.block()?;
        Ok(Stmt::Function { name, params, body })
    }

    fn var_declaration(&mut self) -> Result<Stmt, StaticError> {
        let name = self.consume(IDENTIFIER, "Expect variable name.")?;
        let initializer = if self.match_(vec![EQUAL]) {
            Some(*self.expression()?)
        } else {
            None
        };
        self.consume(SEMICOLON, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn print_statement(&mut self) -> Result<Stmt, StaticError> {
        let expr = self.expression()?;
        self.consume(SEMICOLON, "Expect ';' after value.")?;
        Ok(Stmt::Print(*expr))
    }

    fn expression_statement(&mut self) -> Result<Stmt, StaticError> {
        let expr = self.expression()?;
        self.consume(SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(*expr))
    }

    fn expression(&mut self) -> Result<Box<Expr>, StaticError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Box<Expr>, StaticError> {
        let expr = self.or()?;
        if self.match_(vec![EQUAL]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return match *expr {
                Expr::Variable { name } => Ok(Box::new(Expr::Assign { name, value })),
                other => {
                    // Report without unwinding: the right-hand side already
                    // parsed, so there is nothing to synchronize past.
                    self.error(equals, "Invalid assignment target.");
                    Ok(Box::new(other))
                }
            };
        }
        Ok(expr)
    }

    fn or(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = self.and()?;
        while self.match_(vec![OR]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Box::new(Expr::Logical {
                left: expr,
                operator,
                right,
            });
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = self.equality()?;
        while self.match_(vec![AND]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Box::new(Expr::Logical {
                left: expr,
                operator,
                right,
            });
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = self.comparison()?;
        while self.match_(vec![BangEqual, EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = self.term()?;
        while self.match_(vec![GREATER, GreaterEqual, LESS, LessEqual]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = self.factor()?;
        while self.match_(vec![MINUS, PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = self.unary()?;
        while self.match_(vec![SLASH, STAR]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Box::new(Expr::Binary {
                left: expr,
                operator,
                right,
            });
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Box<Expr>, StaticError> {
        if self.match_(vec![BANG, MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Box::new(Expr::Unary { operator, right }));
        }
        self.call()
    }

    fn call(&mut self) -> Result<Box<Expr>, StaticError> {
        let mut expr = *self.primary()?;
        while self.match_(vec![LeftParen]) {
            expr = self.finish_call(expr)?;
        }
        Ok(Box::new(expr))
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, StaticError> {
        let mut args = vec![];
        if !self.check(&RightParen) {
            loop {
                if args.len() >= 255 {
                    let token = self.peek().clone();
                    self.error(token, "Can't have more than 255 arguments.");
                }
                args.push(*self.expression()?);
                if !self.match_(vec![COMMA]) {
                    break;
                }
            }
        }
        let paren = self.consume(RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    fn primary(&mut self) -> Result<Box<Expr>, StaticError> {
        let expr = match &self.peek().token_type {
            FALSE => Expr::LiteralNode(Literal::Boolean(false)),
            TRUE => Expr::LiteralNode(Literal::Boolean(true)),
            NIL => Expr::LiteralNode(Literal::NIL),
            STRING(s) | NUMBER(s) => Expr::LiteralNode(s.clone()),
            IDENTIFIER => Expr::Variable {
                name: self.peek().clone(),
            },
            LeftParen => {
                self.advance();
                let expr = Expr::Grouping(self.expression()?);
                self.consume(RightParen, "Expect ')' after expression.")?;
                return Ok(Box::new(expr));
            }
            _ => {
                let token = self.peek().clone();
                return Err(self.error(token, "Expect expression."));
            }
        };
        self.advance();
        Ok(Box::new(expr))
    }

    /// Records a diagnostic and hands back the panic signal; callers decide
    /// whether to unwind with it or keep parsing.
    fn error(&mut self, token: Token, msg: &str) -> StaticError {
        let e = StaticError {
            token,
            msg: msg.to_string(),
        };
        self.errors.push(e.clone());
        e
    }

    fn match_(&mut self, types: Vec<TokenType>) -> bool {
        for type_ in types {
            if self.check(&type_) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, type_: TokenType, msg: &str) -> Result<Token, StaticError> {
        if self.check(&type_) {
            Ok(self.advance().clone())
        } else {
            let token = self.peek().clone();
            Err(self.error(token, msg))
        }
    }

    fn check(&self, type_: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            self.peek().token_type == *type_
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, EOF)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let SEMICOLON = self.previous().token_type {
                return;
            }
            match &self.peek().token_type {
                CLASS | FUN | VAR | FOR | IF | WHILE | PRINT | RETURN => return,
                _ => {}
            }
            self.advance();
        }
    }
}
