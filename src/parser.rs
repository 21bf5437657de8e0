//! Recursive-descent parser over a pre-scanned token vector.
//!
//! Every diagnostic is collected rather than thrown: a parse error unwinds
//! only the current declaration, after which `synchronize` skips to the next
//! statement boundary and parsing continues.  `for` loops never reach the
//! AST; they desugar into `Block`/`While` here.

use std::rc::Rc;

use log::{debug, info};

use crate::error::LoxError;
use crate::expr::{next_expr_id, Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Unwinds to the enclosing declaration; the diagnostic itself has already
/// been recorded.
struct ParseAbort;

type PResult<T> = Result<T, ParseAbort>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<LoxError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // The grammar leans on a terminating EOF token.
        let needs_eof = tokens
            .last()
            .map_or(true, |token| token.token_type != TokenType::EOF);

        if needs_eof {
            let line = tokens.last().map_or(1, |token| token.line);
            tokens.push(Token::new(TokenType::EOF, String::new(), line));
        }

        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the whole token stream, returning the statements that survived
    /// alongside every diagnostic encountered.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<LoxError>) {
        info!("Parsing {} token(s)", self.tokens.len());

        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        (statements, self.errors)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Declarations and statements
    // ─────────────────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Option<Stmt> {
        let result = self.declaration_inner();

        match result {
            Ok(stmt) => Some(stmt),

            Err(ParseAbort) => {
                self.synchronize();
                None
            }
        }
    }

    fn declaration_inner(&mut self) -> PResult<Stmt> {
        if self.match_tokens(&[TokenType::CLASS]) {
            return self.class_declaration();
        }

        // `fun` only starts a declaration when a name follows; a bare `fun`
        // belongs to an expression statement (function expression).
        if self.check(&TokenType::FUN) && self.check_next(&TokenType::IDENTIFIER) {
            self.advance();
            let function = self.function("function")?;
            return Ok(Stmt::Function(function));
        }

        if self.match_tokens(&[TokenType::VAR]) {
            return self.var_declaration();
        }

        self.statement()
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;

        debug!("Parsing class {}", name.lexeme);

        let superclass = if self.match_tokens(&[TokenType::LESS]) {
            let superclass_name =
                self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;

            Some(Expr::Variable {
                name: superclass_name,
                id: next_expr_id(),
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        let mut class_methods = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            // A `class` prefix marks a static method, held by the metaclass.
            if self.match_tokens(&[TokenType::CLASS]) {
                class_methods.push(self.function("method")?);
            } else {
                methods.push(self.function("method")?);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
            class_methods,
        })
    }

    fn function(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?;

        self.function_body(kind, Some(name))
    }

    /// Parameter list (absent for getters) plus braced body.
    fn function_body(&mut self, kind: &str, name: Option<Token>) -> PResult<Rc<FunctionDecl>> {
        let params: Option<Vec<Token>> = if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let mut params = Vec::new();

            if !self.check(&TokenType::RIGHT_PAREN) {
                loop {
                    if params.len() >= 255 {
                        let token = self.peek().clone();
                        self.report(&token, "Can't have more than 255 parameters.");
                    }

                    params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?);

                    if !self.match_tokens(&[TokenType::COMMA]) {
                        break;
                    }
                }
            }

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;

            Some(params)
        } else if kind == "method" {
            // No parameter list: a getter.
            None
        } else {
            return Err(self.error_at_peek(&format!("Expect '(' after {} name.", kind)));
        };

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer = if self.match_tokens(&[TokenType::EQUAL]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_tokens(&[TokenType::FOR]) {
            return self.for_statement();
        }

        if self.match_tokens(&[TokenType::IF]) {
            return self.if_statement();
        }

        if self.match_tokens(&[TokenType::PRINT]) {
            return self.print_statement();
        }

        if self.match_tokens(&[TokenType::RETURN]) {
            return self.return_statement();
        }

        if self.match_tokens(&[TokenType::WHILE]) {
            return self.while_statement();
        }

        if self.match_tokens(&[TokenType::BREAK]) {
            return self.break_statement();
        }

        if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block()?));
        }

        self.expression_statement()
    }

    /// `for` desugars to `{ init; while (cond) { body; increment } }`.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_tokens(&[TokenType::SEMICOLON]) {
            None
        } else if self.match_tokens(&[TokenType::VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::True));

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);

        let else_branch = if self.match_tokens(&[TokenType::ELSE]) {
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

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn break_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        self.consume(TokenType::SEMICOLON, "Expect ';' after 'break'.")?;

        Ok(Stmt::Break { keyword })
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions, precedence high to low
    // ─────────────────────────────────────────────────────────────────────────

    /// Top-level expressions permit the comma sequence.
    fn expression(&mut self) -> PResult<Expr> {
        let first = self.assignment()?;

        if !self.check(&TokenType::COMMA) {
            return Ok(first);
        }

        let mut items = vec![first];

        while self.match_tokens(&[TokenType::COMMA]) {
            items.push(self.assignment()?);
        }

        Ok(Expr::Comma(items))
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.ternary()?;

        if self.match_tokens(&[TokenType::EQUAL]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return Ok(match expr {
                Expr::Variable { name, .. } => Expr::Assign {
                    name,
                    value: Box::new(value),
                    id: next_expr_id(),
                },

                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value: Box::new(value),
                },

                other => {
                    // Reported without unwinding; parsing continues with the
                    // left-hand side.
                    self.report(&equals, "Invalid assignment target");
                    other
                }
            });
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let expr = self.or()?;

        if self.match_tokens(&[TokenType::QUESTION_MARK]) {
            let then_branch = self.ternary()?;

            self.consume(
                TokenType::COLON,
                "Expect ':' after then branch of ternary expression.",
            )?;

            let else_branch = self.ternary()?;

            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut expr = self.and()?;

        while self.match_tokens(&[TokenType::OR]) {
            let operator = self.previous().clone();
            let right = self.and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_tokens(&[TokenType::AND]) {
            let operator = self.previous().clone();
            let right = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;

        while self.match_tokens(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;

        while self.match_tokens(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;

        while self.match_tokens(&[TokenType::SLASH, TokenType::STAR]) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_tokens(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens(&[TokenType::DOT]) {
                let name =
                    self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.report(&token, "Can't have more than 255 arguments.");
                }

                // Arguments sit below the comma sequence in the grammar.
                arguments.push(self.assignment()?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_tokens(&[TokenType::FALSE]) {
            return Ok(Expr::Literal(LiteralValue::False));
        }

        if self.match_tokens(&[TokenType::TRUE]) {
            return Ok(Expr::Literal(LiteralValue::True));
        }

        if self.match_tokens(&[TokenType::NIL]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.match_tokens(&[TokenType::NUMBER(0.0)]) {
            if let TokenType::NUMBER(value) = self.previous().token_type {
                return Ok(Expr::Literal(LiteralValue::Number(value)));
            }

            unreachable!("matched NUMBER token without number payload");
        }

        if self.match_tokens(&[TokenType::STRING(String::new())]) {
            if let TokenType::STRING(value) = &self.previous().token_type {
                return Ok(Expr::Literal(LiteralValue::Str(value.clone())));
            }

            unreachable!("matched STRING token without string payload");
        }

        if self.match_tokens(&[TokenType::SUPER]) {
            let keyword = self.previous().clone();

            self.consume(TokenType::DOT, "Expect '.' after 'super'.")?;

            let method =
                self.consume(TokenType::IDENTIFIER, "Expect superclass method name.")?;

            return Ok(Expr::Super {
                keyword,
                method,
                id: next_expr_id(),
            });
        }

        if self.match_tokens(&[TokenType::THIS]) {
            return Ok(Expr::This {
                keyword: self.previous().clone(),
                id: next_expr_id(),
            });
        }

        if self.match_tokens(&[TokenType::IDENTIFIER]) {
            return Ok(Expr::Variable {
                name: self.previous().clone(),
                id: next_expr_id(),
            });
        }

        if self.match_tokens(&[TokenType::FUN]) {
            let name = if self.check(&TokenType::IDENTIFIER) {
                Some(self.advance().clone())
            } else {
                None
            };

            let declaration = self.function_body("function", name)?;

            return Ok(Expr::Function(declaration));
        }

        if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let expr = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            // A one-element parenthesized expression is a grouping; a comma
            // sequence stands on its own.
            return Ok(match expr {
                comma @ Expr::Comma(_) => comma,

                other => Expr::Grouping(Box::new(other)),
            });
        }

        self.missing_operand_production()
    }

    /// Error productions: a binary operator with no left operand consumes
    /// its right-hand side at the appropriate precedence and keeps going.
    fn missing_operand_production(&mut self) -> PResult<Expr> {
        let token_type = self.peek().token_type.clone();

        match token_type {
            TokenType::BANG_EQUAL | TokenType::EQUAL_EQUAL => {
                let operator = self.advance().clone();
                self.report_missing_operand(&operator);
                self.comparison()
            }

            TokenType::GREATER
            | TokenType::GREATER_EQUAL
            | TokenType::LESS
            | TokenType::LESS_EQUAL => {
                let operator = self.advance().clone();
                self.report_missing_operand(&operator);
                self.term()
            }

            TokenType::PLUS => {
                let operator = self.advance().clone();
                self.report_missing_operand(&operator);
                self.factor()
            }

            TokenType::SLASH | TokenType::STAR => {
                let operator = self.advance().clone();
                self.report_missing_operand(&operator);
                self.unary()
            }

            _ => Err(self.error_at_peek("Expect expression.")),
        }
    }

    fn report_missing_operand(&mut self, operator: &Token) {
        let message = format!("Expect left hand operand for {}", operator.lexeme);
        self.report(operator, &message);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Token plumbing
    // ─────────────────────────────────────────────────────────────────────────

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        !self.is_at_end() && &self.peek().token_type == token_type
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => &token.token_type == token_type,

            None => false,
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> PResult<Token> {
        if self.check(&token_type) {
            return Ok(self.advance().clone());
        }

        Err(self.error_at_peek(message))
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn error_at_peek(&mut self, message: &str) -> ParseAbort {
        let token = self.peek().clone();
        self.report(&token, message);

        ParseAbort
    }

    fn report(&mut self, token: &Token, message: &str) {
        self.errors.push(LoxError::parse(token, message));
    }

    /// Skip tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,

                _ => {
                    self.advance();
                }
            }
        }
    }
}
