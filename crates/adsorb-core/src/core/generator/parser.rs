use super::ast::{Argument, BinaryOp, Expr, FunctionDef, Item, Program, Statement};
use super::error::GeneratorError;
use super::lexer::{Token, TokenKind};

/// Deepest expression tree the parser will build. Operator chains count toward it.
const MAX_NESTING: usize = 128;

pub fn parse(tokens: Vec<Token>) -> Result<Program, GeneratorError> {
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> GeneratorError {
        GeneratorError::compilation(token.line, token.column, message)
    }

    fn enter(&mut self, token: &Token) -> Result<(), GeneratorError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(
                token,
                format!("Expression nested deeper than {} levels", MAX_NESTING),
            ));
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, GeneratorError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let found = self.peek().clone();
            Err(self.error(
                &found,
                format!("Expected {} {}, found {}", kind, context, found.kind),
            ))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<(String, Token), GeneratorError> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Ident(name) => Ok((name.clone(), token)),
            other => Err(self.error(
                &token,
                format!("Expected a name {}, found {}", context, other),
            )),
        }
    }

    fn skip_terminators(&mut self) {
        while self.check(&TokenKind::Terminator) {
            self.advance();
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == keyword)
    }

    fn program(&mut self) -> Result<Program, GeneratorError> {
        let mut program = Program::default();
        loop {
            self.skip_terminators();
            if self.check(&TokenKind::Eof) {
                return Ok(program);
            }
            if self.at_keyword("let") {
                let start = self.advance();
                let (name, _) = self.expect_ident("after 'let'")?;
                self.expect(TokenKind::Assign, "after constant name")?;
                let value = self.expression(false)?;
                self.end_of_statement()?;
                program.items.push(Item::Constant {
                    name,
                    value,
                    line: start.line,
                    column: start.column,
                });
            } else if self.at_keyword("fn") {
                let function = self.function()?;
                program.items.push(Item::Function(function));
            } else {
                let token = self.peek().clone();
                return Err(self.error(
                    &token,
                    format!(
                        "Expected 'let' or 'fn' at module level, found {}",
                        token.kind
                    ),
                ));
            }
        }
    }

    fn function(&mut self) -> Result<FunctionDef, GeneratorError> {
        let start = self.advance();
        let (name, _) = self.expect_ident("after 'fn'")?;
        self.expect(TokenKind::LParen, "after generator name")?;
        if !self.check(&TokenKind::RParen) {
            let token = self.peek().clone();
            return Err(self.error(&token, "Structure generators take no parameters"));
        }
        self.advance();
        self.expect(TokenKind::LBrace, "to open the generator body")?;

        let mut body = Vec::new();
        loop {
            self.skip_terminators();
            if self.check(&TokenKind::RBrace) {
                self.advance();
                break;
            }
            if self.check(&TokenKind::Eof) {
                let token = self.peek().clone();
                return Err(self.error(
                    &token,
                    format!("Unclosed body of generator '{}'", name),
                ));
            }
            body.push(self.statement()?);
        }

        Ok(FunctionDef {
            name,
            body,
            line: start.line,
        })
    }

    fn statement(&mut self) -> Result<Statement, GeneratorError> {
        if self.at_keyword("let") {
            let start = self.advance();
            let (name, _) = self.expect_ident("after 'let'")?;
            self.expect(TokenKind::Assign, "after variable name")?;
            let value = self.expression(false)?;
            self.end_of_statement()?;
            return Ok(Statement::Let {
                name,
                value,
                line: start.line,
            });
        }

        let (name, start) = self.expect_ident("at the start of a command")?;
        let mut arguments = Vec::new();
        while !self.at_statement_end() {
            arguments.push(self.argument()?);
        }
        Ok(Statement::Command {
            name,
            arguments,
            line: start.line,
        })
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Terminator | TokenKind::RBrace | TokenKind::Eof
        )
    }

    fn end_of_statement(&mut self) -> Result<(), GeneratorError> {
        if self.at_statement_end() {
            Ok(())
        } else {
            let token = self.peek().clone();
            Err(self.error(
                &token,
                format!("Expected end of statement, found {}", token.kind),
            ))
        }
    }

    fn argument(&mut self) -> Result<Argument, GeneratorError> {
        let keyword = match (&self.peek().kind, &self.peek_at(1).kind) {
            (TokenKind::Ident(name), TokenKind::Assign) => Some(name.clone()),
            _ => None,
        };
        if let Some(keyword) = keyword {
            self.advance();
            self.advance();
            let value = self.expression(true)?;
            return Ok(Argument {
                keyword: Some(keyword),
                value,
            });
        }
        Ok(Argument {
            keyword: None,
            value: self.expression(true)?,
        })
    }

    /// `split_arguments` is set while parsing command arguments, where `x -1` means
    /// two arguments and `x - 1` or `x-1` means one.
    fn expression(&mut self, split_arguments: bool) -> Result<Expr, GeneratorError> {
        let mut left = self.term(split_arguments)?;
        let mut operators = 0;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            if split_arguments && self.peek().space_before && !self.peek_at(1).space_before {
                break;
            }
            let token = self.advance();
            self.enter(&token)?;
            operators += 1;
            let right = self.term(split_arguments)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= operators;
        Ok(left)
    }

    fn term(&mut self, split_arguments: bool) -> Result<Expr, GeneratorError> {
        let mut left = self.unary(split_arguments)?;
        let mut operators = 0;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let token = self.advance();
            self.enter(&token)?;
            operators += 1;
            let right = self.unary(split_arguments)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= operators;
        Ok(left)
    }

    fn unary(&mut self, split_arguments: bool) -> Result<Expr, GeneratorError> {
        let start = self.peek().clone();
        self.enter(&start)?;
        let expr = match start.kind {
            TokenKind::Minus => {
                self.advance();
                self.unary(split_arguments)
                    .map(|inner| Expr::Neg(Box::new(inner)))
            }
            TokenKind::Plus => {
                self.advance();
                self.unary(split_arguments)
            }
            _ => self.primary(),
        }?;
        self.depth -= 1;
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, GeneratorError> {
        let token = self.advance();
        match token.kind.clone() {
            TokenKind::Number(value) => Ok(Expr::Number(value)),
            TokenKind::Str(text) => Ok(Expr::Str(text)),
            TokenKind::Ident(name) => {
                if self.check(&TokenKind::LParen) && !self.peek().space_before {
                    self.advance();
                    let arguments = self.list(TokenKind::RParen)?;
                    Ok(Expr::Call(name, arguments))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::LParen => {
                let inner = self.expression(false)?;
                self.expect(TokenKind::RParen, "to close the parenthesis")?;
                Ok(inner)
            }
            TokenKind::LBracket => Ok(Expr::Vector(self.list(TokenKind::RBracket)?)),
            other => Err(self.error(&token, format!("Unexpected {}", other))),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn list(&mut self, close: TokenKind) -> Result<Vec<Expr>, GeneratorError> {
        let mut items = Vec::new();
        if self.check(&close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.expression(false)?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&close) {
                    self.advance();
                    return Ok(items);
                }
                continue;
            }
            self.expect(close, "to close the list")?;
            return Ok(items);
        }
    }
}
