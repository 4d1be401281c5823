//! Recursive-descent parser for CoreTiny
//!
//! Grammar (operator precedence from lowest to highest):
//!
//! ```text
//! Program   = Function+
//! Function  = "func" IDENT "(" [Params] ")" ":" Type Block
//! Params    = Param ("," Param)*
//! Param     = IDENT ":" Type
//! Type      = "int" | "bool"
//! Block     = "{" Stmt* "}"
//! Stmt      = VarDecl | Assign | If | While | Return | Block | ExprStmt
//! VarDecl   = "var" IDENT "=" Expr ";"
//! Assign    = IDENT "=" Expr ";"
//! If        = "if" "(" Expr ")" Block ["else" Block]
//! While     = "while" "(" Expr ")" Block
//! Return    = "return" [Expr] ";"
//! ExprStmt  = Expr ";"
//! Expr      = LogicalOr
//! LogicalOr = LogicalAnd ("||" LogicalAnd)*
//! LogicalAnd= Equality   ("&&" Equality)*
//! Equality  = Comparison (("=="|"!=") Comparison)*
//! Comparison= Term       (("<"|"<="|">"|">=") Term)*
//! Term      = Factor     (("+"|"-") Factor)*
//! Factor    = Unary      (("*"|"/"|"%") Unary)*
//! Unary     = "!" Unary | Primary
//! Primary   = INT_LIT | "true" | "false" | IDENT ["(" [Args] ")"] | "(" Expr ")"
//! ```
//!
//! All binary operators are left-associative; `!` is right-associative.
//! There is no unary minus; negative values are written `0 - n`.
//!
//! The only peek-and-commit point is telling an assignment apart from an
//! expression statement (`IDENT '='` vs `IDENT …`): a single cursor
//! save/restore, no speculative tree building.

use crate::ast::{BinaryOp, Expr, Function, Param, Program, Stmt, Type, UnaryOp};
use crate::token::{Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn is_at_end(&self) -> bool {
        match self.current() {
            None => true,
            Some(token) => token.kind == TokenKind::Eof,
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.current().is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, String> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.error_at_current(message))
    }

    fn error_at_current(&self, message: &str) -> String {
        match self.current() {
            Some(token) if token.kind != TokenKind::Eof => format!(
                "{} at line {}, column {}. Got '{}'",
                message, token.line, token.column, token.kind
            ),
            _ => format!("{message} at end of file"),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_primary(&mut self) -> Result<Expr, String> {
        if self.matches(TokenKind::IntLiteral) {
            return Ok(Expr::int_literal(self.previous().value));
        }
        if self.matches(TokenKind::True) {
            return Ok(Expr::bool_literal(true));
        }
        if self.matches(TokenKind::False) {
            return Ok(Expr::bool_literal(false));
        }

        if self.matches(TokenKind::Identifier) {
            let name = self.previous().lexeme.clone();

            // Function call
            if self.matches(TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "Expected ')' after arguments")?;
                return Ok(Expr::call(name, args));
            }

            return Ok(Expr::var(name));
        }

        if self.matches(TokenKind::LParen) {
            let expr = self.parse_expression()?;
            self.expect(TokenKind::RParen, "Expected ')' after expression")?;
            return Ok(expr);
        }

        Err(match self.current() {
            Some(token) if token.kind != TokenKind::Eof => format!(
                "Expected expression at line {}, column {}. Got '{}'",
                token.line, token.column, token.kind
            ),
            _ => "Expected expression but reached end of file".to_string(),
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.matches(TokenKind::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_primary()
    }

    fn parse_factor(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.matches(TokenKind::Star) {
                BinaryOp::Mul
            } else if self.matches(TokenKind::Slash) {
                BinaryOp::Div
            } else if self.matches(TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.matches(TokenKind::Plus) {
                BinaryOp::Add
            } else if self.matches(TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_factor()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.matches(TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.matches(TokenKind::Le) {
                BinaryOp::Le
            } else if self.matches(TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.matches(TokenKind::Ge) {
                BinaryOp::Ge
            } else {
                break;
            };
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.matches(TokenKind::Eq) {
                BinaryOp::Eq
            } else if self.matches(TokenKind::Ne) {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_equality()?;
        while self.matches(TokenKind::And) {
            let right = self.parse_equality()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_logical_and()?;
        while self.matches(TokenKind::Or) {
            let right = self.parse_logical_and()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_expression(&mut self) -> Result<Expr, String> {
        self.parse_logical_or()
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> Result<Type, String> {
        if self.matches(TokenKind::Int) {
            return Ok(Type::Int);
        }
        if self.matches(TokenKind::Bool) {
            return Ok(Type::Bool);
        }
        Err(match self.current() {
            Some(token) if token.kind != TokenKind::Eof => format!(
                "Expected type at line {}, column {}",
                token.line, token.column
            ),
            _ => "Expected type but reached end of file".to_string(),
        })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, String> {
        let name = self
            .expect(TokenKind::Identifier, "Expected variable name")?
            .lexeme;
        self.expect(TokenKind::Assign, "Expected '=' after variable name")?;
        let init = self.parse_expression()?;
        self.expect(
            TokenKind::Semicolon,
            "Expected ';' after variable declaration",
        )?;

        // Provisional type; the checker adopts the initializer's type.
        Ok(Stmt::VarDecl {
            name,
            ty: Type::Int,
            init,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, String> {
        self.expect(TokenKind::LParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after condition")?;

        let then_block = Box::new(self.parse_block()?);
        let else_block = if self.matches(TokenKind::Else) {
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, String> {
        self.expect(TokenKind::LParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen, "Expected ')' after condition")?;
        let body = Box::new(self.parse_block()?);

        Ok(Stmt::While { condition, body })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, String> {
        let expr = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after return")?;
        Ok(Stmt::Return(expr))
    }

    fn parse_statement(&mut self) -> Result<Stmt, String> {
        if self.matches(TokenKind::Var) {
            return self.parse_var_decl();
        }
        if self.matches(TokenKind::If) {
            return self.parse_if_statement();
        }
        if self.matches(TokenKind::While) {
            return self.parse_while_statement();
        }
        if self.matches(TokenKind::Return) {
            return self.parse_return_statement();
        }
        if self.check(TokenKind::LBrace) {
            return self.parse_block();
        }

        // Assignment or expression statement: peek past the identifier
        // for '=', restoring the cursor if this is not an assignment.
        let checkpoint = self.pos;
        if self.check(TokenKind::Identifier) {
            let name = self.advance().lexeme.clone();
            if self.matches(TokenKind::Assign) {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon, "Expected ';' after assignment")?;
                return Ok(Stmt::Assign { name, expr });
            }
            self.pos = checkpoint;
        }

        let expr = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_block(&mut self) -> Result<Stmt, String> {
        self.expect(TokenKind::LBrace, "Expected '{'")?;

        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.expect(TokenKind::RBrace, "Expected '}'")?;
        Ok(Stmt::Block(statements))
    }

    // ------------------------------------------------------------------
    // Functions and program
    // ------------------------------------------------------------------

    fn parse_function(&mut self) -> Result<Function, String> {
        self.expect(TokenKind::Func, "Expected 'func'")?;
        let name = self
            .expect(TokenKind::Identifier, "Expected function name")?
            .lexeme;
        self.expect(TokenKind::LParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let param_name = self
                    .expect(TokenKind::Identifier, "Expected parameter name")?
                    .lexeme;
                self.expect(TokenKind::Colon, "Expected ':' after parameter name")?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param_name,
                    ty,
                });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::RParen, "Expected ')' after parameters")?;
        self.expect(TokenKind::Colon, "Expected ':' before return type")?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(Function {
            name,
            params,
            return_type,
            body,
        })
    }

    pub fn parse(&mut self) -> Result<Program, String> {
        let mut functions = Vec::new();
        while !self.is_at_end() {
            functions.push(self.parse_function()?);
        }

        if functions.is_empty() {
            return Err("Program must contain at least one function".to_string());
        }

        Ok(Program { functions })
    }
}

/// Parse a token list into a program.
pub fn parse_tokens(tokens: &[Token]) -> Result<Program, String> {
    if tokens.is_empty() {
        return Err("No tokens to parse".to_string());
    }
    Parser::new(tokens).parse()
}
