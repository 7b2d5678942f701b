//! Recursive descent parser over the token stream. Command parameters
//! are full expressions; compound assignment statements lower into the
//! arithmetic commands they shadow.

use super::ast::{BinOp, Expr, Stmt, UnaryOp, VarRef};
use super::lexer::{lex, Spanned, Token};
use super::{ScriptError, ScriptResult};

pub fn parse_source(source: &str) -> ScriptResult<Vec<Stmt>> {
    let tokens = lex(source)?;
    Parser::new(tokens).parse_program()
}

/// Parses a bare expression, used for `BRANCH` condition strings
pub fn parse_expression(source: &str, line: usize) -> ScriptResult<Expr> {
    let tokens = lex(source)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    if !matches!(parser.peek(), Token::Eol) {
        return Err(ScriptError::compile(
            line,
            format!("unexpected trailing tokens in expression '{source}'"),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.position)
            .map(|spanned| &spanned.token)
            .unwrap_or(&Token::Eol)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.position.min(self.tokens.len().saturating_sub(1)))
            .map(|spanned| spanned.line)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn parse_program(&mut self) -> ScriptResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.at_end() {
            match self.peek() {
                Token::Eol => {
                    self.advance();
                }
                Token::Label(_) => {
                    let line = self.line();
                    let Token::Label(name) = self.advance() else {
                        unreachable!()
                    };
                    stmts.push(Stmt::Label { name, line });
                    self.expect_eol()?;
                }
                Token::Ident(_) => {
                    stmts.push(self.parse_command()?);
                }
                Token::Var(_) => {
                    stmts.push(self.parse_assignment()?);
                }
                other => {
                    return Err(ScriptError::compile(
                        self.line(),
                        format!("unexpected token {other:?} at start of statement"),
                    ));
                }
            }
        }
        Ok(stmts)
    }

    fn parse_command(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        let Token::Ident(name) = self.advance() else {
            unreachable!()
        };

        let mut params = Vec::new();
        while !matches!(self.peek(), Token::Eol) {
            params.push(self.parse_expr()?);
        }
        self.expect_eol()?;

        Ok(Stmt::Command {
            name: name.to_ascii_uppercase(),
            params,
            line,
        })
    }

    /// `$var ++`, `$var += expr` and friends lower to the arithmetic
    /// commands; plain `=` points the author at setVar
    fn parse_assignment(&mut self) -> ScriptResult<Stmt> {
        let line = self.line();
        let var = self.parse_var_ref()?;

        let (command, operand) = match self.advance() {
            Token::PlusPlus => ("ADD", Expr::Num(1.0)),
            Token::MinusMinus => ("SUBTRACT", Expr::Num(1.0)),
            Token::PlusEq => ("ADD", self.parse_expr()?),
            Token::MinusEq => ("SUBTRACT", self.parse_expr()?),
            Token::StarEq => ("MULTIPLY", self.parse_expr()?),
            Token::SlashEq => ("DIVIDE", self.parse_expr()?),
            Token::AmpEq => {
                let value = self.parse_expr()?;
                self.expect_eol()?;
                return Ok(Stmt::Command {
                    name: "MERGETEXT".to_string(),
                    params: vec![
                        Expr::Var(var.clone()),
                        value,
                        Expr::Var(var),
                    ],
                    line,
                });
            }
            Token::Eq => {
                return Err(ScriptError::compile(
                    line,
                    "assignment with '=' is not supported, use setVar",
                ));
            }
            other => {
                return Err(ScriptError::compile(
                    line,
                    format!("expected an assignment operator, found {other:?}"),
                ));
            }
        };
        self.expect_eol()?;

        Ok(Stmt::Command {
            name: command.to_string(),
            params: vec![Expr::Var(var), operand],
            line,
        })
    }

    fn expect_eol(&mut self) -> ScriptResult<()> {
        match self.advance() {
            Token::Eol => Ok(()),
            other => Err(ScriptError::compile(
                self.line(),
                format!("expected end of line, found {other:?}"),
            )),
        }
    }

    fn parse_var_ref(&mut self) -> ScriptResult<VarRef> {
        let Token::Var(name) = self.advance() else {
            return Err(ScriptError::compile(self.line(), "expected a variable"));
        };
        let mut indexes = Vec::new();
        while matches!(self.peek(), Token::LBracket) {
            self.advance();
            indexes.push(self.parse_expr()?);
            match self.advance() {
                Token::RBracket => {}
                other => {
                    return Err(ScriptError::compile(
                        self.line(),
                        format!("expected ']', found {other:?}"),
                    ));
                }
            }
        }
        Ok(VarRef { name, indexes })
    }

    /// Precedence ladder, loosest first: OR; AND/XOR; = <>; relational;
    /// additive; concatenation; multiplicative; unary; primary
    pub(super) fn parse_expr(&mut self) -> ScriptResult<Expr> {
        self.parse_or()
    }

    fn word_op(&self) -> Option<&'static str> {
        match self.peek() {
            Token::Ident(word) => match word.to_ascii_uppercase().as_str() {
                "OR" => Some("OR"),
                "AND" => Some("AND"),
                "XOR" => Some("XOR"),
                "MOD" => Some("MOD"),
                "NOT" => Some("NOT"),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_or(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_and()?;
        while self.word_op() == Some("OR") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_equality()?;
        loop {
            let op = match self.word_op() {
                Some("AND") => BinOp::And,
                Some("XOR") => BinOp::Xor,
                _ => break,
            };
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        while matches!(self.peek(), Token::Amp) {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(BinOp::Concat, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ScriptResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => match self.word_op() {
                    Some("MOD") => BinOp::Mod,
                    _ => break,
                },
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ScriptResult<Expr> {
        if self.word_op() == Some("NOT") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        match self.peek() {
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)))
            }
            Token::Plus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(UnaryOp::Pos, Box::new(operand)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ScriptResult<Expr> {
        match self.peek().clone() {
            Token::Num(value) => {
                self.advance();
                Ok(Expr::Num(value))
            }
            Token::Str(text) => {
                self.advance();
                Ok(Expr::Str(text))
            }
            Token::Var(_) => Ok(Expr::Var(self.parse_var_ref()?)),
            Token::Label(name) => {
                self.advance();
                Ok(Expr::Label(name))
            }
            Token::Ident(word) => {
                self.advance();
                Ok(Expr::Ident(word))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                match self.advance() {
                    Token::RParen => Ok(inner),
                    other => Err(ScriptError::compile(
                        self.line(),
                        format!("expected ')', found {other:?}"),
                    )),
                }
            }
            other => Err(ScriptError::compile(
                self.line(),
                format!("unexpected token {other:?} in expression"),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::parse_source;
    use crate::script::ast::{BinOp, Expr, Stmt};

    #[test]
    fn test_command_with_bare_words() {
        let stmts = parse_source("ECHO one two").unwrap();
        let Stmt::Command { name, params, .. } = &stmts[0] else {
            panic!("expected command");
        };
        assert_eq!(name, "ECHO");
        assert_eq!(
            params,
            &vec![
                Expr::Ident("one".to_string()),
                Expr::Ident("two".to_string())
            ]
        );
    }

    #[test]
    fn test_expression_param_consumes_operators() {
        let stmts = parse_source("setVar $x 1 + 2 * 3").unwrap();
        let Stmt::Command { params, .. } = &stmts[0] else {
            panic!("expected command");
        };
        assert_eq!(params.len(), 2);
        let Expr::Binary(BinOp::Add, _, right) = &params[1] else {
            panic!("expected addition at the top");
        };
        assert!(matches!(**right, Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn test_increment_lowering() {
        let stmts = parse_source("$i ++").unwrap();
        let Stmt::Command { name, params, .. } = &stmts[0] else {
            panic!("expected command");
        };
        assert_eq!(name, "ADD");
        assert_eq!(params[1], Expr::Num(1.0));
    }

    #[test]
    fn test_concat_assignment_lowering() {
        let stmts = parse_source("$log &= \"x\"").unwrap();
        let Stmt::Command { name, params, .. } = &stmts[0] else {
            panic!("expected command");
        };
        assert_eq!(name, "MERGETEXT");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_plain_assignment_rejected() {
        let err = parse_source("$x = 5").unwrap_err();
        assert!(err.to_string().contains("setVar"));
    }

    #[test]
    fn test_array_indexing_chains() {
        let stmts = parse_source("setVar $grid[1][$i] 7").unwrap();
        let Stmt::Command { params, .. } = &stmts[0] else {
            panic!("expected command");
        };
        let Expr::Var(var) = &params[0] else {
            panic!("expected variable");
        };
        assert_eq!(var.indexes.len(), 2);
    }

    #[test]
    fn test_label_statement() {
        let stmts = parse_source(":start\nGOTO :start").unwrap();
        assert!(matches!(&stmts[0], Stmt::Label { name, .. } if name == "start"));
    }
}
