//! Recursive-descent parser for the script language.
//!
//! Statements: `let`/`const`/`var`, assignment, `if`/`else`, blocks, `throw`
//! and expression statements. Semicolons are optional. There are no loops
//! and no function definitions, so every program runs in bounded time.

use super::ast::{BinaryOp, Expr, LogicalOp, Stmt, TemplatePart, UnaryOp};
use super::error::ScriptError;
use super::lexer::{TemplatePiece, Token, TokenKind, tokenize};

const RESERVED: &[&str] = &[
    "let", "const", "var", "if", "else", "throw", "new", "typeof", "true", "false", "null",
    "undefined", "while", "for", "do", "function", "return", "class", "switch", "try", "catch",
    "break", "continue", "import", "await",
];

/// Deepest syntax tree a script may build. Evaluation recurses along the
/// same tree, so this also bounds the interpreter's stack use.
pub const MAX_NESTING: usize = 128;

/// Parses a script into statements.
///
/// # Errors
///
/// Returns [`ScriptError::Syntax`] with the line of the first bad token.
pub fn parse_script(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut statements = Vec::new();
    while !parser.at_eof() {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    const fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Enters one level of nesting.
    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ScriptError::syntax(self.line(), "script is nested too deeply"));
        }
        Ok(())
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map_or(&TokenKind::Eof, |token| &token.kind)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |token| token.line)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), TokenKind::Punct(p) if *p == punct)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(name) if name == keyword)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{punct}'")))
        }
    }

    fn unexpected(&self, expected: &str) -> ScriptError {
        let found = match self.peek() {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Str(s) => format!("'{s}'"),
            TokenKind::Template(_) => "template".to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Punct(p) => (*p).to_string(),
            TokenKind::Eof => "end of script".to_string(),
        };
        ScriptError::syntax(self.line(), format!("expected {expected}, found {found}"))
    }

    fn identifier(&mut self) -> Result<String, ScriptError> {
        match self.peek() {
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.descend()?;
        let statement = self.statement_body();
        self.depth -= 1;
        statement
    }

    fn statement_body(&mut self) -> Result<Stmt, ScriptError> {
        let statement = if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        } else if self.is_punct("{") {
            self.pos += 1;
            let mut body = Vec::new();
            while !self.eat_punct("}") {
                if self.at_eof() {
                    return Err(self.unexpected("'}'"));
                }
                body.push(self.statement()?);
            }
            return Ok(Stmt::Block(body));
        } else if self.is_keyword("if") {
            self.pos += 1;
            self.expect_punct("(")?;
            let test = self.expression()?;
            self.expect_punct(")")?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.is_keyword("else") {
                self.pos += 1;
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                test,
                then,
                otherwise,
            });
        } else if self.is_keyword("let") || self.is_keyword("const") || self.is_keyword("var") {
            let constant = self.is_keyword("const");
            self.pos += 1;
            let name = self.identifier()?;
            let init = if self.eat_punct("=") {
                Some(self.expression()?)
            } else if constant {
                return Err(self.unexpected("'=' in const declaration"));
            } else {
                None
            };
            Stmt::Declare {
                name,
                init,
                constant,
            }
        } else if self.is_keyword("throw") {
            self.pos += 1;
            Stmt::Throw(self.expression()?)
        } else {
            Stmt::Expr(self.expression()?)
        };
        self.eat_punct(";");
        Ok(statement)
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.descend()?;
        let expr = self.assignment();
        self.depth -= 1;
        expr
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        let target = self.conditional()?;
        if !self.is_punct("=") {
            return Ok(target);
        }
        let Expr::Ident(name) = target else {
            return Err(ScriptError::syntax(
                self.line(),
                "invalid assignment target",
            ));
        };
        self.pos += 1;
        let value = self.expression()?;
        Ok(Expr::Assign {
            name,
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let test = self.logical_or()?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let then = self.expression()?;
        self.expect_punct(":")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    // Operator chains nest to the left, so every link counts as a level.

    fn logical_or(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.logical_and()?;
        let mut links = 0;
        loop {
            let op = if self.eat_punct("||") {
                LogicalOp::Or
            } else if self.eat_punct("??") {
                LogicalOp::Nullish
            } else {
                self.depth -= links;
                return Ok(lhs);
            };
            self.descend()?;
            links += 1;
            let rhs = self.logical_and()?;
            lhs = Expr::Logical(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn logical_and(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.equality()?;
        let mut links = 0;
        while self.eat_punct("&&") {
            self.descend()?;
            links += 1;
            let rhs = self.equality()?;
            lhs = Expr::Logical(LogicalOp::And, Box::new(lhs), Box::new(rhs));
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn binary_level(
        &mut self,
        table: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        let mut lhs = next(self)?;
        let mut links = 0;
        'outer: loop {
            for (punct, op) in table {
                if self.eat_punct(punct) {
                    self.descend()?;
                    links += 1;
                    let rhs = next(self)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            self.depth -= links;
            return Ok(lhs);
        }
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::LooseEq),
                ("!=", BinaryOp::LooseNe),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = if self.eat_punct("!") {
            UnaryOp::Not
        } else if self.eat_punct("-") {
            UnaryOp::Neg
        } else if self.eat_punct("+") {
            UnaryOp::Plus
        } else if self.is_keyword("typeof") {
            self.pos += 1;
            UnaryOp::TypeOf
        } else {
            return self.postfix();
        };
        self.descend()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        let mut links = 0;
        loop {
            if self.is_punct(".")
                || self.is_punct("?.")
                || self.is_punct("[")
                || self.is_punct("(")
            {
                self.descend()?;
                links += 1;
            }
            if self.eat_punct(".") || self.eat_punct("?.") {
                let optional = matches!(
                    self.tokens.get(self.pos - 1).map(|t| &t.kind),
                    Some(TokenKind::Punct("?."))
                );
                if optional && self.is_punct("[") {
                    self.pos += 1;
                    let index = self.expression()?;
                    self.expect_punct("]")?;
                    expr = member(expr, index, true);
                    continue;
                }
                let TokenKind::Ident(name) = self.advance() else {
                    self.pos -= 1;
                    return Err(self.unexpected("property name"));
                };
                expr = member(expr, Expr::Str(name), optional);
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = member(expr, index, false);
            } else if self.is_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.depth -= links;
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ScriptError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.expression()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let line = self.line();
        match self.advance() {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Template(pieces) => self.template(pieces),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "null" => Ok(Expr::Null),
                "undefined" => Ok(Expr::Undefined),
                "new" => {
                    let class = self.identifier()?;
                    let args = if self.is_punct("(") {
                        self.arguments()?
                    } else {
                        Vec::new()
                    };
                    Ok(Expr::New { class, args })
                }
                keyword if RESERVED.contains(&keyword) => Err(ScriptError::syntax(
                    line,
                    format!("unexpected keyword '{keyword}'"),
                )),
                _ => Ok(Expr::Ident(name)),
            },
            TokenKind::Punct("(") => {
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => {
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.expression()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            TokenKind::Punct("{") => self.object(),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("expression"))
            }
        }
    }

    fn object(&mut self) -> Result<Expr, ScriptError> {
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            let key = match self.advance() {
                TokenKind::Ident(name) => name,
                TokenKind::Str(s) => s,
                TokenKind::Number(n) => super::value::format_number(n),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("property key"));
                }
            };
            let value = if self.eat_punct(":") {
                self.expression()?
            } else {
                Expr::Ident(key.clone())
            };
            entries.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(entries))
    }

    fn template(&self, pieces: Vec<TemplatePiece>) -> Result<Expr, ScriptError> {
        let mut parts = Vec::with_capacity(pieces.len());
        for piece in pieces {
            parts.push(match piece {
                TemplatePiece::Text(text) => TemplatePart::Text(text),
                TemplatePiece::Expr(mut tokens) => {
                    let line = tokens.last().map_or(1, |t| t.line);
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        line,
                    });
                    let mut parser = Self::new(tokens);
                    parser.depth = self.depth;
                    let expr = parser.expression()?;
                    if !parser.at_eof() {
                        return Err(parser.unexpected("'}'"));
                    }
                    TemplatePart::Expr(expr)
                }
            });
        }
        Ok(Expr::Template(parts))
    }
}

fn member(object: Expr, property: Expr, optional: bool) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: Box::new(property),
        optional,
    }
}
