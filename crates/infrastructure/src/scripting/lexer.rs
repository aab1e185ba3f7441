//! Tokenizer for the script language.

use super::error::ScriptError;

/// A piece of a template string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePiece {
    /// Literal text.
    Text(String),
    /// Tokens of a `${...}` substitution.
    Expr(Vec<Token>),
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Template(Vec<TemplatePiece>),
    Ident(String),
    /// Operators and punctuation, longest match first.
    Punct(&'static str),
    Eof,
}

/// A token with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "(", ")", "{", "}", "[",
    "]", ",", ";", ".", ":", "?", "!", "=", "<", ">", "+", "-", "*", "/", "%",
];

/// Splits a script into tokens, ending with [`TokenKind::Eof`].
///
/// # Errors
///
/// Returns [`ScriptError::Syntax`] for unterminated strings or comments and
/// for characters outside the language.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    Lexer::new(source, 1, 0).run()
}

/// Template literals nested inside `${}` beyond this depth are rejected.
const MAX_TEMPLATE_NESTING: usize = 16;

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    nesting: usize,
}

impl Lexer {
    fn new(source: &str, line: usize, nesting: usize) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line,
            nesting,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn run(mut self) -> Result<Vec<Token>, ScriptError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let line = self.line;
            let Some(ch) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    line,
                });
                return Ok(tokens);
            };

            let kind = if ch.is_ascii_digit()
                || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.number()?
            } else if ch == '"' || ch == '\'' {
                TokenKind::Str(self.string(ch)?)
            } else if ch == '`' {
                TokenKind::Template(self.template()?)
            } else if ch == '_' || ch == '$' || ch.is_alphabetic() {
                TokenKind::Ident(self.ident())
            } else {
                TokenKind::Punct(self.punct()?)
            };
            tokens.push(Token { kind, line });
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ScriptError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let line = self.line;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(ScriptError::syntax(line, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self) -> Result<TokenKind, ScriptError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            // exponent sign
            if matches!(self.peek(), Some('e' | 'E')) && matches!(self.peek_at(1), Some('+' | '-'))
            {
                self.bump();
            }
            self.bump();
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        text.parse::<f64>()
            .ok()
            .map(TokenKind::Number)
            .ok_or_else(|| ScriptError::syntax(self.line, format!("invalid number '{text}'")))
    }

    fn escape(&mut self, line: usize) -> Result<char, ScriptError> {
        let Some(ch) = self.bump() else {
            return Err(ScriptError::syntax(line, "unterminated string"));
        };
        Ok(match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'u' => {
                let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ScriptError::syntax(line, "invalid unicode escape"))?
            }
            other => other,
        })
    }

    fn string(&mut self, quote: char) -> Result<String, ScriptError> {
        let line = self.line;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => value.push(self.escape(line)?),
                Some('\n') | None => return Err(ScriptError::syntax(line, "unterminated string")),
                Some(c) => value.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<Vec<TemplatePiece>, ScriptError> {
        let line = self.line;
        if self.nesting >= MAX_TEMPLATE_NESTING {
            return Err(ScriptError::syntax(line, "template literals are nested too deeply"));
        }
        self.bump();
        let mut pieces = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('`') => break,
                Some('\\') => text.push(self.escape(line)?),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !text.is_empty() {
                        pieces.push(TemplatePiece::Text(std::mem::take(&mut text)));
                    }
                    let expr_line = self.line;
                    let source = self.substitution(line)?;
                    let mut tokens = Lexer::new(&source, expr_line, self.nesting + 1).run()?;
                    if tokens.len() == 1 {
                        return Err(ScriptError::syntax(expr_line, "empty template substitution"));
                    }
                    tokens.pop();
                    pieces.push(TemplatePiece::Expr(tokens));
                }
                Some(c) => text.push(c),
                None => return Err(ScriptError::syntax(line, "unterminated template")),
            }
        }
        if !text.is_empty() {
            pieces.push(TemplatePiece::Text(text));
        }
        Ok(pieces)
    }

    /// Source of a `${...}` body, with nested braces and strings balanced.
    fn substitution(&mut self, line: usize) -> Result<String, ScriptError> {
        let mut depth = 0usize;
        let mut source = String::new();
        let mut quote: Option<char> = None;
        loop {
            let Some(ch) = self.bump() else {
                return Err(ScriptError::syntax(line, "unterminated template"));
            };
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), '\\') => {
                    source.push(ch);
                    if let Some(next) = self.bump() {
                        source.push(next);
                    }
                    continue;
                }
                (Some(_), _) => {}
                (None, '"' | '\'' | '`') => quote = Some(ch),
                (None, '{') => depth += 1,
                (None, '}') if depth == 0 => return Ok(source),
                (None, '}') => depth -= 1,
                _ => {}
            }
            source.push(ch);
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c == '_' || c == '$' || c.is_alphanumeric())
        {
            self.bump();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn punct(&mut self) -> Result<&'static str, ScriptError> {
        let rest: String = self.chars[self.pos..].iter().take(3).collect();
        let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            let ch = rest.chars().next().unwrap_or_default();
            return Err(ScriptError::syntax(
                self.line,
                format!("unexpected character '{ch}'"),
            ));
        };
        // `?.5` is a conditional followed by a number
        if *punct == "?." && self.peek_at(2).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            return Ok("?");
        }
        for _ in 0..punct.len() {
            self.bump();
        }
        Ok(punct)
    }
}
