use super::error::GeneratorError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Assign,
    /// A newline outside brackets, or a `;`.
    Terminator,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(value) => write!(f, "number {}", value),
            TokenKind::Ident(name) => write!(f, "'{}'", name),
            TokenKind::Str(text) => write!(f, "string \"{}\"", text),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Assign => write!(f, "'='"),
            TokenKind::Terminator => write!(f, "end of statement"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    /// Whether whitespace (or the start of a line) precedes the token. Command
    /// arguments use this to tell `a -b` (two arguments) from `a - b` (one).
    pub space_before: bool,
}

struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    nesting: usize,
    tokens: Vec<Token>,
}

/// Splits generator source into tokens. The returned list always ends with
/// [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, GeneratorError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        index: 0,
        line: 1,
        column: 1,
        nesting: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize, space_before: bool) {
        self.tokens.push(Token {
            kind,
            line,
            column,
            space_before,
        });
    }

    fn run(&mut self) -> Result<(), GeneratorError> {
        let mut space_before = true;
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                '\n' => {
                    self.bump();
                    if self.nesting == 0 {
                        self.push(TokenKind::Terminator, line, column, space_before);
                    }
                    space_before = true;
                    continue;
                }
                c if c.is_whitespace() => {
                    self.bump();
                    space_before = true;
                    continue;
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    space_before = true;
                    continue;
                }
                '"' => {
                    let text = self.string(line, column)?;
                    self.push(TokenKind::Str(text), line, column, space_before);
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit())) =>
                {
                    let value = self.number(line, column)?;
                    self.push(TokenKind::Number(value), line, column, space_before);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.push(TokenKind::Ident(name), line, column, space_before);
                }
                _ => {
                    self.bump();
                    let kind = match c {
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Star,
                        '/' => TokenKind::Slash,
                        ',' => TokenKind::Comma,
                        '=' => TokenKind::Assign,
                        ';' => TokenKind::Terminator,
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '(' | '[' => {
                            self.nesting += 1;
                            if c == '(' {
                                TokenKind::LParen
                            } else {
                                TokenKind::LBracket
                            }
                        }
                        ')' | ']' => {
                            self.nesting = self.nesting.saturating_sub(1);
                            if c == ')' {
                                TokenKind::RParen
                            } else {
                                TokenKind::RBracket
                            }
                        }
                        other => {
                            return Err(GeneratorError::compilation(
                                line,
                                column,
                                format!("Unexpected character '{}'", other),
                            ));
                        }
                    };
                    self.push(kind, line, column, space_before);
                }
            }
            space_before = false;
        }
        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Terminator, line, column, true);
        self.push(TokenKind::Eof, line, column, true);
        Ok(())
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String, GeneratorError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('"') => text.push('"'),
                    Some('\\') => text.push('\\'),
                    Some('n') => text.push('\n'),
                    _ => {
                        return Err(GeneratorError::compilation(
                            line,
                            column,
                            "Invalid escape sequence in string literal",
                        ));
                    }
                },
                Some('\n') | None => {
                    return Err(GeneratorError::compilation(
                        line,
                        column,
                        "Unterminated string literal",
                    ));
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn number(&mut self, line: usize, column: usize) -> Result<f64, GeneratorError> {
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                literal.push(c);
                self.bump();
            } else if (c == 'e' || c == 'E')
                && self
                    .peek_next()
                    .is_some_and(|n| n.is_ascii_digit() || n == '-' || n == '+')
            {
                literal.push(c);
                self.bump();
                if let Some(sign) = self.peek().filter(|s| *s == '-' || *s == '+') {
                    literal.push(sign);
                    self.bump();
                }
            } else {
                break;
            }
        }
        literal.parse::<f64>().map_err(|_| {
            GeneratorError::compilation(line, column, format!("Invalid number '{}'", literal))
        })
    }
}
