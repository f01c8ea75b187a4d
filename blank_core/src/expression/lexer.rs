//! Tokenizer for formula text.

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 1-based character column
    pub position: usize,
}

pub(crate) struct Lexer {
    chars: Vec<char>,
    index: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.index += 1;
                continue;
            }

            let position = self.index + 1;
            let kind = match ch {
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '/' => self.single(TokenKind::Slash),
                '^' => self.single(TokenKind::Caret),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ',' => self.single(TokenKind::Comma),
                '*' => {
                    // `**` is accepted as an alias for `^`
                    if self.peek_at(1) == Some('*') {
                        self.index += 2;
                        TokenKind::Caret
                    } else {
                        self.single(TokenKind::Star)
                    }
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
                c if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) => {
                    self.number(position)?
                }
                other => {
                    return Err(EvalError::syntax(format!("unexpected character '{other}'"), position));
                }
            };
            tokens.push(Token { kind, position });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            position: self.index + 1,
        });
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.index += 1;
        kind
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.index;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.index += 1;
        }
        TokenKind::Ident(self.chars[start..self.index].iter().collect())
    }

    fn number(&mut self, position: usize) -> Result<TokenKind, EvalError> {
        let start = self.index;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.index += 1;
        }

        // Exponent only when followed by digits, so `2e` stays a syntax error downstream
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.index += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.index += 1;
                }
            }
        }

        let text: String = self.chars[start..self.index].iter().collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| EvalError::syntax(format!("invalid number '{text}'"), position))
    }
}
