//! Tokenizer for the text-template language.
//!
//! Text outside `{{ }}` becomes a single [`Token::Text`]. Inside an action the
//! lexer produces delimiters, fields, variables, identifiers, literals and
//! punctuation. `{{- ` and ` -}}` trim the whitespace of the neighbouring text,
//! and `{{/* ... */}}` comments produce no tokens at all.

use super::ParseError;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Text(String),
    LeftDelim,
    RightDelim,
    /// `.`
    Dot,
    /// `.a.b` as `["a", "b"]`
    Field(Vec<String>),
    /// `$name.a.b`; the bare root variable has an empty name
    Variable(String, Vec<String>),
    Ident(String),
    Str(String),
    Number(String),
    Bool(bool),
    Nil,
    Pipe,
    LeftParen,
    RightParen,
    Comma,
    Declare,
    Assign,
    If,
    Else,
    End,
    Range,
    With,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) struct Lexer<'a> {
    name: &'a str,
    src: &'a str,
    pos: usize,
    tokens: Vec<Spanned>,
}

impl<'a> Lexer<'a> {
    pub fn new(name: &'a str, src: &'a str) -> Self {
        Self {
            name,
            src,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            let Some(found) = rest.find(LEFT_DELIM) else {
                self.push(Token::Text(rest.to_string()), self.pos);
                break;
            };

            let delim_start = self.pos + found;
            let mut inner = delim_start + LEFT_DELIM.len();
            let mut text = &self.src[self.pos..delim_start];
            if self.is_trim_marker(inner) {
                text = text.trim_end();
                inner += 1;
            }
            if !text.is_empty() {
                self.push(Token::Text(text.to_string()), self.pos);
            }

            let after_space = inner + leading_space(&self.src[inner..]);
            if self.src[after_space..].starts_with(LEFT_COMMENT) {
                self.pos = self.comment(delim_start, after_space)?;
                continue;
            }

            self.push(Token::LeftDelim, delim_start);
            self.pos = inner;
            self.action()?;
        }
        Ok(self.tokens)
    }

    fn push(&mut self, token: Token, offset: usize) {
        self.tokens.push(Spanned { token, offset });
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.name, self.src, offset, message)
    }

    /// `-` directly after `{{` and followed by whitespace
    fn is_trim_marker(&self, at: usize) -> bool {
        let bytes = self.src.as_bytes();
        bytes.get(at) == Some(&b'-') && bytes.get(at + 1).is_some_and(u8::is_ascii_whitespace)
    }

    /// Skip a comment action starting at `start`, returning the offset after it
    fn comment(&mut self, delim_start: usize, start: usize) -> Result<usize, ParseError> {
        let body = start + LEFT_COMMENT.len();
        let close = self.src[body..]
            .find(RIGHT_COMMENT)
            .map(|idx| body + idx + RIGHT_COMMENT.len())
            .ok_or_else(|| self.error(delim_start, "unclosed comment"))?;

        let rest = &self.src[close..];
        if rest.starts_with(RIGHT_DELIM) {
            return Ok(close + RIGHT_DELIM.len());
        }
        let space = leading_space(rest);
        if space > 0 && rest[space..].starts_with("-}}") {
            let after = close + space + 3;
            return Ok(after + leading_space(&self.src[after..]));
        }
        Err(self.error(close, "comment ends before closing delimiter"))
    }

    /// Tokenize the inside of an action up to and including its closing delimiter
    fn action(&mut self) -> Result<(), ParseError> {
        loop {
            let space = leading_space(&self.src[self.pos..]);
            let start = self.pos + space;
            let rest = &self.src[start..];

            if space > 0 && rest.starts_with("-}}") {
                self.push(Token::RightDelim, start);
                let after = start + 3;
                self.pos = after + leading_space(&self.src[after..]);
                return Ok(());
            }
            if rest.starts_with(RIGHT_DELIM) {
                self.push(Token::RightDelim, start);
                self.pos = start + RIGHT_DELIM.len();
                return Ok(());
            }

            self.pos = start;
            let Some(ch) = rest.chars().next() else {
                return Err(self.error(start, "unclosed action"));
            };

            match ch {
                '|' => self.single(Token::Pipe),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                ',' => self.single(Token::Comma),
                '=' => self.single(Token::Assign),
                ':' if rest.starts_with(":=") => {
                    self.push(Token::Declare, start);
                    self.pos += 2;
                }
                '"' => self.quoted()?,
                '`' => self.raw_string()?,
                '$' => {
                    self.pos += 1;
                    let name = self.identifier();
                    let fields = self.field_chain();
                    self.push(Token::Variable(name, fields), start);
                }
                '.' => {
                    if rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
                        self.number();
                    } else {
                        let fields = self.field_chain();
                        if fields.is_empty() {
                            self.pos += 1;
                            self.push(Token::Dot, start);
                        } else {
                            self.push(Token::Field(fields), start);
                        }
                    }
                }
                c if c.is_ascii_digit() => self.number(),
                '-' | '+' if rest[1..].starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                    self.number()
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.identifier();
                    let token = match word.as_str() {
                        "if" => Token::If,
                        "else" => Token::Else,
                        "end" => Token::End,
                        "range" => Token::Range,
                        "with" => Token::With,
                        "true" => Token::Bool(true),
                        "false" => Token::Bool(false),
                        "nil" => Token::Nil,
                        _ => Token::Ident(word),
                    };
                    self.push(token, start);
                }
                other => {
                    return Err(self.error(start, format!("unexpected {other:?} in command")));
                }
            }
        }
    }

    fn single(&mut self, token: Token) {
        self.push(token, self.pos);
        self.pos += 1;
    }

    fn identifier(&mut self) -> String {
        let rest = &self.src[self.pos..];
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(rest.len(), |(idx, _)| idx);
        self.pos += len;
        rest[..len].to_string()
    }

    /// Consume `.name` segments until something else follows
    fn field_chain(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        loop {
            let rest = &self.src[self.pos..];
            let starts_name = rest.starts_with('.')
                && rest[1..].starts_with(|c: char| c.is_alphabetic() || c == '_');
            if !starts_name {
                return fields;
            }
            self.pos += 1;
            fields.push(self.identifier());
        }
    }

    fn number(&mut self) {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut end = start;
        if matches!(bytes.get(end), Some(b'-' | b'+')) {
            end += 1;
        }
        while let Some(&byte) = bytes.get(end) {
            let exponent_sign = matches!(byte, b'-' | b'+')
                && end > start
                && matches!(bytes.get(end - 1), Some(b'e' | b'E'))
                && !self.src[start..end].starts_with("0x");
            if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'_' || exponent_sign {
                end += 1;
            } else {
                break;
            }
        }
        self.pos = end;
        self.push(Token::Number(self.src[start..end].to_string()), start);
    }

    fn quoted(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let mut value = String::new();
        let mut chars = self.src[start + 1..].char_indices();

        while let Some((idx, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos = start + 1 + idx + 1;
                    self.push(Token::Str(value), start);
                    return Ok(());
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, 'r')) => '\r',
                        Some((_, '\\')) => '\\',
                        Some((_, '"')) => '"',
                        Some((_, other)) => {
                            return Err(self.error(start, format!("unknown escape \\{other}")));
                        }
                        None => break,
                    };
                    value.push(escaped);
                }
                '\n' => break,
                other => value.push(other),
            }
        }
        Err(self.error(start, "unterminated quoted string"))
    }

    fn raw_string(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let body = start + 1;
        let close = self.src[body..]
            .find('`')
            .ok_or_else(|| self.error(start, "unterminated raw quoted string"))?;
        self.push(Token::Str(self.src[body..body + close].to_string()), start);
        self.pos = body + close + 1;
        Ok(())
    }
}

fn leading_space(text: &str) -> usize {
    text.len() - text.trim_start().len()
}
