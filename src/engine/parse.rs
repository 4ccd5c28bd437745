//! Recursive-descent parser producing the template tree.

use serde_json::{Number, Value};

use super::funcs::FuncMap;
use super::lexer::{Spanned, Token};
use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If {
        pipeline: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Pipeline {
    /// Variables declared or assigned by this pipeline
    pub decl: Vec<String>,
    /// `=` rather than `:=`
    pub assign: bool,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Arg {
    Dot,
    Field(Vec<String>),
    Variable(String, Vec<String>),
    Func(String),
    Literal(Value),
    Pipeline(Box<Pipeline>),
}

/// Why a list of nodes stopped
enum Stop {
    Eof,
    End,
    Else,
    ElseIf,
}

#[derive(Clone, Copy, PartialEq)]
enum Block {
    Top,
    If,
    Range,
    With,
}

pub(crate) struct Parser<'a> {
    name: &'a str,
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    funcs: &'a FuncMap,
}

impl<'a> Parser<'a> {
    pub fn new(name: &'a str, src: &'a str, tokens: Vec<Spanned>, funcs: &'a FuncMap) -> Self {
        Self {
            name,
            src,
            tokens,
            pos: 0,
            funcs,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Node>, ParseError> {
        let (nodes, _) = self.list(Block::Top)?;
        Ok(nodes)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let offset = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(self.src.len(), |s| s.offset);
        ParseError::new(self.name, self.src, offset, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_right_delim(&mut self, context: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(Token::RightDelim) => {
                self.pos += 1;
                Ok(())
            }
            Some(other) => Err(self.error(format!("unexpected {other:?} in {context}"))),
            None => Err(self.error(format!("unclosed action in {context}"))),
        }
    }

    fn list(&mut self, block: Block) -> Result<(Vec<Node>, Stop), ParseError> {
        let mut nodes = Vec::new();
        loop {
            let Some(token) = self.next() else {
                if block == Block::Top {
                    return Ok((nodes, Stop::Eof));
                }
                return Err(self.error("unexpected EOF"));
            };

            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::LeftDelim => match self.peek() {
                    Some(Token::End) => {
                        if block == Block::Top {
                            return Err(self.error("unexpected {{end}}"));
                        }
                        self.pos += 1;
                        self.expect_right_delim("end")?;
                        return Ok((nodes, Stop::End));
                    }
                    Some(Token::Else) => {
                        if block == Block::Top {
                            return Err(self.error("unexpected {{else}}"));
                        }
                        self.pos += 1;
                        if self.peek() == Some(&Token::If) {
                            if block != Block::If {
                                return Err(self.error("else if is only allowed inside if"));
                            }
                            self.pos += 1;
                            return Ok((nodes, Stop::ElseIf));
                        }
                        self.expect_right_delim("else")?;
                        return Ok((nodes, Stop::Else));
                    }
                    Some(Token::If) => {
                        self.pos += 1;
                        nodes.push(self.if_node()?);
                    }
                    Some(Token::Range) => {
                        self.pos += 1;
                        let (pipeline, body, otherwise) = self.block(Block::Range, 2)?;
                        nodes.push(Node::Range {
                            pipeline,
                            body,
                            otherwise,
                        });
                    }
                    Some(Token::With) => {
                        self.pos += 1;
                        let (pipeline, body, otherwise) = self.block(Block::With, 1)?;
                        nodes.push(Node::With {
                            pipeline,
                            body,
                            otherwise,
                        });
                    }
                    _ => {
                        let pipeline = self.pipeline(1, "command")?;
                        self.expect_right_delim("command")?;
                        nodes.push(Node::Action(pipeline));
                    }
                },
                other => return Err(self.error(format!("unexpected {other:?}"))),
            }
        }
    }

    /// `if` after its keyword; `else if` chains nest in the else branch
    fn if_node(&mut self) -> Result<Node, ParseError> {
        let pipeline = self.pipeline(1, "if")?;
        self.expect_right_delim("if")?;

        let (then, stop) = self.list(Block::If)?;
        let otherwise = match stop {
            Stop::End => Vec::new(),
            Stop::Else => self.closing_else(Block::If)?,
            Stop::ElseIf => vec![self.if_node()?],
            Stop::Eof => return Err(self.error("unexpected EOF")),
        };

        Ok(Node::If {
            pipeline,
            then,
            otherwise,
        })
    }

    fn block(
        &mut self,
        block: Block,
        max_decl: usize,
    ) -> Result<(Pipeline, Vec<Node>, Vec<Node>), ParseError> {
        let context = if block == Block::Range { "range" } else { "with" };
        let pipeline = self.pipeline(max_decl, context)?;
        self.expect_right_delim(context)?;

        let (body, stop) = self.list(block)?;
        let otherwise = match stop {
            Stop::End => Vec::new(),
            Stop::Else => self.closing_else(block)?,
            Stop::ElseIf | Stop::Eof => return Err(self.error(format!("unexpected else if in {context}"))),
        };
        Ok((pipeline, body, otherwise))
    }

    /// The else branch, which must end with `{{end}}`
    fn closing_else(&mut self, block: Block) -> Result<Vec<Node>, ParseError> {
        let (nodes, stop) = self.list(block)?;
        match stop {
            Stop::End => Ok(nodes),
            _ => Err(self.error("expected end; found else")),
        }
    }

    fn pipeline(&mut self, max_decl: usize, context: &str) -> Result<Pipeline, ParseError> {
        let mut pipeline = Pipeline::default();

        if max_decl > 0 && self.declaration_ahead() {
            loop {
                match self.next() {
                    Some(Token::Variable(name, fields)) if fields.is_empty() => {
                        pipeline.decl.push(name)
                    }
                    _ => return Err(self.error("expected variable in declaration")),
                }
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::Declare) => break,
                    Some(Token::Assign) => {
                        pipeline.assign = true;
                        break;
                    }
                    _ => return Err(self.error("expected := or = in declaration")),
                }
            }
            if pipeline.decl.len() > max_decl {
                return Err(self.error(format!("too many declarations in {context}")));
            }
        }

        loop {
            pipeline.commands.push(self.command()?);
            if self.peek() == Some(&Token::Pipe) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(pipeline)
    }

    /// `$x :=`, `$x =` or `$x, $y :=` at the current position
    fn declaration_ahead(&self) -> bool {
        let token_at = |offset: usize| self.tokens.get(self.pos + offset).map(|s| &s.token);
        match (token_at(0), token_at(1)) {
            (Some(Token::Variable(_, fields)), Some(Token::Declare | Token::Assign | Token::Comma)) => {
                fields.is_empty()
            }
            _ => false,
        }
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        let mut args = Vec::new();
        loop {
            let arg = match self.peek() {
                None | Some(Token::Pipe | Token::RightDelim | Token::RightParen) => break,
                Some(Token::Dot) => Arg::Dot,
                Some(Token::Field(fields)) => Arg::Field(fields.clone()),
                Some(Token::Variable(name, fields)) => Arg::Variable(name.clone(), fields.clone()),
                Some(Token::Ident(name)) => {
                    if !self.funcs.contains_key(name.as_str()) {
                        return Err(self.error(format!("function {name:?} not defined")));
                    }
                    Arg::Func(name.clone())
                }
                Some(Token::Str(value)) => Arg::Literal(Value::String(value.clone())),
                Some(Token::Number(text)) => Arg::Literal(self.number(text)?),
                Some(Token::Bool(value)) => Arg::Literal(Value::Bool(*value)),
                Some(Token::Nil) => Arg::Literal(Value::Null),
                Some(Token::LeftParen) => {
                    self.pos += 1;
                    let inner = self.pipeline(0, "parenthesized pipeline")?;
                    match self.peek() {
                        Some(Token::RightParen) => {}
                        _ => return Err(self.error("unclosed left paren")),
                    }
                    Arg::Pipeline(Box::new(inner))
                }
                Some(other) => return Err(self.error(format!("unexpected {other:?} in operand"))),
            };
            self.pos += 1;
            args.push(arg);
        }

        if args.is_empty() {
            return Err(self.error("missing value for command"));
        }
        Ok(Command { args })
    }

    fn number(&self, text: &str) -> Result<Value, ParseError> {
        let cleaned = text.replace('_', "");
        if let Ok(int) = cleaned.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        let hex = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
            .and_then(|digits| i64::from_str_radix(digits, 16).ok());
        if let Some(int) = hex {
            return Ok(Value::Number(int.into()));
        }
        cleaned
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error(format!("bad number syntax: {text:?}")))
    }
}
