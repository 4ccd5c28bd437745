//! Evaluation of a parsed template against a JSON value tree.

use std::fmt::Write;

use serde_json::Value;

use super::funcs::{type_name, FuncMap};
use super::parse::{Arg, Command, Node, Pipeline};
use super::ExecError;

/// Text printed for a missing value
pub(crate) const NO_VALUE: &str = "<no value>";

/// Truthiness: false, zero, null and empty strings or collections are false
pub(crate) fn is_true(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as an action prints it
pub(crate) fn printed(value: &Value) -> String {
    match value {
        Value::Null => NO_VALUE.to_string(),
        Value::String(s) => s.clone(),
        other => nested(other),
    }
}

fn nested(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(nested).collect();
            format!("[{}]", inner.join(" "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map.iter().map(|(k, v)| format!("{k}:{}", nested(v))).collect();
            format!("map[{}]", inner.join(" "))
        }
    }
}

pub(crate) struct State<'t, W> {
    funcs: &'t FuncMap,
    out: &'t mut W,
    vars: Vec<(String, Value)>,
}

impl<'t, W: Write> State<'t, W> {
    pub fn new(funcs: &'t FuncMap, out: &'t mut W, root: &Value) -> Self {
        Self {
            funcs,
            out,
            vars: vec![(String::new(), root.clone())],
        }
    }

    pub fn walk(&mut self, dot: &Value, nodes: &[Node]) -> Result<(), ExecError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.write_str(text)?,
                Node::Action(pipeline) => {
                    let value = self.pipeline(dot, pipeline)?;
                    if pipeline.decl.is_empty() {
                        self.out.write_str(&printed(&value))?;
                    }
                }
                Node::If {
                    pipeline,
                    then,
                    otherwise,
                } => {
                    let mark = self.vars.len();
                    let value = self.pipeline(dot, pipeline)?;
                    let branch = if is_true(&value) { then } else { otherwise };
                    self.walk(dot, branch)?;
                    self.vars.truncate(mark);
                }
                Node::With {
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let mark = self.vars.len();
                    let value = self.pipeline(dot, pipeline)?;
                    if is_true(&value) {
                        self.walk(&value, body)?;
                    } else {
                        self.walk(dot, otherwise)?;
                    }
                    self.vars.truncate(mark);
                }
                Node::Range {
                    pipeline,
                    body,
                    otherwise,
                } => self.range(dot, pipeline, body, otherwise)?,
            }
        }
        Ok(())
    }

    fn range(
        &mut self,
        dot: &Value,
        pipeline: &Pipeline,
        body: &[Node],
        otherwise: &[Node],
    ) -> Result<(), ExecError> {
        let mark = self.vars.len();
        let value = self.commands(dot, &pipeline.commands)?;

        let items: Vec<(Value, Value)> = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item))
                .collect(),
            Value::Object(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
            other => {
                return Err(ExecError::Eval(format!("range can't iterate over {}", printed(&other))));
            }
        };

        if items.is_empty() {
            self.walk(dot, otherwise)?;
            return Ok(());
        }

        for (key, item) in items {
            match pipeline.decl.as_slice() {
                [] => {}
                [element] => self.vars.push((element.clone(), item.clone())),
                [index, element, ..] => {
                    self.vars.push((index.clone(), key));
                    self.vars.push((element.clone(), item.clone()));
                }
            }
            self.walk(&item, body)?;
            self.vars.truncate(mark);
        }
        Ok(())
    }

    fn pipeline(&mut self, dot: &Value, pipeline: &Pipeline) -> Result<Value, ExecError> {
        let value = self.commands(dot, &pipeline.commands)?;

        for name in &pipeline.decl {
            if pipeline.assign {
                let slot = self
                    .vars
                    .iter_mut()
                    .rev()
                    .find(|(var, _)| var == name)
                    .ok_or_else(|| ExecError::Eval(format!("undefined variable: ${name}")))?;
                slot.1 = value.clone();
            } else {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    fn commands(&mut self, dot: &Value, commands: &[Command]) -> Result<Value, ExecError> {
        let mut piped: Option<Value> = None;
        for command in commands {
            piped = Some(self.command(dot, command, piped.take())?);
        }
        Ok(piped.unwrap_or(Value::Null))
    }

    fn command(&mut self, dot: &Value, command: &Command, piped: Option<Value>) -> Result<Value, ExecError> {
        match command.args.as_slice() {
            [Arg::Func(name), rest @ ..] => {
                let mut args = Vec::with_capacity(rest.len() + 1);
                for arg in rest {
                    args.push(self.arg(dot, arg)?);
                }
                args.extend(piped);
                self.call(name, &args)
            }
            [single] if piped.is_none() => self.arg(dot, single),
            [first, ..] => Err(ExecError::Eval(format!(
                "can't give argument to non-function {}",
                describe(first)
            ))),
            [] => Err(ExecError::Eval("empty command".to_string())),
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExecError> {
        let func = self
            .funcs
            .get(name)
            .ok_or_else(|| ExecError::Eval(format!("function {name:?} not defined")))?;
        func(args)
    }

    fn arg(&mut self, dot: &Value, arg: &Arg) -> Result<Value, ExecError> {
        match arg {
            Arg::Dot => Ok(dot.clone()),
            Arg::Field(fields) => fields_of(dot, fields),
            Arg::Variable(name, fields) => {
                let value = self
                    .vars
                    .iter()
                    .rev()
                    .find(|(var, _)| var == name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| ExecError::Eval(format!("undefined variable: ${name}")))?;
                fields_of(value, fields)
            }
            Arg::Func(name) => self.call(name, &[]),
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Pipeline(pipeline) => self.commands(dot, &pipeline.commands),
        }
    }
}

/// Follow `fields` from `value`; missing keys and null parents yield null
fn fields_of(value: &Value, fields: &[String]) -> Result<Value, ExecError> {
    let mut current = value;
    for field in fields {
        current = match current {
            Value::Object(map) => match map.get(field) {
                Some(next) => next,
                None => return Ok(Value::Null),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(ExecError::Eval(format!(
                    "can't evaluate field {field} in type {}",
                    type_name(other)
                )));
            }
        };
    }
    Ok(current.clone())
}

fn describe(arg: &Arg) -> String {
    match arg {
        Arg::Dot => ".".to_string(),
        Arg::Field(fields) => format!(".{}", fields.join(".")),
        Arg::Variable(name, _) => format!("${name}"),
        Arg::Func(name) => name.clone(),
        Arg::Literal(value) => printed(value),
        Arg::Pipeline(_) => "(pipeline)".to_string(),
    }
}
