use std::cmp::Ordering;
use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use super::exec::{is_true, printed};
use super::ExecError;
use crate::utils::escape_html;

/// A function callable from a template
pub type Func = fn(&[Value]) -> Result<Value, ExecError>;

/// Functions available to a template, by name
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: HashMap<&'static str, Func>,
}

impl FuncMap {
    /// An empty map; templates may only use literals, fields and variables
    pub fn new() -> Self {
        Self::default()
    }

    /// The predefined functions every template can call
    pub fn builtins() -> Self {
        let mut map = Self::new();
        map.insert("and", and);
        map.insert("or", or);
        map.insert("not", not);
        map.insert("len", len);
        map.insert("index", index);
        map.insert("print", print);
        map.insert("html", html);
        map.insert("urlquery", urlquery);
        map.insert("eq", eq);
        map.insert("ne", ne);
        map.insert("lt", lt);
        map.insert("le", le);
        map.insert("gt", gt);
        map.insert("ge", ge);
        map
    }

    pub fn insert(&mut self, name: &'static str, func: Func) -> &mut Self {
        self.funcs.insert(name, func);
        self
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Func> {
        self.funcs.get(name).copied()
    }
}

/// Decode a standard base64 string into text
pub fn from_base64(args: &[Value]) -> Result<Value, ExecError> {
    let [Value::String(encoded)] = args else {
        return Err(ExecError::call("from_base64", "expects one string argument"));
    };
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ExecError::call("from_base64", format!("decoding template base64: {e}")))?;
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

fn expect_at_least<'a>(name: &str, args: &'a [Value], count: usize) -> Result<&'a [Value], ExecError> {
    if args.len() < count {
        return Err(ExecError::call(
            name,
            format!("wrong number of args: want at least {count}, got {}", args.len()),
        ));
    }
    Ok(args)
}

fn and(args: &[Value]) -> Result<Value, ExecError> {
    let args = expect_at_least("and", args, 1)?;
    let found = args.iter().find(|value| !is_true(value));
    Ok(found.unwrap_or(&args[args.len() - 1]).clone())
}

fn or(args: &[Value]) -> Result<Value, ExecError> {
    let args = expect_at_least("or", args, 1)?;
    let found = args.iter().find(|value| is_true(value));
    Ok(found.unwrap_or(&args[args.len() - 1]).clone())
}

fn not(args: &[Value]) -> Result<Value, ExecError> {
    let [value] = args else {
        return Err(ExecError::call("not", "expects one argument"));
    };
    Ok(Value::Bool(!is_true(value)))
}

fn len(args: &[Value]) -> Result<Value, ExecError> {
    let length = match args {
        [Value::String(text)] => text.len(),
        [Value::Array(items)] => items.len(),
        [Value::Object(map)] => map.len(),
        [other] => return Err(ExecError::call("len", format!("len of {}", type_name(other)))),
        _ => return Err(ExecError::call("len", "expects one argument")),
    };
    Ok(Value::from(length))
}

fn index(args: &[Value]) -> Result<Value, ExecError> {
    let args = expect_at_least("index", args, 1)?;
    let mut current = args[0].clone();
    for key in &args[1..] {
        current = match (&current, key) {
            (Value::Array(items), Value::Number(n)) => {
                let idx = n
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| ExecError::call("index", format!("index out of range: {n}")))?;
                items[idx].clone()
            }
            (Value::Object(map), Value::String(name)) => map.get(name).cloned().unwrap_or(Value::Null),
            (Value::Null, _) => Value::Null,
            (container, key) => {
                return Err(ExecError::call(
                    "index",
                    format!("can't index item of type {} with {}", type_name(container), type_name(key)),
                ));
            }
        };
    }
    Ok(current)
}

/// Operands are joined with a space when neither side is a string
fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, value) in args.iter().enumerate() {
        if i > 0 && !args[i - 1].is_string() && !value.is_string() {
            out.push(' ');
        }
        out.push_str(&printed(value));
    }
    out
}

fn print(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::String(sprint(args)))
}

fn html(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::String(escape_html(&sprint(args))))
}

fn urlquery(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::String(urlencoding::encode(&sprint(args)).into_owned()))
}

fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// True when the first argument equals any of the rest
fn eq(args: &[Value]) -> Result<Value, ExecError> {
    let args = expect_at_least("eq", args, 2)?;
    Ok(Value::Bool(args[1..].iter().any(|other| equal(&args[0], other))))
}

fn ne(args: &[Value]) -> Result<Value, ExecError> {
    let [a, b] = args else {
        return Err(ExecError::call("ne", "expects two arguments"));
    };
    Ok(Value::Bool(!equal(a, b)))
}

fn compare(name: &str, args: &[Value]) -> Result<Ordering, ExecError> {
    let ordering = match args {
        [Value::Number(a), Value::Number(b)] => a.as_f64().partial_cmp(&b.as_f64()),
        [Value::String(a), Value::String(b)] => Some(a.cmp(b)),
        [a, b] => {
            return Err(ExecError::call(
                name,
                format!("incompatible types for comparison: {} and {}", type_name(a), type_name(b)),
            ));
        }
        _ => return Err(ExecError::call(name, "expects two arguments")),
    };
    ordering.ok_or_else(|| ExecError::call(name, "values are not comparable"))
}

fn lt(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::Bool(compare("lt", args)? == Ordering::Less))
}

fn le(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::Bool(compare("le", args)? != Ordering::Greater))
}

fn gt(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::Bool(compare("gt", args)? == Ordering::Greater))
}

fn ge(args: &[Value]) -> Result<Value, ExecError> {
    Ok(Value::Bool(compare("ge", args)? != Ordering::Less))
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "slice",
        Value::Object(_) => "map",
    }
}
