//! A small text-template language for rendering API responses.
//!
//! Actions are delimited by `{{` and `}}` and evaluate against a JSON value
//! tree: `{{.logfiles}}` reads a field of the current value, `{{$}}` is the
//! root, and pipelines such as `{{.contents | from_base64 | html}}` pass each
//! result as the last argument of the next function. Control structures are
//! `if`/`else if`/`else`, `range` and `with`, each closed by `{{end}}`.
//!
//! Output is not escaped; use the `html` and `urlquery` functions where a
//! value lands in markup or a query string.

mod exec;
mod funcs;
mod lexer;
mod parse;

use serde_json::Value;
use thiserror::Error;

pub use funcs::{from_base64, Func, FuncMap};

use exec::State;
use lexer::Lexer;
use parse::{Node, Parser};

/// A template failed to tokenize or parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template: {name}:{line}: {message}")]
pub struct ParseError {
    pub name: String,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(name: &str, src: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(src.len());
        Self {
            name: name.to_string(),
            line: src.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1,
            message: message.into(),
        }
    }
}

/// A parsed template failed while producing output
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("executing template: {0}")]
    Eval(String),
    #[error("error calling {name}: {message}")]
    Call { name: String, message: String },
    #[error("writing template output: {0}")]
    Write(#[from] std::fmt::Error),
}

impl ExecError {
    pub(crate) fn call(name: &str, message: impl Into<String>) -> Self {
        ExecError::Call {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// A parsed template, ready to execute any number of times
#[derive(Clone)]
pub struct Template {
    nodes: Vec<Node>,
    funcs: FuncMap,
}

impl Template {
    /// Parse `src`; every function the template names must be in `funcs`
    pub fn parse(name: &str, src: &str, funcs: FuncMap) -> Result<Self, ParseError> {
        let tokens = Lexer::new(name, src).tokenize()?;
        let nodes = Parser::new(name, src, tokens, &funcs).parse()?;
        Ok(Self { nodes, funcs })
    }

    /// Write the output for `data` into `out`
    pub fn execute<W: std::fmt::Write>(&self, out: &mut W, data: &Value) -> Result<(), ExecError> {
        State::new(&self.funcs, out, data).walk(data, &self.nodes)
    }

    /// Execute into a fresh string
    pub fn render(&self, data: &Value) -> Result<String, ExecError> {
        let mut out = String::new();
        self.execute(&mut out, data)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(src: &str, data: Value) -> String {
        let mut funcs = FuncMap::builtins();
        funcs.insert("from_base64", from_base64);
        Template::parse("test", src, funcs)
            .unwrap()
            .render(&data)
            .unwrap()
    }

    #[test]
    fn prints_fields_and_missing_values() {
        let data = json!({"Request": "http://localhost/hello", "page": 2, "nested": {"ok": true}});
        assert_eq!(render("{{.Request}}", data.clone()), "http://localhost/hello");
        assert_eq!(render("{{.page}} {{.nested.ok}}", data.clone()), "2 true");
        assert_eq!(render("{{.nextPage}}", data.clone()), "<no value>");
        assert_eq!(render("{{.missing.deeper}}", data), "<no value>");
    }

    #[test]
    fn ranges_over_listings() {
        let data = json!({"logfiles": [
            {"name": "a.txt", "dir": false},
            {"name": "worker", "dir": true},
        ]});
        let src = "{{range .logfiles}}{{if .dir}}[{{.name}}]{{else}}{{.name}}{{end}};{{end}}";
        assert_eq!(render(src, data.clone()), "a.txt;[worker];");

        let src = "{{range $i, $e := .logfiles}}{{$i}}={{$e.name}} {{end}}";
        assert_eq!(render(src, data), "0=a.txt 1=worker ");
    }

    #[test]
    fn range_else_on_empty() {
        assert_eq!(render("{{range .logfiles}}x{{else}}empty{{end}}", json!({"logfiles": []})), "empty");
        assert_eq!(render("{{range .nothing}}x{{else}}empty{{end}}", json!({})), "empty");
    }

    #[test]
    fn with_rebinds_dot_and_root_stays_reachable() {
        let data = json!({"meta": {"name": "slog.txt"}, "path": "worker/slog.txt"});
        assert_eq!(render("{{with .meta}}{{.name}} in {{$.path}}{{end}}", data), "slog.txt in worker/slog.txt");
        assert_eq!(render("{{with .none}}x{{else}}none{{end}}", json!({})), "none");
    }

    #[test]
    fn pipelines_and_parentheses() {
        let data = json!({"contents": "PGI+aGk8L2I+"});
        assert_eq!(render("{{.contents | from_base64}}", data.clone()), "<b>hi</b>");
        assert_eq!(render("{{html (from_base64 .contents)}}", data.clone()), "&lt;b&gt;hi&lt;/b&gt;");
        assert_eq!(render("{{if gt (len .contents) 3}}long{{end}}", data), "long");
    }

    #[test]
    fn variables_declare_and_assign() {
        let src = "{{$n := .page}}{{if .next}}{{$n = .next}}{{end}}{{$n}}";
        assert_eq!(render(src, json!({"page": 1, "next": 2})), "2");
        assert_eq!(render(src, json!({"page": 1})), "1");
    }

    #[test]
    fn else_if_chain() {
        let src = "{{if eq .n 1}}one{{else if eq .n 2}}two{{else}}many{{end}}";
        assert_eq!(render(src, json!({"n": 1})), "one");
        assert_eq!(render(src, json!({"n": 2})), "two");
        assert_eq!(render(src, json!({"n": 9})), "many");
    }

    #[test]
    fn prints_collections() {
        assert_eq!(render("{{.}}", json!([1, "a", null])), "[1 a <nil>]");
        assert_eq!(render("{{.}}", json!({"b": 2, "a": 1})), "map[a:1 b:2]");
    }

    #[test]
    fn parse_errors_report_line() {
        let err = Template::parse("response", "ok\n{{if .x}}", FuncMap::builtins()).err().unwrap();
        assert_eq!(err.name, "response");
        assert_eq!(err.line, 2);
        assert!(err.to_string().starts_with("template: response:2:"));

        let err = Template::parse("response", "{{from_base64 .x}}", FuncMap::builtins()).err().unwrap();
        assert!(err.message.contains("from_base64"));
    }

    #[test]
    fn exec_errors() {
        let template = Template::parse("t", "{{.name.first}}", FuncMap::builtins()).unwrap();
        assert!(template.render(&json!({"name": "plain"})).is_err());

        let mut funcs = FuncMap::builtins();
        funcs.insert("from_base64", from_base64);
        let template = Template::parse("t", "{{from_base64 .x}}", funcs).unwrap();
        assert!(matches!(template.render(&json!({"x": "%%%"})), Err(ExecError::Call { .. })));

        let template = Template::parse("t", "{{.x 1}}", FuncMap::builtins()).unwrap();
        assert!(template.render(&json!({"x": 1})).is_err());
    }
}
