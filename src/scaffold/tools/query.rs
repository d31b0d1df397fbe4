//! Read-only JSONPath queries over the agent's data document.
//!
//! Supported syntax: `$` root, `.name` and `['name']` children, `[n]`
//! indices (negative counts from the end), `[start:end]` slices, `.*` and
//! `[*]` wildcards, and `..` recursive descent before any of them.
//! Filter and script expressions are rejected.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use super::{string_arg, Tool, ToolError, ToolOutput};
use crate::scaffold::state::ConversationState;

/// Reasons a JSONPath expression fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path must start with '$'")]
    MissingRoot,

    #[error("unexpected end of path")]
    UnexpectedEnd,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid index '{0}'")]
    InvalidIndex(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("filter expressions are not supported")]
    UnsupportedFilter,
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Name(String),
    Index(i64),
    Slice { start: Option<i64>, end: Option<i64> },
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    selector: Selector,
    recursive: bool,
}

/// A parsed JSONPath expression.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let chars: Vec<char> = input.trim().chars().collect();
        if chars.first() != Some(&'$') {
            return Err(PathError::MissingRoot);
        }

        let mut parser = Parser { chars, pos: 1 };
        let mut segments = Vec::new();

        while let Some(ch) = parser.peek() {
            match ch {
                '.' => {
                    parser.pos += 1;
                    let recursive = parser.eat('.');
                    let selector = match parser.peek() {
                        None => return Err(PathError::UnexpectedEnd),
                        Some('[') if recursive => {
                            parser.pos += 1;
                            parser.bracket()?
                        }
                        Some('*') => {
                            parser.pos += 1;
                            Selector::Wildcard
                        }
                        Some(_) => Selector::Name(parser.name()?),
                    };
                    segments.push(Segment {
                        selector,
                        recursive,
                    });
                }
                '[' => {
                    parser.pos += 1;
                    segments.push(Segment {
                        selector: parser.bracket()?,
                        recursive: false,
                    });
                }
                ch => {
                    return Err(PathError::UnexpectedChar {
                        ch,
                        pos: parser.pos,
                    })
                }
            }
        }

        Ok(Self { segments })
    }

    /// All values matched in `root`, in document order.
    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                if segment.recursive {
                    let mut nodes = Vec::new();
                    descendants(node, &mut nodes);
                    for n in nodes {
                        apply(&segment.selector, n, &mut next);
                    }
                } else {
                    apply(&segment.selector, node, &mut next);
                }
            }
            current = next;
        }
        current
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), PathError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(PathError::UnexpectedEnd),
            Some(ch) if ch == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(ch) => Err(PathError::UnexpectedChar { ch, pos: self.pos }),
        }
    }

    /// Dot-notation member name.
    fn name(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '.' || ch == '[' {
                break;
            }
            if ch == ']' || ch == '*' || ch == '\'' || ch == '"' || ch.is_whitespace() {
                return Err(PathError::UnexpectedChar { ch, pos: self.pos });
            }
            self.pos += 1;
        }
        if start == self.pos {
            return match self.peek() {
                Some(ch) => Err(PathError::UnexpectedChar { ch, pos: self.pos }),
                None => Err(PathError::UnexpectedEnd),
            };
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Selector between `[` (already consumed) and `]`.
    fn bracket(&mut self) -> Result<Selector, PathError> {
        self.skip_whitespace();
        let selector = match self.peek() {
            None => return Err(PathError::UnexpectedEnd),
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                Selector::Name(self.quoted(quote)?)
            }
            Some('?') | Some('(') => return Err(PathError::UnsupportedFilter),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == ':' => self.index()?,
            Some(ch) => return Err(PathError::UnexpectedChar { ch, pos: self.pos }),
        };
        self.expect(']')?;
        Ok(selector)
    }

    fn quoted(&mut self, quote: char) -> Result<String, PathError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(PathError::UnterminatedString),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or(PathError::UnterminatedString)?;
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += 1;
                }
            }
        }
    }

    fn index(&mut self) -> Result<Selector, PathError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ']') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let raw = raw.trim();

        let parse = |s: &str| -> Result<Option<i64>, PathError> {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<i64>()
                .map(Some)
                .map_err(|_| PathError::InvalidIndex(raw.to_string()))
        };

        let parts: Vec<&str> = raw.split(':').collect();
        match parts.as_slice() {
            [single] => parse(*single)?
                .map(Selector::Index)
                .ok_or_else(|| PathError::InvalidIndex(raw.to_string())),
            [start, end] => Ok(Selector::Slice {
                start: parse(*start)?,
                end: parse(*end)?,
            }),
            _ => Err(PathError::InvalidIndex(raw.to_string())),
        }
    }
}

/// `node` followed by every value nested under it, pre-order.
fn descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    match node {
        Value::Object(map) => map.values().for_each(|v| descendants(v, out)),
        Value::Array(items) => items.iter().for_each(|v| descendants(v, out)),
        _ => {}
    }
}

fn apply<'a>(selector: &Selector, node: &'a Value, out: &mut Vec<&'a Value>) {
    match (selector, node) {
        (Selector::Name(name), Value::Object(map)) => out.extend(map.get(name)),
        (Selector::Wildcard, Value::Object(map)) => out.extend(map.values()),
        (Selector::Wildcard, Value::Array(items)) => out.extend(items.iter()),
        (Selector::Index(index), Value::Array(items)) => {
            let len = items.len() as i64;
            let resolved = if *index < 0 { len + index } else { *index };
            if (0..len).contains(&resolved) {
                out.push(&items[resolved as usize]);
            }
        }
        (Selector::Slice { start, end }, Value::Array(items)) => {
            let len = items.len() as i64;
            let clamp = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
            let from = start.map(clamp).unwrap_or(0);
            let to = end.map(clamp).unwrap_or(len);
            if from < to {
                out.extend(items[from as usize..to as usize].iter());
            }
        }
        _ => {}
    }
}

/// Render one matched value for the model; strings are returned bare.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluate `path` against `data` and render the result as text.
///
/// Never fails: no match and malformed paths produce sentinel strings the
/// model can read and react to.
pub fn query(path: &str, data: &Value) -> String {
    let parsed = match JsonPath::parse(path) {
        Ok(parsed) => parsed,
        Err(e) => return format!("Error: invalid JSONPath expression '{}': {}", path, e),
    };

    match parsed.select(data).as_slice() {
        [] => format!("No matches found for path: {}", path),
        [single] => render(single),
        many => Value::Array(many.iter().map(|v| (*v).clone()).collect()).to_string(),
    }
}

/// Tool exposing [`query`] over the conversation's data document.
pub struct QueryTool;

#[async_trait]
impl Tool for QueryTool {
    fn name(&self) -> &str {
        "jsonpath_query"
    }

    fn description(&self) -> &str {
        "Query the structured data store with a JSONPath expression (e.g. '$.user.name', \
         '$.items[0]', '$.items[*]', '$..id'). Returns the matched value, a JSON list for \
         multiple matches, or a message when nothing matches."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "JSONPath expression starting with '$'"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, state: &ConversationState) -> Result<ToolOutput, ToolError> {
        let path = string_arg(&args, "path")?;
        Ok(ToolOutput::value(query(path, &state.data)))
    }
}
