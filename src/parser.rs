use std::fmt;
use std::str::FromStr;

use crate::db_types::{Predicate, Value};
use crate::error::{DbError, Result};

/// Turns a literal token into a typed value. Never fails: anything that
/// is not a bool, null, integer or quoted string is kept as a string.
/// Integer literals too large for `i64` become [`Value::Overflow`], which
/// every column rejects.
pub fn parse_value(token: &str) -> Value {
    let token = token.trim();
    match token.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "none" => return Value::Null,
        _ => {}
    }

    if is_integer(token) {
        return token
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Overflow(token.to_string()));
    }

    if let Some(inner) = strip_quotes(token) {
        return Value::Text(inner.to_string());
    }

    Value::Text(token.to_string())
}

fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn strip_quotes(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if token.len() < 2 || !(first == '"' || first == '\'') || !token.ends_with(first) {
        return None;
    }
    Some(&token[1..token.len() - 1])
}

/// Parses `(v1, v2, ...)`. Commas inside quotes do not split.
pub fn parse_value_list(text: &str) -> Result<Vec<Value>> {
    let text = text.trim();
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| {
            DbError::Format(format!("{}. Expected '(value1, value2, ...)'.", text))
        })?
        .trim();

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
                // a closing quote right before a comma or the end closes the token
                if matches!(chars.peek(), None | Some(',')) {
                    push_token(&mut tokens, &mut current);
                    chars.next_if_eq(&',');
                }
            }
            None if ch == ',' => push_token(&mut tokens, &mut current),
            _ => current.push(ch),
        }
    }
    push_token(&mut tokens, &mut current);

    Ok(tokens.iter().map(|t| parse_value(t)).collect())
}

fn push_token(tokens: &mut Vec<String>, current: &mut String) {
    let token = std::mem::take(current);
    let token = token.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
}

/// Parses a `column = value` fragment, used for both WHERE and SET.
/// Only the first `=` splits.
pub fn parse_equality(text: &str) -> Result<Predicate> {
    let (column, value) = text.split_once('=').ok_or_else(|| {
        DbError::Format(format!("{}. Expected 'column = value'.", text.trim()))
    })?;
    let column = column.trim();
    if column.is_empty() {
        return Err(DbError::Format(format!(
            "{}. Column name is missing.",
            text.trim()
        )));
    }
    Ok(Predicate::from([(column.to_string(), parse_value(value))]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    /// Equality uses the stored type's native equality; the ordered
    /// operators need both sides to share an orderable type.
    pub fn matches(&self, stored: &Value, expected: &Value) -> bool {
        match self {
            CompareOp::Eq => stored == expected,
            CompareOp::Ne => stored != expected,
            CompareOp::Gt => stored.compare(expected).is_some_and(|o| o.is_gt()),
            CompareOp::Lt => stored.compare(expected).is_some_and(|o| o.is_lt()),
            CompareOp::Ge => stored.compare(expected).is_some_and(|o| o.is_ge()),
            CompareOp::Le => stored.compare(expected).is_some_and(|o| o.is_le()),
        }
    }
}

impl FromStr for CompareOp {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::Ge),
            "<=" => Ok(CompareOp::Le),
            other => Err(DbError::Format(format!("unknown operator '{}'", other))),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A WHERE condition for `select`: either the equality predicate or a
/// single ordered comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Predicate),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
}

/// Parses `column <op> value`, where `<op>` is the first comparison
/// operator found outside quotes. Plain `=` goes through
/// [`parse_equality`].
pub fn parse_condition(text: &str) -> Result<Condition> {
    let (start, op) = find_operator(text).ok_or_else(|| {
        DbError::Format(format!("{}. Expected 'column <op> value'.", text.trim()))
    })?;
    if op == CompareOp::Eq {
        return parse_equality(text).map(Condition::Equals);
    }

    let column = text[..start].trim();
    if column.is_empty() {
        return Err(DbError::Format(format!(
            "{}. Column name is missing.",
            text.trim()
        )));
    }
    let value = parse_value(&text[start + op.symbol().len()..]);
    Ok(Condition::Compare {
        column: column.to_string(),
        op,
        value,
    })
}

fn find_operator(text: &str) -> Option<(usize, CompareOp)> {
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match (quote, ch) {
            (None, '"' | '\'') => quote = Some(ch),
            (Some(q), c) if c == q => quote = None,
            (None, '!' | '<' | '>' | '=') => {
                let rest = &text[i..];
                let op = ["!=", ">=", "<=", ">", "<", "="]
                    .into_iter()
                    .find(|sym| rest.starts_with(sym));
                if let Some(sym) = op {
                    return sym.parse::<CompareOp>().ok().map(|op| (i, op));
                }
            }
            _ => {}
        }
    }
    None
}
