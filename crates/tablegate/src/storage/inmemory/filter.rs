//! Minimal OData filter evaluation for the in-memory store.
//!
//! Supports `<field> <op> <literal>` comparisons joined by `and`, where `op`
//! is one of `eq ne gt ge lt le` and the literal is a quoted string, a
//! number, `true` or `false`.

use std::cmp::Ordering;

use tablegate_core::entity::{Entity, Value, PARTITION_KEY, ROW_KEY};
use tablegate_core::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    field: String,
    op: Op,
    literal: Value,
}

/// A parsed conjunction of comparisons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    /// Parses a filter expression. `None` or blank matches everything.
    pub fn parse(expression: Option<&str>) -> Result<Self, StoreError> {
        let Some(expression) = expression.map(str::trim).filter(|e| !e.is_empty()) else {
            return Ok(Self::default());
        };

        let terms = split_conjunction(expression)
            .into_iter()
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { terms })
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.terms.iter().all(|term| term.matches(entity))
    }
}

impl Term {
    fn matches(&self, entity: &Entity) -> bool {
        let actual = match self.field.as_str() {
            PARTITION_KEY => Value::String(entity.partition_key.clone()),
            ROW_KEY => Value::String(entity.row_key.clone()),
            field => match entity.fields.get(field) {
                Some(value) => value.clone(),
                None => return self.op == Op::Ne,
            },
        };

        match compare(&actual, &self.literal) {
            Some(ordering) => match self.op {
                Op::Eq => ordering == Ordering::Equal,
                Op::Ne => ordering != Ordering::Equal,
                Op::Gt => ordering == Ordering::Greater,
                Op::Ge => ordering != Ordering::Less,
                Op::Lt => ordering == Ordering::Less,
                Op::Le => ordering != Ordering::Greater,
            },
            None => self.op == Op::Ne,
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Splits on ` and ` outside of quoted literals, case-insensitively.
fn split_conjunction(expression: &str) -> Vec<&str> {
    let lower = expression.to_ascii_lowercase().into_bytes();
    let bytes = expression.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\'' {
            in_quotes = !in_quotes;
        } else if !in_quotes && lower[i..].starts_with(b" and ") {
            parts.push(expression[start..i].trim());
            i += " and ".len();
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(expression[start..].trim());
    parts
}

fn parse_term(text: &str) -> Result<Term, StoreError> {
    let invalid = || StoreError::Request {
        status: 400,
        code: "InvalidInput".to_string(),
        message: format!("unsupported filter term: {text}"),
    };

    let text = text.trim_start_matches('(').trim_end_matches(')').trim();
    let mut parts = text.splitn(3, ' ');
    let field = parts.next().filter(|f| !f.is_empty()).ok_or_else(invalid)?;
    let op = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("eq") => Op::Eq,
        Some("ne") => Op::Ne,
        Some("gt") => Op::Gt,
        Some("ge") => Op::Ge,
        Some("lt") => Op::Lt,
        Some("le") => Op::Le,
        _ => return Err(invalid()),
    };
    let literal = parse_literal(parts.next().unwrap_or_default().trim()).ok_or_else(invalid)?;

    Ok(Term {
        field: field.to_string(),
        op,
        literal,
    })
}

fn parse_literal(text: &str) -> Option<Value> {
    if let Some(inner) = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        // Inside a literal a quote only appears doubled.
        if inner.replace("''", "").contains('\'') {
            return None;
        }
        return Some(Value::String(inner.replace("''", "'")));
    }

    match text {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => text
            .trim_end_matches('L')
            .parse::<i64>()
            .map(Value::Int)
            .ok()
            .or_else(|| text.parse::<f64>().map(Value::Float).ok()),
    }
}
