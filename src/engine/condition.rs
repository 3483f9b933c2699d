// src/engine/condition.rs

//! WHERE-clause parsing and value comparison
//!
//! A condition expression is a flat token sequence of the shape
//! `COL OP VAL [and COL OP VAL]* [or COL OP VAL ...]*`. Parsing produces a
//! two-level structure: the outer list is OR-joined, conditions within a
//! group are AND-joined.

use crate::error::{Error, Result};
use crate::schema::{NULL_MARKER, Schema, validate_value};
use std::str::FromStr;

/// Comparison operators accepted in condition atoms
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
    pub fn as_str(&self) -> &str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::Ge),
            "<=" => Ok(CompareOp::Le),
            _ => Err(format!("Invalid comparison operator: {}", s)),
        }
    }
}

/// One `column OP value` atom
#[derive(Debug, Clone)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

/// OR-joined groups of AND-joined conditions
pub type ConditionGroups = Vec<Vec<Condition>>;

/// Trim a token and strip one pair of surrounding quotes, if present
pub fn strip_quotes(token: &str) -> String {
    let trimmed = token.trim();
    let stripped = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    stripped.unwrap_or(trimmed).to_string()
}

/// Parse a condition token stream against a schema
///
/// Tokens are consumed in triples. A following `and` keeps the group open;
/// `or` closes it and starts a new one. Columns must exist in the schema and
/// values must validate against their column's type.
pub fn parse_condition_groups(tokens: &[String], schema: &Schema) -> Result<ConditionGroups> {
    let mut groups: ConditionGroups = Vec::new();
    let mut current: Vec<Condition> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        if i + 2 >= tokens.len() {
            return Err(Error::Syntax(
                "Not enough arguments to form a condition.".to_string(),
            ));
        }
        let column = strip_quotes(&tokens[i]);
        let op: CompareOp = tokens[i + 1].parse().map_err(|_| {
            Error::Syntax(format!("unexpected operator \"{}\".", tokens[i + 1]))
        })?;
        let value = strip_quotes(&tokens[i + 2]);

        let col = schema.column(&column).ok_or_else(|| {
            Error::Logic(format!("Column \"{}\" does not exist in table.", column))
        })?;
        if value == NULL_MARKER || !validate_value(&value, col.ty) {
            return Err(Error::Mismatch(format!(
                "Value {} is not valid for column {} of type {}.",
                value,
                column,
                col.ty.as_str()
            )));
        }

        current.push(Condition { column, op, value });
        i += 3;

        if i < tokens.len() && tokens[i] == "and" {
            i += 1;
        }
        if i < tokens.len() && tokens[i] == "or" {
            groups.push(std::mem::take(&mut current));
            i += 1;
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    Ok(groups)
}

/// Compare two cell values under an operator
///
/// When both sides parse as doubles the comparison is numeric, otherwise it
/// is lexicographic. Equality and inequality are always textual.
pub fn compare_values(actual: &str, op: CompareOp, expected: &str) -> bool {
    let numeric = actual
        .parse::<f64>()
        .ok()
        .zip(expected.parse::<f64>().ok());
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Ne => actual != expected,
        CompareOp::Gt => numeric.map_or(actual > expected, |(a, b)| a > b),
        CompareOp::Lt => numeric.map_or(actual < expected, |(a, b)| a < b),
        CompareOp::Ge => numeric.map_or(actual >= expected, |(a, b)| a >= b),
        CompareOp::Le => numeric.map_or(actual <= expected, |(a, b)| a <= b),
    }
}
