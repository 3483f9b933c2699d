// src/query/mod.rs

//! Query language front-end
//!
//! This module turns typed lines into executed statements:
//! - Tokenizing the raw line (quotes, value lists, punctuation operators)
//! - Splitting the token stream into pipe-separated statements
//! - Dispatching each statement's verb against the session

pub mod parser;
pub mod tokenizer;

use crate::error::{Error, Result};

/// Split a token stream into statements on standalone `|` tokens
///
/// Empty statements (leading, trailing, or doubled pipes) are rejected.
pub fn split_statements(tokens: Vec<String>) -> Result<Vec<Vec<String>>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token == "|" {
            if current.is_empty() {
                return Err(Error::Syntax("Query cannot be empty.".to_string()));
            }
            statements.push(std::mem::take(&mut current));
        } else {
            current.push(token);
        }
    }
    if current.is_empty() {
        return Err(Error::Syntax("Query cannot be empty.".to_string()));
    }
    statements.push(current);
    Ok(statements)
}
