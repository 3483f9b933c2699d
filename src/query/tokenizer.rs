// src/query/tokenizer.rs

//! Command-line tokenizer
//!
//! Turns one typed line into a flat token list. Whitespace and unquoted
//! commas end tokens; a parenthesized value list is captured verbatim as a
//! single token; the punctuation set `| = < > * ! . ~` joins the current
//! token so operators like `<=` and the `~N` limit form survive. Identifiers
//! are lowercased outside quotes; quoted text keeps its case.

use crate::error::{Error, Result};

pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut single_quote = false;
    let mut double_quote = false;
    let mut in_parens = false;
    let mut captured = String::new();

    for ch in line.chars() {
        if in_parens {
            // Value-list capture: everything up to the matching ')' is one
            // token, quotes included so the value parser can honor them.
            match ch {
                '"' if !single_quote => {
                    double_quote = !double_quote;
                    captured.push(ch);
                }
                '\'' if !double_quote => {
                    single_quote = !single_quote;
                    captured.push(ch);
                }
                ')' if !single_quote && !double_quote => {
                    in_parens = false;
                    tokens.push(std::mem::take(&mut captured));
                }
                _ => captured.push(ch),
            }
            continue;
        }

        match ch {
            '(' if !single_quote && !double_quote => {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                in_parens = true;
            }
            ')' if !single_quote && !double_quote => {
                return Err(Error::Syntax("Mismatched parentheses in input.".to_string()));
            }
            '"' if !single_quote => double_quote = !double_quote,
            '\'' if !double_quote => single_quote = !single_quote,
            c if c.is_whitespace() || c == ',' => {
                if single_quote || double_quote {
                    word.push(c);
                } else if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
            }
            '|' | '=' | '<' | '>' | '*' | '!' | '.' | '~' => word.push(ch),
            c => {
                if single_quote || double_quote {
                    word.push(c);
                } else if c.is_alphabetic() {
                    word.extend(c.to_lowercase());
                } else if c.is_alphanumeric() {
                    word.push(c);
                } else {
                    return Err(Error::Syntax(format!("{} is not expected.", c)));
                }
            }
        }
    }

    if !word.is_empty() {
        tokens.push(word);
    }
    if in_parens {
        return Err(Error::Syntax("Mismatched parentheses in input.".to_string()));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens_are_lowercased() {
        let tokens = tokenize("ENTER Demo").unwrap();
        assert_eq!(tokens, vec!["enter", "demo"]);
    }

    #[test]
    fn test_quoted_text_keeps_case_and_spaces() {
        let tokens = tokenize("change status \"Open Item\" to done").unwrap();
        assert_eq!(tokens, vec!["change", "status", "Open Item", "to", "done"]);
    }

    #[test]
    fn test_value_list_is_one_token() {
        let tokens = tokenize("insert (1, \"Ada\", 36)").unwrap();
        assert_eq!(tokens, vec!["insert", "1, \"Ada\", 36"]);
    }

    #[test]
    fn test_value_list_keeps_case_verbatim() {
        let tokens = tokenize("make People(id INT PRIMARY, name VARCHAR)").unwrap();
        assert_eq!(tokens, vec!["make", "people", "id INT PRIMARY, name VARCHAR"]);
    }

    #[test]
    fn test_paren_inside_quotes_does_not_close_capture() {
        let tokens = tokenize("insert (1, \"smile :)\")").unwrap();
        assert_eq!(tokens, vec!["insert", "1, \"smile :)\""]);
    }

    #[test]
    fn test_operators_join_tokens() {
        let tokens = tokenize("show * where age >= 30").unwrap();
        assert_eq!(tokens, vec!["show", "*", "where", "age", ">=", "30"]);
        let tokens = tokenize("show limit ~3").unwrap();
        assert_eq!(tokens, vec!["show", "limit", "~3"]);
    }

    #[test]
    fn test_pipe_separates_as_token() {
        let tokens = tokenize("commit | exit").unwrap();
        assert_eq!(tokens, vec!["commit", "|", "exit"]);
    }

    #[test]
    fn test_commas_split_outside_quotes() {
        let tokens = tokenize("del 1,2,3").unwrap();
        assert_eq!(tokens, vec!["del", "1", "2", "3"]);
    }

    #[test]
    fn test_unexpected_character() {
        let result = tokenize("show; drop");
        assert!(matches!(result, Err(Error::Syntax(_))));
    }

    #[test]
    fn test_mismatched_parentheses() {
        assert!(matches!(tokenize("insert (1, 2"), Err(Error::Syntax(_))));
        assert!(matches!(tokenize("insert 1)"), Err(Error::Syntax(_))));
    }

    #[test]
    fn test_empty_line() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }
}
