// src/engine/render.rs

//! Table rendering for `describe` and `show`
//!
//! Everything here returns a `String`; the REPL boundary does the printing.

use super::Table;
use super::condition::{ConditionGroups, parse_condition_groups, strip_quotes};
use crate::error::{Error, Result};

/// Row count of `show head`
const HEAD_ROWS: usize = 5;

const RULE: &str = "-------------------------------------------------\n";

/// Render the schema table printed by `describe`
pub fn describe(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&format!("Table: {}\n", table.name()));
    out.push_str(RULE);
    out.push_str(&format!(
        "{:<20}{:<15}{}\n",
        "Column Name", "Data Type", "Constraints"
    ));
    out.push_str(RULE);
    for column in &table.schema().columns {
        let constraints = if column.constraints.is_empty() {
            "None".to_string()
        } else {
            column
                .constraints
                .iter()
                .map(|c| c.as_header())
                .collect::<Vec<_>>()
                .join(",")
        };
        out.push_str(&format!(
            "{:<20}{:<15}{}\n",
            column.name,
            column.ty.as_str(),
            constraints
        ));
    }
    out.push_str(RULE);
    out
}

/// Evaluate a `show` sub-expression and render the result
///
/// Modes: `*` (all columns), an explicit column list, `head` (first five
/// rows), `limit N` (first N) and `limit ~N` (last N). The `*` and
/// column-list modes accept trailing `where` conditions and a `like`
/// prefix filter; `head`/`limit` accept neither.
pub fn show(table: &Table, args: &[String]) -> Result<String> {
    if args.is_empty() {
        return Err(Error::Syntax("SHOW -> missing arguments.".to_string()));
    }
    let mut tokens: Vec<String> = args.to_vec();

    // Pull out the LIKE clause first: a literal whose trailing '*' is
    // stripped, leaving the prefix to match.
    let mut like_prefix: Option<String> = None;
    if let Some(pos) = tokens.iter().position(|t| t == "like") {
        let literal = tokens.get(pos + 1).ok_or_else(|| {
            Error::Syntax("SHOW -> missing argument for LIKE clause.".to_string())
        })?;
        let mut prefix = strip_quotes(literal);
        if prefix.ends_with('*') {
            prefix.pop();
        }
        like_prefix = Some(prefix);
        tokens.drain(pos..pos + 2);
        if tokens.is_empty() {
            return Err(Error::Syntax("SHOW -> missing arguments.".to_string()));
        }
    }

    match tokens[0].as_str() {
        "*" => {
            let selected: Vec<usize> = (0..table.schema().len()).collect();
            let groups = parse_where_clause(&tokens[1..], table)?;
            Ok(render_selection(
                table,
                &selected,
                &groups,
                like_prefix.as_deref(),
            ))
        }
        "head" => {
            if tokens.len() > 1 || like_prefix.is_some() {
                return Err(Error::Syntax(
                    "HEAD -> does not take further clauses.".to_string(),
                ));
            }
            let count = table.row_count().min(HEAD_ROWS);
            Ok(render_slice(table, 0, count))
        }
        "limit" => {
            if like_prefix.is_some() {
                return Err(Error::Syntax(
                    "LIMIT -> does not take further clauses.".to_string(),
                ));
            }
            let number = tokens.get(1).ok_or_else(|| {
                Error::Syntax("LIMIT -> missing number for LIMIT command.".to_string())
            })?;
            if let Some(extra) = tokens.get(2) {
                return Err(Error::Syntax(format!("unexpected command \"{}\".", extra)));
            }
            let (from_bottom, digits) = match number.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, number.as_str()),
            };
            let count: usize = digits.parse().map_err(|_| {
                Error::Syntax("LIMIT -> invalid number for LIMIT command.".to_string())
            })?;
            if count == 0 {
                return Err(Error::Syntax(
                    "LIMIT -> limit must be a positive integer.".to_string(),
                ));
            }
            if count > table.row_count() {
                return Err(Error::InvalidArgument(format!(
                    "{} records are present.",
                    table.row_count()
                )));
            }
            let start = if from_bottom {
                table.row_count() - count
            } else {
                0
            };
            Ok(render_slice(table, start, count))
        }
        _ => {
            // Explicit column list, in the given order, until a WHERE clause.
            let mut selected_names = Vec::new();
            let mut idx = 0;
            while idx < tokens.len() && tokens[idx] != "where" {
                let name = strip_quotes(&tokens[idx]);
                if !name.is_empty() {
                    selected_names.push(name);
                }
                idx += 1;
            }
            if selected_names.is_empty() {
                return Err(Error::Syntax("SHOW -> no columns specified.".to_string()));
            }
            let selected: Vec<usize> = selected_names
                .iter()
                .map(|name| {
                    table.schema().column_index(name).ok_or_else(|| {
                        Error::InvalidArgument(format!("Column \"{}\" not found.", name))
                    })
                })
                .collect::<Result<_>>()?;
            let groups = parse_where_clause(&tokens[idx..], table)?;
            Ok(render_selection(
                table,
                &selected,
                &groups,
                like_prefix.as_deref(),
            ))
        }
    }
}

/// Parse an optional trailing WHERE clause (`rest` starts at `where` or is
/// empty)
fn parse_where_clause(rest: &[String], table: &Table) -> Result<ConditionGroups> {
    match rest.first() {
        None => Ok(Vec::new()),
        Some(word) if word == "where" => {
            if rest.len() == 1 {
                return Err(Error::Syntax(
                    "SHOW -> WHERE clause provided but missing conditions.".to_string(),
                ));
            }
            parse_condition_groups(&rest[1..], table.schema())
        }
        Some(extra) => Err(Error::Syntax(format!("unexpected command \"{}\".", extra))),
    }
}

/// Render the selected columns of every row passing the filters
fn render_selection(
    table: &Table,
    selected: &[usize],
    groups: &ConditionGroups,
    like_prefix: Option<&str>,
) -> String {
    let schema = table.schema();
    let headers: Vec<String> = selected
        .iter()
        .map(|&i| schema.columns[i].name.clone())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for key in table.ordered_keys() {
        if !table.row_matches(key, groups) {
            continue;
        }
        let cells = table.row_cells(key);
        let shown: Vec<String> = selected.iter().map(|&i| cells[i].clone()).collect();
        if let Some(prefix) = like_prefix {
            // The prefix applies to the shown cells of string-typed columns;
            // any match keeps the row.
            let hit = selected.iter().zip(&shown).any(|(&i, cell)| {
                schema.columns[i].ty.is_text() && cell.starts_with(prefix)
            });
            if !hit {
                continue;
            }
        }
        rows.push(shown);
    }
    render_box(&headers, &rows)
}

/// Render `count` rows starting at `start`, all columns, no filters
fn render_slice(table: &Table, start: usize, count: usize) -> String {
    let headers: Vec<String> = table
        .schema()
        .columns
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let rows: Vec<Vec<String>> = table.ordered_keys()[start..start + count]
        .iter()
        .map(|key| table.row_cells(key))
        .collect();
    render_box(&headers, &rows)
}

/// Draw the box: dividers of `+-...-+`, centered headers, left-aligned cells
fn render_box(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut divider = String::from("+");
    for width in &widths {
        divider.push('-');
        divider.push_str(&"-".repeat(*width));
        divider.push_str("-+");
    }

    let mut out = String::new();
    out.push_str(&divider);
    out.push('\n');

    out.push('|');
    for (header, width) in headers.iter().zip(&widths) {
        out.push(' ');
        out.push_str(&center(header, *width));
        out.push_str(" |");
    }
    out.push('\n');
    out.push_str(&divider);
    out.push('\n');

    for row in rows {
        out.push('|');
        for (cell, width) in row.iter().zip(&widths) {
            out.push(' ');
            out.push_str(&pad_right(cell, *width));
            out.push_str(" |");
        }
        out.push('\n');
    }
    out.push_str(&divider);
    out
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

fn pad_right(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use tempfile::TempDir;

    fn test_key() -> [u8; 32] {
        crypto::derive_key(&crypto::salted_hash("pw", crypto::STORE_SALT))
    }

    fn seeded_table() -> (TempDir, Table) {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::create(
            dir.path(),
            "people",
            "id INT PRIMARY, name VARCHAR, age INT",
            &test_key(),
        )
        .unwrap();
        table.insert("1, alice, 36").unwrap();
        table.insert("2, anton, 29").unwrap();
        table.insert("3, bob, 41").unwrap();
        (dir, table)
    }

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_show_star_renders_all_rows() {
        let (_dir, table) = seeded_table();
        let out = show(&table, &args(&["*"])).unwrap();
        let expected = "\
+----+-------+-----+
| id | name  | age |
+----+-------+-----+
| 1  | alice | 36  |
| 2  | anton | 29  |
| 3  | bob   | 41  |
+----+-------+-----+";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_show_star_with_where() {
        let (_dir, table) = seeded_table();
        let out = show(&table, &args(&["*", "where", "age", ">", "30"])).unwrap();
        assert!(out.contains("alice"));
        assert!(out.contains("bob"));
        assert!(!out.contains("anton"));
    }

    #[test]
    fn test_show_projection_with_like() {
        let (_dir, table) = seeded_table();
        let out = show(&table, &args(&["id", "name", "like", "a*"])).unwrap();
        let expected = "\
+----+-------+
| id | name  |
+----+-------+
| 1  | alice |
| 2  | anton |
+----+-------+";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_like_skips_non_text_columns() {
        let (_dir, table) = seeded_table();
        // "4*" would prefix-match age 41 if numeric columns were searched.
        let out = show(&table, &args(&["*", "like", "4*"])).unwrap();
        assert!(!out.contains("bob"));
    }

    #[test]
    fn test_show_head_caps_at_row_count() {
        let (_dir, table) = seeded_table();
        let out = show(&table, &args(&["head"])).unwrap();
        assert!(out.contains("alice"));
        assert!(out.contains("bob"));
    }

    #[test]
    fn test_show_limit_top_and_bottom() {
        let (_dir, table) = seeded_table();
        let top = show(&table, &args(&["limit", "2"])).unwrap();
        assert!(top.contains("alice") && top.contains("anton") && !top.contains("bob"));

        let bottom = show(&table, &args(&["limit", "~2"])).unwrap();
        assert!(!bottom.contains("alice") && bottom.contains("anton") && bottom.contains("bob"));
    }

    #[test]
    fn test_show_limit_over_row_count() {
        let (_dir, table) = seeded_table();
        let result = show(&table, &args(&["limit", "~9"]));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_show_limit_rejects_garbage() {
        let (_dir, table) = seeded_table();
        assert!(matches!(
            show(&table, &args(&["limit"])),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            show(&table, &args(&["limit", "x"])),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            show(&table, &args(&["limit", "0"])),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_head_rejects_filters() {
        let (_dir, table) = seeded_table();
        let result = show(&table, &args(&["head", "like", "a*"]));
        assert!(matches!(result, Err(Error::Syntax(_))));
    }

    #[test]
    fn test_unknown_column_in_projection() {
        let (_dir, table) = seeded_table();
        let result = show(&table, &args(&["ghost"]));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_describe_lists_schema() {
        let (_dir, table) = seeded_table();
        let out = describe(&table);
        assert!(out.contains("Table: people"));
        assert!(out.contains("id"));
        assert!(out.contains("PRIMARY"));
        assert!(out.contains("VARCHAR"));
    }
}
