// src/engine/mod.rs

//! In-memory table engine
//!
//! This module owns the authoritative mutable snapshot of the currently
//! chosen table:
//! - Rows keyed by primary key with stable insertion order
//! - The insert pipeline (defaults, NOT_NULL, UNIQUE, auto-increment,
//!   type validation, primary-key uniqueness)
//! - Row/column deletion, truncation, and both update forms
//! - The commit-or-rollback contract against the encrypted file

pub mod condition;
pub mod render;
pub mod row;

use crate::error::{Error, Result};
use crate::schema::{NULL_MARKER, Schema, validate_value};
use crate::storage;
use condition::{ConditionGroups, compare_values};
use row::Row;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One loaded table: schema plus rows, with a dirty flag gating persistence
///
/// `row_order` keeps primary keys in insertion order alongside the map, so
/// iteration is stable while lookups stay O(1). Both structures are kept in
/// sync on every mutation. Changes only reach disk on [`Table::commit`].
pub struct Table {
    name: String,
    path: PathBuf,
    db_path: PathBuf,
    schema: Schema,
    data: HashMap<String, Row>,
    row_order: Vec<String>,
    unsaved_changes: bool,
}

impl Table {
    /// Create a new table on disk from a creation-time schema definition
    ///
    /// The encrypted file (header row only) is written immediately; the
    /// returned instance is clean and empty.
    pub fn create(db_path: &Path, name: &str, definition: &str, key: &[u8; 32]) -> Result<Table> {
        let path = storage::table_path(db_path, name);
        if path.exists() {
            return Err(Error::Logic(format!(
                "Table already exists with name {}.{}",
                name,
                storage::TABLE_EXT
            )));
        }
        let schema = Schema::parse_definition(definition)?;
        let plaintext = format!("{}\n", schema.render_header());
        storage::write_table_file(&path, key, &plaintext)?;
        debug!("Table file created at {}", path.display());

        Ok(Table {
            name: name.to_string(),
            path,
            db_path: db_path.to_path_buf(),
            schema,
            data: HashMap::new(),
            row_order: Vec::new(),
            unsaved_changes: false,
        })
    }

    /// Load an existing table from its encrypted file
    pub fn load(db_path: &Path, name: &str, key: &[u8; 32]) -> Result<Table> {
        let path = storage::table_path(db_path, name);
        let plaintext = storage::read_table_file(&path, key)?;
        let mut table = Table {
            name: name.to_string(),
            path,
            db_path: db_path.to_path_buf(),
            schema: Schema {
                columns: Vec::new(),
                primary_key_index: 0,
            },
            data: HashMap::new(),
            row_order: Vec::new(),
            unsaved_changes: false,
        };
        table.parse_plaintext(&plaintext)?;
        Ok(table)
    }

    /// Replace in-memory state with the decrypted file contents
    fn parse_plaintext(&mut self, plaintext: &str) -> Result<()> {
        self.data.clear();
        self.row_order.clear();

        let mut lines = plaintext.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::Program(format!("table {} is empty on disk", self.name)))?;
        self.schema = Schema::parse_header(header)?;

        let n_cols = self.schema.len();
        let pk = self.schema.primary_key_index;
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let cells: Vec<String> = line
                .split(',')
                .map(|cell| {
                    if cell.is_empty() {
                        NULL_MARKER.to_string()
                    } else {
                        cell.to_string()
                    }
                })
                .collect();
            // Best-effort recovery: rows with the wrong arity are dropped.
            if cells.len() != n_cols {
                debug!(
                    "Skipping row with {} cells (expected {}) in {}",
                    cells.len(),
                    n_cols,
                    self.name
                );
                continue;
            }
            let key = cells[pk].clone();
            let values: Vec<String> = cells
                .into_iter()
                .enumerate()
                .filter(|(i, _)| *i != pk)
                .map(|(_, cell)| cell)
                .collect();
            self.data.insert(key.clone(), Row::new(key.clone(), values));
            self.row_order.push(key);
        }
        self.unsaved_changes = false;
        Ok(())
    }

    /// Serialize the current state as the on-disk plaintext
    fn render_plaintext(&self) -> String {
        let mut text = self.schema.render_header();
        text.push('\n');
        for key in &self.row_order {
            if let Some(row) = self.data.get(key) {
                let cells: Vec<&str> = (0..self.schema.len())
                    .map(|i| {
                        let cell = self.cell(row, i);
                        if cell == NULL_MARKER { "" } else { cell }
                    })
                    .collect();
                text.push_str(&cells.join(","));
                text.push('\n');
            }
        }
        text
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.unsaved_changes
    }

    pub fn has_row(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.column_index(name).is_some()
    }

    /// The cell at a schema column index, translating through the
    /// primary-key position
    fn cell<'a>(&self, row: &'a Row, index: usize) -> &'a str {
        let pk = self.schema.primary_key_index;
        if index == pk {
            &row.key
        } else {
            let slot = if index < pk { index } else { index - 1 };
            row.values.get(slot).map(|s| s.as_str()).unwrap_or("")
        }
    }

    /// All cells of the row stored under `key`, in schema order
    pub fn row_cells(&self, key: &str) -> Vec<String> {
        match self.data.get(key) {
            Some(row) => (0..self.schema.len())
                .map(|i| self.cell(row, i).to_string())
                .collect(),
            None => vec![String::new(); self.schema.len()],
        }
    }

    /// Primary keys in insertion order
    pub fn ordered_keys(&self) -> &[String] {
        &self.row_order
    }

    /// Whether the row stored under `key` satisfies the condition groups
    pub(crate) fn row_matches(&self, key: &str, groups: &ConditionGroups) -> bool {
        self.data
            .get(key)
            .is_some_and(|row| self.matches(row, groups))
    }

    /// Whether a row satisfies the condition groups (empty groups match all)
    fn matches(&self, row: &Row, groups: &ConditionGroups) -> bool {
        if groups.is_empty() {
            return true;
        }
        groups.iter().any(|group| {
            group.iter().all(|cond| {
                match self.schema.column_index(&cond.column) {
                    Some(index) => compare_values(self.cell(row, index), cond.op, &cond.value),
                    None => false,
                }
            })
        })
    }

    /// Insert one row from a raw comma-separated value list
    ///
    /// The checks run per column, left to right: DEFAULT substitution,
    /// NOT_NULL, UNIQUE (among non-null values), auto-increment fill for
    /// AUTO_INCREMENT or the primary key, then type validation. Finally the
    /// primary key must be new.
    pub fn insert(&mut self, raw_values: &str) -> Result<()> {
        let mut values = parse_value_list(raw_values);
        let n_cols = self.schema.len();
        if values.len() != n_cols {
            return Err(Error::InvalidArgument(format!(
                "Number of values ({}) does not match number of columns ({}).",
                values.len(),
                n_cols
            )));
        }

        let pk_index = self.schema.primary_key_index;
        for i in 0..n_cols {
            let column = self.schema.columns[i].clone();

            // DEFAULT literals were validated at creation time.
            if values[i] == NULL_MARKER {
                if let Some(default) = column.default_value() {
                    values[i] = default.to_string();
                }
            }

            if column.is_not_null() && values[i] == NULL_MARKER {
                return Err(Error::Constraint(format!(
                    "Column '{}' cannot be null.",
                    column.name
                )));
            }

            if column.is_unique() && values[i] != NULL_MARKER {
                let duplicate = self
                    .data
                    .values()
                    .any(|row| self.cell(row, i) == values[i]);
                if duplicate {
                    return Err(Error::Constraint(format!(
                        "Duplicate value '{}' found in UNIQUE column '{}'.",
                        values[i], column.name
                    )));
                }
            }

            if (column.is_auto_increment() || i == pk_index) && values[i] == NULL_MARKER {
                values[i] = self.next_auto_value(i).to_string();
            }

            if !validate_value(&values[i], column.ty) {
                return Err(Error::Mismatch(format!(
                    "Value \"{}\" is not valid for column \"{}\" of type {}.",
                    values[i],
                    column.name,
                    column.ty.as_str()
                )));
            }
        }

        let key = values[pk_index].clone();
        if self.data.contains_key(&key) {
            return Err(Error::Constraint(format!(
                "Primary Key {} already exists.",
                key
            )));
        }

        let row_values: Vec<String> = values
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != pk_index)
            .map(|(_, v)| v)
            .collect();
        self.data.insert(key.clone(), Row::new(key.clone(), row_values));
        self.row_order.push(key);
        self.unsaved_changes = true;
        Ok(())
    }

    /// `max(existing numeric values in column) + 1`, starting from 1
    fn next_auto_value(&self, index: usize) -> i64 {
        let max = self
            .data
            .values()
            .filter_map(|row| self.cell(row, index).parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        max + 1
    }

    /// Remove the row stored under `key`; returns whether it existed
    pub fn delete_row(&mut self, key: &str) -> bool {
        if self.data.remove(key).is_none() {
            return false;
        }
        self.row_order.retain(|k| k != key);
        self.unsaved_changes = true;
        true
    }

    /// Remove a column from the schema and every row
    pub fn delete_column(&mut self, name: &str) -> Result<()> {
        let index = self
            .schema
            .column_index(name)
            .ok_or_else(|| Error::InvalidArgument(format!("Column: \"{}\" not found.", name)))?;
        let pk = self.schema.primary_key_index;
        if index == pk {
            return Err(Error::InvalidArgument(
                "Primary key column cannot be deleted.".to_string(),
            ));
        }

        let slot = if index < pk { index } else { index - 1 };
        for row in self.data.values_mut() {
            if slot < row.values.len() {
                row.values.remove(slot);
            }
        }
        self.schema.columns.remove(index);
        if index < pk {
            self.schema.primary_key_index = pk - 1;
        }
        self.unsaved_changes = true;
        Ok(())
    }

    /// Delete every row satisfying the condition groups; returns the count
    pub fn delete_rows_where(&mut self, groups: &ConditionGroups) -> usize {
        let doomed: Vec<String> = self
            .row_order
            .iter()
            .filter(|key| {
                self.data
                    .get(*key)
                    .is_some_and(|row| self.matches(row, groups))
            })
            .cloned()
            .collect();
        for key in &doomed {
            self.data.remove(key);
        }
        self.row_order.retain(|key| !doomed.contains(key));
        if !doomed.is_empty() {
            self.unsaved_changes = true;
        }
        doomed.len()
    }

    /// Remove every row, keeping the schema
    pub fn clean(&mut self) {
        self.data.clear();
        self.row_order.clear();
        self.unsaved_changes = true;
    }

    /// Column-scoped update: in rows satisfying the conditions, replace
    /// cells of `column` equal to `old` with `new`
    ///
    /// Updating the primary key re-keys the row and is rejected only when
    /// the new key collides with an existing one.
    pub fn update_column(
        &mut self,
        column: &str,
        old: &str,
        new: &str,
        groups: &ConditionGroups,
    ) -> Result<usize> {
        let index = self
            .schema
            .column_index(column)
            .ok_or_else(|| Error::InvalidArgument(format!("Column: \"{}\" not found.", column)))?;
        let ty = self.schema.columns[index].ty;
        for value in [old, new] {
            if value == NULL_MARKER || !validate_value(value, ty) {
                return Err(Error::Mismatch(format!(
                    "Value {} is not valid for column {} of type {}.",
                    value,
                    column,
                    ty.as_str()
                )));
            }
        }

        let pk = self.schema.primary_key_index;
        let mut updated = 0usize;

        if index == pk {
            if old != new && self.data.contains_key(new) {
                return Err(Error::Constraint(format!(
                    "Primary Key {} already exists. Skipping updation.",
                    new
                )));
            }
            // Keys are unique, so at most one row can match.
            let hit = self
                .data
                .get(old)
                .is_some_and(|row| self.matches(row, groups));
            if hit && old != new {
                if let Some(mut row) = self.data.remove(old) {
                    row.key = new.to_string();
                    self.data.insert(new.to_string(), row);
                    for key in self.row_order.iter_mut() {
                        if key == old {
                            *key = new.to_string();
                        }
                    }
                    updated = 1;
                }
            } else if hit {
                updated = 1;
            }
        } else {
            let slot = if index < pk { index } else { index - 1 };
            let matching: Vec<String> = self
                .row_order
                .iter()
                .filter(|key| {
                    self.data
                        .get(*key)
                        .is_some_and(|row| self.matches(row, groups))
                })
                .cloned()
                .collect();
            for key in matching {
                if let Some(row) = self.data.get_mut(&key) {
                    if slot < row.values.len() && row.values[slot] == old {
                        row.values[slot] = new.to_string();
                        updated += 1;
                    }
                }
            }
        }

        if updated == 0 {
            return Err(Error::InvalidArgument(format!(
                "No matching rows found with {} = {} under the given conditions.",
                column, old
            )));
        }
        self.unsaved_changes = true;
        Ok(updated)
    }

    /// Whole-row update: in rows satisfying the conditions, replace every
    /// non-primary cell equal to `old` with `new`; returns the cell count
    pub fn update_all(&mut self, old: &str, new: &str, groups: &ConditionGroups) -> usize {
        let matching: Vec<String> = self
            .row_order
            .iter()
            .filter(|key| {
                self.data
                    .get(*key)
                    .is_some_and(|row| self.matches(row, groups))
            })
            .cloned()
            .collect();

        let mut updated = 0usize;
        for key in matching {
            if let Some(row) = self.data.get_mut(&key) {
                for value in row.values.iter_mut() {
                    if value == old {
                        *value = new.to_string();
                        updated += 1;
                    }
                }
            }
        }
        if updated > 0 {
            self.unsaved_changes = true;
        }
        updated
    }

    /// Persist the current state: encrypted table file plus catalog entry
    pub fn commit(&mut self, key: &[u8; 32]) -> Result<()> {
        storage::write_table_file(&self.path, key, &self.render_plaintext())?;
        storage::update_catalog(&self.db_path, &self.name, self.row_order.len())?;
        self.unsaved_changes = false;
        Ok(())
    }

    /// Reload from disk, discarding unsaved changes
    ///
    /// Returns false (without touching the file) when there is nothing to
    /// roll back.
    pub fn rollback(&mut self, key: &[u8; 32]) -> Result<bool> {
        if !self.unsaved_changes {
            return Ok(false);
        }
        let plaintext = storage::read_table_file(&self.path, key)?;
        self.parse_plaintext(&plaintext)?;
        Ok(true)
    }
}

/// Split a raw value list on unquoted commas
///
/// Each piece is trimmed, stripped of one pair of surrounding quotes, and
/// mapped to the null marker when empty. Quoting preserves commas, spaces,
/// and case.
fn parse_value_list(raw: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut single_quote = false;
    let mut double_quote = false;
    for ch in raw.chars() {
        match ch {
            '"' if !single_quote => {
                double_quote = !double_quote;
                current.push(ch);
            }
            '\'' if !double_quote => {
                single_quote = !single_quote;
                current.push(ch);
            }
            ',' if !single_quote && !double_quote => {
                pieces.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    pieces.push(current);

    pieces
        .into_iter()
        .map(|piece| {
            let value = condition::strip_quotes(&piece);
            if value.is_empty() {
                NULL_MARKER.to_string()
            } else {
                value
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use tempfile::TempDir;

    fn test_key() -> [u8; 32] {
        crypto::derive_key(&crypto::salted_hash("pw", crypto::STORE_SALT))
    }

    fn make_table(definition: &str) -> (TempDir, Table) {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::create(dir.path(), "t", definition, &test_key()).unwrap();
        (dir, table)
    }

    #[test]
    fn test_parse_value_list_quoting() {
        assert_eq!(parse_value_list("1, \"Ada\", 36"), vec!["1", "Ada", "36"]);
        assert_eq!(
            parse_value_list("\"a, b\", 'c d'"),
            vec!["a, b", "c d"]
        );
        assert_eq!(parse_value_list("1,,3"), vec!["1", "null", "3"]);
        assert_eq!(parse_value_list("null"), vec!["null"]);
    }

    #[test]
    fn test_insert_and_order() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("2, Ada").unwrap();
        table.insert("1, Lin").unwrap();
        assert_eq!(table.ordered_keys(), ["2", "1"]);
        assert!(table.is_dirty());
        assert_eq!(table.row_cells("2"), vec!["2", "Ada"]);
    }

    #[test]
    fn test_insert_arity_mismatch() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        assert!(matches!(
            table.insert("1"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            table.insert("1, Ada, extra"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_insert_type_mismatch() {
        let (_dir, mut table) = make_table("id INT PRIMARY, age INT");
        assert!(matches!(table.insert("1, abc"), Err(Error::Mismatch(_))));
    }

    #[test]
    fn test_insert_not_null() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR NOT_NULL");
        assert!(matches!(
            table.insert("1, null"),
            Err(Error::Constraint(_))
        ));
        assert!(matches!(table.insert("2,"), Err(Error::Constraint(_))));
    }

    #[test]
    fn test_insert_unique() {
        let (_dir, mut table) = make_table("id INT PRIMARY, mail VARCHAR UNIQUE");
        table.insert("1, a@x").unwrap();
        assert!(matches!(
            table.insert("2, a@x"),
            Err(Error::Constraint(_))
        ));
        // Nulls do not collide in UNIQUE columns.
        table.insert("3, null").unwrap();
        table.insert("4, null").unwrap();
    }

    #[test]
    fn test_insert_duplicate_primary_key() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1, Ada").unwrap();
        assert!(matches!(
            table.insert("1, Lin"),
            Err(Error::Constraint(_))
        ));
    }

    #[test]
    fn test_auto_increment_primary_key() {
        let (_dir, mut table) = make_table("id INT PRIMARY AUTO_INCREMENT, name VARCHAR");
        table.insert("null, A").unwrap();
        table.insert("null, B").unwrap();
        assert_eq!(table.ordered_keys(), ["1", "2"]);
        // Explicit key advances the counter.
        table.insert("10, C").unwrap();
        table.insert("null, D").unwrap();
        assert_eq!(table.ordered_keys(), ["1", "2", "10", "11"]);
    }

    #[test]
    fn test_default_substitution() {
        let (_dir, mut table) =
            make_table("id INT PRIMARY, status VARCHAR DEFAULT open");
        table.insert("1, null").unwrap();
        assert_eq!(table.row_cells("1"), vec!["1", "open"]);
        table.insert("2, closed").unwrap();
        assert_eq!(table.row_cells("2"), vec!["2", "closed"]);
    }

    #[test]
    fn test_delete_row_and_clean() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1, Ada").unwrap();
        table.insert("2, Lin").unwrap();
        assert!(table.delete_row("1"));
        assert!(!table.delete_row("1"));
        assert_eq!(table.ordered_keys(), ["2"]);

        table.clean();
        assert_eq!(table.row_count(), 0);
        assert!(table.is_dirty());
    }

    #[test]
    fn test_delete_column() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR, age INT");
        table.insert("1, Ada, 36").unwrap();
        table.delete_column("name").unwrap();
        assert_eq!(table.schema().headers(), vec!["id", "age"]);
        assert_eq!(table.row_cells("1"), vec!["1", "36"]);

        assert!(matches!(
            table.delete_column("id"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            table.delete_column("ghost"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_delete_column_before_primary_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::create(
            dir.path(),
            "t",
            "name VARCHAR, id INT PRIMARY, age INT",
            &test_key(),
        )
        .unwrap();
        assert_eq!(table.schema().primary_key_index, 1);
        table.insert("Ada, 1, 36").unwrap();
        table.delete_column("name").unwrap();
        assert_eq!(table.schema().primary_key_index, 0);
        assert_eq!(table.row_cells("1"), vec!["1", "36"]);
    }

    #[test]
    fn test_delete_rows_where() {
        let (_dir, mut table) = make_table("id INT PRIMARY, status VARCHAR");
        table.insert("1, open").unwrap();
        table.insert("2, open").unwrap();
        table.insert("3, closed").unwrap();
        let groups = condition::parse_condition_groups(
            &["status".to_string(), "=".to_string(), "open".to_string()],
            table.schema(),
        )
        .unwrap();
        assert_eq!(table.delete_rows_where(&groups), 2);
        assert_eq!(table.ordered_keys(), ["3"]);
    }

    #[test]
    fn test_update_column_with_condition() {
        let (_dir, mut table) = make_table("id INT PRIMARY, status VARCHAR");
        table.insert("1, open").unwrap();
        table.insert("2, open").unwrap();
        table.insert("3, closed").unwrap();
        let groups = condition::parse_condition_groups(
            &["id".to_string(), ">=".to_string(), "2".to_string()],
            table.schema(),
        )
        .unwrap();
        let updated = table
            .update_column("status", "open", "done", &groups)
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(table.row_cells("2"), vec!["2", "done"]);
        assert_eq!(table.row_cells("1"), vec!["1", "open"]);
    }

    #[test]
    fn test_update_column_zero_matches_is_error() {
        let (_dir, mut table) = make_table("id INT PRIMARY, status VARCHAR");
        table.insert("1, open").unwrap();
        let result = table.update_column("status", "missing", "done", &Vec::new());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_update_primary_key_rekeys_row() {
        let (_dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1, Ada").unwrap();
        table.insert("2, Lin").unwrap();

        // Collision is rejected.
        assert!(matches!(
            table.update_column("id", "1", "2", &Vec::new()),
            Err(Error::Constraint(_))
        ));

        let updated = table.update_column("id", "1", "9", &Vec::new()).unwrap();
        assert_eq!(updated, 1);
        assert!(table.has_row("9"));
        assert!(!table.has_row("1"));
        assert_eq!(table.ordered_keys(), ["9", "2"]);
    }

    #[test]
    fn test_update_all_skips_primary_key() {
        let (_dir, mut table) = make_table("id INT PRIMARY, a VARCHAR, b VARCHAR");
        table.insert("1, x, x").unwrap();
        table.insert("2, x, y").unwrap();
        let updated = table.update_all("x", "z", &Vec::new());
        assert_eq!(updated, 3);
        assert_eq!(table.row_cells("1"), vec!["1", "z", "z"]);
        assert_eq!(table.row_cells("2"), vec!["2", "z", "y"]);
    }

    #[test]
    fn test_commit_rollback_cycle() {
        let (dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1, Ada").unwrap();
        table.commit(&test_key()).unwrap();
        assert!(!table.is_dirty());

        // Rollback on a clean table is a warning, not a reload.
        assert!(!table.rollback(&test_key()).unwrap());

        table.insert("2, Lin").unwrap();
        assert!(table.is_dirty());
        assert!(table.rollback(&test_key()).unwrap());
        assert!(!table.is_dirty());
        assert_eq!(table.ordered_keys(), ["1"]);

        // The committed row survives a fresh load.
        let reloaded = Table::load(dir.path(), "t", &test_key()).unwrap();
        assert_eq!(reloaded.ordered_keys(), ["1"]);
        assert_eq!(reloaded.row_cells("1"), vec!["1", "Ada"]);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_commit_updates_catalog() {
        let (dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1, Ada").unwrap();
        table.insert("2, Lin").unwrap();
        table.commit(&test_key()).unwrap();
        assert_eq!(
            storage::list_tables(dir.path()).unwrap(),
            vec!["t - 2 rows"]
        );
    }

    #[test]
    fn test_null_round_trip_as_empty_cell() {
        let (dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1,").unwrap();
        table.commit(&test_key()).unwrap();

        let plaintext =
            storage::read_table_file(&storage::table_path(dir.path(), "t"), &test_key()).unwrap();
        assert_eq!(plaintext, "id(INT)(PRIMARY),name(VARCHAR)\n1,\n");

        let reloaded = Table::load(dir.path(), "t", &test_key()).unwrap();
        assert_eq!(reloaded.row_cells("1"), vec!["1", "null"]);
    }

    #[test]
    fn test_malformed_rows_are_skipped_on_load() {
        let (dir, mut table) = make_table("id INT PRIMARY, name VARCHAR");
        table.insert("1, Ada").unwrap();
        table.commit(&test_key()).unwrap();

        let path = storage::table_path(dir.path(), "t");
        let mut plaintext = storage::read_table_file(&path, &test_key()).unwrap();
        plaintext.push_str("2,too,many,cells\n");
        storage::write_table_file(&path, &test_key(), &plaintext).unwrap();

        let reloaded = Table::load(dir.path(), "t", &test_key()).unwrap();
        assert_eq!(reloaded.ordered_keys(), ["1"]);
    }

    #[test]
    fn test_create_rejects_existing_table() {
        let (dir, _table) = make_table("id INT PRIMARY");
        let result = Table::create(dir.path(), "t", "id INT PRIMARY", &test_key());
        assert!(matches!(result, Err(Error::Logic(_))));
    }
}
