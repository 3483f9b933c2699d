// src/query/parser.rs

//! Statement dispatch
//!
//! Consumes one statement's tokens, applies the context grammar
//! (root / database / table), and drives the engine, catalog, and
//! filesystem operations. Successful mutations print a `res:` line;
//! everything else propagates as an error to the REPL boundary.

use crate::engine::Table;
use crate::engine::condition::{parse_condition_groups, strip_quotes};
use crate::engine::render;
use crate::error::{Error, Result};
use crate::session::{Context, Session};
use crate::storage;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

pub struct CommandParser<'a> {
    tokens: VecDeque<String>,
    session: &'a mut Session,
}

impl<'a> CommandParser<'a> {
    pub fn new(tokens: Vec<String>, session: &'a mut Session) -> Self {
        Self {
            tokens: tokens.into(),
            session,
        }
    }

    /// Execute the statement
    pub fn run(mut self) -> Result<()> {
        let verb = self.next_token()?;
        match verb.as_str() {
            "init" => self.process_init(),
            "erase" => self.process_erase(),
            "enter" => self.process_enter(),
            "choose" => self.process_choose(),
            "make" => self.process_make(),
            "describe" => self.process_describe(),
            "insert" => self.process_insert(),
            "del" => self.process_del(),
            "change" => self.process_change(),
            "clean" => self.process_clean(),
            "show" => self.process_show(),
            "commit" => self.process_commit(),
            "rollback" => self.process_rollback(),
            "list" => self.process_list(),
            "close" => self.process_close(),
            "exit" => self.process_exit(),
            "help" => self.process_help(),
            other => Err(Error::Syntax(format!("unknown query {}", other))),
        }
    }

    fn next_token(&mut self) -> Result<String> {
        self.tokens
            .pop_front()
            .ok_or_else(|| Error::Syntax("missing commands.".to_string()))
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.tokens.front() {
            Some(extra) => Err(Error::Syntax(format!("unexpected command \"{}\".", extra))),
            None => Ok(()),
        }
    }

    fn remaining(&mut self) -> Vec<String> {
        self.tokens.drain(..).collect()
    }

    fn database_path(&self) -> Result<PathBuf> {
        self.session
            .database_path()
            .ok_or_else(|| Error::Logic("No database selected.".to_string()))
    }

    fn require_table(&mut self, message: &str) -> Result<&mut Table> {
        self.session
            .table
            .as_mut()
            .ok_or_else(|| Error::Logic(message.to_string()))
    }

    // init <name> -- create a database directory
    fn process_init(&mut self) -> Result<()> {
        let name = self.next_token()?;
        self.expect_end()?;
        if self.session.context() == Context::Table {
            return Err(Error::Logic("INIT -> not available in table.".to_string()));
        }
        storage::create_database(self.session.root(), &name)?;
        println!("res: Database created.");
        Ok(())
    }

    // erase <name> -- database at root, table inside a database
    fn process_erase(&mut self) -> Result<()> {
        let name = self.next_token()?;
        self.expect_end()?;
        match self.session.context() {
            Context::Root => {
                storage::erase_database(self.session.root(), &name)?;
                println!("res: Database erased permanently.");
            }
            Context::Database => {
                let db_path = self.database_path()?;
                storage::erase_table(&db_path, &name)?;
                println!("res: Table erased permanently.");
            }
            Context::Table => {
                // Erasing the chosen table out from under the live instance
                // is allowed; the instance is dropped without a save prompt.
                let db_path = self.database_path()?;
                storage::erase_table(&db_path, &name)?;
                if self
                    .session
                    .table
                    .as_ref()
                    .is_some_and(|table| table.name() == name)
                {
                    self.session.table = None;
                }
                println!("res: Table erased permanently.");
            }
        }
        Ok(())
    }

    // enter <name> -- select a database (root only)
    fn process_enter(&mut self) -> Result<()> {
        if self.session.context() != Context::Root {
            return Err(Error::Logic(
                "ENTER -> cannot be used in table/database.".to_string(),
            ));
        }
        let name = self.next_token()?;
        self.expect_end()?;
        if !storage::database_exists(self.session.root(), &name) {
            return Err(Error::Logic(format!(
                "Database \"{}\" does not exist.",
                name
            )));
        }
        self.session.current_database = Some(name);
        Ok(())
    }

    // choose <name> -- load a table (database context only)
    fn process_choose(&mut self) -> Result<()> {
        if self.session.context() != Context::Database {
            return Err(Error::Logic(
                "CHOOSE -> cannot be used in table/outside a database.".to_string(),
            ));
        }
        let name = self.next_token()?;
        self.expect_end()?;
        let db_path = self.database_path()?;
        if !storage::table_exists(&db_path, &name) {
            return Err(Error::Logic(format!("Table \"{}\" does not exist.", name)));
        }
        let key = *self.session.key();
        self.session.table = Some(Table::load(&db_path, &name, &key)?);
        Ok(())
    }

    // make <name>(<schema>) -- create and load a table
    fn process_make(&mut self) -> Result<()> {
        if self.session.context() != Context::Database {
            return Err(Error::Logic(
                "MAKE -> not used before entering a database / within a table.".to_string(),
            ));
        }
        let name = self.next_token()?;
        if !storage::is_valid_name(&name) {
            return Err(Error::InvalidArgument(
                "Invalid table name! Only alphabets, numbers, and underscores are allowed."
                    .to_string(),
            ));
        }
        let definition = self.next_token()?;
        self.expect_end()?;
        let db_path = self.database_path()?;
        let key = *self.session.key();
        let table = Table::create(&db_path, &name, &definition, &key)?;
        println!("res: Table created successfully.");
        self.session.table = Some(table);
        Ok(())
    }

    // describe -- print the schema table
    fn process_describe(&mut self) -> Result<()> {
        self.expect_end()?;
        let table = self.require_table("DESCRIBE -> can only be used in table.")?;
        println!("{}", render::describe(table));
        Ok(())
    }

    // insert <values> -- one row per value-list token
    fn process_insert(&mut self) -> Result<()> {
        if self.session.table.is_none() {
            return Err(Error::Logic("INSERT -> table not selected.".to_string()));
        }
        if self.tokens.is_empty() {
            return Err(Error::Syntax("missing commands.".to_string()));
        }
        while let Some(values) = self.tokens.pop_front() {
            let table = self.require_table("INSERT -> table not selected.")?;
            table.insert(&values)?;
            println!("res: Data successfully inserted.");
        }
        Ok(())
    }

    // del <id...> | del <column...> | del where <conds>
    fn process_del(&mut self) -> Result<()> {
        if self.session.table.is_none() {
            return Err(Error::Logic("Please choose a table first.".to_string()));
        }
        if self.tokens.is_empty() {
            return Err(Error::Syntax("missing commands.".to_string()));
        }

        if self.tokens.front().map(|t| t.as_str()) == Some("where") {
            self.tokens.pop_front();
            let cond_tokens = self.remaining();
            if cond_tokens.is_empty() {
                return Err(Error::Syntax(
                    "DEL -> WHERE clause provided but missing conditions.".to_string(),
                ));
            }
            let table = self.require_table("Please choose a table first.")?;
            let groups = parse_condition_groups(&cond_tokens, table.schema())?;
            let deleted = table.delete_rows_where(&groups);
            println!("res: {} row(s) affected.", deleted);
            return Ok(());
        }

        // Each item is tried as a row key first, then as a column name.
        let mut rows_deleted = 0usize;
        while let Some(token) = self.tokens.pop_front() {
            let item = strip_quotes(&token);
            if item.is_empty() {
                return Err(Error::InvalidArgument(
                    "Id (or) Column Name cannot be empty.".to_string(),
                ));
            }
            let table = self.require_table("Please choose a table first.")?;
            if table.has_row(&item) {
                table.delete_row(&item);
                rows_deleted += 1;
            } else if table.has_column(&item) {
                table.delete_column(&item)?;
                println!("res: Column \"{}\" deleted successfully.", item);
            } else {
                return Err(Error::InvalidArgument(format!(
                    "No record matches a Id (or) Column Name with value {}.",
                    item
                )));
            }
        }
        if rows_deleted > 0 {
            println!("res: {} row(s) affected.", rows_deleted);
        }
        Ok(())
    }

    // change [<col>] <old> to <new> [where <conds>]
    fn process_change(&mut self) -> Result<()> {
        if self.session.table.is_none() {
            return Err(Error::Logic("CHANGE -> No table selected.".to_string()));
        }
        let first = self.next_token()?;

        let (column, old) = if self.tokens.front().map(|t| t.as_str()) == Some("to") {
            (None, strip_quotes(&first))
        } else {
            let old = self.next_token()?;
            if self.tokens.front().map(|t| t.as_str()) != Some("to") {
                return Err(Error::Syntax(
                    "CHANGE -> missing/unexpected command TO.".to_string(),
                ));
            }
            (Some(strip_quotes(&first)), strip_quotes(&old))
        };
        self.tokens.pop_front(); // the "to" token
        let new = strip_quotes(&self.next_token()?);

        let cond_tokens = match self.tokens.pop_front() {
            None => Vec::new(),
            Some(word) if word == "where" => {
                let rest = self.remaining();
                if rest.is_empty() {
                    return Err(Error::Syntax(
                        "CHANGE -> WHERE clause provided but missing conditions.".to_string(),
                    ));
                }
                rest
            }
            Some(other) => {
                return Err(Error::Syntax(format!("unexpected command \"{}\".", other)));
            }
        };

        let table = self.require_table("CHANGE -> No table selected.")?;
        let groups = parse_condition_groups(&cond_tokens, table.schema())?;
        match column {
            Some(column) => {
                let updated = table.update_column(&column, &old, &new, &groups)?;
                println!("res: {} row(s) updated successfully.", updated);
            }
            None => {
                let updated = table.update_all(&old, &new, &groups);
                println!("res: {} row(s) updated successfully.", updated);
            }
        }
        Ok(())
    }

    // clean -- truncate all rows
    fn process_clean(&mut self) -> Result<()> {
        self.expect_end()?;
        let table = self.require_table("Please choose a table before cleaning.")?;
        table.clean();
        println!("res: Table cleaned.");
        Ok(())
    }

    // show ... -- render rows per the sub-expression
    fn process_show(&mut self) -> Result<()> {
        let args = self.remaining();
        let table = self.require_table("SHOW -> No table selected.")?;
        println!("{}", render::show(table, &args)?);
        Ok(())
    }

    // commit -- persist the in-memory table
    fn process_commit(&mut self) -> Result<()> {
        self.expect_end()?;
        let key = *self.session.key();
        let table = self.require_table("No table selected for transaction COMMIT.")?;
        table.commit(&key)?;
        println!("res: Commit successful.");
        Ok(())
    }

    // rollback -- reload from disk, discarding unsaved changes
    fn process_rollback(&mut self) -> Result<()> {
        self.expect_end()?;
        let key = *self.session.key();
        let table = self.require_table("No table selected for transaction ROLLBACK.")?;
        if !table.rollback(&key)? {
            eprintln!("WARNING: No changes made to table.");
        }
        println!("res: Rollback successful.");
        Ok(())
    }

    // list -- databases at root, catalog entries inside a database
    fn process_list(&mut self) -> Result<()> {
        self.expect_end()?;
        match self.session.context() {
            Context::Root => {
                let databases = storage::list_databases(self.session.root())?;
                if databases.is_empty() {
                    println!("Empty");
                } else {
                    for (name, tables) in databases {
                        println!("{} - {} tb", name, tables);
                    }
                }
            }
            Context::Database => {
                let entries = storage::list_tables(&self.database_path()?)?;
                if entries.is_empty() {
                    println!("Empty Database");
                } else {
                    for entry in entries {
                        println!("{}", entry);
                    }
                }
            }
            Context::Table => {
                return Err(Error::Logic("LIST -> not available in table.".to_string()));
            }
        }
        Ok(())
    }

    // close -- leave the table (with save prompt), then end the program
    fn process_close(&mut self) -> Result<()> {
        self.expect_end()?;
        if self.session.table.is_some() {
            self.exit_table()?;
        }
        self.session.exit_requested = true;
        Ok(())
    }

    // exit -- step up one context; at root, end the program
    fn process_exit(&mut self) -> Result<()> {
        self.expect_end()?;
        match self.session.context() {
            Context::Table => self.exit_table()?,
            Context::Database => self.session.current_database = None,
            Context::Root => self.session.exit_requested = true,
        }
        Ok(())
    }

    /// Drop the live table, prompting for a commit when changes are unsaved
    fn exit_table(&mut self) -> Result<()> {
        let key = *self.session.key();
        if let Some(table) = self.session.table.as_mut() {
            if table.is_dirty() {
                print!("You have unsaved changes. Do you want to save them? (y/n): ");
                io::stdout().flush()?;
                let mut answer = String::new();
                io::stdin().lock().read_line(&mut answer)?;
                if answer.trim().to_lowercase().starts_with('y') {
                    table.commit(&key)?;
                    println!("res: Commit successful.");
                } else {
                    println!("res: Discarding changes.");
                }
            }
        }
        self.session.table = None;
        Ok(())
    }

    // help -- the in-REPL help screen
    fn process_help(&mut self) -> Result<()> {
        self.expect_end()?;
        println!("{}", HELP_TEXT);
        Ok(())
    }
}

const HELP_TEXT: &str = "\
============================ qiloDB Help ==========================

Database Commands:
  init <db>         - Create a new database.
  erase <db>        - Delete a database (only at root).
  enter <db>        - Select/use a database.
  exit              - Exit context (table -> db -> root).

Table Commands:
  make <table>(...) - Create a new table with columns.
        Syntax: make users(id INT PRIMARY, name VARCHAR)
  choose <table>    - Open a table in the current database.
  erase <table>     - Delete a table (inside a DB).
  clean             - Remove all rows in the current table.

Data Operations:
  insert (<v1>, <v2>, ...)  - Add a new row to the table.
  del <id(s)>               - Delete row(s) by primary key.
  del <column(s)>           - Delete one or more columns.
  del where <cond(s)>       - Delete rows matching condition.
  change <col> <old> to <new> [where <cond(s)>] - Update one column.
  change <old> to <new> [where <cond(s)>]       - Update any column.

Query & Display:
  describe          - Show current table schema.
  list              - List databases or tables.
  show *            - Display all rows.
  show head         - First 5 rows.
  show limit N      - First N rows (~N for last N).
  show <cols> [where/like]  - Project and filter.

Transactions & Misc:
  commit            - Save changes to disk.
  rollback          - Undo unsaved changes.
  close             - Close the table and exit the program.
  help              - Show this help screen.
==================================================================";
