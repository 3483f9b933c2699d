// src/session.rs

//! Session state
//!
//! One `Session` value replaces the original's globals: the data root, the
//! derived AES key, the current database, the live table instance, and the
//! exit flag. The REPL owns it; the parser borrows it per statement.

use crate::engine::Table;
use crate::storage;
use std::path::{Path, PathBuf};

/// Where the session currently sits in the root → database → table hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Root,
    Database,
    Table,
}

pub struct Session {
    root: PathBuf,
    key: [u8; 32],
    pub current_database: Option<String>,
    pub table: Option<Table>,
    pub exit_requested: bool,
}

impl Session {
    pub fn new(root: PathBuf, key: [u8; 32]) -> Self {
        Self {
            root,
            key,
            current_database: None,
            table: None,
            exit_requested: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn context(&self) -> Context {
        if self.table.is_some() {
            Context::Table
        } else if self.current_database.is_some() {
            Context::Database
        } else {
            Context::Root
        }
    }

    /// Path of the current database directory, when one is selected
    pub fn database_path(&self) -> Option<PathBuf> {
        self.current_database
            .as_ref()
            .map(|name| storage::database_path(&self.root, name))
    }

    /// The REPL prompt for the current context
    pub fn prompt(&self) -> String {
        match (&self.current_database, &self.table) {
            (_, Some(table)) => format!("{} >> ", table.name()),
            (Some(database), None) => format!("{} >> ", database),
            (None, None) => "dbms >> ".to_string(),
        }
    }
}
