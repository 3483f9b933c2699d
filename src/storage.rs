// src/storage.rs

//! Storage layer for qiloDB
//!
//! This module owns everything that touches the filesystem:
//! - Data root discovery and creation
//! - Database directories and their lifecycle
//! - Encrypted table files (read/decrypt, encrypt/atomic write)
//! - The per-database catalog file listing table row counts
//! - The passphrase digest file

use crate::crypto;
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Installation directory name under the per-OS data dir
const ROOT_DIR_NAME: &str = "qilodb";

/// Passphrase digest file, stored inside the data root
const PASS_FILE: &str = "pass.txt";

/// Per-database catalog of table row counts
pub const CATALOG_FILE: &str = "table_metadata.txt";

/// Extension of encrypted table files
pub const TABLE_EXT: &str = "bin";

/// Resolve the default data root for this OS
///
/// Prefers the platform application-data directory, falling back to a
/// dot-directory in the user's home, then to a relative path as a last
/// resort.
pub fn default_data_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(ROOT_DIR_NAME))
        .or_else(|| dirs::home_dir().map(|dir| dir.join(format!(".{}", ROOT_DIR_NAME))))
        .unwrap_or_else(|| PathBuf::from(ROOT_DIR_NAME))
}

/// Create the data root if it does not exist yet
pub fn ensure_data_root(root: &Path) -> Result<()> {
    if !root.exists() {
        fs::create_dir_all(root)
            .map_err(|e| Error::Program(format!("Failed to create data root: {}", e)))?;
        info!("Data root created at {}", root.display());
    }
    Ok(())
}

/// Only alphanumerics and underscores are allowed in database and table names
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn database_path(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

pub fn table_path(db_path: &Path, table: &str) -> PathBuf {
    db_path.join(format!("{}.{}", table, TABLE_EXT))
}

pub fn database_exists(root: &Path, name: &str) -> bool {
    database_path(root, name).is_dir()
}

pub fn table_exists(db_path: &Path, table: &str) -> bool {
    table_path(db_path, table).is_file()
}

/// Create a new database directory
pub fn create_database(root: &Path, name: &str) -> Result<()> {
    if !is_valid_name(name) {
        return Err(Error::Logic(
            "Invalid database name! Only alphabets, numbers, and underscores are allowed."
                .to_string(),
        ));
    }
    let path = database_path(root, name);
    if path.exists() {
        return Err(Error::Logic(format!(
            "Database already exists! Use enter {} to access it.",
            name
        )));
    }
    fs::create_dir(&path)
        .map_err(|e| Error::Program(format!("Failed to initiate database: {}", e)))?;
    debug!("Database created at {}", path.display());
    Ok(())
}

/// Remove a database directory and everything in it
pub fn erase_database(root: &Path, name: &str) -> Result<()> {
    let path = database_path(root, name);
    if !path.is_dir() {
        return Err(Error::Logic(format!("Database not found: {}", name)));
    }
    fs::remove_dir_all(&path)?;
    debug!("Database erased at {}", path.display());
    Ok(())
}

/// Remove a table file and its catalog entry
pub fn erase_table(db_path: &Path, name: &str) -> Result<()> {
    let path = table_path(db_path, name);
    if !path.is_file() {
        return Err(Error::Logic(format!("Table not found: {}", name)));
    }
    fs::remove_file(&path)
        .map_err(|e| Error::Program(format!("could not erase {}: {}", name, e)))?;
    remove_catalog_entry(db_path, name)?;
    Ok(())
}

/// List databases under the root with their table counts
///
/// Hidden entries are skipped; the catalog file does not count as a table.
pub fn list_databases(root: &Path) -> Result<Vec<(String, usize)>> {
    let mut databases = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let mut tables = 0usize;
        for file in fs::read_dir(entry.path())? {
            let file = file?;
            let file_name = file.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            if file.file_type()?.is_file()
                && file.path().extension().and_then(|e| e.to_str()) == Some(TABLE_EXT)
            {
                tables += 1;
            }
        }
        databases.push((name, tables));
    }
    databases.sort();
    Ok(databases)
}

/// Catalog lines for one database, as stored
pub fn list_tables(db_path: &Path) -> Result<Vec<String>> {
    let path = db_path.join(CATALOG_FILE);
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(&path)?;
    Ok(contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect())
}

/// Rewrite the catalog so `table`'s entry reads `<table> - <rows> rows`
///
/// Other tables' entries are preserved verbatim. Called after every commit.
pub fn update_catalog(db_path: &Path, table: &str, rows: usize) -> Result<()> {
    let path = db_path.join(CATALOG_FILE);
    let mut lines: Vec<String> = if path.is_file() {
        fs::read_to_string(&path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(String::from)
            .collect()
    } else {
        Vec::new()
    };

    let entry = format!("{} - {} rows", table, rows);
    let mut replaced = false;
    for line in lines.iter_mut() {
        if line.split_whitespace().next() == Some(table) {
            *line = entry.clone();
            replaced = true;
        }
    }
    if !replaced {
        lines.push(entry);
    }

    let mut contents = lines.join("\n");
    contents.push('\n');
    write_file_atomic(&path, contents.as_bytes())
}

/// Drop `table`'s line from the catalog, keeping all others
pub fn remove_catalog_entry(db_path: &Path, table: &str) -> Result<()> {
    let path = db_path.join(CATALOG_FILE);
    if !path.is_file() {
        return Ok(());
    }
    let retained: Vec<String> = fs::read_to_string(&path)?
        .lines()
        .filter(|line| line.split_whitespace().next() != Some(table))
        .map(String::from)
        .collect();
    let mut contents = retained.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    write_file_atomic(&path, contents.as_bytes())
}

/// Decrypt a table file into its plaintext text
pub fn read_table_file(path: &Path, key: &[u8; 32]) -> Result<String> {
    let envelope = fs::read(path).map_err(|e| {
        Error::Program(format!(
            "Error occurred while opening {}: {}",
            path.display(),
            e
        ))
    })?;
    crypto::decrypt(key, &envelope)
}

/// Encrypt a table's plaintext and atomically replace its file
pub fn write_table_file(path: &Path, key: &[u8; 32], plaintext: &str) -> Result<()> {
    write_file_atomic(path, &crypto::encrypt(key, plaintext))
}

/// Write `contents` to `path` atomically: temp file in the destination
/// directory, then rename over the target
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Program(format!("{} has no parent directory", path.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path)
        .map_err(|e| Error::Program(format!("Failed to replace {}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Read the stored passphrase digest, if the installation has one
pub fn read_stored_hash(root: &Path) -> Result<Option<String>> {
    let path = root.join(PASS_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)?;
    let hash = contents.lines().next().unwrap_or("").trim().to_string();
    if hash.is_empty() {
        return Err(Error::Program("passphrase file is empty".to_string()));
    }
    Ok(Some(hash))
}

/// Overwrite the stored passphrase digest
pub fn write_stored_hash(root: &Path, hash: &str) -> Result<()> {
    write_file_atomic(&root.join(PASS_FILE), format!("{}\n", hash).as_bytes())
}

/// Remove every entry under the data root (the three-strikes wipe)
pub fn wipe_root(root: &Path) -> Result<()> {
    warn!("Wiping every entry under {}", root.display());
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("demo"));
        assert!(is_valid_name("Demo_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("bad name"));
        assert!(!is_valid_name("semi;colon"));
        assert!(!is_valid_name("dot.dot"));
    }

    #[test]
    fn test_create_and_erase_database() {
        let root = tempfile::tempdir().unwrap();
        create_database(root.path(), "demo").unwrap();
        assert!(database_exists(root.path(), "demo"));

        // Creating it again is a logic error.
        assert!(matches!(
            create_database(root.path(), "demo"),
            Err(Error::Logic(_))
        ));

        erase_database(root.path(), "demo").unwrap();
        assert!(!database_exists(root.path(), "demo"));
        assert!(matches!(
            erase_database(root.path(), "demo"),
            Err(Error::Logic(_))
        ));
    }

    #[test]
    fn test_catalog_update_preserves_other_entries() {
        let root = tempfile::tempdir().unwrap();
        update_catalog(root.path(), "people", 2).unwrap();
        update_catalog(root.path(), "orders", 7).unwrap();
        update_catalog(root.path(), "people", 3).unwrap();

        let lines = list_tables(root.path()).unwrap();
        assert_eq!(lines, vec!["people - 3 rows", "orders - 7 rows"]);
    }

    #[test]
    fn test_remove_catalog_entry() {
        let root = tempfile::tempdir().unwrap();
        update_catalog(root.path(), "people", 2).unwrap();
        update_catalog(root.path(), "orders", 7).unwrap();

        remove_catalog_entry(root.path(), "people").unwrap();
        assert_eq!(list_tables(root.path()).unwrap(), vec!["orders - 7 rows"]);

        // Removing a missing entry is a no-op.
        remove_catalog_entry(root.path(), "people").unwrap();
    }

    #[test]
    fn test_table_file_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let key = crypto::derive_key(&crypto::salted_hash("pw", crypto::STORE_SALT));
        let path = root.path().join("people.bin");

        write_table_file(&path, &key, "id(INT)(PRIMARY)\n1\n").unwrap();
        assert_eq!(
            read_table_file(&path, &key).unwrap(),
            "id(INT)(PRIMARY)\n1\n"
        );
    }

    #[test]
    fn test_list_databases_counts_tables() {
        let root = tempfile::tempdir().unwrap();
        create_database(root.path(), "a").unwrap();
        create_database(root.path(), "b").unwrap();
        let key = crypto::derive_key(&crypto::salted_hash("pw", crypto::STORE_SALT));
        write_table_file(&root.path().join("a").join("t1.bin"), &key, "x").unwrap();
        write_table_file(&root.path().join("a").join("t2.bin"), &key, "x").unwrap();
        // The catalog file must not count as a table.
        fs::write(root.path().join("a").join(CATALOG_FILE), "t1 - 0 rows\n").unwrap();

        let listing = list_databases(root.path()).unwrap();
        assert_eq!(listing, vec![("a".to_string(), 2), ("b".to_string(), 0)]);
    }

    #[test]
    fn test_stored_hash_round_trip() {
        let root = tempfile::tempdir().unwrap();
        assert!(read_stored_hash(root.path()).unwrap().is_none());
        write_stored_hash(root.path(), "abc123").unwrap();
        assert_eq!(
            read_stored_hash(root.path()).unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_wipe_root_removes_everything() {
        let root = tempfile::tempdir().unwrap();
        create_database(root.path(), "demo").unwrap();
        write_stored_hash(root.path(), "abc").unwrap();

        wipe_root(root.path()).unwrap();
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
