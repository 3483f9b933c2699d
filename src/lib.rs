// src/lib.rs

//! qiloDB
//!
//! Single-user, single-process, disk-backed relational database engine
//! behind an interactive command shell.
//!
//! # Architecture
//!
//! - Hierarchy on disk: data root -> database directories -> one encrypted
//!   file per table
//! - One master passphrase unlocks the installation; table files are
//!   AES-256-CBC envelopes keyed from it
//! - Tables load into a mutable in-memory snapshot; changes reach disk only
//!   on commit, rollback restores the last committed image
//! - A custom SQL-flavored command language with strict
//!   root/database/table context rules

pub mod crypto;
pub mod engine;
mod error;
pub mod query;
pub mod schema;
pub mod session;
pub mod storage;

pub use error::{Error, Result};
