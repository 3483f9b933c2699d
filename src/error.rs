// src/error.rs

use thiserror::Error;

/// Core error types for qiloDB
///
/// Each variant corresponds to one user-visible error kind; the Display
/// string is exactly the single line the shell prints. The REPL boundary is
/// the only place these are rendered.
#[derive(Error, Debug)]
pub enum Error {
    /// Tokenization or grammatical violations (mismatched parens, unknown
    /// verb, missing or unexpected arguments)
    #[error("syntax_error: {0}")]
    Syntax(String),

    /// Well-formed request that violates the session context
    #[error("logic_error: {0}")]
    Logic(String),

    /// Contextually valid request referencing schema/data that is wrong
    /// (missing column, missing table, bad row count)
    #[error("invalid_argument: {0}")]
    InvalidArgument(String),

    /// Value fails type validation for the target column
    #[error("mismatch_error: {0}")]
    Mismatch(String),

    /// NOT_NULL, UNIQUE, or primary-key violation
    #[error("constraint_error: {0}")]
    Constraint(String),

    /// I/O failures, installation corruption, failed filesystem operations
    #[error("program_error: {0}")]
    Program(String),

    /// Encryption/decryption failures and passphrase mismatches
    #[error("crypto_error: {0}")]
    Crypto(String),

    /// I/O errors
    #[error("program_error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using qiloDB's Error type
pub type Result<T> = std::result::Result<T, Error>;
