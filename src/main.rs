// src/main.rs

use anyhow::Result;
use clap::Parser;
use qilodb::query::parser::CommandParser;
use qilodb::query::{self, tokenizer};
use qilodb::session::Session;
use qilodb::{crypto, storage};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

#[derive(Parser)]
#[command(name = "qilodb")]
#[command(author, version, about = "Single-user encrypted relational database shell", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print name and version
    ///
    /// Clap's auto flag is `-V`; this tool uses a lowercase `-v`.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Print the absolute path of the data root and exit
    #[arg(long)]
    loc: bool,

    /// Set a new passphrase and re-encrypt every table under it
    #[arg(long)]
    forgot: bool,
}

fn main() -> Result<()> {
    // Initialize logging; the REPL stays quiet unless RUST_LOG asks for more.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let root = storage::default_data_root();
    storage::ensure_data_root(&root)?;

    if cli.loc {
        let absolute = root.canonicalize().unwrap_or(root);
        println!("{}", absolute.display());
        return Ok(());
    }

    if cli.forgot {
        return rotate_passphrase(&root);
    }

    let key = authenticate(&root)?;
    repl(Session::new(root, key))
}

/// Run the passphrase protocol, returning the derived AES key
///
/// A missing passphrase file triggers first-run setup. Wrong entries are
/// counted per run: attempts one and two re-prompt, attempt three warns,
/// attempt four wipes the data root and exits.
fn authenticate(root: &Path) -> Result<[u8; 32]> {
    let stored = match storage::read_stored_hash(root)? {
        Some(hash) => hash,
        None => first_run_setup(root)?,
    };

    let mut strikes = 0u32;
    loop {
        let passphrase = rpassword::prompt_password("Enter passphrase: ")?;
        let digest = crypto::salted_hash(&passphrase, crypto::STORE_SALT);
        if digest == stored {
            return Ok(crypto::derive_key(&digest));
        }
        strikes += 1;
        match strikes {
            1 | 2 => eprintln!("crypto_error: incorrect passphrase."),
            3 => eprintln!(
                "crypto_error: incorrect passphrase. Warning: one attempt remaining before the data store is wiped."
            ),
            _ => {
                storage::wipe_root(root)?;
                eprintln!("crypto_error: too many failed attempts. Data store wiped.");
                std::process::exit(1);
            }
        }
    }
}

/// Interactive setup when no passphrase file exists yet
fn first_run_setup(root: &Path) -> Result<String> {
    println!("No passphrase is set for this installation yet.");
    loop {
        let first = rpassword::prompt_password("Set a master passphrase: ")?;
        if first.is_empty() {
            println!("Passphrase cannot be empty.");
            continue;
        }
        let second = rpassword::prompt_password("Repeat the passphrase: ")?;
        if first != second {
            println!("Passphrases do not match. Try again.");
            continue;
        }
        let digest = crypto::salted_hash(&first, crypto::STORE_SALT);
        storage::write_stored_hash(root, &digest)?;
        info!("Passphrase file created");
        return Ok(digest);
    }
}

/// The `--forgot` flow: take a new passphrase and rotate every table file
fn rotate_passphrase(root: &Path) -> Result<()> {
    let stored = storage::read_stored_hash(root)?.ok_or_else(|| {
        anyhow::anyhow!("no passphrase file found at {}; nothing to rotate", root.display())
    })?;
    let old_key = crypto::derive_key(&stored);

    let new_digest = loop {
        let first = rpassword::prompt_password("New passphrase: ")?;
        if first.is_empty() {
            println!("Passphrase cannot be empty.");
            continue;
        }
        let second = rpassword::prompt_password("Repeat new passphrase: ")?;
        if first == second {
            break crypto::salted_hash(&first, crypto::STORE_SALT);
        }
        println!("Passphrases do not match. Try again.");
    };

    let new_key = crypto::derive_key(&new_digest);
    crypto::rotate_keys(root, &old_key, &new_key)?;
    storage::write_stored_hash(root, &new_digest)?;
    println!("res: Passphrase updated.");
    Ok(())
}

/// The read-eval-print loop
///
/// Every error is printed as one line on the error stream and the loop
/// continues; only `close` (or `exit` at root, or end of input) ends it.
fn repl(mut session: Session) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    while !session.exit_requested {
        print!("{}", session.prompt());
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(err) = execute_line(&line, &mut session) {
            eprintln!("{}", err);
        }
    }
    Ok(())
}

/// Tokenize one line and dispatch its pipe-separated statements
///
/// Tokenizer and pipe-split failures abort the whole line; a failing
/// statement only skips itself, so `a | b | c` behaves like three typed
/// lines.
fn execute_line(line: &str, session: &mut Session) -> qilodb::Result<()> {
    let tokens = tokenizer::tokenize(line)?;
    if tokens.is_empty() {
        return Ok(());
    }
    for statement in query::split_statements(tokens)? {
        if session.exit_requested {
            break;
        }
        if let Err(err) = CommandParser::new(statement, session).run() {
            eprintln!("{}", err);
        }
    }
    Ok(())
}
