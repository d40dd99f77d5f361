//! Account management command.

use anyhow::{Context, Result};
use blkcor_core::{AccountId, PrivateKey};
use blkcor_database::{genesis, Database, Genesis};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Extension used for private key files.
pub const KEY_EXTENSION: &str = "ecdsa";

#[derive(Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Generate a new private key
    New {
        /// Directory holding private key files
        #[arg(short, long, default_value = "zblock/accounts")]
        accounts_dir: PathBuf,

        /// Name for the key file (without extension)
        #[arg(short, long)]
        name: String,
    },
    /// Print the account id of a private key file
    Address {
        /// Private key file
        #[arg(short, long)]
        key: PathBuf,
    },
    /// Check an account balance in the genesis ledger
    Balance {
        /// Genesis file
        #[arg(short, long, default_value = genesis::DEFAULT_PATH)]
        genesis: PathBuf,

        /// Account id (hex format)
        account: String,
    },
    /// List every account in the genesis ledger
    List {
        /// Genesis file
        #[arg(short, long, default_value = genesis::DEFAULT_PATH)]
        genesis: PathBuf,
    },
}

pub fn run(args: AccountArgs) -> Result<()> {
    match args.command {
        AccountCommand::New { accounts_dir, name } => new_key(&accounts_dir, &name),
        AccountCommand::Address { key } => show_address(&key),
        AccountCommand::Balance { genesis, account } => check_balance(&genesis, &account),
        AccountCommand::List { genesis } => list_accounts(&genesis),
    }
}

/// Read a hex private key from disk.
pub fn load_key(path: &Path) -> Result<PrivateKey> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file: {}", path.display()))?;
    PrivateKey::from_hex(&content)
        .with_context(|| format!("Invalid private key in: {}", path.display()))
}

/// Build the ledger from a genesis file, logging its events.
pub fn open_ledger(path: &Path) -> Result<Database> {
    let genesis = Genesis::load(path)
        .with_context(|| format!("Failed to load genesis: {}", path.display()))?;
    let db = Database::new(genesis, |ev| info!("{}", ev))?;
    Ok(db)
}

fn new_key(accounts_dir: &Path, name: &str) -> Result<()> {
    let key = PrivateKey::generate();
    let address = key.address();

    fs::create_dir_all(accounts_dir)
        .with_context(|| format!("Failed to create directory: {}", accounts_dir.display()))?;
    let key_file = accounts_dir.join(format!("{}.{}", name, KEY_EXTENSION));
    fs::write(&key_file, key.to_hex())?;

    println!("{}", "Generated new key:".bold().cyan());
    println!();
    println!("  Account: {}", address.to_string().bright_yellow());
    println!(
        "{}  Saved to: {}",
        "✓".green().bold(),
        key_file.display().to_string().bright_black()
    );
    println!();
    println!("{}", "Keep your private key safe!".yellow().bold());

    Ok(())
}

fn show_address(key_path: &Path) -> Result<()> {
    let key = load_key(key_path)?;
    println!("{}", key.address());
    Ok(())
}

fn check_balance(genesis_path: &Path, account: &str) -> Result<()> {
    let account_id = AccountId::new(account)
        .with_context(|| format!("Invalid account id: {}", account))?;
    let db = open_ledger(genesis_path)?;
    let account = db.query(&account_id)?;

    println!(
        "{}  {}",
        account.account_id.to_checksum().bright_yellow(),
        account.balance.to_string().bright_cyan()
    );
    Ok(())
}

fn list_accounts(genesis_path: &Path) -> Result<()> {
    let db = open_ledger(genesis_path)?;
    let mut accounts: Vec<_> = db.copy().into_values().collect();
    accounts.sort_by(|a, b| b.balance.cmp(&a.balance));

    println!(
        "{} (chain {})",
        "Accounts".bold().cyan(),
        db.genesis().chain_id
    );
    println!();
    for account in accounts {
        println!(
            "  {}  {}",
            account.account_id.to_checksum().bright_yellow(),
            account.balance
        );
    }
    Ok(())
}
