//! Transaction signing and validation command.

use super::account::{load_key, open_ledger};
use anyhow::{Context, Result};
use blkcor_core::{AccountId, BlockTransaction, SignedTransaction, Transaction};
use blkcor_database::genesis;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Args)]
pub struct TxArgs {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand)]
enum TxCommand {
    /// Sign a transfer and print it as JSON
    Sign {
        /// Sender's private key file
        #[arg(short, long)]
        key: PathBuf,

        /// Recipient account id (hex format)
        #[arg(short, long)]
        to: String,

        /// Amount to transfer
        #[arg(short, long)]
        value: u64,

        /// Tip for the block producer
        #[arg(long, default_value = "0")]
        tip: u64,

        /// Sender's nonce
        #[arg(short, long, default_value = "1")]
        nonce: u64,

        /// Chain id
        #[arg(short, long, default_value = "1")]
        chain_id: u16,

        /// Payload as hex
        #[arg(short, long)]
        data: Option<String>,

        /// Write the signed transaction here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Validate a signed transaction read from a JSON file
    Validate {
        /// Signed transaction file
        tx: PathBuf,

        /// Expected chain id (defaults to the genesis chain id)
        #[arg(short, long)]
        chain_id: Option<u16>,

        /// Genesis file, used when no chain id is given
        #[arg(short, long, default_value = genesis::DEFAULT_PATH)]
        genesis: PathBuf,

        /// Gas units to charge when printing the block record
        #[arg(long, default_value = "1")]
        gas_unit: u64,
    },
}

pub fn run(args: TxArgs) -> Result<()> {
    match args.command {
        TxCommand::Sign {
            key,
            to,
            value,
            tip,
            nonce,
            chain_id,
            data,
            out,
        } => {
            let data = match data {
                Some(hex_str) => hex::decode(hex_str.trim_start_matches("0x"))
                    .context("Payload is not valid hex")?,
                None => Vec::new(),
            };
            sign_transfer(&key, &to, value, tip, nonce, chain_id, data, out.as_deref())
        }
        TxCommand::Validate {
            tx,
            chain_id,
            genesis,
            gas_unit,
        } => validate_file(&tx, chain_id, &genesis, gas_unit),
    }
}

#[allow(clippy::too_many_arguments)]
fn sign_transfer(
    key_path: &Path,
    to: &str,
    value: u64,
    tip: u64,
    nonce: u64,
    chain_id: u16,
    data: Vec<u8>,
    out: Option<&Path>,
) -> Result<()> {
    let key = load_key(key_path)?;
    let to_id =
        AccountId::new(to).with_context(|| format!("Invalid recipient account id: {}", to))?;

    let tx = Transaction::new(chain_id, nonce, key.address(), to_id, value, tip, data)?;
    let signed = tx.sign(&key)?;
    let json = serde_json::to_string_pretty(&signed)?;

    match out {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write: {}", path.display()))?;
            println!(
                "{}  Signed {} -> {}",
                "✓".green().bold(),
                signed,
                path.display().to_string().bright_black()
            );
        }
        None => println!("{}", json),
    }
    println!("Signature: {}", signed.signature_string().bright_black());

    Ok(())
}

fn validate_file(
    tx_path: &Path,
    chain_id: Option<u16>,
    genesis_path: &Path,
    gas_unit: u64,
) -> Result<()> {
    let content = fs::read_to_string(tx_path)
        .with_context(|| format!("Failed to read: {}", tx_path.display()))?;
    let signed: SignedTransaction =
        serde_json::from_str(&content).context("Failed to parse signed transaction")?;

    let (chain_id, gas_price) = match chain_id {
        Some(id) => (id, 0),
        None => {
            let db = open_ledger(genesis_path)?;
            (db.genesis().chain_id, db.genesis().gas_price)
        }
    };

    if let Err(e) = signed.validate(chain_id) {
        warn!(tx = %signed, error = %e, "transaction rejected");
        println!("{}  {}: {}", "✗".red().bold(), signed, e);
        return Err(e.into());
    }

    let block_tx = BlockTransaction::new(signed, gas_price, gas_unit);
    println!("{}  {} is valid", "✓".green().bold(), block_tx.signed);
    println!("    Hash: {}", block_tx.hash()?.to_string().bright_yellow());
    println!("    Fee:  {}", block_tx.fee());

    Ok(())
}
