//! CLI commands module.

use anyhow::Result;
use clap::Subcommand;

mod account;
mod tx;

#[derive(Subcommand)]
pub enum Commands {
    /// Account management
    Account(account::AccountArgs),
    /// Transaction signing and validation
    Tx(tx::TxArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Account(args) => account::run(args),
        Commands::Tx(args) => tx::run(args),
    }
}
