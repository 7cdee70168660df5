use crate::core::Transaction;
use crate::error::{ChainError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(name = "peerchain", about = "Proof-of-work ledger shared by peers over a relay")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML settings file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(name = "listen", about = "Run the relay and pool membership")]
    Listen {
        #[arg(long = "port", help = "Port to listen on")]
        port: Option<u16>,
    },
    #[command(name = "connect", about = "Join a relay as a peer")]
    Connect {
        #[arg(long = "addr", help = "Relay address as HOST:PORT")]
        addr: Option<String>,
        #[arg(long = "mine-interval", help = "Mine a block every SECS seconds")]
        mine_interval: Option<u64>,
    },
}

/// One line typed into the peer console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Mine,
    Tx(Transaction),
    Chain,
    Neighbors,
    Status,
    Help,
    Quit,
}

pub const CONSOLE_HELP: &str = "\
mine                          mine a block with the pending transactions
tx <sender> <recipient> <n>   buffer a transaction (or: tx {json})
chain                         print the local chain
neighbors                     print current neighbor identifiers
status                        print identifier, state and chain length
quit                          leave the pool";

impl FromStr for OperatorCommand {
    type Err = ChainError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "mine" => Ok(OperatorCommand::Mine),
            "tx" => parse_transaction(rest).map(OperatorCommand::Tx),
            "chain" => Ok(OperatorCommand::Chain),
            "neighbors" => Ok(OperatorCommand::Neighbors),
            "status" => Ok(OperatorCommand::Status),
            "help" => Ok(OperatorCommand::Help),
            "quit" | "exit" => Ok(OperatorCommand::Quit),
            _ => Err(ChainError::MalformedInput(format!(
                "Unknown command: {line}. Type 'help' for a list"
            ))),
        }
    }
}

fn parse_transaction(args: &str) -> Result<Transaction> {
    if args.starts_with('{') {
        return Transaction::from_json(args);
    }
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [sender, recipient, amount] => {
            let amount = amount
                .parse::<i64>()
                .map_err(|e| ChainError::MalformedInput(format!("Invalid amount {amount}: {e}")))?;
            Ok(Transaction::new(*sender, *recipient, amount))
        }
        _ => Err(ChainError::MalformedInput(
            "Usage: tx <sender> <recipient> <amount>".to_string(),
        )),
    }
}
