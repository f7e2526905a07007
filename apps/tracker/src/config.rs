use anyhow::{anyhow, Result};
use clap::Parser;
use std::{env, path::PathBuf};

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Wallet address to summarize transfers for
    #[arg(long)]
    pub address: String,

    /// How many recent transactions to inspect
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// RPC URL (public mainnet by default)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Append summaries to this jsonl file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Concurrency for getTransaction calls
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
}

pub fn load(cli: &Cli) -> Result<Config> {
    let rpc_url = cli.rpc_url.clone().or_else(|| env::var("RPC_URL").ok())
        .unwrap_or_else(|| "https://api.mainnet-beta.solana.com".to_string());

    // Reject obviously malformed input before any fetching starts. The
    // interpretation layer assumes a well-formed address.
    if cli.address.trim().is_empty() {
        return Err(anyhow!("--address must not be empty"));
    }
    if cli.limit == 0 {
        return Err(anyhow!("--limit must be at least 1"));
    }
    if cli.concurrency == 0 {
        return Err(anyhow!("--concurrency must be at least 1"));
    }

    Ok(Config { rpc_url })
}
