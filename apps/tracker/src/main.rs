use anyhow::Result;
use clap::Parser;
use log::info;

mod config;
mod pipeline;
mod rpc;

fn setup_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = config::Cli::parse();
    let cfg = config::load(&cli)?;

    // Ensure data dir exists if using --out data/...
    if let Some(out) = &cli.out
        && let Some(parent) = out.parent()
    {
        std::fs::create_dir_all(parent)?;
    }
    info!("using rpc_url={}", cfg.rpc_url);

    let rpc = rpc::RpcClient::new(cfg.rpc_url.clone());

    pipeline::report_transfers(
        &rpc,
        &cli.address,
        cli.limit,
        cli.concurrency,
        cli.out.as_deref(),
    )
    .await?;

    Ok(())
}
