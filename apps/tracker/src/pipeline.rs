use crate::rpc::RpcClient;
use anyhow::{Result, anyhow};
use futures::{StreamExt, stream};
use log::{info, warn};
use serde_json::Value;
use std::{fs::OpenOptions, io::Write, path::Path};
use transfers::extract_transfer;

/// Fetches a wallet's recent transactions and writes one transfer summary
/// per line. Records that fail to fetch (or that the node no longer has)
/// are treated as absent and skipped, never fatal.
pub async fn report_transfers(
    rpc: &RpcClient,
    address: &str,
    limit: usize,
    concurrency: usize,
    out_path: Option<&Path>,
) -> Result<()> {
    info!(
        "tracker: address={} limit={} concurrency={}",
        address, limit, concurrency
    );

    // Step A: page signatures
    let mut signatures: Vec<String> = Vec::with_capacity(limit);
    let mut before: Option<String> = None;

    while signatures.len() < limit {
        let page_size = std::cmp::min(1000, limit - signatures.len());

        let res = rpc
            .get_signatures_for_address(address, page_size, before.as_deref())
            .await
            .map_err(|e| anyhow!("getSignaturesForAddress failed: {e:?}"))?;

        let arr = res
            .as_array()
            .ok_or_else(|| anyhow!("unexpected signatures result"))?;
        if arr.is_empty() {
            break;
        }

        for item in arr {
            if let Some(sig) = item.get("signature").and_then(|v| v.as_str()) {
                signatures.push(sig.to_string());
            }
        }

        before = arr
            .last()
            .and_then(|x| x.get("signature"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        info!("collected signatures: {}", signatures.len());
    }

    info!("fetching {} transactions…", signatures.len());

    // Step B: fetch transactions concurrently
    let rpc2 = rpc.clone();

    let mut ok = 0usize;
    let mut absent = 0usize;
    let mut fetch_errors = 0usize;

    let mut stream = stream::iter(signatures.into_iter())
        .map(move |sig| {
            let rpc = rpc2.clone();
            let sig2 = sig.clone();
            async move {
                let tx = rpc.get_transaction(&sig2).await;
                (sig, tx)
            }
        })
        .buffer_unordered(concurrency);

    let mut out: Box<dyn Write> = match out_path {
        Some(p) => {
            info!("appending summaries to {}", p.display());
            Box::new(OpenOptions::new().create(true).append(true).open(p)?)
        }
        None => Box::new(std::io::stdout()),
    };

    while let Some((sig, tx_res)) = stream.next().await {
        // A fetch failure or a null result is the absence signal: the
        // extractor maps it to no summary, and the run keeps going.
        let tx = match tx_res {
            Ok(Value::Null) => None,
            Ok(v) => Some(v),
            Err(e) => {
                fetch_errors += 1;
                warn!("getTransaction failed sig={sig}: {e:?}");
                None
            }
        };

        match extract_transfer(tx.as_ref(), address) {
            Some(summary) => {
                ok += 1;
                let line = serde_json::to_string(&summary)?;
                writeln!(out, "{line}")?;
            }
            None => absent += 1,
        }

        let done = ok + absent;
        if done.is_multiple_of(100) {
            info!(
                "progress fetched={} summaries={} absent={} fetch_errors={}",
                done, ok, absent, fetch_errors
            );
        }
    }

    info!(
        "done. summaries={} absent={} fetch_errors={}",
        ok, absent, fetch_errors
    );
    Ok(())
}
