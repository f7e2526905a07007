use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

const MAX_ATTEMPTS: usize = 6;
const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct RpcClient {
    http: Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: String) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self { http, url }
    }

    /// One page of signatures for an address, newest first.
    pub async fn get_signatures_for_address(
        &self,
        address: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Value> {
        let mut opts = json!({ "limit": limit });
        if let Some(b) = before {
            opts["before"] = json!(b);
        }
        self.call("getSignaturesForAddress", json!([address, opts]))
            .await
    }

    /// Full transaction record. The result is JSON null when the node does
    /// not know the signature.
    pub async fn get_transaction(&self, signature: &str) -> Result<Value> {
        self.call(
            "getTransaction",
            json!([
                signature,
                {
                    "encoding": "json",
                    "maxSupportedTransactionVersion": 0
                }
            ]),
        )
        .await
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        // simple retry with exponential backoff (public RPC friendly)
        let mut backoff = Duration::from_millis(250);

        for attempt in 1..=MAX_ATTEMPTS {
            let body = json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params
            });

            let outcome: Result<()> = match self.http.post(&self.url).json(&body).send().await {
                Ok(r) => {
                    let status = r.status();
                    let v: Value = r
                        .json()
                        .await
                        .map_err(|e| anyhow!("rpc decode error: {e:?}"))?;

                    if !status.is_success() {
                        // usually 429/5xx
                        Err(anyhow!("rpc http error status={status} body={v}"))
                    } else if let Some(err) = v.get("error") {
                        // data-level or transient, still retry a bit
                        Err(anyhow!("rpc returned error: {err}"))
                    } else {
                        return v
                            .get("result")
                            .cloned()
                            .ok_or_else(|| anyhow!("missing result field"));
                    }
                }
                Err(e) => Err(anyhow!("rpc request failed: {e:?}")),
            };

            if let Err(e) = outcome {
                if attempt == MAX_ATTEMPTS {
                    return Err(e);
                }
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }

        Err(anyhow!("unreachable"))
    }
}
