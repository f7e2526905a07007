//! Transfer summary extraction.
//!
//! Turns a raw `getTransaction` record into a normalized transfer summary
//! for one wallet: counterparties plus a signed amount in a named asset.
//! The record shape varies across encodings and meta may be missing
//! entirely, so every lookup degrades to `None` rather than erroring.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account_keys::resolve_account_keys;

/// Asset id reported for native SOL amounts. Token amounts carry the mint
/// address instead, so consumers can match on this to tell the two apart.
pub const NATIVE_ASSET_ID: &str = "SOL";

/// Lamports per SOL is 10^9.
pub const NATIVE_DECIMALS: u32 = 9;

const EXPLORER_TX_BASE: &str = "https://solscan.io/tx/";

/// Explorer link for a transaction signature.
pub fn explorer_url(signature: &str) -> String {
    format!("{EXPLORER_TX_BASE}{signature}")
}

/// Normalized transfer summary for a single transaction, as seen from one
/// wallet's point of view.
///
/// `amount` is signed in whole asset units: negative = net outflow from the
/// wallet, positive = net inflow. `asset_id` is either [`NATIVE_ASSET_ID`]
/// or a token mint address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub signature: String,
    pub explorer_url: String,
    /// ISO-8601 block time; None for unconfirmed/pruned records.
    pub date: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub amount: Option<f64>,
    pub asset_id: Option<String>,
    pub slot: u64,
}

/// Extracts a transfer summary from a raw transaction record.
///
/// `tx` is the `getTransaction` response for one signature; `None` means
/// the fetch failed or the transaction was not found, which yields `None`
/// rather than an error. Everything else produces a summary, with fields
/// the record cannot support left unset:
///
/// - amounts prefer the wallet's token sub-balance deltas and fall back to
///   its lamport balance delta, scaled by the asset's decimals
/// - `sender` is the fee payer (account key 0 by ledger convention)
/// - `receiver` is the second referenced account of the first instruction
///   that references at least two, a structural guess that matches the
///   common transfer instruction shape rather than a semantic decode
pub fn extract_transfer(tx: Option<&Value>, target: &str) -> Option<TransferSummary> {
    let tx = tx?;

    let signature = tx
        .pointer("/transaction/signatures/0")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let slot = tx.get("slot").and_then(|v| v.as_u64()).unwrap_or(0);
    let date = tx
        .get("blockTime")
        .and_then(|v| v.as_i64())
        .and_then(iso8601);

    // First token balance entry owned by the wallet, on each side.
    let pre_token = first_token_balance_for_owner(tx, "/meta/preTokenBalances", target);
    let post_token = first_token_balance_for_owner(tx, "/meta/postTokenBalances", target);

    let resolved = resolve_account_keys(tx);
    let keys = resolved.keys();

    // Lamport balances for the wallet, when the key list and the
    // index-aligned balance arrays both cover it.
    let target_index = keys.iter().position(|k| k == target);
    let (pre_balance, post_balance) = match target_index {
        Some(i) => (
            balance_at(tx, "/meta/preBalances", i),
            balance_at(tx, "/meta/postBalances", i),
        ),
        None => (None, None),
    };

    let sender = keys.first().cloned();
    let receiver = detect_receiver(tx, keys);

    // Token sub-balances win over lamport balances when both sides match;
    // fees and rent move lamports in almost every transaction.
    let (amount, asset_id) = match (&pre_token, &post_token) {
        (Some(pre), Some(post)) => {
            let delta = raw_token_amount(post) - raw_token_amount(pre);
            let decimals = pre
                .pointer("/uiTokenAmount/decimals")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as i32;
            let mint = pre
                .get("mint")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            (Some(delta as f64 / 10f64.powi(decimals)), mint)
        }
        _ => match (pre_balance, post_balance) {
            (Some(pre), Some(post)) => {
                let delta = post as i128 - pre as i128;
                let amount = delta as f64 / 10f64.powi(NATIVE_DECIMALS as i32);
                (Some(amount), Some(NATIVE_ASSET_ID.to_string()))
            }
            _ => (None, None),
        },
    };

    Some(TransferSummary {
        explorer_url: explorer_url(&signature),
        signature,
        date,
        sender,
        receiver,
        amount,
        asset_id,
        slot,
    })
}

fn iso8601(block_time: i64) -> Option<String> {
    DateTime::from_timestamp(block_time, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn first_token_balance_for_owner<'a>(tx: &'a Value, path: &str, owner: &str) -> Option<&'a Value> {
    tx.pointer(path)
        .and_then(|v| v.as_array())
        .and_then(|arr| {
            arr.iter()
                .find(|b| b.get("owner").and_then(|o| o.as_str()) == Some(owner))
        })
}

fn raw_token_amount(balance: &Value) -> i128 {
    // uiTokenAmount.amount is a string integer in base units; missing or
    // unparsable counts as zero
    balance
        .pointer("/uiTokenAmount/amount")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<i128>().ok())
        .unwrap_or(0)
}

fn balance_at(tx: &Value, path: &str, index: usize) -> Option<u64> {
    tx.pointer(path)
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.get(index))
        .and_then(|v| v.as_u64())
}

/// Counterparty guess: the second referenced account of the first
/// instruction that references at least two. First occurrence wins, even
/// when its index points into an unresolved lookup table (in which case
/// there is no address to report).
fn detect_receiver(tx: &Value, keys: &[String]) -> Option<String> {
    let instructions = tx
        .pointer("/transaction/message/instructions")
        .and_then(|v| v.as_array())?;

    for ix in instructions {
        let accounts = match ix.get("accounts").and_then(|v| v.as_array()) {
            Some(a) => a,
            None => continue,
        };
        if accounts.len() < 2 {
            continue;
        }
        return accounts[1]
            .as_u64()
            .and_then(|i| keys.get(i as usize))
            .cloned();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WALLET: &str = "Wallet1111111111111111111111111111111111111";
    const OTHER: &str = "Other11111111111111111111111111111111111111";

    fn native_tx() -> Value {
        json!({
            "slot": 250000000,
            "blockTime": 1703001234,
            "transaction": {
                "signatures": ["sig_native"],
                "message": {
                    "accountKeys": [WALLET, OTHER, "11111111111111111111111111111111"],
                    "instructions": [
                        {"programIdIndex": 2, "accounts": [0, 1], "data": "3Bxs4h24hBtQy9rw"}
                    ]
                }
            },
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [5_000_000_000u64, 1_000_000_000u64, 1],
                "postBalances": [4_000_000_000u64, 2_000_000_000u64, 1],
                "preTokenBalances": [],
                "postTokenBalances": []
            }
        })
    }

    #[test]
    fn test_absent_record_yields_none() {
        assert_eq!(extract_transfer(None, WALLET), None);
    }

    #[test]
    fn test_native_outflow_sign_preserved() {
        let tx = native_tx();
        let summary = extract_transfer(Some(&tx), WALLET).unwrap();

        assert_eq!(summary.signature, "sig_native");
        assert_eq!(summary.explorer_url, "https://solscan.io/tx/sig_native");
        assert_eq!(summary.slot, 250000000);
        assert_eq!(summary.sender.as_deref(), Some(WALLET));
        assert_eq!(summary.receiver.as_deref(), Some(OTHER));
        assert_eq!(summary.amount, Some(-1.0));
        assert_eq!(summary.asset_id.as_deref(), Some(NATIVE_ASSET_ID));
    }

    #[test]
    fn test_native_inflow_positive() {
        let tx = native_tx();
        let summary = extract_transfer(Some(&tx), OTHER).unwrap();

        assert_eq!(summary.amount, Some(1.0));
        // Sender stays the fee payer regardless of which wallet is watched
        assert_eq!(summary.sender.as_deref(), Some(WALLET));
    }

    #[test]
    fn test_token_path_takes_priority() {
        let mut tx = native_tx();
        tx["meta"]["preTokenBalances"] = json!([
            {
                "accountIndex": 1,
                "mint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "owner": WALLET,
                "uiTokenAmount": {"amount": "1000000", "decimals": 6}
            }
        ]);
        tx["meta"]["postTokenBalances"] = json!([
            {
                "accountIndex": 1,
                "mint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "owner": WALLET,
                "uiTokenAmount": {"amount": "1500000", "decimals": 6}
            }
        ]);

        let summary = extract_transfer(Some(&tx), WALLET).unwrap();

        // Native balances also resolve here, but the token delta wins
        assert_eq!(summary.amount, Some(0.5));
        assert_eq!(
            summary.asset_id.as_deref(),
            Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
        );
    }

    #[test]
    fn test_first_owner_match_wins() {
        let mut tx = native_tx();
        let entry = |mint: &str, amount: &str| {
            json!({
                "accountIndex": 1,
                "mint": mint,
                "owner": WALLET,
                "uiTokenAmount": {"amount": amount, "decimals": 6}
            })
        };
        tx["meta"]["preTokenBalances"] = json!([entry("MintA", "100"), entry("MintB", "999")]);
        tx["meta"]["postTokenBalances"] = json!([entry("MintA", "300"), entry("MintB", "0")]);

        let summary = extract_transfer(Some(&tx), WALLET).unwrap();
        assert_eq!(summary.asset_id.as_deref(), Some("MintA"));
        assert_eq!(summary.amount, Some(0.0002));
    }

    #[test]
    fn test_token_amount_defaults() {
        let mut tx = native_tx();
        // No uiTokenAmount on the pre side, no decimals anywhere
        tx["meta"]["preTokenBalances"] = json!([
            {"accountIndex": 1, "mint": "MintA", "owner": WALLET}
        ]);
        tx["meta"]["postTokenBalances"] = json!([
            {"accountIndex": 1, "mint": "MintA", "owner": WALLET,
             "uiTokenAmount": {"amount": "25"}}
        ]);

        let summary = extract_transfer(Some(&tx), WALLET).unwrap();
        // raw defaults to 0, decimals default to 0
        assert_eq!(summary.amount, Some(25.0));
    }

    #[test]
    fn test_unmatched_owner_falls_back_to_native() {
        let mut tx = native_tx();
        tx["meta"]["preTokenBalances"] = json!([
            {"accountIndex": 1, "mint": "MintA", "owner": OTHER,
             "uiTokenAmount": {"amount": "100", "decimals": 6}}
        ]);
        tx["meta"]["postTokenBalances"] = json!([
            {"accountIndex": 1, "mint": "MintA", "owner": OTHER,
             "uiTokenAmount": {"amount": "200", "decimals": 6}}
        ]);

        let summary = extract_transfer(Some(&tx), WALLET).unwrap();
        assert_eq!(summary.asset_id.as_deref(), Some(NATIVE_ASSET_ID));
        assert_eq!(summary.amount, Some(-1.0));
    }

    #[test]
    fn test_absent_meta_still_populates_identifiers() {
        let tx = json!({
            "slot": 100,
            "blockTime": 1703001234,
            "transaction": {
                "signatures": ["sig_no_meta"],
                "message": {
                    "accountKeys": [WALLET, OTHER],
                    "instructions": [{"programIdIndex": 1, "accounts": [0, 1]}]
                }
            }
        });

        let summary = extract_transfer(Some(&tx), WALLET).unwrap();
        assert_eq!(summary.signature, "sig_no_meta");
        assert_eq!(summary.explorer_url, "https://solscan.io/tx/sig_no_meta");
        assert_eq!(summary.slot, 100);
        assert!(summary.date.is_some());
        assert_eq!(summary.amount, None);
        assert_eq!(summary.asset_id, None);
    }

    #[test]
    fn test_receiver_from_first_multi_account_instruction() {
        let tx = json!({
            "slot": 1,
            "transaction": {
                "signatures": ["sig_rx"],
                "message": {
                    "accountKeys": ["K0", "K1", "K2", "K3", "K4", "K5", "K6", "K7"],
                    "instructions": [
                        {"programIdIndex": 0, "accounts": [3]},
                        {"programIdIndex": 0, "accounts": [2, 5, 7]},
                        {"programIdIndex": 0, "accounts": [1, 6]}
                    ]
                }
            }
        });

        let summary = extract_transfer(Some(&tx), "K0").unwrap();
        // Single-account instruction is skipped; later instructions ignored
        assert_eq!(summary.receiver.as_deref(), Some("K5"));
    }

    #[test]
    fn test_receiver_none_without_multi_account_instruction() {
        let tx = json!({
            "slot": 1,
            "transaction": {
                "signatures": ["sig_rx2"],
                "message": {
                    "accountKeys": ["K0", "K1"],
                    "instructions": [{"programIdIndex": 1, "accounts": [0]}]
                }
            }
        });

        let summary = extract_transfer(Some(&tx), "K0").unwrap();
        assert_eq!(summary.receiver, None);
    }

    #[test]
    fn test_date_none_without_block_time() {
        let mut tx = native_tx();
        tx.as_object_mut().unwrap().remove("blockTime");

        let summary = extract_transfer(Some(&tx), WALLET).unwrap();
        assert_eq!(summary.date, None);
    }

    #[test]
    fn test_date_iso8601_millis() {
        let tx = native_tx();
        let summary = extract_transfer(Some(&tx), WALLET).unwrap();
        assert_eq!(summary.date.as_deref(), Some("2023-12-19T15:53:54.000Z"));
    }

    #[test]
    fn test_idempotent() {
        let tx = native_tx();
        let a = extract_transfer(Some(&tx), WALLET);
        let b = extract_transfer(Some(&tx), WALLET);
        assert_eq!(a, b);
    }
}
