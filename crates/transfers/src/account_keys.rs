/// Account key resolution for ledger transactions.
///
/// A transaction's participant addresses live in `message.accountKeys`, and
/// for v0 transactions may extend into on-chain Address Lookup Tables. When
/// the lookup tables were fetched alongside the transaction, their entries
/// appear under `meta.loadedAddresses`; when they were not, the extension
/// addresses are simply unavailable and only the static list can be used.

use serde_json::Value;

/// Outcome of account key resolution.
///
/// The key list is index-aligned with `meta.preBalances`/`postBalances`.
/// Merged order for full resolution: accountKeys + writable + readonly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAccountKeys {
    /// Every referenced address is present, lookup-table entries included.
    Full(Vec<String>),
    /// The transaction references lookup tables that were not loaded with
    /// it; only the statically-embedded keys are included. Instructions
    /// whose accounts live solely in the unresolved tables will not map to
    /// an address.
    StaticOnly(Vec<String>),
}

impl ResolvedAccountKeys {
    /// The resolved keys, in balance-array order.
    pub fn keys(&self) -> &[String] {
        match self {
            ResolvedAccountKeys::Full(keys) | ResolvedAccountKeys::StaticOnly(keys) => keys,
        }
    }

    /// Whether lookup-table extension addresses (if any) were resolved.
    pub fn is_complete(&self) -> bool {
        matches!(self, ResolvedAccountKeys::Full(_))
    }
}

/// Resolves the full account key list for a transaction.
///
/// Handles both encodings of the addressing section:
/// - legacy: `accountKeys` is the complete flat list
/// - v0: `accountKeys` + `addressTableLookups`, expanded via
///   `meta.loadedAddresses` when available
///
/// Never fails: a referenced-but-unloaded lookup table degrades to
/// `StaticOnly`, and a missing message yields an empty list.
///
/// # Arguments
/// * `tx` - Transaction JSON object (from RPC getTransaction)
pub fn resolve_account_keys(tx: &Value) -> ResolvedAccountKeys {
    let message = match tx.pointer("/transaction/message") {
        Some(m) => m,
        None => return ResolvedAccountKeys::Full(vec![]),
    };

    // Static keys from message.accountKeys.
    // Handle both jsonParsed (object with pubkey field) and raw (string) formats
    let mut keys: Vec<String> = message
        .get("accountKeys")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| {
                    if x.is_string() {
                        x.as_str().map(|s| s.to_string())
                    } else {
                        x.get("pubkey")
                            .and_then(|p| p.as_str())
                            .map(|s| s.to_string())
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let references_lookup_tables = message
        .get("addressTableLookups")
        .and_then(|v| v.as_array())
        .map(|arr| !arr.is_empty())
        .unwrap_or(false);

    match tx.pointer("/meta/loadedAddresses") {
        Some(loaded) => {
            // v0 with loaded tables: append writable then readonly
            for section in ["writable", "readonly"] {
                if let Some(addrs) = loaded.get(section).and_then(|v| v.as_array()) {
                    for addr in addrs {
                        if let Some(s) = addr.as_str() {
                            keys.push(s.to_string());
                        }
                    }
                }
            }
            ResolvedAccountKeys::Full(keys)
        }
        None if references_lookup_tables => ResolvedAccountKeys::StaticOnly(keys),
        None => ResolvedAccountKeys::Full(keys),
    }
}
