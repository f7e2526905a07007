pub mod account_keys;
pub mod transfer;

// Account key resolution (legacy + v0 lookup tables)
pub use account_keys::{resolve_account_keys, ResolvedAccountKeys};

// Transfer summary layer
pub use transfer::{
    explorer_url, extract_transfer, TransferSummary, NATIVE_ASSET_ID, NATIVE_DECIMALS,
};
