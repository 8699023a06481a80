use alloy::primitives::Address;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub chat_id: i64,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TokenWatch {
    pub id: i64,
    pub chat_id: i64,
    pub wallet_name: String,
    pub token_contract: String,
    pub token_label: String,
    pub min_amount: f64,
    pub max_amount: f64,
    pub created_at: DateTime<Utc>,
}

impl TokenWatch {
    /// Range check for one decimal amount; both bounds are inclusive.
    pub fn amount_in_range(&self, amount: f64) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }
}

/// One (user, wallet, watch) unit of work within a cycle.
#[derive(Debug, Clone)]
pub struct WatchPair {
    pub wallet: Wallet,
    pub watch: TokenWatch,
}

impl WatchPair {
    pub fn chat_id(&self) -> i64 {
        self.watch.chat_id
    }
}

/// Dedup ledger key: one notified-set per (user, wallet, token).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub chat_id: i64,
    pub wallet_address: String,
    pub token_contract: String,
}

impl WatchKey {
    pub fn new(chat_id: i64, wallet_address: &str, token_contract: &str) -> Self {
        Self {
            chat_id,
            wallet_address: wallet_address.to_lowercase(),
            token_contract: token_contract.to_lowercase(),
        }
    }

    /// Rate-limit bucket: sends are capped per (user, token), not per wallet.
    pub fn rate_key(&self) -> String {
        format!("{}:{}", self.chat_id, self.token_contract)
    }
}

/// Parses an EVM address and normalizes it to lowercase hex
pub fn normalize_address(address: &str) -> Result<String> {
    let parsed: Address = address
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid address '{}'", address))?;

    // Display gives the checksummed form; storage and comparisons use lowercase
    Ok(parsed.to_string().to_lowercase())
}
