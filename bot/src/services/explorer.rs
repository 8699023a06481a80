use alloy::primitives::U256;
use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;
use tracing::debug;

use crate::models::transfers::TransferEvent;
use crate::watcher::TransferSource;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("explorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("explorer returned HTTP {0}")]
    Status(StatusCode),
    #[error("explorer API error: {0}")]
    Api(String),
    #[error("malformed explorer response: {0}")]
    Malformed(String),
}

/// BscScan-style response envelope. `result` is an array of transfer rows
/// on success and an error string otherwise, so it stays untyped here.
#[derive(Debug, Deserialize)]
struct TokenTxResponse {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TokenTxEntry {
    hash: String,
    from: String,
    to: String,
    value: String,
    #[serde(rename = "tokenDecimal")]
    token_decimal: String,
}

#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(base_url: String, api_key: String, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Fetches the most recent BEP-20 transfers touching `wallet_address`
    /// for one token contract, newest first, capped at `max_results`.
    pub async fn token_transfers(
        &self,
        wallet_address: &str,
        token_contract: &str,
        max_results: u32,
    ) -> Result<Vec<TransferEvent>, ExplorerError> {
        let offset = max_results.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "tokentx"),
                ("address", wallet_address),
                ("contractaddress", token_contract),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExplorerError::Status(response.status()));
        }

        let body = response.text().await?;
        let events = parse_response(&body)?;
        debug!(
            "Explorer returned {} event(s) for wallet {} token {}",
            events.len(),
            wallet_address,
            token_contract
        );
        Ok(events)
    }
}

impl TransferSource for ExplorerClient {
    async fn recent_transfers(
        &self,
        wallet_address: &str,
        token_contract: &str,
        max_results: u32,
    ) -> Result<Vec<TransferEvent>> {
        let events = self
            .token_transfers(wallet_address, token_contract, max_results)
            .await?;
        Ok(events)
    }
}

fn parse_response(body: &str) -> Result<Vec<TransferEvent>, ExplorerError> {
    let response: TokenTxResponse = serde_json::from_str(body)
        .map_err(|e| ExplorerError::Malformed(format!("invalid JSON: {}", e)))?;

    // The explorer reports "no rows matched" through the same status field
    // as real errors. Only that case maps to an empty result set.
    if response.status != "1" {
        if response.message.contains("No transactions found") {
            return Ok(Vec::new());
        }
        let detail = match &response.result {
            serde_json::Value::String(s) => s.clone(),
            _ => response.message.clone(),
        };
        return Err(ExplorerError::Api(detail));
    }

    let entries: Vec<TokenTxEntry> = serde_json::from_value(response.result)
        .map_err(|e| ExplorerError::Malformed(format!("unexpected result shape: {}", e)))?;

    entries.into_iter().map(parse_entry).collect()
}

fn parse_entry(entry: TokenTxEntry) -> Result<TransferEvent, ExplorerError> {
    let raw_value = U256::from_str_radix(&entry.value, 10).map_err(|_| {
        ExplorerError::Malformed(format!("bad value '{}' for tx {}", entry.value, entry.hash))
    })?;

    let token_decimals = entry.token_decimal.parse::<u8>().map_err(|_| {
        ExplorerError::Malformed(format!(
            "bad tokenDecimal '{}' for tx {}",
            entry.token_decimal, entry.hash
        ))
    })?;

    Ok(TransferEvent {
        tx_hash: entry.hash,
        from_address: entry.from,
        to_address: entry.to,
        raw_value,
        token_decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_successful_response() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [
                {
                    "blockNumber": "41234567",
                    "timeStamp": "1719876543",
                    "hash": "0x9f2e1c",
                    "from": "0x1111111111111111111111111111111111111111",
                    "contractAddress": "0x55d398326f99059ff775485246999027b3197955",
                    "to": "0x2222222222222222222222222222222222222222",
                    "value": "50000000000000000",
                    "tokenName": "Tether USD",
                    "tokenSymbol": "USDT",
                    "tokenDecimal": "18",
                    "confirmations": "120"
                },
                {
                    "blockNumber": "41234560",
                    "timeStamp": "1719876500",
                    "hash": "0xaa77bb",
                    "from": "0x2222222222222222222222222222222222222222",
                    "contractAddress": "0x55d398326f99059ff775485246999027b3197955",
                    "to": "0x3333333333333333333333333333333333333333",
                    "value": "1500000",
                    "tokenName": "Tether USD",
                    "tokenSymbol": "USDT",
                    "tokenDecimal": "6",
                    "confirmations": "127"
                }
            ]
        }"#;

        let events = parse_response(body).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tx_hash, "0x9f2e1c");
        assert_eq!(events[0].to_address, "0x2222222222222222222222222222222222222222");
        assert_eq!(events[0].raw_value, U256::from(50000000000000000u64));
        assert_eq!(events[0].token_decimals, 18);
        assert_eq!(events[1].token_decimals, 6);
    }

    #[test]
    fn no_transactions_found_is_an_empty_result() {
        let body = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        let events = parse_response(body).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn api_errors_surface_the_detail_string() {
        let body =
            r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let err = parse_response(body).unwrap_err();
        match err {
            ExplorerError::Api(detail) => assert!(detail.contains("Max rate limit reached")),
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_value_is_malformed() {
        let body = r#"{
            "status": "1",
            "message": "OK",
            "result": [
                {
                    "hash": "0xbad",
                    "from": "0x1111111111111111111111111111111111111111",
                    "to": "0x2222222222222222222222222222222222222222",
                    "value": "not-a-number",
                    "tokenDecimal": "18"
                }
            ]
        }"#;

        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, ExplorerError::Malformed(_)));
    }

    #[test]
    fn unexpected_result_shape_is_malformed() {
        let body = r#"{"status":"1","message":"OK","result":"surprise"}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, ExplorerError::Malformed(_)));
    }
}
