//! JSON-RPC ledger client
//!
//! [`JsonRpcLedgerClient`] implements [`LedgerClient`] against a node's
//! JSON-RPC endpoint:
//! - `iotax_getCoins` for paginated coin listing
//! - `iotax_getReferenceGasPrice`
//! - `iota_executeTransactionBlock` for signed submissions
//! - `iota_getTransactionBlock`, polled until the effects carry a status

use crate::ledger::{ExecutionStatus, LedgerClient, LedgerError, LedgerResult, TransactionDigest};
use crate::types::{Address, CoinObject, CoinPage, CoinType};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// `iotax_getCoins` result shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinsResponse {
    data: Vec<CoinObject>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

impl From<CoinsResponse> for CoinPage {
    fn from(resp: CoinsResponse) -> Self {
        Self {
            data: resp.data,
            next_cursor: if resp.has_next_page {
                resp.next_cursor
            } else {
                None
            },
        }
    }
}

/// Ledger client speaking JSON-RPC 2.0 over HTTP
#[derive(Debug)]
pub struct JsonRpcLedgerClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl JsonRpcLedgerClient {
    /// Create a client for `url` with a per-request `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> LedgerResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
            poll_interval: Duration::from_millis(500),
            confirmation_timeout: Duration::from_secs(60),
        })
    }

    /// Override confirmation polling cadence and deadline
    pub fn with_confirmation(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.confirmation_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and return its `result`
    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "JSON-RPC request");

        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(method, status = %status, "JSON-RPC HTTP error");
            return Err(LedgerError::Transport(format!("HTTP {}", status)));
        }

        let mut body: Value = resp
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("JSON parse error: {}", e)))?;

        if let Some(error) = body.get("error") {
            return Err(LedgerError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        body.get_mut("result")
            .map(Value::take)
            .ok_or_else(|| LedgerError::Decode(format!("{} response without result", method)))
    }

    /// One confirmation poll; `None` while the transaction is not yet known
    async fn poll_status(&self, digest: &TransactionDigest) -> LedgerResult<Option<ExecutionStatus>> {
        let result = match self
            .call(
                "iota_getTransactionBlock",
                json!([digest.as_str(), { "showEffects": true }]),
            )
            .await
        {
            Ok(result) => result,
            // Unknown digests are reported as RPC errors until indexed
            Err(LedgerError::Rpc { code, message }) => {
                debug!(digest = %digest, code, message = %message, "Transaction not yet available");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        parse_effects_status(&result)
    }
}

fn parse_effects_status(result: &Value) -> LedgerResult<Option<ExecutionStatus>> {
    let Some(status) = result.pointer("/effects/status") else {
        return Ok(None);
    };
    match status.get("status").and_then(Value::as_str) {
        Some("success") => Ok(Some(ExecutionStatus::Success)),
        Some("failure") => Ok(Some(ExecutionStatus::Failure {
            error: status
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown failure")
                .to_string(),
        })),
        other => Err(LedgerError::Decode(format!(
            "unexpected execution status {:?}",
            other
        ))),
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn list_owned_coins(
        &self,
        owner: &Address,
        coin_type: &CoinType,
        cursor: Option<&str>,
        limit: usize,
    ) -> LedgerResult<CoinPage> {
        let result = self
            .call(
                "iotax_getCoins",
                json!([owner.as_str(), coin_type.as_str(), cursor, limit]),
            )
            .await?;

        let resp: CoinsResponse = serde_json::from_value(result)
            .map_err(|e| LedgerError::Decode(format!("coin page: {}", e)))?;
        Ok(resp.into())
    }

    async fn reference_gas_price(&self) -> LedgerResult<u64> {
        let result = self.call("iotax_getReferenceGasPrice", json!([])).await?;
        parse_u64(&result)
            .ok_or_else(|| LedgerError::Decode(format!("gas price is not an integer: {}", result)))
    }

    async fn submit(&self, tx_bytes: &[u8], signatures: &[String]) -> LedgerResult<TransactionDigest> {
        let result = self
            .call(
                "iota_executeTransactionBlock",
                json!([
                    BASE64.encode(tx_bytes),
                    signatures,
                    { "showEffects": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await?;

        result
            .get("digest")
            .and_then(Value::as_str)
            .map(TransactionDigest::new)
            .ok_or_else(|| LedgerError::Decode("execution response without digest".to_string()))
    }

    async fn await_confirmation(&self, digest: &TransactionDigest) -> LedgerResult<ExecutionStatus> {
        let started = Instant::now();
        loop {
            if let Some(status) = self.poll_status(digest).await? {
                return Ok(status);
            }
            if started.elapsed() >= self.confirmation_timeout {
                return Err(LedgerError::ConfirmationTimeout {
                    digest: digest.to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_next_page_false_drops_cursor() {
        let resp: CoinsResponse = serde_json::from_value(json!({
            "data": [],
            "nextCursor": "0xabc",
            "hasNextPage": false
        }))
        .unwrap();
        assert_eq!(CoinPage::from(resp).next_cursor, None);

        let resp: CoinsResponse = serde_json::from_value(json!({
            "data": [],
            "nextCursor": "0xabc",
            "hasNextPage": true
        }))
        .unwrap();
        assert_eq!(CoinPage::from(resp).next_cursor.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_parse_effects_status() {
        let ok = json!({ "effects": { "status": { "status": "success" } } });
        assert_eq!(parse_effects_status(&ok).unwrap(), Some(ExecutionStatus::Success));

        let failed = json!({ "effects": { "status": { "status": "failure", "error": "InsufficientGas" } } });
        assert_eq!(
            parse_effects_status(&failed).unwrap(),
            Some(ExecutionStatus::Failure {
                error: "InsufficientGas".to_string()
            })
        );

        assert_eq!(parse_effects_status(&json!({ "digest": "x" })).unwrap(), None);
        assert!(parse_effects_status(&json!({ "effects": { "status": {} } })).is_err());
    }

    #[test]
    fn test_parse_u64_accepts_strings() {
        assert_eq!(parse_u64(&json!("1000")), Some(1000));
        assert_eq!(parse_u64(&json!(750)), Some(750));
        assert_eq!(parse_u64(&json!("abc")), None);
    }
}
